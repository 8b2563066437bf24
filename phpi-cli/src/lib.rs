//! Driver for the phpi toolchain: argument parsing, logging setup and the
//! `run`/`disassemble`/`check` commands.

pub mod cli;
pub mod commands;

pub use cli::{Cli, Commands};

use tracing_subscriber::EnvFilter;

/// Dispatches a parsed command line. `Err` carries the process exit code.
pub fn execute(cli: &Cli) -> Result<(), i32> {
    match &cli.command {
        Commands::Run(args) => commands::run(args),
        Commands::Disassemble(args) => commands::disassemble(args),
        Commands::Check(args) => commands::check(args),
    }
}

/// Installs the stderr log subscriber. `--verbose` forces `debug`,
/// otherwise `RUST_LOG` applies with `warn` as the fallback.
pub fn init_logging(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    // A subscriber may already be installed when embedded in a test harness.
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}
