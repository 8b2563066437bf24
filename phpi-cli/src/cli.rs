//! Command-line arguments.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use phpi_vm::DEFAULT_MAX_CALL_DEPTH;

/// phpi - compile and run PHP-like scripts on a bytecode VM
#[derive(Parser, Debug)]
#[command(name = "phpi")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Log at debug level (overrides RUST_LOG)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Compile and execute a script
    Run(RunArgs),

    /// Print the bytecode of a script
    #[command(alias = "dis")]
    Disassemble(DisassembleArgs),

    /// Parse, compile and optimize without running
    Check(CheckArgs),
}

#[derive(Args, Debug)]
pub struct RunArgs {
    /// Script to execute
    pub file: PathBuf,

    /// Skip the peephole optimizer
    #[arg(long)]
    pub no_optimize: bool,

    /// Maximum number of nested calls
    #[arg(long, default_value_t = DEFAULT_MAX_CALL_DEPTH)]
    pub max_call_depth: usize,
}

#[derive(Args, Debug)]
pub struct DisassembleArgs {
    /// Script to disassemble
    pub file: PathBuf,

    /// Show the bytecode as compiled, before optimization
    #[arg(long)]
    pub no_optimize: bool,
}

#[derive(Args, Debug)]
pub struct CheckArgs {
    /// Script to check
    pub file: PathBuf,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn run_defaults() {
        let cli = Cli::try_parse_from(["phpi", "run", "a.php"]).unwrap();
        let Commands::Run(args) = cli.command else {
            panic!("expected run");
        };
        assert_eq!(args.file, PathBuf::from("a.php"));
        assert!(!args.no_optimize);
        assert_eq!(args.max_call_depth, DEFAULT_MAX_CALL_DEPTH);
        assert!(!cli.verbose);
    }

    #[test]
    fn global_verbose_after_subcommand() {
        let cli = Cli::try_parse_from(["phpi", "check", "a.php", "-v"]).unwrap();
        assert!(cli.verbose);
    }

    #[test]
    fn missing_file_is_an_error() {
        assert!(Cli::try_parse_from(["phpi", "run"]).is_err());
    }
}
