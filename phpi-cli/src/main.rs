use std::process;

use clap::Parser;
use phpi_cli::{commands::EXIT_INPUT, execute, init_logging, Cli};

fn main() {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            let code = if e.use_stderr() { EXIT_INPUT } else { 0 };
            let _ = e.print();
            process::exit(code);
        }
    };

    init_logging(cli.verbose);

    if let Err(code) = execute(&cli) {
        process::exit(code);
    }
}
