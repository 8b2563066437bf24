//! CLI command implementations.
//!
//! Each command returns `Err(code)` with the process exit code after
//! printing its own diagnostics to stderr.

use std::fs;
use std::io::{self, BufWriter, Write};
use std::path::Path;

use phpi_common::Program;
use phpi_optimizer::OptimizerConfig;
use phpi_vm::VmConfig;
use tracing::debug;

use crate::cli::{CheckArgs, DisassembleArgs, RunArgs};

/// Input, syntax or compile error.
pub const EXIT_INPUT: i32 = 1;
/// The optimizer found broken bytecode.
pub const EXIT_OPTIMIZER: i32 = 2;
/// Fatal error while executing.
pub const EXIT_RUNTIME: i32 = 3;

/// Compile and execute a script, echoing to stdout.
pub fn run(args: &RunArgs) -> Result<(), i32> {
    let program = build(&args.file, !args.no_optimize)?;
    let config = VmConfig {
        max_call_depth: args.max_call_depth,
    };

    let stdout = io::stdout();
    let mut out = BufWriter::new(stdout.lock());
    let result = phpi_vm::run_with_config(&program, &mut out, config);
    // Output produced before a fatal error is still shown.
    let flushed = out.flush();

    match result {
        Ok(value) => {
            debug!(result = %value, "script finished");
        }
        Err(e) => {
            eprintln!("fatal error: {e}");
            return Err(EXIT_RUNTIME);
        }
    }
    flushed.map_err(|e| {
        eprintln!("error: cannot write output: {e}");
        EXIT_RUNTIME
    })
}

/// Print the bytecode of a script.
pub fn disassemble(args: &DisassembleArgs) -> Result<(), i32> {
    let program = build(&args.file, !args.no_optimize)?;
    print!("{}", phpi_compiler::disassemble_program(&program));
    Ok(())
}

/// Parse, compile and optimize a script without running it.
pub fn check(args: &CheckArgs) -> Result<(), i32> {
    let program = build(&args.file, true)?;
    let bytes: usize = program.bodies().map(|f| f.len()).sum();
    let functions = program.bodies().count() - 1;
    println!(
        "OK: {} ({functions} functions, {bytes} bytes)",
        args.file.display()
    );
    Ok(())
}

/// Reads, parses, compiles and optionally optimizes `path`, then registers
/// the builtins.
fn build(path: &Path, optimize: bool) -> Result<Program, i32> {
    let source = fs::read_to_string(path).map_err(|e| {
        eprintln!("error: cannot read '{}': {e}", path.display());
        EXIT_INPUT
    })?;

    let stmts = phpi_frontend::parse(&source).map_err(|e| {
        eprintln!("{}: syntax error: {e}", path.display());
        EXIT_INPUT
    })?;

    let mut program = phpi_compiler::compile(&stmts).map_err(|e| {
        eprintln!("{}: compile error: {e}", path.display());
        EXIT_INPUT
    })?;

    if optimize {
        let report = phpi_optimizer::optimize_program(&mut program, &OptimizerConfig::default())
            .map_err(|e| {
                eprintln!("{}: optimizer error: {e}", path.display());
                EXIT_OPTIMIZER
            })?;
        debug!(
            rewrites = report.total_rewrites(),
            bytes_removed = report.bytes_removed(),
            "optimized program"
        );
    }

    phpi_vm::register_builtins(&mut program.functions);
    Ok(program)
}
