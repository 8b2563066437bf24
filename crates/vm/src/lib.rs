//! phpi virtual machine: executes compiled programs.
//!
//! The VM is a stack machine with:
//! - one operand stack and one flat [`Scope`] per call frame
//! - an explicit frame list, so deep recursion is bounded by
//!   [`VmConfig::max_call_depth`] rather than the host stack
//! - a shared, read-only function table resolved by first-match name
//!
//! # Usage
//!
//! ```
//! use phpi_common::{Instruction, Opcode, Operand, Program, Variant};
//! use phpi_vm::run;
//!
//! let mut program = Program::new();
//! program.main.emit(Instruction::new(Opcode::Long, Operand::Long(42)), 1);
//! program.main.emit(Instruction::simple(Opcode::Echo), 1);
//!
//! let mut out = Vec::new();
//! let result = run(&program, &mut out).unwrap();
//! assert_eq!(result, Variant::Null);
//! assert_eq!(out, b"42");
//! ```

pub mod builtins;
pub mod error;
pub mod execute;
pub mod machine;
pub mod scope;

pub use builtins::register_builtins;
pub use error::RuntimeError;
pub use machine::{Frame, Vm, VmConfig, DEFAULT_MAX_CALL_DEPTH};
pub use scope::{Binding, Scope};

use std::io::Write;

use phpi_common::{Program, Variant};

/// Runs the program's pseudo-main with the default configuration, writing
/// echo output to `out`.
///
/// # Errors
///
/// Returns the first [`RuntimeError`] raised. Output written before the
/// error stays written.
pub fn run<W: Write>(program: &Program, out: W) -> Result<Variant, RuntimeError> {
    run_with_config(program, out, VmConfig::default())
}

/// [`run`] with explicit tunables.
pub fn run_with_config<W: Write>(
    program: &Program,
    out: W,
    config: VmConfig,
) -> Result<Variant, RuntimeError> {
    Vm::new(program, out, config).run()
}
