//! phpi compiler: syntax tree to bytecode, plus a disassembler.
//!
//! # Usage
//!
//! ```
//! let stmts = phpi_frontend::parse("<?php echo 1 + 2;").unwrap();
//! let program = phpi_compiler::compile(&stmts).unwrap();
//! let listing = phpi_compiler::disassemble(&program.main);
//! assert!(listing.contains("ADD"));
//! ```

pub mod compiler;
pub mod disassembler;
pub mod error;

pub use compiler::{compile, MAX_ARGS};
pub use disassembler::{disassemble, disassemble_program};
pub use error::CompileError;
