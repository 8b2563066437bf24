//! phpi frontend: source text to syntax tree.
//!
//! # Usage
//!
//! ```
//! use phpi_common::ast::StmtKind;
//!
//! let stmts = phpi_frontend::parse("<?php echo 1 + 2;").unwrap();
//! assert!(matches!(stmts[0].kind, StmtKind::Echo(_)));
//! ```

pub mod error;
pub mod lexer;

mod parser;

pub use error::SyntaxError;
pub use lexer::{tokenize, Token, TokenKind};

use phpi_common::ast::Stmt;
use parser::Parser;

/// Parse a whole source file into top-level statements.
///
/// Returns the first error encountered.
pub fn parse(source: &str) -> Result<Vec<Stmt>, SyntaxError> {
    let tokens = tokenize(source)?;
    Parser::new(tokens).program()
}
