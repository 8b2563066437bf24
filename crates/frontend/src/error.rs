//! Error types for the phpi frontend.

use thiserror::Error;

/// Errors produced while tokenizing or parsing source text.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SyntaxError {
    /// A character that starts no token.
    #[error("line {line}: unexpected character '{ch}'")]
    UnexpectedChar { line: u32, ch: char },

    /// A string literal was still open at end of input.
    #[error("line {line}: unterminated string literal")]
    UnterminatedString { line: u32 },

    /// A `/* ... */` comment was still open at end of input.
    #[error("line {line}: unterminated comment")]
    UnterminatedComment { line: u32 },

    /// An integer literal does not fit in 64 bits.
    #[error("line {line}: invalid number '{token}'")]
    InvalidNumber { line: u32, token: String },

    /// A token appeared where it was not expected.
    #[error("line {line}: expected {expected}, found {found}")]
    UnexpectedToken {
        line: u32,
        expected: &'static str,
        found: String,
    },

    /// `++`, `--` or `=` applied to something other than a variable.
    #[error("line {line}: cannot assign to this expression")]
    InvalidAssignTarget { line: u32 },

    /// A cast to a type the language has no name for.
    #[error("line {line}: unknown cast type '{name}'")]
    UnknownCast { line: u32, name: String },
}

impl SyntaxError {
    /// Source line the error was reported on.
    pub fn line(&self) -> u32 {
        match self {
            SyntaxError::UnexpectedChar { line, .. }
            | SyntaxError::UnterminatedString { line }
            | SyntaxError::UnterminatedComment { line }
            | SyntaxError::InvalidNumber { line, .. }
            | SyntaxError::UnexpectedToken { line, .. }
            | SyntaxError::InvalidAssignTarget { line }
            | SyntaxError::UnknownCast { line, .. } => *line,
        }
    }
}
