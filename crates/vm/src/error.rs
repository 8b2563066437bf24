//! Runtime errors for the phpi VM.
//!
//! Every error that happens while a frame is executing carries the source
//! line of the failing instruction. These are the fatal errors of the
//! language: execution stops and nothing is retried.

use phpi_common::{DecodeError, NativeError};
use thiserror::Error;

/// Errors that stop execution.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RuntimeError {
    /// `CALL` named a function that is not in the table.
    #[error("line {line}: call to undefined function {name}()")]
    UndefinedFunction { line: u32, name: String },

    /// A compiled function was called with the wrong number of arguments.
    #[error("line {line}: {function}() expects {expected} argument(s), {given} given")]
    ArityMismatch {
        line: u32,
        function: String,
        expected: usize,
        given: usize,
    },

    /// `CONST` on a name that is already a constant.
    #[error("line {line}: constant {name} already defined")]
    ConstRedeclaration { line: u32, name: String },

    /// `ASSIGN` to a constant.
    #[error("line {line}: cannot assign to constant {name}")]
    ConstReassignment { line: u32, name: String },

    /// `DIV` or `MOD` with a zero divisor.
    #[error("line {line}: division by zero")]
    DivisionByZero { line: u32 },

    /// `SHL` or `SHR` with a negative count.
    #[error("line {line}: bit shift by negative number {count}")]
    NegativeShift { line: u32, count: i64 },

    /// `CAST` to a type nothing converts into.
    #[error("line {line}: cannot cast to {target}")]
    InvalidCast { line: u32, target: &'static str },

    /// `CALL` on a value that is neither a name nor a function reference.
    #[error("line {line}: value of type {found} is not callable")]
    NotCallable { line: u32, found: &'static str },

    /// Too many nested calls.
    #[error("line {line}: maximum call depth of {limit} exceeded")]
    CallDepthExceeded { line: u32, limit: usize },

    /// A builtin rejected its arguments.
    #[error("line {line}: {name}(): {source}")]
    Native {
        line: u32,
        name: String,
        #[source]
        source: NativeError,
    },

    /// An instruction popped an empty operand stack.
    #[error("line {line}: operand stack underflow")]
    StackUnderflow { line: u32 },

    /// A string operand indexes past the end of the pool.
    #[error("line {line}: string index {index} out of range")]
    InvalidStringIndex { line: u32, index: u16 },

    /// The bytecode under the cursor does not decode.
    #[error("line {line}: {source}")]
    Decode {
        line: u32,
        #[source]
        source: DecodeError,
    },

    /// Writing echo output failed.
    #[error("output error: {message}")]
    Output { message: String },
}

impl RuntimeError {
    /// Source line the error was raised on, if it has one.
    pub fn line(&self) -> Option<u32> {
        match self {
            RuntimeError::UndefinedFunction { line, .. }
            | RuntimeError::ArityMismatch { line, .. }
            | RuntimeError::ConstRedeclaration { line, .. }
            | RuntimeError::ConstReassignment { line, .. }
            | RuntimeError::DivisionByZero { line }
            | RuntimeError::NegativeShift { line, .. }
            | RuntimeError::InvalidCast { line, .. }
            | RuntimeError::NotCallable { line, .. }
            | RuntimeError::CallDepthExceeded { line, .. }
            | RuntimeError::Native { line, .. }
            | RuntimeError::StackUnderflow { line }
            | RuntimeError::InvalidStringIndex { line, .. }
            | RuntimeError::Decode { line, .. } => Some(*line),
            RuntimeError::Output { .. } => None,
        }
    }
}
