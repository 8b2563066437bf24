//! Optimizer errors.
//!
//! Every variant names a byte address (`at`) inside the function being
//! processed. These are internal invariant violations: well-formed compiler
//! output never produces them.

use phpi_common::DecodeError;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum OptimizeError {
    /// The byte stream does not decode.
    #[error("decode error at byte {at}: {source}")]
    Decode {
        at: usize,
        #[source]
        source: DecodeError,
    },

    /// An instruction pops more values than the stack holds.
    #[error("negative stack depth at byte {at}")]
    NegativeStackDepth { at: usize },

    /// A jump does not land on an instruction start or the end of code.
    #[error("jump at byte {at} targets {target}, which is not an instruction boundary")]
    InvalidJumpTarget { at: usize, target: u32 },

    /// A string operand indexes past the end of the pool.
    #[error("string index {index} at byte {at} is out of range (pool size {len})")]
    StringIndexOutOfRange { at: usize, index: u16, len: usize },

    /// The line table is not parallel to the code.
    #[error("line table has {lines} entries for {code} code bytes")]
    LineTableMismatch { code: usize, lines: usize },
}
