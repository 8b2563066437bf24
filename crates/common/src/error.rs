//! Errors shared across the phpi crates.

use thiserror::Error;

/// Errors that occur while decoding a bytecode stream.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    /// Opcode 0x00 is illegal and always rejected.
    #[error("illegal opcode 0x00")]
    IllegalOpcode,

    /// Byte does not name any opcode.
    #[error("unknown opcode: {0:#04x}")]
    UnknownOpcode(u8),

    /// Cast operand does not name a variant type.
    #[error("unknown variant type: {0:#04x}")]
    UnknownVariantType(u8),

    /// The buffer ends inside an instruction.
    #[error("truncated instruction at {at}: need {needed} bytes, {available} available")]
    Truncated {
        at: usize,
        needed: usize,
        available: usize,
    },

    /// The cursor does not point into the buffer.
    #[error("address {at} is outside the code buffer (length {len})")]
    OutOfBounds { at: usize, len: usize },
}

/// Errors raised by native (builtin) functions.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NativeError {
    /// Wrong number of arguments.
    #[error("expected {expected} argument(s), {given} given")]
    Arity { expected: usize, given: usize },

    /// An argument had a type the builtin cannot accept.
    #[error("argument {index} must be {expected}, {found} given")]
    Argument {
        index: usize,
        expected: &'static str,
        found: &'static str,
    },
}
