//! Runtime type tags for [`Variant`](crate::Variant) values.
//!
//! The byte value of each tag is what a `CAST` instruction carries as its
//! operand.

use crate::error::DecodeError;

/// Identifies the dynamic type of a value.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VariantType {
    /// Unset variable.
    Undefined = 0x00,
    /// Owned byte string.
    String = 0x01,
    /// Signed 64-bit integer.
    Long = 0x02,
    /// Boolean.
    Bool = 0x03,
    /// The null value.
    Null = 0x04,
    /// Reference to a native (builtin) function.
    Native = 0x05,
    /// Reference to a compiled function.
    Function = 0x06,
}

/// All valid variant types, in definition order.
pub const ALL_VARIANT_TYPES: [VariantType; 7] = [
    VariantType::Undefined,
    VariantType::String,
    VariantType::Long,
    VariantType::Bool,
    VariantType::Null,
    VariantType::Native,
    VariantType::Function,
];

impl TryFrom<u8> for VariantType {
    type Error = DecodeError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0x00 => Ok(VariantType::Undefined),
            0x01 => Ok(VariantType::String),
            0x02 => Ok(VariantType::Long),
            0x03 => Ok(VariantType::Bool),
            0x04 => Ok(VariantType::Null),
            0x05 => Ok(VariantType::Native),
            0x06 => Ok(VariantType::Function),
            _ => Err(DecodeError::UnknownVariantType(value)),
        }
    }
}

impl VariantType {
    /// Lowercase name used by casts and the disassembler.
    pub fn name(&self) -> &'static str {
        match self {
            VariantType::Undefined => "undefined",
            VariantType::String => "string",
            VariantType::Long => "long",
            VariantType::Bool => "bool",
            VariantType::Null => "null",
            VariantType::Native => "native",
            VariantType::Function => "function",
        }
    }
}
