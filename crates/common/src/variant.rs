//! Runtime value representation and the coercion lattice.
//!
//! Values have value semantics: cloning a [`Variant`] deep-copies its
//! string, and nothing is shared between stack slots or bindings.

use std::fmt;

use crate::program::FunctionId;
use crate::variant_type::VariantType;

/// Text produced when an undefined value is stringified.
pub const UNDEFINED_TEXT: &str = "<UNDEFINED>";
/// Text produced when `null` is stringified.
pub const NULL_TEXT: &str = "<null>";

/// Runtime value.
///
/// `PartialEq` is strict (same variant, same payload). Language-level
/// `==` is [`Variant::loose_eq`].
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Variant {
    /// Result of looking up a name that was never bound.
    #[default]
    Undefined,
    /// The `null` literal.
    Null,
    /// Boolean.
    Bool(bool),
    /// Signed 64-bit integer.
    Long(i64),
    /// Owned string.
    String(String),
    /// Reference to a compiled function in the function table.
    Function(FunctionId),
    /// Reference to a native function in the function table.
    Native(FunctionId),
}

impl Variant {
    /// Returns the type tag of this value.
    pub fn variant_type(&self) -> VariantType {
        match self {
            Variant::Undefined => VariantType::Undefined,
            Variant::Null => VariantType::Null,
            Variant::Bool(_) => VariantType::Bool,
            Variant::Long(_) => VariantType::Long,
            Variant::String(_) => VariantType::String,
            Variant::Function(_) => VariantType::Function,
            Variant::Native(_) => VariantType::Native,
        }
    }

    /// Name reported by the `gettype` builtin.
    pub fn type_name(&self) -> &'static str {
        match self {
            Variant::Undefined | Variant::Null => "NULL",
            Variant::Bool(_) => "boolean",
            Variant::Long(_) => "integer",
            Variant::String(_) => "string",
            Variant::Function(_) | Variant::Native(_) => "function",
        }
    }

    /// Truthiness: `""`, `"0"`, `0`, `false`, `null`, undefined and function
    /// references are false.
    pub fn to_bool(&self) -> bool {
        match self {
            Variant::Undefined | Variant::Null => false,
            Variant::Bool(b) => *b,
            Variant::Long(n) => *n != 0,
            Variant::String(s) => !(s.is_empty() || s == "0"),
            Variant::Function(_) | Variant::Native(_) => false,
        }
    }

    /// Integer coercion. Strings contribute their leading numeric prefix.
    pub fn to_long(&self) -> i64 {
        match self {
            Variant::Undefined | Variant::Null => 0,
            Variant::Bool(b) => i64::from(*b),
            Variant::Long(n) => *n,
            Variant::String(s) => parse_leading_long(s),
            Variant::Function(_) | Variant::Native(_) => 0,
        }
    }

    /// Converts to the requested type.
    ///
    /// Returns `None` when the target is a function type: nothing converts
    /// into a callable.
    pub fn convert(&self, target: VariantType) -> Option<Variant> {
        if self.variant_type() == target {
            return Some(self.clone());
        }
        match target {
            VariantType::Undefined => Some(Variant::Undefined),
            VariantType::Null => Some(Variant::Null),
            VariantType::Bool => Some(Variant::Bool(self.to_bool())),
            VariantType::Long => Some(Variant::Long(self.to_long())),
            VariantType::String => Some(Variant::String(self.to_string())),
            VariantType::Function | VariantType::Native => None,
        }
    }

    /// Loose (`==`) comparison.
    ///
    /// Same-type pairs compare directly. Otherwise a single coercion step
    /// is chosen by precedence: bool dominates, then null/undefined, then
    /// string/integer pairs compare as integers. Anything else is unequal.
    pub fn loose_eq(&self, other: &Variant) -> bool {
        use Variant::*;
        match (self, other) {
            (Undefined | Null, Undefined | Null) => true,
            (Bool(a), Bool(b)) => a == b,
            (Long(a), Long(b)) => a == b,
            (String(a), String(b)) => a == b,
            (Function(a), Function(b)) | (Native(a), Native(b)) => a == b,

            (Bool(b), v) | (v, Bool(b)) => *b == v.to_bool(),

            (Undefined | Null, String(s)) | (String(s), Undefined | Null) => s.is_empty(),
            (Undefined | Null, v) | (v, Undefined | Null) => !v.to_bool(),

            (String(s), Long(n)) | (Long(n), String(s)) => parse_leading_long(s) == *n,

            _ => false,
        }
    }
}

impl fmt::Display for Variant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Variant::Undefined => f.write_str(UNDEFINED_TEXT),
            Variant::Null => f.write_str(NULL_TEXT),
            Variant::Bool(true) => f.write_str("1"),
            Variant::Bool(false) => Ok(()),
            Variant::Long(n) => write!(f, "{n}"),
            Variant::String(s) => f.write_str(s),
            Variant::Function(_) | Variant::Native(_) => f.write_str("function"),
        }
    }
}

impl From<i64> for Variant {
    fn from(n: i64) -> Self {
        Variant::Long(n)
    }
}

impl From<bool> for Variant {
    fn from(b: bool) -> Self {
        Variant::Bool(b)
    }
}

impl From<&str> for Variant {
    fn from(s: &str) -> Self {
        Variant::String(s.to_string())
    }
}

impl From<String> for Variant {
    fn from(s: String) -> Self {
        Variant::String(s)
    }
}

/// Parses the leading base-10 integer of `s` the way `strtoll` does:
/// optional leading whitespace, an optional sign, then digits. Overflow
/// saturates. No digits yields 0.
pub fn parse_leading_long(s: &str) -> i64 {
    let bytes = s.as_bytes();
    let mut i = 0;
    while i < bytes.len() && matches!(bytes[i], b' ' | b'\t' | b'\n' | b'\r' | 0x0B | 0x0C) {
        i += 1;
    }

    let negative = match bytes.get(i) {
        Some(b'-') => {
            i += 1;
            true
        }
        Some(b'+') => {
            i += 1;
            false
        }
        _ => false,
    };

    let mut value: i64 = 0;
    while let Some(&b) = bytes.get(i) {
        if !b.is_ascii_digit() {
            break;
        }
        let digit = i64::from(b - b'0');
        // Accumulate negatively so i64::MIN is representable.
        value = match value.checked_mul(10).and_then(|v| v.checked_sub(digit)) {
            Some(v) => v,
            None => return if negative { i64::MIN } else { i64::MAX },
        };
        i += 1;
    }

    if negative {
        value
    } else {
        value.checked_neg().unwrap_or(i64::MAX)
    }
}
