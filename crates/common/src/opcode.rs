//! Opcode definitions and the shared operand-width table.
//!
//! Every table keyed by [`Opcode`] in this workspace (operand kind, width,
//! stack effect, mnemonic) is an exhaustive `match`, so a new opcode does not
//! compile until each table knows about it.

use crate::error::DecodeError;

/// Identifies the operation to perform.
///
/// The `#[repr(u8)]` attribute gives each variant a stable byte value. Byte
/// `0x00` is never a valid opcode.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Opcode {
    // Literals
    /// Push a string from the pool. Operand: pool index (u16).
    Str = 0x01,
    /// Push a 64-bit integer. Operand: i64.
    Long = 0x02,
    /// Push `true`.
    True = 0x03,
    /// Push `false`.
    False = 0x04,
    /// Push `null`.
    Null = 0x05,

    // Arithmetic & shifts
    /// Pop two values, push their integer sum.
    Add = 0x10,
    /// Pop two values, push (second_popped - first_popped).
    Sub = 0x11,
    /// Pop two values, push their integer product.
    Mul = 0x12,
    /// Pop two values, push the truncated quotient. Zero divisor is fatal.
    Div = 0x13,
    /// Pop two values, push the remainder. Zero divisor is fatal.
    Mod = 0x14,
    /// Shift left.
    Shl = 0x15,
    /// Arithmetic shift right.
    Shr = 0x16,

    // Comparison
    /// Pop two, push BOOL (second_popped < first_popped).
    Lt = 0x20,
    /// Pop two, push BOOL (second_popped > first_popped).
    Gt = 0x21,
    /// Pop two, push BOOL (second_popped <= first_popped).
    Lte = 0x22,
    /// Pop two, push BOOL (second_popped >= first_popped).
    Gte = 0x23,
    /// Pop two, push BOOL (loose equality).
    Eq = 0x24,
    /// Pop two, push BOOL (negated loose equality).
    Neq = 0x25,

    // Logic
    /// Pop two, push BOOL (both truthy).
    And = 0x30,
    /// Pop two, push BOOL (either truthy).
    Or = 0x31,
    /// Pop one, push its negated truthiness.
    Not = 0x32,

    // Strings
    /// Pop two, push their concatenation as strings.
    Concat = 0x38,

    // Unary arithmetic
    /// Pop one, push it coerced to integer plus one.
    Add1 = 0x40,
    /// Pop one, push it coerced to integer minus one.
    Sub1 = 0x41,

    // Variables
    /// Push the binding named by the pool string. Missing names push `Undefined`.
    Lookup = 0x50,
    /// Pop a value and bind it to the named variable.
    Assign = 0x51,
    /// Pop a value and bind it as a named constant.
    Const = 0x52,

    // Conversion
    /// Pop, convert to the operand type, push.
    Cast = 0x58,

    // Functions
    /// Pop callee, pop `argc` arguments, call, push the result.
    Call = 0x60,
    /// Pop the result and leave the current frame.
    Return = 0x61,

    // Output
    /// Pop a value and write its string form to the output sink.
    Echo = 0x68,

    // Stack
    /// Push a copy of the top value.
    Dup = 0x70,
    /// Discard the top value.
    Pop = 0x71,

    // Control flow
    /// Jump to an absolute address. Operand: u32.
    Jmp = 0x78,
    /// Pop the condition; jump to the address when it coerces to 0.
    Jmpz = 0x79,
    /// No operation.
    Nop = 0x7E,
    /// Source-line marker. Operand: u32 line number.
    Line = 0x7F,
}

/// All valid opcodes, in definition order. Useful for exhaustive testing.
pub const ALL_OPCODES: [Opcode; 37] = [
    Opcode::Str,
    Opcode::Long,
    Opcode::True,
    Opcode::False,
    Opcode::Null,
    Opcode::Add,
    Opcode::Sub,
    Opcode::Mul,
    Opcode::Div,
    Opcode::Mod,
    Opcode::Shl,
    Opcode::Shr,
    Opcode::Lt,
    Opcode::Gt,
    Opcode::Lte,
    Opcode::Gte,
    Opcode::Eq,
    Opcode::Neq,
    Opcode::And,
    Opcode::Or,
    Opcode::Not,
    Opcode::Concat,
    Opcode::Add1,
    Opcode::Sub1,
    Opcode::Lookup,
    Opcode::Assign,
    Opcode::Const,
    Opcode::Cast,
    Opcode::Call,
    Opcode::Return,
    Opcode::Echo,
    Opcode::Dup,
    Opcode::Pop,
    Opcode::Jmp,
    Opcode::Jmpz,
    Opcode::Nop,
    Opcode::Line,
];

/// The shape of the operand trailing an opcode byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OperandKind {
    /// No operand bytes.
    None,
    /// String-pool index, 2 bytes.
    Str,
    /// Signed 64-bit integer, 8 bytes.
    Long,
    /// Absolute jump address, 4 bytes.
    Addr,
    /// Argument count, 1 byte.
    Argc,
    /// Cast target type, 1 byte.
    Type,
    /// Source line number, 4 bytes.
    Line,
}

impl OperandKind {
    /// Number of operand bytes for this kind.
    pub const fn size(self) -> usize {
        match self {
            OperandKind::None => 0,
            OperandKind::Argc | OperandKind::Type => 1,
            OperandKind::Str => 2,
            OperandKind::Addr | OperandKind::Line => 4,
            OperandKind::Long => 8,
        }
    }
}

impl TryFrom<u8> for Opcode {
    type Error = DecodeError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0x00 => Err(DecodeError::IllegalOpcode),

            0x01 => Ok(Opcode::Str),
            0x02 => Ok(Opcode::Long),
            0x03 => Ok(Opcode::True),
            0x04 => Ok(Opcode::False),
            0x05 => Ok(Opcode::Null),

            0x10 => Ok(Opcode::Add),
            0x11 => Ok(Opcode::Sub),
            0x12 => Ok(Opcode::Mul),
            0x13 => Ok(Opcode::Div),
            0x14 => Ok(Opcode::Mod),
            0x15 => Ok(Opcode::Shl),
            0x16 => Ok(Opcode::Shr),

            0x20 => Ok(Opcode::Lt),
            0x21 => Ok(Opcode::Gt),
            0x22 => Ok(Opcode::Lte),
            0x23 => Ok(Opcode::Gte),
            0x24 => Ok(Opcode::Eq),
            0x25 => Ok(Opcode::Neq),

            0x30 => Ok(Opcode::And),
            0x31 => Ok(Opcode::Or),
            0x32 => Ok(Opcode::Not),

            0x38 => Ok(Opcode::Concat),

            0x40 => Ok(Opcode::Add1),
            0x41 => Ok(Opcode::Sub1),

            0x50 => Ok(Opcode::Lookup),
            0x51 => Ok(Opcode::Assign),
            0x52 => Ok(Opcode::Const),

            0x58 => Ok(Opcode::Cast),

            0x60 => Ok(Opcode::Call),
            0x61 => Ok(Opcode::Return),

            0x68 => Ok(Opcode::Echo),

            0x70 => Ok(Opcode::Dup),
            0x71 => Ok(Opcode::Pop),

            0x78 => Ok(Opcode::Jmp),
            0x79 => Ok(Opcode::Jmpz),
            0x7E => Ok(Opcode::Nop),
            0x7F => Ok(Opcode::Line),

            _ => Err(DecodeError::UnknownOpcode(value)),
        }
    }
}

impl Opcode {
    /// The operand that follows this opcode in the byte stream.
    pub const fn operand_kind(self) -> OperandKind {
        match self {
            Opcode::Str | Opcode::Lookup | Opcode::Assign | Opcode::Const => OperandKind::Str,
            Opcode::Long => OperandKind::Long,
            Opcode::Jmp | Opcode::Jmpz => OperandKind::Addr,
            Opcode::Call => OperandKind::Argc,
            Opcode::Cast => OperandKind::Type,
            Opcode::Line => OperandKind::Line,
            Opcode::True
            | Opcode::False
            | Opcode::Null
            | Opcode::Add
            | Opcode::Sub
            | Opcode::Mul
            | Opcode::Div
            | Opcode::Mod
            | Opcode::Shl
            | Opcode::Shr
            | Opcode::Lt
            | Opcode::Gt
            | Opcode::Lte
            | Opcode::Gte
            | Opcode::Eq
            | Opcode::Neq
            | Opcode::And
            | Opcode::Or
            | Opcode::Not
            | Opcode::Concat
            | Opcode::Add1
            | Opcode::Sub1
            | Opcode::Return
            | Opcode::Echo
            | Opcode::Dup
            | Opcode::Pop
            | Opcode::Nop => OperandKind::None,
        }
    }

    /// Total instruction width in bytes: the opcode byte plus its operand.
    pub const fn width(self) -> usize {
        1 + self.operand_kind().size()
    }

    /// True for `JMP` and `JMPZ`.
    pub const fn is_jump(self) -> bool {
        matches!(self, Opcode::Jmp | Opcode::Jmpz)
    }

    /// Returns the disassembly mnemonic for this opcode.
    pub fn mnemonic(&self) -> &'static str {
        match self {
            Opcode::Str => "STR",
            Opcode::Long => "LONG",
            Opcode::True => "TRUE",
            Opcode::False => "FALSE",
            Opcode::Null => "NULL",
            Opcode::Add => "ADD",
            Opcode::Sub => "SUB",
            Opcode::Mul => "MUL",
            Opcode::Div => "DIV",
            Opcode::Mod => "MOD",
            Opcode::Shl => "SHL",
            Opcode::Shr => "SHR",
            Opcode::Lt => "LT",
            Opcode::Gt => "GT",
            Opcode::Lte => "LTE",
            Opcode::Gte => "GTE",
            Opcode::Eq => "EQ",
            Opcode::Neq => "NEQ",
            Opcode::And => "AND",
            Opcode::Or => "OR",
            Opcode::Not => "NOT",
            Opcode::Concat => "CONCAT",
            Opcode::Add1 => "ADD1",
            Opcode::Sub1 => "SUB1",
            Opcode::Lookup => "LOOKUP",
            Opcode::Assign => "ASSIGN",
            Opcode::Const => "CONST",
            Opcode::Cast => "CAST",
            Opcode::Call => "CALL",
            Opcode::Return => "RETURN",
            Opcode::Echo => "ECHO",
            Opcode::Dup => "DUP",
            Opcode::Pop => "POP",
            Opcode::Jmp => "JMP",
            Opcode::Jmpz => "JMPZ",
            Opcode::Nop => "NOP",
            Opcode::Line => "LINE",
        }
    }
}
