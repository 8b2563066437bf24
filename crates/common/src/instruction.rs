//! Instruction encoding and decoding.
//!
//! Instructions are variable width: a one-byte opcode followed by an operand
//! whose size is fixed per opcode. Multi-byte operands are little-endian:
//! ```text
//! STR/LOOKUP/ASSIGN/CONST  op u16          (3 bytes)
//! LONG                     op i64          (9 bytes)
//! CAST                     op type:u8      (2 bytes)
//! CALL                     op argc:u8      (2 bytes)
//! JMP/JMPZ                 op addr:u32     (5 bytes)
//! LINE                     op line:u32     (5 bytes)
//! everything else          op              (1 byte)
//! ```
//!
//! A decoded [`Instruction`] is a transient view; functions store only raw
//! bytes.

use crate::error::DecodeError;
use crate::opcode::{Opcode, OperandKind};
use crate::variant_type::VariantType;

/// The decoded operand of an instruction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operand {
    /// No operand.
    None,
    /// Index into the function's string pool.
    Str(u16),
    /// Integer literal.
    Long(i64),
    /// Absolute byte address within the function.
    Addr(u32),
    /// Argument count of a call.
    Argc(u8),
    /// Target type of a cast.
    Type(VariantType),
    /// Source line number.
    Line(u32),
}

impl Operand {
    /// The operand kind this value encodes as.
    pub fn kind(&self) -> OperandKind {
        match self {
            Operand::None => OperandKind::None,
            Operand::Str(_) => OperandKind::Str,
            Operand::Long(_) => OperandKind::Long,
            Operand::Addr(_) => OperandKind::Addr,
            Operand::Argc(_) => OperandKind::Argc,
            Operand::Type(_) => OperandKind::Type,
            Operand::Line(_) => OperandKind::Line,
        }
    }
}

/// A single decoded instruction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Instruction {
    /// The operation to perform.
    pub opcode: Opcode,
    /// Operand; its kind always matches `opcode.operand_kind()`.
    pub operand: Operand,
}

impl Instruction {
    /// Create a new instruction.
    pub fn new(opcode: Opcode, operand: Operand) -> Self {
        debug_assert_eq!(
            opcode.operand_kind(),
            operand.kind(),
            "operand does not fit {opcode:?}"
        );
        Self { opcode, operand }
    }

    /// Create an instruction that takes no operand.
    pub fn simple(opcode: Opcode) -> Self {
        Self::new(opcode, Operand::None)
    }

    /// Encoded size in bytes.
    pub fn width(&self) -> usize {
        self.opcode.width()
    }

    /// Jump target, if this is a jump.
    pub fn target(&self) -> Option<u32> {
        match self.operand {
            Operand::Addr(addr) => Some(addr),
            _ => None,
        }
    }

    /// Encode this instruction to a fresh byte vector.
    pub fn encode(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.width());
        self.encode_into(&mut out);
        out
    }

    /// Append the encoded bytes of this instruction to `out`.
    pub fn encode_into(&self, out: &mut Vec<u8>) {
        out.push(self.opcode as u8);
        match self.operand {
            Operand::None => {}
            Operand::Str(idx) => out.extend_from_slice(&idx.to_le_bytes()),
            Operand::Long(n) => out.extend_from_slice(&n.to_le_bytes()),
            Operand::Addr(addr) => out.extend_from_slice(&addr.to_le_bytes()),
            Operand::Argc(argc) => out.push(argc),
            Operand::Type(ty) => out.push(ty as u8),
            Operand::Line(line) => out.extend_from_slice(&line.to_le_bytes()),
        }
    }

    /// Decode the instruction starting at byte `at` of `code`.
    pub fn decode(code: &[u8], at: usize) -> Result<Self, DecodeError> {
        let Some(&byte) = code.get(at) else {
            return Err(DecodeError::OutOfBounds {
                at,
                len: code.len(),
            });
        };
        let opcode = Opcode::try_from(byte)?;
        let width = opcode.width();
        let available = code.len() - at;
        if available < width {
            return Err(DecodeError::Truncated {
                at,
                needed: width,
                available,
            });
        }

        let raw = &code[at + 1..at + width];
        let operand = match opcode.operand_kind() {
            OperandKind::None => Operand::None,
            OperandKind::Str => Operand::Str(u16::from_le_bytes([raw[0], raw[1]])),
            OperandKind::Long => {
                let mut buf = [0u8; 8];
                buf.copy_from_slice(raw);
                Operand::Long(i64::from_le_bytes(buf))
            }
            OperandKind::Addr => Operand::Addr(read_u32(raw)),
            OperandKind::Argc => Operand::Argc(raw[0]),
            OperandKind::Type => Operand::Type(VariantType::try_from(raw[0])?),
            OperandKind::Line => Operand::Line(read_u32(raw)),
        };

        Ok(Self { opcode, operand })
    }
}

fn read_u32(raw: &[u8]) -> u32 {
    u32::from_le_bytes([raw[0], raw[1], raw[2], raw[3]])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn simple_instruction_is_one_byte() {
        let instr = Instruction::simple(Opcode::Add);
        assert_eq!(instr.encode(), vec![Opcode::Add as u8]);
        assert_eq!(Instruction::decode(&[Opcode::Add as u8], 0), Ok(instr));
    }

    #[test]
    fn little_endian_operands() {
        let instr = Instruction::new(Opcode::Jmp, Operand::Addr(0x1234_5678));
        assert_eq!(instr.encode(), vec![0x78, 0x78, 0x56, 0x34, 0x12]);

        let instr = Instruction::new(Opcode::Str, Operand::Str(0xABCD));
        assert_eq!(instr.encode(), vec![Opcode::Str as u8, 0xCD, 0xAB]);
    }

    #[test]
    fn long_boundaries() {
        for n in [0, 1, -1, i64::MIN, i64::MAX] {
            let instr = Instruction::new(Opcode::Long, Operand::Long(n));
            let bytes = instr.encode();
            assert_eq!(bytes.len(), 9);
            assert_eq!(Instruction::decode(&bytes, 0), Ok(instr));
        }
    }

    #[test]
    fn decode_at_offset() {
        let mut code = Vec::new();
        Instruction::simple(Opcode::Null).encode_into(&mut code);
        Instruction::new(Opcode::Call, Operand::Argc(255)).encode_into(&mut code);
        assert_eq!(
            Instruction::decode(&code, 1),
            Ok(Instruction::new(Opcode::Call, Operand::Argc(255)))
        );
    }

    #[test]
    fn decode_cast_operand() {
        let code = [Opcode::Cast as u8, VariantType::Bool as u8];
        assert_eq!(
            Instruction::decode(&code, 0),
            Ok(Instruction::new(Opcode::Cast, Operand::Type(VariantType::Bool)))
        );
    }

    #[test]
    fn decode_rejects_bad_cast_type() {
        let code = [Opcode::Cast as u8, 0x42];
        assert_eq!(
            Instruction::decode(&code, 0),
            Err(DecodeError::UnknownVariantType(0x42))
        );
    }

    #[test]
    fn decode_rejects_truncated_operand() {
        let code = [Opcode::Long as u8, 1, 2, 3];
        assert_eq!(
            Instruction::decode(&code, 0),
            Err(DecodeError::Truncated {
                at: 0,
                needed: 9,
                available: 4
            })
        );
    }

    #[test]
    fn decode_rejects_illegal_opcode() {
        assert_eq!(
            Instruction::decode(&[0x00], 0),
            Err(DecodeError::IllegalOpcode)
        );
    }

    #[test]
    fn decode_past_end() {
        assert_eq!(
            Instruction::decode(&[Opcode::Nop as u8], 1),
            Err(DecodeError::OutOfBounds { at: 1, len: 1 })
        );
    }

    #[test]
    fn target_only_for_jumps() {
        assert_eq!(
            Instruction::new(Opcode::Jmpz, Operand::Addr(7)).target(),
            Some(7)
        );
        assert_eq!(
            Instruction::new(Opcode::Line, Operand::Line(7)).target(),
            None
        );
    }
}
