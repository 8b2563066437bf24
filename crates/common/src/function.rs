//! Compiled function: bytecode, line table, string pool and parameters.

use crate::error::DecodeError;
use crate::instruction::Instruction;

/// Largest number of entries a string pool may hold (indices are `u16`).
pub const MAX_STRINGS: usize = u16::MAX as usize + 1;

/// A compiled function body.
///
/// `lines` is parallel to `code`: `lines[i]` is the source line of the
/// instruction that byte `i` belongs to.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Function {
    /// Declared name. The pseudo-main is called `{main}`.
    pub name: String,
    /// Raw bytecode.
    pub code: Vec<u8>,
    /// Source line per code byte.
    pub lines: Vec<u32>,
    /// String pool referenced by `STR`, `LOOKUP`, `ASSIGN` and `CONST`.
    pub strings: Vec<String>,
    /// Parameter names in declaration order.
    pub params: Vec<String>,
    /// Line of the declaration.
    pub line: u32,
}

/// Name given to the top-level pseudo-function.
pub const MAIN_NAME: &str = "{main}";

impl Function {
    /// Create an empty function.
    pub fn new(name: impl Into<String>, line: u32) -> Self {
        Self {
            name: name.into(),
            line,
            ..Self::default()
        }
    }

    /// Length of the bytecode in bytes.
    pub fn len(&self) -> usize {
        self.code.len()
    }

    /// Returns true if no code has been emitted.
    pub fn is_empty(&self) -> bool {
        self.code.is_empty()
    }

    /// Returns the pool index of `s`, adding it if absent.
    ///
    /// Returns `None` once the pool is full.
    pub fn intern(&mut self, s: &str) -> Option<u16> {
        if let Some(idx) = self.strings.iter().position(|existing| existing == s) {
            return u16::try_from(idx).ok();
        }
        if self.strings.len() >= MAX_STRINGS {
            return None;
        }
        self.strings.push(s.to_string());
        u16::try_from(self.strings.len() - 1).ok()
    }

    /// Looks up a pool entry.
    pub fn string(&self, idx: u16) -> Option<&str> {
        self.strings.get(usize::from(idx)).map(String::as_str)
    }

    /// Appends `instr`, tagging its bytes with `line`. Returns its address.
    pub fn emit(&mut self, instr: Instruction, line: u32) -> usize {
        let at = self.code.len();
        instr.encode_into(&mut self.code);
        self.lines.resize(self.code.len(), line);
        at
    }

    /// Rewrites the address operand of the jump at `at`.
    ///
    /// # Panics
    ///
    /// Panics if `at` does not leave room for a 4-byte operand.
    pub fn patch_target(&mut self, at: usize, target: u32) {
        self.code[at + 1..at + 5].copy_from_slice(&target.to_le_bytes());
    }

    /// Decodes the instruction at `at`.
    pub fn decode_at(&self, at: usize) -> Result<Instruction, DecodeError> {
        Instruction::decode(&self.code, at)
    }

    /// Source line of the instruction at `at`, or the declaration line.
    pub fn line_at(&self, at: usize) -> u32 {
        self.lines.get(at).copied().unwrap_or(self.line)
    }

    /// Iterates over `(address, instruction)` pairs from the start.
    ///
    /// Stops after the first decode error.
    pub fn instructions(&self) -> Instructions<'_> {
        Instructions {
            code: &self.code,
            at: 0,
            failed: false,
        }
    }
}

/// Iterator returned by [`Function::instructions`].
pub struct Instructions<'a> {
    code: &'a [u8],
    at: usize,
    failed: bool,
}

impl Iterator for Instructions<'_> {
    type Item = Result<(usize, Instruction), DecodeError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed || self.at >= self.code.len() {
            return None;
        }
        match Instruction::decode(self.code, self.at) {
            Ok(instr) => {
                let at = self.at;
                self.at += instr.width();
                Some(Ok((at, instr)))
            }
            Err(e) => {
                self.failed = true;
                Some(Err(e))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::instruction::Operand;
    use crate::opcode::Opcode;

    #[test]
    fn intern_reuses_slots() {
        let mut f = Function::new("f", 1);
        assert_eq!(f.intern("a"), Some(0));
        assert_eq!(f.intern("b"), Some(1));
        assert_eq!(f.intern("a"), Some(0));
        assert_eq!(f.strings.len(), 2);
        assert_eq!(f.string(1), Some("b"));
        assert_eq!(f.string(2), None);
    }

    #[test]
    fn intern_overflows_after_u16_range() {
        let mut f = Function::new("f", 1);
        f.strings = (0..MAX_STRINGS).map(|i| i.to_string()).collect();
        assert_eq!(f.intern("0"), Some(0));
        assert_eq!(f.intern("fresh"), None);
    }

    #[test]
    fn emit_records_lines_per_byte() {
        let mut f = Function::new("f", 1);
        assert_eq!(f.emit(Instruction::simple(Opcode::Null), 3), 0);
        assert_eq!(
            f.emit(Instruction::new(Opcode::Long, Operand::Long(5)), 4),
            1
        );
        assert_eq!(f.len(), 10);
        assert_eq!(f.lines[0], 3);
        assert!(f.lines[1..].iter().all(|&l| l == 4));
        assert_eq!(f.line_at(9), 4);
        assert_eq!(f.line_at(99), 1);
    }

    #[test]
    fn patch_target_rewrites_operand() {
        let mut f = Function::new("f", 1);
        let at = f.emit(Instruction::new(Opcode::Jmp, Operand::Addr(0)), 1);
        f.patch_target(at, 0xDEAD);
        assert_eq!(
            f.decode_at(at),
            Ok(Instruction::new(Opcode::Jmp, Operand::Addr(0xDEAD)))
        );
    }

    #[test]
    fn instructions_walks_variable_widths() {
        let mut f = Function::new("f", 1);
        f.emit(Instruction::new(Opcode::Str, Operand::Str(0)), 1);
        f.emit(Instruction::simple(Opcode::Echo), 1);
        f.emit(Instruction::new(Opcode::Jmp, Operand::Addr(0)), 1);
        let addrs: Vec<usize> = f
            .instructions()
            .map(|r| r.map(|(at, _)| at))
            .collect::<Result<_, _>>()
            .unwrap();
        assert_eq!(addrs, vec![0, 3, 4]);
    }

    #[test]
    fn instructions_stops_on_error() {
        let mut f = Function::new("f", 1);
        f.code = vec![Opcode::Nop as u8, 0x00, Opcode::Nop as u8];
        let items: Vec<_> = f.instructions().collect();
        assert_eq!(items.len(), 2);
        assert_eq!(items[1], Err(DecodeError::IllegalOpcode));
    }
}
