//! Linear decoding of a function body.

use phpi_common::Instruction;

use crate::error::OptimizeError;

/// An instruction together with its byte address.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Located {
    pub at: usize,
    pub instr: Instruction,
}

impl Located {
    /// Address one past the last byte of this instruction.
    pub fn end(&self) -> usize {
        self.at + self.instr.width()
    }
}

/// Decodes `code` from start to end.
pub fn decode(code: &[u8]) -> Result<Vec<Located>, OptimizeError> {
    let mut out = Vec::new();
    let mut at = 0;
    while at < code.len() {
        let instr =
            Instruction::decode(code, at).map_err(|source| OptimizeError::Decode { at, source })?;
        out.push(Located { at, instr });
        at += instr.width();
    }
    Ok(out)
}
