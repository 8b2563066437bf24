//! NOP compaction.
//!
//! Removes every NOP that is not a jump target, then rewrites each jump
//! address by subtracting the bytes removed before its target. The line
//! table shrinks in step with the code.

use std::collections::BTreeSet;

use phpi_common::{Function, Opcode, Operand};

use crate::decode::decode;
use crate::error::OptimizeError;

/// Compacts `function` in place and returns the number of bytes removed.
pub fn compact(function: &mut Function) -> Result<usize, OptimizeError> {
    let len = function.code.len();
    if function.lines.len() != len {
        return Err(OptimizeError::LineTableMismatch {
            code: len,
            lines: function.lines.len(),
        });
    }

    let instrs = decode(&function.code)?;
    let targets: BTreeSet<usize> = instrs
        .iter()
        .filter_map(|l| l.instr.target())
        .map(|t| t as usize)
        .collect();

    // removed_before[addr] = NOP bytes dropped strictly before addr.
    let mut removed_before = vec![0usize; len + 1];
    let mut keep = Vec::with_capacity(instrs.len());
    let mut removed = 0;
    for located in &instrs {
        removed_before[located.at..located.end()].fill(removed);
        let drop = located.instr.opcode == Opcode::Nop && !targets.contains(&located.at);
        if drop {
            removed += located.instr.width();
        }
        keep.push(!drop);
    }
    removed_before[len] = removed;

    if removed == 0 {
        return Ok(0);
    }

    let mut code = Vec::with_capacity(len - removed);
    let mut lines = Vec::with_capacity(len - removed);
    for (located, kept) in instrs.iter().zip(keep) {
        if !kept {
            continue;
        }
        let mut instr = located.instr;
        if let Operand::Addr(target) = instr.operand {
            let t = target as usize;
            if t > len {
                return Err(OptimizeError::InvalidJumpTarget {
                    at: located.at,
                    target,
                });
            }
            instr.operand = Operand::Addr((t - removed_before[t]) as u32);
        }
        instr.encode_into(&mut code);
        lines.extend_from_slice(&function.lines[located.at..located.end()]);
    }

    function.code = code;
    function.lines = lines;
    Ok(removed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use phpi_common::Instruction;

    fn function(instrs: &[(Instruction, u32)]) -> Function {
        let mut f = Function::new("t", 1);
        for &(i, line) in instrs {
            f.emit(i, line);
        }
        f
    }

    #[test]
    fn strips_nops_and_shifts_jumps() {
        // 0: NOP 1: NOP 2: JMP @8 7: NOP 8: NULL 9: RETURN
        let mut f = function(&[
            (Instruction::simple(Opcode::Nop), 1),
            (Instruction::simple(Opcode::Nop), 1),
            (Instruction::new(Opcode::Jmp, Operand::Addr(8)), 2),
            (Instruction::simple(Opcode::Nop), 2),
            (Instruction::simple(Opcode::Null), 3),
            (Instruction::simple(Opcode::Return), 3),
        ]);
        assert_eq!(compact(&mut f), Ok(3));
        let instrs: Vec<Instruction> = f.instructions().map(|r| r.unwrap().1).collect();
        assert_eq!(
            instrs,
            vec![
                Instruction::new(Opcode::Jmp, Operand::Addr(5)),
                Instruction::simple(Opcode::Null),
                Instruction::simple(Opcode::Return),
            ]
        );
        assert_eq!(f.lines, vec![2, 2, 2, 2, 2, 3, 3]);
    }

    #[test]
    fn jump_target_nop_survives() {
        // 0: NULL 1: JMP @6 6: NOP 7: RETURN
        let mut f = function(&[
            (Instruction::simple(Opcode::Null), 1),
            (Instruction::new(Opcode::Jmp, Operand::Addr(6)), 1),
            (Instruction::simple(Opcode::Nop), 1),
            (Instruction::simple(Opcode::Return), 1),
        ]);
        assert_eq!(compact(&mut f), Ok(0));
        assert_eq!(f.len(), 8);
    }

    #[test]
    fn jump_to_end_of_code() {
        let mut f = function(&[
            (Instruction::new(Opcode::Jmp, Operand::Addr(7)), 1),
            (Instruction::simple(Opcode::Nop), 1),
            (Instruction::simple(Opcode::Nop), 1),
        ]);
        assert_eq!(compact(&mut f), Ok(2));
        assert_eq!(
            f.decode_at(0).unwrap(),
            Instruction::new(Opcode::Jmp, Operand::Addr(5))
        );
    }

    #[test]
    fn compaction_is_idempotent() {
        let mut f = function(&[
            (Instruction::simple(Opcode::Nop), 1),
            (Instruction::new(Opcode::Long, Operand::Long(1)), 1),
            (Instruction::simple(Opcode::Echo), 1),
        ]);
        compact(&mut f).unwrap();
        let once = f.clone();
        assert_eq!(compact(&mut f), Ok(0));
        assert_eq!(f, once);
    }

    #[test]
    fn mismatched_lines_rejected() {
        let mut f = Function::new("t", 1);
        f.code = vec![Opcode::Nop as u8];
        assert_eq!(
            compact(&mut f),
            Err(OptimizeError::LineTableMismatch { code: 1, lines: 0 })
        );
    }
}
