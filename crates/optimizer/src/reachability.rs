//! Block reachability and dead-block elimination.
//!
//! A block is reached from the function entry by falling through (unless it
//! ends in `JMP` or `RETURN`) or by a jump to its first byte.

use phpi_common::Opcode;

use crate::blocks::{block_at, Block};
use crate::peephole::{Analysis, Edit};
use crate::stack::Decorated;

/// Marks every block reachable from block 0.
pub fn reachable_blocks(decorated: &[Decorated], blocks: &[Block]) -> Vec<bool> {
    let mut reachable = vec![false; blocks.len()];
    if blocks.is_empty() {
        return reachable;
    }

    let mut work = vec![0usize];
    while let Some(b) = work.pop() {
        if reachable[b] {
            continue;
        }
        reachable[b] = true;

        let last = &decorated[blocks[b].instrs.end - 1];
        if let Some(target) = last.instr.target() {
            if let Some(t) = block_at(blocks, target as usize) {
                work.push(t);
            }
        }
        let falls_through = !matches!(last.instr.opcode, Opcode::Jmp | Opcode::Return);
        if falls_through && b + 1 < blocks.len() {
            work.push(b + 1);
        }
    }
    reachable
}

/// NOPs out the first unreachable, stack-neutral block that still holds
/// real instructions.
pub fn unreachable_block(analysis: &Analysis) -> Option<Vec<Edit>> {
    let reachable = reachable_blocks(&analysis.decorated, &analysis.blocks);

    analysis
        .blocks
        .iter()
        .zip(&reachable)
        .filter(|(_, &r)| !r)
        .find_map(|(block, _)| {
            let body = &analysis.decorated[block.instrs.clone()];
            let first = body.first()?;
            let last = body.last()?;
            if first.before != last.after {
                return None;
            }
            let edits: Vec<Edit> = body
                .iter()
                .filter(|d| d.instr.opcode != Opcode::Nop)
                .map(|d| Edit::Nop {
                    at: d.at,
                    width: d.instr.width(),
                })
                .collect();
            (!edits.is_empty()).then_some(edits)
        })
}
