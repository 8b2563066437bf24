//! Basic-block partition.
//!
//! Leaders are the function start, every jump target, and every
//! instruction that follows a jump or `RETURN`. Blocks are half-open byte
//! ranges in ascending order that tile the whole function.

use std::ops::Range;

use phpi_common::Opcode;

use crate::decode::Located;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Block {
    /// First byte.
    pub start: usize,
    /// One past the last byte.
    pub end: usize,
    /// Indices into the decoded instruction list.
    pub instrs: Range<usize>,
}

/// Splits a decoded function into basic blocks.
pub fn partition(instrs: &[Located]) -> Vec<Block> {
    if instrs.is_empty() {
        return Vec::new();
    }

    let mut leaders = vec![0usize];
    for located in instrs {
        if let Some(target) = located.instr.target() {
            leaders.push(target as usize);
        }
        if located.instr.opcode.is_jump() || located.instr.opcode == Opcode::Return {
            leaders.push(located.end());
        }
    }
    leaders.sort_unstable();
    leaders.dedup();

    // Leaders that do not start an instruction (out of range or mid-operand)
    // are dropped; `verify_function` reports those separately.
    let mut blocks = Vec::new();
    let mut first = 0;
    for i in 1..instrs.len() {
        if leaders.binary_search(&instrs[i].at).is_ok() {
            blocks.push(make_block(instrs, first..i));
            first = i;
        }
    }
    blocks.push(make_block(instrs, first..instrs.len()));
    blocks
}

fn make_block(instrs: &[Located], range: Range<usize>) -> Block {
    Block {
        start: instrs[range.start].at,
        end: instrs[range.end - 1].end(),
        instrs: range,
    }
}

/// Index of the block containing byte `addr`.
pub fn block_at(blocks: &[Block], addr: usize) -> Option<usize> {
    blocks
        .binary_search_by(|b| {
            if addr < b.start {
                std::cmp::Ordering::Greater
            } else if addr >= b.end {
                std::cmp::Ordering::Less
            } else {
                std::cmp::Ordering::Equal
            }
        })
        .ok()
}
