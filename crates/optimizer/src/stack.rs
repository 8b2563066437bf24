//! Operand-stack depth analysis.
//!
//! Depth is a prefix sum of per-instruction deltas across the whole
//! function. Compiled statements are stack-neutral, so the linear sum agrees
//! with the depth along every control-flow path.

use phpi_common::{Instruction, Opcode, Operand};

use crate::decode::Located;
use crate::error::OptimizeError;

/// A decoded instruction with the stack depth around it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Decorated {
    pub at: usize,
    pub instr: Instruction,
    /// Depth before the instruction executes.
    pub before: usize,
    /// Depth after the instruction executes.
    pub after: usize,
}

impl Decorated {
    /// Lowest depth reached while the instruction runs, i.e. the first
    /// slot it reads or writes.
    pub fn low(&self) -> usize {
        self.before - stack_pops(&self.instr)
    }
}

/// Annotates every instruction with its depth.
pub fn decorate(instrs: &[Located]) -> Result<Vec<Decorated>, OptimizeError> {
    let mut depth: i64 = 0;
    let mut out = Vec::with_capacity(instrs.len());

    for located in instrs {
        let required = stack_pops(&located.instr) as i64;
        if depth < required {
            return Err(OptimizeError::NegativeStackDepth { at: located.at });
        }
        let before = depth;
        depth += stack_delta(&located.instr);
        if depth < 0 {
            return Err(OptimizeError::NegativeStackDepth { at: located.at });
        }
        out.push(Decorated {
            at: located.at,
            instr: located.instr,
            before: before as usize,
            after: depth as usize,
        });
    }

    Ok(out)
}

/// Number of values an instruction pops.
pub fn stack_pops(instr: &Instruction) -> usize {
    match instr.opcode {
        // Pop 0
        Opcode::Str
        | Opcode::Long
        | Opcode::True
        | Opcode::False
        | Opcode::Null
        | Opcode::Lookup
        | Opcode::Jmp
        | Opcode::Nop
        | Opcode::Line => 0,

        // Pop 1
        Opcode::Not
        | Opcode::Add1
        | Opcode::Sub1
        | Opcode::Cast
        | Opcode::Assign
        | Opcode::Const
        | Opcode::Return
        | Opcode::Echo
        | Opcode::Dup
        | Opcode::Pop
        | Opcode::Jmpz => 1,

        // Pop 2
        Opcode::Add
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
        | Opcode::Concat => 2,

        // The callee plus its arguments.
        Opcode::Call => argc(instr) + 1,
    }
}

/// Net change in stack depth.
pub fn stack_delta(instr: &Instruction) -> i64 {
    match instr.opcode {
        // Push 1
        Opcode::Str
        | Opcode::Long
        | Opcode::True
        | Opcode::False
        | Opcode::Null
        | Opcode::Lookup
        | Opcode::Dup => 1,

        // Neutral
        Opcode::Not
        | Opcode::Add1
        | Opcode::Sub1
        | Opcode::Cast
        | Opcode::Jmp
        | Opcode::Nop
        | Opcode::Line => 0,

        // Pop 1
        Opcode::Assign
        | Opcode::Const
        | Opcode::Return
        | Opcode::Echo
        | Opcode::Pop
        | Opcode::Jmpz => -1,

        // Pop 2, push 1
        Opcode::Add
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
        | Opcode::Concat => -1,

        // Pop argc + callee, push result
        Opcode::Call => -(argc(instr) as i64),
    }
}

fn argc(instr: &Instruction) -> usize {
    match instr.operand {
        Operand::Argc(n) => usize::from(n),
        _ => 0,
    }
}
