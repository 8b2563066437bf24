//! Local peephole passes.
//!
//! Each pass looks for one pattern inside a single basic block and, when it
//! finds one, returns the edits that remove it. Edits never change the
//! width of the bytes they touch, so addresses stay valid until
//! compaction.
//!
//! Operands are located through the depth decoration rather than by
//! adjacency: the producer of stack slot `s` seen by instruction `i` is the
//! nearest earlier instruction in the block whose low-water mark reaches
//! `s`.

use phpi_common::{Function, Instruction, Opcode, Operand, Variant, VariantType};

use crate::blocks::{partition, Block};
use crate::config::Pass;
use crate::decode::decode;
use crate::error::OptimizeError;
use crate::reachability;
use crate::stack::{decorate, Decorated};

/// A width-preserving byte edit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Edit {
    /// Overwrite `width` bytes with NOPs.
    Nop { at: usize, width: usize },
    /// Write `instr` and pad the rest of `width` with NOPs.
    Replace {
        at: usize,
        width: usize,
        instr: Instruction,
    },
}

/// Decoded, partitioned and decorated view of one function.
pub struct Analysis<'a> {
    pub function: &'a Function,
    pub decorated: Vec<Decorated>,
    pub blocks: Vec<Block>,
}

impl<'a> Analysis<'a> {
    pub fn new(function: &'a Function) -> Result<Self, OptimizeError> {
        let instrs = decode(&function.code)?;
        let blocks = partition(&instrs);
        let decorated = decorate(&instrs)?;
        Ok(Self {
            function,
            decorated,
            blocks,
        })
    }

    /// Index of the instruction producing `slot` as seen by `consumer`.
    fn producer(&self, block: &Block, consumer: usize, slot: usize) -> Option<usize> {
        for k in (block.instrs.start..consumer).rev() {
            let d = &self.decorated[k];
            if d.low() <= slot {
                return (d.after > slot).then_some(k);
            }
        }
        None
    }

    /// True if everything strictly between `from` and `to` is NOP or LINE.
    fn only_filler(&self, from: usize, to: usize) -> bool {
        self.decorated[from + 1..to]
            .iter()
            .all(|d| matches!(d.instr.opcode, Opcode::Nop | Opcode::Line))
    }

    fn string(&self, instr: &Instruction) -> Option<&str> {
        match instr.operand {
            Operand::Str(idx) => self.function.string(idx),
            _ => None,
        }
    }

    fn declares_const(&self, name: &str) -> bool {
        self.decorated
            .iter()
            .any(|d| d.instr.opcode == Opcode::Const && self.string(&d.instr) == Some(name))
    }
}

/// Finds the first rewrite `pass` can make.
pub fn find(pass: Pass, analysis: &Analysis) -> Option<Vec<Edit>> {
    match pass {
        Pass::ConstantBranch => scan(analysis, constant_branch),
        Pass::SelfAssignment => scan(analysis, self_assignment),
        Pass::AdditiveIdentity => scan(analysis, additive_identity),
        Pass::RedundantCast => scan(analysis, redundant_cast),
        Pass::UnreachableBlock => reachability::unreachable_block(analysis),
    }
}

type Matcher = fn(&Analysis, &Block, usize) -> Option<Vec<Edit>>;

fn scan(analysis: &Analysis, matcher: Matcher) -> Option<Vec<Edit>> {
    analysis.blocks.iter().find_map(|block| {
        block
            .instrs
            .clone()
            .find_map(|i| matcher(analysis, block, i))
    })
}

/// Applies edits to `code` in place.
pub fn apply(code: &mut [u8], edits: &[Edit]) {
    for edit in edits {
        match edit {
            Edit::Nop { at, width } => code[*at..at + width].fill(Opcode::Nop as u8),
            Edit::Replace { at, width, instr } => {
                let bytes = instr.encode();
                debug_assert!(bytes.len() <= *width);
                code[*at..at + bytes.len()].copy_from_slice(&bytes);
                code[at + bytes.len()..at + width].fill(Opcode::Nop as u8);
            }
        }
    }
}

fn nop(d: &Decorated) -> Edit {
    Edit::Nop {
        at: d.at,
        width: d.instr.width(),
    }
}

/// Type an instruction's result is known to have, if any.
pub fn static_type(instr: &Instruction) -> Option<VariantType> {
    match instr.opcode {
        Opcode::Str | Opcode::Concat => Some(VariantType::String),
        Opcode::Long
        | Opcode::Add
        | Opcode::Sub
        | Opcode::Mul
        | Opcode::Div
        | Opcode::Mod
        | Opcode::Shl
        | Opcode::Shr
        | Opcode::Add1
        | Opcode::Sub1 => Some(VariantType::Long),
        Opcode::True
        | Opcode::False
        | Opcode::Lt
        | Opcode::Gt
        | Opcode::Lte
        | Opcode::Gte
        | Opcode::Eq
        | Opcode::Neq
        | Opcode::And
        | Opcode::Or
        | Opcode::Not => Some(VariantType::Bool),
        Opcode::Null => Some(VariantType::Null),
        Opcode::Cast => match instr.operand {
            Operand::Type(ty) => Some(ty),
            _ => None,
        },
        Opcode::Lookup
        | Opcode::Assign
        | Opcode::Const
        | Opcode::Call
        | Opcode::Return
        | Opcode::Echo
        | Opcode::Dup
        | Opcode::Pop
        | Opcode::Jmp
        | Opcode::Jmpz
        | Opcode::Nop
        | Opcode::Line => None,
    }
}

fn is_zero(instr: &Instruction) -> bool {
    instr.opcode == Opcode::Long && instr.operand == Operand::Long(0)
}

fn literal_value(analysis: &Analysis, instr: &Instruction) -> Option<Variant> {
    match instr.opcode {
        Opcode::Long => match instr.operand {
            Operand::Long(n) => Some(Variant::Long(n)),
            _ => None,
        },
        Opcode::Str => analysis.string(instr).map(Variant::from),
        Opcode::True => Some(Variant::Bool(true)),
        Opcode::False => Some(Variant::Bool(false)),
        Opcode::Null => Some(Variant::Null),
        _ => None,
    }
}

/// `X; LONG 0; ADD` and `LONG 0; X; ADD`.
fn additive_identity(analysis: &Analysis, block: &Block, i: usize) -> Option<Vec<Edit>> {
    let add = &analysis.decorated[i];
    if add.instr.opcode != Opcode::Add {
        return None;
    }
    let rhs = analysis.producer(block, i, add.before - 1)?;
    let lhs = analysis.producer(block, i, add.before - 2)?;
    if rhs == lhs || !analysis.only_filler(rhs, i) {
        return None;
    }
    let (lhs_d, rhs_d) = (&analysis.decorated[lhs], &analysis.decorated[rhs]);

    if is_zero(&rhs_d.instr) {
        if static_type(&lhs_d.instr) == Some(VariantType::Long) {
            return Some(vec![nop(rhs_d), nop(add)]);
        }
        // Keep the integer coercion ADD would have applied.
        return Some(vec![
            Edit::Replace {
                at: rhs_d.at,
                width: rhs_d.instr.width(),
                instr: Instruction::new(Opcode::Cast, Operand::Type(VariantType::Long)),
            },
            nop(add),
        ]);
    }

    if is_zero(&lhs_d.instr) && static_type(&rhs_d.instr) == Some(VariantType::Long) {
        return Some(vec![nop(lhs_d), nop(add)]);
    }
    None
}

/// `LOOKUP x; ASSIGN x` with only NOP/LINE between.
fn self_assignment(analysis: &Analysis, block: &Block, i: usize) -> Option<Vec<Edit>> {
    let assign = &analysis.decorated[i];
    if assign.instr.opcode != Opcode::Assign {
        return None;
    }
    let p = analysis.producer(block, i, assign.before - 1)?;
    let lookup = &analysis.decorated[p];
    if lookup.instr.opcode != Opcode::Lookup || !analysis.only_filler(p, i) {
        return None;
    }
    let name = analysis.string(&assign.instr)?;
    if analysis.string(&lookup.instr) != Some(name) || analysis.declares_const(name) {
        return None;
    }
    Some(vec![nop(lookup), nop(assign)])
}

/// A literal, possibly wrapped in casts, feeding `JMPZ`.
fn constant_branch(analysis: &Analysis, block: &Block, i: usize) -> Option<Vec<Edit>> {
    let jmpz = &analysis.decorated[i];
    if jmpz.instr.opcode != Opcode::Jmpz {
        return None;
    }
    let slot = jmpz.before - 1;

    let mut chain = Vec::new();
    let mut consumer = i;
    let literal = loop {
        let p = analysis.producer(block, consumer, slot)?;
        if !analysis.only_filler(p, consumer) {
            return None;
        }
        chain.push(p);
        let instr = &analysis.decorated[p].instr;
        if instr.opcode != Opcode::Cast {
            break literal_value(analysis, instr)?;
        }
        consumer = p;
    };

    // Innermost cast applies first.
    let mut value = literal;
    for &c in chain.iter().rev().skip(1) {
        let Operand::Type(ty) = analysis.decorated[c].instr.operand else {
            return None;
        };
        value = value.convert(ty)?;
    }

    let mut edits: Vec<Edit> = chain.iter().map(|&k| nop(&analysis.decorated[k])).collect();
    if value.to_long() != 0 {
        edits.push(nop(jmpz));
    } else {
        let target = jmpz.instr.target()?;
        edits.push(Edit::Replace {
            at: jmpz.at,
            width: jmpz.instr.width(),
            instr: Instruction::new(Opcode::Jmp, Operand::Addr(target)),
        });
    }
    Some(edits)
}

/// `CAST T` of a value already known to be a T.
fn redundant_cast(analysis: &Analysis, block: &Block, i: usize) -> Option<Vec<Edit>> {
    let cast = &analysis.decorated[i];
    let Operand::Type(target) = cast.instr.operand else {
        return None;
    };
    if cast.instr.opcode != Opcode::Cast {
        return None;
    }
    let p = analysis.producer(block, i, cast.before - 1)?;
    (static_type(&analysis.decorated[p].instr) == Some(target)).then(|| vec![nop(cast)])
}

#[cfg(test)]
mod tests {
    use super::*;

    fn function(instrs: &[Instruction], strings: &[&str]) -> Function {
        let mut f = Function::new("t", 1);
        for s in strings {
            f.intern(s);
        }
        for &i in instrs {
            f.emit(i, 1);
        }
        f
    }

    fn long(n: i64) -> Instruction {
        Instruction::new(Opcode::Long, Operand::Long(n))
    }

    fn named(op: Opcode, idx: u16) -> Instruction {
        Instruction::new(op, Operand::Str(idx))
    }

    fn simple(op: Opcode) -> Instruction {
        Instruction::simple(op)
    }

    fn first(pass: Pass, f: &Function) -> Option<Vec<Edit>> {
        find(pass, &Analysis::new(f).unwrap())
    }

    #[test]
    fn zero_after_known_long_vanishes() {
        let f = function(&[long(3), long(0), simple(Opcode::Add), simple(Opcode::Echo)], &[]);
        assert_eq!(
            first(Pass::AdditiveIdentity, &f),
            Some(vec![Edit::Nop { at: 9, width: 9 }, Edit::Nop { at: 18, width: 1 }])
        );
    }

    #[test]
    fn zero_after_unknown_becomes_cast() {
        let f = function(
            &[named(Opcode::Lookup, 0), long(0), simple(Opcode::Add), simple(Opcode::Echo)],
            &["a"],
        );
        assert_eq!(
            first(Pass::AdditiveIdentity, &f),
            Some(vec![
                Edit::Replace {
                    at: 3,
                    width: 9,
                    instr: Instruction::new(Opcode::Cast, Operand::Type(VariantType::Long)),
                },
                Edit::Nop { at: 12, width: 1 }
            ])
        );
    }

    #[test]
    fn zero_before_unknown_is_skipped() {
        let f = function(
            &[long(0), named(Opcode::Lookup, 0), simple(Opcode::Add), simple(Opcode::Echo)],
            &["a"],
        );
        assert_eq!(first(Pass::AdditiveIdentity, &f), None);
    }

    #[test]
    fn zero_before_known_long_vanishes() {
        let f = function(
            &[long(0), long(2), long(3), simple(Opcode::Mul), simple(Opcode::Add), simple(Opcode::Echo)],
            &[],
        );
        let edits = first(Pass::AdditiveIdentity, &f).unwrap();
        assert_eq!(edits[0], Edit::Nop { at: 0, width: 9 });
    }

    #[test]
    fn self_assignment_collapses() {
        let f = function(&[named(Opcode::Lookup, 0), named(Opcode::Assign, 0)], &["a"]);
        assert_eq!(
            first(Pass::SelfAssignment, &f),
            Some(vec![Edit::Nop { at: 0, width: 3 }, Edit::Nop { at: 3, width: 3 }])
        );
    }

    #[test]
    fn self_assignment_of_other_name_kept() {
        let f = function(&[named(Opcode::Lookup, 0), named(Opcode::Assign, 1)], &["a", "b"]);
        assert_eq!(first(Pass::SelfAssignment, &f), None);
    }

    #[test]
    fn self_assignment_of_const_kept() {
        let f = function(
            &[
                long(1),
                named(Opcode::Const, 0),
                named(Opcode::Lookup, 0),
                named(Opcode::Assign, 0),
            ],
            &["A"],
        );
        assert_eq!(first(Pass::SelfAssignment, &f), None);
    }

    #[test]
    fn dup_blocks_self_assignment() {
        let f = function(
            &[
                named(Opcode::Lookup, 0),
                simple(Opcode::Dup),
                named(Opcode::Assign, 0),
                simple(Opcode::Echo),
            ],
            &["a"],
        );
        assert_eq!(first(Pass::SelfAssignment, &f), None);
    }

    #[test]
    fn false_condition_becomes_jump() {
        let f = function(
            &[
                simple(Opcode::False),
                Instruction::new(Opcode::Cast, Operand::Type(VariantType::Bool)),
                Instruction::new(Opcode::Jmpz, Operand::Addr(8)),
                simple(Opcode::Null),
                simple(Opcode::Return),
            ],
            &[],
        );
        assert_eq!(
            first(Pass::ConstantBranch, &f),
            Some(vec![
                Edit::Nop { at: 1, width: 2 },
                Edit::Nop { at: 0, width: 1 },
                Edit::Replace {
                    at: 3,
                    width: 5,
                    instr: Instruction::new(Opcode::Jmp, Operand::Addr(8)),
                },
            ])
        );
    }

    #[test]
    fn true_string_condition_falls_through() {
        let f = function(
            &[
                named(Opcode::Str, 0),
                Instruction::new(Opcode::Cast, Operand::Type(VariantType::Bool)),
                Instruction::new(Opcode::Jmpz, Operand::Addr(10)),
                simple(Opcode::Null),
                simple(Opcode::Return),
            ],
            &["abc"],
        );
        let edits = first(Pass::ConstantBranch, &f).unwrap();
        assert_eq!(edits.len(), 3);
        assert!(edits.iter().all(|e| matches!(e, Edit::Nop { .. })));
    }

    #[test]
    fn variable_condition_is_not_constant() {
        let f = function(
            &[
                named(Opcode::Lookup, 0),
                Instruction::new(Opcode::Jmpz, Operand::Addr(8)),
                simple(Opcode::Null),
                simple(Opcode::Return),
            ],
            &["a"],
        );
        assert_eq!(first(Pass::ConstantBranch, &f), None);
    }

    #[test]
    fn cast_of_comparison_is_redundant() {
        let f = function(
            &[
                long(1),
                long(2),
                simple(Opcode::Lt),
                Instruction::new(Opcode::Cast, Operand::Type(VariantType::Bool)),
                simple(Opcode::Echo),
            ],
            &[],
        );
        assert_eq!(
            first(Pass::RedundantCast, &f),
            Some(vec![Edit::Nop { at: 19, width: 2 }])
        );
    }

    #[test]
    fn cast_of_lookup_is_kept() {
        let f = function(
            &[
                named(Opcode::Lookup, 0),
                Instruction::new(Opcode::Cast, Operand::Type(VariantType::Bool)),
                simple(Opcode::Echo),
            ],
            &["a"],
        );
        assert_eq!(first(Pass::RedundantCast, &f), None);
    }

    #[test]
    fn patterns_do_not_cross_blocks() {
        // LONG 0 sits in the block before the jump target.
        let f = function(
            &[
                long(5),
                long(0),
                Instruction::new(Opcode::Jmp, Operand::Addr(23)),
                simple(Opcode::Add),
                simple(Opcode::Echo),
            ],
            &[],
        );
        assert_eq!(first(Pass::AdditiveIdentity, &f), None);
    }

    #[test]
    fn apply_pads_with_nops() {
        let mut code = long(0).encode();
        apply(
            &mut code,
            &[Edit::Replace {
                at: 0,
                width: 9,
                instr: Instruction::new(Opcode::Cast, Operand::Type(VariantType::Long)),
            }],
        );
        assert_eq!(code[0], Opcode::Cast as u8);
        assert_eq!(code[1], VariantType::Long as u8);
        assert!(code[2..].iter().all(|&b| b == Opcode::Nop as u8));
    }
}
