//! Structural invariant checks on a function body.
//!
//! Run after optimization, and usable on its own. Every violation found is
//! collected rather than stopping at the first.

use phpi_common::{Function, Operand};

use crate::decode::decode;
use crate::error::OptimizeError;
use crate::stack::decorate;

/// Checks that `function` decodes cleanly, that every jump lands on an
/// instruction start or the end of code, that every string operand is in
/// range, that the line table is parallel to the code, and that the stack
/// depth never goes negative.
pub fn verify_function(function: &Function) -> Result<(), Vec<OptimizeError>> {
    let mut errors = Vec::new();
    let len = function.code.len();

    if function.lines.len() != len {
        errors.push(OptimizeError::LineTableMismatch {
            code: len,
            lines: function.lines.len(),
        });
    }

    let instrs = match decode(&function.code) {
        Ok(instrs) => instrs,
        Err(e) => {
            errors.push(e);
            return Err(errors);
        }
    };

    let starts: Vec<usize> = instrs.iter().map(|l| l.at).collect();
    for located in &instrs {
        match located.instr.operand {
            Operand::Addr(target) => {
                let t = target as usize;
                if t != len && starts.binary_search(&t).is_err() {
                    errors.push(OptimizeError::InvalidJumpTarget {
                        at: located.at,
                        target,
                    });
                }
            }
            Operand::Str(index) => {
                if usize::from(index) >= function.strings.len() {
                    errors.push(OptimizeError::StringIndexOutOfRange {
                        at: located.at,
                        index,
                        len: function.strings.len(),
                    });
                }
            }
            _ => {}
        }
    }

    if let Err(e) = decorate(&instrs) {
        errors.push(e);
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
