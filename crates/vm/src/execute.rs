//! Dispatch loop and opcode semantics.

use std::io::Write;

use phpi_common::{FunctionId, FunctionKind, Instruction, Opcode, Operand, Variant};
use tracing::trace;

use crate::error::RuntimeError;
use crate::machine::{Frame, Vm};
use crate::scope::{BindFailure, Scope};

impl<'p, W: Write> Vm<'p, W> {
    /// Runs until the entry frame returns or falls off its end.
    pub fn run(&mut self) -> Result<Variant, RuntimeError> {
        loop {
            if let Some(result) = self.step()? {
                return Ok(result);
            }
        }
    }

    /// Executes one instruction. Returns the entry frame's result once it
    /// finishes.
    fn step(&mut self) -> Result<Option<Variant>, RuntimeError> {
        let function = self.current.function;
        let at = self.current.cursor;
        if at >= function.len() {
            return Ok(self.leave(Variant::Null));
        }

        self.line = function.line_at(at);
        let instr = function
            .decode_at(at)
            .map_err(|source| RuntimeError::Decode {
                line: self.line,
                source,
            })?;
        self.current.cursor += instr.width();

        match instr.opcode {
            // Literals
            Opcode::Str => {
                let s = self.string(str_operand(&instr))?;
                self.push(Variant::from(s));
            }
            Opcode::Long => {
                let Operand::Long(n) = instr.operand else {
                    unreachable!("LONG decodes with a long operand")
                };
                self.push(Variant::Long(n));
            }
            Opcode::True => self.push(Variant::Bool(true)),
            Opcode::False => self.push(Variant::Bool(false)),
            Opcode::Null => self.push(Variant::Null),

            // Arithmetic
            Opcode::Add => self.exec_arith(i64::wrapping_add)?,
            Opcode::Sub => self.exec_arith(i64::wrapping_sub)?,
            Opcode::Mul => self.exec_arith(i64::wrapping_mul)?,
            Opcode::Div => self.exec_div(i64::wrapping_div)?,
            Opcode::Mod => self.exec_div(i64::wrapping_rem)?,
            Opcode::Shl => self.exec_shift(false)?,
            Opcode::Shr => self.exec_shift(true)?,

            // Comparison
            Opcode::Lt => self.exec_compare(|a, b| a < b)?,
            Opcode::Gt => self.exec_compare(|a, b| a > b)?,
            Opcode::Lte => self.exec_compare(|a, b| a <= b)?,
            Opcode::Gte => self.exec_compare(|a, b| a >= b)?,
            Opcode::Eq => {
                let (lhs, rhs) = self.pop_pair()?;
                self.push(Variant::Bool(lhs.loose_eq(&rhs)));
            }
            Opcode::Neq => {
                let (lhs, rhs) = self.pop_pair()?;
                self.push(Variant::Bool(!lhs.loose_eq(&rhs)));
            }

            // Logic
            Opcode::And => {
                let (lhs, rhs) = self.pop_pair()?;
                self.push(Variant::Bool(lhs.to_bool() && rhs.to_bool()));
            }
            Opcode::Or => {
                let (lhs, rhs) = self.pop_pair()?;
                self.push(Variant::Bool(lhs.to_bool() || rhs.to_bool()));
            }
            Opcode::Not => {
                let value = self.pop()?;
                self.push(Variant::Bool(!value.to_bool()));
            }

            Opcode::Concat => {
                let (lhs, rhs) = self.pop_pair()?;
                self.push(Variant::String(format!("{lhs}{rhs}")));
            }

            Opcode::Add1 => {
                let n = self.pop()?.to_long();
                self.push(Variant::Long(n.wrapping_add(1)));
            }
            Opcode::Sub1 => {
                let n = self.pop()?.to_long();
                self.push(Variant::Long(n.wrapping_sub(1)));
            }

            // Variables
            Opcode::Lookup => {
                let name = self.string(str_operand(&instr))?;
                let value = self.current.scope.lookup(name).cloned().unwrap_or_default();
                self.push(value);
            }
            Opcode::Assign => self.exec_bind(&instr, false)?,
            Opcode::Const => self.exec_bind(&instr, true)?,

            Opcode::Cast => {
                let Operand::Type(target) = instr.operand else {
                    unreachable!("CAST decodes with a type operand")
                };
                let value = self.pop()?;
                let converted = value.convert(target).ok_or(RuntimeError::InvalidCast {
                    line: self.line,
                    target: target.name(),
                })?;
                self.push(converted);
            }

            // Calls
            Opcode::Call => {
                let Operand::Argc(argc) = instr.operand else {
                    unreachable!("CALL decodes with an argc operand")
                };
                self.exec_call(usize::from(argc))?;
            }
            Opcode::Return => {
                let value = self.pop()?;
                return Ok(self.leave(value));
            }

            Opcode::Echo => {
                let value = self.pop()?;
                write!(self.out, "{value}").map_err(|e| RuntimeError::Output {
                    message: e.to_string(),
                })?;
            }

            // Stack
            Opcode::Dup => {
                let value = self.pop()?;
                self.push(value.clone());
                self.push(value);
            }
            Opcode::Pop => {
                self.pop()?;
            }

            // Control
            Opcode::Jmp => self.current.cursor = jump_target(&instr),
            Opcode::Jmpz => {
                let cond = self.pop()?;
                if cond.to_long() == 0 {
                    self.current.cursor = jump_target(&instr);
                }
            }
            Opcode::Nop => {}
            Opcode::Line => {
                if let Operand::Line(n) = instr.operand {
                    trace!(function = %self.current.function.name, line = n, "line");
                }
            }
        }

        Ok(None)
    }

    /// Finishes the running frame with `value`. Returns it if that frame
    /// was the entry frame.
    fn leave(&mut self, value: Variant) -> Option<Variant> {
        match self.callers.pop() {
            Some(caller) => {
                trace!(function = %self.current.function.name, depth = self.depth(), "return");
                self.current = caller;
                self.push(value);
                None
            }
            None => Some(value),
        }
    }

    /// Pops the right operand, then the left.
    fn pop_pair(&mut self) -> Result<(Variant, Variant), RuntimeError> {
        let rhs = self.pop()?;
        let lhs = self.pop()?;
        Ok((lhs, rhs))
    }

    fn pop_longs(&mut self) -> Result<(i64, i64), RuntimeError> {
        let (lhs, rhs) = self.pop_pair()?;
        Ok((lhs.to_long(), rhs.to_long()))
    }

    fn exec_arith(&mut self, op: fn(i64, i64) -> i64) -> Result<(), RuntimeError> {
        let (a, b) = self.pop_longs()?;
        self.push(Variant::Long(op(a, b)));
        Ok(())
    }

    fn exec_div(&mut self, op: fn(i64, i64) -> i64) -> Result<(), RuntimeError> {
        let (a, b) = self.pop_longs()?;
        if b == 0 {
            return Err(RuntimeError::DivisionByZero { line: self.line });
        }
        self.push(Variant::Long(op(a, b)));
        Ok(())
    }

    fn exec_shift(&mut self, right: bool) -> Result<(), RuntimeError> {
        let (a, count) = self.pop_longs()?;
        if count < 0 {
            return Err(RuntimeError::NegativeShift {
                line: self.line,
                count,
            });
        }
        let result = match (right, count) {
            (false, 0..=63) => a.wrapping_shl(count as u32),
            (false, _) => 0,
            (true, 0..=63) => a >> count,
            (true, _) => {
                if a < 0 {
                    -1
                } else {
                    0
                }
            }
        };
        self.push(Variant::Long(result));
        Ok(())
    }

    fn exec_compare(&mut self, op: fn(i64, i64) -> bool) -> Result<(), RuntimeError> {
        let (a, b) = self.pop_longs()?;
        self.push(Variant::Bool(op(a, b)));
        Ok(())
    }

    fn exec_bind(&mut self, instr: &Instruction, constant: bool) -> Result<(), RuntimeError> {
        let name = self.string(str_operand(instr))?;
        let value = self.pop()?;
        let scope = &mut self.current.scope;
        let bound = if constant {
            scope.declare_const(name, value)
        } else {
            scope.assign(name, value)
        };
        bound.map_err(|failure| {
            let name = name.to_string();
            let line = self.line;
            match failure {
                BindFailure::Reassignment => RuntimeError::ConstReassignment { line, name },
                BindFailure::Redeclaration => RuntimeError::ConstRedeclaration { line, name },
            }
        })
    }

    fn exec_call(&mut self, argc: usize) -> Result<(), RuntimeError> {
        let callee = self.pop()?;
        let id = self.resolve(&callee)?;
        let args = self.pop_n(argc)?;

        let functions = self.functions;
        let Some(entry) = functions.get(id) else {
            return Err(RuntimeError::NotCallable {
                line: self.line,
                found: callee.type_name(),
            });
        };

        match &entry.kind {
            FunctionKind::Native(f) => {
                let result = f(&args).map_err(|source| RuntimeError::Native {
                    line: self.line,
                    name: entry.name.clone(),
                    source,
                })?;
                self.push(result);
            }
            FunctionKind::Compiled(function) => {
                if args.len() != function.params.len() {
                    return Err(RuntimeError::ArityMismatch {
                        line: self.line,
                        function: entry.name.clone(),
                        expected: function.params.len(),
                        given: args.len(),
                    });
                }
                if self.depth() >= self.config.max_call_depth {
                    return Err(RuntimeError::CallDepthExceeded {
                        line: self.line,
                        limit: self.config.max_call_depth,
                    });
                }

                let scope = Scope::with_arguments(&function.params, args);
                let caller = std::mem::replace(&mut self.current, Frame::new(function, scope));
                self.callers.push(caller);
                trace!(function = %function.name, depth = self.depth(), "call");
            }
        }
        Ok(())
    }

    fn resolve(&self, callee: &Variant) -> Result<FunctionId, RuntimeError> {
        match callee {
            Variant::String(name) => {
                self.functions
                    .lookup(name)
                    .ok_or_else(|| RuntimeError::UndefinedFunction {
                        line: self.line,
                        name: name.clone(),
                    })
            }
            Variant::Function(id) | Variant::Native(id) => Ok(*id),
            other => Err(RuntimeError::NotCallable {
                line: self.line,
                found: other.type_name(),
            }),
        }
    }
}

fn str_operand(instr: &Instruction) -> u16 {
    match instr.operand {
        Operand::Str(idx) => idx,
        _ => unreachable!("{} decodes with a string operand", instr.opcode.mnemonic()),
    }
}

fn jump_target(instr: &Instruction) -> usize {
    instr.target().map_or(usize::MAX, |t| t as usize)
}
