//! VM state: call frames, the function table and the output sink.

use std::io::Write;

use phpi_common::{Function, FunctionTable, Program, Variant};

use crate::error::RuntimeError;
use crate::scope::Scope;

/// Default bound on nested calls.
pub const DEFAULT_MAX_CALL_DEPTH: usize = 10_000;

/// Tunables for a VM run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VmConfig {
    /// Largest number of frames alive at once, the entry frame included.
    pub max_call_depth: usize,
}

impl Default for VmConfig {
    fn default() -> Self {
        Self {
            max_call_depth: DEFAULT_MAX_CALL_DEPTH,
        }
    }
}

/// One activation of a function.
#[derive(Debug, Clone)]
pub struct Frame<'p> {
    /// The executing function.
    pub function: &'p Function,
    /// Byte offset of the next instruction.
    pub cursor: usize,
    /// Operand stack.
    pub stack: Vec<Variant>,
    /// Local bindings.
    pub scope: Scope,
}

impl<'p> Frame<'p> {
    pub fn new(function: &'p Function, scope: Scope) -> Self {
        Self {
            function,
            cursor: 0,
            stack: Vec::new(),
            scope,
        }
    }
}

/// The phpi virtual machine.
///
/// Calls do not recurse on the host stack: the running frame is `current`
/// and suspended callers wait in `callers`.
pub struct Vm<'p, W: Write> {
    pub(crate) functions: &'p FunctionTable,
    pub(crate) current: Frame<'p>,
    pub(crate) callers: Vec<Frame<'p>>,
    pub(crate) out: W,
    pub(crate) config: VmConfig,
    /// Source line of the instruction being executed.
    pub(crate) line: u32,
}

impl<'p, W: Write> Vm<'p, W> {
    /// A VM that will run the program's pseudo-main.
    pub fn new(program: &'p Program, out: W, config: VmConfig) -> Self {
        Self::with_entry(&program.functions, &program.main, out, config)
    }

    /// A VM that will run `entry` with an empty scope.
    pub fn with_entry(
        functions: &'p FunctionTable,
        entry: &'p Function,
        out: W,
        config: VmConfig,
    ) -> Self {
        Self {
            functions,
            current: Frame::new(entry, Scope::new()),
            callers: Vec::new(),
            out,
            config,
            line: entry.line,
        }
    }

    /// Number of live frames.
    pub fn depth(&self) -> usize {
        self.callers.len() + 1
    }

    /// Bindings of the running frame.
    pub fn scope(&self) -> &Scope {
        &self.current.scope
    }

    pub fn output(&self) -> &W {
        &self.out
    }

    pub fn into_output(self) -> W {
        self.out
    }

    pub(crate) fn push(&mut self, value: Variant) {
        self.current.stack.push(value);
    }

    pub(crate) fn pop(&mut self) -> Result<Variant, RuntimeError> {
        self.current
            .stack
            .pop()
            .ok_or(RuntimeError::StackUnderflow { line: self.line })
    }

    /// Pops `n` values, returned in push order.
    pub(crate) fn pop_n(&mut self, n: usize) -> Result<Vec<Variant>, RuntimeError> {
        let len = self.current.stack.len();
        if len < n {
            return Err(RuntimeError::StackUnderflow { line: self.line });
        }
        Ok(self.current.stack.split_off(len - n))
    }

    /// Pool string `idx` of the running function.
    pub(crate) fn string(&self, idx: u16) -> Result<&'p str, RuntimeError> {
        let function: &'p Function = self.current.function;
        function
            .string(idx)
            .ok_or(RuntimeError::InvalidStringIndex {
                line: self.line,
                index: idx,
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_call_depth() {
        assert_eq!(VmConfig::default().max_call_depth, 10_000);
    }

    #[test]
    fn pop_n_keeps_order() {
        let program = Program::new();
        let mut vm = Vm::new(&program, Vec::new(), VmConfig::default());
        for n in 1..=3 {
            vm.push(Variant::Long(n));
        }
        assert_eq!(
            vm.pop_n(2),
            Ok(vec![Variant::Long(2), Variant::Long(3)])
        );
        assert_eq!(vm.pop_n(2), Err(RuntimeError::StackUnderflow { line: 1 }));
    }

    #[test]
    fn bad_string_index() {
        let program = Program::new();
        let vm = Vm::new(&program, Vec::new(), VmConfig::default());
        assert_eq!(
            vm.string(0),
            Err(RuntimeError::InvalidStringIndex { line: 1, index: 0 })
        );
    }
}
