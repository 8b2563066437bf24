//! Whole-program representation: the pseudo-main plus the function table.

use crate::error::NativeError;
use crate::function::{Function, MAIN_NAME};
use crate::variant::Variant;

/// Index of an entry in a [`FunctionTable`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FunctionId(pub usize);

/// Signature of a native (builtin) function.
pub type NativeFn = fn(&[Variant]) -> Result<Variant, NativeError>;

/// What a table entry resolves to.
#[derive(Debug, Clone)]
pub enum FunctionKind {
    /// Bytecode produced by the compiler.
    Compiled(Function),
    /// Host function.
    Native(NativeFn),
}

/// A named function table entry.
#[derive(Debug, Clone)]
pub struct FunctionEntry {
    pub name: String,
    pub kind: FunctionKind,
}

impl FunctionEntry {
    /// The variant a reference to this entry evaluates to.
    pub fn reference(&self, id: FunctionId) -> Variant {
        match self.kind {
            FunctionKind::Compiled(_) => Variant::Function(id),
            FunctionKind::Native(_) => Variant::Native(id),
        }
    }
}

/// Ordered list of functions, searched by first-match name lookup.
#[derive(Debug, Clone, Default)]
pub struct FunctionTable {
    entries: Vec<FunctionEntry>,
}

impl FunctionTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a compiled function under its own name.
    pub fn register_compiled(&mut self, function: Function) -> FunctionId {
        let name = function.name.clone();
        self.push(name, FunctionKind::Compiled(function))
    }

    /// Appends a native function.
    pub fn register_native(&mut self, name: impl Into<String>, f: NativeFn) -> FunctionId {
        self.push(name.into(), FunctionKind::Native(f))
    }

    fn push(&mut self, name: String, kind: FunctionKind) -> FunctionId {
        self.entries.push(FunctionEntry { name, kind });
        FunctionId(self.entries.len() - 1)
    }

    /// First entry with the given name.
    pub fn lookup(&self, name: &str) -> Option<FunctionId> {
        self.entries
            .iter()
            .position(|e| e.name == name)
            .map(FunctionId)
    }

    pub fn get(&self, id: FunctionId) -> Option<&FunctionEntry> {
        self.entries.get(id.0)
    }

    /// Returns the compiled body for `id`, if it is a compiled function.
    pub fn compiled(&self, id: FunctionId) -> Option<&Function> {
        match &self.get(id)?.kind {
            FunctionKind::Compiled(f) => Some(f),
            FunctionKind::Native(_) => None,
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (FunctionId, &FunctionEntry)> {
        self.entries
            .iter()
            .enumerate()
            .map(|(i, e)| (FunctionId(i), e))
    }

    /// Mutable access to every compiled function body.
    pub fn compiled_mut(&mut self) -> impl Iterator<Item = &mut Function> {
        self.entries.iter_mut().filter_map(|e| match &mut e.kind {
            FunctionKind::Compiled(f) => Some(f),
            FunctionKind::Native(_) => None,
        })
    }
}

/// A compiled program.
#[derive(Debug, Clone)]
pub struct Program {
    /// Top-level code.
    pub main: Function,
    /// Declared and registered functions.
    pub functions: FunctionTable,
}

impl Program {
    /// An empty program with no functions.
    pub fn new() -> Self {
        Self {
            main: Function::new(MAIN_NAME, 1),
            functions: FunctionTable::new(),
        }
    }

    /// The pseudo-main followed by every compiled function.
    pub fn bodies(&self) -> impl Iterator<Item = &Function> {
        std::iter::once(&self.main).chain(self.functions.iter().filter_map(|(_, e)| {
            match &e.kind {
                FunctionKind::Compiled(f) => Some(f),
                FunctionKind::Native(_) => None,
            }
        }))
    }

    /// Mutable form of [`Program::bodies`].
    pub fn bodies_mut(&mut self) -> impl Iterator<Item = &mut Function> {
        std::iter::once(&mut self.main).chain(self.functions.compiled_mut())
    }
}

impl Default for Program {
    fn default() -> Self {
        Self::new()
    }
}
