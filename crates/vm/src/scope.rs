//! Per-frame variable bindings.
//!
//! A scope is a flat list searched by name. Variables and constants share
//! one namespace; there is no parent scope.

use phpi_common::Variant;

/// One named binding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Binding {
    pub name: String,
    pub value: Variant,
    pub is_const: bool,
}

/// Why a bind was refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BindFailure {
    /// The name is a constant and cannot be assigned.
    Reassignment,
    /// The name is already a constant.
    Redeclaration,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Scope {
    bindings: Vec<Binding>,
}

impl Scope {
    pub fn new() -> Self {
        Self::default()
    }

    /// A call frame's scope: each parameter bound to its positional argument.
    pub fn with_arguments(params: &[String], args: Vec<Variant>) -> Self {
        let mut scope = Self::new();
        for (name, value) in params.iter().zip(args) {
            match scope.find(name) {
                Some(i) => scope.bindings[i].value = value,
                None => scope.push(name, value, false),
            }
        }
        scope
    }

    fn find(&self, name: &str) -> Option<usize> {
        self.bindings.iter().position(|b| b.name == name)
    }

    pub fn lookup(&self, name: &str) -> Option<&Variant> {
        self.find(name).map(|i| &self.bindings[i].value)
    }

    pub fn is_const(&self, name: &str) -> bool {
        self.find(name).is_some_and(|i| self.bindings[i].is_const)
    }

    /// Binds or rebinds a variable.
    pub fn assign(&mut self, name: &str, value: Variant) -> Result<(), BindFailure> {
        match self.find(name) {
            Some(i) if self.bindings[i].is_const => Err(BindFailure::Reassignment),
            Some(i) => {
                self.bindings[i].value = value;
                Ok(())
            }
            None => {
                self.push(name, value, false);
                Ok(())
            }
        }
    }

    /// Binds a constant. A plain variable of the same name is promoted.
    pub fn declare_const(&mut self, name: &str, value: Variant) -> Result<(), BindFailure> {
        match self.find(name) {
            Some(i) if self.bindings[i].is_const => Err(BindFailure::Redeclaration),
            Some(i) => {
                let binding = &mut self.bindings[i];
                binding.value = value;
                binding.is_const = true;
                Ok(())
            }
            None => {
                self.push(name, value, true);
                Ok(())
            }
        }
    }

    fn push(&mut self, name: &str, value: Variant, is_const: bool) {
        self.bindings.push(Binding {
            name: name.to_string(),
            value,
            is_const,
        });
    }

    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Binding> {
        self.bindings.iter()
    }
}
