//! Error types for the phpi compiler.

use thiserror::Error;

/// Fatal compilation errors. Compilation stops at the first one and
/// produces no program.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CompileError {
    /// A function declares more parameters than a call can pass.
    #[error("line {line}: function {function} declares {count} parameters (max 255)")]
    TooManyParameters {
        function: String,
        line: u32,
        count: usize,
    },

    /// A parameter name appears twice in one declaration.
    #[error("line {line}: function {function} redefines parameter ${param}")]
    DuplicateParameter {
        function: String,
        param: String,
        line: u32,
    },

    /// A call site passes more arguments than `CALL` can encode.
    #[error("line {line}: call to {callee} passes {count} arguments (max 255)")]
    TooManyArguments {
        callee: String,
        line: u32,
        count: usize,
    },

    /// A function's string pool exceeded 65536 entries.
    #[error("string pool of {function} exceeds 65536 entries")]
    StringPoolOverflow { function: String },

    /// A function's code grew beyond what a jump operand can address.
    #[error("code of {function} exceeds the 32-bit jump range")]
    JumpTargetOverflow { function: String },

    /// A user function was declared twice.
    #[error("line {line}: cannot redeclare function {name}")]
    FunctionRedeclared { name: String, line: u32 },
}
