//! Syntax tree produced by the frontend and consumed by the compiler.
//!
//! Every node carries the source line it started on. Children are owned.

use crate::variant_type::VariantType;

/// A statement with its source line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Stmt {
    pub kind: StmtKind,
    pub line: u32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StmtKind {
    /// `{ ... }`
    Block(Vec<Stmt>),
    /// `echo a, b, ...;`
    Echo(Vec<Expr>),
    /// Literal text outside `<?php ... ?>`.
    Html(String),
    /// Expression evaluated for its side effects.
    Expr(Expr),
    If {
        cond: Expr,
        then: Box<Stmt>,
        else_: Option<Box<Stmt>>,
    },
    While {
        cond: Expr,
        body: Box<Stmt>,
    },
    /// `for (init; cond; step) body`. Each header slot is optional.
    For {
        init: Option<Expr>,
        cond: Option<Expr>,
        step: Option<Expr>,
        body: Box<Stmt>,
    },
    Function {
        name: String,
        params: Vec<String>,
        body: Vec<Stmt>,
    },
    Return(Option<Expr>),
    /// `const NAME = value;`
    Const {
        name: String,
        value: Expr,
    },
}

/// An expression with its source line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Expr {
    pub kind: ExprKind,
    pub line: u32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExprKind {
    Str(String),
    Long(i64),
    Bool(bool),
    Null,
    /// `$name` (stored without the sigil).
    Var(String),
    /// Bare identifier naming a constant.
    Const(String),
    /// `$name = value`
    Assign {
        name: String,
        value: Box<Expr>,
    },
    Binary {
        op: BinaryOp,
        lhs: Box<Expr>,
        rhs: Box<Expr>,
    },
    /// `!expr`
    Not(Box<Expr>),
    /// `++$x`, `$x++`, `--$x`, `$x--`
    IncDec {
        name: String,
        increment: bool,
        prefix: bool,
    },
    /// `name(args...)`
    Call {
        name: String,
        args: Vec<Expr>,
    },
    /// `(type) expr`
    Cast {
        target: VariantType,
        expr: Box<Expr>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Shl,
    Shr,
    Lt,
    Gt,
    Lte,
    Gte,
    Eq,
    Neq,
    And,
    Or,
    Concat,
}

impl Stmt {
    pub fn new(kind: StmtKind, line: u32) -> Self {
        Self { kind, line }
    }
}

impl Expr {
    pub fn new(kind: ExprKind, line: u32) -> Self {
        Self { kind, line }
    }

    /// Returns true for expressions whose value is known to be an integer
    /// without evaluating them.
    pub fn is_long_literal(&self) -> bool {
        matches!(self.kind, ExprKind::Long(_))
    }
}
