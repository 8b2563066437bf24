//! AST to bytecode lowering.
//!
//! Every expression leaves exactly one value on the operand stack; every
//! statement leaves the stack as it found it. `ASSIGN` and `CONST` consume
//! their operand, so an assignment used as a value is compiled with a `DUP`
//! in front of the store.

use phpi_common::ast::{BinaryOp, Expr, ExprKind, Stmt, StmtKind};
use phpi_common::{Function, Instruction, Opcode, Operand, Program, VariantType, MAIN_NAME};
use tracing::debug;

use crate::error::CompileError;

/// Largest parameter or argument count `CALL` can carry.
pub const MAX_ARGS: usize = u8::MAX as usize;

/// Compile top-level statements into a program.
///
/// Function declarations anywhere in the tree are hoisted into the function
/// table before the pseudo-main is compiled.
pub fn compile(stmts: &[Stmt]) -> Result<Program, CompileError> {
    let mut program = Program::new();

    let mut decls = Vec::new();
    collect_declarations(stmts, &mut decls);
    for decl in decls {
        if program.functions.lookup(decl.name).is_some() {
            return Err(CompileError::FunctionRedeclared {
                name: decl.name.to_string(),
                line: decl.line,
            });
        }
        let function = compile_function(decl.name, decl.params, decl.body, decl.line)?;
        debug!(
            name = decl.name,
            params = decl.params.len(),
            bytes = function.len(),
            "registered function"
        );
        program.functions.register_compiled(function);
    }

    program.main = compile_function(MAIN_NAME, &[], stmts, 1)?;
    debug!(bytes = program.main.len(), "compiled main");
    Ok(program)
}

struct Declaration<'a> {
    name: &'a str,
    params: &'a [String],
    body: &'a [Stmt],
    line: u32,
}

fn collect_declarations<'a>(stmts: &'a [Stmt], out: &mut Vec<Declaration<'a>>) {
    for stmt in stmts {
        collect_from(stmt, out);
    }
}

fn collect_from<'a>(stmt: &'a Stmt, out: &mut Vec<Declaration<'a>>) {
    match &stmt.kind {
        StmtKind::Function { name, params, body } => {
            out.push(Declaration {
                name,
                params,
                body,
                line: stmt.line,
            });
            collect_declarations(body, out);
        }
        StmtKind::Block(body) => collect_declarations(body, out),
        StmtKind::If { then, else_, .. } => {
            collect_from(then, out);
            if let Some(else_) = else_ {
                collect_from(else_, out);
            }
        }
        StmtKind::While { body, .. } | StmtKind::For { body, .. } => collect_from(body, out),
        StmtKind::Echo(_)
        | StmtKind::Html(_)
        | StmtKind::Expr(_)
        | StmtKind::Return(_)
        | StmtKind::Const { .. } => {}
    }
}

fn compile_function(
    name: &str,
    params: &[String],
    body: &[Stmt],
    line: u32,
) -> Result<Function, CompileError> {
    if params.len() > MAX_ARGS {
        return Err(CompileError::TooManyParameters {
            function: name.to_string(),
            line,
            count: params.len(),
        });
    }
    for (i, param) in params.iter().enumerate() {
        if params[..i].contains(param) {
            return Err(CompileError::DuplicateParameter {
                function: name.to_string(),
                param: param.clone(),
                line,
            });
        }
    }

    let mut function = Function::new(name, line);
    function.params = params.to_vec();
    let mut emitter = Emitter {
        function,
        last_line: None,
    };
    for stmt in body {
        emitter.statement(stmt)?;
    }
    let end_line = emitter.last_line.unwrap_or(line);
    emitter.op(Opcode::Null, end_line);
    emitter.op(Opcode::Return, end_line);
    emitter.here()?;
    Ok(emitter.function)
}

/// Appends bytecode to one function under construction.
struct Emitter {
    function: Function,
    last_line: Option<u32>,
}

impl Emitter {
    fn op(&mut self, opcode: Opcode, line: u32) -> usize {
        self.function.emit(Instruction::simple(opcode), line)
    }

    fn with(&mut self, opcode: Opcode, operand: Operand, line: u32) -> usize {
        self.function.emit(Instruction::new(opcode, operand), line)
    }

    fn named(&mut self, opcode: Opcode, name: &str, line: u32) -> Result<(), CompileError> {
        let idx = self
            .function
            .intern(name)
            .ok_or_else(|| CompileError::StringPoolOverflow {
                function: self.function.name.clone(),
            })?;
        self.with(opcode, Operand::Str(idx), line);
        Ok(())
    }

    /// Current end of code as a jump address.
    fn here(&self) -> Result<u32, CompileError> {
        u32::try_from(self.function.len()).map_err(|_| CompileError::JumpTargetOverflow {
            function: self.function.name.clone(),
        })
    }

    /// Emits a jump with a zero placeholder target; returns its address.
    fn jump_placeholder(&mut self, opcode: Opcode, line: u32) -> usize {
        self.with(opcode, Operand::Addr(0), line)
    }

    /// Points the jump at `at` to the current end of code.
    fn patch_here(&mut self, at: usize) -> Result<(), CompileError> {
        let target = self.here()?;
        self.function.patch_target(at, target);
        Ok(())
    }

    fn mark_line(&mut self, line: u32) {
        if self.last_line != Some(line) {
            self.with(Opcode::Line, Operand::Line(line), line);
            self.last_line = Some(line);
        }
    }

    /// Evaluates `cond` and jumps to a placeholder when it is false.
    fn branch_if_false(&mut self, cond: &Expr) -> Result<usize, CompileError> {
        self.expression(cond)?;
        self.with(Opcode::Cast, Operand::Type(VariantType::Bool), cond.line);
        Ok(self.jump_placeholder(Opcode::Jmpz, cond.line))
    }

    fn statement(&mut self, stmt: &Stmt) -> Result<(), CompileError> {
        let line = stmt.line;
        match &stmt.kind {
            StmtKind::Block(body) => {
                for inner in body {
                    self.statement(inner)?;
                }
            }
            // Hoisted by `compile`.
            StmtKind::Function { .. } => {}
            StmtKind::Echo(args) => {
                self.mark_line(line);
                for arg in args {
                    self.expression(arg)?;
                    self.op(Opcode::Echo, line);
                }
            }
            StmtKind::Html(text) => {
                self.mark_line(line);
                self.named(Opcode::Str, text, line)?;
                self.op(Opcode::Echo, line);
            }
            StmtKind::Expr(expr) => {
                self.mark_line(line);
                self.effect(expr)?;
            }
            StmtKind::If { cond, then, else_ } => {
                self.mark_line(line);
                let skip_then = self.branch_if_false(cond)?;
                self.statement(then)?;
                match else_ {
                    Some(else_) => {
                        let skip_else = self.jump_placeholder(Opcode::Jmp, line);
                        self.patch_here(skip_then)?;
                        self.statement(else_)?;
                        self.patch_here(skip_else)?;
                    }
                    None => self.patch_here(skip_then)?,
                }
            }
            StmtKind::While { cond, body } => {
                self.mark_line(line);
                let test = self.here()?;
                let exit = self.branch_if_false(cond)?;
                self.statement(body)?;
                self.with(Opcode::Jmp, Operand::Addr(test), line);
                self.patch_here(exit)?;
            }
            StmtKind::For {
                init,
                cond,
                step,
                body,
            } => {
                self.mark_line(line);
                if let Some(init) = init {
                    self.effect(init)?;
                }
                let test = self.here()?;
                let exit = match cond {
                    Some(cond) => Some(self.branch_if_false(cond)?),
                    None => None,
                };
                self.statement(body)?;
                if let Some(step) = step {
                    self.effect(step)?;
                }
                self.with(Opcode::Jmp, Operand::Addr(test), line);
                if let Some(exit) = exit {
                    self.patch_here(exit)?;
                }
            }
            StmtKind::Return(value) => {
                self.mark_line(line);
                match value {
                    Some(value) => self.expression(value)?,
                    None => {
                        self.op(Opcode::Null, line);
                    }
                }
                self.op(Opcode::Return, line);
            }
            StmtKind::Const { name, value } => {
                self.mark_line(line);
                self.expression(value)?;
                self.named(Opcode::Const, name, line)?;
            }
        }
        Ok(())
    }

    /// Compiles `expr` for its side effects only, leaving nothing behind.
    fn effect(&mut self, expr: &Expr) -> Result<(), CompileError> {
        match &expr.kind {
            ExprKind::Assign { name, value } => {
                self.expression(value)?;
                self.named(Opcode::Assign, name, expr.line)
            }
            ExprKind::IncDec {
                name, increment, ..
            } => {
                self.named(Opcode::Lookup, name, expr.line)?;
                self.op(step_opcode(*increment), expr.line);
                self.named(Opcode::Assign, name, expr.line)
            }
            _ => {
                self.expression(expr)?;
                self.op(Opcode::Pop, expr.line);
                Ok(())
            }
        }
    }

    /// Compiles `expr` so that it leaves exactly one value.
    fn expression(&mut self, expr: &Expr) -> Result<(), CompileError> {
        let line = expr.line;
        match &expr.kind {
            ExprKind::Str(s) => self.named(Opcode::Str, s, line)?,
            ExprKind::Long(n) => {
                self.with(Opcode::Long, Operand::Long(*n), line);
            }
            ExprKind::Bool(true) => {
                self.op(Opcode::True, line);
            }
            ExprKind::Bool(false) => {
                self.op(Opcode::False, line);
            }
            ExprKind::Null => {
                self.op(Opcode::Null, line);
            }
            ExprKind::Var(name) | ExprKind::Const(name) => {
                self.named(Opcode::Lookup, name, line)?
            }
            ExprKind::Assign { name, value } => {
                self.expression(value)?;
                self.op(Opcode::Dup, line);
                self.named(Opcode::Assign, name, line)?;
            }
            ExprKind::Binary { op, lhs, rhs } => {
                self.expression(lhs)?;
                self.expression(rhs)?;
                self.op(binary_opcode(*op), line);
            }
            ExprKind::Not(operand) => {
                self.expression(operand)?;
                self.op(Opcode::Not, line);
            }
            ExprKind::IncDec {
                name,
                increment,
                prefix,
            } => {
                self.named(Opcode::Lookup, name, line)?;
                if !prefix {
                    self.op(Opcode::Dup, line);
                }
                self.op(step_opcode(*increment), line);
                if *prefix {
                    self.op(Opcode::Dup, line);
                }
                self.named(Opcode::Assign, name, line)?;
            }
            ExprKind::Call { name, args } => {
                let argc = u8::try_from(args.len()).map_err(|_| {
                    CompileError::TooManyArguments {
                        callee: name.clone(),
                        line,
                        count: args.len(),
                    }
                })?;
                for arg in args {
                    self.expression(arg)?;
                }
                self.named(Opcode::Str, name, line)?;
                self.with(Opcode::Call, Operand::Argc(argc), line);
            }
            ExprKind::Cast { target, expr } => {
                self.expression(expr)?;
                self.with(Opcode::Cast, Operand::Type(*target), line);
            }
        }
        Ok(())
    }
}

fn step_opcode(increment: bool) -> Opcode {
    if increment {
        Opcode::Add1
    } else {
        Opcode::Sub1
    }
}

fn binary_opcode(op: BinaryOp) -> Opcode {
    match op {
        BinaryOp::Add => Opcode::Add,
        BinaryOp::Sub => Opcode::Sub,
        BinaryOp::Mul => Opcode::Mul,
        BinaryOp::Div => Opcode::Div,
        BinaryOp::Mod => Opcode::Mod,
        BinaryOp::Shl => Opcode::Shl,
        BinaryOp::Shr => Opcode::Shr,
        BinaryOp::Lt => Opcode::Lt,
        BinaryOp::Gt => Opcode::Gt,
        BinaryOp::Lte => Opcode::Lte,
        BinaryOp::Gte => Opcode::Gte,
        BinaryOp::Eq => Opcode::Eq,
        BinaryOp::Neq => Opcode::Neq,
        BinaryOp::And => Opcode::And,
        BinaryOp::Or => Opcode::Or,
        BinaryOp::Concat => Opcode::Concat,
    }
}
