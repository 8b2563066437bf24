//! Recursive-descent parser from tokens to the syntax tree.
//!
//! Binary operators are parsed by precedence climbing. From loosest to
//! tightest: `||`, `&&`, `== !=`, `< > <= >=`, `.`, `<< >>`, `+ -`,
//! `* / %`. All are left-associative. Assignment is right-associative and
//! binds loosest of all.

use phpi_common::ast::{BinaryOp, Expr, ExprKind, Stmt, StmtKind};
use phpi_common::VariantType;

use crate::error::SyntaxError;
use crate::lexer::{Token, TokenKind};

pub(crate) struct Parser {
    tokens: Vec<Token>,
    pos: usize,
}

fn binary_op(kind: &TokenKind) -> Option<(BinaryOp, u8)> {
    let entry = match kind {
        TokenKind::OrOr => (BinaryOp::Or, 1),
        TokenKind::AndAnd => (BinaryOp::And, 2),
        TokenKind::EqEq => (BinaryOp::Eq, 3),
        TokenKind::NotEq => (BinaryOp::Neq, 3),
        TokenKind::Lt => (BinaryOp::Lt, 4),
        TokenKind::Gt => (BinaryOp::Gt, 4),
        TokenKind::Lte => (BinaryOp::Lte, 4),
        TokenKind::Gte => (BinaryOp::Gte, 4),
        TokenKind::Dot => (BinaryOp::Concat, 5),
        TokenKind::Shl => (BinaryOp::Shl, 6),
        TokenKind::Shr => (BinaryOp::Shr, 6),
        TokenKind::Plus => (BinaryOp::Add, 7),
        TokenKind::Minus => (BinaryOp::Sub, 7),
        TokenKind::Star => (BinaryOp::Mul, 8),
        TokenKind::Slash => (BinaryOp::Div, 8),
        TokenKind::Percent => (BinaryOp::Mod, 8),
        _ => return None,
    };
    Some(entry)
}

enum CastName {
    Supported(VariantType),
    Unsupported,
}

/// Classifies a parenthesized identifier. `None` means it is not a cast.
fn cast_name(name: &str) -> Option<CastName> {
    let cast = match name.to_ascii_lowercase().as_str() {
        "int" | "integer" => CastName::Supported(VariantType::Long),
        "bool" | "boolean" => CastName::Supported(VariantType::Bool),
        "string" => CastName::Supported(VariantType::String),
        "float" | "double" | "real" | "array" | "object" | "unset" | "binary" => {
            CastName::Unsupported
        }
        _ => return None,
    };
    Some(cast)
}

impl Parser {
    pub(crate) fn new(tokens: Vec<Token>) -> Self {
        Self { tokens, pos: 0 }
    }

    fn peek(&self) -> &Token {
        // The lexer always ends the stream with Eof.
        &self.tokens[self.pos.min(self.tokens.len() - 1)]
    }

    fn peek_kind_at(&self, offset: usize) -> Option<&TokenKind> {
        self.tokens.get(self.pos + offset).map(|t| &t.kind)
    }

    fn advance(&mut self) -> Token {
        let tok = self.peek().clone();
        if self.pos < self.tokens.len() - 1 {
            self.pos += 1;
        }
        tok
    }

    fn check(&self, kind: &TokenKind) -> bool {
        &self.peek().kind == kind
    }

    fn eat(&mut self, kind: &TokenKind) -> bool {
        if self.check(kind) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn unexpected(&self, expected: &'static str) -> SyntaxError {
        let tok = self.peek();
        SyntaxError::UnexpectedToken {
            line: tok.line,
            expected,
            found: tok.kind.to_string(),
        }
    }

    fn expect(&mut self, kind: &TokenKind, expected: &'static str) -> Result<Token, SyntaxError> {
        if self.check(kind) {
            Ok(self.advance())
        } else {
            Err(self.unexpected(expected))
        }
    }

    fn skip_tags(&mut self) {
        while matches!(self.peek().kind, TokenKind::OpenTag | TokenKind::CloseTag) {
            self.advance();
        }
    }

    /// `;`, or an implicit terminator before `?>` or end of input.
    fn end_statement(&mut self) -> Result<(), SyntaxError> {
        match self.peek().kind {
            TokenKind::Semicolon => {
                self.advance();
                Ok(())
            }
            TokenKind::CloseTag | TokenKind::Eof => Ok(()),
            _ => Err(self.unexpected("';'")),
        }
    }

    pub(crate) fn program(&mut self) -> Result<Vec<Stmt>, SyntaxError> {
        let mut stmts = Vec::new();
        loop {
            self.skip_tags();
            if self.check(&TokenKind::Eof) {
                return Ok(stmts);
            }
            stmts.push(self.statement()?);
        }
    }

    fn block_body(&mut self) -> Result<Vec<Stmt>, SyntaxError> {
        self.expect(&TokenKind::LBrace, "'{'")?;
        let mut stmts = Vec::new();
        loop {
            self.skip_tags();
            if self.eat(&TokenKind::RBrace) {
                return Ok(stmts);
            }
            if self.check(&TokenKind::Eof) {
                return Err(self.unexpected("'}'"));
            }
            stmts.push(self.statement()?);
        }
    }

    fn statement(&mut self) -> Result<Stmt, SyntaxError> {
        self.skip_tags();
        let line = self.peek().line;
        let kind = match self.peek().kind.clone() {
            TokenKind::Html(text) => {
                self.advance();
                StmtKind::Html(text)
            }
            TokenKind::LBrace => StmtKind::Block(self.block_body()?),
            TokenKind::Semicolon => {
                self.advance();
                StmtKind::Block(Vec::new())
            }
            TokenKind::Echo => {
                self.advance();
                let mut args = vec![self.expression()?];
                while self.eat(&TokenKind::Comma) {
                    args.push(self.expression()?);
                }
                self.end_statement()?;
                StmtKind::Echo(args)
            }
            TokenKind::If => {
                self.advance();
                let cond = self.paren_expression()?;
                let then = Box::new(self.statement()?);
                let else_ = if self.eat(&TokenKind::Else) {
                    Some(Box::new(self.statement()?))
                } else {
                    None
                };
                StmtKind::If { cond, then, else_ }
            }
            TokenKind::While => {
                self.advance();
                let cond = self.paren_expression()?;
                let body = Box::new(self.statement()?);
                StmtKind::While { cond, body }
            }
            TokenKind::For => self.for_statement()?,
            TokenKind::Function => self.function_declaration()?,
            TokenKind::Return => {
                self.advance();
                let value = match self.peek().kind {
                    TokenKind::Semicolon | TokenKind::CloseTag | TokenKind::Eof => None,
                    _ => Some(self.expression()?),
                };
                self.end_statement()?;
                StmtKind::Return(value)
            }
            TokenKind::Const => {
                self.advance();
                let name = self.identifier("constant name")?;
                self.expect(&TokenKind::Assign, "'='")?;
                let value = self.expression()?;
                self.end_statement()?;
                StmtKind::Const { name, value }
            }
            _ => {
                let expr = self.expression()?;
                self.end_statement()?;
                StmtKind::Expr(expr)
            }
        };
        Ok(Stmt::new(kind, line))
    }

    fn identifier(&mut self, expected: &'static str) -> Result<String, SyntaxError> {
        match self.peek().kind.clone() {
            TokenKind::Ident(name) => {
                self.advance();
                Ok(name)
            }
            _ => Err(self.unexpected(expected)),
        }
    }

    fn paren_expression(&mut self) -> Result<Expr, SyntaxError> {
        self.expect(&TokenKind::LParen, "'('")?;
        let expr = self.expression()?;
        self.expect(&TokenKind::RParen, "')'")?;
        Ok(expr)
    }

    fn for_statement(&mut self) -> Result<StmtKind, SyntaxError> {
        self.advance();
        self.expect(&TokenKind::LParen, "'('")?;
        let init = self.optional_expression(&TokenKind::Semicolon)?;
        self.expect(&TokenKind::Semicolon, "';'")?;
        let cond = self.optional_expression(&TokenKind::Semicolon)?;
        self.expect(&TokenKind::Semicolon, "';'")?;
        let step = self.optional_expression(&TokenKind::RParen)?;
        self.expect(&TokenKind::RParen, "')'")?;
        let body = Box::new(self.statement()?);
        Ok(StmtKind::For {
            init,
            cond,
            step,
            body,
        })
    }

    fn optional_expression(&mut self, end: &TokenKind) -> Result<Option<Expr>, SyntaxError> {
        if self.check(end) {
            Ok(None)
        } else {
            self.expression().map(Some)
        }
    }

    fn function_declaration(&mut self) -> Result<StmtKind, SyntaxError> {
        self.advance();
        let name = self.identifier("function name")?;
        self.expect(&TokenKind::LParen, "'('")?;
        let mut params = Vec::new();
        if !self.check(&TokenKind::RParen) {
            loop {
                match self.peek().kind.clone() {
                    TokenKind::Var(param) => {
                        self.advance();
                        params.push(param);
                    }
                    _ => return Err(self.unexpected("parameter")),
                }
                if !self.eat(&TokenKind::Comma) {
                    break;
                }
            }
        }
        self.expect(&TokenKind::RParen, "')'")?;
        let body = self.block_body()?;
        Ok(StmtKind::Function { name, params, body })
    }

    pub(crate) fn expression(&mut self) -> Result<Expr, SyntaxError> {
        let assigns = matches!(self.peek_kind_at(1), Some(TokenKind::Assign));
        if let (TokenKind::Var(name), true) = (self.peek().kind.clone(), assigns) {
            let line = self.advance().line;
            self.advance();
            let value = Box::new(self.expression()?);
            return Ok(Expr::new(ExprKind::Assign { name, value }, line));
        }
        self.binary(0)
    }

    fn binary(&mut self, min_prec: u8) -> Result<Expr, SyntaxError> {
        let mut lhs = self.unary()?;
        while let Some((op, prec)) = binary_op(&self.peek().kind) {
            if prec < min_prec {
                break;
            }
            self.advance();
            let rhs = self.binary(prec + 1)?;
            let line = lhs.line;
            lhs = Expr::new(
                ExprKind::Binary {
                    op,
                    lhs: Box::new(lhs),
                    rhs: Box::new(rhs),
                },
                line,
            );
        }
        Ok(lhs)
    }

    fn unary(&mut self) -> Result<Expr, SyntaxError> {
        let line = self.peek().line;
        match self.peek().kind {
            TokenKind::Bang => {
                self.advance();
                let operand = self.unary()?;
                Ok(Expr::new(ExprKind::Not(Box::new(operand)), line))
            }
            TokenKind::Minus => {
                self.advance();
                let operand = self.unary()?;
                let kind = match operand.kind {
                    ExprKind::Long(n) => ExprKind::Long(n.wrapping_neg()),
                    _ => ExprKind::Binary {
                        op: BinaryOp::Sub,
                        lhs: Box::new(Expr::new(ExprKind::Long(0), line)),
                        rhs: Box::new(operand),
                    },
                };
                Ok(Expr::new(kind, line))
            }
            TokenKind::Plus => {
                self.advance();
                let operand = self.unary()?;
                Ok(Expr::new(
                    ExprKind::Cast {
                        target: VariantType::Long,
                        expr: Box::new(operand),
                    },
                    line,
                ))
            }
            TokenKind::PlusPlus | TokenKind::MinusMinus => {
                let increment = self.advance().kind == TokenKind::PlusPlus;
                match self.peek().kind.clone() {
                    TokenKind::Var(name) => {
                        self.advance();
                        Ok(Expr::new(
                            ExprKind::IncDec {
                                name,
                                increment,
                                prefix: true,
                            },
                            line,
                        ))
                    }
                    _ => Err(SyntaxError::InvalidAssignTarget { line }),
                }
            }
            TokenKind::LParen => {
                let closes = matches!(self.peek_kind_at(2), Some(TokenKind::RParen));
                if let (Some(TokenKind::Ident(name)), true) =
                    (self.peek_kind_at(1).cloned(), closes)
                {
                    if let Some(cast) = cast_name(&name) {
                        let CastName::Supported(target) = cast else {
                            return Err(SyntaxError::UnknownCast { line, name });
                        };
                        self.advance();
                        self.advance();
                        self.advance();
                        let operand = self.unary()?;
                        return Ok(Expr::new(
                            ExprKind::Cast {
                                target,
                                expr: Box::new(operand),
                            },
                            line,
                        ));
                    }
                }
                self.postfix()
            }
            _ => self.postfix(),
        }
    }

    fn postfix(&mut self) -> Result<Expr, SyntaxError> {
        let expr = self.primary()?;
        let increment = match self.peek().kind {
            TokenKind::PlusPlus => true,
            TokenKind::MinusMinus => false,
            _ => return Ok(expr),
        };
        match expr.kind {
            ExprKind::Var(name) => {
                self.advance();
                Ok(Expr::new(
                    ExprKind::IncDec {
                        name,
                        increment,
                        prefix: false,
                    },
                    expr.line,
                ))
            }
            _ => Err(SyntaxError::InvalidAssignTarget {
                line: self.peek().line,
            }),
        }
    }

    fn primary(&mut self) -> Result<Expr, SyntaxError> {
        let line = self.peek().line;
        let kind = match self.peek().kind.clone() {
            TokenKind::Long(n) => ExprKind::Long(n),
            TokenKind::Str(s) => ExprKind::Str(s),
            TokenKind::True => ExprKind::Bool(true),
            TokenKind::False => ExprKind::Bool(false),
            TokenKind::Null => ExprKind::Null,
            TokenKind::Var(name) => ExprKind::Var(name),
            TokenKind::Ident(name) => {
                self.advance();
                if self.check(&TokenKind::LParen) {
                    let args = self.call_arguments()?;
                    return Ok(Expr::new(ExprKind::Call { name, args }, line));
                }
                return Ok(Expr::new(ExprKind::Const(name), line));
            }
            TokenKind::LParen => return self.paren_expression(),
            _ => return Err(self.unexpected("expression")),
        };
        self.advance();
        Ok(Expr::new(kind, line))
    }

    fn call_arguments(&mut self) -> Result<Vec<Expr>, SyntaxError> {
        self.expect(&TokenKind::LParen, "'('")?;
        let mut args = Vec::new();
        if self.eat(&TokenKind::RParen) {
            return Ok(args);
        }
        loop {
            args.push(self.expression()?);
            if !self.eat(&TokenKind::Comma) {
                break;
            }
        }
        self.expect(&TokenKind::RParen, "')'")?;
        Ok(args)
    }
}
