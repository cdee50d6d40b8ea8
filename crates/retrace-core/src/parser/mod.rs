// Statement-level parser for the traced script language.
//
// Hand-written recursive descent over the token stream from `lexer`. Only the
// grammar subset the tracer understands is accepted; everything else is a
// positioned `ParseError` rather than a silent mis-instrumentation.

use std::rc::Rc;

use thiserror::Error;

use crate::ast::{
    AssignOp, BinaryOp, DeclKind, Expr, ExprKind, FunctionDecl, Span, Stmt, StmtKind, UnaryOp,
    UpdateOp,
};

pub mod lexer;

use lexer::{tokenize, Lexed, Tok};


/// Syntax error with a 1-based position in the parsed text
#[derive(Error, Debug, Clone, PartialEq)]
#[error("Syntax error at line {line}, column {column}: {message}")]
pub struct ParseError {
    pub message: String,
    pub line: usize,
    pub column: usize,
}

impl ParseError {
    /// Create an error at byte `offset` of `text`
    pub fn at(text: &str, offset: usize, message: impl Into<String>) -> Self {
        let (line, column) = line_column(text, offset);
        Self {
            message: message.into(),
            line,
            column,
        }
    }
}

/// 1-based line and column of byte `offset` in `text`
pub fn line_column(text: &str, offset: usize) -> (usize, usize) {
    let before = text.get(..offset.min(text.len())).unwrap_or(text);
    let line = before.matches('\n').count() + 1;
    let column = match before.rfind('\n') {
        Some(nl) => before[nl + 1..].chars().count(),
        None => before.chars().count(),
    } + 1;
    (line, column)
}

/// Parse a whole program
pub fn parse_program(source: &str) -> Result<Vec<Stmt>, ParseError> {
    parse_body(source, 0)
}

/// Parse a statement list cut out of a larger source at byte `base`.
/// Spans in the result are absolute with respect to that larger source.
pub fn parse_body(text: &str, base: usize) -> Result<Vec<Stmt>, ParseError> {
    let mut parser = StatementParser::new(text, base)?;
    let mut stmts = Vec::new();
    while !parser.at_end() {
        stmts.push(parser.statement()?);
    }
    Ok(stmts)
}

/// Parse a single expression, e.g. a watch expression
pub fn parse_expression(text: &str) -> Result<Expr, ParseError> {
    let mut parser = StatementParser::new(text, 0)?;
    if parser.at_end() {
        return Err(ParseError::at(text, 0, "empty expression"));
    }
    let expr = parser.expression()?;
    parser.eat(&Tok::Semicolon);
    if !parser.at_end() {
        return Err(parser.error_here("unexpected input after expression"));
    }
    Ok(expr)
}

struct StatementParser<'src> {
    text: &'src str,
    base: usize,
    tokens: Vec<Lexed>,
    pos: usize,
}

impl<'src> StatementParser<'src> {
    fn new(text: &'src str, base: usize) -> Result<Self, ParseError> {
        Ok(Self {
            text,
            base,
            tokens: tokenize(text, base)?,
            pos: 0,
        })
    }

    // ---- token plumbing -------------------------------------------------

    fn at_end(&self) -> bool {
        self.pos >= self.tokens.len()
    }

    fn peek(&self) -> Option<&Tok> {
        self.tokens.get(self.pos).map(|lexed| &lexed.tok)
    }

    fn peek_nth(&self, n: usize) -> Option<&Tok> {
        self.tokens.get(self.pos + n).map(|lexed| &lexed.tok)
    }

    fn check(&self, tok: &Tok) -> bool {
        self.peek() == Some(tok)
    }

    fn current_span(&self) -> Span {
        match self.tokens.get(self.pos) {
            Some(lexed) => lexed.span,
            None => {
                let end = self.base + self.text.len();
                Span::new(end, end)
            }
        }
    }

    fn previous_span(&self) -> Span {
        self.pos
            .checked_sub(1)
            .and_then(|i| self.tokens.get(i))
            .map(|lexed| lexed.span)
            .unwrap_or_else(|| Span::new(self.base, self.base))
    }

    fn advance(&mut self) -> Option<Lexed> {
        let lexed = self.tokens.get(self.pos).cloned();
        if lexed.is_some() {
            self.pos += 1;
        }
        lexed
    }

    fn eat(&mut self, tok: &Tok) -> Option<Span> {
        if self.check(tok) {
            self.advance().map(|lexed| lexed.span)
        } else {
            None
        }
    }

    fn expect(&mut self, tok: &Tok, what: &str) -> Result<Span, ParseError> {
        self.eat(tok)
            .ok_or_else(|| self.error_here(&format!("expected {what}")))
    }

    fn expect_ident(&mut self, what: &str) -> Result<(String, Span), ParseError> {
        match self.peek() {
            Some(Tok::Ident(_)) => match self.advance() {
                Some(Lexed {
                    tok: Tok::Ident(name),
                    span,
                }) => Ok((name, span)),
                _ => Err(self.error_here(&format!("expected {what}"))),
            },
            _ => Err(self.error_here(&format!("expected {what}"))),
        }
    }

    fn error_here(&self, message: &str) -> ParseError {
        let span = self.current_span();
        let found = match self.peek() {
            Some(tok) => format!("{tok:?}"),
            None => "end of input".to_string(),
        };
        ParseError::at(
            self.text,
            span.start - self.base,
            format!("{message}, found {found}"),
        )
    }

    /// Statement terminator: optional, but consumed into the span when present
    fn end_statement(&mut self, start: Span) -> Span {
        self.eat(&Tok::Semicolon);
        start.to(self.previous_span())
    }

    // ---- statements -----------------------------------------------------

    fn statement(&mut self) -> Result<Stmt, ParseError> {
        let start = self.current_span();
        match self.peek() {
            Some(Tok::LBrace) => self.block(),
            Some(Tok::Var | Tok::Let | Tok::Const) => {
                let kind = self.var_declaration()?;
                let span = self.end_statement(start);
                Ok(Stmt::new(kind, span))
            }
            Some(Tok::Function) if matches!(self.peek_nth(1), Some(Tok::Ident(_))) => {
                let decl = self.function()?;
                let span = decl.span;
                Ok(Stmt::new(StmtKind::Function(Rc::new(decl)), span))
            }
            Some(Tok::Return) => {
                self.advance();
                let value = match self.peek() {
                    None | Some(Tok::Semicolon | Tok::RBrace) => None,
                    Some(_) => Some(self.expression()?),
                };
                let span = self.end_statement(start);
                Ok(Stmt::new(StmtKind::Return(value), span))
            }
            Some(Tok::Break) => {
                self.advance();
                let span = self.end_statement(start);
                Ok(Stmt::new(StmtKind::Break, span))
            }
            Some(Tok::Continue) => {
                self.advance();
                let span = self.end_statement(start);
                Ok(Stmt::new(StmtKind::Continue, span))
            }
            Some(Tok::Throw) => {
                self.advance();
                let value = self.expression()?;
                let span = self.end_statement(start);
                Ok(Stmt::new(StmtKind::Throw(value), span))
            }
            Some(Tok::If) => self.if_statement(),
            Some(Tok::For) => self.for_statement(),
            Some(Tok::While) => self.while_statement(),
            Some(Tok::Do) => self.do_statement(),
            Some(Tok::Semicolon) => {
                self.advance();
                Ok(Stmt::new(StmtKind::Empty, start))
            }
            Some(_) => {
                let expr = self.expression()?;
                let span = self.end_statement(start);
                Ok(Stmt::new(StmtKind::Expression(expr), span))
            }
            None => Err(self.error_here("expected statement")),
        }
    }

    fn block(&mut self) -> Result<Stmt, ParseError> {
        let open = self.expect(&Tok::LBrace, "`{`")?;
        let mut stmts = Vec::new();
        while !self.check(&Tok::RBrace) {
            if self.at_end() {
                return Err(self.error_here("unterminated block"));
            }
            stmts.push(self.statement()?);
        }
        let close = self.expect(&Tok::RBrace, "`}`")?;
        Ok(Stmt::block(stmts, open.to(close)))
    }

    /// `var a = 1, b` without the terminator
    fn var_declaration(&mut self) -> Result<StmtKind, ParseError> {
        let kind = match self.advance().map(|lexed| lexed.tok) {
            Some(Tok::Let) => DeclKind::Let,
            Some(Tok::Const) => DeclKind::Const,
            _ => DeclKind::Var,
        };
        let mut declarations = Vec::new();
        loop {
            let (name, _) = self.expect_ident("variable name")?;
            let init = if self.eat(&Tok::Assign).is_some() {
                Some(self.assignment()?)
            } else {
                None
            };
            declarations.push((name, init));
            if self.eat(&Tok::Comma).is_none() {
                break;
            }
        }
        Ok(StmtKind::VarDecl { kind, declarations })
    }

    /// Header span runs from `start` through the body's `{` when the body is a
    /// block, otherwise through the last header token.
    fn header_span(&self, start: Span) -> Span {
        if self.check(&Tok::LBrace) {
            start.to(self.current_span())
        } else {
            start.to(self.previous_span())
        }
    }

    fn parenthesized(&mut self) -> Result<Expr, ParseError> {
        self.expect(&Tok::LParen, "`(`")?;
        let expr = self.expression()?;
        self.expect(&Tok::RParen, "`)`")?;
        Ok(expr)
    }

    fn if_statement(&mut self) -> Result<Stmt, ParseError> {
        let start = self.expect(&Tok::If, "`if`")?;
        let condition = self.parenthesized()?;
        let header = self.header_span(start);
        let then_branch = self.statement()?;

        let (else_branch, else_header) = if self.check(&Tok::Else) {
            let else_kw = self.current_span();
            let rejoin = match &then_branch.kind {
                StmtKind::Block(_) => Span::new(then_branch.span.end - 1, then_branch.span.end),
                _ => else_kw,
            };
            self.advance();
            let else_header = self.header_span(rejoin);
            let branch = self.statement()?;
            (Some(Box::new(branch)), Some(else_header))
        } else {
            (None, None)
        };

        let span = start.to(self.previous_span());
        Ok(Stmt::new(
            StmtKind::If {
                condition,
                then_branch: Box::new(then_branch),
                else_branch,
                header,
                else_header,
            },
            span,
        ))
    }

    fn for_statement(&mut self) -> Result<Stmt, ParseError> {
        let start = self.expect(&Tok::For, "`for`")?;
        self.expect(&Tok::LParen, "`(`")?;

        let init = match self.peek() {
            Some(Tok::Semicolon) => None,
            Some(Tok::Var | Tok::Let | Tok::Const) => {
                let init_start = self.current_span();
                let kind = self.var_declaration()?;
                Some(Box::new(Stmt::new(kind, init_start.to(self.previous_span()))))
            }
            _ => {
                let expr = self.expression()?;
                let span = expr.span;
                Some(Box::new(Stmt::new(StmtKind::Expression(expr), span)))
            }
        };
        self.expect(&Tok::Semicolon, "`;` after for-loop initializer")?;

        let condition = if self.check(&Tok::Semicolon) {
            None
        } else {
            Some(self.expression()?)
        };
        self.expect(&Tok::Semicolon, "`;` after for-loop condition")?;

        let update = if self.check(&Tok::RParen) {
            None
        } else {
            Some(self.expression()?)
        };
        self.expect(&Tok::RParen, "`)`")?;

        let header = self.header_span(start);
        let body = self.statement()?;
        let span = start.to(self.previous_span());
        Ok(Stmt::new(
            StmtKind::For {
                init,
                condition,
                update,
                body: Box::new(body),
                header,
            },
            span,
        ))
    }

    fn while_statement(&mut self) -> Result<Stmt, ParseError> {
        let start = self.expect(&Tok::While, "`while`")?;
        let condition = self.parenthesized()?;
        let header = self.header_span(start);
        let body = self.statement()?;
        let span = start.to(self.previous_span());
        Ok(Stmt::new(
            StmtKind::While {
                condition,
                body: Box::new(body),
                header,
            },
            span,
        ))
    }

    fn do_statement(&mut self) -> Result<Stmt, ParseError> {
        let start = self.expect(&Tok::Do, "`do`")?;
        let header = self.header_span(start);
        let body = self.statement()?;
        self.expect(&Tok::While, "`while` after do-block")?;
        let condition = self.parenthesized()?;
        let span = self.end_statement(start);
        Ok(Stmt::new(
            StmtKind::DoWhile {
                body: Box::new(body),
                condition,
                header,
            },
            span,
        ))
    }

    fn function(&mut self) -> Result<FunctionDecl, ParseError> {
        let start = self.expect(&Tok::Function, "`function`")?;
        let name = match self.peek() {
            Some(Tok::Ident(_)) => Some(self.expect_ident("function name")?.0),
            _ => None,
        };
        self.expect(&Tok::LParen, "`(`")?;
        let mut params = Vec::new();
        if !self.check(&Tok::RParen) {
            loop {
                params.push(self.expect_ident("parameter name")?.0);
                if self.eat(&Tok::Comma).is_none() {
                    break;
                }
            }
        }
        self.expect(&Tok::RParen, "`)`")?;
        let body = match self.block()? {
            Stmt {
                kind: StmtKind::Block(stmts),
                ..
            } => stmts,
            _ => Vec::new(),
        };
        Ok(FunctionDecl {
            name,
            params,
            body,
            span: start.to(self.previous_span()),
        })
    }

    // ---- expressions ----------------------------------------------------

    fn expression(&mut self) -> Result<Expr, ParseError> {
        self.assignment()
    }

    fn assignment(&mut self) -> Result<Expr, ParseError> {
        let target = self.conditional()?;
        let op = match self.peek() {
            Some(Tok::Assign) => AssignOp::Assign,
            Some(Tok::PlusAssign) => AssignOp::Add,
            Some(Tok::MinusAssign) => AssignOp::Subtract,
            Some(Tok::StarAssign) => AssignOp::Multiply,
            Some(Tok::SlashAssign) => AssignOp::Divide,
            Some(Tok::PercentAssign) => AssignOp::Modulo,
            _ => return Ok(target),
        };
        if !is_assignable(&target) {
            return Err(self.error_here("invalid assignment target"));
        }
        self.advance();
        let value = self.assignment()?;
        let span = target.span.to(value.span);
        Ok(Expr::new(
            ExprKind::Assign {
                op,
                target: Box::new(target),
                value: Box::new(value),
            },
            span,
        ))
    }

    fn conditional(&mut self) -> Result<Expr, ParseError> {
        let condition = self.binary(0)?;
        if self.eat(&Tok::Question).is_none() {
            return Ok(condition);
        }
        let then_expr = self.assignment()?;
        self.expect(&Tok::Colon, "`:` in conditional expression")?;
        let else_expr = self.assignment()?;
        let span = condition.span.to(else_expr.span);
        Ok(Expr::new(
            ExprKind::Conditional {
                condition: Box::new(condition),
                then_expr: Box::new(then_expr),
                else_expr: Box::new(else_expr),
            },
            span,
        ))
    }

    /// Precedence climbing over the binary operator table
    fn binary(&mut self, min_level: usize) -> Result<Expr, ParseError> {
        let mut left = self.unary()?;
        loop {
            let Some((op, level)) = self.peek().and_then(binary_operator) else {
                break;
            };
            if level < min_level {
                break;
            }
            self.advance();
            let right = self.binary(level + 1)?;
            let span = left.span.to(right.span);
            left = Expr::new(
                ExprKind::Binary {
                    op,
                    left: Box::new(left),
                    right: Box::new(right),
                },
                span,
            );
        }
        Ok(left)
    }

    fn unary(&mut self) -> Result<Expr, ParseError> {
        let start = self.current_span();
        let op = match self.peek() {
            Some(Tok::Bang) => Some(UnaryOp::Not),
            Some(Tok::Minus) => Some(UnaryOp::Negate),
            Some(Tok::Plus) => Some(UnaryOp::Plus),
            Some(Tok::TypeOf) => Some(UnaryOp::TypeOf),
            _ => None,
        };
        if let Some(op) = op {
            self.advance();
            let operand = self.unary()?;
            let span = start.to(operand.span);
            return Ok(Expr::new(
                ExprKind::Unary {
                    op,
                    operand: Box::new(operand),
                },
                span,
            ));
        }

        let update = match self.peek() {
            Some(Tok::PlusPlus) => Some(UpdateOp::Increment),
            Some(Tok::MinusMinus) => Some(UpdateOp::Decrement),
            _ => None,
        };
        if let Some(op) = update {
            self.advance();
            let target = self.unary()?;
            if !is_assignable(&target) {
                return Err(ParseError::at(
                    self.text,
                    target.span.start - self.base,
                    "invalid update target",
                ));
            }
            let span = start.to(target.span);
            return Ok(Expr::new(
                ExprKind::Update {
                    op,
                    prefix: true,
                    target: Box::new(target),
                },
                span,
            ));
        }

        self.postfix()
    }

    fn postfix(&mut self) -> Result<Expr, ParseError> {
        let mut expr = self.primary()?;
        loop {
            match self.peek() {
                Some(Tok::LParen) => {
                    self.advance();
                    let args = self.arguments(&Tok::RParen)?;
                    let span = expr.span.to(self.previous_span());
                    expr = Expr::new(
                        ExprKind::Call {
                            callee: Box::new(expr),
                            args,
                        },
                        span,
                    );
                }
                Some(Tok::Dot) => {
                    self.advance();
                    let (property, prop_span) = self.expect_ident("property name")?;
                    let span = expr.span.to(prop_span);
                    expr = Expr::new(
                        ExprKind::Member {
                            object: Box::new(expr),
                            property,
                        },
                        span,
                    );
                }
                Some(Tok::LBracket) => {
                    self.advance();
                    let index = self.expression()?;
                    let close = self.expect(&Tok::RBracket, "`]`")?;
                    let span = expr.span.to(close);
                    expr = Expr::new(
                        ExprKind::Index {
                            object: Box::new(expr),
                            index: Box::new(index),
                        },
                        span,
                    );
                }
                Some(Tok::PlusPlus | Tok::MinusMinus) if is_assignable(&expr) => {
                    let op = match self.advance().map(|lexed| lexed.tok) {
                        Some(Tok::PlusPlus) => UpdateOp::Increment,
                        _ => UpdateOp::Decrement,
                    };
                    let span = expr.span.to(self.previous_span());
                    return Ok(Expr::new(
                        ExprKind::Update {
                            op,
                            prefix: false,
                            target: Box::new(expr),
                        },
                        span,
                    ));
                }
                _ => return Ok(expr),
            }
        }
    }

    /// Comma-separated expressions up to `close`; trailing comma allowed
    fn arguments(&mut self, close: &Tok) -> Result<Vec<Expr>, ParseError> {
        let mut items = Vec::new();
        while !self.check(close) {
            items.push(self.assignment()?);
            if self.eat(&Tok::Comma).is_none() {
                break;
            }
        }
        self.expect(close, &format!("{close:?}"))?;
        Ok(items)
    }

    fn primary(&mut self) -> Result<Expr, ParseError> {
        let start = self.current_span();
        let kind = match self.peek() {
            Some(Tok::Function) => {
                let decl = self.function()?;
                let span = decl.span;
                return Ok(Expr::new(ExprKind::Function(Rc::new(decl)), span));
            }
            Some(Tok::LParen) => {
                self.advance();
                let mut inner = self.expression()?;
                let close = self.expect(&Tok::RParen, "`)`")?;
                inner.span = start.to(close);
                return Ok(inner);
            }
            Some(Tok::LBracket) => {
                self.advance();
                let items = self.arguments(&Tok::RBracket)?;
                return Ok(Expr::new(
                    ExprKind::Array(items),
                    start.to(self.previous_span()),
                ));
            }
            Some(Tok::LBrace) => return self.object_literal(),
            Some(Tok::Number(n)) => ExprKind::Number(*n),
            Some(Tok::Str(s)) => ExprKind::String(s.clone()),
            Some(Tok::True) => ExprKind::Boolean(true),
            Some(Tok::False) => ExprKind::Boolean(false),
            Some(Tok::Null) => ExprKind::Null,
            Some(Tok::Undefined) => ExprKind::Undefined,
            Some(Tok::This) => ExprKind::This,
            Some(Tok::Ident(name)) => ExprKind::Identifier(name.clone()),
            _ => return Err(self.error_here("expected expression")),
        };
        self.advance();
        Ok(Expr::new(kind, start))
    }

    fn object_literal(&mut self) -> Result<Expr, ParseError> {
        let open = self.expect(&Tok::LBrace, "`{`")?;
        let mut entries = Vec::new();
        while !self.check(&Tok::RBrace) {
            let key = match self.peek() {
                Some(Tok::Ident(name) | Tok::Str(name)) => name.clone(),
                Some(Tok::Number(n)) => crate::evaluator::value::format_number(*n),
                _ => return Err(self.error_here("expected property key")),
            };
            self.advance();
            self.expect(&Tok::Colon, "`:` after property key")?;
            entries.push((key, self.assignment()?));
            if self.eat(&Tok::Comma).is_none() {
                break;
            }
        }
        let close = self.expect(&Tok::RBrace, "`}`")?;
        Ok(Expr::new(ExprKind::Object(entries), open.to(close)))
    }
}

fn is_assignable(expr: &Expr) -> bool {
    matches!(
        expr.kind,
        ExprKind::Identifier(_) | ExprKind::Member { .. } | ExprKind::Index { .. }
    )
}

/// Operator and precedence level (higher binds tighter)
fn binary_operator(tok: &Tok) -> Option<(BinaryOp, usize)> {
    let entry = match tok {
        Tok::OrOr => (BinaryOp::Or, 0),
        Tok::AndAnd => (BinaryOp::And, 1),
        Tok::EqEq => (BinaryOp::Equal, 2),
        Tok::BangEq => (BinaryOp::NotEqual, 2),
        Tok::EqEqEq => (BinaryOp::StrictEqual, 2),
        Tok::BangEqEq => (BinaryOp::StrictNotEqual, 2),
        Tok::Less => (BinaryOp::LessThan, 3),
        Tok::LessEq => (BinaryOp::LessEqual, 3),
        Tok::Greater => (BinaryOp::GreaterThan, 3),
        Tok::GreaterEq => (BinaryOp::GreaterEqual, 3),
        Tok::Plus => (BinaryOp::Add, 4),
        Tok::Minus => (BinaryOp::Subtract, 4),
        Tok::Star => (BinaryOp::Multiply, 5),
        Tok::Slash => (BinaryOp::Divide, 5),
        Tok::Percent => (BinaryOp::Modulo, 5),
        _ => return None,
    };
    Some(entry)
}
