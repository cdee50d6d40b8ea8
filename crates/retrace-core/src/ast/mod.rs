// Syntax tree for the traced script language.
// Spans are absolute byte offsets into the source text a function came from,
// so statement text can always be recovered from the owning source.

use std::{fmt, rc::Rc};

pub mod source_gen;
pub use source_gen::render_statements;

/// Byte range into a source text
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

impl Span {
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    /// Span covering `self` through the end of `other`
    pub fn to(self, other: Span) -> Span {
        Span::new(self.start, other.end.max(self.end))
    }

    pub fn contains(&self, other: Span) -> bool {
        self.start <= other.start && other.end <= self.end
    }

    /// The text under this span, or an empty string if it falls outside `source`
    pub fn slice<'a>(&self, source: &'a str) -> &'a str {
        source.get(self.start..self.end).unwrap_or("")
    }
}

/// Binary operators, in no particular precedence order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Subtract,
    Multiply,
    Divide,
    Modulo,
    Equal,
    NotEqual,
    StrictEqual,
    StrictNotEqual,
    LessThan,
    LessEqual,
    GreaterThan,
    GreaterEqual,
    And,
    Or,
}

impl BinaryOp {
    /// Comparison operators turn a watch expression into an assertion
    pub fn is_comparison(self) -> bool {
        matches!(
            self,
            BinaryOp::Equal
                | BinaryOp::NotEqual
                | BinaryOp::StrictEqual
                | BinaryOp::StrictNotEqual
                | BinaryOp::LessThan
                | BinaryOp::LessEqual
                | BinaryOp::GreaterThan
                | BinaryOp::GreaterEqual
        )
    }

    pub fn symbol(self) -> &'static str {
        match self {
            BinaryOp::Add => "+",
            BinaryOp::Subtract => "-",
            BinaryOp::Multiply => "*",
            BinaryOp::Divide => "/",
            BinaryOp::Modulo => "%",
            BinaryOp::Equal => "==",
            BinaryOp::NotEqual => "!=",
            BinaryOp::StrictEqual => "===",
            BinaryOp::StrictNotEqual => "!==",
            BinaryOp::LessThan => "<",
            BinaryOp::LessEqual => "<=",
            BinaryOp::GreaterThan => ">",
            BinaryOp::GreaterEqual => ">=",
            BinaryOp::And => "&&",
            BinaryOp::Or => "||",
        }
    }
}

impl fmt::Display for BinaryOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Not,
    Negate,
    Plus,
    TypeOf,
}

/// Assignment operators; compound forms map onto a binary operator
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssignOp {
    Assign,
    Add,
    Subtract,
    Multiply,
    Divide,
    Modulo,
}

impl AssignOp {
    pub fn binary(self) -> Option<BinaryOp> {
        match self {
            AssignOp::Assign => None,
            AssignOp::Add => Some(BinaryOp::Add),
            AssignOp::Subtract => Some(BinaryOp::Subtract),
            AssignOp::Multiply => Some(BinaryOp::Multiply),
            AssignOp::Divide => Some(BinaryOp::Divide),
            AssignOp::Modulo => Some(BinaryOp::Modulo),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateOp {
    Increment,
    Decrement,
}

/// Declaration keyword; all three are function-scoped in this language
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeclKind {
    Var,
    Let,
    Const,
}

/// A function declaration or function expression
#[derive(Debug, Clone, PartialEq)]
pub struct FunctionDecl {
    pub name: Option<String>,
    pub params: Vec<String>,
    pub body: Vec<Stmt>,
    /// Covers `function` through the closing brace
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Expr {
    pub kind: ExprKind,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ExprKind {
    // Literals
    Number(f64),
    String(String),
    Boolean(bool),
    Null,
    Undefined,

    // References
    Identifier(String),
    This,

    // Composite literals
    Array(Vec<Expr>),
    Object(Vec<(String, Expr)>),
    Function(Rc<FunctionDecl>),

    // Operators
    Unary {
        op: UnaryOp,
        operand: Box<Expr>,
    },
    Binary {
        op: BinaryOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },
    Assign {
        op: AssignOp,
        target: Box<Expr>,
        value: Box<Expr>,
    },
    Update {
        op: UpdateOp,
        prefix: bool,
        target: Box<Expr>,
    },
    Conditional {
        condition: Box<Expr>,
        then_expr: Box<Expr>,
        else_expr: Box<Expr>,
    },

    // Access and calls
    Call {
        callee: Box<Expr>,
        args: Vec<Expr>,
    },
    Member {
        object: Box<Expr>,
        property: String,
    },
    Index {
        object: Box<Expr>,
        index: Box<Expr>,
    },
}

impl Expr {
    pub fn new(kind: ExprKind, span: Span) -> Self {
        Self { kind, span }
    }

    /// True if this is `name(...)` with `name` written as a bare identifier
    pub fn is_direct_call_to(&self, name: &str) -> bool {
        match &self.kind {
            ExprKind::Call { callee, .. } => {
                matches!(&callee.kind, ExprKind::Identifier(id) if id == name)
            }
            _ => false,
        }
    }

    /// True if a comparison operator appears anywhere in the expression.
    /// Function literal bodies are not searched.
    pub fn contains_comparison(&self) -> bool {
        match &self.kind {
            ExprKind::Binary { op, left, right } => {
                op.is_comparison() || left.contains_comparison() || right.contains_comparison()
            }
            ExprKind::Unary { operand, .. } => operand.contains_comparison(),
            ExprKind::Assign { target, value, .. } => {
                target.contains_comparison() || value.contains_comparison()
            }
            ExprKind::Update { target, .. } => target.contains_comparison(),
            ExprKind::Conditional {
                condition,
                then_expr,
                else_expr,
            } => {
                condition.contains_comparison()
                    || then_expr.contains_comparison()
                    || else_expr.contains_comparison()
            }
            ExprKind::Call { callee, args } => {
                callee.contains_comparison() || args.iter().any(Expr::contains_comparison)
            }
            ExprKind::Member { object, .. } => object.contains_comparison(),
            ExprKind::Index { object, index } => {
                object.contains_comparison() || index.contains_comparison()
            }
            ExprKind::Array(items) => items.iter().any(Expr::contains_comparison),
            ExprKind::Object(entries) => entries.iter().any(|(_, e)| e.contains_comparison()),
            _ => false,
        }
    }

    /// Copy of the expression with every direct `name(...)` call replaced by
    /// `undefined`. Function literal bodies are left as they are.
    pub fn without_calls_to(&self, name: &str) -> Expr {
        if self.is_direct_call_to(name) {
            return Expr::new(ExprKind::Undefined, self.span);
        }
        let strip = |expr: &Expr| Box::new(expr.without_calls_to(name));
        let kind = match &self.kind {
            ExprKind::Array(items) => {
                ExprKind::Array(items.iter().map(|e| e.without_calls_to(name)).collect())
            }
            ExprKind::Object(entries) => ExprKind::Object(
                entries
                    .iter()
                    .map(|(key, e)| (key.clone(), e.without_calls_to(name)))
                    .collect(),
            ),
            ExprKind::Unary { op, operand } => ExprKind::Unary {
                op: *op,
                operand: strip(operand),
            },
            ExprKind::Binary { op, left, right } => ExprKind::Binary {
                op: *op,
                left: strip(left),
                right: strip(right),
            },
            ExprKind::Assign { op, target, value } => ExprKind::Assign {
                op: *op,
                target: strip(target),
                value: strip(value),
            },
            ExprKind::Update { op, prefix, target } => ExprKind::Update {
                op: *op,
                prefix: *prefix,
                target: strip(target),
            },
            ExprKind::Conditional {
                condition,
                then_expr,
                else_expr,
            } => ExprKind::Conditional {
                condition: strip(condition),
                then_expr: strip(then_expr),
                else_expr: strip(else_expr),
            },
            ExprKind::Call { callee, args } => ExprKind::Call {
                callee: strip(callee),
                args: args.iter().map(|e| e.without_calls_to(name)).collect(),
            },
            ExprKind::Member { object, property } => ExprKind::Member {
                object: strip(object),
                property: property.clone(),
            },
            ExprKind::Index { object, index } => ExprKind::Index {
                object: strip(object),
                index: strip(index),
            },
            other => other.clone(),
        };
        Expr::new(kind, self.span)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Stmt {
    pub kind: StmtKind,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub enum StmtKind {
    VarDecl {
        kind: DeclKind,
        declarations: Vec<(String, Option<Expr>)>,
    },
    Expression(Expr),
    Function(Rc<FunctionDecl>),
    Return(Option<Expr>),
    Break,
    Continue,
    Throw(Expr),
    Block(Vec<Stmt>),
    If {
        condition: Expr,
        then_branch: Box<Stmt>,
        else_branch: Option<Box<Stmt>>,
        /// `if (...) {`
        header: Span,
        /// `} else {`
        else_header: Option<Span>,
    },
    For {
        init: Option<Box<Stmt>>,
        condition: Option<Expr>,
        update: Option<Expr>,
        body: Box<Stmt>,
        header: Span,
    },
    While {
        condition: Expr,
        body: Box<Stmt>,
        header: Span,
    },
    DoWhile {
        body: Box<Stmt>,
        condition: Expr,
        header: Span,
    },
    Empty,
    /// Injected log point; only produced by the instrumenter
    Probe { text: String },
}

impl Stmt {
    pub fn new(kind: StmtKind, span: Span) -> Self {
        Self { kind, span }
    }

    pub fn probe(text: impl Into<String>, span: Span) -> Self {
        Self::new(StmtKind::Probe { text: text.into() }, span)
    }

    /// Wrap a statement list into a block statement spanning `span`
    pub fn block(stmts: Vec<Stmt>, span: Span) -> Self {
        Self::new(StmtKind::Block(stmts), span)
    }

    /// The call expression of a `name(...)` or `return name(...)` statement
    pub fn marker_call(&self, surface: &str) -> Option<&Expr> {
        let expr = match &self.kind {
            StmtKind::Expression(expr) => expr,
            StmtKind::Return(Some(expr)) => expr,
            _ => return None,
        };
        expr.is_direct_call_to(surface).then_some(expr)
    }
}
