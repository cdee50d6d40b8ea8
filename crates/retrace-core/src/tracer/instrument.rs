// Probe placement over a parsed function body.
//
// Plain statements are followed by a probe; statements that leave the
// current flow (return, break, continue) are preceded by one so they are
// reported before they run. Branches and loop bodies open with a probe
// carrying their header text, which fires once per entry or iteration.
// Marker calls in the replayed statements are removed: a statement that is a
// marker disappears and a marker inside an expression evaluates to
// `undefined`. Function literals are left alone: they are traced when they
// are called with their own marker.

use std::rc::Rc;

use crate::ast::{render_statements, Expr, Span, Stmt, StmtKind};

/// Index of the top-level statement whose marker call sits at `call_span`
pub fn locate_marker(stmts: &[Stmt], surface: &str, call_span: Span) -> Option<usize> {
    stmts.iter().position(|stmt| {
        stmt.marker_call(surface)
            .is_some_and(|call| call.span == call_span)
    })
}

/// Rewrites statement lists with probes
pub struct Instrumenter<'a> {
    surface: &'a str,
    source: &'a str,
}

impl<'a> Instrumenter<'a> {
    /// `source` is the text the statements' spans refer to
    pub fn new(surface: &'a str, source: &'a str) -> Self {
        Self { surface, source }
    }

    pub fn instrument(&self, stmts: &[Stmt]) -> Vec<Stmt> {
        let mut out = Vec::with_capacity(stmts.len() * 2);
        for stmt in stmts {
            self.instrument_stmt(stmt, &mut out);
        }
        out
    }

    fn text(&self, span: Span) -> String {
        span.slice(self.source).trim().to_string()
    }

    fn strip(&self, expr: &Expr) -> Expr {
        expr.without_calls_to(self.surface)
    }

    /// Copy of a non-compound statement with its marker calls removed
    fn stripped(&self, stmt: &Stmt) -> Stmt {
        let kind = match &stmt.kind {
            StmtKind::VarDecl { kind, declarations } => StmtKind::VarDecl {
                kind: *kind,
                declarations: declarations
                    .iter()
                    .map(|(name, init)| (name.clone(), init.as_ref().map(|e| self.strip(e))))
                    .collect(),
            },
            StmtKind::Expression(expr) => StmtKind::Expression(self.strip(expr)),
            StmtKind::Return(expr) => StmtKind::Return(expr.as_ref().map(|e| self.strip(e))),
            StmtKind::Throw(expr) => StmtKind::Throw(self.strip(expr)),
            other => other.clone(),
        };
        Stmt::new(kind, stmt.span)
    }

    fn instrument_stmt(&self, stmt: &Stmt, out: &mut Vec<Stmt>) {
        // A nested marker would start a second replay of the same call
        if stmt.marker_call(self.surface).is_some() {
            return;
        }
        match &stmt.kind {
            StmtKind::Return(_) | StmtKind::Break | StmtKind::Continue => {
                out.push(Stmt::probe(self.text(stmt.span), stmt.span));
                out.push(self.stripped(stmt));
            }
            StmtKind::If {
                condition,
                then_branch,
                else_branch,
                header,
                else_header,
            } => {
                let then_branch = self.entered(self.text(*header), then_branch);
                let else_branch = else_branch.as_ref().map(|branch| {
                    if matches!(branch.kind, StmtKind::If { .. }) {
                        // `else if` is announced by the nested header alone
                        let mut stmts = Vec::with_capacity(1);
                        self.instrument_stmt(branch, &mut stmts);
                        return Box::new(Stmt::block(stmts, branch.span));
                    }
                    let text = else_header
                        .map(|span| self.text(span))
                        .unwrap_or_else(|| "else".to_string());
                    self.entered(text, branch)
                });
                out.push(Stmt::new(
                    StmtKind::If {
                        condition: self.strip(condition),
                        then_branch,
                        else_branch,
                        header: *header,
                        else_header: *else_header,
                    },
                    stmt.span,
                ));
            }
            StmtKind::For {
                init,
                condition,
                update,
                body,
                header,
            } => out.push(Stmt::new(
                StmtKind::For {
                    init: init.as_ref().map(|init| Box::new(self.stripped(init))),
                    condition: condition.as_ref().map(|e| self.strip(e)),
                    update: update.as_ref().map(|e| self.strip(e)),
                    body: self.entered(self.text(*header), body),
                    header: *header,
                },
                stmt.span,
            )),
            StmtKind::While {
                condition,
                body,
                header,
            } => out.push(Stmt::new(
                StmtKind::While {
                    condition: self.strip(condition),
                    body: self.entered(self.text(*header), body),
                    header: *header,
                },
                stmt.span,
            )),
            StmtKind::DoWhile {
                body,
                condition,
                header,
            } => out.push(Stmt::new(
                StmtKind::DoWhile {
                    body: self.entered(self.text(*header), body),
                    condition: self.strip(condition),
                    header: *header,
                },
                stmt.span,
            )),
            StmtKind::Block(stmts) => out.push(Stmt::block(self.instrument(stmts), stmt.span)),
            StmtKind::Empty | StmtKind::Probe { .. } => out.push(stmt.clone()),
            StmtKind::VarDecl { .. }
            | StmtKind::Expression(_)
            | StmtKind::Function(_)
            | StmtKind::Throw(_) => {
                out.push(self.stripped(stmt));
                out.push(Stmt::probe(self.text(stmt.span), stmt.span));
            }
        }
    }

    /// A branch or loop body that announces itself when entered
    fn entered(&self, header_text: String, branch: &Stmt) -> Box<Stmt> {
        let mut stmts = vec![Stmt::probe(header_text, branch.span)];
        match &branch.kind {
            StmtKind::Block(inner) => {
                for stmt in inner {
                    self.instrument_stmt(stmt, &mut stmts);
                }
            }
            _ => self.instrument_stmt(branch, &mut stmts),
        }
        Box::new(Stmt::block(stmts, branch.span))
    }
}

/// Probe-instrumented statements ready for replay
#[derive(Debug, Clone)]
pub struct InstrumentedBody {
    pub function: String,
    pub statements: Vec<Stmt>,
    source: Rc<str>,
}

impl InstrumentedBody {
    pub fn new(function: impl Into<String>, statements: Vec<Stmt>, source: Rc<str>) -> Self {
        Self {
            function: function.into(),
            statements,
            source,
        }
    }

    /// Number of probes, counting nested ones
    pub fn probe_count(&self) -> usize {
        fn count(stmt: &Stmt) -> usize {
            match &stmt.kind {
                StmtKind::Probe { .. } => 1,
                StmtKind::Block(stmts) => stmts.iter().map(count).sum(),
                StmtKind::If {
                    then_branch,
                    else_branch,
                    ..
                } => count(then_branch) + else_branch.as_deref().map_or(0, count),
                StmtKind::For { body, .. }
                | StmtKind::While { body, .. }
                | StmtKind::DoWhile { body, .. } => count(body),
                _ => 0,
            }
        }
        self.statements.iter().map(count).sum()
    }

    /// Readable listing of the instrumented statements
    pub fn render(&self) -> String {
        render_statements(&self.statements, &self.source)
    }
}
