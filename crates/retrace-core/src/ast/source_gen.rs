// Source listing for (possibly instrumented) statement trees.
// Original statements are reproduced from their source text; injected probes
// are shown as the log calls they stand for.

use super::{Stmt, StmtKind};

const INDENT: &str = "    ";

/// Render a statement list as readable source, one statement per line
pub fn render_statements(stmts: &[Stmt], source: &str) -> String {
    let mut out = String::new();
    for stmt in stmts {
        render_stmt(stmt, source, 0, &mut out);
    }
    out
}

fn push_line(out: &mut String, depth: usize, text: &str) {
    for _ in 0..depth {
        out.push_str(INDENT);
    }
    out.push_str(text);
    out.push('\n');
}

fn open_header(text: &str) -> String {
    let trimmed = text.trim();
    if trimmed.ends_with('{') {
        trimmed.to_string()
    } else {
        format!("{trimmed} {{")
    }
}

fn else_header(text: &str) -> String {
    let opened = open_header(text);
    if opened.starts_with('}') {
        opened
    } else {
        format!("}} {opened}")
    }
}

fn render_branch(stmt: &Stmt, source: &str, depth: usize, out: &mut String) {
    match &stmt.kind {
        StmtKind::Block(stmts) => {
            for inner in stmts {
                render_stmt(inner, source, depth, out);
            }
        }
        _ => render_stmt(stmt, source, depth, out),
    }
}

fn render_stmt(stmt: &Stmt, source: &str, depth: usize, out: &mut String) {
    match &stmt.kind {
        StmtKind::Probe { text } => push_line(out, depth, &format!("log({text:?});")),
        StmtKind::Block(stmts) => {
            push_line(out, depth, "{");
            for inner in stmts {
                render_stmt(inner, source, depth + 1, out);
            }
            push_line(out, depth, "}");
        }
        StmtKind::If {
            then_branch,
            else_branch,
            header,
            else_header: else_span,
            ..
        } => {
            push_line(out, depth, &open_header(header.slice(source)));
            render_branch(then_branch, source, depth + 1, out);
            if let Some(else_branch) = else_branch {
                let text = else_span.map(|s| s.slice(source)).unwrap_or("else");
                push_line(out, depth, &else_header(text));
                render_branch(else_branch, source, depth + 1, out);
            }
            push_line(out, depth, "}");
        }
        StmtKind::For { body, header, .. } | StmtKind::While { body, header, .. } => {
            push_line(out, depth, &open_header(header.slice(source)));
            render_branch(body, source, depth + 1, out);
            push_line(out, depth, "}");
        }
        StmtKind::DoWhile {
            body, condition, ..
        } => {
            push_line(out, depth, "do {");
            render_branch(body, source, depth + 1, out);
            push_line(
                out,
                depth,
                &format!("}} while ({});", condition.span.slice(source)),
            );
        }
        StmtKind::Empty => {}
        _ => {
            let text = stmt.span.slice(source);
            let mut lines = text.lines();
            if let Some(first) = lines.next() {
                push_line(out, depth, first.trim());
            }
            for rest in lines {
                out.push_str(rest);
                out.push('\n');
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse_program;

    #[test]
    fn renders_plain_statements_verbatim() {
        let source = "var a = 1;\na += 2;";
        let program = parse_program(source).unwrap();
        let listing = render_statements(&program, source);
        assert_eq!(listing, "var a = 1;\na += 2;\n");
    }

    #[test]
    fn renders_probes_as_log_calls() {
        let stmts = vec![Stmt::probe("f: say(\"hi\");", Default::default())];
        let listing = render_statements(&stmts, "");
        assert_eq!(listing, "log(\"f: say(\\\"hi\\\");\");\n");
    }

    #[test]
    fn braces_single_statement_bodies() {
        let source = "while (x) x--;";
        let program = parse_program(source).unwrap();
        let listing = render_statements(&program, source);
        assert_eq!(listing, "while (x) {\n    x--;\n}\n");
    }
}
