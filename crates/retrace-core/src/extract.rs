// Recover a function's parts from its source text.

use std::{rc::Rc, sync::OnceLock};

use regex::Regex;

use crate::{
    evaluator::{Closure, Value},
    tracer::TraceError,
};

fn function_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"(?s)\A\s*function\b\s*([A-Za-z_$][\w$]*)?\s*\(([^)]*)\)\s*\{(.*)\}\s*\z")
            .expect("function pattern is valid")
    })
}

/// A function's name, parameters and body text
#[derive(Debug, Clone, PartialEq)]
pub struct FunctionSource {
    pub name: Option<String>,
    pub parameters: Vec<String>,
    /// Text between the outer braces
    pub body_text: String,
    /// Byte offset of `body_text` within `origin`
    pub body_offset: usize,
    /// The full source the function was parsed from
    pub origin: Rc<str>,
}

impl FunctionSource {
    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or("anonymous")
    }
}

/// Decompose a callable value. Builtins have no source to re-parse.
pub fn function_source(function: &Value) -> Result<FunctionSource, TraceError> {
    match function {
        Value::Function(closure) => closure_source(closure),
        other => Err(unavailable(other)),
    }
}

pub fn closure_source(closure: &Closure) -> Result<FunctionSource, TraceError> {
    decompose(
        closure.source_text(),
        closure.decl.span.start,
        Rc::clone(&closure.source),
    )
}

/// Error for values that have no script source
pub fn unavailable(value: &Value) -> TraceError {
    match value {
        Value::Native(native) => TraceError::SourceUnavailable {
            name: native.name.to_string(),
            reason: "builtin functions have no script source".to_string(),
        },
        other => TraceError::SourceUnavailable {
            name: other.to_string(),
            reason: format!("a {} is not a function", other.type_name()),
        },
    }
}

/// Split function text found at byte `offset` of `origin`
pub fn decompose(text: &str, offset: usize, origin: Rc<str>) -> Result<FunctionSource, TraceError> {
    let fail = |reason: &str| TraceError::SourceUnavailable {
        name: text.chars().take(40).collect(),
        reason: reason.to_string(),
    };
    let caps = function_pattern()
        .captures(text)
        .ok_or_else(|| fail("text is not a function declaration"))?;
    let body = caps
        .get(3)
        .ok_or_else(|| fail("function has no body"))?;
    let parameters = caps
        .get(2)
        .map(|m| {
            m.as_str()
                .split(',')
                .map(str::trim)
                .filter(|p| !p.is_empty())
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default();

    Ok(FunctionSource {
        name: caps.get(1).map(|m| m.as_str().to_string()),
        parameters,
        body_text: body.as_str().to_string(),
        body_offset: offset + body.start(),
        origin,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decomposes_named_function() {
        let origin: Rc<str> = Rc::from("x;\nfunction add(a, b) {\n  return a + b;\n}");
        let start = origin.find("function").unwrap();
        let source = decompose(&origin[start..], start, Rc::clone(&origin)).unwrap();
        assert_eq!(source.name.as_deref(), Some("add"));
        assert_eq!(source.parameters, vec!["a", "b"]);
        assert_eq!(source.body_text, "\n  return a + b;\n");
        assert_eq!(
            &origin[source.body_offset..source.body_offset + source.body_text.len()],
            source.body_text
        );
    }

    #[test]
    fn anonymous_function_without_parameters() {
        let source = decompose("function () { }", 0, Rc::from("function () { }")).unwrap();
        assert_eq!(source.display_name(), "anonymous");
        assert!(source.parameters.is_empty());
    }

    #[test]
    fn builtins_have_no_source() {
        let native = Value::native("log", |_, _| Ok(Value::Undefined));
        assert!(matches!(
            function_source(&native),
            Err(TraceError::SourceUnavailable { .. })
        ));
    }
}
