use super::TraceError;
use crate::{
    ast::Expr,
    evaluator::{EvalError, Interpreter, Value},
    parser::parse_expression,
};

/// An expression re-evaluated after every probe of a replay. Expressions
/// containing a comparison are assertions and only report when they fail.
#[derive(Debug, Clone, PartialEq)]
pub enum Watch {
    Value { text: String, expr: Expr },
    Assertion { text: String, expr: Expr },
}

impl Watch {
    pub fn compile(text: &str) -> Result<Self, TraceError> {
        let expr = parse_expression(text).map_err(|e| TraceError::InvalidWatch {
            expression: text.to_string(),
            message: e.message,
        })?;
        let text = text.trim().to_string();
        Ok(if expr.contains_comparison() {
            Watch::Assertion { text, expr }
        } else {
            Watch::Value { text, expr }
        })
    }

    pub fn text(&self) -> &str {
        match self {
            Watch::Value { text, .. } | Watch::Assertion { text, .. } => text,
        }
    }

    pub fn is_assertion(&self) -> bool {
        matches!(self, Watch::Assertion { .. })
    }

    /// Evaluate in the running replay and build the values to append to the
    /// probe's line, if any. Evaluation failures are reported inline instead
    /// of stopping the replay.
    pub fn emission(&self, interp: &mut Interpreter) -> Option<Vec<Value>> {
        match self {
            Watch::Value { text, expr } => {
                let value = interp.eval_expression(expr).unwrap_or_else(|e| error_value(&e));
                Some(vec![Value::Str(format!("{text}:")), value])
            }
            Watch::Assertion { text, expr } => match interp.eval_expression(expr) {
                Ok(value) if value.truthy() => None,
                Ok(_) => Some(vec![
                    Value::from("ASSERTION FAILED"),
                    Value::from(text.as_str()),
                ]),
                Err(e) => Some(vec![
                    Value::from("ASSERTION FAILED"),
                    Value::from(text.as_str()),
                    error_value(&e),
                ]),
            },
        }
    }
}

/// Positions inside a watch refer to the watch text, so only kind and message are kept
fn error_value(error: &EvalError) -> Value {
    match error {
        EvalError::Runtime { kind, message, .. } => Value::Str(format!("<{kind}: {message}>")),
        other => Value::Str(format!("<{other}>")),
    }
}

pub fn compile_watches(texts: &[String]) -> Result<Vec<Watch>, TraceError> {
    texts.iter().map(|text| Watch::compile(text)).collect()
}
