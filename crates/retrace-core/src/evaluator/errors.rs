use std::fmt;

use thiserror::Error;

use crate::{parser::ParseError, tracer::TraceError};

/// Script-visible error classes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    TypeError,
    ReferenceError,
    RangeError,
    SyntaxError,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ErrorKind::TypeError => "TypeError",
            ErrorKind::ReferenceError => "ReferenceError",
            ErrorKind::RangeError => "RangeError",
            ErrorKind::SyntaxError => "SyntaxError",
        };
        f.write_str(name)
    }
}

/// Errors raised while evaluating scripts
#[derive(Error, Debug, Clone, PartialEq)]
pub enum EvalError {
    /// A runtime fault with a known source position
    #[error("{kind}: {message} (line {line}, column {column})")]
    Runtime {
        kind: ErrorKind,
        message: String,
        line: usize,
        column: usize,
    },

    /// A value raised by a `throw` statement
    #[error("Uncaught {message}")]
    Thrown { message: String },

    #[error(transparent)]
    Trace(#[from] TraceError),

    #[error(transparent)]
    Parse(#[from] ParseError),
}

impl EvalError {
    pub fn runtime(kind: ErrorKind, message: impl Into<String>, line: usize, column: usize) -> Self {
        Self::Runtime {
            kind,
            message: message.into(),
            line,
            column,
        }
    }

    /// Position-bearing diagnostic text, if this error carries a source location.
    /// Only such errors are reported and absorbed at a trace boundary.
    pub fn diagnostic(&self) -> Option<String> {
        match self {
            EvalError::Runtime { .. } | EvalError::Parse(_) => Some(self.to_string()),
            EvalError::Thrown { .. } | EvalError::Trace(_) => None,
        }
    }

    pub fn kind(&self) -> Option<ErrorKind> {
        match self {
            EvalError::Runtime { kind, .. } => Some(*kind),
            EvalError::Parse(_) => Some(ErrorKind::SyntaxError),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn runtime_errors_have_diagnostics() {
        let err = EvalError::runtime(ErrorKind::ReferenceError, "x is not defined", 3, 5);
        assert_eq!(
            err.diagnostic().as_deref(),
            Some("ReferenceError: x is not defined (line 3, column 5)")
        );
    }

    #[test]
    fn thrown_and_trace_errors_do_not() {
        let thrown = EvalError::Thrown {
            message: "boom".to_string(),
        };
        assert!(thrown.diagnostic().is_none());
        assert!(EvalError::from(TraceError::SinkMissing).diagnostic().is_none());
    }
}
