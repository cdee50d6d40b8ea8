//! # Retrace Core
//!
//! Live instrument-and-replay tracing for a small JavaScript-like language:
//! - Abstract Syntax Tree (AST) definitions and source listings
//! - Lexer and recursive-descent parser
//! - Tree-walking interpreter with shared-slot scope frames
//! - Trace engine: marker location, probe instrumentation, scope facades,
//!   watch expressions and log sinks
//!
//! A function opts in by calling `return trace(...)` as a statement of its
//! body. The rest of the body is then re-parsed, instrumented and replayed
//! against the caller's live bindings, logging each statement as it runs.

#![warn(clippy::all)]

use std::path::Path;

use serde::{Deserialize, Serialize};

pub mod ast;
pub mod evaluator;
pub mod extract;
pub mod parser;
pub mod runtime;
pub mod tracer;

// Re-export commonly used types
pub use ast::{Expr, Span, Stmt};
pub use evaluator::{ControlFlow, ErrorKind, EvalError, Frame, Interpreter, Value};
pub use extract::FunctionSource;
pub use parser::{parse_body, parse_expression, parse_program, ParseError};
pub use runtime::TraceRuntime;
pub use tracer::{
    ConsoleSink, InstrumentedBody, JsonSink, LogSink, MemorySink, ScopeFacade, TraceError,
    TraceRequest, Tracer, Watch,
};

/// Retrace version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Initialize tracing for retrace components
pub fn init_tracing() {
    init_tracing_with("retrace_core=info");
}

/// Initialize tracing with an explicit default directive, e.g. `retrace_core=debug`.
/// `RUST_LOG` still takes precedence for targets it names.
pub fn init_tracing_with(default_directive: &str) {
    let mut filter = tracing_subscriber::EnvFilter::from_default_env();
    if let Ok(directive) = default_directive.parse() {
        filter = filter.add_directive(directive);
    }
    // A subscriber may already be installed by an embedding application
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

/// Default maximum script call depth
pub const DEFAULT_CALL_DEPTH: usize = 256;
/// Largest accepted `max_call_depth`
pub const CALL_DEPTH_LIMIT: usize = 10_000;

/// How trace lines are written
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Console,
    Json,
}

/// Trace engine configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TraceConfig {
    /// Global name the tracing builtin is bound to
    pub surface_name: String,
    /// Maximum script call depth, replays included
    pub max_call_depth: usize,
    /// Log the instrumented listing before each replay
    pub dump_instrumented: bool,
    pub output: OutputFormat,
}

impl Default for TraceConfig {
    fn default() -> Self {
        Self {
            surface_name: "trace".to_string(),
            max_call_depth: DEFAULT_CALL_DEPTH,
            dump_instrumented: false,
            output: OutputFormat::Console,
        }
    }
}

impl TraceConfig {
    /// Load a configuration file; missing fields take their defaults
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| RetraceError::Io {
            path: path.display().to_string(),
            source: e,
        })?;
        let config: Self =
            serde_json::from_str(&text).map_err(|e| RetraceError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.max_call_depth == 0 || self.max_call_depth > CALL_DEPTH_LIMIT {
            return Err(RetraceError::Config(format!(
                "max_call_depth must be between 1 and {CALL_DEPTH_LIMIT}, got {}",
                self.max_call_depth
            )));
        }
        if self.surface_name.is_empty() {
            return Err(RetraceError::Config("surface_name must not be empty".to_string()));
        }
        Ok(())
    }
}

/// Errors loading a configuration file
#[derive(thiserror::Error, Debug)]
pub enum RetraceError {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Cannot read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

/// Result type for configuration loading
pub type Result<T> = std::result::Result<T, RetraceError>;
