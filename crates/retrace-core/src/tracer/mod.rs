// Live instrument-and-replay tracing.
//
// A traced function's remaining body is re-parsed, rewritten with probe
// statements and replayed in a frame that shares the caller's bindings, so
// the replay behaves as the original call would have while reporting every
// statement it runs.

use thiserror::Error;

use crate::parser::ParseError;

pub mod engine;
pub mod facade;
pub mod instrument;
pub mod sink;
pub mod watch;

pub use engine::{TraceInvocation, TraceRequest, TraceSession, Tracer};
pub use facade::ScopeFacade;
pub use instrument::{InstrumentedBody, Instrumenter};
pub use sink::{ConsoleSink, JsonSink, LogSink, MemorySink};
pub use watch::Watch;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum TraceError {
    #[error(
        "no log sink is installed; create the interpreter through TraceRuntime \
         or call Interpreter::set_sink before tracing"
    )]
    SinkMissing,

    #[error("source of `{name}` is unavailable: {reason}")]
    SourceUnavailable { name: String, reason: String },

    #[error(
        "could not find the `{surface}(...)` call in `{function}`; call it directly as \
         `return {surface}(...);` at the top level of the function body, not through \
         another name or inside a larger expression"
    )]
    MarkerNotFound { function: String, surface: String },

    #[error("`{surface}(...)` must be called from inside a script function")]
    NoCaller { surface: String },

    #[error("invalid watch expression `{expression}`: {message}")]
    InvalidWatch { expression: String, message: String },

    #[error("cannot re-parse traced function body: {0}")]
    Parse(#[from] ParseError),
}
