//! Retrace REPL - Interactive command-line front end for the retrace engine
//!
//! This crate provides the REPL (Read-Eval-Print Loop) around
//! [`retrace_core::TraceRuntime`], including dot-command parsing, multi-line
//! input handling and a watch list applied to `.trace` calls.

pub mod repl;

// Re-export commonly used types for convenience
pub use repl::{DefaultNotifier, LineProcessResult, MultiLineCollector, Repl, ReplCommand, ReplNotifier};
