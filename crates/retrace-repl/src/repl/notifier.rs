//! Output notification system for the REPL
//!
//! Provides a trait-based system for handling REPL output, so tests and
//! embedders can capture what the console would print.

/// Trait for handling REPL output notifications
pub trait ReplNotifier {
    /// Handle regular output
    fn on_output(&self, content: &str);

    /// Handle error output
    fn on_error(&self, content: &str);

    /// Handle evaluation result with timing information
    fn on_result(&self, output: &str, duration_ms: u64, quiet: bool);
}

/// Default console-based notifier
pub struct DefaultNotifier;

impl DefaultNotifier {
    pub fn new() -> Self {
        Self
    }
}

impl ReplNotifier for DefaultNotifier {
    fn on_output(&self, content: &str) {
        if !content.is_empty() {
            println!("{content}");
        }
    }

    fn on_error(&self, content: &str) {
        eprintln!("{content}");
    }

    fn on_result(&self, output: &str, duration_ms: u64, quiet: bool) {
        if quiet {
            if output != "undefined" {
                println!("{output}");
            }
        } else {
            println!("=> {output} ({duration_ms}ms)");
        }
    }
}

impl Default for DefaultNotifier {
    fn default() -> Self {
        Self::new()
    }
}
