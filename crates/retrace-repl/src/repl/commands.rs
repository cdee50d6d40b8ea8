//! REPL command parsing and definitions
//!
//! Handles parsing of dot-commands (.help, .trace, .watch, etc.).

use anyhow::{anyhow, Result};

/// Available REPL commands
#[derive(Debug, Clone, PartialEq)]
pub enum ReplCommand {
    /// Show help information
    Help,
    /// Exit the REPL
    Quit,
    /// Run a script file
    Load(String),
    /// Trace a call expression such as `add(2, 3)`
    Trace(String),
    /// Add a watch expression
    Watch(String),
    /// Remove one watch, or all of them
    Unwatch(Option<String>),
    /// List watch expressions
    Watches,
    /// Show the instrumented body of a global function
    Instrument(String),
    /// List global bindings
    Env,
    /// Toggle JSON trace output
    Json,
    /// Toggle quiet mode
    Quiet,
    /// Toggle debug mode
    Debug,
}

/// Parse a command string into a ReplCommand
pub fn parse_command(input: &str) -> Result<ReplCommand> {
    let trimmed = input.trim();

    let Some(body) = trimmed.strip_prefix('.') else {
        return Err(anyhow!("Commands must start with '.'"));
    };

    let (name, rest) = match body.split_once(char::is_whitespace) {
        Some((name, rest)) => (name, rest.trim()),
        None => (body, ""),
    };

    if name.is_empty() {
        return Err(anyhow!("Empty command"));
    }

    let required = |usage: &str| -> Result<String> {
        if rest.is_empty() {
            Err(anyhow!("Usage: {}", usage))
        } else {
            Ok(rest.to_string())
        }
    };

    match name {
        "help" | "h" => Ok(ReplCommand::Help),
        "quit" | "q" | "exit" => Ok(ReplCommand::Quit),
        "load" => required(".load <file>").map(ReplCommand::Load),
        "trace" | "t" => required(".trace <call>, e.g. .trace add(2, 3)").map(ReplCommand::Trace),
        "watch" | "w" => required(".watch <expression>").map(ReplCommand::Watch),
        "unwatch" => Ok(ReplCommand::Unwatch(
            (!rest.is_empty()).then(|| rest.to_string()),
        )),
        "watches" => Ok(ReplCommand::Watches),
        "instrument" | "show" => required(".instrument <function>").map(ReplCommand::Instrument),
        "env" | "globals" => Ok(ReplCommand::Env),
        "json" => Ok(ReplCommand::Json),
        "quiet" => Ok(ReplCommand::Quiet),
        "debug" => Ok(ReplCommand::Debug),
        _ => Err(anyhow!("Unknown command: .{}", name)),
    }
}
