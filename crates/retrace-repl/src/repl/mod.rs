//! REPL (Read-Eval-Print Loop) functionality for retrace
//!
//! This module wraps the core trace runtime with interactive features:
//! - Multi-line input collection
//! - REPL commands (.help, .trace, .watch, etc.)
//! - A watch list applied to every `.trace`
//! - Output formatting and notifications

use std::{rc::Rc, time::Instant};

use anyhow::{anyhow, Result};
use retrace_core::{ConsoleSink, JsonSink, OutputFormat, TraceConfig, TraceRuntime, Value, Watch};
use tracing::debug;

pub mod commands;
pub mod multiline;
pub mod notifier;

pub use commands::ReplCommand;
pub use multiline::{LineProcessResult, MultiLineCollector};
pub use notifier::{DefaultNotifier, ReplNotifier};

/// Interactive REPL around a trace runtime
pub struct Repl {
    runtime: TraceRuntime,
    notifier: Box<dyn ReplNotifier>,
    /// Watch expressions passed to every `.trace`
    watches: Vec<String>,
    running: bool,
    /// Quiet mode (suppress timing info)
    quiet: bool,
    /// Debug mode logs instrumented listings before each replay
    debug: bool,
    json: bool,
}

impl Repl {
    /// Create a new REPL with the given runtime
    pub fn new(runtime: TraceRuntime) -> Self {
        let debug = runtime.config().dump_instrumented;
        let json = runtime.config().output == OutputFormat::Json;
        Self {
            runtime,
            notifier: Box::new(DefaultNotifier::new()),
            watches: Vec::new(),
            running: true,
            quiet: false,
            debug,
            json,
        }
    }

    pub fn with_config(config: TraceConfig) -> Self {
        Self::new(TraceRuntime::new(config))
    }

    pub fn set_notifier(&mut self, notifier: Box<dyn ReplNotifier>) {
        self.notifier = notifier;
    }

    pub fn notifier(&self) -> &dyn ReplNotifier {
        self.notifier.as_ref()
    }

    pub fn runtime(&mut self) -> &mut TraceRuntime {
        &mut self.runtime
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn is_quiet(&self) -> bool {
        self.quiet
    }

    pub fn set_quiet(&mut self, quiet: bool) {
        self.quiet = quiet;
    }

    pub fn watches(&self) -> &[String] {
        &self.watches
    }

    /// Parse REPL input into a command
    pub fn parse_input(&self, input: &str) -> Result<ReplCommand> {
        commands::parse_command(input)
    }

    /// Handle a REPL command
    pub fn handle_command(&mut self, command: ReplCommand) -> Result<String> {
        debug!("REPL command: {:?}", command);
        match command {
            ReplCommand::Help => Ok(self.get_help_text()),
            ReplCommand::Quit => {
                self.running = false;
                Ok("Goodbye!".to_string())
            }
            ReplCommand::Load(path) => {
                let value = self.runtime.load_file(&path)?;
                Ok(format!("Loaded {} => {}", path, format_value(&value)))
            }
            ReplCommand::Trace(call) => {
                let value = self.runtime.trace_call(&call, &self.watches)?;
                Ok(format!("=> {}", format_value(&value)))
            }
            ReplCommand::Watch(expression) => self.add_watch(expression),
            ReplCommand::Unwatch(None) => {
                let count = self.watches.len();
                self.watches.clear();
                Ok(format!("Cleared {count} watch expression(s)"))
            }
            ReplCommand::Unwatch(Some(expression)) => {
                let before = self.watches.len();
                self.watches.retain(|watch| watch != &expression);
                if self.watches.len() == before {
                    Err(anyhow!("Not watching '{}'", expression))
                } else {
                    Ok(format!("Stopped watching {expression}"))
                }
            }
            ReplCommand::Watches => Ok(self.list_watches()),
            ReplCommand::Instrument(name) => self.runtime.instrumented_listing(&name),
            ReplCommand::Env => Ok(self.list_globals()),
            ReplCommand::Json => {
                self.json = !self.json;
                if self.json {
                    self.runtime.set_sink(Rc::new(JsonSink));
                } else {
                    self.runtime.set_sink(Rc::new(ConsoleSink));
                }
                Ok(format!("JSON output: {}", on_off(self.json)))
            }
            ReplCommand::Quiet => {
                self.quiet = !self.quiet;
                Ok(format!("Quiet mode: {}", on_off(self.quiet)))
            }
            ReplCommand::Debug => {
                self.debug = !self.debug;
                self.runtime.set_dump_instrumented(self.debug);
                Ok(format!("Debug mode: {}", on_off(self.debug)))
            }
        }
    }

    /// Execute source code and return the formatted result with timing
    pub fn execute(&mut self, code: &str) -> Result<(String, u64)> {
        let start = Instant::now();
        let value = self.runtime.eval_source(code)?;
        let duration = start.elapsed().as_millis() as u64;
        Ok((format_value(&value), duration))
    }

    fn add_watch(&mut self, expression: String) -> Result<String> {
        let watch = Watch::compile(&expression)?;
        let kind = if watch.is_assertion() {
            "Asserting"
        } else {
            "Watching"
        };
        if !self.watches.contains(&expression) {
            self.watches.push(expression.clone());
        }
        Ok(format!("{kind} {expression}"))
    }

    fn list_watches(&self) -> String {
        if self.watches.is_empty() {
            return "No watch expressions.".to_string();
        }
        let lines = self
            .watches
            .iter()
            .enumerate()
            .map(|(i, watch)| format!("  {}. {}", i + 1, watch))
            .collect::<Vec<_>>()
            .join("\n");
        format!("Watches:\n{lines}")
    }

    fn list_globals(&self) -> String {
        let globals = self.runtime.globals();
        if globals.is_empty() {
            return "No globals defined.".to_string();
        }
        let lines = globals
            .iter()
            .map(|(name, value)| format!("  {} = {}", name, format_value(value)))
            .collect::<Vec<_>>()
            .join("\n");
        format!("Globals:\n{lines}")
    }

    fn get_help_text(&self) -> String {
        let surface = &self.runtime.config().surface_name;
        format!(
            r#"Retrace REPL Commands:
  .help               - Show this help message
  .quit               - Exit the REPL
  .load <file>        - Run a script file
  .trace <call>       - Trace a whole call, e.g. .trace add(2, 3)
  .watch <expr>       - Log <expr> after every traced statement
                        (comparisons are checked as assertions)
  .unwatch [expr]     - Remove one watch, or all of them
  .watches            - List watch expressions
  .instrument <name>  - Show the instrumented body of a function
  .env                - List global bindings
  .json               - Toggle JSON trace output
  .quiet              - Toggle quiet mode (hide timing info)
  .debug              - Toggle logging of instrumented bodies

Tracing from scripts:
  function add(a, b) {{
    return {surface}();              // replay the rest of this body
    var sum = a + b;
    return sum;
  }}
  {surface}(['sum'])                 // watch expressions
  {surface}('label', receiver)       // display name and `this` override"#
        )
    }

    pub fn show_exit_stats(&self) {
        if !self.quiet {
            self.notifier.on_output("\nSession complete.");
        }
    }
}

/// Format a value for display, quoting strings
pub fn format_value(value: &Value) -> String {
    format!("{value:?}")
}

fn on_off(flag: bool) -> &'static str {
    if flag {
        "on"
    } else {
        "off"
    }
}
