//! Retrace Runtime - High-level interface for script execution and tracing
//!
//! Wraps the interpreter and a log sink for use by external components like
//! the REPL.

use std::{path::Path, rc::Rc};

use anyhow::{anyhow, bail, Context, Result};
use tracing::{debug, info};

use crate::{
    ast::ExprKind,
    evaluator::{Interpreter, Value},
    parser::parse_expression,
    tracer::{ConsoleSink, JsonSink, LogSink, TraceRequest, Tracer},
    OutputFormat, TraceConfig,
};

/// High-level runtime that combines interpreter, tracer and output sink
pub struct TraceRuntime {
    interpreter: Interpreter,
    sink: Rc<dyn LogSink>,
}

impl TraceRuntime {
    /// Create a runtime writing to the sink selected by `config.output`
    pub fn new(config: TraceConfig) -> Self {
        let sink: Rc<dyn LogSink> = match config.output {
            OutputFormat::Console => Rc::new(ConsoleSink),
            OutputFormat::Json => Rc::new(JsonSink),
        };
        Self::with_sink(config, sink)
    }

    pub fn with_sink(config: TraceConfig, sink: Rc<dyn LogSink>) -> Self {
        let mut interpreter = Interpreter::new(config);
        interpreter.set_sink(Rc::clone(&sink));
        Self { interpreter, sink }
    }

    pub fn config(&self) -> &TraceConfig {
        self.interpreter.config()
    }

    pub fn sink(&self) -> Rc<dyn LogSink> {
        Rc::clone(&self.sink)
    }

    /// Swap the output sink, e.g. when switching to JSON output
    pub fn set_sink(&mut self, sink: Rc<dyn LogSink>) {
        self.interpreter.set_sink(Rc::clone(&sink));
        self.sink = sink;
    }

    pub fn set_dump_instrumented(&mut self, dump: bool) {
        self.interpreter.set_dump_instrumented(dump);
    }

    pub fn interpreter(&mut self) -> &mut Interpreter {
        &mut self.interpreter
    }

    /// Evaluate source code in the global scope and return the result
    pub fn eval_source(&mut self, source: &str) -> Result<Value> {
        Ok(self.interpreter.eval_source(source)?)
    }

    /// Run a script file
    pub fn load_file(&mut self, path: impl AsRef<Path>) -> Result<Value> {
        let path = path.as_ref();
        let source = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        info!("Loading {} ({} bytes)", path.display(), source.len());
        self.interpreter
            .eval_source(&source)
            .with_context(|| format!("Error in {}", path.display()))
    }

    /// Call a global function
    pub fn call(&mut self, name: &str, args: Vec<Value>) -> Result<Value> {
        Ok(self.interpreter.call_global(name, args)?)
    }

    /// Look up a global binding
    pub fn lookup(&self, name: &str) -> Option<Value> {
        self.interpreter.globals().get(name)
    }

    fn function(&self, name: &str) -> Result<Value> {
        self.lookup(name)
            .ok_or_else(|| anyhow!("No global function named '{}'", name))
    }

    /// Trace a whole call of the global function `name`
    pub fn trace_function(&mut self, name: &str, args: Vec<Value>, watches: &[String]) -> Result<Value> {
        let function = self.function(name)?;
        let request = TraceRequest::new().with_watches(watches.iter().cloned());
        self.trace_with(&function, args, request)
    }

    pub fn trace_with(&mut self, function: &Value, args: Vec<Value>, request: TraceRequest) -> Result<Value> {
        Ok(Tracer::new(&mut self.interpreter).trace_function(function, args, request)?)
    }

    /// Trace a call written as source, e.g. `add(2, 3)`. The callee and the
    /// arguments are evaluated in the global scope.
    pub fn trace_call(&mut self, call: &str, watches: &[String]) -> Result<Value> {
        let expr = parse_expression(call)?;
        let ExprKind::Call { callee, args } = &expr.kind else {
            bail!("Expected a function call such as `add(2, 3)`, got `{}`", call.trim());
        };
        let function = self.interpreter.eval_expression(callee)?;
        let args = args
            .iter()
            .map(|arg| self.interpreter.eval_expression(arg))
            .collect::<std::result::Result<Vec<_>, _>>()?;
        debug!("Tracing `{}` with {} arguments", call.trim(), args.len());
        let request = TraceRequest::new().with_watches(watches.iter().cloned());
        self.trace_with(&function, args, request)
    }

    /// Instrumented listing of the global function `name`
    pub fn instrumented_listing(&mut self, name: &str) -> Result<String> {
        let function = self.function(name)?;
        let body = Tracer::new(&mut self.interpreter).instrumented_listing(&function)?;
        Ok(body.render())
    }

    /// Global bindings defined by scripts, in definition order
    pub fn globals(&self) -> Vec<(String, Value)> {
        self.interpreter
            .globals()
            .bindings()
            .into_iter()
            .map(|(name, slot)| (name, slot.borrow().clone()))
            .filter(|(_, value)| !matches!(value, Value::Native(_)))
            .collect()
    }
}

impl Default for TraceRuntime {
    fn default() -> Self {
        Self::new(TraceConfig::default())
    }
}
