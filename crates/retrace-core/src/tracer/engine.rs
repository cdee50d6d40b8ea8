use std::rc::Rc;

use indexmap::IndexMap;
use tracing::{debug, info, warn};

use super::{
    facade::ScopeFacade,
    instrument::{locate_marker, InstrumentedBody, Instrumenter},
    sink::LogSink,
    watch::{compile_watches, Watch},
    TraceError,
};
use crate::{
    ast::{Span, StmtKind},
    evaluator::{Activation, Closure, EvalError, Frame, Interpreter, NativeCall, Value},
    extract::{self, FunctionSource},
    parser::parse_body,
};

/// Options for one trace: receiver override, watch expressions and a
/// display name override
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TraceRequest {
    pub receiver: Option<Value>,
    pub watches: Vec<String>,
    pub name: Option<String>,
}

impl TraceRequest {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sort positional arguments by kind: an array is the watch list, a
    /// string the name, `undefined`/`null` are skipped and anything else is
    /// the receiver. The first argument of each kind wins.
    pub fn from_args(args: &[Value]) -> Self {
        let mut request = Self::default();
        let mut watches_given = false;
        for arg in args {
            match arg {
                Value::Undefined | Value::Null => {}
                Value::Array(items) if !watches_given => {
                    watches_given = true;
                    request.watches = items
                        .borrow()
                        .iter()
                        .map(|item| item.to_string())
                        .collect();
                }
                Value::Str(name) if request.name.is_none() => request.name = Some(name.clone()),
                Value::Array(_) | Value::Str(_) => {}
                other if request.receiver.is_none() => request.receiver = Some(other.clone()),
                _ => {}
            }
        }
        request
    }

    pub fn with_receiver(mut self, receiver: Value) -> Self {
        self.receiver = Some(receiver);
        self
    }

    pub fn with_watches<I, S>(mut self, watches: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.watches = watches.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    fn display_name(&self, source: &FunctionSource) -> String {
        self.name
            .clone()
            .unwrap_or_else(|| source.display_name().to_string())
    }
}

/// State shared by the probes of one replay
pub struct TraceSession {
    prefix: String,
    watches: Vec<Watch>,
    sink: Rc<dyn LogSink>,
}

impl TraceSession {
    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    pub fn watches(&self) -> &[Watch] {
        &self.watches
    }

    /// Report a probe as one line, followed by every watch emission
    pub(crate) fn fire(&self, interp: &mut Interpreter, text: &str) {
        let mut line = vec![Value::from(self.prefix.as_str()), Value::from(text)];
        for watch in &self.watches {
            if let Some(emission) = watch.emission(interp) {
                line.extend(emission);
            }
        }
        self.sink.log(&line);
    }
}

/// Everything a replay needs, assembled before it starts
pub struct TraceInvocation {
    pub name: String,
    pub source: FunctionSource,
    pub closure: Rc<Closure>,
    pub receiver: Value,
    pub arguments: Value,
    pub facade: ScopeFacade,
    /// Activation frame of the replay, a child of the facade
    pub frame: Rc<Frame>,
    pub body: InstrumentedBody,
    pub watches: Vec<Watch>,
}

/// Entry points for tracing script functions
pub struct Tracer<'a> {
    interp: &'a mut Interpreter,
}

/// Builtin handler for the tracing call made from inside a function
pub fn trace_from_marker(interp: &mut Interpreter, call: NativeCall) -> Result<Value, EvalError> {
    Tracer::new(interp).trace_marker(call)
}

impl<'a> Tracer<'a> {
    pub fn new(interp: &'a mut Interpreter) -> Self {
        Self { interp }
    }

    fn surface(&self) -> String {
        self.interp.config().surface_name.clone()
    }

    /// Replay the rest of the calling function after the marker at `call.span`
    pub fn trace_marker(&mut self, call: NativeCall) -> Result<Value, EvalError> {
        let surface = self.surface();
        if self.interp.sink().is_none() {
            return Err(TraceError::SinkMissing.into());
        }
        let caller = self
            .interp
            .current_activation()
            .filter(|activation| activation.callee.is_some())
            .cloned()
            .ok_or_else(|| TraceError::NoCaller {
                surface: surface.clone(),
            })?;
        let closure = caller.callee.clone().ok_or_else(|| TraceError::NoCaller {
            surface: surface.clone(),
        })?;

        let request = TraceRequest::from_args(&call.args);
        let source = extract::closure_source(&closure)?;
        let name = request.display_name(&source);
        let stmts = parse_body(&source.body_text, source.body_offset).map_err(TraceError::from)?;
        let marker = locate_marker(&stmts, &surface, call.span).ok_or_else(|| {
            TraceError::MarkerNotFound {
                function: name.clone(),
                surface: surface.clone(),
            }
        })?;
        if !matches!(stmts[marker].kind, StmtKind::Return(_)) {
            warn!(
                "`{}(...)` in {} is not returned; the original body keeps running after the replay",
                surface, name
            );
        }

        let body = Instrumenter::new(&surface, &source.origin).instrument(&stmts[marker + 1..]);
        let watches = compile_watches(&request.watches)?;
        let facade = ScopeFacade::for_frame(&caller.frame);
        let frame = Frame::function(Rc::clone(facade.frame()));
        for (local, slot) in facade.locals() {
            frame.alias(local, Rc::clone(slot));
        }

        let invocation = TraceInvocation {
            body: InstrumentedBody::new(name.clone(), body, Rc::clone(&source.origin)),
            name,
            source,
            closure,
            receiver: request.receiver.unwrap_or(caller.this),
            arguments: caller.arguments,
            facade,
            frame,
            watches,
        };
        self.replay(invocation, call.span)
    }

    /// Trace a whole call of `function` with fresh arguments
    pub fn trace_function(
        &mut self,
        function: &Value,
        args: Vec<Value>,
        request: TraceRequest,
    ) -> Result<Value, EvalError> {
        let surface = self.surface();
        if self.interp.sink().is_none() {
            return Err(TraceError::SinkMissing.into());
        }
        let closure = match function {
            Value::Function(closure) => Rc::clone(closure),
            other => return Err(extract::unavailable(other).into()),
        };
        let source = extract::closure_source(&closure)?;
        let name = request.display_name(&source);
        let stmts = parse_body(&source.body_text, source.body_offset).map_err(TraceError::from)?;
        let body = Instrumenter::new(&surface, &source.origin).instrument(&stmts);
        let watches = compile_watches(&request.watches)?;

        let facade = ScopeFacade::for_closure_scope(&closure.scope);
        let frame = Frame::function(Rc::clone(facade.frame()));
        for (i, param) in source.parameters.iter().enumerate() {
            frame.declare(param, args.get(i).cloned().unwrap_or_default());
        }

        let invocation = TraceInvocation {
            body: InstrumentedBody::new(name.clone(), body, Rc::clone(&source.origin)),
            name,
            source,
            closure,
            receiver: request.receiver.unwrap_or_default(),
            arguments: Value::array(args),
            facade,
            frame,
            watches,
        };
        self.replay(invocation, Span::default())
    }

    /// The instrumented form of a function's whole body
    pub fn instrumented_listing(&self, function: &Value) -> Result<InstrumentedBody, TraceError> {
        let source = extract::function_source(function)?;
        let stmts = parse_body(&source.body_text, source.body_offset)?;
        let surface = self.surface();
        let body = Instrumenter::new(&surface, &source.origin).instrument(&stmts);
        Ok(InstrumentedBody::new(
            source.display_name(),
            body,
            Rc::clone(&source.origin),
        ))
    }

    /// Run an assembled invocation. Faults with a source position are
    /// reported to the sink and end the trace with `undefined`; everything
    /// else propagates to the caller.
    fn replay(&mut self, invocation: TraceInvocation, call_span: Span) -> Result<Value, EvalError> {
        let sink = self.interp.sink().ok_or(TraceError::SinkMissing)?;
        let TraceInvocation {
            name,
            source,
            closure,
            receiver,
            arguments,
            facade,
            frame,
            body,
            watches,
        } = invocation;

        let mut params = IndexMap::new();
        for param in &source.parameters {
            params.insert(param.clone(), frame.get(param).unwrap_or_default());
        }
        sink.log(&[Value::from(name.as_str()), Value::object(params)]);

        if self.interp.config().dump_instrumented {
            sink.log(&[Value::Str(format!("{name}:")), Value::Str(body.render())]);
        }
        info!(
            "Replaying {} ({} probes, {} watches, {} scope levels)",
            name,
            body.probe_count(),
            watches.len(),
            facade.levels()
        );
        debug!("Instrumented body of {}:\n{}", name, body.render());

        let session = Rc::new(TraceSession {
            prefix: format!("{name}:"),
            watches,
            sink: Rc::clone(&sink),
        });
        let activation = Activation {
            frame,
            this: receiver,
            arguments,
            callee: Some(closure),
            source: Rc::clone(&source.origin),
            session: Some(session),
        };

        match self
            .interp
            .run_activation(activation, &body.statements, call_span)
        {
            Ok(value) => {
                sink.log(&[Value::from(name.as_str()), Value::from("returned"), value.clone()]);
                Ok(value)
            }
            Err(error) => match error.diagnostic() {
                Some(diagnostic) => {
                    warn!("Trace of {} stopped: {}", name, diagnostic);
                    sink.report(&format!("{name}: {diagnostic}"));
                    Ok(Value::Undefined)
                }
                None => Err(error),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_arguments_are_sorted_by_kind() {
        let receiver = Value::object(IndexMap::new());
        let request = TraceRequest::from_args(&[
            Value::Undefined,
            Value::array(vec![Value::from("total")]),
            Value::from("label"),
            receiver.clone(),
            Value::from("ignored"),
            Value::array(vec![Value::from("ignored")]),
        ]);
        assert_eq!(request.watches, vec!["total".to_string()]);
        assert_eq!(request.name.as_deref(), Some("label"));
        assert_eq!(request.receiver, Some(receiver));
    }

    #[test]
    fn empty_request() {
        let request = TraceRequest::from_args(&[Value::Null]);
        assert_eq!(request, TraceRequest::new());
    }
}
