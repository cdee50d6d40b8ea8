use std::rc::Rc;

use super::{
    errors::{ErrorKind, EvalError},
    scope::Frame,
    value::{ArrayRef, NativeCall, Value},
    Interpreter,
};
use crate::{
    tracer::{engine, TraceError},
    TraceConfig,
};

/// Bind the global builtins. The tracing entry point is bound under the
/// configured surface name.
pub fn install(globals: &Rc<Frame>, config: &TraceConfig) {
    globals.declare("log", Value::native("log", log));
    globals.declare(&config.surface_name, Value::native("trace", trace));
}

/// `log(...values)` forwards its arguments to the installed sink
fn log(interp: &mut Interpreter, call: NativeCall) -> Result<Value, EvalError> {
    let sink = interp.sink().ok_or(TraceError::SinkMissing)?;
    sink.log(&call.args);
    Ok(Value::Undefined)
}

/// `trace(...)` called from inside the function being traced
fn trace(interp: &mut Interpreter, call: NativeCall) -> Result<Value, EvalError> {
    engine::trace_from_marker(interp, call)
}

fn this_array(call: &NativeCall, method: &str) -> Result<ArrayRef, EvalError> {
    match &call.this {
        Value::Array(items) => Ok(Rc::clone(items)),
        other => Err(EvalError::runtime(
            ErrorKind::TypeError,
            format!("Array.prototype.{method} called on {}", other.type_name()),
            0,
            0,
        )),
    }
}

pub fn array_push(_interp: &mut Interpreter, call: NativeCall) -> Result<Value, EvalError> {
    let items = this_array(&call, "push")?;
    let mut items = items.borrow_mut();
    items.extend(call.args);
    Ok(Value::Number(items.len() as f64))
}

pub fn array_pop(_interp: &mut Interpreter, call: NativeCall) -> Result<Value, EvalError> {
    let items = this_array(&call, "pop")?;
    let popped = items.borrow_mut().pop();
    Ok(popped.unwrap_or_default())
}

pub fn array_join(_interp: &mut Interpreter, call: NativeCall) -> Result<Value, EvalError> {
    let items = this_array(&call, "join")?;
    let separator = match call.args.first() {
        None | Some(Value::Undefined) => ",".to_string(),
        Some(sep) => sep.to_string(),
    };
    let joined = items
        .borrow()
        .iter()
        .map(|item| match item {
            Value::Undefined | Value::Null => String::new(),
            other => other.to_string(),
        })
        .collect::<Vec<_>>()
        .join(&separator);
    Ok(Value::Str(joined))
}

pub fn array_index_of(_interp: &mut Interpreter, call: NativeCall) -> Result<Value, EvalError> {
    let items = this_array(&call, "indexOf")?;
    let needle = call.args.first().cloned().unwrap_or_default();
    let position = items
        .borrow()
        .iter()
        .position(|item| item.strict_equals(&needle));
    Ok(Value::Number(position.map_or(-1.0, |i| i as f64)))
}
