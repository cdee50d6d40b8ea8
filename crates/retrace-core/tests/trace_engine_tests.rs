/*!
# Trace Engine Integration Tests

End-to-end replays through `TraceRuntime`, with output captured by a
`MemorySink`.
*/

use std::rc::Rc;

use pretty_assertions::assert_eq;
use retrace_core::{
    ErrorKind, EvalError, Interpreter, MemorySink, TraceConfig, TraceError, TraceRuntime, Value,
};

fn runtime() -> (TraceRuntime, Rc<MemorySink>) {
    runtime_with(TraceConfig::default())
}

fn runtime_with(config: TraceConfig) -> (TraceRuntime, Rc<MemorySink>) {
    let sink = Rc::new(MemorySink::new());
    (TraceRuntime::with_sink(config, sink.clone()), sink)
}

fn trace_error(err: &anyhow::Error) -> Option<&TraceError> {
    match err.downcast_ref::<EvalError>() {
        Some(EvalError::Trace(trace)) => Some(trace),
        _ => None,
    }
}

const ADD: &str = "
function add(a, b) {
  return trace();
  var sum = a + b;
  return sum;
}
";

#[test]
fn test_parameters_statements_and_result_are_logged() -> anyhow::Result<()> {
    let (mut rt, sink) = runtime();
    rt.eval_source(ADD)?;
    let result = rt.eval_source("add(2, 3);")?;

    assert_eq!(result, Value::Number(5.0));
    assert_eq!(
        sink.rendered(),
        vec![
            "add {a: 2, b: 3}",
            "add: var sum = a + b;",
            "add: return sum;",
            "add returned 5",
        ]
    );
    Ok(())
}

#[test]
fn test_loop_headers_fire_per_iteration_with_watches() -> anyhow::Result<()> {
    let (mut rt, sink) = runtime();
    rt.eval_source(
        "
function total(items) {
  return trace(['sum']);
  var sum = 0;
  for (var i = 0; i < items.length; i++) {
    sum += items[i];
  }
  return sum;
}
",
    )?;
    let result = rt.eval_source("total([4, 5]);")?;
    assert_eq!(result, Value::Number(9.0));

    let lines = sink.rendered();
    let headers = lines
        .iter()
        .filter(|line| line.starts_with("total: for ("))
        .count();
    assert_eq!(headers, 2);
    assert_eq!(
        lines,
        vec![
            "total {items: [4, 5]}",
            "total: var sum = 0; sum: 0",
            "total: for (var i = 0; i < items.length; i++) { sum: 0",
            "total: sum += items[i]; sum: 4",
            "total: for (var i = 0; i < items.length; i++) { sum: 4",
            "total: sum += items[i]; sum: 9",
            "total: return sum; sum: 9",
            "total returned 9",
        ]
    );
    Ok(())
}

#[test]
fn test_statements_before_marker_are_not_replayed() -> anyhow::Result<()> {
    let (mut rt, sink) = runtime();
    rt.eval_source(
        "
var calls = 0;
function once(x) {
  calls++;
  return trace();
  return x + calls;
}
",
    )?;
    assert_eq!(rt.eval_source("once(1);")?, Value::Number(2.0));
    assert_eq!(rt.lookup("calls"), Some(Value::Number(1.0)));
    assert!(!sink.rendered().iter().any(|line| line.contains("calls++")));
    Ok(())
}

#[test]
fn test_writes_reach_enclosing_scopes() -> anyhow::Result<()> {
    let (mut rt, _sink) = runtime();
    let result = rt.eval_source(
        "
function makeCounter() {
  var hits = 0;
  function hit(step) {
    return trace();
    hits += step;
    return hits;
  }
  hit(1);
  hit(2);
  return hits;
}
makeCounter();
",
    )?;
    assert_eq!(result, Value::Number(3.0));
    Ok(())
}

#[test]
fn test_receiver_and_arguments_come_from_the_original_call() -> anyhow::Result<()> {
    let (mut rt, sink) = runtime();
    let result = rt.eval_source(
        "
var box = {
  size: 4,
  grow: function (by) {
    return trace();
    this.size += by + arguments.length;
    return this.size;
  }
};
box.grow(2, 'extra');
",
    )?;
    assert_eq!(result, Value::Number(8.0));
    assert_eq!(
        rt.eval_source("box.size;")?,
        Value::Number(8.0)
    );
    assert_eq!(sink.rendered()[0], "anonymous {by: 2}");
    Ok(())
}

#[test]
fn test_name_and_receiver_overrides() -> anyhow::Result<()> {
    let (mut rt, sink) = runtime();
    let result = rt.eval_source(
        "
var other = { size: 100 };
var box = {
  size: 1,
  get: function () {
    return trace('box.get', other);
    return this.size;
  }
};
box.get();
",
    )?;
    assert_eq!(result, Value::Number(100.0));
    assert_eq!(sink.rendered().last().unwrap(), "box.get returned 100");
    Ok(())
}

#[test]
fn test_nested_traced_calls_terminate() -> anyhow::Result<()> {
    let (mut rt, sink) = runtime();
    let result = rt.eval_source(
        "
var base = 10;
function outer(a) {
  return trace();
  var inner = function (b) {
    return trace('inner');
    return a + b + base;
  };
  return inner(1);
}
outer(5);
",
    )?;
    assert_eq!(result, Value::Number(16.0));
    let lines = sink.rendered();
    assert!(lines.contains(&"inner {b: 1}".to_string()));
    assert!(lines.contains(&"inner returned 16".to_string()));
    assert_eq!(lines.last().unwrap(), "outer returned 16");
    Ok(())
}

#[test]
fn test_recursive_traced_function() -> anyhow::Result<()> {
    let (mut rt, sink) = runtime();
    let result = rt.eval_source(
        "
function fact(n) {
  return trace();
  if (n <= 1) {
    return 1;
  }
  return n * fact(n - 1);
}
fact(3);
",
    )?;
    assert_eq!(result, Value::Number(6.0));
    let returns: Vec<_> = sink
        .rendered()
        .into_iter()
        .filter(|line| line.starts_with("fact returned"))
        .collect();
    assert_eq!(returns, vec!["fact returned 1", "fact returned 2", "fact returned 6"]);
    Ok(())
}

#[test]
fn test_assertions_report_only_failures() -> anyhow::Result<()> {
    let (mut rt, sink) = runtime();
    rt.eval_source(
        "
function halve(n) {
  return trace(['n > 1', 'missing']);
  n = n / 2;
  return n;
}
halve(4);
",
    )?;
    let lines = sink.rendered();
    assert!(!lines.iter().any(|line| line.contains("ASSERTION FAILED")));
    assert!(lines.contains(
        &"halve: n = n / 2; missing: <ReferenceError: missing is not defined>".to_string()
    ));

    sink.clear();
    rt.eval_source("halve(2);")?;
    let failures: Vec<_> = sink
        .rendered()
        .into_iter()
        .filter(|line| line.contains("ASSERTION FAILED"))
        .collect();
    // after `n = n / 2;` and again before `return n;`
    assert_eq!(
        failures,
        vec![
            "halve: n = n / 2; ASSERTION FAILED n > 1 missing: <ReferenceError: missing is not defined>",
            "halve: return n; ASSERTION FAILED n > 1 missing: <ReferenceError: missing is not defined>",
        ]
    );
    Ok(())
}

#[test]
fn test_invalid_watch_fails_before_replay() -> anyhow::Result<()> {
    let (mut rt, sink) = runtime();
    rt.eval_source("function f(x) { return trace(['x +']); return x; }")?;
    let err = rt.eval_source("f(1);").unwrap_err();
    assert!(matches!(trace_error(&err), Some(TraceError::InvalidWatch { .. })));
    assert!(sink.lines().is_empty());
    Ok(())
}

#[test]
fn test_indirect_marker_is_not_found() -> anyhow::Result<()> {
    let (mut rt, _sink) = runtime();
    rt.eval_source(
        "
function sneaky() {
  var t = trace;
  return t();
}
function nested() {
  return 1 + trace();
}
",
    )?;
    for call in ["sneaky();", "nested();"] {
        let err = rt.eval_source(call).unwrap_err();
        match trace_error(&err) {
            Some(TraceError::MarkerNotFound { surface, .. }) => assert_eq!(surface, "trace"),
            other => panic!("Expected MarkerNotFound for {call}, got {other:?}"),
        }
        assert!(err.to_string().contains("return trace(...)"));
    }
    Ok(())
}

#[test]
fn test_builtins_have_no_source() {
    let (mut rt, _sink) = runtime();
    let err = rt.trace_function("log", Vec::new(), &[]).unwrap_err();
    assert!(matches!(
        trace_error(&err),
        Some(TraceError::SourceUnavailable { .. })
    ));
}

#[test]
fn test_trace_without_sink_is_rejected() {
    let mut interp = Interpreter::new(TraceConfig::default());
    let err = interp
        .eval_source("function f() { return trace(); }\nf();")
        .unwrap_err();
    assert_eq!(err, EvalError::Trace(TraceError::SinkMissing));
    assert!(err.to_string().contains("set_sink"));
}

#[test]
fn test_trace_outside_function_has_no_caller() {
    let (mut rt, _sink) = runtime();
    let err = rt.eval_source("trace();").unwrap_err();
    assert!(matches!(trace_error(&err), Some(TraceError::NoCaller { .. })));
}

#[test]
fn test_positional_faults_are_reported_and_absorbed() -> anyhow::Result<()> {
    let (mut rt, sink) = runtime();
    let result = rt.eval_source(
        "
function broken() {
  return trace();
  var v = undefinedThing + 1;
  return v;
}
broken();
",
    )?;
    assert_eq!(result, Value::Undefined);
    let reports = sink.reports();
    assert_eq!(reports.len(), 1);
    assert!(reports[0].starts_with("broken: ReferenceError: undefinedThing is not defined"));
    assert!(reports[0].contains("line 4"));
    Ok(())
}

#[test]
fn test_faults_without_position_propagate() -> anyhow::Result<()> {
    let (mut rt, sink) = runtime();
    rt.eval_source("function angry() {\n  return trace();\n  throw 'nope';\n}")?;
    let err = rt.eval_source("angry();").unwrap_err();
    assert!(matches!(
        err.downcast_ref::<EvalError>(),
        Some(EvalError::Thrown { .. })
    ));
    assert!(sink.reports().is_empty());
    Ok(())
}

#[test]
fn test_unreturned_marker_lets_original_body_continue() -> anyhow::Result<()> {
    let (mut rt, sink) = runtime();
    rt.eval_source(
        "
function bump(x) {
  trace();
  x = x + 1;
  return x;
}
",
    )?;
    // the replay increments x once, then the original body runs again
    assert_eq!(rt.eval_source("bump(1);")?, Value::Number(3.0));
    assert!(sink.rendered().contains(&"bump returned 2".to_string()));
    Ok(())
}

#[test]
fn test_direct_trace_instruments_whole_body() -> anyhow::Result<()> {
    let (mut rt, sink) = runtime();
    rt.eval_source("function mul(a, b) {\n  var p = a * b;\n  return p;\n}")?;
    let result = rt.trace_function("mul", vec![Value::Number(3.0), Value::Number(4.0)], &[])?;
    assert_eq!(result, Value::Number(12.0));
    assert_eq!(
        sink.rendered(),
        vec![
            "mul {a: 3, b: 4}",
            "mul: var p = a * b;",
            "mul: return p;",
            "mul returned 12",
        ]
    );
    Ok(())
}

#[test]
fn test_direct_trace_strips_markers() -> anyhow::Result<()> {
    let (mut rt, sink) = runtime();
    rt.eval_source(ADD)?;
    let result = rt.trace_call("add(1 + 1, 3)", &["sum".to_string()])?;
    assert_eq!(result, Value::Number(5.0));
    let lines = sink.rendered();
    assert_eq!(lines[0], "add {a: 2, b: 3}");
    assert!(lines.contains(&"add: var sum = a + b; sum: 5".to_string()));
    assert_eq!(lines.iter().filter(|l| l.starts_with("add returned")).count(), 1);
    Ok(())
}

#[test]
fn test_instrumented_listing() -> anyhow::Result<()> {
    let (mut rt, _sink) = runtime();
    rt.eval_source(ADD)?;
    let listing = rt.instrumented_listing("add")?;
    assert_eq!(
        listing,
        "var sum = a + b;\nlog(\"var sum = a + b;\");\nlog(\"return sum;\");\nreturn sum;\n"
    );
    Ok(())
}

#[test]
fn test_custom_surface_name_and_dump() -> anyhow::Result<()> {
    let config = TraceConfig {
        surface_name: "probe".to_string(),
        dump_instrumented: true,
        ..TraceConfig::default()
    };
    let (mut rt, sink) = runtime_with(config);
    let result = rt.eval_source("function id(v) {\n  return probe();\n  return v;\n}\nid(7);")?;
    assert_eq!(result, Value::Number(7.0));
    let lines = sink.rendered();
    assert_eq!(lines[1], "id: log(\"return v;\");\nreturn v;\n");
    assert_eq!(lines.last().unwrap(), "id returned 7");
    Ok(())
}

#[test]
fn test_call_depth_includes_replays() {
    let config = TraceConfig {
        max_call_depth: 12,
        ..TraceConfig::default()
    };
    let (mut rt, sink) = runtime_with(config);
    let result = rt
        .eval_source("function down(n) {\n  return trace();\n  return down(n + 1);\n}\ndown(0);")
        .unwrap();
    // the innermost replay reports the overflow and yields undefined
    assert_eq!(result, Value::Undefined);
    assert!(sink.reports()[0].contains("RangeError"));
}

#[test]
fn test_default_depth_limit_on_a_test_thread() -> anyhow::Result<()> {
    let (mut rt, sink) = runtime();
    let err = rt
        .eval_source("function down(n) { return down(n + 1); }\ndown(0);")
        .unwrap_err();
    assert!(matches!(
        err.downcast_ref::<EvalError>(),
        Some(EvalError::Runtime {
            kind: ErrorKind::RangeError,
            ..
        })
    ));

    let result = rt.eval_source(
        "function deeper(n) {\n  return trace();\n  return deeper(n + 1);\n}\ndeeper(0);",
    )?;
    assert_eq!(result, Value::Undefined);
    let reports = sink.reports();
    assert_eq!(reports.len(), 1);
    assert!(reports[0].contains("Maximum call stack size exceeded"));
    Ok(())
}

#[test]
fn test_marker_calls_inside_expressions_are_stripped() -> anyhow::Result<()> {
    let (mut rt, sink) = runtime();
    rt.eval_source("function d(a) {\n  return trace();\n  var r = trace() || a;\n  return r;\n}")?;
    assert_eq!(rt.eval_source("d(4);")?, Value::Number(4.0));
    assert_eq!(
        sink.rendered(),
        vec![
            "d {a: 4}",
            "d: var r = trace() || a;",
            "d: return r;",
            "d returned 4",
        ]
    );
    assert!(sink.reports().is_empty());
    Ok(())
}

#[test]
fn test_one_line_per_statement_with_watches() -> anyhow::Result<()> {
    let (mut rt, sink) = runtime();
    rt.eval_source("function f(a) {\n  return trace(['a', 'a * 2']);\n  a = a + 1;\n  return a;\n}")?;
    assert_eq!(rt.eval_source("f(1);")?, Value::Number(2.0));
    assert_eq!(
        sink.rendered(),
        vec![
            "f {a: 1}",
            "f: a = a + 1; a: 2 a * 2: 4",
            "f: return a; a: 2 a * 2: 4",
            "f returned 2",
        ]
    );
    Ok(())
}

#[test]
fn test_break_and_continue_are_logged_before_they_run() -> anyhow::Result<()> {
    let (mut rt, sink) = runtime();
    rt.eval_source(
        "
function skip(items) {
  return trace();
  var kept = 0;
  for (var i = 0; i < items.length; i++) {
    if (items[i] < 0) continue;
    if (items[i] > 9) break;
    kept++;
  }
  return kept;
}
",
    )?;
    assert_eq!(rt.eval_source("skip([1, -2, 10, 3]);")?, Value::Number(1.0));
    assert_eq!(
        sink.rendered(),
        vec![
            "skip {items: [1, -2, 10, 3]}",
            "skip: var kept = 0;",
            "skip: for (var i = 0; i < items.length; i++) {",
            "skip: kept++;",
            "skip: for (var i = 0; i < items.length; i++) {",
            "skip: if (items[i] < 0)",
            "skip: continue;",
            "skip: for (var i = 0; i < items.length; i++) {",
            "skip: if (items[i] > 9)",
            "skip: break;",
            "skip: return kept;",
            "skip returned 1",
        ]
    );
    Ok(())
}

#[test]
fn test_while_and_do_headers_fire_per_iteration() -> anyhow::Result<()> {
    let (mut rt, sink) = runtime();
    rt.eval_source(
        "
function countdown(n) {
  return trace();
  var steps = 0;
  while (n > 0) {
    n--;
    steps++;
  }
  do {
    steps += 10;
  } while (steps < 25);
  return steps;
}
",
    )?;
    assert_eq!(rt.eval_source("countdown(2);")?, Value::Number(32.0));
    let lines = sink.rendered();
    let count = |text: &str| lines.iter().filter(|line| line.as_str() == text).count();
    assert_eq!(count("countdown: while (n > 0) {"), 2);
    assert_eq!(count("countdown: n--;"), 2);
    assert_eq!(count("countdown: do {"), 3);
    assert_eq!(count("countdown: steps += 10;"), 3);
    assert_eq!(lines.last().unwrap(), "countdown returned 32");
    Ok(())
}

#[test]
fn test_else_branches_announce_themselves() -> anyhow::Result<()> {
    let (mut rt, sink) = runtime();
    rt.eval_source(
        "
function sign(x) {
  return trace();
  if (x > 0) {
    return 'pos';
  } else if (x < 0) {
    return 'neg';
  } else {
    return 'zero';
  }
}
",
    )?;
    rt.eval_source("sign(-1);")?;
    assert_eq!(
        sink.rendered(),
        vec![
            "sign {x: -1}",
            "sign: if (x < 0) {",
            "sign: return 'neg';",
            "sign returned neg",
        ]
    );

    sink.clear();
    rt.eval_source("sign(0);")?;
    assert_eq!(
        sink.rendered(),
        vec![
            "sign {x: 0}",
            "sign: } else {",
            "sign: return 'zero';",
            "sign returned zero",
        ]
    );
    Ok(())
}

#[test]
fn test_closure_writes_are_visible_through_the_facade() -> anyhow::Result<()> {
    let (mut rt, sink) = runtime();
    let result = rt.eval_source(
        "
function tally() {
  var count = 0;
  function bump() { count += 5; }
  function report(extra) {
    return trace(['count']);
    bump();
    return count + extra;
  }
  return report(1);
}
tally();
",
    )?;
    assert_eq!(result, Value::Number(6.0));
    assert_eq!(
        sink.rendered(),
        vec![
            "report {extra: 1}",
            "report: bump(); count: 5",
            "report: return count + extra; count: 5",
            "report returned 6",
        ]
    );
    Ok(())
}
