use std::{cell::RefCell, rc::Rc};

use pretty_assertions::assert_eq;
use retrace_core::{MemorySink, TraceConfig, TraceRuntime};
use retrace_repl::repl::{Repl, ReplCommand, ReplNotifier};

/// Notifier that records everything it is handed
#[derive(Default)]
struct RecordingNotifier {
    output: Rc<RefCell<Vec<String>>>,
}

impl ReplNotifier for RecordingNotifier {
    fn on_output(&self, content: &str) {
        self.output.borrow_mut().push(content.to_string());
    }

    fn on_error(&self, content: &str) {
        self.output.borrow_mut().push(format!("error: {content}"));
    }

    fn on_result(&self, output: &str, _duration_ms: u64, _quiet: bool) {
        self.output.borrow_mut().push(output.to_string());
    }
}

const ADD: &str = "function add(a, b) {
  return trace();
  var sum = a + b;
  return sum;
}";

fn repl() -> (Repl, Rc<MemorySink>) {
    let sink = Rc::new(MemorySink::new());
    let runtime = TraceRuntime::with_sink(TraceConfig::default(), sink.clone());
    (Repl::new(runtime), sink)
}

#[test]
fn test_basic_arithmetic() {
    let (mut repl, _) = repl();
    let (output, _duration) = repl.execute("1 + 2").unwrap();
    assert_eq!(output, "3");
}

#[test]
fn test_string_results_are_quoted() {
    let (mut repl, _) = repl();
    let (output, _) = repl.execute("'a' + 1").unwrap();
    assert_eq!(output, "\"a1\"");
}

#[test]
fn test_marker_trace_from_executed_code() {
    let (mut repl, sink) = repl();
    repl.execute(ADD).unwrap();
    let (output, _) = repl.execute("add(2, 3)").unwrap();
    assert_eq!(output, "5");
    assert_eq!(sink.rendered().last().unwrap(), "add returned 5");
}

#[test]
fn test_load_and_trace_command() {
    let temp_dir = tempfile::tempdir().unwrap();
    let path = temp_dir.path().join("add.js");
    std::fs::write(&path, ADD).unwrap();

    let (mut repl, sink) = repl();
    let path = path.display().to_string();
    let loaded = repl.handle_command(ReplCommand::Load(path.clone())).unwrap();
    assert!(loaded.starts_with(&format!("Loaded {path}")));

    let result = repl
        .handle_command(ReplCommand::Trace("add(2, 3)".to_string()))
        .unwrap();
    assert_eq!(result, "=> 5");
    assert_eq!(
        sink.rendered(),
        vec![
            "add {a: 2, b: 3}",
            "add: var sum = a + b;",
            "add: return sum;",
            "add returned 5",
        ]
    );
}

#[test]
fn test_load_missing_file() {
    let temp_dir = tempfile::tempdir().unwrap();
    let (mut repl, _) = repl();
    let missing = temp_dir.path().join("missing.js").display().to_string();
    assert!(repl.handle_command(ReplCommand::Load(missing)).is_err());
}

#[test]
fn test_watch_list_applies_to_traces() {
    let (mut repl, sink) = repl();
    repl.execute(ADD).unwrap();

    assert_eq!(
        repl.handle_command(ReplCommand::Watch("sum".to_string())).unwrap(),
        "Watching sum"
    );
    assert_eq!(
        repl.handle_command(ReplCommand::Watch("sum > 5".to_string())).unwrap(),
        "Asserting sum > 5"
    );
    assert_eq!(
        repl.handle_command(ReplCommand::Watches).unwrap(),
        "Watches:\n  1. sum\n  2. sum > 5"
    );

    repl.handle_command(ReplCommand::Trace("add(2, 3)".to_string()))
        .unwrap();
    assert_eq!(
        sink.rendered(),
        vec![
            "add {a: 2, b: 3}",
            "add: var sum = a + b; sum: 5 ASSERTION FAILED sum > 5",
            "add: return sum; sum: 5 ASSERTION FAILED sum > 5",
            "add returned 5",
        ]
    );

    assert!(repl
        .handle_command(ReplCommand::Unwatch(Some("total".to_string())))
        .is_err());
    repl.handle_command(ReplCommand::Unwatch(Some("sum".to_string())))
        .unwrap();
    assert_eq!(repl.watches(), ["sum > 5".to_string()]);
    assert_eq!(
        repl.handle_command(ReplCommand::Unwatch(None)).unwrap(),
        "Cleared 1 watch expression(s)"
    );
    assert!(repl.watches().is_empty());
}

#[test]
fn test_invalid_watch_is_rejected() {
    let (mut repl, _) = repl();
    assert!(repl
        .handle_command(ReplCommand::Watch("sum +".to_string()))
        .is_err());
    assert!(repl.watches().is_empty());
}

#[test]
fn test_instrument_command() {
    let (mut repl, _) = repl();
    repl.execute(ADD).unwrap();
    let listing = repl
        .handle_command(ReplCommand::Instrument("add".to_string()))
        .unwrap();
    assert_eq!(
        listing,
        "var sum = a + b;\nlog(\"var sum = a + b;\");\nlog(\"return sum;\");\nreturn sum;\n"
    );
    assert!(repl
        .handle_command(ReplCommand::Instrument("nothing".to_string()))
        .is_err());
}

#[test]
fn test_env_lists_script_globals() {
    let (mut repl, _) = repl();
    assert_eq!(
        repl.handle_command(ReplCommand::Env).unwrap(),
        "No globals defined."
    );
    repl.execute("var x = 1;\nvar label = 'box';").unwrap();
    assert_eq!(
        repl.handle_command(ReplCommand::Env).unwrap(),
        "Globals:\n  x = 1\n  label = \"box\""
    );
}

#[test]
fn test_debug_dumps_instrumented_body() {
    let (mut repl, sink) = repl();
    repl.execute(ADD).unwrap();
    assert_eq!(
        repl.handle_command(ReplCommand::Debug).unwrap(),
        "Debug mode: on"
    );
    repl.execute("add(1, 1)").unwrap();
    assert!(sink.rendered()[1].starts_with("add: var sum = a + b;\n"));
}

#[test]
fn test_trace_errors_are_reported() {
    let (mut repl, _) = repl();
    let err = repl
        .handle_command(ReplCommand::Trace("nope(1)".to_string()))
        .unwrap_err();
    assert!(err.to_string().contains("nope is not defined"));
    assert!(repl
        .handle_command(ReplCommand::Trace("1 + 2".to_string()))
        .is_err());
}

#[test]
fn test_quit_and_toggles() {
    let (mut repl, _) = repl();
    assert_eq!(
        repl.handle_command(ReplCommand::Quiet).unwrap(),
        "Quiet mode: on"
    );
    assert!(repl.is_quiet());
    assert!(repl.is_running());
    repl.handle_command(ReplCommand::Quit).unwrap();
    assert!(!repl.is_running());
}

#[test]
fn test_exit_stats_go_through_the_notifier() {
    let (mut repl, _) = repl();
    let notifier = RecordingNotifier::default();
    let output = Rc::clone(&notifier.output);
    repl.set_notifier(Box::new(notifier));

    repl.show_exit_stats();
    assert_eq!(*output.borrow(), vec!["\nSession complete.".to_string()]);

    repl.set_quiet(true);
    repl.show_exit_stats();
    assert_eq!(output.borrow().len(), 1);
}
