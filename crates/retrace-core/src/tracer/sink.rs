use std::cell::RefCell;

use tracing::warn;

use crate::evaluator::Value;

/// Destination for trace output. `log` receives one line of values;
/// `report` receives diagnostics for faults absorbed during a replay.
pub trait LogSink {
    fn log(&self, values: &[Value]);
    fn report(&self, message: &str);
}

/// Space-separated display form of a log line
pub fn render_line(values: &[Value]) -> String {
    values
        .iter()
        .map(|value| value.to_string())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Writes lines to stdout and reports to stderr
#[derive(Debug, Default, Clone, Copy)]
pub struct ConsoleSink;

impl LogSink for ConsoleSink {
    fn log(&self, values: &[Value]) {
        println!("{}", render_line(values));
    }

    fn report(&self, message: &str) {
        eprintln!("{message}");
    }
}

/// Writes each line as a JSON array on stdout
#[derive(Debug, Default, Clone, Copy)]
pub struct JsonSink;

impl LogSink for JsonSink {
    fn log(&self, values: &[Value]) {
        match serde_json::to_string(values) {
            Ok(line) => println!("{line}"),
            Err(e) => warn!("Failed to serialize trace line: {}", e),
        }
    }

    fn report(&self, message: &str) {
        println!("{}", serde_json::json!({ "report": message }));
    }
}

/// Collects output in memory
#[derive(Debug, Default)]
pub struct MemorySink {
    lines: RefCell<Vec<Vec<Value>>>,
    reports: RefCell<Vec<String>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn lines(&self) -> Vec<Vec<Value>> {
        self.lines.borrow().clone()
    }

    /// Lines in their console form
    pub fn rendered(&self) -> Vec<String> {
        self.lines.borrow().iter().map(|l| render_line(l)).collect()
    }

    pub fn reports(&self) -> Vec<String> {
        self.reports.borrow().clone()
    }

    pub fn clear(&self) {
        self.lines.borrow_mut().clear();
        self.reports.borrow_mut().clear();
    }
}

impl LogSink for MemorySink {
    fn log(&self, values: &[Value]) {
        self.lines.borrow_mut().push(values.to_vec());
    }

    fn report(&self, message: &str) {
        self.reports.borrow_mut().push(message.to_string());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memory_sink_records_lines_and_reports() {
        let sink = MemorySink::new();
        sink.log(&[Value::from("add:"), Value::from("return a + b;")]);
        sink.report("boom");
        assert_eq!(sink.rendered(), vec!["add: return a + b;".to_string()]);
        assert_eq!(sink.reports(), vec!["boom".to_string()]);
        sink.clear();
        assert!(sink.lines().is_empty());
    }
}
