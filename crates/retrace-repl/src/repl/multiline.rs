//! Multi-line input collection for the REPL
//!
//! Collects lines until the buffer holds a complete chunk of source:
//! - Bracket/brace/paren matching
//! - String literal and line comment handling
//! - A parse attempt to catch dangling operators

use retrace_core::parse_program;

/// Result of processing a line of input
#[derive(Debug, PartialEq)]
pub enum LineProcessResult {
    /// Input is complete and ready for execution
    Complete(String),
    /// More input is needed to complete the statement
    NeedMore,
}

/// Collects multi-line input for complete statements
pub struct MultiLineCollector {
    buffer: String,
    /// Open braces, brackets and parens
    nesting_level: i32,
    in_string: bool,
    string_delimiter: char,
    last_was_escape: bool,
}

impl MultiLineCollector {
    pub fn new() -> Self {
        Self {
            buffer: String::new(),
            nesting_level: 0,
            in_string: false,
            string_delimiter: '"',
            last_was_escape: false,
        }
    }

    /// Get the appropriate prompt for the current state
    pub fn get_prompt(&self) -> &'static str {
        if self.is_collecting() {
            ".. "
        } else {
            ">> "
        }
    }

    pub fn is_collecting(&self) -> bool {
        !self.buffer.is_empty()
    }

    pub fn reset(&mut self) {
        self.buffer.clear();
        self.nesting_level = 0;
        self.in_string = false;
        self.last_was_escape = false;
    }

    /// Process a line of input
    pub fn process_line(&mut self, line: &str) -> LineProcessResult {
        if !self.buffer.is_empty() {
            self.buffer.push('\n');
        }
        self.buffer.push_str(line);

        self.update_parsing_state(line);

        if self.is_complete_statement() {
            let complete_code = std::mem::take(&mut self.buffer);
            self.reset();
            LineProcessResult::Complete(complete_code)
        } else {
            LineProcessResult::NeedMore
        }
    }

    fn update_parsing_state(&mut self, line: &str) {
        let mut chars = line.chars().peekable();
        while let Some(ch) = chars.next() {
            if self.in_string {
                if self.last_was_escape {
                    self.last_was_escape = false;
                } else if ch == '\\' {
                    self.last_was_escape = true;
                } else if ch == self.string_delimiter {
                    self.in_string = false;
                }
                continue;
            }
            match ch {
                '/' if chars.peek() == Some(&'/') => break,
                '"' | '\'' => {
                    self.in_string = true;
                    self.string_delimiter = ch;
                    self.last_was_escape = false;
                }
                '{' | '(' | '[' => self.nesting_level += 1,
                '}' | ')' | ']' => self.nesting_level -= 1,
                _ => {}
            }
        }
        // Strings do not continue past the end of a line
        self.in_string = false;
    }

    fn is_complete_statement(&self) -> bool {
        if self.nesting_level > 0 {
            return false;
        }
        if parse_program(&self.buffer).is_ok() {
            return true;
        }

        // Let the evaluator report real syntax errors; only wait for more
        // input when the buffer ends in something that needs a continuation
        let trimmed = self.buffer.trim_end();
        let dangling = [
            ",", "=", "+", "-", "*", "/", "%", "&&", "||", "?", ":", "<", ">", "!", ".",
        ];
        let dangling_keyword = ["else", "return", "typeof", "function", "do"];
        !(dangling.iter().any(|op| trimmed.ends_with(op))
            || dangling_keyword
                .iter()
                .any(|kw| trimmed.split_whitespace().last() == Some(*kw)))
    }
}

impl Default for MultiLineCollector {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_simple_complete_statement() {
        let mut collector = MultiLineCollector::new();
        assert_eq!(
            collector.process_line("var x = 42;"),
            LineProcessResult::Complete("var x = 42;".to_string())
        );
        assert!(!collector.is_collecting());
    }

    #[test]
    fn test_multiline_function() {
        let mut collector = MultiLineCollector::new();
        assert_eq!(collector.process_line("function add(a, b) {"), LineProcessResult::NeedMore);
        assert_eq!(collector.get_prompt(), ".. ");
        assert_eq!(collector.process_line("  return a + b;"), LineProcessResult::NeedMore);
        match collector.process_line("}") {
            LineProcessResult::Complete(code) => {
                assert_eq!(code, "function add(a, b) {\n  return a + b;\n}");
            }
            LineProcessResult::NeedMore => panic!("Expected complete statement"),
        }
        assert_eq!(collector.get_prompt(), ">> ");
    }

    #[test]
    fn test_brackets_inside_strings_are_ignored() {
        let mut collector = MultiLineCollector::new();
        assert_eq!(
            collector.process_line("var s = '{ not a block';"),
            LineProcessResult::Complete("var s = '{ not a block';".to_string())
        );
        assert_eq!(
            collector.process_line("var t = 1; // {"),
            LineProcessResult::Complete("var t = 1; // {".to_string())
        );
    }

    #[test]
    fn test_dangling_operator_waits() {
        let mut collector = MultiLineCollector::new();
        assert_eq!(collector.process_line("var total = 1 +"), LineProcessResult::NeedMore);
        assert_eq!(
            collector.process_line("  2;"),
            LineProcessResult::Complete("var total = 1 +\n  2;".to_string())
        );
    }

    #[test]
    fn test_syntax_error_is_complete() {
        let mut collector = MultiLineCollector::new();
        assert_eq!(
            collector.process_line("var = ;"),
            LineProcessResult::Complete("var = ;".to_string())
        );
    }

    #[test]
    fn test_reset_discards_buffer() {
        let mut collector = MultiLineCollector::new();
        collector.process_line("if (x) {");
        assert!(collector.is_collecting());
        collector.reset();
        assert!(!collector.is_collecting());
    }
}
