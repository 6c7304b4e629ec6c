//! Structured JSON log lines
//!
//! One event is one JSON object on one line, assembled with a builder
//! and written synchronously:
//! - the event name leads, severity second, then fields in the order
//!   they were attached
//! - string escaping is delegated to serde_json, the same codec the
//!   wire uses
//! - the line is flushed before `emit` returns

use std::fmt;
use std::io::{self, Write};

/// Log severity levels
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// Normal operations
    Info,
    /// Degraded but self-repairing conditions
    Warn,
    /// Operation failures
    Error,
}

impl Severity {
    /// Returns the string representation
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Info => "INFO",
            Severity::Warn => "WARN",
            Severity::Error => "ERROR",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Builder for one log line
///
/// Field values are anything displayable; they are stringified when
/// attached, so a line can be built while locks are held and emitted
/// after they are released.
pub struct LogLine {
    severity: Severity,
    event: String,
    fields: Vec<(String, String)>,
}

impl LogLine {
    pub fn info(event: impl Into<String>) -> Self {
        Self::at(Severity::Info, event)
    }

    pub fn warn(event: impl Into<String>) -> Self {
        Self::at(Severity::Warn, event)
    }

    pub fn error(event: impl Into<String>) -> Self {
        Self::at(Severity::Error, event)
    }

    pub fn at(severity: Severity, event: impl Into<String>) -> Self {
        Self {
            severity,
            event: event.into(),
            fields: Vec::new(),
        }
    }

    pub fn severity(&self) -> Severity {
        self.severity
    }

    /// Attach a field. Fields keep their attachment order in the output.
    pub fn field(mut self, key: impl Into<String>, value: impl fmt::Display) -> Self {
        self.fields.push((key.into(), value.to_string()));
        self
    }

    /// Write the line. Errors go to stderr, everything else to stdout.
    pub fn emit(self) {
        let line = self.render();
        if self.severity == Severity::Error {
            write_line(&mut io::stderr(), &line);
        } else {
            write_line(&mut io::stdout(), &line);
        }
    }

    fn render(&self) -> String {
        let mut out = String::from("{");
        append_pair(&mut out, "event", &self.event);
        out.push(',');
        append_pair(&mut out, "severity", self.severity.as_str());
        for (key, value) in &self.fields {
            out.push(',');
            append_pair(&mut out, key, value);
        }
        out.push_str("}\n");
        out
    }
}

fn append_pair(out: &mut String, key: &str, value: &str) {
    out.push_str(&json_string(key));
    out.push(':');
    out.push_str(&json_string(value));
}

fn json_string(raw: &str) -> String {
    // serde_json quotes and escapes; encoding a plain string cannot
    // realistically fail, so fall back to an empty string rather than
    // letting logging panic.
    serde_json::to_string(raw).unwrap_or_else(|_| String::from("\"\""))
}

fn write_line<W: Write>(writer: &mut W, line: &str) {
    // A single write keeps concurrent tasks from interleaving lines.
    let _ = writer.write_all(line.as_bytes());
    let _ = writer.flush();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_severity_names() {
        assert_eq!(Severity::Info.as_str(), "INFO");
        assert_eq!(Severity::Warn.as_str(), "WARN");
        assert_eq!(Severity::Error.as_str(), "ERROR");
    }

    #[test]
    fn test_event_and_severity_lead_the_line() {
        let line = LogLine::warn("SOMETHING").field("a", "b").render();
        assert!(line.starts_with("{\"event\":\"SOMETHING\",\"severity\":\"WARN\""));
        assert!(line.ends_with("}\n"));
    }

    #[test]
    fn test_fields_keep_attachment_order() {
        let line = LogLine::info("ORDERED")
            .field("zebra", 1)
            .field("alpha", 2)
            .render();
        let zebra = line.find("zebra").unwrap();
        let alpha = line.find("alpha").unwrap();
        assert!(zebra < alpha);
    }

    #[test]
    fn test_values_are_json_escaped() {
        let line = LogLine::info("ESCAPE").field("key", "a\"b\nc").render();
        assert!(line.contains("a\\\"b\\nc"));
        assert!(serde_json::from_str::<serde_json::Value>(line.trim()).is_ok());
    }

    #[test]
    fn test_displayable_values() {
        let line = LogLine::info("TYPES")
            .field("count", 42u64)
            .field("flag", true)
            .render();
        assert!(line.contains("\"count\":\"42\""));
        assert!(line.contains("\"flag\":\"true\""));
    }

    #[test]
    fn test_emit_does_not_panic() {
        LogLine::info("EMIT_OK").field("k", "v").emit();
        LogLine::error("EMIT_ERR").emit();
    }
}
