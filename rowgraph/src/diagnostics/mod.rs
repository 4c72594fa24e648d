//! Conversion diagnostics.
//!
//! Soft events (a list skipped for a row, a row without root key, a field with
//! no place to go) never fail a conversion. They are reported as [`LogEntry`]
//! values to whichever [`DiagnosticSink`] the caller hands to the converter.

use serde::{Deserialize, Serialize};
use std::sync::Mutex;

/// Log level for display
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Info,
    Success,
    Warning,
    Error,
}

/// A single log entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogEntry {
    pub level: LogLevel,
    pub message: String,
    /// Nesting level for display
    #[serde(default)]
    pub indent: u8,
}

impl LogEntry {
    pub fn info(message: impl Into<String>) -> Self {
        Self { level: LogLevel::Info, message: message.into(), indent: 0 }
    }

    pub fn success(message: impl Into<String>) -> Self {
        Self { level: LogLevel::Success, message: message.into(), indent: 0 }
    }

    pub fn warning(message: impl Into<String>) -> Self {
        Self { level: LogLevel::Warning, message: message.into(), indent: 0 }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self { level: LogLevel::Error, message: message.into(), indent: 0 }
    }

    pub fn with_indent(mut self, indent: u8) -> Self {
        self.indent = indent;
        self
    }
}

/// Receives diagnostics from a conversion.
pub trait DiagnosticSink {
    fn log(&self, entry: LogEntry);
}

/// Prints entries to stderr.
#[derive(Debug, Clone, Copy, Default)]
pub struct StderrSink {
    /// Drop `Info` entries
    pub quiet: bool,
}

impl DiagnosticSink for StderrSink {
    fn log(&self, entry: LogEntry) {
        if self.quiet && entry.level == LogLevel::Info {
            return;
        }
        let prefix = match entry.level {
            LogLevel::Info => "   ",
            LogLevel::Success => "   ✓",
            LogLevel::Warning => "   ⚠️",
            LogLevel::Error => "   ❌",
        };
        let indent = "   ".repeat(entry.indent as usize);
        eprintln!("{}{} {}", indent, prefix, entry.message);
    }
}

/// Collects entries in memory.
#[derive(Debug, Default)]
pub struct MemorySink {
    entries: Mutex<Vec<LogEntry>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of everything logged so far.
    pub fn entries(&self) -> Vec<LogEntry> {
        match self.entries.lock() {
            Ok(entries) => entries.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    pub fn count(&self, level: LogLevel) -> usize {
        self.entries().iter().filter(|e| e.level == level).count()
    }
}

impl DiagnosticSink for MemorySink {
    fn log(&self, entry: LogEntry) {
        match self.entries.lock() {
            Ok(mut entries) => entries.push(entry),
            Err(poisoned) => poisoned.into_inner().push(entry),
        }
    }
}

/// Forward to an optional sink.
pub(crate) fn emit(sink: Option<&dyn DiagnosticSink>, entry: LogEntry) {
    if let Some(sink) = sink {
        sink.log(entry);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entry_constructors() {
        let entry = LogEntry::warning("skipped").with_indent(2);
        assert_eq!(entry.level, LogLevel::Warning);
        assert_eq!(entry.message, "skipped");
        assert_eq!(entry.indent, 2);
        assert_eq!(LogEntry::success("ok").level, LogLevel::Success);
    }

    #[test]
    fn test_entry_serialization() {
        let json = serde_json::to_value(LogEntry::error("boom")).unwrap();
        assert_eq!(json, serde_json::json!({ "level": "error", "message": "boom", "indent": 0 }));
    }

    #[test]
    fn test_memory_sink_collects() {
        let sink = MemorySink::new();
        emit(Some(&sink), LogEntry::info("a"));
        emit(Some(&sink), LogEntry::warning("b"));
        emit(None, LogEntry::warning("dropped"));

        assert_eq!(sink.entries().len(), 2);
        assert_eq!(sink.count(LogLevel::Warning), 1);
    }
}
