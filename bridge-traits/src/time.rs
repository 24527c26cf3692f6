//! Clock and host log forwarding.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::error::Result;

/// Source of the current time.
///
/// Cached responses are aged and OAuth tokens expire against this clock, so
/// tests can move time without sleeping.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

/// A log line handed to the host, fields sorted by name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogEntry {
    pub level: LogLevel,
    pub timestamp: DateTime<Utc>,
    /// Module path, e.g. `core_sync::pipeline`
    pub target: String,
    pub message: String,
    pub fields: BTreeMap<String, String>,
    /// Name of the innermost span, e.g. `run` or `fetch_characters`
    pub span: Option<String>,
}

impl LogEntry {
    pub fn new(level: LogLevel, target: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            level,
            timestamp: Utc::now(),
            target: target.into(),
            message: message.into(),
            fields: BTreeMap::new(),
            span: None,
        }
    }

    pub fn with_field(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.fields.insert(key.into(), value.into());
        self
    }

    pub fn in_span(mut self, span: impl Into<String>) -> Self {
        self.span = Some(span.into());
        self
    }
}

/// Host logging pipeline (OSLog, Logcat, a desktop console).
///
/// Entries arrive with access tokens already masked.
#[async_trait::async_trait]
pub trait LoggerSink: Send + Sync {
    async fn log(&self, entry: LogEntry) -> Result<()>;

    async fn flush(&self) -> Result<()> {
        Ok(())
    }

    /// Entries below this level are not forwarded.
    fn min_level(&self) -> LogLevel {
        LogLevel::Info
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_entry_fields_are_sorted() {
        let entry = LogEntry::new(LogLevel::Warn, "core_sync::pipeline", "Sync stage stalled")
            .with_field("stage", "fetch_raid_journals")
            .with_field("reason", "retry ceiling")
            .in_span("run");

        let keys: Vec<_> = entry.fields.keys().map(String::as_str).collect();
        assert_eq!(keys, vec!["reason", "stage"]);
        assert_eq!(entry.span.as_deref(), Some("run"));
    }

    #[test]
    fn test_levels_order_by_severity() {
        assert!(LogLevel::Trace < LogLevel::Debug);
        assert!(LogLevel::Warn < LogLevel::Error);
    }
}
