//! Structured logging port.
//!
//! Event names are dotted and stable (`retrieval.fetch.failed`,
//! `search.stale_discarded`); messages are short and carry no secrets.

use lectern_shared::ErrorEnvelope;
use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// Severity, ordered from least to most severe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum LogLevel {
    /// Per-call detail such as cache hits and joined fetches.
    Debug,
    /// Completed operations.
    Info,
    /// Failed operations the caller can recover from.
    Warn,
    /// Failures nobody handles.
    Error,
}

impl LogLevel {
    /// Lowercase name used in rendered output.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Debug => "debug",
            Self::Info => "info",
            Self::Warn => "warn",
            Self::Error => "error",
        }
    }
}

/// Structured fields attached to an event.
pub type LogFields = BTreeMap<Box<str>, Value>;

/// One structured log event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogEvent {
    /// Stable event name.
    pub event: Box<str>,
    /// Severity.
    pub level: LogLevel,
    /// Human-readable message.
    pub message: Box<str>,
    /// Optional structured fields.
    pub fields: Option<LogFields>,
    /// Optional error payload; see [`LogEvent::with_error`].
    pub error: Option<Value>,
}

impl LogEvent {
    /// Event without fields or error.
    pub fn new(level: LogLevel, event: &str, message: &str) -> Self {
        Self {
            event: event.into(),
            level,
            message: message.into(),
            fields: None,
            error: None,
        }
    }

    /// Attach structured fields.
    #[must_use]
    pub fn with_fields(mut self, fields: Option<LogFields>) -> Self {
        self.fields = fields;
        self
    }

    /// Attach `error` as `{code, message, retriable, metadata}`.
    ///
    /// Metadata is copied as-is; loggers redact secret-looking keys on output.
    #[must_use]
    pub fn with_error(mut self, error: &ErrorEnvelope) -> Self {
        let mut payload = Map::new();
        payload.insert("code".to_owned(), Value::from(error.code.to_string()));
        payload.insert("message".to_owned(), Value::from(error.message.as_str()));
        payload.insert("retriable".to_owned(), Value::from(error.class.is_retriable()));
        if !error.metadata.is_empty() {
            let metadata = error
                .metadata
                .iter()
                .map(|(key, value)| (key.clone(), Value::from(value.as_str())))
                .collect::<Map<_, _>>();
            payload.insert("metadata".to_owned(), Value::Object(metadata));
        }
        self.error = Some(Value::Object(payload));
        self
    }
}

/// Sink for structured events.
///
/// Implementations filter by level themselves; callers never check first.
pub trait LoggerPort: Send + Sync {
    /// Emit an event.
    fn log(&self, event: LogEvent);

    /// Logger that adds `fields` to every event it emits.
    fn child(&self, fields: LogFields) -> Box<dyn LoggerPort>;

    /// Emit a debug event.
    fn debug(&self, event: &str, message: &str, fields: Option<LogFields>) {
        self.log(LogEvent::new(LogLevel::Debug, event, message).with_fields(fields));
    }

    /// Emit an info event.
    fn info(&self, event: &str, message: &str, fields: Option<LogFields>) {
        self.log(LogEvent::new(LogLevel::Info, event, message).with_fields(fields));
    }

    /// Emit a warn event.
    fn warn(&self, event: &str, message: &str, fields: Option<LogFields>) {
        self.log(LogEvent::new(LogLevel::Warn, event, message).with_fields(fields));
    }

    /// Emit an error event.
    fn error(&self, event: &str, message: &str, fields: Option<LogFields>) {
        self.log(LogEvent::new(LogLevel::Error, event, message).with_fields(fields));
    }
}
