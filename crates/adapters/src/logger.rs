//! Structured JSON logger adapter.
//!
//! One JSON object per line:
//! `{"timestampMs":..,"level":"info","event":"retrieval.fetch.completed","message":..,"fields":{..}}`.
//! Secret-looking keys are redacted at any depth before a line is written.

use crate::log_sink::LogSink;
use lectern_ports::{LogEvent, LogFields, LogLevel, LoggerPort};
use lectern_shared::{REDACTED, is_secret_key};
use serde_json::{Map, Value};
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

const SERIALIZE_FAILED_LINE: &str = "{\"timestampMs\":0,\"level\":\"error\",\"event\":\"logger.serialize_failed\",\"message\":\"log serialization failed\"}\n";

/// JSON logger emitting one line per event.
#[derive(Clone)]
pub struct JsonLogger {
    sink: Arc<dyn LogSink>,
    base_fields: LogFields,
    min_level: LogLevel,
}

impl JsonLogger {
    /// Create a JSON logger backed by `sink`, logging `info` and above.
    #[must_use]
    pub fn new(sink: Arc<dyn LogSink>) -> Self {
        Self {
            sink,
            base_fields: LogFields::new(),
            min_level: LogLevel::Info,
        }
    }

    /// Set base fields applied to every event.
    #[must_use]
    pub fn with_base_fields(mut self, fields: LogFields) -> Self {
        self.base_fields = fields;
        self
    }

    /// Set the minimum log level.
    #[must_use]
    pub const fn with_min_level(mut self, level: LogLevel) -> Self {
        self.min_level = level;
        self
    }

    fn render(&self, event: LogEvent) -> String {
        let mut fields = self.base_fields.clone();
        fields.extend(event.fields.unwrap_or_default());

        let mut payload = Map::new();
        payload.insert("timestampMs".to_string(), Value::from(now_epoch_ms()));
        payload.insert("level".to_string(), Value::from(event.level.as_str()));
        payload.insert("event".to_string(), Value::from(event.event.as_ref()));
        payload.insert("message".to_string(), Value::from(event.message.as_ref()));
        if !fields.is_empty() {
            let mut fields: Value = fields
                .into_iter()
                .map(|(key, value)| (key.into_string(), value))
                .collect::<Map<_, _>>()
                .into();
            redact_value(&mut fields);
            payload.insert("fields".to_string(), fields);
        }
        if let Some(mut error) = event.error {
            redact_value(&mut error);
            payload.insert("error".to_string(), error);
        }

        serde_json::to_string(&Value::Object(payload)).map_or_else(
            |_| SERIALIZE_FAILED_LINE.to_string(),
            |mut encoded| {
                encoded.push('\n');
                encoded
            },
        )
    }
}

impl std::fmt::Debug for JsonLogger {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        formatter
            .debug_struct("JsonLogger")
            .field("min_level", &self.min_level)
            .field("base_fields", &self.base_fields.len())
            .finish_non_exhaustive()
    }
}

impl LoggerPort for JsonLogger {
    fn log(&self, event: LogEvent) {
        if event.level < self.min_level {
            return;
        }
        let line = self.render(event);
        self.sink.write_line(&line);
    }

    fn child(&self, fields: LogFields) -> Box<dyn LoggerPort> {
        let mut merged = self.base_fields.clone();
        merged.extend(fields);
        Box::new(Self {
            sink: Arc::clone(&self.sink),
            base_fields: merged,
            min_level: self.min_level,
        })
    }
}

/// Parse a level name (`debug`, `info`, `warn`/`warning`, `error`), ignoring case.
#[must_use]
pub fn parse_log_level(value: &str) -> Option<LogLevel> {
    match value.trim().to_ascii_lowercase().as_str() {
        "debug" | "trace" => Some(LogLevel::Debug),
        "info" => Some(LogLevel::Info),
        "warn" | "warning" => Some(LogLevel::Warn),
        "error" => Some(LogLevel::Error),
        _ => None,
    }
}

fn redact_value(value: &mut Value) {
    match value {
        Value::Object(map) => {
            for (key, nested) in map.iter_mut() {
                if is_secret_key(key) {
                    *nested = Value::String(REDACTED.to_string());
                } else {
                    redact_value(nested);
                }
            }
        },
        Value::Array(items) => items.iter_mut().for_each(redact_value),
        _ => {},
    }
}

fn now_epoch_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .ok()
        .and_then(|duration| u64::try_from(duration.as_millis()).ok())
        .unwrap_or_default()
}
