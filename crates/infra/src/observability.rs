//! Structured logger selection from `LECTERN_LOG_*` variables.

use lectern_adapters::{JsonLogger, LogSink, StderrLogSink, parse_log_level};
use lectern_ports::{LogFields, LogLevel, LoggerPort};
use lectern_shared::RequestContext;
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::Arc;

/// `json` enables the structured logger on stderr.
pub const ENV_LOG_FORMAT: &str = "LECTERN_LOG_FORMAT";
/// Minimum level (`debug`, `info`, `warn`, `error`); defaults to `info`.
pub const ENV_LOG_LEVEL: &str = "LECTERN_LOG_LEVEL";

/// Build the logger requested by the process environment, if any.
#[must_use]
pub fn logger_from_env() -> Option<Arc<dyn LoggerPort>> {
    let env = [ENV_LOG_FORMAT, ENV_LOG_LEVEL]
        .into_iter()
        .filter_map(|name| Some((name.to_string(), std::env::var(name).ok()?)))
        .collect();
    logger_from_map(&env, Arc::new(StderrLogSink))
}

/// Build a logger from explicit variables, writing to `sink`.
///
/// Returns `None` unless `LECTERN_LOG_FORMAT` is `json`. Unknown levels
/// fall back to `info`.
#[must_use]
pub fn logger_from_map(
    env: &BTreeMap<String, String>,
    sink: Arc<dyn LogSink>,
) -> Option<Arc<dyn LoggerPort>> {
    let enabled = env
        .get(ENV_LOG_FORMAT)
        .is_some_and(|value| value.trim().eq_ignore_ascii_case("json"));
    if !enabled {
        return None;
    }
    let level = env
        .get(ENV_LOG_LEVEL)
        .and_then(|value| parse_log_level(value))
        .unwrap_or(LogLevel::Info);
    Some(Arc::new(JsonLogger::new(sink).with_min_level(level)))
}

/// Child logger tagged with the request's correlation id.
#[must_use]
pub fn scope_logger(
    logger: Option<&Arc<dyn LoggerPort>>,
    ctx: &RequestContext,
) -> Option<Arc<dyn LoggerPort>> {
    let logger = logger?;
    let mut fields = LogFields::new();
    fields.insert(
        "correlationId".into(),
        Value::String(ctx.correlation_id().as_str().to_string()),
    );
    Some(Arc::from(logger.child(fields)))
}
