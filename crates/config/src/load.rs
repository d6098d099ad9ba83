//! Config loading helpers (env + file + overrides).
//!
//! The loader is responsible for deterministic merge order and surfacing
//! user-facing errors as typed `ErrorEnvelope`s.

use crate::{LecternConfig, LecternEnv, SourceKind, ValidatedLecternConfig, apply_env_overrides};
use lectern_shared::{ErrorClass, ErrorCode, ErrorEnvelope};
use serde::Deserialize;
use std::path::Path;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ConfigFormat {
    Json,
    Toml,
}

/// Load the config from sources using a deterministic precedence order.
///
/// Precedence (highest wins):
/// - env overrides (`LecternEnv`)
/// - overrides JSON (partial config)
/// - config JSON (file content)
/// - defaults (`LecternConfig::default()`)
pub fn load_lectern_config_from_sources(
    config_json: Option<&str>,
    overrides_json: Option<&str>,
    env: &LecternEnv,
) -> Result<ValidatedLecternConfig, ErrorEnvelope> {
    let mut config = match config_json {
        None => LecternConfig::default(),
        Some(input) => parse_config_unvalidated(input, ConfigFormat::Json)?,
    };

    if let Some(input) = overrides_json {
        let overrides = parse_overrides_json(input)?;
        apply_overrides(&mut config, &overrides);
    }

    // env is applied last and also validates/normalizes the resulting config.
    apply_env_overrides(config, env)
}

/// Load the config from an optional file path.
pub fn load_lectern_config_from_path(
    config_path: Option<&Path>,
    overrides_json: Option<&str>,
    env: &LecternEnv,
) -> Result<ValidatedLecternConfig, ErrorEnvelope> {
    let mut config = match config_path {
        None => LecternConfig::default(),
        Some(path) => {
            let config_text = read_config_file(path)?;
            let format = detect_config_format(path)?;
            parse_config_unvalidated(&config_text, format)?
        },
    };

    if let Some(input) = overrides_json {
        let overrides = parse_overrides_json(input)?;
        apply_overrides(&mut config, &overrides);
    }

    apply_env_overrides(config, env)
}

/// Load the config from std env and an optional file path.
pub fn load_lectern_config_std_env(
    config_path: Option<&Path>,
    overrides_json: Option<&str>,
) -> Result<ValidatedLecternConfig, ErrorEnvelope> {
    let env = LecternEnv::from_std_env().map_err(ErrorEnvelope::from)?;
    load_lectern_config_from_path(config_path, overrides_json, &env)
}

/// Serialize the config as deterministic pretty JSON (with trailing newline).
pub fn to_pretty_json(config: &LecternConfig) -> Result<String, ErrorEnvelope> {
    let mut output = serde_json::to_string_pretty(config).map_err(|error| {
        ErrorEnvelope::unexpected(
            ErrorCode::internal(),
            format!("failed to serialize config: {error}"),
            ErrorClass::NonRetriable,
        )
    })?;
    output.push('\n');
    Ok(output)
}

/// Serialize the config as deterministic pretty TOML (with trailing newline).
pub fn to_pretty_toml(config: &LecternConfig) -> Result<String, ErrorEnvelope> {
    let mut output = toml::to_string_pretty(config).map_err(|error| {
        ErrorEnvelope::unexpected(
            ErrorCode::new("config", "serialize_toml"),
            format!("failed to serialize config TOML: {error}"),
            ErrorClass::NonRetriable,
        )
    })?;
    output.push('\n');
    Ok(output)
}

fn parse_config_unvalidated(
    input: &str,
    format: ConfigFormat,
) -> Result<LecternConfig, ErrorEnvelope> {
    match format {
        ConfigFormat::Json => serde_json::from_str(input).map_err(|error| {
            ErrorEnvelope::expected(
                ErrorCode::new("config", "invalid_json"),
                format!("invalid config JSON: {error}"),
            )
            .with_metadata("source", "config")
        }),
        ConfigFormat::Toml => toml::from_str(input).map_err(|error| {
            ErrorEnvelope::expected(
                ErrorCode::new("config", "invalid_toml"),
                format!("invalid config TOML: {error}"),
            )
            .with_metadata("source", "config")
        }),
    }
}

fn parse_overrides_json(input: &str) -> Result<LecternConfigOverrides, ErrorEnvelope> {
    serde_json::from_str(input).map_err(|error| {
        ErrorEnvelope::expected(
            ErrorCode::new("config", "invalid_json"),
            format!("invalid overrides JSON: {error}"),
        )
        .with_metadata("source", "overrides")
    })
}

fn read_config_file(path: &Path) -> Result<String, ErrorEnvelope> {
    std::fs::read_to_string(path).map_err(|error| {
        let code = match error.kind() {
            std::io::ErrorKind::NotFound => ErrorCode::new("config", "config_file_not_found"),
            std::io::ErrorKind::PermissionDenied => {
                ErrorCode::new("config", "config_file_permission_denied")
            },
            _ => ErrorCode::new("config", "config_file_io"),
        };

        ErrorEnvelope::expected(code, format!("failed to read config file: {error}"))
            .with_metadata("path", path.to_string_lossy().to_string())
    })
}

fn detect_config_format(path: &Path) -> Result<ConfigFormat, ErrorEnvelope> {
    let ext = path
        .extension()
        .and_then(|value| value.to_str())
        .map(str::to_ascii_lowercase);
    match ext.as_deref() {
        None | Some("json") => Ok(ConfigFormat::Json),
        Some("toml") => Ok(ConfigFormat::Toml),
        Some(other) => Err(ErrorEnvelope::expected(
            ErrorCode::new("config", "unsupported_format"),
            "unsupported config format; use .json or .toml",
        )
        .with_metadata("extension", other.to_string())),
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields, default)]
struct LecternConfigOverrides {
    version: Option<u32>,
    source: SourceConfigOverrides,
    retrieval: RetrievalConfigOverrides,
    search: SearchConfigOverrides,
    session: SessionConfigOverrides,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields, default)]
struct SourceConfigOverrides {
    kind: Option<SourceKind>,
    base_url: Option<Box<str>>,
    timeout_ms: Option<u64>,
    data_dir: Option<Box<str>>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields, default)]
struct RetrievalConfigOverrides {
    fetch_timeout_ms: Option<u64>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields, default)]
struct SearchConfigOverrides {
    limit: Option<u32>,
    min_query_length: Option<u32>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields, default)]
struct SessionConfigOverrides {
    default_version: Option<Box<str>>,
    default_reference: Option<Box<str>>,
}

fn apply_overrides(config: &mut LecternConfig, overrides: &LecternConfigOverrides) {
    if let Some(version) = overrides.version {
        config.version = version;
    }

    let source = &overrides.source;
    if let Some(kind) = source.kind {
        config.source.kind = kind;
    }
    set_opt_box_str(&mut config.source.base_url, source.base_url.as_deref());
    if let Some(timeout_ms) = source.timeout_ms {
        config.source.timeout_ms = timeout_ms;
    }
    set_box_str(&mut config.source.data_dir, source.data_dir.as_deref());

    if let Some(timeout_ms) = overrides.retrieval.fetch_timeout_ms {
        config.retrieval.fetch_timeout_ms = Some(timeout_ms);
    }

    if let Some(limit) = overrides.search.limit {
        config.search.limit = limit;
    }
    if let Some(min) = overrides.search.min_query_length {
        config.search.min_query_length = min;
    }

    let session = &overrides.session;
    set_box_str(
        &mut config.session.default_version,
        session.default_version.as_deref(),
    );
    set_box_str(
        &mut config.session.default_reference,
        session.default_reference.as_deref(),
    );
}

fn set_opt_box_str(field: &mut Option<Box<str>>, value: Option<&str>) {
    if let Some(value) = value {
        *field = Some(value.into());
    }
}

fn set_box_str(field: &mut Box<str>, value: Option<&str>) {
    if let Some(value) = value {
        *field = value.into();
    }
}
