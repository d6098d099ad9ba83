//! Environment variable parsing and env-to-config merging.
//!
//! Env parsing is strict: a variable that is present must hold a valid value,
//! and secret values never appear in error metadata.

use crate::schema::{LecternConfig, SourceKind, ValidatedLecternConfig};
use lectern_domain::SupportedVersion;
use lectern_shared::{ErrorCode, ErrorEnvelope, REDACTED_VALUE, SecretString, is_secret_key};
use std::collections::BTreeMap;
use std::fmt;
use url::Url;

/// Env var: content source kind (`file` | `http`).
pub const ENV_SOURCE_KIND: &str = "LECTERN_SOURCE_KIND";
/// Env var: content API base URL.
pub const ENV_SOURCE_BASE_URL: &str = "LECTERN_SOURCE_BASE_URL";
/// Env var: content API key (secret).
pub const ENV_SOURCE_API_KEY: &str = "LECTERN_SOURCE_API_KEY";
/// Env var: HTTP client timeout in milliseconds.
pub const ENV_SOURCE_TIMEOUT_MS: &str = "LECTERN_SOURCE_TIMEOUT_MS";
/// Env var: directory holding bible JSON files.
pub const ENV_SOURCE_DATA_DIR: &str = "LECTERN_SOURCE_DATA_DIR";
/// Env var: shared fetch deadline in milliseconds.
pub const ENV_FETCH_TIMEOUT_MS: &str = "LECTERN_FETCH_TIMEOUT_MS";
/// Env var: search result limit.
pub const ENV_SEARCH_LIMIT: &str = "LECTERN_SEARCH_LIMIT";
/// Env var: persistent storage verse limit.
pub const ENV_STORAGE_VERSE_LIMIT: &str = "LECTERN_STORAGE_VERSE_LIMIT";
/// Env var: default version code.
pub const ENV_DEFAULT_VERSION: &str = "LECTERN_DEFAULT_VERSION";

const KNOWN_VARS: [&str; 9] = [
    ENV_SOURCE_KIND,
    ENV_SOURCE_BASE_URL,
    ENV_SOURCE_API_KEY,
    ENV_SOURCE_TIMEOUT_MS,
    ENV_SOURCE_DATA_DIR,
    ENV_FETCH_TIMEOUT_MS,
    ENV_SEARCH_LIMIT,
    ENV_STORAGE_VERSE_LIMIT,
    ENV_DEFAULT_VERSION,
];

/// Typed env-derived overrides for [`LecternConfig`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LecternEnv {
    /// Override for `source.kind`.
    pub source_kind: Option<SourceKind>,
    /// Override for `source.baseUrl`.
    pub source_base_url: Option<Box<str>>,
    /// Override for `source.apiKey`.
    pub source_api_key: Option<SecretString>,
    /// Override for `source.timeoutMs`.
    pub source_timeout_ms: Option<u64>,
    /// Override for `source.dataDir`.
    pub source_data_dir: Option<Box<str>>,
    /// Override for `retrieval.fetchTimeoutMs`.
    pub fetch_timeout_ms: Option<u64>,
    /// Override for `search.limit`.
    pub search_limit: Option<u32>,
    /// Override for `storage.verseLimit`.
    pub storage_verse_limit: Option<u32>,
    /// Override for `session.defaultVersion`.
    pub default_version: Option<SupportedVersion>,
}

impl LecternEnv {
    /// Parse env overrides from a key/value map (useful for tests and fixtures).
    pub fn from_map(map: &BTreeMap<String, String>) -> Result<Self, EnvParseError> {
        Ok(Self {
            source_kind: parse_optional_source_kind(map, ENV_SOURCE_KIND)?,
            source_base_url: parse_optional_url_string(map, ENV_SOURCE_BASE_URL)?,
            source_api_key: parse_optional_secret(map, ENV_SOURCE_API_KEY)?,
            source_timeout_ms: parse_optional_u64(map, ENV_SOURCE_TIMEOUT_MS)?,
            source_data_dir: parse_optional_trimmed_string(map, ENV_SOURCE_DATA_DIR)?,
            fetch_timeout_ms: parse_optional_u64(map, ENV_FETCH_TIMEOUT_MS)?,
            search_limit: parse_optional_u32(map, ENV_SEARCH_LIMIT)?,
            storage_verse_limit: parse_optional_u32(map, ENV_STORAGE_VERSE_LIMIT)?,
            default_version: parse_optional_version(map, ENV_DEFAULT_VERSION)?,
        })
    }

    /// Parse env overrides from the current process environment.
    pub fn from_std_env() -> Result<Self, EnvParseError> {
        let mut map = BTreeMap::new();
        for name in KNOWN_VARS {
            if let Ok(value) = std::env::var(name) {
                map.insert(name.to_string(), value);
            }
        }

        Self::from_map(&map)
    }

    /// True when no variable was set.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self == &Self::default()
    }
}

/// Apply env overrides to a base config (env wins over file/default values).
pub fn apply_env_overrides(
    base: LecternConfig,
    env: &LecternEnv,
) -> Result<ValidatedLecternConfig, ErrorEnvelope> {
    let mut config = base;

    if let Some(kind) = env.source_kind {
        config.source.kind = kind;
    }
    if let Some(url) = env.source_base_url.as_ref() {
        config.source.base_url = Some(url.clone());
    }
    if let Some(key) = env.source_api_key.as_ref() {
        config.source.api_key = Some(key.clone());
    }
    if let Some(timeout_ms) = env.source_timeout_ms {
        config.source.timeout_ms = timeout_ms;
    }
    if let Some(dir) = env.source_data_dir.as_ref() {
        config.source.data_dir = dir.clone();
    }
    if let Some(timeout_ms) = env.fetch_timeout_ms {
        config.retrieval.fetch_timeout_ms = Some(timeout_ms);
    }
    if let Some(limit) = env.search_limit {
        config.search.limit = limit;
    }
    if let Some(limit) = env.storage_verse_limit {
        config.storage.verse_limit = limit;
    }
    if let Some(version) = env.default_version {
        config.session.default_version = version.code().into();
    }

    config.validate_and_normalize().map_err(Into::into)
}

/// Validation failures when parsing env variables.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EnvParseError {
    /// An env var was present but empty after trimming.
    EmptyValue {
        /// Env var name.
        var: &'static str,
    },
    /// A secret env var was present but empty after trimming.
    EmptySecret {
        /// Env var name.
        var: &'static str,
    },
    /// Integer env var had an invalid value.
    InvalidInt {
        /// Env var name.
        var: &'static str,
        /// Raw input value.
        value: String,
    },
    /// URL env var had an invalid value.
    InvalidUrl {
        /// Env var name.
        var: &'static str,
        /// Raw input value.
        value: String,
    },
    /// Enum env var had an invalid value.
    InvalidEnum {
        /// Env var name.
        var: &'static str,
        /// Raw input value.
        value: String,
    },
}

impl EnvParseError {
    fn error_code(&self) -> ErrorCode {
        match self {
            Self::EmptyValue { .. } | Self::EmptySecret { .. } => {
                ErrorCode::new("config", "empty_env_var")
            },
            Self::InvalidInt { .. } => ErrorCode::new("config", "invalid_env_int"),
            Self::InvalidUrl { .. } => ErrorCode::new("config", "invalid_env_url"),
            Self::InvalidEnum { .. } => ErrorCode::new("config", "invalid_env_enum"),
        }
    }
}

impl fmt::Display for EnvParseError {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EmptyValue { var } | Self::EmptySecret { var } => {
                write!(formatter, "{var} must be non-empty")
            },
            Self::InvalidInt { var, .. } => write!(formatter, "{var} must be an integer"),
            Self::InvalidUrl { var, .. } => write!(formatter, "{var} must be a valid URL"),
            Self::InvalidEnum { var, .. } => write!(formatter, "{var} has an unsupported value"),
        }
    }
}

impl std::error::Error for EnvParseError {}

impl From<EnvParseError> for ErrorEnvelope {
    fn from(error: EnvParseError) -> Self {
        let code = error.error_code();
        let message = error.to_string();
        let mut envelope = Self::expected(code, message);

        match error {
            EnvParseError::EmptyValue { var } | EnvParseError::EmptySecret { var } => {
                envelope = envelope.with_metadata("env_var", var);
            },
            EnvParseError::InvalidInt { var, value }
            | EnvParseError::InvalidUrl { var, value }
            | EnvParseError::InvalidEnum { var, value } => {
                envelope = envelope
                    .with_metadata("env_var", var)
                    .with_metadata("value", redact_value(var, &value));
            },
        }

        envelope
    }
}

fn parse_optional_trimmed_string(
    map: &BTreeMap<String, String>,
    var: &'static str,
) -> Result<Option<Box<str>>, EnvParseError> {
    let Some(raw) = map.get(var) else {
        return Ok(None);
    };

    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(EnvParseError::EmptyValue { var });
    }

    Ok(Some(trimmed.to_owned().into_boxed_str()))
}

fn parse_optional_secret(
    map: &BTreeMap<String, String>,
    var: &'static str,
) -> Result<Option<SecretString>, EnvParseError> {
    let Some(raw) = map.get(var) else {
        return Ok(None);
    };

    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(EnvParseError::EmptySecret { var });
    }

    Ok(Some(SecretString::new(trimmed.to_owned())))
}

fn parse_optional_u64(
    map: &BTreeMap<String, String>,
    var: &'static str,
) -> Result<Option<u64>, EnvParseError> {
    let Some(raw) = map.get(var) else {
        return Ok(None);
    };
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(EnvParseError::EmptyValue { var });
    }

    trimmed
        .parse::<u64>()
        .map(Some)
        .map_err(|_| EnvParseError::InvalidInt {
            var,
            value: raw.clone(),
        })
}

fn parse_optional_u32(
    map: &BTreeMap<String, String>,
    var: &'static str,
) -> Result<Option<u32>, EnvParseError> {
    let Some(raw) = map.get(var) else {
        return Ok(None);
    };
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(EnvParseError::EmptyValue { var });
    }

    trimmed
        .parse::<u32>()
        .map(Some)
        .map_err(|_| EnvParseError::InvalidInt {
            var,
            value: raw.clone(),
        })
}

fn parse_optional_source_kind(
    map: &BTreeMap<String, String>,
    var: &'static str,
) -> Result<Option<SourceKind>, EnvParseError> {
    let Some(raw) = map.get(var) else {
        return Ok(None);
    };
    if raw.trim().is_empty() {
        return Err(EnvParseError::EmptyValue { var });
    }

    SourceKind::parse(raw)
        .map(Some)
        .ok_or_else(|| EnvParseError::InvalidEnum {
            var,
            value: raw.clone(),
        })
}

fn parse_optional_version(
    map: &BTreeMap<String, String>,
    var: &'static str,
) -> Result<Option<SupportedVersion>, EnvParseError> {
    let Some(raw) = map.get(var) else {
        return Ok(None);
    };
    if raw.trim().is_empty() {
        return Err(EnvParseError::EmptyValue { var });
    }

    SupportedVersion::parse(raw)
        .map(Some)
        .map_err(|_| EnvParseError::InvalidEnum {
            var,
            value: raw.clone(),
        })
}

fn parse_optional_url_string(
    map: &BTreeMap<String, String>,
    var: &'static str,
) -> Result<Option<Box<str>>, EnvParseError> {
    let Some(raw) = map.get(var) else {
        return Ok(None);
    };
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(EnvParseError::EmptyValue { var });
    }

    let parsed = Url::parse(trimmed).map_err(|_| EnvParseError::InvalidUrl {
        var,
        value: raw.clone(),
    })?;
    if parsed.scheme() != "http" && parsed.scheme() != "https" {
        return Err(EnvParseError::InvalidUrl {
            var,
            value: raw.clone(),
        });
    }

    Ok(Some(parsed.to_string().into_boxed_str()))
}

fn redact_value(var: &str, value: &str) -> String {
    if is_secret_key(var) {
        REDACTED_VALUE.to_string()
    } else {
        value.to_string()
    }
}
