//! Lectern configuration schema, defaults, validation, and normalization.
//!
//! - Deserialization uses `serde` (JSON or TOML), unknown keys are rejected.
//! - Validation is manual and returns typed errors mapped to `ErrorEnvelope`.
//! - Normalization trims strings and canonicalizes the version code.

use lectern_domain::{Address, SupportedVersion, parse as parse_reference};
use lectern_shared::{ErrorCode, ErrorEnvelope, SecretString};
use serde::{Deserialize, Serialize};
use std::fmt;
use url::Url;

/// Sanitizes a URL for error messages by stripping credentials.
fn sanitize_url_for_error(url: &str) -> String {
    match Url::parse(url) {
        Ok(mut parsed) => {
            if parsed.password().is_some() || !parsed.username().is_empty() {
                if parsed.set_username("").is_err() {
                    return "[invalid url: invalid username]".to_string();
                }
                if parsed.set_password(None).is_err() {
                    return "[invalid url: invalid password]".to_string();
                }
            }
            parsed.to_string()
        },
        Err(error) => format!("[invalid url: {error}]"),
    }
}

/// Current supported configuration schema version.
pub const CURRENT_CONFIG_VERSION: u32 = 1;

const SOURCE_TIMEOUT_MIN_MS: u64 = 100;
const SOURCE_TIMEOUT_MAX_MS: u64 = 120_000;
const SOURCE_TIMEOUT_DEFAULT_MS: u64 = 10_000;
const REQUEST_INTERVAL_MAX_MS: u64 = 10_000;
const REQUEST_INTERVAL_DEFAULT_MS: u64 = 100;
const FETCH_TIMEOUT_MIN_MS: u64 = 100;
const FETCH_TIMEOUT_MAX_MS: u64 = 600_000;
const SEARCH_LIMIT_MIN: u32 = 1;
const SEARCH_LIMIT_MAX: u32 = 500;
const SEARCH_LIMIT_DEFAULT: u32 = 50;
const MIN_QUERY_LENGTH_MIN: u32 = 1;
const MIN_QUERY_LENGTH_MAX: u32 = 100;
const MIN_QUERY_LENGTH_DEFAULT: u32 = 2;
const STORAGE_VERSE_LIMIT_MAX: u32 = 1_000_000;
const STORAGE_VERSE_LIMIT_DEFAULT: u32 = 500;
const DEFAULT_DATA_DIR: &str = "data";
const DEFAULT_REFERENCE: &str = "John 1";

/// Top-level lectern configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields, default)]
pub struct LecternConfig {
    /// Schema version for forward-compatible migrations.
    pub version: u32,
    /// Content source settings.
    pub source: SourceConfig,
    /// Retrieval coordinator settings.
    pub retrieval: RetrievalConfig,
    /// Search session settings.
    pub search: SearchConfig,
    /// Persistent storage budget.
    pub storage: StorageConfig,
    /// Reading session defaults.
    pub session: SessionConfig,
}

impl Default for LecternConfig {
    fn default() -> Self {
        Self {
            version: CURRENT_CONFIG_VERSION,
            source: SourceConfig::default(),
            retrieval: RetrievalConfig::default(),
            search: SearchConfig::default(),
            storage: StorageConfig::default(),
            session: SessionConfig::default(),
        }
    }
}

impl LecternConfig {
    /// Validate and normalize the config.
    pub fn validate_and_normalize(mut self) -> Result<ValidatedLecternConfig, ConfigSchemaError> {
        self.validate_version()?;

        self.source.normalize();
        self.source.validate()?;
        self.retrieval.validate()?;
        self.search.validate()?;
        self.storage.validate()?;
        let (default_version, default_reference) = self.session.normalize_and_validate()?;

        Ok(ValidatedLecternConfig {
            raw: self,
            default_version,
            default_reference,
        })
    }

    const fn validate_version(&self) -> Result<(), ConfigSchemaError> {
        if self.version != CURRENT_CONFIG_VERSION {
            return Err(ConfigSchemaError::UnsupportedVersion {
                found: self.version,
                supported: CURRENT_CONFIG_VERSION,
            });
        }
        Ok(())
    }
}

/// Validated config wrapper carrying the parsed session defaults.
#[derive(Debug, Clone)]
pub struct ValidatedLecternConfig {
    raw: LecternConfig,
    default_version: SupportedVersion,
    default_reference: Address,
}

impl ValidatedLecternConfig {
    /// Translation used when a command does not name one.
    #[must_use]
    pub const fn default_version(&self) -> SupportedVersion {
        self.default_version
    }

    /// Address opened for blank navigation input.
    #[must_use]
    pub const fn default_reference(&self) -> Address {
        self.default_reference
    }

    /// Borrow the raw config.
    #[must_use]
    pub const fn as_ref(&self) -> &LecternConfig {
        &self.raw
    }

    /// Consume the wrapper and return the raw config.
    #[must_use]
    pub fn into_inner(self) -> LecternConfig {
        self.raw
    }
}

impl AsRef<LecternConfig> for ValidatedLecternConfig {
    fn as_ref(&self) -> &LecternConfig {
        &self.raw
    }
}

impl std::ops::Deref for ValidatedLecternConfig {
    type Target = LecternConfig;

    fn deref(&self) -> &Self::Target {
        &self.raw
    }
}

/// Parse a config from a JSON string, applying validation and normalization.
pub fn parse_lectern_config_json(input: &str) -> Result<ValidatedLecternConfig, ErrorEnvelope> {
    let config: LecternConfig = serde_json::from_str(input).map_err(|error| {
        ErrorEnvelope::expected(
            ErrorCode::new("config", "invalid_json"),
            format!("invalid config JSON: {error}"),
        )
    })?;

    config.validate_and_normalize().map_err(Into::into)
}

/// Parse a config from a TOML string, applying validation and normalization.
pub fn parse_lectern_config_toml(input: &str) -> Result<ValidatedLecternConfig, ErrorEnvelope> {
    let config: LecternConfig = toml::from_str(input).map_err(|error| {
        ErrorEnvelope::expected(
            ErrorCode::new("config", "invalid_toml"),
            format!("invalid config TOML: {error}"),
        )
    })?;

    config.validate_and_normalize().map_err(Into::into)
}

/// Which content source backs retrieval and search.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    /// Local JSON bible files.
    #[default]
    File,
    /// Remote HTTP content API.
    Http,
}

impl SourceKind {
    /// Stable string form.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::File => "file",
            Self::Http => "http",
        }
    }

    /// Parse a string value (case-insensitive).
    #[must_use]
    pub fn parse(input: &str) -> Option<Self> {
        match input.trim().to_ascii_lowercase().as_str() {
            "file" => Some(Self::File),
            "http" => Some(Self::Http),
            _ => None,
        }
    }
}

impl fmt::Display for SourceKind {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(self.as_str())
    }
}

/// Content source configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields, default)]
pub struct SourceConfig {
    /// Source implementation.
    pub kind: SourceKind,
    /// Base URL of the content API (required for `http`).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub base_url: Option<Box<str>>,
    /// API key sent to the content API; serialized redacted.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<SecretString>,
    /// Per-request timeout of the HTTP client (ms).
    pub timeout_ms: u64,
    /// Shortest gap between two HTTP requests (ms); `0` disables the limit.
    pub min_request_interval_ms: u64,
    /// Directory holding `<version>.json` bible files (used by `file`).
    pub data_dir: Box<str>,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            kind: SourceKind::File,
            base_url: None,
            api_key: None,
            timeout_ms: SOURCE_TIMEOUT_DEFAULT_MS,
            min_request_interval_ms: REQUEST_INTERVAL_DEFAULT_MS,
            data_dir: DEFAULT_DATA_DIR.into(),
        }
    }
}

impl SourceConfig {
    fn normalize(&mut self) {
        normalize_optional_trimmed(&mut self.base_url);
        normalize_boxed_str(&mut self.data_dir);
        if let Some(url) = self.base_url.as_mut() {
            let trimmed = url.trim_end_matches('/');
            if trimmed.len() != url.len() {
                *url = trimmed.into();
            }
        }
    }

    fn validate(&self) -> Result<(), ConfigSchemaError> {
        validate_timeout_ms(
            "source",
            "timeoutMs",
            self.timeout_ms,
            SOURCE_TIMEOUT_MIN_MS,
            SOURCE_TIMEOUT_MAX_MS,
        )?;
        validate_timeout_ms(
            "source",
            "minRequestIntervalMs",
            self.min_request_interval_ms,
            0,
            REQUEST_INTERVAL_MAX_MS,
        )?;
        if let Some(url) = self.base_url.as_deref() {
            validate_http_url("source", "baseUrl", url)?;
        }
        match self.kind {
            SourceKind::Http if self.base_url.is_none() => Err(ConfigSchemaError::MissingValue {
                section: "source",
                field: "baseUrl",
                reason: "required when source.kind is `http`",
            }),
            SourceKind::File if self.data_dir.is_empty() => Err(ConfigSchemaError::MissingValue {
                section: "source",
                field: "dataDir",
                reason: "required when source.kind is `file`",
            }),
            _ => Ok(()),
        }
    }
}

/// Retrieval coordinator configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields, default)]
pub struct RetrievalConfig {
    /// Optional deadline around each shared chapter fetch (ms).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fetch_timeout_ms: Option<u64>,
}

impl RetrievalConfig {
    fn validate(&self) -> Result<(), ConfigSchemaError> {
        if let Some(value) = self.fetch_timeout_ms {
            validate_timeout_ms(
                "retrieval",
                "fetchTimeoutMs",
                value,
                FETCH_TIMEOUT_MIN_MS,
                FETCH_TIMEOUT_MAX_MS,
            )?;
        }
        Ok(())
    }
}

/// Search session configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields, default)]
pub struct SearchConfig {
    /// Maximum results requested from the source.
    pub limit: u32,
    /// Shortest non-blank query accepted.
    pub min_query_length: u32,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            limit: SEARCH_LIMIT_DEFAULT,
            min_query_length: MIN_QUERY_LENGTH_DEFAULT,
        }
    }
}

impl SearchConfig {
    fn validate(&self) -> Result<(), ConfigSchemaError> {
        validate_limit_u32(
            "search",
            "limit",
            self.limit,
            SEARCH_LIMIT_MIN,
            SEARCH_LIMIT_MAX,
        )?;
        validate_limit_u32(
            "search",
            "minQueryLength",
            self.min_query_length,
            MIN_QUERY_LENGTH_MIN,
            MIN_QUERY_LENGTH_MAX,
        )
    }
}

/// Persistent storage budget.
///
/// Chapters a source would keep persistently count their verses against
/// `verseLimit`; once a chapter would exceed it, the chapter is served
/// without being stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields, default)]
pub struct StorageConfig {
    /// Most verses kept in persistent storage.
    pub verse_limit: u32,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            verse_limit: STORAGE_VERSE_LIMIT_DEFAULT,
        }
    }
}

impl StorageConfig {
    fn validate(&self) -> Result<(), ConfigSchemaError> {
        validate_limit_u32(
            "storage",
            "verseLimit",
            self.verse_limit,
            0,
            STORAGE_VERSE_LIMIT_MAX,
        )
    }
}

/// Reading session defaults.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields, default)]
pub struct SessionConfig {
    /// Version code used when none is given (`NLT` or `KJV`).
    pub default_version: Box<str>,
    /// Reference opened for blank navigation input.
    pub default_reference: Box<str>,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            default_version: SupportedVersion::Nlt.code().into(),
            default_reference: DEFAULT_REFERENCE.into(),
        }
    }
}

impl SessionConfig {
    fn normalize_and_validate(&mut self) -> Result<(SupportedVersion, Address), ConfigSchemaError> {
        let version = SupportedVersion::parse(&self.default_version).map_err(|_| {
            ConfigSchemaError::InvalidVersion {
                value: self.default_version.to_string(),
            }
        })?;
        self.default_version = version.code().into();

        normalize_boxed_str(&mut self.default_reference);
        let address = parse_reference(&self.default_reference).map_err(|error| {
            ConfigSchemaError::InvalidReference {
                value: self.default_reference.to_string(),
                reason: error.to_string(),
            }
        })?;
        self.default_reference = address.to_string().into_boxed_str();

        Ok((version, address))
    }
}

/// Typed validation errors for the configuration schema.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigSchemaError {
    /// The config version is not supported by this binary.
    UnsupportedVersion {
        /// Version found in the config.
        found: u32,
        /// Version supported by this crate.
        supported: u32,
    },
    /// A timeout value is out of bounds.
    TimeoutOutOfRange {
        /// Schema section (e.g. `source`).
        section: &'static str,
        /// Field name in the config file (e.g. `timeoutMs`).
        field: &'static str,
        /// Value provided (ms).
        value_ms: u64,
        /// Minimum allowed value (ms).
        min_ms: u64,
        /// Maximum allowed value (ms).
        max_ms: u64,
    },
    /// A numeric limit is out of bounds.
    LimitOutOfRange {
        /// Schema section (e.g. `search`).
        section: &'static str,
        /// Field name in the config file (e.g. `limit`).
        field: &'static str,
        /// Value provided.
        value: u64,
        /// Minimum allowed value.
        min: u64,
        /// Maximum allowed value.
        max: u64,
    },
    /// A URL entry is invalid.
    InvalidUrl {
        /// Schema section.
        section: &'static str,
        /// Field name in the config file.
        field: &'static str,
        /// Invalid URL value.
        url: String,
    },
    /// A value required by the selected mode is absent.
    MissingValue {
        /// Schema section.
        section: &'static str,
        /// Field name in the config file.
        field: &'static str,
        /// Why the value is required.
        reason: &'static str,
    },
    /// `session.defaultVersion` is not a supported translation.
    InvalidVersion {
        /// Value provided.
        value: String,
    },
    /// `session.defaultReference` does not parse.
    InvalidReference {
        /// Value provided.
        value: String,
        /// Parser message.
        reason: String,
    },
}

impl ConfigSchemaError {
    fn error_code(&self) -> ErrorCode {
        match self {
            Self::UnsupportedVersion { .. } => ErrorCode::new("config", "unsupported_version"),
            Self::TimeoutOutOfRange { .. } => ErrorCode::new("config", "invalid_timeout"),
            Self::LimitOutOfRange { .. } => ErrorCode::new("config", "invalid_limit"),
            Self::InvalidUrl { .. } => ErrorCode::new("config", "invalid_url"),
            Self::MissingValue { .. } => ErrorCode::new("config", "missing_value"),
            Self::InvalidVersion { .. } => ErrorCode::new("config", "invalid_default_version"),
            Self::InvalidReference { .. } => ErrorCode::new("config", "invalid_default_reference"),
        }
    }
}

impl fmt::Display for ConfigSchemaError {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnsupportedVersion { found, supported } => write!(
                formatter,
                "unsupported config version {found} (supported: {supported})"
            ),
            Self::TimeoutOutOfRange {
                section,
                field,
                min_ms,
                max_ms,
                ..
            } => write!(
                formatter,
                "{section}.{field} must be between {min_ms} and {max_ms} ms"
            ),
            Self::LimitOutOfRange {
                section,
                field,
                min,
                max,
                ..
            } => write!(formatter, "{section}.{field} must be between {min} and {max}"),
            Self::InvalidUrl { section, field, .. } => {
                write!(formatter, "{section}.{field} must be an http(s) URL")
            },
            Self::MissingValue {
                section,
                field,
                reason,
            } => write!(formatter, "{section}.{field} is {reason}"),
            Self::InvalidVersion { value } => write!(
                formatter,
                "session.defaultVersion `{value}` is not a supported version (NLT, KJV)"
            ),
            Self::InvalidReference { value, reason } => write!(
                formatter,
                "session.defaultReference `{value}` is invalid: {reason}"
            ),
        }
    }
}

impl std::error::Error for ConfigSchemaError {}

impl From<ConfigSchemaError> for ErrorEnvelope {
    fn from(error: ConfigSchemaError) -> Self {
        let code = error.error_code();
        let message = error.to_string();
        let mut envelope = Self::expected(code, message);

        match error {
            ConfigSchemaError::UnsupportedVersion { found, supported } => {
                envelope = envelope
                    .with_metadata("found", found.to_string())
                    .with_metadata("supported", supported.to_string());
            },
            ConfigSchemaError::TimeoutOutOfRange {
                section,
                field,
                value_ms,
                min_ms,
                max_ms,
            } => {
                envelope = envelope
                    .with_metadata("section", section)
                    .with_metadata("field", field)
                    .with_metadata("value_ms", value_ms.to_string())
                    .with_metadata("min_ms", min_ms.to_string())
                    .with_metadata("max_ms", max_ms.to_string());
            },
            ConfigSchemaError::LimitOutOfRange {
                section,
                field,
                value,
                min,
                max,
            } => {
                envelope = envelope
                    .with_metadata("section", section)
                    .with_metadata("field", field)
                    .with_metadata("value", value.to_string())
                    .with_metadata("min", min.to_string())
                    .with_metadata("max", max.to_string());
            },
            ConfigSchemaError::InvalidUrl {
                section,
                field,
                url,
            } => {
                envelope = envelope
                    .with_metadata("section", section)
                    .with_metadata("field", field)
                    .with_metadata("url", sanitize_url_for_error(&url));
            },
            ConfigSchemaError::MissingValue { section, field, .. } => {
                envelope = envelope
                    .with_metadata("section", section)
                    .with_metadata("field", field);
            },
            ConfigSchemaError::InvalidVersion { value } => {
                envelope = envelope.with_metadata("value", value);
            },
            ConfigSchemaError::InvalidReference { value, reason } => {
                envelope = envelope
                    .with_metadata("value", value)
                    .with_metadata("reason", reason);
            },
        }

        envelope
    }
}

const fn validate_timeout_ms(
    section: &'static str,
    field: &'static str,
    value_ms: u64,
    min_ms: u64,
    max_ms: u64,
) -> Result<(), ConfigSchemaError> {
    if value_ms < min_ms || value_ms > max_ms {
        return Err(ConfigSchemaError::TimeoutOutOfRange {
            section,
            field,
            value_ms,
            min_ms,
            max_ms,
        });
    }
    Ok(())
}

fn validate_http_url(
    section: &'static str,
    field: &'static str,
    value: &str,
) -> Result<(), ConfigSchemaError> {
    let parsed = Url::parse(value).map_err(|_| ConfigSchemaError::InvalidUrl {
        section,
        field,
        url: value.to_owned(),
    })?;

    if parsed.scheme() != "http" && parsed.scheme() != "https" {
        return Err(ConfigSchemaError::InvalidUrl {
            section,
            field,
            url: value.to_owned(),
        });
    }

    Ok(())
}

fn validate_limit_u32(
    section: &'static str,
    field: &'static str,
    value: u32,
    min: u32,
    max: u32,
) -> Result<(), ConfigSchemaError> {
    if value < min || value > max {
        return Err(ConfigSchemaError::LimitOutOfRange {
            section,
            field,
            value: u64::from(value),
            min: u64::from(min),
            max: u64::from(max),
        });
    }
    Ok(())
}

fn normalize_optional_trimmed(value: &mut Option<Box<str>>) {
    let Some(raw) = value.take() else {
        return;
    };
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        *value = None;
    } else {
        *value = Some(trimmed.to_owned().into_boxed_str());
    }
}

fn normalize_boxed_str(value: &mut Box<str>) {
    let trimmed = value.trim();
    if trimmed == value.as_ref() {
        return;
    }
    *value = trimmed.to_owned().into_boxed_str();
}
