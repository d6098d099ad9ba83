//! Secret detection and redaction.
//!
//! Content sources may require an API key. Keys travel as `SecretString` so
//! they never reach logs or rendered config through `Debug`/`Display`.

/// The redacted placeholder string.
pub const REDACTED: &str = "[REDACTED]";

/// Checks if a key/variable name likely refers to a secret.
///
/// # Examples
///
/// ```
/// use lectern_shared::is_secret_key;
///
/// assert!(is_secret_key("LECTERN_SOURCE_API_KEY"));
/// assert!(is_secret_key("apiKey"));
/// assert!(!is_secret_key("LECTERN_LOG_LEVEL"));
/// ```
pub fn is_secret_key(key: &str) -> bool {
    let key = key.to_ascii_uppercase();
    ["KEY", "TOKEN", "SECRET", "PASSWORD", "AUTH"]
        .iter()
        .any(|marker| key.contains(marker))
}

/// Redacts a value if the key is likely a secret.
///
/// ```
/// use lectern_shared::redact_if_secret;
///
/// assert_eq!(redact_if_secret("apiKey", "abc123"), "[REDACTED]");
/// assert_eq!(redact_if_secret("version", "NLT"), "NLT");
/// ```
pub fn redact_if_secret(key: &str, value: &str) -> String {
    if is_secret_key(key) {
        REDACTED.to_string()
    } else {
        value.to_string()
    }
}

/// A secret string wrapper that redacts on Display/Debug.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct SecretString(Box<str>);

impl SecretString {
    /// Wrap a secret value.
    pub fn new(value: impl Into<Box<str>>) -> Self {
        Self(value.into())
    }

    /// Borrow the underlying secret.
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Debug for SecretString {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        formatter.write_str(REDACTED)
    }
}

impl std::fmt::Display for SecretString {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        formatter.write_str(REDACTED)
    }
}

/// Serializes as the redacted placeholder; the value never leaves the process.
impl serde::Serialize for SecretString {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(REDACTED)
    }
}

impl<'de> serde::Deserialize<'de> for SecretString {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        String::deserialize(deserializer).map(Self::from)
    }
}

impl From<String> for SecretString {
    fn from(value: String) -> Self {
        Self(value.into_boxed_str())
    }
}

impl From<&str> for SecretString {
    fn from(value: &str) -> Self {
        Self(Box::from(value))
    }
}
