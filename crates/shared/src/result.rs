//! Result alias shared across the workspace.

use crate::errors::ErrorEnvelope;

/// Shared result type used across the workspace.
pub type Result<T, E = ErrorEnvelope> = std::result::Result<T, E>;

/// Extension helpers for attaching context to envelope errors.
pub trait ResultExt<T> {
    /// Attach a metadata entry to the error, if any.
    fn with_error_metadata(self, key: &str, value: impl Into<String>) -> Result<T>;
}

impl<T> ResultExt<T> for Result<T> {
    fn with_error_metadata(self, key: &str, value: impl Into<String>) -> Self {
        self.map_err(|error| error.with_metadata(key, value))
    }
}
