use lectern_shared::{ErrorCode, ErrorEnvelope, ErrorKind};
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitCode {
    Ok = 0,
    Internal = 1,
    InvalidInput = 2,
    Io = 3,
    Unavailable = 4,
    Cancelled = 130,
}

impl ExitCode {
    #[must_use]
    pub const fn as_u8(self) -> u8 {
        self as u8
    }

    /// Exit code for a failed command.
    ///
    /// Input problems exit 2, content source failures exit 4.
    #[must_use]
    pub fn for_error(error: &ErrorEnvelope) -> Self {
        if error.code == ErrorCode::cancelled() {
            return Self::Cancelled;
        }
        match error.kind {
            ErrorKind::Expected => Self::InvalidInput,
            ErrorKind::Unexpected => Self::Unavailable,
            ErrorKind::Invariant => Self::Internal,
        }
    }
}

#[derive(Debug)]
pub enum CliError {
    InvalidInput(String),
    Io(std::io::Error),
    Serialization(serde_json::Error),
}

impl CliError {
    #[must_use]
    pub const fn exit_code(&self) -> ExitCode {
        match self {
            Self::InvalidInput(_) => ExitCode::InvalidInput,
            Self::Io(_) => ExitCode::Io,
            Self::Serialization(_) => ExitCode::Internal,
        }
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidInput(message) => write!(formatter, "invalid input: {message}"),
            Self::Io(error) => write!(formatter, "io error: {error}"),
            Self::Serialization(error) => write!(formatter, "serialization error: {error}"),
        }
    }
}

impl std::error::Error for CliError {}

impl From<std::io::Error> for CliError {
    fn from(error: std::io::Error) -> Self {
        Self::Io(error)
    }
}

impl From<serde_json::Error> for CliError {
    fn from(error: serde_json::Error) -> Self {
        Self::Serialization(error)
    }
}

/// Error payload printed at the CLI boundary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorDto {
    pub code: String,
    pub message: String,
    pub kind: &'static str,
    pub retriable: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub meta: Option<BTreeMap<String, String>>,
}

impl ErrorDto {
    /// Boundary view of `error` with secret-looking metadata redacted.
    #[must_use]
    pub fn from_envelope(error: &ErrorEnvelope) -> Self {
        let ErrorEnvelope {
            kind,
            class,
            code,
            message,
            metadata,
        } = error.clone().redact_secrets();
        Self {
            code: code.to_string(),
            message,
            kind: match kind {
                ErrorKind::Expected => "EXPECTED",
                ErrorKind::Invariant => "INVARIANT",
                ErrorKind::Unexpected => "UNEXPECTED",
            },
            retriable: class.is_retriable(),
            meta: (!metadata.is_empty()).then_some(metadata),
        }
    }
}
