//! Supported translations.

use lectern_shared::{ErrorCode, ErrorEnvelope};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// The two translations content can be retrieved in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum SupportedVersion {
    /// New Living Translation (contemporary English).
    #[serde(rename = "NLT")]
    Nlt,
    /// King James Version (classical English).
    #[serde(rename = "KJV")]
    Kjv,
}

impl SupportedVersion {
    /// Every supported version.
    pub const ALL: [Self; 2] = [Self::Nlt, Self::Kjv];

    /// Parse a version code, ignoring case and surrounding whitespace.
    pub fn parse(value: &str) -> Result<Self, UnsupportedVersion> {
        let trimmed = value.trim();
        Self::ALL
            .into_iter()
            .find(|version| version.code().eq_ignore_ascii_case(trimmed))
            .ok_or_else(|| UnsupportedVersion {
                version: trimmed.into(),
            })
    }

    /// Upper-case version code.
    #[must_use]
    pub const fn code(self) -> &'static str {
        match self {
            Self::Nlt => "NLT",
            Self::Kjv => "KJV",
        }
    }

    /// Full translation name.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Nlt => "New Living Translation",
            Self::Kjv => "King James Version",
        }
    }
}

impl fmt::Display for SupportedVersion {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(self.code())
    }
}

impl FromStr for SupportedVersion {
    type Err = UnsupportedVersion;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Self::parse(value)
    }
}

/// A version code outside the supported set.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unsupported version `{version}` (expected NLT or KJV)")]
pub struct UnsupportedVersion {
    /// The rejected input, trimmed.
    pub version: Box<str>,
}

impl From<UnsupportedVersion> for ErrorEnvelope {
    fn from(error: UnsupportedVersion) -> Self {
        let version = error.version.to_string();
        Self::expected(
            ErrorCode::new("version", "unsupported"),
            error.to_string(),
        )
        .with_metadata("version", version)
    }
}
