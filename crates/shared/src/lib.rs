//! # lectern-shared
//!
//! Foundational types used by every other crate in the workspace:
//!
//! - `ErrorEnvelope` and the shared `Result` alias
//! - `RequestContext` (correlation id + cancellation) and a deadline helper
//! - `SingleFlight`, the per-key call de-duplication primitive
//! - Secret redaction helpers
//!
//! This crate has no workspace dependencies.

#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]

pub mod context;
pub mod errors;
pub mod redaction;
pub mod result;
pub mod single_flight;
pub mod timeout;

pub use context::{CancellationToken, CorrelationId, RequestContext};
pub use errors::{ErrorClass, ErrorCode, ErrorEnvelope, ErrorKind, ErrorMetadata, REDACTED_VALUE};
pub use redaction::{REDACTED, SecretString, is_secret_key, redact_if_secret};
pub use result::{Result, ResultExt};
pub use single_flight::{FlightRole, SingleFlight};
pub use timeout::timeout_with_context;

/// Returns the shared crate version.
#[must_use]
pub const fn shared_crate_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
