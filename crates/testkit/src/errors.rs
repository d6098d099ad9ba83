//! Test fixtures for shared error codes and envelopes.

use lectern_shared::{ErrorClass, ErrorCode, ErrorEnvelope};

/// Return a list of common error codes used in tests.
pub fn common_error_codes() -> Vec<ErrorCode> {
    vec![
        ErrorCode::cancelled(),
        ErrorCode::invalid_input(),
        ErrorCode::not_found(),
        ErrorCode::timeout(),
        ErrorCode::io(),
        ErrorCode::internal(),
    ]
}

/// A cancellation error fixture.
pub fn cancelled_error() -> ErrorEnvelope {
    ErrorEnvelope::cancelled("cancelled")
}

/// A retriable upstream failure, as a throttled or failing content API reports it.
pub fn unavailable_error() -> ErrorEnvelope {
    ErrorEnvelope::unexpected(
        ErrorCode::new("source", "unavailable"),
        "content service unavailable",
        ErrorClass::Retriable,
    )
    .with_metadata("status", "503")
}

/// A retriable timeout error fixture.
pub fn timeout_error() -> ErrorEnvelope {
    ErrorEnvelope::unexpected(ErrorCode::timeout(), "timeout", ErrorClass::Retriable)
}
