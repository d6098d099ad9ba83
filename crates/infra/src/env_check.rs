//! Environment validation helpers for CLI surfaces.

use lectern_config::{LecternConfig, LecternEnv, apply_env_overrides};
use lectern_shared::ErrorEnvelope;
use std::collections::BTreeMap;

/// Infra-level error type (shared error envelope).
pub type InfraError = ErrorEnvelope;

/// Infra-level result type.
pub type InfraResult<T> = Result<T, InfraError>;

/// Validate that the provided `LECTERN_*` overrides parse and merge into a
/// valid config.
pub fn validate_env_parsing(env: &BTreeMap<String, String>) -> InfraResult<()> {
    let parsed = LecternEnv::from_map(env).map_err(ErrorEnvelope::from)?;
    let _ = apply_env_overrides(LecternConfig::default(), &parsed)?;
    Ok(())
}
