//! Config loading helpers for CLI surfaces.

use crate::InfraResult;
use lectern_config::{LecternEnv, load_lectern_config_from_path, to_pretty_json};
use lectern_shared::ErrorEnvelope;
use std::collections::BTreeMap;
use std::path::Path;

/// Load and validate the effective config, returning deterministic pretty JSON.
///
/// Secrets are serialized redacted.
pub fn load_effective_config_json(
    env: &BTreeMap<String, String>,
    config_path: Option<&Path>,
    overrides_json: Option<&str>,
) -> InfraResult<String> {
    let env = LecternEnv::from_map(env).map_err(ErrorEnvelope::from)?;
    let config = load_lectern_config_from_path(config_path, overrides_json, &env)?;
    to_pretty_json(&config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use lectern_config::{ENV_DEFAULT_VERSION, ENV_SOURCE_API_KEY, ENV_SOURCE_BASE_URL};
    use lectern_shared::REDACTED;
    use serde_json::Value;

    #[test]
    fn env_wins_over_overrides() -> Result<(), Box<dyn std::error::Error>> {
        let env = BTreeMap::from([(ENV_DEFAULT_VERSION.to_string(), "kjv".to_string())]);
        let json = load_effective_config_json(
            &env,
            None,
            Some(r#"{ "session": { "defaultVersion": "NLT" }, "search": { "limit": 10 } }"#),
        )?;
        let value: Value = serde_json::from_str(&json)?;
        assert_eq!(value["session"]["defaultVersion"], "KJV");
        assert_eq!(value["search"]["limit"], 10);
        Ok(())
    }

    #[test]
    fn api_keys_are_redacted() -> InfraResult<()> {
        let env = BTreeMap::from([
            (ENV_SOURCE_BASE_URL.to_string(), "https://api.example.test".to_string()),
            (ENV_SOURCE_API_KEY.to_string(), "k-secret".to_string()),
        ]);
        let json =
            load_effective_config_json(&env, None, Some(r#"{ "source": { "kind": "http" } }"#))?;
        assert!(!json.contains("k-secret"));
        assert!(json.contains(REDACTED));
        Ok(())
    }
}
