//! # lectern-infra
//!
//! Infrastructure wiring and runtime composition.
//! This crate depends on `app`, `adapters`, `config`, and `shared`.

/// Local CLI orchestration helpers.
pub mod cli_local;
/// Config loading helpers used by CLI surfaces.
pub mod config_check;
/// Environment validation helpers used by CLI surfaces.
pub mod env_check;
/// Structured logger selection.
pub mod observability;
/// Content source selection.
mod source_factory;

pub use cli_local::{
    LocalSearchRequest, ReadOutput, ReadRequest, build_coordinator, parse_verse_ranges,
    run_read_local, run_search_local, search_settings,
};
pub use config_check::load_effective_config_json;
pub use env_check::{InfraError, InfraResult, validate_env_parsing};
pub use observability::{ENV_LOG_FORMAT, ENV_LOG_LEVEL, logger_from_env, logger_from_map};
pub use source_factory::{
    ContentSources, build_content_sources, build_content_sources_with_logger,
};

// Re-export redaction utilities for CLI boundary sanitization
pub use lectern_shared::{is_secret_key, redact_if_secret};

/// Returns the infra crate version.
#[must_use]
pub const fn infra_crate_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::*;
    use lectern_adapters::adapters_crate_version;
    use lectern_app::app_crate_version;
    use lectern_config::config_crate_version;
    use lectern_shared::shared_crate_version;

    fn workspace_deps() -> Vec<String> {
        let cargo_toml = include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/Cargo.toml"));
        let mut in_deps = false;
        let mut deps = Vec::new();

        for raw_line in cargo_toml.lines() {
            let line = raw_line.split('#').next().unwrap_or("").trim();
            if line.is_empty() {
                continue;
            }
            if line.starts_with('[') {
                in_deps = line == "[dependencies]";
                continue;
            }
            if in_deps && line.starts_with("lectern-") {
                let key = line.split('=').next().unwrap_or("").trim();
                deps.push(key.split('.').next().unwrap_or("").trim().to_string());
            }
        }

        deps
    }

    #[test]
    fn infra_depends_on_app_adapters_config() {
        let deps = workspace_deps();
        for expected in ["lectern-app", "lectern-adapters", "lectern-config"] {
            assert!(
                deps.iter().any(|dep| dep == expected),
                "missing dependency: {expected}"
            );
        }
        assert!(
            !deps.iter().any(|dep| dep == "lectern-testkit"),
            "testkit must stay a dev-dependency"
        );
    }

    #[test]
    fn infra_can_use_app_adapters_config_shared() {
        assert!(!infra_crate_version().is_empty());
        assert!(!app_crate_version().is_empty());
        assert!(!adapters_crate_version().is_empty());
        assert!(!config_crate_version().is_empty());
        assert!(!shared_crate_version().is_empty());
    }
}
