//! # lectern-adapters
//!
//! Adapter implementations for ports: chapter/search sources and logging.
//! This crate depends on `ports`, `shared`, `domain` and `config`.

pub mod file_source;
#[cfg(feature = "http")]
pub mod http_source;
pub mod log_sink;
pub mod logger;

pub use file_source::FileScriptureSource;
#[cfg(feature = "http")]
pub use http_source::{
    DEFAULT_MIN_REQUEST_INTERVAL, HttpScriptureSource, HttpScriptureSourceConfig,
};
pub use log_sink::{LogSink, MemoryLogSink, StderrLogSink};
pub use logger::{JsonLogger, parse_log_level};

/// Returns the adapters crate version.
#[must_use]
pub const fn adapters_crate_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::*;
    use lectern_ports::ports_crate_version;
    use lectern_shared::shared_crate_version;

    fn workspace_deps() -> Vec<String> {
        let cargo_toml = include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/Cargo.toml"));
        let mut deps = Vec::new();
        let mut in_deps = false;
        let mut in_dev_deps = false;

        for raw_line in cargo_toml.lines() {
            let line = raw_line.split('#').next().unwrap_or("").trim();
            if line.is_empty() {
                continue;
            }
            if line.starts_with('[') {
                in_deps = line == "[dependencies]";
                in_dev_deps = line == "[dev-dependencies]";
                continue;
            }
            if !(in_deps || in_dev_deps) {
                continue;
            }
            if line.starts_with("lectern-") {
                let key = line.split('=').next().unwrap_or("").trim();
                let name = key.split('.').next().unwrap_or("").trim();
                deps.push(name.to_string());
            }
        }

        deps
    }

    #[test]
    fn adapters_do_not_depend_on_app_or_infra() {
        let deps = workspace_deps();
        let forbidden = ["lectern-app", "lectern-infra"];

        for dep in &deps {
            assert!(
                !forbidden.contains(&dep.as_str()),
                "forbidden dependency found: {dep}"
            );
        }
    }

    #[test]
    fn adapters_can_use_ports_and_shared() {
        assert!(!adapters_crate_version().is_empty());
        assert!(!ports_crate_version().is_empty());
        assert!(!shared_crate_version().is_empty());
    }
}
