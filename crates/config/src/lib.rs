//! # lectern-config
//!
//! Configuration schema, validation, and normalization for the lectern
//! reader. This crate depends on `domain` and `shared` only.

/// Environment variable parsing and merging.
pub mod env;
/// Config loading helpers (env + file + overrides).
pub mod load;
/// Configuration schema types and helpers.
pub mod schema;

pub use schema::{
    CURRENT_CONFIG_VERSION, ConfigSchemaError, LecternConfig, RetrievalConfig, SearchConfig,
    SessionConfig, SourceConfig, SourceKind, StorageConfig, ValidatedLecternConfig, parse_lectern_config_json,
    parse_lectern_config_toml,
};

pub use env::{
    ENV_DEFAULT_VERSION, ENV_FETCH_TIMEOUT_MS, ENV_SEARCH_LIMIT, ENV_SOURCE_API_KEY,
    ENV_SOURCE_BASE_URL, ENV_SOURCE_DATA_DIR, ENV_SOURCE_KIND, ENV_SOURCE_TIMEOUT_MS,
    ENV_STORAGE_VERSE_LIMIT, EnvParseError, LecternEnv, apply_env_overrides,
};
pub use load::{
    load_lectern_config_from_path, load_lectern_config_from_sources, load_lectern_config_std_env,
    to_pretty_json, to_pretty_toml,
};

/// Returns the config crate version.
#[must_use]
pub const fn config_crate_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
