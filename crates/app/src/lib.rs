//! # lectern-app
//!
//! Application use cases: cache-first chapter retrieval, search with stale
//! outcome protection, the reading session, and the storage budget.
//! This crate depends on `ports`, `domain`, and `shared`.

pub mod reading;
pub mod retrieval;
pub mod search_session;
pub mod storage_budget;

/// Returns the app crate version.
#[must_use]
pub const fn app_crate_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

pub use reading::{ReadingSession, navigate_to_reference};
pub use retrieval::{
    CacheStats, DEFAULT_CACHED_SEARCH_LIMIT, PreloadSummary, RetrievalCoordinator, RetrievalError,
};
pub use search_session::{
    DEFAULT_MIN_QUERY_LENGTH, DEFAULT_SEARCH_LIMIT, SearchError, SearchSession, SearchSettings,
    SearchSnapshot,
};
pub use storage_budget::{
    Admission, DEFAULT_STORAGE_VERSE_LIMIT, StorageBudget, StorageBudgetSource, StorageUsage,
};

#[cfg(test)]
mod tests {
    use super::*;
    use lectern_domain::domain_crate_version;
    use lectern_ports::ports_crate_version;
    use lectern_shared::shared_crate_version;

    #[test]
    fn app_crate_compiles() {
        let version = app_crate_version();
        assert!(!version.is_empty());
    }

    #[test]
    fn app_can_use_ports_domain_shared() {
        assert!(!ports_crate_version().is_empty());
        assert!(!domain_crate_version().is_empty());
        assert!(!shared_crate_version().is_empty());
    }
}
