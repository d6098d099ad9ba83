//! Search session: one visible search state fed by possibly overlapping
//! searches.
//!
//! Every initiated search takes a new generation number. When a search
//! settles it may only update the visible state if its generation is still
//! the latest one; otherwise its outcome is discarded. `clear` also bumps the
//! generation, so searches that were running when it was called never
//! repopulate the state.

use crate::retrieval::RetrievalCoordinator;
use crate::storage_budget::StorageBudget;
use lectern_domain::{SearchResult, SupportedVersion};
use lectern_ports::{LogFields, LoggerPort, SearchRequest, SearchSourcePort};
use lectern_shared::{ErrorCode, ErrorEnvelope, RequestContext};
use serde_json::Value;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Instant;

/// Default number of results requested from the source.
pub const DEFAULT_SEARCH_LIMIT: u32 = 50;
/// Default shortest accepted query, in characters.
pub const DEFAULT_MIN_QUERY_LENGTH: usize = 2;

/// Failures reported by [`SearchSession::search`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SearchError {
    /// The version code is not `NLT` or `KJV`.
    #[error("unsupported version `{version}`")]
    UnsupportedVersion {
        /// Rejected version code.
        version: Box<str>,
    },
    /// The trimmed query is shorter than the configured minimum.
    #[error("query must be at least {min_length} characters")]
    QueryTooShort {
        /// Configured minimum.
        min_length: usize,
    },
    /// The search source failed.
    #[error("search source failed: {0}")]
    SourceFailure(ErrorEnvelope),
    /// This caller's request was cancelled.
    #[error("search cancelled")]
    Cancelled,
}

impl SearchError {
    /// Stable envelope code for this failure.
    #[must_use]
    pub fn error_code(&self) -> ErrorCode {
        match self {
            Self::UnsupportedVersion { .. } => ErrorCode::new("search", "unsupported_version"),
            Self::QueryTooShort { .. } => ErrorCode::new("search", "query_too_short"),
            Self::SourceFailure(_) => ErrorCode::new("search", "source_failure"),
            Self::Cancelled => ErrorCode::cancelled(),
        }
    }
}

impl From<lectern_domain::UnsupportedVersion> for SearchError {
    fn from(error: lectern_domain::UnsupportedVersion) -> Self {
        Self::UnsupportedVersion {
            version: error.version,
        }
    }
}

impl From<SearchError> for ErrorEnvelope {
    fn from(error: SearchError) -> Self {
        let code = error.error_code();
        let message = error.to_string();
        match error {
            SearchError::UnsupportedVersion { version } => {
                Self::expected(code, message).with_metadata("version", version.to_string())
            },
            SearchError::QueryTooShort { min_length } => Self::expected(code, message)
                .with_metadata("min_length", min_length.to_string()),
            SearchError::SourceFailure(source) => {
                let mut envelope = Self::unexpected(code, source.message.clone(), source.class)
                    .with_metadata("source_code", source.code.to_string());
                for (key, value) in source.metadata {
                    envelope = envelope.with_metadata(key, value);
                }
                envelope.redact_secrets()
            },
            SearchError::Cancelled => Self::cancelled(message),
        }
    }
}

/// Search limits applied by the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SearchSettings {
    /// Maximum results requested.
    pub limit: u32,
    /// Shortest accepted trimmed query, in characters.
    pub min_query_length: usize,
}

impl Default for SearchSettings {
    fn default() -> Self {
        Self {
            limit: DEFAULT_SEARCH_LIMIT,
            min_query_length: DEFAULT_MIN_QUERY_LENGTH,
        }
    }
}

/// Visible search state.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchSnapshot {
    /// Query of the latest search (trimmed).
    pub query: Box<str>,
    /// True while the latest search is pending.
    pub in_flight: bool,
    /// Results of the latest settled search.
    pub results: Vec<SearchResult>,
    /// Failure of the latest settled search.
    pub error: Option<SearchError>,
}

#[derive(Debug, Default)]
struct SearchState {
    generation: u64,
    snapshot: SearchSnapshot,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SearchMode {
    Source,
    CachedOnly,
}

impl SearchMode {
    const fn as_str(self) -> &'static str {
        match self {
            Self::Source => "source",
            Self::CachedOnly => "cache",
        }
    }
}

/// Search use case with stale-outcome protection.
pub struct SearchSession {
    source: Arc<dyn SearchSourcePort>,
    coordinator: Option<Arc<RetrievalCoordinator>>,
    storage: Option<Arc<StorageBudget>>,
    logger: Option<Arc<dyn LoggerPort>>,
    settings: SearchSettings,
    state: Mutex<SearchState>,
}

impl SearchSession {
    /// Session over `source`.
    #[must_use]
    pub fn new(source: Arc<dyn SearchSourcePort>, settings: SearchSettings) -> Self {
        Self {
            source,
            coordinator: None,
            storage: None,
            logger: None,
            settings,
            state: Mutex::new(SearchState::default()),
        }
    }

    /// Enable [`Self::search_cached_only`] over the coordinator's cache.
    #[must_use]
    pub fn with_cached_content(mut self, coordinator: Arc<RetrievalCoordinator>) -> Self {
        self.coordinator = Some(coordinator);
        self
    }

    /// Route [`Self::search`] to cached content once `budget` is spent.
    ///
    /// The fallback needs [`Self::with_cached_content`]; without it searches
    /// keep going to the source.
    #[must_use]
    pub fn with_storage_budget(mut self, budget: Arc<StorageBudget>) -> Self {
        self.storage = Some(budget);
        self
    }

    /// Emit structured events to `logger`.
    #[must_use]
    pub fn with_logger(mut self, logger: Arc<dyn LoggerPort>) -> Self {
        self.logger = Some(logger);
        self
    }

    /// Limits in effect.
    #[must_use]
    pub const fn settings(&self) -> SearchSettings {
        self.settings
    }

    /// Search verse text through the search source.
    ///
    /// A blank query clears the results without calling the source. Once
    /// an attached storage budget is spent the search runs over cached
    /// content instead. The returned value is this call's own outcome; the
    /// visible state only follows the latest search.
    pub async fn search(
        &self,
        ctx: &RequestContext,
        query: &str,
        version: &str,
    ) -> Result<Vec<SearchResult>, SearchError> {
        self.run(ctx, query, version, self.source_mode()).await
    }

    /// True when [`Self::search`] currently answers from cached content.
    #[must_use]
    pub fn searches_cached_only(&self) -> bool {
        self.source_mode() == SearchMode::CachedOnly
    }

    /// Same as [`Self::search`], but only over chapters already cached by
    /// the retrieval coordinator.
    pub async fn search_cached_only(
        &self,
        ctx: &RequestContext,
        query: &str,
        version: &str,
    ) -> Result<Vec<SearchResult>, SearchError> {
        self.run(ctx, query, version, SearchMode::CachedOnly).await
    }

    /// Reset query, results, error and the in-flight flag. Outstanding
    /// searches are invalidated.
    pub fn clear(&self) {
        let mut state = self.lock_state();
        state.generation += 1;
        state.snapshot = SearchSnapshot::default();
    }

    /// Copy of the visible state.
    #[must_use]
    pub fn snapshot(&self) -> SearchSnapshot {
        self.lock_state().snapshot.clone()
    }

    async fn run(
        &self,
        ctx: &RequestContext,
        query: &str,
        version: &str,
        mode: SearchMode,
    ) -> Result<Vec<SearchResult>, SearchError> {
        let trimmed = query.trim();
        let generation = self.begin(trimmed);

        if trimmed.is_empty() {
            self.settle(generation, trimmed, Ok(Vec::new()));
            return Ok(Vec::new());
        }

        let outcome = match self.validate(trimmed, version) {
            Ok(version) => self.execute(ctx, trimmed, version, mode).await,
            Err(error) => Err(error),
        };
        self.settle(generation, trimmed, outcome.clone());
        outcome
    }

    fn validate(&self, query: &str, version: &str) -> Result<SupportedVersion, SearchError> {
        let version = SupportedVersion::parse(version)?;
        if query.chars().count() < self.settings.min_query_length {
            return Err(SearchError::QueryTooShort {
                min_length: self.settings.min_query_length,
            });
        }
        Ok(version)
    }

    async fn execute(
        &self,
        ctx: &RequestContext,
        query: &str,
        version: SupportedVersion,
        mode: SearchMode,
    ) -> Result<Vec<SearchResult>, SearchError> {
        let started_at = Instant::now();
        if let Some(logger) = self.logger.as_ref() {
            logger.info(
                "search.start",
                "Search started",
                Some(search_fields(ctx, query, version, mode)),
            );
        }

        let outcome = tokio::select! {
            biased;
            () = ctx.cancelled() => Err(SearchError::Cancelled),
            outcome = self.query_source(ctx, query, version, mode) => outcome,
        };

        if let Some(logger) = self.logger.as_ref() {
            let mut fields = search_fields(ctx, query, version, mode);
            insert_field(&mut fields, "durationMs", Value::from(duration_ms(started_at)));
            match &outcome {
                Ok(results) => {
                    insert_field(&mut fields, "results", Value::from(results.len()));
                    logger.info("search.completed", "Search completed", Some(fields));
                },
                Err(error) => {
                    insert_field(
                        &mut fields,
                        "errorCode",
                        Value::from(error.error_code().to_string()),
                    );
                    logger.warn("search.failed", "Search failed", Some(fields));
                },
            }
        }

        outcome
    }

    async fn query_source(
        &self,
        ctx: &RequestContext,
        query: &str,
        version: SupportedVersion,
        mode: SearchMode,
    ) -> Result<Vec<SearchResult>, SearchError> {
        match mode {
            SearchMode::Source => {
                let request = SearchRequest {
                    query: query.into(),
                    version,
                    limit: self.settings.limit,
                };
                self.source
                    .search_text(ctx, request)
                    .await
                    .map_err(SearchError::SourceFailure)
            },
            SearchMode::CachedOnly => {
                let Some(coordinator) = self.coordinator.as_ref() else {
                    return Err(SearchError::SourceFailure(ErrorEnvelope::expected(
                        ErrorCode::new("search", "cache_unavailable"),
                        "cached-only search needs a retrieval coordinator",
                    )));
                };
                let limit = usize::try_from(self.settings.limit).unwrap_or(usize::MAX);
                Ok(coordinator.search_cached(query, version, limit).await)
            },
        }
    }

    fn source_mode(&self) -> SearchMode {
        let exhausted = self
            .storage
            .as_ref()
            .is_some_and(|budget| budget.is_exhausted());
        if exhausted && self.coordinator.is_some() {
            SearchMode::CachedOnly
        } else {
            SearchMode::Source
        }
    }

    fn begin(&self, query: &str) -> u64 {
        let mut state = self.lock_state();
        state.generation += 1;
        state.snapshot.query = query.into();
        state.snapshot.in_flight = !query.is_empty();
        state.snapshot.error = None;
        state.generation
    }

    fn settle(
        &self,
        generation: u64,
        query: &str,
        outcome: Result<Vec<SearchResult>, SearchError>,
    ) {
        let mut state = self.lock_state();
        if state.generation != generation {
            drop(state);
            if let Some(logger) = self.logger.as_ref() {
                let mut fields = LogFields::new();
                insert_field(&mut fields, "query", Value::from(query));
                insert_field(&mut fields, "generation", Value::from(generation));
                logger.debug(
                    "search.stale_discarded",
                    "Discarded outcome of a superseded search",
                    Some(fields),
                );
            }
            return;
        }

        state.snapshot.in_flight = false;
        match outcome {
            Ok(results) => {
                state.snapshot.results = results;
                state.snapshot.error = None;
            },
            Err(error) => {
                state.snapshot.results.clear();
                state.snapshot.error = Some(error);
            },
        }
    }

    fn lock_state(&self) -> MutexGuard<'_, SearchState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl std::fmt::Debug for SearchSession {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        formatter
            .debug_struct("SearchSession")
            .field("settings", &self.settings)
            .field("cached_content", &self.coordinator.is_some())
            .field("storage", &self.storage)
            .finish_non_exhaustive()
    }
}

fn search_fields(
    ctx: &RequestContext,
    query: &str,
    version: SupportedVersion,
    mode: SearchMode,
) -> LogFields {
    let mut fields = LogFields::new();
    insert_field(
        &mut fields,
        "correlationId",
        Value::from(ctx.correlation_id().as_str()),
    );
    insert_field(&mut fields, "query", Value::from(query));
    insert_field(&mut fields, "version", Value::from(version.code()));
    insert_field(&mut fields, "mode", Value::from(mode.as_str()));
    fields
}

fn insert_field(fields: &mut LogFields, key: &str, value: Value) {
    fields.insert(key.to_owned().into_boxed_str(), value);
}

fn duration_ms(started_at: Instant) -> u64 {
    u64::try_from(started_at.elapsed().as_millis()).unwrap_or(u64::MAX)
}
