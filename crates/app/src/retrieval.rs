//! Retrieval coordinator: cache-first chapter retrieval with single-flight
//! de-duplication of concurrent fetches.
//!
//! The coordinator exclusively owns two maps keyed by `(book, chapter, version)`:
//! the resolved chapter cache and the in-flight map of pending fetches. A
//! fetch stores its chapter in the cache before its in-flight entry is
//! removed, and a fetch that starts after a race re-checks the cache first,
//! so one key is never fetched twice at the same time.
//!
//! The shared fetch runs under a detached context on the single-flight's own
//! task. Waiters that cancel stop waiting; the fetch keeps going for everyone
//! else and still populates the cache.

use crate::storage_budget::{StorageBudget, StorageUsage};
use lectern_domain::{
    Address, ChapterContent, SearchResult, SourceTag, SupportedVersion, books, chapter_count,
    matches_query,
};
use lectern_ports::{
    ChapterRequest, ChapterSourcePort, FetchedChapter, LogEvent, LogFields, LogLevel, LoggerPort,
};
use lectern_shared::{
    ErrorClass, ErrorCode, ErrorEnvelope, FlightRole, RequestContext, SingleFlight,
    timeout_with_context,
};
use serde::Serialize;
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};
use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};
use tokio::sync::Mutex;

/// Default number of matches returned by [`RetrievalCoordinator::search_cached`].
pub const DEFAULT_CACHED_SEARCH_LIMIT: usize = 50;

type FetchOutcome = Result<ChapterContent, ErrorEnvelope>;
type ChapterCache = Arc<Mutex<HashMap<ChapterRequest, ChapterContent>>>;

/// Failures reported by [`RetrievalCoordinator::get_chapter`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RetrievalError {
    /// The version code is not `NLT` or `KJV`.
    #[error("unsupported version `{version}`")]
    UnsupportedVersion {
        /// Rejected version code.
        version: Box<str>,
    },
    /// The content source failed, timed out, or returned no verses.
    #[error("chapter source failed: {0}")]
    SourceFailure(ErrorEnvelope),
    /// This caller's request was cancelled while waiting.
    #[error("chapter request cancelled")]
    Cancelled,
}

impl RetrievalError {
    /// Stable envelope code for this failure.
    #[must_use]
    pub fn error_code(&self) -> ErrorCode {
        match self {
            Self::UnsupportedVersion { .. } => ErrorCode::new("retrieval", "unsupported_version"),
            Self::SourceFailure(_) => ErrorCode::new("retrieval", "source_failure"),
            Self::Cancelled => ErrorCode::cancelled(),
        }
    }
}

impl From<lectern_domain::UnsupportedVersion> for RetrievalError {
    fn from(error: lectern_domain::UnsupportedVersion) -> Self {
        Self::UnsupportedVersion {
            version: error.version,
        }
    }
}

impl From<RetrievalError> for ErrorEnvelope {
    fn from(error: RetrievalError) -> Self {
        let code = error.error_code();
        match error {
            RetrievalError::UnsupportedVersion { version } => Self::expected(
                code,
                format!("unsupported version `{version}` (expected NLT or KJV)"),
            )
            .with_metadata("version", version.to_string()),
            RetrievalError::SourceFailure(source) => {
                let mut envelope = Self::unexpected(code, source.message.clone(), source.class)
                    .with_metadata("source_code", source.code.to_string());
                for (key, value) in source.metadata {
                    envelope = envelope.with_metadata(key, value);
                }
                envelope.redact_secrets()
            },
            RetrievalError::Cancelled => Self::cancelled("chapter request cancelled"),
        }
    }
}

/// Cache usage counters and per-version entry counts.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheStats {
    /// Cached chapters per version.
    pub entries: BTreeMap<SupportedVersion, usize>,
    /// Calls answered from the cache.
    pub hits: u64,
    /// Calls that missed the cache (leaders and followers).
    pub misses: u64,
    /// Fetches issued to the content source.
    pub fetches: u64,
    /// Fetches that failed.
    pub failures: u64,
    /// Persistent storage usage, when a budget is attached.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub storage: Option<StorageUsage>,
}

impl CacheStats {
    /// Total cached chapters across versions.
    #[must_use]
    pub fn total_entries(&self) -> usize {
        self.entries.values().sum()
    }
}

/// Outcome of [`RetrievalCoordinator::preload`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PreloadSummary {
    /// Distinct chapters requested.
    pub requested: usize,
    /// Chapters that are cached after the preload.
    pub loaded: usize,
    /// Chapters whose fetch failed.
    pub failed: Vec<Address>,
}

#[derive(Debug, Default)]
struct Counters {
    hits: AtomicU64,
    misses: AtomicU64,
    fetches: AtomicU64,
    failures: AtomicU64,
}

/// Cache-first, single-flight chapter retrieval.
pub struct RetrievalCoordinator {
    source: Arc<dyn ChapterSourcePort>,
    logger: Option<Arc<dyn LoggerPort>>,
    fetch_timeout: Option<Duration>,
    storage: Option<Arc<StorageBudget>>,
    cache: ChapterCache,
    in_flight: SingleFlight<ChapterRequest, FetchOutcome>,
    counters: Arc<Counters>,
}

impl RetrievalCoordinator {
    /// Coordinator over `source` with an empty cache.
    #[must_use]
    pub fn new(source: Arc<dyn ChapterSourcePort>) -> Self {
        Self {
            source,
            logger: None,
            fetch_timeout: None,
            storage: None,
            cache: Arc::new(Mutex::new(HashMap::new())),
            in_flight: SingleFlight::new(),
            counters: Arc::new(Counters::default()),
        }
    }

    /// Emit structured events to `logger`.
    #[must_use]
    pub fn with_logger(mut self, logger: Arc<dyn LoggerPort>) -> Self {
        self.logger = Some(logger);
        self
    }

    /// Deadline applied to each shared fetch.
    #[must_use]
    pub const fn with_fetch_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.fetch_timeout = timeout;
        self
    }

    /// Report `budget` usage in [`Self::cache_stats`].
    ///
    /// The budget itself is enforced by the source wrapper it was created
    /// for; see [`crate::StorageBudgetSource`].
    #[must_use]
    pub fn with_storage_budget(mut self, budget: Arc<StorageBudget>) -> Self {
        self.storage = Some(budget);
        self
    }

    /// Return the chapter `address` points into, in `version`.
    ///
    /// `version` is validated before the cache or the source is touched.
    pub async fn get_chapter(
        &self,
        ctx: &RequestContext,
        address: &Address,
        version: &str,
    ) -> Result<ChapterContent, RetrievalError> {
        let version = SupportedVersion::parse(version)?;
        self.get_chapter_in(ctx, address, version).await
    }

    /// Typed variant of [`Self::get_chapter`].
    pub async fn get_chapter_in(
        &self,
        ctx: &RequestContext,
        address: &Address,
        version: SupportedVersion,
    ) -> Result<ChapterContent, RetrievalError> {
        if ctx.is_cancelled() {
            return Err(RetrievalError::Cancelled);
        }

        let request = ChapterRequest::new(address, version);
        if let Some(content) = self.cache.lock().await.get(&request).cloned() {
            self.counters.hits.fetch_add(1, Ordering::Relaxed);
            self.log_debug(ctx, "retrieval.cache_hit", "Chapter served from cache", request);
            return Ok(content.with_source_tag(SourceTag::CacheHit));
        }
        self.counters.misses.fetch_add(1, Ordering::Relaxed);

        let flight = self
            .in_flight
            .run(request, || self.start_fetch(ctx, request));
        let (outcome, role) = tokio::select! {
            biased;
            () = ctx.cancelled() => return Err(RetrievalError::Cancelled),
            settled = flight => settled,
        };

        if role == FlightRole::Follower {
            self.log_debug(
                ctx,
                "retrieval.attached",
                "Attached to in-flight chapter fetch",
                request,
            );
        }

        outcome.map_err(RetrievalError::SourceFailure)
    }

    /// Fetch every distinct chapter of `addresses` that is not cached yet.
    pub async fn preload(
        &self,
        ctx: &RequestContext,
        version: SupportedVersion,
        addresses: &[Address],
    ) -> Result<PreloadSummary, RetrievalError> {
        let mut chapters: Vec<Address> = addresses.iter().map(Address::without_verse).collect();
        chapters.sort_by_key(|address| (address.book(), address.chapter()));
        chapters.dedup();

        let outcomes = futures_util::future::join_all(
            chapters
                .iter()
                .map(|address| self.get_chapter_in(ctx, address, version)),
        )
        .await;

        let mut summary = PreloadSummary {
            requested: chapters.len(),
            ..PreloadSummary::default()
        };
        for (address, outcome) in chapters.into_iter().zip(outcomes) {
            match outcome {
                Ok(_) => summary.loaded += 1,
                Err(RetrievalError::Cancelled) => return Err(RetrievalError::Cancelled),
                Err(_) => summary.failed.push(address),
            }
        }
        Ok(summary)
    }

    /// Cached content for `address` without touching the source.
    pub async fn cached_chapter(
        &self,
        address: &Address,
        version: SupportedVersion,
    ) -> Option<ChapterContent> {
        let request = ChapterRequest::new(address, version);
        self.cache
            .lock()
            .await
            .get(&request)
            .cloned()
            .map(|content| content.with_source_tag(SourceTag::CacheHit))
    }

    /// Number of cached chapters in `version`.
    pub async fn cached_chapter_count(&self, version: SupportedVersion) -> usize {
        self.cache
            .lock()
            .await
            .keys()
            .filter(|request| request.version == version)
            .count()
    }

    /// Catalog chapters not cached in `version`, in canonical order.
    pub async fn missing_chapters(&self, version: SupportedVersion) -> Vec<Address> {
        let cache = self.cache.lock().await;
        books()
            .flat_map(|book| (1..=chapter_count(book)).filter_map(move |chapter| {
                Address::chapter_of(book, chapter).ok()
            }))
            .filter(|address| !cache.contains_key(&ChapterRequest::new(address, version)))
            .collect()
    }

    /// Snapshot of cache usage.
    pub async fn cache_stats(&self) -> CacheStats {
        let mut entries = BTreeMap::new();
        for request in self.cache.lock().await.keys() {
            *entries.entry(request.version).or_insert(0) += 1;
        }
        CacheStats {
            entries,
            hits: self.counters.hits.load(Ordering::Relaxed),
            misses: self.counters.misses.load(Ordering::Relaxed),
            fetches: self.counters.fetches.load(Ordering::Relaxed),
            failures: self.counters.failures.load(Ordering::Relaxed),
            storage: self.storage.as_ref().map(|budget| budget.usage()),
        }
    }

    /// Case-insensitive substring search over cached chapters only.
    ///
    /// Matches come in canonical book/chapter/verse order. A blank query or
    /// a zero limit yields nothing.
    pub async fn search_cached(
        &self,
        query: &str,
        version: SupportedVersion,
        limit: usize,
    ) -> Vec<SearchResult> {
        let lowered = query.trim().to_lowercase();
        if lowered.is_empty() || limit == 0 {
            return Vec::new();
        }

        let cache = self.cache.lock().await;
        let mut chapters: Vec<&ChapterContent> = cache
            .iter()
            .filter(|(request, _)| request.version == version)
            .map(|(_, content)| content)
            .collect();
        chapters.sort_by_key(|content| (content.book(), content.chapter()));

        chapters
            .into_iter()
            .flat_map(|content| {
                content
                    .verses()
                    .iter()
                    .filter(|verse| matches_query(&verse.text, &lowered))
                    .map(move |verse| SearchResult::from_cached_verse(content, verse))
            })
            .take(limit)
            .collect()
    }

    fn start_fetch(
        &self,
        ctx: &RequestContext,
        request: ChapterRequest,
    ) -> impl Future<Output = FetchOutcome> + Send + 'static {
        FetchTask {
            source: Arc::clone(&self.source),
            logger: self.logger.clone(),
            fetch_timeout: self.fetch_timeout,
            cache: Arc::clone(&self.cache),
            counters: Arc::clone(&self.counters),
            ctx: ctx.detached(),
            request,
        }
        .run()
    }

    fn log_debug(
        &self,
        ctx: &RequestContext,
        event: &str,
        message: &str,
        request: ChapterRequest,
    ) {
        if let Some(logger) = self.logger.as_ref() {
            logger.debug(event, message, Some(request_fields(ctx, request)));
        }
    }
}

impl std::fmt::Debug for RetrievalCoordinator {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        formatter
            .debug_struct("RetrievalCoordinator")
            .field("source", &self.source.source().id)
            .field("fetch_timeout", &self.fetch_timeout)
            .field("storage", &self.storage)
            .finish_non_exhaustive()
    }
}

/// Owned state of one leader fetch.
struct FetchTask {
    source: Arc<dyn ChapterSourcePort>,
    logger: Option<Arc<dyn LoggerPort>>,
    fetch_timeout: Option<Duration>,
    cache: ChapterCache,
    counters: Arc<Counters>,
    ctx: RequestContext,
    request: ChapterRequest,
}

impl FetchTask {
    async fn run(self) -> FetchOutcome {
        if let Some(content) = self.cache.lock().await.get(&self.request).cloned() {
            return Ok(content.with_source_tag(SourceTag::CacheHit));
        }

        let started_at = Instant::now();
        self.counters.fetches.fetch_add(1, Ordering::Relaxed);
        if let Some(logger) = self.logger.as_ref() {
            logger.info(
                "retrieval.fetch.start",
                "Chapter fetch started",
                Some(request_fields(&self.ctx, self.request)),
            );
        }

        match self.fetch().await {
            Ok(content) => {
                self.cache
                    .lock()
                    .await
                    .insert(self.request, content.clone());
                if let Some(logger) = self.logger.as_ref() {
                    let mut fields = request_fields(&self.ctx, self.request);
                    insert_field(&mut fields, "durationMs", Value::from(duration_ms(started_at)));
                    insert_field(&mut fields, "verses", Value::from(content.verses().len()));
                    insert_field(
                        &mut fields,
                        "sourceTag",
                        serde_json::to_value(content.source_tag()).unwrap_or(Value::Null),
                    );
                    logger.info(
                        "retrieval.fetch.completed",
                        "Chapter fetch completed",
                        Some(fields),
                    );
                }
                Ok(content)
            },
            Err(error) => {
                self.counters.failures.fetch_add(1, Ordering::Relaxed);
                if let Some(logger) = self.logger.as_ref() {
                    let mut fields = request_fields(&self.ctx, self.request);
                    insert_field(&mut fields, "durationMs", Value::from(duration_ms(started_at)));
                    logger.log(
                        LogEvent::new(
                            LogLevel::Warn,
                            "retrieval.fetch.failed",
                            "Chapter fetch failed",
                        )
                        .with_fields(Some(fields))
                        .with_error(&error),
                    );
                }
                Err(error)
            },
        }
    }

    async fn fetch(&self) -> FetchOutcome {
        let pending = self.source.fetch_chapter(&self.ctx, self.request);
        let fetched = match self.fetch_timeout {
            Some(timeout) => {
                timeout_with_context(&self.ctx, timeout, "retrieval.fetch_chapter", pending)
                    .await?
            },
            None => pending.await?,
        };
        self.build_content(fetched)
    }

    fn build_content(&self, fetched: FetchedChapter) -> FetchOutcome {
        if fetched.verses.is_empty() {
            return Err(ErrorEnvelope::unexpected(
                ErrorCode::new("retrieval", "empty_chapter"),
                "source returned no verses",
                ErrorClass::NonRetriable,
            )
            .with_metadata("book", self.request.book.name())
            .with_metadata("chapter", self.request.chapter.to_string()));
        }

        let address = Address::chapter_of(self.request.book, self.request.chapter).map_err(
            |error| {
                ErrorEnvelope::invariant(ErrorCode::internal(), error.to_string())
                    .with_metadata("chapter", self.request.chapter.to_string())
            },
        )?;
        Ok(ChapterContent::new(
            &address,
            self.request.version,
            fetched.subtitle,
            fetched.verses,
            SourceTag::fetched(fetched.from_persistent_store),
        ))
    }
}

fn request_fields(ctx: &RequestContext, request: ChapterRequest) -> LogFields {
    let mut fields = LogFields::new();
    insert_field(
        &mut fields,
        "correlationId",
        Value::from(ctx.correlation_id().as_str()),
    );
    insert_field(&mut fields, "book", Value::from(request.book.name()));
    insert_field(&mut fields, "chapter", Value::from(request.chapter));
    insert_field(&mut fields, "version", Value::from(request.version.code()));
    fields
}

fn insert_field(fields: &mut LogFields, key: &str, value: Value) {
    fields.insert(key.to_owned().into_boxed_str(), value);
}

fn duration_ms(started_at: Instant) -> u64 {
    u64::try_from(started_at.elapsed().as_millis()).unwrap_or(u64::MAX)
}
