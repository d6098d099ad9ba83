//! In-memory adapter implementations for port contracts.
//!
//! These implementations are intended for:
//! - Unit/integration tests
//! - Deterministic contract tests for the ports layer
//! - Local experimentation without network or disk access

use lectern_domain::{Address, SearchResult, SupportedVersion, Verse};
use lectern_ports::{
    BoxFuture, ChapterRequest, ChapterSourcePort, FetchedChapter, LogEvent, LogFields, LoggerPort,
    SearchRequest, SearchSourcePort, SourceInfo,
};
use lectern_shared::{ErrorCode, ErrorEnvelope, RequestContext, Result};
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

/// A no-op logger implementation.
#[derive(Debug, Default)]
pub struct NoopLogger;

impl LoggerPort for NoopLogger {
    fn log(&self, _event: LogEvent) {}

    fn child(&self, _fields: LogFields) -> Box<dyn LoggerPort> {
        Box::new(Self)
    }
}

/// Logger that keeps every event for later assertions.
///
/// Children share the same event buffer and merge their base fields into
/// each event.
#[derive(Debug, Clone, Default)]
pub struct RecordingLogger {
    events: Arc<Mutex<Vec<LogEvent>>>,
    base_fields: LogFields,
}

impl RecordingLogger {
    /// Create an empty recorder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of all recorded events, oldest first.
    pub fn events(&self) -> Vec<LogEvent> {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Recorded events with the given event name.
    pub fn events_named(&self, name: &str) -> Vec<LogEvent> {
        self.events()
            .into_iter()
            .filter(|event| event.event.as_ref() == name)
            .collect()
    }
}

impl LoggerPort for RecordingLogger {
    fn log(&self, mut event: LogEvent) {
        if !self.base_fields.is_empty() {
            let mut fields = self.base_fields.clone();
            fields.extend(event.fields.take().unwrap_or_default());
            event.fields = Some(fields);
        }
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(event);
    }

    fn child(&self, fields: LogFields) -> Box<dyn LoggerPort> {
        let mut base_fields = self.base_fields.clone();
        base_fields.extend(fields);
        Box::new(Self {
            events: Arc::clone(&self.events),
            base_fields,
        })
    }
}

/// Chapter source backed by a map of canned chapters.
///
/// Unknown chapters fail with `core:not_found`. Queued failures are returned
/// before any lookup, one per call.
#[derive(Debug, Clone)]
pub struct InMemoryChapterSource {
    info: SourceInfo,
    chapters: Arc<HashMap<ChapterRequest, FetchedChapter>>,
    failures: Arc<Mutex<VecDeque<ErrorEnvelope>>>,
    delay: Option<Duration>,
    persistent: bool,
    calls: Arc<AtomicUsize>,
}

impl Default for InMemoryChapterSource {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryChapterSource {
    /// Empty source.
    #[must_use]
    pub fn new() -> Self {
        Self {
            info: SourceInfo::new("memory", "In-memory chapters"),
            chapters: Arc::new(HashMap::new()),
            failures: Arc::new(Mutex::new(VecDeque::new())),
            delay: None,
            persistent: false,
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Add a chapter. `verses` are `(number, text)` pairs.
    #[must_use]
    pub fn with_chapter(
        mut self,
        address: &Address,
        version: SupportedVersion,
        verses: &[(u32, &str)],
    ) -> Self {
        let fetched = FetchedChapter {
            verses: verses
                .iter()
                .map(|(number, text)| Verse::new(*number, *text))
                .collect(),
            subtitle: None,
            from_persistent_store: self.persistent,
        };
        Arc::make_mut(&mut self.chapters).insert(ChapterRequest::new(address, version), fetched);
        self
    }

    /// Delay every fetch by `delay`.
    #[must_use]
    pub const fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Report chapters as coming from a persistent store.
    #[must_use]
    pub fn persistent(mut self, persistent: bool) -> Self {
        self.persistent = persistent;
        for fetched in Arc::make_mut(&mut self.chapters).values_mut() {
            fetched.from_persistent_store = persistent;
        }
        self
    }

    /// Fail the next call with `error`.
    pub fn fail_next(&self, error: ErrorEnvelope) {
        self.failures
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push_back(error);
    }

    /// Number of `fetch_chapter` calls so far.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl ChapterSourcePort for InMemoryChapterSource {
    fn source(&self) -> &SourceInfo {
        &self.info
    }

    fn fetch_chapter(
        &self,
        ctx: &RequestContext,
        request: ChapterRequest,
    ) -> BoxFuture<'_, Result<FetchedChapter>> {
        let ctx = ctx.clone();
        Box::pin(async move {
            self.calls.fetch_add(1, Ordering::SeqCst);
            ctx.ensure_not_cancelled("in_memory_chapters.fetch")?;
            if let Some(delay) = self.delay {
                sleep_or_cancel(&ctx, delay, "in_memory_chapters.fetch").await?;
            }

            let failure = self
                .failures
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .pop_front();
            if let Some(error) = failure {
                return Err(error);
            }

            self.chapters.get(&request).cloned().ok_or_else(|| {
                ErrorEnvelope::expected(ErrorCode::not_found(), "chapter not found")
                    .with_metadata("book", request.book.name())
                    .with_metadata("chapter", request.chapter.to_string())
                    .with_metadata("version", request.version.code())
            })
        })
    }
}

/// Search source with canned results per query.
///
/// Queries without canned results return an empty list.
#[derive(Debug, Clone, Default)]
pub struct InMemorySearchSource {
    results: Arc<HashMap<Box<str>, Vec<SearchResult>>>,
    delays: Arc<HashMap<Box<str>, Duration>>,
    failures: Arc<HashMap<Box<str>, ErrorEnvelope>>,
    requests: Arc<Mutex<Vec<SearchRequest>>>,
}

impl InMemorySearchSource {
    /// Empty source.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Results returned for `query`.
    #[must_use]
    pub fn with_results(mut self, query: &str, results: Vec<SearchResult>) -> Self {
        Arc::make_mut(&mut self.results).insert(query.into(), results);
        self
    }

    /// Delay answers to `query`.
    #[must_use]
    pub fn with_delay(mut self, query: &str, delay: Duration) -> Self {
        Arc::make_mut(&mut self.delays).insert(query.into(), delay);
        self
    }

    /// Fail every search for `query`.
    #[must_use]
    pub fn with_failure(mut self, query: &str, error: ErrorEnvelope) -> Self {
        Arc::make_mut(&mut self.failures).insert(query.into(), error);
        self
    }

    /// Number of `search_text` calls so far.
    pub fn calls(&self) -> usize {
        self.requests().len()
    }

    /// Requests received so far, oldest first.
    pub fn requests(&self) -> Vec<SearchRequest> {
        self.requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl SearchSourcePort for InMemorySearchSource {
    fn search_text(
        &self,
        ctx: &RequestContext,
        request: SearchRequest,
    ) -> BoxFuture<'_, Result<Vec<SearchResult>>> {
        let ctx = ctx.clone();
        Box::pin(async move {
            self.requests
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .push(request.clone());
            ctx.ensure_not_cancelled("in_memory_search.search")?;

            if let Some(delay) = self.delays.get(&request.query) {
                sleep_or_cancel(&ctx, *delay, "in_memory_search.search").await?;
            }
            if let Some(error) = self.failures.get(&request.query) {
                return Err(error.clone());
            }

            let limit = usize::try_from(request.limit).unwrap_or(usize::MAX);
            Ok(self
                .results
                .get(&request.query)
                .map(|results| results.iter().take(limit).cloned().collect())
                .unwrap_or_default())
        })
    }
}

/// Build a source-style search result.
pub fn search_result(reference: &str, text: &str, version: SupportedVersion) -> SearchResult {
    let (book, location) = reference.rsplit_once(' ').unwrap_or((reference, "1:1"));
    let (chapter, verse) = location.split_once(':').unwrap_or(("1", "1"));
    SearchResult {
        reference: reference.into(),
        book: book.into(),
        chapter: chapter.parse().unwrap_or(1),
        verse: verse.parse().unwrap_or(1),
        text: text.into(),
        version: version.code().into(),
        from_cache: false,
    }
}

async fn sleep_or_cancel(
    ctx: &RequestContext,
    delay: Duration,
    operation: &'static str,
) -> Result<()> {
    tokio::select! {
        () = ctx.cancelled() => ctx.ensure_not_cancelled(operation),
        () = tokio::time::sleep(delay) => Ok(()),
    }
}
