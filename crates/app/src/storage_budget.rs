//! Persistent storage budget for fetched chapters.
//!
//! Sources report whether they keep a chapter persistently. The budget caps
//! how many verses may be kept that way: a chapter that fits is counted once,
//! a chapter that would push the total past the limit is passed through as
//! transient. Search falls back to cached content once the budget is spent.

use lectern_ports::{
    BoxFuture, ChapterRequest, ChapterSourcePort, FetchedChapter, LogFields, LoggerPort,
    SourceInfo,
};
use lectern_shared::{RequestContext, Result};
use serde::Serialize;
use serde_json::Value;
use std::collections::HashSet;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// Verses kept persistently when no limit is configured.
pub const DEFAULT_STORAGE_VERSE_LIMIT: u64 = 500;

/// Snapshot of budget usage.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StorageUsage {
    /// Verses counted against the limit.
    pub stored_verses: u64,
    /// Chapters counted against the limit.
    pub stored_chapters: u64,
    /// Configured verse limit.
    pub verse_limit: u64,
    /// Verses that may still be stored.
    pub remaining: u64,
    /// True once no further verse fits.
    pub exhausted: bool,
}

/// Whether a chapter was admitted into persistent storage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    /// Counted now.
    Stored,
    /// Counted by an earlier fetch.
    AlreadyStored,
    /// Would exceed the limit; served without storing.
    OverLimit,
}

#[derive(Debug, Default)]
struct BudgetState {
    stored_verses: u64,
    stored: HashSet<ChapterRequest>,
}

/// Shared verse counter with a fixed limit.
#[derive(Debug)]
pub struct StorageBudget {
    verse_limit: u64,
    state: Mutex<BudgetState>,
}

impl Default for StorageBudget {
    fn default() -> Self {
        Self::new(DEFAULT_STORAGE_VERSE_LIMIT)
    }
}

impl StorageBudget {
    /// Empty budget allowing `verse_limit` stored verses.
    #[must_use]
    pub fn new(verse_limit: u64) -> Self {
        Self {
            verse_limit,
            state: Mutex::new(BudgetState::default()),
        }
    }

    /// Configured limit.
    #[must_use]
    pub const fn verse_limit(&self) -> u64 {
        self.verse_limit
    }

    /// Count `verses` of `request` if they fit.
    ///
    /// A chapter is counted at most once; fetching it again reports
    /// [`Admission::AlreadyStored`] even when the budget is spent.
    pub fn admit(&self, request: ChapterRequest, verses: u64) -> Admission {
        let mut state = self.lock_state();
        if state.stored.contains(&request) {
            return Admission::AlreadyStored;
        }
        let total = state.stored_verses.saturating_add(verses);
        if total > self.verse_limit {
            return Admission::OverLimit;
        }
        state.stored_verses = total;
        state.stored.insert(request);
        Admission::Stored
    }

    /// Current usage.
    #[must_use]
    pub fn usage(&self) -> StorageUsage {
        let state = self.lock_state();
        let remaining = self.verse_limit.saturating_sub(state.stored_verses);
        StorageUsage {
            stored_verses: state.stored_verses,
            stored_chapters: u64::try_from(state.stored.len()).unwrap_or(u64::MAX),
            verse_limit: self.verse_limit,
            remaining,
            exhausted: remaining == 0,
        }
    }

    /// True once no further verse fits.
    #[must_use]
    pub fn is_exhausted(&self) -> bool {
        self.usage().exhausted
    }

    fn lock_state(&self) -> MutexGuard<'_, BudgetState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Chapter source wrapper that enforces a [`StorageBudget`].
///
/// Chapters the inner source keeps persistently are admitted against the
/// budget; rejected chapters come back with `from_persistent_store = false`
/// and are tagged as transient by the coordinator.
pub struct StorageBudgetSource {
    inner: Arc<dyn ChapterSourcePort>,
    budget: Arc<StorageBudget>,
    logger: Option<Arc<dyn LoggerPort>>,
}

impl StorageBudgetSource {
    /// Wrap `inner` with `budget`.
    #[must_use]
    pub fn new(inner: Arc<dyn ChapterSourcePort>, budget: Arc<StorageBudget>) -> Self {
        Self {
            inner,
            budget,
            logger: None,
        }
    }

    /// Emit `storage.limit_reached` to `logger` when a chapter is refused.
    #[must_use]
    pub fn with_logger(mut self, logger: Arc<dyn LoggerPort>) -> Self {
        self.logger = Some(logger);
        self
    }

    /// Budget shared with the coordinator and search session.
    #[must_use]
    pub fn budget(&self) -> Arc<StorageBudget> {
        Arc::clone(&self.budget)
    }

    fn apply(&self, request: ChapterRequest, mut fetched: FetchedChapter) -> FetchedChapter {
        if !fetched.from_persistent_store {
            return fetched;
        }
        let verses = u64::try_from(fetched.verses.len()).unwrap_or(u64::MAX);
        if self.budget.admit(request, verses) == Admission::OverLimit {
            fetched.from_persistent_store = false;
            if let Some(logger) = self.logger.as_ref() {
                let usage = self.budget.usage();
                let mut fields = LogFields::new();
                fields.insert("book".into(), Value::from(request.book.name()));
                fields.insert("chapter".into(), Value::from(request.chapter));
                fields.insert("verses".into(), Value::from(verses));
                fields.insert("storedVerses".into(), Value::from(usage.stored_verses));
                fields.insert("verseLimit".into(), Value::from(usage.verse_limit));
                logger.warn(
                    "storage.limit_reached",
                    "Chapter served without storing; verse limit reached",
                    Some(fields),
                );
            }
        }
        fetched
    }
}

impl ChapterSourcePort for StorageBudgetSource {
    fn source(&self) -> &SourceInfo {
        self.inner.source()
    }

    fn fetch_chapter(
        &self,
        ctx: &RequestContext,
        request: ChapterRequest,
    ) -> BoxFuture<'_, Result<FetchedChapter>> {
        let pending = self.inner.fetch_chapter(ctx, request);
        Box::pin(async move {
            let fetched = pending.await?;
            Ok(self.apply(request, fetched))
        })
    }
}

impl std::fmt::Debug for StorageBudgetSource {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        formatter
            .debug_struct("StorageBudgetSource")
            .field("source", &self.inner.source().id)
            .field("budget", &self.budget)
            .finish_non_exhaustive()
    }
}
