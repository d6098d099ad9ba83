//! Chapter content boundary contract.

use crate::BoxFuture;
use lectern_domain::{Address, Book, SupportedVersion, Verse};
use lectern_shared::{RequestContext, Result};

/// Source descriptor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceInfo {
    /// Stable source identifier (`http`, `file`, ...).
    pub id: Box<str>,
    /// Human-readable source name.
    pub name: Box<str>,
}

impl SourceInfo {
    /// Build a descriptor.
    pub fn new(id: impl Into<Box<str>>, name: impl Into<Box<str>>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
        }
    }
}

/// Owned request for one chapter in one version.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ChapterRequest {
    /// Canonical book.
    pub book: Book,
    /// Chapter number (>= 1).
    pub chapter: u32,
    /// Translation.
    pub version: SupportedVersion,
}

impl ChapterRequest {
    /// Request for the chapter `address` points into.
    #[must_use]
    pub const fn new(address: &Address, version: SupportedVersion) -> Self {
        Self {
            book: address.book(),
            chapter: address.chapter(),
            version,
        }
    }
}

/// Verses returned by a source for one chapter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchedChapter {
    /// Verses, in any order.
    pub verses: Vec<Verse>,
    /// Optional chapter heading.
    pub subtitle: Option<Box<str>>,
    /// True when the source keeps the chapter in a persistent store.
    pub from_persistent_store: bool,
}

/// Boundary contract for chapter retrieval.
///
/// Failures carry the source's retry class (`ErrorClass::Retriable` for
/// timeouts, throttling and server errors).
pub trait ChapterSourcePort: Send + Sync {
    /// Source info for this implementation.
    fn source(&self) -> &SourceInfo;

    /// Fetch one chapter.
    fn fetch_chapter(
        &self,
        ctx: &RequestContext,
        request: ChapterRequest,
    ) -> BoxFuture<'_, Result<FetchedChapter>>;
}
