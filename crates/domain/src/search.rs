//! Search result values.

use crate::chapter::{ChapterContent, Verse};
use serde::{Deserialize, Serialize};

/// One matching verse as reported by a search source.
///
/// Ordering of a result list is whatever the source returned.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchResult {
    /// Display reference, e.g. `John 3:16`.
    pub reference: Box<str>,
    /// Book name as reported by the source.
    pub book: Box<str>,
    /// Chapter number.
    pub chapter: u32,
    /// Verse number.
    pub verse: u32,
    /// Verse text.
    pub text: Box<str>,
    /// Version code.
    pub version: Box<str>,
    /// True when the match came from already cached content.
    #[serde(default)]
    pub from_cache: bool,
}

impl SearchResult {
    /// Result for a verse of cached chapter content.
    #[must_use]
    pub fn from_cached_verse(content: &ChapterContent, verse: &Verse) -> Self {
        Self {
            reference: format!("{} {}:{}", content.book(), content.chapter(), verse.number).into(),
            book: content.book().name().into(),
            chapter: content.chapter(),
            verse: verse.number,
            text: verse.text.clone(),
            version: content.version().code().into(),
            from_cache: true,
        }
    }
}

/// Case-insensitive substring match; `lowered_query` is already lowercase.
#[must_use]
pub fn matches_query(text: &str, lowered_query: &str) -> bool {
    text.to_lowercase().contains(lowered_query)
}
