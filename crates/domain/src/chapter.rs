//! Chapter content as returned by retrieval.

use crate::address::{Address, VerseKey};
use crate::catalog::Book;
use crate::version::SupportedVersion;
use serde::{Deserialize, Serialize};

/// One numbered verse.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Verse {
    /// Verse number within the chapter.
    pub number: u32,
    /// Verse text.
    pub text: Box<str>,
}

impl Verse {
    /// Build a verse.
    pub fn new(number: u32, text: impl Into<Box<str>>) -> Self {
        Self {
            number,
            text: text.into(),
        }
    }
}

/// Where a chapter came from on this call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SourceTag {
    /// Served from the session cache without touching the source.
    CacheHit,
    /// Fetched; the source reported it is kept in a persistent store.
    FetchedAndStored,
    /// Fetched; the source reported an ephemeral result.
    FetchedTransient,
}

impl SourceTag {
    /// Tag for a fresh fetch.
    #[must_use]
    pub const fn fetched(from_persistent_store: bool) -> Self {
        if from_persistent_store {
            Self::FetchedAndStored
        } else {
            Self::FetchedTransient
        }
    }

    /// True for [`SourceTag::CacheHit`].
    #[must_use]
    pub const fn is_cache_hit(self) -> bool {
        matches!(self, Self::CacheHit)
    }
}

/// Immutable verses of one chapter in one version.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChapterContent {
    book: Book,
    chapter: u32,
    version: SupportedVersion,
    #[serde(skip_serializing_if = "Option::is_none")]
    subtitle: Option<Box<str>>,
    verses: Vec<Verse>,
    source_tag: SourceTag,
}

impl ChapterContent {
    /// Build chapter content; verses are ordered by number.
    #[must_use]
    pub fn new(
        address: &Address,
        version: SupportedVersion,
        subtitle: Option<Box<str>>,
        mut verses: Vec<Verse>,
        source_tag: SourceTag,
    ) -> Self {
        verses.sort_by_key(|verse| verse.number);
        Self {
            book: address.book(),
            chapter: address.chapter(),
            version,
            subtitle,
            verses,
            source_tag,
        }
    }

    /// Same content, different source tag.
    #[must_use]
    pub fn with_source_tag(self, source_tag: SourceTag) -> Self {
        Self { source_tag, ..self }
    }

    /// Canonical book.
    #[must_use]
    pub const fn book(&self) -> Book {
        self.book
    }

    /// Chapter number.
    #[must_use]
    pub const fn chapter(&self) -> u32 {
        self.chapter
    }

    /// Translation.
    #[must_use]
    pub const fn version(&self) -> SupportedVersion {
        self.version
    }

    /// Optional heading supplied by the source.
    #[must_use]
    pub fn subtitle(&self) -> Option<&str> {
        self.subtitle.as_deref()
    }

    /// Verses in ascending number order.
    #[must_use]
    pub fn verses(&self) -> &[Verse] {
        &self.verses
    }

    /// How this value was obtained.
    #[must_use]
    pub const fn source_tag(&self) -> SourceTag {
        self.source_tag
    }

    /// Chapter address (no verse).
    #[must_use]
    pub const fn address(&self) -> Address {
        Address::chapter_unchecked(self.book, self.chapter)
    }

    /// Look up a verse by number.
    #[must_use]
    pub fn verse(&self, number: u32) -> Option<&Verse> {
        self.verses
            .binary_search_by_key(&number, |verse| verse.number)
            .ok()
            .and_then(|index| self.verses.get(index))
    }

    /// Key of a verse in this chapter.
    #[must_use]
    pub const fn key(&self, number: u32) -> VerseKey {
        VerseKey::new(self.book, self.chapter, number)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::resolve_book;

    fn john_3() -> Address {
        let john = resolve_book("John").expect("John");
        Address::chapter_of(john, 3).expect("address")
    }

    #[test]
    fn verses_are_sorted_on_construction() {
        let content = ChapterContent::new(
            &john_3(),
            SupportedVersion::Kjv,
            None,
            vec![Verse::new(2, "b"), Verse::new(1, "a"), Verse::new(3, "c")],
            SourceTag::FetchedTransient,
        );
        let numbers: Vec<u32> = content.verses().iter().map(|verse| verse.number).collect();
        assert_eq!(numbers, [1, 2, 3]);
        assert_eq!(content.verse(2).map(|verse| verse.text.as_ref()), Some("b"));
        assert!(content.verse(9).is_none());
    }

    #[test]
    fn retagging_keeps_verses() {
        let content = ChapterContent::new(
            &john_3(),
            SupportedVersion::Nlt,
            Some("Jesus and Nicodemus".into()),
            vec![Verse::new(1, "a")],
            SourceTag::FetchedAndStored,
        );
        let hit = content.clone().with_source_tag(SourceTag::CacheHit);
        assert_eq!(hit.verses(), content.verses());
        assert!(hit.source_tag().is_cache_hit());
        assert_eq!(hit.address().to_string(), "John 3");
    }

    #[test]
    fn serializes_with_kebab_case_tag() -> Result<(), serde_json::Error> {
        let content = ChapterContent::new(
            &john_3(),
            SupportedVersion::Nlt,
            None,
            vec![Verse::new(16, "For God so loved the world")],
            SourceTag::CacheHit,
        );
        let value = serde_json::to_value(&content)?;
        assert_eq!(value["book"], "John");
        assert_eq!(value["version"], "NLT");
        assert_eq!(value["sourceTag"], "cache-hit");
        assert_eq!(value["verses"][0]["number"], 16);
        Ok(())
    }
}
