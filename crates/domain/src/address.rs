//! Addresses and verse keys.

use crate::catalog::Book;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Validation failures for address components.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum AddressError {
    /// Chapter numbers start at 1.
    #[error("chapter must be >= 1")]
    ZeroChapter,
    /// Verse numbers start at 1.
    #[error("verse must be >= 1")]
    ZeroVerse,
}

/// A validated `(book, chapter, optional verse)` location.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", try_from = "AddressParts")]
pub struct Address {
    book: Book,
    chapter: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    verse: Option<u32>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct AddressParts {
    book: Book,
    chapter: u32,
    verse: Option<u32>,
}

impl TryFrom<AddressParts> for Address {
    type Error = AddressError;

    fn try_from(parts: AddressParts) -> Result<Self, Self::Error> {
        Self::new(parts.book, parts.chapter, parts.verse)
    }
}

impl Address {
    /// Build an address; chapter and verse must be positive.
    pub const fn new(book: Book, chapter: u32, verse: Option<u32>) -> Result<Self, AddressError> {
        if chapter == 0 {
            return Err(AddressError::ZeroChapter);
        }
        if let Some(0) = verse {
            return Err(AddressError::ZeroVerse);
        }
        Ok(Self {
            book,
            chapter,
            verse,
        })
    }

    /// Address of a whole chapter.
    pub const fn chapter_of(book: Book, chapter: u32) -> Result<Self, AddressError> {
        Self::new(book, chapter, None)
    }

    /// Chapter address from parts already validated elsewhere.
    pub(crate) const fn chapter_unchecked(book: Book, chapter: u32) -> Self {
        Self {
            book,
            chapter,
            verse: None,
        }
    }

    /// Canonical book.
    #[must_use]
    pub const fn book(&self) -> Book {
        self.book
    }

    /// Chapter number (>= 1).
    #[must_use]
    pub const fn chapter(&self) -> u32 {
        self.chapter
    }

    /// Verse number (>= 1) when the address points at a single verse.
    #[must_use]
    pub const fn verse(&self) -> Option<u32> {
        self.verse
    }

    /// The same chapter without a verse.
    #[must_use]
    pub const fn without_verse(&self) -> Self {
        Self {
            verse: None,
            ..*self
        }
    }

    /// True when `other` names the same book and chapter.
    #[must_use]
    pub fn same_chapter(&self, other: &Self) -> bool {
        self.book == other.book && self.chapter == other.chapter
    }
}

impl fmt::Display for Address {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(formatter, "{} {}", self.book, self.chapter)?;
        if let Some(verse) = self.verse {
            write!(formatter, ":{verse}")?;
        }
        Ok(())
    }
}

/// Identifier of one verse, textual form `John.3.16`.
///
/// Ordering is canonical: book, then chapter, then verse number.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct VerseKey {
    book: Book,
    chapter: u32,
    verse: u32,
}

impl VerseKey {
    /// Build a key from its parts.
    #[must_use]
    pub const fn new(book: Book, chapter: u32, verse: u32) -> Self {
        Self {
            book,
            chapter,
            verse,
        }
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

    /// Verse number.
    #[must_use]
    pub const fn verse(&self) -> u32 {
        self.verse
    }

    /// True when this key belongs to `book`/`chapter`.
    #[must_use]
    pub fn is_in(&self, book: Book, chapter: u32) -> bool {
        self.book == book && self.chapter == chapter
    }
}

impl fmt::Display for VerseKey {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(formatter, "{}.{}.{}", self.book, self.chapter, self.verse)
    }
}
