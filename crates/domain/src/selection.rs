//! Verse selection and citation serialization.
//!
//! A [`SelectionSet`] is scoped to one open chapter. Callers must only add
//! keys of the chapter currently displayed and clear the set when a
//! different chapter (or version) is opened; the reading session in the app
//! crate enforces this.

use crate::address::VerseKey;
use crate::chapter::{ChapterContent, Verse};
use serde::Serialize;
use std::collections::BTreeSet;
use std::fmt::Write as _;

/// Set of selected verses, ordered canonically.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SelectionSet {
    keys: BTreeSet<VerseKey>,
}

impl SelectionSet {
    /// Empty selection.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add `key` if absent, remove it if present.
    ///
    /// Returns `true` when the key is selected afterwards.
    pub fn toggle(&mut self, key: VerseKey) -> bool {
        if self.keys.remove(&key) {
            false
        } else {
            self.keys.insert(key);
            true
        }
    }

    /// Add every verse of `content` numbered within
    /// `[min(start, end), max(start, end)]`.
    ///
    /// Existing selections are kept. Only verses `content` actually holds are
    /// added, so an open-ended range such as `1..=u32::MAX` costs one pass
    /// over the chapter. Returns how many of the chapter's verses the range
    /// covers.
    pub fn select_range(&mut self, content: &ChapterContent, start: u32, end: u32) -> usize {
        let (low, high) = (start.min(end), start.max(end));
        let (book, chapter) = (content.book(), content.chapter());
        let mut covered = 0;
        for verse in content.verses() {
            if (low..=high).contains(&verse.number) {
                covered += 1;
                self.keys.insert(VerseKey::new(book, chapter, verse.number));
            }
        }
        covered
    }

    /// Remove every key.
    pub fn clear(&mut self) {
        self.keys.clear();
    }

    /// True when `key` is selected.
    #[must_use]
    pub fn contains(&self, key: &VerseKey) -> bool {
        self.keys.contains(key)
    }

    /// Number of selected verses.
    #[must_use]
    pub fn len(&self) -> usize {
        self.keys.len()
    }

    /// True when nothing is selected.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// Selected keys in canonical order.
    pub fn keys(&self) -> impl Iterator<Item = &VerseKey> {
        self.keys.iter()
    }

    /// Selected verse numbers, ascending, across every chapter in the set.
    #[must_use]
    pub fn verse_numbers(&self) -> Vec<u32> {
        let mut numbers: Vec<u32> = self.keys.iter().map(VerseKey::verse).collect();
        numbers.sort_unstable();
        numbers.dedup();
        numbers
    }

    /// Render the selection as a citation block against `content`.
    ///
    /// ```text
    /// John 3:16,17 (NLT)
    ///
    /// 16. For God so loved the world...
    /// 17. God sent his Son...
    /// ```
    ///
    /// Keys that do not name a verse of `content` are left out of both the
    /// header and the body. Returns an empty string when nothing renders.
    #[must_use]
    pub fn serialize(&self, content: &ChapterContent) -> String {
        let verses: Vec<&Verse> = self
            .keys
            .iter()
            .filter(|key| key.is_in(content.book(), content.chapter()))
            .filter_map(|key| content.verse(key.verse()))
            .collect();
        if verses.is_empty() {
            return String::new();
        }

        let numbers = verses
            .iter()
            .map(|verse| verse.number.to_string())
            .collect::<Vec<_>>()
            .join(",");
        let mut out = format!(
            "{} {}:{numbers} ({})\n",
            content.book(),
            content.chapter(),
            content.version()
        );
        for verse in verses {
            let _ = write!(out, "\n{}. {}", verse.number, verse.text);
        }
        out
    }
}

impl Extend<VerseKey> for SelectionSet {
    fn extend<T: IntoIterator<Item = VerseKey>>(&mut self, iter: T) {
        self.keys.extend(iter);
    }
}

impl FromIterator<VerseKey> for SelectionSet {
    fn from_iter<T: IntoIterator<Item = VerseKey>>(iter: T) -> Self {
        Self {
            keys: iter.into_iter().collect(),
        }
    }
}
