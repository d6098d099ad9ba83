//! Reading session: the open chapter and the verse selection scoped to it.
//!
//! Selections never outlive the chapter they were made in. Opening a
//! different chapter or version clears the selection; re-opening the same
//! chapter keeps it.

use crate::retrieval::{RetrievalCoordinator, RetrievalError};
use lectern_domain::{
    Address, ChapterContent, ParseError, SelectionSet, SupportedVersion, VerseKey, parse,
};
use lectern_shared::{ErrorEnvelope, RequestContext};
use std::sync::Arc;

/// Resolve navigation input to an address.
///
/// Blank input navigates to `default`; anything else must parse as a
/// reference.
pub fn navigate_to_reference(input: &str, default: Address) -> Result<Address, ParseError> {
    if input.trim().is_empty() {
        return Ok(default);
    }
    parse(input)
}

/// Currently open chapter plus its selection.
#[derive(Debug)]
pub struct ReadingSession {
    coordinator: Arc<RetrievalCoordinator>,
    default_address: Address,
    open: Option<OpenChapter>,
    selection: SelectionSet,
}

#[derive(Debug)]
struct OpenChapter {
    address: Address,
    content: ChapterContent,
}

impl ReadingSession {
    /// Session with nothing open yet.
    #[must_use]
    pub fn new(coordinator: Arc<RetrievalCoordinator>, default_address: Address) -> Self {
        Self {
            coordinator,
            default_address,
            open: None,
            selection: SelectionSet::new(),
        }
    }

    /// Open the chapter `address` points into.
    ///
    /// On failure the previously open chapter and its selection are kept.
    pub async fn open(
        &mut self,
        ctx: &RequestContext,
        address: &Address,
        version: SupportedVersion,
    ) -> Result<&ChapterContent, RetrievalError> {
        let content = self.coordinator.get_chapter_in(ctx, address, version).await?;

        let same_view = self.open.as_ref().is_some_and(|open| {
            open.content.book() == content.book()
                && open.content.chapter() == content.chapter()
                && open.content.version() == content.version()
        });
        if !same_view {
            self.selection.clear();
        }

        let open = self.open.insert(OpenChapter {
            address: *address,
            content,
        });
        Ok(&open.content)
    }

    /// Parse `input` (blank means the default reference) and open it.
    pub async fn open_reference(
        &mut self,
        ctx: &RequestContext,
        input: &str,
        version: SupportedVersion,
    ) -> Result<&ChapterContent, ErrorEnvelope> {
        let address = navigate_to_reference(input, self.default_address)?;
        self.open(ctx, &address, version).await.map_err(Into::into)
    }

    /// Open chapter content, if any.
    #[must_use]
    pub fn content(&self) -> Option<&ChapterContent> {
        self.open.as_ref().map(|open| &open.content)
    }

    /// Address last opened, including its verse if one was given.
    #[must_use]
    pub fn address(&self) -> Option<Address> {
        self.open.as_ref().map(|open| open.address)
    }

    /// Current selection.
    #[must_use]
    pub const fn selection(&self) -> &SelectionSet {
        &self.selection
    }

    /// Toggle `verse` of the open chapter.
    ///
    /// Returns `None` when nothing is open, otherwise whether the verse is
    /// selected afterwards.
    pub fn toggle_verse(&mut self, verse: u32) -> Option<bool> {
        let content = self.content()?;
        let key = VerseKey::new(content.book(), content.chapter(), verse);
        Some(self.selection.toggle(key))
    }

    /// Add the verses of the open chapter numbered within `start..=end`
    /// (either order).
    ///
    /// Numbers past the chapter's last verse are ignored. Returns `None` when nothing is open, otherwise
    /// how many of the chapter's verses the range covers.
    pub fn select_range(&mut self, start: u32, end: u32) -> Option<usize> {
        let content = self.open.as_ref().map(|open| &open.content)?;
        Some(self.selection.select_range(content, start, end))
    }

    /// Drop every selected verse.
    pub fn clear_selection(&mut self) {
        self.selection.clear();
    }

    /// Citation text for the selection; empty when nothing renders.
    #[must_use]
    pub fn copy_selection(&self) -> String {
        self.content()
            .map(|content| self.selection.serialize(content))
            .unwrap_or_default()
    }
}
