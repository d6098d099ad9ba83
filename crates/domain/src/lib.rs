//! # lectern-domain
//!
//! Scripture addressing and verse selection.
//!
//! - **Catalog** - the 66 canonical books, chapter counts, testaments, categories
//! - **Reference** - `parse("John 3:16")` into an [`Address`]
//! - **Version** - the supported translations
//! - **Chapter** - immutable [`ChapterContent`] and its [`SourceTag`]
//! - **Selection** - [`SelectionSet`] and citation serialization
//! - **Search** - [`SearchResult`] values
//!
//! ## Dependency Rules
//!
//! - Depends only on `shared` crate
//! - No infrastructure or adapter dependencies
//! - Pure domain logic with no I/O

#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]

// Re-export shared types for convenience
pub use lectern_shared::shared_crate_version;

// =============================================================================
// DOMAIN MODULES
// =============================================================================

pub mod address;
pub mod catalog;
pub mod chapter;
pub mod reference;
pub mod search;
pub mod selection;
pub mod version;

pub use address::{Address, AddressError, VerseKey};
pub use catalog::{
    Book, CanonicalBook, Category, CategoryGroup, Testament, all_books, book_by_number, books,
    books_in_category, chapter_count, navigation_groups, resolve_book, testament_of,
    total_chapters,
};
pub use chapter::{ChapterContent, SourceTag, Verse};
pub use reference::{MalformedReason, ParseError, parse};
pub use search::{SearchResult, matches_query};
pub use selection::SelectionSet;
pub use version::{SupportedVersion, UnsupportedVersion};

/// Returns the domain crate version.
#[must_use]
pub const fn domain_crate_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
