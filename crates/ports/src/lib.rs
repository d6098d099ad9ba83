//! # lectern-ports
//!
//! Port traits for the lectern hexagonal architecture.
//!
//! This crate defines the interfaces between the domain and infrastructure
//! layers. It depends only on `domain` and `shared`.

use std::future::Future;
use std::pin::Pin;

/// Boxed future used by port traits.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Returns the ports crate version.
#[must_use]
pub const fn ports_crate_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

pub mod chapter_source;
pub mod logger;
pub mod search_source;

pub use chapter_source::*;
pub use logger::*;
pub use search_source::*;

// Re-export selected domain types used in port signatures, so adapter crates
// can implement ports without directly depending on `lectern-domain`.
pub use lectern_domain::{Book, SearchResult, SupportedVersion, Verse};
