//! Text search boundary contract.

use crate::BoxFuture;
use lectern_domain::{SearchResult, SupportedVersion};
use lectern_shared::{RequestContext, Result};

/// Owned search request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchRequest {
    /// Trimmed, non-empty query text.
    pub query: Box<str>,
    /// Translation to search.
    pub version: SupportedVersion,
    /// Maximum number of results.
    pub limit: u32,
}

/// Boundary contract for verse search. Results keep the source's order.
pub trait SearchSourcePort: Send + Sync {
    /// Search verse text.
    fn search_text(
        &self,
        ctx: &RequestContext,
        request: SearchRequest,
    ) -> BoxFuture<'_, Result<Vec<SearchResult>>>;
}
