//! Content source selection.
//!
//! One adapter instance backs both chapter retrieval and search, so the
//! file source parses each bible file once per process. Chapter retrieval
//! goes through the storage budget configured in `storage.verseLimit`.

use crate::InfraResult;
use lectern_adapters::{FileScriptureSource, HttpScriptureSource, HttpScriptureSourceConfig};
use lectern_app::{StorageBudget, StorageBudgetSource};
use lectern_config::{SourceKind, ValidatedLecternConfig};
use lectern_ports::{ChapterSourcePort, LoggerPort, SearchSourcePort};
use std::sync::Arc;

/// Chapter and search ports built from one config.
#[derive(Clone)]
pub struct ContentSources {
    /// Chapter content source used by the retrieval coordinator.
    pub chapters: Arc<dyn ChapterSourcePort>,
    /// Search source used by the search session.
    pub search: Arc<dyn SearchSourcePort>,
    /// Budget enforced on `chapters`.
    pub storage: Arc<StorageBudget>,
}

impl std::fmt::Debug for ContentSources {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        formatter
            .debug_struct("ContentSources")
            .field("chapters", &self.chapters.source().id.as_ref())
            .field("storage", &self.storage.usage())
            .finish_non_exhaustive()
    }
}

/// Build the content sources selected by `source.kind`.
pub fn build_content_sources(config: &ValidatedLecternConfig) -> InfraResult<ContentSources> {
    build_content_sources_with_logger(config, None)
}

/// Same as [`build_content_sources`]; storage refusals are logged to `logger`.
#[tracing::instrument(level = "debug", skip_all, fields(kind = %config.source.kind))]
pub fn build_content_sources_with_logger(
    config: &ValidatedLecternConfig,
    logger: Option<Arc<dyn LoggerPort>>,
) -> InfraResult<ContentSources> {
    let (chapters, search): (Arc<dyn ChapterSourcePort>, Arc<dyn SearchSourcePort>) =
        match config.source.kind {
            SourceKind::File => {
                let source = Arc::new(FileScriptureSource::from_source_config(&config.source));
                tracing::debug!(path = %config.source.data_dir, "using bible file source");
                (Arc::clone(&source) as Arc<dyn ChapterSourcePort>, source)
            },
            SourceKind::Http => {
                let http_config = HttpScriptureSourceConfig::from_source_config(&config.source)?;
                let source = Arc::new(HttpScriptureSource::new(&http_config)?);
                tracing::debug!(
                    base_url = %http_config.base_url,
                    min_interval_ms = http_config.min_request_interval.as_millis(),
                    "using http content source"
                );
                (Arc::clone(&source) as Arc<dyn ChapterSourcePort>, source)
            },
        };

    let storage = Arc::new(StorageBudget::new(u64::from(config.storage.verse_limit)));
    tracing::debug!(verse_limit = config.storage.verse_limit, "storage budget attached");
    let budgeted = StorageBudgetSource::new(chapters, Arc::clone(&storage));
    let budgeted = match logger {
        Some(logger) => budgeted.with_logger(logger),
        None => budgeted,
    };
    Ok(ContentSources {
        chapters: Arc::new(budgeted),
        search,
        storage,
    })
}
