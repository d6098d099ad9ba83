//! Local CLI orchestration helpers.
//!
//! Each command loads the effective config, builds its ports, and runs one
//! use case on a current-thread runtime. Ctrl-C cancels the request context.

use crate::observability::{logger_from_env, scope_logger};
use crate::source_factory::{ContentSources, build_content_sources_with_logger};
use crate::{InfraError, InfraResult};
use lectern_app::{
    ReadingSession, RetrievalCoordinator, RetrievalError, SearchSession, SearchSettings,
};
use lectern_config::{ValidatedLecternConfig, load_lectern_config_std_env};
use lectern_domain::{Address, ChapterContent, SearchResult, SupportedVersion};
use lectern_ports::LoggerPort;
use lectern_shared::{ErrorCode, ErrorEnvelope, RequestContext};
use serde::Serialize;
use std::future::Future;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

/// Input of the `read` command.
#[derive(Debug, Clone, Default)]
pub struct ReadRequest {
    /// Reference text; blank opens the configured default reference.
    pub reference: Box<str>,
    /// Version code; defaults to the configured version.
    pub version: Option<Box<str>>,
    /// Verses to cite, e.g. `16-18,20`.
    pub select: Option<Box<str>>,
}

/// Output of the `read` command.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReadOutput {
    /// Address that was opened.
    pub address: Address,
    /// Chapter content, tagged with where it came from.
    pub content: ChapterContent,
    /// Citation text for the selected verses.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub citation: Option<String>,
}

/// Input of the `search` command.
#[derive(Debug, Clone, Default)]
pub struct LocalSearchRequest {
    /// Query text.
    pub query: Box<str>,
    /// Version code; defaults to the configured version.
    pub version: Option<Box<str>>,
}

/// Open a chapter and optionally cite a verse selection.
///
/// Without `select`, a reference naming a verse cites that verse.
pub fn run_read_local(
    config_path: Option<&Path>,
    overrides_json: Option<&str>,
    request: &ReadRequest,
) -> InfraResult<ReadOutput> {
    let config = load_lectern_config_std_env(config_path, overrides_json)?;
    let version = resolve_version(&config, request.version.as_deref())?;
    let ranges = request
        .select
        .as_deref()
        .map(parse_verse_ranges)
        .transpose()?;

    let ctx = RequestContext::new_request();
    let logger = scope_logger(logger_from_env().as_ref(), &ctx);
    let coordinator = Arc::new(build_coordinator(&config, logger)?);
    let default_address = config.default_reference();
    let reference = request.reference.clone();

    run_async_with_ctx(ctx, move |ctx| async move {
        let mut session = ReadingSession::new(coordinator, default_address);
        let content = session
            .open_reference(&ctx, &reference, version)
            .await?
            .clone();
        let address = session.address().unwrap_or_else(|| content.address());

        let ranges = ranges.or_else(|| address.verse().map(|verse| vec![(verse, verse)]));
        let citation = match ranges {
            Some(ranges) => {
                for (start, end) in ranges {
                    if session.select_range(start, end) == Some(0) {
                        return Err(verse_out_of_range(start, end, &content));
                    }
                }
                Some(session.copy_selection())
            },
            None => None,
        };

        Ok::<_, ErrorEnvelope>(ReadOutput {
            address,
            content,
            citation,
        })
    })
}

fn verse_out_of_range(start: u32, end: u32, content: &ChapterContent) -> ErrorEnvelope {
    let last = content.verses().last().map_or(0, |verse| verse.number);
    ErrorEnvelope::expected(
        ErrorCode::new("reference", "verse_out_of_range"),
        format!(
            "verses {start}-{end} are outside {} (last verse {last})",
            content.address()
        ),
    )
    .with_metadata("select", format!("{start}-{end}"))
    .with_metadata("lastVerse", last.to_string())
}

/// Run one search through the configured search source.
pub fn run_search_local(
    config_path: Option<&Path>,
    overrides_json: Option<&str>,
    request: &LocalSearchRequest,
) -> InfraResult<Vec<SearchResult>> {
    let config = load_lectern_config_std_env(config_path, overrides_json)?;
    let version = request
        .version
        .as_deref()
        .map_or_else(|| config.default_version().code().to_owned(), str::to_owned);

    let ctx = RequestContext::new_request();
    let logger = scope_logger(logger_from_env().as_ref(), &ctx);
    let sources = build_content_sources_with_logger(&config, logger.clone())?;
    let coordinator = Arc::new(coordinator_over(&config, &sources, logger.clone()));
    let mut session = SearchSession::new(Arc::clone(&sources.search), search_settings(&config))
        .with_cached_content(coordinator)
        .with_storage_budget(Arc::clone(&sources.storage));
    if let Some(logger) = logger {
        session = session.with_logger(logger);
    }
    let query = request.query.clone();

    run_async_with_ctx(ctx, move |ctx| async move {
        session
            .search(&ctx, &query, &version)
            .await
            .map_err(ErrorEnvelope::from)
    })
}

/// Retrieval coordinator over the configured chapter source.
///
/// Its cache stats report the usage of the source's storage budget.
pub fn build_coordinator(
    config: &ValidatedLecternConfig,
    logger: Option<Arc<dyn LoggerPort>>,
) -> InfraResult<RetrievalCoordinator> {
    let sources = build_content_sources_with_logger(config, logger.clone())?;
    Ok(coordinator_over(config, &sources, logger))
}

fn coordinator_over(
    config: &ValidatedLecternConfig,
    sources: &ContentSources,
    logger: Option<Arc<dyn LoggerPort>>,
) -> RetrievalCoordinator {
    let coordinator = RetrievalCoordinator::new(Arc::clone(&sources.chapters))
        .with_fetch_timeout(config.retrieval.fetch_timeout_ms.map(Duration::from_millis))
        .with_storage_budget(Arc::clone(&sources.storage));
    match logger {
        Some(logger) => coordinator.with_logger(logger),
        None => coordinator,
    }
}

/// Search limits taken from the `search` config section.
#[must_use]
pub fn search_settings(config: &ValidatedLecternConfig) -> SearchSettings {
    let defaults = SearchSettings::default();
    SearchSettings {
        limit: config.search.limit,
        min_query_length: usize::try_from(config.search.min_query_length)
            .unwrap_or(defaults.min_query_length),
    }
}

/// Parse a verse selection such as `16`, `16-18` or `1-3,7`.
///
/// Ranges may run backwards; verse numbers must be positive.
pub fn parse_verse_ranges(input: &str) -> InfraResult<Vec<(u32, u32)>> {
    let ranges = input
        .split(',')
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .map(|part| {
            let (start, end) = part.split_once('-').unwrap_or((part, part));
            Some((parse_verse(start)?, parse_verse(end)?))
        })
        .collect::<Option<Vec<_>>>();

    match ranges {
        Some(ranges) if !ranges.is_empty() => Ok(ranges),
        _ => Err(ErrorEnvelope::expected(
            ErrorCode::invalid_input(),
            "verse selection must look like `16`, `16-18` or `1-3,7`",
        )
        .with_metadata("select", input.to_owned())),
    }
}

fn parse_verse(value: &str) -> Option<u32> {
    value.trim().parse::<u32>().ok().filter(|verse| *verse > 0)
}

fn resolve_version(
    config: &ValidatedLecternConfig,
    version: Option<&str>,
) -> InfraResult<SupportedVersion> {
    version.map_or(Ok(config.default_version()), |code| {
        SupportedVersion::parse(code)
            .map_err(|error| ErrorEnvelope::from(RetrievalError::from(error)))
    })
}

fn run_async_with_ctx<F, T>(
    ctx: RequestContext,
    op: impl FnOnce(RequestContext) -> F,
) -> InfraResult<T>
where
    F: Future<Output = Result<T, ErrorEnvelope>>,
{
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .map_err(InfraError::from)?;
    runtime.block_on(async {
        let watcher = ctx.clone();
        tokio::select! {
            outcome = op(ctx) => outcome,
            () = cancel_on_interrupt(&watcher) => Err(ErrorEnvelope::cancelled("interrupted")),
        }
    })
}

async fn cancel_on_interrupt(ctx: &RequestContext) {
    if tokio::signal::ctrl_c().await.is_ok() {
        tracing::debug!("interrupt received, cancelling request");
        ctx.cancel();
        return;
    }
    std::future::pending::<()>().await;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verse_ranges_accept_singles_ranges_and_lists() -> InfraResult<()> {
        assert_eq!(parse_verse_ranges("16")?, vec![(16, 16)]);
        assert_eq!(parse_verse_ranges("18-16")?, vec![(18, 16)]);
        assert_eq!(parse_verse_ranges(" 1-3, 7 ")?, vec![(1, 3), (7, 7)]);
        Ok(())
    }

    #[test]
    fn verse_ranges_reject_garbage() {
        for input in ["", "0", "a-3", "3-", ","] {
            let error = parse_verse_ranges(input).unwrap_err();
            assert_eq!(error.code, ErrorCode::invalid_input(), "input {input:?}");
        }
    }
}
