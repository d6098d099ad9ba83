//! HTTP scripture content adapter.
//!
//! Talks to a JSON content API:
//! - `GET {base}/chapters/{bookCode}/{chapter}?version=V`
//! - `GET {base}/search?q=Q&version=V&limit=N`
//!
//! The optional API key travels as the `key` query parameter and never
//! appears in error messages. Requests are spaced at least
//! `min_request_interval` apart.

use lectern_config::SourceConfig;
use lectern_domain::{SearchResult, Verse};
use lectern_ports::{
    BoxFuture, ChapterRequest, ChapterSourcePort, FetchedChapter, SearchRequest, SearchSourcePort,
    SourceInfo,
};
use lectern_shared::{ErrorClass, ErrorCode, ErrorEnvelope, RequestContext, Result, SecretString};
use reqwest::{StatusCode, Url};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use std::sync::{Mutex, PoisonError};
use std::time::Duration;
use tokio::time::Instant;

const CHAPTERS_PATH: &str = "chapters";
const SEARCH_PATH: &str = "search";

/// Default gap between two requests to the content API.
pub const DEFAULT_MIN_REQUEST_INTERVAL: Duration = Duration::from_millis(100);

/// HTTP source configuration.
#[derive(Debug, Clone)]
pub struct HttpScriptureSourceConfig {
    /// API base URL, without trailing slash.
    pub base_url: Box<str>,
    /// Optional API key.
    pub api_key: Option<SecretString>,
    /// Request timeout in milliseconds.
    pub timeout_ms: u64,
    /// Shortest gap between two requests; zero disables pacing.
    pub min_request_interval: Duration,
}

impl HttpScriptureSourceConfig {
    /// Build from the validated source config.
    pub fn from_source_config(config: &SourceConfig) -> Result<Self> {
        let base_url = config.base_url.clone().ok_or_else(|| {
            ErrorEnvelope::expected(
                ErrorCode::new("config", "missing_value"),
                "source.baseUrl is required for the http source",
            )
        })?;
        Ok(Self {
            base_url,
            api_key: config.api_key.clone(),
            timeout_ms: config.timeout_ms,
            min_request_interval: Duration::from_millis(config.min_request_interval_ms),
        })
    }
}

/// Chapter and search source backed by a content API.
pub struct HttpScriptureSource {
    info: SourceInfo,
    client: reqwest::Client,
    base_url: Url,
    api_key: Option<SecretString>,
    pacer: RequestPacer,
}

/// Hands out request start times at least `interval` apart.
///
/// Each caller reserves the next free slot under the lock and sleeps outside
/// it, so concurrent callers queue up in arrival order.
#[derive(Debug)]
struct RequestPacer {
    interval: Duration,
    next_slot: Mutex<Option<Instant>>,
}

impl RequestPacer {
    const fn new(interval: Duration) -> Self {
        Self {
            interval,
            next_slot: Mutex::new(None),
        }
    }

    fn reserve(&self) -> Instant {
        let now = Instant::now();
        let mut next_slot = self.next_slot.lock().unwrap_or_else(PoisonError::into_inner);
        let slot = next_slot.map_or(now, |next| next.max(now));
        *next_slot = Some(slot + self.interval);
        slot
    }

    async fn wait(&self, ctx: &RequestContext, operation: &'static str) -> Result<()> {
        if self.interval.is_zero() {
            return Ok(());
        }
        let slot = self.reserve();
        tokio::select! {
            () = ctx.cancelled() => Err(cancelled_error(operation)),
            () = tokio::time::sleep_until(slot) => Ok(()),
        }
    }
}

impl HttpScriptureSource {
    /// Create a new HTTP source.
    pub fn new(config: &HttpScriptureSourceConfig) -> Result<Self> {
        let trimmed = config.base_url.trim().trim_end_matches('/');
        if trimmed.is_empty() {
            return Err(ErrorEnvelope::expected(
                ErrorCode::invalid_input(),
                "base url must be non-empty",
            ));
        }
        if config.timeout_ms == 0 {
            return Err(ErrorEnvelope::expected(
                ErrorCode::invalid_input(),
                "timeout must be greater than zero",
            ));
        }
        // Trailing slash so relative joins keep any base path.
        let base_url = Url::parse(&format!("{trimmed}/")).map_err(|error| {
            ErrorEnvelope::expected(
                ErrorCode::invalid_input(),
                format!("invalid base url: {error}"),
            )
        })?;

        let client = reqwest::Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .build()
            .map_err(|error| {
                ErrorEnvelope::unexpected(
                    ErrorCode::new("source", "http_client_init_failed"),
                    format!("failed to build HTTP client: {}", error.without_url()),
                    ErrorClass::NonRetriable,
                )
            })?;

        Ok(Self {
            info: SourceInfo::new("http", "Content API"),
            client,
            base_url,
            api_key: config.api_key.clone(),
            pacer: RequestPacer::new(config.min_request_interval),
        })
    }

    fn endpoint(&self, segments: &[&str], query: &[(&str, &str)]) -> Result<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|()| {
                ErrorEnvelope::expected(
                    ErrorCode::invalid_input(),
                    "base url cannot carry a path",
                )
            })?
            .pop_if_empty()
            .extend(segments);
        {
            let mut pairs = url.query_pairs_mut();
            for (key, value) in query {
                pairs.append_pair(key, value);
            }
            if let Some(key) = self.api_key.as_ref() {
                pairs.append_pair("key", key.expose());
            }
        }
        Ok(url)
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        ctx: &RequestContext,
        url: Url,
        operation: &'static str,
    ) -> Result<T> {
        ctx.ensure_not_cancelled(operation)?;
        self.pacer.wait(ctx, operation).await?;

        let response = tokio::select! {
            () = ctx.cancelled() => return Err(cancelled_error(operation)),
            result = self.client.get(url).send() => {
                result.map_err(map_reqwest_error)?
            }
        };

        let status = response.status();
        let payload = tokio::select! {
            () = ctx.cancelled() => return Err(cancelled_error(operation)),
            result = response.bytes() => result.map_err(map_reqwest_error)?,
        };

        if !status.is_success() {
            return Err(map_http_error(status, &payload).with_metadata("operation", operation));
        }

        serde_json::from_slice(&payload).map_err(|error| {
            ErrorEnvelope::unexpected(
                ErrorCode::new("source", "invalid_response"),
                format!("failed to decode content API response: {error}"),
                ErrorClass::NonRetriable,
            )
            .with_metadata("operation", operation)
        })
    }
}

impl std::fmt::Debug for HttpScriptureSource {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        formatter
            .debug_struct("HttpScriptureSource")
            .field("base_url", &self.base_url.as_str())
            .field("api_key", &self.api_key)
            .field("min_request_interval", &self.pacer.interval)
            .finish_non_exhaustive()
    }
}

impl ChapterSourcePort for HttpScriptureSource {
    fn source(&self) -> &SourceInfo {
        &self.info
    }

    fn fetch_chapter(
        &self,
        ctx: &RequestContext,
        request: ChapterRequest,
    ) -> BoxFuture<'_, Result<FetchedChapter>> {
        let ctx = ctx.clone();
        Box::pin(async move {
            let chapter = request.chapter.to_string();
            let url = self.endpoint(
                &[CHAPTERS_PATH, request.book.code, &chapter],
                &[("version", request.version.code())],
            )?;
            let body: ChapterResponse = self
                .get_json(&ctx, url, "http_source.fetch_chapter")
                .await
                .map_err(|error| {
                    error
                        .with_metadata("book", request.book.name())
                        .with_metadata("chapter", chapter.clone())
                        .with_metadata("version", request.version.code())
                })?;
            Ok(body.into_fetched())
        })
    }
}

impl SearchSourcePort for HttpScriptureSource {
    fn search_text(
        &self,
        ctx: &RequestContext,
        request: SearchRequest,
    ) -> BoxFuture<'_, Result<Vec<SearchResult>>> {
        let ctx = ctx.clone();
        Box::pin(async move {
            let limit = request.limit.to_string();
            let url = self.endpoint(
                &[SEARCH_PATH],
                &[
                    ("q", request.query.as_ref()),
                    ("version", request.version.code()),
                    ("limit", &limit),
                ],
            )?;
            let body: SearchResponse = self.get_json(&ctx, url, "http_source.search").await?;
            let limit = usize::try_from(request.limit).unwrap_or(usize::MAX);
            Ok(body
                .results
                .into_iter()
                .take(limit)
                .map(|mut result| {
                    result.from_cache = false;
                    result
                })
                .collect())
        })
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ChapterResponse {
    verses: Vec<VerseBody>,
    #[serde(default)]
    subtitle: Option<Box<str>>,
    #[serde(default)]
    from_persistent_store: bool,
}

#[derive(Debug, Deserialize)]
struct VerseBody {
    number: u32,
    text: Box<str>,
}

impl ChapterResponse {
    fn into_fetched(self) -> FetchedChapter {
        FetchedChapter {
            verses: self
                .verses
                .into_iter()
                .map(|verse| Verse::new(verse.number, verse.text))
                .collect(),
            subtitle: self.subtitle.filter(|subtitle| !subtitle.trim().is_empty()),
            from_persistent_store: self.from_persistent_store,
        }
    }
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    results: Vec<SearchResult>,
}

#[derive(Debug, Deserialize)]
struct ErrorResponse {
    error: Option<String>,
    message: Option<String>,
}

fn cancelled_error(operation: &'static str) -> ErrorEnvelope {
    ErrorEnvelope::cancelled("operation cancelled").with_metadata("operation", operation)
}

fn map_reqwest_error(error: reqwest::Error) -> ErrorEnvelope {
    // The request URL carries the API key.
    let error = error.without_url();
    if error.is_timeout() {
        return ErrorEnvelope::unexpected(
            ErrorCode::timeout(),
            "content API request timed out",
            ErrorClass::Retriable,
        );
    }
    if error.is_connect() {
        return ErrorEnvelope::unexpected(
            ErrorCode::io(),
            format!("content API connection failed: {error}"),
            ErrorClass::Retriable,
        );
    }
    ErrorEnvelope::unexpected(
        ErrorCode::new("source", "request_failed"),
        format!("content API request failed: {error}"),
        ErrorClass::NonRetriable,
    )
}

fn map_http_error(status: StatusCode, payload: &[u8]) -> ErrorEnvelope {
    let message = serde_json::from_slice::<ErrorResponse>(payload)
        .ok()
        .and_then(|response| response.error.or(response.message))
        .unwrap_or_else(|| format!("content API returned {status}"));

    let envelope = match status.as_u16() {
        404 => ErrorEnvelope::expected(ErrorCode::not_found(), message),
        429 => ErrorEnvelope::unexpected(
            ErrorCode::new("source", "rate_limited"),
            message,
            ErrorClass::Retriable,
        ),
        408 => {
            ErrorEnvelope::unexpected(ErrorCode::timeout(), message, ErrorClass::Retriable)
        },
        _ if status.is_server_error() => ErrorEnvelope::unexpected(
            ErrorCode::new("source", "unavailable"),
            message,
            ErrorClass::Retriable,
        ),
        _ => ErrorEnvelope::unexpected(
            ErrorCode::new("source", "http_error"),
            message,
            ErrorClass::NonRetriable,
        ),
    };

    envelope.with_metadata("status", status.as_u16().to_string())
}
