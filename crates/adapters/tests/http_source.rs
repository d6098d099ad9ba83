//! HTTP adapter integration tests (feature-gated).

#[cfg(feature = "http")]
mod http {
    use lectern_adapters::{
        DEFAULT_MIN_REQUEST_INTERVAL, HttpScriptureSource, HttpScriptureSourceConfig,
    };
    use lectern_domain::{SupportedVersion, parse};
    use lectern_ports::{ChapterRequest, ChapterSourcePort, SearchRequest, SearchSourcePort};
    use lectern_shared::{ErrorClass, ErrorCode, ErrorEnvelope, RequestContext, Result, SecretString};
    use serde_json::json;
    use std::time::{Duration, Instant};
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn source(server: &MockServer, api_key: Option<&str>) -> Result<HttpScriptureSource> {
        HttpScriptureSource::new(&HttpScriptureSourceConfig {
            base_url: server.uri().into(),
            api_key: api_key.map(SecretString::new),
            timeout_ms: 2_000,
            min_request_interval: Duration::ZERO,
        })
    }

    fn john_3() -> Result<ChapterRequest> {
        let address = parse("John 3").map_err(ErrorEnvelope::from)?;
        Ok(ChapterRequest::new(&address, SupportedVersion::Nlt))
    }

    #[tokio::test]
    async fn fetch_chapter_maps_the_response() -> Result<()> {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/chapters/JHN/3"))
            .and(query_param("version", "NLT"))
            .and(query_param("key", "k-123"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "verses": [
                    { "number": 17, "text": "God sent his Son into the world" },
                    { "number": 16, "text": "For this is how God loved the world" }
                ],
                "subtitle": "Jesus and Nicodemus",
                "fromPersistentStore": true
            })))
            .expect(1)
            .mount(&server)
            .await;

        let adapter = source(&server, Some("k-123"))?;
        let ctx = RequestContext::new_request();
        let fetched = adapter.fetch_chapter(&ctx, john_3()?).await?;

        assert_eq!(fetched.verses.len(), 2);
        assert_eq!(fetched.subtitle.as_deref(), Some("Jesus and Nicodemus"));
        assert!(fetched.from_persistent_store);
        Ok(())
    }

    #[tokio::test]
    async fn consecutive_requests_are_spaced_by_the_minimum_interval() -> Result<()> {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/chapters/JHN/3"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "verses": [{ "number": 16, "text": "For this is how God loved the world" }]
            })))
            .expect(3)
            .mount(&server)
            .await;

        let adapter = HttpScriptureSource::new(&HttpScriptureSourceConfig {
            base_url: server.uri().into(),
            api_key: None,
            timeout_ms: 2_000,
            min_request_interval: DEFAULT_MIN_REQUEST_INTERVAL,
        })?;
        let ctx = RequestContext::new_request();
        let started = Instant::now();
        for _ in 0..3 {
            adapter.fetch_chapter(&ctx, john_3()?).await?;
        }

        assert!(started.elapsed() >= DEFAULT_MIN_REQUEST_INTERVAL * 2);
        Ok(())
    }

    #[tokio::test]
    async fn missing_chapter_is_not_found() -> Result<()> {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/chapters/JHN/3"))
            .respond_with(ResponseTemplate::new(404).set_body_json(json!({ "error": "no such chapter" })))
            .mount(&server)
            .await;

        let adapter = source(&server, None)?;
        let ctx = RequestContext::new_request();
        let error = adapter
            .fetch_chapter(&ctx, john_3()?)
            .await
            .err()
            .ok_or_else(|| std::io::Error::other("expected not found"))?;

        assert_eq!(error.code, ErrorCode::not_found());
        assert_eq!(error.class, ErrorClass::NonRetriable);
        assert_eq!(error.metadata.get("book").map(String::as_str), Some("John"));
        Ok(())
    }

    #[tokio::test]
    async fn server_errors_are_retriable_and_hide_the_key() -> Result<()> {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let adapter = source(&server, Some("k-123"))?;
        let ctx = RequestContext::new_request();
        let error = adapter
            .fetch_chapter(&ctx, john_3()?)
            .await
            .err()
            .ok_or_else(|| std::io::Error::other("expected unavailable"))?;

        assert_eq!(error.class, ErrorClass::Retriable);
        assert_eq!(error.metadata.get("status").map(String::as_str), Some("503"));
        assert!(!error.to_string().contains("k-123"));
        Ok(())
    }

    #[tokio::test]
    async fn malformed_body_is_an_invalid_response() -> Result<()> {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>"))
            .mount(&server)
            .await;

        let adapter = source(&server, None)?;
        let ctx = RequestContext::new_request();
        let error = adapter
            .fetch_chapter(&ctx, john_3()?)
            .await
            .err()
            .ok_or_else(|| std::io::Error::other("expected decode error"))?;
        assert_eq!(error.code, ErrorCode::new("source", "invalid_response"));
        Ok(())
    }

    #[tokio::test]
    async fn search_sends_query_version_and_limit() -> Result<()> {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/search"))
            .and(query_param("q", "good shepherd"))
            .and(query_param("version", "KJV"))
            .and(query_param("limit", "2"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "results": [
                    { "reference": "John 10:11", "book": "John", "chapter": 10, "verse": 11,
                      "text": "I am the good shepherd", "version": "KJV" },
                    { "reference": "John 10:14", "book": "John", "chapter": 10, "verse": 14,
                      "text": "I am the good shepherd, and know my sheep", "version": "KJV",
                      "fromCache": true },
                    { "reference": "Psalms 23:1", "book": "Psalms", "chapter": 23, "verse": 1,
                      "text": "The LORD is my shepherd", "version": "KJV" }
                ]
            })))
            .mount(&server)
            .await;

        let adapter = source(&server, None)?;
        let ctx = RequestContext::new_request();
        let results = adapter
            .search_text(
                &ctx,
                SearchRequest {
                    query: "good shepherd".into(),
                    version: SupportedVersion::Kjv,
                    limit: 2,
                },
            )
            .await?;

        assert_eq!(results.len(), 2);
        assert_eq!(results[0].reference.as_ref(), "John 10:11");
        assert!(results.iter().all(|result| !result.from_cache));
        Ok(())
    }
}
