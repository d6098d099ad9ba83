//! Integration tests for the search session.

use lectern_app::{
    RetrievalCoordinator, SearchError, SearchSession, SearchSettings, SearchSnapshot,
};
use lectern_domain::{SupportedVersion, parse};
use lectern_shared::{ErrorCode, RequestContext, Result};
use lectern_testkit::errors::unavailable_error;
use lectern_testkit::in_memory::{
    InMemoryChapterSource, InMemorySearchSource, RecordingLogger, search_result,
};
use std::sync::Arc;
use std::time::Duration;

fn love_and_grace() -> InMemorySearchSource {
    InMemorySearchSource::new()
        .with_results(
            "love",
            vec![
                search_result("John 3:16", "For God so loved the world", SupportedVersion::Kjv),
                search_result("1 John 4:8", "God is love", SupportedVersion::Kjv),
            ],
        )
        .with_results(
            "grace",
            vec![search_result(
                "Ephesians 2:8",
                "For by grace are ye saved through faith",
                SupportedVersion::Kjv,
            )],
        )
}

fn session(source: &Arc<InMemorySearchSource>) -> SearchSession {
    SearchSession::new(source.clone(), SearchSettings::default())
}

#[tokio::test]
async fn results_keep_source_order_and_settle_state() -> Result<()> {
    let source = Arc::new(love_and_grace());
    let session = session(&source);
    let ctx = RequestContext::new_request();

    let results = session.search(&ctx, "  love ", "KJV").await?;
    let references: Vec<&str> = results.iter().map(|result| result.reference.as_ref()).collect();
    assert_eq!(references, vec!["John 3:16", "1 John 4:8"]);

    let snapshot = session.snapshot();
    assert_eq!(snapshot.query.as_ref(), "love");
    assert!(!snapshot.in_flight);
    assert_eq!(snapshot.results, results);
    assert!(snapshot.error.is_none());

    let requests = source.requests();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].query.as_ref(), "love");
    assert_eq!(requests[0].limit, SearchSettings::default().limit);
    Ok(())
}

#[tokio::test]
async fn blank_query_clears_without_calling_the_source() -> Result<()> {
    let source = Arc::new(love_and_grace());
    let session = session(&source);
    let ctx = RequestContext::new_request();

    session.search(&ctx, "love", "KJV").await?;
    let results = session.search(&ctx, "   ", "XYZ").await?;

    assert!(results.is_empty());
    assert_eq!(session.snapshot(), SearchSnapshot::default());
    assert_eq!(source.calls(), 1);
    Ok(())
}

#[tokio::test]
async fn invalid_input_is_rejected_before_the_source() {
    let source = Arc::new(love_and_grace());
    let session = session(&source);
    let ctx = RequestContext::new_request();

    let error = session
        .search(&ctx, "love", "ESV")
        .await
        .expect_err("ESV is not supported");
    assert_eq!(
        error,
        SearchError::UnsupportedVersion {
            version: "ESV".into()
        }
    );
    assert_eq!(session.snapshot().error, Some(error));

    let error = session
        .search(&ctx, " a ", "NLT")
        .await
        .expect_err("single character query");
    assert_eq!(error, SearchError::QueryTooShort { min_length: 2 });
    assert_eq!(error.error_code(), ErrorCode::new("search", "query_too_short"));
    assert_eq!(source.calls(), 0);
}

#[tokio::test]
async fn source_failure_clears_results_and_records_the_error() -> Result<()> {
    let source = Arc::new(love_and_grace().with_failure("wrath", unavailable_error()));
    let session = session(&source);
    let ctx = RequestContext::new_request();

    session.search(&ctx, "love", "KJV").await?;
    let error = session
        .search(&ctx, "wrath", "KJV")
        .await
        .expect_err("source fails");

    assert_eq!(error, SearchError::SourceFailure(unavailable_error()));
    let snapshot = session.snapshot();
    assert!(snapshot.results.is_empty());
    assert_eq!(snapshot.error, Some(error));
    assert!(!snapshot.in_flight);
    Ok(())
}

#[tokio::test]
async fn superseded_search_does_not_overwrite_the_latest() -> Result<()> {
    let logger = RecordingLogger::new();
    let source = Arc::new(love_and_grace().with_delay("love", Duration::from_millis(80)));
    let session = Arc::new(session(&source).with_logger(Arc::new(logger.clone())));
    let ctx = RequestContext::new_request();

    let slow = {
        let session = Arc::clone(&session);
        let ctx = ctx.clone();
        tokio::spawn(async move { session.search(&ctx, "love", "KJV").await })
    };
    tokio::time::sleep(Duration::from_millis(10)).await;
    assert!(session.snapshot().in_flight);

    let fast = session.search(&ctx, "grace", "KJV").await?;
    assert_eq!(fast.len(), 1);

    let slow = slow.await.expect("task joins")?;
    assert_eq!(slow.len(), 2);

    let snapshot = session.snapshot();
    assert_eq!(snapshot.query.as_ref(), "grace");
    assert_eq!(snapshot.results, fast);
    assert!(!snapshot.in_flight);
    assert_eq!(logger.events_named("search.stale_discarded").len(), 1);
    assert_eq!(logger.events_named("search.completed").len(), 2);
    Ok(())
}

#[tokio::test]
async fn clear_invalidates_an_outstanding_search() -> Result<()> {
    let source = Arc::new(love_and_grace().with_delay("love", Duration::from_millis(50)));
    let session = Arc::new(session(&source));
    let ctx = RequestContext::new_request();

    let pending = {
        let session = Arc::clone(&session);
        let ctx = ctx.clone();
        tokio::spawn(async move { session.search(&ctx, "love", "KJV").await })
    };
    tokio::time::sleep(Duration::from_millis(10)).await;
    session.clear();

    pending.await.expect("task joins")?;
    assert_eq!(session.snapshot(), SearchSnapshot::default());
    Ok(())
}

#[tokio::test]
async fn cancelled_search_reports_cancellation() {
    let source = Arc::new(love_and_grace().with_delay("love", Duration::from_secs(5)));
    let session = session(&source);
    let ctx = RequestContext::new_request();

    let cancel = ctx.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(10)).await;
        cancel.cancel();
    });

    let error = session
        .search(&ctx, "love", "KJV")
        .await
        .expect_err("cancelled");
    assert_eq!(error, SearchError::Cancelled);
    assert_eq!(error.error_code(), ErrorCode::cancelled());
}

#[tokio::test]
async fn cached_only_search_reads_the_retrieval_cache() -> Result<()> {
    let john_3 = parse("John 3").expect("valid reference");
    let chapters = Arc::new(InMemoryChapterSource::new().with_chapter(
        &john_3,
        SupportedVersion::Nlt,
        &[
            (16, "For this is how God loved the world"),
            (17, "God sent his Son into the world not to judge the world"),
        ],
    ));
    let coordinator = Arc::new(RetrievalCoordinator::new(chapters));
    let ctx = RequestContext::new_request();
    coordinator
        .get_chapter_in(&ctx, &john_3, SupportedVersion::Nlt)
        .await?;

    let source = Arc::new(love_and_grace());
    let session = session(&source).with_cached_content(coordinator);
    let results = session.search_cached_only(&ctx, "LOVED", "nlt").await?;

    assert_eq!(results.len(), 1);
    assert_eq!(results[0].reference.as_ref(), "John 3:16");
    assert!(results[0].from_cache);
    assert_eq!(source.calls(), 0);
    Ok(())
}

#[tokio::test]
async fn cached_only_search_without_a_cache_fails() {
    let source = Arc::new(love_and_grace());
    let session = session(&source);
    let ctx = RequestContext::new_request();

    let error = session
        .search_cached_only(&ctx, "love", "KJV")
        .await
        .expect_err("no coordinator");
    let SearchError::SourceFailure(envelope) = error else {
        panic!("expected a source failure");
    };
    assert_eq!(envelope.code, ErrorCode::new("search", "cache_unavailable"));
}
