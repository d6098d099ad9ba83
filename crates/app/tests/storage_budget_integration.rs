//! Integration tests for the persistent storage budget.

use lectern_app::{
    RetrievalCoordinator, SearchSession, SearchSettings, StorageBudget, StorageBudgetSource,
    StorageUsage,
};
use lectern_domain::{Address, SourceTag, SupportedVersion, parse};
use lectern_shared::{RequestContext, Result};
use lectern_testkit::in_memory::{
    InMemoryChapterSource, InMemorySearchSource, RecordingLogger, search_result,
};
use std::sync::Arc;

fn address(input: &str) -> Address {
    parse(input).expect("valid reference")
}

/// John 3 has three verses, 1 John 4 has two, Psalms 117 has two.
fn stored_chapters() -> InMemoryChapterSource {
    InMemoryChapterSource::new()
        .with_chapter(
            &address("John 3"),
            SupportedVersion::Kjv,
            &[
                (16, "For God so loved the world"),
                (17, "For God sent not his Son into the world to condemn the world"),
                (18, "He that believeth on him is not condemned"),
            ],
        )
        .with_chapter(
            &address("1 John 4"),
            SupportedVersion::Kjv,
            &[
                (7, "Beloved, let us love one another"),
                (8, "He that loveth not knoweth not God; for God is love."),
            ],
        )
        .with_chapter(
            &address("Psalms 117"),
            SupportedVersion::Kjv,
            &[
                (1, "O praise the LORD, all ye nations"),
                (2, "For his merciful kindness is great toward us"),
            ],
        )
        .persistent(true)
}

fn budgeted(
    source: InMemoryChapterSource,
    verse_limit: u64,
) -> (Arc<StorageBudget>, Arc<RetrievalCoordinator>) {
    let budget = Arc::new(StorageBudget::new(verse_limit));
    let chapters = StorageBudgetSource::new(Arc::new(source), Arc::clone(&budget));
    let coordinator = RetrievalCoordinator::new(Arc::new(chapters))
        .with_storage_budget(Arc::clone(&budget));
    (budget, Arc::new(coordinator))
}

#[tokio::test]
async fn chapters_past_the_limit_are_served_transient() -> Result<()> {
    let (_budget, coordinator) = budgeted(stored_chapters(), 4);
    let ctx = RequestContext::new_request();

    let john = coordinator
        .get_chapter_in(&ctx, &address("John 3"), SupportedVersion::Kjv)
        .await?;
    assert_eq!(john.source_tag(), SourceTag::FetchedAndStored);

    let first_john = coordinator
        .get_chapter_in(&ctx, &address("1 John 4"), SupportedVersion::Kjv)
        .await?;
    assert_eq!(first_john.source_tag(), SourceTag::FetchedTransient);
    assert_eq!(first_john.verses().len(), 2);

    let stats = coordinator.cache_stats().await;
    assert_eq!(stats.total_entries(), 2);
    assert_eq!(
        stats.storage,
        Some(StorageUsage {
            stored_verses: 3,
            stored_chapters: 1,
            verse_limit: 4,
            remaining: 1,
            exhausted: false,
        })
    );
    Ok(())
}

#[tokio::test]
async fn transient_sources_never_spend_the_budget() -> Result<()> {
    let (budget, coordinator) = budgeted(stored_chapters().persistent(false), 1);
    let ctx = RequestContext::new_request();

    let content = coordinator
        .get_chapter_in(&ctx, &address("John 3"), SupportedVersion::Kjv)
        .await?;

    assert_eq!(content.source_tag(), SourceTag::FetchedTransient);
    assert_eq!(budget.usage().stored_verses, 0);
    Ok(())
}

#[tokio::test]
async fn refused_chapters_are_logged() -> Result<()> {
    let logger = RecordingLogger::new();
    let budget = Arc::new(StorageBudget::new(2));
    let chapters = StorageBudgetSource::new(Arc::new(stored_chapters()), Arc::clone(&budget))
        .with_logger(Arc::new(logger.clone()));
    let coordinator = RetrievalCoordinator::new(Arc::new(chapters));
    let ctx = RequestContext::new_request();

    coordinator
        .get_chapter_in(&ctx, &address("John 3"), SupportedVersion::Kjv)
        .await?;

    let refused = logger.events_named("storage.limit_reached");
    assert_eq!(refused.len(), 1);
    let fields = refused[0].fields.clone().unwrap_or_default();
    assert_eq!(fields.get("verses"), Some(&serde_json::Value::from(3)));
    assert_eq!(fields.get("verseLimit"), Some(&serde_json::Value::from(2)));
    Ok(())
}

#[tokio::test]
async fn spent_budget_switches_search_to_cached_content() -> Result<()> {
    let (budget, coordinator) = budgeted(stored_chapters(), 5);
    let ctx = RequestContext::new_request();
    let search_source = Arc::new(InMemorySearchSource::new().with_results(
        "love",
        vec![search_result("1 John 4:8", "God is love", SupportedVersion::Kjv)],
    ));
    let session = SearchSession::new(search_source.clone(), SearchSettings::default())
        .with_cached_content(Arc::clone(&coordinator))
        .with_storage_budget(Arc::clone(&budget));

    session.search(&ctx, "love", "KJV").await?;
    assert_eq!(search_source.calls(), 1);
    assert!(!session.searches_cached_only());

    for reference in ["John 3", "1 John 4"] {
        coordinator
            .get_chapter_in(&ctx, &address(reference), SupportedVersion::Kjv)
            .await?;
    }
    assert!(budget.is_exhausted());
    assert!(session.searches_cached_only());

    let results = session.search(&ctx, "love", "KJV").await?;
    assert_eq!(search_source.calls(), 1);
    let references: Vec<&str> = results.iter().map(|result| result.reference.as_ref()).collect();
    assert_eq!(references, vec!["John 3:16", "1 John 4:7", "1 John 4:8"]);
    assert!(results.iter().all(|result| result.from_cache));
    Ok(())
}

#[tokio::test]
async fn spent_budget_without_a_cache_keeps_searching_the_source() -> Result<()> {
    let budget = Arc::new(StorageBudget::new(0));
    let search_source = Arc::new(InMemorySearchSource::new().with_results(
        "love",
        vec![search_result("1 John 4:8", "God is love", SupportedVersion::Kjv)],
    ));
    let session = SearchSession::new(search_source.clone(), SearchSettings::default())
        .with_storage_budget(budget);
    let ctx = RequestContext::new_request();

    let results = session.search(&ctx, "love", "KJV").await?;

    assert_eq!(results.len(), 1);
    assert_eq!(search_source.calls(), 1);
    Ok(())
}
