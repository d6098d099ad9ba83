//! Integration tests for the reading session.

use lectern_app::{ReadingSession, RetrievalCoordinator, navigate_to_reference};
use lectern_domain::{Address, ParseError, SupportedVersion, parse};
use lectern_shared::{ErrorCode, RequestContext, Result};
use lectern_testkit::errors::unavailable_error;
use lectern_testkit::in_memory::InMemoryChapterSource;
use std::sync::Arc;

fn address(input: &str) -> Address {
    parse(input).expect("valid reference")
}

fn reading_source() -> InMemoryChapterSource {
    let john_3 = [
        (16, "For this is how God loved the world: He gave his one and only Son."),
        (17, "God sent his Son into the world not to judge the world, but to save the world through him."),
    ];
    InMemoryChapterSource::new()
        .with_chapter(&address("John 1"), SupportedVersion::Nlt, &[(1, "In the beginning the Word already existed.")])
        .with_chapter(&address("John 3"), SupportedVersion::Nlt, &john_3)
        .with_chapter(&address("John 3"), SupportedVersion::Kjv, &[(16, "For God so loved the world")])
}

fn reading_session(source: &Arc<InMemoryChapterSource>) -> ReadingSession {
    let coordinator = Arc::new(RetrievalCoordinator::new(source.clone()));
    ReadingSession::new(coordinator, address("John 1"))
}

#[test]
fn blank_navigation_uses_the_default() -> std::result::Result<(), ParseError> {
    let default = address("John 1");
    assert_eq!(navigate_to_reference("   ", default)?, default);
    assert_eq!(navigate_to_reference("john 3:16", default)?, address("John 3:16"));
    assert!(navigate_to_reference("Hezekiah 4", default).is_err());
    Ok(())
}

#[tokio::test]
async fn selection_is_scoped_to_the_open_chapter() -> Result<()> {
    let source = Arc::new(reading_source());
    let mut session = reading_session(&source);
    let ctx = RequestContext::new_request();

    assert_eq!(session.toggle_verse(1), None);
    assert_eq!(session.select_range(1, 2), None);

    session
        .open(&ctx, &address("John 3:16"), SupportedVersion::Nlt)
        .await?;
    assert_eq!(session.toggle_verse(16), Some(true));
    assert_eq!(session.toggle_verse(17), Some(true));
    assert_eq!(session.toggle_verse(17), Some(false));
    assert_eq!(session.selection().len(), 1);

    // Another verse of the same chapter keeps the selection.
    session
        .open(&ctx, &address("John 3:17"), SupportedVersion::Nlt)
        .await?;
    assert_eq!(session.selection().len(), 1);
    assert_eq!(session.address(), Some(address("John 3:17")));

    // Same chapter in another version is a different view.
    session
        .open(&ctx, &address("John 3"), SupportedVersion::Kjv)
        .await?;
    assert!(session.selection().is_empty());

    assert_eq!(session.select_range(17, 16), Some(1));
    assert_eq!(session.selection().len(), 1);
    session
        .open(&ctx, &address("John 1"), SupportedVersion::Nlt)
        .await?;
    assert!(session.selection().is_empty());
    Ok(())
}

#[tokio::test]
async fn copy_selection_renders_a_citation() -> Result<()> {
    let source = Arc::new(reading_source());
    let mut session = reading_session(&source);
    let ctx = RequestContext::new_request();

    assert_eq!(session.copy_selection(), "");
    session
        .open(&ctx, &address("John 3"), SupportedVersion::Nlt)
        .await?;
    assert_eq!(session.copy_selection(), "");

    session.select_range(16, 17);
    assert_eq!(
        session.copy_selection(),
        "John 3:16,17 (NLT)\n\n\
         16. For this is how God loved the world: He gave his one and only Son.\n\
         17. God sent his Son into the world not to judge the world, but to save the world through him."
    );

    session.clear_selection();
    assert!(session.selection().is_empty());
    Ok(())
}

#[tokio::test]
async fn failed_open_keeps_the_previous_chapter() -> Result<()> {
    let source = Arc::new(reading_source());
    let mut session = reading_session(&source);
    let ctx = RequestContext::new_request();

    session
        .open(&ctx, &address("John 3"), SupportedVersion::Nlt)
        .await?;
    session.toggle_verse(16);

    source.fail_next(unavailable_error());
    let error = session
        .open(&ctx, &address("John 1"), SupportedVersion::Nlt)
        .await;
    assert!(error.is_err());

    let content = session.content().expect("John 3 stays open");
    assert_eq!((content.book().name(), content.chapter()), ("John", 3));
    assert_eq!(session.selection().len(), 1);
    Ok(())
}

#[tokio::test]
async fn open_reference_parses_and_defaults() -> Result<()> {
    let source = Arc::new(reading_source());
    let mut session = reading_session(&source);
    let ctx = RequestContext::new_request();

    let opened = session.open_reference(&ctx, "", SupportedVersion::Nlt).await?;
    assert_eq!(opened.chapter(), 1);
    assert_eq!(session.address(), Some(address("John 1")));

    let opened = session
        .open_reference(&ctx, "john 3:16", SupportedVersion::Kjv)
        .await?;
    assert_eq!(opened.version(), SupportedVersion::Kjv);

    let error = session
        .open_reference(&ctx, "John 3:", SupportedVersion::Kjv)
        .await
        .expect_err("malformed");
    assert_eq!(error.code, ErrorCode::new("reference", "malformed"));
    assert_eq!(session.address(), Some(address("John 3:16")));
    Ok(())
}

#[tokio::test]
async fn range_selection_is_bounded_by_the_open_chapter() -> Result<()> {
    let source = Arc::new(reading_source());
    let mut session = reading_session(&source);
    let ctx = RequestContext::new_request();

    let verses = session
        .open(&ctx, &address("John 3"), SupportedVersion::Nlt)
        .await?
        .verses()
        .len();

    assert_eq!(session.select_range(1, u32::MAX), Some(verses));
    assert_eq!(session.selection().len(), verses);
    assert_eq!(session.selection().verse_numbers(), vec![16, 17]);

    // A range entirely past the chapter selects nothing.
    assert_eq!(session.select_range(40, u32::MAX), Some(0));
    assert_eq!(session.selection().len(), verses);
    Ok(())
}
