//! Free-form reference parsing (`John 3:16`, `Psalm 23`, `1 Samuel 17:4`).

use crate::address::Address;
use crate::catalog::resolve_book;
use lectern_shared::{ErrorCode, ErrorEnvelope};
use std::str::FromStr;

/// Why a reference did not match `<book> <chapter>[:<verse>]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum MalformedReason {
    /// Nothing but whitespace.
    #[error("reference is empty")]
    Empty,
    /// No chapter token after the book.
    #[error("missing chapter number")]
    MissingChapter,
    /// Book token is not a name.
    #[error("book name is not valid")]
    InvalidBook,
    /// Chapter is not a decimal number.
    #[error("chapter is not a number")]
    InvalidChapter,
    /// Verse is not a decimal number.
    #[error("verse is not a number")]
    InvalidVerse,
    /// Chapter or verse does not fit in 32 bits.
    #[error("number is too large")]
    Overflow,
    /// Chapter `0`.
    #[error("chapter must be >= 1")]
    ZeroChapter,
    /// Verse `0`.
    #[error("verse must be >= 1")]
    ZeroVerse,
}

/// Failures from [`parse`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseError {
    /// Input does not have one of the accepted shapes.
    #[error("malformed reference `{input}`: {reason}")]
    MalformedReference {
        /// Trimmed input.
        input: Box<str>,
        /// What failed.
        reason: MalformedReason,
    },
    /// Book token did not resolve to exactly one canonical book.
    #[error("unknown book `{book}`")]
    UnknownBook {
        /// Book token as written.
        book: Box<str>,
    },
}

impl ParseError {
    fn malformed(input: &str, reason: MalformedReason) -> Self {
        Self::MalformedReference {
            input: input.into(),
            reason,
        }
    }

    /// Stable envelope code for this failure.
    #[must_use]
    pub fn error_code(&self) -> ErrorCode {
        match self {
            Self::MalformedReference { .. } => ErrorCode::new("reference", "malformed"),
            Self::UnknownBook { .. } => ErrorCode::new("reference", "unknown_book"),
        }
    }
}

impl From<ParseError> for ErrorEnvelope {
    fn from(error: ParseError) -> Self {
        let envelope = Self::expected(error.error_code(), error.to_string());
        match error {
            ParseError::MalformedReference { input, reason } => envelope
                .with_metadata("input", input.to_string())
                .with_metadata("reason", reason.to_string()),
            ParseError::UnknownBook { book } => envelope.with_metadata("book", book.to_string()),
        }
    }
}

/// Parse `<book> <chapter>` or `<book> <chapter>:<verse>`.
///
/// Whitespace around tokens and around the colon is ignored; the book is
/// resolved through the catalog. Chapter and verse are not checked against
/// the catalog's chapter counts.
pub fn parse(input: &str) -> Result<Address, ParseError> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Err(ParseError::malformed(trimmed, MalformedReason::Empty));
    }

    let compact = trimmed.split(':').map(str::trim).collect::<Vec<_>>().join(":");
    let Some((book_token, locator)) = compact.rsplit_once(char::is_whitespace) else {
        return Err(ParseError::malformed(trimmed, MalformedReason::MissingChapter));
    };
    let book_token = book_token.trim();
    if !is_book_shaped(book_token) {
        let numeric_book = book_token.chars().all(|ch| ch.is_ascii_digit());
        let reason = if numeric_book && !locator.starts_with(|ch: char| ch.is_ascii_digit()) {
            MalformedReason::MissingChapter
        } else {
            MalformedReason::InvalidBook
        };
        return Err(ParseError::malformed(trimmed, reason));
    }

    let (chapter, verse) =
        parse_locator(locator).map_err(|reason| ParseError::malformed(trimmed, reason))?;
    let book = resolve_book(book_token).ok_or_else(|| ParseError::UnknownBook {
        book: book_token.into(),
    })?;

    Address::new(book, chapter, verse).map_err(|_| {
        let reason = if chapter == 0 {
            MalformedReason::ZeroChapter
        } else {
            MalformedReason::ZeroVerse
        };
        ParseError::malformed(trimmed, reason)
    })
}

impl FromStr for Address {
    type Err = ParseError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        parse(value)
    }
}

/// Optional leading number, then a name made of letters, spaces and dots.
fn is_book_shaped(token: &str) -> bool {
    let name = token
        .trim_start_matches(|ch: char| ch.is_ascii_digit())
        .trim_start();
    name.starts_with(char::is_alphabetic)
        && name
            .chars()
            .all(|ch| ch.is_alphabetic() || ch == ' ' || ch == '.')
}

fn parse_locator(locator: &str) -> Result<(u32, Option<u32>), MalformedReason> {
    match locator.split_once(':') {
        Some((chapter, verse)) => {
            let chapter = parse_number(chapter, MalformedReason::InvalidChapter)?;
            let verse = parse_number(verse, MalformedReason::InvalidVerse)?;
            if chapter == 0 {
                return Err(MalformedReason::ZeroChapter);
            }
            if verse == 0 {
                return Err(MalformedReason::ZeroVerse);
            }
            Ok((chapter, Some(verse)))
        },
        None => {
            let chapter = parse_number(locator, MalformedReason::InvalidChapter)?;
            if chapter == 0 {
                return Err(MalformedReason::ZeroChapter);
            }
            Ok((chapter, None))
        },
    }
}

fn parse_number(token: &str, invalid: MalformedReason) -> Result<u32, MalformedReason> {
    if token.is_empty() || !token.chars().all(|ch| ch.is_ascii_digit()) {
        return Err(invalid);
    }
    token.parse().map_err(|_| MalformedReason::Overflow)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{books, resolve_book};
    use proptest::prelude::*;

    fn malformed_reason(input: &str) -> Option<MalformedReason> {
        match parse(input) {
            Err(ParseError::MalformedReference { reason, .. }) => Some(reason),
            _ => None,
        }
    }

    #[test]
    fn parses_book_chapter_and_verse() -> Result<(), ParseError> {
        let address = parse("John 3:16")?;
        assert_eq!(address.book().name(), "John");
        assert_eq!(address.chapter(), 3);
        assert_eq!(address.verse(), Some(16));
        Ok(())
    }

    #[test]
    fn parses_chapter_only_with_alias() -> Result<(), ParseError> {
        let address = parse("Psalm 23")?;
        assert_eq!(address.book().name(), "Psalms");
        assert_eq!(address.chapter(), 23);
        assert_eq!(address.verse(), None);
        Ok(())
    }

    #[test]
    fn accepts_numbered_books_and_loose_whitespace() -> Result<(), ParseError> {
        assert_eq!(parse("1 Samuel 17:4")?.to_string(), "1 Samuel 17:4");
        assert_eq!(parse("1Samuel 17")?.to_string(), "1 Samuel 17");
        assert_eq!(parse("  2 john   1 : 3 ")?.to_string(), "2 John 1:3");
        assert_eq!(parse("song of solomon 2")?.to_string(), "Song of Songs 2");
        assert_eq!(parse("Rev. 21:4")?.to_string(), "Revelation 21:4");
        Ok(())
    }

    #[test]
    fn rejects_malformed_shapes() {
        assert_eq!(malformed_reason("blah"), Some(MalformedReason::MissingChapter));
        assert_eq!(malformed_reason("   "), Some(MalformedReason::Empty));
        assert_eq!(malformed_reason("1 Samuel"), Some(MalformedReason::MissingChapter));
        assert_eq!(malformed_reason("John three"), Some(MalformedReason::InvalidChapter));
        assert_eq!(malformed_reason("John 3:"), Some(MalformedReason::InvalidVerse));
        assert_eq!(malformed_reason("John 3:a"), Some(MalformedReason::InvalidVerse));
        assert_eq!(malformed_reason("John 3:16:2"), Some(MalformedReason::InvalidVerse));
        assert_eq!(malformed_reason("John 0"), Some(MalformedReason::ZeroChapter));
        assert_eq!(malformed_reason("John 3:0"), Some(MalformedReason::ZeroVerse));
        assert_eq!(malformed_reason("John 99999999999"), Some(MalformedReason::Overflow));
        assert_eq!(malformed_reason("3 16"), Some(MalformedReason::InvalidBook));
        assert_eq!(malformed_reason("Jo#hn 3"), Some(MalformedReason::InvalidBook));
    }

    #[test]
    fn rejects_unknown_and_ambiguous_books() {
        assert_eq!(
            parse("Hezekiah 3"),
            Err(ParseError::UnknownBook {
                book: "Hezekiah".into()
            })
        );
        assert!(matches!(parse("Jo 3"), Err(ParseError::UnknownBook { .. })));
    }

    #[test]
    fn errors_map_to_stable_codes() {
        let envelope = parse("blah").map_err(ErrorEnvelope::from).err();
        assert_eq!(
            envelope.as_ref().map(|e| e.code.clone()),
            Some(ErrorCode::new("reference", "malformed"))
        );

        let envelope = parse("Hezekiah 1").map_err(ErrorEnvelope::from).err();
        assert_eq!(
            envelope.map(|e| e.code),
            Some(ErrorCode::new("reference", "unknown_book"))
        );
    }

    #[test]
    fn from_str_delegates_to_parse() {
        let parsed: Result<Address, _> = "jn 1".parse();
        assert_eq!(
            parsed.map(|address| address.book()).ok(),
            resolve_book("John")
        );
    }

    proptest! {
        #[test]
        fn canonical_strings_round_trip(
            index in 0usize..66,
            chapter in 1u32..=150,
            verse in proptest::option::of(1u32..=176),
        ) {
            let book = books().nth(index).ok_or_else(|| TestCaseError::fail("book index"))?;
            let text = match verse {
                Some(verse) => format!("{} {chapter}:{verse}", book.name()),
                None => format!("{} {chapter}", book.name()),
            };
            let address = parse(&text).map_err(|error| TestCaseError::fail(error.to_string()))?;
            prop_assert_eq!(address.book(), book);
            prop_assert_eq!(address.chapter(), chapter);
            prop_assert_eq!(address.verse(), verse);
            prop_assert_eq!(address.to_string(), text);
        }

        #[test]
        fn arbitrary_input_never_panics(input in "\\PC{0,40}") {
            let _ = parse(&input);
        }
    }
}
