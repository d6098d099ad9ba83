//! Local JSON bible files as a chapter and search source.
//!
//! One file per version, `{data_dir}/{version}.json` with a lowercase
//! version code. Each file is an array of books:
//!
//! ```json
//! [{ "abbrev": "gn", "chapters": [["In the beginning...", "..."], ...] }]
//! ```
//!
//! Books are matched to the catalog by abbreviation. Files are parsed once
//! and kept for the life of the source.

use lectern_config::SourceConfig;
use lectern_domain::{Book, SearchResult, SupportedVersion, Verse, books, matches_query};
use lectern_ports::{
    BoxFuture, ChapterRequest, ChapterSourcePort, FetchedChapter, SearchRequest, SearchSourcePort,
    SourceInfo,
};
use lectern_shared::{ErrorClass, ErrorCode, ErrorEnvelope, RequestContext, Result, ResultExt};
use serde::Deserialize;
use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::Mutex;

/// Chapter and search source reading bundled bible files.
#[derive(Debug)]
pub struct FileScriptureSource {
    info: SourceInfo,
    data_dir: PathBuf,
    loaded: Mutex<HashMap<SupportedVersion, Arc<BibleFile>>>,
}

/// Parsed bible file: chapters of verse texts per catalog book.
#[derive(Debug, Default)]
struct BibleFile {
    books: BTreeMap<Book, Vec<Vec<Box<str>>>>,
}

#[derive(Debug, Deserialize)]
struct BookEntry {
    abbrev: String,
    chapters: Vec<Vec<String>>,
}

impl FileScriptureSource {
    /// Source reading from `data_dir`.
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            info: SourceInfo::new("file", "Bundled bible files"),
            data_dir: data_dir.into(),
            loaded: Mutex::new(HashMap::new()),
        }
    }

    /// Build from the validated source config.
    pub fn from_source_config(config: &SourceConfig) -> Self {
        Self::new(&*config.data_dir)
    }

    /// Path of the file holding `version`.
    #[must_use]
    pub fn file_path(&self, version: SupportedVersion) -> PathBuf {
        self.data_dir
            .join(format!("{}.json", version.code().to_ascii_lowercase()))
    }

    async fn bible(&self, version: SupportedVersion) -> Result<Arc<BibleFile>> {
        let mut loaded = self.loaded.lock().await;
        if let Some(bible) = loaded.get(&version) {
            return Ok(Arc::clone(bible));
        }

        let path = self.file_path(version);
        let bytes = tokio::fs::read(&path)
            .await
            .map_err(|error| read_error(&path, &error))?;
        let bible = Arc::new(
            parse_bible_file(&bytes).with_error_metadata("path", path.to_string_lossy())?,
        );
        loaded.insert(version, Arc::clone(&bible));
        Ok(bible)
    }
}

impl ChapterSourcePort for FileScriptureSource {
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
            ctx.ensure_not_cancelled("file_source.fetch_chapter")?;
            let bible = self.bible(request.version).await?;

            let chapter = usize::try_from(request.chapter)
                .ok()
                .and_then(|chapter| chapter.checked_sub(1))
                .and_then(|index| bible.books.get(&request.book)?.get(index))
                .ok_or_else(|| {
                    ErrorEnvelope::expected(ErrorCode::not_found(), "chapter not in bible file")
                        .with_metadata("book", request.book.name())
                        .with_metadata("chapter", request.chapter.to_string())
                        .with_metadata("version", request.version.code())
                })?;

            Ok(FetchedChapter {
                verses: numbered(chapter)
                    .map(|(number, text)| Verse::new(number, text))
                    .collect(),
                subtitle: None,
                from_persistent_store: true,
            })
        })
    }
}

impl SearchSourcePort for FileScriptureSource {
    fn search_text(
        &self,
        ctx: &RequestContext,
        request: SearchRequest,
    ) -> BoxFuture<'_, Result<Vec<SearchResult>>> {
        let ctx = ctx.clone();
        Box::pin(async move {
            ctx.ensure_not_cancelled("file_source.search")?;
            let bible = self.bible(request.version).await?;
            let lowered = request.query.trim().to_lowercase();
            if lowered.is_empty() {
                return Ok(Vec::new());
            }
            let limit = usize::try_from(request.limit).unwrap_or(usize::MAX);

            let results = bible
                .books
                .iter()
                .flat_map(|(book, chapters)| {
                    (1u32..).zip(chapters).flat_map(move |(chapter, verses)| {
                        numbered(verses).map(move |(verse, text)| (*book, chapter, verse, text))
                    })
                })
                .filter(|(_, _, _, text)| matches_query(text, &lowered))
                .take(limit)
                .map(|(book, chapter, verse, text)| SearchResult {
                    reference: format!("{book} {chapter}:{verse}").into(),
                    book: book.name().into(),
                    chapter,
                    verse,
                    text: text.into(),
                    version: request.version.code().into(),
                    from_cache: false,
                })
                .collect();
            Ok(results)
        })
    }
}

fn numbered(verses: &[Box<str>]) -> impl Iterator<Item = (u32, &str)> {
    (1u32..).zip(verses.iter().map(|text| &**text))
}

fn parse_bible_file(bytes: &[u8]) -> Result<BibleFile> {
    // Bundled files are often saved with a UTF-8 byte order mark.
    let bytes = bytes.strip_prefix(b"\xEF\xBB\xBF").unwrap_or(bytes);
    let entries: Vec<BookEntry> = serde_json::from_slice(bytes).map_err(|error| {
        ErrorEnvelope::unexpected(
            ErrorCode::new("source", "invalid_bible_file"),
            format!("failed to parse bible file: {error}"),
            ErrorClass::NonRetriable,
        )
    })?;

    let mut bible = BibleFile::default();
    for entry in entries {
        let Some(book) = books().find(|book| book.abbreviation.eq_ignore_ascii_case(&entry.abbrev))
        else {
            continue;
        };
        let chapters = entry
            .chapters
            .into_iter()
            .map(|verses| verses.into_iter().map(String::into_boxed_str).collect())
            .collect();
        bible.books.insert(book, chapters);
    }
    Ok(bible)
}

fn read_error(path: &Path, error: &std::io::Error) -> ErrorEnvelope {
    let code = match error.kind() {
        std::io::ErrorKind::NotFound => ErrorCode::new("source", "bible_file_not_found"),
        _ => ErrorCode::io(),
    };
    ErrorEnvelope::expected(code, format!("failed to read bible file: {error}"))
        .with_metadata("path", path.to_string_lossy().to_string())
}
