//! Book/chapter catalog: the 66 canonical books in reading order.
//!
//! The table is static and immutable. Lookups are deterministic: the same
//! input always resolves to the same book (or to none).

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::ops::Deref;

/// Minimum input length (normalized) for prefix matching.
const MIN_PREFIX_LEN: usize = 3;

/// Testament grouping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Testament {
    /// Genesis through Malachi.
    Old,
    /// Matthew through Revelation.
    New,
}

impl Testament {
    /// Short label used in navigation payloads.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Old => "Old Testament",
            Self::New => "New Testament",
        }
    }
}

/// Literary category used to group books in navigation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Category {
    /// Genesis to Deuteronomy.
    Torah,
    /// Joshua to Esther.
    History,
    /// Job to Song of Songs.
    Wisdom,
    /// Isaiah to Daniel.
    MajorProphets,
    /// Hosea to Malachi.
    MinorProphets,
    /// Matthew to John.
    Gospels,
    /// Acts.
    NewTestamentHistory,
    /// Romans to Jude.
    Epistles,
    /// Revelation.
    Apocalyptic,
}

impl Category {
    /// Display label.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Torah => "Torah",
            Self::History => "History",
            Self::Wisdom => "Wisdom",
            Self::MajorProphets => "Major Prophets",
            Self::MinorProphets => "Minor Prophets",
            Self::Gospels => "Gospels",
            Self::NewTestamentHistory => "NT History",
            Self::Epistles => "Epistles",
            Self::Apocalyptic => "Apocalyptic",
        }
    }

    /// Color code used by navigation surfaces.
    #[must_use]
    pub const fn color(self) -> &'static str {
        match self {
            Self::Torah => "blue",
            Self::History | Self::NewTestamentHistory => "green",
            Self::Wisdom => "purple",
            Self::MajorProphets => "orange",
            Self::MinorProphets => "yellow",
            Self::Gospels => "teal",
            Self::Epistles => "brown",
            Self::Apocalyptic => "red",
        }
    }
}

/// One row of the catalog.
#[derive(Debug)]
pub struct CanonicalBook {
    /// Position in canonical reading order (1..=66).
    pub number: u8,
    /// Canonical name, e.g. `1 Samuel`.
    pub name: &'static str,
    /// Three-character book code, e.g. `1SA`.
    pub code: &'static str,
    /// Short abbreviation used by bundled bible data files, e.g. `1sm`.
    pub abbreviation: &'static str,
    /// Extra accepted spellings.
    pub aliases: &'static [&'static str],
    /// Testament the book belongs to.
    pub testament: Testament,
    /// Navigation category.
    pub category: Category,
    /// Number of chapters.
    pub chapters: u32,
}

macro_rules! book {
    ($number:expr, $name:expr, $code:expr, $abbrev:expr, $testament:ident, $category:ident, $chapters:expr) => {
        book!($number, $name, $code, $abbrev, [], $testament, $category, $chapters)
    };
    ($number:expr, $name:expr, $code:expr, $abbrev:expr, [$($alias:expr),*], $testament:ident, $category:ident, $chapters:expr) => {
        CanonicalBook {
            number: $number,
            name: $name,
            code: $code,
            abbreviation: $abbrev,
            aliases: &[$($alias),*],
            testament: Testament::$testament,
            category: Category::$category,
            chapters: $chapters,
        }
    };
}

static BOOKS: [CanonicalBook; 66] = [
    book!(1, "Genesis", "GEN", "gn", Old, Torah, 50),
    book!(2, "Exodus", "EXO", "ex", Old, Torah, 40),
    book!(3, "Leviticus", "LEV", "lv", Old, Torah, 27),
    book!(4, "Numbers", "NUM", "nm", Old, Torah, 36),
    book!(5, "Deuteronomy", "DEU", "dt", Old, Torah, 34),
    book!(6, "Joshua", "JOS", "jos", Old, History, 24),
    book!(7, "Judges", "JDG", "jdg", Old, History, 21),
    book!(8, "Ruth", "RUT", "ru", Old, History, 4),
    book!(9, "1 Samuel", "1SA", "1sm", Old, History, 31),
    book!(10, "2 Samuel", "2SA", "2sm", Old, History, 24),
    book!(11, "1 Kings", "1KI", "1kg", Old, History, 22),
    book!(12, "2 Kings", "2KI", "2kg", Old, History, 25),
    book!(13, "1 Chronicles", "1CH", "1ch", Old, History, 29),
    book!(14, "2 Chronicles", "2CH", "2ch", Old, History, 36),
    book!(15, "Ezra", "EZR", "ezr", Old, History, 10),
    book!(16, "Nehemiah", "NEH", "neh", Old, History, 13),
    book!(17, "Esther", "EST", "est", Old, History, 10),
    book!(18, "Job", "JOB", "job", Old, Wisdom, 42),
    book!(19, "Psalms", "PSA", "ps", ["Psalm"], Old, Wisdom, 150),
    book!(20, "Proverbs", "PRO", "pr", Old, Wisdom, 31),
    book!(21, "Ecclesiastes", "ECC", "ec", Old, Wisdom, 12),
    book!(22, "Song of Songs", "SNG", "sg", ["Song of Solomon", "Canticles"], Old, Wisdom, 8),
    book!(23, "Isaiah", "ISA", "is", Old, MajorProphets, 66),
    book!(24, "Jeremiah", "JER", "jer", Old, MajorProphets, 52),
    book!(25, "Lamentations", "LAM", "lm", Old, MajorProphets, 5),
    book!(26, "Ezekiel", "EZK", "ezk", Old, MajorProphets, 48),
    book!(27, "Daniel", "DAN", "dn", Old, MajorProphets, 12),
    book!(28, "Hosea", "HOS", "ho", Old, MinorProphets, 14),
    book!(29, "Joel", "JOL", "jl", Old, MinorProphets, 3),
    book!(30, "Amos", "AMO", "am", Old, MinorProphets, 9),
    book!(31, "Obadiah", "OBA", "ob", Old, MinorProphets, 1),
    book!(32, "Jonah", "JON", "jnh", Old, MinorProphets, 4),
    book!(33, "Micah", "MIC", "mc", Old, MinorProphets, 7),
    book!(34, "Nahum", "NAH", "na", Old, MinorProphets, 3),
    book!(35, "Habakkuk", "HAB", "hb", Old, MinorProphets, 3),
    book!(36, "Zephaniah", "ZEP", "zep", Old, MinorProphets, 3),
    book!(37, "Haggai", "HAG", "hg", Old, MinorProphets, 2),
    book!(38, "Zechariah", "ZEC", "zec", Old, MinorProphets, 14),
    book!(39, "Malachi", "MAL", "mal", Old, MinorProphets, 4),
    book!(40, "Matthew", "MAT", "mt", New, Gospels, 28),
    book!(41, "Mark", "MRK", "mk", New, Gospels, 16),
    book!(42, "Luke", "LUK", "lk", New, Gospels, 24),
    book!(43, "John", "JHN", "jn", New, Gospels, 21),
    book!(44, "Acts", "ACT", "ac", New, NewTestamentHistory, 28),
    book!(45, "Romans", "ROM", "ro", New, Epistles, 16),
    book!(46, "1 Corinthians", "1CO", "1co", New, Epistles, 16),
    book!(47, "2 Corinthians", "2CO", "2co", New, Epistles, 13),
    book!(48, "Galatians", "GAL", "ga", New, Epistles, 6),
    book!(49, "Ephesians", "EPH", "eph", New, Epistles, 6),
    book!(50, "Philippians", "PHP", "php", ["Phil"], New, Epistles, 4),
    book!(51, "Colossians", "COL", "col", New, Epistles, 4),
    book!(52, "1 Thessalonians", "1TH", "1th", New, Epistles, 5),
    book!(53, "2 Thessalonians", "2TH", "2th", New, Epistles, 3),
    book!(54, "1 Timothy", "1TI", "1tm", New, Epistles, 6),
    book!(55, "2 Timothy", "2TI", "2tm", New, Epistles, 4),
    book!(56, "Titus", "TIT", "tt", New, Epistles, 3),
    book!(57, "Philemon", "PHM", "phm", New, Epistles, 1),
    book!(58, "Hebrews", "HEB", "heb", New, Epistles, 13),
    book!(59, "James", "JAS", "jas", New, Epistles, 5),
    book!(60, "1 Peter", "1PE", "1pe", New, Epistles, 5),
    book!(61, "2 Peter", "2PE", "2pe", New, Epistles, 3),
    book!(62, "1 John", "1JN", "1jn", New, Epistles, 5),
    book!(63, "2 John", "2JN", "2jn", New, Epistles, 1),
    book!(64, "3 John", "3JN", "3jn", New, Epistles, 1),
    book!(65, "Jude", "JUD", "jud", New, Epistles, 1),
    book!(66, "Revelation", "REV", "rv", ["Revelations"], New, Apocalyptic, 22),
];

/// Handle to a catalog row.
///
/// Equality, ordering and hashing follow canonical reading order.
/// Serializes as the canonical name.
#[derive(Clone, Copy)]
pub struct Book(&'static CanonicalBook);

impl Book {
    /// Canonical name.
    #[must_use]
    pub const fn name(self) -> &'static str {
        self.0.name
    }

    /// The underlying catalog row.
    #[must_use]
    pub const fn entry(self) -> &'static CanonicalBook {
        self.0
    }
}

impl Deref for Book {
    type Target = CanonicalBook;

    fn deref(&self) -> &Self::Target {
        self.0
    }
}

impl PartialEq for Book {
    fn eq(&self, other: &Self) -> bool {
        self.0.number == other.0.number
    }
}

impl Eq for Book {}

impl Hash for Book {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.0.number.hash(state);
    }
}

impl PartialOrd for Book {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Book {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0.number.cmp(&other.0.number)
    }
}

impl fmt::Debug for Book {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.debug_tuple("Book").field(&self.0.name).finish()
    }
}

impl fmt::Display for Book {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(self.0.name)
    }
}

impl Serialize for Book {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.0.name)
    }
}

impl<'de> Deserialize<'de> for Book {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        resolve_book(&raw)
            .ok_or_else(|| serde::de::Error::custom(format!("unknown book `{raw}`")))
    }
}

/// Books of one category, in reading order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryGroup {
    /// Category shared by the books.
    pub category: Category,
    /// Category color.
    pub color: &'static str,
    /// Books in reading order.
    pub books: Vec<Book>,
}

/// Resolve a user-supplied book name to its canonical book.
///
/// Matching ignores case, whitespace and punctuation. Exact matches on the
/// canonical name, code, abbreviation or an alias win; otherwise the input
/// must be a prefix (at least three characters) of exactly one canonical name.
pub fn resolve_book(name: &str) -> Option<Book> {
    let needle = normalize(name);
    if needle.is_empty() {
        return None;
    }

    if let Some(entry) = BOOKS
        .iter()
        .find(|&entry| spellings(entry).any(|spelling| normalize(spelling) == needle))
    {
        return Some(Book(entry));
    }

    if needle.len() < MIN_PREFIX_LEN {
        return None;
    }
    let mut candidates = BOOKS
        .iter()
        .filter(|entry| normalize(entry.name).starts_with(&needle));
    match (candidates.next(), candidates.next()) {
        (Some(entry), None) => Some(Book(entry)),
        _ => None,
    }
}

/// Book at a canonical position (1..=66).
pub fn book_by_number(number: u8) -> Option<Book> {
    let index = usize::from(number).checked_sub(1)?;
    BOOKS.get(index).map(Book)
}

/// Chapter count for a book.
pub const fn chapter_count(book: Book) -> u32 {
    book.0.chapters
}

/// Testament a book belongs to.
pub const fn testament_of(book: Book) -> Testament {
    book.0.testament
}

/// All 66 books in canonical reading order.
pub fn books() -> impl Iterator<Item = Book> {
    BOOKS.iter().map(Book)
}

/// Books of one testament in canonical reading order.
pub fn all_books(testament: Testament) -> impl Iterator<Item = Book> {
    books().filter(move |book| book.testament == testament)
}

/// Books of one category in canonical reading order.
pub fn books_in_category(category: Category) -> impl Iterator<Item = Book> {
    books().filter(move |book| book.category == category)
}

/// Total chapters in a testament.
pub fn total_chapters(testament: Testament) -> u32 {
    all_books(testament).map(chapter_count).sum()
}

/// Books of a testament grouped by category, groups in reading order.
pub fn navigation_groups(testament: Testament) -> Vec<CategoryGroup> {
    let mut groups: Vec<CategoryGroup> = Vec::new();
    for book in all_books(testament) {
        match groups.last_mut() {
            Some(group) if group.category == book.category => group.books.push(book),
            _ => groups.push(CategoryGroup {
                category: book.category,
                color: book.category.color(),
                books: vec![book],
            }),
        }
    }
    groups
}

fn spellings(entry: &'static CanonicalBook) -> impl Iterator<Item = &'static str> {
    [entry.name, entry.code, entry.abbreviation]
        .into_iter()
        .chain(entry.aliases.iter().copied())
}

fn normalize(value: &str) -> String {
    value
        .chars()
        .filter(|ch| ch.is_alphanumeric())
        .flat_map(char::to_lowercase)
        .collect()
}
