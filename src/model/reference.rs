//! Reference value types: verse coordinates, ranges and metadata.

use std::fmt;

/// A single verse position within a book.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "cli", derive(serde::Serialize))]
#[cfg_attr(feature = "cli", serde(rename_all = "camelCase"))]
pub struct Coordinate {
    /// OSIS book id (e.g. `Gen`).
    pub book_id: String,
    pub chapter: u32,
    pub verse: u32,
    #[cfg_attr(feature = "cli", serde(skip_serializing_if = "Option::is_none"))]
    pub subverse: Option<u32>,
}

impl Coordinate {
    pub fn new(book_id: impl Into<String>, chapter: u32, verse: u32) -> Self {
        Self {
            book_id: book_id.into(),
            chapter,
            verse,
            subverse: None,
        }
    }

    pub fn with_subverse(mut self, subverse: u32) -> Self {
        self.subverse = Some(subverse);
        self
    }
}

impl fmt::Display for Coordinate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}:{}", self.book_id, self.chapter, self.verse)?;
        if let Some(sub) = self.subverse {
            write!(f, "{}", subverse_letter(sub))?;
        }
        Ok(())
    }
}

/// A reference that may span several verses or chapters.
///
/// `verse == None` addresses a whole chapter. The end fields are only set
/// when the range extends past its start.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "cli", derive(serde::Serialize))]
#[cfg_attr(feature = "cli", serde(rename_all = "camelCase"))]
pub struct RangeRef {
    pub book_id: String,
    pub chapter: u32,
    #[cfg_attr(feature = "cli", serde(skip_serializing_if = "Option::is_none"))]
    pub verse: Option<u32>,
    #[cfg_attr(feature = "cli", serde(skip_serializing_if = "Option::is_none"))]
    pub subverse: Option<u32>,
    #[cfg_attr(feature = "cli", serde(skip_serializing_if = "Option::is_none"))]
    pub end_chapter: Option<u32>,
    #[cfg_attr(feature = "cli", serde(skip_serializing_if = "Option::is_none"))]
    pub end_verse: Option<u32>,
}

impl RangeRef {
    /// Reference to a single verse.
    pub fn verse(book_id: impl Into<String>, chapter: u32, verse: u32) -> Self {
        Self {
            book_id: book_id.into(),
            chapter,
            verse: Some(verse),
            subverse: None,
            end_chapter: None,
            end_verse: None,
        }
    }

    /// Reference to a whole chapter.
    pub fn chapter(book_id: impl Into<String>, chapter: u32) -> Self {
        Self {
            book_id: book_id.into(),
            chapter,
            verse: None,
            subverse: None,
            end_chapter: None,
            end_verse: None,
        }
    }

    pub fn with_subverse(mut self, subverse: Option<u32>) -> Self {
        self.subverse = subverse;
        self
    }

    /// Extend the range to an end position. An end equal to the start is
    /// dropped so single-verse references stay single.
    pub fn through(mut self, end_chapter: Option<u32>, end_verse: Option<u32>) -> Self {
        let end_chapter = end_chapter.filter(|&c| c != self.chapter);
        let end_verse = match (end_chapter, end_verse) {
            (None, Some(v)) if Some(v) == self.verse => None,
            (_, v) => v,
        };
        self.end_chapter = end_chapter;
        self.end_verse = end_verse;
        self
    }

    pub fn is_range(&self) -> bool {
        self.end_chapter.is_some() || self.end_verse.is_some()
    }

    /// The first verse of the range, if it addresses a verse.
    pub fn start(&self) -> Option<Coordinate> {
        self.verse.map(|verse| Coordinate {
            book_id: self.book_id.clone(),
            chapter: self.chapter,
            verse,
            subverse: self.subverse,
        })
    }
}

impl From<Coordinate> for RangeRef {
    fn from(c: Coordinate) -> Self {
        RangeRef::verse(c.book_id, c.chapter, c.verse).with_subverse(c.subverse)
    }
}

impl fmt::Display for RangeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.book_id, self.chapter)?;
        if let Some(v) = self.verse {
            write!(f, ":{v}")?;
        }
        if let Some(sub) = self.subverse {
            write!(f, "{}", subverse_letter(sub))?;
        }
        match (self.end_chapter, self.end_verse) {
            (Some(c), Some(v)) => write!(f, "-{c}:{v}"),
            (Some(c), None) => write!(f, "-{c}"),
            (None, Some(v)) => write!(f, "-{v}"),
            (None, None) => Ok(()),
        }
    }
}

/// A cross reference attached to a phrase or section.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "cli", derive(serde::Serialize))]
pub struct CrossRef {
    pub key: String,
    #[cfg_attr(feature = "cli", serde(skip_serializing_if = "Option::is_none"))]
    pub label: Option<String>,
    pub range: RangeRef,
}

/// Book metadata supplied by the caller.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "cli", derive(serde::Serialize))]
#[cfg_attr(feature = "cli", serde(rename_all = "camelCase"))]
pub struct BookMeta {
    pub osis_id: String,
    pub number: u32,
    pub title: String,
    pub abbreviation: String,
}

impl BookMeta {
    pub fn new(
        osis_id: impl Into<String>,
        number: u32,
        title: impl Into<String>,
        abbreviation: impl Into<String>,
    ) -> Self {
        Self {
            osis_id: osis_id.into(),
            number,
            title: title.into(),
            abbreviation: abbreviation.into(),
        }
    }
}

/// Bible version metadata supplied by the caller.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "cli", derive(serde::Serialize))]
#[cfg_attr(feature = "cli", serde(rename_all = "camelCase"))]
pub struct VersionMeta {
    pub uid: String,
    pub language: String,
    pub title: String,
    pub chapter_verse_separator: String,
    pub has_strongs: bool,
}

impl VersionMeta {
    pub fn new(uid: impl Into<String>, language: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            uid: uid.into(),
            language: language.into(),
            title: title.into(),
            chapter_verse_separator: ":".to_string(),
            has_strongs: false,
        }
    }

    pub fn with_strongs(mut self, has_strongs: bool) -> Self {
        self.has_strongs = has_strongs;
        self
    }

    pub fn with_separator(mut self, separator: impl Into<String>) -> Self {
        self.chapter_verse_separator = separator.into();
        self
    }
}

/// Subverse index for a letter suffix (`a` => 1, `b` => 2, ...).
pub fn subverse_index(letter: char) -> Option<u32> {
    let lower = letter.to_ascii_lowercase();
    lower
        .is_ascii_lowercase()
        .then(|| lower as u32 - 'a' as u32 + 1)
}

fn subverse_letter(index: u32) -> char {
    char::from_u32('a' as u32 + index.saturating_sub(1)).unwrap_or('?')
}

/// Split a verse token like `5`, `5a` or `5b` into number and subverse.
pub fn parse_verse_token(token: &str) -> Option<(u32, Option<u32>)> {
    let token = token.trim();
    let digits_end = token
        .char_indices()
        .find(|(_, c)| !c.is_ascii_digit())
        .map(|(i, _)| i)
        .unwrap_or(token.len());
    let number = token[..digits_end].parse().ok()?;
    let rest = &token[digits_end..];
    let rest = rest.strip_prefix('!').unwrap_or(rest);
    let mut chars = rest.chars();
    match (chars.next(), chars.next()) {
        (None, _) => Some((number, None)),
        (Some(letter), None) => subverse_index(letter).map(|sub| (number, Some(sub))),
        _ => None,
    }
}
