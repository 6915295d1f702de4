//! Verse-by-verse import.
//!
//! Modules stored per verse (SWORD and similar) are read through a
//! [`VerseSource`]. Each verse's markup fragment is fed to one dispatcher
//! after the chapter and verse counters have been advanced, so fragments
//! may close tags opened by earlier verses.

use std::collections::BTreeMap;

use crate::dialect::{Dialect, TagDispatcher};
use crate::error::Result;
use crate::model::{BookMeta, BookTree};
use crate::parser::{ParserOptions, VerseMark};

/// A store of verse-sized markup fragments.
pub trait VerseSource {
    /// Number of verses in each chapter of `book`, chapter 1 first.
    fn verse_counts(&mut self, book: &BookMeta) -> Result<Vec<u32>>;

    /// Markup for one verse. Verse 0 holds chapter-level headings.
    fn fetch_verse_text(&mut self, book: &BookMeta, chapter: u32, verse: u32)
    -> Result<Option<String>>;
}

/// In-memory [`VerseSource`], keyed by book, chapter and verse.
#[derive(Debug, Clone, Default)]
pub struct MemoryVerseSource {
    verses: BTreeMap<(String, u32, u32), String>,
}

impl MemoryVerseSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, book: &str, chapter: u32, verse: u32, text: impl Into<String>) {
        self.verses
            .insert((book.to_string(), chapter, verse), text.into());
    }

    pub fn len(&self) -> usize {
        self.verses.len()
    }

    pub fn is_empty(&self) -> bool {
        self.verses.is_empty()
    }
}

impl VerseSource for MemoryVerseSource {
    fn verse_counts(&mut self, book: &BookMeta) -> Result<Vec<u32>> {
        let mut counts: Vec<u32> = Vec::new();
        for (id, chapter, verse) in self.verses.keys() {
            if *id != book.osis_id || *chapter == 0 {
                continue;
            }
            let index = *chapter as usize - 1;
            if counts.len() <= index {
                counts.resize(index + 1, 0);
            }
            counts[index] = counts[index].max(*verse);
        }
        Ok(counts)
    }

    fn fetch_verse_text(
        &mut self,
        book: &BookMeta,
        chapter: u32,
        verse: u32,
    ) -> Result<Option<String>> {
        Ok(self
            .verses
            .get(&(book.osis_id.clone(), chapter, verse))
            .cloned())
    }
}

/// Build one book from a verse source.
///
/// Missing and blank verses are skipped without a verse marker; the verse
/// they belong to is usually a join started by an earlier verse.
pub fn import_book_from_verses<D, S>(
    dialect: D,
    source: &mut S,
    book: &BookMeta,
    options: ParserOptions,
) -> Result<BookTree>
where
    D: Dialect,
    S: VerseSource + ?Sized,
{
    let counts = source.verse_counts(book)?;
    tracing::debug!(book = %book.osis_id, chapters = counts.len(), "importing from verse source");
    let mut dispatcher = TagDispatcher::new(dialect, book.clone(), options);

    for (chapter, &count) in (1u32..).zip(counts.iter()) {
        dispatcher.parser_mut().start_chapter(chapter)?;
        for verse in 0..=count {
            let Some(text) = source.fetch_verse_text(book, chapter, verse)? else {
                continue;
            };
            if text.trim().is_empty() {
                continue;
            }
            if verse > 0 {
                dispatcher.parser_mut().start_verse(VerseMark::new(verse))?;
            }
            dispatcher.feed(&text)?;
        }
    }
    Ok(dispatcher.finish()?)
}
