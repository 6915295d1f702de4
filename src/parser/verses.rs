//! Chapter and verse tracking, including joined verses.

use super::container::ContainerKind;
use super::{ParseResult, StructuralParser};
use crate::error::ParseErrorKind;
use crate::model::{ContentNode, Coordinate, Phrase};

/// A verse start as reported by a dialect.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VerseMark {
    /// Chapter named by the marker, when it carries one.
    pub chapter: Option<u32>,
    pub verse: u32,
    pub subverse: Option<u32>,
    /// Last verse of a joined range (`5-7` => `Some(7)`).
    pub through: Option<u32>,
}

impl VerseMark {
    pub fn new(verse: u32) -> Self {
        Self {
            chapter: None,
            verse,
            subverse: None,
            through: None,
        }
    }

    pub fn in_chapter(mut self, chapter: u32) -> Self {
        self.chapter = Some(chapter);
        self
    }

    pub fn with_subverse(mut self, subverse: Option<u32>) -> Self {
        self.subverse = subverse;
        self
    }

    pub fn through(mut self, through: u32) -> Self {
        self.through = Some(through);
        self
    }
}

/// Most verses a join may add; the longest chapter (Psalm 119) has 176.
const MAX_JOIN_SPAN: u32 = 176;

/// A verse range whose later verses still need placeholders.
#[derive(Debug, Clone)]
pub(crate) struct PendingJoin {
    anchor: Coordinate,
    through: u32,
}

impl StructuralParser {
    /// Start a chapter. Repeating the current chapter is ignored; going
    /// backwards is a data error.
    pub fn start_chapter(&mut self, chapter: u32) -> ParseResult<()> {
        self.resolve_join()?;
        self.close_detached_introduction()?;
        if chapter == self.chapter {
            tracing::debug!(chapter, "redundant chapter marker");
            return Ok(());
        }
        if chapter < self.chapter {
            return Err(self.error(ParseErrorKind::ChapterOutOfOrder {
                current: self.chapter,
                found: chapter,
            }));
        }
        tracing::trace!(book = %self.book.osis_id, chapter, "chapter");
        self.chapter = chapter;
        self.verse = 0;
        self.subverse = None;
        Ok(())
    }

    pub fn end_chapter(&mut self) -> ParseResult<()> {
        self.resolve_join()
    }

    /// Start a verse.
    ///
    /// A marker for the verse already current is ignored, a later subverse
    /// letter continues the same verse, and any other marker must move
    /// forward. A marker with `through` set starts a verse join.
    pub fn start_verse(&mut self, mark: VerseMark) -> ParseResult<()> {
        if let Some(chapter) = mark.chapter
            && chapter != self.chapter
        {
            self.start_chapter(chapter)?;
        }
        if self.chapter == 0 {
            return Err(self.error(ParseErrorKind::MissingVerseContext(format!(
                "verse {} before any chapter",
                mark.verse
            ))));
        }
        self.close_detached_introduction()?;

        if mark.verse == self.verse {
            if mark.subverse == self.subverse {
                if let Some(through) = mark.through
                    && through > mark.verse
                    && self.join.is_none()
                {
                    return self.start_verse_join(through);
                }
                tracing::debug!(verse = mark.verse, "redundant verse marker");
                return Ok(());
            }
            if mark.subverse > self.subverse && self.join.is_none() {
                self.subverse = mark.subverse;
                return Ok(());
            }
        }

        self.resolve_join()?;
        if mark.verse <= self.verse {
            return Err(self.error(ParseErrorKind::VerseOutOfOrder {
                current: self.verse,
                found: mark.verse,
            }));
        }
        self.verse = mark.verse;
        self.subverse = mark.subverse;

        match mark.through {
            Some(through) if through > mark.verse => self.start_verse_join(through),
            Some(through) if through < mark.verse => {
                Err(self.error(ParseErrorKind::InvalidVerseJoin {
                    verse: mark.verse,
                    through,
                }))
            }
            _ => Ok(()),
        }
    }

    /// End the current verse, resolving a pending join.
    pub fn end_verse(&mut self) -> ParseResult<()> {
        self.resolve_join()
    }

    /// Record that the current verse also covers every verse through
    /// `through`. Placeholders are emitted when the verse ends.
    pub fn start_verse_join(&mut self, through: u32) -> ParseResult<()> {
        if through <= self.verse || through - self.verse > MAX_JOIN_SPAN {
            return Err(self.error(ParseErrorKind::InvalidVerseJoin {
                verse: self.verse,
                through,
            }));
        }
        self.resolve_join()?;
        self.join = Some(PendingJoin {
            anchor: self.coordinate(),
            through,
        });
        Ok(())
    }

    /// Emit placeholders for a pending join and advance to its last verse.
    pub(super) fn resolve_join(&mut self) -> ParseResult<()> {
        let Some(join) = self.join.take() else {
            return Ok(());
        };
        let Some(index) = self.containers.iter().rposition(|c| {
            matches!(
                c.kind,
                ContainerKind::Root(_) | ContainerKind::Section { .. } | ContainerKind::Group(_)
            )
        }) else {
            return Err(self.error(ParseErrorKind::NothingToClose("verse join")));
        };
        let Some(contents) = self.containers[index].kind.contents_mut() else {
            return Err(self.error(ParseErrorKind::NothingToClose("verse join")));
        };
        for verse in join.anchor.verse + 1..=join.through {
            contents.push(ContentNode::Phrase(Phrase::placeholder(
                join.anchor.chapter,
                verse,
                join.anchor.clone(),
            )));
        }
        tracing::trace!(anchor = %join.anchor, through = join.through, "joined verses");
        if self.chapter == join.anchor.chapter {
            self.verse = join.through;
            self.subverse = None;
        }
        Ok(())
    }
}
