//! OSIS front end.

use super::{BookBoundary, BookScope, Dialect, TagAction, parse_number, parse_verse_number};
use crate::books::find_book;
use crate::error::ParseErrorKind;
use crate::model::{BookMeta, GroupKind, GroupModifier, RangeRef, parse_verse_token};
use crate::parser::{TitleTarget, VerseMark};
use crate::strongs;
use crate::xml::OpenTag;

type Classified = Result<TagAction, ParseErrorKind>;

const SECTION_TAGS: &[&str] = &["majorSection", "section", "subSection"];

/// OSIS element names.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum OsisElement {
    Div,
    Chapter,
    Verse,
    P,
    Lg,
    L,
    Lb,
    Title,
    Note,
    Reference,
    W,
    DivineName,
    TransChange,
    Hi,
    Q,
    Seg,
    Milestone,
    List,
    Item,
    A,
    Speaker,
    /// Elements whose content is not Bible text.
    Skipped,
    /// Elements whose content passes through without structural meaning.
    Transparent,
    Unknown,
}

impl OsisElement {
    fn from_name(name: &str) -> Self {
        match name {
            "div" => OsisElement::Div,
            "chapter" => OsisElement::Chapter,
            "verse" => OsisElement::Verse,
            "p" => OsisElement::P,
            "lg" => OsisElement::Lg,
            "l" => OsisElement::L,
            "lb" => OsisElement::Lb,
            "title" => OsisElement::Title,
            "note" => OsisElement::Note,
            "reference" => OsisElement::Reference,
            "w" => OsisElement::W,
            "divineName" => OsisElement::DivineName,
            "transChange" => OsisElement::TransChange,
            "hi" => OsisElement::Hi,
            "q" => OsisElement::Q,
            "seg" => OsisElement::Seg,
            "milestone" => OsisElement::Milestone,
            "list" => OsisElement::List,
            "item" => OsisElement::Item,
            "a" => OsisElement::A,
            "speaker" => OsisElement::Speaker,
            "header" | "figure" | "index" | "caption" => OsisElement::Skipped,
            "osis" | "osisText" | "name" | "foreign" | "abbr" | "date" | "inscription"
            | "mentioned" | "catchWord" | "rdg" | "table" | "row" | "cell" | "label" => {
                OsisElement::Transparent
            }
            _ => OsisElement::Unknown,
        }
    }
}

/// The OSIS dialect.
#[derive(Debug, Clone, Copy, Default)]
pub struct Osis;

impl Dialect for Osis {
    fn name(&self) -> &'static str {
        "osis"
    }

    fn section_tags(&self) -> &'static [&'static str] {
        SECTION_TAGS
    }

    fn default_heading_level(&self) -> usize {
        1
    }

    fn classify(&self, tag: &OpenTag, book: &BookMeta) -> Classified {
        let milestone_start = tag.attr("sID").is_some();
        let milestone_end = tag.attr("eID").is_some();

        match OsisElement::from_name(&tag.name) {
            OsisElement::Div => self.classify_div(tag, milestone_start, milestone_end),
            OsisElement::Chapter => classify_chapter(tag, book, milestone_end),
            OsisElement::Verse => classify_verse(tag, book, milestone_end),
            OsisElement::P if milestone_end => Ok(TagAction::CloseParagraph),
            OsisElement::P => Ok(TagAction::Paragraph {
                milestone: milestone_start,
            }),
            OsisElement::Lg if milestone_end => Ok(TagAction::CloseLineGroup),
            OsisElement::Lg => Ok(TagAction::LineGroup {
                milestone: milestone_start,
            }),
            OsisElement::L if milestone_end => Ok(TagAction::CloseLine),
            OsisElement::L => {
                let level = tag.non_empty_attr("level").and_then(|l| l.parse().ok()).unwrap_or(1);
                if tag.attr("type") == Some("selah") {
                    Ok(TagAction::SelaLine { level })
                } else {
                    Ok(TagAction::Line {
                        level,
                        kind: GroupKind::Line,
                        milestone: milestone_start,
                    })
                }
            }
            OsisElement::Lb => Ok(TagAction::LineBreak),
            OsisElement::Title if milestone_start || milestone_end => Ok(TagAction::Ignore),
            OsisElement::Title => Ok(classify_title(tag)),
            OsisElement::Note => Ok(classify_note(tag)),
            OsisElement::Reference => match tag.non_empty_attr("osisRef") {
                Some(osis_ref) => parse_osis_ref(osis_ref).map(TagAction::Reference),
                None => Ok(TagAction::Ignore),
            },
            OsisElement::W => Ok(match tag.non_empty_attr("lemma") {
                Some(lemma) => TagAction::Strongs(strongs::normalize(lemma)),
                None => TagAction::Ignore,
            }),
            OsisElement::DivineName => Ok(group(GroupKind::DivineName)),
            OsisElement::TransChange => Ok(group(GroupKind::TranslationChange)),
            OsisElement::Hi => Ok(match tag.attr("type") {
                Some("bold" | "b") => group(GroupKind::Bold),
                Some("italic" | "i") => group(GroupKind::Italic),
                Some("emphasis" | "em") => group(GroupKind::Emphasis),
                _ => TagAction::Ignore,
            }),
            OsisElement::Q => Ok(classify_quote(tag, milestone_start || milestone_end)),
            OsisElement::Seg if tag.attr("type") == Some("x-selah") => {
                Ok(group(GroupKind::Sela))
            }
            OsisElement::Milestone => Ok(match tag.attr("type") {
                Some("x-p") => TagAction::Paragraph { milestone: true },
                Some("line") => TagAction::LineBreak,
                _ => TagAction::Ignore,
            }),
            OsisElement::List => Ok(TagAction::LineGroup { milestone: false }),
            OsisElement::Item => Ok(TagAction::Line {
                level: 1,
                kind: GroupKind::UnorderedListItem,
                milestone: false,
            }),
            OsisElement::A => Ok(match tag.non_empty_attr("href") {
                Some(href) => TagAction::Group {
                    kind: GroupKind::Link,
                    modifier: Some(GroupModifier::LinkTarget(href.to_string())),
                },
                None => TagAction::Ignore,
            }),
            OsisElement::Speaker => Ok(TagAction::Title(TitleTarget::SectionSubTitle)),
            OsisElement::Skipped => Ok(TagAction::SkipContent),
            OsisElement::Seg | OsisElement::Transparent => Ok(TagAction::Ignore),
            OsisElement::Unknown => Ok(TagAction::Unsupported),
        }
    }

    fn book_boundary(&self, tag: &OpenTag) -> Option<BookBoundary> {
        let is_book_div =
            OsisElement::from_name(&tag.name) == OsisElement::Div && tag.attr("type") == Some("book");
        if !is_book_div {
            return None;
        }
        tag.non_empty_attr("osisID").map(|id| BookBoundary {
            book_id: id.to_string(),
            scope: BookScope::Element,
        })
    }
}

impl Osis {
    fn classify_div(&self, tag: &OpenTag, milestone_start: bool, milestone_end: bool) -> Classified {
        let div_type = tag.attr("type").unwrap_or_default();
        if let Some(tag_level) = self.section_level(div_type) {
            // Sections close lazily when the next one starts.
            return Ok(if milestone_end {
                TagAction::Ignore
            } else {
                TagAction::Section { tag_level }
            });
        }
        Ok(match div_type {
            "paragraph" if milestone_end => TagAction::CloseParagraph,
            "paragraph" => TagAction::Paragraph {
                milestone: milestone_start,
            },
            "introduction" | "preface" if !milestone_start && !milestone_end => {
                TagAction::Introduction
            }
            "colophon" | "titlePage" | "front" | "back" => TagAction::SkipContent,
            _ => TagAction::Ignore,
        })
    }
}

fn group(kind: GroupKind) -> TagAction {
    TagAction::Group {
        kind,
        modifier: None,
    }
}

fn classify_title(tag: &OpenTag) -> TagAction {
    if tag.attr("canonical") == Some("true") {
        return TagAction::CanonicalTitle;
    }
    match tag.attr("type") {
        Some("main" | "chapter" | "runningHead" | "toc" | "x-chapterLabel") => {
            TagAction::SkipContent
        }
        Some("psalm" | "acrostic") => TagAction::CanonicalTitle,
        Some("sub") => TagAction::Title(TitleTarget::SectionSubTitle),
        Some("parallel") => TagAction::SectionReferences,
        _ => TagAction::Title(TitleTarget::SectionTitle),
    }
}

fn classify_note(tag: &OpenTag) -> TagAction {
    let key = tag.non_empty_attr("n").map(str::to_string);
    match tag.attr("type") {
        Some("crossReference") => TagAction::CrossReferenceNote { key },
        Some("x-strongsMarkup") => TagAction::SkipContent,
        note_type => TagAction::Note {
            key,
            note_type: note_type.map(str::to_string),
        },
    }
}

fn classify_quote(tag: &OpenTag, milestone: bool) -> TagAction {
    if !milestone && tag.attr("who") == Some("Jesus") {
        return TagAction::Group {
            kind: GroupKind::Quote,
            modifier: Some(GroupModifier::JesusSpeech),
        };
    }
    match tag.non_empty_attr("marker") {
        Some(marker) => TagAction::QuoteMarker(marker.to_string()),
        None => TagAction::Ignore,
    }
}

fn classify_chapter(tag: &OpenTag, book: &BookMeta, milestone_end: bool) -> Classified {
    if milestone_end {
        return Ok(TagAction::ChapterEnd);
    }
    if let Some(id) = tag.non_empty_attr("osisID") {
        let point = OsisPoint::parse(id)?;
        point.check_book(book)?;
        return point
            .chapter
            .map(TagAction::ChapterStart)
            .ok_or_else(|| ParseErrorKind::InvalidReference(id.to_string()));
    }
    match tag.non_empty_attr("n") {
        Some(n) => parse_number(n).map(TagAction::ChapterStart),
        None => Ok(TagAction::Ignore),
    }
}

fn classify_verse(tag: &OpenTag, book: &BookMeta, milestone_end: bool) -> Classified {
    if milestone_end {
        return Ok(TagAction::VerseEnd);
    }
    if let Some(ids) = tag.non_empty_attr("osisID") {
        return verse_mark(ids, book).map(TagAction::VerseStart);
    }
    match tag.non_empty_attr("n") {
        Some(n) => parse_verse_number(n).map(TagAction::VerseStart),
        None => Ok(TagAction::Ignore),
    }
}

/// Verse mark from an `osisID` list such as `Gen.1.1 Gen.1.2 Gen.1.3`.
/// A list spanning several verses of one chapter is a verse join.
fn verse_mark(ids: &str, book: &BookMeta) -> Result<VerseMark, ParseErrorKind> {
    let invalid = || ParseErrorKind::InvalidReference(ids.to_string());
    let mut points = ids.split_whitespace().map(OsisPoint::parse);
    let first = points.next().ok_or_else(invalid)??;
    first.check_book(book)?;
    let (Some(chapter), Some((verse, subverse))) = (first.chapter, first.verse) else {
        return Err(invalid());
    };
    let mut mark = VerseMark::new(verse)
        .in_chapter(chapter)
        .with_subverse(subverse);

    if let Some(last) = points.last() {
        let last = last?;
        match (last.chapter, last.verse) {
            (Some(c), Some((v, _))) if c == chapter && v > verse => mark = mark.through(v),
            _ => tracing::debug!(%ids, "verse list not joinable, using first verse"),
        }
    }
    Ok(mark)
}

/// One `Book.Chapter.Verse` point of an OSIS reference.
#[derive(Debug, Clone, PartialEq)]
struct OsisPoint {
    book: String,
    chapter: Option<u32>,
    verse: Option<(u32, Option<u32>)>,
}

impl OsisPoint {
    fn parse(value: &str) -> Result<Self, ParseErrorKind> {
        let invalid = || ParseErrorKind::InvalidReference(value.to_string());
        let mut parts = value.trim().split('.');
        let book_id = parts.next().filter(|b| !b.is_empty()).ok_or_else(invalid)?;
        let book = find_book(book_id)
            .ok_or_else(|| ParseErrorKind::UnknownBook(book_id.to_string()))?;
        let chapter = parts
            .next()
            .map(|c| c.parse::<u32>().map_err(|_| invalid()))
            .transpose()?;
        let verse = parts
            .next()
            .map(|v| parse_verse_token(v).ok_or_else(invalid))
            .transpose()?;
        if parts.next().is_some() {
            return Err(invalid());
        }
        Ok(Self {
            book: book.osis_id.to_string(),
            chapter,
            verse,
        })
    }

    fn check_book(&self, book: &BookMeta) -> Result<(), ParseErrorKind> {
        if self.book == book.osis_id {
            Ok(())
        } else {
            Err(ParseErrorKind::BookMismatch {
                expected: book.osis_id.clone(),
                found: self.book.clone(),
            })
        }
    }
}

/// Parse an `osisRef` attribute (`Gen.1.1`, `Gen.1.1-Gen.1.5`,
/// `Bible:Gen.1`, ...) into a range. Only the first reference of a
/// space-separated list is used.
pub fn parse_osis_ref(value: &str) -> Result<RangeRef, ParseErrorKind> {
    let invalid = || ParseErrorKind::InvalidReference(value.to_string());
    let first = value.split_whitespace().next().ok_or_else(invalid)?;
    let reference = first.rsplit_once(':').map_or(first, |(_, r)| r);
    let (start, end) = match reference.split_once('-') {
        Some((start, end)) => (start, Some(end)),
        None => (reference, None),
    };

    let start = OsisPoint::parse(start)?;
    let chapter = start.chapter.ok_or_else(invalid)?;
    let range = match start.verse {
        Some((verse, subverse)) => {
            RangeRef::verse(start.book.clone(), chapter, verse).with_subverse(subverse)
        }
        None => RangeRef::chapter(start.book.clone(), chapter),
    };
    let Some(end) = end else {
        return Ok(range);
    };

    let (end_chapter, end_verse) = if end.starts_with(|c: char| c.is_ascii_digit()) {
        let numbers: Vec<u32> = end
            .split('.')
            .map(|n| parse_verse_token(n).map(|(v, _)| v).ok_or_else(invalid))
            .collect::<Result<_, _>>()?;
        match (numbers.as_slice(), range.verse) {
            ([v], Some(_)) => (None, Some(*v)),
            ([c], None) => (Some(*c), None),
            ([c, v], _) => (Some(*c), Some(*v)),
            _ => return Err(invalid()),
        }
    } else {
        let end = OsisPoint::parse(end)?;
        if end.book != start.book {
            return Err(invalid());
        }
        (end.chapter, end.verse.map(|(v, _)| v))
    };
    Ok(range.through(end_chapter, end_verse))
}
