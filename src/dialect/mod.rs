//! Markup dialects.
//!
//! A dialect classifies each opening tag of its markup into a [`TagAction`];
//! the [`TagDispatcher`] carries the action out on a [`StructuralParser`].
//! Closing tags and text are forwarded unchanged.

mod osis;
mod usx;

pub use osis::{Osis, parse_osis_ref};
pub use usx::{Usx, parse_usx_loc};

use std::collections::HashSet;

use crate::error::{ParseErrorKind, Result};
use crate::model::{BookMeta, BookTree, GroupKind, GroupModifier, RangeRef};
use crate::parser::{
    ParseResult, ParserOptions, StructuralParser, TagFlags, TitleTarget, VerseMark,
};
use crate::xml::{MarkupEvent, MarkupEvents, OpenTag};

/// What an opening tag does to the document structure.
#[derive(Debug, Clone, PartialEq)]
pub enum TagAction {
    /// Pass the tag's content through.
    Ignore,
    /// Discard all text below the tag.
    SkipContent,
    /// A tag the dialect does not know.
    Unsupported,
    /// Open a section at the given heading rank.
    Section { tag_level: usize },
    /// Open a section whose heading is the tag's text.
    SectionHeading { tag_level: usize },
    Paragraph { milestone: bool },
    CloseParagraph,
    LineGroup { milestone: bool },
    CloseLineGroup,
    /// Close the current line group; the next line starts a new one.
    StanzaBreak,
    Line {
        level: u32,
        kind: GroupKind,
        milestone: bool,
    },
    /// A poetry line consisting of a selah interjection.
    SelaLine { level: u32 },
    CloseLine,
    Group {
        kind: GroupKind,
        modifier: Option<GroupModifier>,
    },
    /// Canonical heading text that is part of the verse flow.
    CanonicalTitle,
    Title(TitleTarget),
    SectionReferences,
    Introduction,
    IntroductionParagraph,
    IntroductionTitle,
    Note {
        key: Option<String>,
        note_type: Option<String>,
    },
    CrossReferenceNote { key: Option<String> },
    Reference(RangeRef),
    Strongs(Vec<String>),
    ChapterStart(u32),
    ChapterEnd,
    VerseStart(VerseMark),
    VerseEnd,
    QuoteMarker(String),
    LineBreak,
}

/// Where a book starts and how far it extends.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BookBoundary {
    pub book_id: String,
    pub scope: BookScope,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BookScope {
    /// The book is the content of the element.
    Element,
    /// The book element is a marker; the book runs until its parent closes.
    Parent,
}

/// A source markup dialect.
pub trait Dialect {
    fn name(&self) -> &'static str;

    /// Heading tags (or styles) from the outermost rank to the innermost.
    fn section_tags(&self) -> &'static [&'static str];

    /// Heading rank used for sections opened implicitly by a heading.
    fn default_heading_level(&self) -> usize;

    /// Classify an opening tag inside `book`.
    fn classify(&self, tag: &OpenTag, book: &BookMeta) -> std::result::Result<TagAction, ParseErrorKind>;

    /// The book an element starts, if it starts one.
    fn book_boundary(&self, tag: &OpenTag) -> Option<BookBoundary>;

    /// Heading rank of a section tag name.
    fn section_level(&self, name: &str) -> Option<usize> {
        self.section_tags().iter().position(|t| *t == name)
    }
}

/// Drives a [`StructuralParser`] from the markup events of one book.
#[derive(Debug)]
pub struct TagDispatcher<D> {
    dialect: D,
    parser: StructuralParser,
    warned: HashSet<String>,
}

impl<D: Dialect> TagDispatcher<D> {
    pub fn new(dialect: D, book: BookMeta, options: ParserOptions) -> Self {
        Self {
            dialect,
            parser: StructuralParser::new(book, options),
            warned: HashSet::new(),
        }
    }

    pub fn parser(&self) -> &StructuralParser {
        &self.parser
    }

    pub fn parser_mut(&mut self) -> &mut StructuralParser {
        &mut self.parser
    }

    pub fn handle(&mut self, event: MarkupEvent) -> ParseResult<()> {
        match event {
            MarkupEvent::Open(tag) => self.open(&tag),
            MarkupEvent::Text(text) => self.parser.text(&text),
            MarkupEvent::Close(name) => self.parser.close_tag(&name),
        }
    }

    /// Tokenize a markup fragment and handle its events.
    pub fn feed(&mut self, xml: &str) -> Result<()> {
        for event in MarkupEvents::new(xml) {
            self.handle(event?)?;
        }
        Ok(())
    }

    pub fn finish(self) -> ParseResult<BookTree> {
        self.parser.finish()
    }

    fn open(&mut self, tag: &OpenTag) -> ParseResult<()> {
        if self.parser.skipping_text() {
            let flags = TagFlags {
                skip_text: true,
                ..Default::default()
            };
            self.parser.begin_tag(&tag.name, tag.self_closing, flags);
            self.parser.end_tag_open();
            return Ok(());
        }

        let action = self
            .dialect
            .classify(tag, self.parser.book())
            .map_err(|kind| self.parser.error(kind))?;
        let action = match action {
            TagAction::Unsupported if self.parser.options().strict_tags => {
                return Err(self
                    .parser
                    .error(ParseErrorKind::UnsupportedTag(describe(tag))));
            }
            TagAction::Unsupported => {
                let name = describe(tag);
                if self.warned.insert(name.clone()) {
                    tracing::warn!(dialect = self.dialect.name(), tag = %name, "unsupported tag, content passed through");
                }
                TagAction::Ignore
            }
            other => other,
        };

        let flags = flags_for(&action, tag);
        self.parser.begin_tag(&tag.name, tag.self_closing, flags);
        let result = self.apply(action);
        self.parser.end_tag_open();
        result
    }

    fn apply(&mut self, action: TagAction) -> ParseResult<()> {
        let p = &mut self.parser;
        match action {
            TagAction::Ignore | TagAction::SkipContent | TagAction::Unsupported => {}
            TagAction::Section { tag_level } => {
                p.open_section(tag_level)?;
            }
            TagAction::SectionHeading { tag_level } => {
                p.open_section(tag_level)?;
                p.open_title(TitleTarget::SectionTitle, tag_level)?;
            }
            TagAction::Paragraph { milestone } => {
                p.open_paragraph(!milestone)?;
            }
            TagAction::CloseParagraph => p.close_paragraph()?,
            TagAction::LineGroup { milestone } => {
                p.open_line_group(!milestone)?;
            }
            TagAction::CloseLineGroup | TagAction::StanzaBreak => p.close_line_group()?,
            TagAction::Line {
                level,
                kind,
                milestone,
            } => {
                p.open_line(level, kind, !milestone)?;
            }
            TagAction::SelaLine { level } => {
                p.open_line(level, GroupKind::Line, true)?;
                p.open_group(GroupKind::Sela, None)?;
            }
            TagAction::CloseLine => p.close_line()?,
            TagAction::Group { kind, modifier } => {
                p.open_group(kind, modifier)?;
            }
            TagAction::CanonicalTitle => {
                p.open_group(GroupKind::Title, None)?;
            }
            TagAction::Title(target) => {
                p.open_title(target, self.dialect.default_heading_level())?;
            }
            TagAction::SectionReferences => p.open_section_references()?,
            TagAction::Introduction => {
                p.open_introduction()?;
            }
            TagAction::IntroductionParagraph => {
                p.open_introduction_paragraph()?;
            }
            TagAction::IntroductionTitle => {
                p.open_introduction_title()?;
            }
            TagAction::Note { key, note_type } => p.open_note(key, note_type)?,
            TagAction::CrossReferenceNote { key } => p.open_cross_reference_note(key)?,
            TagAction::Reference(range) => {
                p.open_reference(range)?;
            }
            TagAction::Strongs(codes) => p.buffer_strongs(codes)?,
            TagAction::ChapterStart(chapter) => p.start_chapter(chapter)?,
            TagAction::ChapterEnd => p.end_chapter()?,
            TagAction::VerseStart(mark) => p.start_verse(mark)?,
            TagAction::VerseEnd => p.end_verse()?,
            TagAction::QuoteMarker(marker) => p.insert_marker(&marker)?,
            TagAction::LineBreak => p.mark_linebreak(),
        }
        Ok(())
    }
}

fn flags_for(action: &TagAction, tag: &OpenTag) -> TagFlags {
    let mut flags = TagFlags::default();
    match action {
        TagAction::SkipContent => flags.skip_text = true,
        TagAction::Group {
            kind: GroupKind::DivineName,
            ..
        } => flags.uppercase = true,
        TagAction::Reference(range) => flags.reference = Some(range.clone()),
        TagAction::Strongs(codes) => flags.strongs = !codes.is_empty(),
        TagAction::VerseStart(_) => flags.verse = !tag.self_closing,
        TagAction::ChapterStart(_) => flags.chapter = !tag.self_closing,
        _ => {}
    }
    flags
}

/// Tag name with its distinguishing attribute, for messages.
fn describe(tag: &OpenTag) -> String {
    match tag.attr("style").or_else(|| tag.attr("type")) {
        Some(style) => format!("{} {}", tag.name, style),
        None => tag.name.clone(),
    }
}

/// Parse a chapter or verse number attribute.
pub(crate) fn parse_number(value: &str) -> std::result::Result<u32, ParseErrorKind> {
    value
        .trim()
        .parse()
        .map_err(|_| ParseErrorKind::InvalidNumber(value.to_string()))
}

/// Parse a verse number such as `5`, `5a` or `5-7` into a mark.
pub(crate) fn parse_verse_number(value: &str) -> std::result::Result<VerseMark, ParseErrorKind> {
    let invalid = || ParseErrorKind::InvalidNumber(value.to_string());
    let (start, end) = match value.split_once('-') {
        Some((start, end)) => (start, Some(end)),
        None => (value, None),
    };
    let (verse, subverse) = crate::model::parse_verse_token(start).ok_or_else(invalid)?;
    let mut mark = VerseMark::new(verse).with_subverse(subverse);
    if let Some(end) = end {
        let digits: String = end.trim().chars().take_while(char::is_ascii_digit).collect();
        let through = digits.parse().map_err(|_| invalid())?;
        if through > verse {
            mark = mark.through(through);
        }
    }
    Ok(mark)
}
