//! Error types for lectio operations.

use std::fmt;

use thiserror::Error;

/// Errors that can occur while importing Bible markup or loading rule tables.
#[derive(Error, Debug)]
pub enum Error {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("XML parsing error: {0}")]
    Xml(#[from] quick_xml::Error),

    #[error(transparent)]
    Parse(#[from] Box<ParseError>),

    #[error("unknown book {0:?}")]
    UnknownBook(String),

    #[error("versification table line {line}: {message}")]
    Versification { line: usize, message: String },

    #[error("unknown phrase macro %{0}% in versification note")]
    UnknownPhrase(String),

    #[error("verse source error: {0}")]
    Source(String),
}

pub type Result<T> = std::result::Result<T, Error>;

impl From<ParseError> for Error {
    fn from(err: ParseError) -> Self {
        Error::Parse(Box::new(err))
    }
}

/// A fatal error raised while building one book's content tree.
///
/// Carries the coordinate the parser had reached and a rendering of the
/// container stack so the offending markup can be located in the source.
#[derive(Debug, Clone, PartialEq)]
pub struct ParseError {
    pub kind: ParseErrorKind,
    pub book: String,
    pub chapter: u32,
    pub verse: u32,
    pub stack: String,
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} at {} {}:{} (container stack: {})",
            self.kind, self.book, self.chapter, self.verse, self.stack
        )
    }
}

impl std::error::Error for ParseError {}

/// What went wrong while parsing.
///
/// Structural kinds describe markup the state machine cannot place; data
/// kinds describe values (book ids, references, verse numbers) that cannot
/// be resolved. Both abort the current book.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseErrorKind {
    #[error("text outside of paragraph: {0:?}")]
    TextOutsideParagraph(String),

    #[error("text without chapter/verse context: {0:?}")]
    MissingVerseContext(String),

    #[error("section started outside of root or section")]
    SectionOutsideRoot,

    #[error("paragraph opened while another paragraph is still open")]
    NestedParagraph,

    #[error("note opened inside another note")]
    NestedNote,

    #[error("closing tag </{0}> has no matching open tag")]
    UnmatchedClose(String),

    #[error("unbalanced close </{found}> while <{expected}> is open")]
    UnbalancedClose { expected: String, found: String },

    #[error("tags still open at end of book: {0}")]
    UnclosedTags(String),

    #[error("no open {0} to close")]
    NothingToClose(&'static str),

    #[error("{0} cannot be placed inside {1}")]
    MisplacedNode(&'static str, &'static str),

    #[error("Strong's buffer filled while another is still pending")]
    DuplicateStrongsBuffer,

    #[error("cross reference buffer filled while another is still pending")]
    DuplicateCrossReferenceBuffer,

    #[error("verse join through {through} is not a range after verse {verse}")]
    InvalidVerseJoin { verse: u32, through: u32 },

    #[error("unknown book id {0:?}")]
    UnknownBook(String),

    #[error("reference belongs to book {found:?}, expected {expected:?}")]
    BookMismatch { expected: String, found: String },

    #[error("unresolvable reference {0:?}")]
    InvalidReference(String),

    #[error("invalid chapter or verse number {0:?}")]
    InvalidNumber(String),

    #[error("verse {found} follows verse {current}")]
    VerseOutOfOrder { current: u32, found: u32 },

    #[error("chapter {found} follows chapter {current}")]
    ChapterOutOfOrder { current: u32, found: u32 },

    #[error("unsupported tag <{0}>")]
    UnsupportedTag(String),
}

impl ParseErrorKind {
    /// Whether this is a data error (unresolvable value) rather than a
    /// structural one.
    pub fn is_data_error(&self) -> bool {
        matches!(
            self,
            ParseErrorKind::UnknownBook(_)
                | ParseErrorKind::BookMismatch { .. }
                | ParseErrorKind::InvalidReference(_)
                | ParseErrorKind::InvalidNumber(_)
                | ParseErrorKind::VerseOutOfOrder { .. }
                | ParseErrorKind::ChapterOutOfOrder { .. }
                | ParseErrorKind::InvalidVerseJoin { .. }
        )
    }
}
