//! Structural parser core.
//!
//! A dialect-agnostic state machine that turns a stream of structural
//! operations (open a section, open a paragraph, start a verse, append text,
//! close a tag...) into one book's [`BookTree`].
//!
//! Two stacks are maintained:
//!
//! - the **container stack** holds the nodes under construction; popping a
//!   container finalizes it and attaches it to its parent,
//! - the **tag stack** mirrors the source markup; each entry records the
//!   containers it opened so closing the tag closes exactly those.
//!
//! Containers opened by milestones (and automatically opened sections, line
//! groups or paragraphs) are *detached*: no tag owns them and they stay open
//! until a later structural event closes them lazily.

mod buffers;
mod container;
mod options;
mod structure;
mod tags;
mod text;
mod verses;

pub use container::{ContainerId, TitleTarget};
pub use options::ParserOptions;
pub use tags::{HealStep, ReopenGroup, TagFlags};
pub use verses::VerseMark;

use container::{ContainerKind, OpenContainer};
use tags::{PendingTag, TagEntry};

use crate::error::{ParseError, ParseErrorKind};
use crate::model::{BookMeta, BookTree, ContentNode, Coordinate, DocumentRoot, Note};

/// Result type for parser operations.
pub type ParseResult<T> = std::result::Result<T, ParseError>;

/// Builds the content tree of one book.
#[derive(Debug)]
pub struct StructuralParser {
    book: BookMeta,
    options: ParserOptions,
    containers: Vec<OpenContainer>,
    tags: Vec<TagEntry>,
    next_id: u32,
    /// Set while the actions of an open tag run; containers pushed then are
    /// recorded on the top tag entry.
    opening: bool,
    pending: Option<PendingTag>,
    chapter: u32,
    verse: u32,
    subverse: Option<u32>,
    join: Option<verses::PendingJoin>,
    strongs: Option<Vec<String>>,
    cross_references: Option<buffers::CrossReferenceBuffer>,
    notes: Vec<Note>,
    note_count: u32,
    cross_reference_count: u32,
    introduction: Option<DocumentRoot>,
}

impl StructuralParser {
    pub fn new(book: BookMeta, options: ParserOptions) -> Self {
        Self {
            book,
            options,
            containers: vec![OpenContainer {
                id: ContainerId(0),
                kind: ContainerKind::Root(Vec::new()),
            }],
            tags: vec![TagEntry::sentinel()],
            next_id: 1,
            opening: false,
            pending: None,
            chapter: 0,
            verse: 0,
            subverse: None,
            join: None,
            strongs: None,
            cross_references: None,
            notes: Vec::new(),
            note_count: 0,
            cross_reference_count: 0,
            introduction: None,
        }
    }

    pub fn book(&self) -> &BookMeta {
        &self.book
    }

    pub fn options(&self) -> &ParserOptions {
        &self.options
    }

    pub fn chapter(&self) -> u32 {
        self.chapter
    }

    pub fn verse(&self) -> u32 {
        self.verse
    }

    pub fn subverse(&self) -> Option<u32> {
        self.subverse
    }

    /// The current verse position.
    pub fn coordinate(&self) -> Coordinate {
        Coordinate {
            book_id: self.book.osis_id.clone(),
            chapter: self.chapter,
            verse: self.verse,
            subverse: self.subverse,
        }
    }

    /// Number of open containers, the root included.
    pub fn container_depth(&self) -> usize {
        self.containers.len()
    }

    /// Number of open tags, not counting the bottom sentinel.
    pub fn tag_depth(&self) -> usize {
        self.tags.len() - 1
    }

    /// Human-readable rendering of the container stack.
    pub fn stack_dump(&self) -> String {
        self.containers
            .iter()
            .map(|c| c.kind.label())
            .collect::<Vec<_>>()
            .join(" > ")
    }

    /// Build an error carrying the current position and stack.
    pub fn error(&self, kind: ParseErrorKind) -> ParseError {
        ParseError {
            kind,
            book: self.book.osis_id.clone(),
            chapter: self.chapter,
            verse: self.verse,
            stack: self.stack_dump(),
        }
    }

    /// Close every open container and return the finished book.
    ///
    /// A self-closing tag whose close never arrived is closed first; any
    /// other tag still open is an error. Notes and cross references still
    /// buffered attach to the last phrase of the book.
    pub fn finish(mut self) -> ParseResult<BookTree> {
        if self.pending.is_some() && self.top_tag_is_pending() {
            self.pop_tag()?;
        }
        if self.tags.len() > 1 {
            let open: Vec<&str> = self.tags[1..].iter().map(|t| t.name.as_str()).collect();
            return Err(self.error(ParseErrorKind::UnclosedTags(open.join(", "))));
        }
        self.resolve_join()?;
        self.close_down_to(1)?;
        self.flush_trailing_buffers();

        let contents = match self.containers.pop() {
            Some(OpenContainer {
                kind: ContainerKind::Root(contents),
                ..
            }) => contents,
            _ => return Err(self.error(ParseErrorKind::NothingToClose("root"))),
        };
        tracing::debug!(
            book = %self.book.osis_id,
            nodes = contents.len(),
            "finished book"
        );
        Ok(BookTree {
            book: self.book,
            introduction: self.introduction.filter(|intro| !intro.is_empty()),
            contents,
        })
    }

    // ========================================================================
    // Container stack primitives
    // ========================================================================

    fn top(&self) -> &ContainerKind {
        // The root is never popped, see `pop_container`.
        &self.containers[self.containers.len() - 1].kind
    }

    fn top_mut(&mut self) -> &mut ContainerKind {
        let last = self.containers.len() - 1;
        &mut self.containers[last].kind
    }

    /// Push a container. While a tag is being opened the container is
    /// recorded on it, and `owned` containers close when that tag closes.
    fn push_container(&mut self, kind: ContainerKind, owned: bool) -> ContainerId {
        let id = ContainerId(self.next_id);
        self.next_id += 1;
        tracing::trace!(container = kind.name(), id = id.0, owned, "open");
        if self.opening
            && let Some(entry) = self.tags.last_mut()
        {
            entry.opened.push(id);
            if owned {
                entry.owned.push(id);
            }
        }
        self.containers.push(OpenContainer { id, kind });
        id
    }

    fn container_index(&self, id: ContainerId) -> Option<usize> {
        self.containers.iter().rposition(|c| c.id == id)
    }

    /// Whether an open tag owns the container.
    fn is_owned(&self, id: ContainerId) -> bool {
        self.tags.iter().any(|t| t.owned.contains(&id))
    }

    /// Index of the nearest scope boundary (root, section, note or
    /// introduction) at or below the top of the stack.
    fn scope_base(&self) -> usize {
        self.containers
            .iter()
            .rposition(|c| c.kind.is_scope_boundary())
            .unwrap_or(0)
    }

    /// Index of the nearest container within the current scope matching
    /// `pred`, searching from the top.
    fn find_in_scope(&self, pred: impl Fn(&ContainerKind) -> bool) -> Option<usize> {
        let base = self.scope_base();
        (base..self.containers.len())
            .rev()
            .find(|&i| pred(&self.containers[i].kind))
    }

    fn section_index(&self) -> Option<usize> {
        self.containers.iter().rposition(|c| c.kind.is_section())
    }

    /// Pop containers until only `len` remain.
    fn close_down_to(&mut self, len: usize) -> ParseResult<()> {
        while self.containers.len() > len.max(1) {
            self.pop_container()?;
        }
        Ok(())
    }

    /// Pop the top container and attach its finished node to the new top.
    fn pop_container(&mut self) -> ParseResult<()> {
        if self.containers.len() <= 1 {
            return Err(self.error(ParseErrorKind::NothingToClose("container")));
        }
        let Some(open) = self.containers.pop() else {
            return Err(self.error(ParseErrorKind::NothingToClose("container")));
        };
        tracing::trace!(container = open.kind.name(), id = open.id.0, "close");
        match open.kind {
            ContainerKind::Root(_) => Err(self.error(ParseErrorKind::NothingToClose("root"))),
            ContainerKind::Section { section, .. } => {
                self.attach(ContentNode::Section(section))
            }
            ContainerKind::Group(group) => {
                if group.contents.is_empty() {
                    tracing::trace!(group = group.kind.name(), "dropping empty group");
                    Ok(())
                } else {
                    self.attach(ContentNode::Group(group))
                }
            }
            ContainerKind::Title { target, text } => {
                self.apply_title(target, &text);
                Ok(())
            }
            ContainerKind::Note(note) => {
                self.buffer_note(note);
                Ok(())
            }
            ContainerKind::CrossReferenceNote => {
                self.complete_cross_references();
                Ok(())
            }
            ContainerKind::SectionReferences => Ok(()),
            ContainerKind::ReferenceLabel { range, label } => self.place_reference(range, label),
            ContainerKind::Introduction(root) => {
                self.place_introduction(root);
                Ok(())
            }
        }
    }

    /// Append a finished node to the top container.
    fn attach(&mut self, node: ContentNode) -> ParseResult<()> {
        let top = self.top_mut();
        if let Some(contents) = top.contents_mut() {
            contents.push(node);
            return Ok(());
        }
        let parent = top.name();
        let child = match &node {
            ContentNode::Phrase(_) => "phrase",
            ContentNode::Group(g) => g.kind.name(),
            ContentNode::Section(_) => "section",
        };
        Err(self.error(ParseErrorKind::MisplacedNode(child, parent)))
    }
}

#[cfg(test)]
mod tests;
