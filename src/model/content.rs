//! Content tree types produced by the structural parser.

use super::reference::{BookMeta, Coordinate, CrossRef, RangeRef};

// ============================================================================
// Nodes
// ============================================================================

/// Whether a renderer should suppress the space around a phrase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "cli", derive(serde::Serialize))]
#[cfg_attr(feature = "cli", serde(rename_all = "camelCase"))]
pub enum SkipSpace {
    #[default]
    None,
    Before,
    After,
    Both,
}

impl SkipSpace {
    pub fn from_flags(before: bool, after: bool) -> Self {
        match (before, after) {
            (false, false) => SkipSpace::None,
            (true, false) => SkipSpace::Before,
            (false, true) => SkipSpace::After,
            (true, true) => SkipSpace::Both,
        }
    }

    pub fn is_none(&self) -> bool {
        *self == SkipSpace::None
    }
}

/// Leaf text.
///
/// Phrases in book content always carry chapter and verse; phrases inside a
/// [`DocumentRoot`] (notes, introductions) carry neither.
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "cli", derive(serde::Serialize))]
#[cfg_attr(feature = "cli", serde(rename_all = "camelCase"))]
pub struct Phrase {
    pub content: String,
    #[cfg_attr(feature = "cli", serde(skip_serializing_if = "Option::is_none"))]
    pub chapter: Option<u32>,
    #[cfg_attr(feature = "cli", serde(skip_serializing_if = "Option::is_none"))]
    pub verse: Option<u32>,
    #[cfg_attr(feature = "cli", serde(skip_serializing_if = "Option::is_none"))]
    pub subverse: Option<u32>,
    #[cfg_attr(feature = "cli", serde(skip_serializing_if = "SkipSpace::is_none"))]
    pub skip_space: SkipSpace,
    #[cfg_attr(feature = "cli", serde(skip_serializing_if = "std::ops::Not::not"))]
    pub linebreak: bool,
    #[cfg_attr(feature = "cli", serde(skip_serializing_if = "Vec::is_empty"))]
    pub strongs: Vec<String>,
    #[cfg_attr(feature = "cli", serde(skip_serializing_if = "Vec::is_empty"))]
    pub cross_references: Vec<CrossRef>,
    #[cfg_attr(feature = "cli", serde(skip_serializing_if = "Vec::is_empty"))]
    pub notes: Vec<Note>,
    /// Set on placeholders for verses merged into an earlier verse.
    #[cfg_attr(feature = "cli", serde(skip_serializing_if = "Option::is_none"))]
    pub joined_to: Option<Coordinate>,
    /// Set when the phrase text is itself a citation.
    #[cfg_attr(feature = "cli", serde(skip_serializing_if = "Option::is_none"))]
    pub bible_reference: Option<RangeRef>,
}

impl Phrase {
    pub fn new(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            ..Default::default()
        }
    }

    /// Placeholder for `verse`, pointing at the verse it was merged into.
    pub fn placeholder(chapter: u32, verse: u32, anchor: Coordinate) -> Self {
        Self {
            chapter: Some(chapter),
            verse: Some(verse),
            joined_to: Some(anchor),
            ..Default::default()
        }
    }

    pub fn is_placeholder(&self) -> bool {
        self.joined_to.is_some()
    }

    pub fn has_annotations(&self) -> bool {
        !self.strongs.is_empty() || !self.cross_references.is_empty() || !self.notes.is_empty()
    }
}

/// The closed set of group kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "cli", derive(serde::Serialize))]
#[cfg_attr(feature = "cli", serde(rename_all = "camelCase"))]
pub enum GroupKind {
    Paragraph,
    LineGroup,
    Line,
    Indent,
    /// Canonical title text (e.g. psalm superscriptions), part of the verse flow.
    Title,
    Quote,
    Bold,
    Italic,
    Emphasis,
    DivineName,
    TranslationChange,
    Sela,
    Link,
    UnorderedListItem,
}

impl GroupKind {
    pub fn name(&self) -> &'static str {
        match self {
            GroupKind::Paragraph => "paragraph",
            GroupKind::LineGroup => "lineGroup",
            GroupKind::Line => "line",
            GroupKind::Indent => "indent",
            GroupKind::Title => "title",
            GroupKind::Quote => "quote",
            GroupKind::Bold => "bold",
            GroupKind::Italic => "italic",
            GroupKind::Emphasis => "emphasis",
            GroupKind::DivineName => "divineName",
            GroupKind::TranslationChange => "translationChange",
            GroupKind::Sela => "sela",
            GroupKind::Link => "link",
            GroupKind::UnorderedListItem => "unorderedListItem",
        }
    }

    /// Groups that may directly hold running text.
    pub fn accepts_text(&self) -> bool {
        matches!(
            self,
            GroupKind::Paragraph | GroupKind::Line | GroupKind::UnorderedListItem | GroupKind::Title
        )
    }

    /// Groups that make up poetic line structure.
    pub fn is_line_structure(&self) -> bool {
        matches!(self, GroupKind::LineGroup | GroupKind::Indent)
    }

    pub fn is_line(&self) -> bool {
        matches!(self, GroupKind::Line | GroupKind::UnorderedListItem)
    }
}

/// Extra information carried by some groups.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "cli", derive(serde::Serialize))]
#[cfg_attr(feature = "cli", serde(rename_all = "camelCase"))]
pub enum GroupModifier {
    LineNumber(u32),
    LinkTarget(String),
    JesusSpeech,
}

#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "cli", derive(serde::Serialize))]
pub struct Group {
    pub kind: GroupKind,
    #[cfg_attr(feature = "cli", serde(skip_serializing_if = "Option::is_none"))]
    pub modifier: Option<GroupModifier>,
    pub contents: Vec<ContentNode>,
}

impl Group {
    pub fn new(kind: GroupKind, modifier: Option<GroupModifier>) -> Self {
        Self {
            kind,
            modifier,
            contents: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "cli", derive(serde::Serialize))]
#[cfg_attr(feature = "cli", serde(rename_all = "camelCase"))]
pub struct Section {
    /// Nesting depth: 0 for a root-level section.
    pub level: u32,
    #[cfg_attr(feature = "cli", serde(skip_serializing_if = "Option::is_none"))]
    pub title: Option<String>,
    #[cfg_attr(feature = "cli", serde(skip_serializing_if = "Option::is_none"))]
    pub sub_title: Option<String>,
    #[cfg_attr(feature = "cli", serde(skip_serializing_if = "Option::is_none"))]
    pub description: Option<DocumentRoot>,
    #[cfg_attr(feature = "cli", serde(skip_serializing_if = "Vec::is_empty"))]
    pub cross_references: Vec<CrossRef>,
    pub contents: Vec<ContentNode>,
}

impl Section {
    pub fn new(level: u32) -> Self {
        Self {
            level,
            ..Default::default()
        }
    }
}

/// Free text without verse coordinates (notes, introductions, descriptions).
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "cli", derive(serde::Serialize))]
pub struct DocumentRoot {
    pub contents: Vec<ContentNode>,
}

impl DocumentRoot {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.contents.is_empty()
    }

    /// Concatenated phrase text.
    pub fn plain_text(&self) -> String {
        plain_text(&self.contents)
    }
}

#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "cli", derive(serde::Serialize))]
#[cfg_attr(feature = "cli", serde(rename_all = "camelCase"))]
pub struct Note {
    pub key: String,
    #[cfg_attr(feature = "cli", serde(skip_serializing_if = "Option::is_none"))]
    pub note_type: Option<String>,
    pub content: DocumentRoot,
}

/// A node of the content tree.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "cli", derive(serde::Serialize))]
#[cfg_attr(feature = "cli", serde(tag = "type", rename_all = "camelCase"))]
pub enum ContentNode {
    Phrase(Phrase),
    Group(Group),
    Section(Section),
}

impl ContentNode {
    pub fn as_phrase(&self) -> Option<&Phrase> {
        match self {
            ContentNode::Phrase(p) => Some(p),
            _ => None,
        }
    }

    pub fn as_group(&self) -> Option<&Group> {
        match self {
            ContentNode::Group(g) => Some(g),
            _ => None,
        }
    }

    pub fn as_section(&self) -> Option<&Section> {
        match self {
            ContentNode::Section(s) => Some(s),
            _ => None,
        }
    }

    /// Child nodes (empty for phrases).
    pub fn children(&self) -> &[ContentNode] {
        match self {
            ContentNode::Phrase(_) => &[],
            ContentNode::Group(g) => &g.contents,
            ContentNode::Section(s) => &s.contents,
        }
    }

    pub fn is_group(&self, kind: GroupKind) -> bool {
        matches!(self, ContentNode::Group(g) if g.kind == kind)
    }
}

// ============================================================================
// Book tree
// ============================================================================

/// One finished book, ready to be handed to a sink.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "cli", derive(serde::Serialize))]
pub struct BookTree {
    pub book: BookMeta,
    #[cfg_attr(feature = "cli", serde(skip_serializing_if = "Option::is_none"))]
    pub introduction: Option<DocumentRoot>,
    pub contents: Vec<ContentNode>,
}

impl BookTree {
    /// All phrases of the book content in document order.
    pub fn phrases(&self) -> Vec<&Phrase> {
        phrases(&self.contents)
    }

    /// All sections in document order (pre-order).
    pub fn sections(&self) -> Vec<&Section> {
        let mut out = Vec::new();
        collect_sections(&self.contents, &mut out);
        out
    }

    /// Phrases that are verse-join placeholders.
    pub fn placeholders(&self) -> Vec<&Phrase> {
        self.phrases()
            .into_iter()
            .filter(|p| p.is_placeholder())
            .collect()
    }
}

/// Collect the phrases below `nodes` in document order.
pub fn phrases(nodes: &[ContentNode]) -> Vec<&Phrase> {
    let mut out = Vec::new();
    collect_phrases(nodes, &mut out);
    out
}

fn collect_phrases<'a>(nodes: &'a [ContentNode], out: &mut Vec<&'a Phrase>) {
    for node in nodes {
        match node {
            ContentNode::Phrase(p) => out.push(p),
            other => collect_phrases(other.children(), out),
        }
    }
}

fn collect_sections<'a>(nodes: &'a [ContentNode], out: &mut Vec<&'a Section>) {
    for node in nodes {
        if let ContentNode::Section(s) = node {
            out.push(s);
        }
        collect_sections(node.children(), out);
    }
}

/// Phrase text below `nodes`, concatenated without separators.
pub fn plain_text(nodes: &[ContentNode]) -> String {
    phrases(nodes).iter().map(|p| p.content.as_str()).collect()
}

/// Find the most recently appended phrase below `nodes`. Verse join
/// placeholders are passed over; they stay empty.
pub(crate) fn last_phrase_mut(nodes: &mut [ContentNode]) -> Option<&mut Phrase> {
    nodes.iter_mut().rev().find_map(|node| match node {
        ContentNode::Phrase(p) if p.is_placeholder() => None,
        ContentNode::Phrase(p) => Some(p),
        ContentNode::Group(g) => last_phrase_mut(&mut g.contents),
        ContentNode::Section(s) => last_phrase_mut(&mut s.contents),
    })
}
