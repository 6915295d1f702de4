//! Invariant checks for finished book trees.

use std::fmt;

use super::content::{BookTree, ContentNode, DocumentRoot, GroupKind, Phrase};

/// A broken tree invariant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TreeViolation {
    /// A phrase in book content without chapter or verse.
    PhraseWithoutVerse { content: String },
    /// A phrase inside a document root that carries verse coordinates.
    DocumentPhraseWithVerse { content: String },
    /// A section whose level does not exceed its nearest section ancestor's.
    SectionLevel { level: u32, parent: u32 },
    /// A paragraph nested in a paragraph without a section boundary.
    NestedParagraph,
    /// A verse-join placeholder with text or annotations.
    PlaceholderWithContent { verse: u32 },
}

impl fmt::Display for TreeViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TreeViolation::PhraseWithoutVerse { content } => {
                write!(f, "phrase {content:?} has no chapter/verse")
            }
            TreeViolation::DocumentPhraseWithVerse { content } => {
                write!(f, "document phrase {content:?} carries verse coordinates")
            }
            TreeViolation::SectionLevel { level, parent } => {
                write!(f, "section level {level} inside section level {parent}")
            }
            TreeViolation::NestedParagraph => write!(f, "paragraph nested in paragraph"),
            TreeViolation::PlaceholderWithContent { verse } => {
                write!(f, "placeholder for verse {verse} has content")
            }
        }
    }
}

#[derive(Clone, Copy, Default)]
struct Scope {
    section_level: Option<u32>,
    in_paragraph: bool,
    in_title: bool,
}

/// Check a finished book tree against the content-tree invariants.
///
/// Returns every violation found; an empty vector means the tree is sound.
pub fn validate_book_tree(tree: &BookTree) -> Vec<TreeViolation> {
    let mut violations = Vec::new();
    walk(&tree.contents, Scope::default(), &mut violations);
    if let Some(intro) = &tree.introduction {
        walk_document(intro, &mut violations);
    }
    violations
}

fn walk(nodes: &[ContentNode], scope: Scope, out: &mut Vec<TreeViolation>) {
    for node in nodes {
        match node {
            ContentNode::Phrase(p) => check_phrase(p, scope, out),
            ContentNode::Group(g) => {
                let mut inner = scope;
                if g.kind == GroupKind::Paragraph {
                    if scope.in_paragraph {
                        out.push(TreeViolation::NestedParagraph);
                    }
                    inner.in_paragraph = true;
                }
                if g.kind == GroupKind::Title {
                    inner.in_title = true;
                }
                walk(&g.contents, inner, out);
            }
            ContentNode::Section(s) => {
                if let Some(parent) = scope.section_level
                    && s.level <= parent
                {
                    out.push(TreeViolation::SectionLevel {
                        level: s.level,
                        parent,
                    });
                }
                if let Some(desc) = &s.description {
                    walk_document(desc, out);
                }
                let inner = Scope {
                    section_level: Some(s.level),
                    in_paragraph: false,
                    in_title: false,
                };
                walk(&s.contents, inner, out);
            }
        }
    }
}

fn check_phrase(p: &Phrase, scope: Scope, out: &mut Vec<TreeViolation>) {
    match (p.chapter, p.verse) {
        (Some(_), Some(v)) if v > 0 || scope.in_title => {}
        _ => out.push(TreeViolation::PhraseWithoutVerse {
            content: p.content.clone(),
        }),
    }
    if p.is_placeholder() && (!p.content.is_empty() || p.has_annotations()) {
        out.push(TreeViolation::PlaceholderWithContent {
            verse: p.verse.unwrap_or(0),
        });
    }
    for note in &p.notes {
        walk_document(&note.content, out);
    }
}

fn walk_document(root: &DocumentRoot, out: &mut Vec<TreeViolation>) {
    for phrase in super::content::phrases(&root.contents) {
        if phrase.verse.is_some() {
            out.push(TreeViolation::DocumentPhraseWithVerse {
                content: phrase.content.clone(),
            });
        }
    }
}
