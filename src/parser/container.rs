//! Container stack items.

use crate::model::{
    ContentNode, DocumentRoot, Group, GroupKind, GroupModifier, Note, RangeRef, Section,
};

/// Unique identifier for a container opened during one book's parse.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ContainerId(pub u32);

/// Which section field a heading writes to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TitleTarget {
    SectionTitle,
    SectionSubTitle,
}

/// A node under construction.
#[derive(Debug)]
pub(crate) enum ContainerKind {
    /// Book content; always at the bottom of the stack.
    Root(Vec<ContentNode>),
    Section { tag_level: usize, section: Section },
    Group(Group),
    /// Heading text collected for the nearest section.
    Title { target: TitleTarget, text: String },
    Note(Note),
    /// Cross-reference note; references inside fill the buffer.
    CrossReferenceNote,
    /// Parallel-passage heading; references inside go to the section.
    SectionReferences,
    /// A reference whose text becomes a cross reference label.
    ReferenceLabel { range: RangeRef, label: String },
    Introduction(DocumentRoot),
}

#[derive(Debug)]
pub(crate) struct OpenContainer {
    pub id: ContainerId,
    pub kind: ContainerKind,
}

impl ContainerKind {
    pub fn name(&self) -> &'static str {
        match self {
            ContainerKind::Root(_) => "root",
            ContainerKind::Section { .. } => "section",
            ContainerKind::Group(g) => g.kind.name(),
            ContainerKind::Title { .. } => "heading",
            ContainerKind::Note(_) => "note",
            ContainerKind::CrossReferenceNote => "crossReferenceNote",
            ContainerKind::SectionReferences => "sectionReferences",
            ContainerKind::ReferenceLabel { .. } => "reference",
            ContainerKind::Introduction(_) => "introduction",
        }
    }

    /// Label used in stack dumps.
    pub fn label(&self) -> String {
        match self {
            ContainerKind::Section { section, .. } => format!("section[{}]", section.level),
            ContainerKind::Group(g) => match &g.modifier {
                Some(GroupModifier::LineNumber(n)) => format!("{}#{n}", g.kind.name()),
                _ => g.kind.name().to_string(),
            },
            ContainerKind::Note(note) => format!("note({})", note.key),
            other => other.name().to_string(),
        }
    }

    pub fn contents(&self) -> Option<&Vec<ContentNode>> {
        match self {
            ContainerKind::Root(c) => Some(c),
            ContainerKind::Section { section, .. } => Some(&section.contents),
            ContainerKind::Group(g) => Some(&g.contents),
            ContainerKind::Note(n) => Some(&n.content.contents),
            ContainerKind::Introduction(root) => Some(&root.contents),
            _ => None,
        }
    }

    pub fn contents_mut(&mut self) -> Option<&mut Vec<ContentNode>> {
        match self {
            ContainerKind::Root(c) => Some(c),
            ContainerKind::Section { section, .. } => Some(&mut section.contents),
            ContainerKind::Group(g) => Some(&mut g.contents),
            ContainerKind::Note(n) => Some(&mut n.content.contents),
            ContainerKind::Introduction(root) => Some(&mut root.contents),
            _ => None,
        }
    }

    pub fn group_kind(&self) -> Option<GroupKind> {
        match self {
            ContainerKind::Group(g) => Some(g.kind),
            _ => None,
        }
    }

    pub fn is_group(&self, kind: GroupKind) -> bool {
        self.group_kind() == Some(kind)
    }

    pub fn is_section(&self) -> bool {
        matches!(self, ContainerKind::Section { .. })
    }

    /// Free-text roots: phrases inside carry no verse coordinates.
    pub fn is_document_root(&self) -> bool {
        matches!(self, ContainerKind::Note(_) | ContainerKind::Introduction(_))
    }

    /// Containers that bound paragraph and line scopes.
    pub fn is_scope_boundary(&self) -> bool {
        matches!(
            self,
            ContainerKind::Root(_) | ContainerKind::Section { .. }
        ) || self.is_document_root()
    }
}
