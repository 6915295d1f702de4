//! Core data model for Bible content.
//!
//! This module contains:
//! - Verse coordinates, reference ranges and cross references
//! - Book and version metadata supplied by callers
//! - The content tree (phrases, groups, sections, notes, document roots)
//! - Invariant checks for finished book trees

mod content;
mod reference;
mod validate;

// Re-export content tree types
pub use content::{
    BookTree, ContentNode, DocumentRoot, Group, GroupKind, GroupModifier, Note, Phrase, Section,
    SkipSpace, phrases, plain_text,
};
pub(crate) use content::last_phrase_mut;

// Re-export reference types
pub use reference::{
    BookMeta, Coordinate, CrossRef, RangeRef, VersionMeta, parse_verse_token, subverse_index,
};

// Re-export validation
pub use validate::{TreeViolation, validate_book_tree};
