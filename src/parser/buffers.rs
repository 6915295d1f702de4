//! Annotation buffers.
//!
//! Strong's codes, cross references and notes are collected ahead of the
//! text they annotate and attached to the next phrase created.

use super::container::ContainerKind;
use super::{ParseResult, StructuralParser};
use crate::error::ParseErrorKind;
use crate::model::{CrossRef, DocumentRoot, Note, Phrase, RangeRef, last_phrase_mut};

#[derive(Debug, Clone)]
pub(crate) struct CrossReferenceBuffer {
    key: String,
    refs: Vec<CrossRef>,
    /// Set once the cross-reference note has closed.
    complete: bool,
}

impl StructuralParser {
    /// Buffer Strong's codes for the next phrase.
    pub fn buffer_strongs(&mut self, codes: Vec<String>) -> ParseResult<()> {
        if codes.is_empty() {
            return Ok(());
        }
        if self.strongs.is_some() {
            return Err(self.error(ParseErrorKind::DuplicateStrongsBuffer));
        }
        self.strongs = Some(codes);
        Ok(())
    }

    /// Start collecting cross references under `key` (generated when
    /// `None`).
    pub fn buffer_cross_reference(&mut self, key: Option<String>) -> ParseResult<()> {
        if self.cross_references.is_some() {
            return Err(self.error(ParseErrorKind::DuplicateCrossReferenceBuffer));
        }
        let key = match key {
            Some(key) => key,
            None => {
                self.cross_reference_count += 1;
                self.cross_reference_count.to_string()
            }
        };
        self.cross_references = Some(CrossReferenceBuffer {
            key,
            refs: Vec::new(),
            complete: false,
        });
        Ok(())
    }

    /// Add a reference to the open cross-reference buffer.
    pub fn add_cross_reference(&mut self, range: RangeRef, label: Option<String>) -> ParseResult<()> {
        let Some(buffer) = self.cross_references.as_mut().filter(|b| !b.complete) else {
            return Err(self.error(ParseErrorKind::NothingToClose("cross reference note")));
        };
        buffer.refs.push(CrossRef {
            key: buffer.key.clone(),
            label,
            range,
        });
        Ok(())
    }

    /// Close the cross-reference buffer so the next phrase picks it up.
    pub(super) fn complete_cross_references(&mut self) {
        match &mut self.cross_references {
            Some(buffer) if buffer.refs.is_empty() => {
                tracing::debug!(key = %buffer.key, "cross reference note without references");
                self.cross_references = None;
            }
            Some(buffer) => buffer.complete = true,
            None => {}
        }
    }

    /// Queue a finished note for the next phrase.
    pub fn buffer_note(&mut self, note: Note) {
        if note.content.is_empty() {
            tracing::debug!(key = %note.key, "empty note dropped");
            return;
        }
        self.notes.push(note);
    }

    /// Open a note closed by its tag. Notes do not nest.
    pub fn open_note(&mut self, key: Option<String>, note_type: Option<String>) -> ParseResult<()> {
        self.check_not_in_note()?;
        let key = match key {
            Some(key) => key,
            None => {
                self.note_count += 1;
                generated_note_key(self.note_count)
            }
        };
        self.push_container(
            ContainerKind::Note(Note {
                key,
                note_type,
                content: DocumentRoot::new(),
            }),
            true,
        );
        Ok(())
    }

    /// Open a cross-reference note; references inside it fill the buffer.
    pub fn open_cross_reference_note(&mut self, key: Option<String>) -> ParseResult<()> {
        self.check_not_in_note()?;
        self.buffer_cross_reference(key)?;
        self.push_container(ContainerKind::CrossReferenceNote, true);
        Ok(())
    }

    fn check_not_in_note(&self) -> ParseResult<()> {
        let nested = self.containers.iter().any(|c| {
            matches!(
                c.kind,
                ContainerKind::Note(_) | ContainerKind::CrossReferenceNote
            )
        });
        if nested {
            Err(self.error(ParseErrorKind::NestedNote))
        } else {
            Ok(())
        }
    }

    /// Open a reference. Inside a cross-reference note or parallel-passage
    /// heading the reference text becomes a label and `true` is returned;
    /// elsewhere the caller marks the text as a citation instead.
    pub fn open_reference(&mut self, range: RangeRef) -> ParseResult<bool> {
        if matches!(
            self.top(),
            ContainerKind::CrossReferenceNote | ContainerKind::SectionReferences
        ) {
            self.push_container(
                ContainerKind::ReferenceLabel {
                    range,
                    label: String::new(),
                },
                true,
            );
            return Ok(true);
        }
        Ok(false)
    }

    pub(super) fn place_reference(&mut self, range: RangeRef, label: String) -> ParseResult<()> {
        let label = Some(label.split_whitespace().collect::<Vec<_>>().join(" "))
            .filter(|l| !l.is_empty());
        match self.top() {
            ContainerKind::CrossReferenceNote => self.add_cross_reference(range, label),
            ContainerKind::SectionReferences => {
                let Some(index) = self.section_index() else {
                    tracing::debug!(%range, "parallel reference without section dropped");
                    return Ok(());
                };
                self.cross_reference_count += 1;
                let key = self.cross_reference_count.to_string();
                if let ContainerKind::Section { section, .. } = &mut self.containers[index].kind {
                    section.cross_references.push(CrossRef { key, label, range });
                }
                Ok(())
            }
            other => {
                let parent = other.name();
                Err(self.error(ParseErrorKind::MisplacedNode("reference", parent)))
            }
        }
    }

    /// Whether annotations are waiting for the next phrase.
    pub(super) fn has_pending_buffers(&self) -> bool {
        self.strongs.is_some()
            || !self.notes.is_empty()
            || self
                .cross_references
                .as_ref()
                .is_some_and(|b| b.complete)
    }

    /// Move pending annotations onto a new phrase. Phrases in notes and
    /// introductions only take Strong's codes.
    pub(super) fn attach_buffers(&mut self, phrase: &mut Phrase, in_document_root: bool) {
        if let Some(codes) = self.strongs.take() {
            phrase.strongs = codes;
        }
        if in_document_root {
            return;
        }
        if self.cross_references.as_ref().is_some_and(|b| b.complete)
            && let Some(buffer) = self.cross_references.take()
        {
            phrase.cross_references = buffer.refs;
        }
        phrase.notes.append(&mut self.notes);
    }

    /// Attach annotations left at the end of the book to its last phrase.
    pub(super) fn flush_trailing_buffers(&mut self) {
        if self.strongs.take().is_some() {
            tracing::debug!("Strong's codes after the last phrase dropped");
        }
        let refs = self
            .cross_references
            .take()
            .filter(|b| b.complete)
            .map(|b| b.refs)
            .unwrap_or_default();
        if refs.is_empty() && self.notes.is_empty() {
            return;
        }
        let notes = std::mem::take(&mut self.notes);
        let Some(ContainerKind::Root(contents)) = self.containers.first_mut().map(|c| &mut c.kind)
        else {
            return;
        };
        match last_phrase_mut(contents) {
            Some(phrase) => {
                phrase.cross_references.extend(refs);
                phrase.notes.extend(notes);
            }
            None => tracing::debug!("annotations without any phrase dropped"),
        }
    }
}

/// Note keys `a`..`z`, then `aa`, `ab`...
fn generated_note_key(mut n: u32) -> String {
    let mut key = Vec::new();
    while n > 0 {
        n -= 1;
        key.push(b'a' + (n % 26) as u8);
        n /= 26;
    }
    key.reverse();
    String::from_utf8_lossy(&key).into_owned()
}

#[cfg(test)]
mod tests {
    use super::generated_note_key;

    #[test]
    fn test_generated_note_keys() {
        assert_eq!(generated_note_key(1), "a");
        assert_eq!(generated_note_key(26), "z");
        assert_eq!(generated_note_key(27), "aa");
        assert_eq!(generated_note_key(28), "ab");
    }
}
