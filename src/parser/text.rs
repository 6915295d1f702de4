//! Text routing and phrase creation.

use super::container::ContainerKind;
use super::{ParseResult, StructuralParser};
use crate::error::ParseErrorKind;
use crate::model::{ContentNode, Phrase, RangeRef, SkipSpace};

const CLOSING_PUNCTUATION: &[char] = &[
    '.', ',', ';', ':', '!', '?', ')', ']', '\u{2019}', '\u{201d}', '\u{bb}', '\u{203a}',
];
const OPENING_PUNCTUATION: &[char] = &['(', '[', '\u{2018}', '\u{201c}', '\u{ab}', '\u{2039}'];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TextOrigin {
    Source,
    /// Inserted quotation marks; never take annotations.
    Marker,
}

impl StructuralParser {
    /// Route a text event: headings and reference labels collect it,
    /// cross-reference containers drop it, anything else becomes a phrase.
    pub fn text(&mut self, value: &str) -> ParseResult<()> {
        let flags = self.text_flags();
        if flags.skip_text {
            return Ok(());
        }
        match self.top_mut() {
            ContainerKind::Title { text, .. } => {
                if flags.uppercase {
                    text.push_str(&value.to_uppercase());
                } else {
                    text.push_str(value);
                }
                Ok(())
            }
            ContainerKind::ReferenceLabel { label, .. } => {
                label.push_str(value);
                Ok(())
            }
            ContainerKind::CrossReferenceNote | ContainerKind::SectionReferences => Ok(()),
            _ => self.append_text(value, flags.reference, TextOrigin::Source),
        }
    }

    /// Append a phrase to the current container.
    ///
    /// Pending annotation buffers attach to it. Whitespace-only text creates
    /// nothing, and a run of trailing punctuation is merged into the
    /// preceding phrase of the same verse.
    pub fn append_phrase(&mut self, text: &str) -> ParseResult<()> {
        self.append_text(text, None, TextOrigin::Source)
    }

    /// Insert a quotation mark phrase.
    pub fn insert_marker(&mut self, marker: &str) -> ParseResult<()> {
        self.append_text(marker, None, TextOrigin::Marker)
    }

    fn append_text(
        &mut self,
        raw: &str,
        reference: Option<RangeRef>,
        origin: TextOrigin,
    ) -> ParseResult<()> {
        let collapsed = collapse_whitespace(raw);
        if collapsed.trim().is_empty() {
            return Ok(());
        }
        let in_document_root = self.in_document_root();
        if !in_document_root {
            self.ensure_text_container(&collapsed)?;
            self.reopen_deferred_groups()?;
        }
        let location = if in_document_root {
            None
        } else {
            Some(self.phrase_location(&collapsed)?)
        };

        let starts_container = self.top().contents().is_some_and(|c| c.is_empty());
        let content = if starts_container {
            collapsed.trim_start().to_string()
        } else {
            collapsed
        };

        if (origin == TextOrigin::Marker || !self.has_pending_buffers())
            && self.merge_punctuation(&content, location, reference.as_ref())
        {
            return Ok(());
        }

        let mut phrase = Phrase::new(content);
        phrase.skip_space = skip_space_for(&phrase.content);
        if let Some((chapter, verse, subverse)) = location {
            phrase.chapter = Some(chapter);
            phrase.verse = Some(verse);
            phrase.subverse = subverse;
        }
        phrase.bible_reference = reference;
        if origin == TextOrigin::Source {
            self.attach_buffers(&mut phrase, in_document_root);
        }
        self.attach(ContentNode::Phrase(phrase))
    }

    /// Whether a group that takes text is open in the current scope.
    pub(super) fn has_text_container(&self) -> bool {
        let base = self.scope_base();
        self.containers[base..]
            .iter()
            .any(|c| c.kind.group_kind().is_some_and(|g| g.accepts_text()))
    }

    /// Make sure the top of the stack can hold running text, opening a
    /// paragraph when the options allow it.
    fn ensure_text_container(&mut self, text: &str) -> ParseResult<()> {
        if self.has_text_container() {
            return Ok(());
        }
        if self.options.may_open_paragraph_for_text() {
            return self.open_implicit_paragraph();
        }
        Err(self.error(ParseErrorKind::TextOutsideParagraph(text.trim().to_string())))
    }

    /// Chapter, verse and subverse for main-content text. Verse 0 is only
    /// valid inside a canonical title.
    fn phrase_location(&self, text: &str) -> ParseResult<(u32, u32, Option<u32>)> {
        if self.chapter == 0 || (self.verse == 0 && !self.in_title_group()) {
            return Err(self.error(ParseErrorKind::MissingVerseContext(
                text.trim().to_string(),
            )));
        }
        Ok((self.chapter, self.verse, self.subverse))
    }

    /// Merge punctuation-only text into the previous phrase of the top
    /// container when it belongs to the same verse.
    fn merge_punctuation(
        &mut self,
        text: &str,
        location: Option<(u32, u32, Option<u32>)>,
        reference: Option<&RangeRef>,
    ) -> bool {
        let starts_with_closing = text
            .trim_start()
            .starts_with(|c: char| CLOSING_PUNCTUATION.contains(&c));
        if !starts_with_closing || text.chars().any(char::is_alphanumeric) {
            return false;
        }
        let Some(ContentNode::Phrase(previous)) =
            self.top_mut().contents_mut().and_then(|c| c.last_mut())
        else {
            return false;
        };
        let same_location = match location {
            Some((chapter, verse, subverse)) => {
                previous.chapter == Some(chapter)
                    && previous.verse == Some(verse)
                    && previous.subverse == subverse
            }
            None => previous.chapter.is_none(),
        };
        if !same_location || previous.is_placeholder() || previous.bible_reference.as_ref() != reference
        {
            return false;
        }
        previous.content.push_str(text);
        let before = matches!(previous.skip_space, SkipSpace::Before | SkipSpace::Both);
        let after = previous.content.ends_with(|c: char| OPENING_PUNCTUATION.contains(&c));
        previous.skip_space = SkipSpace::from_flags(before, after);
        true
    }
}

/// Collapse whitespace runs to a single space, keeping leading and trailing
/// spaces as word separators.
fn collapse_whitespace(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut in_space = false;
    for c in text.chars() {
        if c.is_whitespace() && c != '\u{a0}' {
            if !in_space {
                out.push(' ');
            }
            in_space = true;
        } else {
            out.push(c);
            in_space = false;
        }
    }
    out
}

fn skip_space_for(text: &str) -> SkipSpace {
    let before = text.starts_with(|c: char| CLOSING_PUNCTUATION.contains(&c));
    let after = text.ends_with(|c: char| OPENING_PUNCTUATION.contains(&c));
    SkipSpace::from_flags(before, after)
}
