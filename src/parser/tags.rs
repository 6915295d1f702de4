//! Tag stack and self-closing tag healing.

use super::container::{ContainerId, ContainerKind};
use super::{ParseResult, StructuralParser};
use crate::error::ParseErrorKind;
use crate::model::{GroupKind, GroupModifier, RangeRef};

/// Per-tag state that influences how text and closes are handled.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TagFlags {
    /// Text below this tag is discarded.
    pub skip_text: bool,
    /// Heading text below this tag is upper-cased.
    pub uppercase: bool,
    /// Phrases below this tag cite this passage.
    pub reference: Option<RangeRef>,
    /// The tag filled the Strong's buffer.
    pub strongs: bool,
    /// Closing the tag ends the current verse.
    pub verse: bool,
    /// Closing the tag ends the current chapter.
    pub chapter: bool,
}

#[derive(Debug, Clone)]
pub(crate) struct TagEntry {
    pub name: String,
    pub self_closing: bool,
    pub flags: TagFlags,
    /// Every container opened while this tag was being opened.
    pub opened: Vec<ContainerId>,
    /// The subset closed together with the tag.
    pub owned: Vec<ContainerId>,
    /// Groups a heal could not reopen yet; they open before the next text.
    pub deferred: Vec<ReopenGroup>,
}

impl TagEntry {
    fn new(name: &str, self_closing: bool, flags: TagFlags) -> Self {
        Self {
            name: name.to_string(),
            self_closing,
            flags,
            opened: Vec::new(),
            owned: Vec::new(),
            deferred: Vec::new(),
        }
    }

    /// Bottom-of-stack entry; never closed.
    pub fn sentinel() -> Self {
        Self::new("", false, TagFlags::default())
    }
}

/// A self-closing tag whose close event has not arrived yet.
#[derive(Debug, Clone)]
pub(crate) struct PendingTag {
    pub name: String,
}

/// A group to reopen after healing.
#[derive(Debug, Clone, PartialEq)]
pub struct ReopenGroup {
    /// The container closed by the heal.
    pub previous: ContainerId,
    pub kind: GroupKind,
    pub modifier: Option<GroupModifier>,
    /// Whether the pending tag owned the group.
    pub owned: bool,
}

/// One synthetic step of a healed close sequence.
#[derive(Debug, Clone, PartialEq)]
pub enum HealStep {
    /// Close the pending self-closing tag.
    ClosePending { name: String },
    /// Close the tag whose close event arrived.
    Close { name: String },
    /// Reopen the pending tag and whichever of its groups the heal closed.
    Reopen {
        name: String,
        flags: TagFlags,
        groups: Vec<ReopenGroup>,
    },
}

impl StructuralParser {
    /// Push a tag. Containers pushed until [`end_tag_open`] are recorded on
    /// it.
    ///
    /// [`end_tag_open`]: StructuralParser::end_tag_open
    pub fn begin_tag(&mut self, name: &str, self_closing: bool, flags: TagFlags) {
        self.tags.push(TagEntry::new(name, self_closing, flags));
        self.opening = true;
    }

    /// Finish opening the top tag.
    pub fn end_tag_open(&mut self) {
        self.opening = false;
        if let Some(entry) = self.tags.last()
            && entry.self_closing
        {
            self.pending = Some(PendingTag {
                name: entry.name.clone(),
            });
        }
    }

    /// Whether text is currently discarded.
    pub fn skipping_text(&self) -> bool {
        self.tags.iter().any(|t| t.flags.skip_text)
    }

    /// Flags that apply to text at the current position.
    pub(crate) fn text_flags(&self) -> TagFlags {
        let mut flags = TagFlags::default();
        for tag in &self.tags {
            flags.skip_text |= tag.flags.skip_text;
            flags.uppercase |= tag.flags.uppercase;
            if tag.flags.reference.is_some() {
                flags.reference = tag.flags.reference.clone();
            }
        }
        flags
    }

    pub(crate) fn top_tag_is_pending(&self) -> bool {
        match (&self.pending, self.tags.last()) {
            (Some(pending), Some(top)) => top.self_closing && top.name == pending.name,
            _ => false,
        }
    }

    /// Close the tag `name`.
    ///
    /// A close that does not match the top tag is healed when the top tag
    /// is a pending self-closing tag and `name` is open below it, or when
    /// `name` is the pending tag itself buried under newer tags. Any other
    /// mismatch is an error.
    pub fn close_tag(&mut self, name: &str) -> ParseResult<()> {
        let Some(top) = self.tags.last().filter(|_| self.tags.len() > 1) else {
            return Err(self.error(ParseErrorKind::UnmatchedClose(name.to_string())));
        };
        if top.name == name {
            return self.pop_tag();
        }
        if self.top_tag_is_pending() {
            let steps = self.heal_mismatched_close(name)?;
            tracing::debug!(tag = name, pending = %top.name, "healing close across self-closing tag");
            return self.replay_heal(steps);
        }
        if let Some(index) = self.buried_pending(name) {
            tracing::debug!(tag = name, above = %top.name, "closing self-closing tag below newer tags");
            return self.close_buried_pending(index);
        }
        let expected = top.name.clone();
        if self.tags[1..].iter().any(|t| t.name == name) {
            Err(self.error(ParseErrorKind::UnbalancedClose {
                expected,
                found: name.to_string(),
            }))
        } else {
            Err(self.error(ParseErrorKind::UnmatchedClose(name.to_string())))
        }
    }

    /// Pop the top tag, closing the containers it owns.
    pub(crate) fn pop_tag(&mut self) -> ParseResult<()> {
        if self.tags.len() <= 1 {
            return Err(self.error(ParseErrorKind::NothingToClose("tag")));
        }
        let Some(entry) = self.tags.pop() else {
            return Err(self.error(ParseErrorKind::NothingToClose("tag")));
        };
        if entry.self_closing
            && self
                .pending
                .as_ref()
                .is_some_and(|p| p.name == entry.name)
        {
            self.pending = None;
        }

        if let Some(index) = entry
            .owned
            .iter()
            .filter_map(|id| self.container_index(*id))
            .min()
        {
            self.close_down_to(index)?;
        }

        if entry.flags.strongs && self.strongs.take().is_some() {
            tracing::debug!(tag = %entry.name, "Strong's tag without text");
        }
        if entry.flags.verse && !entry.self_closing {
            self.end_verse()?;
        }
        if entry.flags.chapter && !entry.self_closing {
            self.end_chapter()?;
        }
        Ok(())
    }

    /// Plan the synthetic events that heal a close of `closing` while the
    /// top tag is a self-closing tag still waiting for its own close.
    ///
    /// The pending tag is closed, the newer tag closed normally, and the
    /// pending tag reopened together with the groups it had opened, so its
    /// effect carries on after the close in document order.
    pub fn heal_mismatched_close(&self, closing: &str) -> ParseResult<Vec<HealStep>> {
        let Some(pending) = self.tags.last().filter(|_| self.top_tag_is_pending()) else {
            return Err(self.error(ParseErrorKind::UnmatchedClose(closing.to_string())));
        };
        let below = &self.tags[1..self.tags.len() - 1];
        if !below.iter().any(|t| t.name == closing) {
            return Err(self.error(ParseErrorKind::UnmatchedClose(closing.to_string())));
        }

        let groups = pending
            .opened
            .iter()
            .filter_map(|id| self.container_index(*id).map(|i| (*id, i)))
            .filter_map(|(id, i)| match &self.containers[i].kind {
                ContainerKind::Group(g) => Some(ReopenGroup {
                    previous: id,
                    kind: g.kind,
                    modifier: g.modifier.clone(),
                    owned: pending.owned.contains(&id),
                }),
                _ => None,
            })
            .collect();

        Ok(vec![
            HealStep::ClosePending {
                name: pending.name.clone(),
            },
            HealStep::Close {
                name: closing.to_string(),
            },
            HealStep::Reopen {
                name: pending.name.clone(),
                flags: pending.flags.clone(),
                groups,
            },
        ])
    }

    fn replay_heal(&mut self, steps: Vec<HealStep>) -> ParseResult<()> {
        for step in steps {
            match step {
                HealStep::ClosePending { .. } => {
                    // Detach the pending tag; its containers are closed
                    // below by whichever tag encloses them.
                    self.tags.pop();
                    self.pending = None;
                }
                HealStep::Close { name } => self.close_tag(&name)?,
                HealStep::Reopen {
                    name,
                    flags,
                    groups,
                } => {
                    self.begin_tag(&name, true, flags);
                    let can_reopen = self.in_document_root() || self.has_text_container();
                    for group in groups {
                        if self.container_index(group.previous).is_some() {
                            // Untouched by the heal: hand it back to the tag.
                            if let Some(entry) = self.tags.last_mut() {
                                entry.opened.push(group.previous);
                                if group.owned {
                                    entry.owned.push(group.previous);
                                }
                            }
                        } else if can_reopen {
                            self.reopen_group(group.kind, group.modifier, group.owned)?;
                        } else if let Some(entry) = self.tags.last_mut() {
                            // No paragraph or line to hold it until text arrives.
                            entry.deferred.push(group);
                        }
                    }
                    self.end_tag_open();
                }
            }
        }
        Ok(())
    }

    /// Index of the pending self-closing tag `name` when newer tags sit
    /// above it.
    fn buried_pending(&self, name: &str) -> Option<usize> {
        if !self.pending.as_ref().is_some_and(|p| p.name == name) {
            return None;
        }
        let top = self.tags.len().checked_sub(1)?;
        self.tags
            .get(1..top)?
            .iter()
            .rposition(|t| t.self_closing && t.name == name)
            .map(|i| i + 1)
    }

    /// Close the self-closing tag at `index` below newer tags.
    ///
    /// Groups it owns are closed. Newer groups opened inside them are
    /// closed with them and reopened in the enclosing container, keeping
    /// their tags. When a newer container is not a group the tag's groups
    /// are left to close with their enclosing container.
    fn close_buried_pending(&mut self, index: usize) -> ParseResult<()> {
        let entry = self.tags.remove(index);
        self.pending = None;
        let Some(bottom) = entry
            .owned
            .iter()
            .filter_map(|id| self.container_index(*id))
            .min()
        else {
            return Ok(());
        };

        let mut newer = Vec::new();
        for open in &self.containers[bottom..] {
            if entry.owned.contains(&open.id) {
                continue;
            }
            match &open.kind {
                ContainerKind::Group(g) => newer.push(ReopenGroup {
                    previous: open.id,
                    kind: g.kind,
                    modifier: g.modifier.clone(),
                    owned: self.is_owned(open.id),
                }),
                _ => {
                    tracing::debug!(tag = %entry.name, container = open.kind.name(), "groups left open inside newer container");
                    return Ok(());
                }
            }
        }

        self.close_down_to(bottom)?;
        for group in newer {
            let reopened = self.reopen_group(group.kind, group.modifier, group.owned)?;
            self.repoint(group.previous, reopened);
        }
        Ok(())
    }

    /// Open groups a heal deferred until text had a container.
    pub(super) fn reopen_deferred_groups(&mut self) -> ParseResult<()> {
        for index in 1..self.tags.len() {
            if self.tags[index].deferred.is_empty() {
                continue;
            }
            let groups = std::mem::take(&mut self.tags[index].deferred);
            for group in groups {
                let Some(id) = self.reopen_group(group.kind, group.modifier, group.owned)? else {
                    continue;
                };
                let entry = &mut self.tags[index];
                entry.opened.push(id);
                if group.owned {
                    entry.owned.push(id);
                }
            }
        }
        Ok(())
    }

    /// Replace a closed container with its reopened copy in every tag.
    fn repoint(&mut self, previous: ContainerId, current: Option<ContainerId>) {
        for tag in &mut self.tags {
            for list in [&mut tag.opened, &mut tag.owned] {
                match current {
                    Some(id) => list.iter_mut().filter(|c| **c == previous).for_each(|c| *c = id),
                    None => list.retain(|c| *c != previous),
                }
            }
        }
    }
}
