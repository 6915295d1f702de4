//! Structural operations: sections, paragraphs, poetry, groups, headings
//! and introductions.

use super::container::{ContainerId, ContainerKind, TitleTarget};
use super::{ParseResult, StructuralParser};
use crate::error::ParseErrorKind;
use crate::model::{
    ContentNode, DocumentRoot, Group, GroupKind, GroupModifier, Section, last_phrase_mut,
};

impl StructuralParser {
    // ========================================================================
    // Sections
    // ========================================================================

    /// Open a section at dialect heading level `tag_level` (0 is the
    /// outermost heading kind).
    ///
    /// Open groups are closed down to the nearest section or the root, then
    /// every open section at the same or a deeper heading level is closed,
    /// so headings of equal rank become siblings.
    pub fn open_section(&mut self, tag_level: usize) -> ParseResult<ContainerId> {
        self.close_detached_introduction()?;
        loop {
            match self.top() {
                ContainerKind::Root(_) | ContainerKind::Section { .. } => break,
                ContainerKind::Group(_) => self.pop_container()?,
                _ => return Err(self.error(ParseErrorKind::SectionOutsideRoot)),
            }
        }
        while let ContainerKind::Section { tag_level: open, .. } = self.top()
            && *open >= tag_level
        {
            self.pop_container()?;
        }

        let level = self
            .containers
            .iter()
            .filter(|c| c.kind.is_section())
            .count() as u32;
        Ok(self.push_container(
            ContainerKind::Section {
                tag_level,
                section: Section::new(level),
            },
            false,
        ))
    }

    /// Open a heading. Text collected until the heading closes becomes the
    /// title (or subtitle) of the nearest section.
    ///
    /// Without a section to receive it, or when the nearest section already
    /// has a title and content, a section is opened at `default_level`.
    /// Inside notes and introductions the heading text stays plain text.
    pub fn open_title(&mut self, target: TitleTarget, default_level: usize) -> ParseResult<()> {
        if self.in_document_root() {
            return Ok(());
        }
        let needs_section = match self.section_index() {
            Some(index) => {
                let has_content = index + 1 < self.containers.len()
                    || self.containers[index]
                        .kind
                        .contents()
                        .is_some_and(|c| !c.is_empty());
                let titled = matches!(
                    &self.containers[index].kind,
                    ContainerKind::Section { section, .. } if section.title.is_some()
                );
                target == TitleTarget::SectionTitle && titled && has_content
            }
            None => true,
        };
        if needs_section {
            self.open_section(default_level)?;
        }
        self.push_container(
            ContainerKind::Title {
                target,
                text: String::new(),
            },
            true,
        );
        Ok(())
    }

    pub(super) fn apply_title(&mut self, target: TitleTarget, text: &str) {
        let text = text.split_whitespace().collect::<Vec<_>>().join(" ");
        if text.is_empty() {
            return;
        }
        let Some(index) = self.section_index() else {
            tracing::debug!(%text, "heading without section dropped");
            return;
        };
        let ContainerKind::Section { section, .. } = &mut self.containers[index].kind else {
            return;
        };
        match target {
            TitleTarget::SectionTitle if section.title.is_none() => section.title = Some(text),
            _ => match &mut section.sub_title {
                Some(existing) => {
                    existing.push(' ');
                    existing.push_str(&text);
                }
                None => section.sub_title = Some(text),
            },
        }
    }

    /// Open a container collecting parallel-passage references for the
    /// nearest section.
    pub fn open_section_references(&mut self) -> ParseResult<()> {
        self.push_container(ContainerKind::SectionReferences, true);
        Ok(())
    }

    // ========================================================================
    // Paragraphs
    // ========================================================================

    /// Open a paragraph. `owned` paragraphs close with their tag; milestone
    /// paragraphs stay open until the next structural change.
    ///
    /// An open paragraph at the top of the current scope is closed first. A
    /// paragraph open deeper in the scope is an error unless automatic
    /// paragraph generation is enabled.
    pub fn open_paragraph(&mut self, owned: bool) -> ParseResult<ContainerId> {
        self.close_detached_line_structure()?;
        if matches!(self.top(), ContainerKind::Introduction(_)) {
            self.close_detached_introduction()?;
        }
        self.open_paragraph_in_scope(owned)
    }

    fn open_paragraph_in_scope(&mut self, owned: bool) -> ParseResult<ContainerId> {
        if let Some(index) = self.find_in_scope(|k| k.is_group(GroupKind::Paragraph)) {
            if index == self.containers.len() - 1 || self.options.auto_generate_paragraphs {
                self.close_down_to(index)?;
            } else {
                return Err(self.error(ParseErrorKind::NestedParagraph));
            }
        }
        Ok(self.push_group(GroupKind::Paragraph, None, owned))
    }

    /// Close the nearest paragraph in scope, with everything inside it.
    pub fn close_paragraph(&mut self) -> ParseResult<()> {
        match self.find_in_scope(|k| k.is_group(GroupKind::Paragraph)) {
            Some(index) => self.close_down_to(index),
            None => {
                tracing::debug!("paragraph end without open paragraph");
                Ok(())
            }
        }
    }

    /// Open a paragraph for text that arrived outside of one.
    pub(super) fn open_implicit_paragraph(&mut self) -> ParseResult<()> {
        let opening = std::mem::replace(&mut self.opening, false);
        let result = self.open_paragraph_in_scope(false);
        self.opening = opening;
        result.map(|_| ())
    }

    // ========================================================================
    // Poetry and lists
    // ========================================================================

    /// Open a line group (stanza). An automatically opened line group at the
    /// top of the stack is closed first.
    pub fn open_line_group(&mut self, owned: bool) -> ParseResult<ContainerId> {
        self.close_detached_line_structure()?;
        Ok(self.push_group(GroupKind::LineGroup, None, owned))
    }

    /// Close the nearest line group in scope.
    pub fn close_line_group(&mut self) -> ParseResult<()> {
        match self.find_in_scope(|k| k.is_group(GroupKind::LineGroup)) {
            Some(index) => self.close_down_to(index),
            None => {
                tracing::debug!("line group end without open line group");
                Ok(())
            }
        }
    }

    /// Open a line (or list item) at indentation `level` (1 is unindented).
    ///
    /// The previous line is closed, a line group is opened when none is
    /// open, and indent groups are opened or closed until the nesting
    /// matches `level`. Lines are numbered from 1 within their line group.
    pub fn open_line(&mut self, level: u32, kind: GroupKind, owned: bool) -> ParseResult<ContainerId> {
        let target = level.max(1) as usize;
        let line_group = match self.find_in_scope(|k| k.is_group(GroupKind::LineGroup)) {
            Some(index) => {
                self.close_down_to(self.innermost_line_structure(index) + 1)?;
                index
            }
            None => {
                if matches!(self.top(), ContainerKind::Introduction(_)) {
                    self.close_detached_introduction()?;
                }
                self.push_detached_group(GroupKind::LineGroup);
                self.containers.len() - 1
            }
        };

        let mut depth = self.containers.len() - line_group;
        while depth > target && self.top().is_group(GroupKind::Indent) {
            self.pop_container()?;
            depth -= 1;
        }
        while depth < target {
            self.push_detached_group(GroupKind::Indent);
            depth += 1;
        }

        let number = self.containers[line_group..]
            .iter()
            .filter_map(|c| c.kind.contents())
            .map(|contents| count_lines(contents, kind))
            .sum::<u32>()
            + 1;
        Ok(self.push_group(kind, Some(GroupModifier::LineNumber(number)), owned))
    }

    /// Close the nearest line or list item in scope.
    pub fn close_line(&mut self) -> ParseResult<()> {
        match self.find_in_scope(|k| k.group_kind().is_some_and(|g| g.is_line())) {
            Some(index) => self.close_down_to(index),
            None => {
                tracing::debug!("line end without open line");
                Ok(())
            }
        }
    }

    /// Index of the innermost line group or indent above `line_group` whose
    /// chain from the line group is unbroken.
    fn innermost_line_structure(&self, line_group: usize) -> usize {
        let mut index = line_group;
        while index + 1 < self.containers.len()
            && self.containers[index + 1].kind.is_group(GroupKind::Indent)
        {
            index += 1;
        }
        index
    }

    /// Close automatically opened line groups, indents and milestone lines
    /// at the top of the stack.
    fn close_detached_line_structure(&mut self) -> ParseResult<()> {
        while let Some(top) = self.containers.last()
            && top
                .kind
                .group_kind()
                .is_some_and(|g| g.is_line_structure() || g.is_line())
            && !self.is_owned(top.id)
        {
            self.pop_container()?;
        }
        Ok(())
    }

    // ========================================================================
    // Inline groups
    // ========================================================================

    /// Open a formatting group closed by its tag. Returns `None` when the
    /// current container only collects text (headings, reference labels),
    /// in which case the group is flattened into that text.
    pub fn open_group(
        &mut self,
        kind: GroupKind,
        modifier: Option<GroupModifier>,
    ) -> ParseResult<Option<ContainerId>> {
        self.reopen_group(kind, modifier, true)
    }

    pub(super) fn reopen_group(
        &mut self,
        kind: GroupKind,
        modifier: Option<GroupModifier>,
        owned: bool,
    ) -> ParseResult<Option<ContainerId>> {
        if self.top().contents().is_none() {
            tracing::trace!(group = kind.name(), "group flattened into text");
            return Ok(None);
        }
        Ok(Some(self.push_group(kind, modifier, owned)))
    }

    fn push_group(
        &mut self,
        kind: GroupKind,
        modifier: Option<GroupModifier>,
        owned: bool,
    ) -> ContainerId {
        self.push_container(ContainerKind::Group(Group::new(kind, modifier)), owned)
    }

    fn push_detached_group(&mut self, kind: GroupKind) -> ContainerId {
        self.push_group(kind, None, false)
    }

    /// Mark the most recent phrase as followed by a line break.
    pub fn mark_linebreak(&mut self) {
        for open in self.containers.iter_mut().rev() {
            if let Some(contents) = open.kind.contents_mut()
                && let Some(phrase) = last_phrase_mut(contents)
            {
                phrase.linebreak = true;
                return;
            }
        }
        tracing::debug!("line break before any text");
    }

    // ========================================================================
    // Introductions
    // ========================================================================

    /// Open an introduction closed by its tag.
    pub fn open_introduction(&mut self) -> ParseResult<ContainerId> {
        Ok(self.push_container(ContainerKind::Introduction(DocumentRoot::new()), true))
    }

    /// Open a paragraph of introductory text, opening a detached
    /// introduction when none is open.
    pub fn open_introduction_paragraph(&mut self) -> ParseResult<ContainerId> {
        self.enter_introduction()?;
        Ok(self.push_group(GroupKind::Paragraph, None, true))
    }

    /// Open an introduction heading.
    pub fn open_introduction_title(&mut self) -> ParseResult<ContainerId> {
        self.enter_introduction()?;
        Ok(self.push_group(GroupKind::Title, None, true))
    }

    fn enter_introduction(&mut self) -> ParseResult<()> {
        match self
            .containers
            .iter()
            .rposition(|c| matches!(c.kind, ContainerKind::Introduction(_)))
        {
            Some(index) => self.close_down_to(index + 1),
            None => {
                while !self.top().is_scope_boundary() {
                    self.pop_container()?;
                }
                self.push_container(ContainerKind::Introduction(DocumentRoot::new()), false);
                Ok(())
            }
        }
    }

    /// Close an introduction that no tag owns, once main text starts.
    pub(super) fn close_detached_introduction(&mut self) -> ParseResult<()> {
        let Some(index) = self
            .containers
            .iter()
            .rposition(|c| matches!(c.kind, ContainerKind::Introduction(_)))
        else {
            return Ok(());
        };
        if self.is_owned(self.containers[index].id) {
            return Ok(());
        }
        self.close_down_to(index)
    }

    /// Introductions inside a section describe it; any other introduction
    /// belongs to the book.
    pub(super) fn place_introduction(&mut self, root: DocumentRoot) {
        if root.is_empty() {
            return;
        }
        let last = self.containers.len() - 1;
        let target = match &mut self.containers[last].kind {
            ContainerKind::Section { section, .. } => &mut section.description,
            _ => &mut self.introduction,
        };
        match target {
            Some(existing) => existing.contents.extend(root.contents),
            None => *target = Some(root),
        }
    }

    /// Whether text at the current position belongs to a note or
    /// introduction.
    pub(super) fn in_document_root(&self) -> bool {
        self.containers
            .iter()
            .rev()
            .find(|c| c.kind.is_scope_boundary())
            .is_some_and(|c| c.kind.is_document_root())
    }

    /// Whether the innermost text container is a canonical title.
    pub(super) fn in_title_group(&self) -> bool {
        self.find_in_scope(|k| k.is_group(GroupKind::Title)).is_some()
    }
}

/// Count lines of `kind` in `nodes`, looking through indent groups.
fn count_lines(nodes: &[ContentNode], kind: GroupKind) -> u32 {
    nodes
        .iter()
        .map(|node| match node {
            ContentNode::Group(g) if g.kind == kind => 1,
            ContentNode::Group(g) if g.kind == GroupKind::Indent => count_lines(&g.contents, kind),
            _ => 0,
        })
        .sum()
}
