//! Parser configuration.

/// Options controlling how tolerant the structural parser is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParserOptions {
    /// Close a paragraph that is still open deeper in the current scope
    /// instead of failing, and open a paragraph for stray text.
    pub auto_generate_paragraphs: bool,
    /// Whether the source carries paragraph/line markup. When `false`, text
    /// outside any paragraph opens one automatically.
    pub structural_markup: bool,
    /// Fail on tags and styles the dialect does not know instead of logging
    /// a warning and passing their content through.
    pub strict_tags: bool,
}

impl Default for ParserOptions {
    fn default() -> Self {
        Self {
            auto_generate_paragraphs: false,
            structural_markup: true,
            strict_tags: false,
        }
    }
}

impl ParserOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_auto_generate_paragraphs(mut self, enabled: bool) -> Self {
        self.auto_generate_paragraphs = enabled;
        self
    }

    pub fn with_structural_markup(mut self, present: bool) -> Self {
        self.structural_markup = present;
        self
    }

    pub fn with_strict_tags(mut self, strict: bool) -> Self {
        self.strict_tags = strict;
        self
    }

    /// Whether text with no paragraph ancestor may open one.
    pub(crate) fn may_open_paragraph_for_text(&self) -> bool {
        self.auto_generate_paragraphs || !self.structural_markup
    }
}
