//! Import drivers.
//!
//! Two ways of getting books into content trees:
//! - **Document import**: one markup document holding one or more books
//!   (an OSIS file, a USX file), split at the dialect's book boundaries.
//! - **Verse import**: verse-sized markup fragments pulled from a
//!   [`VerseSource`] such as a SWORD module reader.
//!
//! Finished trees are handed to a [`BookSink`] as soon as each book closes.

mod verses;

pub use verses::{MemoryVerseSource, VerseSource, import_book_from_verses};

use std::path::Path;

use crate::books::find_book;
use crate::dialect::{BookScope, Dialect, TagDispatcher};
use crate::error::{Error, Result};
use crate::model::{BookMeta, BookTree, VersionMeta};
use crate::parser::ParserOptions;
use crate::xml::{MarkupEvent, MarkupEvents};

/// Receives finished book trees.
pub trait BookSink {
    fn accept(&mut self, version: &VersionMeta, book: BookTree) -> Result<()>;
}

impl BookSink for Vec<BookTree> {
    fn accept(&mut self, _version: &VersionMeta, book: BookTree) -> Result<()> {
        self.push(book);
        Ok(())
    }
}

/// Counts reported after a document import.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImportSummary {
    /// OSIS ids of the imported books, in document order.
    pub books: Vec<String>,
    pub phrases: usize,
    pub placeholders: usize,
}

struct ActiveBook<D> {
    dispatcher: TagDispatcher<D>,
    scope: BookScope,
    /// Element depth at which the book started.
    depth: usize,
}

/// Import every book of a markup document into `sink`.
///
/// Books are resolved against `catalog`; a book the catalog does not list
/// is an error. Markup outside any book is ignored.
pub fn import_document<D, S>(
    dialect: D,
    xml: &str,
    catalog: &[BookMeta],
    version: &VersionMeta,
    options: ParserOptions,
    sink: &mut S,
) -> Result<ImportSummary>
where
    D: Dialect + Clone,
    S: BookSink + ?Sized,
{
    let mut summary = ImportSummary::default();
    let mut active: Option<ActiveBook<D>> = None;
    let mut depth = 0usize;

    for event in MarkupEvents::new(xml) {
        match event? {
            MarkupEvent::Open(tag) => {
                let boundary = dialect.book_boundary(&tag);
                if let Some(boundary) = boundary
                    && active.as_ref().is_none_or(|b| b.scope == BookScope::Parent)
                {
                    if let Some(book) = active.take() {
                        deliver(book, version, sink, &mut summary)?;
                    }
                    let meta = resolve_book(&boundary.book_id, catalog)?;
                    tracing::debug!(dialect = dialect.name(), book = %meta.osis_id, "book started");
                    let mut book = ActiveBook {
                        dispatcher: TagDispatcher::new(dialect.clone(), meta, options),
                        scope: boundary.scope,
                        depth,
                    };
                    if boundary.scope == BookScope::Parent {
                        book.dispatcher.handle(MarkupEvent::Open(tag))?;
                    }
                    active = Some(book);
                } else if let Some(book) = active.as_mut() {
                    book.dispatcher.handle(MarkupEvent::Open(tag))?;
                }
                depth += 1;
            }
            MarkupEvent::Close(name) => {
                depth = depth.saturating_sub(1);
                let ends = active.as_ref().is_some_and(|book| match book.scope {
                    BookScope::Element => depth == book.depth,
                    BookScope::Parent => depth < book.depth,
                });
                if ends {
                    if let Some(book) = active.take() {
                        deliver(book, version, sink, &mut summary)?;
                    }
                } else if let Some(book) = active.as_mut() {
                    book.dispatcher.handle(MarkupEvent::Close(name))?;
                }
            }
            MarkupEvent::Text(text) => {
                if let Some(book) = active.as_mut() {
                    book.dispatcher.handle(MarkupEvent::Text(text))?;
                }
            }
        }
    }
    if let Some(book) = active.take() {
        deliver(book, version, sink, &mut summary)?;
    }

    tracing::info!(
        version = %version.uid,
        books = summary.books.len(),
        phrases = summary.phrases,
        placeholders = summary.placeholders,
        "import finished"
    );
    Ok(summary)
}

/// Read a markup file (any supported encoding) and import it.
pub fn import_file<D, S>(
    dialect: D,
    path: impl AsRef<Path>,
    catalog: &[BookMeta],
    version: &VersionMeta,
    options: ParserOptions,
    sink: &mut S,
) -> Result<ImportSummary>
where
    D: Dialect + Clone,
    S: BookSink + ?Sized,
{
    let bytes = std::fs::read(path.as_ref())?;
    let xml = crate::util::decode_text(&bytes, None);
    import_document(dialect, &xml, catalog, version, options, sink)
}

fn deliver<D: Dialect, S: BookSink + ?Sized>(
    book: ActiveBook<D>,
    version: &VersionMeta,
    sink: &mut S,
    summary: &mut ImportSummary,
) -> Result<()> {
    let tree = book.dispatcher.finish()?;
    let phrases = tree.phrases();
    let placeholders = phrases.iter().filter(|p| p.is_placeholder()).count();
    tracing::info!(
        book = %tree.book.osis_id,
        phrases = phrases.len(),
        placeholders,
        "book imported"
    );
    summary.phrases += phrases.len();
    summary.placeholders += placeholders;
    summary.books.push(tree.book.osis_id.clone());
    sink.accept(version, tree)
}

/// Find the catalog entry for a book id in any notation.
fn resolve_book(id: &str, catalog: &[BookMeta]) -> Result<BookMeta> {
    let info = find_book(id).ok_or_else(|| Error::UnknownBook(id.to_string()))?;
    catalog
        .iter()
        .find(|meta| meta.osis_id == info.osis_id)
        .cloned()
        .ok_or_else(|| Error::UnknownBook(id.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::books::standard_book_meta;
    use crate::dialect::{Osis, Usx};

    fn version() -> VersionMeta {
        VersionMeta::new("TEST", "en", "Test Version")
    }

    #[test]
    fn test_osis_books_split() {
        let xml = r#"<osis><osisText>
            <div type="book" osisID="Gen"><chapter osisID="Gen.1"><p>
              <verse osisID="Gen.1.1"/>In the beginning.</p></chapter></div>
            <div type="book" osisID="Exod"><chapter osisID="Exod.1"><p>
              <verse osisID="Exod.1.1"/>Now these.</p></chapter></div>
        </osisText></osis>"#;
        let mut books: Vec<BookTree> = Vec::new();
        let summary = import_document(
            Osis,
            xml,
            &standard_book_meta(),
            &version(),
            ParserOptions::default(),
            &mut books,
        )
        .unwrap();
        assert_eq!(summary.books, vec!["Gen", "Exod"]);
        assert_eq!(summary.phrases, 2);
        assert_eq!(books[1].phrases()[0].content, "Now these.");
    }

    #[test]
    fn test_usx_book_runs_to_parent_close() {
        let xml = r#"<usx version="3.0"><book code="RUT" style="id">Ruth</book>
            <chapter number="1" style="c" sid="RUT 1"/>
            <para style="p"><verse number="1" style="v" sid="RUT 1:1"/>In the days.</para>
            </usx><!-- trailing -->"#;
        let mut books: Vec<BookTree> = Vec::new();
        let summary = import_document(
            Usx,
            xml,
            &standard_book_meta(),
            &version(),
            ParserOptions::default(),
            &mut books,
        )
        .unwrap();
        assert_eq!(summary.books, vec!["Ruth"]);
        assert_eq!(books[0].phrases()[0].content, "In the days.");
    }

    #[test]
    fn test_book_missing_from_catalog() {
        let xml = r#"<div type="book" osisID="Tob"><chapter osisID="Tob.1"/></div>"#;
        let catalog = vec![BookMeta::new("Gen", 1, "Genesis", "Gen")];
        let mut books: Vec<BookTree> = Vec::new();
        let err = import_document(
            Osis,
            xml,
            &catalog,
            &version(),
            ParserOptions::default(),
            &mut books,
        )
        .unwrap_err();
        assert!(matches!(err, Error::UnknownBook(id) if id == "Tob"));
    }
}
