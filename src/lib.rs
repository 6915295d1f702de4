//! # lectio
//!
//! Converts Bible markup (OSIS and USX) into a canonical content tree.
//!
//! ## Features
//!
//! - One structural parser shared by every markup dialect: sections,
//!   paragraphs, poetry lines, notes, cross references, Strong's numbers
//!   and verse joins
//! - Document import (a whole OSIS or USX file) and verse-by-verse import
//!   from a [`VerseSource`]
//! - Strong's number normalization
//! - Versification rule table loading
//!
//! ## Quick Start
//!
//! ```
//! use lectio::{Osis, ParserOptions, VersionMeta, import_document};
//! use lectio::books::standard_book_meta;
//!
//! let xml = r#"<div type="book" osisID="Gen">
//!   <chapter osisID="Gen.1"><p><verse osisID="Gen.1.1"/>In the beginning.</p></chapter>
//! </div>"#;
//! let version = VersionMeta::new("KJV", "en", "King James Version");
//! let mut books: Vec<lectio::BookTree> = Vec::new();
//! import_document(Osis, xml, &standard_book_meta(), &version, ParserOptions::default(), &mut books)
//!     .unwrap();
//! assert_eq!(books[0].phrases()[0].content, "In the beginning.");
//! ```
//!
//! ## Driving the parser directly
//!
//! A [`TagDispatcher`] accepts markup events one at a time, which suits
//! sources that hand out verse-sized fragments:
//!
//! ```
//! use lectio::{BookMeta, ParserOptions, TagDispatcher, Usx};
//!
//! let book = BookMeta::new("Ruth", 8, "Ruth", "Ruth");
//! let mut dispatcher = TagDispatcher::new(Usx, book, ParserOptions::default());
//! dispatcher.feed(r#"<chapter number="1"/><para style="p"><verse number="1"/>In the days"#).unwrap();
//! dispatcher.feed("</para>").unwrap();
//! let tree = dispatcher.finish().unwrap();
//! assert_eq!(tree.phrases()[0].verse, Some(1));
//! ```

pub mod books;
pub mod dialect;
pub mod error;
pub mod import;
pub mod model;
pub mod parser;
pub mod strongs;
pub mod versification;
pub mod xml;
pub(crate) mod util;

#[cfg(feature = "cli")]
pub mod logging;

pub use dialect::{Dialect, Osis, TagAction, TagDispatcher, Usx};
pub use error::{Error, ParseError, ParseErrorKind, Result};
pub use import::{
    BookSink, ImportSummary, MemoryVerseSource, VerseSource, import_book_from_verses,
    import_document, import_file,
};
pub use model::{BookMeta, BookTree, ContentNode, Coordinate, RangeRef, VersionMeta};
pub use parser::{ParserOptions, StructuralParser};
pub use versification::{RuleTable, VersificationRule, load_rules, load_rules_from_path};
