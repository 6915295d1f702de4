//! Markup event source.
//!
//! Turns XML text into the flat open/text/close event stream consumed by the
//! dialect front ends. Self-closing elements are reported as an open event
//! with `self_closing` set, immediately followed by their close event.
//! Adjacent text and entity references are merged into one text event so a
//! tag is never split from its text mid-way.

use std::collections::VecDeque;

use quick_xml::Reader;
use quick_xml::events::{BytesStart, Event};

use crate::error::Result;

/// An opening tag with its attributes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OpenTag {
    /// Local name (namespace prefix removed).
    pub name: String,
    pub attributes: Vec<(String, String)>,
    pub self_closing: bool,
}

impl OpenTag {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            attributes: Vec::new(),
            self_closing: false,
        }
    }

    pub fn with_attr(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.push((key.into(), value.into()));
        self
    }

    pub fn self_closing(mut self) -> Self {
        self.self_closing = true;
        self
    }

    /// Attribute value by local name.
    pub fn attr(&self, key: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Attribute value, treating empty values as absent.
    pub fn non_empty_attr(&self, key: &str) -> Option<&str> {
        self.attr(key).map(str::trim).filter(|v| !v.is_empty())
    }
}

/// One event of the markup stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MarkupEvent {
    Open(OpenTag),
    Text(String),
    Close(String),
}

impl MarkupEvent {
    pub fn open(name: &str) -> Self {
        MarkupEvent::Open(OpenTag::new(name))
    }

    pub fn text(value: &str) -> Self {
        MarkupEvent::Text(value.to_string())
    }

    pub fn close(name: &str) -> Self {
        MarkupEvent::Close(name.to_string())
    }
}

/// Streaming iterator over the markup events of an XML string or fragment.
///
/// End-tag names are not checked against start tags: verse-sized fragments
/// routinely close elements opened in an earlier fragment, and the
/// structural parser validates nesting itself.
pub struct MarkupEvents<'a> {
    reader: Reader<&'a [u8]>,
    queued: VecDeque<MarkupEvent>,
    text: String,
    done: bool,
}

impl<'a> MarkupEvents<'a> {
    pub fn new(xml: &'a str) -> Self {
        let mut reader = Reader::from_str(xml);
        let config = reader.config_mut();
        config.check_end_names = false;
        config.allow_unmatched_ends = true;
        Self {
            reader,
            queued: VecDeque::new(),
            text: String::new(),
            done: false,
        }
    }

    /// Byte position of the reader, for error reporting.
    pub fn position(&self) -> u64 {
        self.reader.buffer_position()
    }

    fn flush_text(&mut self) {
        if !self.text.is_empty() {
            self.queued
                .push_back(MarkupEvent::Text(std::mem::take(&mut self.text)));
        }
    }

    /// Read raw events until at least one markup event is queued.
    fn fill(&mut self) -> Result<()> {
        while self.queued.is_empty() && !self.done {
            match self.reader.read_event()? {
                Event::Start(e) => {
                    self.flush_text();
                    self.queued.push_back(MarkupEvent::Open(open_tag(&e, false)));
                }
                Event::Empty(e) => {
                    self.flush_text();
                    let tag = open_tag(&e, true);
                    let name = tag.name.clone();
                    self.queued.push_back(MarkupEvent::Open(tag));
                    self.queued.push_back(MarkupEvent::Close(name));
                }
                Event::End(e) => {
                    self.flush_text();
                    let name = local_name(e.name().as_ref());
                    self.queued.push_back(MarkupEvent::Close(name));
                }
                Event::Text(e) => {
                    self.text.push_str(&String::from_utf8_lossy(e.as_ref()));
                }
                Event::CData(e) => {
                    self.text.push_str(&String::from_utf8_lossy(e.as_ref()));
                }
                Event::GeneralRef(e) => {
                    let entity = String::from_utf8_lossy(e.as_ref());
                    match resolve_entity(&entity) {
                        Some(resolved) => self.text.push_str(&resolved),
                        None => tracing::debug!(%entity, "unknown entity reference dropped"),
                    }
                }
                Event::Eof => {
                    self.flush_text();
                    self.done = true;
                }
                _ => {}
            }
        }
        Ok(())
    }
}

impl Iterator for MarkupEvents<'_> {
    type Item = Result<MarkupEvent>;

    fn next(&mut self) -> Option<Self::Item> {
        if let Err(e) = self.fill() {
            self.done = true;
            self.queued.clear();
            return Some(Err(e));
        }
        self.queued.pop_front().map(Ok)
    }
}

/// Tokenize a whole document or fragment into a vector of events.
pub fn tokenize(xml: &str) -> Result<Vec<MarkupEvent>> {
    MarkupEvents::new(xml).collect()
}

fn open_tag(e: &BytesStart<'_>, self_closing: bool) -> OpenTag {
    let name = local_name(e.name().as_ref());
    let attributes = e
        .attributes()
        .flatten()
        .map(|attr| {
            let key = local_name(attr.key.as_ref());
            let value = unescape(&String::from_utf8_lossy(&attr.value));
            (key, value)
        })
        .collect();
    OpenTag {
        name,
        attributes,
        self_closing,
    }
}

fn local_name(name: &[u8]) -> String {
    let local = name
        .iter()
        .rposition(|&b| b == b':')
        .map(|i| &name[i + 1..])
        .unwrap_or(name);
    String::from_utf8_lossy(local).into_owned()
}

/// Replace entity references in an attribute value.
fn unescape(value: &str) -> String {
    if !value.contains('&') {
        return value.to_string();
    }
    let mut out = String::with_capacity(value.len());
    let mut rest = value;
    while let Some(start) = rest.find('&') {
        out.push_str(&rest[..start]);
        let after = &rest[start + 1..];
        match after.find(';').and_then(|end| resolve_entity(&after[..end]).map(|r| (end, r))) {
            Some((end, resolved)) => {
                out.push_str(&resolved);
                rest = &after[end + 1..];
            }
            None => {
                out.push('&');
                rest = after;
            }
        }
    }
    out.push_str(rest);
    out
}

/// Resolve XML entity references.
fn resolve_entity(entity: &str) -> Option<String> {
    match entity {
        "apos" => return Some("'".to_string()),
        "quot" => return Some("\"".to_string()),
        "lt" => return Some("<".to_string()),
        "gt" => return Some(">".to_string()),
        "amp" => return Some("&".to_string()),
        "nbsp" => return Some("\u{a0}".to_string()),
        _ => {}
    }

    let code = if let Some(hex) = entity
        .strip_prefix("#x")
        .or_else(|| entity.strip_prefix("#X"))
    {
        u32::from_str_radix(hex, 16).ok()
    } else {
        entity.strip_prefix('#').and_then(|dec| dec.parse().ok())
    };
    code.and_then(char::from_u32).map(|c| c.to_string())
}
