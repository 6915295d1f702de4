//! USX front end.
//!
//! USX carries most of its meaning in `style` attributes: `para` styles map
//! to block structure and `char` styles to inline formatting.

use super::{BookBoundary, BookScope, Dialect, TagAction, parse_number, parse_verse_number};
use crate::books::find_book;
use crate::error::ParseErrorKind;
use crate::model::{BookMeta, GroupKind, GroupModifier, RangeRef, parse_verse_token};
use crate::parser::TitleTarget;
use crate::strongs;
use crate::xml::OpenTag;

type Classified = Result<TagAction, ParseErrorKind>;

const SECTION_STYLES: &[&str] = &["ms1", "ms2", "ms3", "s1", "s2", "s3", "s4"];

const PARAGRAPH_STYLES: &[&str] = &[
    "p", "m", "po", "pr", "cls", "pmo", "pm", "pmc", "pmr", "pi", "pi1", "pi2", "pi3", "mi",
    "nb", "pc", "ph", "ph1", "ph2", "ph3", "lit", "cd",
];

const SKIPPED_PARA_STYLES: &[&str] = &[
    "h", "h1", "h2", "h3", "toc1", "toc2", "toc3", "toca1", "toca2", "toca3", "mt", "mt1",
    "mt2", "mt3", "mt4", "mte", "mte1", "mte2", "ide", "rem", "sts", "restore", "cl", "cp",
    "mr", "sr",
];

const INTRODUCTION_TITLE_STYLES: &[&str] = &[
    "imt", "imt1", "imt2", "imt3", "imt4", "is", "is1", "is2", "is3", "iot", "imte", "imte1",
    "imte2",
];

const INTRODUCTION_STYLES: &[&str] = &[
    "ip", "ipi", "im", "imi", "ipq", "imq", "ipr", "iq", "iq1", "iq2", "iq3", "ib", "ili",
    "ili1", "ili2", "io", "io1", "io2", "io3", "io4", "iex", "ie",
];

/// Character styles passed through without a group.
const PLAIN_CHAR_STYLES: &[&str] = &[
    "ft", "fk", "fq", "fqa", "fl", "fw", "fp", "fv", "fdc", "xk", "xq", "xt", "xta", "xot",
    "xnt", "xdc", "no", "sc", "pn", "png", "addpn", "k", "ord", "sig", "sls", "tl", "dc",
    "bk", "qac", "lik", "liv", "litl", "rq", "ior", "iqt", "va", "vp", "ca", "cat",
];

/// USX element names.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum UsxElement {
    Usx,
    Book,
    Chapter,
    Verse,
    Para,
    Char,
    Note,
    Ref,
    OptBreak,
    /// Elements whose content is not Bible text.
    Skipped,
    Transparent,
    Unknown,
}

impl UsxElement {
    fn from_name(name: &str) -> Self {
        match name {
            "usx" => UsxElement::Usx,
            "book" => UsxElement::Book,
            "chapter" => UsxElement::Chapter,
            "verse" => UsxElement::Verse,
            "para" => UsxElement::Para,
            "char" => UsxElement::Char,
            "note" => UsxElement::Note,
            "ref" => UsxElement::Ref,
            "optbreak" => UsxElement::OptBreak,
            "figure" | "sidebar" | "periph" => UsxElement::Skipped,
            "table" | "row" | "cell" | "ms" | "link" => UsxElement::Transparent,
            _ => UsxElement::Unknown,
        }
    }
}

/// `para` styles.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum UsxParaStyle {
    /// Section heading, carrying its entry in [`SECTION_STYLES`].
    Heading(&'static str),
    Poetry(u32),
    ListItem(u32),
    Paragraph,
    /// Centered, right aligned and embedded poetry lines.
    PlacedLine,
    Blank,
    ParallelReferences,
    CanonicalTitle,
    Speaker,
    Skipped,
    IntroductionTitle,
    Introduction,
    Unknown,
}

impl UsxParaStyle {
    fn from_style(style: &str) -> Self {
        let heading = match style {
            "ms" => "ms1",
            "s" => "s1",
            other => other,
        };
        if let Some(name) = SECTION_STYLES.iter().copied().find(|s| *s == heading) {
            return UsxParaStyle::Heading(name);
        }
        if let Some(level) = numbered_style(style, "q") {
            return UsxParaStyle::Poetry(level);
        }
        if let Some(level) = numbered_style(style, "li") {
            return UsxParaStyle::ListItem(level);
        }
        match style {
            s if PARAGRAPH_STYLES.contains(&s) => UsxParaStyle::Paragraph,
            "qc" | "qr" | "qm" | "qm1" | "qm2" => UsxParaStyle::PlacedLine,
            "b" => UsxParaStyle::Blank,
            "r" => UsxParaStyle::ParallelReferences,
            "d" | "qa" => UsxParaStyle::CanonicalTitle,
            "sp" => UsxParaStyle::Speaker,
            s if SKIPPED_PARA_STYLES.contains(&s) => UsxParaStyle::Skipped,
            s if INTRODUCTION_TITLE_STYLES.contains(&s) => UsxParaStyle::IntroductionTitle,
            s if INTRODUCTION_STYLES.contains(&s) => UsxParaStyle::Introduction,
            _ => UsxParaStyle::Unknown,
        }
    }
}

/// `char` styles.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum UsxCharStyle {
    Addition,
    DivineName,
    Bold,
    Italic,
    Emphasis,
    WordsOfJesus,
    Selah,
    Word,
    Jump,
    /// Note origin and mark references, repeated from the verse.
    Origin,
    Plain,
    Unknown,
}

impl UsxCharStyle {
    fn from_style(style: &str) -> Self {
        match style {
            "add" => UsxCharStyle::Addition,
            "nd" => UsxCharStyle::DivineName,
            "bd" | "bdit" => UsxCharStyle::Bold,
            "it" => UsxCharStyle::Italic,
            "em" => UsxCharStyle::Emphasis,
            "wj" => UsxCharStyle::WordsOfJesus,
            "qs" => UsxCharStyle::Selah,
            "w" | "wg" | "wh" => UsxCharStyle::Word,
            "jmp" => UsxCharStyle::Jump,
            "fr" | "xo" | "fm" => UsxCharStyle::Origin,
            s if PLAIN_CHAR_STYLES.contains(&s) => UsxCharStyle::Plain,
            _ => UsxCharStyle::Unknown,
        }
    }
}

/// The USX dialect.
#[derive(Debug, Clone, Copy, Default)]
pub struct Usx;

impl Dialect for Usx {
    fn name(&self) -> &'static str {
        "usx"
    }

    fn section_tags(&self) -> &'static [&'static str] {
        SECTION_STYLES
    }

    fn default_heading_level(&self) -> usize {
        3
    }

    fn classify(&self, tag: &OpenTag, book: &BookMeta) -> Classified {
        let style = tag.attr("style").unwrap_or_default();
        match UsxElement::from_name(&tag.name) {
            UsxElement::Usx | UsxElement::Transparent => Ok(TagAction::Ignore),
            UsxElement::Book => {
                if let Some(code) = tag.non_empty_attr("code") {
                    check_book(code, book)?;
                }
                Ok(TagAction::SkipContent)
            }
            UsxElement::Chapter => match (tag.attr("eid"), tag.non_empty_attr("number")) {
                (Some(_), _) => Ok(TagAction::ChapterEnd),
                (None, Some(number)) => parse_number(number).map(TagAction::ChapterStart),
                (None, None) => Ok(TagAction::Ignore),
            },
            UsxElement::Verse => match (tag.attr("eid"), tag.non_empty_attr("number")) {
                (Some(_), _) => Ok(TagAction::VerseEnd),
                (None, Some(number)) => parse_verse_number(number).map(TagAction::VerseStart),
                (None, None) => Ok(TagAction::Ignore),
            },
            UsxElement::Para => Ok(self.classify_para(UsxParaStyle::from_style(style))),
            UsxElement::Char => Ok(classify_char(tag, UsxCharStyle::from_style(style))),
            UsxElement::Note => Ok(classify_note(tag, style)),
            UsxElement::Ref => match tag.non_empty_attr("loc") {
                Some(loc) => parse_usx_loc(loc).map(TagAction::Reference),
                None => Ok(TagAction::Ignore),
            },
            UsxElement::OptBreak => Ok(TagAction::LineBreak),
            UsxElement::Skipped => Ok(TagAction::SkipContent),
            UsxElement::Unknown => Ok(TagAction::Unsupported),
        }
    }

    fn book_boundary(&self, tag: &OpenTag) -> Option<BookBoundary> {
        if UsxElement::from_name(&tag.name) != UsxElement::Book {
            return None;
        }
        tag.non_empty_attr("code").map(|code| BookBoundary {
            book_id: code.to_string(),
            scope: BookScope::Parent,
        })
    }
}

impl Usx {
    fn classify_para(&self, style: UsxParaStyle) -> TagAction {
        let line = |level, kind| TagAction::Line {
            level,
            kind,
            milestone: false,
        };
        match style {
            UsxParaStyle::Heading(name) => match self.section_level(name) {
                Some(tag_level) => TagAction::SectionHeading { tag_level },
                None => TagAction::Unsupported,
            },
            UsxParaStyle::Poetry(level) => line(level, GroupKind::Line),
            UsxParaStyle::ListItem(level) => line(level, GroupKind::UnorderedListItem),
            UsxParaStyle::Paragraph => TagAction::Paragraph { milestone: false },
            UsxParaStyle::PlacedLine => line(1, GroupKind::Line),
            UsxParaStyle::Blank => TagAction::StanzaBreak,
            UsxParaStyle::ParallelReferences => TagAction::SectionReferences,
            UsxParaStyle::CanonicalTitle => TagAction::CanonicalTitle,
            UsxParaStyle::Speaker => TagAction::Title(TitleTarget::SectionSubTitle),
            UsxParaStyle::Skipped => TagAction::SkipContent,
            UsxParaStyle::IntroductionTitle => TagAction::IntroductionTitle,
            UsxParaStyle::Introduction => TagAction::IntroductionParagraph,
            UsxParaStyle::Unknown => TagAction::Unsupported,
        }
    }
}

/// Level of a numbered style such as `q2` (`q` alone is level 1).
fn numbered_style(style: &str, prefix: &str) -> Option<u32> {
    let rest = style.strip_prefix(prefix)?;
    if rest.is_empty() {
        return Some(1);
    }
    rest.parse().ok().filter(|level| (1..=4).contains(level))
}

fn group(kind: GroupKind) -> TagAction {
    TagAction::Group {
        kind,
        modifier: None,
    }
}

fn classify_char(tag: &OpenTag, style: UsxCharStyle) -> TagAction {
    match style {
        UsxCharStyle::Addition => group(GroupKind::TranslationChange),
        UsxCharStyle::DivineName => group(GroupKind::DivineName),
        UsxCharStyle::Bold => group(GroupKind::Bold),
        UsxCharStyle::Italic => group(GroupKind::Italic),
        UsxCharStyle::Emphasis => group(GroupKind::Emphasis),
        UsxCharStyle::WordsOfJesus => TagAction::Group {
            kind: GroupKind::Quote,
            modifier: Some(GroupModifier::JesusSpeech),
        },
        UsxCharStyle::Selah => group(GroupKind::Sela),
        UsxCharStyle::Word => match tag.non_empty_attr("strong") {
            Some(codes) => TagAction::Strongs(strongs::normalize_codes(codes)),
            None => TagAction::Ignore,
        },
        UsxCharStyle::Jump => match tag.non_empty_attr("href") {
            Some(href) => TagAction::Group {
                kind: GroupKind::Link,
                modifier: Some(GroupModifier::LinkTarget(href.to_string())),
            },
            None => TagAction::Ignore,
        },
        UsxCharStyle::Origin => TagAction::SkipContent,
        UsxCharStyle::Plain => TagAction::Ignore,
        UsxCharStyle::Unknown => TagAction::Unsupported,
    }
}

fn classify_note(tag: &OpenTag, style: &str) -> TagAction {
    let key = tag
        .non_empty_attr("caller")
        .filter(|caller| !matches!(*caller, "+" | "-"))
        .map(str::to_string);
    match style {
        "x" | "ex" => TagAction::CrossReferenceNote { key },
        _ => TagAction::Note {
            key,
            note_type: Some(style.to_string()).filter(|s| !s.is_empty()),
        },
    }
}

fn check_book(code: &str, book: &BookMeta) -> Result<(), ParseErrorKind> {
    let found = find_book(code).ok_or_else(|| ParseErrorKind::UnknownBook(code.to_string()))?;
    if found.osis_id == book.osis_id {
        Ok(())
    } else {
        Err(ParseErrorKind::BookMismatch {
            expected: book.osis_id.clone(),
            found: found.osis_id.to_string(),
        })
    }
}

/// Parse a USX `loc` attribute (`GEN 1:1`, `GEN 1:1-5`, `GEN 1:1-2:3`,
/// `PSA 23`) into a range.
pub fn parse_usx_loc(value: &str) -> Result<RangeRef, ParseErrorKind> {
    let invalid = || ParseErrorKind::InvalidReference(value.to_string());
    let (code, rest) = value.trim().split_once(' ').ok_or_else(invalid)?;
    let book = find_book(code).ok_or_else(|| ParseErrorKind::UnknownBook(code.to_string()))?;
    let (start, end) = match rest.split_once('-') {
        Some((start, end)) => (start.trim(), Some(end.trim())),
        None => (rest.trim(), None),
    };

    let range = match start.split_once(':') {
        Some((chapter, verse)) => {
            let chapter = chapter.parse().map_err(|_| invalid())?;
            let (verse, subverse) = parse_verse_token(verse).ok_or_else(invalid)?;
            RangeRef::verse(book.osis_id, chapter, verse).with_subverse(subverse)
        }
        None => RangeRef::chapter(book.osis_id, start.parse().map_err(|_| invalid())?),
    };
    let Some(end) = end else {
        return Ok(range);
    };

    // The end may repeat the book code.
    let end = match end.split_once(' ') {
        Some((end_code, end)) => {
            if find_book(end_code).map(|b| b.osis_id) != Some(book.osis_id) {
                return Err(invalid());
            }
            end
        }
        None => end,
    };
    let number = |s: &str| parse_verse_token(s).map(|(n, _)| n).ok_or_else(invalid);
    let (end_chapter, end_verse) = match (end.split_once(':'), range.verse) {
        (Some((c, v)), _) => (Some(number(c)?), Some(number(v)?)),
        (None, Some(_)) => (None, Some(number(end)?)),
        (None, None) => (Some(number(end)?), None),
    };
    Ok(range.through(end_chapter, end_verse))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::VerseMark;

    fn genesis() -> BookMeta {
        BookMeta::new("Gen", 1, "Genesis", "Gen")
    }

    fn para(style: &str) -> TagAction {
        Usx.classify(&OpenTag::new("para").with_attr("style", style), &genesis())
            .unwrap()
    }

    fn char_style(style: &str) -> TagAction {
        Usx.classify(&OpenTag::new("char").with_attr("style", style), &genesis())
            .unwrap()
    }

    #[test]
    fn test_parse_usx_loc() {
        assert_eq!(parse_usx_loc("GEN 1:1").unwrap(), RangeRef::verse("Gen", 1, 1));
        assert_eq!(parse_usx_loc("GEN 1:1-5").unwrap().to_string(), "Gen 1:1-5");
        assert_eq!(parse_usx_loc("GEN 1:31-2:3").unwrap().to_string(), "Gen 1:31-2:3");
        assert_eq!(parse_usx_loc("PSA 23").unwrap(), RangeRef::chapter("Ps", 23));
        assert_eq!(parse_usx_loc("JHN 3:16-JHN 3:18").unwrap().end_verse, Some(18));
        assert!(matches!(
            parse_usx_loc("XYZ 1:1"),
            Err(ParseErrorKind::UnknownBook(_))
        ));
        assert!(matches!(
            parse_usx_loc("GEN"),
            Err(ParseErrorKind::InvalidReference(_))
        ));
    }

    #[test]
    fn test_section_styles() {
        assert_eq!(para("s1"), TagAction::SectionHeading { tag_level: 3 });
        assert_eq!(para("s"), TagAction::SectionHeading { tag_level: 3 });
        assert_eq!(para("ms"), TagAction::SectionHeading { tag_level: 0 });
        assert_eq!(para("s3"), TagAction::SectionHeading { tag_level: 5 });
    }

    #[test]
    fn test_para_styles() {
        assert_eq!(para("p"), TagAction::Paragraph { milestone: false });
        assert_eq!(
            para("q2"),
            TagAction::Line {
                level: 2,
                kind: GroupKind::Line,
                milestone: false
            }
        );
        assert_eq!(
            para("li"),
            TagAction::Line {
                level: 1,
                kind: GroupKind::UnorderedListItem,
                milestone: false
            }
        );
        assert_eq!(para("b"), TagAction::StanzaBreak);
        assert_eq!(para("d"), TagAction::CanonicalTitle);
        assert_eq!(para("mt1"), TagAction::SkipContent);
        assert_eq!(para("is1"), TagAction::IntroductionTitle);
        assert_eq!(para("ip"), TagAction::IntroductionParagraph);
        assert_eq!(para("zzz"), TagAction::Unsupported);
    }

    #[test]
    fn test_style_vocabulary() {
        assert_eq!(UsxParaStyle::from_style("s"), UsxParaStyle::Heading("s1"));
        assert_eq!(UsxParaStyle::from_style("q3"), UsxParaStyle::Poetry(3));
        assert_eq!(UsxParaStyle::from_style("q9"), UsxParaStyle::Unknown);
        assert_eq!(UsxParaStyle::from_style("li2"), UsxParaStyle::ListItem(2));
        assert_eq!(UsxCharStyle::from_style("wh"), UsxCharStyle::Word);
        assert_eq!(UsxElement::from_name("sidebar"), UsxElement::Skipped);
        assert_eq!(UsxElement::from_name("blink"), UsxElement::Unknown);
    }

    #[test]
    fn test_char_styles() {
        assert_eq!(char_style("nd"), group(GroupKind::DivineName));
        assert_eq!(char_style("fr"), TagAction::SkipContent);
        assert_eq!(char_style("ft"), TagAction::Ignore);
        let w = OpenTag::new("char")
            .with_attr("style", "w")
            .with_attr("strong", "H430,H1254a");
        assert_eq!(
            Usx.classify(&w, &genesis()).unwrap(),
            TagAction::Strongs(vec!["H0430".into(), "H1254a".into()])
        );
    }

    #[test]
    fn test_verse_numbers() {
        let verse = OpenTag::new("verse")
            .with_attr("number", "5-7")
            .with_attr("sid", "GEN 1:5-7")
            .self_closing();
        assert_eq!(
            Usx.classify(&verse, &genesis()).unwrap(),
            TagAction::VerseStart(VerseMark::new(5).through(7))
        );
        let end = OpenTag::new("verse").with_attr("eid", "GEN 1:5-7").self_closing();
        assert_eq!(Usx.classify(&end, &genesis()).unwrap(), TagAction::VerseEnd);
        let bad = OpenTag::new("chapter").with_attr("number", "one");
        assert_eq!(
            Usx.classify(&bad, &genesis()),
            Err(ParseErrorKind::InvalidNumber("one".into()))
        );
    }

    #[test]
    fn test_note_callers() {
        let auto = OpenTag::new("note").with_attr("caller", "+");
        assert_eq!(
            classify_note(&auto, "f"),
            TagAction::Note {
                key: None,
                note_type: Some("f".into())
            }
        );
        let fixed = OpenTag::new("note").with_attr("caller", "a");
        assert_eq!(
            classify_note(&fixed, "x"),
            TagAction::CrossReferenceNote {
                key: Some("a".into())
            }
        );
    }

    #[test]
    fn test_book_element() {
        let book = OpenTag::new("book").with_attr("code", "EXO");
        assert_eq!(
            Usx.classify(&book, &genesis()),
            Err(ParseErrorKind::BookMismatch {
                expected: "Gen".into(),
                found: "Exod".into()
            })
        );
        assert_eq!(
            Usx.book_boundary(&book).map(|b| b.scope),
            Some(BookScope::Parent)
        );
    }
}
