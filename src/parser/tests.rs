use super::*;
use crate::error::ParseErrorKind;
use crate::model::{
    GroupKind, GroupModifier, Phrase, RangeRef, validate_book_tree,
};
use proptest::prelude::*;

fn genesis() -> BookMeta {
    BookMeta::new("Gen", 1, "Genesis", "Gen")
}

fn parser() -> StructuralParser {
    StructuralParser::new(genesis(), ParserOptions::default())
}

fn in_verse(chapter: u32, verse: u32) -> StructuralParser {
    let mut p = parser();
    p.start_chapter(chapter).unwrap();
    p.start_verse(VerseMark::new(verse)).unwrap();
    p
}

/// Open a tag whose actions are run by `op`.
fn open_tag<T>(
    p: &mut StructuralParser,
    name: &str,
    op: impl FnOnce(&mut StructuralParser) -> ParseResult<T>,
) {
    p.begin_tag(name, false, TagFlags::default());
    op(p).unwrap();
    p.end_tag_open();
}

fn texts(phrases: &[&Phrase]) -> Vec<String> {
    phrases.iter().map(|p| p.content.clone()).collect()
}

fn group(node: &ContentNode) -> &crate::model::Group {
    node.as_group().expect("group")
}

// ============================================================================
// Sections
// ============================================================================

#[test]
fn test_sections_of_equal_rank_are_siblings() {
    let mut p = in_verse(1, 1);
    for level in [0, 1, 2, 0] {
        p.open_section(level).unwrap();
    }
    let tree = p.finish().unwrap();

    let top: Vec<u32> = tree
        .contents
        .iter()
        .filter_map(|n| n.as_section())
        .map(|s| s.level)
        .collect();
    assert_eq!(top, vec![0, 0]);
    let child = tree.contents[0].as_section().unwrap().contents[0]
        .as_section()
        .unwrap();
    assert_eq!(child.level, 1);
    assert_eq!(child.contents[0].as_section().unwrap().level, 2);
    assert!(validate_book_tree(&tree).is_empty());
}

#[test]
fn test_section_closes_open_groups() {
    let mut p = in_verse(1, 1);
    p.open_section(3).unwrap();
    p.open_paragraph(false).unwrap();
    p.append_phrase("first").unwrap();
    p.open_section(4).unwrap();
    assert_eq!(p.stack_dump(), "root > section[0] > section[1]");
    p.open_section(4).unwrap();
    assert_eq!(p.stack_dump(), "root > section[0] > section[1]");
    let tree = p.finish().unwrap();

    let outer = tree.contents[0].as_section().unwrap();
    assert!(outer.contents[0].is_group(GroupKind::Paragraph));
    assert_eq!(outer.contents.len(), 3);
}

#[test]
fn test_heading_opens_section() {
    let mut p = parser();
    p.start_chapter(1).unwrap();
    open_tag(&mut p, "title", |p| p.open_title(TitleTarget::SectionTitle, 1));
    p.text("The  Creation").unwrap();
    p.close_tag("title").unwrap();
    p.start_verse(VerseMark::new(1)).unwrap();
    p.open_paragraph(false).unwrap();
    p.append_phrase("In the beginning").unwrap();
    open_tag(&mut p, "title", |p| p.open_title(TitleTarget::SectionTitle, 1));
    p.text("The Fall").unwrap();
    p.close_tag("title").unwrap();
    let tree = p.finish().unwrap();

    let sections = tree.sections();
    assert_eq!(sections.len(), 2);
    assert_eq!(sections[0].title.as_deref(), Some("The Creation"));
    assert_eq!(sections[0].level, 0);
    assert_eq!(sections[1].title.as_deref(), Some("The Fall"));
    assert_eq!(sections[1].level, 0);
}

#[test]
fn test_consecutive_headings_become_subtitle() {
    let mut p = parser();
    p.start_chapter(1).unwrap();
    open_tag(&mut p, "title", |p| p.open_title(TitleTarget::SectionTitle, 0));
    p.text("Book One").unwrap();
    p.close_tag("title").unwrap();
    open_tag(&mut p, "title", |p| p.open_title(TitleTarget::SectionTitle, 0));
    p.text("Psalms 1-41").unwrap();
    p.close_tag("title").unwrap();
    let tree = p.finish().unwrap();

    let section = tree.sections()[0];
    assert_eq!(section.title.as_deref(), Some("Book One"));
    assert_eq!(section.sub_title.as_deref(), Some("Psalms 1-41"));
}

#[test]
fn test_divine_name_in_heading_is_uppercased() {
    let mut p = parser();
    p.start_chapter(1).unwrap();
    open_tag(&mut p, "title", |p| p.open_title(TitleTarget::SectionTitle, 0));
    p.text("Praise the ").unwrap();
    p.begin_tag(
        "divineName",
        false,
        TagFlags {
            uppercase: true,
            ..Default::default()
        },
    );
    assert_eq!(p.open_group(GroupKind::DivineName, None).unwrap(), None);
    p.end_tag_open();
    p.text("Lord").unwrap();
    p.close_tag("divineName").unwrap();
    p.close_tag("title").unwrap();
    let tree = p.finish().unwrap();

    assert_eq!(tree.sections()[0].title.as_deref(), Some("Praise the LORD"));
}

// ============================================================================
// Paragraphs
// ============================================================================

#[test]
fn test_text_outside_paragraph() {
    let mut p = in_verse(1, 1);
    let err = p.append_phrase("stray").unwrap_err();
    assert_eq!(err.kind, ParseErrorKind::TextOutsideParagraph("stray".into()));
    assert_eq!(err.chapter, 1);
    assert_eq!(err.stack, "root");
}

#[test]
fn test_text_opens_paragraph_without_structural_markup() {
    let options = ParserOptions::default().with_structural_markup(false);
    let mut p = StructuralParser::new(genesis(), options);
    p.start_chapter(1).unwrap();
    p.start_verse(VerseMark::new(1)).unwrap();
    p.append_phrase("In the beginning").unwrap();
    let tree = p.finish().unwrap();

    assert!(tree.contents[0].is_group(GroupKind::Paragraph));
}

#[test]
fn test_missing_verse_context() {
    let mut p = parser();
    p.open_paragraph(false).unwrap();
    let err = p.append_phrase("text").unwrap_err();
    assert!(matches!(err.kind, ParseErrorKind::MissingVerseContext(_)));
}

#[test]
fn test_paragraph_at_top_is_closed() {
    let mut p = in_verse(1, 1);
    p.open_paragraph(false).unwrap();
    p.append_phrase("one").unwrap();
    p.open_paragraph(false).unwrap();
    p.append_phrase("two").unwrap();
    let tree = p.finish().unwrap();

    assert_eq!(tree.contents.len(), 2);
    assert!(tree.contents.iter().all(|n| n.is_group(GroupKind::Paragraph)));
}

#[test]
fn test_nested_paragraph_is_rejected() {
    let mut p = in_verse(1, 1);
    open_tag(&mut p, "p", |p| p.open_paragraph(true));
    open_tag(&mut p, "q", |p| p.open_group(GroupKind::Quote, None));
    let err = p.open_paragraph(true).unwrap_err();
    assert_eq!(err.kind, ParseErrorKind::NestedParagraph);
    assert_eq!(err.stack, "root > paragraph > quote");
}

#[test]
fn test_nested_paragraph_closed_when_generating_paragraphs() {
    let options = ParserOptions::default().with_auto_generate_paragraphs(true);
    let mut p = StructuralParser::new(genesis(), options);
    p.start_chapter(1).unwrap();
    p.start_verse(VerseMark::new(1)).unwrap();
    p.open_paragraph(false).unwrap();
    p.open_group(GroupKind::Quote, None).unwrap();
    p.append_phrase("quoted").unwrap();
    p.open_paragraph(false).unwrap();
    p.append_phrase("next").unwrap();
    let tree = p.finish().unwrap();

    assert_eq!(tree.contents.len(), 2);
    assert_eq!(texts(&tree.phrases()), vec!["quoted", "next"]);
}

// ============================================================================
// Poetry
// ============================================================================

fn line_numbers(nodes: &[ContentNode], out: &mut Vec<(u32, String)>) {
    for node in nodes {
        if let ContentNode::Group(g) = node {
            if let Some(GroupModifier::LineNumber(n)) = g.modifier {
                out.push((n, crate::model::plain_text(&g.contents)));
            } else {
                line_numbers(&g.contents, out);
            }
        }
    }
}

#[test]
fn test_line_numbering_and_indents() {
    let mut p = in_verse(1, 1);
    for (level, text) in [(1, "one"), (1, "two"), (2, "three"), (1, "four")] {
        p.open_line(level, GroupKind::Line, false).unwrap();
        p.append_phrase(text).unwrap();
    }
    p.close_line_group().unwrap();
    p.open_line(1, GroupKind::Line, false).unwrap();
    p.append_phrase("five").unwrap();
    let tree = p.finish().unwrap();

    assert_eq!(tree.contents.len(), 2);
    let stanza = group(&tree.contents[0]);
    assert_eq!(stanza.kind, GroupKind::LineGroup);
    assert!(stanza.contents[2].is_group(GroupKind::Indent));

    let mut first = Vec::new();
    line_numbers(&stanza.contents, &mut first);
    assert_eq!(
        first,
        vec![
            (1, "one".to_string()),
            (2, "two".to_string()),
            (3, "three".to_string()),
            (4, "four".to_string()),
        ]
    );
    let mut second = Vec::new();
    line_numbers(&tree.contents[1..], &mut second);
    assert_eq!(second, vec![(1, "five".to_string())]);
}

#[test]
fn test_paragraph_closes_detached_line_group() {
    let mut p = in_verse(1, 1);
    p.open_line(1, GroupKind::Line, false).unwrap();
    p.append_phrase("sung").unwrap();
    p.open_paragraph(false).unwrap();
    assert_eq!(p.stack_dump(), "root > paragraph");
}

#[test]
fn test_linebreak_marks_last_phrase() {
    let mut p = in_verse(1, 1);
    p.open_paragraph(false).unwrap();
    p.append_phrase("first").unwrap();
    p.mark_linebreak();
    p.append_phrase(" second").unwrap();
    let tree = p.finish().unwrap();

    let phrases = tree.phrases();
    assert!(phrases[0].linebreak);
    assert!(!phrases[1].linebreak);
}

// ============================================================================
// Text and buffers
// ============================================================================

#[test]
fn test_punctuation_merges_into_previous_phrase() {
    let mut p = in_verse(1, 1);
    p.open_paragraph(false).unwrap();
    p.append_phrase("  God").unwrap();
    p.append_phrase(".").unwrap();
    p.append_phrase("   ").unwrap();
    let tree = p.finish().unwrap();

    assert_eq!(texts(&tree.phrases()), vec!["God."]);
}

#[test]
fn test_strongs_buffer_attaches_once() {
    let mut p = in_verse(1, 1);
    p.open_paragraph(false).unwrap();
    p.buffer_strongs(vec!["H0430".into()]).unwrap();
    p.append_phrase("God").unwrap();
    p.append_phrase(" created").unwrap();
    let tree = p.finish().unwrap();

    let phrases = tree.phrases();
    assert_eq!(phrases[0].strongs, vec!["H0430"]);
    assert!(phrases[1].strongs.is_empty());
}

#[test]
fn test_duplicate_strongs_buffer() {
    let mut p = in_verse(1, 1);
    p.buffer_strongs(vec!["H0430".into()]).unwrap();
    let err = p.buffer_strongs(vec!["H1254".into()]).unwrap_err();
    assert_eq!(err.kind, ParseErrorKind::DuplicateStrongsBuffer);
}

#[test]
fn test_strongs_tag_without_text_discards_buffer() {
    let mut p = in_verse(1, 1);
    p.open_paragraph(false).unwrap();
    p.begin_tag(
        "w",
        false,
        TagFlags {
            strongs: true,
            ..Default::default()
        },
    );
    p.buffer_strongs(vec!["H0853".into()]).unwrap();
    p.end_tag_open();
    p.close_tag("w").unwrap();
    p.append_phrase("the heaven").unwrap();
    let tree = p.finish().unwrap();

    assert!(tree.phrases()[0].strongs.is_empty());
}

#[test]
fn test_note_attaches_to_next_phrase() {
    let mut p = in_verse(1, 1);
    p.open_paragraph(false).unwrap();
    p.append_phrase("In the beginning").unwrap();
    open_tag(&mut p, "note", |p| {
        p.open_note(None, Some("explanation".into()))
    });
    p.text(" Or, at first").unwrap();
    p.close_tag("note").unwrap();
    p.append_phrase(" God").unwrap();
    let tree = p.finish().unwrap();

    let phrases = tree.phrases();
    assert!(phrases[0].notes.is_empty());
    let note = &phrases[1].notes[0];
    assert_eq!(note.key, "a");
    assert_eq!(note.note_type.as_deref(), Some("explanation"));
    assert_eq!(note.content.plain_text(), "Or, at first");
    let inner = note.content.contents[0].as_phrase().unwrap();
    assert_eq!(inner.chapter, None);
    assert_eq!(inner.verse, None);
}

#[test]
fn test_nested_note_is_rejected() {
    let mut p = in_verse(1, 1);
    open_tag(&mut p, "note", |p| p.open_note(None, None));
    let err = p.open_note(None, None).unwrap_err();
    assert_eq!(err.kind, ParseErrorKind::NestedNote);
}

#[test]
fn test_cross_reference_note() {
    let mut p = in_verse(1, 1);
    p.open_paragraph(false).unwrap();
    open_tag(&mut p, "note", |p| p.open_cross_reference_note(Some("x1".into())));
    p.text("See ").unwrap();
    open_tag(&mut p, "reference", |p| {
        p.open_reference(RangeRef::verse("John", 1, 1))
    });
    p.text("John 1:1").unwrap();
    p.close_tag("reference").unwrap();
    p.close_tag("note").unwrap();
    p.append_phrase("In the beginning").unwrap();
    p.append_phrase(" God").unwrap();
    let tree = p.finish().unwrap();

    let phrases = tree.phrases();
    assert_eq!(texts(&phrases), vec!["In the beginning", " God"]);
    let refs = &phrases[0].cross_references;
    assert_eq!(refs.len(), 1);
    assert_eq!(refs[0].key, "x1");
    assert_eq!(refs[0].label.as_deref(), Some("John 1:1"));
    assert_eq!(refs[0].range, RangeRef::verse("John", 1, 1));
    assert!(phrases[1].cross_references.is_empty());
}

#[test]
fn test_reference_in_text_marks_citation() {
    let mut p = in_verse(1, 1);
    p.open_paragraph(false).unwrap();
    let range = RangeRef::verse("Gen", 2, 4);
    p.begin_tag(
        "reference",
        false,
        TagFlags {
            reference: Some(range.clone()),
            ..Default::default()
        },
    );
    assert!(!p.open_reference(range.clone()).unwrap());
    p.end_tag_open();
    p.text("2:4").unwrap();
    p.close_tag("reference").unwrap();
    let tree = p.finish().unwrap();

    assert_eq!(tree.phrases()[0].bible_reference, Some(range));
}

#[test]
fn test_trailing_note_attaches_to_last_phrase() {
    let mut p = in_verse(1, 1);
    p.open_paragraph(false).unwrap();
    p.append_phrase("end").unwrap();
    p.buffer_strongs(vec!["H0001".into()]).unwrap();
    open_tag(&mut p, "note", |p| p.open_note(Some("1".into()), None));
    p.text("trailing").unwrap();
    p.close_tag("note").unwrap();
    let tree = p.finish().unwrap();

    let last = tree.phrases()[0];
    assert_eq!(last.notes.len(), 1);
    assert!(last.strongs.is_empty());
}

#[test]
fn test_trailing_note_skips_join_placeholder() {
    let mut p = parser();
    p.start_chapter(1).unwrap();
    p.start_verse(VerseMark::new(30).through(31)).unwrap();
    p.open_paragraph(false).unwrap();
    p.append_phrase("last words").unwrap();
    open_tag(&mut p, "note", |p| p.open_note(None, None));
    p.text("a closing note").unwrap();
    p.close_tag("note").unwrap();
    let tree = p.finish().unwrap();

    let placeholders = tree.placeholders();
    assert_eq!(placeholders.len(), 1);
    assert!(placeholders[0].notes.is_empty());
    let words = tree.phrases()[0];
    assert_eq!(words.content, "last words");
    assert_eq!(words.notes.len(), 1);
    assert!(validate_book_tree(&tree).is_empty());
}

#[test]
fn test_linebreak_after_join_marks_text() {
    let mut p = parser();
    p.start_chapter(1).unwrap();
    p.start_verse(VerseMark::new(4).through(5)).unwrap();
    p.open_paragraph(false).unwrap();
    p.append_phrase("joined").unwrap();
    p.end_verse().unwrap();
    p.mark_linebreak();
    let tree = p.finish().unwrap();

    assert!(tree.phrases()[0].linebreak);
    assert!(!tree.placeholders()[0].linebreak);
    assert!(validate_book_tree(&tree).is_empty());
}

#[test]
fn test_strongs_consumed_by_note_text() {
    let mut p = in_verse(1, 1);
    p.open_paragraph(false).unwrap();
    open_tag(&mut p, "note", |p| p.open_note(None, None));
    p.buffer_strongs(vec!["G3056".into()]).unwrap();
    p.text("word").unwrap();
    p.close_tag("note").unwrap();
    p.append_phrase("Logos").unwrap();
    let tree = p.finish().unwrap();

    let phrase = tree.phrases()[0];
    assert!(phrase.strongs.is_empty());
    assert_eq!(phrase.notes[0].content.contents[0].as_phrase().unwrap().strongs, vec!["G3056"]);
}

// ============================================================================
// Verses
// ============================================================================

#[test]
fn test_verse_join_emits_placeholders() {
    let mut p = parser();
    p.start_chapter(1).unwrap();
    p.start_verse(VerseMark::new(5).through(7)).unwrap();
    p.open_paragraph(false).unwrap();
    p.append_phrase("Joined text").unwrap();
    p.start_verse(VerseMark::new(8)).unwrap();
    p.append_phrase(" next").unwrap();
    let tree = p.finish().unwrap();

    let placeholders = tree.placeholders();
    let verses: Vec<_> = placeholders.iter().map(|p| p.verse).collect();
    assert_eq!(verses, vec![Some(6), Some(7)]);
    for placeholder in &placeholders {
        assert_eq!(placeholder.content, "");
        assert_eq!(placeholder.joined_to, Some(Coordinate::new("Gen", 1, 5)));
    }
    assert_eq!(tree.phrases().last().unwrap().verse, Some(8));
    assert!(validate_book_tree(&tree).is_empty());
}

#[test]
fn test_verse_after_join_must_follow_range() {
    let mut p = parser();
    p.start_chapter(1).unwrap();
    p.start_verse(VerseMark::new(5).through(7)).unwrap();
    let err = p.start_verse(VerseMark::new(6)).unwrap_err();
    assert_eq!(err.kind, ParseErrorKind::VerseOutOfOrder { current: 7, found: 6 });
}

#[test]
fn test_join_span_is_bounded() {
    let mut p = parser();
    p.start_chapter(1).unwrap();
    let err = p
        .start_verse(VerseMark::new(1).through(4_000_000_000))
        .unwrap_err();
    assert_eq!(
        err.kind,
        ParseErrorKind::InvalidVerseJoin {
            verse: 1,
            through: 4_000_000_000
        }
    );
    assert!(err.kind.is_data_error());

    let mut p = parser();
    p.start_chapter(119).unwrap();
    p.start_verse(VerseMark::new(1).through(177)).unwrap();
    p.open_paragraph(false).unwrap();
    p.append_phrase("Blessed are the undefiled").unwrap();
    let tree = p.finish().unwrap();
    assert_eq!(tree.placeholders().len(), 176);
}

#[test]
fn test_repeated_marker_can_start_join() {
    let mut p = in_verse(1, 2);
    p.start_verse(VerseMark::new(2).through(3)).unwrap();
    p.open_paragraph(false).unwrap();
    p.append_phrase("Two and three").unwrap();
    p.end_verse().unwrap();
    p.start_verse(VerseMark::new(4)).unwrap();
    p.append_phrase(" four").unwrap();
    let tree = p.finish().unwrap();
    let placeholders = tree.placeholders();
    assert_eq!(placeholders.len(), 1);
    assert_eq!(placeholders[0].verse, Some(3));
}

#[test]
fn test_verse_order() {
    let mut p = in_verse(1, 3);
    p.start_verse(VerseMark::new(3)).unwrap();
    let err = p.start_verse(VerseMark::new(2)).unwrap_err();
    assert_eq!(err.kind, ParseErrorKind::VerseOutOfOrder { current: 3, found: 2 });
    assert!(err.kind.is_data_error());

    let mut p = in_verse(2, 1);
    let err = p.start_chapter(1).unwrap_err();
    assert_eq!(err.kind, ParseErrorKind::ChapterOutOfOrder { current: 2, found: 1 });
}

#[test]
fn test_subverses() {
    let mut p = parser();
    p.start_chapter(1).unwrap();
    p.start_verse(VerseMark::new(5).with_subverse(Some(1))).unwrap();
    p.open_paragraph(false).unwrap();
    p.append_phrase("first half").unwrap();
    p.start_verse(VerseMark::new(5).with_subverse(Some(2))).unwrap();
    p.append_phrase(" second half").unwrap();
    let tree = p.finish().unwrap();

    let subverses: Vec<_> = tree.phrases().iter().map(|p| p.subverse).collect();
    assert_eq!(subverses, vec![Some(1), Some(2)]);
}

#[test]
fn test_canonical_title_in_verse_zero() {
    let mut p = StructuralParser::new(BookMeta::new("Ps", 19, "Psalms", "Ps"), ParserOptions::default());
    p.start_chapter(51).unwrap();
    open_tag(&mut p, "title", |p| p.open_group(GroupKind::Title, None));
    p.text("To the chief Musician").unwrap();
    p.close_tag("title").unwrap();
    p.start_verse(VerseMark::new(1)).unwrap();
    p.open_paragraph(false).unwrap();
    p.append_phrase("Have mercy").unwrap();
    let tree = p.finish().unwrap();

    let verses: Vec<_> = tree.phrases().iter().map(|p| p.verse).collect();
    assert_eq!(verses, vec![Some(0), Some(1)]);
    assert!(tree.contents[0].is_group(GroupKind::Title));
    assert!(validate_book_tree(&tree).is_empty());
}

#[test]
fn test_introduction_closes_at_first_chapter() {
    let mut p = parser();
    open_tag(&mut p, "para", |p| p.open_introduction_paragraph());
    p.text("Genesis tells of beginnings.").unwrap();
    p.close_tag("para").unwrap();
    p.start_chapter(1).unwrap();
    p.start_verse(VerseMark::new(1)).unwrap();
    p.open_paragraph(false).unwrap();
    p.append_phrase("In the beginning").unwrap();
    let tree = p.finish().unwrap();

    let intro = tree.introduction.as_ref().unwrap();
    assert_eq!(intro.plain_text(), "Genesis tells of beginnings.");
    assert_eq!(texts(&tree.phrases()), vec!["In the beginning"]);
}

proptest! {
    #[test]
    fn prop_verse_join_placeholder_count(start in 1u32..60, extra in 1u32..6) {
        let mut p = parser();
        p.start_chapter(3).unwrap();
        p.start_verse(VerseMark::new(start).through(start + extra)).unwrap();
        p.open_paragraph(false).unwrap();
        p.append_phrase("merged").unwrap();
        p.end_verse().unwrap();
        prop_assert_eq!(p.verse(), start + extra);
        let tree = p.finish().unwrap();

        let verses: Vec<u32> = tree.placeholders().iter().filter_map(|p| p.verse).collect();
        let expected: Vec<u32> = (start + 1..=start + extra).collect();
        prop_assert_eq!(verses, expected);
    }

    #[test]
    fn prop_balanced_tags_leave_only_root(depth in 1usize..8) {
        let mut p = in_verse(1, 1);
        open_tag(&mut p, "p", |p| p.open_paragraph(true));
        for i in 0..depth {
            open_tag(&mut p, "hi", |p| p.open_group(GroupKind::Bold, None));
            p.text(&format!("w{i} ")).unwrap();
        }
        prop_assert_eq!(p.container_depth(), depth + 2);
        for _ in 0..depth {
            p.close_tag("hi").unwrap();
        }
        p.close_tag("p").unwrap();
        prop_assert_eq!(p.container_depth(), 1);
        prop_assert_eq!(p.tag_depth(), 0);
        let tree = p.finish().unwrap();
        prop_assert_eq!(tree.phrases().len(), depth);
    }
}

// ============================================================================
// Tag stack
// ============================================================================

#[test]
fn test_unbalanced_and_unmatched_close() {
    let mut p = in_verse(1, 1);
    open_tag(&mut p, "p", |p| p.open_paragraph(true));
    open_tag(&mut p, "hi", |p| p.open_group(GroupKind::Bold, None));
    let err = p.close_tag("p").unwrap_err();
    assert_eq!(
        err.kind,
        ParseErrorKind::UnbalancedClose {
            expected: "hi".into(),
            found: "p".into()
        }
    );
    let err = p.close_tag("lg").unwrap_err();
    assert_eq!(err.kind, ParseErrorKind::UnmatchedClose("lg".into()));
}

#[test]
fn test_unclosed_tags_at_finish() {
    let mut p = in_verse(1, 1);
    open_tag(&mut p, "p", |p| p.open_paragraph(true));
    let err = p.finish().unwrap_err();
    assert_eq!(err.kind, ParseErrorKind::UnclosedTags("p".into()));
}

#[test]
fn test_heal_keeps_group_open_across_close() {
    let mut p = in_verse(1, 1);
    open_tag(&mut p, "p", |p| p.open_paragraph(true));
    p.begin_tag("seg", false, TagFlags::default());
    p.end_tag_open();
    p.text("text ").unwrap();
    p.begin_tag("hi", true, TagFlags::default());
    p.open_group(GroupKind::Bold, None).unwrap();
    p.end_tag_open();
    p.text("more ").unwrap();

    let plan = p.heal_mismatched_close("seg").unwrap();
    assert_eq!(plan.len(), 3);
    assert_eq!(plan[0], HealStep::ClosePending { name: "hi".into() });
    assert_eq!(plan[1], HealStep::Close { name: "seg".into() });
    match &plan[2] {
        HealStep::Reopen { name, groups, .. } => {
            assert_eq!(name, "hi");
            assert_eq!(groups.len(), 1);
            assert_eq!(groups[0].kind, GroupKind::Bold);
            assert!(groups[0].owned);
        }
        other => panic!("unexpected step {other:?}"),
    }

    p.close_tag("seg").unwrap();
    p.text("after").unwrap();
    p.close_tag("hi").unwrap();
    p.close_tag("p").unwrap();
    let tree = p.finish().unwrap();

    let para = group(&tree.contents[0]);
    assert_eq!(para.contents.len(), 2);
    let bold = group(&para.contents[1]);
    assert_eq!(bold.kind, GroupKind::Bold);
    assert_eq!(crate::model::plain_text(&bold.contents), "more after");
}

#[test]
fn test_heal_reopens_group_closed_by_newer_tag() {
    let mut p = in_verse(1, 1);
    open_tag(&mut p, "p", |p| p.open_paragraph(true));
    open_tag(&mut p, "q", |p| p.open_group(GroupKind::Quote, None));
    p.begin_tag("hi", true, TagFlags::default());
    p.open_group(GroupKind::Bold, None).unwrap();
    p.end_tag_open();
    p.text("inside ").unwrap();
    p.close_tag("q").unwrap();
    p.text("after").unwrap();
    p.close_tag("hi").unwrap();
    p.close_tag("p").unwrap();
    let tree = p.finish().unwrap();

    let para = group(&tree.contents[0]);
    let quote = group(&para.contents[0]);
    assert_eq!(quote.kind, GroupKind::Quote);
    assert!(quote.contents[0].is_group(GroupKind::Bold));
    let reopened = group(&para.contents[1]);
    assert_eq!(reopened.kind, GroupKind::Bold);
    assert_eq!(crate::model::plain_text(&reopened.contents), "after");
}

#[test]
fn test_heal_waits_for_next_paragraph() {
    let mut p = in_verse(1, 1);
    open_tag(&mut p, "p", |p| p.open_paragraph(true));
    p.text("plain ").unwrap();
    p.begin_tag("hi", true, TagFlags::default());
    p.open_group(GroupKind::Bold, None).unwrap();
    p.end_tag_open();
    p.text("bold ").unwrap();
    p.close_tag("p").unwrap();
    open_tag(&mut p, "p", |p| p.open_paragraph(true));
    p.text("still bold ").unwrap();
    p.close_tag("hi").unwrap();
    p.text("plain").unwrap();
    p.close_tag("p").unwrap();
    assert_eq!(p.tag_depth(), 0);
    let tree = p.finish().unwrap();

    assert_eq!(tree.contents.len(), 2);
    let first = group(&tree.contents[0]);
    assert_eq!(first.kind, GroupKind::Paragraph);
    assert!(first.contents[1].is_group(GroupKind::Bold));
    let second = group(&tree.contents[1]);
    assert_eq!(second.kind, GroupKind::Paragraph);
    assert_eq!(second.contents.len(), 2);
    let bold = group(&second.contents[0]);
    assert_eq!(bold.kind, GroupKind::Bold);
    assert_eq!(crate::model::plain_text(&bold.contents), "still bold ");
    assert!(matches!(&second.contents[1], ContentNode::Phrase(p) if p.content == "plain"));
    assert!(validate_book_tree(&tree).is_empty());
}

#[test]
fn test_deferred_group_dropped_without_text() {
    let mut p = in_verse(1, 1);
    open_tag(&mut p, "p", |p| p.open_paragraph(true));
    p.begin_tag("hi", true, TagFlags::default());
    p.open_group(GroupKind::Bold, None).unwrap();
    p.end_tag_open();
    p.text("bold").unwrap();
    p.close_tag("p").unwrap();
    p.close_tag("hi").unwrap();
    open_tag(&mut p, "p", |p| p.open_paragraph(true));
    p.text("plain").unwrap();
    p.close_tag("p").unwrap();
    let tree = p.finish().unwrap();

    assert_eq!(tree.contents.len(), 2);
    let second = group(&tree.contents[1]);
    assert_eq!(second.contents.len(), 1);
    assert!(matches!(&second.contents[0], ContentNode::Phrase(_)));
}

#[test]
fn test_buried_self_closing_close_reopens_newer_group() {
    let mut p = in_verse(1, 1);
    open_tag(&mut p, "p", |p| p.open_paragraph(true));
    p.begin_tag("hi", true, TagFlags::default());
    p.open_group(GroupKind::Bold, None).unwrap();
    p.end_tag_open();
    p.text("bold ").unwrap();
    open_tag(&mut p, "q", |p| p.open_group(GroupKind::Quote, None));
    p.text("both ").unwrap();
    p.close_tag("hi").unwrap();
    p.text("quoted").unwrap();
    p.close_tag("q").unwrap();
    p.close_tag("p").unwrap();
    let tree = p.finish().unwrap();

    let para = group(&tree.contents[0]);
    assert_eq!(para.contents.len(), 2);
    let bold = group(&para.contents[0]);
    assert_eq!(bold.kind, GroupKind::Bold);
    assert!(bold.contents[1].is_group(GroupKind::Quote));
    let quote = group(&para.contents[1]);
    assert_eq!(quote.kind, GroupKind::Quote);
    assert_eq!(crate::model::plain_text(&quote.contents), "quoted");
}

#[test]
fn test_heal_requires_open_tag() {
    let mut p = in_verse(1, 1);
    p.begin_tag("milestone", true, TagFlags::default());
    p.end_tag_open();
    let err = p.heal_mismatched_close("div").unwrap_err();
    assert_eq!(err.kind, ParseErrorKind::UnmatchedClose("div".into()));
}

#[test]
fn test_parser_is_send() {
    fn assert_send<T: Send>() {}
    assert_send::<StructuralParser>();
}
