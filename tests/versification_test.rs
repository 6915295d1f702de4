//! Versification table loading.

use std::io::Write;

use lectio::model::Coordinate;
use lectio::versification::{RuleAction, SkipReason};
use lectio::{Error, load_rules, load_rules_from_path};
use tempfile::NamedTempFile;

const FIXTURES_DIR: &str = concat!(env!("CARGO_MANIFEST_DIR"), "/tests/fixtures");

fn fixture_path(name: &str) -> String {
    format!("{}/{}", FIXTURES_DIR, name)
}

const HEADER: &str =
    "sourceType\tsourceRef\tstandardRef\taction\tnoteMarker\tnote\tnoteSecondary\tnoteAncientVersions\ttests\n";

#[test]
fn test_cross_book_row_is_skipped() {
    let table = load_rules_from_path(fixture_path("versification.tsv")).unwrap();
    assert_eq!(table.len(), 9);
    assert_eq!(table.skipped.total(), 1);
    assert_eq!(table.skipped.by_reason.get(&SkipReason::CrossBook), Some(&1));
    assert_eq!(table.skipped.by_source_type.get("Greek"), Some(&1));
}

#[test]
fn test_fixture_rules() {
    let table = load_rules_from_path(fixture_path("versification.tsv")).unwrap();

    let first = &table.rules[0];
    assert_eq!(first.source, Coordinate::new("Gen", 32, 1));
    assert_eq!(first.standard, Coordinate::new("Gen", 31, 55));
    assert_eq!(first.action, RuleAction::RenumberVerse);
    assert_eq!(
        first.note.as_deref(),
        Some("Hebrew Bibles begin chapter 32 one verse earlier.")
    );
    assert_eq!(first.note_ancient_versions.as_deref(), Some("LXX"));

    let keep = table
        .rules
        .iter()
        .find(|r| r.source.book_id == "Num")
        .unwrap();
    assert_eq!(keep.source_type, None);
    assert_eq!(keep.action, RuleAction::KeepVerse);
    assert_eq!(keep.note, None);

    let title = table.for_book("Ps").next().unwrap();
    assert_eq!(title.source.verse, 0);
    assert_eq!(title.action, RuleAction::MergedWith);

    let empty = table.for_book("Dan").next().unwrap();
    assert_eq!(empty.action, RuleAction::EmptyVerse);
    assert_eq!(
        empty.note_secondary.as_deref(),
        Some("Some Bibles contain additional text here.")
    );

    assert_eq!(table.for_book("1Kgs").count(), 1);
    assert_eq!(table.for_book("Gen").count(), 2);
}

#[test]
fn test_unknown_phrase_is_fatal() {
    let input = format!("{HEADER}Hebrew\tGen.32:1\tGen.31:55\tRenumber verse\tNec\t%Martian% Bibles\n");
    let err = load_rules(input.as_bytes()).unwrap_err();
    assert!(matches!(err, Error::UnknownPhrase(name) if name == "Martian"));
}

#[test]
fn test_non_numeric_verse_is_fatal() {
    let input = format!("{HEADER}\tGen.32:1\tGen.31:5x5\tKeep verse\n");
    let err = load_rules(input.as_bytes()).unwrap_err();
    assert!(matches!(err, Error::Versification { line: 2, .. }));
}

#[test]
fn test_header_only_table() {
    let table = load_rules(HEADER.as_bytes()).unwrap();
    assert!(table.is_empty());
    assert_eq!(table.skipped.total(), 0);
}

#[test]
fn test_load_from_temp_file() {
    let mut file = NamedTempFile::new().unwrap();
    write!(
        file,
        "{HEADER}\tGen.1:1\tGen.1:1\tKeep verse\n\tXyz.1:1\tGen.1:1\tKeep verse\n\tEst.B:1\tEst.1:1\tKeep verse\n"
    )
    .unwrap();
    let table = load_rules_from_path(file.path()).unwrap();
    assert_eq!(table.len(), 1);
    assert_eq!(table.skipped.by_reason.get(&SkipReason::UnknownBook), Some(&1));
    assert_eq!(
        table.skipped.by_reason.get(&SkipReason::NonNumericChapter),
        Some(&1)
    );
    assert_eq!(table.skipped.by_source_type.get(""), Some(&2));
}

#[test]
fn test_missing_file() {
    let err = load_rules_from_path("/nonexistent/versification.tsv").unwrap_err();
    assert!(matches!(err, Error::Io(_)));
}
