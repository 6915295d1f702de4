//! Versification rule tables.
//!
//! A rule table maps verse numbers of a source numbering scheme onto the
//! standard scheme. The table is tab separated with the columns
//!
//! ```text
//! sourceType  sourceRef  standardRef  action  noteMarker  note  noteSecondary  noteAncientVersions  tests
//! ```
//!
//! and a header row. References look like `Gen.31:55` (a space may replace
//! the dot). Rows describing mappings this crate cannot represent are
//! skipped and counted; malformed rows are errors.

mod phrases;

pub use phrases::expand as expand_phrases;

use std::collections::BTreeMap;
use std::fmt;
use std::io::BufRead;
use std::path::Path;

use crate::books::find_book;
use crate::error::{Error, Result};
use crate::model::{Coordinate, parse_verse_token};

/// What a rule does to the source verse.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "cli", derive(serde::Serialize))]
pub enum RuleAction {
    KeepVerse,
    MergedWith,
    RenumberVerse,
    EmptyVerse,
}

impl RuleAction {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim() {
            "Keep verse" => Some(RuleAction::KeepVerse),
            "Merged with" => Some(RuleAction::MergedWith),
            "Renumber verse" => Some(RuleAction::RenumberVerse),
            "Empty verse" => Some(RuleAction::EmptyVerse),
            _ => None,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            RuleAction::KeepVerse => "Keep verse",
            RuleAction::MergedWith => "Merged with",
            RuleAction::RenumberVerse => "Renumber verse",
            RuleAction::EmptyVerse => "Empty verse",
        }
    }
}

impl fmt::Display for RuleAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// One validated row of the table.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "cli", derive(serde::Serialize))]
#[cfg_attr(feature = "cli", serde(rename_all = "camelCase"))]
pub struct VersificationRule {
    /// Numbering tradition the row applies to; `None` for all of them.
    pub source_type: Option<String>,
    pub source: Coordinate,
    pub standard: Coordinate,
    pub action: RuleAction,
    pub note_marker: Option<String>,
    /// Note text with phrase macros expanded.
    pub note: Option<String>,
    pub note_secondary: Option<String>,
    pub note_ancient_versions: Option<String>,
    pub tests: Option<String>,
}

/// Why a row was skipped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "cli", derive(serde::Serialize))]
pub enum SkipReason {
    UnknownBook,
    CrossBook,
    NonNumericChapter,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            SkipReason::UnknownBook => "unknown book",
            SkipReason::CrossBook => "cross-book mapping",
            SkipReason::NonNumericChapter => "non-numeric chapter",
        })
    }
}

/// Counts of skipped rows.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "cli", derive(serde::Serialize))]
#[cfg_attr(feature = "cli", serde(rename_all = "camelCase"))]
pub struct SkipSummary {
    pub by_reason: BTreeMap<SkipReason, usize>,
    /// Skipped rows per source type (`""` for rows without one).
    pub by_source_type: BTreeMap<String, usize>,
}

impl SkipSummary {
    pub fn total(&self) -> usize {
        self.by_reason.values().sum()
    }

    fn record(&mut self, reason: SkipReason, source_type: Option<&str>) {
        *self.by_reason.entry(reason).or_default() += 1;
        *self
            .by_source_type
            .entry(source_type.unwrap_or_default().to_string())
            .or_default() += 1;
    }
}

/// A loaded rule table.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "cli", derive(serde::Serialize))]
pub struct RuleTable {
    pub rules: Vec<VersificationRule>,
    pub skipped: SkipSummary,
}

impl RuleTable {
    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Rules whose source coordinate lies in `book_id`.
    pub fn for_book<'a>(&'a self, book_id: &'a str) -> impl Iterator<Item = &'a VersificationRule> {
        self.rules.iter().filter(move |r| r.source.book_id == book_id)
    }
}

/// Load a rule table from a file.
pub fn load_rules_from_path(path: impl AsRef<Path>) -> Result<RuleTable> {
    let file = std::fs::File::open(path.as_ref())?;
    tracing::debug!(path = %path.as_ref().display(), "loading versification table");
    load_rules(std::io::BufReader::new(file))
}

/// Load a rule table. The first line is a header.
pub fn load_rules<R: BufRead>(reader: R) -> Result<RuleTable> {
    let mut table = RuleTable::default();
    for (index, line) in reader.lines().enumerate() {
        let line = line?;
        let number = index + 1;
        if index == 0 || line.trim().is_empty() {
            continue;
        }
        match parse_row(&line, number)? {
            Row::Rule(rule) => table.rules.push(rule),
            Row::Skipped { reason, source_type } => {
                tracing::debug!(line = number, %reason, "versification row skipped");
                table.skipped.record(reason, source_type.as_deref());
            }
        }
    }

    if table.skipped.total() > 0 {
        for (reason, count) in &table.skipped.by_reason {
            tracing::warn!(%reason, count, "versification rows skipped");
        }
        for (source_type, count) in &table.skipped.by_source_type {
            tracing::warn!(source_type = %source_type, count, "skipped rows by source type");
        }
    }
    tracing::info!(
        rules = table.rules.len(),
        skipped = table.skipped.total(),
        "versification table loaded"
    );
    Ok(table)
}

enum Row {
    Rule(VersificationRule),
    Skipped {
        reason: SkipReason,
        source_type: Option<String>,
    },
}

fn parse_row(line: &str, number: usize) -> Result<Row> {
    let fail = |message: String| Error::Versification {
        line: number,
        message,
    };
    let columns: Vec<&str> = line.split('\t').collect();
    if columns.len() < 4 {
        return Err(fail(format!("expected at least 4 columns, found {}", columns.len())));
    }
    let column = |i: usize| {
        columns
            .get(i)
            .map(|c| c.trim())
            .filter(|c| !c.is_empty())
            .map(str::to_string)
    };

    let source_type = column(0);
    let action = RuleAction::parse(columns[3])
        .ok_or_else(|| fail(format!("unknown action {:?}", columns[3].trim())))?;

    let skipped = |reason: SkipReason| -> Result<Row> {
        Ok(Row::Skipped {
            reason,
            source_type: source_type.clone(),
        })
    };
    let source = match parse_coordinate(columns[1]).map_err(fail)? {
        Ok(c) => c,
        Err(reason) => return skipped(reason),
    };
    let standard = match parse_coordinate(columns[2]).map_err(fail)? {
        Ok(c) => c,
        Err(reason) => return skipped(reason),
    };
    if source.book_id != standard.book_id {
        return skipped(SkipReason::CrossBook);
    }

    let note = column(5).map(|n| phrases::expand(&n)).transpose()?;
    let note_secondary = column(6).map(|n| phrases::expand(&n)).transpose()?;
    Ok(Row::Rule(VersificationRule {
        source_type,
        source,
        standard,
        action,
        note_marker: column(4),
        note,
        note_secondary,
        note_ancient_versions: column(7),
        tests: column(8),
    }))
}

/// Parse `Book.Chapter:Verse`. The outer error is fatal; the inner one
/// marks a row to skip.
fn parse_coordinate(
    value: &str,
) -> std::result::Result<std::result::Result<Coordinate, SkipReason>, String> {
    let value = value.trim();
    let (book, rest) = value
        .split_once(['.', ' '])
        .ok_or_else(|| format!("malformed reference {value:?}"))?;
    let (chapter, verse) = rest
        .split_once(':')
        .ok_or_else(|| format!("reference {value:?} has no verse"))?;

    let Some(info) = find_book(book) else {
        return Ok(Err(SkipReason::UnknownBook));
    };
    let Ok(chapter) = chapter.trim().parse::<u32>() else {
        return Ok(Err(SkipReason::NonNumericChapter));
    };
    let (verse, subverse) =
        parse_verse_token(verse).ok_or_else(|| format!("non-numeric verse in {value:?}"))?;

    let mut coordinate = Coordinate::new(info.osis_id, chapter, verse);
    coordinate.subverse = subverse;
    Ok(Ok(coordinate))
}

#[cfg(test)]
mod tests {
    use super::*;

    const HEADER: &str = "sourceType\tsourceRef\tstandardRef\taction\tnoteMarker\tnote\tnoteSecondary\tnoteAncientVersions\ttests\n";

    fn load(rows: &str) -> Result<RuleTable> {
        load_rules(format!("{HEADER}{rows}").as_bytes())
    }

    #[test]
    fn test_parse_coordinate() {
        assert_eq!(
            parse_coordinate("Gen.31:55").unwrap().unwrap(),
            Coordinate::new("Gen", 31, 55)
        );
        assert_eq!(
            parse_coordinate("Psa 3:0").unwrap().unwrap(),
            Coordinate::new("Ps", 3, 0)
        );
        assert_eq!(
            parse_coordinate("Est.A:1").unwrap(),
            Err(SkipReason::NonNumericChapter)
        );
        assert_eq!(
            parse_coordinate("Xyz.1:1").unwrap(),
            Err(SkipReason::UnknownBook)
        );
        assert!(parse_coordinate("Gen.1:x").is_err());
        assert!(parse_coordinate("Gen").is_err());
    }

    #[test]
    fn test_row_fields() {
        let table = load("Hebrew\tGen.32:1\tGen.31:55\tRenumber verse\tNec\tIn %Hebrew%.\t\t\tGen.32:1=Last\n")
            .unwrap();
        assert_eq!(table.len(), 1);
        let rule = &table.rules[0];
        assert_eq!(rule.source_type.as_deref(), Some("Hebrew"));
        assert_eq!(rule.source, Coordinate::new("Gen", 32, 1));
        assert_eq!(rule.standard, Coordinate::new("Gen", 31, 55));
        assert_eq!(rule.action, RuleAction::RenumberVerse);
        assert_eq!(rule.note.as_deref(), Some("In Hebrew Bibles."));
        assert_eq!(rule.note_secondary, None);
        assert_eq!(rule.tests.as_deref(), Some("Gen.32:1=Last"));
    }

    #[test]
    fn test_short_row_is_fatal() {
        let err = load("Hebrew\tGen.1:1\tGen.1:1\n").unwrap_err();
        assert!(matches!(err, Error::Versification { line: 2, .. }));
    }

    #[test]
    fn test_unknown_action_is_fatal() {
        let err = load("\tGen.1:1\tGen.1:1\tMove verse\n").unwrap_err();
        assert!(matches!(err, Error::Versification { line: 2, message } if message.contains("Move verse")));
    }

    #[test]
    fn test_skipped_rows_counted() {
        let table = load(concat!(
            "Greek\tEst.A:1\tEst.1:1\tKeep verse\n",
            "Greek\tDan.3:24\tSus.1:1\tRenumber verse\n",
            "\tMal.4:1\tMal.3:19\tRenumber verse\n",
        ))
        .unwrap();
        assert_eq!(table.len(), 1);
        assert_eq!(table.skipped.total(), 2);
        assert_eq!(table.skipped.by_source_type.get("Greek"), Some(&2));
        assert_eq!(
            table.skipped.by_reason.get(&SkipReason::NonNumericChapter),
            Some(&1)
        );
    }
}
