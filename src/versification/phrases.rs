//! Note phrase dictionary.
//!
//! Notes in the rule table abbreviate recurring sentences as `%Name%`
//! macros. `%%` stands for a literal percent sign.

use crate::error::{Error, Result};

fn phrase(name: &str) -> Option<&'static str> {
    Some(match name {
        "Hebrew" => "Hebrew Bibles",
        "Greek" => "Greek Bibles",
        "Latin" => "Latin Bibles",
        "English" => "English Bibles",
        "Other" => "some other Bibles",
        "AllBibles" => "all Bibles",
        "EngHeb" => "English and Hebrew Bibles",
        "GreLat" => "Greek and Latin Bibles",
        "PsalmTitle" => "In some Bibles the psalm title is counted as verse 1.",
        "TitleMerged" => "In some Bibles the psalm title is merged with verse 1.",
        "VerseMerged" => "In some Bibles this verse is merged with the previous one.",
        "VerseSplit" => "In some Bibles this verse is divided into two.",
        "VerseMissing" => "This verse is absent from some Bibles.",
        "VerseEmpty" => "This verse is left empty in some Bibles so the numbering stays aligned.",
        "Renumbered" => "In some Bibles this verse has a different number.",
        "ChapterBoundary" => "In some Bibles this verse belongs to the neighbouring chapter.",
        "Addition" => "Some Bibles contain additional text here.",
        _ => return None,
    })
}

/// Expand `%Name%` macros in a note. An unknown name is an error; an
/// unterminated `%` is kept as text.
pub fn expand(text: &str) -> Result<String> {
    let mut out = String::with_capacity(text.len());
    let mut rest = text;
    while let Some(start) = rest.find('%') {
        out.push_str(&rest[..start]);
        let after = &rest[start + 1..];
        let Some(end) = after.find('%') else {
            out.push_str(&rest[start..]);
            return Ok(out);
        };
        let name = &after[..end];
        if name.is_empty() {
            out.push('%');
        } else {
            let expanded = phrase(name).ok_or_else(|| Error::UnknownPhrase(name.to_string()))?;
            out.push_str(expanded);
        }
        rest = &after[end + 1..];
    }
    out.push_str(rest);
    Ok(out)
}
