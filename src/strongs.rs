//! Strong's number normalization.
//!
//! Lemma attributes come in several shapes (`strong:H07225`,
//! `!strong:G5a`, `strong:H0430 lemma.TR:θεος`); all of them are reduced to
//! canonical codes: upper-case language prefix, four or more zero-padded
//! digits and an optional lower-case sub-lemma letter.

const STRONGS_TOKEN: &str = "strong:";

/// Parse a lemma attribute into canonical Strong's codes.
///
/// Order and duplicates are preserved. Segments that do not look like a
/// Strong's code are skipped; a lemma without codes yields an empty vector.
///
/// ```
/// use lectio::strongs::normalize;
///
/// assert_eq!(normalize("strong:H1234"), vec!["H1234"]);
/// assert_eq!(normalize("!strong:G5a"), vec!["G0005a"]);
/// assert!(normalize("lemma.TR:logos").is_empty());
/// ```
pub fn normalize(lemma: &str) -> Vec<String> {
    let cleaned = lemma.replace('!', "");
    cleaned
        .split(STRONGS_TOKEN)
        .filter(|s| !s.trim().is_empty())
        .filter_map(normalize_token)
        .collect()
}

/// Normalize a list of bare codes (`H430,G3056` or `H430 G3056`), as found in
/// attributes that omit the `strong:` marker.
pub fn normalize_codes(codes: &str) -> Vec<String> {
    codes
        .split(|c: char| c == ',' || c.is_whitespace())
        .map(|s| s.trim_start_matches(STRONGS_TOKEN))
        .filter(|s| !s.is_empty())
        .filter_map(normalize_token)
        .collect()
}

fn normalize_token(segment: &str) -> Option<String> {
    let token = segment.split_whitespace().next()?;
    let mut chars = token.chars();
    let prefix = chars.next()?.to_ascii_uppercase();
    if !prefix.is_ascii_alphabetic() {
        return None;
    }
    let rest = chars.as_str();

    let (digits, suffix) = match rest.chars().last() {
        Some(last) if last.is_ascii_alphabetic() => {
            (&rest[..rest.len() - last.len_utf8()], Some(last.to_ascii_lowercase()))
        }
        _ => (rest, None),
    };
    if digits.is_empty() || !digits.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }

    let mut code = format!("{prefix}{digits:0>4}");
    if let Some(s) = suffix {
        code.push(s);
    }
    Some(code)
}
