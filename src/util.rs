//! Text decoding helpers.

use std::borrow::Cow;

/// Decode markup bytes to a string.
///
/// UTF-8 is tried first (a BOM is stripped by `encoding_rs`). Malformed
/// input is decoded with `hint_encoding`, then with the encoding named in
/// the XML declaration, and finally as Windows-1252, which older Bible
/// modules commonly use.
///
/// ```ignore
/// assert_eq!(decode_text(b"\xEF\xBB\xBF<osis/>", None), "<osis/>");
/// ```
pub fn decode_text<'a>(bytes: &'a [u8], hint_encoding: Option<&str>) -> Cow<'a, str> {
    let (result, _encoding, malformed) = encoding_rs::UTF_8.decode(bytes);
    if !malformed {
        return result;
    }

    let declared = declared_encoding(bytes);
    let label = hint_encoding.or(declared.as_deref());
    if let Some(name) = label
        && let Some(encoding) = encoding_rs::Encoding::for_label(name.as_bytes())
    {
        tracing::debug!(encoding = encoding.name(), "decoding markup with declared encoding");
        let (result, _, _) = encoding.decode(bytes);
        return result;
    }

    tracing::debug!("markup is not UTF-8, falling back to windows-1252");
    let (result, _, _) = encoding_rs::WINDOWS_1252.decode(bytes);
    result
}

/// The `encoding` pseudo-attribute of an XML declaration, if present.
fn declared_encoding(bytes: &[u8]) -> Option<String> {
    let head = &bytes[..bytes.len().min(200)];
    let head = String::from_utf8_lossy(head);
    let decl = head.strip_prefix("<?xml")?;
    let decl = &decl[..decl.find("?>")?];
    let rest = &decl[decl.find("encoding")? + "encoding".len()..];
    let rest = rest.trim_start().strip_prefix('=')?.trim_start();
    let quote = rest.chars().next().filter(|c| *c == '"' || *c == '\'')?;
    let value = &rest[1..];
    Some(value[..value.find(quote)?].to_string())
}
