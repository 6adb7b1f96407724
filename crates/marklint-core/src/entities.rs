//! Character references and backslash escapes.

use std::collections::HashMap;

use once_cell::sync::Lazy;

/// Longest named reference in the HTML5 table (`&CounterClockwiseContourIntegral;`).
const MAX_NAME_LEN: usize = 32;

/// Decodes the character reference starting at `start` (which must be `&`).
/// Returns the decoded text and the offset just past the `;`.
pub(crate) fn decode_entity(bytes: &[u8], start: usize) -> Option<(String, usize)> {
    if bytes.get(start) != Some(&b'&') {
        return None;
    }
    let mut i = start + 1;
    if bytes.get(i) == Some(&b'#') {
        i += 1;
        let hex = matches!(bytes.get(i), Some(b'x' | b'X'));
        if hex {
            i += 1;
        }
        let digits_start = i;
        while i < bytes.len()
            && (if hex {
                bytes[i].is_ascii_hexdigit()
            } else {
                bytes[i].is_ascii_digit()
            })
        {
            i += 1;
        }
        let digits = i - digits_start;
        let max_digits = if hex { 6 } else { 7 };
        if digits == 0 || digits > max_digits || bytes.get(i) != Some(&b';') {
            return None;
        }
        let text = std::str::from_utf8(&bytes[digits_start..i]).ok()?;
        let value = u32::from_str_radix(text, if hex { 16 } else { 10 }).ok()?;
        // NUL, surrogates and out-of-range values decode to U+FFFD.
        let ch = match value {
            0 => '\u{FFFD}',
            _ => char::from_u32(value).unwrap_or('\u{FFFD}'),
        };
        return Some((ch.to_string(), i + 1));
    }
    let name_start = i;
    while i < bytes.len() && bytes[i].is_ascii_alphanumeric() && i - name_start < MAX_NAME_LEN {
        i += 1;
    }
    if i == name_start || bytes.get(i) != Some(&b';') {
        return None;
    }
    let name = std::str::from_utf8(&bytes[name_start..i]).ok()?;
    let decoded = lookup_named_entity(name)?;
    Some((decoded, i + 1))
}

/// Named references that expand to two code points. The general table only
/// yields the first of the pair for these.
static MULTI_CODE_POINT: Lazy<HashMap<&'static str, &'static str>> = Lazy::new(|| {
    [
        ("NotEqualTilde", "\u{2242}\u{338}"),
        ("NotGreaterFullEqual", "\u{2267}\u{338}"),
        ("NotGreaterGreater", "\u{226B}\u{338}"),
        ("NotGreaterSlantEqual", "\u{2A7E}\u{338}"),
        ("NotHumpDownHump", "\u{224E}\u{338}"),
        ("NotHumpEqual", "\u{224F}\u{338}"),
        ("NotLeftTriangleBar", "\u{29CF}\u{338}"),
        ("NotLessLess", "\u{226A}\u{338}"),
        ("NotLessSlantEqual", "\u{2A7D}\u{338}"),
        ("NotNestedGreaterGreater", "\u{2AA2}\u{338}"),
        ("NotNestedLessLess", "\u{2AA1}\u{338}"),
        ("NotPrecedesEqual", "\u{2AAF}\u{338}"),
        ("NotRightTriangleBar", "\u{29D0}\u{338}"),
        ("NotSquareSubset", "\u{228F}\u{338}"),
        ("NotSquareSuperset", "\u{2290}\u{338}"),
        ("NotSubset", "\u{2282}\u{20D2}"),
        ("NotSucceedsEqual", "\u{2AB0}\u{338}"),
        ("NotSucceedsTilde", "\u{227F}\u{338}"),
        ("NotSuperset", "\u{2283}\u{20D2}"),
        ("ThickSpace", "\u{205F}\u{200A}"),
        ("acE", "\u{223E}\u{333}"),
        ("bne", "\u{3D}\u{20E5}"),
        ("bnequiv", "\u{2261}\u{20E5}"),
        ("caps", "\u{2229}\u{FE00}"),
        ("cups", "\u{222A}\u{FE00}"),
        ("fjlig", "\u{66}\u{6A}"),
        ("gesl", "\u{22DB}\u{FE00}"),
        ("gvertneqq", "\u{2269}\u{FE00}"),
        ("gvnE", "\u{2269}\u{FE00}"),
        ("lates", "\u{2AAD}\u{FE00}"),
        ("lesg", "\u{22DA}\u{FE00}"),
        ("lvertneqq", "\u{2268}\u{FE00}"),
        ("lvnE", "\u{2268}\u{FE00}"),
        ("nGg", "\u{22D9}\u{338}"),
        ("nGt", "\u{226B}\u{20D2}"),
        ("nGtv", "\u{226B}\u{338}"),
        ("nLl", "\u{22D8}\u{338}"),
        ("nLt", "\u{226A}\u{20D2}"),
        ("nLtv", "\u{226A}\u{338}"),
        ("nang", "\u{2220}\u{20D2}"),
        ("napE", "\u{2A70}\u{338}"),
        ("napid", "\u{224B}\u{338}"),
        ("nbump", "\u{224E}\u{338}"),
        ("nbumpe", "\u{224F}\u{338}"),
        ("ncongdot", "\u{2A6D}\u{338}"),
        ("nedot", "\u{2250}\u{338}"),
        ("nesim", "\u{2242}\u{338}"),
        ("ngE", "\u{2267}\u{338}"),
        ("ngeqq", "\u{2267}\u{338}"),
        ("ngeqslant", "\u{2A7E}\u{338}"),
        ("nges", "\u{2A7E}\u{338}"),
        ("nlE", "\u{2266}\u{338}"),
        ("nleqq", "\u{2266}\u{338}"),
        ("nleqslant", "\u{2A7D}\u{338}"),
        ("nles", "\u{2A7D}\u{338}"),
        ("notinE", "\u{22F9}\u{338}"),
        ("notindot", "\u{22F5}\u{338}"),
        ("nparsl", "\u{2AFD}\u{20E5}"),
        ("npart", "\u{2202}\u{338}"),
        ("npre", "\u{2AAF}\u{338}"),
        ("npreceq", "\u{2AAF}\u{338}"),
        ("nrarrc", "\u{2933}\u{338}"),
        ("nrarrw", "\u{219D}\u{338}"),
        ("nsce", "\u{2AB0}\u{338}"),
        ("nsubE", "\u{2AC5}\u{338}"),
        ("nsubset", "\u{2282}\u{20D2}"),
        ("nsubseteqq", "\u{2AC5}\u{338}"),
        ("nsucceq", "\u{2AB0}\u{338}"),
        ("nsupE", "\u{2AC6}\u{338}"),
        ("nsupset", "\u{2283}\u{20D2}"),
        ("nsupseteqq", "\u{2AC6}\u{338}"),
        ("nvap", "\u{224D}\u{20D2}"),
        ("nvge", "\u{2265}\u{20D2}"),
        ("nvgt", "\u{3E}\u{20D2}"),
        ("nvle", "\u{2264}\u{20D2}"),
        ("nvlt", "\u{3C}\u{20D2}"),
        ("nvltrie", "\u{22B4}\u{20D2}"),
        ("nvrtrie", "\u{22B5}\u{20D2}"),
        ("nvsim", "\u{223C}\u{20D2}"),
        ("race", "\u{223D}\u{331}"),
        ("smtes", "\u{2AAC}\u{FE00}"),
        ("sqcaps", "\u{2293}\u{FE00}"),
        ("sqcups", "\u{2294}\u{FE00}"),
        ("varsubsetneq", "\u{228A}\u{FE00}"),
        ("varsubsetneqq", "\u{2ACB}\u{FE00}"),
        ("varsupsetneq", "\u{228B}\u{FE00}"),
        ("varsupsetneqq", "\u{2ACC}\u{FE00}"),
        ("vnsub", "\u{2282}\u{20D2}"),
        ("vnsup", "\u{2283}\u{20D2}"),
        ("vsubnE", "\u{2ACB}\u{FE00}"),
        ("vsubne", "\u{228A}\u{FE00}"),
        ("vsupnE", "\u{2ACC}\u{FE00}"),
        ("vsupne", "\u{228B}\u{FE00}"),
    ]
    .into_iter()
    .collect()
});

fn lookup_named_entity(name: &str) -> Option<String> {
    if let Some(&expanded) = MULTI_CODE_POINT.get(name) {
        return Some(expanded.to_string());
    }
    let reference = format!("&{name};");
    let decoded = html_escape::decode_html_entities(&reference);
    // A partial match on a legacy prefix (`&ampx;` -> `&x;`) leaves the
    // semicolon behind; only a complete match counts.
    if decoded == reference || (decoded.len() > 1 && decoded.ends_with(';')) {
        return None;
    }
    Some(decoded.into_owned())
}

/// Resolves backslash escapes and character references, as used for link
/// destinations, titles and fence info strings.
pub(crate) fn unescape_and_decode(text: &str) -> String {
    let bytes = text.as_bytes();
    let mut out = String::with_capacity(text.len());
    let mut i = 0usize;
    let mut copied = 0usize;
    while i < bytes.len() {
        match bytes[i] {
            b'\\' if i + 1 < bytes.len() && bytes[i + 1].is_ascii_punctuation() => {
                out.push_str(&text[copied..i]);
                out.push(bytes[i + 1] as char);
                i += 2;
                copied = i;
            }
            b'&' => match decode_entity(bytes, i) {
                Some((decoded, next)) => {
                    out.push_str(&text[copied..i]);
                    out.push_str(&decoded);
                    i = next;
                    copied = i;
                }
                None => i += 1,
            },
            _ => i += 1,
        }
    }
    out.push_str(&text[copied..]);
    out
}

#[cfg(test)]
mod tests {
    use super::{decode_entity, unescape_and_decode};

    #[test]
    fn named_and_numeric_references_decode() {
        assert_eq!(
            decode_entity(b"&amp;x", 0),
            Some(("&".to_string(), 5))
        );
        assert_eq!(
            decode_entity(b"&#35;", 0),
            Some(("#".to_string(), 5))
        );
        assert_eq!(
            decode_entity(b"&#X22;", 0),
            Some(("\"".to_string(), 6))
        );
        assert_eq!(
            decode_entity(b"&#0;", 0),
            Some(("\u{FFFD}".to_string(), 4))
        );
    }

    #[test]
    fn two_code_point_references_keep_both() {
        assert_eq!(
            decode_entity(b"&ngE;", 0),
            Some(("\u{2267}\u{338}".to_string(), 5))
        );
        assert_eq!(decode_entity(b"&fjlig;", 0), Some(("fj".to_string(), 7)));
        assert_eq!(
            decode_entity(b"&nvlt;", 0),
            Some(("<\u{20D2}".to_string(), 6))
        );
        assert_eq!(decode_entity(b"&ngt;", 0), Some(("\u{226F}".to_string(), 5)));
    }

    #[test]
    fn malformed_references_are_rejected() {
        assert_eq!(decode_entity(b"&nosuchentity;", 0), None);
        assert_eq!(decode_entity(b"&#87654321;", 0), None);
        assert_eq!(decode_entity(b"&#abcdef0;", 0), None);
        assert_eq!(decode_entity(b"&copy", 0), None);
        assert_eq!(decode_entity(b"& amp;", 0), None);
    }

    #[test]
    fn escapes_block_reference_decoding() {
        assert_eq!(unescape_and_decode(r"\&ouml; &ouml;"), "&ouml; ö");
        assert_eq!(unescape_and_decode(r"foo\bar\*"), r"foo\bar*");
    }
}
