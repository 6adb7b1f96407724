//! Raw HTML recognition shared by HTML blocks and inline HTML.

use std::collections::HashSet;

use once_cell::sync::Lazy;

/// Tag names that start a type 6 HTML block.
static BLOCK_TAGS: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    [
        "address", "article", "aside", "base", "basefont", "blockquote", "body", "caption",
        "center", "col", "colgroup", "dd", "details", "dialog", "dir", "div", "dl", "dt",
        "fieldset", "figcaption", "figure", "footer", "form", "frame", "frameset", "h1", "h2",
        "h3", "h4", "h5", "h6", "head", "header", "hr", "html", "iframe", "legend", "li",
        "link", "main", "menu", "menuitem", "nav", "noframes", "ol", "optgroup", "option", "p",
        "param", "search", "section", "summary", "table", "tbody", "td", "tfoot", "th",
        "thead", "title", "tr", "track", "ul",
    ]
    .into_iter()
    .collect()
});

/// Raw-content elements: a type 1 block runs until their closing tag.
const RAW_TAGS: [&str; 4] = ["pre", "script", "style", "textarea"];

/// Tags escaped by the GFM tag filter.
pub(crate) const FILTERED_TAGS: [&str; 9] = [
    "title", "textarea", "style", "xmp", "iframe", "noembed", "noframes", "script", "plaintext",
];

/// The seven HTML block start conditions.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub(crate) enum HtmlBlockKind {
    Raw,
    Comment,
    ProcessingInstruction,
    Declaration,
    Cdata,
    BlockTag,
    CompleteTag,
}

impl HtmlBlockKind {
    /// The 1-based start condition number.
    pub(crate) fn condition(self) -> u8 {
        match self {
            HtmlBlockKind::Raw => 1,
            HtmlBlockKind::Comment => 2,
            HtmlBlockKind::ProcessingInstruction => 3,
            HtmlBlockKind::Declaration => 4,
            HtmlBlockKind::Cdata => 5,
            HtmlBlockKind::BlockTag => 6,
            HtmlBlockKind::CompleteTag => 7,
        }
    }

    /// Whether `line` satisfies the end condition. Types 6 and 7 end at a
    /// blank line instead.
    pub(crate) fn ends_on(self, line: &str) -> bool {
        match self {
            HtmlBlockKind::Raw => RAW_TAGS.iter().any(|tag| contains_closing_tag(line, tag)),
            HtmlBlockKind::Comment => line.contains("-->"),
            HtmlBlockKind::ProcessingInstruction => line.contains("?>"),
            HtmlBlockKind::Declaration => line.contains('>'),
            HtmlBlockKind::Cdata => line.contains("]]>"),
            HtmlBlockKind::BlockTag | HtmlBlockKind::CompleteTag => false,
        }
    }
}

struct TagName<'a> {
    name: &'a str,
    after: usize,
    closing: bool,
}

fn tag_name(text: &str) -> Option<TagName<'_>> {
    let bytes = text.as_bytes();
    if bytes.first() != Some(&b'<') {
        return None;
    }
    let mut idx = 1;
    let closing = bytes.get(idx) == Some(&b'/');
    if closing {
        idx += 1;
    }
    if !bytes.get(idx).is_some_and(u8::is_ascii_alphabetic) {
        return None;
    }
    let start = idx;
    while idx < bytes.len() && (bytes[idx].is_ascii_alphanumeric() || bytes[idx] == b'-') {
        idx += 1;
    }
    Some(TagName {
        name: &text[start..idx],
        after: idx,
        closing,
    })
}

/// Classifies a line (starting at its first non-space character) as the start
/// of an HTML block. Type 7 cannot interrupt a paragraph.
pub(crate) fn html_block_start(text: &str, in_paragraph: bool) -> Option<HtmlBlockKind> {
    let bytes = text.as_bytes();
    if bytes.first() != Some(&b'<') {
        return None;
    }
    if let Some(tag) = tag_name(text) {
        let next = bytes.get(tag.after).copied();
        if !tag.closing
            && matches!(next, None | Some(b' ' | b'\t' | b'>'))
            && RAW_TAGS.iter().any(|raw| tag.name.eq_ignore_ascii_case(raw))
        {
            return Some(HtmlBlockKind::Raw);
        }
        let boundary = match next {
            None | Some(b' ' | b'\t' | b'>') => true,
            Some(b'/') => bytes.get(tag.after + 1) == Some(&b'>'),
            _ => false,
        };
        if boundary && BLOCK_TAGS.contains(tag.name.to_ascii_lowercase().as_str()) {
            return Some(HtmlBlockKind::BlockTag);
        }
    }
    if text.starts_with("<!--") {
        return Some(HtmlBlockKind::Comment);
    }
    if text.starts_with("<?") {
        return Some(HtmlBlockKind::ProcessingInstruction);
    }
    if text.starts_with("<![CDATA[") {
        return Some(HtmlBlockKind::Cdata);
    }
    if text.starts_with("<!") && bytes.get(2).is_some_and(u8::is_ascii_alphabetic) {
        return Some(HtmlBlockKind::Declaration);
    }
    if !in_paragraph
        && let Some(tag) = tag_name(text)
        && !RAW_TAGS.iter().any(|raw| tag.name.eq_ignore_ascii_case(raw))
        && let Some(end) = scan_tag(bytes, 0)
        && bytes[end..].iter().all(|b| matches!(b, b' ' | b'\t'))
    {
        return Some(HtmlBlockKind::CompleteTag);
    }
    None
}

fn contains_closing_tag(line: &str, tag: &str) -> bool {
    let lower = line.to_ascii_lowercase();
    let needle = format!("</{tag}>");
    lower.contains(&needle)
}

/// Scans inline raw HTML starting at `start` (a `<`). Returns the offset just
/// past the construct.
pub(crate) fn scan_inline_html(bytes: &[u8], start: usize) -> Option<usize> {
    let rest = &bytes[start..];
    if rest.starts_with(b"<!--") {
        if rest.starts_with(b"<!-->") {
            return Some(start + 5);
        }
        if rest.starts_with(b"<!--->") {
            return Some(start + 6);
        }
        return find(bytes, start + 4, b"-->").map(|pos| pos + 3);
    }
    if rest.starts_with(b"<![CDATA[") {
        return find(bytes, start + 9, b"]]>").map(|pos| pos + 3);
    }
    if rest.starts_with(b"<?") {
        return find(bytes, start + 2, b"?>").map(|pos| pos + 2);
    }
    if rest.starts_with(b"<!") && rest.get(2).is_some_and(u8::is_ascii_alphabetic) {
        return find(bytes, start + 2, b">").map(|pos| pos + 1);
    }
    scan_tag(bytes, start)
}

fn find(bytes: &[u8], from: usize, needle: &[u8]) -> Option<usize> {
    if from > bytes.len() {
        return None;
    }
    bytes[from..]
        .windows(needle.len())
        .position(|window| window == needle)
        .map(|pos| from + pos)
}

fn is_attr_name_start(b: u8) -> bool {
    b.is_ascii_alphabetic() || b == b'_' || b == b':'
}

fn is_attr_name_continue(b: u8) -> bool {
    b.is_ascii_alphanumeric() || matches!(b, b'_' | b'.' | b':' | b'-')
}

/// Scans an open or closing tag starting at `start`. Returns the offset just
/// past its `>`.
pub(crate) fn scan_tag(bytes: &[u8], start: usize) -> Option<usize> {
    let mut i = start + 1;
    let closing = bytes.get(i) == Some(&b'/');
    if closing {
        i += 1;
    }
    if !bytes.get(i).is_some_and(u8::is_ascii_alphabetic) {
        return None;
    }
    while i < bytes.len() && (bytes[i].is_ascii_alphanumeric() || bytes[i] == b'-') {
        i += 1;
    }
    if closing {
        while i < bytes.len() && bytes[i].is_ascii_whitespace() {
            i += 1;
        }
        return (bytes.get(i) == Some(&b'>')).then_some(i + 1);
    }
    loop {
        let ws_start = i;
        while i < bytes.len() && bytes[i].is_ascii_whitespace() {
            i += 1;
        }
        match bytes.get(i) {
            None => return None,
            Some(b'>') => return Some(i + 1),
            Some(b'/') => return (bytes.get(i + 1) == Some(&b'>')).then_some(i + 2),
            Some(&b) if is_attr_name_start(b) && i > ws_start => {}
            Some(_) => return None,
        }
        i += 1;
        while i < bytes.len() && is_attr_name_continue(bytes[i]) {
            i += 1;
        }
        let mut ws = i;
        while ws < bytes.len() && bytes[ws].is_ascii_whitespace() {
            ws += 1;
        }
        if bytes.get(ws) != Some(&b'=') {
            continue;
        }
        i = ws + 1;
        while i < bytes.len() && bytes[i].is_ascii_whitespace() {
            i += 1;
        }
        match bytes.get(i) {
            Some(&quote @ (b'"' | b'\'')) => {
                let close = bytes[i + 1..].iter().position(|&b| b == quote)?;
                i += close + 2;
            }
            Some(_) => {
                let value_start = i;
                while i < bytes.len()
                    && !bytes[i].is_ascii_whitespace()
                    && !matches!(bytes[i], b'"' | b'\'' | b'=' | b'<' | b'>' | b'`')
                {
                    i += 1;
                }
                if i == value_start {
                    return None;
                }
            }
            None => return None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{HtmlBlockKind, html_block_start, scan_inline_html};

    #[test]
    fn block_start_conditions() {
        assert_eq!(html_block_start("<pre>", false), Some(HtmlBlockKind::Raw));
        assert_eq!(html_block_start("<!-- x", false), Some(HtmlBlockKind::Comment));
        assert_eq!(html_block_start("<?php", false), Some(HtmlBlockKind::ProcessingInstruction));
        assert_eq!(html_block_start("<!DOCTYPE html>", false), Some(HtmlBlockKind::Declaration));
        assert_eq!(html_block_start("<![CDATA[", false), Some(HtmlBlockKind::Cdata));
        assert_eq!(html_block_start("<DIV class=\"x\"", false), Some(HtmlBlockKind::BlockTag));
        assert_eq!(html_block_start("</td>", false), Some(HtmlBlockKind::BlockTag));
        assert_eq!(html_block_start("<a href=\"x\">  ", false), Some(HtmlBlockKind::CompleteTag));
        assert_eq!(html_block_start("<a href=\"x\">", true), None);
        assert_eq!(html_block_start("<a href=\"x\"> text", false), None);
        assert_eq!(html_block_start("<divx>", true), None);
    }

    #[test]
    fn raw_blocks_end_on_any_raw_closing_tag() {
        assert!(HtmlBlockKind::Raw.ends_on("x</PRE> y"));
        assert!(HtmlBlockKind::Raw.ends_on("</script>"));
        assert!(!HtmlBlockKind::Raw.ends_on("</pref>"));
    }

    #[test]
    fn inline_html_constructs() {
        let scan = |text: &str| scan_inline_html(text.as_bytes(), 0);
        assert_eq!(scan("<a><bab>"), Some(3));
        assert_eq!(scan("<a foo=\"bar\" bam = 'baz <em>\"</em>'\n_boolean zoop:33=zoop:33 />"), Some(63));
        assert_eq!(scan("<a  /><b2\ndata=\"foo\" >"), Some(6));
        assert_eq!(scan("<33>"), None);
        assert_eq!(scan("<a h*#ref=\"hi\">"), None);
        assert_eq!(scan("<a href=\"hi'>"), None);
        assert_eq!(scan("<a href='bar'title=title>"), None);
        assert_eq!(scan("</a  >"), Some(6));
        assert_eq!(scan("</a href=\"foo\">"), None);
        assert_eq!(scan("<!-->"), Some(5));
        assert_eq!(scan("<!-- a -- b -->"), Some(15));
        assert_eq!(scan("<?php echo $a; ?>"), Some(17));
        assert_eq!(scan("<!ELEMENT br EMPTY>"), Some(19));
        assert_eq!(scan("<![CDATA[>&<]]>"), Some(15));
    }
}
