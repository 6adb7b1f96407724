//! Leaf blocks: recognizing their opening lines, collecting their lines, and
//! the tokens each emits once it closes.

use crate::block::{Emitted, InlineLeaf};
use crate::entities::unescape_and_decode;
use crate::html::HtmlBlockKind;
use crate::inline::LeafText;
use crate::link::{LinkDefinitions, parse_reference_definition};
use crate::span::Span;
use crate::token::{FenceInfo, LinkDefinition, TokenKind};

fn is_space_or_tab(byte: u8) -> bool {
    byte == b' ' || byte == b'\t'
}

fn only_spaces_and_tabs(bytes: &[u8]) -> bool {
    bytes.iter().all(|&b| is_space_or_tab(b))
}

/// An ATX heading line, with content offsets relative to the classified text.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub(crate) struct AtxHeading {
    pub(crate) level: u8,
    pub(crate) content_start: usize,
    pub(crate) content_end: usize,
}

/// Classifies text starting at the first non-space of a line.
pub(crate) fn parse_atx_heading(text: &str) -> Option<AtxHeading> {
    let bytes = text.as_bytes();
    let level = bytes.iter().take_while(|&&b| b == b'#').count();
    if level == 0 || level > 6 {
        return None;
    }
    if bytes.get(level).is_some_and(|&b| !is_space_or_tab(b)) {
        return None;
    }
    let mut content_start = level;
    while content_start < bytes.len() && is_space_or_tab(bytes[content_start]) {
        content_start += 1;
    }
    let mut content_end = bytes.len();
    while content_end > content_start && is_space_or_tab(bytes[content_end - 1]) {
        content_end -= 1;
    }
    // Optional closing sequence: a run of `#` preceded by a space or tab.
    let mut hashes = content_end;
    while hashes > content_start && bytes[hashes - 1] == b'#' {
        hashes -= 1;
    }
    if hashes < content_end && (hashes == content_start || is_space_or_tab(bytes[hashes - 1])) {
        content_end = hashes;
        while content_end > content_start && is_space_or_tab(bytes[content_end - 1]) {
            content_end -= 1;
        }
    }
    Some(AtxHeading {
        level: level as u8,
        content_start,
        content_end,
    })
}

/// `===` or `---` underline: the heading level and underline character.
pub(crate) fn setext_underline(text: &str) -> Option<(u8, char)> {
    let bytes = text.as_bytes();
    let ch = *bytes.first()?;
    let level = match ch {
        b'=' => 1,
        b'-' => 2,
        _ => return None,
    };
    let run = bytes.iter().take_while(|&&b| b == ch).count();
    only_spaces_and_tabs(&bytes[run..]).then_some((level, ch as char))
}

/// Three or more matching `-`, `*` or `_`, optionally interspersed with spaces or tabs.
pub(crate) fn thematic_break(text: &str) -> Option<char> {
    let marker = *text.as_bytes().first()?;
    if !matches!(marker, b'-' | b'*' | b'_') {
        return None;
    }
    let mut count = 0usize;
    for &b in text.as_bytes() {
        if b == marker {
            count += 1;
        } else if !is_space_or_tab(b) {
            return None;
        }
    }
    (count >= 3).then_some(marker as char)
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub(crate) struct FenceOpen {
    pub(crate) marker: u8,
    pub(crate) length: usize,
    pub(crate) info: String,
}

pub(crate) fn parse_fence_open(text: &str) -> Option<FenceOpen> {
    let marker = *text.as_bytes().first()?;
    if marker != b'`' && marker != b'~' {
        return None;
    }
    let length = text.bytes().take_while(|&b| b == marker).count();
    if length < 3 {
        return None;
    }
    let info = text[length..].trim_matches(|ch: char| ch.is_ascii_whitespace());
    if marker == b'`' && info.contains('`') {
        return None;
    }
    Some(FenceOpen {
        marker,
        length,
        info: unescape_and_decode(info),
    })
}

pub(crate) fn is_fence_close(text: &str, marker: u8, length: usize) -> bool {
    let run = text.bytes().take_while(|&b| b == marker).count();
    run >= length && only_spaces_and_tabs(&text.as_bytes()[run..])
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub(crate) struct ListMarker {
    /// Bullet character, or the `.` / `)` after an ordered number.
    pub(crate) marker: u8,
    pub(crate) number: Option<u64>,
    /// Bytes (and columns) taken by the marker itself.
    pub(crate) width: usize,
}

impl ListMarker {
    pub(crate) fn ordered(&self) -> bool {
        self.number.is_some()
    }
}

/// A bullet or ordered list marker followed by whitespace or the end of the
/// line. Interrupting a paragraph needs a non-empty item, and ordered items
/// must then start at 1.
pub(crate) fn parse_list_marker(text: &str, interrupts_paragraph: bool) -> Option<ListMarker> {
    let bytes = text.as_bytes();
    let (marker, width, number) = match *bytes.first()? {
        b @ (b'-' | b'+' | b'*') => (b, 1, None),
        _ => {
            let digits = bytes.iter().take_while(|b| b.is_ascii_digit()).count();
            if !(1..=9).contains(&digits) {
                return None;
            }
            let delimiter = *bytes.get(digits)?;
            if delimiter != b'.' && delimiter != b')' {
                return None;
            }
            let number: u64 = text[..digits].parse().ok()?;
            if interrupts_paragraph && number != 1 {
                return None;
            }
            (delimiter, digits + 1, Some(number))
        }
    };
    if bytes.get(width).is_some_and(|&b| !is_space_or_tab(b)) {
        return None;
    }
    if interrupts_paragraph && only_spaces_and_tabs(&bytes[width..]) {
        return None;
    }
    Some(ListMarker {
        marker,
        number,
        width,
    })
}

/// One source line held by an open leaf.
#[derive(Clone, Debug)]
pub(crate) struct LeafLine {
    /// Continuation markers and indentation not owned by anything else.
    pub(crate) prefix: Span,
    pub(crate) content: Span,
    pub(crate) eol: Span,
    /// Normalized code or HTML text with its line ending; empty for paragraphs.
    pub(crate) code: String,
}

#[derive(Clone, Debug)]
pub(crate) struct StrippedDefinition {
    def: LinkDefinition,
    first: usize,
    last: usize,
}

#[derive(Clone, Debug)]
pub(crate) enum LeafKind {
    Paragraph {
        defs: Vec<StrippedDefinition>,
    },
    FencedCode {
        fence: FenceInfo,
        /// End of the opening fence line.
        opening_end: usize,
        /// Prefix and span of the closing fence line.
        closing: Option<(Span, Span)>,
    },
    IndentedCode,
    HtmlBlock(HtmlBlockKind),
}

#[derive(Clone, Debug)]
pub(crate) struct Leaf {
    pub(crate) kind: LeafKind,
    /// Start of the leaf's own token on its first line.
    pub(crate) start_at: usize,
    pub(crate) lines: Vec<LeafLine>,
}

fn push_prefix(out: &mut Vec<Emitted>, prefix: Span) {
    if !prefix.is_empty() {
        out.push(Emitted::Token(TokenKind::LinePrefix, prefix));
    }
}

impl Leaf {
    pub(crate) fn new(kind: LeafKind, start_at: usize) -> Self {
        Self {
            kind,
            start_at,
            lines: Vec::new(),
        }
    }

    pub(crate) fn is_paragraph(&self) -> bool {
        matches!(self.kind, LeafKind::Paragraph { .. })
    }

    /// The next line pushed is the one the leaf's start token sits on.
    pub(crate) fn expects_first_line(&self) -> bool {
        self.lines.is_empty() && !matches!(self.kind, LeafKind::FencedCode { .. })
    }

    pub(crate) fn html_kind(&self) -> Option<HtmlBlockKind> {
        match self.kind {
            LeafKind::HtmlBlock(kind) => Some(kind),
            _ => None,
        }
    }

    pub(crate) fn fence(&self) -> Option<&FenceInfo> {
        match &self.kind {
            LeafKind::FencedCode { fence, .. } => Some(fence),
            _ => None,
        }
    }

    pub(crate) fn close_fence(&mut self, prefix: Span, line: Span) {
        if let LeafKind::FencedCode { closing, .. } = &mut self.kind {
            *closing = Some((prefix, line));
        }
    }

    fn first_content_line(&self) -> usize {
        match &self.kind {
            LeafKind::Paragraph { defs } => defs.last().map_or(0, |def| def.last + 1),
            _ => 0,
        }
    }

    /// Moves reference definitions at the start of a paragraph's remaining
    /// text into `defs`. Returns whether any paragraph text is left.
    pub(crate) fn strip_definitions(&mut self, source: &str, defs: &mut LinkDefinitions) -> bool {
        let mut line = self.first_content_line();
        let LeafKind::Paragraph { defs: stripped } = &mut self.kind else {
            return true;
        };
        if line >= self.lines.len() {
            return false;
        }
        let joined = self.lines[line..]
            .iter()
            .map(|leaf_line| leaf_line.content.slice(source))
            .collect::<Vec<_>>()
            .join("\n");
        let mut pos = 0usize;
        while joined[pos..].starts_with('[') {
            let Some((def, end)) = parse_reference_definition(&joined, pos) else {
                break;
            };
            let newlines = joined[pos..end].matches('\n').count();
            let last = if end >= joined.len() {
                line + newlines
            } else {
                line + newlines - 1
            };
            defs.insert(def.clone());
            stripped.push(StrippedDefinition {
                def,
                first: line,
                last,
            });
            line = last + 1;
            pos = end;
            if pos >= joined.len() {
                break;
            }
        }
        line < self.lines.len()
    }

    fn emit_definitions(&self, out: &mut Vec<Emitted>) {
        let LeafKind::Paragraph { defs } = &self.kind else {
            return;
        };
        for stripped in defs {
            let first = &self.lines[stripped.first];
            let last = &self.lines[stripped.last];
            push_prefix(out, first.prefix);
            let start = if stripped.first == 0 {
                self.start_at
            } else {
                first.content.start
            };
            out.push(Emitted::Token(
                TokenKind::LinkReferenceDefinition(stripped.def.clone()),
                Span {
                    start,
                    end: last.eol.end,
                },
            ));
        }
    }

    /// Joined inline text of `lines[from..]` and the end of its trimmed content.
    fn inline_leaf(&self, source: &str, from: usize, task_candidate: bool) -> (InlineLeaf, usize) {
        let lines = &self.lines[from..];
        let mut text = LeafText::default();
        let mut end = self.start_at;
        for (idx, line) in lines.iter().enumerate() {
            let mut content = line.content;
            if idx + 1 == lines.len() {
                let trimmed = content.slice(source).trim_end_matches([' ', '\t']);
                content.end = content.start + trimmed.len();
            }
            if idx > 0 {
                text.push_line_break(lines[idx - 1].eol);
            }
            text.push_raw(content.slice(source), content.start);
            end = content.end;
        }
        let prefixes = lines
            .iter()
            .skip(1)
            .map(|line| line.prefix)
            .filter(|prefix| !prefix.is_empty())
            .collect();
        (
            InlineLeaf {
                text,
                prefixes,
                task_candidate,
            },
            end,
        )
    }

    fn emit_inline_leaf(
        &self,
        source: &str,
        start: TokenKind,
        task_candidate: bool,
        out: &mut Vec<Emitted>,
    ) -> usize {
        let from = self.first_content_line();
        let first = &self.lines[from];
        push_prefix(out, first.prefix);
        let start_at = if from == 0 {
            self.start_at
        } else {
            first.content.start
        };
        out.push(Emitted::Token(
            start,
            Span {
                start: start_at,
                end: first.content.start,
            },
        ));
        let (leaf, end) = self.inline_leaf(source, from, task_candidate);
        out.push(Emitted::Inline(leaf));
        end
    }

    /// Emits the tokens of a closed leaf. Returns `false` when a paragraph
    /// turned out to hold only reference definitions.
    pub(crate) fn finish(
        mut self,
        source: &str,
        defs: &mut LinkDefinitions,
        task_candidate: bool,
        out: &mut Vec<Emitted>,
    ) -> bool {
        if self.is_paragraph() {
            let has_text = self.strip_definitions(source, defs);
            self.emit_definitions(out);
            if !has_text {
                return false;
            }
            let end = self.emit_inline_leaf(source, TokenKind::ParagraphStart, task_candidate, out);
            let eol_end = self.lines.last().map_or(end, |line| line.eol.end);
            out.push(Emitted::Token(TokenKind::ParagraphEnd, Span { start: end, end: eol_end }));
            return true;
        }
        match &self.kind {
            LeafKind::Paragraph { .. } => {}
            LeafKind::FencedCode {
                opening_end,
                closing,
                ..
            } => {
                for line in &self.lines {
                    push_code_line(line, out);
                }
                match closing {
                    Some((prefix, span)) => {
                        push_prefix(out, *prefix);
                        out.push(Emitted::Token(TokenKind::FencedCodeEnd, *span));
                    }
                    None => {
                        let at = self.lines.last().map_or(*opening_end, |line| line.eol.end);
                        out.push(Emitted::Token(TokenKind::FencedCodeEnd, Span::empty(at)));
                    }
                }
            }
            LeafKind::IndentedCode => {
                let body = self
                    .lines
                    .iter()
                    .rposition(|line| !only_spaces_and_tabs(line.code.trim_end_matches('\n').as_bytes()))
                    .map_or(0, |idx| idx + 1);
                let Some(first) = self.lines.first() else {
                    return true;
                };
                push_prefix(out, first.prefix);
                out.push(Emitted::Token(
                    TokenKind::IndentedCodeStart,
                    Span {
                        start: self.start_at,
                        end: first.content.start,
                    },
                ));
                for (idx, line) in self.lines[..body].iter().enumerate() {
                    if idx == 0 {
                        push_text(line, out);
                    } else {
                        push_code_line(line, out);
                    }
                }
                let end = self.lines[..body].last().map_or(first.content.start, |line| line.eol.end);
                out.push(Emitted::Token(TokenKind::IndentedCodeEnd, Span::empty(end)));
                for line in &self.lines[body..] {
                    push_prefix(out, line.prefix);
                    out.push(Emitted::Token(
                        TokenKind::BlankLine,
                        Span {
                            start: line.content.start,
                            end: line.eol.end,
                        },
                    ));
                }
            }
            LeafKind::HtmlBlock(kind) => {
                let Some(first) = self.lines.first() else {
                    return true;
                };
                push_prefix(out, first.prefix);
                out.push(Emitted::Token(
                    TokenKind::HtmlBlockStart {
                        condition: kind.condition(),
                    },
                    Span::empty(self.start_at),
                ));
                for (idx, line) in self.lines.iter().enumerate() {
                    if idx == 0 {
                        push_text(line, out);
                    } else {
                        push_code_line(line, out);
                    }
                }
                let end = self.lines.last().map_or(self.start_at, |line| line.eol.end);
                out.push(Emitted::Token(TokenKind::HtmlBlockEnd, Span::empty(end)));
            }
        }
        true
    }

    /// Emits a paragraph closed by a setext underline whose line ends at `underline_end`.
    pub(crate) fn finish_setext(
        self,
        source: &str,
        level: u8,
        underline: char,
        underline_end: usize,
        out: &mut Vec<Emitted>,
    ) {
        self.emit_definitions(out);
        let end = self.emit_inline_leaf(source, TokenKind::SetextHeadingStart { level }, false, out);
        out.push(Emitted::Token(
            TokenKind::SetextHeadingEnd { underline },
            Span {
                start: end,
                end: underline_end,
            },
        ));
    }
}

fn push_text(line: &LeafLine, out: &mut Vec<Emitted>) {
    out.push(Emitted::Token(
        TokenKind::Text {
            text: line.code.clone(),
        },
        Span {
            start: line.content.start,
            end: line.eol.end,
        },
    ));
}

fn push_code_line(line: &LeafLine, out: &mut Vec<Emitted>) {
    push_prefix(out, line.prefix);
    push_text(line, out);
}

/// Emits a single-line ATX heading. `base` is the source offset of `text`.
pub(crate) fn emit_atx_heading(
    heading: AtxHeading,
    start_at: usize,
    base: usize,
    source: &str,
    eol_end: usize,
    out: &mut Vec<Emitted>,
) {
    let content = Span {
        start: base + heading.content_start,
        end: base + heading.content_end,
    };
    out.push(Emitted::Token(
        TokenKind::AtxHeadingStart {
            level: heading.level,
        },
        Span {
            start: start_at,
            end: content.start,
        },
    ));
    let mut text = LeafText::default();
    text.push_raw(content.slice(source), content.start);
    out.push(Emitted::Inline(InlineLeaf {
        text,
        prefixes: Vec::new(),
        task_candidate: false,
    }));
    out.push(Emitted::Token(
        TokenKind::AtxHeadingEnd,
        Span {
            start: content.end,
            end: eol_end,
        },
    ));
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::{
        AtxHeading, is_fence_close, parse_atx_heading, parse_fence_open, parse_list_marker,
        setext_underline, thematic_break,
    };

    #[rstest]
    #[case("# foo", Some((1, 2, 5)))]
    #[case("###### foo", Some((6, 7, 10)))]
    #[case("####### foo", None)]
    #[case("#5 bolt", None)]
    #[case("#", Some((1, 1, 1)))]
    #[case("## foo ##   ", Some((2, 3, 6)))]
    #[case("# foo#", Some((1, 2, 6)))]
    #[case("### ###", Some((3, 4, 4)))]
    #[case("# foo \\#", Some((1, 2, 8)))]
    fn atx_headings(#[case] text: &str, #[case] expected: Option<(u8, usize, usize)>) {
        let parsed = parse_atx_heading(text).map(
            |AtxHeading {
                 level,
                 content_start,
                 content_end,
             }| (level, content_start, content_end),
        );
        assert_eq!(parsed, expected);
    }

    #[test]
    fn setext_and_thematic_lines() {
        assert_eq!(setext_underline("===  "), Some((1, '=')));
        assert_eq!(setext_underline("- -"), None);
        assert_eq!(thematic_break("- - -"), Some('-'));
        assert_eq!(thematic_break("**\t*"), Some('*'));
        assert_eq!(thematic_break("--a"), None);
        assert_eq!(thematic_break("=="), None);
    }

    #[test]
    fn fences_open_and_close() {
        let open = parse_fence_open("``` rust  ").expect("fence");
        assert_eq!((open.marker, open.length, open.info.as_str()), (b'`', 3, "rust"));
        assert!(parse_fence_open("``` a`b").is_none());
        assert!(parse_fence_open("~~~ a`b").is_some());
        assert!(is_fence_close("`````  ", b'`', 3));
        assert!(!is_fence_close("``", b'`', 3));
        assert!(!is_fence_close("``` x", b'`', 3));
    }

    #[test]
    fn list_markers() {
        let bullet = parse_list_marker("- foo", false).expect("bullet");
        assert_eq!((bullet.marker, bullet.width, bullet.ordered()), (b'-', 1, false));
        let ordered = parse_list_marker("10) foo", false).expect("ordered");
        assert_eq!((ordered.number, ordered.width), (Some(10), 3));
        assert!(parse_list_marker("-foo", false).is_none());
        assert!(parse_list_marker("1234567890. x", false).is_none());
        assert!(parse_list_marker("2. x", true).is_none());
        assert!(parse_list_marker("-", true).is_none());
        assert!(parse_list_marker("-", false).is_some());
    }
}
