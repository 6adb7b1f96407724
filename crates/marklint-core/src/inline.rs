//! Inline tokenization of a leaf's joined text.
//!
//! The text of a paragraph or heading is scanned once, left to right, into a
//! doubly linked list of nodes held in an arena. Delimiter runs and brackets
//! are recorded on the side and resolved in place, so insertions never shift
//! other nodes. Every byte of the joined text maps back to its original
//! source range through the offset tables of [`LeafText`].

use std::collections::HashMap;

use tracing::trace;

use crate::autolink::{classify_bracketed, find_literal_links};
use crate::emphasis::{Delimiter, flanking, process_emphasis};
use crate::entities::decode_entity;
use crate::html::scan_inline_html;
use crate::link::{LinkDefinitions, resolve_target};
use crate::options::ParseOptions;
use crate::span::Span;
use crate::token::{AutolinkInfo, AutolinkKind, LinkInfo, TokenKind};

/// A leaf's text with every byte mapped to the original bytes it stands for.
#[derive(Clone, Debug, Default)]
pub(crate) struct LeafText {
    pub(crate) text: String,
    starts: Vec<usize>,
    ends: Vec<usize>,
}

impl LeafText {
    /// Appends source text that appears verbatim at `raw_start`.
    pub(crate) fn push_raw(&mut self, text: &str, raw_start: usize) {
        self.text.push_str(text);
        self.starts.extend((0..text.len()).map(|i| raw_start + i));
        self.ends.extend((0..text.len()).map(|i| raw_start + i + 1));
    }

    /// Appends a line break standing for the line ending at `ending`.
    pub(crate) fn push_line_break(&mut self, ending: Span) {
        self.text.push('\n');
        self.starts.push(ending.start);
        self.ends.push(ending.end);
    }

    /// Source span for the text range `[start, end)`.
    pub(crate) fn span(&self, start: usize, end: usize) -> Span {
        if start >= end {
            let at = match self.starts.get(start) {
                Some(&offset) => offset,
                None => self.ends.last().copied().unwrap_or(0),
            };
            return Span::empty(at);
        }
        Span {
            start: self.starts[start],
            end: self.ends[end - 1],
        }
    }
}

#[derive(Clone, Debug)]
pub(crate) enum NodeKind {
    /// Text equal to the joined text of the node's range.
    Plain,
    Token(TokenKind),
}

#[derive(Clone, Debug)]
struct Node {
    kind: NodeKind,
    start: usize,
    end: usize,
    prev: Option<usize>,
    next: Option<usize>,
}

/// Arena-backed doubly linked list of inline nodes.
#[derive(Debug, Default)]
pub(crate) struct InlineArena {
    nodes: Vec<Node>,
    head: Option<usize>,
    tail: Option<usize>,
}

impl InlineArena {
    fn push(&mut self, kind: NodeKind, start: usize, end: usize) -> usize {
        let id = self.nodes.len();
        self.nodes.push(Node {
            kind,
            start,
            end,
            prev: self.tail,
            next: None,
        });
        match self.tail {
            Some(tail) => self.nodes[tail].next = Some(id),
            None => self.head = Some(id),
        }
        self.tail = Some(id);
        id
    }

    pub(crate) fn range(&self, id: usize) -> (usize, usize) {
        (self.nodes[id].start, self.nodes[id].end)
    }

    pub(crate) fn set_range(&mut self, id: usize, start: usize, end: usize) {
        self.nodes[id].start = start;
        self.nodes[id].end = end;
    }

    fn set_kind(&mut self, id: usize, kind: NodeKind) {
        self.nodes[id].kind = kind;
    }

    pub(crate) fn insert_after(&mut self, at: usize, kind: NodeKind, start: usize, end: usize) -> usize {
        let id = self.nodes.len();
        let next = self.nodes[at].next;
        self.nodes.push(Node {
            kind,
            start,
            end,
            prev: Some(at),
            next,
        });
        self.nodes[at].next = Some(id);
        match next {
            Some(next) => self.nodes[next].prev = Some(id),
            None => self.tail = Some(id),
        }
        id
    }

    pub(crate) fn insert_before(&mut self, at: usize, kind: NodeKind, start: usize, end: usize) -> usize {
        let id = self.nodes.len();
        let prev = self.nodes[at].prev;
        self.nodes.push(Node {
            kind,
            start,
            end,
            prev,
            next: Some(at),
        });
        self.nodes[at].prev = Some(id);
        match prev {
            Some(prev) => self.nodes[prev].next = Some(id),
            None => self.head = Some(id),
        }
        id
    }

    pub(crate) fn unlink(&mut self, id: usize) {
        let (prev, next) = (self.nodes[id].prev, self.nodes[id].next);
        match prev {
            Some(prev) => self.nodes[prev].next = next,
            None => self.head = next,
        }
        match next {
            Some(next) => self.nodes[next].prev = prev,
            None => self.tail = prev,
        }
    }

    fn iter(&self) -> impl Iterator<Item = &Node> {
        std::iter::successors(self.head.map(|id| &self.nodes[id]), |node| {
            node.next.map(|id| &self.nodes[id])
        })
    }
}

#[derive(Clone, Debug)]
struct Bracket {
    node: usize,
    image: bool,
    active: bool,
    /// Another bracket opened inside this one's text.
    bracket_inside: bool,
    /// Delimiter stack height when the bracket was opened.
    delim_bottom: usize,
    /// Text offset just past `[` or `![`.
    text_start: usize,
}

/// Where a leaf's inline content lives and how to treat it.
pub(crate) struct InlineInput<'a> {
    pub(crate) leaf: &'a LeafText,
    /// The leaf is the first paragraph of a list item.
    pub(crate) task_candidate: bool,
}

struct InlineParser<'a> {
    leaf: &'a LeafText,
    bytes: &'a [u8],
    defs: &'a LinkDefinitions,
    options: &'a ParseOptions,
    arena: InlineArena,
    delims: Vec<Delimiter>,
    brackets: Vec<Bracket>,
    pos: usize,
    text_start: usize,
    /// Start offsets of every backtick run, keyed by run length. Built on
    /// the first code span candidate.
    backtick_runs: Option<HashMap<usize, Vec<usize>>>,
}

/// Tokenizes one leaf's inline content. Returned spans are source spans.
pub(crate) fn parse_inlines(
    input: InlineInput<'_>,
    defs: &LinkDefinitions,
    options: &ParseOptions,
) -> Vec<(TokenKind, Span)> {
    let leaf = input.leaf;
    let mut parser = InlineParser {
        leaf,
        bytes: leaf.text.as_bytes(),
        defs,
        options,
        arena: InlineArena::default(),
        delims: Vec::new(),
        brackets: Vec::new(),
        pos: 0,
        text_start: 0,
        backtick_runs: None,
    };
    if input.task_candidate && options.task_list_items {
        parser.task_marker();
    }
    parser.run();
    parser.finish()
}

impl InlineParser<'_> {
    fn task_marker(&mut self) {
        let checked = match self.bytes {
            [b'[', b' ', b']', b' ' | b'\t', ..] => false,
            [b'[', b'x' | b'X', b']', b' ' | b'\t', ..] => true,
            _ => return,
        };
        self.arena
            .push(NodeKind::Token(TokenKind::TaskListMarker { checked }), 0, 4);
        self.pos = 4;
        self.text_start = 4;
    }

    fn flush_text(&mut self, upto: usize) {
        if self.text_start < upto {
            self.arena.push(NodeKind::Plain, self.text_start, upto);
        }
        self.text_start = upto;
    }

    fn push_token(&mut self, kind: TokenKind, start: usize, end: usize) -> usize {
        self.flush_text(start);
        let id = self.arena.push(NodeKind::Token(kind), start, end);
        self.pos = end;
        self.text_start = end;
        id
    }

    fn push_plain(&mut self, start: usize, end: usize) -> usize {
        self.flush_text(start);
        let id = self.arena.push(NodeKind::Plain, start, end);
        self.pos = end;
        self.text_start = end;
        id
    }

    fn run(&mut self) {
        while self.pos < self.bytes.len() {
            let handled = match self.bytes[self.pos] {
                b'\n' => {
                    self.line_break();
                    true
                }
                b'\\' => self.backslash(),
                b'&' => self.entity(),
                b'`' => {
                    self.code_span();
                    true
                }
                b'<' => self.angle(),
                b'*' | b'_' => {
                    self.delimiter_run();
                    true
                }
                b'~' if self.options.strikethrough => {
                    self.delimiter_run();
                    true
                }
                b'[' => {
                    self.open_bracket(false);
                    true
                }
                b'!' if self.bytes.get(self.pos + 1) == Some(&b'[') => {
                    self.open_bracket(true);
                    true
                }
                b']' => {
                    self.close_bracket();
                    true
                }
                _ => false,
            };
            if !handled {
                self.pos += 1;
            }
        }
        self.flush_text(self.bytes.len());
        process_emphasis(&mut self.arena, &mut self.delims, 0);
    }

    fn line_break(&mut self) {
        let newline = self.pos;
        let mut spaces_start = newline;
        while spaces_start > self.text_start && self.bytes[spaces_start - 1] == b' ' {
            spaces_start -= 1;
        }
        let kind = if newline - spaces_start >= 2 {
            TokenKind::HardBreak
        } else {
            TokenKind::SoftBreak
        };
        self.push_token(kind, spaces_start, newline + 1);
    }

    fn backslash(&mut self) -> bool {
        let start = self.pos;
        match self.bytes.get(start + 1) {
            Some(b'\n') => {
                self.push_token(TokenKind::HardBreak, start, start + 2);
                true
            }
            Some(&next) if next.is_ascii_punctuation() => {
                let text = (next as char).to_string();
                self.push_token(TokenKind::Text { text }, start, start + 2);
                true
            }
            _ => false,
        }
    }

    fn entity(&mut self) -> bool {
        let start = self.pos;
        match decode_entity(self.bytes, start) {
            Some((text, end)) => {
                self.push_token(TokenKind::Entity { text }, start, end);
                true
            }
            None => false,
        }
    }

    fn run_length(&self, start: usize, ch: u8) -> usize {
        self.bytes[start..].iter().take_while(|&&b| b == ch).count()
    }

    /// First backtick run of exactly `len` characters starting at or after `from`.
    fn backtick_run(&mut self, len: usize, from: usize) -> Option<usize> {
        let bytes = self.bytes;
        let runs = self.backtick_runs.get_or_insert_with(|| {
            let mut runs: HashMap<usize, Vec<usize>> = HashMap::new();
            let mut i = 0;
            while i < bytes.len() {
                if bytes[i] != b'`' {
                    i += 1;
                    continue;
                }
                let run = bytes[i..].iter().take_while(|&&b| b == b'`').count();
                runs.entry(run).or_default().push(i);
                i += run;
            }
            runs
        });
        let starts = runs.get(&len)?;
        starts.get(starts.partition_point(|&start| start < from)).copied()
    }

    fn code_span(&mut self) {
        let start = self.pos;
        let ticks = self.run_length(start, b'`');
        let Some(close) = self.backtick_run(ticks, start + ticks) else {
            // No closer: the whole opening run is literal.
            self.pos = start + ticks;
            return;
        };
        let mut code = self.leaf.text[start + ticks..close].replace('\n', " ");
        if code.len() >= 2
            && code.starts_with(' ')
            && code.ends_with(' ')
            && code.bytes().any(|b| b != b' ')
        {
            code = code[1..code.len() - 1].to_string();
        }
        self.push_token(
            TokenKind::CodeSpan {
                code,
                backticks: ticks,
            },
            start,
            close + ticks,
        );
    }

    fn angle(&mut self) -> bool {
        let start = self.pos;
        let inner_end = self.bytes[start + 1..]
            .iter()
            .position(|&b| b == b'>' || b == b'<' || b.is_ascii_whitespace())
            .map(|p| start + 1 + p);
        if let Some(close) = inner_end
            && self.bytes[close] == b'>'
        {
            let inner = &self.leaf.text[start + 1..close];
            if let Some(kind) = classify_bracketed(inner) {
                let destination = match kind {
                    AutolinkKind::Email => format!("mailto:{inner}"),
                    _ => inner.to_string(),
                };
                let info = AutolinkInfo {
                    kind,
                    destination,
                    text: inner.to_string(),
                };
                self.push_token(TokenKind::Autolink(info), start, close + 1);
                return true;
            }
        }
        match scan_inline_html(self.bytes, start) {
            Some(end) => {
                let html = self.leaf.text[start..end].to_string();
                self.push_token(TokenKind::RawHtml { html }, start, end);
                true
            }
            None => false,
        }
    }

    fn delimiter_run(&mut self) {
        let start = self.pos;
        let ch = self.bytes[start];
        let len = self.run_length(start, ch);
        if ch == b'~' && len > 2 {
            self.pos = start + len;
            return;
        }
        let before = self.leaf.text[..start].chars().next_back();
        let after = self.leaf.text[start + len..].chars().next();
        let (can_open, can_close) = flanking(before, after, ch);
        let node = self.push_plain(start, start + len);
        self.delims.push(Delimiter {
            node,
            ch,
            len,
            orig: len,
            can_open,
            can_close,
            removed: false,
        });
    }

    fn open_bracket(&mut self, image: bool) {
        let start = self.pos;
        let end = start + if image { 2 } else { 1 };
        let node = self.push_plain(start, end);
        if let Some(outer) = self.brackets.last_mut() {
            outer.bracket_inside = true;
        }
        self.brackets.push(Bracket {
            node,
            image,
            active: true,
            bracket_inside: false,
            delim_bottom: self.delims.len(),
            text_start: end,
        });
    }

    fn close_bracket(&mut self) {
        let close = self.pos;
        let Some(opener) = self.brackets.last().cloned() else {
            self.push_plain(close, close + 1);
            return;
        };
        if !opener.active {
            self.brackets.pop();
            self.push_plain(close, close + 1);
            return;
        }
        let Some(target) = resolve_target(
            &self.leaf.text,
            opener.text_start,
            close,
            opener.bracket_inside,
            self.defs,
        ) else {
            self.brackets.pop();
            self.push_plain(close, close + 1);
            return;
        };
        trace!(reference = ?target.reference, destination = %target.destination, "resolved link");

        let info = LinkInfo {
            reference: target.reference,
            destination: target.destination,
            title: target.title,
            label: target.label,
        };
        let (open_kind, close_kind) = if opener.image {
            (TokenKind::ImageStart(info), TokenKind::ImageEnd)
        } else {
            (TokenKind::LinkStart(info), TokenKind::LinkEnd)
        };
        self.arena.set_kind(opener.node, NodeKind::Token(open_kind));
        self.push_token(close_kind, close, target.end);
        process_emphasis(&mut self.arena, &mut self.delims, opener.delim_bottom);
        self.brackets.pop();
        if !opener.image {
            // No links inside links.
            for bracket in &mut self.brackets {
                if !bracket.image {
                    bracket.active = false;
                }
            }
        }
    }

    fn finish(self) -> Vec<(TokenKind, Span)> {
        let leaf = self.leaf;
        let mut merged: Vec<(TokenKind, usize, usize, bool)> = Vec::new();
        for node in self.arena.iter() {
            let (kind, plain) = match &node.kind {
                NodeKind::Plain => (
                    TokenKind::Text {
                        text: leaf.text[node.start..node.end].to_string(),
                    },
                    true,
                ),
                NodeKind::Token(kind) => (kind.clone(), false),
            };
            if let (
                TokenKind::Text { text },
                Some((TokenKind::Text { text: previous }, _, end, was_plain)),
            ) = (&kind, merged.last_mut())
                && *end == node.start
            {
                previous.push_str(text);
                *end = node.end;
                *was_plain &= plain;
                continue;
            }
            merged.push((kind, node.start, node.end, plain));
        }

        let mut out = Vec::with_capacity(merged.len());
        let mut link_depth = 0usize;
        for (kind, start, end, plain) in merged {
            match kind {
                TokenKind::LinkStart(_) | TokenKind::ImageStart(_) => link_depth += 1,
                TokenKind::LinkEnd | TokenKind::ImageEnd => link_depth = link_depth.saturating_sub(1),
                _ => {}
            }
            if plain && link_depth == 0 && self.options.autolink_literals {
                split_literal_links(leaf, start, end, &mut out);
                continue;
            }
            out.push((kind, leaf.span(start, end)));
        }
        out
    }
}

/// Emits the plain text `[start, end)` as text and literal autolink tokens.
fn split_literal_links(leaf: &LeafText, start: usize, end: usize, out: &mut Vec<(TokenKind, Span)>) {
    let text = &leaf.text[start..end];
    let mut cursor = 0usize;
    for link in find_literal_links(text) {
        if link.start > cursor {
            out.push((
                TokenKind::Text {
                    text: text[cursor..link.start].to_string(),
                },
                leaf.span(start + cursor, start + link.start),
            ));
        }
        let info = AutolinkInfo {
            kind: AutolinkKind::Literal,
            destination: link.destination,
            text: text[link.start..link.end].to_string(),
        };
        out.push((
            TokenKind::Autolink(info),
            leaf.span(start + link.start, start + link.end),
        ));
        cursor = link.end;
    }
    if cursor < text.len() {
        out.push((
            TokenKind::Text {
                text: text[cursor..].to_string(),
            },
            leaf.span(start + cursor, end),
        ));
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::{InlineInput, LeafText, parse_inlines};
    use crate::link::{LinkDefinitions, parse_reference_definition};
    use crate::options::ParseOptions;
    use crate::token::TokenKind;

    fn leaf(text: &str) -> LeafText {
        let mut leaf = LeafText::default();
        for (idx, line) in text.split('\n').enumerate() {
            if idx > 0 {
                let at = leaf.text.len();
                leaf.push_line_break(crate::span::Span { start: at, end: at + 1 });
            }
            let at = leaf.text.len();
            leaf.push_raw(line, at);
        }
        leaf
    }

    fn tags(text: &str, defs: &LinkDefinitions) -> Vec<String> {
        let leaf = leaf(text);
        let input = InlineInput {
            leaf: &leaf,
            task_candidate: false,
        };
        parse_inlines(input, defs, &ParseOptions::default())
            .into_iter()
            .map(|(kind, span)| match kind {
                TokenKind::Text { text } => format!("text:{text}"),
                other => format!("{}@{}..{}", other.tag(), span.start, span.end),
            })
            .collect()
    }

    #[test]
    fn emphasis_and_strong_nest() {
        let defs = LinkDefinitions::default();
        assert_eq!(
            tags("***foo***", &defs),
            vec![
                "emphasis@0..1",
                "emphasis@1..3",
                "text:foo",
                "end-emphasis@6..8",
                "end-emphasis@8..9",
            ]
        );
    }

    #[test]
    fn escapes_merge_into_text() {
        let defs = LinkDefinitions::default();
        assert_eq!(tags("a\\*b", &defs), vec!["text:a*b"]);
    }

    #[test]
    fn unmatched_backticks_stay_literal() {
        let defs = LinkDefinitions::default();
        assert_eq!(tags("``foo`", &defs), vec!["text:``foo`"]);
        assert_eq!(
            tags("`a\nb`", &defs),
            vec!["icode-span@0..5"]
        );
    }

    #[test]
    fn code_span_closer_must_match_run_length() {
        let defs = LinkDefinitions::default();
        assert_eq!(tags("` `` `", &defs), vec!["icode-span@0..6"]);
        assert_eq!(tags("\\``a`", &defs), vec!["text:`", "icode-span@2..5"]);
    }

    #[test]
    fn runs_of_distinct_lengths_stay_literal() {
        let defs = LinkDefinitions::default();
        let text: String = (1..=300).map(|len| format!("{}x", "`".repeat(len))).collect();
        assert_eq!(tags(&text, &defs), vec![format!("text:{text}")]);
    }

    #[test]
    fn reference_links_resolve_against_definitions() {
        let mut defs = LinkDefinitions::default();
        let (def, _) = parse_reference_definition("[foo]: /url", 0).expect("definition");
        defs.insert(def);
        assert_eq!(
            tags("[FOO] and [bar]", &defs),
            vec!["link@0..1", "text:FOO", "end-link@4..5", "text: and [bar]"]
        );
    }

    #[test]
    fn links_do_not_nest() {
        let defs = LinkDefinitions::default();
        assert_eq!(
            tags("[a [b](/x)](/y)", &defs),
            vec!["text:[a ", "link@3..4", "text:b", "end-link@5..10", "text:](/y)"]
        );
    }

    #[test]
    fn literal_autolinks_split_text() {
        let defs = LinkDefinitions::default();
        assert_eq!(
            tags("see www.example.com now", &defs),
            vec!["text:see ", "autolink@4..19", "text: now"]
        );
    }
}
