//! Block structure: the line-by-line container and leaf pass.
//!
//! Each line first walks the open containers from the document down and asks
//! every one whether the line continues it. Whatever remains may open new
//! containers or a leaf; otherwise it continues the innermost open leaf, or
//! lazily continues a paragraph whose containers did not match.
//!
//! Ownership of source bytes is settled here. On every line a cursor marks the
//! first byte nothing owns yet; before a token is placed on the line, the
//! bytes up to it become a `LinePrefix` token.

use tracing::{debug, trace};

use crate::html::{HtmlBlockKind, html_block_start};
use crate::inline::LeafText;
use crate::leaf::{
    Leaf, LeafKind, LeafLine, ListMarker, emit_atx_heading, is_fence_close, parse_atx_heading,
    parse_fence_open, parse_list_marker, setext_underline, thematic_break,
};
use crate::link::LinkDefinitions;
use crate::options::ParseOptions;
use crate::source_map::{SourceLine, SourceMap};
use crate::span::Span;
use crate::token::{FenceInfo, ListInfo, ListItemInfo, TokenKind};
use crate::whitespace::ExpandedLine;

/// Columns of indentation that make a line indented code.
const CODE_INDENT: usize = 4;

const DOCUMENT: usize = 0;

/// A leaf's inline content, tokenized once every definition is known.
#[derive(Clone, Debug)]
pub(crate) struct InlineLeaf {
    pub(crate) text: LeafText,
    /// Continuation prefixes of the leaf's second and later lines.
    pub(crate) prefixes: Vec<Span>,
    /// First paragraph of a list item.
    pub(crate) task_candidate: bool,
}

#[derive(Clone, Debug)]
pub(crate) enum Emitted {
    Token(TokenKind, Span),
    Inline(InlineLeaf),
}

pub(crate) struct BlockOutput {
    pub(crate) items: Vec<Emitted>,
    pub(crate) definitions: LinkDefinitions,
}

#[derive(Debug)]
enum BlockKind {
    Document,
    BlockQuote,
    List {
        ordered: bool,
        marker: u8,
        /// Index of the `ListStart` item, patched with tightness on close.
        token: usize,
    },
    Item {
        marker_offset: usize,
        padding: usize,
    },
    Leaf(Leaf),
    /// A finished single-line leaf kept for tightness bookkeeping.
    Closed,
}

#[derive(Debug)]
struct Block {
    kind: BlockKind,
    parent: Option<usize>,
    children: Vec<usize>,
    open: bool,
    start_line: usize,
    last_line_blank: bool,
}

enum Continuation {
    Matched,
    Unmatched,
    /// The line closed the block and nothing else remains.
    Consumed,
}

enum Started {
    Container,
    Leaf,
    Nothing,
}

struct BlockParser<'a> {
    source: &'a str,
    blocks: Vec<Block>,
    tip: usize,
    old_tip: usize,
    last_matched: usize,
    all_closed: bool,
    out: Vec<Emitted>,
    defs: LinkDefinitions,

    line: ExpandedLine<'a>,
    line_number: usize,
    line_start: usize,
    eol: Span,
    col: usize,
    next_nonspace: usize,
    indent: usize,
    blank: bool,
    /// First byte of the line not yet owned by a token.
    mark: usize,
    /// The line's bytes, line ending included, are all owned.
    consumed: bool,
}

/// Runs the block pass over the whole document.
pub(crate) fn parse_blocks(map: &SourceMap, options: &ParseOptions) -> BlockOutput {
    let mut parser = BlockParser::new(map.source());
    let lines = map.lines();
    let skip = if options.front_matter {
        parser.front_matter(lines)
    } else {
        0
    };
    for line in &lines[skip..] {
        parser.process_line(line);
    }
    parser.finish()
}

impl<'a> BlockParser<'a> {
    fn new(source: &'a str) -> Self {
        Self {
            source,
            blocks: vec![Block {
                kind: BlockKind::Document,
                parent: None,
                children: Vec::new(),
                open: true,
                start_line: 1,
                last_line_blank: false,
            }],
            tip: DOCUMENT,
            old_tip: DOCUMENT,
            last_matched: DOCUMENT,
            all_closed: true,
            out: Vec::new(),
            defs: LinkDefinitions::default(),
            line: ExpandedLine::new(""),
            line_number: 0,
            line_start: 0,
            eol: Span::default(),
            col: 0,
            next_nonspace: 0,
            indent: 0,
            blank: false,
            mark: 0,
            consumed: false,
        }
    }

    /// Recognizes a leading `---` metadata block. Returns the lines it takes.
    fn front_matter(&mut self, lines: &[SourceLine]) -> usize {
        let content = |line: &SourceLine| line.content().slice(self.source).trim_end();
        if lines.first().map(content) != Some("---") {
            return 0;
        }
        let Some(close) = lines
            .iter()
            .skip(1)
            .position(|line| matches!(content(line), "---" | "..."))
            .map(|idx| idx + 1)
        else {
            return 0;
        };
        let body = self.source[lines[1].start..lines[close].start].to_string();
        debug!(lines = close + 1, "front matter");
        self.out.push(Emitted::Token(
            TokenKind::FrontMatter { body },
            Span {
                start: 0,
                end: lines[close].end,
            },
        ));
        close + 1
    }

    // Line cursor helpers.

    fn raw(&self, col: usize) -> usize {
        self.line_start + self.line.raw_offset(col)
    }

    fn byte(&self, col: usize) -> Option<u8> {
        self.line.byte(col)
    }

    fn find_next_nonspace(&mut self) {
        self.next_nonspace = self.line.next_nonspace(self.col);
        self.indent = self.next_nonspace - self.col.min(self.next_nonspace);
        self.blank = self.next_nonspace >= self.line.len();
    }

    fn indented(&self) -> bool {
        self.indent >= CODE_INDENT
    }

    /// Raw text from the first non-space character on.
    fn rest(&self) -> &'a str {
        let raw = self.line.raw();
        &raw[self.line.raw_offset(self.next_nonspace)..]
    }

    fn advance_columns(&mut self, count: usize) {
        self.col = (self.col + count).min(self.line.len());
    }

    // Output helpers.

    fn flush_prefix(&mut self, upto: usize) {
        if upto > self.mark {
            self.out.push(Emitted::Token(
                TokenKind::LinePrefix,
                Span {
                    start: self.mark,
                    end: upto,
                },
            ));
            self.mark = upto;
        }
    }

    fn push_token(&mut self, kind: TokenKind, start: usize, end: usize) -> usize {
        self.flush_prefix(start);
        self.out.push(Emitted::Token(kind, Span { start, end }));
        self.mark = self.mark.max(end);
        self.out.len() - 1
    }

    fn consume_line(&mut self) {
        self.mark = self.eol.end;
        self.consumed = true;
        self.col = self.line.len();
    }

    // Tree helpers.

    fn open_child(&self, id: usize) -> Option<usize> {
        let child = *self.blocks[id].children.last()?;
        self.blocks[child].open.then_some(child)
    }

    fn is_paragraph(&self, id: usize) -> bool {
        matches!(&self.blocks[id].kind, BlockKind::Leaf(leaf) if leaf.is_paragraph())
    }

    fn can_contain(&self, id: usize, child: &BlockKind) -> bool {
        match self.blocks[id].kind {
            BlockKind::Document | BlockKind::BlockQuote | BlockKind::Item { .. } => {
                !matches!(child, BlockKind::Item { .. })
            }
            BlockKind::List { .. } => matches!(child, BlockKind::Item { .. }),
            _ => false,
        }
    }

    fn accepts_lines(&self, id: usize) -> bool {
        matches!(self.blocks[id].kind, BlockKind::Leaf(_))
    }

    /// Appends a block under the tip, closing tips that cannot hold it.
    fn add_child(&mut self, kind: BlockKind) -> usize {
        while !self.can_contain(self.tip, &kind) {
            self.finalize(self.tip);
        }
        let id = self.blocks.len();
        self.blocks.push(Block {
            kind,
            parent: Some(self.tip),
            children: Vec::new(),
            open: true,
            start_line: self.line_number,
            last_line_blank: false,
        });
        self.blocks[self.tip].children.push(id);
        debug!(block = id, parent = self.tip, line = self.line_number, "block opened");
        self.tip = id;
        id
    }

    /// Adds a single-line block that is already complete.
    fn add_closed(&mut self) -> usize {
        let id = self.add_child(BlockKind::Closed);
        self.blocks[id].open = false;
        self.tip = self.blocks[id].parent.unwrap_or(DOCUMENT);
        id
    }

    fn close_unmatched(&mut self) {
        if self.all_closed {
            return;
        }
        while self.old_tip != self.last_matched {
            let parent = self.blocks[self.old_tip].parent.unwrap_or(DOCUMENT);
            self.finalize(self.old_tip);
            self.old_tip = parent;
        }
        self.all_closed = true;
    }

    fn ends_with_blank_line(&self, mut id: usize) -> bool {
        loop {
            let block = &self.blocks[id];
            if block.last_line_blank {
                return true;
            }
            match block.kind {
                BlockKind::List { .. } | BlockKind::Item { .. } => match block.children.last() {
                    Some(&child) => id = child,
                    None => return false,
                },
                _ => return false,
            }
        }
    }

    fn list_is_tight(&self, id: usize) -> bool {
        let items = &self.blocks[id].children;
        for (idx, &item) in items.iter().enumerate() {
            let has_next = idx + 1 < items.len();
            if has_next && self.ends_with_blank_line(item) {
                return false;
            }
            let subs = &self.blocks[item].children;
            for (sub_idx, &sub) in subs.iter().enumerate() {
                if self.ends_with_blank_line(sub) && (has_next || sub_idx + 1 < subs.len()) {
                    return false;
                }
            }
        }
        true
    }

    /// Closes `id`, emitting whatever it still owes, and moves the tip to its parent.
    fn finalize(&mut self, id: usize) {
        let parent = self.blocks[id].parent;
        self.blocks[id].open = false;
        let end = Span::empty(self.mark);
        debug!(block = id, line = self.line_number, "block closed");
        match self.blocks[id].kind {
            BlockKind::Leaf(_) => self.finalize_leaf(id, parent),
            BlockKind::BlockQuote => self.out.push(Emitted::Token(TokenKind::BlockQuoteEnd, end)),
            BlockKind::Item { .. } => self.out.push(Emitted::Token(TokenKind::ListItemEnd, end)),
            BlockKind::List { token, .. } => {
                let tight = self.list_is_tight(id);
                if let Some(Emitted::Token(TokenKind::ListStart(info), _)) = self.out.get_mut(token) {
                    info.tight = tight;
                }
                trace!(block = id, tight, "list closed");
                self.out.push(Emitted::Token(TokenKind::ListEnd, end));
            }
            BlockKind::Document | BlockKind::Closed => {}
        }
        self.tip = parent.unwrap_or(DOCUMENT);
    }

    fn finalize_leaf(&mut self, id: usize, parent: Option<usize>) {
        let BlockKind::Leaf(leaf) = std::mem::replace(&mut self.blocks[id].kind, BlockKind::Closed) else {
            return;
        };
        let task_candidate = parent.is_some_and(|parent| {
            matches!(self.blocks[parent].kind, BlockKind::Item { .. })
                && self.blocks[parent].children.first() == Some(&id)
        });
        let kept = leaf.finish(self.source, &mut self.defs, task_candidate, &mut self.out);
        debug!(block = id, kept, "leaf finalized");
        if !kept && let Some(parent) = parent {
            self.blocks[parent].children.retain(|&child| child != id);
        }
    }

    fn finish(mut self) -> BlockOutput {
        self.mark = self.source.len();
        while self.tip != DOCUMENT {
            self.finalize(self.tip);
        }
        BlockOutput {
            items: self.out,
            definitions: self.defs,
        }
    }

    fn process_line(&mut self, line: &SourceLine) {
        self.line = ExpandedLine::new(&self.source[line.start..line.content_end]);
        self.line_number = line.number;
        self.line_start = line.start;
        self.eol = line.ending();
        self.col = 0;
        self.mark = line.start;
        self.consumed = false;
        self.old_tip = self.tip;

        let mut container = DOCUMENT;
        while let Some(child) = self.open_child(container) {
            container = child;
            self.find_next_nonspace();
            match self.continue_block(container) {
                Continuation::Matched => {}
                Continuation::Unmatched => {
                    container = self.blocks[container].parent.unwrap_or(DOCUMENT);
                    break;
                }
                Continuation::Consumed => return,
            }
        }

        self.all_closed = container == self.old_tip;
        self.last_matched = container;
        let structural = self.col;

        let mut matched_leaf = self.accepts_lines(container) && !self.is_paragraph(container);
        while !matched_leaf {
            self.find_next_nonspace();
            match self.start_block(container) {
                Started::Container => container = self.tip,
                Started::Leaf => {
                    container = self.tip;
                    matched_leaf = true;
                }
                Started::Nothing => {
                    self.col = self.next_nonspace;
                    break;
                }
            }
        }
        if self.consumed {
            return;
        }

        if !self.all_closed && !self.blank && self.is_paragraph(self.tip) {
            trace!(line = self.line_number, "lazy continuation");
            self.add_line(self.tip);
        } else {
            self.close_unmatched();
            if self.blank
                && let Some(&last) = self.blocks[container].children.last()
            {
                self.blocks[last].last_line_blank = true;
            }
            let block = &self.blocks[container];
            let item_started_here = matches!(block.kind, BlockKind::Item { .. })
                && block.children.is_empty()
                && block.start_line == self.line_number;
            let fenced = matches!(&block.kind, BlockKind::Leaf(leaf) if leaf.fence().is_some());
            let last_line_blank = self.blank
                && !(matches!(block.kind, BlockKind::BlockQuote) || fenced || item_started_here);
            let mut cursor = Some(container);
            while let Some(id) = cursor {
                self.blocks[id].last_line_blank = last_line_blank;
                cursor = self.blocks[id].parent;
            }

            if self.accepts_lines(container) {
                self.add_line(container);
                let html_end = match &self.blocks[container].kind {
                    BlockKind::Leaf(leaf) => leaf
                        .html_kind()
                        .is_some_and(|kind| kind.ends_on(&self.line.content_from(self.col))),
                    _ => false,
                };
                if html_end {
                    self.finalize(container);
                }
            } else if self.col < self.line.len() && !self.blank {
                let start_at = self.raw(self.col);
                let id = self.add_child(BlockKind::Leaf(Leaf::new(
                    LeafKind::Paragraph { defs: Vec::new() },
                    start_at,
                )));
                self.find_next_nonspace();
                self.col = self.next_nonspace;
                self.add_line(id);
            }
        }

        if !self.consumed {
            let at = self.raw(structural).max(self.mark);
            self.push_token(TokenKind::BlankLine, at, self.eol.end);
        }
    }

    fn continue_block(&mut self, id: usize) -> Continuation {
        match &self.blocks[id].kind {
            BlockKind::Document | BlockKind::List { .. } => Continuation::Matched,
            BlockKind::BlockQuote => {
                if !self.indented() && self.byte(self.next_nonspace) == Some(b'>') {
                    self.col = self.next_nonspace + 1;
                    if self.byte(self.col) == Some(b' ') {
                        self.advance_columns(1);
                    }
                    Continuation::Matched
                } else {
                    Continuation::Unmatched
                }
            }
            BlockKind::Item {
                marker_offset,
                padding,
            } => {
                let width = marker_offset + padding;
                if self.blank {
                    if self.blocks[id].children.is_empty() {
                        Continuation::Unmatched
                    } else {
                        self.col = self.next_nonspace;
                        Continuation::Matched
                    }
                } else if self.indent >= width {
                    self.advance_columns(width);
                    Continuation::Matched
                } else {
                    Continuation::Unmatched
                }
            }
            BlockKind::Closed => Continuation::Unmatched,
            BlockKind::Leaf(leaf) => match &leaf.kind {
                LeafKind::Paragraph { .. } => {
                    if self.blank {
                        Continuation::Unmatched
                    } else {
                        Continuation::Matched
                    }
                }
                LeafKind::IndentedCode => {
                    if self.indented() {
                        self.advance_columns(CODE_INDENT);
                        Continuation::Matched
                    } else if self.blank {
                        self.col = self.next_nonspace;
                        Continuation::Matched
                    } else {
                        Continuation::Unmatched
                    }
                }
                LeafKind::HtmlBlock(kind) => {
                    if self.blank && matches!(kind, HtmlBlockKind::BlockTag | HtmlBlockKind::CompleteTag) {
                        Continuation::Unmatched
                    } else {
                        Continuation::Matched
                    }
                }
                LeafKind::FencedCode { fence, .. } => {
                    let marker = fence.marker as u8;
                    let (length, fence_indent) = (fence.length, fence.indent);
                    if self.indent <= 3
                        && self.byte(self.next_nonspace) == Some(marker)
                        && is_fence_close(self.rest(), marker, length)
                    {
                        let at = self.raw(self.col);
                        let prefix = Span {
                            start: self.mark,
                            end: at.max(self.mark),
                        };
                        let line = Span {
                            start: at.max(self.mark),
                            end: self.eol.end,
                        };
                        if let BlockKind::Leaf(leaf) = &mut self.blocks[id].kind {
                            leaf.close_fence(prefix, line);
                        }
                        self.consume_line();
                        self.finalize(id);
                        return Continuation::Consumed;
                    }
                    let mut remaining = fence_indent;
                    while remaining > 0 && self.byte(self.col) == Some(b' ') {
                        self.advance_columns(1);
                        remaining -= 1;
                    }
                    Continuation::Matched
                }
            },
        }
    }

    /// Tries each block start in turn against the rest of the line.
    fn start_block(&mut self, container: usize) -> Started {
        let indented = self.indented();
        let first = self.byte(self.next_nonspace);
        let start_col = self.col;

        if !indented && first == Some(b'>') {
            self.col = self.next_nonspace + 1;
            if self.byte(self.col) == Some(b' ') {
                self.advance_columns(1);
            }
            self.close_unmatched();
            self.add_child(BlockKind::BlockQuote);
            let (start, end) = (self.raw(start_col), self.raw(self.col));
            self.push_token(TokenKind::BlockQuoteStart, start, end);
            return Started::Container;
        }

        if !indented
            && first == Some(b'#')
            && let Some(heading) = parse_atx_heading(self.rest())
        {
            self.close_unmatched();
            self.add_closed();
            let start_at = self.raw(start_col);
            self.flush_prefix(start_at);
            let base = self.raw(self.next_nonspace);
            emit_atx_heading(heading, start_at, base, self.source, self.eol.end, &mut self.out);
            self.consume_line();
            return Started::Leaf;
        }

        if !indented
            && matches!(first, Some(b'`' | b'~'))
            && let Some(open) = parse_fence_open(self.rest())
        {
            self.close_unmatched();
            let start_at = self.raw(start_col);
            let fence = FenceInfo {
                marker: open.marker as char,
                length: open.length,
                indent: self.indent,
                info: open.info,
            };
            let leaf = Leaf::new(
                LeafKind::FencedCode {
                    fence: fence.clone(),
                    opening_end: self.eol.end,
                    closing: None,
                },
                start_at,
            );
            self.add_child(BlockKind::Leaf(leaf));
            self.push_token(TokenKind::FencedCodeStart(fence), start_at, self.eol.end);
            self.consume_line();
            return Started::Leaf;
        }

        if !indented && first == Some(b'<') {
            let in_paragraph = self.is_paragraph(container)
                || (!self.all_closed && !self.blank && self.is_paragraph(self.tip));
            if let Some(kind) = html_block_start(self.rest(), in_paragraph) {
                self.close_unmatched();
                let start_at = self.raw(self.col);
                self.add_child(BlockKind::Leaf(Leaf::new(LeafKind::HtmlBlock(kind), start_at)));
                return Started::Leaf;
            }
        }

        if !indented
            && self.is_paragraph(container)
            && let Some((level, underline)) = setext_underline(self.rest())
        {
            self.close_unmatched();
            let has_text = match &mut self.blocks[container].kind {
                BlockKind::Leaf(leaf) => leaf.strip_definitions(self.source, &mut self.defs),
                _ => false,
            };
            if has_text {
                let parent = self.blocks[container].parent.unwrap_or(DOCUMENT);
                let kind = std::mem::replace(&mut self.blocks[container].kind, BlockKind::Closed);
                self.blocks[container].open = false;
                self.tip = parent;
                if let BlockKind::Leaf(leaf) = kind {
                    leaf.finish_setext(self.source, level, underline, self.eol.end, &mut self.out);
                }
                self.consume_line();
                return Started::Leaf;
            }
        }

        if !indented && let Some(marker) = thematic_break(self.rest()) {
            self.close_unmatched();
            self.add_closed();
            let start_at = self.raw(start_col);
            self.push_token(TokenKind::ThematicBreak { marker }, start_at, self.eol.end);
            self.consume_line();
            return Started::Leaf;
        }

        // Markers need under four columns of indentation, inside lists too.
        if !indented
            && let Some(marker) = parse_list_marker(self.rest(), self.is_paragraph(container))
        {
            return self.start_list_item(start_col, marker);
        }

        if indented && !self.is_paragraph(self.tip) && !self.blank {
            self.advance_columns(CODE_INDENT);
            self.close_unmatched();
            let start_at = self.raw(start_col);
            self.add_child(BlockKind::Leaf(Leaf::new(LeafKind::IndentedCode, start_at)));
            return Started::Leaf;
        }

        Started::Nothing
    }

    fn start_list_item(&mut self, start_col: usize, marker: ListMarker) -> Started {
        let marker_offset = self.indent;
        self.col = self.next_nonspace + marker.width;
        let spaces_start = self.col;
        loop {
            self.advance_columns(1);
            if self.col - spaces_start >= 5 || self.byte(self.col) != Some(b' ') {
                break;
            }
        }
        let blank_item = self.col >= self.line.len();
        let spaces = self.col - spaces_start;
        let padding = if spaces >= 5 || spaces < 1 || blank_item {
            self.col = spaces_start;
            if self.byte(self.col) == Some(b' ') {
                self.advance_columns(1);
            }
            marker.width + 1
        } else {
            marker.width + spaces
        };

        self.close_unmatched();
        let continues_list = match self.blocks[self.tip].kind {
            BlockKind::List {
                ordered,
                marker: list_marker,
                ..
            } => ordered == marker.ordered() && list_marker == marker.marker,
            _ => false,
        };
        let start_at = self.raw(start_col);
        if !continues_list {
            let token = self.out.len();
            self.add_child(BlockKind::List {
                ordered: marker.ordered(),
                marker: marker.marker,
                token,
            });
            let info = ListInfo {
                ordered: marker.ordered(),
                marker: marker.marker as char,
                start: marker.number,
                tight: true,
            };
            let index = self.push_token(TokenKind::ListStart(info), start_at, start_at);
            if let BlockKind::List { token, .. } = &mut self.blocks[self.tip].kind {
                *token = index;
            }
        }
        self.add_child(BlockKind::Item {
            marker_offset,
            padding,
        });
        let info = ListItemInfo {
            marker: marker.marker as char,
            number: marker.number,
            content_column: self.col + 1,
        };
        let end = self.raw(self.col);
        self.push_token(TokenKind::ListItemStart(info), start_at, end);
        Started::Container
    }

    /// Gives the rest of the line to the open leaf `id`.
    fn add_line(&mut self, id: usize) {
        let BlockKind::Leaf(leaf) = &self.blocks[id].kind else {
            return;
        };
        let paragraph = leaf.is_paragraph();
        let first = leaf.expects_first_line();
        let start_at = leaf.start_at;
        let content_col = if paragraph {
            self.line.next_nonspace(self.col)
        } else {
            self.col
        };
        let content_start = self.raw(content_col).max(self.mark);
        let prefix_end = if first {
            start_at.max(self.mark)
        } else {
            content_start
        };
        let code = if paragraph {
            String::new()
        } else {
            let mut text = self.line.content_from(content_col).into_owned();
            text.push('\n');
            text
        };
        let line = LeafLine {
            prefix: Span {
                start: self.mark,
                end: prefix_end,
            },
            content: Span {
                start: content_start,
                end: self.line_start + self.line.raw().len(),
            },
            eol: self.eol,
            code,
        };
        if let BlockKind::Leaf(leaf) = &mut self.blocks[id].kind {
            leaf.lines.push(line);
        }
        self.mark = self.eol.end;
        self.consumed = true;
    }
}

#[cfg(test)]
mod tests {
    use super::{Emitted, parse_blocks};
    use crate::options::ParseOptions;
    use crate::source_map::SourceMap;
    use crate::token::TokenKind;

    fn tags(source: &str) -> Vec<String> {
        let map = SourceMap::new(source);
        parse_blocks(&map, &ParseOptions::default())
            .items
            .into_iter()
            .map(|item| match item {
                Emitted::Token(kind, span) => format!("{}@{}..{}", kind.tag(), span.start, span.end),
                Emitted::Inline(leaf) => format!("inline:{}", leaf.text.text),
            })
            .collect()
    }

    #[test]
    fn paragraph_then_blank_then_heading() {
        assert_eq!(
            tags("foo\nbar\n\n# baz\n"),
            vec![
                "para@0..0",
                "inline:foo\nbar",
                "end-para@7..8",
                "BLANK@8..9",
                "atx@9..11",
                "inline:baz",
                "end-atx@14..15",
            ]
        );
    }

    #[test]
    fn block_quote_continuation_prefix() {
        assert_eq!(
            tags("> a\n> b\n"),
            vec![
                "bquote@0..2",
                "para@2..2",
                "inline:a\nb",
                "end-para@7..8",
                "end-bquote@8..8",
            ]
        );
    }

    #[test]
    fn list_tightness_is_patched_on_close() {
        let map = SourceMap::new("- a\n\n- b\n");
        let items = parse_blocks(&map, &ParseOptions::default()).items;
        let tight = items.iter().find_map(|item| match item {
            Emitted::Token(TokenKind::ListStart(info), _) => Some(info.tight),
            _ => None,
        });
        assert_eq!(tight, Some(false));

        let map = SourceMap::new("- a\n- b\n");
        let items = parse_blocks(&map, &ParseOptions::default()).items;
        let tight = items.iter().find_map(|item| match item {
            Emitted::Token(TokenKind::ListStart(info), _) => Some(info.tight),
            _ => None,
        });
        assert_eq!(tight, Some(true));
    }

    #[test]
    fn definitions_only_paragraph_vanishes() {
        let map = SourceMap::new("[foo]: /url\n");
        let output = parse_blocks(&map, &ParseOptions::default());
        assert_eq!(output.definitions.len(), 1);
        assert_eq!(output.items.len(), 1);
        assert!(matches!(
            &output.items[0],
            Emitted::Token(TokenKind::LinkReferenceDefinition(_), span) if span.start == 0 && span.end == 12
        ));
    }

    #[test]
    fn fenced_code_lines_keep_prefixes() {
        assert_eq!(
            tags("> ```\n> x\n> ```\n"),
            vec![
                "bquote@0..2",
                "fcode-block@2..6",
                "prefix@6..8",
                "text@8..10",
                "prefix@10..12",
                "end-fcode-block@12..16",
                "end-bquote@16..16",
            ]
        );
    }

    #[test]
    fn front_matter_is_one_token() {
        let map = SourceMap::new("---\ntitle: x\n---\n# a\n");
        let options = ParseOptions {
            front_matter: true,
            ..ParseOptions::default()
        };
        let items = parse_blocks(&map, &options).items;
        assert!(matches!(
            &items[0],
            Emitted::Token(TokenKind::FrontMatter { body }, span) if body == "title: x\n" && span.end == 17
        ));
    }
}
