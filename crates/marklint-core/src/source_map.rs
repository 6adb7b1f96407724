use serde::Serialize;

use crate::span::Span;
use crate::whitespace::TAB_STOP;

/// 1-based line and column. Columns count characters with tabs expanded to
/// the next multiple of four.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Ord, PartialOrd, Serialize)]
pub struct Position {
    pub line: usize,
    pub column: usize,
}

impl std::fmt::Display for Position {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.line, self.column)
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize)]
pub struct Range {
    pub start: Position,
    pub end: Position,
}

/// One physical line of the source.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct SourceLine {
    /// 1-based line number.
    pub number: usize,
    /// Offset of the first byte of the line.
    pub start: usize,
    /// Offset just before the line ending.
    pub content_end: usize,
    /// Offset just after the line ending (`\n`, `\r\n` or `\r`).
    pub end: usize,
}

impl SourceLine {
    pub fn content(&self) -> Span {
        Span {
            start: self.start,
            end: self.content_end,
        }
    }

    pub fn ending(&self) -> Span {
        Span {
            start: self.content_end,
            end: self.end,
        }
    }
}

/// Owns the source text and the line index used to turn offsets into positions.
#[derive(Clone, Debug)]
pub struct SourceMap {
    source: String,
    lines: Vec<SourceLine>,
}

impl SourceMap {
    pub fn new(source: impl Into<String>) -> Self {
        let source = source.into();
        let lines = split_lines(&source);
        Self { source, lines }
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn lines(&self) -> &[SourceLine] {
        &self.lines
    }

    pub fn line_count(&self) -> usize {
        self.lines.len()
    }

    pub fn line(&self, number: usize) -> Option<&SourceLine> {
        number.checked_sub(1).and_then(|idx| self.lines.get(idx))
    }

    pub fn position(&self, offset: usize) -> Position {
        let offset = offset.min(self.source.len());
        if self.lines.is_empty() {
            return Position { line: 1, column: 1 };
        }
        // An offset at the very end of a terminated final line sits on a line
        // of its own.
        let idx = self.lines.partition_point(|line| line.start <= offset);
        let line = &self.lines[idx.saturating_sub(1)];
        if offset >= line.end && line.end > line.content_end {
            return Position {
                line: line.number + 1,
                column: 1,
            };
        }
        let prefix = self.source.get(line.start..offset).unwrap_or("");
        Position {
            line: line.number,
            column: visual_width(prefix) + 1,
        }
    }

    pub fn range(&self, span: Span) -> Range {
        Range {
            start: self.position(span.start),
            end: self.position(span.end),
        }
    }
}

/// Resolves non-decreasing offsets to positions without rescanning each line
/// from its start.
pub(crate) struct PositionCursor<'a> {
    map: &'a SourceMap,
    line: usize,
    offset: usize,
    /// 0-based visual column of `offset`.
    column: usize,
}

impl<'a> PositionCursor<'a> {
    pub(crate) fn new(map: &'a SourceMap) -> Self {
        Self {
            map,
            line: 0,
            offset: 0,
            column: 0,
        }
    }

    pub(crate) fn position(&mut self, offset: usize) -> Position {
        let offset = offset.min(self.map.source.len());
        let contains = |line: &SourceLine| {
            line.start <= offset
                && (offset < line.end || (offset == line.end && line.end == line.content_end))
        };
        let on_current = offset >= self.offset
            && self.map.lines.get(self.line).is_some_and(|line| contains(line));
        if !on_current {
            let idx = self
                .map
                .lines
                .partition_point(|line| line.start <= offset)
                .saturating_sub(1);
            match self.map.lines.get(idx) {
                Some(line) if contains(line) => {
                    self.line = idx;
                    self.offset = line.start;
                    self.column = 0;
                }
                _ => return self.map.position(offset),
            }
        }
        let advanced = self.map.source.get(self.offset..offset).unwrap_or("");
        self.column = advance_width(self.column, advanced);
        self.offset = offset;
        Position {
            line: self.line + 1,
            column: self.column + 1,
        }
    }
}

/// Display width of `text` with 4-column tab stops, starting at column 0.
pub(crate) fn visual_width(text: &str) -> usize {
    advance_width(0, text)
}

fn advance_width(start: usize, text: &str) -> usize {
    text.chars().fold(start, |col, ch| {
        if ch == '\t' {
            col + TAB_STOP - col % TAB_STOP
        } else {
            col + 1
        }
    })
}

pub(crate) fn split_lines(source: &str) -> Vec<SourceLine> {
    let bytes = source.as_bytes();
    let mut lines = Vec::new();
    let mut start = 0usize;
    let mut i = 0usize;
    while i < bytes.len() {
        let ending = match bytes[i] {
            b'\n' => 1,
            b'\r' if bytes.get(i + 1) == Some(&b'\n') => 2,
            b'\r' => 1,
            _ => {
                i += 1;
                continue;
            }
        };
        lines.push(SourceLine {
            number: lines.len() + 1,
            start,
            content_end: i,
            end: i + ending,
        });
        i += ending;
        start = i;
    }
    if start < bytes.len() {
        lines.push(SourceLine {
            number: lines.len() + 1,
            start,
            content_end: bytes.len(),
            end: bytes.len(),
        });
    }
    lines
}

#[cfg(test)]
mod tests {
    use super::{Position, PositionCursor, SourceMap};
    use crate::span::Span;

    #[test]
    fn positions_are_line_based() {
        let map = SourceMap::new("a\nb\n");

        assert_eq!(map.line_count(), 2);
        assert_eq!(map.position(0), Position { line: 1, column: 1 });
        assert_eq!(map.position(2), Position { line: 2, column: 1 });
        assert_eq!(map.position(4), Position { line: 3, column: 1 });

        let range = map.range(Span { start: 0, end: 3 });
        assert_eq!(range.start.line, 1);
        assert_eq!(range.end.line, 2);
    }

    #[test]
    fn tabs_expand_to_four_column_stops() {
        let map = SourceMap::new("\tx\n a\tb");
        assert_eq!(map.position(1), Position { line: 1, column: 5 });
        assert_eq!(map.position(6), Position { line: 2, column: 5 });
    }

    #[test]
    fn all_line_endings_split_lines() {
        let map = SourceMap::new("a\r\nb\rc\nd");
        let starts: Vec<_> = map.lines().iter().map(|line| line.start).collect();
        assert_eq!(starts, vec![0, 3, 5, 7]);
        assert_eq!(map.lines()[0].ending().len(), 2);
        assert_eq!(map.lines()[3].ending().len(), 0);
    }

    #[test]
    fn cursor_agrees_with_direct_lookup() {
        let map = SourceMap::new("a\tb\n\tc\r\nd\n");
        let mut cursor = PositionCursor::new(&map);
        for offset in 0..=map.source().len() {
            assert_eq!(cursor.position(offset), map.position(offset), "offset {offset}");
        }
        // Jumping backwards re-anchors.
        assert_eq!(cursor.position(2), map.position(2));
    }
}
