//! Tab expansion with a side table back to the original bytes.
//!
//! Block structure is decided on the expanded view of a line, where a column
//! and a byte index coincide for the whitespace and marker prefix. Every
//! expanded byte remembers the original byte it came from, so tokens can own
//! original bytes while payloads carry normalized text.

use std::borrow::Cow;

use serde::Serialize;

pub const TAB_STOP: usize = 4;

/// A tab and the spaces it stands for in the expanded view.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize)]
pub struct Replacement {
    /// Byte offset of the tab within the raw line.
    pub offset: usize,
    /// 0-based expanded column where the tab starts.
    pub column: usize,
    /// Number of columns the tab expands to.
    pub width: usize,
}

#[derive(Clone, Debug)]
pub struct ExpandedLine<'a> {
    raw: &'a str,
    text: String,
    origin: Vec<usize>,
    replacements: Vec<Replacement>,
}

/// Expands the tabs of one line (without its line ending).
pub fn normalize_line(raw: &str) -> ExpandedLine<'_> {
    ExpandedLine::new(raw)
}

impl<'a> ExpandedLine<'a> {
    pub fn new(raw: &'a str) -> Self {
        if !raw.contains('\t') {
            return Self {
                raw,
                text: raw.to_string(),
                origin: (0..raw.len()).collect(),
                replacements: Vec::new(),
            };
        }
        let mut text = String::with_capacity(raw.len() + 8);
        let mut origin = Vec::with_capacity(raw.len() + 8);
        let mut replacements = Vec::new();
        let mut column = 0usize;
        for (offset, ch) in raw.char_indices() {
            if ch == '\t' {
                let width = TAB_STOP - column % TAB_STOP;
                replacements.push(Replacement {
                    offset,
                    column: text.len(),
                    width,
                });
                for _ in 0..width {
                    text.push(' ');
                    origin.push(offset);
                }
                column += width;
            } else {
                text.push(ch);
                origin.extend(offset..offset + ch.len_utf8());
                column += 1;
            }
        }
        Self {
            raw,
            text,
            origin,
            replacements,
        }
    }

    pub fn raw(&self) -> &'a str {
        self.raw
    }

    /// The tab-expanded text.
    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn len(&self) -> usize {
        self.text.len()
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }

    pub fn replacements(&self) -> &[Replacement] {
        &self.replacements
    }

    pub(crate) fn byte(&self, col: usize) -> Option<u8> {
        self.text.as_bytes().get(col).copied()
    }

    /// True when `col` falls strictly inside the expansion of a tab.
    pub fn is_mid_tab(&self, col: usize) -> bool {
        col > 0
            && col < self.origin.len()
            && self.origin[col] == self.origin[col - 1]
    }

    /// Raw byte offset for an expanded column. A column inside a tab maps past
    /// the tab, so the tab belongs to whatever precedes the boundary.
    pub fn raw_offset(&self, col: usize) -> usize {
        if col >= self.origin.len() {
            return self.raw.len();
        }
        if self.is_mid_tab(col) {
            self.origin[col] + 1
        } else {
            self.origin[col]
        }
    }

    /// Content from `col` onward: virtual spaces for the unconsumed part of a
    /// split tab, then the original bytes with interior tabs kept.
    pub fn content_from(&self, col: usize) -> Cow<'a, str> {
        if !self.is_mid_tab(col) {
            return Cow::Borrowed(&self.raw[self.raw_offset(col)..]);
        }
        let tab = self.origin[col];
        let virtual_spaces = self.origin[col..]
            .iter()
            .take_while(|&&origin| origin == tab)
            .count();
        let mut out = " ".repeat(virtual_spaces);
        out.push_str(&self.raw[tab + 1..]);
        Cow::Owned(out)
    }

    /// First column at or after `col` that is not a space.
    pub(crate) fn next_nonspace(&self, col: usize) -> usize {
        let bytes = self.text.as_bytes();
        let mut idx = col.min(bytes.len());
        while idx < bytes.len() && bytes[idx] == b' ' {
            idx += 1;
        }
        idx
    }
}

#[cfg(test)]
mod tests {
    use super::{Replacement, normalize_line};

    #[test]
    fn tab_free_lines_map_identically() {
        let line = normalize_line("abc");
        assert_eq!(line.text(), "abc");
        assert!(line.replacements().is_empty());
        assert_eq!(line.raw_offset(2), 2);
        assert_eq!(line.raw_offset(3), 3);
    }

    #[test]
    fn tabs_expand_to_next_stop() {
        let line = normalize_line("a\tb\tc");
        assert_eq!(line.text(), "a   b   c");
        assert_eq!(
            line.replacements(),
            &[
                Replacement { offset: 1, column: 1, width: 3 },
                Replacement { offset: 3, column: 5, width: 3 },
            ]
        );
    }

    #[test]
    fn split_tab_goes_to_the_earlier_side() {
        let line = normalize_line(">\t\tfoo");
        assert_eq!(line.text(), ">       foo");
        assert!(line.is_mid_tab(2));
        assert_eq!(line.raw_offset(2), 2);
        assert_eq!(line.content_from(2), "  \tfoo");
        assert_eq!(line.raw_offset(4), 2);
        assert_eq!(line.content_from(4), "\tfoo");
    }
}
