//! Delimiter-run pairing for emphasis, strong emphasis and strikethrough.
//!
//! Runs are kept in an explicit stack in source order. A closer scans
//! backward for the nearest usable opener; per-(character, can-open, length
//! mod 3) floors keep repeated failed searches from rescanning the stack.

use tracing::trace;

use crate::inline::{InlineArena, NodeKind};
use crate::token::TokenKind;

#[derive(Clone, Debug)]
pub(crate) struct Delimiter {
    /// Arena node holding the run's remaining characters.
    pub(crate) node: usize,
    pub(crate) ch: u8,
    /// Characters not yet consumed by a pairing.
    pub(crate) len: usize,
    /// Length of the run as written.
    pub(crate) orig: usize,
    pub(crate) can_open: bool,
    pub(crate) can_close: bool,
    pub(crate) removed: bool,
}

/// Left/right flanking classification of a run, refined for `_`.
pub(crate) fn flanking(before: Option<char>, after: Option<char>, ch: u8) -> (bool, bool) {
    let before_ws = before.is_none_or(char::is_whitespace);
    let after_ws = after.is_none_or(char::is_whitespace);
    let before_punct = before.is_some_and(is_punctuation);
    let after_punct = after.is_some_and(is_punctuation);

    let left = !after_ws && (!after_punct || before_ws || before_punct);
    let right = !before_ws && (!before_punct || after_ws || after_punct);

    if ch == b'_' {
        (left && (!right || before_punct), right && (!left || after_punct))
    } else {
        (left, right)
    }
}

/// Unicode punctuation or symbol.
fn is_punctuation(ch: char) -> bool {
    if ch.is_ascii() {
        ch.is_ascii_punctuation()
    } else {
        !ch.is_whitespace() && !ch.is_alphanumeric()
    }
}

fn floor_slot(delim: &Delimiter) -> usize {
    let char_slot = match delim.ch {
        b'*' => 0,
        b'_' => 1,
        _ => 2,
    };
    char_slot * 6 + if delim.can_open { 3 } else { 0 } + delim.orig % 3
}

fn previous_live(delims: &[Delimiter], idx: usize, bottom: usize) -> Option<usize> {
    (bottom..idx).rev().find(|&i| !delims[i].removed)
}

fn next_live(delims: &[Delimiter], idx: usize) -> Option<usize> {
    (idx + 1..delims.len()).find(|&i| !delims[i].removed)
}

fn pairs(opener: &Delimiter, closer: &Delimiter) -> bool {
    if opener.ch != closer.ch || !opener.can_open {
        return false;
    }
    if closer.ch == b'~' {
        return opener.len == closer.len;
    }
    // Rule of three: a run that can both open and close only pairs when the
    // lengths do not sum to a multiple of 3, unless both are multiples of 3.
    let odd = (closer.can_open || opener.can_close)
        && closer.orig % 3 != 0
        && (opener.orig + closer.orig) % 3 == 0;
    !odd
}

/// Resolves every delimiter at index `bottom` or above, then drops them from
/// the stack.
pub(crate) fn process_emphasis(arena: &mut InlineArena, delims: &mut Vec<Delimiter>, bottom: usize) {
    let mut floors = [bottom; 18];
    let mut closer_idx = (bottom..delims.len()).find(|&i| !delims[i].removed);

    while let Some(ci) = closer_idx {
        if !delims[ci].can_close {
            closer_idx = next_live(delims, ci);
            continue;
        }
        let slot = floor_slot(&delims[ci]);
        let floor = floors[slot].max(bottom);
        let mut opener_idx = previous_live(delims, ci, floor);
        while let Some(oi) = opener_idx {
            if pairs(&delims[oi], &delims[ci]) {
                break;
            }
            opener_idx = previous_live(delims, oi, floor);
        }

        let Some(oi) = opener_idx else {
            floors[slot] = ci;
            if !delims[ci].can_open {
                delims[ci].removed = true;
            }
            closer_idx = next_live(delims, ci);
            continue;
        };

        let ch = delims[ci].ch;
        let used = if ch == b'~' {
            delims[ci].len
        } else if delims[ci].len >= 2 && delims[oi].len >= 2 {
            2
        } else {
            1
        };
        let marker = ch as char;
        let (open_kind, close_kind) = match ch {
            b'~' => (TokenKind::StrikethroughStart, TokenKind::StrikethroughEnd),
            _ => {
                let strong = used == 2;
                (
                    TokenKind::EmphasisStart { marker, strong },
                    TokenKind::EmphasisEnd { marker, strong },
                )
            }
        };
        trace!(opener = oi, closer = ci, used, "paired delimiter runs");

        let opener_node = delims[oi].node;
        let (start, end) = arena.range(opener_node);
        arena.set_range(opener_node, start, end - used);
        arena.insert_after(opener_node, NodeKind::Token(open_kind), end - used, end);

        let closer_node = delims[ci].node;
        let (start, end) = arena.range(closer_node);
        arena.set_range(closer_node, start + used, end);
        arena.insert_before(closer_node, NodeKind::Token(close_kind), start, start + used);

        delims[oi].len -= used;
        delims[ci].len -= used;
        for between in &mut delims[oi + 1..ci] {
            between.removed = true;
        }
        if delims[oi].len == 0 {
            arena.unlink(opener_node);
            delims[oi].removed = true;
        }
        if delims[ci].len == 0 {
            arena.unlink(closer_node);
            delims[ci].removed = true;
            closer_idx = next_live(delims, ci);
        }
    }

    delims.truncate(bottom);
}

#[cfg(test)]
mod tests {
    use super::flanking;

    #[test]
    fn flanking_follows_neighbouring_classes() {
        // `*foo`
        assert_eq!(flanking(None, Some('f'), b'*'), (true, false));
        // `** foo`
        assert_eq!(flanking(None, Some(' '), b'*'), (false, false));
        // `a**"foo"`
        assert_eq!(flanking(Some('a'), Some('"'), b'*'), (false, true));
        // `foo_bar`
        assert_eq!(flanking(Some('o'), Some('b'), b'_'), (false, false));
        assert_eq!(flanking(Some('o'), Some('b'), b'*'), (true, true));
        // `)__.`
        assert_eq!(flanking(Some(')'), Some('.'), b'_'), (true, true));
    }
}
