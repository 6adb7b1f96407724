//! Link syntax: labels, destinations, titles, reference definitions, and the
//! decision of what a closing bracket resolves to.

use std::collections::HashMap;

use tracing::trace;

use crate::entities::unescape_and_decode;
use crate::label::normalize_link_label;
use crate::token::{LinkDefinition, ReferenceKind};

/// Longest label body, in bytes.
const MAX_LABEL_LEN: usize = 999;
/// Deepest parenthesis nesting accepted in a bare destination.
const MAX_PAREN_DEPTH: usize = 32;

/// Definitions keyed by normalized label; the first definition of a label wins.
#[derive(Clone, Debug, Default)]
pub struct LinkDefinitions {
    map: HashMap<String, LinkDefinition>,
}

impl LinkDefinitions {
    /// Records `def` unless its label is already defined. Returns whether it was kept.
    pub(crate) fn insert(&mut self, def: LinkDefinition) -> bool {
        if self.map.contains_key(&def.normalized) {
            trace!(label = %def.normalized, "duplicate link definition ignored");
            return false;
        }
        self.map.insert(def.normalized.clone(), def);
        true
    }

    /// Looks a label up by its raw text; normalization is applied here.
    pub fn get(&self, label: &str) -> Option<&LinkDefinition> {
        self.map.get(&normalize_link_label(label))
    }

    pub(crate) fn get_normalized(&self, normalized: &str) -> Option<&LinkDefinition> {
        self.map.get(normalized)
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }
}

/// Cursor over link syntax in a leaf's joined text (lines separated by `\n`).
pub(crate) struct Scanner<'a> {
    text: &'a str,
    bytes: &'a [u8],
    pub(crate) pos: usize,
}

impl<'a> Scanner<'a> {
    pub(crate) fn new(text: &'a str, pos: usize) -> Self {
        Self {
            text,
            bytes: text.as_bytes(),
            pos,
        }
    }

    fn peek(&self) -> Option<u8> {
        self.bytes.get(self.pos).copied()
    }

    fn skip_spaces(&mut self) {
        while matches!(self.peek(), Some(b' ' | b'\t')) {
            self.pos += 1;
        }
    }

    /// Spaces and tabs with at most one line ending among them.
    fn skip_spnl(&mut self) {
        self.skip_spaces();
        if self.peek() == Some(b'\n') {
            self.pos += 1;
            self.skip_spaces();
        }
    }

    /// Trailing spaces then a line ending or the end of text.
    fn at_line_end(&mut self) -> bool {
        let save = self.pos;
        self.skip_spaces();
        match self.peek() {
            None => true,
            Some(b'\n') => {
                self.pos += 1;
                true
            }
            _ => {
                self.pos = save;
                false
            }
        }
    }

    /// Parses `[...]` at the cursor and returns the text between the brackets.
    pub(crate) fn link_label(&mut self) -> Option<&'a str> {
        if self.peek() != Some(b'[') {
            return None;
        }
        let start = self.pos + 1;
        let mut i = start;
        while i < self.bytes.len() {
            match self.bytes[i] {
                b'\\' if i + 1 < self.bytes.len() => i += 2,
                b'[' => return None,
                b']' => {
                    if i - start > MAX_LABEL_LEN {
                        return None;
                    }
                    self.pos = i + 1;
                    return Some(&self.text[start..i]);
                }
                _ => i += 1,
            }
        }
        None
    }

    /// Parses a destination, returning it with escapes and references resolved.
    fn link_destination(&mut self) -> Option<String> {
        if self.peek() == Some(b'<') {
            let start = self.pos + 1;
            let mut i = start;
            while i < self.bytes.len() {
                match self.bytes[i] {
                    b'\\' if i + 1 < self.bytes.len() && self.bytes[i + 1] != b'\n' => i += 2,
                    b'>' => {
                        self.pos = i + 1;
                        return Some(unescape_and_decode(&self.text[start..i]));
                    }
                    b'<' | b'\n' => return None,
                    _ => i += 1,
                }
            }
            return None;
        }
        let start = self.pos;
        let mut depth = 0usize;
        let mut i = start;
        while i < self.bytes.len() {
            match self.bytes[i] {
                b'\\' if i + 1 < self.bytes.len() && self.bytes[i + 1].is_ascii_punctuation() => {
                    i += 2
                }
                b'(' => {
                    depth += 1;
                    if depth > MAX_PAREN_DEPTH {
                        return None;
                    }
                    i += 1;
                }
                b')' if depth == 0 => break,
                b')' => {
                    depth -= 1;
                    i += 1;
                }
                b if b <= b' ' || b == 0x7f => break,
                _ => i += 1,
            }
        }
        if depth != 0 || (i == start && self.bytes.get(i) != Some(&b')')) {
            return None;
        }
        self.pos = i;
        Some(unescape_and_decode(&self.text[start..i]))
    }

    /// Parses a `"..."`, `'...'` or `(...)` title.
    fn link_title(&mut self) -> Option<String> {
        let close = match self.peek()? {
            b'"' => b'"',
            b'\'' => b'\'',
            b'(' => b')',
            _ => return None,
        };
        let start = self.pos + 1;
        let mut i = start;
        while i < self.bytes.len() {
            match self.bytes[i] {
                b'\\' if i + 1 < self.bytes.len() => i += 2,
                b if b == close => {
                    self.pos = i + 1;
                    return Some(unescape_and_decode(&self.text[start..i]));
                }
                b'(' if close == b')' => return None,
                _ => i += 1,
            }
        }
        None
    }

    /// Parses `(destination "title")` right after a closing bracket.
    fn inline_target(&mut self) -> Option<(String, Option<String>)> {
        if self.peek() != Some(b'(') {
            return None;
        }
        self.pos += 1;
        self.skip_spnl();
        let destination = if self.peek() == Some(b')') {
            String::new()
        } else {
            self.link_destination()?
        };
        let before_title = self.pos;
        self.skip_spnl();
        let title = if self.pos > before_title {
            self.link_title()
        } else {
            None
        };
        self.skip_spnl();
        if self.peek() != Some(b')') {
            return None;
        }
        self.pos += 1;
        Some((destination, title))
    }
}

/// Parses a link reference definition at `start`. Returns the definition and
/// the offset just past the line ending that terminates it.
pub(crate) fn parse_reference_definition(text: &str, start: usize) -> Option<(LinkDefinition, usize)> {
    let mut scanner = Scanner::new(text, start);
    let label = scanner.link_label()?;
    let normalized = normalize_link_label(label);
    if normalized.is_empty() || scanner.peek() != Some(b':') {
        return None;
    }
    scanner.pos += 1;
    scanner.skip_spnl();
    let destination = match scanner.peek() {
        None | Some(b'\n') => return None,
        _ => scanner.link_destination()?,
    };
    let before_title = scanner.pos;
    scanner.skip_spnl();
    let title = if scanner.pos > before_title {
        scanner.link_title()
    } else {
        None
    };
    if title.is_some() && scanner.at_line_end() {
        return Some((
            LinkDefinition {
                label: label.to_string(),
                normalized,
                destination,
                title,
            },
            scanner.pos,
        ));
    }
    // No usable title: the destination alone must end its line.
    scanner.pos = before_title;
    if !scanner.at_line_end() {
        return None;
    }
    Some((
        LinkDefinition {
            label: label.to_string(),
            normalized,
            destination,
            title: None,
        },
        scanner.pos,
    ))
}

/// What a closing bracket resolved to.
#[derive(Clone, Debug, Eq, PartialEq)]
pub(crate) struct LinkTarget {
    pub(crate) reference: ReferenceKind,
    pub(crate) destination: String,
    pub(crate) title: Option<String>,
    pub(crate) label: Option<String>,
    /// Offset just past the whole construct.
    pub(crate) end: usize,
}

/// Resolves the bracket pair whose text is `text[text_start..close]` (where
/// `close` is the `]`). Forms are tried in order: inline, full reference,
/// collapsed, shortcut. The last two are skipped when the bracket text
/// itself contains a bracket.
pub(crate) fn resolve_target(
    text: &str,
    text_start: usize,
    close: usize,
    bracket_inside: bool,
    defs: &LinkDefinitions,
) -> Option<LinkTarget> {
    let after = close + 1;
    let mut scanner = Scanner::new(text, after);
    if let Some((destination, title)) = scanner.inline_target() {
        return Some(LinkTarget {
            reference: ReferenceKind::Inline,
            destination,
            title,
            label: None,
            end: scanner.pos,
        });
    }
    let mut scanner = Scanner::new(text, after);
    let (reference, label, end) = match scanner.link_label() {
        Some(label) if !label.is_empty() => (ReferenceKind::Full, label, scanner.pos),
        Some(_) if !bracket_inside => (
            ReferenceKind::Collapsed,
            &text[text_start..close],
            scanner.pos,
        ),
        None if !bracket_inside => (ReferenceKind::Shortcut, &text[text_start..close], after),
        _ => return None,
    };
    let normalized = normalize_link_label(label);
    if label.len() > MAX_LABEL_LEN {
        return None;
    }
    let def = defs.get_normalized(&normalized)?;
    Some(LinkTarget {
        reference,
        destination: def.destination.clone(),
        title: def.title.clone(),
        label: Some(normalized),
        end,
    })
}

#[cfg(test)]
mod tests {
    use super::{LinkDefinitions, parse_reference_definition, resolve_target};
    use crate::token::ReferenceKind;

    fn defs(source: &str) -> LinkDefinitions {
        let mut defs = LinkDefinitions::default();
        let mut pos = 0;
        while let Some((def, next)) = parse_reference_definition(source, pos) {
            defs.insert(def);
            pos = next;
        }
        defs
    }

    #[test]
    fn definition_with_title_on_next_line() {
        let text = "[foo]: /url\n\"the title\"\nrest";
        let (def, end) = parse_reference_definition(text, 0).expect("definition");
        assert_eq!(def.destination, "/url");
        assert_eq!(def.title.as_deref(), Some("the title"));
        assert_eq!(&text[end..], "rest");
    }

    #[test]
    fn junk_after_title_falls_back_to_destination_line() {
        let text = "[foo]: /url\n\"title\" ok";
        let (def, end) = parse_reference_definition(text, 0).expect("definition");
        assert_eq!(def.title, None);
        assert_eq!(&text[end..], "\"title\" ok");
        assert!(parse_reference_definition("[foo]: /url \"title\" ok", 0).is_none());
        assert!(parse_reference_definition("[foo]:\n", 0).is_none());
        assert!(parse_reference_definition("[ ]: /url", 0).is_none());
    }

    #[test]
    fn first_definition_wins() {
        let defs = defs("[foo]: /first\n[FOO]: /second\n");
        assert_eq!(defs.len(), 1);
        assert_eq!(defs.get("Foo").map(|d| d.destination.as_str()), Some("/first"));
    }

    #[test]
    fn bracket_forms_resolve_in_order() {
        let defs = defs("[bar]: /bar\n[foo]: /foo\n");
        let text = "[foo](/inline \"t\")";
        let target = resolve_target(text, 1, 4, false, &defs).expect("inline");
        assert_eq!(target.reference, ReferenceKind::Inline);
        assert_eq!(target.destination, "/inline");
        assert_eq!(target.title.as_deref(), Some("t"));
        assert_eq!(target.end, text.len());

        let target = resolve_target("[x][bar]", 1, 2, false, &defs).expect("full");
        assert_eq!((target.reference, target.destination.as_str()), (ReferenceKind::Full, "/bar"));

        let target = resolve_target("[foo][]", 1, 4, false, &defs).expect("collapsed");
        assert_eq!(target.reference, ReferenceKind::Collapsed);
        assert_eq!(target.end, 7);

        let target = resolve_target("[foo] x", 1, 4, false, &defs).expect("shortcut");
        assert_eq!((target.reference, target.end), (ReferenceKind::Shortcut, 5));

        assert!(resolve_target("[foo][nope]", 1, 4, false, &defs).is_none());
        assert!(resolve_target("[foo]", 1, 4, true, &defs).is_none());
    }

    #[test]
    fn destinations_balance_parentheses() {
        let defs = LinkDefinitions::default();
        let target = resolve_target("[a](foo(and(bar)))", 1, 2, false, &defs).expect("link");
        assert_eq!(target.destination, "foo(and(bar))");
        assert!(resolve_target("[a](foo(and(bar))", 1, 2, false, &defs).is_none());
        let target = resolve_target("[a](<b)c>)", 1, 2, false, &defs).expect("pointy");
        assert_eq!(target.destination, "b)c");
        let target = resolve_target("[a]()", 1, 2, false, &defs).expect("empty");
        assert_eq!(target.destination, "");
    }
}
