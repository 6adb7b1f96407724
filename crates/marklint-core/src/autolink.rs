//! `<scheme:...>` / `<user@host>` autolinks and GFM literal autolinks.

use crate::token::AutolinkKind;

/// Checks the text between `<` and `>` of an autolink candidate.
pub(crate) fn classify_bracketed(inner: &str) -> Option<AutolinkKind> {
    if is_absolute_uri(inner) {
        Some(AutolinkKind::Uri)
    } else if is_email(inner) {
        Some(AutolinkKind::Email)
    } else {
        None
    }
}

/// Scheme of 2-32 characters, `:`, then anything but controls, spaces and angle brackets.
fn is_absolute_uri(value: &str) -> bool {
    let bytes = value.as_bytes();
    let Some(colon) = bytes.iter().position(|&b| b == b':') else {
        return false;
    };
    if !(2..=32).contains(&colon) || !bytes[0].is_ascii_alphabetic() {
        return false;
    }
    let scheme_ok = bytes[1..colon]
        .iter()
        .all(|&b| b.is_ascii_alphanumeric() || matches!(b, b'+' | b'.' | b'-'));
    scheme_ok
        && bytes[colon + 1..]
            .iter()
            .all(|&b| b > b' ' && b != b'<' && b != b'>' && b != 0x7f)
}

fn is_email(value: &str) -> bool {
    let Some((local, domain)) = value.split_once('@') else {
        return false;
    };
    let local_ok = !local.is_empty()
        && local.bytes().all(|b| {
            b.is_ascii_alphanumeric() || b".!#$%&'*+/=?^_`{|}~-".contains(&b)
        });
    local_ok
        && domain.split('.').all(|label| {
            let bytes = label.as_bytes();
            !bytes.is_empty()
                && bytes.len() <= 63
                && bytes[0].is_ascii_alphanumeric()
                && bytes[bytes.len() - 1].is_ascii_alphanumeric()
                && bytes.iter().all(|&b| b.is_ascii_alphanumeric() || b == b'-')
        })
}

/// A literal autolink found inside plain text, as byte offsets into that text.
#[derive(Clone, Debug, Eq, PartialEq)]
pub(crate) struct LiteralLink {
    pub(crate) start: usize,
    pub(crate) end: usize,
    pub(crate) destination: String,
}

/// Finds every `www.`, `http://`, `https://` and email literal in `text`.
pub(crate) fn find_literal_links(text: &str) -> Vec<LiteralLink> {
    let bytes = text.as_bytes();
    let mut found = Vec::new();
    let mut i = 0usize;
    while i < bytes.len() {
        let prev = i.checked_sub(1).map(|p| bytes[p]);
        let matched = if bytes[i] == b'@' {
            match_email(text, i, found.last().map_or(0, |link: &LiteralLink| link.end))
        } else if at_url_boundary(prev) {
            match_url(text, i)
        } else {
            None
        };
        match matched {
            Some(link) => {
                // An email match reaches back over text already scanned.
                i = link.end;
                found.push(link);
            }
            None => i += 1,
        }
    }
    found
}

fn at_url_boundary(prev: Option<u8>) -> bool {
    match prev {
        None => true,
        Some(b) => b.is_ascii_whitespace() || matches!(b, b'*' | b'_' | b'~' | b'('),
    }
}

fn match_url(text: &str, start: usize) -> Option<LiteralLink> {
    let rest = &text[start..];
    let (host_start, prefix) = if rest.starts_with("http://") {
        (start + 7, "")
    } else if rest.starts_with("https://") {
        (start + 8, "")
    } else if rest.get(..4).is_some_and(|head| head.eq_ignore_ascii_case("www.")) {
        (start, "http://")
    } else {
        return None;
    };
    let domain_end = scan_domain(text.as_bytes(), host_start)?;
    let mut end = domain_end;
    let bytes = text.as_bytes();
    while end < bytes.len() && !bytes[end].is_ascii_whitespace() && bytes[end] != b'<' {
        end += 1;
    }
    let end = trim_trailing(text, start, domain_end, end);
    Some(LiteralLink {
        start,
        end,
        destination: format!("{prefix}{}", &text[start..end]),
    })
}

/// Valid domain: segments of alphanumerics, `_` and `-` separated by periods,
/// at least one period, no underscore in the last two segments.
fn scan_domain(bytes: &[u8], start: usize) -> Option<usize> {
    let mut end = start;
    let mut segments: Vec<(usize, usize)> = Vec::new();
    let mut seg_start = start;
    while end < bytes.len() {
        let b = bytes[end];
        if b == b'.' {
            if end == seg_start {
                break;
            }
            segments.push((seg_start, end));
            seg_start = end + 1;
        } else if !(b.is_ascii_alphanumeric() || b == b'_' || b == b'-' || b >= 0x80) {
            break;
        }
        end += 1;
    }
    if end > seg_start {
        segments.push((seg_start, end));
    } else if end > start {
        // Trailing period is not part of the domain.
        end -= 1;
    }
    if segments.len() < 2 {
        return None;
    }
    let underscore_in_tail = segments[segments.len() - 2..]
        .iter()
        .any(|&(s, e)| bytes[s..e].contains(&b'_'));
    (!underscore_in_tail).then_some(end)
}

/// Drops trailing punctuation, unbalanced closing parentheses and a trailing
/// entity-like `&name;` from a literal link ending at `end`.
fn trim_trailing(text: &str, start: usize, min: usize, mut end: usize) -> usize {
    let bytes = text.as_bytes();
    loop {
        if end <= min {
            return min;
        }
        let last = bytes[end - 1];
        if matches!(last, b'?' | b'!' | b'.' | b',' | b':' | b'*' | b'_' | b'~' | b'\'' | b'"') {
            end -= 1;
            continue;
        }
        if last == b')' {
            let opens = bytes[start..end].iter().filter(|&&b| b == b'(').count();
            let closes = bytes[start..end].iter().filter(|&&b| b == b')').count();
            if closes > opens {
                end -= 1;
                continue;
            }
        }
        if last == b';' {
            let mut amp = end - 1;
            while amp > min && bytes[amp - 1].is_ascii_alphanumeric() {
                amp -= 1;
            }
            if amp > min && bytes[amp - 1] == b'&' && amp < end - 1 {
                end = amp - 1;
                continue;
            }
        }
        return end;
    }
}

fn match_email(text: &str, at: usize, floor: usize) -> Option<LiteralLink> {
    let bytes = text.as_bytes();
    let is_local = |b: u8| b.is_ascii_alphanumeric() || matches!(b, b'.' | b'+' | b'-' | b'_');
    let mut start = at;
    while start > floor && is_local(bytes[start - 1]) {
        start -= 1;
    }
    if start == at {
        return None;
    }
    let mut end = at + 1;
    let mut periods = 0usize;
    while end < bytes.len() {
        let b = bytes[end];
        if b == b'.' && end + 1 < bytes.len() && bytes[end + 1].is_ascii_alphanumeric() {
            periods += 1;
        } else if !(b.is_ascii_alphanumeric() || b == b'-' || b == b'_') {
            break;
        }
        end += 1;
    }
    if periods == 0 || end == at + 1 || matches!(bytes[end - 1], b'-' | b'_') {
        return None;
    }
    Some(LiteralLink {
        start,
        end,
        destination: format!("mailto:{}", &text[start..end]),
    })
}
