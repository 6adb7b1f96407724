use serde::Serialize;

/// Half-open byte range `[start, end)` into the original source.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Hash, Serialize)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

impl Span {
    pub fn new(start: usize, end: usize) -> Result<Self, SpanError> {
        if start <= end {
            Ok(Self { start, end })
        } else {
            Err(SpanError::Inverted { start, end })
        }
    }

    pub(crate) fn empty(at: usize) -> Self {
        Self { start: at, end: at }
    }

    pub fn len(&self) -> usize {
        self.end.saturating_sub(self.start)
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    /// True when `other` lies entirely inside `self` and `self` owns at least one byte.
    pub fn covers(&self, other: Span) -> bool {
        !self.is_empty() && self.start <= other.start && other.end <= self.end
    }

    pub fn slice<'a>(&self, source: &'a str) -> &'a str {
        source.get(self.start..self.end).unwrap_or("")
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, thiserror::Error)]
pub enum SpanError {
    #[error("span start {start} is past its end {end}")]
    Inverted { start: usize, end: usize },
}

#[cfg(test)]
mod tests {
    use super::{Span, SpanError};

    #[test]
    fn inverted_spans_are_rejected() {
        assert_eq!(
            Span::new(4, 2),
            Err(SpanError::Inverted { start: 4, end: 2 })
        );
        let span = Span::new(2, 4).expect("valid span");
        assert_eq!(span.len(), 2);
        assert_eq!(span.slice("abcdef"), "cd");
    }

    #[test]
    fn empty_spans_cover_nothing() {
        let empty = Span::empty(3);
        assert!(!empty.covers(Span::empty(3)));
        assert!(Span { start: 0, end: 5 }.covers(Span { start: 2, end: 5 }));
    }
}
