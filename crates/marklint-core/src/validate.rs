use tracing::warn;

use crate::error::RoundTripError;
use crate::stream::TokenStream;

/// Checks that the stream's spans tile the source: no byte unowned, none
/// owned twice, and the concatenation equal to the input.
pub fn verify_round_trip(stream: &TokenStream) -> Result<(), RoundTripError> {
    let source = stream.source();
    let mut owned = 0;
    for (index, token) in stream.tokens().iter().enumerate() {
        let span = token.span;
        if span.start > owned {
            return Err(report(RoundTripError::Gap {
                index,
                start: owned,
                end: span.start,
            }));
        }
        if span.start < owned {
            return Err(report(RoundTripError::Overlap {
                index,
                start: span.start,
                owned,
            }));
        }
        owned = span.end;
    }
    if owned != source.len() {
        return Err(report(RoundTripError::Truncated {
            end: owned,
            len: source.len(),
        }));
    }

    let rebuilt = stream.reconstruct();
    if rebuilt != source {
        let offset = rebuilt
            .bytes()
            .zip(source.bytes())
            .position(|(a, b)| a != b)
            .unwrap_or_else(|| rebuilt.len().min(source.len()));
        return Err(report(RoundTripError::Diverged { offset }));
    }
    Ok(())
}

fn report(err: RoundTripError) -> RoundTripError {
    warn!(%err, "round trip failed");
    err
}

#[cfg(test)]
mod tests {
    use super::verify_round_trip;
    use crate::error::RoundTripError;
    use crate::source_map::SourceMap;
    use crate::span::Span;
    use crate::stream::TokenStream;
    use crate::token::{Token, TokenKind};

    fn stream(source: &str, spans: &[(usize, usize)]) -> TokenStream {
        let tokens = spans
            .iter()
            .map(|&(start, end)| Token {
                kind: TokenKind::LinePrefix,
                span: Span { start, end },
                line: 1,
                column: start + 1,
                parent: None,
            })
            .collect();
        TokenStream::new(SourceMap::new(source), tokens, Default::default())
    }

    #[test]
    fn tiled_spans_pass() {
        assert_eq!(verify_round_trip(&stream("abc", &[(0, 1), (1, 1), (1, 3)])), Ok(()));
        assert_eq!(verify_round_trip(&stream("", &[])), Ok(()));
    }

    #[test]
    fn holes_and_overlaps_are_located() {
        assert_eq!(
            verify_round_trip(&stream("abc", &[(0, 1), (2, 3)])),
            Err(RoundTripError::Gap {
                index: 1,
                start: 1,
                end: 2
            })
        );
        assert_eq!(
            verify_round_trip(&stream("abc", &[(0, 2), (1, 3)])),
            Err(RoundTripError::Overlap {
                index: 1,
                start: 1,
                owned: 2
            })
        );
        assert_eq!(
            verify_round_trip(&stream("abc", &[(0, 2)])),
            Err(RoundTripError::Truncated { end: 2, len: 3 })
        );
    }
}
