//! Second pass: tokenizes buffered leaf content against the complete set of
//! link definitions and turns the block phase's output into positioned,
//! parent-linked tokens.

use tracing::{debug, error};

use crate::block::{BlockOutput, Emitted, InlineLeaf};
use crate::error::StructuralError;
use crate::inline::{InlineInput, parse_inlines};
use crate::link::LinkDefinitions;
use crate::options::ParseOptions;
use crate::source_map::{PositionCursor, SourceMap};
use crate::span::Span;
use crate::token::{Token, TokenId, TokenKind};

pub(crate) struct Assembled {
    pub(crate) tokens: Vec<Token>,
    pub(crate) definitions: LinkDefinitions,
}

pub(crate) fn assemble(
    map: &SourceMap,
    output: BlockOutput,
    options: &ParseOptions,
) -> Result<Assembled, StructuralError> {
    let BlockOutput { items, definitions } = output;
    let mut flat = Vec::with_capacity(items.len());
    for item in items {
        match item {
            Emitted::Token(kind, span) => flat.push((kind, span)),
            Emitted::Inline(leaf) => expand_leaf(&leaf, &definitions, options, &mut flat),
        }
    }
    debug!(tokens = flat.len(), "assembling token stream");
    let tokens = link(map, flat).inspect_err(|err| error!(%err, "token stream is malformed"))?;
    Ok(Assembled {
        tokens,
        definitions,
    })
}

/// Interleaves a leaf's inline tokens with the prefixes of its continuation
/// lines. A prefix inside a multi-line inline token (a code span, raw HTML)
/// already belongs to that token.
fn expand_leaf(
    leaf: &InlineLeaf,
    definitions: &LinkDefinitions,
    options: &ParseOptions,
    flat: &mut Vec<(TokenKind, Span)>,
) {
    let inlines = parse_inlines(
        InlineInput {
            leaf: &leaf.text,
            task_candidate: leaf.task_candidate,
        },
        definitions,
        options,
    );
    let mut prefixes = leaf.prefixes.iter().copied().peekable();
    for (kind, span) in inlines {
        while let Some(prefix) = prefixes.next_if(|prefix| prefix.end <= span.start) {
            flat.push((TokenKind::LinePrefix, prefix));
        }
        while prefixes.next_if(|prefix| span.covers(*prefix)).is_some() {}
        flat.push((kind, span));
    }
    flat.extend(prefixes.map(|prefix| (TokenKind::LinePrefix, prefix)));
}

/// Assigns positions and parents, checking that every start token is closed
/// by its own end token and that spans never move backwards.
fn link(map: &SourceMap, flat: Vec<(TokenKind, Span)>) -> Result<Vec<Token>, StructuralError> {
    let mut cursor = PositionCursor::new(map);
    let mut tokens: Vec<Token> = Vec::with_capacity(flat.len());
    let mut open: Vec<usize> = Vec::new();
    let mut previous = 0;

    for (index, (kind, span)) in flat.into_iter().enumerate() {
        let tag = kind.tag();
        if span.start < previous {
            return Err(StructuralError::NonMonotonic {
                index,
                tag,
                start: span.start,
                previous,
            });
        }
        previous = span.start;
        let position = cursor.position(span.start);

        if tag.is_end() {
            let Some(opener) = open.pop() else {
                return Err(StructuralError::UnmatchedEnd {
                    index,
                    tag,
                    position,
                });
            };
            let opened = tokens[opener].tag();
            if opened.closer() != Some(tag) {
                return Err(StructuralError::MismatchedEnd {
                    index,
                    tag,
                    position,
                    expected: opened.closer().unwrap_or(opened),
                    opener,
                });
            }
        }

        let parent = open.last().copied().map(TokenId);
        if tag.closer().is_some() {
            open.push(index);
        }
        tokens.push(Token {
            kind,
            span,
            line: position.line,
            column: position.column,
            parent,
        });
    }

    if let Some(&index) = open.last() {
        let token = &tokens[index];
        return Err(StructuralError::Unclosed {
            index,
            tag: token.tag(),
            position: map.position(token.span.start),
        });
    }
    Ok(tokens)
}
