use std::path::PathBuf;

use crate::source_map::Position;
use crate::token::Tag;

#[derive(Debug, thiserror::Error)]
pub enum TokenizeError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error(transparent)]
    Structure(#[from] StructuralError),
}

/// The token stream broke nesting or ordering. This is a tokenizer defect,
/// never a property of the input.
#[derive(Clone, Debug, Eq, PartialEq, thiserror::Error)]
pub enum StructuralError {
    #[error("token {index} ({tag}) at {position} closes nothing")]
    UnmatchedEnd {
        index: usize,
        tag: Tag,
        position: Position,
    },
    #[error("token {index} ({tag}) at {position} closes {expected} opened by token {opener}")]
    MismatchedEnd {
        index: usize,
        tag: Tag,
        position: Position,
        expected: Tag,
        opener: usize,
    },
    #[error("token {index} ({tag}) at {position} is never closed")]
    Unclosed {
        index: usize,
        tag: Tag,
        position: Position,
    },
    #[error("token {index} ({tag}) starts at byte {start}, before its predecessor at {previous}")]
    NonMonotonic {
        index: usize,
        tag: Tag,
        start: usize,
        previous: usize,
    },
}

/// Reconstructing the source from token spans failed.
#[derive(Clone, Debug, Eq, PartialEq, thiserror::Error)]
pub enum RoundTripError {
    #[error("bytes {start}..{end} are owned by no token (next is token {index})")]
    Gap {
        index: usize,
        start: usize,
        end: usize,
    },
    #[error("token {index} starts at byte {start}, inside bytes already owned up to {owned}")]
    Overlap {
        index: usize,
        start: usize,
        owned: usize,
    },
    #[error("tokens end at byte {end} but the source has {len} bytes")]
    Truncated { end: usize, len: usize },
    #[error("reconstruction diverges from the source at byte {offset}")]
    Diverged { offset: usize },
}
