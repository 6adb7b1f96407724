mod assemble;
mod autolink;
mod block;
mod emit;
mod emphasis;
mod entities;
mod error;
mod html;
mod inline;
mod label;
mod leaf;
mod link;
mod options;
mod source_map;
mod span;
mod stream;
mod token;
mod tokenize;
mod validate;
mod whitespace;

pub use emit::{emit_html, emit_html_with_options};
pub use error::{RoundTripError, StructuralError, TokenizeError};
pub use link::LinkDefinitions;
pub use options::{HtmlOptions, ParseOptions};
pub use source_map::{Position, Range, SourceLine, SourceMap};
pub use span::{Span, SpanError};
pub use stream::TokenStream;
pub use token::{
    AutolinkInfo, AutolinkKind, FenceInfo, LinkDefinition, LinkInfo, ListInfo, ListItemInfo,
    ReferenceKind, Tag, Token, TokenId, TokenKind,
};
pub use tokenize::{tokenize, tokenize_path, tokenize_with_options};
pub use validate::verify_round_trip;
pub use whitespace::{ExpandedLine, Replacement, TAB_STOP, normalize_line};
