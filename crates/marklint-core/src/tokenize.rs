use std::path::Path;

use tracing::{debug, info_span};

use crate::assemble::{Assembled, assemble};
use crate::block::parse_blocks;
use crate::error::TokenizeError;
use crate::options::ParseOptions;
use crate::source_map::SourceMap;
use crate::stream::TokenStream;

/// Tokenizes GFM source with the default options.
pub fn tokenize(source: &str) -> Result<TokenStream, TokenizeError> {
    tokenize_with_options(source, &ParseOptions::default())
}

pub fn tokenize_with_options(
    source: &str,
    options: &ParseOptions,
) -> Result<TokenStream, TokenizeError> {
    let span = info_span!("tokenize", bytes = source.len());
    let _guard = span.enter();

    let map = SourceMap::new(source);
    let blocks = parse_blocks(&map, options);
    debug!(
        items = blocks.items.len(),
        definitions = blocks.definitions.len(),
        "block phase finished"
    );
    let Assembled {
        tokens,
        definitions,
    } = assemble(&map, blocks, options)?;
    Ok(TokenStream::new(map, tokens, definitions))
}

/// Reads and tokenizes a file.
pub fn tokenize_path(
    path: impl AsRef<Path>,
    options: &ParseOptions,
) -> Result<TokenStream, TokenizeError> {
    let path = path.as_ref();
    let source = std::fs::read_to_string(path).map_err(|source| TokenizeError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    tokenize_with_options(&source, options)
}
