use crate::link::LinkDefinitions;
use crate::source_map::{SourceLine, SourceMap};
use crate::token::{Token, TokenId};

/// The tokens of one document together with the source they index into.
///
/// Tokens are in source order and their spans tile the source exactly, so
/// concatenating [`TokenStream::raw`] over every token reproduces the input.
#[derive(Clone, Debug)]
pub struct TokenStream {
    source_map: SourceMap,
    tokens: Vec<Token>,
    definitions: LinkDefinitions,
}

impl TokenStream {
    pub(crate) fn new(source_map: SourceMap, tokens: Vec<Token>, definitions: LinkDefinitions) -> Self {
        Self {
            source_map,
            tokens,
            definitions,
        }
    }

    pub fn source(&self) -> &str {
        self.source_map.source()
    }

    pub fn source_map(&self) -> &SourceMap {
        &self.source_map
    }

    pub fn tokens(&self) -> &[Token] {
        &self.tokens
    }

    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (TokenId, &Token)> {
        self.tokens
            .iter()
            .enumerate()
            .map(|(idx, token)| (TokenId(idx), token))
    }

    pub fn get(&self, id: TokenId) -> Option<&Token> {
        self.tokens.get(id.0)
    }

    /// The exact source bytes owned by a token.
    pub fn raw(&self, id: TokenId) -> Option<&str> {
        self.get(id).map(|token| token.span.slice(self.source()))
    }

    pub fn parent(&self, id: TokenId) -> Option<&Token> {
        self.get(id)?.parent.and_then(|parent| self.get(parent))
    }

    /// The end token matching an open token.
    pub fn closer(&self, id: TokenId) -> Option<TokenId> {
        let token = self.get(id)?;
        token.tag().closer()?;
        self.tokens[id.0 + 1..]
            .iter()
            .position(|other| other.parent == token.parent && other.tag().is_end())
            .map(|offset| TokenId(id.0 + 1 + offset))
    }

    /// Direct children of an open token, excluding its end token.
    pub fn children(&self, id: TokenId) -> impl Iterator<Item = (TokenId, &Token)> {
        let end = self.closer(id).map_or(id.0 + 1, |closer| closer.0);
        let start = (id.0 + 1).min(end);
        self.tokens[start..end]
            .iter()
            .enumerate()
            .filter(move |(_, token)| token.parent == Some(id) && !token.tag().is_end())
            .map(move |(offset, token)| (TokenId(start + offset), token))
    }

    /// Tokens whose span starts on the given 1-based line.
    pub fn tokens_on_line(&self, line: usize) -> &[Token] {
        let start = self.tokens.partition_point(|token| token.line < line);
        let end = self.tokens.partition_point(|token| token.line <= line);
        &self.tokens[start..end]
    }

    /// Each source line with the tokens that start on it.
    pub fn lines(&self) -> impl Iterator<Item = (&SourceLine, &[Token])> {
        self.source_map
            .lines()
            .iter()
            .map(|line| (line, self.tokens_on_line(line.number)))
    }

    /// Concatenation of every token's raw bytes.
    pub fn reconstruct(&self) -> String {
        let mut out = String::with_capacity(self.source().len());
        for token in &self.tokens {
            out.push_str(token.span.slice(self.source()));
        }
        out
    }

    /// Link reference definitions in effect for the document.
    pub fn definitions(&self) -> &LinkDefinitions {
        &self.definitions
    }
}

impl<'a> IntoIterator for &'a TokenStream {
    type Item = &'a Token;
    type IntoIter = std::slice::Iter<'a, Token>;

    fn into_iter(self) -> Self::IntoIter {
        self.tokens.iter()
    }
}
