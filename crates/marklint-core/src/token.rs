use std::fmt;

use serde::Serialize;

use crate::span::Span;

/// Index of a token inside its stream.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize)]
#[serde(transparent)]
pub struct TokenId(pub usize);

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Token {
    pub kind: TokenKind,
    /// Original bytes owned by this token.
    pub span: Span,
    /// 1-based line of `span.start`.
    pub line: usize,
    /// 1-based column of `span.start`, tabs expanded to 4-column stops.
    pub column: usize,
    /// Innermost enclosing open token.
    pub parent: Option<TokenId>,
}

impl Token {
    pub fn tag(&self) -> Tag {
        self.kind.tag()
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum TokenKind {
    BlockQuoteStart,
    BlockQuoteEnd,
    ListStart(ListInfo),
    ListEnd,
    ListItemStart(ListItemInfo),
    ListItemEnd,
    ParagraphStart,
    ParagraphEnd,
    AtxHeadingStart { level: u8 },
    AtxHeadingEnd,
    SetextHeadingStart { level: u8 },
    SetextHeadingEnd { underline: char },
    FencedCodeStart(FenceInfo),
    FencedCodeEnd,
    IndentedCodeStart,
    IndentedCodeEnd,
    HtmlBlockStart { condition: u8 },
    HtmlBlockEnd,
    ThematicBreak { marker: char },
    BlankLine,
    LinkReferenceDefinition(LinkDefinition),
    FrontMatter { body: String },
    /// Container markers and indentation at the start of a continuation line.
    LinePrefix,
    Text { text: String },
    Entity { text: String },
    CodeSpan { code: String, backticks: usize },
    RawHtml { html: String },
    Autolink(AutolinkInfo),
    HardBreak,
    SoftBreak,
    EmphasisStart { marker: char, strong: bool },
    EmphasisEnd { marker: char, strong: bool },
    StrikethroughStart,
    StrikethroughEnd,
    LinkStart(LinkInfo),
    LinkEnd,
    ImageStart(LinkInfo),
    ImageEnd,
    TaskListMarker { checked: bool },
}

#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
pub struct ListInfo {
    pub ordered: bool,
    /// Bullet character, or `.` / `)` for ordered lists.
    pub marker: char,
    pub start: Option<u64>,
    pub tight: bool,
}

#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
pub struct ListItemInfo {
    pub marker: char,
    pub number: Option<u64>,
    /// Column where the item's content begins; continuation lines must reach it.
    pub content_column: usize,
}

#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
pub struct FenceInfo {
    pub marker: char,
    pub length: usize,
    pub indent: usize,
    /// Info string with escapes and entities resolved.
    pub info: String,
}

#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
pub struct LinkDefinition {
    pub label: String,
    pub normalized: String,
    pub destination: String,
    pub title: Option<String>,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum AutolinkKind {
    /// `<scheme:...>`
    Uri,
    /// `<user@host>`
    Email,
    /// Bare `www.`, `http://` or email text.
    Literal,
}

#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
pub struct AutolinkInfo {
    pub kind: AutolinkKind,
    pub destination: String,
    pub text: String,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum ReferenceKind {
    Inline,
    Full,
    Collapsed,
    Shortcut,
}

#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
pub struct LinkInfo {
    pub reference: ReferenceKind,
    pub destination: String,
    pub title: Option<String>,
    /// Normalized label for reference forms.
    pub label: Option<String>,
}

/// Payload-free discriminant of a [`TokenKind`].
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Serialize)]
pub enum Tag {
    BlockQuoteStart,
    BlockQuoteEnd,
    ListStart,
    ListEnd,
    ListItemStart,
    ListItemEnd,
    ParagraphStart,
    ParagraphEnd,
    AtxHeadingStart,
    AtxHeadingEnd,
    SetextHeadingStart,
    SetextHeadingEnd,
    FencedCodeStart,
    FencedCodeEnd,
    IndentedCodeStart,
    IndentedCodeEnd,
    HtmlBlockStart,
    HtmlBlockEnd,
    ThematicBreak,
    BlankLine,
    LinkReferenceDefinition,
    FrontMatter,
    LinePrefix,
    Text,
    Entity,
    CodeSpan,
    RawHtml,
    Autolink,
    HardBreak,
    SoftBreak,
    EmphasisStart,
    EmphasisEnd,
    StrikethroughStart,
    StrikethroughEnd,
    LinkStart,
    LinkEnd,
    ImageStart,
    ImageEnd,
    TaskListMarker,
}

impl TokenKind {
    pub fn tag(&self) -> Tag {
        match self {
            TokenKind::BlockQuoteStart => Tag::BlockQuoteStart,
            TokenKind::BlockQuoteEnd => Tag::BlockQuoteEnd,
            TokenKind::ListStart(_) => Tag::ListStart,
            TokenKind::ListEnd => Tag::ListEnd,
            TokenKind::ListItemStart(_) => Tag::ListItemStart,
            TokenKind::ListItemEnd => Tag::ListItemEnd,
            TokenKind::ParagraphStart => Tag::ParagraphStart,
            TokenKind::ParagraphEnd => Tag::ParagraphEnd,
            TokenKind::AtxHeadingStart { .. } => Tag::AtxHeadingStart,
            TokenKind::AtxHeadingEnd => Tag::AtxHeadingEnd,
            TokenKind::SetextHeadingStart { .. } => Tag::SetextHeadingStart,
            TokenKind::SetextHeadingEnd { .. } => Tag::SetextHeadingEnd,
            TokenKind::FencedCodeStart(_) => Tag::FencedCodeStart,
            TokenKind::FencedCodeEnd => Tag::FencedCodeEnd,
            TokenKind::IndentedCodeStart => Tag::IndentedCodeStart,
            TokenKind::IndentedCodeEnd => Tag::IndentedCodeEnd,
            TokenKind::HtmlBlockStart { .. } => Tag::HtmlBlockStart,
            TokenKind::HtmlBlockEnd => Tag::HtmlBlockEnd,
            TokenKind::ThematicBreak { .. } => Tag::ThematicBreak,
            TokenKind::BlankLine => Tag::BlankLine,
            TokenKind::LinkReferenceDefinition(_) => Tag::LinkReferenceDefinition,
            TokenKind::FrontMatter { .. } => Tag::FrontMatter,
            TokenKind::LinePrefix => Tag::LinePrefix,
            TokenKind::Text { .. } => Tag::Text,
            TokenKind::Entity { .. } => Tag::Entity,
            TokenKind::CodeSpan { .. } => Tag::CodeSpan,
            TokenKind::RawHtml { .. } => Tag::RawHtml,
            TokenKind::Autolink(_) => Tag::Autolink,
            TokenKind::HardBreak => Tag::HardBreak,
            TokenKind::SoftBreak => Tag::SoftBreak,
            TokenKind::EmphasisStart { .. } => Tag::EmphasisStart,
            TokenKind::EmphasisEnd { .. } => Tag::EmphasisEnd,
            TokenKind::StrikethroughStart => Tag::StrikethroughStart,
            TokenKind::StrikethroughEnd => Tag::StrikethroughEnd,
            TokenKind::LinkStart(_) => Tag::LinkStart,
            TokenKind::LinkEnd => Tag::LinkEnd,
            TokenKind::ImageStart(_) => Tag::ImageStart,
            TokenKind::ImageEnd => Tag::ImageEnd,
            TokenKind::TaskListMarker { .. } => Tag::TaskListMarker,
        }
    }
}

impl Tag {
    /// For an open tag, the tag that must close it.
    pub fn closer(self) -> Option<Tag> {
        Some(match self {
            Tag::BlockQuoteStart => Tag::BlockQuoteEnd,
            Tag::ListStart => Tag::ListEnd,
            Tag::ListItemStart => Tag::ListItemEnd,
            Tag::ParagraphStart => Tag::ParagraphEnd,
            Tag::AtxHeadingStart => Tag::AtxHeadingEnd,
            Tag::SetextHeadingStart => Tag::SetextHeadingEnd,
            Tag::FencedCodeStart => Tag::FencedCodeEnd,
            Tag::IndentedCodeStart => Tag::IndentedCodeEnd,
            Tag::HtmlBlockStart => Tag::HtmlBlockEnd,
            Tag::EmphasisStart => Tag::EmphasisEnd,
            Tag::StrikethroughStart => Tag::StrikethroughEnd,
            Tag::LinkStart => Tag::LinkEnd,
            Tag::ImageStart => Tag::ImageEnd,
            _ => return None,
        })
    }

    pub fn is_end(self) -> bool {
        matches!(
            self,
            Tag::BlockQuoteEnd
                | Tag::ListEnd
                | Tag::ListItemEnd
                | Tag::ParagraphEnd
                | Tag::AtxHeadingEnd
                | Tag::SetextHeadingEnd
                | Tag::FencedCodeEnd
                | Tag::IndentedCodeEnd
                | Tag::HtmlBlockEnd
                | Tag::EmphasisEnd
                | Tag::StrikethroughEnd
                | Tag::LinkEnd
                | Tag::ImageEnd
        )
    }

    pub fn name(self) -> &'static str {
        match self {
            Tag::BlockQuoteStart => "bquote",
            Tag::BlockQuoteEnd => "end-bquote",
            Tag::ListStart => "list",
            Tag::ListEnd => "end-list",
            Tag::ListItemStart => "li",
            Tag::ListItemEnd => "end-li",
            Tag::ParagraphStart => "para",
            Tag::ParagraphEnd => "end-para",
            Tag::AtxHeadingStart => "atx",
            Tag::AtxHeadingEnd => "end-atx",
            Tag::SetextHeadingStart => "setext",
            Tag::SetextHeadingEnd => "end-setext",
            Tag::FencedCodeStart => "fcode-block",
            Tag::FencedCodeEnd => "end-fcode-block",
            Tag::IndentedCodeStart => "icode-block",
            Tag::IndentedCodeEnd => "end-icode-block",
            Tag::HtmlBlockStart => "html-block",
            Tag::HtmlBlockEnd => "end-html-block",
            Tag::ThematicBreak => "tbreak",
            Tag::BlankLine => "BLANK",
            Tag::LinkReferenceDefinition => "link-ref-def",
            Tag::FrontMatter => "front-matter",
            Tag::LinePrefix => "prefix",
            Tag::Text => "text",
            Tag::Entity => "entity",
            Tag::CodeSpan => "icode-span",
            Tag::RawHtml => "raw-html",
            Tag::Autolink => "autolink",
            Tag::HardBreak => "hard-break",
            Tag::SoftBreak => "soft-break",
            Tag::EmphasisStart => "emphasis",
            Tag::EmphasisEnd => "end-emphasis",
            Tag::StrikethroughStart => "strikethrough",
            Tag::StrikethroughEnd => "end-strikethrough",
            Tag::LinkStart => "link",
            Tag::LinkEnd => "end-link",
            Tag::ImageStart => "image",
            Tag::ImageEnd => "end-image",
            Tag::TaskListMarker => "task",
        }
    }
}

impl fmt::Display for Tag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Compact one-line form: `[tag(line,column):detail]`.
impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}({},{})", self.tag(), self.line, self.column)?;
        match &self.kind {
            TokenKind::ListStart(list) => {
                write!(f, ":{}", list.marker)?;
                if let Some(start) = list.start {
                    write!(f, ":{start}")?;
                }
                if !list.tight {
                    f.write_str(":loose")?;
                }
            }
            TokenKind::ListItemStart(item) => write!(f, ":{}", item.content_column)?,
            TokenKind::AtxHeadingStart { level } | TokenKind::SetextHeadingStart { level } => {
                write!(f, ":{level}")?
            }
            TokenKind::SetextHeadingEnd { underline } => write!(f, ":{underline}")?,
            TokenKind::FencedCodeStart(fence) => {
                write!(f, ":{}:{}:{}", fence.marker, fence.length, fence.info)?
            }
            TokenKind::HtmlBlockStart { condition } => write!(f, ":{condition}")?,
            TokenKind::ThematicBreak { marker } => write!(f, ":{marker}")?,
            TokenKind::LinkReferenceDefinition(def) => {
                write!(f, ":{}:{}", def.normalized, def.destination)?
            }
            TokenKind::Text { text } | TokenKind::Entity { text } => {
                write!(f, ":{}", text.escape_debug())?
            }
            TokenKind::CodeSpan { code, .. } => write!(f, ":{}", code.escape_debug())?,
            TokenKind::RawHtml { html } => write!(f, ":{}", html.escape_debug())?,
            TokenKind::Autolink(link) => write!(f, ":{}", link.destination)?,
            TokenKind::EmphasisStart { marker, strong } | TokenKind::EmphasisEnd { marker, strong } => {
                write!(f, ":{}", if *strong { 2 } else { 1 })?;
                write!(f, ":{marker}")?
            }
            TokenKind::LinkStart(link) | TokenKind::ImageStart(link) => {
                write!(f, ":{:?}:{}", link.reference, link.destination)?
            }
            TokenKind::TaskListMarker { checked } => {
                f.write_str(if *checked { ":x" } else { ": " })?
            }
            _ => {}
        }
        f.write_str("]")
    }
}

#[cfg(test)]
mod tests {
    use super::{Tag, Token, TokenKind};
    use crate::span::Span;

    #[test]
    fn every_open_tag_has_an_end_tag() {
        for tag in [
            Tag::BlockQuoteStart,
            Tag::ListStart,
            Tag::ParagraphStart,
            Tag::EmphasisStart,
            Tag::LinkStart,
        ] {
            let closer = tag.closer().expect("closer");
            assert!(closer.is_end(), "{tag} closes with {closer}");
        }
        assert_eq!(Tag::Text.closer(), None);
    }

    #[test]
    fn display_is_compact() {
        let token = Token {
            kind: TokenKind::Text {
                text: "a\tb".to_string(),
            },
            span: Span { start: 0, end: 3 },
            line: 1,
            column: 1,
            parent: None,
        };
        assert_eq!(token.to_string(), "[text(1,1):a\\tb]");
    }
}
