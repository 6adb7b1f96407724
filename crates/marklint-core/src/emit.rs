//! HTML rendering of a token stream, following the reference CommonMark
//! renderer's output conventions with the GFM extensions layered on top.

use std::borrow::Cow;

use tracing::debug;

use crate::html::FILTERED_TAGS;
use crate::options::HtmlOptions;
use crate::stream::TokenStream;
use crate::token::{LinkInfo, TokenKind};

/// Renders a token stream to HTML with default options.
pub fn emit_html(stream: &TokenStream) -> String {
    emit_html_with_options(stream, &HtmlOptions::default())
}

pub fn emit_html_with_options(stream: &TokenStream, options: &HtmlOptions) -> String {
    let mut writer = HtmlWriter::new(options);
    for token in stream.tokens() {
        writer.token(&token.kind);
    }
    debug!(bytes = writer.out.len(), "rendered html");
    writer.finish()
}

#[derive(Clone, Copy, Debug)]
enum Container {
    Quote,
    List { ordered: bool, tight: bool },
    Item,
}

#[derive(Debug)]
enum Literal {
    Fenced { language: Option<String> },
    Indented,
    Html,
}

struct HtmlWriter<'a> {
    options: &'a HtmlOptions,
    out: String,
    containers: Vec<Container>,
    /// Open code or HTML block and the text gathered so far.
    literal: Option<(Literal, String)>,
    /// Titles of open images; tags are suppressed inside alt text.
    images: Vec<Option<String>>,
    /// Heading levels awaiting their closing tag.
    headings: Vec<u8>,
}

impl<'a> HtmlWriter<'a> {
    fn new(options: &'a HtmlOptions) -> Self {
        Self {
            options,
            out: String::new(),
            containers: Vec::new(),
            literal: None,
            images: Vec::new(),
            headings: Vec::new(),
        }
    }

    fn finish(self) -> String {
        self.out
    }

    /// Starts a new line unless one was just started.
    fn cr(&mut self) {
        if !self.out.is_empty() && !self.out.ends_with('\n') {
            self.out.push('\n');
        }
    }

    fn tag(&mut self, tag: &str) {
        if self.images.is_empty() {
            self.out.push('<');
            self.out.push_str(tag);
            self.out.push('>');
        }
    }

    fn text(&mut self, text: &str) {
        self.out.push_str(&escape_html(text));
    }

    fn raw_html(&mut self, html: &str) {
        if self.options.tag_filter {
            self.out.push_str(&filter_tags(html));
        } else {
            self.out.push_str(html);
        }
    }

    /// Paragraphs directly inside an item of a tight list render bare.
    fn tight_paragraph(&self) -> bool {
        matches!(
            self.containers.as_slice(),
            [.., Container::List { tight: true, .. }, Container::Item]
        )
    }

    fn open_heading(&mut self, level: u8) {
        self.cr();
        self.tag(&format!("h{level}"));
        self.headings.push(level);
    }

    fn close_heading(&mut self) {
        let level = self.headings.pop().unwrap_or(1);
        self.tag(&format!("/h{level}"));
        self.cr();
    }

    fn open_link(&mut self, link: &LinkInfo) {
        if !self.images.is_empty() {
            return;
        }
        self.out.push_str("<a href=\"");
        self.out.push_str(&escape_html(&normalize_uri(&link.destination)));
        self.out.push('"');
        if let Some(title) = &link.title {
            self.out.push_str(" title=\"");
            self.out.push_str(&escape_html(title));
            self.out.push('"');
        }
        self.out.push('>');
    }

    fn open_image(&mut self, link: &LinkInfo) {
        if self.images.is_empty() {
            self.out.push_str("<img src=\"");
            self.out.push_str(&escape_html(&normalize_uri(&link.destination)));
            self.out.push_str("\" alt=\"");
        }
        self.images.push(link.title.clone());
    }

    fn close_image(&mut self) {
        let title = self.images.pop().flatten();
        if self.images.is_empty() {
            if let Some(title) = title {
                self.out.push_str("\" title=\"");
                self.out.push_str(&escape_html(&title));
            }
            self.out.push_str("\" />");
        }
    }

    fn close_literal(&mut self) {
        let Some((literal, body)) = self.literal.take() else {
            return;
        };
        match literal {
            Literal::Fenced { language } => {
                self.cr();
                match language {
                    Some(language) => {
                        self.out.push_str("<pre><code class=\"language-");
                        self.out.push_str(&escape_html(&language));
                        self.out.push_str("\">");
                    }
                    None => self.out.push_str("<pre><code>"),
                }
                self.text(&body);
                self.out.push_str("</code></pre>");
                self.cr();
            }
            Literal::Indented => {
                self.cr();
                self.out.push_str("<pre><code>");
                let body = trim_blank_tail(&body);
                self.text(body);
                if !body.is_empty() {
                    self.out.push('\n');
                }
                self.out.push_str("</code></pre>");
                self.cr();
            }
            Literal::Html => {
                self.cr();
                self.raw_html(trim_blank_tail(&body));
                self.cr();
            }
        }
    }

    fn token(&mut self, kind: &TokenKind) {
        if let Some((_, body)) = self.literal.as_mut() {
            match kind {
                TokenKind::Text { text } => {
                    body.push_str(text);
                    return;
                }
                TokenKind::LinePrefix => return,
                _ => {}
            }
        }

        match kind {
            TokenKind::BlockQuoteStart => {
                self.cr();
                self.tag("blockquote");
                self.cr();
                self.containers.push(Container::Quote);
            }
            TokenKind::BlockQuoteEnd => {
                self.containers.pop();
                self.cr();
                self.tag("/blockquote");
                self.cr();
            }
            TokenKind::ListStart(list) => {
                self.cr();
                match list.start {
                    Some(start) if list.ordered && start != 1 => {
                        self.tag(&format!("ol start=\"{start}\""))
                    }
                    _ if list.ordered => self.tag("ol"),
                    _ => self.tag("ul"),
                }
                self.cr();
                self.containers.push(Container::List {
                    ordered: list.ordered,
                    tight: list.tight,
                });
            }
            TokenKind::ListEnd => {
                let ordered = matches!(
                    self.containers.pop(),
                    Some(Container::List { ordered: true, .. })
                );
                self.cr();
                self.tag(if ordered { "/ol" } else { "/ul" });
                self.cr();
            }
            TokenKind::ListItemStart(_) => {
                self.tag("li");
                self.containers.push(Container::Item);
            }
            TokenKind::ListItemEnd => {
                self.containers.pop();
                self.tag("/li");
                self.cr();
            }
            TokenKind::ParagraphStart => {
                if !self.tight_paragraph() {
                    self.cr();
                    self.tag("p");
                }
            }
            TokenKind::ParagraphEnd => {
                if !self.tight_paragraph() {
                    self.tag("/p");
                    self.cr();
                }
            }
            TokenKind::AtxHeadingStart { level } | TokenKind::SetextHeadingStart { level } => {
                self.open_heading(*level)
            }
            TokenKind::AtxHeadingEnd | TokenKind::SetextHeadingEnd { .. } => self.close_heading(),
            TokenKind::FencedCodeStart(fence) => {
                let language = fence.info.split_whitespace().next().map(str::to_string);
                self.literal = Some((Literal::Fenced { language }, String::new()));
            }
            TokenKind::IndentedCodeStart => {
                self.literal = Some((Literal::Indented, String::new()));
            }
            TokenKind::HtmlBlockStart { .. } => {
                self.literal = Some((Literal::Html, String::new()));
            }
            TokenKind::FencedCodeEnd | TokenKind::IndentedCodeEnd | TokenKind::HtmlBlockEnd => {
                self.close_literal()
            }
            TokenKind::ThematicBreak { .. } => {
                self.cr();
                self.tag("hr /");
                self.cr();
            }
            TokenKind::BlankLine
            | TokenKind::LinkReferenceDefinition(_)
            | TokenKind::FrontMatter { .. }
            | TokenKind::LinePrefix => {}
            TokenKind::Text { text } | TokenKind::Entity { text } => self.text(text),
            TokenKind::CodeSpan { code, .. } => {
                self.tag("code");
                self.text(code);
                self.tag("/code");
            }
            TokenKind::RawHtml { html } => self.raw_html(html),
            TokenKind::Autolink(link) => {
                if self.images.is_empty() {
                    self.out.push_str("<a href=\"");
                    self.out.push_str(&escape_html(&normalize_uri(&link.destination)));
                    self.out.push_str("\">");
                }
                self.text(&link.text);
                self.tag("/a");
            }
            TokenKind::HardBreak => {
                self.tag("br /");
                self.cr();
            }
            TokenKind::SoftBreak => self.out.push('\n'),
            TokenKind::EmphasisStart { strong, .. } => {
                self.tag(if *strong { "strong" } else { "em" })
            }
            TokenKind::EmphasisEnd { strong, .. } => {
                self.tag(if *strong { "/strong" } else { "/em" })
            }
            TokenKind::StrikethroughStart => self.tag("del"),
            TokenKind::StrikethroughEnd => self.tag("/del"),
            TokenKind::LinkStart(link) => self.open_link(link),
            TokenKind::LinkEnd => self.tag("/a"),
            TokenKind::ImageStart(link) => self.open_image(link),
            TokenKind::ImageEnd => self.close_image(),
            TokenKind::TaskListMarker { checked } => {
                if *checked {
                    self.out.push_str("<input checked=\"\" disabled=\"\" type=\"checkbox\"> ");
                } else {
                    self.out.push_str("<input disabled=\"\" type=\"checkbox\"> ");
                }
            }
        }
    }
}

/// Escapes `&`, `<`, `>` and `"`.
fn escape_html(text: &str) -> Cow<'_, str> {
    html_escape::encode_double_quoted_attribute(text)
}

/// Drops a run of trailing lines that hold nothing but spaces, together with
/// the line ending before them.
fn trim_blank_tail(text: &str) -> &str {
    let mut end = text.len();
    loop {
        let trimmed = text[..end].trim_end_matches(' ');
        match trimmed.strip_suffix('\n') {
            Some(rest) => end = rest.len(),
            None => return &text[..end],
        }
    }
}

/// Percent-encodes a destination for an `href` or `src` attribute. Existing
/// `%XX` escapes and URI-reserved characters pass through.
pub(crate) fn normalize_uri(uri: &str) -> Cow<'_, str> {
    const KEEP: &[u8] = b";/?:@&=+$,-_.!~*'()#";
    let bytes = uri.as_bytes();
    let is_escape = |i: usize| {
        bytes[i] == b'%'
            && bytes.get(i + 1).is_some_and(u8::is_ascii_hexdigit)
            && bytes.get(i + 2).is_some_and(u8::is_ascii_hexdigit)
    };
    let unchanged = |i: usize| bytes[i].is_ascii_alphanumeric() || KEEP.contains(&bytes[i]) || is_escape(i);
    if (0..bytes.len()).all(unchanged) {
        return Cow::Borrowed(uri);
    }
    let mut out = String::with_capacity(uri.len() + 8);
    for (i, &byte) in bytes.iter().enumerate() {
        if unchanged(i) {
            out.push(byte as char);
        } else {
            out.push_str(&format!("%{byte:02X}"));
        }
    }
    Cow::Owned(out)
}

/// Neutralizes the tags GFM's tag filter disallows by escaping their `<`.
fn filter_tags(html: &str) -> Cow<'_, str> {
    let bytes = html.as_bytes();
    let filtered = |at: usize| {
        let mut name_start = at + 1;
        if bytes.get(name_start) == Some(&b'/') {
            name_start += 1;
        }
        FILTERED_TAGS.iter().any(|tag| {
            let name_end = name_start + tag.len();
            html.get(name_start..name_end)
                .is_some_and(|name| name.eq_ignore_ascii_case(tag))
                && matches!(
                    bytes.get(name_end),
                    None | Some(b' ' | b'\t' | b'\n' | b'\r' | b'\x0c' | b'>' | b'/')
                )
        })
    };
    let hits: Vec<usize> = (0..bytes.len())
        .filter(|&i| bytes[i] == b'<' && filtered(i))
        .collect();
    if hits.is_empty() {
        return Cow::Borrowed(html);
    }
    let mut out = String::with_capacity(html.len() + hits.len() * 3);
    let mut last = 0;
    for hit in hits {
        out.push_str(&html[last..hit]);
        out.push_str("&lt;");
        last = hit + 1;
    }
    out.push_str(&html[last..]);
    Cow::Owned(out)
}

#[cfg(test)]
mod tests {
    use super::{filter_tags, normalize_uri, trim_blank_tail};

    #[test]
    fn uris_keep_reserved_characters_and_escapes() {
        assert_eq!(normalize_uri("/url?a=b&c#d"), "/url?a=b&c#d");
        assert_eq!(normalize_uri("foo%20b\\ar"), "foo%20b%5Car");
        assert_eq!(normalize_uri("f\u{f6}\u{f6} bar"), "f%C3%B6%C3%B6%20bar");
        assert_eq!(normalize_uri("%zz"), "%25zz");
    }

    #[test]
    fn tag_filter_escapes_only_listed_tags() {
        assert_eq!(
            filter_tags("<strong> <title> <style></script>"),
            "<strong> &lt;title> &lt;style>&lt;/script>"
        );
        assert_eq!(filter_tags("<titles>"), "<titles>");
    }

    #[test]
    fn blank_tails_are_trimmed() {
        assert_eq!(trim_blank_tail("a\n\n  \n"), "a");
        assert_eq!(trim_blank_tail("a  "), "a  ");
        assert_eq!(trim_blank_tail(""), "");
    }
}
