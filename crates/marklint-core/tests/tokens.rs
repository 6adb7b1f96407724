use marklint_core::{
    ParseOptions, Tag, Token, TokenId, TokenKind, TokenizeError, tokenize, tokenize_path,
    tokenize_with_options, verify_round_trip,
};
use pretty_assertions::assert_eq;

fn tags(tokens: &[Token]) -> Vec<&'static str> {
    tokens.iter().map(|token| token.tag().name()).collect()
}

#[test]
fn tabs_report_visual_columns_and_keep_their_bytes() {
    let stream = tokenize("\tx\n").expect("tokenize");
    let text = stream
        .tokens()
        .iter()
        .find(|token| token.tag() == Tag::Text)
        .expect("code text");

    assert_eq!(text.span.start, 1);
    assert_eq!((text.line, text.column), (1, 5));
    assert_eq!(stream.tokens()[0].tag(), Tag::IndentedCodeStart);
    assert_eq!(stream.raw(TokenId(0)), Some("\t"));
    assert_eq!(stream.reconstruct(), "\tx\n");
}

#[test]
fn lazy_line_continues_the_quoted_paragraph() {
    let stream = tokenize("> a\nb\n").expect("tokenize");
    assert_eq!(
        tags(stream.tokens()),
        vec!["bquote", "para", "text", "soft-break", "text", "end-para", "end-bquote"]
    );
    assert_eq!(verify_round_trip(&stream), Ok(()));
}

#[test]
fn first_definition_wins_case_insensitively() {
    let stream = tokenize("[foo]: /url\n[FOO]: /dup\n\n[Foo]\n").expect("tokenize");
    let definitions: Vec<_> = stream
        .tokens()
        .iter()
        .filter(|token| token.tag() == Tag::LinkReferenceDefinition)
        .collect();
    assert_eq!(definitions.len(), 2);
    assert_eq!(stream.definitions().len(), 1);

    let link = stream
        .tokens()
        .iter()
        .find_map(|token| match &token.kind {
            TokenKind::LinkStart(link) => Some(link),
            _ => None,
        })
        .expect("link");
    assert_eq!(link.destination, "/url");
}

#[test]
fn list_items_are_children_of_their_list() {
    let stream = tokenize("- a\n- b\n").expect("tokenize");
    let items: Vec<_> = stream.children(TokenId(0)).map(|(_, token)| token.tag()).collect();
    assert_eq!(items, vec![Tag::ListItemStart, Tag::ListItemStart]);
    assert_eq!(stream.closer(TokenId(0)), Some(TokenId(stream.len() - 1)));

    let (text_id, _) = stream
        .iter()
        .find(|(_, token)| token.tag() == Tag::Text)
        .expect("text");
    assert_eq!(stream.parent(text_id).map(Token::tag), Some(Tag::ParagraphStart));
}

#[test]
fn children_skip_the_end_tokens_of_nested_blocks() {
    let stream = tokenize("- a\n  - b\n").expect("tokenize");
    let (item, _) = stream
        .iter()
        .find(|(_, token)| token.tag() == Tag::ListItemStart)
        .expect("item");
    let children: Vec<_> = stream
        .children(item)
        .map(|(_, token)| token.tag())
        .filter(|tag| *tag != Tag::LinePrefix)
        .collect();
    assert_eq!(children, vec![Tag::ParagraphStart, Tag::ListStart]);
}

#[test]
fn code_span_owns_the_quote_marker_it_spans() {
    let stream = tokenize("> `a\n> b`\n").expect("tokenize");
    assert!(stream.tokens().iter().all(|token| token.tag() != Tag::LinePrefix));

    let (id, token) = stream
        .iter()
        .find(|(_, token)| token.tag() == Tag::CodeSpan)
        .expect("code span");
    assert_eq!(
        token.kind,
        TokenKind::CodeSpan {
            code: "a b".to_string(),
            backticks: 1
        }
    );
    assert_eq!(stream.raw(id), Some("`a\n> b`"));
    assert_eq!(verify_round_trip(&stream), Ok(()));
}

#[test]
fn continuation_markers_become_line_prefixes() {
    let stream = tokenize("> a\n> b\n").expect("tokenize");
    let prefix = stream
        .iter()
        .find(|(_, token)| token.tag() == Tag::LinePrefix)
        .map(|(id, _)| id)
        .expect("prefix");
    assert_eq!(stream.raw(prefix), Some("> "));
    assert_eq!(stream.tokens()[prefix.0].line, 2);
}

#[test]
fn breaks_own_their_markers() {
    let stream = tokenize("a  \nb\\\nc\n").expect("tokenize");
    let raws: Vec<_> = stream
        .iter()
        .filter(|(_, token)| token.tag() == Tag::HardBreak)
        .filter_map(|(id, _)| stream.raw(id))
        .collect();
    assert_eq!(raws, vec!["  \n", "\\\n"]);
}

#[test]
fn blank_line_sits_on_its_own_line() {
    let stream = tokenize("a\n\nb\n").expect("tokenize");
    assert_eq!(tags(stream.tokens_on_line(2)), vec!["BLANK"]);
    assert_eq!(tags(stream.tokens_on_line(3)), vec!["para", "text", "end-para"]);
    assert_eq!(stream.lines().count(), 3);
}

#[test]
fn malformed_constructs_degrade_to_text() {
    let stream = tokenize("[foo *bar\n").expect("tokenize");
    let texts: String = stream
        .tokens()
        .iter()
        .filter_map(|token| match &token.kind {
            TokenKind::Text { text } => Some(text.as_str()),
            _ => None,
        })
        .collect();
    assert_eq!(texts, "[foo *bar");
}

#[test]
fn front_matter_is_one_token_when_enabled() {
    let source = "---\ntitle: x\n---\n# h\n";
    let options = ParseOptions {
        front_matter: true,
        ..ParseOptions::default()
    };
    let stream = tokenize_with_options(source, &options).expect("tokenize");
    assert_eq!(
        stream.tokens()[0].kind,
        TokenKind::FrontMatter {
            body: "title: x\n".to_string()
        }
    );
    assert_eq!(stream.tokens()[1].tag(), Tag::AtxHeadingStart);

    let plain = tokenize(source).expect("tokenize");
    assert_eq!(plain.tokens()[0].tag(), Tag::ThematicBreak);
}

#[test]
fn missing_files_are_io_errors() {
    let err = tokenize_path("/definitely/not/here.md", &ParseOptions::default())
        .expect_err("missing file");
    assert!(matches!(err, TokenizeError::Io { .. }));
}

#[test]
fn tokens_serialize_with_a_type_tag() {
    let stream = tokenize("*a*\n").expect("tokenize");
    let json = serde_json::to_value(&stream.tokens()[1]).expect("json");
    assert_eq!(json["kind"]["type"], "emphasis-start");
    assert_eq!(json["kind"]["strong"], false);
    assert_eq!(json["span"]["start"], 0);
}
