use marklint_core::{
    ParseOptions, Tag, TokenId, TokenStream, emit_html, tokenize, tokenize_with_options,
    verify_round_trip,
};
use proptest::prelude::*;
use rstest::rstest;

/// Start tokens are closed in stack order and starts never move backwards.
fn check_nesting(stream: &TokenStream) -> Result<(), String> {
    let mut open: Vec<(TokenId, Tag)> = Vec::new();
    let mut previous = 0;
    for (id, token) in stream.iter() {
        if token.span.start < previous {
            return Err(format!("token {} starts before its predecessor", id.0));
        }
        previous = token.span.start;
        if token.tag().is_end() {
            let (_, opener) = open.pop().ok_or(format!("token {} closes nothing", id.0))?;
            if opener.closer() != Some(token.tag()) {
                return Err(format!("token {} closes {opener}", id.0));
            }
        }
        if token.parent != open.last().map(|(parent, _)| *parent) {
            return Err(format!("token {} has parent {:?}", id.0, token.parent));
        }
        if token.tag().closer().is_some() {
            open.push((id, token.tag()));
        }
    }
    match open.last() {
        Some((_, tag)) => Err(format!("{tag} is never closed")),
        None => Ok(()),
    }
}

#[rstest]
#[case::empty("")]
#[case::no_trailing_newline("# title")]
#[case::crlf("> a\r\n> b\r\n\r\n- c\r\n")]
#[case::lone_cr("a\rb\r")]
#[case::tabs_in_containers(">\t-\tfoo\n>\t\tbar\n")]
#[case::nested_lists("- a\n  - b\n\n    c\n- d\n")]
#[case::fence_in_item("1. ```\n   code\n\n   ```\n2. x\n")]
#[case::unclosed_fence("```\na\n\n")]
#[case::definitions("[a]:\n/url\n'title'\n[b]: <c d>\n\n[a][b]\n")]
#[case::setext_after_definition("[a]: /b\n===\n")]
#[case::html_comment("<!--\n\n-->\nafter\n")]
#[case::multiline_raw_html("a <span\n> title='x'>b\n")]
#[case::trailing_blank_code("    a\n  \n    \n")]
#[case::nbsp_and_unicode("\u{a0}*\u{e9}*\u{2003}[\u{1f600}]\n")]
fn tricky_inputs_round_trip(#[case] source: &str) {
    let stream = tokenize(source).expect("tokenize");
    assert_eq!(verify_round_trip(&stream), Ok(()));
    assert_eq!(stream.reconstruct(), source);
    check_nesting(&stream).expect("nesting");
}

proptest! {
    #[test]
    fn any_markdown_round_trips(
        source in "[a-c0-9 \t\r\n>*_~`#=\\-+.:/\\[\\]()!<&;\\\\\"'|@]{0,96}"
    ) {
        for options in [ParseOptions::default(), ParseOptions::commonmark()] {
            let stream = tokenize_with_options(&source, &options)
                .map_err(|err| TestCaseError::fail(err.to_string()))?;
            prop_assert_eq!(verify_round_trip(&stream), Ok(()));
            check_nesting(&stream).map_err(TestCaseError::fail)?;
        }
    }

    #[test]
    fn rendering_is_deterministic(source in "[a-b \n>*_`\\[\\]()-]{0,64}") {
        let first = tokenize(&source).map_err(|err| TestCaseError::fail(err.to_string()))?;
        let second = tokenize(&source).map_err(|err| TestCaseError::fail(err.to_string()))?;
        prop_assert_eq!(first.tokens(), second.tokens());
        prop_assert_eq!(emit_html(&first), emit_html(&second));
    }
}
