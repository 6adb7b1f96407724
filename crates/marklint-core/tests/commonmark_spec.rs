//! Conformance run against the CommonMark/GFM example suite.
//!
//! The suite is not vendored: drop `spec.json` (as produced by the reference
//! test tooling) into `tests/commonmark/` at the workspace root to enable it.

use std::fs;
use std::path::Path;

use marklint_core::{
    HtmlOptions, ParseOptions, emit_html_with_options, tokenize_with_options, verify_round_trip,
};
use serde::Deserialize;

#[derive(Debug, Deserialize)]
struct SpecExample {
    markdown: String,
    html: String,
    example: u32,
    start_line: u32,
    section: String,
}

#[derive(Debug)]
struct Failure {
    example: u32,
    start_line: u32,
    section: String,
    markdown: String,
    expected: String,
    actual: String,
}

#[test]
fn commonmark_spec() -> Result<(), Box<dyn std::error::Error>> {
    let root = Path::new(env!("CARGO_MANIFEST_DIR")).join("../..");
    let spec_path = root.join("tests/commonmark/spec.json");
    if !spec_path.exists() {
        eprintln!("CommonMark spec.json not found at {spec_path:?}; skipping");
        return Ok(());
    }

    let examples: Vec<SpecExample> = serde_json::from_str(&fs::read_to_string(&spec_path)?)?;
    let mut passed = 0usize;
    let mut skipped = 0usize;
    let mut failures = Vec::new();

    for example in examples {
        // Tables are not tokenized.
        if example.section.starts_with("Tables") {
            skipped += 1;
            continue;
        }
        let extension = example.section.contains("(extension)");
        let options = if extension {
            ParseOptions::default()
        } else {
            ParseOptions::commonmark()
        };
        let html_options = HtmlOptions {
            tag_filter: extension,
        };

        let stream = tokenize_with_options(&example.markdown, &options)?;
        if let Err(err) = verify_round_trip(&stream) {
            return Err(format!("example {} does not round-trip: {err}", example.example).into());
        }
        let actual = emit_html_with_options(&stream, &html_options);
        if actual == example.html {
            passed += 1;
        } else {
            failures.push(Failure {
                example: example.example,
                start_line: example.start_line,
                section: example.section,
                markdown: example.markdown,
                expected: example.html,
                actual,
            });
        }
    }

    let checked = passed + failures.len();
    let pass_rate = if checked > 0 {
        passed as f64 / checked as f64 * 100.0
    } else {
        100.0
    };
    println!("passed {passed} / {checked} ({pass_rate:.1}%), skipped {skipped}");
    for failure in failures.iter().take(10) {
        println!(
            "\n--- example {} (line {}, {}) ---\n{}\nexpected:\n{}\nactual:\n{}",
            failure.example,
            failure.start_line,
            failure.section,
            show_whitespace(&failure.markdown),
            show_whitespace(&failure.expected),
            show_whitespace(&failure.actual),
        );
    }

    assert!(
        pass_rate >= 85.0,
        "conformance {pass_rate:.1}% is below 85% ({} failures)",
        failures.len()
    );
    Ok(())
}

fn show_whitespace(s: &str) -> String {
    s.replace(' ', "·").replace('\t', "→").replace('\n', "↵\n")
}
