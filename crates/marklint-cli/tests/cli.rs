use std::env;
use std::fs;
use std::io::Write;
use std::path::PathBuf;
use std::process::{Command, Stdio};
use std::time::{SystemTime, UNIX_EPOCH};

fn marklint() -> Command {
    Command::new(env!("CARGO_BIN_EXE_marklint"))
}

fn temp_file(name: &str, contents: &str) -> PathBuf {
    let now = SystemTime::now().duration_since(UNIX_EPOCH).expect("time");
    let path = env::temp_dir().join(format!(
        "marklint_cli_{}_{}_{}.md",
        name,
        now.as_secs(),
        now.subsec_nanos()
    ));
    fs::write(&path, contents).expect("write temp file");
    path
}

#[test]
fn tokens_prints_one_compact_token_per_line() {
    let input = temp_file("compact", "# hi\n");
    let output = marklint()
        .args(["tokens", input.to_str().expect("path")])
        .output()
        .expect("run");

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    let lines: Vec<_> = stdout.lines().collect();
    assert_eq!(lines, vec!["[atx(1,1):1]", "[text(1,3):hi]", "[end-atx(1,5)]"]);
}

#[test]
fn tokens_json_is_an_array_of_tagged_kinds() {
    let input = temp_file("json", "a\n");
    let output = marklint()
        .args(["tokens", "--format", "json", input.to_str().expect("path")])
        .output()
        .expect("run");

    assert!(output.status.success());
    let value: serde_json::Value = serde_json::from_slice(&output.stdout).expect("json");
    let kinds: Vec<_> = value
        .as_array()
        .expect("array")
        .iter()
        .map(|token| token["kind"]["type"].as_str().unwrap_or_default().to_string())
        .collect();
    assert_eq!(kinds, vec!["paragraph-start", "text", "paragraph-end"]);
}

#[test]
fn html_reads_stdin() {
    let mut child = marklint()
        .args(["html"])
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .spawn()
        .expect("spawn");
    child
        .stdin
        .take()
        .expect("stdin")
        .write_all(b"*a* ~~b~~\n")
        .expect("write");
    let output = child.wait_with_output().expect("wait");

    assert!(output.status.success());
    assert_eq!(
        String::from_utf8_lossy(&output.stdout),
        "<p><em>a</em> <del>b</del></p>\n"
    );
}

#[test]
fn commonmark_flag_disables_extensions() {
    let input = temp_file("plain", "~~b~~\n");
    let output = marklint()
        .args(["html", "--commonmark", input.to_str().expect("path")])
        .output()
        .expect("run");
    assert_eq!(String::from_utf8_lossy(&output.stdout), "<p>~~b~~</p>\n");
}

#[test]
fn verify_reports_success() {
    let input = temp_file("verify", "> - a\n>\tb\n");
    let output = marklint()
        .args(["verify", input.to_str().expect("path")])
        .output()
        .expect("run");

    assert!(output.status.success());
    assert!(String::from_utf8_lossy(&output.stdout).starts_with("ok: "));
}

#[test]
fn missing_input_fails_with_context() {
    let output = marklint()
        .args(["verify", "/definitely/not/here.md"])
        .output()
        .expect("run");

    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("failed to tokenize /definitely/not/here.md"));
    assert!(stderr.contains("failed to read /definitely/not/here.md"));
}
