use assert_cmd::cargo::cargo_bin_cmd;
use predicates::prelude::*;
use std::fs;
use std::path::PathBuf;
use tempfile::{tempdir, TempDir};

fn write_markdown(dir: &TempDir, name: &str, source: &str) -> PathBuf {
    let path = dir.path().join(name);
    fs::write(&path, source).unwrap();
    path
}

#[test]
fn tokens_as_treeviz() {
    let dir = tempdir().unwrap();
    let input = write_markdown(&dir, "doc.md", "# Title\n\nHello *world*\n");

    let mut cmd = cargo_bin_cmd!("quill");
    cmd.current_dir(dir.path())
        .arg("tokens")
        .arg(&input)
        .arg("--treeviz")
        .arg("--engine")
        .arg("comrak");

    let output_pred = predicate::str::contains("Header 1\n  Str Title\n")
        .and(predicate::str::contains("Para\n  Str Hello\n"))
        .and(predicate::str::contains("  Emph\n    Str world\n"));

    cmd.assert().success().stdout(output_pred);
}

#[test]
fn tokens_as_json() {
    let dir = tempdir().unwrap();
    let input = write_markdown(&dir, "doc.md", "# Title\n");

    let mut cmd = cargo_bin_cmd!("quill");
    cmd.current_dir(dir.path())
        .arg("tokens")
        .arg(&input)
        .arg("--engine")
        .arg("comrak");

    let output = cmd.assert().success().get_output().stdout.clone();
    let stream: serde_json::Value = serde_json::from_slice(&output).unwrap();
    assert_eq!(stream["pandoc-api-version"], serde_json::json!([1, 23, 1]));
    assert_eq!(stream["blocks"][0]["t"], "Header");
}

#[test]
fn to_tree_and_back() {
    let dir = tempdir().unwrap();
    let input = write_markdown(&dir, "doc.md", "# Title\n\nHello *world*\n");
    let tree_path = dir.path().join("doc.json");

    let mut cmd = cargo_bin_cmd!("quill");
    cmd.current_dir(dir.path())
        .arg("to-tree")
        .arg(&input)
        .arg("-o")
        .arg(&tree_path)
        .arg("--engine")
        .arg("comrak");
    cmd.assert().success().stdout(predicate::str::is_empty());

    let tree = fs::read_to_string(&tree_path).unwrap();
    assert!(tree.contains("\"heading\""));
    assert!(tree.contains("\"Hello \""));

    let mut cmd = cargo_bin_cmd!("quill");
    cmd.current_dir(dir.path())
        .arg("from-tree")
        .arg(&tree_path)
        .arg("--engine")
        .arg("comrak");
    cmd.assert().success().stdout(
        predicate::str::contains("# Title").and(predicate::str::contains("world")),
    );
}

#[test]
fn to_tree_as_treeviz() {
    let dir = tempdir().unwrap();
    let input = write_markdown(&dir, "doc.md", "Text[^a].\n\n[^a]: A note.\n");

    let mut cmd = cargo_bin_cmd!("quill");
    cmd.current_dir(dir.path())
        .arg("to-tree")
        .arg(&input)
        .arg("--treeviz")
        .arg("--engine")
        .arg("comrak");

    let output_pred = predicate::str::starts_with("body\n  paragraph\n")
        .and(predicate::str::contains("footnote number=1"))
        .and(predicate::str::contains("notes\n  note number=1\n"))
        .and(predicate::str::contains("text \"A note.\""));

    cmd.assert().success().stdout(output_pred);
}

#[test]
fn round_trip_keeps_task_lists() {
    let dir = tempdir().unwrap();
    let input = write_markdown(&dir, "tasks.md", "- [x] Done\n- [ ] Todo\n");

    let mut cmd = cargo_bin_cmd!("quill");
    cmd.current_dir(dir.path())
        .arg("round-trip")
        .arg(&input)
        .arg("--engine")
        .arg("comrak");

    cmd.assert().success().stdout(
        predicate::str::contains("- [x] Done").and(predicate::str::contains("- [ ] Todo")),
    );
}

#[test]
fn missing_input_fails() {
    let dir = tempdir().unwrap();

    let mut cmd = cargo_bin_cmd!("quill");
    cmd.current_dir(dir.path())
        .arg("round-trip")
        .arg("nope.md")
        .arg("--engine")
        .arg("comrak");

    cmd.assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("Error reading file 'nope.md'"));
}

#[test]
fn from_tree_rejects_bad_input() {
    let dir = tempdir().unwrap();
    let tree = write_markdown(&dir, "tree.json", "{\"type\": \"paragraph\"}");

    let mut cmd = cargo_bin_cmd!("quill");
    cmd.current_dir(dir.path())
        .arg("from-tree")
        .arg(&tree)
        .arg("--engine")
        .arg("comrak");
    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("is not a document tree"));

    let mut cmd = cargo_bin_cmd!("quill");
    cmd.current_dir(dir.path())
        .arg("from-tree")
        .arg(&tree)
        .arg("--api-version")
        .arg("1.x")
        .arg("--engine")
        .arg("comrak");
    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("invalid API version component 'x'"));
}

#[test]
fn unknown_engine_is_a_usage_error() {
    let mut cmd = cargo_bin_cmd!("quill");
    cmd.arg("tokens").arg("doc.md").arg("--engine").arg("markdown-it");
    cmd.assert().failure().stderr(predicate::str::contains("markdown-it"));
}
