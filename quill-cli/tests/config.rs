use assert_cmd::cargo::cargo_bin_cmd;
use predicates::prelude::*;
use std::fs;
use tempfile::tempdir;

#[test]
fn engine_comes_from_config_file() {
    let dir = tempdir().unwrap();
    let input_path = dir.path().join("doc.md");
    fs::write(&input_path, "# Title\n").unwrap();

    let config_path = dir.path().join("custom.toml");
    fs::write(
        &config_path,
        r#"[convert]
engine = "comrak"
"#,
    )
    .unwrap();

    let mut cmd = cargo_bin_cmd!("quill");
    cmd.current_dir(dir.path())
        .arg("tokens")
        .arg(input_path.as_os_str())
        .arg("--treeviz")
        .arg("--config")
        .arg(config_path.as_os_str());

    cmd.assert()
        .success()
        .stdout(predicate::str::contains("Header 1\n  Str Title\n"));
}

#[test]
fn project_file_is_picked_up_from_working_directory() {
    let dir = tempdir().unwrap();
    fs::write(dir.path().join("doc.md"), "> quoted\n\nafter\n").unwrap();
    fs::write(
        dir.path().join("quill.toml"),
        r#"[convert]
engine = "comrak"
disabled_types = ["blockquote"]
"#,
    )
    .unwrap();

    let mut cmd = cargo_bin_cmd!("quill");
    cmd.current_dir(dir.path())
        .arg("to-tree")
        .arg("doc.md")
        .arg("--treeviz");

    cmd.assert().success().stdout(
        predicate::str::contains("text \"after\"")
            .and(predicate::str::contains("blockquote").not())
            .and(predicate::str::contains("quoted").not()),
    );
}

#[test]
fn max_depth_limits_nesting() {
    let dir = tempdir().unwrap();
    let input_path = dir.path().join("deep.md");
    fs::write(&input_path, "> > > deep\n").unwrap();

    let config_path = dir.path().join("shallow.toml");
    fs::write(
        &config_path,
        r#"[convert]
max_depth = 1
"#,
    )
    .unwrap();

    let mut cmd = cargo_bin_cmd!("quill");
    cmd.current_dir(dir.path())
        .arg("to-tree")
        .arg(input_path.as_os_str())
        .arg("--engine")
        .arg("comrak")
        .arg("--config")
        .arg(config_path.as_os_str());

    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("nesting exceeds the limit of 1"));
}

#[test]
fn missing_config_file_fails() {
    let dir = tempdir().unwrap();

    let mut cmd = cargo_bin_cmd!("quill");
    cmd.current_dir(dir.path())
        .arg("tokens")
        .arg("doc.md")
        .arg("--config")
        .arg("absent.toml");

    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("Failed to load configuration"));
}

#[test]
fn unreachable_pandoc_is_reported() {
    let dir = tempdir().unwrap();
    let input_path = dir.path().join("doc.md");
    fs::write(&input_path, "# Title\n").unwrap();

    let config_path = dir.path().join("pandoc.toml");
    fs::write(
        &config_path,
        r#"[pandoc]
binary = "quill-test-no-such-pandoc"
"#,
    )
    .unwrap();

    let mut cmd = cargo_bin_cmd!("quill");
    cmd.current_dir(dir.path())
        .env_remove("QUILL_PANDOC_BIN")
        .env_remove("RUST_LOG")
        .arg("to-tree")
        .arg(input_path.as_os_str())
        .arg("--engine")
        .arg("pandoc")
        .arg("--config")
        .arg(config_path.as_os_str());

    cmd.assert().failure().stderr(predicate::str::starts_with("Error:"));
}

#[test]
fn log_level_flag_enables_debug_output() {
    let dir = tempdir().unwrap();
    let input_path = dir.path().join("doc.md");
    fs::write(&input_path, "# Title\n").unwrap();

    let mut cmd = cargo_bin_cmd!("quill");
    cmd.current_dir(dir.path())
        .env_remove("RUST_LOG")
        .arg("to-tree")
        .arg(input_path.as_os_str())
        .arg("--engine")
        .arg("comrak")
        .arg("--log-level")
        .arg("debug");
    cmd.assert()
        .success()
        .stderr(predicate::str::contains("markdown to tree"));

    let mut cmd = cargo_bin_cmd!("quill");
    cmd.current_dir(dir.path())
        .env_remove("RUST_LOG")
        .arg("to-tree")
        .arg(input_path.as_os_str())
        .arg("--engine")
        .arg("comrak");
    cmd.assert().success().stderr(predicate::str::is_empty());
}
