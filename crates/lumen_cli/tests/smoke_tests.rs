//! CLI smoke tests: run the real binary against a mock backend.

use std::io::Write;
use std::process::{Command, Stdio};

fn cli_bin() -> Command {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_lumen"));
    cmd.env("RUST_LOG", "warn");
    for var in [
        "LUMEN_CONFIG",
        "LUMEN_DB_PATH",
        "LUMEN_BACKENDS",
        "LUMEN_BACKEND_TIMEOUT_SECS",
        "LUMEN_LABEL_SOURCE",
    ] {
        cmd.env_remove(var);
    }
    cmd
}

/// A config whose only backend is the built-in mock.
fn mock_config(dir: &tempfile::TempDir) -> std::path::PathBuf {
    let path = dir.path().join("lumen.toml");
    std::fs::write(
        &path,
        r#"
[[backends]]
name = "offline"
kind = "mock"

[crisis]
severe = ["end it all", "kill myself"]
moderate = ["hopeless"]

[crisis.resources]
global = "https://findahelpline.com"
"#,
    )
    .unwrap();
    path
}

#[test]
fn test_help_flag() {
    let output = cli_bin().arg("--help").output().expect("failed to run");
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Usage"), "Expected usage info in --help output");
    assert!(stdout.contains("write"));
}

#[test]
fn test_version_flag() {
    let output = cli_bin().arg("--version").output().expect("failed to run");
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("lumen"), "Expected binary name in --version output");
}

#[test]
fn test_write_with_mock_backend() {
    let dir = tempfile::TempDir::new().unwrap();
    let output = cli_bin()
        .arg("--config")
        .arg(mock_config(&dir))
        .arg("--ephemeral")
        .args(["write", "Had a lovely walk with my sister"])
        .output()
        .expect("failed to run");
    assert!(output.status.success(), "stderr: {}", String::from_utf8_lossy(&output.stderr));
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Emotion:"));
    assert!(stdout.contains("What stood out most to you today?"));
}

#[test]
fn test_crisis_entry_prints_resources() {
    let dir = tempfile::TempDir::new().unwrap();
    let output = cli_bin()
        .arg("--config")
        .arg(mock_config(&dir))
        .arg("--ephemeral")
        .args(["write", "I just want to end it all"])
        .output()
        .expect("failed to run");
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("https://findahelpline.com"));
    assert!(!stdout.contains("What stood out most to you today?"));
}

#[test]
fn test_write_reads_stdin_and_persists() {
    let dir = tempfile::TempDir::new().unwrap();
    let config = mock_config(&dir);
    let db = dir.path().join("journal.db");

    let mut child = cli_bin()
        .arg("--config")
        .arg(&config)
        .arg("--db")
        .arg(&db)
        .arg("write")
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .spawn()
        .expect("failed to run");
    child
        .stdin
        .take()
        .unwrap()
        .write_all(b"Rainy day, stayed in and read")
        .unwrap();
    assert!(child.wait_with_output().unwrap().status.success());

    let output = cli_bin()
        .arg("--config")
        .arg(&config)
        .arg("--db")
        .arg(&db)
        .arg("history")
        .output()
        .expect("failed to run");
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Rainy day, stayed in and read"));
}

#[test]
fn test_empty_entry_fails_cleanly() {
    let dir = tempfile::TempDir::new().unwrap();
    let output = cli_bin()
        .arg("--config")
        .arg(mock_config(&dir))
        .arg("--ephemeral")
        .args(["write", "   "])
        .output()
        .expect("failed to run");
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("empty"));
}

#[test]
fn test_stats_on_empty_journal() {
    let dir = tempfile::TempDir::new().unwrap();
    let output = cli_bin()
        .arg("--config")
        .arg(mock_config(&dir))
        .arg("--ephemeral")
        .arg("stats")
        .output()
        .expect("failed to run");
    assert!(output.status.success());
    assert!(String::from_utf8_lossy(&output.stdout).contains("No entries yet."));
}

#[test]
fn test_invalid_config_fails_before_any_backend() {
    let dir = tempfile::TempDir::new().unwrap();
    let path = dir.path().join("lumen.toml");
    std::fs::write(&path, "[[backends]\nkind = \"mock\"\n").unwrap();
    let output = cli_bin()
        .arg("--config")
        .arg(&path)
        .arg("--ephemeral")
        .args(["write", "A quiet evening"])
        .output()
        .expect("failed to run");
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("Failed to parse TOML config"));
}
