//! Smoke tests for the line-mode binary.
use serial_term::command::HELP_TEXT;
use std::io::Write;
use std::path::Path;
use std::process::{Command, Output, Stdio};

fn run_with_input(args: &[&str], input: &str, config: &Path) -> Output {
    let mut child = Command::new(env!("CARGO_BIN_EXE_serial-term"))
        .arg("--config")
        .arg(config)
        .args(args)
        .env_remove("RUST_LOG")
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .expect("failed to start binary");

    {
        let mut stdin = child.stdin.take().expect("stdin available");
        stdin.write_all(input.as_bytes()).unwrap();
        // Dropping stdin closes it; the terminal exits on EOF.
    }
    child.wait_with_output().expect("binary exits")
}

fn empty_config() -> tempfile::TempDir {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("serial-term.toml"), "[logging]\nlevel = \"warn\"\n").unwrap();
    dir
}

#[test]
fn ready_line_then_help() {
    let dir = empty_config();
    let output = run_with_input(&[], ":help\n:quit\n", &dir.path().join("serial-term.toml"));

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.starts_with("Ready...\n"), "got: {stdout}");
    for line in HELP_TEXT.lines() {
        assert!(stdout.contains(line), "missing help line {line:?} in {stdout}");
    }
}

#[test]
fn eof_exits_cleanly() {
    let dir = empty_config();
    let output = run_with_input(&[], "", &dir.path().join("serial-term.toml"));
    assert!(output.status.success());
    assert_eq!(String::from_utf8_lossy(&output.stdout), "Ready...\n");
}

#[test]
fn connect_to_missing_port_reports_failure() {
    let dir = empty_config();
    let output = run_with_input(
        &["--json"],
        ":connect /dev/serial-term-missing 9600\n",
        &dir.path().join("serial-term.toml"),
    );
    assert!(output.status.success());

    let payloads: Vec<String> = String::from_utf8_lossy(&output.stdout)
        .lines()
        .map(|l| serde_json::from_str::<serde_json::Value>(l).unwrap())
        .map(|v| v["payload"].as_str().unwrap_or_default().to_string())
        .collect();
    assert_eq!(
        payloads,
        vec![
            "Ready...".to_string(),
            "Connecting to /dev/serial-term-missing with 9600 baud rate.".to_string(),
            "Failed to connect!".to_string(),
        ]
    );
}

#[test]
fn unsupported_baud_is_rejected_by_the_cli() {
    let dir = empty_config();
    let output = run_with_input(&["--baud", "4800"], "", &dir.path().join("serial-term.toml"));
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("4800"));
}

#[test]
fn list_as_json_is_an_array() {
    let dir = empty_config();
    let output = run_with_input(&["--list", "--json"], "", &dir.path().join("serial-term.toml"));
    assert!(output.status.success());
    let value: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert!(value.is_array());
}
