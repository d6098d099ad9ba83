//! CLI smoke tests for the offline commands.

use std::io;
use std::process::{Command, Output};

fn lectern(args: &[&str]) -> io::Result<Output> {
    Command::new(env!("CARGO_BIN_EXE_lectern")).args(args).output()
}

fn stdout_json(output: &Output) -> io::Result<serde_json::Value> {
    serde_json::from_slice(&output.stdout).map_err(io::Error::other)
}

#[test]
fn parse_prints_the_canonical_reference() -> io::Result<()> {
    let output = lectern(&["parse", "jn 3:16"])?;
    assert!(output.status.success());

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("reference: John 3:16"), "{stdout}");
    assert!(stdout.contains("chapter: 3"), "{stdout}");
    Ok(())
}

#[test]
fn parse_is_deterministic_in_json_mode() -> io::Result<()> {
    let first = lectern(&["--json", "parse", "Song of Solomon 2"])?;
    let second = lectern(&["--json", "parse", "Song of Solomon 2"])?;

    assert_eq!(first.stdout, second.stdout);
    let value = stdout_json(&first)?;
    assert_eq!(value["status"], "ok");
    assert_eq!(value["reference"], "Song of Songs 2");
    Ok(())
}

#[test]
fn unknown_books_exit_with_invalid_input() -> io::Result<()> {
    let output = lectern(&["--json", "parse", "Hezekiah 3:1"])?;

    assert_eq!(output.status.code(), Some(2));
    let value = stdout_json(&output)?;
    assert_eq!(value["status"], "error");
    assert_eq!(value["error"]["code"], "reference:unknown_book");
    Ok(())
}

#[test]
fn books_lists_both_testaments() -> io::Result<()> {
    let output = lectern(&["books"])?;
    assert!(output.status.success());

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Old Testament (929 chapters)"), "{stdout}");
    assert!(stdout.contains("New Testament (260 chapters)"), "{stdout}");
    Ok(())
}

#[test]
fn books_can_filter_by_testament() -> io::Result<()> {
    let output = lectern(&["books", "--testament", "new"])?;
    assert!(output.status.success());

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(!stdout.contains("Genesis"));
    assert!(stdout.contains("Revelation"));
    Ok(())
}

#[test]
fn agent_mode_emits_ndjson() -> io::Result<()> {
    let output = lectern(&["--agent", "books", "--testament", "old"])?;
    assert!(output.status.success());

    let stdout = String::from_utf8_lossy(&output.stdout);
    let lines: Vec<serde_json::Value> = stdout
        .lines()
        .map(serde_json::from_str)
        .collect::<Result<_, _>>()
        .map_err(io::Error::other)?;
    assert_eq!(lines.len(), 40);
    assert_eq!(lines[39]["type"], "summary");
    assert!(output.stderr.is_empty());
    Ok(())
}
