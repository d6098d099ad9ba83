//! Read and search through the CLI against the bundled fixture bible.

use std::io;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};

fn workspace_root() -> PathBuf {
    let manifest_dir = Path::new(env!("CARGO_MANIFEST_DIR"));
    manifest_dir
        .parent()
        .and_then(Path::parent)
        .map(Path::to_path_buf)
        .unwrap_or_else(|| manifest_dir.to_path_buf())
}

fn bibles_dir() -> PathBuf {
    workspace_root()
        .join("crates")
        .join("testkit")
        .join("fixtures")
        .join("bibles")
}

fn lectern(args: &[&str]) -> io::Result<Output> {
    Command::new(env!("CARGO_BIN_EXE_lectern"))
        .args(args)
        .arg("--data-dir")
        .arg(bibles_dir())
        .env_remove("LECTERN_SOURCE_KIND")
        .env_remove("LECTERN_SOURCE_DATA_DIR")
        .env_remove("LECTERN_DEFAULT_VERSION")
        .env_remove("LECTERN_SEARCH_LIMIT")
        .env_remove("LECTERN_STORAGE_VERSE_LIMIT")
        .output()
}

fn stdout_json(output: &Output) -> io::Result<serde_json::Value> {
    serde_json::from_slice(&output.stdout).map_err(io::Error::other)
}

#[test]
fn read_prints_a_whole_chapter() -> io::Result<()> {
    let output = lectern(&["read", "Psalm 23", "--version", "kjv"])?;
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.starts_with("Psalms 23 (KJV)"), "{stdout}");
    assert!(stdout.contains("1. The LORD is my shepherd; I shall not want."));
    Ok(())
}

#[test]
fn read_with_selection_prints_a_citation() -> io::Result<()> {
    let output = lectern(&[
        "--no-progress",
        "read",
        "John 3",
        "--version",
        "KJV",
        "--select",
        "16-17",
    ])?;
    assert!(output.status.success());

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.starts_with("John 3:16,17 (KJV)\n\n16. For God so loved the world"), "{stdout}");
    assert!(output.stderr.is_empty());
    Ok(())
}

#[test]
fn open_ended_selection_cites_the_whole_chapter() -> io::Result<()> {
    let output = lectern(&[
        "--quiet",
        "read",
        "Genesis 1",
        "--version",
        "KJV",
        "--select",
        "1-4294967295",
    ])?;
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.starts_with("Genesis 1:1,2,3 (KJV)\n"), "{stdout}");
    Ok(())
}

#[test]
fn selection_past_the_chapter_exits_invalid_input() -> io::Result<()> {
    let output = lectern(&["--json", "read", "Genesis 1", "--version", "KJV", "--select", "9-12"])?;
    assert_eq!(output.status.code(), Some(2));

    let value = stdout_json(&output)?;
    assert_eq!(value["error"]["code"], "reference:verse_out_of_range");
    Ok(())
}

#[test]
fn read_json_reports_the_source_tag() -> io::Result<()> {
    let output = lectern(&["--json", "read", "Genesis 1:3", "--version", "KJV"])?;
    assert!(output.status.success());

    let value = stdout_json(&output)?;
    assert_eq!(value["status"], "ok");
    assert_eq!(value["read"]["content"]["version"], "KJV");
    assert_eq!(value["read"]["content"]["sourceTag"], "fetched-and-stored");
    assert_eq!(
        value["read"]["citation"],
        "Genesis 1:3 (KJV)\n\n3. And God said, Let there be light: and there was light."
    );
    Ok(())
}

#[test]
fn missing_version_file_exits_unavailable() -> io::Result<()> {
    let output = lectern(&["--json", "read", "John 3", "--version", "NLT"])?;

    assert_eq!(output.status.code(), Some(4));
    let value = stdout_json(&output)?;
    assert_eq!(value["error"]["code"], "retrieval:source_failure");
    assert_eq!(value["error"]["meta"]["source_code"], "source:bible_file_not_found");
    Ok(())
}

#[test]
fn unsupported_version_exits_invalid_input() -> io::Result<()> {
    let output = lectern(&["--json", "read", "John 3", "--version", "ESV"])?;

    assert_eq!(output.status.code(), Some(2));
    let value = stdout_json(&output)?;
    assert_eq!(value["error"]["code"], "retrieval:unsupported_version");
    Ok(())
}

#[test]
fn search_finds_verses_in_canonical_order() -> io::Result<()> {
    let output = lectern(&["--json", "search", "in the beginning", "--version", "KJV"])?;
    assert!(output.status.success());

    let value = stdout_json(&output)?;
    let references: Vec<&str> = value["results"]
        .as_array()
        .ok_or_else(|| io::Error::other("missing results"))?
        .iter()
        .filter_map(|result| result["reference"].as_str())
        .collect();
    assert_eq!(references, ["Genesis 1:1", "John 1:1", "John 1:2"]);
    Ok(())
}

#[test]
fn search_limit_flag_truncates_results() -> io::Result<()> {
    let output = lectern(&["--agent", "search", "world", "--version", "KJV", "--limit", "1"])?;
    assert!(output.status.success());

    let stdout = String::from_utf8_lossy(&output.stdout);
    let lines: Vec<serde_json::Value> = stdout
        .lines()
        .map(serde_json::from_str)
        .collect::<Result<_, _>>()
        .map_err(io::Error::other)?;
    assert_eq!(lines.len(), 2);
    assert_eq!(lines[0]["type"], "result");
    assert_eq!(lines[0]["reference"], "John 3:16");
    assert_eq!(lines[1]["type"], "summary");
    Ok(())
}

#[test]
fn short_query_exits_invalid_input() -> io::Result<()> {
    let output = lectern(&["search", "a"])?;

    assert_eq!(output.status.code(), Some(2));
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("code: search:query_too_short"), "{stdout}");
    Ok(())
}
