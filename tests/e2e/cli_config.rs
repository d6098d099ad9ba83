//! Config check and show through the CLI.

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

fn fixtures_dir() -> PathBuf {
    workspace_root()
        .join("crates")
        .join("testkit")
        .join("fixtures")
}

fn config_fixture(name: &str) -> PathBuf {
    fixtures_dir().join("config").join(name)
}

fn lectern() -> Command {
    let mut command = Command::new(env!("CARGO_BIN_EXE_lectern"));
    command
        .current_dir(fixtures_dir())
        .env_remove("LECTERN_SOURCE_KIND")
        .env_remove("LECTERN_SOURCE_DATA_DIR")
        .env_remove("LECTERN_SOURCE_API_KEY")
        .env_remove("LECTERN_DEFAULT_VERSION")
        .env_remove("LECTERN_SEARCH_LIMIT")
        .env_remove("LECTERN_STORAGE_VERSE_LIMIT");
    command
}

fn stdout_json(output: &Output) -> io::Result<serde_json::Value> {
    serde_json::from_slice(&output.stdout).map_err(io::Error::other)
}

#[test]
fn valid_config_checks_ok() -> io::Result<()> {
    let output = lectern()
        .args(["--json", "config", "check", "--path"])
        .arg(config_fixture("lectern.valid.json"))
        .output()?;
    assert!(output.status.success());

    let value = stdout_json(&output)?;
    assert_eq!(value["status"], "ok");
    Ok(())
}

#[test]
fn invalid_config_exits_invalid_input() -> io::Result<()> {
    let output = lectern()
        .args(["--json", "config", "check", "--path"])
        .arg(config_fixture("lectern.invalid.json"))
        .output()?;

    assert_eq!(output.status.code(), Some(2));
    let value = stdout_json(&output)?;
    let code = value["error"]["code"]
        .as_str()
        .ok_or_else(|| io::Error::other("missing error code"))?;
    assert!(code.starts_with("config:"), "{code}");
    Ok(())
}

#[test]
fn show_merges_env_over_file_and_redacts_secrets() -> io::Result<()> {
    let output = lectern()
        .args(["--json", "config", "show", "--path"])
        .arg(config_fixture("lectern.valid.json"))
        .env("LECTERN_DEFAULT_VERSION", "nlt")
        .env("LECTERN_SOURCE_API_KEY", "super-secret-key")
        .output()?;
    assert!(output.status.success());

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(!stdout.contains("super-secret-key"));
    let value = stdout_json(&output)?;
    let effective = &value["effectiveConfig"];
    assert_eq!(effective["session"]["defaultVersion"], "NLT");
    assert_eq!(effective["session"]["defaultReference"], "Psalms 23");
    assert_eq!(effective["search"]["limit"], 25);
    Ok(())
}

#[test]
fn configured_defaults_drive_read() -> io::Result<()> {
    let output = lectern()
        .args(["--no-progress", "read", "--config"])
        .arg(config_fixture("lectern.valid.json"))
        .output()?;
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stdout));

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.starts_with("Psalms 23 (KJV)"), "{stdout}");
    Ok(())
}
