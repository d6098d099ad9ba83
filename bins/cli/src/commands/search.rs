//! Search command handler.

use crate::error::{CliError, ExitCode};
use crate::format::{OutputMode, to_ndjson_line, to_pretty_json_line};
use crate::{CliOutput, format_error_output};
use lectern_domain::SearchResult;
use lectern_infra::{LocalSearchRequest, run_search_local};
use serde_json::json;
use std::fmt::Write;
use std::path::Path;

/// Inputs for search command execution.
pub struct SearchCommandInput<'a> {
    pub config_path: Option<&'a Path>,
    pub overrides_json: Option<&'a str>,
    pub query: &'a str,
    pub version: Option<&'a str>,
}

/// Run the search command.
pub fn run_search(mode: OutputMode, input: &SearchCommandInput<'_>) -> Result<CliOutput, CliError> {
    let request = LocalSearchRequest {
        query: input.query.into(),
        version: input.version.map(Into::into),
    };

    match run_search_local(input.config_path, input.overrides_json, &request) {
        Ok(results) => format_search_output(mode, &results),
        Err(error) => Ok(format_error_output(mode, &error, ExitCode::for_error(&error))),
    }
}

fn format_search_output(mode: OutputMode, results: &[SearchResult]) -> Result<CliOutput, CliError> {
    let stdout = if mode.is_ndjson() {
        format_search_ndjson(results)?
    } else if mode.is_json() {
        to_pretty_json_line(&json!({
            "status": "ok",
            "results": results,
        }))?
    } else {
        format_search_text(results)
    };

    Ok(CliOutput {
        stdout,
        stderr: String::new(),
        exit_code: ExitCode::Ok,
    })
}

fn format_search_ndjson(results: &[SearchResult]) -> Result<String, CliError> {
    let mut out = String::new();
    for result in results {
        let mut payload = serde_json::to_value(result)?;
        if let Some(map) = payload.as_object_mut() {
            map.insert("type".to_owned(), "result".into());
        }
        out.push_str(&to_ndjson_line(&payload)?);
    }
    out.push_str(&to_ndjson_line(&json!({
        "type": "summary",
        "status": "ok",
        "count": results.len(),
    }))?);
    Ok(out)
}

fn format_search_text(results: &[SearchResult]) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "status: ok\nresults: {}", results.len());
    for result in results {
        let _ = writeln!(out, "{} ({}) {}", result.reference, result.version, result.text);
    }
    out
}
