//! Read command handler.

use crate::error::{CliError, ExitCode};
use crate::format::{OutputMode, to_ndjson_line, to_pretty_json_line};
use crate::{CliOutput, format_error_output, log_info};
use lectern_domain::SourceTag;
use lectern_infra::{ReadOutput, ReadRequest, run_read_local};
use serde_json::json;
use std::fmt::Write;
use std::path::Path;

/// Inputs for read command execution.
pub struct ReadCommandInput<'a> {
    pub config_path: Option<&'a Path>,
    pub overrides_json: Option<&'a str>,
    pub reference: &'a str,
    pub version: Option<&'a str>,
    pub select: Option<&'a str>,
}

/// Run the read command.
///
/// Text output prints the citation when verses are selected, otherwise the
/// whole chapter.
pub fn run_read(mode: OutputMode, input: &ReadCommandInput<'_>) -> Result<CliOutput, CliError> {
    let request = ReadRequest {
        reference: input.reference.into(),
        version: input.version.map(Into::into),
        select: input.select.map(Into::into),
    };

    let output = match run_read_local(input.config_path, input.overrides_json, &request) {
        Ok(output) => output,
        Err(error) => return Ok(format_error_output(mode, &error, ExitCode::for_error(&error))),
    };

    let mut stderr = String::new();
    log_info(
        &mut stderr,
        &format!("read {} ({})", output.address, source_label(output.content.source_tag())),
        mode.status_lines,
    );

    let stdout = if mode.is_ndjson() {
        format_read_ndjson(&output)?
    } else if mode.is_json() {
        to_pretty_json_line(&json!({ "status": "ok", "read": output }))?
    } else {
        format_read_text(&output)
    };

    Ok(CliOutput {
        stdout,
        stderr,
        exit_code: ExitCode::Ok,
    })
}

const fn source_label(tag: SourceTag) -> &'static str {
    match tag {
        SourceTag::CacheHit => "cache",
        SourceTag::FetchedAndStored => "stored",
        SourceTag::FetchedTransient => "fetched",
    }
}

fn format_read_ndjson(output: &ReadOutput) -> Result<String, CliError> {
    let content = &output.content;
    let mut out = String::new();
    for verse in content.verses() {
        out.push_str(&to_ndjson_line(&json!({
            "type": "verse",
            "book": content.book(),
            "chapter": content.chapter(),
            "number": verse.number,
            "text": verse.text,
        }))?);
    }
    out.push_str(&to_ndjson_line(&json!({
        "type": "summary",
        "status": "ok",
        "reference": output.address.to_string(),
        "version": content.version(),
        "count": content.verses().len(),
        "citation": output.citation,
    }))?);
    Ok(out)
}

fn format_read_text(output: &ReadOutput) -> String {
    if let Some(citation) = output.citation.as_deref().filter(|text| !text.is_empty()) {
        let mut out = citation.to_owned();
        out.push('\n');
        return out;
    }

    let content = &output.content;
    let mut out = format!(
        "{} {} ({})\n",
        content.book(),
        content.chapter(),
        content.version()
    );
    if let Some(subtitle) = content.subtitle() {
        let _ = writeln!(out, "{subtitle}");
    }
    out.push('\n');
    for verse in content.verses() {
        let _ = writeln!(out, "{}. {}", verse.number, verse.text);
    }
    out
}
