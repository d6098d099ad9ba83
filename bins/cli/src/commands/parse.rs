//! Parse command handler.

use crate::error::{CliError, ExitCode};
use crate::format::{OutputMode, to_ndjson_line, to_pretty_json_line};
use crate::{CliOutput, format_error_output};
use lectern_domain::{Address, parse};
use lectern_shared::ErrorEnvelope;
use serde_json::{Map, Value};
use std::fmt::Write;

/// Resolve a reference and print its canonical form.
pub fn run_parse(mode: OutputMode, input: &str) -> Result<CliOutput, CliError> {
    let address = match parse(input) {
        Ok(address) => address,
        Err(error) => {
            let error = ErrorEnvelope::from(error);
            return Ok(format_error_output(mode, &error, ExitCode::for_error(&error)));
        },
    };

    let stdout = if mode.is_ndjson() {
        let mut payload = address_payload(&address);
        payload.insert("type".to_owned(), "address".into());
        to_ndjson_line(&payload.into())?
    } else if mode.is_json() {
        let mut payload = address_payload(&address);
        payload.insert("status".to_owned(), "ok".into());
        to_pretty_json_line(&payload.into())?
    } else {
        format_address_text(&address)
    };

    Ok(CliOutput {
        stdout,
        stderr: String::new(),
        exit_code: ExitCode::Ok,
    })
}

fn address_payload(address: &Address) -> Map<String, Value> {
    let mut payload = Map::new();
    payload.insert("reference".to_owned(), address.to_string().into());
    payload.insert(
        "address".to_owned(),
        serde_json::to_value(address).unwrap_or(Value::Null),
    );
    payload.insert("code".to_owned(), address.book().code.into());
    payload
}

fn format_address_text(address: &Address) -> String {
    let mut out = format!(
        "reference: {address}\nbook: {}\nchapter: {}\n",
        address.book(),
        address.chapter()
    );
    if let Some(verse) = address.verse() {
        let _ = writeln!(out, "verse: {verse}");
    }
    out
}
