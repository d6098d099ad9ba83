//! Books command handler.

use crate::CliOutput;
use crate::error::{CliError, ExitCode};
use crate::format::{OutputMode, to_ndjson_line, to_pretty_json_line};
use lectern_domain::{Testament, all_books, navigation_groups, total_chapters};
use serde_json::json;
use std::fmt::Write;

/// List the catalog, grouped by testament and category.
pub fn run_books(mode: OutputMode, testament: Option<Testament>) -> Result<CliOutput, CliError> {
    let testaments: Vec<Testament> = testament.map_or_else(
        || vec![Testament::Old, Testament::New],
        |testament| vec![testament],
    );

    let stdout = if mode.is_ndjson() {
        format_books_ndjson(&testaments)?
    } else if mode.is_json() {
        format_books_json(&testaments)?
    } else {
        format_books_text(&testaments)
    };

    Ok(CliOutput {
        stdout,
        stderr: String::new(),
        exit_code: ExitCode::Ok,
    })
}

fn format_books_json(testaments: &[Testament]) -> Result<String, CliError> {
    let testaments: Vec<_> = testaments
        .iter()
        .map(|&testament| {
            json!({
                "testament": testament,
                "label": testament.label(),
                "chapters": total_chapters(testament),
                "groups": navigation_groups(testament),
            })
        })
        .collect();
    Ok(to_pretty_json_line(&json!({
        "status": "ok",
        "testaments": testaments,
    }))?)
}

fn format_books_ndjson(testaments: &[Testament]) -> Result<String, CliError> {
    let mut out = String::new();
    let mut count = 0usize;
    for &testament in testaments {
        for book in all_books(testament) {
            count += 1;
            out.push_str(&to_ndjson_line(&json!({
                "type": "book",
                "number": book.number,
                "name": book.name,
                "code": book.code,
                "abbreviation": book.abbreviation,
                "testament": book.testament,
                "category": book.category,
                "chapters": book.chapters,
            }))?);
        }
    }
    out.push_str(&to_ndjson_line(&json!({
        "type": "summary",
        "status": "ok",
        "count": count,
    }))?);
    Ok(out)
}

fn format_books_text(testaments: &[Testament]) -> String {
    let mut out = String::new();
    for &testament in testaments {
        let _ = writeln!(
            out,
            "{} ({} chapters)",
            testament.label(),
            total_chapters(testament)
        );
        for group in navigation_groups(testament) {
            let _ = writeln!(out, "  {}", group.category.label());
            for book in group.books {
                let _ = writeln!(out, "    {:<16} {:<4} {:>3}", book.name, book.code, book.chapters);
            }
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::format::OutputFormat;

    fn mode(format: OutputFormat) -> OutputMode {
        OutputMode {
            format,
            status_lines: false,
        }
    }

    #[test]
    fn text_lists_every_book_with_chapter_totals() -> Result<(), CliError> {
        let output = run_books(mode(OutputFormat::Text), None)?;
        assert!(output.stdout.starts_with("Old Testament (929 chapters)\n  Torah\n"));
        assert!(output.stdout.contains("New Testament (260 chapters)"));
        assert!(output.stdout.contains("Revelation"));
        Ok(())
    }

    #[test]
    fn ndjson_emits_one_line_per_book_and_a_summary() -> Result<(), Box<dyn std::error::Error>> {
        let output = run_books(mode(OutputFormat::Ndjson), Some(Testament::New))?;
        let lines: Vec<&str> = output.stdout.lines().collect();
        assert_eq!(lines.len(), 28);

        let first: serde_json::Value = serde_json::from_str(lines[0])?;
        assert_eq!(first["name"], "Matthew");
        assert_eq!(first["code"], "MAT");
        let summary: serde_json::Value = serde_json::from_str(lines[27])?;
        assert_eq!(summary["count"], 27);
        Ok(())
    }
}
