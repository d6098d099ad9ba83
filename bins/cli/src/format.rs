//! Output format helpers for CLI commands.

use clap::{Args, ValueEnum};

/// Output format choices for CLI responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Human-friendly text output.
    Text,
    /// Machine-friendly JSON output.
    Json,
    /// Line-delimited JSON (NDJSON) output.
    Ndjson,
}

/// Output-related CLI flags.
#[derive(Debug, Args)]
pub struct OutputArgs {
    /// Response format on stdout (default `text`).
    #[arg(long, global = true, value_enum)]
    pub output: Option<OutputFormat>,
    /// Shorthand for `--output json`.
    #[arg(long, global = true)]
    pub json: bool,
    /// Scripted use: NDJSON responses and no `info:` lines on stderr.
    #[arg(long, global = true)]
    pub agent: bool,
    /// Omit the `info:` status lines written to stderr.
    #[arg(long, global = true, visible_alias = "no-progress")]
    pub quiet: bool,
}

/// How a command renders its response and stderr status lines.
#[derive(Debug, Clone, Copy)]
pub struct OutputMode {
    pub format: OutputFormat,
    /// Write `info:` status lines to stderr.
    pub status_lines: bool,
}

impl OutputMode {
    /// Resolve flags: an explicit `--output` wins over `--json`, which wins
    /// over `--agent`.
    #[must_use]
    pub const fn from_args(args: &OutputArgs) -> Self {
        let format = match args.output {
            Some(format) => format,
            None if args.json => OutputFormat::Json,
            None if args.agent => OutputFormat::Ndjson,
            None => OutputFormat::Text,
        };

        Self {
            format,
            status_lines: !(args.agent || args.quiet),
        }
    }

    /// Returns true when JSON output is requested.
    #[must_use]
    pub const fn is_json(self) -> bool {
        matches!(self.format, OutputFormat::Json)
    }

    /// Returns true when NDJSON output is requested.
    #[must_use]
    pub const fn is_ndjson(self) -> bool {
        matches!(self.format, OutputFormat::Ndjson)
    }
}

/// Pretty JSON with a trailing newline.
pub fn to_pretty_json_line(value: &serde_json::Value) -> Result<String, serde_json::Error> {
    let mut out = serde_json::to_string_pretty(value)?;
    out.push('\n');
    Ok(out)
}

/// Compact JSON with a trailing newline.
pub fn to_ndjson_line(value: &serde_json::Value) -> Result<String, serde_json::Error> {
    let mut out = serde_json::to_string(value)?;
    out.push('\n');
    Ok(out)
}
