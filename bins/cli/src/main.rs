//! CLI binary entrypoint.

mod commands;
mod error;
mod format;

use clap::{Args, Parser, Subcommand, ValueEnum};
use commands::{
    ReadCommandInput, SearchCommandInput, run_books, run_parse, run_read, run_search,
};
use error::{CliError, ErrorDto, ExitCode};
use format::{OutputArgs, OutputMode, to_ndjson_line, to_pretty_json_line};
use lectern_domain::Testament;
use lectern_infra::{InfraError, load_effective_config_json};
use std::collections::BTreeMap;
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

const ENV_PREFIX: &str = "LECTERN_";

#[derive(Debug, Parser)]
#[command(
    name = "lectern",
    version,
    about = "Scripture reference resolution and chapter retrieval",
    long_about = None
)]
struct Cli {
    #[command(flatten)]
    output: OutputArgs,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Resolve a reference such as `John 3:16` to its canonical form.
    Parse {
        /// Reference text.
        reference: String,
    },
    /// List the book catalog.
    Books {
        /// Only list one testament.
        #[arg(long, value_enum)]
        testament: Option<TestamentArg>,
    },
    /// Open a chapter, optionally citing selected verses.
    Read {
        /// Reference text; omit to open the configured default.
        reference: Option<String>,
        /// Version code (`NLT` or `KJV`).
        #[arg(long)]
        version: Option<String>,
        /// Verses to cite, e.g. `16-18,20`.
        #[arg(long)]
        select: Option<String>,
        #[command(flatten)]
        source: SourceArgs,
    },
    /// Search verse text.
    Search {
        /// Search query text.
        query: Option<String>,
        /// Read the query text from stdin.
        #[arg(long, conflicts_with = "query")]
        stdin: bool,
        /// Version code (`NLT` or `KJV`).
        #[arg(long)]
        version: Option<String>,
        /// Maximum number of results.
        #[arg(long)]
        limit: Option<u32>,
        #[command(flatten)]
        source: SourceArgs,
    },
    /// Config-related commands.
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
}

/// Config and content source flags shared by `read` and `search`.
#[derive(Debug, Args)]
struct SourceArgs {
    /// Optional config file path (JSON/TOML).
    #[arg(long)]
    config: Option<PathBuf>,
    /// Content source (`file` or `http`).
    #[arg(long)]
    source: Option<String>,
    /// Directory holding `<version>.json` bible files.
    #[arg(long)]
    data_dir: Option<PathBuf>,
    /// Content API base URL.
    #[arg(long)]
    base_url: Option<String>,
}

#[derive(Debug, Subcommand)]
enum ConfigCommands {
    /// Validate config loading, merging, and normalization.
    Check {
        /// Optional config file path (JSON/TOML).
        #[arg(long)]
        path: Option<PathBuf>,
        /// Optional JSON overrides (partial config).
        #[arg(long)]
        overrides_json: Option<String>,
    },
    /// Show the effective config after applying overrides.
    Show {
        /// Optional config file path (JSON/TOML).
        #[arg(long)]
        path: Option<PathBuf>,
        /// Optional JSON overrides (partial config).
        #[arg(long)]
        overrides_json: Option<String>,
    },
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum TestamentArg {
    Old,
    New,
}

impl From<TestamentArg> for Testament {
    fn from(value: TestamentArg) -> Self {
        match value {
            TestamentArg::Old => Self::Old,
            TestamentArg::New => Self::New,
        }
    }
}

pub(crate) struct CliOutput {
    stdout: String,
    stderr: String,
    exit_code: ExitCode,
}

fn main() -> std::process::ExitCode {
    init_tracing();
    let cli = Cli::parse();
    let mode = OutputMode::from_args(&cli.output);

    match run(&cli.command, mode) {
        Ok(output) => match write_output(&output) {
            Ok(()) => std::process::ExitCode::from(output.exit_code.as_u8()),
            Err(error) => exit_with_error(&error),
        },
        Err(error) => exit_with_error(&error),
    }
}

/// Diagnostics go to stderr, filtered by `RUST_LOG` (off by default).
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("off"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .try_init();
}

fn exit_with_error(error: &CliError) -> std::process::ExitCode {
    let _ = writeln!(io::stderr(), "error: {error}");
    std::process::ExitCode::from(error.exit_code().as_u8())
}

fn run(command: &Commands, mode: OutputMode) -> Result<CliOutput, CliError> {
    tracing::debug!(?command, "running command");
    match command {
        Commands::Parse { reference } => run_parse(mode, reference),
        Commands::Books { testament } => run_books(mode, testament.map(Testament::from)),
        Commands::Read {
            reference,
            version,
            select,
            source,
        } => {
            let overrides = build_overrides_json(source, None)?;
            run_read(
                mode,
                &ReadCommandInput {
                    config_path: source.config.as_deref(),
                    overrides_json: overrides.as_deref(),
                    reference: reference.as_deref().unwrap_or_default(),
                    version: version.as_deref(),
                    select: select.as_deref(),
                },
            )
        },
        Commands::Search {
            query,
            stdin,
            version,
            limit,
            source,
        } => {
            let query = resolve_query(*stdin, query.as_deref())?;
            let overrides = build_overrides_json(source, *limit)?;
            run_search(
                mode,
                &SearchCommandInput {
                    config_path: source.config.as_deref(),
                    overrides_json: overrides.as_deref(),
                    query: &query,
                    version: version.as_deref(),
                },
            )
        },
        Commands::Config { command } => match command {
            ConfigCommands::Check {
                path,
                overrides_json,
            } => config_check(mode, path.as_deref(), overrides_json.as_deref()),
            ConfigCommands::Show {
                path,
                overrides_json,
            } => config_show(mode, path.as_deref(), overrides_json.as_deref()),
        },
    }
}

/// Partial config JSON for the source flags and search limit.
fn build_overrides_json(
    source: &SourceArgs,
    limit: Option<u32>,
) -> Result<Option<String>, CliError> {
    let mut source_map = serde_json::Map::new();
    if let Some(kind) = source.source.as_deref() {
        source_map.insert("kind".to_owned(), kind.trim().to_ascii_lowercase().into());
    }
    if let Some(dir) = source.data_dir.as_deref() {
        source_map.insert("dataDir".to_owned(), dir.to_string_lossy().into_owned().into());
    }
    if let Some(url) = source.base_url.as_deref() {
        source_map.insert("baseUrl".to_owned(), url.into());
    }

    let mut root = serde_json::Map::new();
    if !source_map.is_empty() {
        root.insert("source".to_owned(), serde_json::Value::Object(source_map));
    }
    if let Some(limit) = limit {
        root.insert("search".to_owned(), serde_json::json!({ "limit": limit }));
    }
    if root.is_empty() {
        return Ok(None);
    }
    Ok(Some(serde_json::to_string(&serde_json::Value::Object(root))?))
}

fn config_check(
    mode: OutputMode,
    path: Option<&Path>,
    overrides_json: Option<&str>,
) -> Result<CliOutput, CliError> {
    let env = collect_scoped_env(ENV_PREFIX);
    config_check_with_env(mode, &env, path, overrides_json)
}

fn config_check_with_env(
    mode: OutputMode,
    env: &BTreeMap<String, String>,
    path: Option<&Path>,
    overrides_json: Option<&str>,
) -> Result<CliOutput, CliError> {
    if let Err(error) = load_effective_config_json(env, path, overrides_json) {
        return Ok(format_error_output(mode, &error, ExitCode::InvalidInput));
    }

    let mut stderr = String::new();
    log_info(&mut stderr, "config check completed", mode.status_lines);

    let stdout = if mode.is_ndjson() {
        format_ndjson_summary("ok", "config")
    } else if mode.is_json() {
        to_pretty_json_line(&serde_json::json!({
            "status": "ok",
            "configPath": path.map(|value| value.to_string_lossy().to_string()),
        }))?
    } else {
        path.map_or_else(
            || "status: ok\nconfig: ok\n".to_string(),
            |path| format!("status: ok\nconfig: ok\npath: {}\n", path.to_string_lossy()),
        )
    };

    Ok(CliOutput {
        stdout,
        stderr,
        exit_code: ExitCode::Ok,
    })
}

fn config_show(
    mode: OutputMode,
    path: Option<&Path>,
    overrides_json: Option<&str>,
) -> Result<CliOutput, CliError> {
    let env = collect_scoped_env(ENV_PREFIX);
    config_show_with_env(mode, &env, path, overrides_json)
}

fn config_show_with_env(
    mode: OutputMode,
    env: &BTreeMap<String, String>,
    path: Option<&Path>,
    overrides_json: Option<&str>,
) -> Result<CliOutput, CliError> {
    let config_json = match load_effective_config_json(env, path, overrides_json) {
        Ok(config) => config,
        Err(error) => return Ok(format_error_output(mode, &error, ExitCode::InvalidInput)),
    };

    let mut stderr = String::new();
    log_info(&mut stderr, "config show completed", mode.status_lines);

    let stdout = if mode.is_json() || mode.is_ndjson() {
        let config_value: serde_json::Value = serde_json::from_str(config_json.trim())?;
        let payload = serde_json::json!({
            "status": "ok",
            "configPath": path.map(|value| value.to_string_lossy().to_string()),
            "effectiveConfig": config_value,
        });
        if mode.is_ndjson() {
            to_ndjson_line(&payload)?
        } else {
            to_pretty_json_line(&payload)?
        }
    } else {
        let mut out = String::new();
        out.push_str("status: ok\nconfig:\n");
        out.push_str(&config_json);
        out
    };

    Ok(CliOutput {
        stdout,
        stderr,
        exit_code: ExitCode::Ok,
    })
}

pub(crate) fn format_error_output(
    mode: OutputMode,
    error: &InfraError,
    exit_code: ExitCode,
) -> CliOutput {
    let dto = ErrorDto::from_envelope(error);

    let mut stderr = String::new();
    log_info(&mut stderr, "command failed", mode.status_lines);

    let stdout = if mode.is_ndjson() {
        format_ndjson_error(&dto)
    } else if mode.is_json() {
        let payload = serde_json::json!({
            "status": "error",
            "error": dto,
        });

        // This is a CLI boundary, so JSON serialization errors are internal.
        to_pretty_json_line(&payload).unwrap_or_else(|_| {
            "{\"status\":\"error\",\"error\":{\"code\":\"core:internal\",\"message\":\"internal error\",\"kind\":\"INVARIANT\"}}\n".to_string()
        })
    } else {
        format_error_text(&dto)
    };

    CliOutput {
        stdout,
        stderr,
        exit_code,
    }
}

fn resolve_query(from_stdin: bool, query: Option<&str>) -> Result<String, CliError> {
    if from_stdin {
        return read_stdin_query();
    }
    query
        .map(str::to_owned)
        .ok_or_else(|| CliError::InvalidInput("missing query or --stdin".to_string()))
}

fn read_stdin_query() -> Result<String, CliError> {
    let mut buf = String::new();
    io::stdin().read_to_string(&mut buf)?;
    let trimmed = buf.trim();
    if trimmed.is_empty() {
        return Err(CliError::InvalidInput("stdin query is empty".to_string()));
    }
    Ok(trimmed.to_string())
}

fn format_error_text(error: &ErrorDto) -> String {
    let mut out = String::new();
    out.push_str("status: error\n");
    out.push_str("code: ");
    out.push_str(&error.code);
    out.push('\n');
    out.push_str("message: ");
    out.push_str(&error.message);
    out.push('\n');
    out.push_str("kind: ");
    out.push_str(error.kind);
    out.push('\n');
    if error.retriable {
        out.push_str("retriable: true\n");
    }

    if let Some(meta) = error.meta.as_ref()
        && !meta.is_empty()
    {
        out.push_str("meta:\n");
        for (key, value) in meta {
            out.push_str("  ");
            out.push_str(key);
            out.push_str(": ");
            out.push_str(value);
            out.push('\n');
        }
    }

    out
}

pub(crate) fn log_info(stderr: &mut String, message: &str, status_lines: bool) {
    if !status_lines {
        return;
    }
    stderr.push_str("info: ");
    stderr.push_str(message);
    stderr.push('\n');
}

fn format_ndjson_summary(status: &str, kind: &str) -> String {
    let payload = serde_json::json!({
        "type": "summary",
        "status": status,
        "kind": kind,
    });
    to_ndjson_line(&payload).unwrap_or_else(|_| {
        "{\"type\":\"summary\",\"status\":\"error\",\"kind\":\"internal\"}\n".to_string()
    })
}

fn format_ndjson_error(error: &ErrorDto) -> String {
    let payload = serde_json::json!({
        "type": "error",
        "status": "error",
        "error": error,
    });
    to_ndjson_line(&payload).unwrap_or_else(|_| {
        "{\"type\":\"error\",\"status\":\"error\",\"error\":{\"code\":\"core:internal\",\"message\":\"internal error\",\"kind\":\"INVARIANT\"}}\n".to_string()
    })
}

fn write_output(output: &CliOutput) -> Result<(), CliError> {
    let mut stdout = io::stdout();
    stdout.write_all(output.stdout.as_bytes())?;

    if !output.stderr.is_empty() {
        let mut stderr = io::stderr();
        stderr.write_all(output.stderr.as_bytes())?;
        stderr.flush()?;
    }

    Ok(())
}

fn collect_scoped_env(prefix: &str) -> BTreeMap<String, String> {
    std::env::vars()
        .filter(|(key, _)| key.starts_with(prefix))
        .collect()
}
