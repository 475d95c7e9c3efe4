//! schemalens CLI
//!
//! Parse, convert, diff and check database schema sources.

use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing::{Level, debug, warn};
use tracing_subscriber::FmtSubscriber;

use schemalens::{Dialect, NormalizedSchema, ParsingResult, analyze, diff, generate, parse};

/// Normalize SQL, Prisma and Drizzle schemas.
#[derive(Parser)]
#[command(name = "schemalens")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Output file (default: stdout).
    #[arg(short, long, global = true)]
    output: Option<PathBuf>,

    /// Pretty-print JSON output.
    #[arg(long, global = true)]
    pretty: bool,

    /// Enable verbose output.
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Parse a schema file and print the parsing result.
    Parse {
        file: PathBuf,

        /// Source dialect (detected from the content if not specified).
        #[arg(short, long, env = "SCHEMALENS_DIALECT")]
        dialect: Option<Dialect>,
    },

    /// Compare two normalized schema JSON files.
    Diff { before: PathBuf, after: PathBuf },

    /// Parse a schema file and render it in another dialect.
    Convert {
        file: PathBuf,

        /// Source dialect (detected from the content if not specified).
        #[arg(short, long, env = "SCHEMALENS_DIALECT")]
        from: Option<Dialect>,

        /// Target dialect.
        #[arg(short, long)]
        to: Dialect,
    },

    /// Parse a schema file and report common design problems.
    Analyze {
        file: PathBuf,

        /// Source dialect (detected from the content if not specified).
        #[arg(short, long, env = "SCHEMALENS_DIALECT")]
        dialect: Option<Dialect>,
    },
}

fn main() -> anyhow::Result<ExitCode> {
    let cli = Cli::parse();

    // Logs go to stderr; stdout carries the result.
    let log_level = if cli.verbose {
        Level::DEBUG
    } else {
        Level::WARN
    };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_target(false)
        .without_time()
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    match cli.command {
        Commands::Parse { file, dialect } => {
            let result = parse_file(&file, dialect)?;
            emit(cli.output.as_deref(), &to_json(&result, cli.pretty)?)?;
            if result.is_error() {
                return Ok(ExitCode::FAILURE);
            }
        }

        Commands::Diff { before, after } => {
            let before = read_schema(&before)?;
            let after = read_schema(&after)?;
            let changes = diff(&before, &after);
            emit(cli.output.as_deref(), &to_json(&changes, cli.pretty)?)?;
        }

        Commands::Convert { file, from, to } => {
            let result = parse_file(&file, from)?;
            if result.is_error() {
                for error in &result.errors {
                    eprintln!("{error}");
                }
                return Ok(ExitCode::FAILURE);
            }
            for warning in &result.warnings {
                warn!("{warning}");
            }
            emit(cli.output.as_deref(), &generate(&result.schema, to))?;
        }

        Commands::Analyze { file, dialect } => {
            let result = parse_file(&file, dialect)?;
            if result.is_error() {
                for error in &result.errors {
                    eprintln!("{error}");
                }
                return Ok(ExitCode::FAILURE);
            }
            let findings = analyze(&result.schema);
            emit(cli.output.as_deref(), &to_json(&findings, cli.pretty)?)?;
        }
    }

    Ok(ExitCode::SUCCESS)
}

fn parse_file(path: &Path, dialect: Option<Dialect>) -> anyhow::Result<ParsingResult> {
    let input = fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    let dialect = dialect.unwrap_or_else(|| Dialect::detect(&input));
    debug!(%dialect, file = %path.display(), "parsing");
    Ok(parse(&input, dialect))
}

fn read_schema(path: &Path) -> anyhow::Result<NormalizedSchema> {
    let input = fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    serde_json::from_str(&input).with_context(|| format!("Invalid schema JSON in {}", path.display()))
}

fn to_json<T: serde::Serialize>(value: &T, pretty: bool) -> anyhow::Result<String> {
    let json = if pretty {
        serde_json::to_string_pretty(value)?
    } else {
        serde_json::to_string(value)?
    };
    Ok(json + "\n")
}

fn emit(output: Option<&Path>, text: &str) -> anyhow::Result<()> {
    match output {
        Some(path) => {
            fs::write(path, text).with_context(|| format!("Failed to write {}", path.display()))
        }
        None => {
            print!("{text}");
            Ok(())
        }
    }
}
