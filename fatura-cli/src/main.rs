use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use fatura_core::Severity;
use tracing::warn;

mod batch;
mod output;

#[derive(Parser, Debug)]
#[command(name = "fatura", version, about = "Extract transactions from Itaú statement text")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Parse one extracted statement text file and emit CSV (or JSON)
    Parse {
        /// Statement text file (UTF-8, one line per printed row)
        input: PathBuf,

        /// Write output here instead of stdout
        #[arg(long)]
        out: Option<PathBuf>,

        /// Emit the full parse result as JSON instead of transaction CSV
        #[arg(long)]
        json: bool,
    },

    /// Parse every .txt statement in a directory
    Batch {
        dir: PathBuf,

        /// Worker pool size
        #[arg(long, default_value_t = 4)]
        jobs: usize,

        /// Per-document timeout in seconds (0 disables it)
        #[arg(long, default_value_t = 30)]
        timeout_secs: u64,

        /// Write one CSV per document into this directory
        #[arg(long)]
        out_dir: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match cli.command {
        Command::Parse { input, out, json } => run_parse(input, out, json),
        Command::Batch {
            dir,
            jobs,
            timeout_secs,
            out_dir,
        } => batch::run_batch(dir, jobs, timeout_secs, out_dir).await,
    }
}

fn run_parse(input: PathBuf, out: Option<PathBuf>, json: bool) -> Result<()> {
    let bytes =
        std::fs::read(&input).with_context(|| format!("reading {}", input.display()))?;
    let result = fatura_core::parse_statement_bytes(&bytes);

    for diagnostic in result.diagnostics.iter() {
        match diagnostic.severity {
            Severity::Error => warn!(
                "line {}: {:?}: {}",
                diagnostic.line_number, diagnostic.kind, diagnostic.message
            ),
            Severity::Warning => warn!(
                "line {}: {:?} (kept): {}",
                diagnostic.line_number, diagnostic.kind, diagnostic.message
            ),
        }
    }

    if result.is_fatal() {
        bail!("{}: unrecognizable statement (header error)", input.display());
    }

    if let Some(summary) = &result.reconciliation {
        tracing::info!(
            "{} transactions, declared {} vs extracted {}, accuracy {:.1}",
            result.transactions.len(),
            summary.declared_total,
            summary.extracted_total,
            summary.accuracy_score
        );
    }

    match out {
        Some(path) => {
            let file = std::fs::File::create(&path)
                .with_context(|| format!("creating {}", path.display()))?;
            render(&result, file, json)?;
        }
        None => render(&result, std::io::stdout().lock(), json)?,
    }
    Ok(())
}

fn render(result: &fatura_core::ParseResult, writer: impl std::io::Write, json: bool) -> Result<()> {
    if json {
        output::write_json(result, writer)
    } else {
        output::write_csv(result, writer)
    }
}
