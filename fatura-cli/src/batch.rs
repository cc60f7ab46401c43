//! Batch driver: one independent parse per document, bounded concurrency,
//! optional per-document timeout. A slow or broken statement fails alone.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result, bail};
use fatura_core::ParseResult;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio::time::{Duration, timeout};
use tracing::{info, warn};

use crate::output;

#[derive(Debug)]
pub enum Outcome {
    Parsed(Box<ParseResult>),
    /// Timed out or unreadable; equivalent to a header-level failure for
    /// this document only.
    Failed(String),
}

#[derive(Debug)]
pub struct DocumentOutcome {
    pub path: PathBuf,
    pub outcome: Outcome,
}

pub async fn run_batch(
    dir: PathBuf,
    jobs: usize,
    timeout_secs: u64,
    out_dir: Option<PathBuf>,
) -> Result<()> {
    let mut files: Vec<PathBuf> = std::fs::read_dir(&dir)
        .with_context(|| format!("reading {}", dir.display()))?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|path| path.extension().is_some_and(|ext| ext == "txt"))
        .collect();
    files.sort();
    if files.is_empty() {
        bail!("no .txt statements in {}", dir.display());
    }
    if let Some(out_dir) = &out_dir {
        std::fs::create_dir_all(out_dir)
            .with_context(|| format!("creating {}", out_dir.display()))?;
    }

    let semaphore = Arc::new(Semaphore::new(jobs.max(1)));
    let mut workers = JoinSet::new();
    for path in files {
        let semaphore = semaphore.clone();
        workers.spawn(async move {
            let _permit = semaphore.acquire_owned().await.expect("semaphore open");
            let outcome = parse_one(&path, timeout_secs).await;
            DocumentOutcome { path, outcome }
        });
    }

    let mut outcomes = Vec::new();
    while let Some(joined) = workers.join_next().await {
        outcomes.push(joined.context("worker panicked")?);
    }
    outcomes.sort_by(|a, b| a.path.cmp(&b.path));

    report(&outcomes, out_dir.as_deref())
}

async fn parse_one(path: &PathBuf, timeout_secs: u64) -> Outcome {
    let worker = tokio::task::spawn_blocking({
        let path = path.clone();
        move || std::fs::read(&path).map(|bytes| fatura_core::parse_statement_bytes(&bytes))
    });

    let joined = if timeout_secs == 0 {
        Ok(worker.await)
    } else {
        timeout(Duration::from_secs(timeout_secs), worker).await
    };

    match joined {
        Err(_) => Outcome::Failed(format!("timed out after {timeout_secs}s")),
        Ok(Err(join_err)) => Outcome::Failed(format!("worker failed: {join_err}")),
        Ok(Ok(Err(io_err))) => Outcome::Failed(format!("read failed: {io_err}")),
        Ok(Ok(Ok(result))) => Outcome::Parsed(Box::new(result)),
    }
}

fn report(outcomes: &[DocumentOutcome], out_dir: Option<&std::path::Path>) -> Result<()> {
    let mut parsed = 0usize;
    let mut failed = 0usize;
    let mut scores = Vec::new();

    for DocumentOutcome { path, outcome } in outcomes {
        let name = path.display();
        match outcome {
            Outcome::Failed(reason) => {
                warn!("{name}: {reason}");
                failed += 1;
            }
            Outcome::Parsed(result) if result.is_fatal() => {
                warn!("{name}: fatal header error, no transactions extracted");
                failed += 1;
            }
            Outcome::Parsed(result) => {
                parsed += 1;
                match &result.reconciliation {
                    Some(summary) => {
                        scores.push(summary.accuracy_score);
                        info!(
                            "{name}: {} transactions, {} warnings, accuracy {:.1}",
                            result.transactions.len(),
                            result.diagnostics.warning_count(),
                            summary.accuracy_score
                        );
                    }
                    None => info!(
                        "{name}: {} transactions, no declared total to reconcile",
                        result.transactions.len()
                    ),
                }
                if let Some(out_dir) = out_dir {
                    let out_path = out_dir
                        .join(path.file_stem().unwrap_or_default())
                        .with_extension("csv");
                    let file = std::fs::File::create(&out_path)
                        .with_context(|| format!("creating {}", out_path.display()))?;
                    output::write_csv(result, file)?;
                }
            }
        }
    }

    println!("\nDocuments: {} parsed, {} failed", parsed, failed);
    if !scores.is_empty() {
        let mean = scores.iter().sum::<f64>() / scores.len() as f64;
        println!("Mean accuracy over {} reconciled documents: {:.1}", scores.len(), mean);
    }
    Ok(())
}
