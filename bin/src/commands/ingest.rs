//! Ingest command implementation.
//!
//! Runs the historic pipeline for each selected asset, several at a time,
//! with a spinner per asset showing live status.

use crate::commands::ctrl_c_token;
use crate::context::Runtime;
use crate::display::{format_elapsed, spinner};
use anyhow::{Result, bail};
use barwire_lib::{DownloadOutcome, IngestReport, IngestionPipeline};
use futures::stream::{self, StreamExt};
use indicatif::{MultiProgress, ProgressBar};
use std::path::Path;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Execute the ingest command.
pub(crate) async fn ingest(
    config: &Path,
    symbols: &[String],
    parallel: usize,
    quiet: bool,
) -> Result<()> {
    let runtime = Runtime::load(config)?;
    let assets = runtime.select(symbols)?;
    let downloader = runtime.downloader()?;
    let cancel = ctrl_c_token();
    let multi_progress = MultiProgress::new();

    let results: Vec<_> = stream::iter(assets)
        .map(|asset| {
            let symbol = asset.symbol().to_string();
            let pipeline = runtime.pipeline(asset, downloader.clone());
            let pb = if quiet {
                ProgressBar::hidden()
            } else {
                multi_progress.add(spinner(&symbol))
            };
            let cancel = cancel.clone();
            async move {
                let result = ingest_one(&pipeline, cancel, &pb).await;
                (symbol, result)
            }
        })
        .buffer_unordered(parallel.max(1))
        .collect()
        .await;

    let mut failures = 0;
    if !quiet {
        println!(
            "\n{:<12} {:<12} {:>12} {:>10} {:>10}",
            "ASSET", "OUTCOME", "ROWS", "DROPPED", "TIME"
        );
        println!("{}", "-".repeat(60));
    }
    for (symbol, result) in &results {
        match result {
            Ok(report) if !quiet => println!(
                "{:<12} {:<12} {:>12} {:>10} {:>10}",
                symbol,
                outcome_label(report.outcome),
                report.written.rows_written,
                report.dropped,
                format_elapsed(report.elapsed),
            ),
            Ok(_) => {}
            Err(e) => {
                failures += 1;
                eprintln!("{symbol:<12} failed: {e:#}");
            }
        }
    }

    if failures > 0 {
        bail!("{failures} out of {} assets failed", results.len());
    }
    Ok(())
}

async fn ingest_one(
    pipeline: &IngestionPipeline,
    cancel: CancellationToken,
    pb: &ProgressBar,
) -> Result<IngestReport> {
    let status = pipeline.status();
    let run = pipeline.run(cancel);
    tokio::pin!(run);

    let mut ticker = tokio::time::interval(Duration::from_millis(500));
    let result = loop {
        tokio::select! {
            result = &mut run => break result,
            _ = ticker.tick() => pb.set_message(status.snapshot().to_string()),
        }
    };

    match &result {
        Ok(report) => pb.finish_with_message(format!(
            "{} rows, {}",
            report.written.rows_written,
            outcome_label(report.outcome)
        )),
        Err(e) => pb.abandon_with_message(format!("failed: {e}")),
    }
    Ok(result?)
}

const fn outcome_label(outcome: DownloadOutcome) -> &'static str {
    match outcome {
        DownloadOutcome::CaughtUp => "caught up",
        DownloadOutcome::MarketClosed => "closed",
        DownloadOutcome::Cancelled => "cancelled",
    }
}
