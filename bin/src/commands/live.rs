//! Live command implementation.
//!
//! Catches the aggregator up with stored data, then polls the source once
//! a minute until interrupted.

use crate::commands::ctrl_c_token;
use crate::context::Runtime;
use anyhow::{Context, Result};
use barwire_lib::{Level, LiveSession, LoggingDecision, SnapshotFile};
use std::path::Path;
use std::sync::Arc;

/// Run a live session for one asset.
pub(crate) async fn live(config: &Path, symbol: &str, levels: &[String]) -> Result<()> {
    let runtime = Runtime::load(config)?;
    let asset = runtime.asset(symbol)?;
    let decision = if levels.is_empty() {
        LoggingDecision::default()
    } else {
        let levels = levels
            .iter()
            .map(|s| s.parse::<Level>())
            .collect::<Result<Vec<_>, _>>()?;
        LoggingDecision::for_levels(levels)
    };

    let replay = runtime.replay(&asset, None);
    let (caught_up, sink) = replay
        .run(runtime.indicator_sink(&asset)?)
        .await
        .with_context(|| format!("Failed to catch up {asset} from storage"))?;
    tracing::info!(asset = %asset.symbol(), fed = caught_up.fed, "aggregator caught up");

    let aggregator = replay.aggregator(sink)?;
    let pipeline = runtime.pipeline(asset.clone(), runtime.downloader()?);
    let session = LiveSession::new(pipeline, aggregator, Arc::new(decision)).with_checkpoints(
        SnapshotFile::new(replay.snapshot_path()),
        runtime.config.checkpoint_every,
    );

    let (report, _) = session
        .run(ctrl_c_token())
        .await
        .with_context(|| format!("Live session failed for {asset}"))?;

    println!("Passes:       {}", report.passes);
    println!("Failed:       {}", report.failed_passes);
    println!("Samples fed:  {}", report.samples_fed);
    println!("Updates:      {}", report.updates);
    Ok(())
}
