//! Replay command implementation.

use crate::context::Runtime;
use crate::display::format_values;
use anyhow::{Context, Result};
use barwire_lib::Level;
use std::path::Path;
use std::time::Instant;

/// Aggregate stored data for each asset through its indicator sink.
pub(crate) async fn replay(
    config: &Path,
    symbols: &[String],
    checkpoint_every: Option<u64>,
) -> Result<()> {
    let runtime = Runtime::load(config)?;

    for asset in runtime.select(symbols)? {
        let started = Instant::now();
        let sink = runtime.indicator_sink(&asset)?;
        let replay = runtime.replay(&asset, checkpoint_every);
        let (report, sink) = replay
            .run(sink)
            .await
            .with_context(|| format!("Replay failed for {asset}"))?;

        println!("{asset}");
        println!("  Fed:         {}", report.fed);
        println!("  Skipped:     {}", report.skipped);
        println!("  Checkpoints: {}", report.checkpoints);
        println!("  Repairs:     {}", report.repairs);
        if let Some(last) = report.last_time {
            println!("  Last sample: {}", last.format("%Y-%m-%d %H:%M"));
        }
        println!("  Took:        {:.1?}", started.elapsed());

        for level in [Level::H1, Level::D1] {
            if let Some(row) = sink.latest(level) {
                println!("  {level:<4} {}", format_values(&sink.columns(level), row));
            }
        }
    }
    Ok(())
}
