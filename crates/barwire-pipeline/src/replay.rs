//! Replay of stored samples through an aggregator.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use barwire_aggregate::{Aggregator, AggregatorSnapshot, Sink};
use barwire_calendar::TradingCalendar;
use barwire_store::{SnapshotFile, Storage};
use barwire_types::Asset;
use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::info;

use crate::Result;

/// Summary of a replay.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ReplayReport {
    /// Samples fed during this replay.
    pub fed: u64,
    /// Stored samples skipped because a snapshot already covered them.
    pub skipped: u64,
    /// Checkpoints written.
    pub checkpoints: u64,
    /// Boundary repairs performed, including before a resume.
    pub repairs: u64,
    /// Last sample fed, including before a resume.
    pub last_time: Option<DateTime<Utc>>,
}

/// Feeds an asset's stored series into an aggregator, checkpointing
/// periodically so an interrupted replay resumes where it stopped.
#[derive(Debug, Clone)]
pub struct Replay {
    asset: Asset,
    storage: Arc<dyn Storage>,
    calendar: Arc<dyn TradingCalendar>,
    checkpoint_every: u64,
    snapshot: SnapshotFile,
}

impl Replay {
    /// Creates a replay that keeps its aggregator snapshot in `state_dir`.
    pub fn new(
        asset: Asset,
        storage: Arc<dyn Storage>,
        calendar: Arc<dyn TradingCalendar>,
        state_dir: &Path,
    ) -> Self {
        Self {
            snapshot: SnapshotFile::new(snapshot_path(state_dir)),
            asset,
            storage,
            calendar,
            checkpoint_every: 250_000,
        }
    }

    /// Sets how many samples pass between checkpoints.
    #[must_use]
    pub fn with_checkpoint_every(mut self, samples: u64) -> Self {
        self.checkpoint_every = samples.max(1);
        self
    }

    /// Returns the aggregator snapshot location.
    #[must_use]
    pub fn snapshot_path(&self) -> &Path {
        self.snapshot.path()
    }

    /// Restores the aggregator from its snapshot, or creates a fresh one.
    ///
    /// # Errors
    ///
    /// Returns an error if the snapshot exists but cannot be used.
    pub fn aggregator<S: Sink>(&self, sink: S) -> Result<Aggregator<S>> {
        let calendar = Arc::clone(&self.calendar);
        Ok(match self.snapshot.load::<AggregatorSnapshot>()? {
            Some(snapshot) => Aggregator::restore(snapshot, calendar, sink)?,
            None => Aggregator::new(self.asset.id(), calendar, sink),
        })
    }

    /// Checkpoints the sink, then atomically stores the aggregator state.
    ///
    /// # Errors
    ///
    /// Returns an error if either write fails.
    pub fn checkpoint<S: Sink>(&self, aggregator: &mut Aggregator<S>) -> Result<()> {
        let snapshot = aggregator.checkpoint()?;
        self.snapshot.save(&snapshot)?;
        Ok(())
    }

    /// Replays every stored sample not yet covered by the snapshot.
    ///
    /// Returns the report and the sink.
    ///
    /// # Errors
    ///
    /// Returns an error if loading, aggregation or checkpointing fails.
    pub async fn run<S: Sink>(&self, sink: S) -> Result<(ReplayReport, S)> {
        let mut aggregator = self.aggregator(sink)?;
        let resume_after = aggregator.last_time();
        let samples = self.storage.load(&self.asset).await?;
        info!(
            asset = %self.asset.symbol(),
            stored = samples.len(),
            resume_after = ?resume_after,
            "replay started"
        );

        let mut report = ReplayReport::default();
        let mut since_checkpoint = 0;
        for sample in &samples {
            if resume_after.is_some_and(|last| sample.time <= last) {
                report.skipped += 1;
                continue;
            }
            aggregator.feed(sample)?;
            report.fed += 1;
            since_checkpoint += 1;
            if since_checkpoint >= self.checkpoint_every {
                self.checkpoint(&mut aggregator)?;
                report.checkpoints += 1;
                since_checkpoint = 0;
            }
        }
        if since_checkpoint > 0 {
            self.checkpoint(&mut aggregator)?;
            report.checkpoints += 1;
        }

        report.repairs = aggregator.repairs();
        report.last_time = aggregator.last_time();
        info!(
            asset = %self.asset.symbol(),
            fed = report.fed,
            skipped = report.skipped,
            repairs = report.repairs,
            "replay finished"
        );
        Ok((report, aggregator.into_sink()))
    }
}

fn snapshot_path(state_dir: &Path) -> PathBuf {
    state_dir.join("aggregator.json")
}
