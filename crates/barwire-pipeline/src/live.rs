//! Live session: minute polling, aggregation and decisions.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use barwire_aggregate::Aggregator;
use barwire_calendar::{Clock, SystemClock};
use barwire_indicators::{IndicatorSink, OutputRow};
use barwire_store::SnapshotFile;
use barwire_types::{Level, Sample};
use chrono::Timelike;
use serde::Serialize;
use tokio::sync::mpsc;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::{IngestionPipeline, PipelineError, Result};

/// One indicator row delivered to the decision task.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LiveUpdate {
    /// Asset symbol.
    pub asset: String,
    /// Indicator output for one level.
    pub row: OutputRow,
}

/// Consumer of live indicator output.
#[async_trait]
pub trait DecisionMaker: Send + Sync + std::fmt::Debug {
    /// Handles one update. Errors are logged and do not stop the session.
    async fn decide(&self, update: LiveUpdate) -> anyhow::Result<()>;
}

/// Logs completed rows of the chosen levels.
#[derive(Debug, Clone)]
pub struct LoggingDecision {
    levels: Vec<Level>,
}

impl Default for LoggingDecision {
    fn default() -> Self {
        Self {
            levels: Level::ALL.to_vec(),
        }
    }
}

impl LoggingDecision {
    /// Logs only the given levels.
    #[must_use]
    pub fn for_levels(levels: impl IntoIterator<Item = Level>) -> Self {
        Self {
            levels: levels.into_iter().collect(),
        }
    }
}

#[async_trait]
impl DecisionMaker for LoggingDecision {
    async fn decide(&self, update: LiveUpdate) -> anyhow::Result<()> {
        let row = &update.row;
        if !self.levels.contains(&row.level) {
            return Ok(());
        }
        if row.complete {
            info!(asset = %update.asset, level = %row.level, as_of = %row.as_of, values = ?row.values, "bar closed");
        } else {
            debug!(asset = %update.asset, level = %row.level, as_of = %row.as_of, "bar updated");
        }
        Ok(())
    }
}

/// Summary of a live session.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct LiveReport {
    /// Ingestion passes started.
    pub passes: u64,
    /// Passes that ended in an error.
    pub failed_passes: u64,
    /// Samples fed to the aggregator.
    pub samples_fed: u64,
    /// Updates handed to the decision task.
    pub updates: u64,
}

#[derive(Debug, Default)]
struct LiveCounters {
    passes: AtomicU64,
    failed_passes: AtomicU64,
    samples_fed: AtomicU64,
    updates: AtomicU64,
}

impl LiveCounters {
    fn report(&self) -> LiveReport {
        LiveReport {
            passes: self.passes.load(Ordering::Relaxed),
            failed_passes: self.failed_passes.load(Ordering::Relaxed),
            samples_fed: self.samples_fed.load(Ordering::Relaxed),
            updates: self.updates.load(Ordering::Relaxed),
        }
    }
}

/// Keeps an asset's aggregator current with the source.
///
/// Once per wall-clock minute an ingestion pass runs with the processor
/// tee feeding the aggregator; indicator rows go through one FIFO channel
/// to a drain task that calls the [`DecisionMaker`]. A display task logs
/// status every `display_every`.
#[derive(Debug)]
pub struct LiveSession {
    pipeline: IngestionPipeline,
    aggregator: Aggregator<IndicatorSink>,
    decision: Arc<dyn DecisionMaker>,
    clock: Arc<dyn Clock>,
    snapshot: Option<SnapshotFile>,
    checkpoint_every: u64,
    poll_every: Duration,
    display_every: Duration,
}

impl LiveSession {
    /// Creates a session polling once a minute.
    pub fn new(
        pipeline: IngestionPipeline,
        aggregator: Aggregator<IndicatorSink>,
        decision: Arc<dyn DecisionMaker>,
    ) -> Self {
        Self {
            pipeline,
            aggregator,
            decision,
            clock: Arc::new(SystemClock),
            snapshot: None,
            checkpoint_every: 250_000,
            poll_every: Duration::from_secs(60),
            display_every: Duration::from_secs(60),
        }
    }

    /// Checkpoints the aggregator into `snapshot` every `every` samples and
    /// when the session ends.
    #[must_use]
    pub fn with_checkpoints(mut self, snapshot: SnapshotFile, every: u64) -> Self {
        self.snapshot = Some(snapshot);
        self.checkpoint_every = every.max(1);
        self
    }

    /// Overrides the polling and display periods.
    #[must_use]
    pub const fn with_intervals(mut self, poll_every: Duration, display_every: Duration) -> Self {
        self.poll_every = poll_every;
        self.display_every = display_every;
        self
    }

    /// Replaces the clock used to align polls to the minute.
    #[must_use]
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Runs until `cancel` fires, then checkpoints and returns the
    /// aggregator with a report.
    ///
    /// # Errors
    ///
    /// Returns an error if the aggregator rejects a sample or a checkpoint
    /// fails. Failed ingestion passes are logged and retried next minute.
    pub async fn run(
        self,
        cancel: CancellationToken,
    ) -> Result<(LiveReport, Aggregator<IndicatorSink>)> {
        let Self {
            pipeline,
            mut aggregator,
            decision,
            clock,
            snapshot,
            checkpoint_every,
            poll_every,
            display_every,
        } = self;
        let symbol = pipeline.asset().symbol().to_string();
        let counters = Arc::new(LiveCounters::default());

        let (updates_tx, updates_rx) = mpsc::channel::<LiveUpdate>(1024);
        let drain = tokio::spawn(drain_updates(updates_rx, decision, Arc::clone(&counters)));
        let display = tokio::spawn(display_status(
            pipeline.clone(),
            Arc::clone(&counters),
            display_every,
            cancel.clone(),
        ));

        let now = clock.now();
        let to_next_minute = Duration::from_secs(u64::from(60 - now.second()));
        let mut ticker = tokio::time::interval_at(Instant::now() + to_next_minute, poll_every);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        let mut since_checkpoint = 0u64;
        let mut first = true;
        let outcome = loop {
            if !first {
                tokio::select! {
                    biased;
                    () = cancel.cancelled() => break Ok(()),
                    _ = ticker.tick() => {}
                }
            }
            first = false;
            counters.passes.fetch_add(1, Ordering::Relaxed);

            let (tee_tx, mut tee_rx) = mpsc::channel::<Vec<Sample>>(16);
            let pass_cancel = cancel.child_token();
            let ingest = pipeline.run_with_tee(pass_cancel, tee_tx);
            let feed = async {
                let mut fed = 0u64;
                while let Some(batch) = tee_rx.recv().await {
                    for sample in &batch {
                        if aggregator.last_time().is_some_and(|last| sample.time <= last) {
                            continue;
                        }
                        aggregator.feed(sample)?;
                        fed += 1;
                    }
                    for row in aggregator.sink_mut().drain_rows() {
                        let update = LiveUpdate {
                            asset: symbol.clone(),
                            row,
                        };
                        if updates_tx.send(update).await.is_err() {
                            return Err(PipelineError::ChannelClosed("decision queue"));
                        }
                    }
                }
                Ok::<_, PipelineError>(fed)
            };
            let (ingested, fed) = tokio::join!(ingest, feed);

            let fed = match fed {
                Ok(fed) => fed,
                Err(e) => break Err(e),
            };
            counters.samples_fed.fetch_add(fed, Ordering::Relaxed);
            since_checkpoint += fed;

            match ingested {
                Ok(report) => debug!(asset = %symbol, rows = report.written.rows_written, fed, "live pass done"),
                Err(PipelineError::Cancelled { .. }) if cancel.is_cancelled() => break Ok(()),
                Err(e) => {
                    counters.failed_passes.fetch_add(1, Ordering::Relaxed);
                    warn!(asset = %symbol, error = %e, "live pass failed, retrying next minute");
                }
            }

            if let Some(snapshot) = &snapshot {
                if since_checkpoint >= checkpoint_every {
                    snapshot.save(&aggregator.checkpoint()?)?;
                    since_checkpoint = 0;
                }
            }
        };

        if let Some(snapshot) = &snapshot {
            snapshot.save(&aggregator.checkpoint()?)?;
        }
        drop(updates_tx);
        drain.await?;
        display.abort();
        outcome?;

        let report = counters.report();
        info!(asset = %symbol, passes = report.passes, fed = report.samples_fed, "live session stopped");
        Ok((report, aggregator))
    }
}

async fn drain_updates(
    mut rx: mpsc::Receiver<LiveUpdate>,
    decision: Arc<dyn DecisionMaker>,
    counters: Arc<LiveCounters>,
) {
    while let Some(update) = rx.recv().await {
        counters.updates.fetch_add(1, Ordering::Relaxed);
        if let Err(e) = decision.decide(update).await {
            warn!(error = %e, "decision failed");
        }
    }
}

async fn display_status(
    pipeline: IngestionPipeline,
    counters: Arc<LiveCounters>,
    every: Duration,
    cancel: CancellationToken,
) {
    let mut ticker = tokio::time::interval(every);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let status = pipeline.status();
    loop {
        tokio::select! {
            () = cancel.cancelled() => return,
            _ = ticker.tick() => {}
        }
        let report = counters.report();
        info!(
            asset = %pipeline.asset().symbol(),
            status = %status.snapshot(),
            passes = report.passes,
            fed = report.samples_fed,
            updates = report.updates,
            "live status"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use barwire_calendar::{FixedClock, FxCalendar, TradingCalendar};
    use barwire_fetch::ScriptedDownloader;
    use barwire_indicators::IndicatorConfig;
    use barwire_store::MemoryStore;
    use barwire_types::{Asset, AssetId, Category, RawPage, RawRow};
    use chrono::{DateTime, TimeDelta, TimeZone, Utc};
    use tempfile::TempDir;
    use tokio::sync::Mutex;

    fn at(minute: i64) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 8, 9, 0, 0).unwrap() + TimeDelta::minutes(minute)
    }

    fn page(minutes: std::ops::Range<i64>) -> RawPage {
        let rows = minutes
            .map(|m| RawRow {
                time: at(m),
                complete: true,
                volume: 5,
                open: 1.1,
                high: 1.1 + m as f64 * 1e-4,
                low: 1.09,
                close: 1.1,
            })
            .collect();
        RawPage::new("EUR_USD", rows)
    }

    #[derive(Debug, Default)]
    struct Collect(Mutex<Vec<LiveUpdate>>);

    #[async_trait]
    impl DecisionMaker for Collect {
        async fn decide(&self, update: LiveUpdate) -> anyhow::Result<()> {
            self.0.lock().await.push(update);
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_live_pass_feeds_aggregator_and_decisions() {
        let asset = Asset::new(AssetId::new(1), "EUR_USD", Category::Forex).with_start(at(0));
        let calendar: Arc<dyn TradingCalendar> = Arc::new(FxCalendar::default());
        let downloader = Arc::new(ScriptedDownloader::pages(100, [page(0..15)]));
        let pipeline = IngestionPipeline::new(
            asset.clone(),
            downloader,
            Arc::new(MemoryStore::new()),
            Arc::clone(&calendar),
        );
        let sink = IndicatorSink::new(&[IndicatorConfig::Volume { period: 3 }]);
        let aggregator = Aggregator::new(asset.id(), calendar, sink);
        let decisions = Arc::new(Collect::default());
        let dir = TempDir::new().unwrap();

        let session = LiveSession::new(pipeline, aggregator, decisions.clone())
            .with_checkpoints(SnapshotFile::new(dir.path().join("aggregator.json")), 10)
            .with_intervals(Duration::from_secs(3600), Duration::from_secs(3600))
            .with_clock(Arc::new(FixedClock::new(at(15))));

        let cancel = CancellationToken::new();
        let stopper = cancel.clone();
        let handle = tokio::spawn(session.run(cancel));
        // The first pass runs immediately; the next one is an hour away.
        let expected = 15 * Level::COUNT;
        tokio::time::timeout(Duration::from_secs(5), async {
            while decisions.0.lock().await.len() < expected {
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
        })
        .await
        .unwrap();
        stopper.cancel();
        let (report, aggregator) = handle.await.unwrap().unwrap();

        assert_eq!(report.passes, 1);
        assert_eq!(report.samples_fed, 15);
        assert_eq!(aggregator.last_time(), Some(at(14)));
        assert!(aggregator.bar(Level::M15).unwrap().complete);

        let updates = decisions.0.lock().await;
        assert_eq!(report.updates, updates.len() as u64);
        assert_eq!(updates.len(), expected);
        assert!(
            updates
                .iter()
                .any(|u| u.row.level == Level::M15 && u.row.complete)
        );
        assert!(dir.path().join("aggregator.json").exists());
    }

    #[tokio::test]
    async fn test_logging_decision_filters_levels() {
        let decision = LoggingDecision::for_levels([Level::H1]);
        let update = LiveUpdate {
            asset: "EUR_USD".into(),
            row: OutputRow {
                level: Level::M1,
                as_of: at(0),
                complete: true,
                values: vec![1.0],
            },
        };
        decision.decide(update).await.unwrap();
    }
}
