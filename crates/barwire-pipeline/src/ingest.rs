//! Three-stage ingestion pipeline for one asset.

use std::sync::Arc;
use std::time::{Duration, Instant};

use barwire_calendar::{Clock, SystemClock, TradingCalendar};
use barwire_fetch::Downloader;
use barwire_store::Storage;
use barwire_types::{Asset, Cursor, Sample};
use serde::Serialize;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::download::DownloadStage;
use crate::process::ProcessStage;
use crate::write::WriteStage;
use crate::{DownloadOutcome, PipelineConfig, PipelineError, PipelineStatus, Result, WriteReport};

/// Summary of one pipeline run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct IngestReport {
    /// Why downloading stopped.
    pub outcome: DownloadOutcome,
    /// Cursor the run started from.
    pub start: Cursor,
    /// Cursor after the last downloaded page.
    pub end: Cursor,
    /// Rows dropped by normalization.
    pub dropped: usize,
    /// What was persisted.
    pub written: WriteReport,
    /// Wall time of the run.
    #[serde(skip)]
    pub elapsed: Duration,
}

/// Downloader → Processor → Writer for one asset.
///
/// Stages run as separate tasks joined by two bounded channels; closing a
/// channel is how a stage tells the next one it is done. A stage that fails
/// cancels its peers.
#[derive(Debug, Clone)]
pub struct IngestionPipeline {
    asset: Asset,
    downloader: Arc<dyn Downloader>,
    storage: Arc<dyn Storage>,
    calendar: Arc<dyn TradingCalendar>,
    clock: Arc<dyn Clock>,
    settings: PipelineConfig,
    status: Arc<PipelineStatus>,
}

impl IngestionPipeline {
    /// Creates a pipeline with default settings and the system clock.
    pub fn new(
        asset: Asset,
        downloader: Arc<dyn Downloader>,
        storage: Arc<dyn Storage>,
        calendar: Arc<dyn TradingCalendar>,
    ) -> Self {
        Self {
            asset,
            downloader,
            storage,
            calendar,
            clock: Arc::new(SystemClock),
            settings: PipelineConfig::default(),
            status: Arc::new(PipelineStatus::new()),
        }
    }

    /// Replaces the pipeline settings.
    #[must_use]
    pub const fn with_settings(mut self, settings: PipelineConfig) -> Self {
        self.settings = settings;
        self
    }

    /// Replaces the clock used to decide whether the market is open.
    #[must_use]
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Returns the asset.
    #[must_use]
    pub const fn asset(&self) -> &Asset {
        &self.asset
    }

    /// Returns the shared status.
    #[must_use]
    pub fn status(&self) -> Arc<PipelineStatus> {
        Arc::clone(&self.status)
    }

    /// Returns the storage backend.
    #[must_use]
    pub fn storage(&self) -> Arc<dyn Storage> {
        Arc::clone(&self.storage)
    }

    /// Returns where the next run starts: one minute past the last stored
    /// sample, or the asset's configured start.
    ///
    /// # Errors
    ///
    /// Returns an error if storage fails or there is neither stored data
    /// nor a configured start.
    pub async fn resume_cursor(&self) -> Result<Cursor> {
        if let Some(cursor) = self.storage.cursor(&self.asset).await? {
            return Ok(cursor);
        }
        self.asset.start().map(Cursor::at).ok_or_else(|| {
            PipelineError::Config(format!(
                "{} has no stored data and no configured start",
                self.asset
            ))
        })
    }

    /// Runs the pipeline until the source is caught up.
    ///
    /// # Errors
    ///
    /// Returns the first primary failure of any stage, or
    /// [`PipelineError::Cancelled`] if `cancel` fired.
    pub async fn run(&self, cancel: CancellationToken) -> Result<IngestReport> {
        self.run_inner(cancel, None).await
    }

    /// Runs the pipeline, also sending every normalized batch to `tee`.
    ///
    /// # Errors
    ///
    /// As for [`IngestionPipeline::run`]; a closed tee is an error.
    pub async fn run_with_tee(
        &self,
        cancel: CancellationToken,
        tee: mpsc::Sender<Vec<Sample>>,
    ) -> Result<IngestReport> {
        self.run_inner(cancel, Some(tee)).await
    }

    async fn run_inner(
        &self,
        cancel: CancellationToken,
        tee: Option<mpsc::Sender<Vec<Sample>>>,
    ) -> Result<IngestReport> {
        let started = Instant::now();
        let start = self.resume_cursor().await?;
        let symbol = self.asset.symbol();
        info!(asset = %symbol, cursor = %start, "ingestion started");

        let stop = cancel.child_token();
        let capacity = self.settings.queue_capacity;
        let (raw_tx, raw_rx) = mpsc::channel(capacity);
        let (norm_tx, norm_rx) = mpsc::channel(capacity);

        self.status.set_downloading(true);
        self.status.set_processing(true);

        let download = DownloadStage {
            asset: self.asset.clone(),
            downloader: Arc::clone(&self.downloader),
            calendar: Arc::clone(&self.calendar),
            clock: Arc::clone(&self.clock),
            retry_delay: self.settings.retry_delay(),
            status: Arc::clone(&self.status),
            cancel: stop.clone(),
        };
        let process = ProcessStage {
            asset: self.asset.clone(),
            calendar: Arc::clone(&self.calendar),
            status: Arc::clone(&self.status),
            cancel: stop.clone(),
        };
        let write = WriteStage {
            asset: self.asset.clone(),
            storage: Arc::clone(&self.storage),
            backoff: self.settings.storage_backoff(),
            sanitize_threshold: self.settings.sanitize_threshold,
            status: Arc::clone(&self.status),
            cancel: stop.clone(),
        };

        let download = tokio::spawn(stop_on_error(stop.clone(), download.run(start, raw_tx)));
        let process = tokio::spawn(stop_on_error(
            stop.clone(),
            process.run(raw_rx, norm_tx, tee),
        ));
        let write = tokio::spawn(stop_on_error(stop.clone(), write.run(norm_rx)));
        let (download, process, write) = tokio::join!(download, process, write);

        let download = download.map_err(PipelineError::from).and_then(|r| r);
        let process = process.map_err(PipelineError::from).and_then(|r| r);
        let write = write.map_err(PipelineError::from).and_then(|r| r);

        let ((outcome, end), dropped, written) = match (download, process, write) {
            (Ok(d), Ok(p), Ok(w)) => (d, p, w),
            (d, p, w) => {
                let errors = [w.err(), p.err(), d.err()].into_iter().flatten();
                return Err(primary_error(errors, cancel.is_cancelled()));
            }
        };

        let report = IngestReport {
            outcome,
            start,
            end,
            dropped,
            written,
            elapsed: started.elapsed(),
        };
        info!(
            asset = %symbol,
            outcome = ?report.outcome,
            rows = report.written.rows_written,
            cursor = %report.end,
            "ingestion finished"
        );
        Ok(report)
    }
}

async fn stop_on_error<T>(
    stop: CancellationToken,
    stage: impl std::future::Future<Output = Result<T>>,
) -> Result<T> {
    let result = stage.await;
    if let Err(e) = &result {
        if !e.is_secondary() {
            debug!(error = %e, "stage failed, stopping peers");
            stop.cancel();
        }
    }
    result
}

/// Picks the error to report: the first primary failure, otherwise the
/// cancellation or hang-up that stopped the run.
fn primary_error(
    errors: impl Iterator<Item = PipelineError>,
    cancelled: bool,
) -> PipelineError {
    let mut fallback = None;
    for error in errors {
        if !error.is_secondary() {
            return error;
        }
        let prefer = matches!(error, PipelineError::Cancelled { unwritten } if unwritten > 0);
        if fallback.is_none() || prefer {
            fallback = Some(error);
        }
    }
    match fallback {
        Some(error) => error,
        None if cancelled => PipelineError::Cancelled { unwritten: 0 },
        None => PipelineError::ChannelClosed("pipeline"),
    }
}
