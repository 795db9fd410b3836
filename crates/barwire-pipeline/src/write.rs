//! Writer stage.

use std::sync::Arc;

use barwire_store::{SanitizeReport, Storage};
use barwire_types::{Asset, Backoff, Sample};
use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::{PipelineError, PipelineStatus, Result};

/// What the writer persisted during one run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct WriteReport {
    /// Batches appended.
    pub batches: u64,
    /// Rows appended.
    pub rows_written: u64,
    /// Sanitize passes run.
    pub sanitizes: u64,
    /// Latest timestamp written.
    pub last_time: Option<DateTime<Utc>>,
}

pub(crate) struct WriteStage {
    pub(crate) asset: Asset,
    pub(crate) storage: Arc<dyn Storage>,
    pub(crate) backoff: Backoff,
    pub(crate) sanitize_threshold: usize,
    pub(crate) status: Arc<PipelineStatus>,
    pub(crate) cancel: CancellationToken,
}

impl WriteStage {
    /// Appends batches until the normalized queue closes, sanitizing
    /// whenever the rows written since the last sanitize exceed the
    /// threshold. The count lives in the shared status, so it carries over
    /// from one run to the next.
    pub(crate) async fn run(self, mut rx: mpsc::Receiver<Vec<Sample>>) -> Result<WriteReport> {
        let mut report = WriteReport::default();

        loop {
            let batch = tokio::select! {
                biased;
                () = self.cancel.cancelled() => return Err(PipelineError::Cancelled { unwritten: 0 }),
                batch = rx.recv() => match batch {
                    Some(batch) => batch,
                    None => break,
                },
            };

            self.append(&batch).await?;
            report.batches += 1;
            report.rows_written += batch.len() as u64;
            report.last_time = report.last_time.max(batch.iter().map(|s| s.time).max());
            self.status.add_rows_written(batch.len());

            if self.status.add_unsanitized(batch.len()) > self.sanitize_threshold as u64 {
                self.sanitize().await?;
                report.sanitizes += 1;
            }
        }
        Ok(report)
    }

    async fn append(&self, batch: &[Sample]) -> Result<()> {
        let mut attempts = 0;
        loop {
            let appended = tokio::select! {
                biased;
                () = self.cancel.cancelled() => {
                    return Err(PipelineError::Cancelled { unwritten: batch.len() });
                }
                appended = self.storage.append(&self.asset, batch) => appended,
            };
            match appended {
                Ok(()) => {
                    debug!(asset = %self.asset.symbol(), rows = batch.len(), "batch written");
                    return Ok(());
                }
                Err(e) if self.backoff.allows(attempts) => {
                    attempts += 1;
                    self.wait_retry(attempts, "append", &e, batch.len()).await?;
                }
                Err(source) => {
                    return Err(PipelineError::Write {
                        unwritten: batch.len(),
                        source,
                    });
                }
            }
        }
    }

    async fn sanitize(&self) -> Result<SanitizeReport> {
        let mut attempts = 0;
        loop {
            match self.storage.sanitize(&self.asset).await {
                Ok(report) => {
                    self.status.add_sanitize();
                    debug!(
                        asset = %self.asset.symbol(),
                        duplicates = report.duplicates,
                        invalid = report.invalid,
                        "storage sanitized"
                    );
                    return Ok(report);
                }
                Err(e) if self.backoff.allows(attempts) => {
                    attempts += 1;
                    self.wait_retry(attempts, "sanitize", &e, 0).await?;
                }
                Err(e) => return Err(e.into()),
            }
        }
    }

    async fn wait_retry(
        &self,
        attempt: u32,
        operation: &str,
        error: &barwire_store::StoreError,
        unwritten: usize,
    ) -> Result<()> {
        let delay = self.backoff.delay(attempt);
        self.status.add_store_retry();
        warn!(
            asset = %self.asset.symbol(),
            operation,
            attempt,
            error = %error,
            delay_ms = delay.as_millis() as u64,
            "storage operation failed, retrying"
        );
        tokio::select! {
            biased;
            () = self.cancel.cancelled() => Err(PipelineError::Cancelled { unwritten }),
            () = tokio::time::sleep(delay) => Ok(()),
        }
    }
}
