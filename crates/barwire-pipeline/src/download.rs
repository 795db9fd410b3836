//! Downloader stage.

use std::sync::Arc;
use std::time::Duration;

use barwire_calendar::{Clock, TradingCalendar};
use barwire_fetch::{Downloader, Fetch};
use barwire_types::{Asset, Cursor, RawPage};
use serde::Serialize;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::{PipelineError, PipelineStatus, Result};

/// Why the downloader stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DownloadOutcome {
    /// The source had nothing more at the cursor.
    CaughtUp,
    /// A transient failure hit while the market was closed.
    MarketClosed,
    /// The run was cancelled.
    Cancelled,
}

pub(crate) struct DownloadStage {
    pub(crate) asset: Asset,
    pub(crate) downloader: Arc<dyn Downloader>,
    pub(crate) calendar: Arc<dyn TradingCalendar>,
    pub(crate) clock: Arc<dyn Clock>,
    pub(crate) retry_delay: Duration,
    pub(crate) status: Arc<PipelineStatus>,
    pub(crate) cancel: CancellationToken,
}

impl DownloadStage {
    /// Fetches pages from `cursor` onward until caught up, sending each
    /// non-empty page downstream. Returns the final cursor.
    pub(crate) async fn run(
        self,
        mut cursor: Cursor,
        tx: mpsc::Sender<RawPage>,
    ) -> Result<(DownloadOutcome, Cursor)> {
        let result = self.fetch_all(&mut cursor, &tx).await;
        self.status.set_downloading(false);
        result.map(|outcome| (outcome, cursor))
    }

    async fn fetch_all(
        &self,
        cursor: &mut Cursor,
        tx: &mpsc::Sender<RawPage>,
    ) -> Result<DownloadOutcome> {
        let symbol = self.asset.symbol();
        let page_size = self.downloader.page_size();
        // Non-transient errors are fatal only before the source has answered once.
        let mut answered = false;

        loop {
            let fetched = tokio::select! {
                biased;
                () = self.cancel.cancelled() => return Ok(DownloadOutcome::Cancelled),
                fetched = self.downloader.fetch(&self.asset, *cursor) => fetched,
            };

            match fetched {
                Ok(Fetch::Page(page)) => {
                    answered = true;
                    self.status.add_page();
                    let previous = *cursor;
                    if let Some(last) = page.last_time() {
                        cursor.advance_past(last);
                    }
                    let stalled = *cursor == previous;
                    let caught_up = page.len() < page_size || stalled;
                    if stalled && page.len() >= page_size {
                        warn!(asset = %symbol, rows = page.len(), %cursor, "full page did not move the cursor, stopping");
                    }
                    debug!(asset = %symbol, rows = page.len(), %cursor, "page downloaded");

                    if !page.is_empty() {
                        tokio::select! {
                            biased;
                            () = self.cancel.cancelled() => return Ok(DownloadOutcome::Cancelled),
                            sent = tx.send(page) => {
                                sent.map_err(|_| PipelineError::ChannelClosed("raw queue"))?;
                            }
                        }
                    }
                    if caught_up {
                        return Ok(DownloadOutcome::CaughtUp);
                    }
                }
                Ok(Fetch::EndOfStream) => return Ok(DownloadOutcome::CaughtUp),
                Err(e) if !answered && !e.is_transient() => return Err(e.into()),
                Err(e) => {
                    if !self.calendar.is_trading_instant(self.clock.now()) {
                        info!(asset = %symbol, error = %e, "source unavailable while market closed, giving up");
                        return Ok(DownloadOutcome::MarketClosed);
                    }
                    self.status.add_fetch_retry();
                    warn!(
                        asset = %symbol,
                        error = %e,
                        delay_secs = self.retry_delay.as_secs_f64(),
                        "download failed, retrying"
                    );
                    tokio::select! {
                        biased;
                        () = self.cancel.cancelled() => return Ok(DownloadOutcome::Cancelled),
                        () = tokio::time::sleep(self.retry_delay) => {}
                    }
                }
            }
        }
    }
}
