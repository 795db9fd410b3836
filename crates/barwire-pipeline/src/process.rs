//! Processor stage.

use std::sync::Arc;

use barwire_calendar::TradingCalendar;
use barwire_fetch::normalize_page;
use barwire_types::{Asset, RawPage, Sample};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::{PipelineError, PipelineStatus, Result};

pub(crate) struct ProcessStage {
    pub(crate) asset: Asset,
    pub(crate) calendar: Arc<dyn TradingCalendar>,
    pub(crate) status: Arc<PipelineStatus>,
    pub(crate) cancel: CancellationToken,
}

impl ProcessStage {
    /// Normalizes pages until the raw queue closes. Returns rows dropped.
    pub(crate) async fn run(
        self,
        rx: mpsc::Receiver<RawPage>,
        tx: mpsc::Sender<Vec<Sample>>,
        tee: Option<mpsc::Sender<Vec<Sample>>>,
    ) -> Result<usize> {
        let result = self.process_all(rx, &tx, tee.as_ref()).await;
        self.status.set_processing(false);
        result
    }

    async fn process_all(
        &self,
        mut rx: mpsc::Receiver<RawPage>,
        tx: &mpsc::Sender<Vec<Sample>>,
        tee: Option<&mpsc::Sender<Vec<Sample>>>,
    ) -> Result<usize> {
        let mut dropped = 0;
        loop {
            let page = tokio::select! {
                biased;
                () = self.cancel.cancelled() => return Ok(dropped),
                page = rx.recv() => match page {
                    Some(page) => page,
                    None => return Ok(dropped),
                },
            };

            let (samples, report) = normalize_page(&page, &self.asset, &*self.calendar);
            if report.dropped() > 0 {
                debug!(asset = %self.asset.symbol(), ?report, "rows dropped during normalization");
                dropped += report.dropped();
            }
            if samples.is_empty() {
                continue;
            }

            if let Some(tee) = tee {
                self.send(tee, samples.clone(), "tee").await?;
            }
            self.send(tx, samples, "normalized queue").await?;
        }
    }

    async fn send(
        &self,
        tx: &mpsc::Sender<Vec<Sample>>,
        batch: Vec<Sample>,
        name: &'static str,
    ) -> Result<()> {
        tokio::select! {
            biased;
            () = self.cancel.cancelled() => Ok(()),
            sent = tx.send(batch) => sent.map_err(|_| PipelineError::ChannelClosed(name)),
        }
    }
}
