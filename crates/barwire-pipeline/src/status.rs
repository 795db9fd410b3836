//! Shared liveness flags and counters of a pipeline run.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use serde::Serialize;

/// Observability of one asset's pipeline.
///
/// Stages only ever write their own flag and counters; readers take a
/// [`StatusSnapshot`].
#[derive(Debug, Default)]
pub struct PipelineStatus {
    downloading: AtomicBool,
    processing: AtomicBool,
    pages: AtomicU64,
    rows_written: AtomicU64,
    sanitizes: AtomicU64,
    unsanitized: AtomicU64,
    fetch_retries: AtomicU64,
    store_retries: AtomicU64,
}

/// Point-in-time copy of a [`PipelineStatus`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StatusSnapshot {
    /// The downloader is running.
    pub downloading: bool,
    /// The processor is running.
    pub processing: bool,
    /// Pages received from the source.
    pub pages: u64,
    /// Rows persisted.
    pub rows_written: u64,
    /// Sanitize passes completed.
    pub sanitizes: u64,
    /// Rows written since the last sanitize, across runs.
    pub unsanitized: u64,
    /// Download retries after transient errors.
    pub fetch_retries: u64,
    /// Storage retries.
    pub store_retries: u64,
}

impl PipelineStatus {
    /// Creates a status with both stages idle.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns true while the downloader runs.
    #[must_use]
    pub fn is_downloading(&self) -> bool {
        self.downloading.load(Ordering::SeqCst)
    }

    /// Returns true while the processor runs.
    #[must_use]
    pub fn is_processing(&self) -> bool {
        self.processing.load(Ordering::SeqCst)
    }

    /// Returns a copy of every flag and counter.
    #[must_use]
    pub fn snapshot(&self) -> StatusSnapshot {
        StatusSnapshot {
            downloading: self.is_downloading(),
            processing: self.is_processing(),
            pages: self.pages.load(Ordering::Relaxed),
            rows_written: self.rows_written.load(Ordering::Relaxed),
            sanitizes: self.sanitizes.load(Ordering::Relaxed),
            unsanitized: self.unsanitized.load(Ordering::Relaxed),
            fetch_retries: self.fetch_retries.load(Ordering::Relaxed),
            store_retries: self.store_retries.load(Ordering::Relaxed),
        }
    }

    pub(crate) fn set_downloading(&self, running: bool) {
        self.downloading.store(running, Ordering::SeqCst);
    }

    pub(crate) fn set_processing(&self, running: bool) {
        self.processing.store(running, Ordering::SeqCst);
    }

    pub(crate) fn add_page(&self) {
        self.pages.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn add_rows_written(&self, rows: usize) {
        self.rows_written.fetch_add(rows as u64, Ordering::Relaxed);
    }

    pub(crate) fn add_sanitize(&self) {
        self.sanitizes.fetch_add(1, Ordering::Relaxed);
        self.unsanitized.store(0, Ordering::Relaxed);
    }

    /// Counts rows appended since the last sanitize and returns the total.
    pub(crate) fn add_unsanitized(&self, rows: usize) -> u64 {
        self.unsanitized.fetch_add(rows as u64, Ordering::Relaxed) + rows as u64
    }

    pub(crate) fn add_fetch_retry(&self) {
        self.fetch_retries.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn add_store_retry(&self) {
        self.store_retries.fetch_add(1, Ordering::Relaxed);
    }
}

impl std::fmt::Display for StatusSnapshot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "downloading={} processing={} pages={} written={} sanitizes={}",
            self.downloading, self.processing, self.pages, self.rows_written, self.sanitizes
        )
    }
}
