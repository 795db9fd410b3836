//! Durable storage interface.

use async_trait::async_trait;
use barwire_types::{Asset, Cursor, Sample};

use crate::{Result, SanitizeReport};

/// Per-asset append-only series of M1 samples.
///
/// `append` never rewrites stored ranges; duplicates and disorder are left
/// for [`Storage::sanitize`] to resolve in place.
#[async_trait]
pub trait Storage: Send + Sync + std::fmt::Debug {
    /// Appends rows to the asset's series.
    async fn append(&self, asset: &Asset, rows: &[Sample]) -> Result<()>;

    /// Loads the asset's series, deduplicated and chronologically ordered.
    async fn load(&self, asset: &Asset) -> Result<Vec<Sample>>;

    /// Deduplicates, drops invalid rows, and sorts the stored series in place.
    async fn sanitize(&self, asset: &Asset) -> Result<SanitizeReport>;

    /// Returns the resume cursor: one minute past the last stored sample.
    async fn cursor(&self, asset: &Asset) -> Result<Option<Cursor>> {
        let rows = self.load(asset).await?;
        Ok(rows.iter().map(|row| row.time).max().map(Cursor::after))
    }
}
