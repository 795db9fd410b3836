//! In-memory storage backend.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, AtomicUsize, Ordering};

use async_trait::async_trait;
use barwire_types::{Asset, AssetId, Sample};
use tokio::sync::RwLock;

use crate::{Result, SanitizeReport, Storage, StoreError, sanitize};

/// Storage held entirely in memory.
///
/// Keeps rows exactly as appended until sanitized, counts sanitize passes,
/// and can be told to fail a number of upcoming appends.
#[derive(Debug, Default)]
pub struct MemoryStore {
    series: RwLock<HashMap<AssetId, Vec<Sample>>>,
    sanitize_calls: AtomicUsize,
    failing_appends: AtomicU32,
}

impl MemoryStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the rows exactly as stored, without sanitizing.
    pub async fn raw(&self, asset: &Asset) -> Vec<Sample> {
        self.series
            .read()
            .await
            .get(&asset.id())
            .cloned()
            .unwrap_or_default()
    }

    /// Returns how many sanitize passes have run.
    #[must_use]
    pub fn sanitize_calls(&self) -> usize {
        self.sanitize_calls.load(Ordering::SeqCst)
    }

    /// Makes the next `count` appends fail with [`StoreError::Unavailable`].
    pub fn fail_next_appends(&self, count: u32) {
        self.failing_appends.store(count, Ordering::SeqCst);
    }
}

#[async_trait]
impl Storage for MemoryStore {
    async fn append(&self, asset: &Asset, rows: &[Sample]) -> Result<()> {
        let injected = self
            .failing_appends
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1));
        if injected.is_ok() {
            return Err(StoreError::Unavailable(format!(
                "injected append failure for {}",
                asset.symbol()
            )));
        }

        self.series
            .write()
            .await
            .entry(asset.id())
            .or_default()
            .extend_from_slice(rows);
        Ok(())
    }

    async fn load(&self, asset: &Asset) -> Result<Vec<Sample>> {
        let (rows, _) = sanitize(self.raw(asset).await);
        Ok(rows)
    }

    async fn sanitize(&self, asset: &Asset) -> Result<SanitizeReport> {
        self.sanitize_calls.fetch_add(1, Ordering::SeqCst);
        let mut series = self.series.write().await;
        let stored = series.remove(&asset.id()).unwrap_or_default();
        let (clean, report) = sanitize(stored);
        series.insert(asset.id(), clean);
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use barwire_types::{Category, Cursor};
    use chrono::{TimeDelta, TimeZone, Utc};

    fn asset() -> Asset {
        Asset::new(AssetId::new(1), "EUR_USD", Category::Forex)
    }

    fn row(minute: i64) -> Sample {
        let time = Utc.with_ymd_and_hms(2024, 1, 3, 0, 0, 0).unwrap() + TimeDelta::minutes(minute);
        Sample::new(AssetId::new(1), time, 1.1, 1.1, 1.1, 1.1, 1)
    }

    #[tokio::test]
    async fn test_append_keeps_raw_order_until_sanitize() {
        let store = MemoryStore::new();
        store.append(&asset(), &[row(2), row(1)]).await.unwrap();
        store.append(&asset(), &[row(2)]).await.unwrap();

        assert_eq!(store.raw(&asset()).await.len(), 3);
        assert_eq!(store.load(&asset()).await.unwrap().len(), 2);

        let report = store.sanitize(&asset()).await.unwrap();
        assert_eq!(report.duplicates, 1);
        assert_eq!(store.raw(&asset()).await, vec![row(1), row(2)]);
        assert_eq!(store.sanitize_calls(), 1);
    }

    #[tokio::test]
    async fn test_cursor_follows_last_row() {
        let store = MemoryStore::new();
        assert_eq!(store.cursor(&asset()).await.unwrap(), None);

        store.append(&asset(), &[row(5), row(9), row(7)]).await.unwrap();
        assert_eq!(
            store.cursor(&asset()).await.unwrap(),
            Some(Cursor::after(row(9).time))
        );
    }

    #[tokio::test]
    async fn test_injected_append_failures() {
        let store = MemoryStore::new();
        store.fail_next_appends(2);

        assert!(matches!(
            store.append(&asset(), &[row(1)]).await,
            Err(StoreError::Unavailable(_))
        ));
        assert!(store.append(&asset(), &[row(1)]).await.is_err());
        store.append(&asset(), &[row(1)]).await.unwrap();
        assert_eq!(store.raw(&asset()).await.len(), 1);
    }
}
