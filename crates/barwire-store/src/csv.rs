//! CSV file storage backend.
//!
//! Each asset lives in `<root>/<SYMBOL>/m1.csv` with the header
//! `timestamp,open,high,low,close,volume`.

use std::io::SeekFrom;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use barwire_types::{Asset, AssetId, Sample};
use chrono::{DateTime, Utc};
use csv_async::{AsyncReaderBuilder, AsyncWriterBuilder};
use directories::ProjectDirs;
use futures::StreamExt;
use serde::{Deserialize, Serialize};
use tokio::fs::{self, OpenOptions};
use tokio::io::{AsyncReadExt, AsyncSeekExt, AsyncWriteExt};

use crate::{Result, SanitizeReport, Storage, StoreError, sanitize, write_atomic};

const TAIL_CHUNK: usize = 4096;

/// One stored line.
#[derive(Debug, Serialize, Deserialize)]
struct Record {
    timestamp: DateTime<Utc>,
    open: f64,
    high: f64,
    low: f64,
    close: f64,
    volume: u64,
}

impl Record {
    const fn from_sample(row: &Sample) -> Self {
        Self {
            timestamp: row.time,
            open: row.open,
            high: row.high,
            low: row.low,
            close: row.close,
            volume: row.volume,
        }
    }

    fn into_sample(self, asset: AssetId) -> Sample {
        Sample::new(
            asset,
            self.timestamp,
            self.open,
            self.high,
            self.low,
            self.close,
            self.volume,
        )
    }
}

/// Rows read from a series file plus the lines that could not be decoded.
#[derive(Debug, Default)]
struct Series {
    rows: Vec<Sample>,
    skipped: usize,
}

/// Storage backed by one append-only CSV file per asset.
///
/// A line left incomplete by an interrupted append is cut off before the
/// next append, and lines that fail to decode are skipped on read and
/// dropped by [`Storage::sanitize`].
#[derive(Debug, Clone)]
pub struct CsvStore {
    root: PathBuf,
}

impl CsvStore {
    /// Creates a store rooted at `root`.
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Returns the default data directory.
    ///
    /// Uses the platform data directory for `barwire`, falling back to
    /// `~/.barwire/` when it cannot be determined.
    #[must_use]
    pub fn default_root() -> PathBuf {
        ProjectDirs::from("", "", "barwire")
            .map_or_else(dirs_fallback, |dirs| dirs.data_dir().to_path_buf())
    }

    /// Returns the root directory.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Returns the path of an asset's series file.
    #[must_use]
    pub fn series_path(&self, asset: &Asset) -> PathBuf {
        self.root.join(asset.symbol()).join("m1.csv")
    }

    /// Reads the stored rows exactly as written, skipping lines that do not
    /// decode.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read.
    pub async fn load_raw(&self, asset: &Asset) -> Result<Vec<Sample>> {
        Ok(self.read_series(asset).await?.rows)
    }

    async fn read_series(&self, asset: &Asset) -> Result<Series> {
        let path = self.series_path(asset);
        let bytes = match fs::read(&path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Series::default()),
            Err(source) => return Err(StoreError::ReadFile { path, source }),
        };

        let mut reader = AsyncReaderBuilder::new()
            .has_headers(true)
            .create_deserializer(bytes.as_slice());
        let mut records = reader.deserialize::<Record>();
        let mut series = Series::default();
        while let Some(record) = records.next().await {
            match record {
                Ok(record) => series.rows.push(record.into_sample(asset.id())),
                Err(error) => {
                    tracing::warn!(path = %path.display(), %error, "skipping unreadable row");
                    series.skipped += 1;
                }
            }
        }
        Ok(series)
    }
}

fn dirs_fallback() -> PathBuf {
    std::env::var_os("HOME")
        .map_or_else(|| PathBuf::from("."), PathBuf::from)
        .join(".barwire")
}

async fn encode(rows: &[Sample], with_header: bool) -> std::io::Result<Vec<u8>> {
    let mut buf = Vec::with_capacity((rows.len() + 1) * 64);
    let mut writer = AsyncWriterBuilder::new()
        .has_headers(with_header)
        .create_serializer(&mut buf);
    for row in rows {
        writer
            .serialize(Record::from_sample(row))
            .await
            .map_err(std::io::Error::other)?;
    }
    writer.flush().await?;
    drop(writer);
    Ok(buf)
}

/// Cuts `path` back to its last complete line and returns the number of
/// bytes removed.
async fn trim_torn_tail(path: &Path) -> std::io::Result<u64> {
    let mut file = match OpenOptions::new().read(true).write(true).open(path).await {
        Ok(file) => file,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(0),
        Err(e) => return Err(e),
    };
    let len = file.metadata().await?.len();
    let mut end = len;
    let mut buf = vec![0u8; TAIL_CHUNK];
    while end > 0 {
        let start = end.saturating_sub(TAIL_CHUNK as u64);
        let chunk = &mut buf[..(end - start) as usize];
        file.seek(SeekFrom::Start(start)).await?;
        file.read_exact(chunk).await?;
        if let Some(pos) = chunk.iter().rposition(|&b| b == b'\n') {
            end = start + pos as u64 + 1;
            break;
        }
        end = start;
    }
    if end < len {
        file.set_len(end).await?;
        file.sync_data().await?;
    }
    Ok(len - end)
}

#[async_trait]
impl Storage for CsvStore {
    async fn append(&self, asset: &Asset, rows: &[Sample]) -> Result<()> {
        if rows.is_empty() {
            return Ok(());
        }
        let path = self.series_path(asset);
        if let Some(dir) = path.parent() {
            fs::create_dir_all(dir)
                .await
                .map_err(|source| StoreError::CreateDir {
                    path: dir.to_path_buf(),
                    source,
                })?;
        }

        let write_err = |source: std::io::Error| StoreError::WriteFile {
            path: path.clone(),
            source,
        };
        let torn = trim_torn_tail(&path).await.map_err(write_err)?;
        if torn > 0 {
            tracing::warn!(
                asset = %asset.symbol(),
                bytes = torn,
                "dropped incomplete trailing row"
            );
        }

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .await
            .map_err(write_err)?;
        let is_new = file.metadata().await.map_err(write_err)?.len() == 0;
        let chunk = encode(rows, is_new).await.map_err(write_err)?;

        file.write_all(&chunk).await.map_err(write_err)?;
        file.sync_data().await.map_err(write_err)
    }

    async fn load(&self, asset: &Asset) -> Result<Vec<Sample>> {
        let (rows, _) = sanitize(self.load_raw(asset).await?);
        Ok(rows)
    }

    async fn sanitize(&self, asset: &Asset) -> Result<SanitizeReport> {
        let Series { rows, skipped } = self.read_series(asset).await?;
        if rows.is_empty() && skipped == 0 {
            return Ok(SanitizeReport::default());
        }
        let (clean, mut report) = sanitize(rows);
        report.before += skipped;
        report.invalid += skipped;

        let path = self.series_path(asset);
        let bytes = encode(&clean, true)
            .await
            .map_err(|source| StoreError::WriteFile {
                path: path.clone(),
                source,
            })?;
        tokio::task::spawn_blocking(move || write_atomic(&path, &bytes)).await??;
        tracing::debug!(
            asset = %asset.symbol(),
            before = report.before,
            after = report.after,
            "sanitized series"
        );
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use barwire_types::{Category, Cursor};
    use chrono::{TimeDelta, TimeZone};
    use std::io::Write;
    use tempfile::TempDir;

    const HEADER: &str = "timestamp,open,high,low,close,volume";

    fn asset() -> Asset {
        Asset::new(AssetId::new(3), "XAU_USD", Category::Commodity)
    }

    fn row(minute: i64, close: f64) -> Sample {
        let time = Utc.with_ymd_and_hms(2024, 1, 3, 0, 0, 0).unwrap() + TimeDelta::minutes(minute);
        Sample::new(AssetId::new(3), time, close, close + 0.5, close - 0.5, close, 12)
    }

    fn append_raw(path: &Path, text: &str) {
        let mut file = std::fs::OpenOptions::new().append(true).open(path).unwrap();
        file.write_all(text.as_bytes()).unwrap();
    }

    #[tokio::test]
    async fn test_append_and_load() {
        let dir = TempDir::new().unwrap();
        let store = CsvStore::new(dir.path());

        store.append(&asset(), &[row(0, 2030.25), row(1, 2031.0)]).await.unwrap();
        store.append(&asset(), &[row(2, 2029.75)]).await.unwrap();

        let text = std::fs::read_to_string(store.series_path(&asset())).unwrap();
        assert!(text.starts_with(&format!("{HEADER}\n")));
        assert!(text.contains("\n2024-01-03T00:02:00Z,"));
        assert_eq!(text.lines().count(), 4);

        let loaded = store.load(&asset()).await.unwrap();
        assert_eq!(loaded, vec![row(0, 2030.25), row(1, 2031.0), row(2, 2029.75)]);
        assert_eq!(
            store.cursor(&asset()).await.unwrap(),
            Some(Cursor::after(row(2, 0.0).time))
        );
    }

    #[tokio::test]
    async fn test_sanitize_rewrites_file() {
        let dir = TempDir::new().unwrap();
        let store = CsvStore::new(dir.path());

        store.append(&asset(), &[row(5, 2000.0), row(1, 2001.0)]).await.unwrap();
        store.append(&asset(), &[row(5, 2002.0)]).await.unwrap();
        assert_eq!(store.load_raw(&asset()).await.unwrap().len(), 3);

        let report = store.sanitize(&asset()).await.unwrap();
        assert_eq!(report.duplicates, 1);
        assert_eq!(report.after, 2);

        let raw = store.load_raw(&asset()).await.unwrap();
        assert_eq!(raw, vec![row(1, 2001.0), row(5, 2000.0)]);
    }

    #[tokio::test]
    async fn test_missing_series_is_empty() {
        let dir = TempDir::new().unwrap();
        let store = CsvStore::new(dir.path());
        assert!(store.load(&asset()).await.unwrap().is_empty());
        assert_eq!(store.cursor(&asset()).await.unwrap(), None);
        assert!(store.sanitize(&asset()).await.unwrap().is_clean());
    }

    #[tokio::test]
    async fn test_append_after_torn_row() {
        let dir = TempDir::new().unwrap();
        let store = CsvStore::new(dir.path());
        let path = store.series_path(&asset());

        store.append(&asset(), &[row(0, 2030.0)]).await.unwrap();
        append_raw(&path, "2024-01-03T00:01:00Z,2031");
        store.append(&asset(), &[row(2, 2032.0)]).await.unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        assert_eq!(text.lines().count(), 3);
        assert!(text.ends_with('\n'));

        assert_eq!(store.load(&asset()).await.unwrap(), vec![row(0, 2030.0), row(2, 2032.0)]);
        assert_eq!(
            store.cursor(&asset()).await.unwrap(),
            Some(Cursor::after(row(2, 0.0).time))
        );
        assert!(store.sanitize(&asset()).await.unwrap().is_clean());
    }

    #[tokio::test]
    async fn test_torn_header_is_rewritten() {
        let dir = TempDir::new().unwrap();
        let store = CsvStore::new(dir.path());
        let path = store.series_path(&asset());
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, "timestamp,op").unwrap();

        store.append(&asset(), &[row(0, 2030.0)]).await.unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        assert!(text.starts_with(&format!("{HEADER}\n")));
        assert_eq!(store.load(&asset()).await.unwrap(), vec![row(0, 2030.0)]);
    }

    #[tokio::test]
    async fn test_unreadable_rows_are_skipped_and_sanitized() {
        let dir = TempDir::new().unwrap();
        let store = CsvStore::new(dir.path());
        let path = store.series_path(&asset());

        store.append(&asset(), &[row(0, 2030.0)]).await.unwrap();
        append_raw(&path, "2024-01-03T00:01:00Z,1,1,1\n");
        store.append(&asset(), &[row(2, 2032.0)]).await.unwrap();
        append_raw(&path, "2024-01-03T00:03:00Z,2031");

        assert_eq!(store.load_raw(&asset()).await.unwrap(), vec![row(0, 2030.0), row(2, 2032.0)]);

        let report = store.sanitize(&asset()).await.unwrap();
        assert_eq!(report.before, 4);
        assert_eq!(report.invalid, 2);
        assert_eq!(report.after, 2);

        let text = std::fs::read_to_string(&path).unwrap();
        assert_eq!(text.lines().count(), 3);
        assert!(store.sanitize(&asset()).await.unwrap().is_clean());
    }
}
