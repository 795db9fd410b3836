//! Sink that runs indicators over every level's bars.

use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use barwire_aggregate::{Bar, Sink, SinkError};
use barwire_store::SnapshotFile;
use barwire_types::Level;
use chrono::{DateTime, Utc};
use csv_async::AsyncWriterBuilder;
use serde::{Deserialize, Serialize};

use crate::{Indicator, IndicatorConfig, IndicatorError};

/// Schema version of [`IndicatorSnapshot`].
pub const INDICATOR_SNAPSHOT_VERSION: u32 = 1;

/// One output row of a level: the bar instant and every indicator value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutputRow {
    /// Level the row belongs to.
    pub level: Level,
    /// `as_of` of the bar that produced the row.
    pub as_of: DateTime<Utc>,
    /// Whether that bar was complete.
    pub complete: bool,
    /// Indicator outputs, concatenated in column order.
    pub values: Vec<f64>,
}

/// Persisted indicator state for all levels.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndicatorSnapshot {
    /// Format version.
    pub schema_version: u32,
    /// Indicators per level, in [`Level::ALL`] order.
    pub levels: Vec<Vec<Indicator>>,
}

/// Runs one indicator set per level and buffers their output.
///
/// Closed-only indicators consume complete bars and repeat their previous
/// output for open ones; open indicators consume every update.
/// `on_unchanged` repeats every indicator.
#[derive(Debug)]
pub struct IndicatorSink {
    levels: Vec<Vec<Indicator>>,
    rows: Vec<Vec<OutputRow>>,
    output_dir: Option<PathBuf>,
}

impl IndicatorSink {
    /// Creates a sink running `configs` on every level, keeping output in
    /// memory only.
    #[must_use]
    pub fn new(configs: &[IndicatorConfig]) -> Self {
        let levels = Level::ALL
            .iter()
            .map(|_| configs.iter().map(IndicatorConfig::build).collect())
            .collect();
        Self {
            levels,
            rows: vec![Vec::new(); Level::COUNT],
            output_dir: None,
        }
    }

    /// Persists output under `dir` on checkpoint.
    #[must_use]
    pub fn with_output_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.output_dir = Some(dir.into());
        self
    }

    /// Restores indicator state from `dir`, or builds fresh indicators if
    /// no snapshot has been written there yet.
    ///
    /// # Errors
    ///
    /// Returns an error if the snapshot cannot be read or has another
    /// schema version.
    pub fn open(
        dir: impl Into<PathBuf>,
        configs: &[IndicatorConfig],
    ) -> Result<Self, IndicatorError> {
        let dir = dir.into();
        let Some(snapshot) = snapshot_file(&dir).load::<IndicatorSnapshot>()? else {
            return Ok(Self::new(configs).with_output_dir(dir));
        };
        if snapshot.schema_version != INDICATOR_SNAPSHOT_VERSION {
            return Err(IndicatorError::SnapshotVersion {
                found: snapshot.schema_version,
                expected: INDICATOR_SNAPSHOT_VERSION,
            });
        }
        if snapshot.levels.len() != Level::COUNT {
            return Err(IndicatorError::CorruptSnapshot(format!(
                "expected {} levels, found {}",
                Level::COUNT,
                snapshot.levels.len()
            )));
        }
        Ok(Self {
            levels: snapshot.levels,
            rows: vec![Vec::new(); Level::COUNT],
            output_dir: Some(dir),
        })
    }

    /// Returns the output column names.
    #[must_use]
    pub fn columns(&self, level: Level) -> Vec<String> {
        self.levels[level.index()]
            .iter()
            .flat_map(Indicator::columns)
            .collect()
    }

    /// Returns the buffered rows of `level`.
    #[must_use]
    pub fn rows(&self, level: Level) -> &[OutputRow] {
        &self.rows[level.index()]
    }

    /// Returns the most recent row of `level`.
    #[must_use]
    pub fn latest(&self, level: Level) -> Option<&OutputRow> {
        self.rows[level.index()].last()
    }

    /// Removes and returns every buffered row, level by level.
    pub fn drain_rows(&mut self) -> Vec<OutputRow> {
        self.rows.iter_mut().flat_map(std::mem::take).collect()
    }

    /// Returns a snapshot of the indicator state.
    #[must_use]
    pub fn snapshot(&self) -> IndicatorSnapshot {
        IndicatorSnapshot {
            schema_version: INDICATOR_SNAPSHOT_VERSION,
            levels: self.levels.clone(),
        }
    }

    /// Appends buffered rows to `<dir>/<level>.csv` and clears the buffer.
    ///
    /// Without an output directory the rows are simply discarded.
    ///
    /// # Errors
    ///
    /// Returns an error if a file cannot be written; the buffer is kept.
    pub fn flush_output(&mut self) -> Result<usize, IndicatorError> {
        let Some(dir) = self.output_dir.clone() else {
            return Ok(self.drain_rows().len());
        };
        fs::create_dir_all(&dir).map_err(|source| IndicatorError::Write {
            path: dir.clone(),
            source,
        })?;

        let mut flushed = 0;
        for level in Level::ALL {
            let rows = &self.rows[level.index()];
            if rows.is_empty() {
                continue;
            }
            let path = dir.join(format!("{level}.csv"));
            append_rows(&path, &self.columns(level), rows)
                .map_err(|source| IndicatorError::Write { path, source })?;
            flushed += rows.len();
            self.rows[level.index()].clear();
        }
        Ok(flushed)
    }

    fn push(&mut self, level: Level, bar: &Bar, feed: impl Fn(&Indicator) -> bool) {
        let indicators = &mut self.levels[level.index()];
        let mut values = Vec::new();
        for indicator in indicators.iter_mut() {
            if feed(indicator) {
                values.extend_from_slice(indicator.feed(bar));
            } else {
                values.extend_from_slice(indicator.fillna());
            }
        }
        self.rows[level.index()].push(OutputRow {
            level,
            as_of: bar.as_of,
            complete: bar.complete,
            values,
        });
    }
}

fn snapshot_file(dir: &Path) -> SnapshotFile {
    SnapshotFile::new(dir.join("indicators.json"))
}

fn append_rows(path: &Path, columns: &[String], rows: &[OutputRow]) -> std::io::Result<()> {
    let mut file = OpenOptions::new().create(true).append(true).open(path)?;
    let header = (file.metadata()?.len() == 0).then_some(columns);
    // Encoding into memory never waits.
    let bytes = futures::executor::block_on(encode_rows(header, rows))?;
    file.write_all(&bytes)?;
    file.sync_data()
}

async fn encode_rows(columns: Option<&[String]>, rows: &[OutputRow]) -> std::io::Result<Vec<u8>> {
    let mut buf = Vec::new();
    let mut writer = AsyncWriterBuilder::new().create_writer(&mut buf);
    if let Some(columns) = columns {
        let header = ["as_of", "complete"]
            .into_iter()
            .chain(columns.iter().map(String::as_str));
        writer
            .write_record(header)
            .await
            .map_err(std::io::Error::other)?;
    }
    for row in rows {
        let mut record = Vec::with_capacity(row.values.len() + 2);
        record.push(row.as_of.format("%Y-%m-%dT%H:%M:%SZ").to_string());
        record.push(u8::from(row.complete).to_string());
        record.extend(row.values.iter().map(f64::to_string));
        writer
            .write_record(&record)
            .await
            .map_err(std::io::Error::other)?;
    }
    writer.flush().await?;
    drop(writer);
    Ok(buf)
}

impl Sink for IndicatorSink {
    fn on_close(&mut self, level: Level, bar: &Bar) {
        let complete = bar.complete;
        self.push(level, bar, |indicator| complete || indicator.is_open());
    }

    fn on_unchanged(&mut self, level: Level, bar: &Bar) {
        self.push(level, bar, |_| false);
    }

    fn checkpoint(&mut self) -> Result<(), SinkError> {
        let Some(dir) = self.output_dir.clone() else {
            return Ok(());
        };
        let rows = self.flush_output().map_err(boxed)?;
        snapshot_file(&dir).save(&self.snapshot()).map_err(boxed)?;
        tracing::debug!(rows, dir = %dir.display(), "indicator checkpoint written");
        Ok(())
    }
}

fn boxed(err: impl std::error::Error + Send + Sync + 'static) -> SinkError {
    SinkError::Checkpoint(Box::new(err))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeDelta, TimeZone};
    use tempfile::TempDir;

    fn bar(level: Level, minute: i64, close: f64, complete: bool) -> Bar {
        let t = Utc.with_ymd_and_hms(2024, 1, 3, 0, 0, 0).unwrap() + TimeDelta::minutes(minute);
        Bar {
            level,
            open: close,
            high: close,
            low: close,
            close,
            volume: 4,
            open_time: t,
            close_time: t,
            as_of: t,
            complete,
        }
    }

    fn configs() -> Vec<IndicatorConfig> {
        vec![
            IndicatorConfig::Rsi { period: 2 },
            IndicatorConfig::Volume { period: 1 },
        ]
    }

    #[test]
    fn test_closed_indicators_repeat_on_open_bars() {
        let mut sink = IndicatorSink::new(&configs());
        assert_eq!(sink.columns(Level::M5), vec!["rsi_value", "volume_abs", "volume_rel"]);

        sink.on_close(Level::M5, &bar(Level::M5, 0, 10.0, true));
        sink.on_close(Level::M5, &bar(Level::M5, 5, 11.0, true));
        sink.on_close(Level::M5, &bar(Level::M5, 10, 10.0, true));
        let rsi = sink.latest(Level::M5).unwrap().values[0];
        assert!((rsi - 50.0).abs() < 1e-9);

        // An open bar leaves RSI alone but updates volume.
        let mut open = bar(Level::M5, 15, 30.0, false);
        open.volume = 9;
        sink.on_close(Level::M5, &open);
        let row = sink.latest(Level::M5).unwrap();
        assert_eq!(row.values, vec![rsi, 9.0, 1.0]);
        assert!(!row.complete);

        sink.on_unchanged(Level::M5, &open);
        assert_eq!(sink.rows(Level::M5).len(), 5);
        assert!(sink.rows(Level::H1).is_empty());
    }

    #[test]
    fn test_drain_rows_empties_buffers() {
        let mut sink = IndicatorSink::new(&configs());
        sink.on_close(Level::M1, &bar(Level::M1, 0, 1.0, true));
        sink.on_unchanged(Level::D1, &bar(Level::D1, 0, 1.0, false));

        let rows = sink.drain_rows();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].level, Level::M1);
        assert_eq!(rows[1].level, Level::D1);
        assert!(sink.drain_rows().is_empty());
    }

    #[test]
    fn test_checkpoint_writes_rows_and_restores_state() {
        let dir = TempDir::new().unwrap();
        let mut sink = IndicatorSink::open(dir.path(), &configs()).unwrap();
        sink.on_close(Level::M1, &bar(Level::M1, 0, 1.0, true));
        sink.on_close(Level::M1, &bar(Level::M1, 1, 2.0, true));
        sink.checkpoint().unwrap();
        sink.on_close(Level::M1, &bar(Level::M1, 2, 1.0, true));
        sink.checkpoint().unwrap();

        let csv = fs::read_to_string(dir.path().join("m1.csv")).unwrap();
        let lines: Vec<&str> = csv.lines().collect();
        assert_eq!(lines[0], "as_of,complete,rsi_value,volume_abs,volume_rel");
        assert_eq!(lines.len(), 4);
        assert!(lines[1].starts_with("2024-01-03T00:00:00Z,1,"));

        let restored = IndicatorSink::open(dir.path(), &[]).unwrap();
        assert_eq!(restored.snapshot(), sink.snapshot());
        assert!(restored.rows(Level::M1).is_empty());
    }

    #[test]
    fn test_open_rejects_other_schema() {
        let dir = TempDir::new().unwrap();
        let mut snapshot = IndicatorSink::new(&configs()).snapshot();
        snapshot.schema_version = 99;
        snapshot_file(dir.path()).save(&snapshot).unwrap();

        assert!(matches!(
            IndicatorSink::open(dir.path(), &configs()),
            Err(IndicatorError::SnapshotVersion { found: 99, .. })
        ));
    }
}
