//! Atomic JSON snapshot files.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::{Result, StoreError};

/// Writes `bytes` to `path` so readers see either the old or the new file.
///
/// The data goes to a sibling temporary file which is synced and then
/// renamed over the destination.
///
/// # Errors
///
/// Returns an error if the directory cannot be created or any write fails.
pub fn write_atomic(path: &Path, bytes: &[u8]) -> Result<()> {
    let dir = path.parent().filter(|p| !p.as_os_str().is_empty());
    if let Some(dir) = dir {
        fs::create_dir_all(dir).map_err(|source| StoreError::CreateDir {
            path: dir.to_path_buf(),
            source,
        })?;
    }

    let mut tmp_name = path.file_name().unwrap_or_default().to_os_string();
    tmp_name.push(".tmp");
    let tmp = path.with_file_name(tmp_name);

    let write = |tmp: &Path| -> std::io::Result<()> {
        let mut file = fs::File::create(tmp)?;
        file.write_all(bytes)?;
        file.sync_all()?;
        fs::rename(tmp, path)
    };
    write(&tmp).map_err(|source| {
        let _ = fs::remove_file(&tmp);
        StoreError::WriteFile {
            path: path.to_path_buf(),
            source,
        }
    })
}

/// A JSON document persisted with [`write_atomic`].
#[derive(Debug, Clone)]
pub struct SnapshotFile {
    path: PathBuf,
}

impl SnapshotFile {
    /// Creates a handle for the snapshot at `path`.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Returns the snapshot path.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Serializes and atomically stores `value`.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization or the write fails.
    pub fn save<T: Serialize>(&self, value: &T) -> Result<()> {
        let json = serde_json::to_vec_pretty(value)?;
        write_atomic(&self.path, &json)
    }

    /// Loads the snapshot, or `None` if it has never been written.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed.
    pub fn load<T: DeserializeOwned>(&self) -> Result<Option<T>> {
        let bytes = match fs::read(&self.path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(source) => {
                return Err(StoreError::ReadFile {
                    path: self.path.clone(),
                    source,
                });
            }
        };
        serde_json::from_slice(&bytes)
            .map(Some)
            .map_err(|source| StoreError::ParseJson {
                path: self.path.clone(),
                source,
            })
    }

    /// Deletes the snapshot if present.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be removed.
    pub fn remove(&self) -> Result<()> {
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(source) => Err(StoreError::WriteFile {
                path: self.path.clone(),
                source,
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use tempfile::TempDir;

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct State {
        version: u32,
        count: u64,
    }

    #[test]
    fn test_snapshot_round_trip_and_replace() {
        let dir = TempDir::new().unwrap();
        let file = SnapshotFile::new(dir.path().join("nested").join("state.json"));

        assert_eq!(file.load::<State>().unwrap(), None);

        file.save(&State { version: 1, count: 3 }).unwrap();
        file.save(&State { version: 1, count: 9 }).unwrap();
        assert_eq!(
            file.load::<State>().unwrap(),
            Some(State { version: 1, count: 9 })
        );
        assert!(!dir.path().join("nested").join("state.json.tmp").exists());

        file.remove().unwrap();
        file.remove().unwrap();
        assert_eq!(file.load::<State>().unwrap(), None);
    }

    #[test]
    fn test_corrupt_snapshot_is_an_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("state.json");
        fs::write(&path, b"{ not json").unwrap();

        let result = SnapshotFile::new(&path).load::<State>();
        assert!(matches!(result, Err(StoreError::ParseJson { .. })));
    }
}
