//! Durable sample storage for barwire.
//!
//! - [`Storage`] - Async append/load/sanitize interface
//! - [`CsvStore`] - One append-only CSV file per asset
//! - [`MemoryStore`] - In-memory backend with failure injection
//! - [`sanitize`] - Deduplicate, validate and order a series
//! - [`SnapshotFile`] - Atomically replaced JSON document

#![doc = include_str!("../README.md")]
#![doc(issue_tracker_base_url = "https://github.com/factordynamics/barwire/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod csv;
mod error;
mod memory;
mod sanitize;
mod snapshot;
mod storage;

pub use csv::CsvStore;
pub use error::{Result, StoreError};
pub use memory::MemoryStore;
pub use sanitize::{SanitizeReport, sanitize};
pub use snapshot::{SnapshotFile, write_atomic};
pub use storage::Storage;
