//! Core types for the barwire bar aggregation pipeline.
//!
//! This crate provides the fundamental data structures used throughout barwire:
//!
//! - [`Sample`] - A one-minute OHLCV sample for one asset
//! - [`RawRow`] / [`RawPage`] - Rows as delivered by a data source
//! - [`Level`] - One of the eight aggregation levels
//! - [`Asset`] / [`AssetRegistry`] - Configured tradable assets
//! - [`Cursor`] - Download resume watermark
//! - [`Backoff`] - Retry delay policy

#![doc = include_str!("../README.md")]
#![doc(issue_tracker_base_url = "https://github.com/factordynamics/barwire/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod asset;
mod cursor;
mod error;
mod level;
mod retry;
mod sample;

pub use asset::{Asset, AssetId, AssetRegistry, Category};
pub use cursor::Cursor;
pub use error::{BarwireError, Result};
pub use level::{Level, LevelParseError};
pub use retry::Backoff;
pub use sample::{RawPage, RawRow, Sample, is_minute_aligned};
