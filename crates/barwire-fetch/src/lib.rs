//! Source access for barwire.
//!
//! This crate provides everything between the remote source and clean
//! samples:
//!
//! - [`Downloader`] - Paged source interface
//! - [`HttpDownloader`] - HTTP client with connection pooling
//! - [`ScriptedDownloader`] - Replays a fixed script of results
//! - [`url::candles_url`] - Candle endpoint URLs
//! - [`normalize_page`] - Raw row filtering and ordering

#![doc = include_str!("../README.md")]
#![doc(issue_tracker_base_url = "https://github.com/factordynamics/barwire/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod downloader;
mod error;
mod http;
mod normalize;
mod scripted;
pub mod url;

pub use downloader::{Downloader, Fetch};
pub use error::FetchError;
pub use http::{ClientConfig, HttpDownloader, decode_page};
pub use normalize::{NormalizeReport, normalize_page};
pub use scripted::ScriptedDownloader;
