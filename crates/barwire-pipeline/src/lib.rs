//! Ingestion, replay and live sessions for barwire.
//!
//! - [`IngestionPipeline`] - Downloader, processor and writer stages for one asset
//! - [`Replay`] - Stored samples through an aggregator with resumable checkpoints
//! - [`LiveSession`] - Minute polling feeding an aggregator and a [`DecisionMaker`]
//! - [`Config`] - TOML configuration for all of the above

#![doc = include_str!("../README.md")]
#![doc(issue_tracker_base_url = "https://github.com/factordynamics/barwire/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod config;
mod download;
mod error;
mod ingest;
mod live;
mod process;
mod replay;
mod status;
mod write;

pub use config::{CalendarConfig, Config, PipelineConfig, SourceConfig};
pub use download::DownloadOutcome;
pub use error::{PipelineError, Result};
pub use ingest::{IngestReport, IngestionPipeline};
pub use live::{DecisionMaker, LiveReport, LiveSession, LiveUpdate, LoggingDecision};
pub use replay::{Replay, ReplayReport};
pub use status::{PipelineStatus, StatusSnapshot};
pub use write::WriteReport;
