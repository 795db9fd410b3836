//! Multi-level bar aggregation for barwire.
//!
//! This crate turns a stream of one-minute samples into eight simultaneous
//! bar levels:
//!
//! - [`Bar`] - OHLCV aggregate for one level
//! - [`Aggregator`] - Streaming state machine with boundary repair
//! - [`Sink`] - Receiver of per-level close/unchanged notifications
//! - [`RecordingSink`] - Sink that records every notification

#![doc = include_str!("../README.md")]
#![doc(issue_tracker_base_url = "https://github.com/factordynamics/barwire/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod aggregator;
mod bar;
mod error;
mod sink;

pub use aggregator::{Aggregator, AggregatorSnapshot, SNAPSHOT_VERSION};
pub use bar::Bar;
pub use error::AggregateError;
pub use sink::{Notification, NotificationKind, RecordingSink, Sink, SinkError};
