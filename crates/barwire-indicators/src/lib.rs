//! Technical indicators fed by barwire's aggregator.
//!
//! - [`Indicator`] - Closed set of indicators with `feed`/`fillna`
//! - [`IndicatorConfig`] - Indicator parameters as configured
//! - [`IndicatorSink`] - [`Sink`](barwire_aggregate::Sink) running indicators per level
//! - [`OutputRow`] - One buffered output row

#![doc = include_str!("../README.md")]
#![doc(issue_tracker_base_url = "https://github.com/factordynamics/barwire/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod error;
mod indicator;
mod sink;

pub use error::IndicatorError;
pub use indicator::{Bollinger, Ema, Indicator, IndicatorConfig, Rsi, Volume, WARMING_UP};
pub use sink::{INDICATOR_SNAPSHOT_VERSION, IndicatorSink, IndicatorSnapshot, OutputRow};
