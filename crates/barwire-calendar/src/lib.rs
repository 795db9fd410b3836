//! Trading calendar and bucket arithmetic for barwire.
//!
//! This crate provides:
//!
//! - [`TradingCalendar`] - Predicate for valid market time plus weekly session instants
//! - [`FxCalendar`] - The New York 17:00 spot FX convention with configurable holidays
//! - [`period`] - Pure mapping from a timestamp and [`Level`](barwire_types::Level) to a [`Period`]
//! - [`Clock`] - Wall-clock abstraction used by retry and live scheduling

#![doc = include_str!("../README.md")]
#![doc(issue_tracker_base_url = "https://github.com/factordynamics/barwire/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod calendar;
mod clock;
mod period;

pub use calendar::{FxCalendar, TradingCalendar, floor_minute};
pub use clock::{Clock, FixedClock, SystemClock};
pub use period::{Period, period};
