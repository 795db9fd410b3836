//! Multi-level OHLCV bars and indicators from one-minute market data.
//!
//! This is a facade crate that re-exports functionality from the barwire
//! workspace crates for convenient access.
//!
//! # Quick Start
//!
//! ```ignore
//! use std::sync::Arc;
//! use barwire_lib::prelude::*;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let calendar: Arc<dyn TradingCalendar> = Arc::new(FxCalendar::default());
//!     let asset = Asset::new(AssetId::new(1), "EUR_USD", Category::Forex);
//!     let storage = Arc::new(CsvStore::new(CsvStore::default_root()));
//!
//!     let sink = IndicatorSink::new(&IndicatorConfig::defaults());
//!     let replay = Replay::new(asset, storage, calendar, "state/EUR_USD".as_ref());
//!     let (report, sink) = replay.run(sink).await?;
//!
//!     println!("fed {} samples", report.fed);
//!     println!("{:?}", sink.latest(Level::H1));
//!     Ok(())
//! }
//! ```

#![doc = include_str!("../README.md")]
#![doc(issue_tracker_base_url = "https://github.com/factordynamics/barwire/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

// Core types
pub use barwire_types::*;

// Trading calendar and period clock
pub use barwire_calendar::{
    Clock, FixedClock, FxCalendar, Period, SystemClock, TradingCalendar, floor_minute, period,
};

// Aggregation
pub use barwire_aggregate::{
    AggregateError, Aggregator, AggregatorSnapshot, Bar, Notification, NotificationKind,
    RecordingSink, SNAPSHOT_VERSION, Sink, SinkError,
};

// Storage
pub use barwire_store::{
    CsvStore, MemoryStore, SanitizeReport, SnapshotFile, Storage, StoreError, sanitize,
    write_atomic,
};

// Indicators
#[cfg(feature = "indicators")]
pub use barwire_indicators::{
    Bollinger, Ema, Indicator, IndicatorConfig, IndicatorError, IndicatorSink, IndicatorSnapshot,
    OutputRow, Rsi, Volume, WARMING_UP,
};

// Source access
#[cfg(feature = "fetch")]
pub use barwire_fetch::{
    ClientConfig, Downloader, Fetch, FetchError, HttpDownloader, NormalizeReport,
    ScriptedDownloader, normalize_page,
};

// Pipelines
#[cfg(feature = "pipeline")]
pub use barwire_pipeline::{
    CalendarConfig, Config, DecisionMaker, DownloadOutcome, IngestReport, IngestionPipeline,
    LiveReport, LiveSession, LiveUpdate, LoggingDecision, PipelineConfig, PipelineError,
    PipelineStatus, Replay, ReplayReport, SourceConfig, StatusSnapshot,
};

/// Prelude module for convenient imports.
///
/// ```
/// use barwire_lib::prelude::*;
/// ```
pub mod prelude {
    pub use barwire_types::{
        Asset, AssetId, AssetRegistry, BarwireError, Category, Cursor, Level, Sample,
    };

    pub use barwire_calendar::{Clock, FxCalendar, SystemClock, TradingCalendar};

    pub use barwire_aggregate::{Aggregator, Bar, Sink};

    pub use barwire_store::{CsvStore, Storage};

    #[cfg(feature = "indicators")]
    pub use barwire_indicators::{IndicatorConfig, IndicatorSink, OutputRow};

    #[cfg(feature = "fetch")]
    pub use barwire_fetch::{Downloader, HttpDownloader};

    #[cfg(feature = "pipeline")]
    pub use barwire_pipeline::{
        Config, DecisionMaker, IngestionPipeline, LiveSession, LoggingDecision, Replay,
    };
}
