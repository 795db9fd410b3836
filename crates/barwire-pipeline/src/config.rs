//! TOML configuration.

use std::path::{Path, PathBuf};
use std::time::Duration;

use barwire_calendar::FxCalendar;
use barwire_fetch::ClientConfig;
use barwire_indicators::IndicatorConfig;
use barwire_store::CsvStore;
use barwire_types::{Asset, AssetRegistry, Backoff};
use chrono::NaiveDate;
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

use crate::{PipelineError, Result};

/// Complete runtime configuration, immutable once loaded.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Root of stored series and checkpoints.
    #[serde(default)]
    pub data_dir: Option<PathBuf>,
    /// Samples between aggregator checkpoints.
    #[serde(default = "default_checkpoint_every")]
    pub checkpoint_every: u64,
    /// Remote source settings.
    #[serde(default)]
    pub source: SourceConfig,
    /// Ingestion pipeline settings.
    #[serde(default)]
    pub pipeline: PipelineConfig,
    /// Trading calendar settings.
    #[serde(default)]
    pub calendar: CalendarConfig,
    /// Indicators run on every level; empty means the default set.
    #[serde(default)]
    pub indicators: Vec<IndicatorConfig>,
    /// Assets to ingest.
    #[serde(default)]
    pub assets: Vec<Asset>,
}

const fn default_checkpoint_every() -> u64 {
    250_000
}

/// Remote source settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SourceConfig {
    /// Base URL of the candle API.
    pub base_url: String,
    /// Rows per page.
    pub page_size: usize,
    /// Request timeout in seconds.
    pub timeout_secs: u64,
}

impl Default for SourceConfig {
    fn default() -> Self {
        let client = ClientConfig::default();
        Self {
            base_url: client.base_url,
            page_size: client.page_size,
            timeout_secs: client.timeout.as_secs(),
        }
    }
}

impl SourceConfig {
    /// Returns the HTTP client configuration.
    #[must_use]
    pub fn client_config(&self) -> ClientConfig {
        ClientConfig {
            base_url: self.base_url.clone(),
            page_size: self.page_size,
            timeout: Duration::from_secs(self.timeout_secs),
            ..ClientConfig::default()
        }
    }
}

/// Ingestion pipeline settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Capacity of each inter-stage channel.
    pub queue_capacity: usize,
    /// Rows written between sanitize passes.
    pub sanitize_threshold: usize,
    /// Fixed delay between download retries, in seconds.
    pub retry_delay_secs: u64,
    /// Storage retries before a write fails.
    pub storage_retries: u32,
    /// Base storage retry delay in milliseconds.
    pub storage_base_delay_ms: u64,
    /// Maximum storage retry delay in milliseconds.
    pub storage_max_delay_ms: u64,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        let backoff = Backoff::default();
        Self {
            queue_capacity: 16,
            sanitize_threshold: 500,
            retry_delay_secs: 10,
            storage_retries: backoff.max_retries,
            storage_base_delay_ms: backoff.base_delay_ms,
            storage_max_delay_ms: backoff.max_delay_ms,
        }
    }
}

impl PipelineConfig {
    /// Delay between download retries.
    #[must_use]
    pub const fn retry_delay(&self) -> Duration {
        Duration::from_secs(self.retry_delay_secs)
    }

    /// Backoff policy for storage operations.
    #[must_use]
    pub const fn storage_backoff(&self) -> Backoff {
        Backoff {
            max_retries: self.storage_retries,
            base_delay_ms: self.storage_base_delay_ms,
            max_delay_ms: self.storage_max_delay_ms,
        }
    }
}

/// Trading calendar settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CalendarConfig {
    /// IANA zone of the daily rollover.
    pub timezone: Tz,
    /// Dates with no trading.
    pub holidays: Vec<NaiveDate>,
}

impl Default for CalendarConfig {
    fn default() -> Self {
        Self {
            timezone: chrono_tz::America::New_York,
            holidays: Vec::new(),
        }
    }
}

impl CalendarConfig {
    /// Builds the calendar.
    #[must_use]
    pub fn build(&self) -> FxCalendar {
        FxCalendar::new(self.timezone).with_holidays(self.holidays.iter().copied())
    }
}

impl Config {
    /// Parses and validates a TOML document.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::Config`] if the document does not parse or
    /// fails validation.
    pub fn from_toml_str(text: &str) -> Result<Self> {
        let config: Self =
            toml::from_str(text).map_err(|e| PipelineError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Reads, parses and validates a TOML file.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::Config`] if the file cannot be read or the
    /// configuration is invalid.
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .map_err(|e| PipelineError::Config(format!("{}: {e}", path.display())))?;
        Self::from_toml_str(&text)
    }

    /// Checks invariants that serde cannot express.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::Config`] describing the first violation.
    pub fn validate(&self) -> Result<()> {
        if self.assets.is_empty() {
            return Err(PipelineError::Config("no assets configured".into()));
        }
        self.registry()?;

        let positive = [
            ("source.page_size", self.source.page_size),
            ("pipeline.queue_capacity", self.pipeline.queue_capacity),
            ("pipeline.sanitize_threshold", self.pipeline.sanitize_threshold),
        ];
        if let Some((name, _)) = positive.iter().find(|(_, value)| *value == 0) {
            return Err(PipelineError::Config(format!("{name} must be positive")));
        }
        if self.checkpoint_every == 0 {
            return Err(PipelineError::Config("checkpoint_every must be positive".into()));
        }
        for indicator in &self.indicators {
            indicator.validate().map_err(PipelineError::Config)?;
        }
        Ok(())
    }

    /// Builds the asset registry.
    ///
    /// # Errors
    ///
    /// Returns an error if two assets share an id or symbol.
    pub fn registry(&self) -> Result<AssetRegistry> {
        Ok(AssetRegistry::new(self.assets.clone())?)
    }

    /// Returns the data directory, defaulting to the platform location.
    #[must_use]
    pub fn data_dir(&self) -> PathBuf {
        self.data_dir.clone().unwrap_or_else(CsvStore::default_root)
    }

    /// Returns the configured indicators, or the default set.
    #[must_use]
    pub fn indicator_configs(&self) -> Vec<IndicatorConfig> {
        if self.indicators.is_empty() {
            IndicatorConfig::defaults().to_vec()
        } else {
            self.indicators.clone()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use barwire_types::Category;

    const SAMPLE: &str = r#"
        data_dir = "/tmp/barwire"
        checkpoint_every = 1000

        [source]
        base_url = "https://example.invalid/v1"
        page_size = 500

        [pipeline]
        sanitize_threshold = 50
        retry_delay_secs = 2

        [calendar]
        timezone = "America/New_York"
        holidays = ["2024-12-25"]

        [[indicators]]
        kind = "rsi"
        period = 14

        [[assets]]
        id = 1
        symbol = "EUR_USD"
        category = "forex"
        start = "2020-01-01T00:00:00Z"

        [[assets]]
        id = 2
        symbol = "SPX500_USD"
        category = "index"
    "#;

    #[test]
    fn test_parse_full_config() {
        let config = Config::from_toml_str(SAMPLE).unwrap();
        assert_eq!(config.data_dir(), PathBuf::from("/tmp/barwire"));
        assert_eq!(config.checkpoint_every, 1000);
        assert_eq!(config.source.page_size, 500);
        assert_eq!(config.source.timeout_secs, 30);
        assert_eq!(config.pipeline.sanitize_threshold, 50);
        assert_eq!(config.pipeline.queue_capacity, 16);
        assert_eq!(config.pipeline.retry_delay(), Duration::from_secs(2));
        assert_eq!(config.indicator_configs(), vec![IndicatorConfig::Rsi { period: 14 }]);

        let registry = config.registry().unwrap();
        assert_eq!(registry.len(), 2);
        assert_eq!(registry.resolve("spx500_usd").unwrap().category(), Category::Index);
        assert!(registry.resolve("EUR_USD").unwrap().start().is_some());

        let calendar = config.calendar.build();
        assert!(calendar.is_holiday(NaiveDate::from_ymd_opt(2024, 12, 25).unwrap()));
    }

    #[test]
    fn test_defaults_apply() {
        let config = Config::from_toml_str(
            r#"
            [[assets]]
            id = 1
            symbol = "EUR_USD"
            "#,
        )
        .unwrap();
        assert_eq!(config.checkpoint_every, 250_000);
        assert_eq!(config.pipeline, PipelineConfig::default());
        assert_eq!(config.calendar.timezone, chrono_tz::America::New_York);
        assert_eq!(config.indicator_configs().len(), 4);
        assert_eq!(config.pipeline.storage_backoff(), Backoff::default());
    }

    #[test]
    fn test_validation_failures() {
        assert!(matches!(
            Config::from_toml_str(""),
            Err(PipelineError::Config(_))
        ));

        let duplicate = r#"
            [[assets]]
            id = 1
            symbol = "EUR_USD"
            [[assets]]
            id = 1
            symbol = "GBP_USD"
        "#;
        assert!(Config::from_toml_str(duplicate).is_err());

        let zero_queue = r#"
            [pipeline]
            queue_capacity = 0
            [[assets]]
            id = 1
            symbol = "EUR_USD"
        "#;
        let err = Config::from_toml_str(zero_queue).unwrap_err();
        assert!(err.to_string().contains("queue_capacity"));

        let bad_zone = r#"
            [calendar]
            timezone = "Mars/Olympus"
            [[assets]]
            id = 1
            symbol = "EUR_USD"
        "#;
        assert!(Config::from_toml_str(bad_zone).is_err());
    }
}
