//! Runtime objects built from the configuration file.

use anyhow::{Context as _, Result, bail};
use barwire_lib::{
    Asset, AssetRegistry, CalendarConfig, Config, CsvStore, FxCalendar, HttpDownloader,
    IndicatorSink, IngestionPipeline, Replay, Storage, TradingCalendar,
};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Everything a command needs, loaded once.
pub(crate) struct Runtime {
    pub(crate) config: Config,
    pub(crate) registry: AssetRegistry,
    pub(crate) calendar: Arc<dyn TradingCalendar>,
    pub(crate) storage: Arc<CsvStore>,
}

impl Runtime {
    /// Loads and validates the configuration at `path`.
    pub(crate) fn load(path: &Path) -> Result<Self> {
        let config = Config::load(path)
            .with_context(|| format!("Failed to load configuration from {}", path.display()))?;
        let registry = config.registry()?;
        let calendar: Arc<dyn TradingCalendar> = Arc::new(config.calendar.build());
        let storage = Arc::new(CsvStore::new(config.data_dir()));
        tracing::debug!(
            root = %storage.root().display(),
            assets = registry.len(),
            "configuration loaded"
        );
        Ok(Self {
            config,
            registry,
            calendar,
            storage,
        })
    }

    /// Resolves symbols, or returns every configured asset when none are given.
    pub(crate) fn select(&self, symbols: &[String]) -> Result<Vec<Asset>> {
        if symbols.is_empty() {
            return Ok(self.registry.iter().cloned().collect());
        }
        let mut assets = Vec::with_capacity(symbols.len());
        for symbol in symbols {
            assets.push(self.registry.resolve(symbol)?.clone());
        }
        Ok(assets)
    }

    /// Resolves a single symbol.
    pub(crate) fn asset(&self, symbol: &str) -> Result<Asset> {
        Ok(self.registry.resolve(symbol)?.clone())
    }

    pub(crate) fn storage(&self) -> Arc<dyn Storage> {
        Arc::clone(&self.storage) as Arc<dyn Storage>
    }

    /// Builds the HTTP downloader shared by every asset.
    pub(crate) fn downloader(&self) -> Result<Arc<HttpDownloader>> {
        let client = HttpDownloader::new(self.config.source.client_config())
            .context("Failed to build HTTP client")?;
        Ok(Arc::new(client))
    }

    pub(crate) fn pipeline(
        &self,
        asset: Asset,
        downloader: Arc<HttpDownloader>,
    ) -> IngestionPipeline {
        let calendar = Arc::clone(&self.calendar);
        IngestionPipeline::new(asset, downloader, self.storage(), calendar)
            .with_settings(self.config.pipeline)
    }

    /// Per-asset directory holding checkpoints and indicator output.
    pub(crate) fn state_dir(&self, asset: &Asset) -> PathBuf {
        self.storage.root().join(asset.symbol()).join("state")
    }

    pub(crate) fn replay(&self, asset: &Asset, checkpoint_every: Option<u64>) -> Replay {
        Replay::new(
            asset.clone(),
            self.storage(),
            Arc::clone(&self.calendar),
            &self.state_dir(asset),
        )
        .with_checkpoint_every(checkpoint_every.unwrap_or(self.config.checkpoint_every))
    }

    /// Opens the asset's indicator sink, restoring saved indicator state.
    pub(crate) fn indicator_sink(&self, asset: &Asset) -> Result<IndicatorSink> {
        let dir = self.state_dir(asset).join("indicators");
        IndicatorSink::open(&dir, &self.config.indicator_configs())
            .with_context(|| format!("Failed to open indicator state in {}", dir.display()))
    }
}

/// Loads the calendar from the configuration if it exists, otherwise
/// the default FX calendar.
pub(crate) fn calendar_or_default(path: &Path) -> Result<FxCalendar> {
    if !path.exists() {
        return Ok(CalendarConfig::default().build());
    }
    match Config::load(path) {
        Ok(config) => Ok(config.calendar.build()),
        Err(e) => bail!("Failed to load configuration from {}: {e}", path.display()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn write_config(dir: &TempDir) -> PathBuf {
        let path = dir.path().join("barwire.toml");
        let text = format!(
            r#"
data_dir = "{}"

[[assets]]
id = 1
symbol = "EUR_USD"

[[assets]]
id = 2
symbol = "XAU_USD"
category = "commodity"
"#,
            dir.path().join("data").display()
        );
        std::fs::write(&path, text).unwrap();
        path
    }

    #[test]
    fn test_runtime_select() {
        let dir = TempDir::new().unwrap();
        let runtime = Runtime::load(&write_config(&dir)).unwrap();

        assert_eq!(runtime.select(&[]).unwrap().len(), 2);
        let picked = runtime.select(&["xau_usd".to_string()]).unwrap();
        assert_eq!(picked[0].symbol(), "XAU_USD");
        assert!(runtime.select(&["GBP_USD".to_string()]).is_err());
    }

    #[test]
    fn test_runtime_state_dir() {
        let dir = TempDir::new().unwrap();
        let runtime = Runtime::load(&write_config(&dir)).unwrap();
        let asset = runtime.asset("EUR_USD").unwrap();

        assert_eq!(
            runtime.state_dir(&asset),
            dir.path().join("data").join("EUR_USD").join("state")
        );
        assert!(
            runtime
                .replay(&asset, None)
                .snapshot_path()
                .ends_with("EUR_USD/state/aggregator.json")
        );
    }

    #[test]
    fn test_calendar_default_without_config() {
        let dir = TempDir::new().unwrap();
        let calendar = calendar_or_default(&dir.path().join("missing.toml")).unwrap();
        assert_eq!(calendar, CalendarConfig::default().build());
    }
}
