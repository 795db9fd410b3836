//! Tradable asset definitions and the immutable asset registry.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::BarwireError;

/// Compact numeric asset identifier carried by every sample.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AssetId(u32);

impl AssetId {
    /// Creates a new asset id.
    #[must_use]
    pub const fn new(id: u32) -> Self {
        Self(id)
    }

    /// Returns the raw numeric id.
    #[must_use]
    pub const fn get(self) -> u32 {
        self.0
    }
}

impl std::fmt::Display for AssetId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Asset category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    /// Foreign exchange currency pairs.
    #[default]
    Forex,
    /// Stock indices.
    Index,
    /// Commodities (metals, energy, agriculture).
    Commodity,
    /// Government bonds.
    Bond,
}

impl Category {
    /// Returns the category as a string slice.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Forex => "forex",
            Self::Index => "index",
            Self::Commodity => "commodity",
            Self::Bond => "bond",
        }
    }
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A tradable asset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Asset {
    id: AssetId,
    symbol: String,
    #[serde(default)]
    category: Category,
    /// First minute to request when nothing is stored yet.
    #[serde(default)]
    start: Option<DateTime<Utc>>,
}

impl Asset {
    /// Creates a new asset.
    #[must_use]
    pub fn new(id: AssetId, symbol: impl Into<String>, category: Category) -> Self {
        Self {
            id,
            symbol: symbol.into(),
            category,
            start: None,
        }
    }

    /// Returns the asset with a download start instant.
    #[must_use]
    pub fn with_start(mut self, start: DateTime<Utc>) -> Self {
        self.start = Some(start);
        self
    }

    /// Returns the numeric id.
    #[must_use]
    pub const fn id(&self) -> AssetId {
        self.id
    }

    /// Returns the symbol (e.g. `EUR_USD`).
    #[must_use]
    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    /// Returns the asset category.
    #[must_use]
    pub const fn category(&self) -> Category {
        self.category
    }

    /// Returns the configured download start, if any.
    #[must_use]
    pub const fn start(&self) -> Option<DateTime<Utc>> {
        self.start
    }
}

impl std::fmt::Display for Asset {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.symbol, self.id)
    }
}

/// Immutable table of configured assets.
///
/// Built once from configuration and passed by reference to whatever needs
/// to resolve ids or symbols.
#[derive(Debug, Clone, Default)]
pub struct AssetRegistry {
    assets: Vec<Asset>,
}

impl AssetRegistry {
    /// Builds a registry, rejecting duplicate ids or symbols.
    ///
    /// # Errors
    ///
    /// Returns [`BarwireError::DuplicateAsset`] if two assets share an id
    /// or a symbol.
    pub fn new(assets: Vec<Asset>) -> Result<Self, BarwireError> {
        for (i, asset) in assets.iter().enumerate() {
            let clash = assets[..i]
                .iter()
                .any(|other| other.id == asset.id || other.symbol == asset.symbol);
            if clash {
                return Err(BarwireError::DuplicateAsset(asset.symbol.clone()));
            }
        }
        Ok(Self { assets })
    }

    /// Looks up an asset by id.
    #[must_use]
    pub fn get(&self, id: AssetId) -> Option<&Asset> {
        self.assets.iter().find(|asset| asset.id == id)
    }

    /// Looks up an asset by symbol (case-insensitive).
    #[must_use]
    pub fn by_symbol(&self, symbol: &str) -> Option<&Asset> {
        self.assets
            .iter()
            .find(|asset| asset.symbol.eq_ignore_ascii_case(symbol))
    }

    /// Looks up an asset by symbol, failing with a typed error.
    ///
    /// # Errors
    ///
    /// Returns [`BarwireError::UnknownAsset`] if the symbol is not registered.
    pub fn resolve(&self, symbol: &str) -> Result<&Asset, BarwireError> {
        self.by_symbol(symbol)
            .ok_or_else(|| BarwireError::UnknownAsset(symbol.to_string()))
    }

    /// Returns all assets in configuration order.
    pub fn iter(&self) -> impl Iterator<Item = &Asset> {
        self.assets.iter()
    }

    /// Returns the number of assets.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.assets.len()
    }

    /// Returns true if no assets are registered.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.assets.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn eurusd() -> Asset {
        Asset::new(AssetId::new(1), "EUR_USD", Category::Forex)
    }

    #[test]
    fn test_asset_accessors() {
        let start = Utc.with_ymd_and_hms(2020, 1, 1, 0, 0, 0).unwrap();
        let asset = eurusd().with_start(start);

        assert_eq!(asset.id().get(), 1);
        assert_eq!(asset.symbol(), "EUR_USD");
        assert_eq!(asset.category(), Category::Forex);
        assert_eq!(asset.start(), Some(start));
        assert_eq!(asset.to_string(), "EUR_USD (#1)");
    }

    #[test]
    fn test_registry_lookup() {
        let registry = AssetRegistry::new(vec![
            eurusd(),
            Asset::new(AssetId::new(2), "XAU_USD", Category::Commodity),
        ])
        .unwrap();

        assert_eq!(registry.len(), 2);
        assert_eq!(registry.get(AssetId::new(2)).unwrap().symbol(), "XAU_USD");
        assert_eq!(registry.by_symbol("eur_usd").unwrap().id(), AssetId::new(1));
        assert!(matches!(
            registry.resolve("GBP_USD"),
            Err(BarwireError::UnknownAsset(_))
        ));
    }

    #[test]
    fn test_registry_rejects_duplicates() {
        let result = AssetRegistry::new(vec![
            eurusd(),
            Asset::new(AssetId::new(1), "GBP_USD", Category::Forex),
        ]);
        assert!(matches!(result, Err(BarwireError::DuplicateAsset(_))));
    }
}
