//! HTTP downloader.

use std::time::Duration;

use async_trait::async_trait;
use barwire_types::{Asset, Cursor, RawPage, RawRow};
use reqwest::{Client, StatusCode};
use serde::Deserialize;

use crate::url::candles_url;
use crate::{Downloader, Fetch, FetchError};

/// Configuration for the HTTP downloader.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Base URL of the candle API.
    pub base_url: String,
    /// Rows requested per page.
    pub page_size: usize,
    /// Request timeout.
    pub timeout: Duration,
    /// User agent string.
    pub user_agent: String,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8080/v3".to_string(),
            page_size: 5000,
            timeout: Duration::from_secs(30),
            user_agent: format!("barwire/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

#[derive(Debug, Deserialize)]
struct CandlesResponse {
    instrument: String,
    #[serde(default)]
    candles: Vec<RawRow>,
}

/// Downloads pages of one-minute candles over HTTP.
///
/// Each call is a single request; retrying is left to the caller.
#[derive(Debug, Clone)]
pub struct HttpDownloader {
    client: Client,
    config: ClientConfig,
}

impl HttpDownloader {
    /// Creates a downloader with the given configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be created.
    pub fn new(config: ClientConfig) -> Result<Self, reqwest::Error> {
        let client = Client::builder()
            .pool_max_idle_per_host(4)
            .pool_idle_timeout(Duration::from_secs(90))
            .tcp_nodelay(true)
            .tcp_keepalive(Duration::from_secs(60))
            .timeout(config.timeout)
            .connect_timeout(Duration::from_secs(10))
            .user_agent(&config.user_agent)
            .gzip(true)
            .build()?;
        Ok(Self { client, config })
    }

    /// Returns the downloader configuration.
    #[must_use]
    pub const fn config(&self) -> &ClientConfig {
        &self.config
    }
}

/// Decodes a candles response body into a fetch result.
///
/// # Errors
///
/// Returns [`FetchError::Decode`] if the body is not a candles document.
pub fn decode_page(body: &[u8]) -> Result<Fetch, FetchError> {
    let response: CandlesResponse = serde_json::from_slice(body)?;
    if response.candles.is_empty() {
        return Ok(Fetch::EndOfStream);
    }
    Ok(Fetch::Page(RawPage::new(response.instrument, response.candles)))
}

#[async_trait]
impl Downloader for HttpDownloader {
    async fn fetch(&self, asset: &Asset, cursor: Cursor) -> Result<Fetch, FetchError> {
        let url = candles_url(
            &self.config.base_url,
            asset.symbol(),
            cursor,
            self.config.page_size,
        );
        let response = self.client.get(&url).send().await?;
        let status = response.status();

        if status == StatusCode::NOT_FOUND {
            return Err(FetchError::UnknownAsset(asset.symbol().to_string()));
        }
        if !status.is_success() {
            return Err(FetchError::ServerError {
                status: status.as_u16(),
            });
        }

        let body = response.bytes().await?;
        let fetch = decode_page(&body)?;
        if let Fetch::Page(page) = &fetch {
            tracing::debug!(asset = %asset.symbol(), %cursor, rows = page.len(), "fetched page");
        }
        Ok(fetch)
    }

    fn page_size(&self) -> usize {
        self.config.page_size
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_config_default() {
        let config = ClientConfig::default();
        assert_eq!(config.page_size, 5000);
        assert_eq!(config.timeout, Duration::from_secs(30));
        assert!(config.user_agent.starts_with("barwire/"));
    }

    #[tokio::test]
    async fn test_downloader_creation() {
        let downloader = HttpDownloader::new(ClientConfig::default());
        assert!(downloader.is_ok());
        assert_eq!(downloader.unwrap().page_size(), 5000);
    }

    #[test]
    fn test_decode_page() {
        let body = br#"{
            "instrument": "EUR_USD",
            "granularity": "M1",
            "candles": [
                {"time": "2024-01-03T12:00:00Z", "complete": true, "volume": 12,
                 "o": 1.1, "h": 1.2, "l": 1.0, "c": 1.15}
            ]
        }"#;
        match decode_page(body).unwrap() {
            Fetch::Page(page) => {
                assert_eq!(page.asset, "EUR_USD");
                assert_eq!(page.len(), 1);
                assert_eq!(page.rows[0].volume, 12);
            }
            Fetch::EndOfStream => panic!("expected a page"),
        }

        let empty = br#"{"instrument": "EUR_USD", "candles": []}"#;
        assert_eq!(decode_page(empty).unwrap(), Fetch::EndOfStream);
        assert!(matches!(decode_page(b"<html>"), Err(FetchError::Decode(_))));
    }
}
