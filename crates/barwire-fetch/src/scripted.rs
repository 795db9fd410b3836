//! Downloader that replays a fixed script.

use std::collections::VecDeque;

use async_trait::async_trait;
use barwire_types::{Asset, Cursor, RawPage};
use tokio::sync::Mutex;

use crate::{Downloader, Fetch, FetchError};

/// Returns scripted results in order, then [`Fetch::EndOfStream`] forever.
///
/// Records every cursor it was asked for.
#[derive(Debug)]
pub struct ScriptedDownloader {
    script: Mutex<VecDeque<Result<Fetch, FetchError>>>,
    requests: Mutex<Vec<Cursor>>,
    page_size: usize,
}

impl ScriptedDownloader {
    /// Creates a downloader with the given page size and script.
    #[must_use]
    pub fn new(
        page_size: usize,
        script: impl IntoIterator<Item = Result<Fetch, FetchError>>,
    ) -> Self {
        Self {
            script: Mutex::new(script.into_iter().collect()),
            requests: Mutex::new(Vec::new()),
            page_size,
        }
    }

    /// Creates a downloader that serves `pages` and then ends.
    #[must_use]
    pub fn pages(page_size: usize, pages: impl IntoIterator<Item = RawPage>) -> Self {
        Self::new(page_size, pages.into_iter().map(|page| Ok(Fetch::Page(page))))
    }

    /// Returns the cursors requested so far.
    pub async fn requests(&self) -> Vec<Cursor> {
        self.requests.lock().await.clone()
    }

    /// Returns how many scripted results remain.
    pub async fn remaining(&self) -> usize {
        self.script.lock().await.len()
    }
}

#[async_trait]
impl Downloader for ScriptedDownloader {
    async fn fetch(&self, _asset: &Asset, cursor: Cursor) -> Result<Fetch, FetchError> {
        self.requests.lock().await.push(cursor);
        self.script
            .lock()
            .await
            .pop_front()
            .unwrap_or(Ok(Fetch::EndOfStream))
    }

    fn page_size(&self) -> usize {
        self.page_size
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use barwire_types::{AssetId, Category};
    use chrono::{TimeZone, Utc};

    #[tokio::test]
    async fn test_script_then_end_of_stream() {
        let asset = Asset::new(AssetId::new(1), "EUR_USD", Category::Forex);
        let cursor = Cursor::at(Utc.with_ymd_and_hms(2024, 1, 3, 0, 0, 0).unwrap());
        let downloader = ScriptedDownloader::new(
            10,
            [
                Err(FetchError::Unavailable("down".into())),
                Ok(Fetch::Page(RawPage::new("EUR_USD", Vec::new()))),
            ],
        );

        assert!(downloader.fetch(&asset, cursor).await.is_err());
        assert!(matches!(
            downloader.fetch(&asset, cursor).await,
            Ok(Fetch::Page(_))
        ));
        assert_eq!(
            downloader.fetch(&asset, cursor).await.unwrap(),
            Fetch::EndOfStream
        );
        assert_eq!(downloader.requests().await.len(), 3);
        assert_eq!(downloader.remaining().await, 0);
    }
}
