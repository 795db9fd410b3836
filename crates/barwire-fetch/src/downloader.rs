//! Source interface.

use async_trait::async_trait;
use barwire_types::{Asset, Cursor, RawPage};

use crate::FetchError;

/// Result of one fetch.
#[derive(Debug, Clone, PartialEq)]
pub enum Fetch {
    /// A page of rows starting at or after the cursor.
    Page(RawPage),
    /// The source has nothing at or after the cursor.
    EndOfStream,
}

/// A paged source of one-minute rows.
///
/// A page shorter than [`Downloader::page_size`] means the caller has caught
/// up with the source.
#[async_trait]
pub trait Downloader: Send + Sync + std::fmt::Debug {
    /// Fetches the page starting at `cursor`.
    async fn fetch(&self, asset: &Asset, cursor: Cursor) -> Result<Fetch, FetchError>;

    /// Maximum number of rows per page.
    fn page_size(&self) -> usize;
}
