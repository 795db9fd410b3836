//! Fetch errors.

use thiserror::Error;

/// Errors that can occur while fetching a page.
#[derive(Error, Debug)]
pub enum FetchError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Server returned an error status.
    #[error("Server error: {status}")]
    ServerError {
        /// HTTP status code.
        status: u16,
    },

    /// The response body could not be decoded.
    #[error("Malformed response: {0}")]
    Decode(#[from] serde_json::Error),

    /// The source does not know the requested asset.
    #[error("Unknown asset: {0}")]
    UnknownAsset(String),

    /// The source is temporarily unreachable.
    #[error("Source unavailable: {0}")]
    Unavailable(String),
}

impl FetchError {
    /// Returns true if retrying the same request may succeed.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Http(e) => {
                !e.is_builder()
                    && (e.is_timeout() || e.is_connect() || e.is_request() || e.is_body())
            }
            Self::ServerError { status } => *status >= 500 || *status == 429,
            Self::Decode(_) | Self::Unavailable(_) => true,
            Self::UnknownAsset(_) => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transient_classification() {
        assert!(FetchError::ServerError { status: 503 }.is_transient());
        assert!(FetchError::ServerError { status: 429 }.is_transient());
        assert!(!FetchError::ServerError { status: 400 }.is_transient());
        assert!(FetchError::Unavailable("reset".into()).is_transient());
        assert!(!FetchError::UnknownAsset("FOO".into()).is_transient());
    }
}
