//! Site client errors

use thiserror::Error;

/// Errors that can occur when fetching site content
#[derive(Debug, Error)]
pub enum SiteClientError {
    /// HTTP request/response error
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Server answered with a non-success status
    #[error("unexpected status {code} fetching {url}")]
    Status {
        /// URL that was fetched
        url: String,
        /// HTTP status code returned
        code: u16,
    },
}
