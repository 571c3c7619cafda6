//! SiteClient trait for mocking
//!
//! Abstracts the fetch client so reconciler unit tests can run without a
//! network. The concrete `SiteClient` implements this trait.

use crate::error::SiteClientError;

/// Trait for fetching the HTML body of a site
#[async_trait::async_trait]
pub trait SiteClientTrait: Send + Sync {
    /// Fetch the HTML body at `url`
    ///
    /// Returns the response body on a 2xx status; any other status or a
    /// transport failure is an error.
    async fn fetch_html(&self, url: &str) -> Result<String, SiteClientError>;
}
