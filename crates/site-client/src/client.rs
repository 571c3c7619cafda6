//! Concrete reqwest-backed site client

use crate::error::SiteClientError;
use crate::site_trait::SiteClientTrait;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, ACCEPT_LANGUAGE, CONNECTION, USER_AGENT};
use std::time::Duration;
use tracing::{debug, warn};

/// Request timeout for a single fetch
const FETCH_TIMEOUT: Duration = Duration::from_secs(30);

/// Fetches site HTML over HTTP(S)
///
/// Sends browser-like headers; several public sites answer 403 to clients
/// that present no User-Agent.
#[derive(Debug, Clone)]
pub struct SiteClient {
    http: reqwest::Client,
}

impl SiteClient {
    /// Create a new site client
    pub fn new() -> Result<Self, SiteClientError> {
        let mut headers = HeaderMap::new();
        headers.insert(
            USER_AGENT,
            HeaderValue::from_static(
                "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
                 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36",
            ),
        );
        headers.insert(
            ACCEPT,
            HeaderValue::from_static(
                "text/html,application/xhtml+xml,application/xml;q=0.9,image/webp,*/*;q=0.8",
            ),
        );
        headers.insert(ACCEPT_LANGUAGE, HeaderValue::from_static("en-US,en;q=0.9"));
        headers.insert(CONNECTION, HeaderValue::from_static("keep-alive"));
        headers.insert(
            "Upgrade-Insecure-Requests",
            HeaderValue::from_static("1"),
        );

        let http = reqwest::Client::builder()
            .timeout(FETCH_TIMEOUT)
            .default_headers(headers)
            .build()?;

        Ok(Self { http })
    }
}

#[async_trait::async_trait]
impl SiteClientTrait for SiteClient {
    async fn fetch_html(&self, url: &str) -> Result<String, SiteClientError> {
        debug!("Fetching site content from {}", url);
        let response = self.http.get(url).send().await?;
        let status = response.status();

        if !status.is_success() {
            warn!("HTTP {} fetching {}", status.as_u16(), url);
            return Err(SiteClientError::Status {
                url: url.to_string(),
                code: status.as_u16(),
            });
        }

        Ok(response.text().await?)
    }
}
