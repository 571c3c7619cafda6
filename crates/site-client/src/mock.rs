//! Mock SiteClient for unit testing
//!
//! Stores url -> body pages in memory and can be configured to fail,
//! so reconciler tests run without a network.

use crate::error::SiteClientError;
use crate::site_trait::SiteClientTrait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

/// Mock SiteClient for testing
#[derive(Clone, Default)]
pub struct MockSiteClient {
    pages: Arc<Mutex<HashMap<String, String>>>,
    /// Status code to fail every fetch with, if set
    fail_status: Arc<Mutex<Option<u16>>>,
    fetch_count: Arc<AtomicUsize>,
}

impl MockSiteClient {
    /// Create a new mock client with no pages
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a page to the mock store (for test setup)
    pub fn add_page(&self, url: impl Into<String>, body: impl Into<String>) {
        self.pages.lock().unwrap().insert(url.into(), body.into());
    }

    /// Make every subsequent fetch fail with the given HTTP status
    pub fn fail_with_status(&self, code: u16) {
        *self.fail_status.lock().unwrap() = Some(code);
    }

    /// Number of fetches performed so far
    pub fn fetch_count(&self) -> usize {
        self.fetch_count.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl SiteClientTrait for MockSiteClient {
    async fn fetch_html(&self, url: &str) -> Result<String, SiteClientError> {
        self.fetch_count.fetch_add(1, Ordering::SeqCst);

        if let Some(code) = *self.fail_status.lock().unwrap() {
            return Err(SiteClientError::Status {
                url: url.to_string(),
                code,
            });
        }

        self.pages
            .lock()
            .unwrap()
            .get(url)
            .cloned()
            .ok_or_else(|| SiteClientError::Status {
                url: url.to_string(),
                code: 404,
            })
    }
}
