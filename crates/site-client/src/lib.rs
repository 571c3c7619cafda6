//! Site content fetch client
//!
//! Fetches the HTML body a DummySite mirrors. The concrete client wraps
//! `reqwest`; the trait exists so reconciler unit tests can substitute an
//! in-memory mock without a network.

mod client;
mod error;
mod site_trait;

#[cfg(any(test, feature = "test-util"))]
mod mock;

pub use client::SiteClient;
pub use error::SiteClientError;
pub use site_trait::SiteClientTrait;

#[cfg(any(test, feature = "test-util"))]
pub use mock::MockSiteClient;
