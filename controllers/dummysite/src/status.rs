//! Status reporting back onto the DummySite resource.
//!
//! The reporter re-fetches the DummySite first so the write carries the
//! latest resourceVersion, then writes through the status subresource with
//! a full-object replace as fallback (clusters registered without the
//! status subresource reject the first path).

use crate::error::ControllerError;
use async_trait::async_trait;
use crds::{DummySite, DummySiteStatus};
use kube::api::{Api, PostParams};
use kube::Client;
use std::time::Duration;
use tracing::{info, warn};

/// Fetch attempts before giving up on this reconcile's status write
const FETCH_ATTEMPTS: u32 = 3;

/// DummySite read/write capability used by the reporter.
#[async_trait]
pub trait SiteOps: Send + Sync {
    /// Fetch the current DummySite
    async fn get(&self, namespace: &str, name: &str) -> Result<DummySite, kube::Error>;
    /// Write via the status subresource
    async fn replace_status(
        &self,
        namespace: &str,
        name: &str,
        site: &DummySite,
    ) -> Result<DummySite, kube::Error>;
    /// Full-object write
    async fn replace(
        &self,
        namespace: &str,
        name: &str,
        site: &DummySite,
    ) -> Result<DummySite, kube::Error>;
}

/// `SiteOps` backed by the cluster API server.
#[derive(Clone)]
pub struct KubeSiteOps {
    client: Client,
}

impl KubeSiteOps {
    /// Create ops over the shared client handle.
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    fn api(&self, namespace: &str) -> Api<DummySite> {
        Api::namespaced(self.client.clone(), namespace)
    }
}

#[async_trait]
impl SiteOps for KubeSiteOps {
    async fn get(&self, namespace: &str, name: &str) -> Result<DummySite, kube::Error> {
        self.api(namespace).get(name).await
    }

    async fn replace_status(
        &self,
        namespace: &str,
        name: &str,
        site: &DummySite,
    ) -> Result<DummySite, kube::Error> {
        let data = serde_json::to_vec(site).map_err(kube::Error::SerdeError)?;
        self.api(namespace)
            .replace_status(name, &PostParams::default(), data)
            .await
    }

    async fn replace(
        &self,
        namespace: &str,
        name: &str,
        site: &DummySite,
    ) -> Result<DummySite, kube::Error> {
        self.api(namespace)
            .replace(name, &PostParams::default(), site)
            .await
    }
}

/// Writes reconcile outcomes onto the DummySite status.
pub struct StatusReporter {
    sites: Box<dyn SiteOps>,
}

impl StatusReporter {
    /// Create a reporter over the given site capability.
    pub fn new(sites: Box<dyn SiteOps>) -> Self {
        Self { sites }
    }

    /// Set `status = {ready, url}` on the named DummySite.
    ///
    /// The dependents written earlier in the pass are not rolled back when
    /// this fails; the next event for the resource re-reconciles.
    pub async fn report(
        &self,
        namespace: &str,
        name: &str,
        ready: bool,
        url: &str,
    ) -> Result<(), ControllerError> {
        let mut site = self
            .fetch_with_retry(namespace, name)
            .await
            .map_err(|source| ControllerError::StatusUpdate {
                namespace: namespace.to_string(),
                name: name.to_string(),
                source,
            })?;

        // resourceVersion from the fetch rides along on the object.
        site.status = Some(DummySiteStatus {
            ready,
            url: url.to_string(),
        });

        if let Err(e) = self.sites.replace_status(namespace, name, &site).await {
            warn!(
                "Status subresource write failed for DummySite {}/{} ({}), falling back to full replace",
                namespace, name, e
            );
            self.sites
                .replace(namespace, name, &site)
                .await
                .map_err(|source| ControllerError::StatusUpdate {
                    namespace: namespace.to_string(),
                    name: name.to_string(),
                    source,
                })?;
        }

        info!(
            "Updated status for DummySite {}/{}: ready={}, url={}",
            namespace, name, ready, url
        );
        Ok(())
    }

    /// Fetch the DummySite, retrying with linear backoff (1s, 2s).
    ///
    /// The resource may have been deleted and recreated between the event
    /// and this write; retrying rides out the gap.
    async fn fetch_with_retry(&self, namespace: &str, name: &str) -> Result<DummySite, kube::Error> {
        let mut attempt = 1;
        loop {
            match self.sites.get(namespace, name).await {
                Ok(site) => return Ok(site),
                Err(e) if attempt < FETCH_ATTEMPTS => {
                    warn!(
                        "Fetch {}/{} of DummySite {}/{} failed: {}",
                        attempt, FETCH_ATTEMPTS, namespace, name, e
                    );
                    tokio::time::sleep(Duration::from_secs(u64::from(attempt))).await;
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }
}
