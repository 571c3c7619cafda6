//! Reconciliation logic for DummySite resources.
//!
//! One event drives the full sequence: validate the spec, fetch the site
//! HTML, ensure the ConfigMap, Deployment and Service, wait for the Service
//! address, then report status. Deletions tear the dependents down instead
//! of recreating them from the last-known snapshot.

use crate::ensure::{ResourceOps, dependency_error, ensure, is_not_found};
use crate::error::ControllerError;
use crate::resources::{
    build_config_map, build_deployment, build_service, config_map_name, endpoint_url,
    workload_name,
};
use crate::status::{SiteOps, StatusReporter};
use crate::watcher::{EventKind, SiteEvent};
use k8s_openapi::api::apps::v1::Deployment;
use k8s_openapi::api::core::v1::{ConfigMap, Service};
use kube::{Resource, ResourceExt};
use site_client::SiteClientTrait;
use std::time::Duration;
use tracing::{debug, info};

/// Poll cadence while waiting for the Service to receive a cluster IP
const ADDRESS_POLL_INTERVAL: Duration = Duration::from_secs(1);

/// Window the Service gets to receive a cluster IP
const ADDRESS_POLL_TIMEOUT: Duration = Duration::from_secs(30);

/// Reconciles one DummySite event at a time.
pub struct Reconciler {
    fetcher: Box<dyn SiteClientTrait>,
    status: StatusReporter,
    config_maps: Box<dyn ResourceOps<ConfigMap>>,
    deployments: Box<dyn ResourceOps<Deployment>>,
    services: Box<dyn ResourceOps<Service>>,
}

impl Reconciler {
    /// Create a reconciler over explicit capability handles.
    pub fn new(
        fetcher: Box<dyn SiteClientTrait>,
        sites: Box<dyn SiteOps>,
        config_maps: Box<dyn ResourceOps<ConfigMap>>,
        deployments: Box<dyn ResourceOps<Deployment>>,
        services: Box<dyn ResourceOps<Service>>,
    ) -> Self {
        Self {
            fetcher,
            status: StatusReporter::new(sites),
            config_maps,
            deployments,
            services,
        }
    }

    /// Process one change notification.
    pub async fn handle_event(&self, event: &SiteEvent) -> Result<(), ControllerError> {
        let name = event.site.name_any();
        if name.is_empty() {
            return Err(ControllerError::Validation(
                "DummySite has no metadata.name".to_string(),
            ));
        }
        let namespace = event
            .site
            .namespace()
            .unwrap_or_else(|| "default".to_string());

        match event.kind {
            EventKind::Deleted => self.teardown(&namespace, &name).await,
            EventKind::Added | EventKind::Modified => {
                let website_url = event.site.spec.website_url.trim();
                if website_url.is_empty() {
                    return Err(ControllerError::Validation(format!(
                        "DummySite {namespace}/{name}: spec.website_url is missing or empty"
                    )));
                }
                self.reconcile(&namespace, &name, website_url).await
            }
        }
    }

    /// Bring the dependent resources in line with the spec and report back.
    async fn reconcile(
        &self,
        namespace: &str,
        name: &str,
        website_url: &str,
    ) -> Result<(), ControllerError> {
        info!(
            "Reconciling DummySite {}/{} with URL {}",
            namespace, name, website_url
        );

        // Fetch first: nothing is written when the source is unreachable.
        let html = self.fetcher.fetch_html(website_url).await?;

        ensure(
            self.config_maps.as_ref(),
            namespace,
            &config_map_name(name),
            build_config_map(namespace, name, &html),
        )
        .await?;
        ensure(
            self.deployments.as_ref(),
            namespace,
            &workload_name(name),
            build_deployment(namespace, name),
        )
        .await?;
        ensure(
            self.services.as_ref(),
            namespace,
            &workload_name(name),
            build_service(namespace, name),
        )
        .await?;

        let url = self.await_service_address(namespace, name).await?;
        self.status.report(namespace, name, true, &url).await?;

        info!("Successfully reconciled DummySite {}/{}", namespace, name);
        Ok(())
    }

    /// Poll the Service until the platform assigns it a cluster IP.
    async fn await_service_address(
        &self,
        namespace: &str,
        name: &str,
    ) -> Result<String, ControllerError> {
        let service = workload_name(name);
        let deadline = tokio::time::Instant::now() + ADDRESS_POLL_TIMEOUT;
        loop {
            let found = self
                .services
                .get_opt(namespace, &service)
                .await
                .map_err(|e| dependency_error("Service", namespace, &service, e))?;
            let has_address = found
                .as_ref()
                .and_then(|svc| svc.spec.as_ref())
                .and_then(|spec| spec.cluster_ip.as_deref())
                .is_some_and(|ip| !ip.is_empty());
            if has_address {
                return Ok(endpoint_url(&service, namespace));
            }

            if tokio::time::Instant::now() >= deadline {
                return Err(ControllerError::EndpointTimeout {
                    namespace: namespace.to_string(),
                    name: service,
                    timeout_secs: ADDRESS_POLL_TIMEOUT.as_secs(),
                });
            }
            debug!(
                "Service {}/{} has no cluster IP yet, polling",
                namespace, service
            );
            tokio::time::sleep(ADDRESS_POLL_INTERVAL).await;
        }
    }

    /// Remove the dependent resources of a deleted DummySite.
    ///
    /// There is no status left to write; the owner is gone.
    async fn teardown(&self, namespace: &str, name: &str) -> Result<(), ControllerError> {
        info!(
            "DummySite {}/{} deleted, removing dependent resources",
            namespace, name
        );
        delete_ignore_missing(self.services.as_ref(), namespace, &workload_name(name)).await?;
        delete_ignore_missing(self.deployments.as_ref(), namespace, &workload_name(name)).await?;
        delete_ignore_missing(self.config_maps.as_ref(), namespace, &config_map_name(name))
            .await?;
        Ok(())
    }
}

/// Delete a dependent, tolerating one that is already gone.
async fn delete_ignore_missing<K>(
    ops: &dyn ResourceOps<K>,
    namespace: &str,
    name: &str,
) -> Result<(), ControllerError>
where
    K: Resource<DynamicType = ()> + Send + Sync,
{
    match ops.delete(namespace, name).await {
        Ok(()) => {
            info!("Deleted {} {}/{}", K::kind(&()), namespace, name);
            Ok(())
        }
        Err(e) if is_not_found(&e) => Ok(()),
        Err(e) => Err(dependency_error(&K::kind(&()), namespace, name, e)),
    }
}
