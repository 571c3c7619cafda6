//! Main controller implementation.
//!
//! Wires the watch stream to the reconciler and runs the sequential
//! consumer loop: one event is fully processed before the next is read.

use crate::ensure::KubeResourceOps;
use crate::error::ControllerError;
use crate::reconciler::Reconciler;
use crate::shutdown::Shutdown;
use crate::status::KubeSiteOps;
use crate::watcher::{ApiWatchOpener, SiteEventSource};
use crds::DummySite;
use k8s_openapi::api::apps::v1::Deployment;
use k8s_openapi::api::core::v1::{ConfigMap, Service};
use kube::{Api, Client, ResourceExt};
use site_client::SiteClient;
use tracing::{error, info};

/// Main controller for DummySite management.
pub struct Controller {
    source: SiteEventSource,
    reconciler: Reconciler,
}

impl Controller {
    /// Creates a new controller instance and opens the watch stream.
    ///
    /// `namespace` scopes the watch; `None` watches all namespaces. An
    /// establish failure here is fatal.
    pub async fn new(
        client: Client,
        namespace: Option<String>,
        shutdown: Shutdown,
    ) -> Result<Self, ControllerError> {
        info!("Initializing DummySite controller");

        let site_api: Api<DummySite> = match namespace.as_deref() {
            Some(ns) => Api::namespaced(client.clone(), ns),
            None => Api::all(client.clone()),
        };

        let fetcher = SiteClient::new()?;
        let reconciler = Reconciler::new(
            Box::new(fetcher),
            Box::new(KubeSiteOps::new(client.clone())),
            Box::new(KubeResourceOps::<ConfigMap>::new(client.clone())),
            Box::new(KubeResourceOps::<Deployment>::new(client.clone())),
            Box::new(KubeResourceOps::<Service>::new(client)),
        );

        let source =
            SiteEventSource::open(Box::new(ApiWatchOpener::new(site_api)), shutdown).await?;

        Ok(Self { source, reconciler })
    }

    /// Runs the controller until shutdown.
    ///
    /// Reconcile failures are logged with their stage context and the loop
    /// moves on; nothing short of cancellation stops it.
    pub async fn run(mut self) -> Result<(), ControllerError> {
        info!("DummySite controller running");

        while let Some(event) = self.source.next_event().await {
            let name = event.site.name_any();
            let namespace = event
                .site
                .namespace()
                .unwrap_or_else(|| "default".to_string());
            if let Err(e) = self.reconciler.handle_event(&event).await {
                error!("Failed to reconcile DummySite {}/{}: {}", namespace, name, e);
            }
        }

        info!("DummySite controller stopped");
        Ok(())
    }
}
