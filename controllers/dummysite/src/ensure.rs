//! Generic create-or-update primitive for dependent resources.
//!
//! All three dependent kinds (ConfigMap, Deployment, Service) share the same
//! shape: look the resource up by its deterministic name, create it when
//! absent, otherwise replace it with the desired state. The API surface is
//! behind `ResourceOps` so reconciler tests can run against in-memory
//! stores.

use crate::error::ControllerError;
use async_trait::async_trait;
use k8s_openapi::NamespaceResourceScope;
use kube::api::{Api, DeleteParams, PostParams};
use kube::{Client, Resource};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::fmt::Debug;
use std::marker::PhantomData;
use tracing::{debug, info};

/// Attempts per ensure call when an update races a concurrent writer
const CONFLICT_RETRIES: usize = 3;

/// Get/create/replace/delete capability for one namespaced resource kind.
#[async_trait]
pub trait ResourceOps<K>: Send + Sync {
    /// Fetch the resource, `None` when it does not exist
    async fn get_opt(&self, namespace: &str, name: &str) -> Result<Option<K>, kube::Error>;
    /// Create the resource
    async fn create(&self, namespace: &str, obj: &K) -> Result<K, kube::Error>;
    /// Replace the resource with `obj`
    async fn replace(&self, namespace: &str, name: &str, obj: &K) -> Result<K, kube::Error>;
    /// Delete the resource
    async fn delete(&self, namespace: &str, name: &str) -> Result<(), kube::Error>;
}

/// `ResourceOps` backed by the cluster API server.
///
/// Builds a namespaced `Api` per call, so one instance serves every
/// namespace the watch covers.
#[derive(Clone)]
pub struct KubeResourceOps<K> {
    client: Client,
    _kind: PhantomData<fn() -> K>,
}

impl<K> KubeResourceOps<K> {
    /// Create ops over the shared client handle.
    pub fn new(client: Client) -> Self {
        Self {
            client,
            _kind: PhantomData,
        }
    }
}

#[async_trait]
impl<K> ResourceOps<K> for KubeResourceOps<K>
where
    K: Resource<Scope = NamespaceResourceScope, DynamicType = ()>
        + Clone
        + Debug
        + Serialize
        + DeserializeOwned
        + Send
        + Sync
        + 'static,
{
    async fn get_opt(&self, namespace: &str, name: &str) -> Result<Option<K>, kube::Error> {
        let api: Api<K> = Api::namespaced(self.client.clone(), namespace);
        api.get_opt(name).await
    }

    async fn create(&self, namespace: &str, obj: &K) -> Result<K, kube::Error> {
        let api: Api<K> = Api::namespaced(self.client.clone(), namespace);
        api.create(&PostParams::default(), obj).await
    }

    async fn replace(&self, namespace: &str, name: &str, obj: &K) -> Result<K, kube::Error> {
        let api: Api<K> = Api::namespaced(self.client.clone(), namespace);
        api.replace(name, &PostParams::default(), obj).await
    }

    async fn delete(&self, namespace: &str, name: &str) -> Result<(), kube::Error> {
        let api: Api<K> = Api::namespaced(self.client.clone(), namespace);
        api.delete(name, &DeleteParams::default()).await.map(|_| ())
    }
}

/// Ensure a dependent resource matches `desired`.
///
/// Returns `true` when the resource already existed and was replaced,
/// `false` when it was created. Updates carry the current resourceVersion
/// forward and re-fetch it on a 409 conflict instead of overwriting blind;
/// a create that loses a race against an external creator falls back to the
/// update path the same way.
pub async fn ensure<K>(
    ops: &dyn ResourceOps<K>,
    namespace: &str,
    name: &str,
    desired: K,
) -> Result<bool, ControllerError>
where
    K: Resource<DynamicType = ()> + Clone + Send + Sync,
{
    let kind = K::kind(&()).into_owned();
    let mut attempt = 1;
    loop {
        let existing = ops
            .get_opt(namespace, name)
            .await
            .map_err(|e| dependency_error(&kind, namespace, name, e))?;

        match existing {
            None => match ops.create(namespace, &desired).await {
                Ok(_) => {
                    info!("Created {} {}/{}", kind, namespace, name);
                    return Ok(false);
                }
                Err(e) if is_conflict(&e) && attempt < CONFLICT_RETRIES => {
                    debug!(
                        "Create of {} {}/{} lost a race, retrying as update",
                        kind, namespace, name
                    );
                    attempt += 1;
                }
                Err(e) => return Err(dependency_error(&kind, namespace, name, e)),
            },
            Some(current) => {
                // Full replace with the write token we just observed.
                let mut obj = desired.clone();
                obj.meta_mut().resource_version = current.meta().resource_version.clone();
                match ops.replace(namespace, name, &obj).await {
                    Ok(_) => {
                        info!("Updated {} {}/{}", kind, namespace, name);
                        return Ok(true);
                    }
                    Err(e) if is_conflict(&e) && attempt < CONFLICT_RETRIES => {
                        debug!(
                            "Update conflict on {} {}/{}, refetching write token",
                            kind, namespace, name
                        );
                        attempt += 1;
                    }
                    Err(e) => return Err(dependency_error(&kind, namespace, name, e)),
                }
            }
        }
    }
}

pub(crate) fn dependency_error(
    kind: &str,
    namespace: &str,
    name: &str,
    source: kube::Error,
) -> ControllerError {
    ControllerError::Dependency {
        kind: kind.to_string(),
        namespace: namespace.to_string(),
        name: name.to_string(),
        source,
    }
}

/// Whether the API rejected a write under optimistic concurrency (HTTP 409)
pub fn is_conflict(err: &kube::Error) -> bool {
    matches!(err, kube::Error::Api(resp) if resp.code == 409)
}

/// Whether the API reported the resource missing (HTTP 404)
pub fn is_not_found(err: &kube::Error) -> bool {
    matches!(err, kube::Error::Api(resp) if resp.code == 404)
}
