//! Test utilities for unit testing the reconciliation pipeline.
//!
//! In-memory implementations of the capability traits, plus helpers for
//! building test resources and API errors.

use crate::ensure::ResourceOps;
use crate::status::SiteOps;
use async_trait::async_trait;
use crds::{DummySite, DummySiteSpec, DummySiteStatus};
use kube::Resource;
use kube::core::ErrorResponse;
use std::collections::{HashMap, VecDeque};
use std::fmt::Debug;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

/// A `kube::Error` with the given HTTP code, as the API server would return
pub fn api_error(code: u16, reason: &str) -> kube::Error {
    kube::Error::Api(ErrorResponse {
        status: "Failure".to_string(),
        message: format!("{reason} (test)"),
        reason: reason.to_string(),
        code,
    })
}

/// DummySite with the given identity and spec URL
pub fn make_site(namespace: &str, name: &str, website_url: &str) -> DummySite {
    let mut site = DummySite::new(
        name,
        DummySiteSpec {
            website_url: website_url.to_string(),
        },
    );
    site.metadata.namespace = Some(namespace.to_string());
    site
}

type Hook<K> = Box<dyn Fn(&mut K) + Send>;

/// In-memory `ResourceOps` keyed by (namespace, name).
///
/// Bumps resourceVersion on writes so the ensure primitive's write-token
/// handling is observable, and supports scripted failures.
#[derive(Clone)]
pub struct MockResourceOps<K> {
    store: Arc<Mutex<HashMap<(String, String), K>>>,
    create_errors: Arc<Mutex<VecDeque<kube::Error>>>,
    replace_errors: Arc<Mutex<VecDeque<kube::Error>>>,
    write_hook: Arc<Mutex<Option<Hook<K>>>>,
    create_count: Arc<AtomicUsize>,
    replace_count: Arc<AtomicUsize>,
}

impl<K> MockResourceOps<K>
where
    K: Resource<DynamicType = ()> + Clone,
{
    pub fn new() -> Self {
        Self {
            store: Arc::new(Mutex::new(HashMap::new())),
            create_errors: Arc::new(Mutex::new(VecDeque::new())),
            replace_errors: Arc::new(Mutex::new(VecDeque::new())),
            write_hook: Arc::new(Mutex::new(None)),
            create_count: Arc::new(AtomicUsize::new(0)),
            replace_count: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Seed the store directly, bypassing the create path
    pub fn insert(&self, namespace: &str, name: &str, obj: K) {
        self.store
            .lock()
            .unwrap()
            .insert((namespace.to_string(), name.to_string()), obj);
    }

    pub fn get(&self, namespace: &str, name: &str) -> Option<K> {
        self.store
            .lock()
            .unwrap()
            .get(&(namespace.to_string(), name.to_string()))
            .cloned()
    }

    pub fn len(&self) -> usize {
        self.store.lock().unwrap().len()
    }

    /// Queue an error for the next create call
    pub fn fail_create_with(&self, err: kube::Error) {
        self.create_errors.lock().unwrap().push_back(err);
    }

    /// Queue an error for the next replace call
    pub fn fail_replace_with(&self, err: kube::Error) {
        self.replace_errors.lock().unwrap().push_back(err);
    }

    /// Run a mutation on every written object, e.g. to emulate the platform
    /// assigning a Service its cluster IP. Applied on create and replace,
    /// the way the API server carries server-set fields across updates.
    pub fn on_write(&self, hook: impl Fn(&mut K) + Send + 'static) {
        *self.write_hook.lock().unwrap() = Some(Box::new(hook));
    }

    pub fn create_calls(&self) -> usize {
        self.create_count.load(Ordering::SeqCst)
    }

    pub fn replace_calls(&self) -> usize {
        self.replace_count.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl<K> ResourceOps<K> for MockResourceOps<K>
where
    K: Resource<DynamicType = ()> + Clone + Debug + Send + Sync + 'static,
{
    async fn get_opt(&self, namespace: &str, name: &str) -> Result<Option<K>, kube::Error> {
        Ok(self.get(namespace, name))
    }

    async fn create(&self, namespace: &str, obj: &K) -> Result<K, kube::Error> {
        self.create_count.fetch_add(1, Ordering::SeqCst);
        if let Some(err) = self.create_errors.lock().unwrap().pop_front() {
            return Err(err);
        }

        let mut obj = obj.clone();
        if let Some(hook) = self.write_hook.lock().unwrap().as_ref() {
            hook(&mut obj);
        }
        obj.meta_mut().resource_version = Some("1".to_string());
        let name = obj.meta().name.clone().unwrap_or_default();
        self.store
            .lock()
            .unwrap()
            .insert((namespace.to_string(), name), obj.clone());
        Ok(obj)
    }

    async fn replace(&self, namespace: &str, name: &str, obj: &K) -> Result<K, kube::Error> {
        self.replace_count.fetch_add(1, Ordering::SeqCst);
        if let Some(err) = self.replace_errors.lock().unwrap().pop_front() {
            return Err(err);
        }

        let next_version = self
            .get(namespace, name)
            .and_then(|o| o.meta().resource_version.clone())
            .and_then(|v| v.parse::<u64>().ok())
            .unwrap_or(0)
            + 1;
        let mut obj = obj.clone();
        if let Some(hook) = self.write_hook.lock().unwrap().as_ref() {
            hook(&mut obj);
        }
        obj.meta_mut().resource_version = Some(next_version.to_string());
        self.store
            .lock()
            .unwrap()
            .insert((namespace.to_string(), name.to_string()), obj.clone());
        Ok(obj)
    }

    async fn delete(&self, namespace: &str, name: &str) -> Result<(), kube::Error> {
        let removed = self
            .store
            .lock()
            .unwrap()
            .remove(&(namespace.to_string(), name.to_string()));
        match removed {
            Some(_) => Ok(()),
            None => Err(api_error(404, "NotFound")),
        }
    }
}

/// In-memory `SiteOps` with scripted failures.
#[derive(Clone, Default)]
pub struct MockSiteOps {
    store: Arc<Mutex<HashMap<(String, String), DummySite>>>,
    get_errors: Arc<Mutex<VecDeque<kube::Error>>>,
    fail_replace_status: Arc<AtomicBool>,
    fail_replace: Arc<AtomicBool>,
    get_count: Arc<AtomicUsize>,
    replace_status_count: Arc<AtomicUsize>,
    replace_count: Arc<AtomicUsize>,
}

impl MockSiteOps {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, site: DummySite) {
        let namespace = site
            .metadata
            .namespace
            .clone()
            .unwrap_or_else(|| "default".to_string());
        let name = site.metadata.name.clone().unwrap_or_default();
        self.store.lock().unwrap().insert((namespace, name), site);
    }

    pub fn status_of(&self, namespace: &str, name: &str) -> Option<DummySiteStatus> {
        self.store
            .lock()
            .unwrap()
            .get(&(namespace.to_string(), name.to_string()))
            .and_then(|site| site.status.clone())
    }

    /// Queue an error for the next get call
    pub fn fail_get_with(&self, err: kube::Error) {
        self.get_errors.lock().unwrap().push_back(err);
    }

    /// Make every status-subresource write fail
    pub fn fail_replace_status(&self) {
        self.fail_replace_status.store(true, Ordering::SeqCst);
    }

    /// Make every full-object write fail
    pub fn fail_replace(&self) {
        self.fail_replace.store(true, Ordering::SeqCst);
    }

    pub fn get_calls(&self) -> usize {
        self.get_count.load(Ordering::SeqCst)
    }

    pub fn replace_status_calls(&self) -> usize {
        self.replace_status_count.load(Ordering::SeqCst)
    }

    pub fn replace_calls(&self) -> usize {
        self.replace_count.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SiteOps for MockSiteOps {
    async fn get(&self, namespace: &str, name: &str) -> Result<DummySite, kube::Error> {
        self.get_count.fetch_add(1, Ordering::SeqCst);
        if let Some(err) = self.get_errors.lock().unwrap().pop_front() {
            return Err(err);
        }
        self.store
            .lock()
            .unwrap()
            .get(&(namespace.to_string(), name.to_string()))
            .cloned()
            .ok_or_else(|| api_error(404, "NotFound"))
    }

    async fn replace_status(
        &self,
        namespace: &str,
        name: &str,
        site: &DummySite,
    ) -> Result<DummySite, kube::Error> {
        self.replace_status_count.fetch_add(1, Ordering::SeqCst);
        if self.fail_replace_status.load(Ordering::SeqCst) {
            return Err(api_error(500, "InternalError"));
        }
        self.store
            .lock()
            .unwrap()
            .insert((namespace.to_string(), name.to_string()), site.clone());
        Ok(site.clone())
    }

    async fn replace(
        &self,
        namespace: &str,
        name: &str,
        site: &DummySite,
    ) -> Result<DummySite, kube::Error> {
        self.replace_count.fetch_add(1, Ordering::SeqCst);
        if self.fail_replace.load(Ordering::SeqCst) {
            return Err(api_error(500, "InternalError"));
        }
        self.store
            .lock()
            .unwrap()
            .insert((namespace.to_string(), name.to_string()), site.clone());
        Ok(site.clone())
    }
}
