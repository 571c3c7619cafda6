//! DummySite Custom Resource Definition
//!
//! Defines a Kubernetes CRD describing a website to mirror: the controller
//! fetches HTML from `spec.website_url` and serves it from inside the
//! cluster, reporting the in-cluster address on the status subresource.

use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// DummySiteSpec defines the desired state of a DummySite
#[derive(CustomResource, Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[kube(
    group = "example.com",
    version = "v1",
    kind = "DummySite",
    plural = "dummysites",
    namespaced,
    status = "DummySiteStatus"
)]
pub struct DummySiteSpec {
    /// URL to fetch HTML content from
    ///
    /// Defaulted so a DummySite without the field decodes cleanly; the
    /// controller rejects empty values with a validation error instead of
    /// failing to deserialize the watch event.
    #[serde(default)]
    pub website_url: String,
}

/// DummySiteStatus defines the observed state of a DummySite
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, Default, PartialEq, Eq)]
pub struct DummySiteStatus {
    /// Whether the site is ready to be accessed
    #[serde(default)]
    pub ready: bool,

    /// In-cluster service URL for the mirrored site
    #[serde(default)]
    pub url: String,
}
