//! Controller-specific error types.
//!
//! Each variant carries the stage it occurred in; the run loop logs these
//! and moves on to the next event. Only `Connection` (initial watch
//! establishment) terminates the process.

use site_client::SiteClientError;
use thiserror::Error;

/// Errors that can occur in the DummySite controller.
#[derive(Debug, Error)]
pub enum ControllerError {
    /// Initial watch stream establishment failed; fatal to the run
    #[error("failed to establish watch stream: {0}")]
    Connection(#[source] kube::Error),

    /// DummySite spec failed validation; the event is dropped
    #[error("validation failed: {0}")]
    Validation(String),

    /// Site content fetch failed; no dependent resource was written
    #[error("failed to fetch site content: {0}")]
    Fetch(#[from] SiteClientError),

    /// Create/update/delete of a dependent resource failed
    #[error("failed to reconcile {kind} {namespace}/{name}: {source}")]
    Dependency {
        /// Dependent resource kind
        kind: String,
        /// Namespace of the dependent resource
        namespace: String,
        /// Name of the dependent resource
        name: String,
        /// Underlying Kubernetes API error
        #[source]
        source: kube::Error,
    },

    /// The Service never received a cluster IP within the poll window
    #[error("service {namespace}/{name} did not get a cluster IP within {timeout_secs}s")]
    EndpointTimeout {
        /// Namespace of the service
        namespace: String,
        /// Name of the service
        name: String,
        /// Poll window that elapsed
        timeout_secs: u64,
    },

    /// Both the status subresource write and the full-object fallback failed
    #[error("failed to update status of DummySite {namespace}/{name}: {source}")]
    StatusUpdate {
        /// Namespace of the DummySite
        namespace: String,
        /// Name of the DummySite
        name: String,
        /// Error from the fallback write
        #[source]
        source: kube::Error,
    },
}
