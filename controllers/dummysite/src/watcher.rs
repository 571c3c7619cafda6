//! DummySite watch stream with reconnection.
//!
//! `SiteEventSource` turns the raw Kubernetes watch into a flat sequence of
//! site events. The reconnect policy lives entirely in here: the consumer
//! loop only ever calls `next_event` and never sees a transient stream
//! termination. Only the first establishment failure is fatal.

use crate::error::ControllerError;
use crate::shutdown::Shutdown;
use async_trait::async_trait;
use crds::DummySite;
use futures::StreamExt;
use futures::stream::BoxStream;
use kube::Api;
use kube::api::{WatchEvent, WatchParams};
use std::time::Duration;
use tracing::{info, warn};

/// Delay between a stream ending and the next establish attempt
const RECONNECT_DELAY: Duration = Duration::from_secs(2);

/// What happened to the watched resource
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    /// Resource was created
    Added,
    /// Resource was modified
    Modified,
    /// Resource was deleted; the snapshot is the last known state
    Deleted,
}

/// One observed change to a DummySite
#[derive(Debug, Clone)]
pub struct SiteEvent {
    /// Change type
    pub kind: EventKind,
    /// Resource snapshot as observed
    pub site: DummySite,
}

/// Raw watch stream item type
pub type WatchStream = BoxStream<'static, kube::Result<WatchEvent<DummySite>>>;

/// Establishes a watch stream. Behind a trait so tests can script streams.
#[async_trait]
pub trait WatchOpener: Send + Sync {
    /// Open a new watch stream over the configured scope
    async fn open(&self) -> Result<WatchStream, kube::Error>;
}

/// `WatchOpener` over the cluster API, scoped to one namespace or all.
pub struct ApiWatchOpener {
    api: Api<DummySite>,
}

impl ApiWatchOpener {
    /// Create an opener for the given (already scoped) API handle.
    pub fn new(api: Api<DummySite>) -> Self {
        Self { api }
    }
}

#[async_trait]
impl WatchOpener for ApiWatchOpener {
    async fn open(&self) -> Result<WatchStream, kube::Error> {
        let stream = self.api.watch(&WatchParams::default(), "0").await?;
        Ok(stream.boxed())
    }
}

/// Sequence of DummySite change events, resilient to stream termination.
pub struct SiteEventSource {
    opener: Box<dyn WatchOpener>,
    stream: WatchStream,
    shutdown: Shutdown,
}

impl SiteEventSource {
    /// Open the initial watch stream.
    ///
    /// Failure here is `ControllerError::Connection` and fatal to the run;
    /// the process should not limp along without ever having watched.
    pub async fn open(
        opener: Box<dyn WatchOpener>,
        shutdown: Shutdown,
    ) -> Result<Self, ControllerError> {
        let stream = opener.open().await.map_err(ControllerError::Connection)?;
        info!("Watching for DummySite resources");
        Ok(Self {
            opener,
            stream,
            shutdown,
        })
    }

    /// Yield the next site event, reconnecting across stream terminations.
    ///
    /// Returns `None` once shutdown fires; no reconnect is attempted after
    /// that.
    pub async fn next_event(&mut self) -> Option<SiteEvent> {
        loop {
            let item = tokio::select! {
                () = self.shutdown.cancelled() => return None,
                item = self.stream.next() => item,
            };

            match item {
                Some(Ok(WatchEvent::Added(site))) => {
                    return Some(SiteEvent {
                        kind: EventKind::Added,
                        site,
                    });
                }
                Some(Ok(WatchEvent::Modified(site))) => {
                    return Some(SiteEvent {
                        kind: EventKind::Modified,
                        site,
                    });
                }
                Some(Ok(WatchEvent::Deleted(site))) => {
                    return Some(SiteEvent {
                        kind: EventKind::Deleted,
                        site,
                    });
                }
                Some(Ok(WatchEvent::Bookmark(_))) => {}
                // An error event is not a hard disconnect, but the stream
                // is no longer trustworthy; treat it as channel-closed.
                Some(Ok(WatchEvent::Error(resp))) => {
                    warn!("Watch error event ({}), reconnecting", resp.message);
                    if !self.reconnect().await {
                        return None;
                    }
                }
                Some(Err(e)) => {
                    warn!("Watch stream error ({}), reconnecting", e);
                    if !self.reconnect().await {
                        return None;
                    }
                }
                None => {
                    info!("Watch channel closed, reconnecting");
                    if !self.reconnect().await {
                        return None;
                    }
                }
            }
        }
    }

    /// Re-establish the stream after the fixed delay.
    ///
    /// Returns `false` when shutdown fired before a new stream was opened.
    /// Establish failures after the first are not fatal; they log and retry
    /// on the same cadence until shutdown.
    async fn reconnect(&mut self) -> bool {
        // Release the dead stream before waiting; no session outlives its
        // usefulness.
        self.stream = futures::stream::empty().boxed();
        loop {
            tokio::select! {
                () = self.shutdown.cancelled() => return false,
                () = tokio::time::sleep(RECONNECT_DELAY) => {}
            }
            match self.opener.open().await {
                Ok(stream) => {
                    info!("Watch stream re-established");
                    self.stream = stream;
                    return true;
                }
                Err(e) => warn!("Failed to re-establish watch stream ({}), retrying", e),
            }
        }
    }
}
