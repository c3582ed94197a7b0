use std::sync::Arc;

use rbac_inspector_core::AppResult;
use rbac_inspector_domain::{ApiVersion, RawWatchEvent};
use tokio::sync::mpsc;
use tracing::debug;

use crate::binding_adapters::TaggedWatchEvent;
use crate::rbac_ports::{RbacApi, StopHandle};

/// Owns one long-lived binding subscription for a single revision.
pub struct WatchSession {
    api: Arc<dyn RbacApi>,
    stop: Option<StopHandle>,
}

impl WatchSession {
    /// Creates a closed session over one revision handle.
    #[must_use]
    pub fn new(api: Arc<dyn RbacApi>) -> Self {
        Self { api, stop: None }
    }

    /// Revision this session watches.
    #[must_use]
    pub fn version(&self) -> ApiVersion {
        self.api.version()
    }

    /// Establishes the subscription and returns its event source.
    ///
    /// Re-opening releases the previous subscription first. Errors carry the
    /// revision tag.
    pub async fn open(&mut self) -> AppResult<SessionEvents> {
        self.stop();

        let version = self.version();
        let subscription = self
            .api
            .watch_cluster_role_bindings()
            .await
            .map_err(|error| error.with_context(version))?;
        let (receiver, stop) = subscription.into_parts();
        self.stop = Some(stop);

        debug!(version = %version, "opened cluster role binding watch");

        Ok(SessionEvents {
            version,
            receiver,
            open: true,
        })
    }

    /// Releases the subscription. Safe to call any number of times.
    pub fn stop(&self) {
        if let Some(stop) = &self.stop
            && stop.stop()
        {
            debug!(version = %self.version(), "released cluster role binding watch");
        }
    }

    /// Returns whether an opened subscription was released.
    #[must_use]
    pub fn is_stopped(&self) -> bool {
        self.stop.as_ref().is_none_or(StopHandle::is_stopped)
    }
}

/// Lazy event source of one open session.
pub struct SessionEvents {
    version: ApiVersion,
    receiver: mpsc::Receiver<RawWatchEvent>,
    open: bool,
}

impl SessionEvents {
    /// Revision of the originating session.
    #[must_use]
    pub fn version(&self) -> ApiVersion {
        self.version
    }

    /// Returns false once the backend closed the stream.
    #[must_use]
    pub fn is_open(&self) -> bool {
        self.open
    }

    /// Waits for the next notification, tagged with this session's revision.
    pub async fn recv(&mut self) -> Option<TaggedWatchEvent> {
        match self.receiver.recv().await {
            Some(event) => Some(TaggedWatchEvent {
                version: self.version,
                event,
            }),
            None => {
                self.open = false;
                None
            }
        }
    }
}
