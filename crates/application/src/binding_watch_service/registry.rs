use std::collections::HashMap;

use rbac_inspector_core::WatchId;
use tokio::sync::{Mutex, watch};
use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::WatchSession;

/// Stop handle set of one started multiplexer instance.
pub(super) struct RegisteredWatch {
    sessions: Vec<WatchSession>,
    shutdown: watch::Sender<bool>,
    dispatch: JoinHandle<()>,
}

impl RegisteredWatch {
    pub(super) fn new(
        sessions: Vec<WatchSession>,
        shutdown: watch::Sender<bool>,
        dispatch: JoinHandle<()>,
    ) -> Self {
        Self {
            sessions,
            shutdown,
            dispatch,
        }
    }

    // Owning the entry is what makes the close happen exactly once.
    async fn shutdown(self, watch_id: WatchId) {
        for session in &self.sessions {
            session.stop();
        }
        self.shutdown.send_replace(true);

        if let Err(error) = self.dispatch.await {
            warn!(
                watch_id = %watch_id,
                error = %error,
                "binding dispatch loop ended abnormally"
            );
        }

        info!(watch_id = %watch_id, "stopped cluster role binding watch");
    }
}

/// Concurrency-safe registry of started multiplexer instances.
///
/// Instances register on start and are removed by the stop that releases
/// them, so concurrent stops never release one instance twice.
#[derive(Default)]
pub struct WatchRegistry {
    entries: Mutex<HashMap<WatchId, RegisteredWatch>>,
}

impl WatchRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub(super) async fn register(&self, watch_id: WatchId, entry: RegisteredWatch) {
        self.entries.lock().await.insert(watch_id, entry);
    }

    /// Number of instances that are started and not yet stopped.
    pub async fn len(&self) -> usize {
        self.entries.lock().await.len()
    }

    /// Returns whether no instance is registered.
    pub async fn is_empty(&self) -> bool {
        self.entries.lock().await.is_empty()
    }

    /// Stops one instance and closes its output stream. Unknown ids are ignored.
    pub async fn stop(&self, watch_id: WatchId) {
        let entry = self.entries.lock().await.remove(&watch_id);
        if let Some(entry) = entry {
            entry.shutdown(watch_id).await;
        }
    }

    /// Stops every registered instance and closes each output stream.
    pub async fn stop_all(&self) {
        let entries: Vec<(WatchId, RegisteredWatch)> =
            self.entries.lock().await.drain().collect();

        for (watch_id, entry) in entries {
            entry.shutdown(watch_id).await;
        }
    }
}
