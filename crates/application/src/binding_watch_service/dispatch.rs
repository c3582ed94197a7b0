use std::sync::Arc;

use rbac_inspector_core::WatchId;
use rbac_inspector_domain::CanonicalBinding;
use tokio::sync::{mpsc, watch};
use tracing::{debug, info};

use crate::binding_adapters::{TaggedWatchEvent, convert_event};
use crate::conversion_reporter::{ConversionFailure, ConversionFailureReporter, ConversionOrigin};
use crate::watch_session::SessionEvents;

/// Single sequential loop merging three session sources into one output.
pub(super) struct DispatchLoop {
    pub(super) watch_id: WatchId,
    pub(super) v1: SessionEvents,
    pub(super) v1alpha1: SessionEvents,
    pub(super) v1beta1: SessionEvents,
    pub(super) output: mpsc::Sender<CanonicalBinding>,
    pub(super) shutdown: watch::Receiver<bool>,
    pub(super) reporter: Arc<dyn ConversionFailureReporter>,
}

enum Step {
    Received(TaggedWatchEvent),
    SourceClosed,
    Shutdown,
}

impl DispatchLoop {
    pub(super) async fn run(mut self) {
        loop {
            let (v1_open, v1alpha1_open, v1beta1_open) = (
                self.v1.is_open(),
                self.v1alpha1.is_open(),
                self.v1beta1.is_open(),
            );

            // Unbiased select: ready sources are picked at random, so none starves.
            let step = tokio::select! {
                _ = self.shutdown.changed() => Step::Shutdown,
                event = self.v1.recv(), if v1_open => event.map_or(Step::SourceClosed, Step::Received),
                event = self.v1alpha1.recv(), if v1alpha1_open => event.map_or(Step::SourceClosed, Step::Received),
                event = self.v1beta1.recv(), if v1beta1_open => event.map_or(Step::SourceClosed, Step::Received),
            };

            match step {
                Step::Shutdown => break,
                Step::SourceClosed => {
                    debug!(watch_id = %self.watch_id, "binding watch source closed by backend");
                }
                Step::Received(event) => {
                    if !self.dispatch(event).await {
                        break;
                    }
                }
            }
        }

        debug!(watch_id = %self.watch_id, "binding dispatch loop finished");
    }

    // Returns false when the loop must end.
    async fn dispatch(&mut self, event: TaggedWatchEvent) -> bool {
        let binding = match convert_event(&event) {
            Ok(binding) => binding,
            Err(error) => {
                self.reporter.report(&ConversionFailure {
                    version: event.version,
                    origin: ConversionOrigin::Watch {
                        watch_id: self.watch_id,
                        event_type: event.event.event_type,
                    },
                    error,
                });
                return true;
            }
        };

        tokio::select! {
            _ = self.shutdown.changed() => false,
            sent = self.output.send(binding) => {
                if sent.is_err() {
                    info!(watch_id = %self.watch_id, "binding stream dropped by consumer");
                }
                sent.is_ok()
            }
        }
    }
}
