use rbac_inspector_core::{AppError, WatchId};
use rbac_inspector_domain::{ApiVersion, WatchEventType};
use tracing::warn;

/// Where a failed conversion originated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConversionOrigin {
    /// A notification received by one multiplexer instance.
    Watch {
        /// Multiplexer instance that received the notification.
        watch_id: WatchId,
        /// Notification type.
        event_type: WatchEventType,
    },
    /// An item of a one-shot listing.
    Listing,
}

/// One non-fatal conversion failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConversionFailure {
    /// Revision the payload arrived through.
    pub version: ApiVersion,
    /// Source of the payload.
    pub origin: ConversionOrigin,
    /// Conversion error.
    pub error: AppError,
}

/// Observability port receiving conversion failures.
pub trait ConversionFailureReporter: Send + Sync {
    /// Records one failure. Must not block.
    fn report(&self, failure: &ConversionFailure);
}

/// Reporter emitting one `warn` event per failure.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingConversionReporter;

impl ConversionFailureReporter for TracingConversionReporter {
    fn report(&self, failure: &ConversionFailure) {
        match failure.origin {
            ConversionOrigin::Watch {
                watch_id,
                event_type,
            } => warn!(
                watch_id = %watch_id,
                version = %failure.version,
                event_type = event_type.as_str(),
                error = %failure.error,
                "failed to convert cluster role binding event"
            ),
            ConversionOrigin::Listing => warn!(
                version = %failure.version,
                error = %failure.error,
                "failed to convert listed cluster role binding"
            ),
        }
    }
}
