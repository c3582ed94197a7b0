use std::sync::Arc;

use rbac_inspector_core::{AppError, AppResult, WatchId};
use rbac_inspector_domain::{ApiVersion, CanonicalBinding};
use tokio::sync::{mpsc, watch};
use tracing::info;

use crate::binding_adapters::convert_list;
use crate::conversion_reporter::{
    ConversionFailure, ConversionFailureReporter, ConversionOrigin, TracingConversionReporter,
};
use crate::rbac_ports::RbacApis;
use crate::watch_session::{SessionEvents, WatchSession};

mod dispatch;
mod registry;

#[cfg(test)]
mod tests;

use dispatch::DispatchLoop;
use registry::RegisteredWatch;
pub use registry::WatchRegistry;

/// Merged output stream of one multiplexer instance.
///
/// Holds at most one undelivered binding; the producer waits until it is
/// received.
pub struct BindingStream {
    watch_id: WatchId,
    receiver: mpsc::Receiver<CanonicalBinding>,
}

impl BindingStream {
    /// Identifier the instance was registered under.
    #[must_use]
    pub fn watch_id(&self) -> WatchId {
        self.watch_id
    }

    /// Receives the next binding, or `None` once the instance was stopped.
    pub async fn recv(&mut self) -> Option<CanonicalBinding> {
        self.receiver.recv().await
    }

    /// Returns the underlying channel receiver.
    #[must_use]
    pub fn into_inner(self) -> mpsc::Receiver<CanonicalBinding> {
        self.receiver
    }
}

/// Fan-in multiplexer over the three binding revisions.
#[derive(Clone)]
pub struct BindingWatchService {
    apis: RbacApis,
    registry: Arc<WatchRegistry>,
    reporter: Arc<dyn ConversionFailureReporter>,
}

impl BindingWatchService {
    /// Creates a service with its own registry and tracing-based failure reports.
    #[must_use]
    pub fn new(apis: RbacApis) -> Self {
        Self::with_registry(
            apis,
            Arc::new(WatchRegistry::new()),
            Arc::new(TracingConversionReporter),
        )
    }

    /// Creates a service sharing an existing registry and reporter.
    #[must_use]
    pub fn with_registry(
        apis: RbacApis,
        registry: Arc<WatchRegistry>,
        reporter: Arc<dyn ConversionFailureReporter>,
    ) -> Self {
        Self {
            apis,
            registry,
            reporter,
        }
    }

    /// Registry holding every instance started through this service.
    #[must_use]
    pub fn registry(&self) -> &Arc<WatchRegistry> {
        &self.registry
    }

    /// Opens all revision watches and starts one dispatch loop.
    ///
    /// Fails fast: if any watch cannot be opened, the ones already opened are
    /// released and nothing is registered.
    pub async fn start(&self) -> AppResult<BindingStream> {
        let mut opened = Vec::with_capacity(ApiVersion::all().len());
        let v1 = self.open_session(ApiVersion::V1, &mut opened).await?;
        let v1alpha1 = self.open_session(ApiVersion::V1Alpha1, &mut opened).await?;
        let v1beta1 = self.open_session(ApiVersion::V1Beta1, &mut opened).await?;

        let watch_id = WatchId::new();
        let (output, receiver) = mpsc::channel(1);
        let (shutdown_sender, shutdown) = watch::channel(false);

        let dispatch = tokio::spawn(
            DispatchLoop {
                watch_id,
                v1,
                v1alpha1,
                v1beta1,
                output,
                shutdown,
                reporter: Arc::clone(&self.reporter),
            }
            .run(),
        );

        self.registry
            .register(
                watch_id,
                RegisteredWatch::new(opened, shutdown_sender, dispatch),
            )
            .await;

        info!(watch_id = %watch_id, "started cluster role binding watch");

        Ok(BindingStream { watch_id, receiver })
    }

    /// Stops one instance. Idempotent.
    pub async fn stop(&self, watch_id: WatchId) {
        self.registry.stop(watch_id).await;
    }

    /// Stops every instance in the registry. Idempotent and safe to race.
    pub async fn stop_all(&self) {
        self.registry.stop_all().await;
    }

    /// Lists the current bindings of one revision.
    ///
    /// Items that fail to convert are reported and left out.
    pub async fn list(&self, version: ApiVersion) -> AppResult<Vec<CanonicalBinding>> {
        let listing = self
            .apis
            .get(version)
            .list_cluster_role_bindings()
            .await
            .map_err(|error| error.with_context(version))?;
        if listing.version() != version {
            return Err(AppError::Conversion(format!(
                "{version}: listing carries {} items",
                listing.version()
            )));
        }

        let mut bindings = Vec::new();
        for item in convert_list(&listing) {
            match item {
                Ok(binding) => bindings.push(binding),
                Err(error) => self.reporter.report(&ConversionFailure {
                    version,
                    origin: ConversionOrigin::Listing,
                    error,
                }),
            }
        }

        Ok(bindings)
    }

    async fn open_session(
        &self,
        version: ApiVersion,
        opened: &mut Vec<WatchSession>,
    ) -> AppResult<SessionEvents> {
        let mut session = WatchSession::new(Arc::clone(self.apis.get(version)));
        match session.open().await {
            Ok(events) => {
                opened.push(session);
                Ok(events)
            }
            Err(error) => {
                for session in opened.iter() {
                    session.stop();
                }
                Err(error)
            }
        }
    }
}
