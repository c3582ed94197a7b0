use std::sync::{Arc, Mutex, PoisonError};

use async_trait::async_trait;
use rbac_inspector_core::{AppError, AppResult};
use rbac_inspector_domain::{ApiVersion, BindingListPayload, RawWatchEvent, RolePayload};
use tokio::sync::mpsc;

/// Connection provider port for one schema revision of the RBAC API.
#[async_trait]
pub trait RbacApi: Send + Sync {
    /// Revision served by this handle.
    fn version(&self) -> ApiVersion;

    /// Opens a change subscription for cluster role bindings.
    async fn watch_cluster_role_bindings(&self) -> AppResult<WatchSubscription>;

    /// Lists the current cluster role bindings.
    async fn list_cluster_role_bindings(&self) -> AppResult<BindingListPayload>;

    /// Fetches one cluster role by name.
    async fn get_cluster_role(&self, name: &str) -> AppResult<RolePayload>;
}

type ReleaseFn = Box<dyn FnOnce() + Send>;

/// Releases one backend subscription at most once.
///
/// Clones share the same release slot, so stopping through any clone
/// releases the subscription for all of them.
#[derive(Clone)]
pub struct StopHandle {
    release: Arc<Mutex<Option<ReleaseFn>>>,
}

impl StopHandle {
    /// Creates a handle that runs `release` on the first stop.
    #[must_use]
    pub fn new(release: impl FnOnce() + Send + 'static) -> Self {
        Self {
            release: Arc::new(Mutex::new(Some(Box::new(release)))),
        }
    }

    /// Creates a handle with nothing to release.
    #[must_use]
    pub fn noop() -> Self {
        Self::new(|| {})
    }

    /// Releases the subscription. Returns false when it was already released.
    pub fn stop(&self) -> bool {
        let release = self
            .release
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();

        match release {
            Some(release) => {
                release();
                true
            }
            None => false,
        }
    }

    /// Returns whether the subscription was released.
    #[must_use]
    pub fn is_stopped(&self) -> bool {
        self.release
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_none()
    }
}

/// An open change subscription: its notification channel and release handle.
pub struct WatchSubscription {
    events: mpsc::Receiver<RawWatchEvent>,
    stop: StopHandle,
}

impl WatchSubscription {
    /// Creates a subscription from a notification channel and its release handle.
    #[must_use]
    pub fn new(events: mpsc::Receiver<RawWatchEvent>, stop: StopHandle) -> Self {
        Self { events, stop }
    }

    /// Splits the subscription into its channel and release handle.
    #[must_use]
    pub fn into_parts(self) -> (mpsc::Receiver<RawWatchEvent>, StopHandle) {
        (self.events, self.stop)
    }
}

/// One connection handle per supported revision.
#[derive(Clone)]
pub struct RbacApis {
    v1: Arc<dyn RbacApi>,
    v1alpha1: Arc<dyn RbacApi>,
    v1beta1: Arc<dyn RbacApi>,
}

impl RbacApis {
    /// Groups the three revision handles, checking each serves its slot.
    pub fn new(
        v1: Arc<dyn RbacApi>,
        v1alpha1: Arc<dyn RbacApi>,
        v1beta1: Arc<dyn RbacApi>,
    ) -> AppResult<Self> {
        for (expected, api) in [
            (ApiVersion::V1, &v1),
            (ApiVersion::V1Alpha1, &v1alpha1),
            (ApiVersion::V1Beta1, &v1beta1),
        ] {
            if api.version() != expected {
                return Err(AppError::Validation(format!(
                    "expected a {expected} api handle, got {}",
                    api.version()
                )));
            }
        }

        Ok(Self {
            v1,
            v1alpha1,
            v1beta1,
        })
    }

    /// Returns the handle serving one revision.
    #[must_use]
    pub fn get(&self, version: ApiVersion) -> &Arc<dyn RbacApi> {
        match version {
            ApiVersion::V1 => &self.v1,
            ApiVersion::V1Alpha1 => &self.v1alpha1,
            ApiVersion::V1Beta1 => &self.v1beta1,
        }
    }
}
