use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use rbac_inspector_core::{AppError, AppResult};
use rbac_inspector_domain::{ApiVersion, BindingListPayload, RawWatchEvent, RolePayload};
use tokio::sync::{Mutex, mpsc};

use crate::conversion_reporter::{ConversionFailure, ConversionFailureReporter};
use crate::rbac_ports::{RbacApi, RbacApis, StopHandle, WatchSubscription};

pub(crate) struct FakeRbacApi {
    version: ApiVersion,
    fail_watch: Mutex<bool>,
    watch_senders: Mutex<Vec<mpsc::Sender<RawWatchEvent>>>,
    listing: Mutex<Option<BindingListPayload>>,
    roles: Mutex<HashMap<String, RolePayload>>,
    role_fetches: Mutex<usize>,
    stops: Arc<AtomicUsize>,
}

impl FakeRbacApi {
    fn new(version: ApiVersion) -> Self {
        Self {
            version,
            fail_watch: Mutex::new(false),
            watch_senders: Mutex::new(Vec::new()),
            listing: Mutex::new(None),
            roles: Mutex::new(HashMap::new()),
            role_fetches: Mutex::new(0),
            stops: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub(crate) async fn fail_watch(&self) {
        *self.fail_watch.lock().await = true;
    }

    pub(crate) async fn set_listing(&self, listing: BindingListPayload) {
        *self.listing.lock().await = Some(listing);
    }

    pub(crate) async fn set_role(&self, name: &str, role: RolePayload) {
        self.roles.lock().await.insert(name.to_owned(), role);
    }

    pub(crate) async fn role_fetches(&self) -> usize {
        *self.role_fetches.lock().await
    }

    /// Sender feeding the most recently opened subscription.
    pub(crate) async fn latest_sender(&self) -> Option<mpsc::Sender<RawWatchEvent>> {
        self.watch_senders.lock().await.last().cloned()
    }

    /// Drops every sender, which closes the opened subscriptions.
    pub(crate) async fn close_streams(&self) {
        self.watch_senders.lock().await.clear();
    }

    pub(crate) fn stops(&self) -> usize {
        self.stops.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl RbacApi for FakeRbacApi {
    fn version(&self) -> ApiVersion {
        self.version
    }

    async fn watch_cluster_role_bindings(&self) -> AppResult<WatchSubscription> {
        if *self.fail_watch.lock().await {
            return Err(AppError::Connection("watch rejected".to_owned()));
        }

        let (sender, receiver) = mpsc::channel(16);
        self.watch_senders.lock().await.push(sender);
        let stops = Arc::clone(&self.stops);

        Ok(WatchSubscription::new(
            receiver,
            StopHandle::new(move || {
                stops.fetch_add(1, Ordering::SeqCst);
            }),
        ))
    }

    async fn list_cluster_role_bindings(&self) -> AppResult<BindingListPayload> {
        self.listing
            .lock()
            .await
            .clone()
            .ok_or_else(|| AppError::Connection("list rejected".to_owned()))
    }

    async fn get_cluster_role(&self, name: &str) -> AppResult<RolePayload> {
        *self.role_fetches.lock().await += 1;
        self.roles
            .lock()
            .await
            .get(name)
            .cloned()
            .ok_or_else(|| AppError::NotFound(format!("cluster role '{name}'")))
    }
}

pub(crate) struct FakeApis {
    pub(crate) v1: Arc<FakeRbacApi>,
    pub(crate) v1alpha1: Arc<FakeRbacApi>,
    pub(crate) v1beta1: Arc<FakeRbacApi>,
}

impl FakeApis {
    pub(crate) fn new() -> Self {
        Self {
            v1: Arc::new(FakeRbacApi::new(ApiVersion::V1)),
            v1alpha1: Arc::new(FakeRbacApi::new(ApiVersion::V1Alpha1)),
            v1beta1: Arc::new(FakeRbacApi::new(ApiVersion::V1Beta1)),
        }
    }

    pub(crate) fn apis(&self) -> RbacApis {
        let apis = RbacApis::new(
            Arc::clone(&self.v1) as Arc<dyn RbacApi>,
            Arc::clone(&self.v1alpha1) as Arc<dyn RbacApi>,
            Arc::clone(&self.v1beta1) as Arc<dyn RbacApi>,
        );
        match apis {
            Ok(apis) => apis,
            Err(error) => panic!("fake apis are built per revision: {error}"),
        }
    }

    pub(crate) fn get(&self, version: ApiVersion) -> &Arc<FakeRbacApi> {
        match version {
            ApiVersion::V1 => &self.v1,
            ApiVersion::V1Alpha1 => &self.v1alpha1,
            ApiVersion::V1Beta1 => &self.v1beta1,
        }
    }

    pub(crate) async fn total_role_fetches(&self) -> usize {
        self.v1.role_fetches().await
            + self.v1alpha1.role_fetches().await
            + self.v1beta1.role_fetches().await
    }
}

#[derive(Default)]
pub(crate) struct CountingReporter {
    failures: std::sync::Mutex<Vec<ConversionFailure>>,
}

impl CountingReporter {
    pub(crate) fn failures(&self) -> Vec<ConversionFailure> {
        self.failures
            .lock()
            .map(|failures| failures.clone())
            .unwrap_or_default()
    }
}

impl ConversionFailureReporter for CountingReporter {
    fn report(&self, failure: &ConversionFailure) {
        if let Ok(mut failures) = self.failures.lock() {
            failures.push(failure.clone());
        }
    }
}
