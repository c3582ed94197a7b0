use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use rbac_inspector_core::AppError;
use rbac_inspector_domain::native::{v1, v1alpha1, v1beta1};
use rbac_inspector_domain::{
    ApiVersion, BindingListPayload, BindingPayload, BindingSubject, CanonicalBinding,
    CanonicalRole, RawWatchEvent, WatchEventType,
};
use tokio::time::timeout;

use super::{BindingStream, BindingWatchService, WatchRegistry};
use crate::conversion_reporter::ConversionOrigin;
use crate::test_support::{CountingReporter, FakeApis};

const WAIT: Duration = Duration::from_secs(2);
const QUIET: Duration = Duration::from_millis(100);

fn service(fakes: &FakeApis) -> (BindingWatchService, Arc<CountingReporter>) {
    let reporter = Arc::new(CountingReporter::default());
    let service = BindingWatchService::with_registry(
        fakes.apis(),
        Arc::new(WatchRegistry::new()),
        Arc::clone(&reporter) as Arc<dyn crate::ConversionFailureReporter>,
    );

    (service, reporter)
}

fn user_event(version: ApiVersion, role: &str, user: &str) -> RawWatchEvent {
    let object = match version {
        ApiVersion::V1 => BindingPayload::V1(v1::ClusterRoleBinding {
            metadata: Default::default(),
            role_ref: v1::RoleRef {
                name: role.to_owned(),
                ..Default::default()
            },
            subjects: vec![v1::Subject {
                kind: "User".to_owned(),
                name: user.to_owned(),
                ..Default::default()
            }],
        }),
        ApiVersion::V1Alpha1 => BindingPayload::V1Alpha1(v1alpha1::ClusterRoleBinding {
            metadata: Default::default(),
            role_ref: v1alpha1::RoleRef {
                name: role.to_owned(),
                ..Default::default()
            },
            subjects: vec![v1alpha1::Subject {
                kind: "User".to_owned(),
                name: user.to_owned(),
                ..Default::default()
            }],
        }),
        ApiVersion::V1Beta1 => BindingPayload::V1Beta1(v1beta1::ClusterRoleBinding {
            metadata: Default::default(),
            role_ref: v1beta1::RoleRef {
                name: role.to_owned(),
                ..Default::default()
            },
            subjects: vec![v1beta1::Subject {
                kind: "User".to_owned(),
                name: user.to_owned(),
                ..Default::default()
            }],
        }),
    };

    RawWatchEvent::new(WatchEventType::Added, object)
}

async fn push(fakes: &FakeApis, version: ApiVersion, event: RawWatchEvent) {
    let Some(sender) = fakes.get(version).latest_sender().await else {
        panic!("no open {version} subscription");
    };
    assert!(sender.send(event).await.is_ok());
}

async fn next(stream: &mut BindingStream) -> Option<CanonicalBinding> {
    timeout(WAIT, stream.recv()).await.ok().flatten()
}

async fn assert_quiet(stream: &mut BindingStream) {
    assert!(timeout(QUIET, stream.recv()).await.is_err());
}

async fn assert_closed(stream: &mut BindingStream) {
    let closed = timeout(WAIT, async {
        while stream.recv().await.is_some() {}
    })
    .await;
    assert!(closed.is_ok(), "stream must close after stop");
}

async fn start(service: &BindingWatchService) -> BindingStream {
    match service.start().await {
        Ok(stream) => stream,
        Err(error) => panic!("start must succeed: {error}"),
    }
}

#[tokio::test]
async fn service_account_event_reaches_the_consumer() {
    let fakes = FakeApis::new();
    let (service, _) = service(&fakes);
    let mut stream = start(&service).await;

    push(
        &fakes,
        ApiVersion::V1,
        RawWatchEvent::new(
            WatchEventType::Added,
            BindingPayload::V1(v1::ClusterRoleBinding {
                metadata: Default::default(),
                role_ref: v1::RoleRef {
                    name: "view".to_owned(),
                    ..Default::default()
                },
                subjects: vec![v1::Subject {
                    kind: "ServiceAccount".to_owned(),
                    name: "sa1".to_owned(),
                    namespace: Some("ns1".to_owned()),
                    ..Default::default()
                }],
            }),
        ),
    )
    .await;

    let received = next(&mut stream).await;
    assert_eq!(
        received,
        Some(
            CanonicalBinding::new(CanonicalRole::new("view", ApiVersion::V1)).with_subject(
                BindingSubject::ServiceAccount {
                    name: "sa1".to_owned(),
                    namespace: "ns1".to_owned(),
                }
            )
        )
    );
    let Some(received) = received else {
        return;
    };
    assert_eq!(received.group(), None);
    assert_eq!(received.user(), None);
    assert_quiet(&mut stream).await;

    service.stop_all().await;
}

#[tokio::test]
async fn every_injected_event_is_delivered_exactly_once() {
    let fakes = Arc::new(FakeApis::new());
    let (service, reporter) = service(&fakes);
    let mut stream = start(&service).await;

    let per_revision = 20;
    let mut producers = Vec::new();
    for version in ApiVersion::all().iter().copied() {
        let fakes = Arc::clone(&fakes);
        producers.push(tokio::spawn(async move {
            for index in 0..per_revision {
                push(
                    &fakes,
                    version,
                    user_event(version, "view", &format!("{version}-{index}")),
                )
                .await;
                tokio::task::yield_now().await;
            }
        }));
    }

    let mut seen: HashMap<String, usize> = HashMap::new();
    for _ in 0..per_revision * ApiVersion::all().len() {
        let Some(binding) = next(&mut stream).await else {
            panic!("stream ended early");
        };
        *seen.entry(binding.user().unwrap_or_default().to_owned()).or_default() += 1;
    }
    for producer in producers {
        assert!(producer.await.is_ok());
    }

    assert_eq!(seen.len(), per_revision * ApiVersion::all().len());
    assert!(seen.values().all(|count| *count == 1));
    assert_quiet(&mut stream).await;
    assert!(reporter.failures().is_empty());

    service.stop_all().await;
}

#[tokio::test]
async fn revision_order_is_preserved_within_one_source() {
    let fakes = FakeApis::new();
    let (service, _) = service(&fakes);
    let mut stream = start(&service).await;

    for index in 0..5 {
        push(
            &fakes,
            ApiVersion::V1Beta1,
            user_event(ApiVersion::V1Beta1, "edit", &format!("user-{index}")),
        )
        .await;
    }

    for index in 0..5 {
        let received = next(&mut stream).await;
        let expected = format!("user-{index}");
        assert_eq!(
            received.as_ref().and_then(CanonicalBinding::user),
            Some(expected.as_str())
        );
    }

    service.stop_all().await;
}

#[tokio::test]
async fn malformed_event_is_reported_and_skipped() {
    let fakes = FakeApis::new();
    let (service, reporter) = service(&fakes);
    let mut stream = start(&service).await;

    // A stable payload on the alpha session does not match its revision.
    push(
        &fakes,
        ApiVersion::V1Alpha1,
        user_event(ApiVersion::V1, "view", "mallory"),
    )
    .await;
    assert_quiet(&mut stream).await;

    let failures = reporter.failures();
    assert_eq!(failures.len(), 1);
    assert_eq!(failures[0].version, ApiVersion::V1Alpha1);
    assert!(matches!(failures[0].error, AppError::Conversion(_)));
    assert!(matches!(
        failures[0].origin,
        ConversionOrigin::Watch { watch_id, event_type: WatchEventType::Added }
            if watch_id == stream.watch_id()
    ));

    push(
        &fakes,
        ApiVersion::V1Beta1,
        user_event(ApiVersion::V1Beta1, "view", "alice"),
    )
    .await;
    let received = next(&mut stream).await;
    assert_eq!(received.as_ref().and_then(CanonicalBinding::user), Some("alice"));
    assert_quiet(&mut stream).await;
    assert_eq!(reporter.failures().len(), 1);

    service.stop_all().await;
}

#[tokio::test]
async fn start_fails_fast_and_releases_opened_watches() {
    let fakes = FakeApis::new();
    fakes.v1beta1.fail_watch().await;
    let (service, _) = service(&fakes);

    let result = service.start().await;

    assert!(matches!(result, Err(AppError::Connection(ref message)) if message.starts_with("v1beta1")));
    assert_eq!(fakes.v1.stops(), 1);
    assert_eq!(fakes.v1alpha1.stops(), 1);
    assert_eq!(fakes.v1beta1.stops(), 0);
    assert!(service.registry().is_empty().await);
}

#[tokio::test]
async fn stop_all_twice_closes_each_stream_once() {
    let fakes = FakeApis::new();
    let (service, _) = service(&fakes);
    let mut first = start(&service).await;
    let mut second = start(&service).await;
    assert_eq!(service.registry().len().await, 2);

    service.stop_all().await;
    service.stop_all().await;

    assert_closed(&mut first).await;
    assert_closed(&mut second).await;
    assert!(first.recv().await.is_none());
    for version in ApiVersion::all() {
        assert_eq!(fakes.get(*version).stops(), 2);
    }
    assert!(service.registry().is_empty().await);
}

#[tokio::test]
async fn concurrent_stop_all_releases_each_instance_once() {
    let fakes = FakeApis::new();
    let (service, _) = service(&fakes);
    let mut stream = start(&service).await;

    let racer = service.clone();
    let (spawned, ()) = tokio::join!(
        tokio::spawn(async move { racer.stop_all().await }),
        service.stop_all()
    );
    assert!(spawned.is_ok());

    assert_closed(&mut stream).await;
    for version in ApiVersion::all() {
        assert_eq!(fakes.get(*version).stops(), 1);
    }
}

#[tokio::test]
async fn stop_all_without_instances_is_a_no_op() {
    let fakes = FakeApis::new();
    let (service, _) = service(&fakes);

    service.stop_all().await;

    assert!(service.registry().is_empty().await);
}

#[tokio::test]
async fn stop_closes_stream_blocked_on_a_slow_consumer() {
    let fakes = FakeApis::new();
    let (service, _) = service(&fakes);
    let mut stream = start(&service).await;

    // One binding fills the slot, the second parks the loop on publish.
    for user in ["a", "b", "c"] {
        push(&fakes, ApiVersion::V1, user_event(ApiVersion::V1, "view", user)).await;
    }
    tokio::time::sleep(QUIET).await;

    let stopped = timeout(WAIT, service.stop(stream.watch_id())).await;
    assert!(stopped.is_ok(), "stop must not wait for the consumer");

    assert_closed(&mut stream).await;
}

#[tokio::test]
async fn per_instance_stop_leaves_other_instances_running() {
    let fakes = FakeApis::new();
    let (service, _) = service(&fakes);
    let mut stopped = start(&service).await;
    let mut running = start(&service).await;

    service.stop(stopped.watch_id()).await;
    service.stop(stopped.watch_id()).await;
    assert_closed(&mut stopped).await;

    push(&fakes, ApiVersion::V1, user_event(ApiVersion::V1, "view", "bob")).await;
    let received = next(&mut running).await;
    assert_eq!(received.as_ref().and_then(CanonicalBinding::user), Some("bob"));
    assert_eq!(service.registry().len().await, 1);

    service.stop_all().await;
    assert_closed(&mut running).await;
}

#[tokio::test]
async fn backend_closing_one_source_keeps_the_stream_open() {
    let fakes = FakeApis::new();
    let (service, _) = service(&fakes);
    let mut stream = start(&service).await;
    let Some(beta) = fakes.v1beta1.latest_sender().await else {
        panic!("beta subscription must be open");
    };

    fakes.v1.close_streams().await;
    fakes.v1alpha1.close_streams().await;
    assert_quiet(&mut stream).await;

    assert!(
        beta.send(user_event(ApiVersion::V1Beta1, "view", "carol"))
            .await
            .is_ok()
    );
    let received = next(&mut stream).await;
    assert_eq!(received.as_ref().and_then(CanonicalBinding::user), Some("carol"));

    drop(beta);
    fakes.v1beta1.close_streams().await;
    assert_quiet(&mut stream).await;

    service.stop_all().await;
    assert_closed(&mut stream).await;
}

#[tokio::test]
async fn list_converts_snapshot_and_reports_bad_items() {
    let fakes = FakeApis::new();
    fakes
        .v1
        .set_listing(BindingListPayload::V1(v1::ClusterRoleBindingList {
            metadata: Default::default(),
            items: vec![
                v1::ClusterRoleBinding {
                    metadata: Default::default(),
                    role_ref: v1::RoleRef {
                        name: "view".to_owned(),
                        ..Default::default()
                    },
                    subjects: vec![v1::Subject {
                        kind: "Group".to_owned(),
                        name: "devs".to_owned(),
                        ..Default::default()
                    }],
                },
                v1::ClusterRoleBinding {
                    metadata: Default::default(),
                    role_ref: v1::RoleRef {
                        name: "edit".to_owned(),
                        ..Default::default()
                    },
                    subjects: vec![v1::Subject {
                        kind: "Robot".to_owned(),
                        name: "r2".to_owned(),
                        ..Default::default()
                    }],
                },
                v1::ClusterRoleBinding {
                    metadata: Default::default(),
                    role_ref: v1::RoleRef {
                        name: "view".to_owned(),
                        ..Default::default()
                    },
                    subjects: vec![v1::Subject {
                        kind: "Group".to_owned(),
                        name: "devs".to_owned(),
                        ..Default::default()
                    }],
                },
            ],
        }))
        .await;
    let (service, reporter) = service(&fakes);

    let listed = service.list(ApiVersion::V1).await;

    let Ok(listed) = listed else {
        panic!("listing must succeed");
    };
    assert_eq!(listed.len(), 2);
    assert!(listed.iter().all(|binding| binding.group() == Some("devs")));
    let failures = reporter.failures();
    assert_eq!(failures.len(), 1);
    assert_eq!(failures[0].origin, ConversionOrigin::Listing);
}

#[tokio::test]
async fn list_failure_is_tagged_with_revision() {
    let fakes = FakeApis::new();
    let (service, _) = service(&fakes);

    let result = service.list(ApiVersion::V1Alpha1).await;

    assert!(matches!(result, Err(AppError::Connection(ref message)) if message.starts_with("v1alpha1")));
}
