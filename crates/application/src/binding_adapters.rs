//! Version adapters projecting native binding payloads into [`CanonicalBinding`].

use rbac_inspector_core::{AppError, AppResult};
use rbac_inspector_domain::{
    ApiVersion, BindingListPayload, BindingPayload, BindingSubject, CanonicalBinding,
    CanonicalRole, RawWatchEvent, WatchEventType, native::v1, native::v1alpha1, native::v1beta1,
};

/// Raw watch notification tagged with the revision of the session it came from.
#[derive(Debug, Clone, PartialEq)]
pub struct TaggedWatchEvent {
    /// Revision of the originating watch session.
    pub version: ApiVersion,
    /// Notification as delivered by the backend.
    pub event: RawWatchEvent,
}

/// Converts one tagged notification with the adapter of its revision.
///
/// Fails when the payload shape does not belong to the session revision or a
/// subject kind is unknown; both are non-fatal for the caller.
pub fn convert_event(event: &TaggedWatchEvent) -> AppResult<CanonicalBinding> {
    if event.event.event_type == WatchEventType::Bookmark {
        return Err(AppError::Conversion(format!(
            "{}: BOOKMARK event carries no binding",
            event.version
        )));
    }

    match (event.version, &event.event.object) {
        (ApiVersion::V1, BindingPayload::V1(binding)) => convert_v1(binding),
        (ApiVersion::V1Alpha1, BindingPayload::V1Alpha1(binding)) => convert_v1alpha1(binding),
        (ApiVersion::V1Beta1, BindingPayload::V1Beta1(binding)) => convert_v1beta1(binding),
        (version, object) => Err(AppError::Conversion(format!(
            "{version}: {} event carries {}",
            event.event.event_type.as_str(),
            object.describe()
        ))),
    }
}

/// Converts every item of a listing, keeping item order.
///
/// Each item converts independently; no filtering or deduplication happens
/// across items.
#[must_use]
pub fn convert_list(list: &BindingListPayload) -> Vec<AppResult<CanonicalBinding>> {
    match list {
        BindingListPayload::V1(list) => list.items.iter().map(convert_v1).collect(),
        BindingListPayload::V1Alpha1(list) => list.items.iter().map(convert_v1alpha1).collect(),
        BindingListPayload::V1Beta1(list) => list.items.iter().map(convert_v1beta1).collect(),
    }
}

/// Stable revision adapter.
pub fn convert_v1(binding: &v1::ClusterRoleBinding) -> AppResult<CanonicalBinding> {
    project(
        ApiVersion::V1,
        binding.role_ref.name.as_str(),
        binding.subjects.iter().map(|subject| {
            (
                subject.kind.as_str(),
                subject.name.as_str(),
                subject.namespace.as_deref(),
            )
        }),
    )
}

/// Alpha revision adapter.
pub fn convert_v1alpha1(binding: &v1alpha1::ClusterRoleBinding) -> AppResult<CanonicalBinding> {
    project(
        ApiVersion::V1Alpha1,
        binding.role_ref.name.as_str(),
        binding.subjects.iter().map(|subject| {
            (
                subject.kind.as_str(),
                subject.name.as_str(),
                subject.namespace.as_deref(),
            )
        }),
    )
}

/// Beta revision adapter.
pub fn convert_v1beta1(binding: &v1beta1::ClusterRoleBinding) -> AppResult<CanonicalBinding> {
    project(
        ApiVersion::V1Beta1,
        binding.role_ref.name.as_str(),
        binding.subjects.iter().map(|subject| {
            (
                subject.kind.as_str(),
                subject.name.as_str(),
                subject.namespace.as_deref(),
            )
        }),
    )
}

// A later subject overwrites the earlier one of its kind only.
fn project<'a>(
    version: ApiVersion,
    role_name: &str,
    subjects: impl Iterator<Item = (&'a str, &'a str, Option<&'a str>)>,
) -> AppResult<CanonicalBinding> {
    let mut binding = CanonicalBinding::new(CanonicalRole::new(role_name, version));
    for (kind, name, namespace) in subjects {
        let subject = BindingSubject::from_parts(kind, name, namespace)
            .map_err(|error| error.with_context(version))?;
        binding = binding.with_subject(subject);
    }

    Ok(binding)
}
