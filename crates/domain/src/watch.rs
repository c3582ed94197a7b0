use std::str::FromStr;

use rbac_inspector_core::{AppError, AppResult};
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::ApiVersion;
use crate::native::{ApiStatus, v1, v1alpha1, v1beta1};

const BINDING_KIND: &str = "ClusterRoleBinding";
const BINDING_LIST_KIND: &str = "ClusterRoleBindingList";
const ROLE_KIND: &str = "ClusterRole";
const STATUS_KIND: &str = "Status";

/// Change notification type of one watch frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WatchEventType {
    /// Object was created.
    Added,
    /// Object was updated.
    Modified,
    /// Object was removed.
    Deleted,
    /// Progress marker without object changes.
    Bookmark,
    /// Backend reported a watch error.
    Error,
}

impl WatchEventType {
    /// Returns the wire value of the event type.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Added => "ADDED",
            Self::Modified => "MODIFIED",
            Self::Deleted => "DELETED",
            Self::Bookmark => "BOOKMARK",
            Self::Error => "ERROR",
        }
    }
}

impl FromStr for WatchEventType {
    type Err = AppError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "ADDED" => Ok(Self::Added),
            "MODIFIED" => Ok(Self::Modified),
            "DELETED" => Ok(Self::Deleted),
            "BOOKMARK" => Ok(Self::Bookmark),
            "ERROR" => Ok(Self::Error),
            _ => Err(AppError::Validation(format!(
                "unknown watch event type '{value}'"
            ))),
        }
    }
}

/// Binding object carried by one watch frame, tagged by its declared revision.
#[derive(Debug, Clone, PartialEq)]
pub enum BindingPayload {
    /// Stable revision binding.
    V1(v1::ClusterRoleBinding),
    /// Alpha revision binding.
    V1Alpha1(v1alpha1::ClusterRoleBinding),
    /// Beta revision binding.
    V1Beta1(v1beta1::ClusterRoleBinding),
    /// Backend status object, sent with `ERROR` frames.
    Status(ApiStatus),
    /// Object that matched none of the known shapes.
    Unrecognized(Value),
}

impl BindingPayload {
    /// Decodes one object using its `kind` and `apiVersion` tags.
    ///
    /// Never fails: anything that cannot be decoded is kept as
    /// [`BindingPayload::Unrecognized`] so the consumer can report it.
    #[must_use]
    pub fn decode(object: Value) -> Self {
        match object_tags(&object) {
            (Some(STATUS_KIND), _) => decode_as(object, Self::Status),
            (Some(BINDING_KIND), Some(version)) => match version {
                ApiVersion::V1 => decode_as(object, Self::V1),
                ApiVersion::V1Alpha1 => decode_as(object, Self::V1Alpha1),
                ApiVersion::V1Beta1 => decode_as(object, Self::V1Beta1),
            },
            _ => Self::Unrecognized(object),
        }
    }

    /// Returns the revision the payload declares, if it is a binding.
    #[must_use]
    pub fn version(&self) -> Option<ApiVersion> {
        match self {
            Self::V1(_) => Some(ApiVersion::V1),
            Self::V1Alpha1(_) => Some(ApiVersion::V1Alpha1),
            Self::V1Beta1(_) => Some(ApiVersion::V1Beta1),
            Self::Status(_) | Self::Unrecognized(_) => None,
        }
    }

    /// Returns a short description of the payload shape for reports.
    #[must_use]
    pub fn describe(&self) -> String {
        match self {
            Self::V1(_) | Self::V1Alpha1(_) | Self::V1Beta1(_) => {
                format!("{BINDING_KIND} {}", self.version().map_or("", |v| v.as_str()))
            }
            Self::Status(status) => format!(
                "{STATUS_KIND} {} ({}): {}",
                status.code, status.reason, status.message
            ),
            Self::Unrecognized(_) => "unrecognized object".to_owned(),
        }
    }
}

/// One raw watch notification as delivered by a watch subscription.
#[derive(Debug, Clone, PartialEq)]
pub struct RawWatchEvent {
    /// Notification type.
    pub event_type: WatchEventType,
    /// Carried object.
    pub object: BindingPayload,
}

impl RawWatchEvent {
    /// Creates a watch event.
    #[must_use]
    pub fn new(event_type: WatchEventType, object: BindingPayload) -> Self {
        Self { event_type, object }
    }
}

/// Full listing payload of one revision.
#[derive(Debug, Clone, PartialEq)]
pub enum BindingListPayload {
    /// Stable revision listing.
    V1(v1::ClusterRoleBindingList),
    /// Alpha revision listing.
    V1Alpha1(v1alpha1::ClusterRoleBindingList),
    /// Beta revision listing.
    V1Beta1(v1beta1::ClusterRoleBindingList),
}

impl BindingListPayload {
    /// Decodes a listing body into the shape of the given revision.
    pub fn decode(version: ApiVersion, body: Value) -> AppResult<Self> {
        expect_kind(&body, BINDING_LIST_KIND, version)?;
        match version {
            ApiVersion::V1 => from_value(body).map(Self::V1),
            ApiVersion::V1Alpha1 => from_value(body).map(Self::V1Alpha1),
            ApiVersion::V1Beta1 => from_value(body).map(Self::V1Beta1),
        }
    }

    /// Returns the revision of the listing.
    #[must_use]
    pub fn version(&self) -> ApiVersion {
        match self {
            Self::V1(_) => ApiVersion::V1,
            Self::V1Alpha1(_) => ApiVersion::V1Alpha1,
            Self::V1Beta1(_) => ApiVersion::V1Beta1,
        }
    }
}

/// Cluster role fetched through one revision.
#[derive(Debug, Clone, PartialEq)]
pub enum RolePayload {
    /// Stable revision role.
    V1(v1::ClusterRole),
    /// Alpha revision role.
    V1Alpha1(v1alpha1::ClusterRole),
    /// Beta revision role.
    V1Beta1(v1beta1::ClusterRole),
}

impl RolePayload {
    /// Decodes a role body into the shape of the given revision.
    pub fn decode(version: ApiVersion, body: Value) -> AppResult<Self> {
        expect_kind(&body, ROLE_KIND, version)?;
        match version {
            ApiVersion::V1 => from_value(body).map(Self::V1),
            ApiVersion::V1Alpha1 => from_value(body).map(Self::V1Alpha1),
            ApiVersion::V1Beta1 => from_value(body).map(Self::V1Beta1),
        }
    }

    /// Returns the revision of the role.
    #[must_use]
    pub fn version(&self) -> ApiVersion {
        match self {
            Self::V1(_) => ApiVersion::V1,
            Self::V1Alpha1(_) => ApiVersion::V1Alpha1,
            Self::V1Beta1(_) => ApiVersion::V1Beta1,
        }
    }
}

fn object_tags(object: &Value) -> (Option<&str>, Option<ApiVersion>) {
    let kind = object.get("kind").and_then(Value::as_str);
    let version = object
        .get("apiVersion")
        .and_then(Value::as_str)
        .and_then(ApiVersion::from_group_version);

    (kind, version)
}

fn decode_as<T, F>(object: Value, wrap: F) -> BindingPayload
where
    T: DeserializeOwned,
    F: FnOnce(T) -> BindingPayload,
{
    match serde_json::from_value::<T>(object.clone()) {
        Ok(value) => wrap(value),
        Err(_) => BindingPayload::Unrecognized(object),
    }
}

// Missing tags are accepted; only an explicit mismatch is rejected.
fn expect_kind(body: &Value, kind: &str, version: ApiVersion) -> AppResult<()> {
    if let Some(found) = body.get("kind").and_then(Value::as_str) {
        if found != kind {
            return Err(AppError::Conversion(format!(
                "expected kind '{kind}', got '{found}'"
            )));
        }
    }

    if let Some(found) = body.get("apiVersion").and_then(Value::as_str) {
        if found != version.group_version() {
            return Err(AppError::Conversion(format!(
                "expected apiVersion '{}', got '{found}'",
                version.group_version()
            )));
        }
    }

    Ok(())
}

fn from_value<T: DeserializeOwned>(body: Value) -> AppResult<T> {
    serde_json::from_value(body)
        .map_err(|error| AppError::Conversion(format!("failed to decode payload: {error}")))
}
