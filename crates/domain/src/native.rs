//! Native resource shapes, one module per schema revision.
//!
//! Only the fields the inspector reads are modelled; unknown fields are
//! ignored on decode.

pub mod v1;
pub mod v1alpha1;
pub mod v1beta1;

use serde::{Deserialize, Serialize};

/// Object metadata subset shared by every revision.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ObjectMeta {
    /// Object name.
    #[serde(default)]
    pub name: String,
    /// Opaque resource version.
    #[serde(default)]
    pub resource_version: Option<String>,
    /// Backend-assigned UID.
    #[serde(default)]
    pub uid: Option<String>,
}

/// List metadata subset.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListMeta {
    /// Resource version the listing was served at.
    #[serde(default)]
    pub resource_version: Option<String>,
}

/// Status object returned by the backend for failed requests and `ERROR` frames.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiStatus {
    /// Human-readable failure description.
    #[serde(default)]
    pub message: String,
    /// Machine-readable failure reason.
    #[serde(default)]
    pub reason: String,
    /// HTTP status code.
    #[serde(default)]
    pub code: u16,
}
