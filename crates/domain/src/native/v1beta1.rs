//! Beta (`rbac.authorization.k8s.io/v1beta1`) shapes.

use serde::{Deserialize, Serialize};

use super::{ListMeta, ObjectMeta};

/// Reference from a binding to the role it grants.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoleRef {
    /// API group of the referenced role.
    #[serde(default)]
    pub api_group: String,
    /// Kind of the referenced role.
    #[serde(default)]
    pub kind: String,
    /// Name of the referenced role.
    pub name: String,
}

/// Binding subject.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Subject {
    /// Subject kind, e.g. `Group`.
    pub kind: String,
    /// API group of the subject's kind.
    #[serde(default)]
    pub api_group: Option<String>,
    /// Subject name.
    pub name: String,
    /// Namespace, for service accounts.
    #[serde(default)]
    pub namespace: Option<String>,
}

/// Cluster role binding.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClusterRoleBinding {
    /// Object metadata.
    #[serde(default)]
    pub metadata: ObjectMeta,
    /// Granted role.
    pub role_ref: RoleRef,
    /// Subjects in declaration order.
    #[serde(default)]
    pub subjects: Vec<Subject>,
}

/// Cluster role binding listing.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClusterRoleBindingList {
    /// List metadata.
    #[serde(default)]
    pub metadata: ListMeta,
    /// Listed bindings.
    #[serde(default)]
    pub items: Vec<ClusterRoleBinding>,
}

/// Permission rule of a cluster role.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PolicyRule {
    /// Permission verbs.
    #[serde(default)]
    pub verbs: Vec<String>,
    /// API groups the rule covers.
    #[serde(default)]
    pub api_groups: Vec<String>,
    /// Resource kinds the rule covers.
    #[serde(default)]
    pub resources: Vec<String>,
    /// Specific resource names, when restricted.
    #[serde(default)]
    pub resource_names: Vec<String>,
}

/// Cluster role.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClusterRole {
    /// Object metadata.
    #[serde(default)]
    pub metadata: ObjectMeta,
    /// Permission rules.
    #[serde(default)]
    pub rules: Vec<PolicyRule>,
}
