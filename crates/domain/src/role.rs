use serde::{Deserialize, Serialize};

use crate::ApiVersion;

/// One permission rule projected from a role.
///
/// Ordering is kept as returned by the backend; duplicates are not removed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rule {
    /// Permission verbs, e.g. `get` or `list`.
    pub verbs: Vec<String>,
    /// Resource kinds the verbs apply to.
    pub resources: Vec<String>,
}

/// Role referenced by a binding, in revision-independent form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CanonicalRole {
    /// Role name within its revision's cluster scope.
    pub name: String,
    /// Revision the role was observed through.
    pub version: ApiVersion,
    /// Permission rules, empty until the role is resolved.
    pub rules: Vec<Rule>,
}

impl CanonicalRole {
    /// Creates an unresolved role reference.
    #[must_use]
    pub fn new(name: impl Into<String>, version: ApiVersion) -> Self {
        Self {
            name: name.into(),
            version,
            rules: Vec::new(),
        }
    }

    /// Returns whether rules were populated by a resolver call.
    #[must_use]
    pub fn is_resolved(&self) -> bool {
        !self.rules.is_empty()
    }

    /// Returns the untyped reference used by role resolution.
    #[must_use]
    pub fn reference(&self) -> RoleReference {
        RoleReference::from(self)
    }
}

/// Role reference as carried by callers that have not validated the revision.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleReference {
    /// Role name.
    pub name: String,
    /// Revision path value, e.g. `v1`.
    pub version: String,
}

impl RoleReference {
    /// Creates a role reference from raw values.
    #[must_use]
    pub fn new(name: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            version: version.into(),
        }
    }
}

impl From<&CanonicalRole> for RoleReference {
    fn from(role: &CanonicalRole) -> Self {
        Self {
            name: role.name.clone(),
            version: role.version.as_str().to_owned(),
        }
    }
}
