use std::str::FromStr;

use rbac_inspector_core::AppError;
use serde::{Deserialize, Serialize};

use crate::CanonicalRole;

/// Subject kinds a binding can grant a role to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SubjectKind {
    /// A group of users.
    Group,
    /// A namespaced service account.
    ServiceAccount,
    /// A single user.
    User,
}

impl SubjectKind {
    /// Returns the backend kind value.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Group => "Group",
            Self::ServiceAccount => "ServiceAccount",
            Self::User => "User",
        }
    }
}

impl FromStr for SubjectKind {
    type Err = AppError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "Group" => Ok(Self::Group),
            "ServiceAccount" => Ok(Self::ServiceAccount),
            "User" => Ok(Self::User),
            _ => Err(AppError::Conversion(format!("unknown subject kind '{value}'"))),
        }
    }
}

/// One classified source subject.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind")]
pub enum BindingSubject {
    /// Group subject.
    Group {
        /// Group name.
        name: String,
    },
    /// Service account subject.
    ServiceAccount {
        /// Service account name.
        name: String,
        /// Namespace of the service account.
        namespace: String,
    },
    /// User subject.
    User {
        /// User name.
        name: String,
    },
}

impl BindingSubject {
    /// Builds a subject from backend kind, name and namespace values.
    pub fn from_parts(kind: &str, name: &str, namespace: Option<&str>) -> Result<Self, AppError> {
        let subject = match SubjectKind::from_str(kind)? {
            SubjectKind::Group => Self::Group {
                name: name.to_owned(),
            },
            SubjectKind::ServiceAccount => Self::ServiceAccount {
                name: name.to_owned(),
                namespace: namespace.unwrap_or_default().to_owned(),
            },
            SubjectKind::User => Self::User {
                name: name.to_owned(),
            },
        };

        Ok(subject)
    }

    /// Returns the subject kind.
    #[must_use]
    pub fn kind(&self) -> SubjectKind {
        match self {
            Self::Group { .. } => SubjectKind::Group,
            Self::ServiceAccount { .. } => SubjectKind::ServiceAccount,
            Self::User { .. } => SubjectKind::User,
        }
    }

    /// Returns the subject name.
    #[must_use]
    pub fn name(&self) -> &str {
        match self {
            Self::Group { name } | Self::ServiceAccount { name, .. } | Self::User { name } => {
                name.as_str()
            }
        }
    }
}

/// One normalized binding event or listed item.
///
/// Each subject kind has its own slot. A later subject of a kind overwrites
/// the earlier one of that kind; subjects of other kinds are kept. No backend
/// identity (name, UID) is carried.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CanonicalBinding {
    /// Referenced role, unresolved.
    pub role: CanonicalRole,
    /// Last group subject.
    pub group: Option<String>,
    /// Last service account subject.
    pub service_account: Option<String>,
    /// Namespace of the last service account subject.
    pub namespace: Option<String>,
    /// Last user subject.
    pub user: Option<String>,
}

impl CanonicalBinding {
    /// Creates a binding without subjects.
    #[must_use]
    pub fn new(role: CanonicalRole) -> Self {
        Self {
            role,
            group: None,
            service_account: None,
            namespace: None,
            user: None,
        }
    }

    /// Stores `subject` in the slot of its kind, returning the updated binding.
    #[must_use]
    pub fn with_subject(mut self, subject: BindingSubject) -> Self {
        match subject {
            BindingSubject::Group { name } => self.group = Some(name),
            BindingSubject::ServiceAccount { name, namespace } => {
                self.service_account = Some(name);
                self.namespace = Some(namespace);
            }
            BindingSubject::User { name } => self.user = Some(name),
        }
        self
    }

    /// Returns the kinds with a populated slot, in declaration order.
    #[must_use]
    pub fn subject_kinds(&self) -> Vec<SubjectKind> {
        [
            (self.group.is_some(), SubjectKind::Group),
            (self.service_account.is_some(), SubjectKind::ServiceAccount),
            (self.user.is_some(), SubjectKind::User),
        ]
        .into_iter()
        .filter_map(|(populated, kind)| populated.then_some(kind))
        .collect()
    }

    /// Returns whether no subject was recorded.
    #[must_use]
    pub fn has_no_subject(&self) -> bool {
        self.subject_kinds().is_empty()
    }

    /// Returns the group name, if any.
    #[must_use]
    pub fn group(&self) -> Option<&str> {
        self.group.as_deref()
    }

    /// Returns the service account name, if any.
    #[must_use]
    pub fn service_account(&self) -> Option<&str> {
        self.service_account.as_deref()
    }

    /// Returns the service account namespace, if any.
    #[must_use]
    pub fn namespace(&self) -> Option<&str> {
        self.namespace.as_deref()
    }

    /// Returns the user name, if any.
    #[must_use]
    pub fn user(&self) -> Option<&str> {
        self.user.as_deref()
    }
}
