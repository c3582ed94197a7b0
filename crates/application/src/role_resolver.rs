use std::str::FromStr;

use rbac_inspector_core::AppError;
use rbac_inspector_domain::{ApiVersion, CanonicalRole, RoleReference, RolePayload, Rule};
use thiserror::Error;

use crate::rbac_ports::RbacApis;

/// Role resolution failure. Always carries the unchanged input reference.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RoleResolutionError {
    /// Reference names a revision outside of the supported set.
    #[error("unsupported version '{}' for role '{}'", .role.version, .role.name)]
    UnsupportedVersion {
        /// Input reference.
        role: RoleReference,
    },
    /// Backend fetch or projection failed.
    #[error("failed to resolve role '{}': {source}", .role.name)]
    Backend {
        /// Input reference.
        role: RoleReference,
        /// Revision-tagged backend error.
        source: AppError,
    },
}

impl RoleResolutionError {
    /// Returns the input reference.
    #[must_use]
    pub fn role(&self) -> &RoleReference {
        match self {
            Self::UnsupportedVersion { role } | Self::Backend { role, .. } => role,
        }
    }

    /// Consumes the error, returning the input reference.
    #[must_use]
    pub fn into_role(self) -> RoleReference {
        match self {
            Self::UnsupportedVersion { role } | Self::Backend { role, .. } => role,
        }
    }
}

/// Fetches role permission rules on demand. No caching: every call hits the backend.
#[derive(Clone)]
pub struct RoleResolver {
    apis: RbacApis,
}

impl RoleResolver {
    /// Creates a resolver over the revision handles.
    #[must_use]
    pub fn new(apis: RbacApis) -> Self {
        Self { apis }
    }

    /// Resolves a role reference into a role with populated rules.
    pub async fn resolve(&self, role: RoleReference) -> Result<CanonicalRole, RoleResolutionError> {
        let Ok(version) = ApiVersion::from_str(role.version.as_str()) else {
            return Err(RoleResolutionError::UnsupportedVersion { role });
        };

        let payload = match self.apis.get(version).get_cluster_role(&role.name).await {
            Ok(payload) => payload,
            Err(error) => {
                return Err(RoleResolutionError::Backend {
                    role,
                    source: error.with_context(version),
                });
            }
        };

        match project_rules(version, payload) {
            Ok(rules) => Ok(CanonicalRole {
                name: role.name,
                version,
                rules,
            }),
            Err(error) => Err(RoleResolutionError::Backend {
                role,
                source: error,
            }),
        }
    }

    /// Resolves the role of a canonical binding.
    pub async fn resolve_role(
        &self,
        role: &CanonicalRole,
    ) -> Result<CanonicalRole, RoleResolutionError> {
        self.resolve(role.reference()).await
    }
}

fn project_rules(version: ApiVersion, payload: RolePayload) -> Result<Vec<Rule>, AppError> {
    let rules = match payload {
        RolePayload::V1(role) if version == ApiVersion::V1 => role
            .rules
            .into_iter()
            .map(|rule| Rule {
                verbs: rule.verbs,
                resources: rule.resources,
            })
            .collect(),
        RolePayload::V1Alpha1(role) if version == ApiVersion::V1Alpha1 => role
            .rules
            .into_iter()
            .map(|rule| Rule {
                verbs: rule.verbs,
                resources: rule.resources,
            })
            .collect(),
        RolePayload::V1Beta1(role) if version == ApiVersion::V1Beta1 => role
            .rules
            .into_iter()
            .map(|rule| Rule {
                verbs: rule.verbs,
                resources: rule.resources,
            })
            .collect(),
        other => {
            return Err(AppError::Conversion(format!(
                "{version}: backend returned a {} cluster role",
                other.version()
            )));
        }
    };

    Ok(rules)
}
