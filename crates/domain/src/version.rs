use std::fmt::{Display, Formatter};
use std::str::FromStr;

use rbac_inspector_core::AppError;
use serde::{Deserialize, Serialize};

/// API group shared by every supported binding revision.
pub const RBAC_API_GROUP: &str = "rbac.authorization.k8s.io";

/// Supported schema revisions of the cluster role binding resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ApiVersion {
    /// Stable revision.
    V1,
    /// Alpha revision.
    V1Alpha1,
    /// Beta revision.
    V1Beta1,
}

impl ApiVersion {
    /// Returns the stable version segment used in resource paths.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::V1 => "v1",
            Self::V1Alpha1 => "v1alpha1",
            Self::V1Beta1 => "v1beta1",
        }
    }

    /// Returns the `group/version` value carried in object `apiVersion` fields.
    #[must_use]
    pub fn group_version(&self) -> &'static str {
        match self {
            Self::V1 => "rbac.authorization.k8s.io/v1",
            Self::V1Alpha1 => "rbac.authorization.k8s.io/v1alpha1",
            Self::V1Beta1 => "rbac.authorization.k8s.io/v1beta1",
        }
    }

    /// Returns all known revisions.
    #[must_use]
    pub fn all() -> &'static [Self] {
        const ALL: &[ApiVersion] = &[ApiVersion::V1, ApiVersion::V1Alpha1, ApiVersion::V1Beta1];

        ALL
    }

    /// Resolves a revision from an object `apiVersion` value.
    #[must_use]
    pub fn from_group_version(value: &str) -> Option<Self> {
        Self::all()
            .iter()
            .copied()
            .find(|version| version.group_version() == value)
    }
}

impl Display for ApiVersion {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> std::fmt::Result {
        formatter.write_str(self.as_str())
    }
}

impl FromStr for ApiVersion {
    type Err = AppError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "v1" => Ok(Self::V1),
            "v1alpha1" => Ok(Self::V1Alpha1),
            "v1beta1" => Ok(Self::V1Beta1),
            _ => Err(AppError::UnsupportedVersion(format!(
                "version {value} is not supported"
            ))),
        }
    }
}
