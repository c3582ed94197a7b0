//! Connection bootstrap for the Kubernetes RBAC API.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use rbac_inspector_application::{RbacApi, RbacApis};
use rbac_inspector_core::{AppError, AppResult};
use rbac_inspector_domain::ApiVersion;
use tracing::info;

use crate::KubernetesRbacApi;

/// Settings needed to reach one API server.
#[derive(Debug, Clone)]
pub struct KubernetesConnectionConfig {
    /// API server base URL, e.g. `https://10.0.0.1:6443`.
    pub host: String,
    /// File holding the bearer token.
    pub token_file: PathBuf,
    /// Skips server certificate verification.
    pub insecure_skip_tls_verify: bool,
    /// Bound on connection establishment, including watch opens.
    pub connect_timeout: Duration,
    /// Bound on one-shot list and get requests.
    pub request_timeout: Duration,
}

/// Authenticated HTTP connection shared by every revision handle.
#[derive(Clone)]
pub struct KubernetesConnection {
    http_client: reqwest::Client,
    host: String,
    token: Arc<str>,
    request_timeout: Duration,
}

impl KubernetesConnection {
    /// Reads the token file and builds the shared HTTP client.
    pub async fn connect(config: &KubernetesConnectionConfig) -> AppResult<Self> {
        let host = normalize_host(config.host.as_str())?;
        let token = tokio::fs::read_to_string(&config.token_file)
            .await
            .map_err(|error| {
                AppError::Validation(format!(
                    "failed to read token file '{}': {error}",
                    config.token_file.display()
                ))
            })?;
        let token = token.trim();
        if token.is_empty() {
            return Err(AppError::Validation(format!(
                "token file '{}' is empty",
                config.token_file.display()
            )));
        }

        let http_client = reqwest::Client::builder()
            .connect_timeout(config.connect_timeout)
            .danger_accept_invalid_certs(config.insecure_skip_tls_verify)
            .build()
            .map_err(|error| {
                AppError::Internal(format!("failed to build HTTP client: {error}"))
            })?;

        info!(
            host = %host,
            insecure_skip_tls_verify = config.insecure_skip_tls_verify,
            "connected to kubernetes api"
        );

        Ok(Self {
            http_client,
            host,
            token: Arc::from(token),
            request_timeout: config.request_timeout,
        })
    }

    /// Returns the handle serving one revision.
    #[must_use]
    pub fn api(&self, version: ApiVersion) -> KubernetesRbacApi {
        KubernetesRbacApi::new(
            self.http_client.clone(),
            self.host.as_str(),
            Arc::clone(&self.token),
            version,
            self.request_timeout,
        )
    }

    /// Returns handles for all three revisions.
    pub fn apis(&self) -> AppResult<RbacApis> {
        RbacApis::new(
            Arc::new(self.api(ApiVersion::V1)) as Arc<dyn RbacApi>,
            Arc::new(self.api(ApiVersion::V1Alpha1)) as Arc<dyn RbacApi>,
            Arc::new(self.api(ApiVersion::V1Beta1)) as Arc<dyn RbacApi>,
        )
    }
}

fn normalize_host(host: &str) -> AppResult<String> {
    let host = host.trim().trim_end_matches('/');
    if !(host.starts_with("https://") || host.starts_with("http://")) {
        return Err(AppError::Validation(format!(
            "kubernetes host '{host}' must start with http:// or https://"
        )));
    }

    Ok(host.to_owned())
}
