use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use rbac_inspector_application::{RbacApi, StopHandle, WatchSubscription};
use rbac_inspector_core::{AppError, AppResult};
use rbac_inspector_domain::native::ApiStatus;
use rbac_inspector_domain::{
    ApiVersion, BindingListPayload, RBAC_API_GROUP, RawWatchEvent, RolePayload,
};
use reqwest::StatusCode;
use serde_json::Value;
use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::watch_line_decoder::{WatchLineDecoder, decode_watch_frame};

const WATCH_CHANNEL_CAPACITY: usize = 16;

/// HTTP implementation of the RBAC API port for one revision.
#[derive(Clone)]
pub struct KubernetesRbacApi {
    http_client: reqwest::Client,
    base_url: String,
    token: Arc<str>,
    version: ApiVersion,
    request_timeout: Duration,
}

impl KubernetesRbacApi {
    /// Creates a revision handle rooted at the RBAC group path of `host`.
    #[must_use]
    pub fn new(
        http_client: reqwest::Client,
        host: &str,
        token: Arc<str>,
        version: ApiVersion,
        request_timeout: Duration,
    ) -> Self {
        Self {
            http_client,
            base_url: resource_base_url(host, version),
            token,
            version,
            request_timeout,
        }
    }

    async fn get_json(&self, url: String) -> AppResult<Value> {
        let response = self
            .http_client
            .get(url.as_str())
            .bearer_auth(&*self.token)
            .timeout(self.request_timeout)
            .send()
            .await
            .map_err(|error| AppError::Connection(format!("request to {url} failed: {error}")))?;
        let response = ensure_success(response).await?;

        response.json::<Value>().await.map_err(|error| {
            AppError::Connection(format!("failed to read response body from {url}: {error}"))
        })
    }
}

#[async_trait]
impl RbacApi for KubernetesRbacApi {
    fn version(&self) -> ApiVersion {
        self.version
    }

    async fn watch_cluster_role_bindings(&self) -> AppResult<WatchSubscription> {
        let url = format!("{}/clusterrolebindings?watch=true", self.base_url);
        let response = self
            .http_client
            .get(url.as_str())
            .bearer_auth(&*self.token)
            .send()
            .await
            .map_err(|error| AppError::Connection(format!("watch {url} failed: {error}")))?;
        let response = ensure_success(response).await?;

        let (sender, receiver) = mpsc::channel(WATCH_CHANNEL_CAPACITY);
        let producer = tokio::spawn(forward_watch_frames(self.version, response, sender));

        Ok(WatchSubscription::new(
            receiver,
            StopHandle::new(move || producer.abort()),
        ))
    }

    async fn list_cluster_role_bindings(&self) -> AppResult<BindingListPayload> {
        let body = self
            .get_json(format!("{}/clusterrolebindings", self.base_url))
            .await?;

        BindingListPayload::decode(self.version, body)
    }

    async fn get_cluster_role(&self, name: &str) -> AppResult<RolePayload> {
        if name.trim().is_empty() || name.contains('/') {
            return Err(AppError::Validation(format!(
                "invalid cluster role name '{name}'"
            )));
        }

        let body = self
            .get_json(format!("{}/clusterroles/{name}", self.base_url))
            .await?;

        RolePayload::decode(self.version, body)
    }
}

fn resource_base_url(host: &str, version: ApiVersion) -> String {
    format!(
        "{}/apis/{RBAC_API_GROUP}/{}",
        host.trim_end_matches('/'),
        version.as_str()
    )
}

async fn ensure_success(response: reqwest::Response) -> AppResult<reqwest::Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let url = response.url().to_string();
    let body = response
        .text()
        .await
        .unwrap_or_else(|_| "<body unavailable>".to_owned());
    let message = serde_json::from_str::<ApiStatus>(body.as_str())
        .ok()
        .filter(|status| !status.message.is_empty())
        .map_or(body, |status| status.message);

    if status == StatusCode::NOT_FOUND {
        return Err(AppError::NotFound(format!("{url}: {message}")));
    }

    Err(AppError::Connection(format!(
        "{url} returned status {}: {message}",
        status.as_u16()
    )))
}

async fn forward_watch_frames(
    version: ApiVersion,
    mut response: reqwest::Response,
    sender: mpsc::Sender<RawWatchEvent>,
) {
    let mut decoder = WatchLineDecoder::new();
    loop {
        let chunk = match response.chunk().await {
            Ok(chunk) => chunk,
            Err(error) => {
                warn!(version = %version, error = %error, "watch stream failed");
                return;
            }
        };

        let end_of_stream = chunk.is_none();
        if !forward_chunk(version, &mut decoder, chunk.as_deref(), &sender).await {
            return;
        }
        if end_of_stream {
            debug!(version = %version, "watch stream closed by server");
            return;
        }
    }
}

/// Forwards the frames completed by `chunk`; `None` marks the end of the body
/// and flushes an unterminated trailing frame.
///
/// Returns false once the subscriber is gone.
async fn forward_chunk(
    version: ApiVersion,
    decoder: &mut WatchLineDecoder,
    chunk: Option<&[u8]>,
    sender: &mpsc::Sender<RawWatchEvent>,
) -> bool {
    let lines = match chunk {
        Some(chunk) => decoder.push(chunk),
        None => decoder.finish().into_iter().collect(),
    };

    for line in lines {
        match decode_watch_frame(line.as_str()) {
            Ok(event) => {
                if sender.send(event).await.is_err() {
                    return false;
                }
            }
            Err(error) => {
                warn!(version = %version, error = %error, "dropped undecodable watch frame");
            }
        }
    }

    true
}
