//! Health API.

use serde::{Deserialize, Serialize};

use crate::client::TasklistClient;
use crate::error::Result;

/// Health check response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    /// Store backend name (backend only; the bridge leaves it out).
    #[serde(default)]
    pub store: Option<String>,
}

/// Health API client.
///
/// The health endpoint sits at the root and needs no credential.
pub struct HealthApi {
    client: TasklistClient,
}

impl HealthApi {
    pub(crate) fn new(client: TasklistClient) -> Self {
        Self { client }
    }

    /// Check basic health.
    pub async fn check(&self) -> Result<HealthResponse> {
        let inner = self.client.inner();
        let url = inner.base_url.join("health")?;

        let response = inner.http.get(url).timeout(inner.timeout).send().await?;

        if response.status().is_success() {
            Ok(response.json().await?)
        } else {
            Err(TasklistClient::extract_error(response).await)
        }
    }

    /// Simple connectivity check.
    pub async fn is_healthy(&self) -> bool {
        self.check().await.is_ok()
    }
}
