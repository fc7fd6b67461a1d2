//! Main client implementation.

use std::sync::Arc;
use std::time::Duration;

use reqwest::header::{AUTHORIZATION, COOKIE, HeaderMap, HeaderValue};
use tracing::debug;
use url::Url;

use crate::api::{HealthApi, TasksApi};
use crate::error::{Error, ErrorResponse, Result};

/// Default timeout for requests.
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Path prefix for the backend's own API.
pub const DIRECT_PREFIX: &str = "api/";

/// Path prefix for the session bridge's forwarding route.
pub const BRIDGE_PREFIX: &str = "api/proxy/";

/// tasklist API client.
///
/// Talks either to the backend directly with a bearer token, or to the
/// session bridge with a session cookie.
///
/// # Example
///
/// ```no_run
/// use tasklist_client::TasklistClient;
///
/// # async fn example() -> tasklist_client::Result<()> {
/// let client = TasklistClient::builder()
///     .base_url("http://localhost:8080")
///     .bearer_token("eyJ...")
///     .build()?;
///
/// let task = client.tasks().create("buy milk").await?;
/// for task in client.tasks().list().await? {
///     println!("{} {}", task.id, task.text);
/// }
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct TasklistClient {
    inner: Arc<ClientInner>,
}

pub(crate) struct ClientInner {
    pub(crate) http: reqwest::Client,
    pub(crate) base_url: Url,
    pub(crate) prefix: &'static str,
    pub(crate) timeout: Duration,
}

impl std::fmt::Debug for TasklistClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TasklistClient")
            .field("base_url", &self.inner.base_url.as_str())
            .field("prefix", &self.inner.prefix)
            .finish_non_exhaustive()
    }
}

impl TasklistClient {
    /// Create a new client builder.
    pub fn builder() -> ClientBuilder {
        ClientBuilder::new()
    }

    pub fn base_url(&self) -> &Url {
        &self.inner.base_url
    }

    /// Whether requests go through the session bridge.
    pub fn via_bridge(&self) -> bool {
        self.inner.prefix == BRIDGE_PREFIX
    }

    pub(crate) fn inner(&self) -> &ClientInner {
        &self.inner
    }

    /// Access the tasks API.
    pub fn tasks(&self) -> TasksApi {
        TasksApi::new(self.clone())
    }

    /// Access the health API.
    pub fn health(&self) -> HealthApi {
        HealthApi::new(self.clone())
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Internal HTTP methods
    // ─────────────────────────────────────────────────────────────────────────

    /// Build a URL for an API path.
    pub(crate) fn url(&self, path: &str) -> Result<Url> {
        let path = path.trim_start_matches('/');
        self.inner
            .base_url
            .join(&format!("{}{}", self.inner.prefix, path))
            .map_err(Error::from)
    }

    pub(crate) async fn get<T: serde::de::DeserializeOwned>(&self, path: &str) -> Result<T> {
        let response = self.send(self.inner.http.get(self.url(path)?)).await?;
        self.handle_response(response).await
    }

    pub(crate) async fn post<T, B>(&self, path: &str, body: &B) -> Result<T>
    where
        T: serde::de::DeserializeOwned,
        B: serde::Serialize + ?Sized,
    {
        let request = self.inner.http.post(self.url(path)?).json(body);
        let response = self.send(request).await?;
        self.handle_response(response).await
    }

    pub(crate) async fn patch<T, B>(&self, path: &str, body: &B) -> Result<T>
    where
        T: serde::de::DeserializeOwned,
        B: serde::Serialize + ?Sized,
    {
        let request = self.inner.http.patch(self.url(path)?).json(body);
        let response = self.send(request).await?;
        self.handle_response(response).await
    }

    pub(crate) async fn delete(&self, path: &str) -> Result<()> {
        let response = self.send(self.inner.http.delete(self.url(path)?)).await?;

        if !response.status().is_success() {
            return Err(Self::extract_error(response).await);
        }

        Ok(())
    }

    /// Send with the client timeout. Credentials sit in default headers, so
    /// they never appear in the logged request.
    async fn send(&self, request: reqwest::RequestBuilder) -> Result<reqwest::Response> {
        let request = request.timeout(self.inner.timeout).build()?;
        let method = request.method().clone();
        let path = request.url().path().to_string();
        debug!(%method, %path, "sending request");

        let response = self.inner.http.execute(request).await.inspect_err(|e| {
            debug!(%method, %path, error = %e, "request failed");
        })?;
        debug!(%method, %path, status = response.status().as_u16(), "response received");
        Ok(response)
    }

    async fn handle_response<T: serde::de::DeserializeOwned>(
        &self,
        response: reqwest::Response,
    ) -> Result<T> {
        if response.status().is_success() {
            Ok(response.json().await?)
        } else {
            Err(Self::extract_error(response).await)
        }
    }

    /// Decode a failed response into [`Error::Api`].
    pub(crate) async fn extract_error(response: reqwest::Response) -> Error {
        let status = response.status().as_u16();

        match response.json::<ErrorResponse>().await {
            Ok(err) => Error::Api {
                status,
                code: err.code,
                message: err.message,
            },
            Err(_) => Error::Api {
                status,
                code: "unknown".to_string(),
                message: format!("HTTP {}", status),
            },
        }
    }
}

/// How requests are authenticated.
#[derive(Debug, Clone)]
enum Credential {
    Bearer(String),
    Cookie { name: String, value: String },
}

/// Builder for creating a [`TasklistClient`].
#[derive(Debug)]
pub struct ClientBuilder {
    base_url: Option<String>,
    credential: Option<Credential>,
    timeout: Duration,
    user_agent: Option<String>,
}

impl ClientBuilder {
    pub fn new() -> Self {
        Self {
            base_url: None,
            credential: None,
            timeout: DEFAULT_TIMEOUT,
            user_agent: None,
        }
    }

    /// Set the base URL of the backend or bridge.
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = Some(url.into());
        self
    }

    /// Call the backend directly with a bearer token.
    pub fn bearer_token(mut self, token: impl Into<String>) -> Self {
        self.credential = Some(Credential::Bearer(token.into()));
        self
    }

    /// Call through the session bridge with a session cookie.
    pub fn session_cookie(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.credential = Some(Credential::Cookie {
            name: name.into(),
            value: value.into(),
        });
        self
    }

    /// Set the request timeout.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set a custom user agent.
    pub fn user_agent(mut self, agent: impl Into<String>) -> Self {
        self.user_agent = Some(agent.into());
        self
    }

    /// Build the client.
    pub fn build(self) -> Result<TasklistClient> {
        let base_url = self
            .base_url
            .ok_or_else(|| Error::Config("base_url is required".to_string()))?;

        let mut base_url = Url::parse(&base_url)?;
        if !base_url.path().ends_with('/') {
            base_url.set_path(&format!("{}/", base_url.path()));
        }

        let mut headers = HeaderMap::new();
        let prefix = match &self.credential {
            Some(Credential::Bearer(token)) => {
                let value = HeaderValue::from_str(&format!("Bearer {}", token))
                    .map_err(|_| Error::Config("Invalid bearer token".to_string()))?;
                headers.insert(AUTHORIZATION, value);
                DIRECT_PREFIX
            }
            Some(Credential::Cookie { name, value }) => {
                let value = HeaderValue::from_str(&format!("{}={}", name, value))
                    .map_err(|_| Error::Config("Invalid session cookie".to_string()))?;
                headers.insert(COOKIE, value);
                BRIDGE_PREFIX
            }
            None => DIRECT_PREFIX,
        };

        let user_agent = self
            .user_agent
            .unwrap_or_else(|| format!("tasklist-client/{}", env!("CARGO_PKG_VERSION")));

        let http = reqwest::Client::builder()
            .default_headers(headers)
            .user_agent(user_agent)
            .build()?;

        Ok(TasklistClient {
            inner: Arc::new(ClientInner {
                http,
                base_url,
                prefix,
                timeout: self.timeout,
            }),
        })
    }
}

impl Default for ClientBuilder {
    fn default() -> Self {
        Self::new()
    }
}
