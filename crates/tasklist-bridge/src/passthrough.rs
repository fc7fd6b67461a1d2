//! Forwarding of proxied requests to the backend.
//!
//! The backend sees the caller's method, query string, body and content
//! type, plus `Authorization: Bearer <access token>` taken from the session.
//! Its status, content type and body come back verbatim.

use axum::{
    body::{Body, Bytes},
    http::{HeaderMap, HeaderValue, Method, StatusCode, header},
    response::Response,
};
use reqwest::Client;
use tracing::debug;

use crate::error::{BridgeError, Result};

/// Route prefix the bridge serves proxied requests under.
pub const PROXY_PREFIX: &str = "/api/proxy/";

/// The still-encoded backend path for a request URI path under
/// [`PROXY_PREFIX`].
///
/// Segments that decode to `.` or `..`, or that hide a slash or backslash
/// behind percent-encoding, are rejected so the request cannot leave `/api/`.
pub fn proxied_path(uri_path: &str) -> Result<&str> {
    let path = uri_path
        .strip_prefix(PROXY_PREFIX)
        .ok_or_else(|| BridgeError::BadRequest(format!("not a proxy path: {}", uri_path)))?;

    for segment in path.split('/') {
        let decoded = urlencoding::decode(segment)
            .map_err(|_| BridgeError::BadRequest("path is not valid UTF-8".to_string()))?;
        if decoded == "." || decoded == ".." || decoded.contains(['/', '\\']) {
            return Err(BridgeError::BadRequest(format!(
                "path segment not allowed: {}",
                segment
            )));
        }
    }

    Ok(path)
}

/// Forwards requests to `{backend_url}/api/{path}`.
#[derive(Debug, Clone)]
pub struct Passthrough {
    client: Client,
    backend_url: String,
}

impl Passthrough {
    pub fn new(client: Client, backend_url: impl Into<String>) -> Self {
        Self {
            client,
            backend_url: backend_url.into(),
        }
    }

    pub fn backend_url(&self) -> &str {
        &self.backend_url
    }

    /// Backend URL for a proxied path, keeping the original query string.
    ///
    /// `path` is used as given; percent-encoding is not undone.
    pub fn target_url(&self, path: &str, query: Option<&str>) -> String {
        let mut url = format!(
            "{}/api/{}",
            self.backend_url.trim_end_matches('/'),
            path.trim_start_matches('/')
        );
        if let Some(query) = query.filter(|q| !q.is_empty()) {
            url.push('?');
            url.push_str(query);
        }
        url
    }

    /// Forward one request and convert the backend's answer into a response.
    pub async fn forward(
        &self,
        method: Method,
        path: &str,
        query: Option<&str>,
        headers: &HeaderMap,
        body: Bytes,
        access_token: &str,
    ) -> Result<Response> {
        let url = self.target_url(path, query);
        let has_body = !matches!(method, Method::GET | Method::HEAD);

        let mut request = self
            .client
            .request(method.clone(), &url)
            .bearer_auth(access_token);

        if has_body {
            if let Some(content_type) = headers.get(header::CONTENT_TYPE) {
                request = request.header(header::CONTENT_TYPE, content_type.clone());
            }
            request = request.body(body);
        }

        let upstream = request
            .send()
            .await
            .map_err(|e| BridgeError::ProxyRequestFailed(format!("{} {}: {}", method, url, e)))?;

        let status = upstream.status();
        debug!(%method, url = %url, status = status.as_u16(), "Backend responded");

        if status == StatusCode::NO_CONTENT {
            return empty_response(status);
        }

        let content_type = upstream.headers().get(header::CONTENT_TYPE).cloned();
        let bytes = upstream.bytes().await.map_err(|e| {
            BridgeError::ProxyRequestFailed(format!("Failed to read backend response: {}", e))
        })?;

        build_response(status, content_type, Body::from(bytes))
    }
}

fn empty_response(status: StatusCode) -> Result<Response> {
    build_response(status, None, Body::empty())
}

fn build_response(
    status: StatusCode,
    content_type: Option<HeaderValue>,
    body: Body,
) -> Result<Response> {
    let mut builder = Response::builder().status(status);
    if let Some(content_type) = content_type {
        builder = builder.header(header::CONTENT_TYPE, content_type);
    }
    builder
        .body(body)
        .map_err(|e| BridgeError::Internal(format!("Failed to build response: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_target_url() {
        let p = Passthrough::new(Client::new(), "http://backend:8080/");
        assert_eq!(p.target_url("tasks", None), "http://backend:8080/api/tasks");
        assert_eq!(
            p.target_url("tasks/7", Some("a=1&b=2")),
            "http://backend:8080/api/tasks/7?a=1&b=2"
        );
        assert_eq!(p.target_url("/tasks", Some("")), "http://backend:8080/api/tasks");
        assert_eq!(
            p.target_url("tasks%3Fx%3D1", None),
            "http://backend:8080/api/tasks%3Fx%3D1"
        );
    }

    #[test]
    fn test_proxied_path_keeps_encoding() {
        assert_eq!(proxied_path("/api/proxy/tasks").unwrap(), "tasks");
        assert_eq!(proxied_path("/api/proxy/tasks/7").unwrap(), "tasks/7");
        assert_eq!(
            proxied_path("/api/proxy/tasks%3Fx%3D1").unwrap(),
            "tasks%3Fx%3D1"
        );
    }

    #[test]
    fn test_proxied_path_rejects_traversal() {
        for path in [
            "/api/proxy/..",
            "/api/proxy/../admin",
            "/api/proxy/tasks/./x",
            "/api/proxy/..%2Fadmin%2Fsecret",
            "/api/proxy/%2E%2E/admin",
            "/api/proxy/%2e",
            "/api/proxy/tasks%5C..%5Cadmin",
            "/api/proxy/%FF",
            "/other/tasks",
        ] {
            assert!(
                matches!(proxied_path(path), Err(BridgeError::BadRequest(_))),
                "{path} should be rejected"
            );
        }
    }
}
