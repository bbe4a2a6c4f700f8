// src/infrastructure/http.rs
use crate::domain::DomainError;
use reqwest::header::{HeaderMap, AUTHORIZATION};
use reqwest::{Client, Method, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use std::sync::{Arc, RwLock};
use std::time::Duration;
use tracing::{debug, error, trace};

/// Per-request timeout unless configured otherwise.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Shared outgoing HTTP client.
///
/// Attaches the bearer token when one is set, applies the timeout, and logs
/// every failed call before turning it into a [`DomainError`].
#[derive(Clone, Debug)]
pub struct HttpClient {
    client: Client,
    base_url: String,
    token: Arc<RwLock<Option<String>>>,
}

impl HttpClient {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, DomainError> {
        Self::with_headers(base_url, timeout, HeaderMap::new())
    }

    /// `headers` are sent with every request.
    pub fn with_headers(
        base_url: &str,
        timeout: Duration,
        headers: HeaderMap,
    ) -> Result<Self, DomainError> {
        let client = Client::builder()
            .timeout(timeout)
            .default_headers(headers)
            .build()
            .map_err(|e| DomainError::Network {
                operation: "build_client".to_string(),
                message: e.to_string(),
            })?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            token: Arc::new(RwLock::new(None)),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Token issued by the identity provider; `None` signs out.
    pub fn set_token(&self, token: Option<String>) {
        let mut slot = self
            .token
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        *slot = token;
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    pub fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let builder = self.client.request(method, self.url(path));
        let token = self
            .token
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone();
        match token {
            Some(token) => builder.header(AUTHORIZATION, format!("Bearer {token}")),
            None => builder,
        }
    }

    /// Send and decode a JSON body; any non-2xx status is an error.
    pub async fn send_json<T: DeserializeOwned>(
        &self,
        operation: &str,
        request: RequestBuilder,
    ) -> Result<T, DomainError> {
        let response = self.send(operation, request).await?;
        let status = response.status();
        if !status.is_success() {
            return Err(self.status_error(operation, response).await);
        }
        decode(operation, response).await
    }

    /// Like [`send_json`](Self::send_json) but a 404 becomes `Ok(None)`.
    pub async fn send_optional_json<T: DeserializeOwned>(
        &self,
        operation: &str,
        request: RequestBuilder,
    ) -> Result<Option<T>, DomainError> {
        let response = self.send(operation, request).await?;
        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            debug!(operation, "Resource not found");
            return Ok(None);
        }
        if !status.is_success() {
            return Err(self.status_error(operation, response).await);
        }
        decode(operation, response).await.map(Some)
    }

    async fn send(&self, operation: &str, request: RequestBuilder) -> Result<Response, DomainError> {
        trace!(operation, "Sending request");
        request.send().await.map_err(|e| {
            let err = transport_error(operation, &e);
            error!(operation, status = ?e.status().map(|s| s.as_u16()), error = %e, "HTTP request failed");
            err
        })
    }

    async fn status_error(&self, operation: &str, response: Response) -> DomainError {
        let status = response.status().as_u16();
        let body = response.text().await.unwrap_or_default();
        let message = error_message(&body).unwrap_or_else(|| format!("HTTP {status}"));
        error!(operation, status, message = %message, "HTTP request failed");
        DomainError::backend(operation, Some(status), message)
    }
}

async fn decode<T: DeserializeOwned>(operation: &str, response: Response) -> Result<T, DomainError> {
    let status = response.status().as_u16();
    response.json::<T>().await.map_err(|e| {
        error!(operation, status, error = %e, "Failed to decode response body");
        DomainError::backend(operation, Some(status), format!("invalid response body: {e}"))
    })
}

fn transport_error(operation: &str, e: &reqwest::Error) -> DomainError {
    if e.is_timeout() {
        DomainError::Timeout {
            operation: operation.to_string(),
        }
    } else {
        DomainError::Network {
            operation: operation.to_string(),
            message: e.to_string(),
        }
    }
}

/// Pull a human-readable message out of an error body.
///
/// The custom backend answers `{code, message}`; PostgREST answers
/// `{message, details, hint, code}`.
fn error_message(body: &str) -> Option<String> {
    let value: serde_json::Value = serde_json::from_str(body).ok()?;
    value
        .get("message")
        .and_then(|m| m.as_str())
        .map(str::to_string)
}
