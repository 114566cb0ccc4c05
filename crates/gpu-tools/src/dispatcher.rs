//! Authenticated request dispatch against the provider API.
//!
//! One call = one outbound request. There is no retry and no backoff; failures are logged once here
//! and returned to the caller.

use crate::error::{Result, ToolsError};
use crate::safety::redact_url;
use mime::Mime;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE, HeaderValue};
use reqwest::{Client, Method, Request};
use serde_json::{Value, json};
use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, error, warn};
use url::Url;

/// Production API endpoint.
pub const DEFAULT_BASE_URL: &str = "https://api.novita.ai/gpu-instance/openapi/v1";

/// Bearer credential for the provider API.
///
/// `Debug` never prints the secret.
#[derive(Clone, PartialEq, Eq)]
pub struct ApiKey(String);

impl ApiKey {
    /// Wrap a non-empty key.
    ///
    /// # Errors
    ///
    /// Returns a config error if the key is empty or whitespace only.
    pub fn new(key: impl Into<String>) -> Result<Self> {
        let key = key.into();
        if key.trim().is_empty() {
            return Err(ToolsError::Config("API key must not be empty".to_string()));
        }
        Ok(Self(key))
    }

    #[must_use]
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for ApiKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ApiKey(***)")
    }
}

/// Sends requests to the provider API.
///
/// Immutable after construction and cheap to clone.
#[derive(Clone)]
pub struct Dispatcher {
    inner: Arc<DispatcherInner>,
}

struct DispatcherInner {
    client: Client,
    base_url: String,
    api_key: ApiKey,
    timeout: Option<Duration>,
}

impl fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Dispatcher")
            .field("base_url", &self.inner.base_url)
            .field("api_key", &self.inner.api_key)
            .field("timeout", &self.inner.timeout)
            .finish_non_exhaustive()
    }
}

impl Dispatcher {
    /// Build a dispatcher for `base_url`.
    ///
    /// `timeout` applies per request; `None` leaves the transport default in place.
    ///
    /// # Errors
    ///
    /// Returns a config error if the base URL is not an absolute `http(s)` URL or the HTTP client
    /// cannot be built.
    pub fn new(
        base_url: impl Into<String>,
        api_key: ApiKey,
        timeout: Option<Duration>,
    ) -> Result<Self> {
        let base_url = base_url.into();
        let parsed = Url::parse(&base_url)
            .map_err(|e| ToolsError::Config(format!("Invalid base URL '{base_url}': {e}")))?;
        if parsed.scheme() != "http" && parsed.scheme() != "https" {
            return Err(ToolsError::Config(format!(
                "Invalid base URL '{base_url}': unsupported scheme '{}'",
                parsed.scheme()
            )));
        }

        let client = Client::builder()
            .build()
            .map_err(|e| ToolsError::Config(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            inner: Arc::new(DispatcherInner {
                client,
                base_url: base_url.trim_end_matches('/').to_string(),
                api_key,
                timeout,
            }),
        })
    }

    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.inner.base_url
    }

    /// Send one request and return the response payload.
    ///
    /// `path` is appended to the base URL verbatim and may carry an already-encoded query string.
    /// `body` is only sent for `POST` and `PATCH`.
    ///
    /// On success the JSON body is returned when the response declares a JSON content type,
    /// otherwise `{"success": true, "status": <code>}`.
    ///
    /// # Errors
    ///
    /// - [`ToolsError::Remote`] if the API answers with a non-success status
    /// - [`ToolsError::Transport`] if the request cannot be completed
    /// - [`ToolsError::InvalidResponse`] if a JSON response body does not parse
    pub async fn dispatch(&self, path: &str, method: Method, body: Option<&Value>) -> Result<Value> {
        let request = self.build_request(path, method, body)?;
        let method = request.method().clone();
        let redacted = redact_url(request.url());
        let started = Instant::now();

        debug!(%method, url = %redacted, "dispatching request");

        let response = match self.inner.client.execute(request).await {
            Ok(r) => r,
            Err(e) => {
                let err = ToolsError::from(e);
                error!(%method, url = %redacted, error = %err, "error calling Novita AI API");
                return Err(err);
            }
        };

        let status = response.status();
        let elapsed_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);

        if !status.is_success() {
            let body = error_body(response.text().await);
            let err = ToolsError::Remote {
                status: status.as_u16(),
                body,
            };
            warn!(
                %method,
                url = %redacted,
                status = status.as_u16(),
                elapsed_ms,
                error = %err,
                "API returned an error status"
            );
            return Err(err);
        }

        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);

        debug!(
            %method,
            url = %redacted,
            status = status.as_u16(),
            elapsed_ms,
            "request completed"
        );

        if !is_json_content_type(content_type.as_deref()) {
            return Ok(json!({ "success": true, "status": status.as_u16() }));
        }

        let bytes = match response.bytes().await {
            Ok(b) => b,
            Err(e) => {
                let err = ToolsError::from(e);
                error!(%method, url = %redacted, error = %err, "failed to read response body");
                return Err(err);
            }
        };

        serde_json::from_slice(&bytes).map_err(|e| {
            let err = ToolsError::InvalidResponse(format!("response body is not valid JSON: {e}"));
            error!(%method, url = %redacted, error = %err, "failed to decode response body");
            err
        })
    }

    /// Build the outbound request without sending it.
    fn build_request(&self, path: &str, method: Method, body: Option<&Value>) -> Result<Request> {
        let url = format!("{}{}", self.inner.base_url, path);
        let url = Url::parse(&url)
            .map_err(|e| ToolsError::Config(format!("Invalid request URL for '{path}': {e}")))?;

        let mut auth = HeaderValue::from_str(&format!("Bearer {}", self.inner.api_key.expose()))
            .map_err(|_| {
                ToolsError::Config("API key contains characters not allowed in a header".to_string())
            })?;
        auth.set_sensitive(true);

        let carries_body = method == Method::POST || method == Method::PATCH;
        let mut request = self
            .inner
            .client
            .request(method, url)
            .header(AUTHORIZATION, auth)
            .header(CONTENT_TYPE, "application/json");

        if carries_body && let Some(body) = body {
            request = request.body(serde_json::to_vec(body).map_err(|e| {
                ToolsError::Config(format!("failed to serialize request body: {e}"))
            })?);
        }

        if let Some(t) = self.inner.timeout {
            request = request.timeout(t);
        }

        Ok(request.build()?)
    }
}

/// Text of a non-success response. A failed read is kept visible in the error body.
fn error_body(read: reqwest::Result<String>) -> String {
    match read {
        Ok(body) => body,
        Err(e) => {
            let err = ToolsError::from(e);
            warn!(error = %err, "failed to read error response body");
            format!("<unreadable body: {err}>")
        }
    }
}

fn is_json_content_type(content_type: Option<&str>) -> bool {
    let Some(ct) = content_type else {
        return false;
    };
    let Ok(m) = ct.parse::<Mime>() else {
        return ct.contains("application/json");
    };
    m.type_() == mime::APPLICATION && (m.subtype() == mime::JSON || m.suffix() == Some(mime::JSON))
}
