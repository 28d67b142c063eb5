//! Detector clients.
//!
//! The guardrail only depends on [`DetectorClient`]; [`HttpDetectorClient`]
//! is the production implementation for HTTP detectors with bearer auth.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use serde_json::Value;
use tracing::{debug, error, trace};
use url::Url;

use crate::errors::DetectorError;
use crate::protocol::{DetectorRequest, DetectorVerdict, DEFAULT_API_BASE, DEFAULT_ENDPOINT};

/// Capability to submit ordered turns to a detector and receive its verdict.
#[async_trait]
pub trait DetectorClient: Send + Sync {
    /// Identifier of the detector, used in logs
    fn id(&self) -> &str;

    /// Submit a request and wait for the verdict.
    async fn submit(&self, request: &DetectorRequest) -> Result<DetectorVerdict, DetectorError>;
}

/// HTTP detector client
pub struct HttpDetectorClient {
    /// Detector ID
    id: String,
    /// Full endpoint URL
    url: Url,
    /// Bearer token, if the detector requires one
    api_key: Option<String>,
    /// Shared connection pool
    http: reqwest::Client,
    /// Timeout for a single call
    timeout: Duration,
}

impl HttpDetectorClient {
    /// Create a new HTTP detector client
    ///
    /// # Arguments
    /// * `id` - Detector identifier
    /// * `api_base` - Base URL (e.g., "https://api.lakera.ai")
    /// * `endpoint` - Path appended to the base (e.g., "/v1/prompt_injection")
    /// * `timeout` - Timeout for detector calls
    ///
    /// Fails with [`DetectorError::Configuration`] when the base is not an
    /// http(s) URL with a host.
    pub fn new(
        id: impl Into<String>,
        api_base: &str,
        endpoint: &str,
        timeout: Duration,
    ) -> Result<Self, DetectorError> {
        let id = id.into();
        let url = endpoint_url(api_base, endpoint)?;

        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| {
                error!(
                    detector = %id,
                    error = %e,
                    "Failed to build detector HTTP client"
                );
                DetectorError::Configuration(e.to_string())
            })?;

        debug!(
            detector = %id,
            url = %url,
            timeout_ms = timeout.as_millis() as u64,
            "Created HTTP detector client"
        );

        Ok(Self {
            id,
            url,
            api_key: None,
            http,
            timeout,
        })
    }

    /// Client for the default Lakera endpoint
    pub fn lakera(api_key: impl Into<String>, timeout: Duration) -> Result<Self, DetectorError> {
        Ok(Self::new("lakera_prompt_injection", DEFAULT_API_BASE, DEFAULT_ENDPOINT, timeout)?
            .with_api_key(api_key))
    }

    /// Set the bearer token sent with every call
    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    /// Endpoint URL this client posts to
    pub fn url(&self) -> &Url {
        &self.url
    }
}

#[async_trait]
impl DetectorClient for HttpDetectorClient {
    fn id(&self) -> &str {
        &self.id
    }

    async fn submit(&self, request: &DetectorRequest) -> Result<DetectorVerdict, DetectorError> {
        let body = serde_json::to_vec(request)?;

        trace!(
            detector = %self.id,
            url = %self.url,
            message_count = request.input.len(),
            body_len = body.len(),
            "Sending request to detector"
        );

        let mut builder = self
            .http
            .post(self.url.clone())
            .header(http::header::CONTENT_TYPE, "application/json")
            .body(body);
        if let Some(ref key) = self.api_key {
            builder = builder.bearer_auth(key);
        }

        let start = Instant::now();
        let response = builder.send().await.map_err(|e| {
            if e.is_timeout() {
                DetectorError::Timeout(self.timeout)
            } else {
                DetectorError::ConnectionFailed(e.to_string())
            }
        })?;

        let status = response.status();
        let text = response.text().await.map_err(|e| {
            if e.is_timeout() {
                DetectorError::Timeout(self.timeout)
            } else {
                DetectorError::ConnectionFailed(format!("Failed to read response body: {}", e))
            }
        })?;

        debug!(
            detector = %self.id,
            status = status.as_u16(),
            response_len = text.len(),
            duration_ms = start.elapsed().as_millis() as u64,
            "Detector responded"
        );

        if !status.is_success() {
            return Err(DetectorError::Status { status, body: text });
        }

        serde_json::from_str::<Value>(&text)
            .and_then(DetectorVerdict::from_raw)
            .map_err(|e| {
                error!(
                    detector = %self.id,
                    error = %e,
                    "Detector returned an unparseable body"
                );
                DetectorError::InvalidResponse(e.to_string())
            })
    }
}

/// Resolve `endpoint` against `api_base`, keeping any path prefix on the base.
pub fn endpoint_url(api_base: &str, endpoint: &str) -> Result<Url, DetectorError> {
    let invalid = |reason: String| {
        DetectorError::Configuration(format!("api base '{}' {}", api_base, reason))
    };

    let mut base = Url::parse(api_base).map_err(|e| invalid(format!("is not a URL: {}", e)))?;
    if !matches!(base.scheme(), "http" | "https") {
        return Err(invalid("must use http or https".to_string()));
    }
    if base.host_str().is_none_or(str::is_empty) {
        return Err(invalid("has no host".to_string()));
    }

    if !base.path().ends_with('/') {
        let path = format!("{}/", base.path());
        base.set_path(&path);
    }
    base.join(endpoint.trim_start_matches('/'))
        .map_err(|e| invalid(format!("cannot be joined with '{}': {}", endpoint, e)))
}
