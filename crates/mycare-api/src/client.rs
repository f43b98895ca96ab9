//! MyCare REST client
//!
//! Wraps `reqwest::Client` with base URL construction and parsing of the
//! server's JSON envelope:
//!
//! ```json
//! { "success": true, "data": { ... }, "message": "...", "error": "...", "code": "..." }
//! ```
//!
//! A response is a failure when the status is not 2xx or `success` is
//! `false`. The error text is `error`, else `message`, else
//! `"API Error: {status}"`. A body that is not JSON is reported as
//! [`ApiError::InvalidResponse`].
//!
//! The client holds no credentials. Bearer tokens are attached per request
//! by the caller.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use mycare_api::client::ApiClient;
//! use reqwest::Method;
//!
//! # async fn example() -> Result<(), mycare_api::ApiError> {
//! let client = ApiClient::new("https://api.mycare.app")?;
//! let request = client.request(Method::GET, &["s", "ABC123"])?;
//! let descriptor = client.send_json(request).await?;
//! println!("{descriptor:?}");
//! # Ok(())
//! # }
//! ```

use reqwest::{Client, Method, RequestBuilder, Response, StatusCode};
use serde::Deserialize;
use serde_json::Value;
use tracing::debug;
use url::Url;

use mycare_core::config::ApiConfig;

use crate::ApiError;

/// JSON envelope wrapping every response of the MyCare server
#[derive(Debug, Deserialize)]
struct Envelope {
    success: Option<bool>,
    #[serde(default)]
    data: Option<Value>,
    message: Option<String>,
    error: Option<String>,
    code: Option<String>,
}

/// HTTP client for the MyCare REST server
#[derive(Debug, Clone)]
pub struct ApiClient {
    /// The underlying HTTP client
    client: Client,
    /// Base URL every endpoint path is appended to
    base_url: Url,
}

impl ApiClient {
    /// Creates a client for the server at `base_url`
    ///
    /// # Errors
    /// Returns [`ApiError::InvalidBaseUrl`] if `base_url` is not an
    /// absolute http(s) URL.
    pub fn new(base_url: &str) -> Result<Self, ApiError> {
        Self::with_client(Client::new(), base_url)
    }

    /// Creates a client from the `api` section of the configuration
    pub fn from_config(config: &ApiConfig) -> Result<Self, ApiError> {
        let client = Client::builder()
            .user_agent(config.user_agent.clone())
            .build()?;
        Self::with_client(client, &config.base_url)
    }

    fn with_client(client: Client, base_url: &str) -> Result<Self, ApiError> {
        let base_url = Url::parse(base_url)
            .map_err(|e| ApiError::InvalidBaseUrl(format!("{base_url}: {e}")))?;
        if !matches!(base_url.scheme(), "http" | "https") {
            return Err(ApiError::InvalidBaseUrl(format!(
                "{base_url}: expected http or https"
            )));
        }
        Ok(Self { client, base_url })
    }

    /// Returns the base URL
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Builds an absolute endpoint URL from path segments
    ///
    /// Segments are percent-encoded, so a share code can never escape its
    /// path position. A path already present on the base URL is kept.
    pub fn url(&self, segments: &[&str]) -> Result<Url, ApiError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|()| ApiError::InvalidBaseUrl(self.base_url.to_string()))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    /// Creates a request builder for the given method and path segments
    pub fn request(&self, method: Method, segments: &[&str]) -> Result<RequestBuilder, ApiError> {
        let url = self.url(segments)?;
        debug!(method = %method, url = %url, "Building request");
        Ok(self.client.request(method, url))
    }

    /// Sends a request to a JSON endpoint and returns the envelope's `data`
    ///
    /// Returns `Value::Null` when the envelope carries no `data`.
    pub async fn send_json(&self, request: RequestBuilder) -> Result<Value, ApiError> {
        let response = request.send().await?;
        let status = response.status();
        let body = response.bytes().await?;

        let envelope: Envelope = serde_json::from_slice(&body).map_err(|e| {
            ApiError::InvalidResponse(format!("expected JSON body (status {status}): {e}"))
        })?;

        if !status.is_success() || envelope.success == Some(false) {
            return Err(rejection(status, envelope));
        }

        debug!(status = %status, "Request succeeded");
        Ok(envelope.data.unwrap_or(Value::Null))
    }

    /// Sends a request to a binary endpoint and returns the raw response
    ///
    /// Non-2xx responses are turned into [`ApiError::Rejected`], using the
    /// JSON envelope of the error body when there is one.
    pub async fn send_raw(&self, request: RequestBuilder) -> Result<Response, ApiError> {
        let response = request.send().await?;
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.bytes().await.unwrap_or_default();
        match serde_json::from_slice::<Envelope>(&body) {
            Ok(envelope) => Err(rejection(status, envelope)),
            Err(_) => Err(ApiError::Rejected {
                status: status.as_u16(),
                code: None,
                message: fallback_message(status),
            }),
        }
    }
}

fn rejection(status: StatusCode, envelope: Envelope) -> ApiError {
    let message = envelope
        .error
        .filter(|m| !m.trim().is_empty())
        .or(envelope.message.filter(|m| !m.trim().is_empty()))
        .unwrap_or_else(|| fallback_message(status));
    ApiError::Rejected {
        status: status.as_u16(),
        code: envelope.code,
        message,
    }
}

fn fallback_message(status: StatusCode) -> String {
    format!("API Error: {}", status.as_u16())
}
