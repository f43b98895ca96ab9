//! ShareLinkClient - IShareLinkApi implementation for the MyCare server
//!
//! Every method is one request against `/s/{code}/...`: no retries, no
//! cached state. Failures are returned as `anyhow::Error` whose source is a
//! [`RemoteError`], so the use case can classify them.
//!
//! ## Endpoints
//!
//! | Method | Path | Auth |
//! |---|---|---|
//! | GET | `/s/{code}` | none |
//! | POST | `/s/{code}/request-access` | none |
//! | POST | `/s/{code}/validate-otp` | none |
//! | GET | `/s/{code}/files` | bearer |
//! | GET | `/s/{code}/files/{mediaId}/download` | bearer |
//! | GET | `/s/{code}/download-all` | bearer |

use anyhow::Result;
use async_trait::async_trait;
use reqwest::{header, Method, Response};
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::debug;

use mycare_core::domain::{AccessToken, Email, MediaId, Otp, ShareCode, ShareExam, ShareInfo};
use mycare_core::ports::{DownloadedFile, IShareLinkApi, RemoteError};

use crate::client::ApiClient;
use crate::ApiError;

/// Message used when validate-otp succeeds without issuing a token
const MISSING_TOKEN_MESSAGE: &str = "Código inválido ou expirado";

/// `data` of a successful validate-otp response
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct OtpValidation {
    access_token: Option<String>,
}

/// `data` of the files endpoint: either the bare list or wrapped in `exams`
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum FilesPayload {
    List(Vec<ShareExam>),
    Wrapped {
        #[serde(default)]
        exams: Vec<ShareExam>,
    },
}

impl FilesPayload {
    fn into_exams(self) -> Vec<ShareExam> {
        match self {
            FilesPayload::List(exams) | FilesPayload::Wrapped { exams } => exams,
        }
    }
}

/// Share-link adapter over [`ApiClient`]
#[derive(Debug, Clone)]
pub struct ShareLinkClient {
    client: ApiClient,
}

impl ShareLinkClient {
    /// Creates an adapter using `client` for transport
    pub fn new(client: ApiClient) -> Self {
        Self { client }
    }

    fn endpoint_url(&self, segments: &[&str]) -> String {
        match self.client.url(segments) {
            Ok(url) => url.into(),
            Err(_) => format!(
                "{}/{}",
                self.client.base_url().as_str().trim_end_matches('/'),
                segments.join("/")
            ),
        }
    }

    async fn fetch_download(
        &self,
        segments: &[&str],
        token: &AccessToken,
    ) -> Result<DownloadedFile, ApiError> {
        let request = self
            .client
            .request(Method::GET, segments)?
            .bearer_auth(token.expose());
        let response = self.client.send_raw(request).await?;
        read_download(response).await
    }
}

/// Wraps an adapter error so the use case can find it in the chain
fn remote(err: ApiError, what: String) -> anyhow::Error {
    anyhow::Error::new(RemoteError::from(err)).context(what)
}

fn invalid(what: &str, err: serde_json::Error) -> ApiError {
    ApiError::InvalidResponse(format!("unexpected {what} payload: {err}"))
}

async fn read_download(response: Response) -> Result<DownloadedFile, ApiError> {
    let headers = response.headers();
    let content_type = headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);
    let file_name = headers
        .get(header::CONTENT_DISPOSITION)
        .and_then(|v| v.to_str().ok())
        .and_then(disposition_filename);

    let bytes = response.bytes().await?.to_vec();
    Ok(DownloadedFile {
        file_name,
        content_type,
        bytes,
    })
}

/// Extracts `filename` from a `Content-Disposition` header value
fn disposition_filename(value: &str) -> Option<String> {
    value
        .split(';')
        .map(str::trim)
        .find_map(|part| {
            let (key, raw) = part.split_once('=')?;
            key.trim()
                .eq_ignore_ascii_case("filename")
                .then(|| raw.trim().trim_matches('"').to_string())
        })
        .filter(|name| !name.is_empty())
}

/// Parses the share descriptor, filling in `code` when the server omits it
fn parse_share_info(code: &ShareCode, data: Value) -> Result<ShareInfo, ApiError> {
    let mut data = match data {
        Value::Object(map) => map,
        Value::Null => {
            return Err(ApiError::InvalidResponse(
                "share descriptor missing from response".to_string(),
            ))
        }
        other => {
            return Err(ApiError::InvalidResponse(format!(
                "share descriptor is not an object: {other}"
            )))
        }
    };
    let has_code = data
        .get("code")
        .and_then(Value::as_str)
        .is_some_and(|c| !c.trim().is_empty());
    if !has_code {
        data.insert("code".to_string(), Value::String(code.to_string()));
    }
    serde_json::from_value(Value::Object(data)).map_err(|e| invalid("share descriptor", e))
}

#[async_trait]
impl IShareLinkApi for ShareLinkClient {
    async fn get_share(&self, code: &ShareCode) -> Result<ShareInfo> {
        debug!(code = %code, "GET share descriptor");
        let what = format!("GET /s/{code}");

        let request = self
            .client
            .request(Method::GET, &["s", code.as_str()])
            .map_err(|e| remote(e, what.clone()))?;
        let data = self
            .client
            .send_json(request)
            .await
            .map_err(|e| remote(e, what.clone()))?;
        parse_share_info(code, data).map_err(|e| remote(e, what))
    }

    async fn request_access(&self, code: &ShareCode, email: &Email) -> Result<()> {
        debug!(code = %code, "POST request-access");
        let what = format!("POST /s/{code}/request-access");

        let request = self
            .client
            .request(Method::POST, &["s", code.as_str(), "request-access"])
            .map_err(|e| remote(e, what.clone()))?
            .json(&json!({ "email": email.as_str() }));
        self.client
            .send_json(request)
            .await
            .map_err(|e| remote(e, what))?;
        Ok(())
    }

    async fn validate_otp(&self, code: &ShareCode, email: &Email, otp: &Otp) -> Result<AccessToken> {
        debug!(code = %code, "POST validate-otp");
        let what = format!("POST /s/{code}/validate-otp");

        let request = self
            .client
            .request(Method::POST, &["s", code.as_str(), "validate-otp"])
            .map_err(|e| remote(e, what.clone()))?
            .json(&json!({ "email": email.as_str(), "otp": otp.as_str() }));
        let data = self
            .client
            .send_json(request)
            .await
            .map_err(|e| remote(e, what.clone()))?;

        let validation: Option<OtpValidation> = serde_json::from_value(data)
            .map_err(|e| remote(invalid("validate-otp", e), what.clone()))?;
        let token = validation
            .and_then(|v| v.access_token)
            .and_then(|t| AccessToken::new(t).ok())
            .ok_or_else(|| {
                remote(
                    ApiError::Rejected {
                        status: 200,
                        code: None,
                        message: MISSING_TOKEN_MESSAGE.to_string(),
                    },
                    what,
                )
            })?;
        Ok(token)
    }

    async fn list_files(&self, code: &ShareCode, token: &AccessToken) -> Result<Vec<ShareExam>> {
        debug!(code = %code, "GET files");
        let what = format!("GET /s/{code}/files");

        let request = self
            .client
            .request(Method::GET, &["s", code.as_str(), "files"])
            .map_err(|e| remote(e, what.clone()))?
            .bearer_auth(token.expose());
        let data = self
            .client
            .send_json(request)
            .await
            .map_err(|e| remote(e, what.clone()))?;

        if data.is_null() {
            return Ok(Vec::new());
        }
        let payload: FilesPayload =
            serde_json::from_value(data).map_err(|e| remote(invalid("files", e), what))?;
        Ok(payload.into_exams())
    }

    async fn download_file(
        &self,
        code: &ShareCode,
        media_id: &MediaId,
        token: &AccessToken,
    ) -> Result<DownloadedFile> {
        debug!(code = %code, media_id = %media_id, "GET file download");
        let file = self
            .fetch_download(
                &["s", code.as_str(), "files", media_id.as_str(), "download"],
                token,
            )
            .await
            .map_err(|e| remote(e, format!("GET /s/{code}/files/{media_id}/download")))?;
        debug!(bytes = file.bytes.len(), "File downloaded");
        Ok(file)
    }

    async fn download_all(&self, code: &ShareCode, token: &AccessToken) -> Result<DownloadedFile> {
        debug!(code = %code, "GET download-all");
        let file = self
            .fetch_download(&["s", code.as_str(), "download-all"], token)
            .await
            .map_err(|e| remote(e, format!("GET /s/{code}/download-all")))?;
        debug!(bytes = file.bytes.len(), "Archive downloaded");
        Ok(file)
    }

    fn file_download_url(&self, code: &ShareCode, media_id: &MediaId) -> String {
        self.endpoint_url(&["s", code.as_str(), "files", media_id.as_str(), "download"])
    }

    fn download_all_url(&self, code: &ShareCode) -> String {
        self.endpoint_url(&["s", code.as_str(), "download-all"])
    }
}
