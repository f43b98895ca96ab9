//! Share-link port (driven/secondary port)
//!
//! This module defines the interface to the share-link endpoints of the
//! MyCare server. Every method is a single stateless request: no retries,
//! no backoff, and no state kept between calls. The share code authorizes
//! calls up to OTP validation; the access token authorizes calls after it.
//!
//! ## Design Notes
//!
//! - Uses `anyhow::Result` at the boundary like every port in this crate.
//!   Adapters attach a [`RemoteError`] as the error source so the use case
//!   can classify failures with `downcast_ref`.
//! - Uses `#[async_trait]` for async trait methods.

use thiserror::Error;

use crate::domain::newtypes::{AccessToken, Email, MediaId, Otp, ShareCode};
use crate::domain::share::{ShareExam, ShareInfo};

/// Classified failure of a share-link request
///
/// Adapters convert their transport errors into this type before returning
/// them through the port.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RemoteError {
    /// The server could not be reached or the body was not valid JSON
    #[error("Transport error: {0}")]
    Transport(String),

    /// The server answered with a non-2xx status or `success: false`
    #[error("Server rejected request ({status}): {message}")]
    Rejected {
        /// HTTP status code of the response
        status: u16,
        /// Structured error code from the response envelope, if any
        code: Option<String>,
        /// Error text from the response envelope (or a generic fallback)
        message: String,
    },
}

/// Payload of a successful download
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadedFile {
    /// File name suggested by `Content-Disposition`, if any
    pub file_name: Option<String>,
    /// `Content-Type` of the payload, if any
    pub content_type: Option<String>,
    /// Raw file contents
    pub bytes: Vec<u8>,
}

/// Port trait for the share-link endpoints
#[async_trait::async_trait]
pub trait IShareLinkApi: Send + Sync {
    /// `GET /s/{code}` - fetches the share descriptor
    async fn get_share(&self, code: &ShareCode) -> anyhow::Result<ShareInfo>;

    /// `POST /s/{code}/request-access` - asks the server to email an OTP
    ///
    /// The server only sends the code if `email` matches the share.
    async fn request_access(&self, code: &ShareCode, email: &Email) -> anyhow::Result<()>;

    /// `POST /s/{code}/validate-otp` - exchanges an OTP for an access token
    async fn validate_otp(
        &self,
        code: &ShareCode,
        email: &Email,
        otp: &Otp,
    ) -> anyhow::Result<AccessToken>;

    /// `GET /s/{code}/files` - lists the shared exams and their files
    async fn list_files(
        &self,
        code: &ShareCode,
        token: &AccessToken,
    ) -> anyhow::Result<Vec<ShareExam>>;

    /// `GET /s/{code}/files/{media_id}/download` - downloads one file
    async fn download_file(
        &self,
        code: &ShareCode,
        media_id: &MediaId,
        token: &AccessToken,
    ) -> anyhow::Result<DownloadedFile>;

    /// `GET /s/{code}/download-all` - downloads every file as a zip archive
    async fn download_all(
        &self,
        code: &ShareCode,
        token: &AccessToken,
    ) -> anyhow::Result<DownloadedFile>;

    /// Absolute URL of the single-file download endpoint
    fn file_download_url(&self, code: &ShareCode, media_id: &MediaId) -> String;

    /// Absolute URL of the zip download endpoint
    fn download_all_url(&self, code: &ShareCode) -> String;
}
