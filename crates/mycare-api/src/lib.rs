//! MyCare API - HTTP adapter for the share-link endpoints
//!
//! Provides:
//! - A thin JSON client that understands the server's response envelope
//! - [`share::ShareLinkClient`], the `IShareLinkApi` implementation
//! - [`opener::BrowserUrlOpener`], the `IUrlOpener` implementation
//!
//! ## Modules
//!
//! - [`client`] - Base URL handling, envelope parsing, error mapping
//! - [`share`] - Share-link endpoints (`/s/{code}/...`)
//! - [`opener`] - Opens URLs in the default browser

pub mod client;
pub mod opener;
pub mod share;

use mycare_core::ports::RemoteError;
use thiserror::Error;

/// Errors that can occur when talking to the MyCare server
#[derive(Debug, Error)]
pub enum ApiError {
    /// The server answered with a non-2xx status or `success: false`
    #[error("Request rejected ({status}): {message}")]
    Rejected {
        /// HTTP status code of the response
        status: u16,
        /// Structured error code from the envelope, if the server sent one
        code: Option<String>,
        /// `error` or `message` from the envelope, or a generic fallback
        message: String,
    },

    /// A network-level error occurred
    #[error("Network error: {0}")]
    NetworkError(#[from] reqwest::Error),

    /// The response body was not the JSON the endpoint promises
    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    /// The configured base URL cannot be used to build endpoint URLs
    #[error("Invalid base URL: {0}")]
    InvalidBaseUrl(String),
}

impl From<ApiError> for RemoteError {
    fn from(err: ApiError) -> Self {
        match err {
            ApiError::Rejected {
                status,
                code,
                message,
            } => RemoteError::Rejected {
                status,
                code,
                message,
            },
            other => RemoteError::Transport(other.to_string()),
        }
    }
}
