//! Domain error types
//!
//! This module defines error types specific to domain operations,
//! including validation failures, invalid step transitions, and the
//! classified failures surfaced by the share-access flow.

use thiserror::Error;

use super::session::StepKind;
use super::share::UnavailableReason;

/// Errors that can occur in domain operations
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// Invalid email address format
    #[error("Invalid email format: {0}")]
    InvalidEmail(String),

    /// OTP is not exactly six digits
    #[error("Invalid OTP: {0}")]
    InvalidOtp(String),

    /// Share code is empty or malformed
    #[error("Invalid share code: {0}")]
    InvalidShareCode(String),

    /// Media identifier is empty or malformed
    #[error("Invalid media ID: {0}")]
    InvalidMediaId(String),

    /// Access token is empty
    #[error("Invalid access token: {0}")]
    InvalidAccessToken(String),

    /// Invalid state transition attempt
    #[error("Invalid state transition from {from} to {to}")]
    InvalidState {
        /// The current state
        from: String,
        /// The attempted target state
        to: String,
    },

    /// Generic validation failure
    #[error("Validation failed: {0}")]
    ValidationFailed(String),
}

/// Why the server rejected a share-access request
///
/// Derived from the structured `code` field of the response envelope when
/// the server sends one, otherwise from the message text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RejectionKind {
    /// The email does not match the one the share was created for
    EmailMismatch,
    /// The OTP is wrong, expired, or attempts are exhausted
    InvalidOtp,
    /// The share code does not exist
    NotFound,
    /// Any other rejection; the server message is shown as is
    Other,
}

impl std::fmt::Display for RejectionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RejectionKind::EmailMismatch => write!(f, "email_mismatch"),
            RejectionKind::InvalidOtp => write!(f, "invalid_otp"),
            RejectionKind::NotFound => write!(f, "not_found"),
            RejectionKind::Other => write!(f, "other"),
        }
    }
}

/// Failures surfaced by the share-access flow
///
/// Every variant maps to a user-facing message via [`ShareError::user_message`].
/// None of them triggers an automatic retry.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ShareError {
    /// The server could not be reached or answered with something that is not JSON
    #[error("Network error: {0}")]
    Network(String),

    /// Client-side validation failed; no request was sent
    #[error(transparent)]
    Validation(#[from] DomainError),

    /// The server rejected the request
    #[error("Request rejected ({kind}): {message}")]
    Rejected {
        /// Classified rejection reason
        kind: RejectionKind,
        /// Message as returned by the server
        message: String,
    },

    /// The share link can no longer be used
    #[error("Share unavailable: {0}")]
    Unavailable(UnavailableReason),

    /// Both the authenticated fetch and the direct URL open failed
    #[error("Download failed: {0}")]
    DownloadFailed(String),

    /// The operation is not legal in the current step
    #[error("Operation requires step {expected}, current step is {actual}")]
    InvalidStep {
        /// Step the operation requires
        expected: StepKind,
        /// Step the session is in
        actual: StepKind,
    },

    /// The flow was closed while the request was in flight
    #[error("Operation cancelled")]
    Cancelled,
}

impl ShareError {
    /// Returns the message shown to the share recipient
    pub fn user_message(&self) -> String {
        match self {
            ShareError::Network(_) => {
                "Não foi possível conectar ao servidor. Verifique sua conexão.".to_string()
            }
            ShareError::Validation(DomainError::InvalidEmail(_)) => {
                "Por favor, insira um e-mail válido".to_string()
            }
            ShareError::Validation(DomainError::InvalidOtp(_)) => {
                "Por favor, insira o código de 6 dígitos".to_string()
            }
            ShareError::Validation(DomainError::InvalidShareCode(_)) => {
                "Link de compartilhamento inválido.".to_string()
            }
            ShareError::Validation(DomainError::ValidationFailed(message)) => message.clone(),
            ShareError::Validation(other) => other.to_string(),
            ShareError::Rejected { kind, message } => match kind {
                RejectionKind::EmailMismatch => {
                    "O e-mail informado não corresponde ao e-mail do compartilhamento.".to_string()
                }
                RejectionKind::InvalidOtp => {
                    "Código OTP inválido ou expirado. Solicite um novo código.".to_string()
                }
                RejectionKind::NotFound => {
                    "Link de compartilhamento inválido ou expirado.".to_string()
                }
                RejectionKind::Other if message.trim().is_empty() => {
                    "Falha ao processar a solicitação.".to_string()
                }
                RejectionKind::Other => message.clone(),
            },
            ShareError::Unavailable(reason) => reason.message().to_string(),
            ShareError::DownloadFailed(_) => "Não foi possível baixar o arquivo".to_string(),
            ShareError::InvalidStep { .. } => {
                "Esta ação não está disponível nesta etapa.".to_string()
            }
            ShareError::Cancelled => "Operação cancelada.".to_string(),
        }
    }

    /// Returns true if the session stays usable and the user may simply try again
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            ShareError::Network(_)
                | ShareError::Validation(_)
                | ShareError::Rejected { .. }
                | ShareError::DownloadFailed(_)
        )
    }
}
