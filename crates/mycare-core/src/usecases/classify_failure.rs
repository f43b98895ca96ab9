//! Failure classification for share-link requests
//!
//! Maps errors returned through [`IShareLinkApi`](crate::ports::IShareLinkApi)
//! to [`ShareError`]. A structured `code` in the response envelope always
//! wins; message matching is only the fallback for servers that send none.

use crate::domain::errors::{RejectionKind, ShareError};
use crate::domain::share::UnavailableReason;
use crate::ports::RemoteError;

/// Share-link request being classified
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    LoadShare,
    RequestAccess,
    ValidateOtp,
    ListFiles,
    Download,
}

impl std::fmt::Display for Operation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Operation::LoadShare => write!(f, "load_share"),
            Operation::RequestAccess => write!(f, "request_access"),
            Operation::ValidateOtp => write!(f, "validate_otp"),
            Operation::ListFiles => write!(f, "list_files"),
            Operation::Download => write!(f, "download"),
        }
    }
}

/// Classifies a port error into a [`ShareError`]
///
/// Errors that carry no [`RemoteError`] in their chain are treated as
/// network failures.
pub fn classify(operation: Operation, error: &anyhow::Error) -> ShareError {
    let Some(remote) = error.chain().find_map(|e| e.downcast_ref::<RemoteError>()) else {
        return ShareError::Network(format!("{error:#}"));
    };

    match remote {
        RemoteError::Transport(message) => ShareError::Network(message.clone()),
        RemoteError::Rejected {
            status,
            code,
            message,
        } => {
            if let Some(classified) = code.as_deref().and_then(|c| from_error_code(c, message)) {
                return classified;
            }
            ShareError::Rejected {
                kind: from_message(operation, *status, message),
                message: message.clone(),
            }
        }
    }
}

/// Maps a structured error code from the response envelope
fn from_error_code(code: &str, message: &str) -> Option<ShareError> {
    let rejected = |kind| ShareError::Rejected {
        kind,
        message: message.to_string(),
    };

    match code.to_ascii_uppercase().as_str() {
        "EMAIL_MISMATCH" => Some(rejected(RejectionKind::EmailMismatch)),
        "INVALID_OTP" | "OTP_EXPIRED" | "OTP_ATTEMPTS_EXCEEDED" => {
            Some(rejected(RejectionKind::InvalidOtp))
        }
        "NOT_FOUND" | "SHARE_NOT_FOUND" => Some(rejected(RejectionKind::NotFound)),
        "SHARE_REVOKED" => Some(ShareError::Unavailable(UnavailableReason::Revoked)),
        "SHARE_EXPIRED" => Some(ShareError::Unavailable(UnavailableReason::Expired)),
        "MAX_USES_REACHED" => Some(ShareError::Unavailable(UnavailableReason::MaxUsesReached)),
        _ => None,
    }
}

/// Guesses the rejection kind from the status and message text
fn from_message(operation: Operation, status: u16, message: &str) -> RejectionKind {
    if status == 404 {
        return RejectionKind::NotFound;
    }

    let lower = message.to_lowercase();
    match operation {
        Operation::RequestAccess if lower.contains("email") || lower.contains("e-mail") => {
            RejectionKind::EmailMismatch
        }
        Operation::ValidateOtp
            if ["otp", "código", "codigo", "invalid"]
                .iter()
                .any(|needle| lower.contains(needle)) =>
        {
            RejectionKind::InvalidOtp
        }
        _ => RejectionKind::Other,
    }
}
