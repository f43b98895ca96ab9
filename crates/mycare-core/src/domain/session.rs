//! ShareSession domain entity
//!
//! A ShareSession is the transient, in-memory state of one visit to a share
//! link. Its [`Step`] is a tagged enum: the access token only exists inside
//! [`Step::Files`], so listing or downloading without a token cannot be
//! expressed.

use super::errors::DomainError;
use super::newtypes::{AccessToken, Email, Otp, ShareCode};
use super::share::{LinkAvailability, ShareInfo, UnavailableReason};

/// Discriminant of [`Step`], safe to log and compare
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StepKind {
    Email,
    Otp,
    Files,
}

impl std::fmt::Display for StepKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StepKind::Email => write!(f, "email"),
            StepKind::Otp => write!(f, "otp"),
            StepKind::Files => write!(f, "files"),
        }
    }
}

/// Current step of the share-access wizard
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Step {
    /// Waiting for the recipient's email
    Email,
    /// A code was sent to `email`; waiting for the OTP
    Otp {
        /// Email the code was sent to
        email: Email,
    },
    /// OTP accepted; files may be listed and downloaded
    Files {
        /// Email the token was issued for
        email: Email,
        /// Bearer credential for the file endpoints
        access_token: AccessToken,
    },
}

impl Step {
    /// Returns the discriminant of this step
    pub fn kind(&self) -> StepKind {
        match self {
            Step::Email => StepKind::Email,
            Step::Otp { .. } => StepKind::Otp,
            Step::Files { .. } => StepKind::Files,
        }
    }

    /// Email associated with the step, if one was accepted
    pub fn email(&self) -> Option<&Email> {
        match self {
            Step::Email => None,
            Step::Otp { email } | Step::Files { email, .. } => Some(email),
        }
    }
}

/// In-memory state of one share visit
///
/// Created for a single share code and discarded with the flow that owns
/// it. Nothing here is persisted.
#[derive(Debug, Clone)]
pub struct ShareSession {
    /// Share code, immutable for the session
    code: ShareCode,
    /// Current wizard step
    step: Step,
    /// Last OTP entered in the OTP step
    otp: Option<Otp>,
    /// Most recently loaded share descriptor
    share_info: Option<ShareInfo>,
    /// Link status reported by a server rejection; never cleared
    unavailable: Option<UnavailableReason>,
}

impl ShareSession {
    /// Creates a session for `code`, starting at [`Step::Email`]
    pub fn new(code: ShareCode) -> Self {
        Self {
            code,
            step: Step::Email,
            otp: None,
            share_info: None,
            unavailable: None,
        }
    }

    /// Returns the share code
    pub fn code(&self) -> &ShareCode {
        &self.code
    }

    /// Returns the current step
    pub fn step(&self) -> &Step {
        &self.step
    }

    /// Returns the OTP entered in the current OTP step, if any
    pub fn otp(&self) -> Option<&Otp> {
        self.otp.as_ref()
    }

    /// Returns the loaded share descriptor, if any
    pub fn share_info(&self) -> Option<&ShareInfo> {
        self.share_info.as_ref()
    }

    /// Access token, present only in [`Step::Files`]
    pub fn access_token(&self) -> Option<&AccessToken> {
        match &self.step {
            Step::Files { access_token, .. } => Some(access_token),
            _ => None,
        }
    }

    /// Gating decision for the session
    ///
    /// A link status reported by the server in a rejection wins over the
    /// descriptor. Without either, the session is treated as available:
    /// the descriptor fetch is best effort and the server still enforces
    /// link status on every call.
    pub fn availability(&self) -> LinkAvailability {
        if let Some(reason) = self.unavailable {
            return LinkAvailability::Unavailable(reason);
        }
        self.share_info
            .as_ref()
            .map(ShareInfo::availability)
            .unwrap_or(LinkAvailability::Available)
    }

    /// Records that the server refused the link as `reason`
    ///
    /// Revoked, expired and used-up links never come back, so the mark
    /// outlives any descriptor loaded afterwards. The first reason is kept.
    pub fn mark_unavailable(&mut self, reason: UnavailableReason) {
        self.unavailable.get_or_insert(reason);
    }

    /// Stores a freshly loaded descriptor
    pub fn set_share_info(&mut self, info: ShareInfo) {
        self.share_info = Some(info);
    }

    /// Drops the descriptor after a failed load
    pub fn clear_share_info(&mut self) {
        self.share_info = None;
    }

    /// Replaces the exam list of the loaded descriptor
    ///
    /// Returns false if no descriptor is loaded yet.
    pub fn replace_exams(&mut self, exams: Vec<super::share::ShareExam>) -> bool {
        match self.share_info.as_mut() {
            Some(info) => {
                info.exams = exams;
                true
            }
            None => false,
        }
    }

    /// Records the OTP the user is about to submit
    pub fn enter_otp(&mut self, otp: Otp) -> Result<(), DomainError> {
        self.require(StepKind::Otp, StepKind::Otp)?;
        self.otp = Some(otp);
        Ok(())
    }

    /// EMAIL → OTP after the server accepted an access request for `email`
    pub fn code_sent(&mut self, email: Email) -> Result<(), DomainError> {
        self.require(StepKind::Email, StepKind::Otp)?;
        self.step = Step::Otp { email };
        self.otp = None;
        Ok(())
    }

    /// OTP → FILES after the server validated the OTP and issued `token`
    ///
    /// The token is bound to the email held by the OTP step.
    pub fn otp_validated(&mut self, access_token: AccessToken) -> Result<(), DomainError> {
        let email = match &self.step {
            Step::Otp { email } => email.clone(),
            other => {
                return Err(DomainError::InvalidState {
                    from: other.kind().to_string(),
                    to: StepKind::Files.to_string(),
                })
            }
        };
        self.step = Step::Files {
            email,
            access_token,
        };
        self.otp = None;
        Ok(())
    }

    /// OTP → EMAIL when the user asks for a new code; clears the entered OTP
    pub fn resend_code(&mut self) -> Result<(), DomainError> {
        self.require(StepKind::Otp, StepKind::Email)?;
        self.step = Step::Email;
        self.otp = None;
        Ok(())
    }

    fn require(&self, expected: StepKind, target: StepKind) -> Result<(), DomainError> {
        let current = self.step.kind();
        if current != expected {
            return Err(DomainError::InvalidState {
                from: current.to_string(),
                to: target.to_string(),
            });
        }
        Ok(())
    }
}
