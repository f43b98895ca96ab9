//! Share access use case
//!
//! Drives the recipient-side wizard of a share link:
//!
//! ```text
//! EMAIL --request_access ok--> OTP --validate_otp ok--> FILES
//!   ^                           |
//!   +--------resend_code--------+
//! ```
//!
//! Failures never advance the step. If the descriptor reports the link as
//! revoked, expired, or used up, or any request is refused for one of those
//! reasons, every later wizard operation short-circuits with
//! [`ShareError::Unavailable`] before touching the network.
//!
//! Operations take `&mut self`, so a second submission cannot be
//! issued while one is in flight. Every request races the flow's
//! [`CancellationToken`]; closing or dropping the flow resolves in-flight
//! requests to [`ShareError::Cancelled`] without touching the session.

use std::future::Future;
use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::domain::{
    AccessToken, DomainError, Email, LinkAvailability, MediaId, Otp, ShareCode, ShareError,
    ShareExam, ShareInfo, ShareSession, Step, StepKind,
};
use crate::ports::{DownloadedFile, IShareLinkApi, IUrlOpener};

use super::classify_failure::{classify, Operation};

/// Result of a download request
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DownloadOutcome {
    /// The authenticated fetch returned the payload
    Fetched(DownloadedFile),
    /// The fetch failed and the raw URL was handed to the platform instead
    Opened {
        /// URL that was opened
        url: String,
    },
}

/// Use case driving one visit to a share link
pub struct ShareAccessFlow {
    api: Arc<dyn IShareLinkApi>,
    opener: Arc<dyn IUrlOpener>,
    session: ShareSession,
    cancel: CancellationToken,
    open_fallback: bool,
}

impl ShareAccessFlow {
    /// Creates a flow for `code`, starting at the email step
    ///
    /// # Arguments
    ///
    /// * `api` - Share-link endpoints
    /// * `opener` - Platform URL opener used by the download fallback
    /// * `code` - Share code taken from the incoming link
    pub fn new(api: Arc<dyn IShareLinkApi>, opener: Arc<dyn IUrlOpener>, code: ShareCode) -> Self {
        Self {
            api,
            opener,
            session: ShareSession::new(code),
            cancel: CancellationToken::new(),
            open_fallback: true,
        }
    }

    /// Enables or disables opening the raw URL when a download fetch fails
    pub fn with_open_fallback(mut self, enabled: bool) -> Self {
        self.open_fallback = enabled;
        self
    }

    /// Returns the session state
    pub fn session(&self) -> &ShareSession {
        &self.session
    }

    /// Returns the share code
    pub fn code(&self) -> &ShareCode {
        self.session.code()
    }

    /// Returns the current step
    pub fn step(&self) -> &Step {
        self.session.step()
    }

    /// Returns the loaded share descriptor, if any
    pub fn share_info(&self) -> Option<&ShareInfo> {
        self.session.share_info()
    }

    /// Gating decision from the loaded descriptor and past rejections
    pub fn availability(&self) -> LinkAvailability {
        self.session.availability()
    }

    /// Token that cancels this flow's requests when triggered
    ///
    /// Handy for wiring Ctrl-C or a UI teardown hook to the flow.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Cancels in-flight requests; later requests fail immediately
    pub fn close(&self) {
        self.cancel.cancel();
    }

    /// Fetches the share descriptor and returns the gating decision
    ///
    /// On failure the descriptor is dropped so front ends show the error
    /// state. Nothing is retried and nothing changes on the server.
    pub async fn load_share_info(&mut self) -> Result<LinkAvailability, ShareError> {
        let code = self.session.code().clone();
        debug!(code = %code, "Loading share descriptor");

        let result = self
            .run(Operation::LoadShare, self.api.get_share(&code))
            .await;
        match self.track(result) {
            Ok(info) => {
                let availability = info.availability();
                info!(
                    code = %code,
                    exams = info.exams.len(),
                    files = info.file_count(),
                    available = availability.is_available(),
                    "Share descriptor loaded"
                );
                self.session.set_share_info(info);
                Ok(availability)
            }
            Err(ShareError::Cancelled) => Err(ShareError::Cancelled),
            Err(err) => {
                warn!(code = %code, error = %err, "Failed to load share descriptor");
                self.session.clear_share_info();
                Err(err)
            }
        }
    }

    /// Submits the recipient email and asks the server to send an OTP
    ///
    /// The email is validated before any request. On success the flow moves
    /// to the OTP step; on failure it stays at the email step.
    pub async fn request_access(&mut self, email: &str) -> Result<(), ShareError> {
        self.ensure_available()?;
        self.ensure_step(StepKind::Email)?;
        let email = Email::new(email.to_string())?;
        let code = self.session.code().clone();

        debug!(code = %code, domain = %email.domain(), "Requesting share access");
        let result = self
            .run(
                Operation::RequestAccess,
                self.api.request_access(&code, &email),
            )
            .await;
        self.track(result)?;

        self.session.code_sent(email)?;
        info!(code = %code, "Access code sent, waiting for OTP");
        Ok(())
    }

    /// Submits the OTP received by email
    ///
    /// Input that is not exactly six digits is rejected before any request.
    /// On success the issued token is kept in memory and the flow moves to
    /// the files step; on failure it stays at the OTP step.
    pub async fn validate_otp(&mut self, otp: &str) -> Result<(), ShareError> {
        self.ensure_available()?;
        let email = match self.session.step() {
            Step::Otp { email } => email.clone(),
            other => {
                return Err(ShareError::InvalidStep {
                    expected: StepKind::Otp,
                    actual: other.kind(),
                })
            }
        };
        let otp = Otp::new(otp)?;
        self.session.enter_otp(otp.clone())?;
        let code = self.session.code().clone();

        debug!(code = %code, "Validating OTP");
        let result = self
            .run(
                Operation::ValidateOtp,
                self.api.validate_otp(&code, &email, &otp),
            )
            .await;
        let token = self.track(result)?;

        self.session.otp_validated(token)?;
        info!(code = %code, "OTP accepted, share files unlocked");
        Ok(())
    }

    /// Goes back from the OTP step to the email step to request a new code
    pub fn resend_code(&mut self) -> Result<(), ShareError> {
        let actual = self.session.step().kind();
        self.session
            .resend_code()
            .map_err(|_| ShareError::InvalidStep {
                expected: StepKind::Otp,
                actual,
            })?;
        info!(code = %self.session.code(), "Returning to email step to resend code");
        Ok(())
    }

    /// Reloads the exam/file list with the access token
    ///
    /// Only legal in the files step. Without a previously loaded descriptor
    /// the list is returned but not stored.
    pub async fn refresh_files(&mut self) -> Result<Vec<ShareExam>, ShareError> {
        let token = self.require_token()?;
        let code = self.session.code().clone();

        debug!(code = %code, "Listing shared files");
        let result = self
            .run(Operation::ListFiles, self.api.list_files(&code, &token))
            .await;
        let exams = self.track(result)?;

        if !self.session.replace_exams(exams.clone()) {
            debug!(code = %code, "No descriptor loaded, file list not cached");
        }
        Ok(exams)
    }

    /// Downloads one shared file
    ///
    /// Tries the authenticated fetch first. If it fails, the raw download
    /// URL is handed to the platform opener; if that fails too the download
    /// is reported as failed. A link refused as unavailable is reported as
    /// such and never opened.
    pub async fn download_file(&mut self, media_id: &str) -> Result<DownloadOutcome, ShareError> {
        let token = self.require_token()?;
        let media_id = MediaId::new(media_id.to_string())?;
        let code = self.session.code().clone();

        debug!(code = %code, media_id = %media_id, "Downloading shared file");
        let url = self.api.file_download_url(&code, &media_id);
        let fetched = self
            .run(
                Operation::Download,
                self.api.download_file(&code, &media_id, &token),
            )
            .await;
        let fetched = self.track(fetched);
        self.fall_back(fetched, url)
    }

    /// Downloads every shared file as a zip archive
    ///
    /// Uses the same two-tier fallback as [`Self::download_file`]. Refused
    /// when the loaded descriptor has no files at all.
    pub async fn download_all(&mut self) -> Result<DownloadOutcome, ShareError> {
        let token = self.require_token()?;
        if let Some(info) = self.session.share_info() {
            if !info.has_files() {
                return Err(DomainError::ValidationFailed(
                    "Nenhum arquivo disponível para download".to_string(),
                )
                .into());
            }
        }
        let code = self.session.code().clone();

        debug!(code = %code, "Downloading all shared files");
        let url = self.api.download_all_url(&code);
        let fetched = self
            .run(Operation::Download, self.api.download_all(&code, &token))
            .await;
        let fetched = self.track(fetched);
        self.fall_back(fetched, url)
    }

    fn fall_back(
        &self,
        fetched: Result<DownloadedFile, ShareError>,
        url: String,
    ) -> Result<DownloadOutcome, ShareError> {
        let fetch_error = match fetched {
            Ok(file) => {
                info!(bytes = file.bytes.len(), "Download complete");
                return Ok(DownloadOutcome::Fetched(file));
            }
            Err(err @ (ShareError::Cancelled | ShareError::Unavailable(_))) => return Err(err),
            Err(err) => err,
        };

        if !self.open_fallback {
            warn!(error = %fetch_error, "Authenticated download failed, fallback disabled");
            return Err(ShareError::DownloadFailed(fetch_error.to_string()));
        }

        warn!(error = %fetch_error, "Authenticated download failed, opening URL directly");
        match self.opener.open(&url) {
            Ok(()) => Ok(DownloadOutcome::Opened { url }),
            Err(open_error) => {
                warn!(error = %open_error, "Opening download URL failed");
                Err(ShareError::DownloadFailed(format!(
                    "{fetch_error}; opening URL failed: {open_error:#}"
                )))
            }
        }
    }

    /// Awaits a port call unless the flow is cancelled first
    async fn run<T, F>(&self, operation: Operation, call: F) -> Result<T, ShareError>
    where
        F: Future<Output = anyhow::Result<T>>,
    {
        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => {
                debug!(operation = %operation, "Request cancelled");
                Err(ShareError::Cancelled)
            }
            result = call => result.map_err(|err| classify(operation, &err)),
        }
    }

    /// Remembers a link-status refusal so later operations stay offline
    fn track<T>(&mut self, result: Result<T, ShareError>) -> Result<T, ShareError> {
        if let Err(ShareError::Unavailable(reason)) = &result {
            warn!(code = %self.session.code(), reason = %reason, "Server reports link unavailable");
            self.session.mark_unavailable(*reason);
        }
        result
    }

    fn ensure_available(&self) -> Result<(), ShareError> {
        match self.session.availability() {
            LinkAvailability::Available => Ok(()),
            LinkAvailability::Unavailable(reason) => Err(ShareError::Unavailable(reason)),
        }
    }

    fn ensure_step(&self, expected: StepKind) -> Result<(), ShareError> {
        let actual = self.session.step().kind();
        if actual != expected {
            return Err(ShareError::InvalidStep { expected, actual });
        }
        Ok(())
    }

    fn require_token(&self) -> Result<AccessToken, ShareError> {
        self.ensure_available()?;
        self.session
            .access_token()
            .cloned()
            .ok_or_else(|| ShareError::InvalidStep {
                expected: StepKind::Files,
                actual: self.session.step().kind(),
            })
    }
}

impl Drop for ShareAccessFlow {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}
