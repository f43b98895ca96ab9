//! Domain newtypes with validation
//!
//! This module provides strongly-typed wrappers for share identifiers and
//! user input. Each newtype ensures data validity at construction time, so
//! the share-access flow never sends a request built from malformed input.

use std::fmt::{self, Debug, Display, Formatter};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::errors::DomainError;

/// Maximum accepted length of a share code
const MAX_SHARE_CODE_LEN: usize = 128;

/// Number of digits in a one-time password
pub const OTP_LENGTH: usize = 6;

/// Path segments that precede the code in a share link
/// (`https://host/s/{code}` and the app deep link `mycare://share/{code}`)
const SHARE_LINK_MARKERS: &[&str] = &["s", "share"];

// ============================================================================
// ShareCode
// ============================================================================

/// Opaque share identifier taken from a share link
///
/// Rejects empty codes and anything that would alter the request path
/// (whitespace, `/`, `?`, `#`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ShareCode(String);

impl ShareCode {
    /// Create a new validated ShareCode
    ///
    /// # Errors
    /// Returns error if the code is empty, too long, or contains path characters
    pub fn new(code: String) -> Result<Self, DomainError> {
        let code = code.trim().to_string();
        if code.is_empty() {
            return Err(DomainError::InvalidShareCode(
                "Share code cannot be empty".to_string(),
            ));
        }
        if code.len() > MAX_SHARE_CODE_LEN {
            return Err(DomainError::InvalidShareCode(format!(
                "Share code too long (max {MAX_SHARE_CODE_LEN} chars)"
            )));
        }
        if code
            .chars()
            .any(|c| c.is_whitespace() || c.is_control() || "/?#".contains(c))
        {
            return Err(DomainError::InvalidShareCode(format!(
                "Share code contains invalid characters: {code}"
            )));
        }
        Ok(Self(code))
    }

    /// Extracts the share code from a share link or returns the bare code
    ///
    /// Accepts `https://host/s/{code}`, `mycare://share/{code}`, `/s/{code}`,
    /// and a plain code. Query strings and fragments are ignored.
    ///
    /// # Errors
    /// Returns error if no valid code can be found in the input
    pub fn from_link(input: &str) -> Result<Self, DomainError> {
        let input = input.trim();
        if !input.contains('/') {
            return Self::new(input.to_string());
        }

        let (host, path): (Option<String>, Vec<String>) = match url::Url::parse(input) {
            Ok(parsed) => (
                parsed.host_str().map(str::to_string),
                parsed
                    .path_segments()
                    .map(|segments| segments.map(str::to_string).collect())
                    .unwrap_or_default(),
            ),
            Err(_) => (
                None,
                input
                    .split(['?', '#'])
                    .next()
                    .unwrap_or_default()
                    .split('/')
                    .map(str::to_string)
                    .collect(),
            ),
        };

        let path: Vec<&str> = path
            .iter()
            .map(String::as_str)
            .filter(|s| !s.is_empty())
            .collect();

        // Deep links carry the marker as the host: mycare://share/{code}
        let after_host_marker = host
            .as_deref()
            .filter(|h| SHARE_LINK_MARKERS.contains(h))
            .and_then(|_| path.first().copied());

        let code = path
            .windows(2)
            .rev()
            .find(|pair| SHARE_LINK_MARKERS.contains(&pair[0]))
            .map(|pair| pair[1])
            .or(after_host_marker)
            .or_else(|| path.last().copied())
            .ok_or_else(|| {
                DomainError::InvalidShareCode(format!("No share code in link: {input}"))
            })?;

        Self::new(code.to_string())
    }

    /// Get the inner string reference
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for ShareCode {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for ShareCode {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_link(s)
    }
}

impl TryFrom<String> for ShareCode {
    type Error = DomainError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::new(s)
    }
}

impl From<ShareCode> for String {
    fn from(code: ShareCode) -> Self {
        code.0
    }
}

// ============================================================================
// Email type
// ============================================================================

/// Validated recipient email address
///
/// Performs the basic structural check the share screens apply before
/// contacting the server:
/// - No whitespace
/// - Contains exactly one @ with a non-empty local part
/// - Has a domain with at least one dot and text on both sides of it
///
/// Deliverability is not checked and case is preserved; whether the email
/// matches the share is decided by the server.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Email(String);

impl Email {
    /// Create a new validated Email (surrounding whitespace is trimmed)
    ///
    /// # Errors
    /// Returns error if the email format is invalid
    pub fn new(email: String) -> Result<Self, DomainError> {
        let email = email.trim().to_string();
        Self::validate(&email)?;
        Ok(Self(email))
    }

    /// Get the inner string reference
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Get the domain part (after @)
    #[must_use]
    pub fn domain(&self) -> &str {
        self.0.split('@').nth(1).unwrap_or("")
    }

    fn validate(email: &str) -> Result<(), DomainError> {
        if email.is_empty() {
            return Err(DomainError::InvalidEmail(
                "Email cannot be empty".to_string(),
            ));
        }

        if email.chars().any(char::is_whitespace) {
            return Err(DomainError::InvalidEmail(format!(
                "Email cannot contain whitespace: {email}"
            )));
        }

        let Some((local, domain)) = email.split_once('@') else {
            return Err(DomainError::InvalidEmail(format!(
                "Email must contain '@': {email}"
            )));
        };

        if domain.contains('@') {
            return Err(DomainError::InvalidEmail(format!(
                "Email must contain exactly one '@': {email}"
            )));
        }

        if local.is_empty() {
            return Err(DomainError::InvalidEmail(format!(
                "Email local part cannot be empty: {email}"
            )));
        }

        // Domain needs a dot with at least one character before and after it
        let has_dotted_domain = domain
            .char_indices()
            .any(|(i, c)| c == '.' && i > 0 && i + 1 < domain.len());
        if !has_dotted_domain {
            return Err(DomainError::InvalidEmail(format!(
                "Email domain must contain a dot: {email}"
            )));
        }

        Ok(())
    }
}

impl Display for Email {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for Email {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s.to_string())
    }
}

impl TryFrom<String> for Email {
    type Error = DomainError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::new(s)
    }
}

impl From<Email> for String {
    fn from(email: Email) -> Self {
        email.0
    }
}

// ============================================================================
// Otp
// ============================================================================

/// Six-digit one-time password sent to the recipient by email
#[derive(Clone, PartialEq, Eq)]
pub struct Otp(String);

impl Otp {
    /// Create a new validated Otp (surrounding whitespace is trimmed)
    ///
    /// # Errors
    /// Returns error unless the input is exactly six ASCII digits
    pub fn new(otp: &str) -> Result<Self, DomainError> {
        let otp = otp.trim();
        if otp.chars().count() != OTP_LENGTH {
            return Err(DomainError::InvalidOtp(format!(
                "OTP must have {OTP_LENGTH} digits, got {}",
                otp.chars().count()
            )));
        }
        if !otp.chars().all(|c| c.is_ascii_digit()) {
            return Err(DomainError::InvalidOtp(
                "OTP must contain only digits".to_string(),
            ));
        }
        Ok(Self(otp.to_string()))
    }

    /// Get the inner string reference
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Debug for Otp {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str("Otp(******)")
    }
}

// ============================================================================
// AccessToken
// ============================================================================

/// Bearer credential issued after OTP validation
///
/// Lives only in memory for the duration of one share session. It is not
/// serializable and its `Debug` output is redacted so it never reaches logs.
#[derive(Clone, PartialEq, Eq)]
pub struct AccessToken(String);

impl AccessToken {
    /// Create a new AccessToken
    ///
    /// # Errors
    /// Returns error if the token is empty
    pub fn new(token: String) -> Result<Self, DomainError> {
        if token.trim().is_empty() {
            return Err(DomainError::InvalidAccessToken(
                "Access token cannot be empty".to_string(),
            ));
        }
        Ok(Self(token))
    }

    /// Get the raw token for the `Authorization` header
    #[must_use]
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl Debug for AccessToken {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str("AccessToken(<redacted>)")
    }
}

// ============================================================================
// MediaId
// ============================================================================

/// Identifier of a single shared file
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct MediaId(String);

impl MediaId {
    /// Create a new MediaId
    ///
    /// # Errors
    /// Returns error if the ID is empty or contains path characters
    pub fn new(id: String) -> Result<Self, DomainError> {
        let id = id.trim().to_string();
        if id.is_empty() {
            return Err(DomainError::InvalidMediaId(
                "Media ID cannot be empty".to_string(),
            ));
        }
        if id.chars().any(|c| c.is_whitespace() || "/?#".contains(c)) {
            return Err(DomainError::InvalidMediaId(format!(
                "Media ID contains invalid characters: {id}"
            )));
        }
        Ok(Self(id))
    }

    /// Get the inner string reference
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for MediaId {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl TryFrom<String> for MediaId {
    type Error = DomainError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::new(s)
    }
}

impl From<MediaId> for String {
    fn from(id: MediaId) -> Self {
        id.0
    }
}

// ============================================================================
// Tests
// ============================================================================
