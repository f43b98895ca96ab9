//! Share descriptor entities
//!
//! The share descriptor is the server's summary of a share link: the exams
//! it grants access to, their files, and the usage/expiry state of the link.
//! Field names follow the JSON the share endpoints return (camelCase).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use super::format::parse_timestamp;
use super::newtypes::{MediaId, ShareCode};

/// A file attached to a shared exam
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShareFile {
    /// Media identifier used by the download endpoint
    pub id: MediaId,
    /// Media category reported by the server (`pdf`, `image`, ...)
    #[serde(default)]
    pub media_type: String,
    /// Original file name
    pub file_name: String,
    /// Size in bytes
    #[serde(default)]
    pub file_size: u64,
    /// Server-relative download path
    #[serde(default)]
    pub download_url: Option<String>,
}

impl ShareFile {
    /// Returns true if the file is a PDF document
    pub fn is_pdf(&self) -> bool {
        self.media_type.eq_ignore_ascii_case("pdf")
            || self.file_name.to_ascii_lowercase().ends_with(".pdf")
    }
}

/// An exam included in a share
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShareExam {
    /// Exam identifier
    pub id: String,
    /// Exam name
    pub name: String,
    /// Exam date as sent by the server (ISO 8601 date or timestamp)
    #[serde(default)]
    pub exam_date: Option<String>,
    /// Free-text notes written by the exam owner
    #[serde(default)]
    pub notes: Option<String>,
    /// Tags attached to the exam
    #[serde(default)]
    pub tags: Vec<String>,
    /// Files attached to the exam
    #[serde(default)]
    pub files: Vec<ShareFile>,
    /// Whether the server reports a PDF attachment
    #[serde(default)]
    pub has_pdf: bool,
}

/// Why a share link can no longer be used
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnavailableReason {
    /// The owner revoked the link
    Revoked,
    /// The link passed its expiry date
    Expired,
    /// The link was opened the maximum number of times
    MaxUsesReached,
}

impl UnavailableReason {
    /// Title shown on the unavailable screen
    pub const TITLE: &'static str = "Compartilhamento Indisponível";

    /// Explanation shown below the title
    pub fn message(&self) -> &'static str {
        match self {
            UnavailableReason::Revoked => "Este compartilhamento foi revogado pelo proprietário.",
            UnavailableReason::Expired => "Este compartilhamento expirou.",
            UnavailableReason::MaxUsesReached => {
                "Este compartilhamento atingiu o limite máximo de usos."
            }
        }
    }
}

impl std::fmt::Display for UnavailableReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            UnavailableReason::Revoked => write!(f, "revoked"),
            UnavailableReason::Expired => write!(f, "expired"),
            UnavailableReason::MaxUsesReached => write!(f, "max_uses_reached"),
        }
    }
}

/// Gating decision derived from the share descriptor
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkAvailability {
    /// The wizard may proceed
    Available,
    /// The link is terminally unusable; only "go back" is offered
    Unavailable(UnavailableReason),
}

impl LinkAvailability {
    /// Returns true if the link can still be used
    pub fn is_available(&self) -> bool {
        matches!(self, LinkAvailability::Available)
    }
}

/// Server-provided share descriptor
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShareInfo {
    /// Share code the descriptor belongs to
    pub code: ShareCode,
    /// Shared exams
    #[serde(default)]
    pub exams: Vec<ShareExam>,
    /// When the link expires; unparsable values are dropped
    #[serde(default, deserialize_with = "lenient_timestamp")]
    pub expires_at: Option<DateTime<Utc>>,
    /// Maximum number of uses allowed
    #[serde(default)]
    pub max_uses: Option<u32>,
    /// Number of times the link has been used
    #[serde(default)]
    pub times_used: u32,
    /// Server-relative path of the zip download
    #[serde(default)]
    pub download_all_url: Option<String>,
    /// The owner revoked the link
    #[serde(default)]
    pub is_revoked: bool,
    /// The link expired
    #[serde(default)]
    pub is_expired: bool,
    /// The link reached its maximum number of uses
    #[serde(default)]
    pub is_max_uses_reached: bool,
}

/// Reads an optional timestamp without failing the surrounding descriptor
///
/// Strings go through [`parse_timestamp`]; numbers are epoch milliseconds.
fn lenient_timestamp<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(Value::String(s)) => parse_timestamp(&s),
        Some(Value::Number(n)) => n.as_i64().and_then(DateTime::from_timestamp_millis),
        _ => None,
    })
}

impl ShareInfo {
    /// Computes the gating decision for this descriptor
    ///
    /// Revocation takes precedence over expiry, which takes precedence over
    /// the usage limit. Only the server-provided flags are consulted; the
    /// client never decides expiry from its own clock.
    pub fn availability(&self) -> LinkAvailability {
        if self.is_revoked {
            LinkAvailability::Unavailable(UnavailableReason::Revoked)
        } else if self.is_expired {
            LinkAvailability::Unavailable(UnavailableReason::Expired)
        } else if self.is_max_uses_reached {
            LinkAvailability::Unavailable(UnavailableReason::MaxUsesReached)
        } else {
            LinkAvailability::Available
        }
    }

    /// Returns true if at least one exam has a downloadable file
    pub fn has_files(&self) -> bool {
        self.exams.iter().any(|exam| !exam.files.is_empty())
    }

    /// Total number of files across all exams
    pub fn file_count(&self) -> usize {
        self.exams.iter().map(|exam| exam.files.len()).sum()
    }

    /// Iterates over every file together with the exam it belongs to
    pub fn files(&self) -> impl Iterator<Item = (&ShareExam, &ShareFile)> {
        self.exams
            .iter()
            .flat_map(|exam| exam.files.iter().map(move |file| (exam, file)))
    }

    /// Looks up a file by its media ID
    pub fn find_file(&self, id: &MediaId) -> Option<&ShareFile> {
        self.files().map(|(_, file)| file).find(|file| &file.id == id)
    }

    /// Remaining uses, if the link has a usage limit
    pub fn remaining_uses(&self) -> Option<u32> {
        self.max_uses.map(|max| max.saturating_sub(self.times_used))
    }
}
