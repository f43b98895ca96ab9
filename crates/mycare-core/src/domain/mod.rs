//! Domain entities and business logic
//!
//! This module contains the core domain types for share access:
//! - Newtypes for validated user input and opaque identifiers
//! - The share descriptor returned by the server
//! - The share session and its step state machine
//! - Presentation helpers (sizes, dates, labels)
//! - Domain-specific error types

pub mod errors;
pub mod format;
pub mod newtypes;
pub mod session;
pub mod share;

// Re-export commonly used types
pub use errors::{DomainError, RejectionKind, ShareError};
pub use newtypes::*;
pub use session::{ShareSession, Step, StepKind};
pub use share::{LinkAvailability, ShareExam, ShareFile, ShareInfo, UnavailableReason};
