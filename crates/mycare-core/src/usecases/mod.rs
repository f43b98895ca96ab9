//! Use cases (interactors) for MyCare
//!
//! Use cases orchestrate domain entities and port interfaces. Business
//! rules live on the domain types; I/O goes through the ports.
//!
//! ## Use Cases
//!
//! - [`ShareAccessFlow`] - Email → OTP → files wizard for a share link
//! - [`classify`] - Maps port failures to [`ShareError`](crate::domain::ShareError)

pub mod access_share;
pub mod classify_failure;

pub use access_share::{DownloadOutcome, ShareAccessFlow};
pub use classify_failure::{classify, Operation};
