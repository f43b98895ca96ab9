//! Port definitions (hexagonal architecture interfaces)
//!
//! Ports are interfaces that the domain core depends on, but whose
//! implementations live in adapter crates.
//!
//! ## Ports Overview
//!
//! - [`IShareLinkApi`] - Share-link endpoints of the MyCare server
//! - [`IUrlOpener`] - Platform mechanism for opening a URL externally

pub mod share_link;
pub mod url_opener;

pub use share_link::{DownloadedFile, IShareLinkApi, RemoteError};
pub use url_opener::IUrlOpener;
