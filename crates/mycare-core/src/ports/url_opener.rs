//! URL opener port
//!
//! Hands a URL to the platform (default browser, OS handler). Used as the
//! second tier of the download fallback when the authenticated fetch fails.

/// Port trait for opening a URL outside the application
pub trait IUrlOpener: Send + Sync {
    /// Opens `url` with the platform handler
    ///
    /// # Errors
    /// Returns an error if no handler could be launched
    fn open(&self, url: &str) -> anyhow::Result<()>;
}
