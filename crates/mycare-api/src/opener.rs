//! Default-browser URL opener

use anyhow::Context;
use mycare_core::ports::IUrlOpener;
use tracing::info;

/// Opens URLs with the platform's default browser
#[derive(Debug, Default, Clone, Copy)]
pub struct BrowserUrlOpener;

impl IUrlOpener for BrowserUrlOpener {
    fn open(&self, url: &str) -> anyhow::Result<()> {
        info!(url = %url, "Opening URL in browser");
        webbrowser::open(url).context("Failed to open browser")?;
        Ok(())
    }
}
