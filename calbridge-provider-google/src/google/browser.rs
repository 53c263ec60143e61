use calbridge_core::target::PresentationSurface;

/// Presents sign-in pages in the system browser.
#[derive(Debug, Default, Clone, Copy)]
pub struct BrowserSurface;

impl PresentationSurface for BrowserSurface {
    fn present_sign_in(&self, url: &str) -> std::io::Result<()> {
        tracing::info!(url, "opening sign-in page in the browser");
        open::that(url)
    }
}
