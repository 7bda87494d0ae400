use std::time::Duration;

use browserless_client::BrowserlessError;

/// Result type alias for extraction operations.
pub type Result<T> = std::result::Result<T, ExtractError>;

/// Fatal extraction failures. The caller treats any of these as "cannot
/// critique this URL".
#[derive(Debug, thiserror::Error)]
pub enum ExtractError {
    #[error("Invalid URL {url}: {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("Fetch failed for {url}: {source}")]
    Fetch {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("HTTP {status} fetching {url}")]
    Status { url: String, status: u16 },

    #[error("Renderer setup failed: {0}")]
    Renderer(#[from] RenderError),
}

/// Failures of the render-capable path. These never reach the caller of
/// `ContentExtractor::extract`; they trigger the static fallback instead.
#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    #[error("Renderer unavailable: {0}")]
    Unavailable(String),

    #[error("Render timed out after {0:?}")]
    Timeout(Duration),

    #[error("Render failed: {0}")]
    Failed(String),

    #[error(transparent)]
    Browserless(#[from] BrowserlessError),
}
