pub mod browserless;
pub mod chrome;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use critbot_common::Config;
use typed_builder::TypedBuilder;

use crate::error::{ExtractError, RenderError};

pub use browserless::BrowserlessRenderer;
pub use chrome::ChromeRenderer;

/// Desktop Chrome user-agent presented by every render and static fetch.
pub const DESKTOP_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/118.0.0.0 Safari/537.36";

/// Element to wait for once the page has settled.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WaitFor {
    pub selector: String,
    pub timeout: Duration,
}

impl WaitFor {
    pub fn new(selector: impl Into<String>) -> Self {
        Self {
            selector: selector.into(),
            timeout: Duration::from_secs(5),
        }
    }

    /// Message recorded when the element never shows up.
    pub fn timeout_message(&self) -> String {
        format!(
            "Waiting for selector `{}` failed: {}ms exceeded",
            self.selector,
            self.timeout.as_millis()
        )
    }
}

/// Knobs for one render.
#[derive(Debug, Clone, TypedBuilder)]
pub struct RenderOptions {
    #[builder(default = (1280, 800))]
    pub viewport: (u32, u32),
    #[builder(default = DESKTOP_USER_AGENT.to_string(), setter(into))]
    pub user_agent: String,
    #[builder(default = Duration::from_secs(30))]
    pub navigation_timeout: Duration,
    /// Extra time after load for client-side rendering to finish.
    #[builder(default = Duration::from_secs(2))]
    pub settle_delay: Duration,
    #[builder(default, setter(strip_option))]
    pub wait_for: Option<WaitFor>,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self::builder().build()
    }
}

impl RenderOptions {
    /// Same options with a different element to wait for.
    pub fn waiting_for(&self, wait_for: Option<WaitFor>) -> Self {
        Self {
            wait_for,
            ..self.clone()
        }
    }
}

/// DOM after JS execution.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RenderedPage {
    pub html: String,
    pub title: String,
    /// Set when `wait_for` was requested and the element never appeared.
    pub wait_error: Option<String>,
}

#[async_trait]
pub trait PageRenderer: Send + Sync {
    async fn render(&self, url: &str, options: &RenderOptions) -> Result<RenderedPage, RenderError>;
    fn name(&self) -> &str;
}

/// Which rendering engine backs the render-capable path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PageBackend {
    Chrome { chrome_bin: String },
    Browserless { base_url: String, token: Option<String> },
    None,
}

impl PageBackend {
    pub fn from_config(config: &Config) -> Result<Self, ExtractError> {
        match config.page_backend.as_str() {
            "chrome" => Ok(PageBackend::Chrome {
                chrome_bin: config.chrome_bin.clone(),
            }),
            "browserless" => {
                let base_url = config.browserless_url.clone().ok_or_else(|| {
                    RenderError::Unavailable(
                        "PAGE_BACKEND=browserless requires BROWSERLESS_URL".to_string(),
                    )
                })?;
                Ok(PageBackend::Browserless {
                    base_url,
                    token: config.browserless_token.clone(),
                })
            }
            "none" => Ok(PageBackend::None),
            other => Err(RenderError::Unavailable(format!(
                "Unknown PAGE_BACKEND {other:?} (expected chrome, browserless or none)"
            ))
            .into()),
        }
    }

    pub fn into_renderer(self) -> Result<Option<Arc<dyn PageRenderer>>, ExtractError> {
        Ok(match self {
            PageBackend::Chrome { chrome_bin } => Some(Arc::new(ChromeRenderer::new(chrome_bin))),
            PageBackend::Browserless { base_url, token } => Some(Arc::new(
                BrowserlessRenderer::new(&base_url, token.as_deref())?,
            )),
            PageBackend::None => None,
        })
    }
}
