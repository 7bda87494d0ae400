use std::time::Duration;

use async_trait::async_trait;
use browserless_client::BrowserlessClient;
use serde::Deserialize;
use tracing::info;

use super::{PageRenderer, RenderOptions, RenderedPage};
use crate::error::RenderError;

/// Puppeteer function run inside the Browserless session.
const RENDER_FUNCTION: &str = r#"
module.exports = async ({ page, context }) => {
  await page.setViewport({ width: context.width, height: context.height });
  await page.setUserAgent(context.userAgent);
  page.setDefaultNavigationTimeout(context.navigationTimeoutMs);
  await page.goto(context.url, { waitUntil: 'networkidle2' });
  await new Promise((resolve) => setTimeout(resolve, context.settleMs));
  const title = await page.title();
  let waitError = null;
  if (context.waitSelector) {
    try {
      await page.waitForSelector(context.waitSelector, { timeout: context.waitTimeoutMs });
    } catch (err) {
      waitError = err.message;
    }
  }
  const html = await page.content();
  return { data: { title, html, waitError }, type: 'application/json' };
};
"#;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct FunctionOutput {
    #[serde(default)]
    title: String,
    #[serde(default)]
    html: String,
    #[serde(default)]
    wait_error: Option<String>,
}

/// Remote rendering through a Browserless `/function` endpoint.
pub struct BrowserlessRenderer {
    client: BrowserlessClient,
}

impl BrowserlessRenderer {
    pub fn new(base_url: &str, token: Option<&str>) -> Result<Self, RenderError> {
        // Navigation + settle + wait, with headroom for session setup.
        let client = BrowserlessClient::new(base_url, token, Duration::from_secs(60))?;
        info!(base_url, "Using BrowserlessRenderer");
        Ok(Self { client })
    }

    fn context(url: &str, options: &RenderOptions) -> serde_json::Value {
        let (width, height) = options.viewport;
        serde_json::json!({
            "url": url,
            "width": width,
            "height": height,
            "userAgent": options.user_agent,
            "navigationTimeoutMs": options.navigation_timeout.as_millis() as u64,
            "settleMs": options.settle_delay.as_millis() as u64,
            "waitSelector": options.wait_for.as_ref().map(|w| w.selector.clone()),
            "waitTimeoutMs": options.wait_for.as_ref().map(|w| w.timeout.as_millis() as u64),
        })
    }
}

#[async_trait]
impl PageRenderer for BrowserlessRenderer {
    async fn render(&self, url: &str, options: &RenderOptions) -> Result<RenderedPage, RenderError> {
        info!(url, renderer = "browserless", "Rendering URL");
        let output: FunctionOutput = self
            .client
            .function(RENDER_FUNCTION, Self::context(url, options))
            .await?;

        Ok(RenderedPage {
            html: output.html,
            title: output.title.trim().to_string(),
            wait_error: output.wait_error,
        })
    }

    fn name(&self) -> &str {
        "browserless"
    }
}
