use std::time::Duration;

use async_trait::async_trait;
use scraper::{Html, Selector};
use tokio::sync::Semaphore;
use tracing::{info, warn};

use super::{PageRenderer, RenderOptions, RenderedPage};
use crate::dom::document_title;
use crate::error::RenderError;

/// Max concurrent Chromium processes. Each instance is heavy (~100MB+ RSS,
/// multiple child processes).
const MAX_CONCURRENT_CHROME: usize = 2;

/// Local headless Chromium, one process per render via `--dump-dom`.
pub struct ChromeRenderer {
    chrome_bin: String,
    semaphore: Semaphore,
}

impl ChromeRenderer {
    pub fn new(chrome_bin: impl Into<String>) -> Self {
        let chrome_bin = chrome_bin.into();
        info!(chrome_bin, max_concurrent = MAX_CONCURRENT_CHROME, "Using ChromeRenderer");
        Self {
            chrome_bin,
            semaphore: Semaphore::new(MAX_CONCURRENT_CHROME),
        }
    }

    fn args(url: &str, options: &RenderOptions, profile_dir: &std::path::Path) -> Vec<String> {
        let (width, height) = options.viewport;
        let wait_budget = options
            .wait_for
            .as_ref()
            .map(|w| w.timeout)
            .unwrap_or(Duration::ZERO);
        let virtual_time = options.settle_delay + wait_budget;

        vec![
            "--headless".to_string(),
            "--no-sandbox".to_string(),
            "--disable-gpu".to_string(),
            "--disable-dev-shm-usage".to_string(),
            format!("--window-size={width},{height}"),
            format!("--user-agent={}", options.user_agent),
            format!("--virtual-time-budget={}", virtual_time.as_millis()),
            format!("--user-data-dir={}", profile_dir.display()),
            "--dump-dom".to_string(),
            url.to_string(),
        ]
    }

    /// Launch Chrome and return the dumped DOM. The child is killed if the
    /// timeout fires or the future is dropped.
    async fn run_chrome(&self, url: &str, options: &RenderOptions) -> Result<String, RenderError> {
        let parsed = url::Url::parse(url).map_err(|e| RenderError::Failed(e.to_string()))?;
        if parsed.scheme() != "http" && parsed.scheme() != "https" {
            return Err(RenderError::Failed(format!(
                "Only http/https URLs are allowed, got: {}",
                parsed.scheme()
            )));
        }

        let profile = tempfile::tempdir()
            .map_err(|e| RenderError::Failed(format!("Failed to create temp profile dir: {e}")))?;

        let output = tokio::time::timeout(
            options.navigation_timeout,
            tokio::process::Command::new(&self.chrome_bin)
                .args(Self::args(url, options, profile.path()))
                .kill_on_drop(true)
                .output(),
        )
        .await
        .map_err(|_| RenderError::Timeout(options.navigation_timeout))?
        .map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => {
                RenderError::Unavailable(format!("{} not found", self.chrome_bin))
            }
            _ => RenderError::Failed(format!("Failed to run Chrome for {url}: {e}")),
        })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            warn!(url, renderer = "chrome", stderr = %stderr, "Chrome exited with error");
            return Err(RenderError::Failed(format!(
                "Chrome exited with {}",
                output.status
            )));
        }
        if output.stdout.is_empty() {
            return Err(RenderError::Failed("Chrome returned empty DOM".to_string()));
        }

        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

#[async_trait]
impl PageRenderer for ChromeRenderer {
    async fn render(&self, url: &str, options: &RenderOptions) -> Result<RenderedPage, RenderError> {
        let _permit = self
            .semaphore
            .acquire()
            .await
            .map_err(|_| RenderError::Unavailable("Chrome semaphore closed".to_string()))?;

        info!(url, renderer = "chrome", "Rendering URL");
        let html = self.run_chrome(url, options).await?;
        Ok(inspect_dump(html, options))
    }

    fn name(&self) -> &str {
        "chrome"
    }
}

/// Read the title and evaluate the element wait against a dumped DOM.
fn inspect_dump(html: String, options: &RenderOptions) -> RenderedPage {
    let doc = Html::parse_document(&html);
    let title = document_title(&doc);

    let wait_error = options.wait_for.as_ref().and_then(|wait| {
        match Selector::parse(&wait.selector) {
            Ok(sel) if doc.select(&sel).next().is_some() => None,
            Ok(_) => Some(wait.timeout_message()),
            Err(e) => Some(format!("Invalid selector `{}`: {e}", wait.selector)),
        }
    });

    RenderedPage {
        html,
        title,
        wait_error,
    }
}
