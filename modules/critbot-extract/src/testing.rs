// Test mocks for the extractor.
//
// MockRenderer (PageRenderer): HashMap-based URL→RenderedPage, records
// every render call so tests can assert which path was taken.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;

use crate::error::RenderError;
use crate::render::{PageRenderer, RenderOptions, RenderedPage};

/// Returns `RenderError::Failed` for unregistered URLs.
pub struct MockRenderer {
    pages: HashMap<String, RenderedPage>,
    calls: Mutex<Vec<(String, RenderOptions)>>,
}

impl MockRenderer {
    pub fn new() -> Self {
        Self {
            pages: HashMap::new(),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn on_page(mut self, url: &str, page: RenderedPage) -> Self {
        self.pages.insert(url.to_string(), page);
        self
    }

    /// URLs rendered so far, in order.
    pub fn rendered_urls(&self) -> Vec<String> {
        self.calls
            .lock()
            .map(|calls| calls.iter().map(|(url, _)| url.clone()).collect())
            .unwrap_or_default()
    }

    /// Options passed to the most recent render.
    pub fn last_options(&self) -> Option<RenderOptions> {
        self.calls
            .lock()
            .ok()
            .and_then(|calls| calls.last().map(|(_, opts)| opts.clone()))
    }
}

impl Default for MockRenderer {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PageRenderer for MockRenderer {
    async fn render(&self, url: &str, options: &RenderOptions) -> Result<RenderedPage, RenderError> {
        if let Ok(mut calls) = self.calls.lock() {
            calls.push((url.to_string(), options.clone()));
        }
        self.pages
            .get(url)
            .cloned()
            .ok_or_else(|| RenderError::Failed(format!("MockRenderer: no page for {url}")))
    }

    fn name(&self) -> &str {
        "mock"
    }
}
