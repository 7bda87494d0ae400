// Test mocks for the critique and conversation pipelines.
//
// - MockModel (CompletionModel): scripted replies, records every request
// - MockExtractor (PageExtractor): HashMap-based URL→ExtractionResult

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;

use ai_client::{CompletionModel, CompletionRequest};
use anyhow::{anyhow, bail, Result};
use async_trait::async_trait;
use critbot_common::ExtractionResult;

use crate::traits::PageExtractor;

// ---------------------------------------------------------------------------
// MockModel
// ---------------------------------------------------------------------------

/// Replies are consumed in order; once exhausted every call fails.
pub struct MockModel {
    replies: Mutex<VecDeque<Result<String, String>>>,
    requests: Mutex<Vec<CompletionRequest>>,
}

impl MockModel {
    pub fn new() -> Self {
        Self {
            replies: Mutex::new(VecDeque::new()),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn reply(self, text: impl Into<String>) -> Self {
        self.push(Ok(text.into()))
    }

    pub fn fail(self, message: impl Into<String>) -> Self {
        self.push(Err(message.into()))
    }

    fn push(self, reply: Result<String, String>) -> Self {
        if let Ok(mut replies) = self.replies.lock() {
            replies.push_back(reply);
        }
        self
    }

    pub fn requests(&self) -> Vec<CompletionRequest> {
        self.requests.lock().map(|r| r.clone()).unwrap_or_default()
    }

    pub fn call_count(&self) -> usize {
        self.requests().len()
    }
}

impl Default for MockModel {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CompletionModel for MockModel {
    async fn complete(&self, request: CompletionRequest) -> Result<String> {
        if let Ok(mut requests) = self.requests.lock() {
            requests.push(request);
        }
        let next = self
            .replies
            .lock()
            .map_err(|_| anyhow!("MockModel lock poisoned"))?
            .pop_front();
        match next {
            Some(Ok(text)) => Ok(text),
            Some(Err(message)) => bail!(message),
            None => bail!("MockModel: no scripted reply left"),
        }
    }

    fn name(&self) -> &str {
        "mock-model"
    }
}

// ---------------------------------------------------------------------------
// MockExtractor
// ---------------------------------------------------------------------------

/// Returns `Err` for unregistered URLs.
pub struct MockExtractor {
    pages: HashMap<String, ExtractionResult>,
}

impl MockExtractor {
    pub fn new() -> Self {
        Self {
            pages: HashMap::new(),
        }
    }

    pub fn on_page(mut self, url: &str, title: &str, content: &str) -> Self {
        self.pages.insert(
            url.to_string(),
            ExtractionResult {
                content: content.to_string(),
                title: title.to_string(),
            },
        );
        self
    }
}

impl Default for MockExtractor {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PageExtractor for MockExtractor {
    async fn extract(&self, url: &str) -> Result<ExtractionResult> {
        match self.pages.get(url) {
            Some(page) => Ok(page.clone()),
            None => bail!("MockExtractor: no page for {url}"),
        }
    }
}
