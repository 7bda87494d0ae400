// PageExtractor sits between the critique pipeline and the content
// extractor so the pipeline can be tested without HTTP or a browser.

use anyhow::Result;
use async_trait::async_trait;
use critbot_common::ExtractionResult;

#[async_trait]
pub trait PageExtractor: Send + Sync {
    async fn extract(&self, url: &str) -> Result<ExtractionResult>;
}

#[async_trait]
impl PageExtractor for critbot_extract::ContentExtractor {
    async fn extract(&self, url: &str) -> Result<ExtractionResult> {
        Ok(critbot_extract::ContentExtractor::extract(self, url).await?)
    }
}
