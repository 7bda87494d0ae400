use std::borrow::Cow;
use std::sync::Arc;

use ai_client::{CompletionModel, CompletionRequest, Message};
use anyhow::{Context, Result};
use chrono::Utc;
use critbot_common::{CritiqueRecord, CritiqueResult, ExtractionResult};
use tracing::{info, warn};

use crate::parser::{parse_score, parse_summary};
use crate::prompts::PromptLoader;
use crate::store::{record_timestamp, CritiqueStore};
use crate::traits::PageExtractor;

/// Longest content (in characters) sent to the model or persisted.
pub const MAX_CONTENT_CHARS: usize = 10_000;
pub const TRUNCATION_MARKER: &str = "... [content truncated]";

const MAX_TOKENS: u32 = 800;
const TEMPERATURE: f32 = 0.7;

/// Cut `content` to [`MAX_CONTENT_CHARS`] characters, appending the marker
/// when anything was dropped. Content within the limit is borrowed as-is.
pub fn truncate_content(content: &str) -> Cow<'_, str> {
    match content.char_indices().nth(MAX_CONTENT_CHARS) {
        Some((cut, _)) => Cow::Owned(format!("{}{TRUNCATION_MARKER}", &content[..cut])),
        None => Cow::Borrowed(content),
    }
}

fn user_prompt(url: &str, content: &str) -> String {
    format!("URL: {url}\n\nContent to analyze:\n===\n{content}\n===")
}

/// URL → extracted text → model critique → parsed summary and score →
/// persisted record.
pub struct CritiquePipeline {
    extractor: Arc<dyn PageExtractor>,
    model: Arc<dyn CompletionModel>,
    prompts: PromptLoader,
    store: CritiqueStore,
}

impl CritiquePipeline {
    pub fn new(
        extractor: Arc<dyn PageExtractor>,
        model: Arc<dyn CompletionModel>,
        prompts: PromptLoader,
        store: CritiqueStore,
    ) -> Self {
        Self {
            extractor,
            model,
            prompts,
            store,
        }
    }

    /// Full critique of one URL. Never fails: any failure becomes
    /// [`CritiqueResult::analysis_error`].
    pub async fn critique(&self, url: &str) -> CritiqueResult {
        match self.extract(url).await {
            Ok(extraction) => self.critique_extracted(url, &extraction).await,
            Err(e) => {
                warn!(url, error = %e, "Cannot critique URL: extraction failed");
                CritiqueResult::analysis_error()
            }
        }
    }

    /// Extraction step on its own, for callers that answer extraction
    /// failures differently from model failures.
    pub async fn extract(&self, url: &str) -> Result<ExtractionResult> {
        self.extractor
            .extract(url)
            .await
            .with_context(|| format!("Failed to extract {url}"))
    }

    /// Critique already-extracted content. Never fails.
    pub async fn critique_extracted(&self, url: &str, extraction: &ExtractionResult) -> CritiqueResult {
        let result = match self.analyze(url, &extraction.content).await {
            Ok(result) => result,
            Err(e) => {
                warn!(url, error = %e, "Critique failed");
                return CritiqueResult::analysis_error();
            }
        };

        let record = CritiqueRecord {
            title: extraction.title.clone(),
            url: url.to_string(),
            timestamp: record_timestamp(Utc::now()),
            content: extraction.content.chars().take(MAX_CONTENT_CHARS).collect(),
            criticism: result.criticism.clone(),
            summary: result.summary.clone(),
            score: result.score_number,
        };
        if let Err(e) = self.store.save(&record).await {
            warn!(url, error = %e, "Failed to save critique");
        }

        result
    }

    async fn analyze(&self, url: &str, content: &str) -> Result<CritiqueResult> {
        let content = truncate_content(content);
        info!(url, chars = content.chars().count(), "Analyzing content");

        let persona = self.prompts.critic().await?;
        let request = CompletionRequest::new()
            .preamble(persona)
            .message(Message::user(user_prompt(url, &content)))
            .max_tokens(MAX_TOKENS)
            .temperature(TEMPERATURE);

        let criticism = self
            .model
            .complete(request)
            .await
            .with_context(|| format!("{} completion failed", self.model.name()))?
            .trim()
            .to_string();

        let summary = parse_summary(&criticism);
        let score = parse_score(&criticism);
        info!(
            url,
            score = score.number,
            emoji = score.emoji.unwrap_or("none"),
            "Analysis complete"
        );

        Ok(CritiqueResult {
            criticism,
            summary,
            score_number: score.number,
            score_emoji: score.emoji,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_content_passes_through_borrowed() {
        let content = "a".repeat(MAX_CONTENT_CHARS);
        assert!(matches!(truncate_content(&content), Cow::Borrowed(_)));
    }

    #[test]
    fn long_content_gets_marker_once() {
        let content = "é".repeat(MAX_CONTENT_CHARS + 5);
        let truncated = truncate_content(&content);
        assert_eq!(truncated.chars().count(), MAX_CONTENT_CHARS + TRUNCATION_MARKER.len());
        assert!(truncated.ends_with(TRUNCATION_MARKER));
        assert_eq!(truncated.matches(TRUNCATION_MARKER).count(), 1);
    }

    #[test]
    fn user_prompt_layout() {
        assert_eq!(
            user_prompt("https://a.b", "text"),
            "URL: https://a.b\n\nContent to analyze:\n===\ntext\n==="
        );
    }
}
