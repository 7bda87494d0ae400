mod client;
pub(crate) mod types;

use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use tracing::debug;

use crate::error::AiError;
use crate::traits::{CompletionModel, CompletionRequest, MessageRole};

use client::OpenAiClient;
use types::{uses_max_completion_tokens, ChatRequest, WireMessage};

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(120);

// =============================================================================
// OpenAi Model
// =============================================================================

#[derive(Clone)]
pub struct OpenAi {
    api_key: String,
    pub(crate) model: String,
    base_url: Option<String>,
    timeout: Duration,
}

impl OpenAi {
    pub fn new(api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            model: model.into(),
            base_url: None,
            timeout: DEFAULT_TIMEOUT,
        }
    }

    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = Some(url.into());
        self
    }

    /// Bound on a single request, including reading the response body.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Get the model name.
    pub fn model(&self) -> &str {
        &self.model
    }

    pub(crate) fn client(&self) -> Result<OpenAiClient, AiError> {
        let client = OpenAiClient::new(&self.api_key, self.timeout)?;
        Ok(match self.base_url {
            Some(ref url) => client.with_base_url(url),
            None => client,
        })
    }

    fn wire_request(&self, request: CompletionRequest) -> ChatRequest {
        let mut messages = Vec::with_capacity(request.messages.len() + 1);

        if let Some(preamble) = request.preamble {
            messages.push(WireMessage::system(preamble));
        }

        for msg in request.messages {
            messages.push(match msg.role {
                MessageRole::System => WireMessage::system(msg.content),
                MessageRole::User => WireMessage::user(msg.content),
                MessageRole::Assistant => WireMessage::assistant(msg.content),
            });
        }

        let mut wire = ChatRequest::new(&self.model).messages(messages);

        if uses_max_completion_tokens(&self.model) {
            wire.max_completion_tokens = request.max_tokens;
        } else {
            wire.max_tokens = request.max_tokens;
            wire.temperature = request.temperature;
            wire.top_p = request.top_p;
            wire.frequency_penalty = request.frequency_penalty;
            wire.presence_penalty = request.presence_penalty;
        }

        wire
    }
}

// =============================================================================
// CompletionModel Implementation
// =============================================================================

#[async_trait]
impl CompletionModel for OpenAi {
    async fn complete(&self, request: CompletionRequest) -> Result<String> {
        let wire = self.wire_request(request);
        let response = self.client()?.chat(&wire).await?;

        if let Some(ref usage) = response.usage {
            debug!(
                model = %self.model,
                prompt_tokens = usage.prompt_tokens,
                completion_tokens = usage.completion_tokens,
                total_tokens = usage.total_tokens,
                "OpenAI usage"
            );
        }

        let text = response
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or_else(|| AiError::EmptyResponse("OpenAI".to_string()))?;

        Ok(text)
    }

    fn name(&self) -> &str {
        &self.model
    }
}
