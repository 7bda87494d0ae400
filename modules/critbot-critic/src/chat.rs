use std::sync::Arc;

use ai_client::{CompletionModel, CompletionRequest, Message};
use anyhow::{Context, Result};
use critbot_common::ChatMessageRef;
use tracing::{info, warn};

use crate::prompts::PromptLoader;

/// History entries forwarded to the model, most recent last.
pub const HISTORY_WINDOW: usize = 10;

pub const APOLOGY: &str =
    "Sorry, I'm having trouble generating a response right now. Please try again later.";

/// Replies to a chat message in the bot persona, using recent history.
pub struct ConversationPipeline {
    model: Arc<dyn CompletionModel>,
    prompts: PromptLoader,
}

impl ConversationPipeline {
    pub fn new(model: Arc<dyn CompletionModel>, prompts: PromptLoader) -> Self {
        Self { model, prompts }
    }

    /// Never fails: any failure becomes [`APOLOGY`].
    pub async fn converse(&self, message: &ChatMessageRef, history: &[ChatMessageRef]) -> String {
        match self.reply(message, history).await {
            Ok(reply) => reply,
            Err(e) => {
                warn!(error = %e, "Failed to generate chat reply");
                APOLOGY.to_string()
            }
        }
    }

    async fn reply(&self, message: &ChatMessageRef, history: &[ChatMessageRef]) -> Result<String> {
        let persona = self.prompts.chat().await?;
        let messages = build_messages(message, history);
        info!(context_messages = messages.len() + 1, "Generating chat reply");

        let request = CompletionRequest::new()
            .preamble(persona)
            .messages(messages)
            .max_tokens(500)
            .temperature(0.7)
            .top_p(1.0)
            .frequency_penalty(0.2)
            .presence_penalty(0.5);

        let reply = self
            .model
            .complete(request)
            .await
            .with_context(|| format!("{} completion failed", self.model.name()))?;

        let reply = reply.trim().to_string();
        info!(chars = reply.chars().count(), "Generated chat reply");
        Ok(reply)
    }
}

/// Last [`HISTORY_WINDOW`] history entries then the current message. Bot
/// messages go in as the assistant, everything else as `"{name}: {body}"`.
pub fn build_messages(message: &ChatMessageRef, history: &[ChatMessageRef]) -> Vec<Message> {
    let start = history.len().saturating_sub(HISTORY_WINDOW);
    history[start..]
        .iter()
        .map(to_message)
        .chain(std::iter::once(Message::user(labelled(message))))
        .collect()
}

fn to_message(msg: &ChatMessageRef) -> Message {
    if msg.from_me {
        Message::assistant(msg.body.clone())
    } else {
        Message::user(labelled(msg))
    }
}

fn labelled(msg: &ChatMessageRef) -> String {
    format!("{}: {}", msg.display_name(), msg.body)
}
