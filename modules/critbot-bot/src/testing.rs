// Test mocks for the bot.
//
// - MockTransport (Transport): HashMap-based chats and history, records
//   everything the bot sends

use std::collections::HashMap;
use std::sync::Mutex;

use anyhow::{anyhow, Result};
use async_trait::async_trait;

use crate::transport::{ChatInfo, InboundMessage, Transport};

/// One outbound action, in the order the bot performed it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Sent {
    Reply { to: String, text: String },
    Reaction { to: String, emoji: String },
    Message { chat_id: String, text: String },
    Typing { chat_id: String },
}

pub struct MockTransport {
    own_id: String,
    chats: Vec<ChatInfo>,
    history: HashMap<String, Vec<InboundMessage>>,
    fail_chats: bool,
    sent: Mutex<Vec<Sent>>,
}

impl MockTransport {
    pub fn new() -> Self {
        Self {
            own_id: "15550000000@c.us".to_string(),
            chats: Vec::new(),
            history: HashMap::new(),
            fail_chats: false,
            sent: Mutex::new(Vec::new()),
        }
    }

    pub fn with_own_id(mut self, id: impl Into<String>) -> Self {
        self.own_id = id.into();
        self
    }

    pub fn with_chat(mut self, id: &str, name: &str, is_group: Option<bool>) -> Self {
        self.chats.push(ChatInfo {
            id: id.to_string(),
            name: name.to_string(),
            is_group,
            participants: None,
        });
        self
    }

    pub fn with_history(mut self, chat_id: &str, messages: Vec<InboundMessage>) -> Self {
        self.history.insert(chat_id.to_string(), messages);
        self
    }

    /// Every chat lookup fails.
    pub fn failing_chats(mut self) -> Self {
        self.fail_chats = true;
        self
    }

    pub fn sent(&self) -> Vec<Sent> {
        self.sent.lock().map(|s| s.clone()).unwrap_or_default()
    }

    /// Texts of all replies, in order.
    pub fn replies(&self) -> Vec<String> {
        self.sent()
            .into_iter()
            .filter_map(|s| match s {
                Sent::Reply { text, .. } => Some(text),
                _ => None,
            })
            .collect()
    }

    pub fn reactions(&self) -> Vec<String> {
        self.sent()
            .into_iter()
            .filter_map(|s| match s {
                Sent::Reaction { emoji, .. } => Some(emoji),
                _ => None,
            })
            .collect()
    }

    pub fn messages_to(&self, chat_id: &str) -> Vec<String> {
        self.sent()
            .into_iter()
            .filter_map(|s| match s {
                Sent::Message { chat_id: c, text } if c == chat_id => Some(text),
                _ => None,
            })
            .collect()
    }

    fn record(&self, sent: Sent) {
        if let Ok(mut log) = self.sent.lock() {
            log.push(sent);
        }
    }
}

impl Default for MockTransport {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn own_id(&self) -> Result<String> {
        Ok(self.own_id.clone())
    }

    async fn reply(&self, to: &InboundMessage, text: &str) -> Result<()> {
        self.record(Sent::Reply {
            to: to.id.clone(),
            text: text.to_string(),
        });
        Ok(())
    }

    async fn react(&self, to: &InboundMessage, emoji: &str) -> Result<()> {
        self.record(Sent::Reaction {
            to: to.id.clone(),
            emoji: emoji.to_string(),
        });
        Ok(())
    }

    async fn send_message(&self, chat_id: &str, text: &str) -> Result<()> {
        self.record(Sent::Message {
            chat_id: chat_id.to_string(),
            text: text.to_string(),
        });
        Ok(())
    }

    async fn send_typing(&self, chat_id: &str) -> Result<()> {
        self.record(Sent::Typing {
            chat_id: chat_id.to_string(),
        });
        Ok(())
    }

    async fn fetch_messages(&self, chat_id: &str, limit: usize) -> Result<Vec<InboundMessage>> {
        let messages = self.history.get(chat_id).cloned().unwrap_or_default();
        Ok(messages.into_iter().take(limit).collect())
    }

    async fn chats(&self) -> Result<Vec<ChatInfo>> {
        if self.fail_chats {
            return Err(anyhow!("bridge unavailable"));
        }
        Ok(self.chats.clone())
    }

    async fn chat(&self, chat_id: &str) -> Result<ChatInfo> {
        self.chats()
            .await?
            .into_iter()
            .find(|c| c.id == chat_id)
            .ok_or_else(|| anyhow!("Chat {chat_id} not found"))
    }
}
