// Transport: everything the bot needs from the messaging network.
//
// The dispatcher only talks to this trait. BridgeTransport speaks to a
// WhatsApp HTTP bridge; MockTransport (crate::testing) records calls.

pub mod bridge;

use anyhow::Result;
use async_trait::async_trait;
use critbot_common::ChatMessageRef;

pub use bridge::BridgeTransport;

/// Group chat ids carry this suffix.
pub const GROUP_SUFFIX: &str = "@g.us";
/// Direct chat ids carry this suffix.
pub const USER_SUFFIX: &str = "@c.us";

pub fn is_group_id(id: &str) -> bool {
    id.ends_with(GROUP_SUFFIX)
}

/// The part of a chat id before `@` (a phone number for direct chats).
pub fn user_part(id: &str) -> &str {
    id.split('@').next().unwrap_or(id)
}

/// One chat message as delivered by the transport.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct InboundMessage {
    pub id: String,
    /// Chat the message arrived in (the group id for group messages).
    pub chat_id: String,
    pub body: String,
    /// Unix seconds.
    pub timestamp: i64,
    pub from_me: bool,
    pub sender_name: Option<String>,
    pub mentioned_ids: Vec<String>,
    /// The message quotes one the bot sent.
    pub quoted_from_me: bool,
}

impl InboundMessage {
    pub fn as_chat_ref(&self) -> ChatMessageRef {
        ChatMessageRef::new(self.body.clone(), self.from_me, self.sender_name.clone())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatInfo {
    pub id: String,
    pub name: String,
    /// What the network reports; may disagree with the id suffix.
    pub is_group: Option<bool>,
    pub participants: Option<usize>,
}

impl ChatInfo {
    /// Group by either the reported flag or the id suffix.
    pub fn looks_like_group(&self) -> bool {
        self.is_group == Some(true) || is_group_id(&self.id)
    }

    /// The reported flag and the id suffix disagree.
    pub fn group_flag_mismatch(&self) -> bool {
        (self.is_group == Some(true)) != is_group_id(&self.id)
    }
}

#[async_trait]
pub trait Transport: Send + Sync {
    /// The bot's own chat id, e.g. `15551234567@c.us`.
    async fn own_id(&self) -> Result<String>;

    /// Reply quoting `to`.
    async fn reply(&self, to: &InboundMessage, text: &str) -> Result<()>;

    async fn react(&self, to: &InboundMessage, emoji: &str) -> Result<()>;

    async fn send_message(&self, chat_id: &str, text: &str) -> Result<()>;

    async fn send_typing(&self, chat_id: &str) -> Result<()>;

    /// Up to `limit` most recent messages of a chat, in any order.
    async fn fetch_messages(&self, chat_id: &str, limit: usize) -> Result<Vec<InboundMessage>>;

    async fn chats(&self) -> Result<Vec<ChatInfo>>;

    /// Errors when the chat is unknown.
    async fn chat(&self, chat_id: &str) -> Result<ChatInfo>;
}
