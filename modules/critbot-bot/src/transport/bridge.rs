use std::time::Duration;

use anyhow::{anyhow, bail, Context, Result};
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::json;
use tokio::sync::OnceCell;
use tracing::debug;

use super::{ChatInfo, InboundMessage, Transport};
use crate::inbox::BotEvent;

// ---------------------------------------------------------------------------
// Wire types
// ---------------------------------------------------------------------------

/// Chat / contact ids arrive either as plain strings or as
/// `{ "_serialized": "..." }` objects depending on the bridge engine.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
enum WireId {
    Plain(String),
    Object {
        #[serde(rename = "_serialized")]
        serialized: String,
    },
}

impl WireId {
    fn into_string(self) -> String {
        match self {
            WireId::Plain(s) => s,
            WireId::Object { serialized } => serialized,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireChat {
    id: WireId,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    is_group: Option<bool>,
    #[serde(default)]
    group_metadata: Option<WireGroupMetadata>,
}

#[derive(Debug, Deserialize)]
struct WireGroupMetadata {
    #[serde(default)]
    participants: Vec<serde_json::Value>,
}

impl From<WireChat> for ChatInfo {
    fn from(chat: WireChat) -> Self {
        ChatInfo {
            id: chat.id.into_string(),
            name: chat.name.unwrap_or_default(),
            is_group: chat.is_group,
            participants: chat.group_metadata.map(|m| m.participants.len()),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireReplyTo {
    #[serde(default)]
    id: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireMessageData {
    #[serde(default)]
    notify_name: Option<String>,
    #[serde(default)]
    mentioned_jid_list: Vec<WireId>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireMessage {
    #[serde(default)]
    id: String,
    #[serde(default)]
    timestamp: i64,
    #[serde(default)]
    from: String,
    #[serde(default)]
    from_me: bool,
    #[serde(default)]
    body: Option<String>,
    #[serde(default)]
    reply_to: Option<WireReplyTo>,
    #[serde(default, rename = "_data")]
    data: Option<WireMessageData>,
}

impl WireMessage {
    fn into_inbound(self, chat_id: Option<&str>) -> InboundMessage {
        let data = self.data.unwrap_or_default();
        // Serialized message ids start with "true_" when sent by this account.
        let quoted_from_me = self
            .reply_to
            .and_then(|r| r.id)
            .is_some_and(|id| id.starts_with("true_"));

        InboundMessage {
            id: self.id,
            chat_id: chat_id.map(str::to_string).unwrap_or(self.from),
            body: self.body.unwrap_or_default(),
            timestamp: self.timestamp,
            from_me: self.from_me,
            sender_name: data.notify_name.filter(|n| !n.is_empty()),
            mentioned_ids: data
                .mentioned_jid_list
                .into_iter()
                .map(WireId::into_string)
                .collect(),
            quoted_from_me,
        }
    }
}

#[derive(Debug, Deserialize)]
struct WireMe {
    id: WireId,
}

/// Body of a bridge webhook call.
#[derive(Debug, Deserialize)]
pub struct WebhookEvent {
    pub event: String,
    #[serde(default)]
    pub session: Option<String>,
    #[serde(default)]
    pub payload: serde_json::Value,
}

/// Map a webhook call onto an inbox event. `Ok(None)` for events the bot
/// ignores (its own messages, acks, presence updates).
pub fn parse_webhook(event: WebhookEvent) -> Result<Option<BotEvent>, serde_json::Error> {
    match event.event.as_str() {
        "message" => {
            let msg: WireMessage = serde_json::from_value(event.payload)?;
            if msg.from_me {
                return Ok(None);
            }
            Ok(Some(BotEvent::Message(msg.into_inbound(None))))
        }
        "session.status" => {
            let status = event
                .payload
                .get("status")
                .and_then(|s| s.as_str())
                .unwrap_or_default();
            Ok(match status {
                "WORKING" => Some(BotEvent::Ready),
                "STOPPED" | "FAILED" => Some(BotEvent::Disconnected(status.to_string())),
                _ => None,
            })
        }
        _ => Ok(None),
    }
}

// ---------------------------------------------------------------------------
// BridgeTransport
// ---------------------------------------------------------------------------

/// Transport backed by a WAHA-style WhatsApp HTTP bridge.
pub struct BridgeTransport {
    client: reqwest::Client,
    base_url: String,
    session: String,
    own_id: OnceCell<String>,
}

impl BridgeTransport {
    pub fn new(base_url: &str, session: &str, api_key: Option<&str>) -> Result<Self> {
        let mut headers = HeaderMap::new();
        if let Some(key) = api_key {
            headers.insert(
                "X-Api-Key",
                HeaderValue::from_str(key).context("Invalid BRIDGE_API_KEY")?,
            );
        }

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_secs(30))
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            session: session.to_string(),
            own_id: OnceCell::new(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    async fn check(resp: reqwest::Response) -> Result<reqwest::Response> {
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            bail!("Bridge returned {}: {body}", status.as_u16());
        }
        Ok(resp)
    }

    async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        debug!(path, "bridge: GET");
        let resp = self.client.get(self.url(path)).send().await?;
        Ok(Self::check(resp).await?.json().await?)
    }

    async fn post(&self, path: &str, body: serde_json::Value) -> Result<()> {
        debug!(path, "bridge: POST");
        let resp = self.client.post(self.url(path)).json(&body).send().await?;
        Self::check(resp).await?;
        Ok(())
    }

    async fn put(&self, path: &str, body: serde_json::Value) -> Result<()> {
        debug!(path, "bridge: PUT");
        let resp = self.client.put(self.url(path)).json(&body).send().await?;
        Self::check(resp).await?;
        Ok(())
    }
}

#[async_trait]
impl Transport for BridgeTransport {
    async fn own_id(&self) -> Result<String> {
        let id = self
            .own_id
            .get_or_try_init(|| async {
                let me: WireMe = self.get(&format!("/api/{}/me", self.session)).await?;
                Ok::<_, anyhow::Error>(me.id.into_string())
            })
            .await?;
        Ok(id.clone())
    }

    async fn reply(&self, to: &InboundMessage, text: &str) -> Result<()> {
        self.post(
            "/api/sendText",
            json!({
                "session": self.session,
                "chatId": to.chat_id,
                "text": text,
                "reply_to": to.id,
            }),
        )
        .await
        .with_context(|| format!("Failed to reply in {}", to.chat_id))
    }

    async fn react(&self, to: &InboundMessage, emoji: &str) -> Result<()> {
        self.put(
            "/api/reaction",
            json!({
                "session": self.session,
                "messageId": to.id,
                "reaction": emoji,
            }),
        )
        .await
        .with_context(|| format!("Failed to react to {}", to.id))
    }

    async fn send_message(&self, chat_id: &str, text: &str) -> Result<()> {
        self.post(
            "/api/sendText",
            json!({ "session": self.session, "chatId": chat_id, "text": text }),
        )
        .await
        .with_context(|| format!("Failed to send message to {chat_id}"))
    }

    async fn send_typing(&self, chat_id: &str) -> Result<()> {
        self.post(
            "/api/startTyping",
            json!({ "session": self.session, "chatId": chat_id }),
        )
        .await
    }

    async fn fetch_messages(&self, chat_id: &str, limit: usize) -> Result<Vec<InboundMessage>> {
        let messages: Vec<WireMessage> = self
            .get(&format!(
                "/api/{}/chats/{chat_id}/messages?limit={limit}&downloadMedia=false",
                self.session
            ))
            .await
            .with_context(|| format!("Failed to fetch messages for {chat_id}"))?;
        Ok(messages
            .into_iter()
            .map(|m| m.into_inbound(Some(chat_id)))
            .collect())
    }

    async fn chats(&self) -> Result<Vec<ChatInfo>> {
        let chats: Vec<WireChat> = self
            .get(&format!("/api/{}/chats", self.session))
            .await
            .context("Failed to list chats")?;
        Ok(chats.into_iter().map(ChatInfo::from).collect())
    }

    async fn chat(&self, chat_id: &str) -> Result<ChatInfo> {
        self.chats()
            .await?
            .into_iter()
            .find(|c| c.id == chat_id)
            .ok_or_else(|| anyhow!("Chat {chat_id} not found"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Matcher;

    fn event(value: serde_json::Value) -> WebhookEvent {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn message_webhook_becomes_inbound_message() {
        let parsed = parse_webhook(event(json!({
            "event": "message",
            "session": "default",
            "payload": {
                "id": "false_120363@g.us_ABC",
                "timestamp": 1714550400,
                "from": "120363@g.us",
                "fromMe": false,
                "body": "look https://example.com",
                "replyTo": { "id": "true_120363@g.us_XYZ" },
                "_data": {
                    "notifyName": "Ada",
                    "mentionedJidList": [{ "_serialized": "15550001111@c.us" }, "15550002222@c.us"]
                }
            }
        })))
        .unwrap();

        match parsed {
            Some(BotEvent::Message(msg)) => {
                assert_eq!(msg.chat_id, "120363@g.us");
                assert_eq!(msg.sender_name.as_deref(), Some("Ada"));
                assert!(msg.quoted_from_me);
                assert_eq!(msg.mentioned_ids, vec!["15550001111@c.us", "15550002222@c.us"]);
                assert_eq!(msg.timestamp, 1714550400);
            }
            other => panic!("expected message, got {other:?}"),
        }
    }

    #[test]
    fn own_messages_and_unknown_events_are_ignored() {
        let own = parse_webhook(event(json!({
            "event": "message",
            "payload": { "id": "true_x", "from": "1@g.us", "fromMe": true, "body": "hi" }
        })))
        .unwrap();
        assert!(own.is_none());

        let ack = parse_webhook(event(json!({ "event": "message.ack", "payload": {} }))).unwrap();
        assert!(ack.is_none());
    }

    #[test]
    fn session_status_maps_to_lifecycle_events() {
        let ready = parse_webhook(event(json!({
            "event": "session.status",
            "payload": { "status": "WORKING" }
        })))
        .unwrap();
        assert!(matches!(ready, Some(BotEvent::Ready)));

        let stopped = parse_webhook(event(json!({
            "event": "session.status",
            "payload": { "status": "STOPPED" }
        })))
        .unwrap();
        assert!(matches!(stopped, Some(BotEvent::Disconnected(s)) if s == "STOPPED"));
    }

    #[tokio::test]
    async fn reply_posts_send_text_with_api_key() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/api/sendText")
            .match_header("x-api-key", "k")
            .match_body(Matcher::PartialJson(json!({
                "session": "default",
                "chatId": "1@g.us",
                "text": "hello",
                "reply_to": "msg-1"
            })))
            .with_status(201)
            .create_async()
            .await;

        let transport = BridgeTransport::new(&server.url(), "default", Some("k")).unwrap();
        let to = InboundMessage {
            id: "msg-1".into(),
            chat_id: "1@g.us".into(),
            ..Default::default()
        };
        transport.reply(&to, "hello").await.unwrap();
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn chats_accept_both_id_shapes() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", "/api/default/chats")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                json!([
                    { "id": "1@g.us", "name": "AGI", "isGroup": true,
                      "groupMetadata": { "participants": [{}, {}, {}] } },
                    { "id": { "_serialized": "15550001111@c.us" }, "name": "Ada" }
                ])
                .to_string(),
            )
            .create_async()
            .await;

        let transport = BridgeTransport::new(&server.url(), "default", None).unwrap();
        let chats = transport.chats().await.unwrap();
        assert_eq!(chats.len(), 2);
        assert_eq!(chats[0].participants, Some(3));
        assert_eq!(chats[1].id, "15550001111@c.us");
        assert_eq!(chats[1].is_group, None);

        let err = transport.chat("missing@g.us").await.unwrap_err();
        assert!(err.to_string().contains("not found"));
    }

    #[tokio::test]
    async fn own_id_is_fetched_once() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/api/default/me")
            .with_status(200)
            .with_body(r#"{"id":"15559990000@c.us","pushName":"bot"}"#)
            .expect(1)
            .create_async()
            .await;

        let transport = BridgeTransport::new(&server.url(), "default", None).unwrap();
        assert_eq!(transport.own_id().await.unwrap(), "15559990000@c.us");
        assert_eq!(transport.own_id().await.unwrap(), "15559990000@c.us");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn bridge_error_status_is_reported() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/api/startTyping")
            .with_status(500)
            .with_body("session not started")
            .create_async()
            .await;

        let transport = BridgeTransport::new(&server.url(), "default", None).unwrap();
        let err = transport.send_typing("1@g.us").await.unwrap_err();
        assert!(err.to_string().contains("500"));
    }
}
