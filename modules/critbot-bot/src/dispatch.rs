// Event dispatcher: owns all mutable bot state and handles one inbox event
// at a time.
//
// Message routing order:
//   1. admin (known chat or number match) → welcome once, then `/` commands
//   2. `/debug` while no admin is known → permissive admin recognition
//   3. monitored group with a URL → critique
//   4. monitored group addressing the bot → conversation

use std::sync::{Arc, LazyLock};
use std::time::Duration;

use anyhow::Result;
use critbot_critic::{strip_summary, ConversationPipeline, CritiquePipeline};
use regex::Regex;
use tracing::{error, info, warn};
use typed_builder::TypedBuilder;

use crate::admin::{self, AdminCommand, AdminContext, AdminIdentity};
use crate::groups::MonitoredGroups;
use crate::health::SharedStatus;
use crate::inbox::BotEvent;
use crate::transport::{user_part, InboundMessage, Transport, USER_SUFFIX};

const LINK_APOLOGY: &str = "Sorry, I encountered an error while analyzing this link. Please make sure it's accessible and try again.";
const CONVERSATION_APOLOGY: &str =
    "Sorry, I encountered an error while processing your message. Please try again.";

/// Messages fetched for conversation context.
const HISTORY_FETCH: usize = 50;
const ACK_REACTION: &str = "👍";
const LOG_PREVIEW_CHARS: usize = 30;

static URL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"https?://[^\s]+").expect("valid regex"));

/// First `http(s)://` URL in a message body.
pub fn extract_url(body: &str) -> Option<&str> {
    URL_RE.find(body).map(|m| m.as_str())
}

#[derive(Debug, Clone, TypedBuilder)]
pub struct DispatchSettings {
    #[builder(default)]
    pub admin_number: Option<String>,
    /// Monitored for this run when nothing is stored.
    #[builder(default = Some("AGI".to_string()))]
    pub default_group_name: Option<String>,
    /// Pause between the summary and the detailed critique.
    #[builder(default = Duration::from_secs(2))]
    pub reply_delay: Duration,
}

pub struct Dispatcher {
    transport: Arc<dyn Transport>,
    critic: Arc<CritiquePipeline>,
    chat: Arc<ConversationPipeline>,
    groups: MonitoredGroups,
    identity: AdminIdentity,
    status: SharedStatus,
    settings: DispatchSettings,
}

impl Dispatcher {
    pub fn new(
        transport: Arc<dyn Transport>,
        critic: Arc<CritiquePipeline>,
        chat: Arc<ConversationPipeline>,
        groups: MonitoredGroups,
        status: SharedStatus,
        settings: DispatchSettings,
    ) -> Self {
        Self {
            transport,
            critic,
            chat,
            groups,
            identity: AdminIdentity::new(settings.admin_number.clone()),
            status,
            settings,
        }
    }

    pub fn groups(&self) -> &MonitoredGroups {
        &self.groups
    }

    pub fn identity(&self) -> &AdminIdentity {
        &self.identity
    }

    /// Handle one event to completion. Failures are logged and recorded in
    /// the status, never propagated.
    pub async fn handle(&mut self, event: BotEvent) {
        let outcome = match event {
            BotEvent::Ready => self.on_ready().await,
            BotEvent::Message(msg) => self.on_message(&msg).await,
            BotEvent::Disconnected(reason) => {
                warn!(reason = %reason, "Messaging session disconnected");
                let mut status = self.status.write().await;
                status.is_ready = false;
                status.last_error = Some(format!("Disconnected: {reason}"));
                Ok(())
            }
        };

        if let Err(e) = outcome {
            error!(error = %e, "Event handling failed");
            self.status.write().await.last_error = Some(e.to_string());
        }
    }

    // -----------------------------------------------------------------------
    // Ready
    // -----------------------------------------------------------------------

    async fn on_ready(&mut self) -> Result<()> {
        info!("Messaging session ready");
        self.status.write().await.is_ready = true;

        self.groups.reload().await;
        if self.groups.is_empty() {
            self.monitor_default_group().await;
        }
        self.sync_status().await;

        if self.groups.is_empty() {
            warn!("No active groups configured. Use /setactive <id> to start monitoring");
        } else {
            info!(groups = ?self.groups.ids(), "Monitoring active groups");
        }

        let Some(number) = self.identity.number().map(str::to_string) else {
            warn!("ADMIN_NUMBER not set; send /debug from your phone to register as admin");
            return Ok(());
        };

        let chats = self.transport.chats().await?;
        let Some(admin_chat) = admin::find_admin_chat(&chats, &number) else {
            warn!("Admin chat not found. Send /debug from your phone to force recognition");
            return Ok(());
        };
        let admin_chat_id = admin_chat.id.clone();
        self.identity.set_chat_id(admin_chat_id.clone());

        self.transport
            .send_message(&admin_chat_id, &admin::startup_text())
            .await?;
        if !self.groups.is_empty() {
            self.transport
                .send_message(
                    &admin_chat_id,
                    &format!(
                        "{} active group(s) loaded from storage. Use /active to see details.",
                        self.groups.len()
                    ),
                )
                .await?;
        }
        Ok(())
    }

    async fn monitor_default_group(&mut self) {
        let Some(name) = self.settings.default_group_name.as_deref() else {
            return;
        };
        match self.transport.chats().await {
            Ok(chats) => match chats.iter().find(|c| c.name == name) {
                Some(chat) => {
                    info!(group = name, id = %chat.id, "Monitoring default group for this session");
                    self.groups.add_transient(&chat.id);
                }
                None => info!(group = name, "Default group not found"),
            },
            Err(e) => warn!(error = %e, "Could not list chats to find default group"),
        }
    }

    async fn sync_status(&self) {
        self.status.write().await.active_group_ids = self.groups.ids().to_vec();
    }

    // -----------------------------------------------------------------------
    // Messages
    // -----------------------------------------------------------------------

    async fn on_message(&mut self, msg: &InboundMessage) -> Result<()> {
        info!(
            from = %msg.chat_id,
            preview = ai_client::truncate_to_char_boundary(&msg.body, LOG_PREVIEW_CHARS),
            "Message received"
        );

        if self.identity.is_admin(&msg.chat_id) {
            if self.identity.chat_id().is_none() {
                self.identity.set_chat_id(msg.chat_id.clone());
                self.transport.reply(msg, &admin::welcome_text()).await?;
            }
            if msg.body.starts_with('/') {
                self.run_admin_command(msg).await;
                return Ok(());
            }
        } else if msg.body.starts_with("/debug") && self.identity.chat_id().is_none() {
            info!(from = %msg.chat_id, "Permissive first-time admin recognition via /debug");
            self.identity.set_chat_id(msg.chat_id.clone());
            self.transport.reply(msg, admin::DEBUG_WELCOME).await?;
            self.run_admin_command(msg).await;
            return Ok(());
        }

        if !self.groups.contains(&msg.chat_id) {
            return Ok(());
        }

        if let Some(url) = extract_url(&msg.body) {
            self.handle_url(msg, url).await
        } else if self.is_for_bot(msg).await {
            self.handle_conversation(msg).await
        } else {
            Ok(())
        }
    }

    async fn run_admin_command(&mut self, msg: &InboundMessage) {
        let command = AdminCommand::parse(&msg.body);
        let ctx = AdminContext {
            transport: self.transport.as_ref(),
            groups: &mut self.groups,
            identity: &mut self.identity,
        };
        if let Err(e) = admin::execute(&command, msg, ctx).await {
            error!(error = %e, "Admin command failed");
            if let Err(e) = self
                .transport
                .reply(msg, &format!("Error executing command: {e}"))
                .await
            {
                warn!(error = %e, "Failed to report command error");
            }
        }
        self.sync_status().await;
    }

    /// Quoted bot message, @-mention of the bot, or a `@bot`/`@ai` tag.
    pub async fn is_for_bot(&self, msg: &InboundMessage) -> bool {
        if msg.quoted_from_me {
            return true;
        }

        match self.transport.own_id().await {
            Ok(own_id) => {
                let own = format!("{}{USER_SUFFIX}", user_part(&own_id));
                if msg.mentioned_ids.iter().any(|id| *id == own) {
                    return true;
                }
            }
            Err(e) => warn!(error = %e, "Could not resolve own id for mention check"),
        }

        let body = msg.body.to_lowercase();
        body.contains("@bot") || body.contains("@ai")
    }

    pub async fn handle_url(&self, msg: &InboundMessage, url: &str) -> Result<()> {
        info!(url, chat = %msg.chat_id, "Critiquing link");
        if let Err(e) = self.transport.react(msg, ACK_REACTION).await {
            warn!(error = %e, "Failed to acknowledge link");
        }

        let extraction = match self.critic.extract(url).await {
            Ok(extraction) => extraction,
            Err(e) => {
                warn!(url, error = %format!("{e:#}"), "Link extraction failed");
                return self.transport.reply(msg, LINK_APOLOGY).await;
            }
        };

        let result = self.critic.critique_extracted(url, &extraction).await;

        if result.summary.is_empty() {
            self.transport.reply(msg, result.criticism.trim()).await?;
        } else {
            self.transport.reply(msg, &result.summary).await?;
            tokio::time::sleep(self.settings.reply_delay).await;
            let detail = strip_summary(&result.criticism);
            if !detail.is_empty() {
                self.transport.reply(msg, &detail).await?;
            }
        }

        if let Some(emoji) = result.score_emoji {
            self.transport.react(msg, emoji).await?;
        }
        Ok(())
    }

    pub async fn handle_conversation(&self, msg: &InboundMessage) -> Result<()> {
        match self.converse(msg).await {
            Ok(reply) => self.transport.reply(msg, &reply).await,
            Err(e) => {
                warn!(error = %format!("{e:#}"), "Conversation failed");
                self.transport.reply(msg, CONVERSATION_APOLOGY).await
            }
        }
    }

    async fn converse(&self, msg: &InboundMessage) -> Result<String> {
        let mut history = self
            .transport
            .fetch_messages(&msg.chat_id, HISTORY_FETCH)
            .await?;
        history.sort_by_key(|m| m.timestamp);
        let history: Vec<_> = history
            .iter()
            .filter(|m| m.timestamp < msg.timestamp)
            .map(InboundMessage::as_chat_ref)
            .collect();

        if let Err(e) = self.transport.send_typing(&msg.chat_id).await {
            warn!(error = %e, "Failed to send typing indicator");
        }

        Ok(self.chat.converse(&msg.as_chat_ref(), &history).await)
    }
}
