// Admin recognition and the slash commands an admin can send in a direct
// chat with the bot.

use anyhow::Result;
use serde::Serialize;
use tracing::{info, warn};

use crate::groups::MonitoredGroups;
use crate::transport::{is_group_id, user_part, ChatInfo, InboundMessage, Transport, GROUP_SUFFIX};

pub const COMMAND_LIST: &str = "/list - List all chats\n\
/debug - Show detailed debug info\n\
/setactive <id> - Set active group\n\
/removeactive <id> - Remove group from active list\n\
/active - Show currently active groups";

pub fn startup_text() -> String {
    format!("WhatsApp Bot is now online! 🤖\n\nYou can use the following commands:\n{COMMAND_LIST}")
}

pub fn welcome_text() -> String {
    format!("You've been recognized as the admin! 🤖\n\nYou can use the following commands:\n{COMMAND_LIST}")
}

pub const DEBUG_WELCOME: &str = "You've been recognized as admin through the debug command! 🤖\nThis is a one-time permissive recognition to help with setup.";

const UNKNOWN_COMMAND: &str = "Unknown command. Available commands:\n\
/list - List all chats\n\
/debug - Debug chat information\n\
/setactive <id> - Set active group\n\
/removeactive <id> - Remove group from active list\n\
/active - Show currently active groups\n\
/reset - Reset admin chat ID (use with caution)";

const RESET_NOTICE: &str = "Admin chat ID has been reset. Any user who sends a /debug command will now be recognized as admin for first-time setup. USE THIS CAREFULLY.";

// ---------------------------------------------------------------------------
// Identity
// ---------------------------------------------------------------------------

/// Exact or suffix match of a chat id's user part against the admin number.
pub fn number_matches(chat_id: &str, number: &str) -> bool {
    if number.is_empty() {
        return false;
    }
    let user = user_part(chat_id);
    user == number || user.ends_with(number)
}

/// The admin's direct chat, if one exists.
pub fn find_admin_chat<'a>(chats: &'a [ChatInfo], number: &str) -> Option<&'a ChatInfo> {
    chats
        .iter()
        .filter(|c| !c.looks_like_group())
        .find(|c| number_matches(&c.id, number))
}

#[derive(Debug, Clone, Default)]
pub struct AdminIdentity {
    number: Option<String>,
    chat_id: Option<String>,
}

impl AdminIdentity {
    pub fn new(number: Option<String>) -> Self {
        Self {
            number: number.filter(|n| !n.is_empty()),
            chat_id: None,
        }
    }

    pub fn number(&self) -> Option<&str> {
        self.number.as_deref()
    }

    pub fn chat_id(&self) -> Option<&str> {
        self.chat_id.as_deref()
    }

    pub fn set_chat_id(&mut self, chat_id: impl Into<String>) {
        let chat_id = chat_id.into();
        info!(chat_id = %chat_id, "Admin chat id set");
        self.chat_id = Some(chat_id);
    }

    pub fn reset(&mut self) {
        self.chat_id = None;
    }

    /// Known admin chat first, then the configured number.
    pub fn is_admin(&self, from: &str) -> bool {
        if self.chat_id.as_deref() == Some(from) {
            return true;
        }
        self.number
            .as_deref()
            .is_some_and(|n| number_matches(from, n))
    }
}

// ---------------------------------------------------------------------------
// Commands
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AdminCommand {
    List,
    Debug,
    /// Group id, possibly empty.
    SetActive(String),
    RemoveActive(String),
    Active,
    Reset,
    Unknown,
}

impl AdminCommand {
    pub fn parse(body: &str) -> Self {
        let command = body.split(' ').next().unwrap_or_default().to_lowercase();
        let rest = || body.get(command.len()..).unwrap_or_default().trim().to_string();

        match command.as_str() {
            "/list" => AdminCommand::List,
            "/debug" => AdminCommand::Debug,
            "/setactive" => AdminCommand::SetActive(rest()),
            "/removeactive" => AdminCommand::RemoveActive(rest()),
            "/active" => AdminCommand::Active,
            "/reset" => AdminCommand::Reset,
            _ => AdminCommand::Unknown,
        }
    }
}

/// What an admin command may touch.
pub struct AdminContext<'a> {
    pub transport: &'a dyn Transport,
    pub groups: &'a mut MonitoredGroups,
    pub identity: &'a mut AdminIdentity,
}

/// Run one command, replying to `msg`. Errors are reported by the caller.
pub async fn execute(command: &AdminCommand, msg: &InboundMessage, ctx: AdminContext<'_>) -> Result<()> {
    info!(command = ?command, from = %msg.chat_id, "Processing admin command");
    let AdminContext {
        transport,
        groups,
        identity,
    } = ctx;

    match command {
        AdminCommand::List => list_chats(transport, msg, groups).await,
        AdminCommand::Debug => debug_info(transport, msg, identity, groups).await,
        AdminCommand::SetActive(id) if id.is_empty() => {
            transport
                .reply(msg, "Please provide a group ID: /setactive <id>")
                .await
        }
        AdminCommand::RemoveActive(id) if id.is_empty() => {
            transport
                .reply(msg, "Please provide a group ID: /removeactive <id>")
                .await
        }
        AdminCommand::SetActive(id) => set_active(transport, msg, groups, id).await,
        AdminCommand::RemoveActive(id) => remove_active(transport, msg, groups, id).await,
        AdminCommand::Active => show_active(transport, msg, groups).await,
        AdminCommand::Reset => {
            identity.reset();
            transport.reply(msg, RESET_NOTICE).await
        }
        AdminCommand::Unknown => transport.reply(msg, UNKNOWN_COMMAND).await,
    }
}

async fn set_active(
    transport: &dyn Transport,
    msg: &InboundMessage,
    groups: &mut MonitoredGroups,
    id: &str,
) -> Result<()> {
    if !is_group_id(id) {
        return transport
            .reply(
                msg,
                &format!(
                    "Error: The provided ID \"{id}\" doesn't look like a group ID. Group IDs should end with {GROUP_SUFFIX}"
                ),
            )
            .await;
    }

    let chat = match transport.chat(id).await {
        Ok(chat) => chat,
        Err(e) => {
            warn!(group_id = id, error = %e, "Failed to fetch group");
            let message = e.to_string();
            let hint = if message.contains("not found") {
                " The group ID may be incorrect or you might not be a member of this group."
            } else {
                ""
            };
            return transport
                .reply(
                    msg,
                    &format!(
                        "Error: Could not set active group. {message}{hint}\n\nPlease run /list to see available groups and their correct IDs."
                    ),
                )
                .await;
        }
    };

    if chat.name.is_empty() {
        return transport
            .reply(
                msg,
                &format!("Error: The chat with ID \"{id}\" doesn't appear to be a valid group chat."),
            )
            .await;
    }

    if chat.is_group == Some(false) {
        transport
            .reply(
                msg,
                &format!(
                    "Warning: This chat ({}) might not be a true group chat according to the API, but I'll add it anyway since the ID format is correct.",
                    chat.name
                ),
            )
            .await?;
    }

    if groups.add(id).await? {
        info!(group = %chat.name, total = groups.len(), "Added group to active list");
        transport
            .reply(
                msg,
                &format!("Successfully added *{}* to active monitoring list. ✅", chat.name),
            )
            .await
    } else {
        transport
            .reply(msg, &format!("Group *{}* is already being monitored.", chat.name))
            .await
    }
}

async fn remove_active(
    transport: &dyn Transport,
    msg: &InboundMessage,
    groups: &mut MonitoredGroups,
    id: &str,
) -> Result<()> {
    if !groups.contains(id) {
        return transport
            .reply(
                msg,
                "This group is not currently being monitored. Use /active to see monitored groups.",
            )
            .await;
    }

    let chat = transport.chat(id).await;
    groups.remove(id).await?;
    info!(group_id = id, remaining = groups.len(), "Removed group from active list");

    match chat {
        Ok(chat) => {
            transport
                .reply(
                    msg,
                    &format!("Successfully removed *{}* from active monitoring list. ❌", chat.name),
                )
                .await
        }
        Err(_) => {
            transport
                .reply(
                    msg,
                    &format!(
                        "Removed ID `{id}` from monitoring list. (Note: Could not fetch chat details)"
                    ),
                )
                .await
        }
    }
}

async fn show_active(
    transport: &dyn Transport,
    msg: &InboundMessage,
    groups: &MonitoredGroups,
) -> Result<()> {
    if groups.is_empty() {
        return transport
            .reply(
                msg,
                "No groups are currently being monitored. Use */list* to see available groups, then */setactive <id>* to start monitoring a group.",
            )
            .await;
    }

    let mut response = String::from("*Currently Monitored Groups:*\n\n");
    let mut reachable = 0;
    let mut unreachable = 0;

    for id in groups.ids() {
        match transport.chat(id).await {
            Ok(chat) => {
                response.push_str(&format!("✅ *{}*\nID: `{id}`\n", chat.name));
                if let Some(n) = chat.participants {
                    response.push_str(&format!("Participants: {n}\n"));
                }
                response.push('\n');
                reachable += 1;
            }
            Err(e) => {
                response.push_str(&format!("❓ *Unknown Group*\nID: `{id}`\nError: {e}\n\n"));
                unreachable += 1;
            }
        }
    }

    response.push_str(&format!("---\nTotal active groups: {}", groups.len()));
    if unreachable > 0 {
        response.push_str(&format!(" ({reachable} reachable, {unreachable} unreachable)"));
    }
    response.push_str("\n\nTo stop monitoring a group, use:\n*/removeactive <id>*");

    transport.reply(msg, &response).await
}

async fn list_chats(
    transport: &dyn Transport,
    msg: &InboundMessage,
    groups: &MonitoredGroups,
) -> Result<()> {
    let chats = transport.chats().await?;
    let (group_chats, direct): (Vec<_>, Vec<_>) =
        chats.iter().partition(|c| c.looks_like_group());

    let mut response = String::from("*Available Chats:*\n\n");

    if !group_chats.is_empty() {
        response.push_str("*Groups:*\n");
        for chat in &group_chats {
            let marker = if groups.contains(&chat.id) { " 🟢" } else { "" };
            response.push_str(&format!("{}{marker}\nID: `{}`\n", chat.name, chat.id));
            if chat.group_flag_mismatch() {
                response.push_str(&format!(
                    "⚠️ *Property mismatch* (isGroup={})\n",
                    display_flag(chat.is_group)
                ));
            }
            response.push('\n');
        }
    }

    if !direct.is_empty() {
        response.push_str("\n*Direct Messages:*\n");
        for chat in &direct {
            let name: &str = if chat.name.is_empty() { "Unknown" } else { &chat.name };
            response.push_str(&format!("{name}\nID: `{}`\n\n", chat.id));
        }
    }

    response.push_str("\n---\n");
    response.push_str("To monitor a group, use:\n*/setactive <group-id>*\n\n");
    response.push_str("To see currently monitored groups, use:\n*/active*");

    transport.reply(msg, &response).await
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ChatSummary<'a> {
    id: &'a str,
    name: &'a str,
    is_group: Option<bool>,
    is_group_by_id: bool,
    mismatch: &'static str,
    matches: &'static str,
}

async fn debug_info(
    transport: &dyn Transport,
    msg: &InboundMessage,
    identity: &AdminIdentity,
    groups: &MonitoredGroups,
) -> Result<()> {
    let chats = transport.chats().await?;
    let admin_number = identity.number().unwrap_or_default();
    let sender_number = user_part(&msg.chat_id);
    // Every string contains and ends with "".
    let has_number = !admin_number.is_empty();

    let checks = [
        ("exactMatch", identity.chat_id() == Some(msg.chat_id.as_str())),
        ("includesAdminNumber", has_number && msg.chat_id.contains(admin_number)),
        ("senderMatchesAdmin", has_number && sender_number == admin_number),
        ("senderEndsWithAdmin", has_number && sender_number.ends_with(admin_number)),
        ("adminEndsWithSender", has_number && admin_number.ends_with(sender_number)),
    ];

    let mut response = String::from("*Debug Chat Information:*\n\n");
    response.push_str(&format!("Your chat ID: `{}`\n", msg.chat_id));
    response.push_str(&format!("Your number (extracted): `{sender_number}`\n"));
    response.push_str(&format!("Admin number (from .env): `{admin_number}`\n"));
    response.push_str(&format!(
        "Admin chat ID (current): `{}`\n\n",
        identity.chat_id().unwrap_or("Not set")
    ));

    response.push_str("*Admin Recognition Tests:*\n");
    for (name, passed) in checks {
        response.push_str(&format!("- {name}: {}\n", if passed { "✅" } else { "❌" }));
    }
    response.push('\n');
    response.push_str(&format!("Total chats found: {}\n", chats.len()));
    response.push_str(&format!("Monitored groups: {}\n\n", groups.len()));

    let summaries: Vec<ChatSummary<'_>> = chats
        .iter()
        .map(|c| ChatSummary {
            id: &c.id,
            name: if c.name.is_empty() { "Unnamed" } else { &c.name },
            is_group: c.is_group,
            is_group_by_id: is_group_id(&c.id),
            mismatch: if c.group_flag_mismatch() { "⚠️" } else { "" },
            matches: if has_number && c.id.contains(admin_number) {
                "⭐"
            } else {
                ""
            },
        })
        .collect();

    response.push_str("*All Chat IDs:*\n```\n");
    let shown = &summaries[..summaries.len().min(10)];
    response.push_str(&serde_json::to_string_pretty(shown)?);
    if summaries.len() > 10 {
        response.push_str(&format!("\n... and {} more chats", summaries.len() - 10));
    }
    response.push_str("\n```\n\n");

    transport.reply(msg, &response).await?;

    let mismatched: Vec<&ChatInfo> = chats.iter().filter(|c| c.group_flag_mismatch()).collect();
    if !mismatched.is_empty() {
        let mut notice = String::from("*Potential Chat Type Issues:*\n\n");
        for chat in mismatched {
            let name: &str = if chat.name.is_empty() { "Unnamed Chat" } else { &chat.name };
            let format = if is_group_id(&chat.id) {
                "Group (@g.us)"
            } else {
                "Personal (@c.us)"
            };
            notice.push_str(&format!(
                "❗ *{name}*\nID: `{}`\nisGroup: {}\nID format: {format}\n\n",
                chat.id,
                display_flag(chat.is_group)
            ));
        }
        notice.push_str("These chats have inconsistent properties which might cause issues with commands. Use ID format (ends with @g.us) as the primary indicator for groups.");
        transport.send_message(&msg.chat_id, &notice).await?;
    }

    Ok(())
}

fn display_flag(flag: Option<bool>) -> String {
    flag.map(|f| f.to_string())
        .unwrap_or_else(|| "undefined".to_string())
}
