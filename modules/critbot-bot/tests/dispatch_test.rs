use std::sync::Arc;
use std::time::Duration;

use ai_client::MessageRole;
use critbot_bot::testing::{MockTransport, Sent};
use critbot_bot::{
    shared_status, BotEvent, DispatchSettings, Dispatcher, GroupStore, InboundMessage,
    MonitoredGroups, SharedStatus,
};
use critbot_critic::testing::{MockExtractor, MockModel};
use critbot_critic::{ConversationPipeline, CritiquePipeline, CritiqueStore, PromptLoader};

const GROUP: &str = "120363000000000001@g.us";
const ADMIN: &str = "15551234567@c.us";
const URL: &str = "https://example.com/post";

struct Harness {
    dispatcher: Dispatcher,
    transport: Arc<MockTransport>,
    model: Arc<MockModel>,
    status: SharedStatus,
    data: tempfile::TempDir,
    _prompts: tempfile::TempDir,
    _critics: tempfile::TempDir,
}

fn harness(transport: MockTransport, model: MockModel, extractor: MockExtractor) -> Harness {
    harness_with(transport, model, extractor, None)
}

fn harness_with(
    transport: MockTransport,
    model: MockModel,
    extractor: MockExtractor,
    admin_number: Option<&str>,
) -> Harness {
    let prompts = tempfile::tempdir().unwrap();
    std::fs::write(
        prompts.path().join("critic_prompt.md"),
        "# Critic\n\nBe sharp.",
    )
    .unwrap();
    std::fs::write(prompts.path().join("ai_bot_prompt.md"), "Be friendly.").unwrap();
    let critics = tempfile::tempdir().unwrap();
    let data = tempfile::tempdir().unwrap();

    let transport = Arc::new(transport);
    let model = Arc::new(model);
    let loader = PromptLoader::new(prompts.path());
    let critic = Arc::new(CritiquePipeline::new(
        Arc::new(extractor),
        model.clone(),
        loader.clone(),
        CritiqueStore::new(critics.path()),
    ));
    let chat = Arc::new(ConversationPipeline::new(model.clone(), loader));
    let status = shared_status("test");

    let settings = DispatchSettings::builder()
        .admin_number(admin_number.map(str::to_string))
        .reply_delay(Duration::ZERO)
        .build();

    let dispatcher = Dispatcher::new(
        transport.clone(),
        critic,
        chat,
        MonitoredGroups::new(GroupStore::new(data.path())),
        status.clone(),
        settings,
    );

    Harness {
        dispatcher,
        transport,
        model,
        status,
        data,
        _prompts: prompts,
        _critics: critics,
    }
}

fn message(chat_id: &str, body: &str, timestamp: i64) -> InboundMessage {
    InboundMessage {
        id: format!("msg-{timestamp}"),
        chat_id: chat_id.to_string(),
        body: body.to_string(),
        timestamp,
        sender_name: Some("Ada".to_string()),
        ..Default::default()
    }
}

fn store_groups(h: &Harness, ids: &[&str]) {
    std::fs::write(
        h.data.path().join("active-groups.json"),
        serde_json::to_string(ids).unwrap(),
    )
    .unwrap();
}

fn chats() -> MockTransport {
    MockTransport::new()
        .with_chat(GROUP, "AGI", Some(true))
        .with_chat(ADMIN, "Admin", Some(false))
}

// ---------------------------------------------------------------------------
// Ready
// ---------------------------------------------------------------------------

#[tokio::test]
async fn ready_falls_back_to_default_group_and_greets_admin() {
    let mut h = harness_with(
        chats(),
        MockModel::new(),
        MockExtractor::new(),
        Some("5551234567"),
    );

    h.dispatcher.handle(BotEvent::Ready).await;

    assert!(h.dispatcher.groups().contains(GROUP));
    assert_eq!(h.dispatcher.identity().chat_id(), Some(ADMIN));
    let greetings = h.transport.messages_to(ADMIN);
    assert_eq!(greetings.len(), 1);
    assert!(greetings[0].starts_with("WhatsApp Bot is now online! 🤖"));

    let status = h.status.read().await;
    assert!(status.is_ready);
    assert_eq!(status.active_group_ids, vec![GROUP.to_string()]);
    drop(status);

    // The fallback is not written to disk.
    assert!(!h.data.path().join("active-groups.json").exists());
}

#[tokio::test]
async fn ready_with_stored_groups_reports_count() {
    let mut h = harness_with(
        chats(),
        MockModel::new(),
        MockExtractor::new(),
        Some("5551234567"),
    );
    store_groups(&h, &["1@g.us", "2@g.us"]);

    h.dispatcher.handle(BotEvent::Ready).await;

    assert!(!h.dispatcher.groups().contains(GROUP));
    let greetings = h.transport.messages_to(ADMIN);
    assert_eq!(greetings.len(), 2);
    assert_eq!(
        greetings[1],
        "2 active group(s) loaded from storage. Use /active to see details."
    );
}

#[tokio::test]
async fn ready_failure_is_recorded() {
    let mut h = harness_with(
        MockTransport::new().failing_chats(),
        MockModel::new(),
        MockExtractor::new(),
        Some("5551234567"),
    );
    h.dispatcher.handle(BotEvent::Ready).await;

    let status = h.status.read().await;
    assert_eq!(status.last_error.as_deref(), Some("bridge unavailable"));
}

#[tokio::test]
async fn disconnect_clears_ready() {
    let mut h = harness(chats(), MockModel::new(), MockExtractor::new());
    h.dispatcher.handle(BotEvent::Ready).await;
    h.dispatcher
        .handle(BotEvent::Disconnected("STOPPED".into()))
        .await;

    let status = h.status.read().await;
    assert!(!status.is_ready);
    assert_eq!(status.last_error.as_deref(), Some("Disconnected: STOPPED"));
}

// ---------------------------------------------------------------------------
// Links
// ---------------------------------------------------------------------------

#[tokio::test]
async fn link_in_monitored_group_gets_summary_then_detail() {
    let mut h = harness(
        chats(),
        MockModel::new().reply("Summary: Short take.\n\nBAI Score: 72.5/100\n\nDetails here."),
        MockExtractor::new().on_page(URL, "Post", "Body."),
    );
    h.dispatcher.handle(BotEvent::Ready).await;

    h.dispatcher
        .handle(BotEvent::Message(message(GROUP, &format!("look {URL} wow"), 10)))
        .await;

    assert_eq!(h.transport.reactions(), vec!["👍", "👌"]);
    let replies = h.transport.replies();
    assert_eq!(replies.len(), 2);
    assert_eq!(replies[0], "Short take.");
    assert!(replies[1].contains("Details here."));
    assert!(!replies[1].contains("Short take."));
}

#[tokio::test]
async fn unreachable_link_gets_apology() {
    let mut h = harness(chats(), MockModel::new(), MockExtractor::new());
    h.dispatcher.handle(BotEvent::Ready).await;

    h.dispatcher
        .handle(BotEvent::Message(message(GROUP, URL, 10)))
        .await;

    assert_eq!(
        h.transport.replies(),
        vec!["Sorry, I encountered an error while analyzing this link. Please make sure it's accessible and try again."]
    );
    assert_eq!(h.model.call_count(), 0);
}

#[tokio::test]
async fn model_failure_still_replies_with_analysis_error() {
    let mut h = harness(
        chats(),
        MockModel::new().fail("quota"),
        MockExtractor::new().on_page(URL, "Post", "Body."),
    );
    h.dispatcher.handle(BotEvent::Ready).await;

    h.dispatcher
        .handle(BotEvent::Message(message(GROUP, URL, 10)))
        .await;

    let replies = h.transport.replies();
    assert_eq!(replies[0], "Analysis error");
    assert_eq!(h.transport.reactions().last().map(String::as_str), Some("⚠️"));
}

#[tokio::test]
async fn unmonitored_chat_is_ignored() {
    let mut h = harness(
        MockTransport::new(),
        MockModel::new(),
        MockExtractor::new().on_page(URL, "Post", "Body."),
    );
    h.dispatcher.handle(BotEvent::Ready).await;

    h.dispatcher
        .handle(BotEvent::Message(message("999@g.us", URL, 10)))
        .await;

    assert!(h.transport.sent().is_empty());
}

// ---------------------------------------------------------------------------
// Conversation
// ---------------------------------------------------------------------------

#[tokio::test]
async fn mention_starts_conversation_with_earlier_history() {
    let mut later = message(GROUP, "after", 30);
    later.sender_name = Some("Bob".into());
    let mut bot = message(GROUP, "earlier answer", 15);
    bot.from_me = true;

    let transport = chats().with_history(
        GROUP,
        vec![later, message(GROUP, "first", 5), bot],
    );
    let mut h = harness(transport, MockModel::new().reply("  Hello Ada!  "), MockExtractor::new());
    h.dispatcher.handle(BotEvent::Ready).await;

    h.dispatcher
        .handle(BotEvent::Message(message(GROUP, "hey @bot what's up", 20)))
        .await;

    assert!(h.transport.sent().contains(&Sent::Typing {
        chat_id: GROUP.to_string()
    }));
    assert_eq!(h.transport.replies(), vec!["Hello Ada!"]);

    let request = &h.model.requests()[0];
    let roles: Vec<MessageRole> = request.messages.iter().map(|m| m.role).collect();
    assert_eq!(
        roles,
        vec![MessageRole::User, MessageRole::Assistant, MessageRole::User]
    );
    assert_eq!(request.messages[0].content, "Ada: first");
    assert_eq!(request.messages[1].content, "earlier answer");
    assert_eq!(request.messages[2].content, "Ada: hey @bot what's up");
}

#[tokio::test]
async fn direct_mention_and_quote_address_the_bot() {
    let h = harness(chats().with_own_id("15550000000@c.us"), MockModel::new(), MockExtractor::new());

    let mut mention = message(GROUP, "hi", 1);
    mention.mentioned_ids = vec!["15550000000@c.us".into()];
    assert!(h.dispatcher.is_for_bot(&mention).await);

    let mut quote = message(GROUP, "and?", 2);
    quote.quoted_from_me = true;
    assert!(h.dispatcher.is_for_bot(&quote).await);

    assert!(h.dispatcher.is_for_bot(&message(GROUP, "hey @AI", 3)).await);
    assert!(!h.dispatcher.is_for_bot(&message(GROUP, "just chatting", 4)).await);
}

#[tokio::test]
async fn plain_group_chatter_is_ignored() {
    let mut h = harness(chats(), MockModel::new(), MockExtractor::new());
    h.dispatcher.handle(BotEvent::Ready).await;

    h.dispatcher
        .handle(BotEvent::Message(message(GROUP, "nice weather", 10)))
        .await;

    assert!(h.transport.sent().is_empty());
    assert_eq!(h.model.call_count(), 0);
}

// ---------------------------------------------------------------------------
// Admin
// ---------------------------------------------------------------------------

#[tokio::test]
async fn first_admin_message_gets_welcome() {
    let mut h = harness_with(chats(), MockModel::new(), MockExtractor::new(), Some("1234567"));

    h.dispatcher
        .handle(BotEvent::Message(message(ADMIN, "hello", 1)))
        .await;
    h.dispatcher
        .handle(BotEvent::Message(message(ADMIN, "hello again", 2)))
        .await;

    let replies = h.transport.replies();
    assert_eq!(replies.len(), 1);
    assert!(replies[0].starts_with("You've been recognized as the admin! 🤖"));
    assert_eq!(h.dispatcher.identity().chat_id(), Some(ADMIN));
}

#[tokio::test]
async fn debug_claims_admin_when_none_is_known() {
    let mut h = harness(chats(), MockModel::new(), MockExtractor::new());

    h.dispatcher
        .handle(BotEvent::Message(message("444@c.us", "/debug", 1)))
        .await;

    assert_eq!(h.dispatcher.identity().chat_id(), Some("444@c.us"));
    let replies = h.transport.replies();
    assert!(replies[0].starts_with("You've been recognized as admin through the debug command!"));
    assert!(replies[1].starts_with("*Debug Chat Information:*"));
    assert!(replies[1].contains("Your chat ID: `444@c.us`"));
    assert!(replies[1].contains("Total chats found: 2"));
    // No ADMIN_NUMBER: the number checks must not pass vacuously.
    assert!(replies[1].contains("- exactMatch: ✅\n"));
    assert!(replies[1].contains("- includesAdminNumber: ❌\n"));
    assert!(replies[1].contains("- senderEndsWithAdmin: ❌\n"));

    // A second claimant is not recognized.
    h.dispatcher
        .handle(BotEvent::Message(message("555@c.us", "/debug", 2)))
        .await;
    assert_eq!(h.transport.replies().len(), 2);
}

#[tokio::test]
async fn setactive_and_removeactive_persist() {
    let mut h = harness_with(
        MockTransport::new()
            .with_chat(GROUP, "Readers", Some(true))
            .with_chat(ADMIN, "Admin", Some(false)),
        MockModel::new(),
        MockExtractor::new(),
        Some("5551234567"),
    );
    let admin = |body: &str| BotEvent::Message(message(ADMIN, body, 1));

    h.dispatcher.handle(admin(&format!("/setactive {GROUP}"))).await;
    h.dispatcher.handle(admin(&format!("/setactive {GROUP}"))).await;

    let stored = std::fs::read_to_string(h.data.path().join("active-groups.json")).unwrap();
    assert!(stored.contains(GROUP));
    assert_eq!(
        h.status.read().await.active_group_ids,
        vec![GROUP.to_string()]
    );

    h.dispatcher.handle(admin(&format!("/removeactive {GROUP}"))).await;
    h.dispatcher.handle(admin(&format!("/removeactive {GROUP}"))).await;

    let replies = h.transport.replies();
    // First reply is the one-time welcome.
    assert_eq!(
        &replies[1..],
        &[
            "Successfully added *Readers* to active monitoring list. ✅".to_string(),
            "Group *Readers* is already being monitored.".to_string(),
            "Successfully removed *Readers* from active monitoring list. ❌".to_string(),
            "This group is not currently being monitored. Use /active to see monitored groups."
                .to_string(),
        ]
    );
    let stored = std::fs::read_to_string(h.data.path().join("active-groups.json")).unwrap();
    assert!(!stored.contains(GROUP));
}

#[tokio::test]
async fn setactive_rejects_bad_ids() {
    let mut h = harness_with(chats(), MockModel::new(), MockExtractor::new(), Some("5551234567"));
    let admin = |body: &str| BotEvent::Message(message(ADMIN, body, 1));

    h.dispatcher.handle(admin("/setactive")).await;
    h.dispatcher.handle(admin("/setactive 123@c.us")).await;
    h.dispatcher.handle(admin("/setactive 404@g.us")).await;

    let replies = h.transport.replies();
    assert_eq!(replies[1], "Please provide a group ID: /setactive <id>");
    assert_eq!(
        replies[2],
        "Error: The provided ID \"123@c.us\" doesn't look like a group ID. Group IDs should end with @g.us"
    );
    assert_eq!(
        replies[3],
        "Error: Could not set active group. Chat 404@g.us not found The group ID may be incorrect or you might not be a member of this group.\n\nPlease run /list to see available groups and their correct IDs."
    );
}

#[tokio::test]
async fn active_and_list_describe_groups() {
    let mut h = harness_with(chats(), MockModel::new(), MockExtractor::new(), Some("5551234567"));
    h.dispatcher.handle(BotEvent::Ready).await;
    let admin = |body: &str| BotEvent::Message(message(ADMIN, body, 1));

    h.dispatcher.handle(admin("/active")).await;
    h.dispatcher.handle(admin("/list")).await;

    let replies = h.transport.replies();
    assert_eq!(
        replies[0],
        format!(
            "*Currently Monitored Groups:*\n\n✅ *AGI*\nID: `{GROUP}`\n\n---\nTotal active groups: 1\n\nTo stop monitoring a group, use:\n*/removeactive <id>*"
        )
    );
    assert!(replies[1].starts_with("*Available Chats:*\n\n*Groups:*\nAGI 🟢\n"));
    assert!(replies[1].contains(&format!("\n*Direct Messages:*\nAdmin\nID: `{ADMIN}`\n\n")));
    assert!(replies[1].ends_with("*/active*"));
}

#[tokio::test]
async fn reset_forgets_admin_chat_and_unknown_lists_commands() {
    let mut h = harness(chats(), MockModel::new(), MockExtractor::new());
    h.dispatcher
        .handle(BotEvent::Message(message("444@c.us", "/debug", 1)))
        .await;

    let admin = |body: &str| BotEvent::Message(message("444@c.us", body, 2));
    h.dispatcher.handle(admin("/whatever")).await;
    h.dispatcher.handle(admin("/reset")).await;

    assert_eq!(h.dispatcher.identity().chat_id(), None);
    let replies = h.transport.replies();
    assert!(replies[2].starts_with("Unknown command. Available commands:\n/list"));
    assert!(replies[3].starts_with("Admin chat ID has been reset."));
}
