use std::sync::Arc;
use std::time::Duration;

use ai_client::{CompletionModel, OpenAi};
use anyhow::{Context, Result};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use critbot_bot::{
    inbox, router, shared_status, AppState, BotEvent, BridgeTransport, DispatchSettings,
    Dispatcher, GroupStore, MonitoredGroups, Transport,
};
use critbot_common::Config;
use critbot_critic::{ConversationPipeline, CritiquePipeline, CritiqueStore, PromptLoader};
use critbot_extract::{ContentExtractor, PageBackend};

const INBOX_CAPACITY: usize = 256;

#[tokio::main]
async fn main() -> Result<()> {
    let filter = EnvFilter::from_default_env().add_directive("critbot=info".parse()?);
    if std::env::var("LOG_FORMAT").is_ok_and(|f| f == "json") {
        tracing_subscriber::fmt().json().with_env_filter(filter).init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }

    let config = Config::from_env()?;
    config.log_redacted();

    // --- Model + pipelines ---

    let mut openai = OpenAi::new(&config.openai_api_key, &config.openai_model)
        .with_timeout(Duration::from_secs(config.openai_timeout_secs));
    if let Some(url) = &config.openai_base_url {
        openai = openai.with_base_url(url);
    }
    let model: Arc<dyn CompletionModel> = Arc::new(openai);

    let extractor = ContentExtractor::new(PageBackend::from_config(&config)?)
        .context("Failed to set up content extraction")?;
    let prompts = PromptLoader::new(&config.prompts_dir);

    let critic = Arc::new(CritiquePipeline::new(
        Arc::new(extractor),
        model.clone(),
        prompts.clone(),
        CritiqueStore::new(&config.critics_dir),
    ));
    let chat = Arc::new(ConversationPipeline::new(model, prompts));

    // --- Transport + dispatcher ---

    let transport: Arc<dyn Transport> = Arc::new(BridgeTransport::new(
        &config.bridge_url,
        &config.bridge_session,
        config.bridge_api_key.as_deref(),
    )?);

    let status = shared_status(env!("CARGO_PKG_VERSION"));
    let groups = MonitoredGroups::new(GroupStore::new(&config.data_dir));
    let settings = DispatchSettings::builder()
        .admin_number(config.admin_number.clone())
        .default_group_name(config.default_group_name.clone())
        .reply_delay(Duration::from_millis(config.reply_delay_ms))
        .build();
    let dispatcher = Dispatcher::new(
        transport.clone(),
        critic,
        chat,
        groups,
        status.clone(),
        settings,
    );

    let (sender, inbox) = inbox::channel(INBOX_CAPACITY);
    tokio::spawn(inbox.run(dispatcher));

    // The bridge only reports status changes; an already-running session
    // is ready now.
    match transport.own_id().await {
        Ok(id) => {
            info!(id = %id, "Bridge session already running");
            sender.send(BotEvent::Ready).await?;
        }
        Err(e) => warn!(error = %e, "Bridge session not ready yet, waiting for webhook"),
    }

    // --- HTTP ---

    let app = router(AppState {
        status,
        inbox: sender,
    });
    let addr = format!("{}:{}", config.health_host, config.health_port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;
    info!("Health and webhook server listening on {addr}");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Shut down");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "Failed to listen for shutdown signal");
    }
    info!("Shutting down");
}
