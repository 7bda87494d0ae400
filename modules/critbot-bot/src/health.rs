// HTTP surface: health probe plus the bridge webhook.

use std::sync::Arc;

use axum::{
    extract::State,
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::RwLock;
use tower_http::trace::TraceLayer;
use tracing::{debug, warn};

use crate::inbox::InboxSender;
use crate::transport::bridge::{parse_webhook, WebhookEvent};

/// Process state reported by `/health`. Written by the dispatcher.
#[derive(Debug, Clone, Serialize)]
pub struct AppStatus {
    pub version: String,
    pub start_time: DateTime<Utc>,
    pub active_group_ids: Vec<String>,
    pub is_ready: bool,
    pub last_error: Option<String>,
}

impl AppStatus {
    pub fn new(version: impl Into<String>) -> Self {
        Self {
            version: version.into(),
            start_time: Utc::now(),
            active_group_ids: Vec::new(),
            is_ready: false,
            last_error: None,
        }
    }
}

pub type SharedStatus = Arc<RwLock<AppStatus>>;

pub fn shared_status(version: impl Into<String>) -> SharedStatus {
    Arc::new(RwLock::new(AppStatus::new(version)))
}

#[derive(Clone)]
pub struct AppState {
    pub status: SharedStatus,
    pub inbox: InboxSender,
}

#[derive(Serialize)]
struct HealthBody {
    status: &'static str,
    timestamp: DateTime<Utc>,
    uptime_secs: i64,
    #[serde(flatten)]
    app: AppStatus,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/webhook", post(webhook))
        .fallback(not_found)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn health(State(state): State<AppState>) -> impl IntoResponse {
    let app = state.status.read().await.clone();
    let now = Utc::now();
    Json(HealthBody {
        status: "up",
        timestamp: now,
        uptime_secs: (now - app.start_time).num_seconds(),
        app,
    })
}

async fn webhook(State(state): State<AppState>, Json(event): Json<WebhookEvent>) -> StatusCode {
    let kind = event.event.clone();
    match parse_webhook(event) {
        Ok(Some(bot_event)) => {
            if let Err(e) = state.inbox.send(bot_event).await {
                warn!(error = %e, "Dropping webhook event");
                return StatusCode::SERVICE_UNAVAILABLE;
            }
            StatusCode::OK
        }
        Ok(None) => {
            debug!(event = %kind, "Ignoring webhook event");
            StatusCode::OK
        }
        Err(e) => {
            warn!(event = %kind, error = %e, "Malformed webhook payload");
            StatusCode::BAD_REQUEST
        }
    }
}

async fn not_found() -> (StatusCode, &'static str) {
    (StatusCode::NOT_FOUND, "Not found")
}
