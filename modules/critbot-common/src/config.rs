use std::env;
use std::path::PathBuf;

use crate::error::{CritbotError, Result};

/// Application configuration loaded from environment variables (and `.env`).
#[derive(Debug, Clone)]
pub struct Config {
    // Language model
    pub openai_api_key: String,
    pub openai_model: String,
    pub openai_base_url: Option<String>,
    pub openai_timeout_secs: u64,

    // Admin
    pub admin_number: Option<String>,

    // Paths
    pub data_dir: PathBuf,
    pub critics_dir: PathBuf,
    pub prompts_dir: PathBuf,

    // Page rendering: "chrome", "browserless" or "none"
    pub page_backend: String,
    pub chrome_bin: String,
    pub browserless_url: Option<String>,
    pub browserless_token: Option<String>,

    // Messaging bridge
    pub bridge_url: String,
    pub bridge_session: String,
    pub bridge_api_key: Option<String>,

    // Web server (health + webhook)
    pub health_host: String,
    pub health_port: u16,

    // Dispatch
    pub default_group_name: Option<String>,
    pub reply_delay_ms: u64,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();

        Ok(Self {
            openai_api_key: required_env("OPENAI_API_KEY")?,
            openai_model: env::var("OPENAI_MODEL")
                .unwrap_or_else(|_| "gpt-4.5-preview".to_string()),
            openai_base_url: optional_env("OPENAI_BASE_URL"),
            openai_timeout_secs: parsed_env("OPENAI_TIMEOUT_SECS", 120)?,
            admin_number: optional_env("ADMIN_NUMBER"),
            data_dir: path_env("DATA_DIR", "data"),
            critics_dir: path_env("CRITICS_DIR", "critics"),
            prompts_dir: path_env("PROMPTS_DIR", "prompts"),
            page_backend: env::var("PAGE_BACKEND")
                .unwrap_or_else(|_| "chrome".to_string())
                .to_lowercase(),
            chrome_bin: env::var("CHROME_BIN").unwrap_or_else(|_| "chromium".to_string()),
            browserless_url: optional_env("BROWSERLESS_URL"),
            browserless_token: optional_env("BROWSERLESS_TOKEN"),
            bridge_url: env::var("BRIDGE_URL")
                .unwrap_or_else(|_| "http://localhost:3001".to_string()),
            bridge_session: env::var("BRIDGE_SESSION").unwrap_or_else(|_| "default".to_string()),
            bridge_api_key: optional_env("BRIDGE_API_KEY"),
            health_host: env::var("HEALTH_HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            health_port: parsed_env("HEALTH_PORT", 3000)?,
            default_group_name: match env::var("DEFAULT_GROUP_NAME") {
                Ok(name) if name.trim().is_empty() => None,
                Ok(name) => Some(name),
                Err(_) => Some("AGI".to_string()),
            },
            reply_delay_ms: parsed_env("REPLY_DELAY_MS", 2000)?,
        })
    }

    /// Log the configuration with secrets reduced to short previews.
    pub fn log_redacted(&self) {
        fn preview(val: &str) -> String {
            let n = val.chars().count().min(3);
            let head: String = val.chars().take(n).collect();
            format!("{head}...({} chars)", val.chars().count())
        }
        fn preview_opt(val: &Option<String>) -> String {
            match val {
                Some(v) if !v.is_empty() => preview(v),
                _ => "<not set>".to_string(),
            }
        }

        tracing::info!("Config loaded:");
        tracing::info!("  OPENAI_API_KEY: {}", preview(&self.openai_api_key));
        tracing::info!("  OPENAI_MODEL: {}", self.openai_model);
        tracing::info!("  ADMIN_NUMBER: {}", preview_opt(&self.admin_number));
        tracing::info!("  PAGE_BACKEND: {}", self.page_backend);
        tracing::info!("  BROWSERLESS_TOKEN: {}", preview_opt(&self.browserless_token));
        tracing::info!("  BRIDGE_URL: {}", self.bridge_url);
        tracing::info!("  BRIDGE_API_KEY: {}", preview_opt(&self.bridge_api_key));

        if self.admin_number.is_none() {
            tracing::warn!(
                "ADMIN_NUMBER is not set; send /debug from your phone to claim admin on first run"
            );
        }
    }
}

fn required_env(key: &str) -> Result<String> {
    env::var(key).map_err(|_| CritbotError::Config(format!("{key} environment variable is required")))
}

fn optional_env(key: &str) -> Option<String> {
    env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn path_env(key: &str, default: &str) -> PathBuf {
    PathBuf::from(env::var(key).unwrap_or_else(|_| default.to_string()))
}

fn parsed_env<T: std::str::FromStr>(key: &str, default: T) -> Result<T> {
    match env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map_err(|_| CritbotError::Config(format!("{key} must be a number, got {raw:?}"))),
        Err(_) => Ok(default),
    }
}
