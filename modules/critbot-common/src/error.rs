use thiserror::Error;

pub type Result<T> = std::result::Result<T, CritbotError>;

#[derive(Error, Debug)]
pub enum CritbotError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Storage error: {0}")]
    Storage(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error(transparent)]
    Anyhow(#[from] anyhow::Error),
}
