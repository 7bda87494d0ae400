use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

const CRITIC_PROMPT_FILE: &str = "critic_prompt.md";
const CHAT_PROMPT_FILE: &str = "ai_bot_prompt.md";

/// Reads persona prompts from disk on every call, so edits take effect
/// without a restart.
#[derive(Debug, Clone)]
pub struct PromptLoader {
    dir: PathBuf,
}

impl PromptLoader {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Critic persona without its markdown title and the blank line after it.
    pub async fn critic(&self) -> Result<String> {
        let raw = self.read(CRITIC_PROMPT_FILE).await?;
        let body = raw.split('\n').skip(2).collect::<Vec<_>>().join("\n");
        Ok(body.trim().to_string())
    }

    pub async fn chat(&self) -> Result<String> {
        Ok(self.read(CHAT_PROMPT_FILE).await?.trim().to_string())
    }

    async fn read(&self, file: &str) -> Result<String> {
        let path = self.dir.join(file);
        tokio::fs::read_to_string(&path)
            .await
            .with_context(|| format!("Failed to load prompt {}", path.display()))
    }
}
