use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use chrono::{DateTime, Local, SecondsFormat, Utc};
use critbot_common::{CritiqueRecord, Result};
use regex::Regex;
use tracing::info;

/// Longest title fragment kept in a record file name.
const MAX_TITLE_CHARS: usize = 50;

static NON_ALNUM: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^a-zA-Z0-9]").expect("valid regex"));
static UNDERSCORE_RUNS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"_+").expect("valid regex"));

/// ISO-8601 UTC with millisecond precision and a `Z` suffix.
pub fn record_timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// File-name-safe title: ASCII alphanumerics kept, every other run of
/// characters becomes one `_`, cut to 50 characters.
pub fn sanitize_title(title: &str) -> String {
    let replaced = NON_ALNUM.replace_all(title, "_");
    let collapsed = UNDERSCORE_RUNS.replace_all(&replaced, "_");
    collapsed.chars().take(MAX_TITLE_CHARS).collect()
}

/// Append-only archive of critiques, one pretty-printed JSON file per
/// record, grouped in per-day directories.
#[derive(Debug, Clone)]
pub struct CritiqueStore {
    root: PathBuf,
}

impl CritiqueStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Where `record` lands when saved on `day`.
    pub fn path_for(&self, record: &CritiqueRecord, day: DateTime<Local>) -> PathBuf {
        let stamp = record.timestamp.replace([':', '.'], "-");
        let file = format!("{stamp}_{}.json", sanitize_title(&record.title));
        self.root.join(day.format("%Y-%m-%d").to_string()).join(file)
    }

    pub async fn save(&self, record: &CritiqueRecord) -> Result<PathBuf> {
        let path = self.path_for(record, Local::now());
        if let Some(dir) = path.parent() {
            tokio::fs::create_dir_all(dir).await?;
        }

        let json = serde_json::to_string_pretty(record)?;
        tokio::fs::write(&path, json).await?;

        info!(path = %path.display(), "Saved critique");
        Ok(path)
    }

    pub async fn load(&self, path: &Path) -> Result<CritiqueRecord> {
        let raw = tokio::fs::read_to_string(path).await?;
        Ok(serde_json::from_str(&raw)?)
    }
}
