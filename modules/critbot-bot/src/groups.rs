use std::collections::HashSet;
use std::path::{Path, PathBuf};

use critbot_common::Result;
use tracing::{info, warn};

const GROUPS_FILE: &str = "active-groups.json";

/// JSON array of monitored group ids on disk.
#[derive(Debug, Clone)]
pub struct GroupStore {
    path: PathBuf,
}

impl GroupStore {
    pub fn new(data_dir: impl AsRef<Path>) -> Self {
        Self {
            path: data_dir.as_ref().join(GROUPS_FILE),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Missing or unreadable file → empty list.
    pub async fn load(&self) -> Vec<String> {
        let raw = match tokio::fs::read_to_string(&self.path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                info!("No stored active groups found, starting with empty list");
                return Vec::new();
            }
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "Failed to read active groups");
                return Vec::new();
            }
        };

        match serde_json::from_str::<Vec<String>>(&raw) {
            Ok(groups) => {
                info!(count = groups.len(), "Loaded active groups from storage");
                groups
            }
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "Corrupt active groups file, ignoring");
                Vec::new()
            }
        }
    }

    pub async fn save(&self, groups: &[String]) -> Result<()> {
        if let Some(dir) = self.path.parent() {
            tokio::fs::create_dir_all(dir).await?;
        }
        let json = serde_json::to_string_pretty(groups)?;
        tokio::fs::write(&self.path, json).await?;
        info!(count = groups.len(), "Saved active groups to storage");
        Ok(())
    }
}

/// Groups the bot watches. Passed explicitly to whoever needs it and
/// persisted on every change.
#[derive(Debug)]
pub struct MonitoredGroups {
    ids: Vec<String>,
    /// Monitored for this run only (the default group fallback).
    transient: HashSet<String>,
    store: GroupStore,
}

impl MonitoredGroups {
    pub fn new(store: GroupStore) -> Self {
        Self {
            ids: Vec::new(),
            transient: HashSet::new(),
            store,
        }
    }

    /// Replace the in-memory list with what is on disk.
    pub async fn reload(&mut self) {
        self.ids = self.store.load().await;
        self.transient.clear();
    }

    pub fn ids(&self) -> &[String] {
        &self.ids
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.ids.iter().any(|g| g == id)
    }

    /// Monitor without persisting.
    pub fn add_transient(&mut self, id: &str) {
        if !self.contains(id) {
            self.ids.push(id.to_string());
            self.transient.insert(id.to_string());
        }
    }

    /// Returns `false` when already monitored. Memory changes only once the
    /// new list is on disk.
    pub async fn add(&mut self, id: &str) -> Result<bool> {
        if self.contains(id) {
            return Ok(false);
        }
        let mut next = self.ids.clone();
        next.push(id.to_string());
        self.persist(&next).await?;
        self.ids = next;
        Ok(true)
    }

    /// Returns `false` when not monitored. Memory changes only once the new
    /// list is on disk.
    pub async fn remove(&mut self, id: &str) -> Result<bool> {
        if !self.contains(id) {
            return Ok(false);
        }
        let next: Vec<String> = self.ids.iter().filter(|g| *g != id).cloned().collect();
        self.persist(&next).await?;
        self.ids = next;
        self.transient.remove(id);
        Ok(true)
    }

    async fn persist(&self, ids: &[String]) -> Result<()> {
        let durable: Vec<String> = ids
            .iter()
            .filter(|id| !self.transient.contains(*id))
            .cloned()
            .collect();
        self.store.save(&durable).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn missing_file_loads_empty() {
        let dir = tempfile::tempdir().unwrap();
        assert!(GroupStore::new(dir.path()).load().await.is_empty());
    }

    #[tokio::test]
    async fn corrupt_file_loads_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = GroupStore::new(dir.path());
        std::fs::write(store.path(), "{not json").unwrap();
        assert!(store.load().await.is_empty());
    }

    #[tokio::test]
    async fn add_and_remove_persist() {
        let dir = tempfile::tempdir().unwrap();
        let store = GroupStore::new(dir.path().join("nested"));
        let mut groups = MonitoredGroups::new(store.clone());

        assert!(groups.add("1@g.us").await.unwrap());
        assert!(!groups.add("1@g.us").await.unwrap());
        assert!(groups.add("2@g.us").await.unwrap());
        assert_eq!(store.load().await, vec!["1@g.us", "2@g.us"]);

        let raw = std::fs::read_to_string(store.path()).unwrap();
        assert!(raw.contains("\n  \"1@g.us\""));

        assert!(groups.remove("1@g.us").await.unwrap());
        assert!(!groups.remove("1@g.us").await.unwrap());
        assert_eq!(store.load().await, vec!["2@g.us"]);
    }

    #[tokio::test]
    async fn failed_write_leaves_groups_unchanged() {
        let dir = tempfile::tempdir().unwrap();
        let store = GroupStore::new(dir.path());
        let mut groups = MonitoredGroups::new(store.clone());
        groups.add("1@g.us").await.unwrap();

        // A directory where the file should be makes every write fail.
        std::fs::remove_file(store.path()).unwrap();
        std::fs::create_dir(store.path()).unwrap();

        assert!(groups.add("2@g.us").await.is_err());
        assert!(!groups.contains("2@g.us"));

        assert!(groups.remove("1@g.us").await.is_err());
        assert!(groups.contains("1@g.us"));
        assert_eq!(groups.ids(), ["1@g.us".to_string()]);
    }

    #[tokio::test]
    async fn transient_groups_are_not_persisted() {
        let dir = tempfile::tempdir().unwrap();
        let store = GroupStore::new(dir.path());
        let mut groups = MonitoredGroups::new(store.clone());

        groups.add_transient("agi@g.us");
        groups.add("other@g.us").await.unwrap();

        assert!(groups.contains("agi@g.us"));
        assert_eq!(store.load().await, vec!["other@g.us"]);

        let mut reloaded = MonitoredGroups::new(store);
        reloaded.reload().await;
        assert_eq!(reloaded.ids(), ["other@g.us".to_string()]);
    }
}
