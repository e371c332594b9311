//! Persistent download history.
//!
//! The history is a single JSON object keyed by post unique id. A key is only
//! ever written after every media file of the post was confirmed on disk, so
//! its presence is enough to skip the post on later runs.

use crate::error::{Error, Result};
use crate::types::HistoryRecord;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// In-memory history, keyed by unique id
pub type HistoryMap = BTreeMap<String, HistoryRecord>;

/// JSON file backing the history
#[derive(Clone, Debug)]
pub struct HistoryStore {
    path: PathBuf,
}

impl HistoryStore {
    /// Create a store for the given file (the file does not need to exist)
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Path of the backing file
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the history
    ///
    /// Never fails: a missing, unreadable or corrupt file yields an empty map.
    pub async fn load(&self) -> HistoryMap {
        let content = match tokio::fs::read(&self.path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(path = %self.path.display(), "No history file yet, starting empty");
                return HistoryMap::new();
            }
            Err(e) => {
                tracing::warn!(path = %self.path.display(), error = %e, "Failed to read history file, starting empty");
                return HistoryMap::new();
            }
        };

        match serde_json::from_slice::<HistoryMap>(&content) {
            Ok(map) => {
                tracing::info!(path = %self.path.display(), entries = map.len(), "Loaded download history");
                map
            }
            Err(e) => {
                tracing::warn!(path = %self.path.display(), error = %e, "History file is corrupt, starting empty");
                HistoryMap::new()
            }
        }
    }

    /// Save the history as pretty-printed UTF-8 JSON
    ///
    /// The file is written next to its final location and renamed into place,
    /// so an interrupted save leaves the previous history intact.
    pub async fn save(&self, history: &HistoryMap) -> Result<()> {
        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            tokio::fs::create_dir_all(parent).await.map_err(|e| {
                Error::Io(std::io::Error::new(
                    e.kind(),
                    format!(
                        "Failed to create history directory '{}': {}",
                        parent.display(),
                        e
                    ),
                ))
            })?;
        }

        let content = serde_json::to_vec_pretty(history)?;
        let temp_path = self.temp_path();
        tokio::fs::write(&temp_path, &content).await?;
        if let Err(e) = tokio::fs::rename(&temp_path, &self.path).await {
            let _ = tokio::fs::remove_file(&temp_path).await;
            return Err(Error::Io(e));
        }

        tracing::debug!(path = %self.path.display(), entries = history.len(), "Saved download history");
        Ok(())
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_else(|| "history.json".into());
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{FileType, MediaSnapshot};
    use tempfile::TempDir;

    fn record(user: &str) -> HistoryRecord {
        HistoryRecord {
            platform: "weibo".into(),
            username: user.into(),
            desc: "微博正文".into(),
            create_time: "2025-03-01 12:00:00".into(),
            url: "https://weibo.com/1/123".into(),
            file_num: 1,
            files: vec![MediaSnapshot {
                filename: "a.jpg".into(),
                filepath: "downloads/weibo/alice/a.jpg".into(),
                url: "https://wx1.sinaimg.cn/large/a.jpg".into(),
                resolution: "800x600".into(),
                file_type: FileType::Image,
                duration: None,
                size: 10,
                human_readable_size: "10.00 B".into(),
                save_time: "2025-03-01 12:00:01".into(),
            }],
        }
    }

    #[tokio::test]
    async fn missing_file_loads_empty() {
        let dir = TempDir::new().unwrap();
        let store = HistoryStore::new(dir.path().join("nope.json"));
        assert!(store.load().await.is_empty());
    }

    #[tokio::test]
    async fn corrupt_file_loads_empty() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("history.json");
        std::fs::write(&path, "{ not json").unwrap();
        assert!(HistoryStore::new(&path).load().await.is_empty());

        // A JSON array is valid JSON but not a history
        std::fs::write(&path, "[\"weibo_1\"]").unwrap();
        assert!(HistoryStore::new(&path).load().await.is_empty());
    }

    #[tokio::test]
    async fn save_then_load_keeps_records() {
        let dir = TempDir::new().unwrap();
        let store = HistoryStore::new(dir.path().join("nested").join("history.json"));

        let mut map = HistoryMap::new();
        map.insert("weibo_123".into(), record("alice"));
        store.save(&map).await.unwrap();

        let loaded = store.load().await;
        assert_eq!(loaded, map);
        assert!(!store.temp_path().exists());
    }

    #[tokio::test]
    async fn saved_file_is_pretty_and_keeps_non_ascii() {
        let dir = TempDir::new().unwrap();
        let store = HistoryStore::new(dir.path().join("history.json"));

        let mut map = HistoryMap::new();
        map.insert("weibo_123".into(), record("小明"));
        store.save(&map).await.unwrap();

        let text = std::fs::read_to_string(store.path()).unwrap();
        assert!(text.contains("\"username\": \"小明\""));
        assert!(text.contains("微博正文"));
        assert!(text.contains("\n  \"weibo_123\": {"));
    }

    #[tokio::test]
    async fn save_into_unwritable_location_fails_without_panicking() {
        let dir = TempDir::new().unwrap();
        // A regular file where the parent directory should be
        let blocker = dir.path().join("blocker");
        std::fs::write(&blocker, "x").unwrap();
        let store = HistoryStore::new(blocker.join("history.json"));

        let result = store.save(&HistoryMap::new()).await;
        assert!(matches!(result, Err(Error::Io(_))));
    }
}
