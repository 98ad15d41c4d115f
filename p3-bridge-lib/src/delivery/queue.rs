//! Persistent FIFO retry queue.
//!
//! Entries live in a single pretty-printed JSON array file. Every
//! mutation persists synchronously via write-to-temp-then-rename; the
//! temp file sits in the same directory as the target so the rename is
//! atomic. A missing, empty, or malformed file loads as an empty queue
//! and is rewritten on the first persist.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::warn;
use uuid::Uuid;

use crate::error::{BridgeError, Result};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct QueueEntry {
    pub id: Uuid,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub last_tried_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub attempts: u32,
    pub method: String,
    pub url: String,
    #[serde(default)]
    pub headers: HashMap<String, String>,
    pub payload: Value,
    #[serde(default)]
    pub last_error: Option<String>,
}

impl QueueEntry {
    pub fn new(
        method: impl Into<String>,
        url: impl Into<String>,
        headers: HashMap<String, String>,
        payload: Value,
        last_error: Option<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            created_at: Utc::now(),
            last_tried_at: None,
            attempts: 0,
            method: method.into(),
            url: url.into(),
            headers,
            payload,
            last_error,
        }
    }
}

pub struct RetryQueue {
    path: PathBuf,
    entries: Vec<QueueEntry>,
}

impl RetryQueue {
    /// Load the queue file, treating anything unreadable as empty.
    pub async fn load(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref().to_path_buf();
        let entries = match tokio::fs::read(&path).await {
            Ok(bytes) if bytes.iter().all(u8::is_ascii_whitespace) => Vec::new(),
            Ok(bytes) => match serde_json::from_slice(&bytes) {
                Ok(entries) => entries,
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "malformed queue file, starting empty");
                    Vec::new()
                }
            },
            Err(_) => Vec::new(),
        };
        Self { path, entries }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn front(&self) -> Option<&QueueEntry> {
        self.entries.first()
    }

    pub fn entries(&self) -> &[QueueEntry] {
        &self.entries
    }

    /// Append an entry and persist.
    pub async fn enqueue(&mut self, entry: QueueEntry) -> Result<()> {
        self.entries.push(entry);
        self.persist().await
    }

    /// Remove the head after a successful replay and persist.
    pub async fn complete_head(&mut self) -> Result<QueueEntry> {
        if self.entries.is_empty() {
            return Err(BridgeError::Queue("complete_head on empty queue".to_string()));
        }
        let entry = self.entries.remove(0);
        self.persist().await?;
        Ok(entry)
    }

    /// Record a failed replay of the head and persist.
    pub async fn fail_head(&mut self, error: String) -> Result<()> {
        let Some(entry) = self.entries.first_mut() else {
            return Err(BridgeError::Queue("fail_head on empty queue".to_string()));
        };
        entry.attempts += 1;
        entry.last_tried_at = Some(Utc::now());
        entry.last_error = Some(error);
        self.persist().await
    }

    /// Atomic rewrite: pretty JSON to a sibling temp file, then rename
    /// over the target. The directory is fsynced best-effort so the
    /// rename survives a crash on strict filesystems.
    pub async fn persist(&self) -> Result<()> {
        let json = serde_json::to_string_pretty(&self.entries)
            .map_err(|e| BridgeError::Queue(format!("serialize queue: {e}")))?;
        let tmp = self.path.with_extension("json.tmp");
        tokio::fs::write(&tmp, format!("{json}\n"))
            .await
            .map_err(|e| BridgeError::Queue(format!("write {}: {e}", tmp.display())))?;
        tokio::fs::rename(&tmp, &self.path)
            .await
            .map_err(|e| BridgeError::Queue(format!("rename to {}: {e}", self.path.display())))?;
        if let Some(dir) = self.path.parent() {
            if let Ok(dir) = std::fs::File::open(dir) {
                let _ = dir.sync_all();
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn entry(n: u64) -> QueueEntry {
        QueueEntry::new(
            "POST",
            "http://localhost:9000/api",
            HashMap::new(),
            json!({ "n": n }),
            None,
        )
    }

    #[tokio::test]
    async fn persists_and_reloads_in_order() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("queue.json");
        let mut queue = RetryQueue::load(&path).await;
        assert!(queue.is_empty());
        for n in 0..3 {
            queue.enqueue(entry(n)).await.unwrap();
        }

        let reloaded = RetryQueue::load(&path).await;
        assert_eq!(reloaded.len(), 3);
        let ns: Vec<_> = reloaded.entries().iter().map(|e| e.payload["n"].clone()).collect();
        assert_eq!(ns, vec![json!(0), json!(1), json!(2)]);
    }

    #[tokio::test]
    async fn malformed_file_loads_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("queue.json");
        tokio::fs::write(&path, b"{not json").await.unwrap();
        let queue = RetryQueue::load(&path).await;
        assert!(queue.is_empty());
    }

    #[tokio::test]
    async fn fail_head_updates_attempts_and_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("queue.json");
        let mut queue = RetryQueue::load(&path).await;
        queue.enqueue(entry(1)).await.unwrap();
        queue.fail_head("HTTP 503".to_string()).await.unwrap();

        let reloaded = RetryQueue::load(&path).await;
        let head = reloaded.front().unwrap();
        assert_eq!(head.attempts, 1);
        assert_eq!(head.last_error.as_deref(), Some("HTTP 503"));
        assert!(head.last_tried_at.is_some());
    }

    #[tokio::test]
    async fn persist_leaves_no_temp_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("queue.json");
        let mut queue = RetryQueue::load(&path).await;
        queue.enqueue(entry(1)).await.unwrap();
        assert!(!path.with_extension("json.tmp").exists());
        let text = std::fs::read_to_string(&path).unwrap();
        assert!(text.ends_with('\n'));
        assert!(text.starts_with('['));
    }
}
