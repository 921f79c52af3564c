//! On-disk snapshot persistence
//!
//! The store file is a knowledge snapshot with two extra fields:
//! `conversationHistory` (the most recent entries) and `lastSave`.
//! Writes go to a temporary sibling file which is then renamed over the
//! target, so a crash mid-write never leaves a truncated snapshot behind.

use crate::error::{Error, Result};
use crate::knowledge::KnowledgeSnapshot;
use crate::responder::{ConversationEntry, Responder};
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

/// Snapshot plus the conversation tail, as kept on disk
#[derive(Debug, Clone, PartialEq)]
pub struct StoredSnapshot {
    pub snapshot: KnowledgeSnapshot,
    pub conversation_history: Vec<ConversationEntry>,
    pub last_save: Option<DateTime<Utc>>,
}

impl StoredSnapshot {
    /// Capture a responder's state, keeping at most `history` log entries
    pub fn capture(responder: &Responder, history: usize) -> Self {
        Self {
            snapshot: responder.export_knowledge(),
            conversation_history: responder.history().recent(history),
            last_save: None,
        }
    }

    /// Load this state into a responder
    pub fn restore_into(self, responder: &mut Responder) {
        responder.restore(self.snapshot, self.conversation_history);
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct StoredFile<'a> {
    #[serde(flatten)]
    snapshot: &'a KnowledgeSnapshot,
    conversation_history: &'a [ConversationEntry],
    last_save: DateTime<Utc>,
}

/// JSON file holding one stored snapshot
#[derive(Debug, Clone)]
pub struct SnapshotStore {
    path: PathBuf,
    persisted_history: usize,
}

impl SnapshotStore {
    pub fn new(path: impl Into<PathBuf>, persisted_history: usize) -> Self {
        Self {
            path: path.into(),
            persisted_history,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Conversation entries written on save
    pub fn persisted_history(&self) -> usize {
        self.persisted_history
    }

    /// Read the stored snapshot; `None` when nothing has been saved yet
    pub async fn load(&self) -> Result<Option<StoredSnapshot>> {
        let text = match tokio::fs::read_to_string(&self.path).await {
            Ok(text) => text,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        let value: Value = serde_json::from_str(&text).map_err(|e| {
            Error::MalformedSnapshot(format!("{}: not valid JSON: {}", self.path.display(), e))
        })?;
        let snapshot = KnowledgeSnapshot::from_value(&value)?;
        let conversation_history = match value.get("conversationHistory") {
            None | Some(Value::Null) => Vec::new(),
            Some(history) => serde_json::from_value(history.clone()).unwrap_or_else(|e| {
                tracing::warn!(
                    "Ignoring unreadable conversation history in {}: {}",
                    self.path.display(),
                    e
                );
                Vec::new()
            }),
        };
        let last_save = value
            .get("lastSave")
            .and_then(|v| serde_json::from_value(v.clone()).ok());

        tracing::debug!(
            path = %self.path.display(),
            keywords = snapshot.knowledge_base.keyword_count(),
            history = conversation_history.len(),
            "Loaded snapshot"
        );

        Ok(Some(StoredSnapshot {
            snapshot,
            conversation_history,
            last_save,
        }))
    }

    /// Write a responder's current state
    pub async fn save_responder(&self, responder: &Responder) -> Result<()> {
        self.save(&StoredSnapshot::capture(responder, self.persisted_history))
            .await
    }

    /// Write a stored snapshot, replacing any previous file
    pub async fn save(&self, stored: &StoredSnapshot) -> Result<()> {
        let skip = stored
            .conversation_history
            .len()
            .saturating_sub(self.persisted_history);
        let file = StoredFile {
            snapshot: &stored.snapshot,
            conversation_history: &stored.conversation_history[skip..],
            last_save: Utc::now(),
        };
        let json = serde_json::to_string_pretty(&file)?;

        let dir = match self.path.parent() {
            Some(dir) if !dir.as_os_str().is_empty() => dir.to_path_buf(),
            _ => PathBuf::from("."),
        };
        tokio::fs::create_dir_all(&dir).await?;

        let tmp = dir.join(format!(".leo-{}.tmp", uuid::Uuid::new_v4()));
        if let Err(e) = tokio::fs::write(&tmp, json).await {
            let _ = tokio::fs::remove_file(&tmp).await;
            return Err(e.into());
        }
        if let Err(e) = tokio::fs::rename(&tmp, &self.path).await {
            let _ = tokio::fs::remove_file(&tmp).await;
            return Err(e.into());
        }

        tracing::info!(path = %self.path.display(), "Saved snapshot");
        Ok(())
    }

    /// Delete the stored file; a missing file is not an error
    pub async fn clear(&self) -> Result<()> {
        match tokio::fs::remove_file(&self.path).await {
            Ok(()) => {
                tracing::info!(path = %self.path.display(), "Removed snapshot");
                Ok(())
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}
