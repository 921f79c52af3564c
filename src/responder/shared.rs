//! Shared responder handle for concurrent callers
//!
//! Every operation that touches counters, the log or the table takes the
//! write lock, so one writer runs at a time. Answering a question updates
//! counters and is a write as well.

use super::{Responder, StatsReport};
use crate::error::Result;
use crate::knowledge::KnowledgeSnapshot;
use serde_json::Value;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Cloneable handle to one responder
#[derive(Clone)]
pub struct SharedResponder {
    inner: Arc<RwLock<Responder>>,
}

impl SharedResponder {
    pub fn new(responder: Responder) -> Self {
        Self {
            inner: Arc::new(RwLock::new(responder)),
        }
    }

    pub async fn answer(&self, question: &str) -> String {
        self.inner.write().await.answer(question)
    }

    pub async fn add_knowledge(&self, category: &str, keyword: &str, answer: &str) -> Result<()> {
        self.inner
            .write()
            .await
            .add_knowledge(category, keyword, answer)
    }

    pub async fn import_knowledge(&self, snapshot: &Value) -> Result<()> {
        self.inner.write().await.import_knowledge(snapshot)
    }

    pub async fn merge_knowledge(&self, snapshot: &Value) -> Result<usize> {
        self.inner.write().await.merge_knowledge(snapshot)
    }

    pub async fn reset_learning(&self) {
        self.inner.write().await.reset_learning()
    }

    pub async fn export_knowledge(&self) -> KnowledgeSnapshot {
        self.inner.read().await.export_knowledge()
    }

    pub async fn stats(&self) -> StatsReport {
        self.inner.read().await.stats()
    }

    /// Run a read-only closure against the responder
    pub async fn inspect<R>(&self, f: impl FnOnce(&Responder) -> R) -> R {
        f(&*self.inner.read().await)
    }
}

impl std::fmt::Debug for SharedResponder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SharedResponder").finish_non_exhaustive()
    }
}
