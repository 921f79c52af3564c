//! Leo configuration management

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Main Leo configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LeoConfig {
    /// Responder behaviour
    #[serde(default)]
    pub responder: ResponderConfig,

    /// Auto-learn settings
    #[serde(default)]
    pub learning: LearningConfig,

    /// Snapshot persistence
    #[serde(default)]
    pub storage: StorageConfig,
}

impl LeoConfig {
    /// Load configuration from a TOML file and validate it
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&content)
            .map_err(|e| Error::Config(format!("{}: {}", path.display(), e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Reject values the responder cannot work with
    pub fn validate(&self) -> Result<()> {
        let rates = [
            ("learning.learning_rate", self.learning.learning_rate),
            ("learning.min_confidence", self.learning.min_confidence),
            ("responder.similarity_threshold", self.responder.similarity_threshold),
            ("responder.high_confidence", self.responder.high_confidence),
            ("responder.low_confidence", self.responder.low_confidence),
        ];
        for (name, value) in rates {
            if !(0.0..=1.0).contains(&value) {
                return Err(Error::Config(format!(
                    "{} must be within 0..=1, got {}",
                    name, value
                )));
            }
        }

        if self.responder.low_confidence > self.responder.high_confidence {
            return Err(Error::Config(
                "responder.low_confidence must not exceed responder.high_confidence".to_string(),
            ));
        }
        if self.responder.history_capacity == 0 {
            return Err(Error::Config(
                "responder.history_capacity must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

/// Which matching strategy answers questions
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MatcherKind {
    /// Category name must appear in the question before its keywords are scored
    #[default]
    Category,
    /// Keywords are scored against every question regardless of category
    Phrase,
}

/// Responder configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ResponderConfig {
    /// Matching strategy
    pub matcher: MatcherKind,

    /// Conversation entries kept in memory
    pub history_capacity: usize,

    /// Conversation entries inspected for near-duplicate questions
    pub recent_window: usize,

    /// Jaccard similarity above which a question counts as a repeat
    pub similarity_threshold: f64,

    /// Score above which the first hit is returned immediately
    pub high_confidence: f64,

    /// Score above which the best candidate is accepted
    pub low_confidence: f64,

    /// Fixed seed for sampling; entropy-seeded when absent
    pub rng_seed: Option<u64>,

    /// Start with the bundled school-subject table when nothing is persisted
    pub seed_builtin: bool,
}

impl Default for ResponderConfig {
    fn default() -> Self {
        Self {
            matcher: MatcherKind::Category,
            history_capacity: 100,
            recent_window: 10,
            similarity_threshold: 0.8,
            high_confidence: 0.8,
            low_confidence: 0.3,
            rng_seed: None,
            seed_builtin: true,
        }
    }
}

/// Auto-learn configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LearningConfig {
    /// Insert templated entries for unseen words of categorized questions
    pub auto_learn: bool,

    /// Probability that an eligible question is learned from
    pub learning_rate: f64,

    /// Carried in snapshots for compatibility with exported data
    pub min_confidence: f64,
}

impl Default for LearningConfig {
    fn default() -> Self {
        Self {
            auto_learn: true,
            learning_rate: 0.7,
            min_confidence: 0.3,
        }
    }
}

/// Storage configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Snapshot file
    pub data_file: PathBuf,

    /// Conversation entries written alongside the snapshot
    pub persisted_history: usize,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_file: default_data_dir().join("knowledge.json"),
            persisted_history: 50,
        }
    }
}

/// Default data directory (`<data_local_dir>/leo`)
pub fn default_data_dir() -> PathBuf {
    dirs_next::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("leo")
}
