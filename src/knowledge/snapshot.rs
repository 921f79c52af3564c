//! Knowledge interchange format
//!
//! A snapshot is a JSON object:
//!
//! ```text
//! {
//!   "knowledgeBase":    { "<category>": { "<keyword>": "<answer>", ... }, ... },
//!   "stats":            { "totalRequests": 0, "successfulMatches": 0, "learnedPhrases": 0, ... },
//!   "learningSettings": { "autoLearn": true, "learningRate": 0.7, "minConfidence": 0.3 },
//!   "exportedAt":       "2024-01-01T00:00:00Z"
//! }
//! ```
//!
//! Only `knowledgeBase` is required. Snapshots arrive from files users pick,
//! so parsing never panics: a missing or ill-shaped table is reported as
//! [`Error::MalformedSnapshot`], while unreadable optional sections are
//! dropped with a warning.

use super::table::{KnowledgeEntry, KnowledgeTable};
use crate::error::{Error, Result};
use crate::responder::learning::LearningSettings;
use crate::responder::stats::Stats;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Exported responder state
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KnowledgeSnapshot {
    pub knowledge_base: KnowledgeTable,
    #[serde(default)]
    pub stats: Stats,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub learning_settings: Option<LearningSettings>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exported_at: Option<DateTime<Utc>>,
}

impl KnowledgeSnapshot {
    /// Parse snapshot JSON text
    pub fn from_json(text: &str) -> Result<Self> {
        let value: Value = serde_json::from_str(text)
            .map_err(|e| Error::MalformedSnapshot(format!("not valid JSON: {}", e)))?;
        Self::from_value(&value)
    }

    /// Validate and convert an already parsed JSON value
    pub fn from_value(value: &Value) -> Result<Self> {
        let object = value
            .as_object()
            .ok_or_else(|| Error::MalformedSnapshot("snapshot must be a JSON object".to_string()))?;

        let table_value = object
            .get("knowledgeBase")
            .ok_or_else(|| Error::MalformedSnapshot("missing knowledgeBase field".to_string()))?;
        let knowledge_base = parse_table(table_value)?;

        let stats = optional_section::<Stats>(object.get("stats"), "stats").unwrap_or_default();
        let learning_settings =
            optional_section::<LearningSettings>(object.get("learningSettings"), "learningSettings")
                .map(LearningSettings::clamped);
        let exported_at =
            optional_section::<DateTime<Utc>>(object.get("exportedAt"), "exportedAt");

        Ok(Self {
            knowledge_base,
            stats,
            learning_settings,
            exported_at,
        })
    }

    /// Pretty JSON text
    pub fn to_json_pretty(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

fn parse_table(value: &Value) -> Result<KnowledgeTable> {
    let categories = value
        .as_object()
        .ok_or_else(|| Error::MalformedSnapshot("knowledgeBase must be an object".to_string()))?;

    let mut table = KnowledgeTable::new();
    for (category, keywords) in categories {
        let keywords = keywords.as_object().ok_or_else(|| {
            Error::MalformedSnapshot(format!("category '{}' must be an object", category))
        })?;

        for (keyword, answer) in keywords {
            let answer = answer.as_str().ok_or_else(|| {
                Error::MalformedSnapshot(format!(
                    "answer for '{}' / '{}' must be a string",
                    category, keyword
                ))
            })?;
            let entry = KnowledgeEntry::new(category, keyword, answer).map_err(|e| {
                Error::MalformedSnapshot(format!("entry '{}' / '{}': {}", category, keyword, e))
            })?;
            table.insert(entry);
        }
    }
    Ok(table)
}

fn optional_section<T: serde::de::DeserializeOwned>(value: Option<&Value>, name: &str) -> Option<T> {
    let value = value.filter(|v| !v.is_null())?;
    match serde_json::from_value(value.clone()) {
        Ok(parsed) => Some(parsed),
        Err(e) => {
            tracing::warn!("Ignoring unreadable snapshot section {}: {}", name, e);
            None
        }
    }
}
