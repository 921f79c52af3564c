//! Usage counters and the stats read model

use super::history::ConversationEntry;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Request and learning counters
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Stats {
    pub total_requests: u64,
    pub successful_matches: u64,
    pub learned_phrases: u64,
    /// `successful_matches / total_requests`, 0 before the first request
    pub accuracy: f64,
    /// When the table last gained an entry
    pub last_learning: Option<DateTime<Utc>>,
}

impl Stats {
    /// Count one answered question
    pub fn record_request(&mut self, matched: bool) {
        self.total_requests += 1;
        if matched {
            self.successful_matches += 1;
        }
        self.refresh_accuracy();
    }

    /// Count one table insertion
    pub fn record_learning(&mut self) {
        self.learned_phrases += 1;
        self.last_learning = Some(Utc::now());
    }

    /// Recompute accuracy from the counters
    pub fn refresh_accuracy(&mut self) {
        self.accuracy = if self.total_requests == 0 {
            0.0
        } else {
            // Imported counters may be inconsistent; keep the ratio in range
            (self.successful_matches as f64 / self.total_requests as f64).min(1.0)
        };
    }
}

/// Snapshot of responder state for dashboards
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatsReport {
    pub total_requests: u64,
    pub successful_matches: u64,
    pub learned_phrases: u64,
    pub accuracy: f64,
    pub last_learning: Option<DateTime<Utc>>,
    pub categories: usize,
    pub total_keywords: usize,
    pub category_keywords: BTreeMap<String, usize>,
    pub last_conversation_entries: Vec<ConversationEntry>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_accuracy_zero_without_requests() {
        let mut stats = Stats::default();
        stats.refresh_accuracy();
        assert_eq!(stats.accuracy, 0.0);
    }

    #[test]
    fn test_record_request_updates_accuracy() {
        let mut stats = Stats::default();
        stats.record_request(true);
        stats.record_request(false);
        stats.record_request(true);
        stats.record_request(false);

        assert_eq!(stats.total_requests, 4);
        assert_eq!(stats.successful_matches, 2);
        assert!((stats.accuracy - 0.5).abs() < 1e-9);
    }

    #[test]
    fn test_record_learning_sets_timestamp() {
        let mut stats = Stats::default();
        assert!(stats.last_learning.is_none());
        stats.record_learning();
        assert_eq!(stats.learned_phrases, 1);
        assert!(stats.last_learning.is_some());
    }

    #[test]
    fn test_inconsistent_counters_are_clamped() {
        let mut stats = Stats {
            total_requests: 2,
            successful_matches: 5,
            ..Default::default()
        };
        stats.refresh_accuracy();
        assert_eq!(stats.accuracy, 1.0);
    }

    #[test]
    fn test_camel_case_fields() {
        let json = serde_json::to_value(Stats::default()).unwrap();
        assert!(json.get("totalRequests").is_some());
        assert!(json.get("successfulMatches").is_some());
        assert!(json.get("learnedPhrases").is_some());
        assert!(json.get("lastLearning").is_some());
    }

    #[test]
    fn test_partial_stats_deserialize() {
        let stats: Stats = serde_json::from_str(r#"{"totalRequests": 3}"#).unwrap();
        assert_eq!(stats.total_requests, 3);
        assert_eq!(stats.learned_phrases, 0);
    }
}
