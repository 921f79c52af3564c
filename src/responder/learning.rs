//! Auto-learn: growing the table from observed questions
//!
//! When a question names a known category and carries a long word the
//! category does not know yet, a templated entry for that word is inserted.
//! Whether an eligible question is learned from is a sampled decision, drawn
//! from a seedable generator so tests can make it deterministic.

use super::history::{ConversationLog, Sender};
use crate::config::LearningConfig;
use crate::knowledge::matcher::{jaccard_similarity, mentions_category, Question};
use crate::knowledge::table::KnowledgeTable;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

/// Questions shorter than this (in characters) are never learned from.
pub const MIN_QUESTION_CHARS: usize = 5;

/// Words must be longer than this (in characters) to become keywords.
pub const MIN_KEYWORD_CHARS: usize = 3;

/// Learning settings carried in snapshots
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LearningSettings {
    pub auto_learn: bool,
    /// Probability in `[0, 1]` that an eligible question is learned from
    pub learning_rate: f64,
    pub min_confidence: f64,
}

impl LearningSettings {
    /// Force both rates into `[0, 1]`
    pub fn clamped(mut self) -> Self {
        self.learning_rate = clamp_unit(self.learning_rate);
        self.min_confidence = clamp_unit(self.min_confidence);
        self
    }
}

impl Default for LearningSettings {
    fn default() -> Self {
        Self::from(&LearningConfig::default())
    }
}

impl From<&LearningConfig> for LearningSettings {
    fn from(config: &LearningConfig) -> Self {
        Self {
            auto_learn: config.auto_learn,
            learning_rate: config.learning_rate,
            min_confidence: config.min_confidence,
        }
        .clamped()
    }
}

fn clamp_unit(value: f64) -> f64 {
    if value.is_nan() {
        0.0
    } else {
        value.clamp(0.0, 1.0)
    }
}

/// Seedable source of the responder's random decisions
#[derive(Debug, Clone)]
pub struct Sampler {
    rng: StdRng,
}

impl Sampler {
    /// Seeded when `seed` is given, entropy-seeded otherwise
    pub fn new(seed: Option<u64>) -> Self {
        let rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self { rng }
    }

    /// True with probability `rate`
    pub fn chance(&mut self, rate: f64) -> bool {
        self.rng.gen::<f64>() < rate
    }

    /// Uniform pick from a non-empty pool
    pub fn choose<'a>(&mut self, pool: &[&'a str]) -> Option<&'a str> {
        pool.choose(&mut self.rng).copied()
    }
}

/// Whether a user asked a near-identical question within the last `window`
/// conversation entries.
pub fn is_recent_repeat(
    history: &ConversationLog,
    question: &str,
    window: usize,
    threshold: f64,
) -> bool {
    history
        .iter()
        .rev()
        .take(window)
        .filter(|entry| entry.sender == Sender::User)
        .any(|entry| jaccard_similarity(question, &entry.text) > threshold)
}

/// First question word long enough to be a keyword and unknown to `category`.
///
/// Words that merely name the category are skipped.
pub fn new_keyword<'q>(
    table: &KnowledgeTable,
    category: &str,
    question: &'q Question,
) -> Option<&'q str> {
    question
        .tokens()
        .iter()
        .map(String::as_str)
        .find(|word| {
            word.chars().count() > MIN_KEYWORD_CHARS
                && !table.contains_keyword(category, word)
                && !names_category(word, category)
        })
}

fn names_category(word: &str, category: &str) -> bool {
    let word = Question::new(word);
    category
        .split_whitespace()
        .any(|part| mentions_category(&word, part))
}

/// Answer text stored for a learned word
pub fn learned_answer(word: &str, category: &str) -> String {
    format!(
        "Я узнал о \"{}\" в контексте {}. Это связано с изучением данной темы. \
         Рекомендую обратиться к учебнику для подробной информации.",
        word, category
    )
}
