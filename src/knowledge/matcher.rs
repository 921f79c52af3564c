//! Question matching strategies
//!
//! A [`MatchStrategy`] looks at a normalized [`Question`] and proposes the
//! best [`ScoredCandidate`] from a [`KnowledgeTable`]. Whether the candidate
//! is good enough to answer with is decided by the responder.
//!
//! Two strategies exist:
//!
//! - [`CategoryGatedMatcher`]: a category's keywords are only scored when the
//!   question names the category. This is the default.
//! - [`PhraseMatcher`]: every keyword is scored against every question.

use super::table::KnowledgeTable;
use std::collections::HashSet;

/// Question words shorter than this never match keyword tokens.
const MIN_TOKEN_CHARS: usize = 2;

/// Normalized question text and its tokens
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Question {
    text: String,
    tokens: Vec<String>,
}

impl Question {
    /// Lowercase, trim and tokenize on whitespace
    pub fn new(raw: &str) -> Self {
        let text = raw.trim().to_lowercase();
        let tokens = tokenize(&text);
        Self { text, tokens }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn tokens(&self) -> &[String] {
        &self.tokens
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }
}

/// A keyword proposed as the answer to a question
#[derive(Debug, Clone, PartialEq)]
pub struct ScoredCandidate {
    pub category: String,
    pub keyword: String,
    pub answer: String,
    /// Heuristic match quality in `[0, 1]`
    pub score: f64,
}

/// Strategy for finding the best table entry for a question
pub trait MatchStrategy: Send + Sync {
    /// Short identifier used in logs
    fn name(&self) -> &'static str;

    /// Best candidate for the question, if any keyword scored above zero
    fn find(&self, table: &KnowledgeTable, question: &Question) -> Option<ScoredCandidate>;
}

/// Scores keywords of the categories a question names.
///
/// Iteration stops at the first keyword scoring above `high_confidence`, so a
/// strong early hit wins over a possibly stronger later one.
#[derive(Debug, Clone)]
pub struct CategoryGatedMatcher {
    high_confidence: f64,
}

impl CategoryGatedMatcher {
    pub fn new(high_confidence: f64) -> Self {
        Self { high_confidence }
    }
}

impl Default for CategoryGatedMatcher {
    fn default() -> Self {
        Self::new(0.8)
    }
}

impl MatchStrategy for CategoryGatedMatcher {
    fn name(&self) -> &'static str {
        "category"
    }

    fn find(&self, table: &KnowledgeTable, question: &Question) -> Option<ScoredCandidate> {
        let mut best: Option<ScoredCandidate> = None;

        for category in mentioned_categories(table, question) {
            for (keyword, answer) in table.keywords(category) {
                let score = keyword_score(question, keyword);
                let best_score = best.as_ref().map_or(0.0, |c| c.score);
                if score <= best_score {
                    continue;
                }

                best = Some(ScoredCandidate {
                    category: category.to_string(),
                    keyword: keyword.to_string(),
                    answer: answer.to_string(),
                    score,
                });

                if score > self.high_confidence {
                    tracing::debug!(category, keyword, score, "High-confidence keyword hit");
                    return best;
                }
            }
        }

        best
    }
}

/// Scores every keyword by phrase containment and shared long words.
///
/// Categories never gate a keyword; an entry of the first category the
/// question names only gets a small bonus.
#[derive(Debug, Clone, Default)]
pub struct PhraseMatcher;

impl PhraseMatcher {
    const PHRASE_HIT: f64 = 0.9;
    const WORD_HIT: f64 = 0.2;
    const CATEGORY_HIT: f64 = 0.1;
    const MIN_WORD_CHARS: usize = 4;
}

impl MatchStrategy for PhraseMatcher {
    fn name(&self) -> &'static str {
        "phrase"
    }

    fn find(&self, table: &KnowledgeTable, question: &Question) -> Option<ScoredCandidate> {
        let words: Vec<&str> = question
            .tokens()
            .iter()
            .map(String::as_str)
            .filter(|w| w.chars().count() >= Self::MIN_WORD_CHARS)
            .collect();
        let detected = mentioned_categories(table, question).first().map(|c| c.to_string());

        let mut best: Option<ScoredCandidate> = None;

        for entry in table.entries() {
            let mut score = 0.0;
            if question.text().contains(&entry.keyword) {
                score = Self::PHRASE_HIT;
            }

            let answer = entry.answer.to_lowercase();
            for word in &words {
                if entry.keyword.contains(word) || answer.contains(word) {
                    score += Self::WORD_HIT;
                }
            }
            if detected.as_deref() == Some(entry.category.as_str()) {
                score += Self::CATEGORY_HIT;
            }
            let score = f64::min(score, 1.0);

            if score > best.as_ref().map_or(0.0, |c| c.score) {
                best = Some(ScoredCandidate {
                    category: entry.category,
                    keyword: entry.keyword,
                    answer: entry.answer,
                    score,
                });
            }
        }

        best
    }
}

/// Split text into whitespace-delimited tokens
pub fn tokenize(text: &str) -> Vec<String> {
    text.split_whitespace().map(str::to_string).collect()
}

/// Score a keyword against a question.
///
/// Each keyword token earns a point when it and some question token contain
/// one another; the whole keyword appearing verbatim earns two more. The sum
/// is divided by `keyword tokens + 2`. Single-letter question words such as
/// "в" or "с" never count as contained in a keyword token.
pub fn keyword_score(question: &Question, keyword: &str) -> f64 {
    let keyword = keyword.to_lowercase();
    let keyword_tokens = tokenize(&keyword);
    let question_tokens: Vec<&str> = question
        .tokens()
        .iter()
        .map(String::as_str)
        .filter(|qw| qw.chars().count() >= MIN_TOKEN_CHARS)
        .collect();

    let mut points = keyword_tokens
        .iter()
        .filter(|kw| {
            question_tokens
                .iter()
                .any(|qw| qw.contains(kw.as_str()) || kw.contains(qw))
        })
        .count() as f64;

    if question.text().contains(&keyword) {
        points += 2.0;
    }

    points / (keyword_tokens.len() as f64 + 2.0)
}

/// Whether the question names the category.
///
/// The full name as a substring always counts. Otherwise every word of the
/// name must appear by its stem: words longer than four characters lose the
/// last one, so "математика" is named by "в математике".
pub fn mentions_category(question: &Question, category: &str) -> bool {
    if category.is_empty() {
        return false;
    }
    if question.text().contains(category) {
        return true;
    }
    category
        .split_whitespace()
        .all(|word| question.text().contains(stem(word)))
}

/// Categories named by the question, in table order
pub fn mentioned_categories<'t>(table: &'t KnowledgeTable, question: &Question) -> Vec<&'t str> {
    table
        .categories()
        .filter(|category| mentions_category(question, category))
        .collect()
}

/// Jaccard index of the two texts' lowercase token sets
pub fn jaccard_similarity(a: &str, b: &str) -> f64 {
    let a = a.to_lowercase();
    let b = b.to_lowercase();
    let left: HashSet<&str> = a.split_whitespace().collect();
    let right: HashSet<&str> = b.split_whitespace().collect();

    let union = left.union(&right).count();
    if union == 0 {
        return 0.0;
    }
    left.intersection(&right).count() as f64 / union as f64
}

fn stem(word: &str) -> &str {
    if word.chars().count() <= 4 {
        return word;
    }
    match word.char_indices().last() {
        Some((idx, _)) => &word[..idx],
        None => word,
    }
}
