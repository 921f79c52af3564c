//! Knowledge responder
//!
//! Answers free-text questions from a [`KnowledgeTable`], keeps request
//! counters and a bounded conversation log, and optionally grows the table
//! from the questions it sees.
//!
//! ```text
//! question ──► normalize ──► MatchStrategy ──► score > low_confidence? ──► answer
//!                                                     │ no
//!                                                     ▼
//!                                              fallback pool
//!               ──► history (user + assistant) ──► auto-learn (sampled)
//! ```

pub mod history;
pub mod learning;
pub mod shared;
pub mod stats;

pub use history::{ConversationEntry, ConversationLog, Sender};
pub use learning::{LearningSettings, Sampler};
pub use shared::SharedResponder;
pub use stats::{Stats, StatsReport};

use crate::config::{LeoConfig, MatcherKind, ResponderConfig};
use crate::error::Result;
use crate::knowledge::matcher::{mentioned_categories, CategoryGatedMatcher, PhraseMatcher};
use crate::knowledge::{KnowledgeEntry, KnowledgeSnapshot, KnowledgeTable, MatchStrategy, Question};
use chrono::Utc;
use serde_json::Value;

/// Replies used when no keyword matches well enough.
pub const FALLBACK_RESPONSES: &[&str] = &[
    "Интересный вопрос! Давайте разберем его вместе.",
    "Это важная тема. Рекомендую обратиться к учебнику или спросить у учителя.",
    "Попробуйте разбить задачу на части и решать по шагам.",
    "У меня пока нет подробной информации по этому вопросу, но я обязательно изучу его!",
    "Проверьте, правильно ли вы понимаете условие задачи.",
    "Эта тема будет подробно изучаться позже в учебном плане.",
    "Могу предложить поискать информацию в учебнике на странице...",
    "Давайте я объясню основные понятия по этой теме.",
    "Хороший вопрос! Для начала вспомним базовые определения.",
    "Попробуйте сформулировать вопрос более конкретно.",
];

/// Conversation entries included in [`StatsReport`].
pub const REPORT_HISTORY: usize = 5;

/// Keyword responder owning its table, counters and conversation log
pub struct Responder {
    table: KnowledgeTable,
    stats: Stats,
    history: ConversationLog,
    settings: LearningSettings,
    config: ResponderConfig,
    strategy: Box<dyn MatchStrategy>,
    sampler: Sampler,
}

impl Responder {
    /// Create a responder with an empty table
    pub fn new(config: &LeoConfig) -> Self {
        let strategy: Box<dyn MatchStrategy> = match config.responder.matcher {
            MatcherKind::Category => {
                Box::new(CategoryGatedMatcher::new(config.responder.high_confidence))
            }
            MatcherKind::Phrase => Box::new(PhraseMatcher),
        };

        Self {
            table: KnowledgeTable::new(),
            stats: Stats::default(),
            history: ConversationLog::new(config.responder.history_capacity),
            settings: LearningSettings::from(&config.learning),
            config: config.responder.clone(),
            strategy,
            sampler: Sampler::new(config.responder.rng_seed),
        }
    }

    /// Create a responder, seeded with the bundled table when configured
    pub fn from_config(config: &LeoConfig) -> Self {
        let mut responder = Self::new(config);
        if config.responder.seed_builtin {
            responder.table = KnowledgeTable::builtin();
        }
        responder
    }

    /// Replace the matching strategy
    pub fn with_strategy(mut self, strategy: Box<dyn MatchStrategy>) -> Self {
        self.strategy = strategy;
        self
    }

    /// Restore a previously saved table, counters and conversation log.
    ///
    /// Learning settings stay as configured; the snapshot's copy is ignored.
    pub fn restore(&mut self, snapshot: KnowledgeSnapshot, history: Vec<ConversationEntry>) {
        self.table = snapshot.knowledge_base;
        self.stats = snapshot.stats;
        self.stats.refresh_accuracy();
        self.history.clear();
        self.history.extend(history);
    }

    /// Answer a question.
    ///
    /// Always returns some text: either a matched answer or a reply from
    /// [`FALLBACK_RESPONSES`]. Updates counters, appends to the conversation
    /// log and may learn a new keyword.
    pub fn answer(&mut self, question: &str) -> String {
        let normalized = Question::new(question);
        let repeat = learning::is_recent_repeat(
            &self.history,
            normalized.text(),
            self.config.recent_window,
            self.config.similarity_threshold,
        );

        let matched = if normalized.is_empty() {
            None
        } else {
            self.strategy
                .find(&self.table, &normalized)
                .filter(|candidate| candidate.score > self.config.low_confidence)
        };

        let answer = match matched {
            Some(candidate) => {
                tracing::debug!(
                    strategy = self.strategy.name(),
                    category = %candidate.category,
                    keyword = %candidate.keyword,
                    score = candidate.score,
                    "Matched question"
                );
                self.stats.record_request(true);
                candidate.answer
            }
            None => {
                tracing::debug!(strategy = self.strategy.name(), "No match, using fallback");
                self.stats.record_request(false);
                self.fallback()
            }
        };

        self.history
            .push(ConversationEntry::new(Sender::User, question));
        self.history
            .push(ConversationEntry::new(Sender::Assistant, answer.clone()));

        if self.settings.auto_learn
            && normalized.text().chars().count() >= learning::MIN_QUESTION_CHARS
            && !repeat
            && self.sampler.chance(self.settings.learning_rate)
        {
            self.learn_from(&normalized);
        }

        answer
    }

    /// Insert or overwrite an entry
    pub fn add_knowledge(&mut self, category: &str, keyword: &str, answer: &str) -> Result<()> {
        let entry = KnowledgeEntry::new(category, keyword, answer).map_err(|e| {
            tracing::warn!("Rejected knowledge entry: {}", e);
            e
        })?;
        tracing::info!(category = %entry.category, keyword = %entry.keyword, "Added knowledge");
        self.table.insert(entry);
        self.stats.record_learning();
        Ok(())
    }

    /// Full table, counters and learning settings
    pub fn export_knowledge(&self) -> KnowledgeSnapshot {
        KnowledgeSnapshot {
            knowledge_base: self.table.clone(),
            stats: self.stats.clone(),
            learning_settings: Some(self.settings.clone()),
            exported_at: Some(Utc::now()),
        }
    }

    /// Replace the table with the snapshot's table.
    ///
    /// Adopts the snapshot's learning settings when present and recounts
    /// learned phrases from the new table. On error nothing changes.
    pub fn import_knowledge(&mut self, snapshot: &Value) -> Result<()> {
        let snapshot = Self::validated(KnowledgeSnapshot::from_value(snapshot))?;
        self.replace_table(snapshot);
        Ok(())
    }

    /// [`Self::import_knowledge`] for raw JSON text
    pub fn import_knowledge_json(&mut self, text: &str) -> Result<()> {
        let snapshot = Self::validated(KnowledgeSnapshot::from_json(text))?;
        self.replace_table(snapshot);
        Ok(())
    }

    /// Upsert the snapshot's entries into the current table, returning how
    /// many were merged. On error nothing changes.
    pub fn merge_knowledge(&mut self, snapshot: &Value) -> Result<usize> {
        let snapshot = Self::validated(KnowledgeSnapshot::from_value(snapshot))?;
        let merged = self.table.merge(snapshot.knowledge_base);
        self.recount_learned();
        tracing::info!(merged, "Merged knowledge");
        Ok(merged)
    }

    /// Wipe table, counters and conversation log
    pub fn reset_learning(&mut self) {
        self.table.clear();
        self.stats = Stats::default();
        self.history.clear();
        tracing::info!("Responder reset to empty state");
    }

    /// Counters, table sizes and the latest conversation entries
    pub fn stats(&self) -> StatsReport {
        StatsReport {
            total_requests: self.stats.total_requests,
            successful_matches: self.stats.successful_matches,
            learned_phrases: self.stats.learned_phrases,
            accuracy: self.stats.accuracy,
            last_learning: self.stats.last_learning,
            categories: self.table.category_count(),
            total_keywords: self.table.keyword_count(),
            category_keywords: self.table.keyword_counts(),
            last_conversation_entries: self.history.recent(REPORT_HISTORY),
        }
    }

    pub fn table(&self) -> &KnowledgeTable {
        &self.table
    }

    pub fn history(&self) -> &ConversationLog {
        &self.history
    }

    pub fn learning_settings(&self) -> &LearningSettings {
        &self.settings
    }

    /// Replace learning settings; rates are clamped into `[0, 1]`
    pub fn set_learning_settings(&mut self, settings: LearningSettings) {
        self.settings = settings.clamped();
    }

    fn fallback(&mut self) -> String {
        self.sampler
            .choose(FALLBACK_RESPONSES)
            .unwrap_or(FALLBACK_RESPONSES[0])
            .to_string()
    }

    fn learn_from(&mut self, question: &Question) {
        let Some(category) = mentioned_categories(&self.table, question)
            .first()
            .map(|c| c.to_string())
        else {
            return;
        };
        let Some(word) = learning::new_keyword(&self.table, &category, question) else {
            return;
        };

        let answer = learning::learned_answer(word, &category);
        if self.add_knowledge(&category, word, &answer).is_ok() {
            tracing::info!(category = %category, keyword = word, "Auto-learned keyword");
        }
    }

    fn replace_table(&mut self, snapshot: KnowledgeSnapshot) {
        self.table = snapshot.knowledge_base;
        if let Some(settings) = snapshot.learning_settings {
            self.settings = settings;
        }
        self.recount_learned();
        tracing::info!(
            categories = self.table.category_count(),
            keywords = self.table.keyword_count(),
            "Imported knowledge"
        );
    }

    fn recount_learned(&mut self) {
        self.stats.learned_phrases = self.table.keyword_count() as u64;
    }

    fn validated(result: Result<KnowledgeSnapshot>) -> Result<KnowledgeSnapshot> {
        result.map_err(|e| {
            tracing::warn!("Rejected knowledge snapshot: {}", e);
            e
        })
    }
}

impl Default for Responder {
    fn default() -> Self {
        Self::new(&LeoConfig::default())
    }
}

impl std::fmt::Debug for Responder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Responder")
            .field("strategy", &self.strategy.name())
            .field("categories", &self.table.category_count())
            .field("keywords", &self.table.keyword_count())
            .field("stats", &self.stats)
            .field("history", &self.history.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use serde_json::json;

    const EQUATION: &str = "Уравнение — это равенство с переменной.";

    fn config(auto_learn: bool) -> LeoConfig {
        let mut config = LeoConfig::default();
        config.responder.rng_seed = Some(7);
        config.responder.seed_builtin = false;
        config.learning.auto_learn = auto_learn;
        config.learning.learning_rate = 1.0;
        config
    }

    fn math_responder() -> Responder {
        let mut responder = Responder::new(&config(false));
        responder
            .add_knowledge("математика", "уравнение", EQUATION)
            .unwrap();
        responder
    }

    #[test]
    fn test_added_knowledge_is_answered() {
        let mut responder = Responder::new(&config(false));
        responder
            .add_knowledge("физика", "закон ньютона", "F = ma")
            .unwrap();

        assert_eq!(responder.answer("физика: закон ньютона?"), "F = ma");
        assert_eq!(responder.stats().successful_matches, 1);
    }

    #[test]
    fn test_question_without_category_falls_back() {
        let mut responder = math_responder();
        let answer = responder.answer("что такое уравнение");

        assert!(FALLBACK_RESPONSES.contains(&answer.as_str()));
        let stats = responder.stats();
        assert_eq!(stats.total_requests, 1);
        assert_eq!(stats.successful_matches, 0);
    }

    #[test]
    fn test_question_naming_category_matches() {
        let mut responder = math_responder();
        assert_eq!(responder.answer("уравнение в математике помогите"), EQUATION);
        assert_eq!(responder.answer("Уравнение математика"), EQUATION);
    }

    #[test]
    fn test_weak_match_above_low_threshold() {
        let mut responder = Responder::new(&config(false));
        responder
            .add_knowledge("физика", "закон ньютона", "F = ma")
            .unwrap();
        // "закон" alone: score 1 / 4, below the 0.3 threshold
        let answer = responder.answer("физика закон");
        assert!(FALLBACK_RESPONSES.contains(&answer.as_str()));

        // "закон" and "ньютон" both hit: 2 / 4
        assert_eq!(responder.answer("физика закон ньютон"), "F = ma");
    }

    #[test]
    fn test_empty_question_falls_back_and_counts() {
        let mut responder = math_responder();
        let answer = responder.answer("   ");
        assert!(FALLBACK_RESPONSES.contains(&answer.as_str()));
        assert_eq!(responder.stats().total_requests, 1);
    }

    #[test]
    fn test_answer_appends_history() {
        let mut responder = math_responder();
        responder.answer("математика уравнение");

        let entries: Vec<_> = responder.history().iter().collect();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].sender, Sender::User);
        assert_eq!(entries[0].text, "математика уравнение");
        assert_eq!(entries[1].sender, Sender::Assistant);
        assert_eq!(entries[1].text, EQUATION);
    }

    #[test]
    fn test_history_is_bounded() {
        let mut config = config(false);
        config.responder.history_capacity = 4;
        let mut responder = Responder::new(&config);
        for i in 0..5 {
            responder.answer(&format!("question {}", i));
        }

        assert_eq!(responder.history().len(), 4);
        assert_eq!(responder.history().iter().next().unwrap().text, "question 3");
        assert_eq!(responder.stats().last_conversation_entries.len(), 4);
    }

    #[test]
    fn test_accuracy_tracks_counters() {
        let mut responder = math_responder();
        let questions = [
            "математика уравнение",
            "что-то другое",
            "уравнение в математике",
            "",
            "история",
        ];
        for question in questions {
            responder.answer(question);
            let stats = responder.stats();
            let expected = stats.successful_matches as f64 / stats.total_requests as f64;
            assert!((stats.accuracy - expected).abs() < 1e-9);
            assert!((0.0..=1.0).contains(&stats.accuracy));
        }
        assert_eq!(responder.stats().successful_matches, 2);
    }

    #[test]
    fn test_fresh_responder_has_zero_accuracy() {
        assert_eq!(Responder::default().stats().accuracy, 0.0);
    }

    #[test]
    fn test_add_knowledge_rejects_blank_arguments() {
        let mut responder = Responder::new(&config(false));
        assert!(matches!(
            responder.add_knowledge(" ", "k", "a"),
            Err(Error::InvalidArgument(_))
        ));
        assert!(responder.add_knowledge("c", "", "a").is_err());
        assert!(responder.add_knowledge("c", "k", "  ").is_err());

        let stats = responder.stats();
        assert_eq!(stats.total_keywords, 0);
        assert_eq!(stats.learned_phrases, 0);
    }

    #[test]
    fn test_add_knowledge_twice_is_idempotent_for_table() {
        let mut responder = Responder::new(&config(false));
        responder.add_knowledge("история", "россия", "РФ").unwrap();
        let table = responder.table().clone();
        let keywords = responder.stats().total_keywords;

        responder.add_knowledge("история", "россия", "РФ").unwrap();
        assert_eq!(responder.table(), &table);
        assert_eq!(responder.stats().total_keywords, keywords);
        assert_eq!(responder.stats().learned_phrases, 2);
    }

    #[test]
    fn test_export_import_roundtrip() {
        let mut source = Responder::from_config(&{
            let mut c = config(false);
            c.responder.seed_builtin = true;
            c
        });
        source.add_knowledge("химия", "вода", "H2O").unwrap();

        let exported = serde_json::to_value(source.export_knowledge()).unwrap();
        let mut target = Responder::new(&config(false));
        target.import_knowledge(&exported).unwrap();

        assert_eq!(target.table(), source.table());
        for entry in source.table().entries() {
            assert_eq!(
                target.table().get(&entry.category, &entry.keyword),
                Some(entry.answer.as_str())
            );
        }
        assert_eq!(
            target.stats().learned_phrases,
            source.table().keyword_count() as u64
        );
    }

    #[test]
    fn test_import_json_text() {
        let mut responder = Responder::new(&config(false));
        responder
            .import_knowledge_json(r#"{"knowledgeBase": {"физика": {"оптика": "Свет."}}}"#)
            .unwrap();
        assert_eq!(responder.answer("физика оптика"), "Свет.");
    }

    #[test]
    fn test_import_replaces_table() {
        let mut responder = math_responder();
        responder
            .import_knowledge(&json!({ "knowledgeBase": { "физика": { "оптика": "Свет." } } }))
            .unwrap();

        assert!(!responder.table().contains_keyword("математика", "уравнение"));
        assert_eq!(responder.stats().categories, 1);
        assert_eq!(responder.stats().learned_phrases, 1);
    }

    #[test]
    fn test_import_without_table_leaves_state_untouched() {
        let mut responder = math_responder();
        let before = responder.table().clone();

        let result = responder.import_knowledge(&json!({}));
        assert!(matches!(result, Err(Error::MalformedSnapshot(_))));
        assert_eq!(responder.table(), &before);

        assert!(responder.import_knowledge_json("not json at all").is_err());
        assert!(responder
            .import_knowledge(&json!({ "knowledgeBase": { "a": "b" } }))
            .is_err());
        assert_eq!(responder.table(), &before);
    }

    #[test]
    fn test_import_adopts_learning_settings() {
        let mut responder = Responder::new(&config(true));
        responder
            .import_knowledge(&json!({
                "knowledgeBase": {},
                "learningSettings": { "autoLearn": false, "learningRate": 0.25, "minConfidence": 0.3 }
            }))
            .unwrap();

        assert!(!responder.learning_settings().auto_learn);
        assert_eq!(responder.learning_settings().learning_rate, 0.25);
    }

    #[test]
    fn test_merge_keeps_existing_entries() {
        let mut responder = math_responder();
        let merged = responder
            .merge_knowledge(&json!({
                "knowledgeBase": {
                    "математика": { "дроби": "Часть целого." },
                    "физика": { "оптика": "Свет." }
                }
            }))
            .unwrap();

        assert_eq!(merged, 2);
        assert!(responder.table().contains_keyword("математика", "уравнение"));
        assert!(responder.table().contains_keyword("физика", "оптика"));
        assert_eq!(responder.stats().learned_phrases, 3);
        assert!(responder.merge_knowledge(&json!({ "stats": {} })).is_err());
    }

    #[test]
    fn test_reset_clears_everything() {
        let mut responder = math_responder();
        responder.answer("математика уравнение");
        responder.answer("привет");

        responder.reset_learning();

        let stats = responder.stats();
        assert_eq!(stats.total_requests, 0);
        assert_eq!(stats.successful_matches, 0);
        assert_eq!(stats.learned_phrases, 0);
        assert_eq!(stats.accuracy, 0.0);
        assert_eq!(stats.total_keywords, 0);
        assert_eq!(stats.categories, 0);
        assert!(stats.last_conversation_entries.is_empty());
        assert!(responder.table().is_empty());
    }

    #[test]
    fn test_reset_does_not_reseed_builtin() {
        let mut c = config(false);
        c.responder.seed_builtin = true;
        let mut responder = Responder::from_config(&c);
        assert!(!responder.table().is_empty());

        responder.reset_learning();
        assert!(responder.table().is_empty());
    }

    #[test]
    fn test_auto_learn_adds_templated_entry() {
        let mut responder = Responder::new(&config(true));
        responder.add_knowledge("математика", "дроби", "Часть целого.").unwrap();

        responder.answer("математика интеграл");

        let learned = responder
            .table()
            .get("математика", "интеграл")
            .expect("keyword learned")
            .to_string();
        assert!(learned.contains("интеграл"));
        assert!(learned.contains("математика"));
        assert!(!responder.table().contains_keyword("математика", "математика"));
        assert_eq!(responder.stats().learned_phrases, 2);

        assert_eq!(responder.answer("интеграл по математике"), learned);
    }

    #[test]
    fn test_auto_learn_skips_recent_repeats() {
        let mut responder = Responder::new(&config(true));
        responder.add_knowledge("математика", "дроби", "Часть целого.").unwrap();

        responder.answer("математика интеграл производная");
        assert!(responder.table().contains_keyword("математика", "интеграл"));

        responder.answer("математика интеграл производная");
        assert!(!responder.table().contains_keyword("математика", "производная"));
    }

    #[test]
    fn test_auto_learn_needs_known_category() {
        let mut responder = Responder::new(&config(true));
        responder.answer("география материки");
        assert!(responder.table().is_empty());
    }

    #[test]
    fn test_auto_learn_disabled() {
        let mut responder = math_responder();
        responder.answer("математика интеграл");
        assert_eq!(responder.stats().total_keywords, 1);
    }

    #[test]
    fn test_auto_learn_zero_rate() {
        let mut c = config(true);
        c.learning.learning_rate = 0.0;
        let mut responder = Responder::new(&c);
        responder.add_knowledge("математика", "дроби", "x").unwrap();
        responder.answer("математика интеграл");
        assert_eq!(responder.stats().total_keywords, 1);
    }

    #[test]
    fn test_seeded_fallbacks_are_reproducible() {
        let mut a = Responder::new(&config(false));
        let mut b = Responder::new(&config(false));
        for i in 0..10 {
            let question = format!("вопрос {}", i);
            assert_eq!(a.answer(&question), b.answer(&question));
        }
    }

    #[test]
    fn test_stats_report() {
        let mut c = config(false);
        c.responder.seed_builtin = true;
        let mut responder = Responder::from_config(&c);
        for i in 0..4 {
            responder.answer(&format!("вопрос {}", i));
        }

        let stats = responder.stats();
        assert_eq!(stats.categories, 7);
        assert_eq!(stats.total_keywords, responder.table().keyword_count());
        assert_eq!(stats.category_keywords.get("физика"), Some(&5));
        assert_eq!(stats.last_conversation_entries.len(), REPORT_HISTORY);
        assert_eq!(stats.last_conversation_entries[4].sender, Sender::Assistant);
    }

    #[test]
    fn test_phrase_strategy_from_config() {
        let mut c = config(false);
        c.responder.matcher = MatcherKind::Phrase;
        let mut responder = Responder::new(&c);
        responder
            .add_knowledge("математика", "уравнение", EQUATION)
            .unwrap();

        assert_eq!(responder.answer("что такое уравнение"), EQUATION);
    }

    #[test]
    fn test_custom_strategy() {
        struct Never;
        impl MatchStrategy for Never {
            fn name(&self) -> &'static str {
                "never"
            }
            fn find(
                &self,
                _table: &KnowledgeTable,
                _question: &Question,
            ) -> Option<crate::knowledge::ScoredCandidate> {
                None
            }
        }

        let mut responder = math_responder().with_strategy(Box::new(Never));
        let answer = responder.answer("математика уравнение");
        assert!(FALLBACK_RESPONSES.contains(&answer.as_str()));
    }

    #[test]
    fn test_restore_keeps_counters_and_history() {
        let mut source = math_responder();
        source.answer("математика уравнение");
        let snapshot = source.export_knowledge();
        let history: Vec<_> = source.history().iter().cloned().collect();

        let mut restored = Responder::new(&config(false));
        restored.restore(snapshot, history);

        assert_eq!(restored.stats().total_requests, 1);
        assert_eq!(restored.stats().successful_matches, 1);
        assert_eq!(restored.history().len(), 2);
        assert_eq!(restored.table(), source.table());
    }

    #[test]
    fn test_restore_keeps_configured_learning_settings() {
        let source = Responder::new(&config(true));
        let snapshot = source.export_knowledge();
        assert!(snapshot.learning_settings.as_ref().unwrap().auto_learn);

        let mut quiet = config(false);
        quiet.learning.learning_rate = 0.1;
        let mut restored = Responder::new(&quiet);
        restored.restore(snapshot, Vec::new());

        assert!(!restored.learning_settings().auto_learn);
        assert_eq!(restored.learning_settings().learning_rate, 0.1);
    }

    #[test]
    fn test_single_letter_words_do_not_match_keywords() {
        let mut responder = Responder::new(&config(false));
        responder
            .add_knowledge("общее", "привет", "Привет! Чем могу помочь?")
            .unwrap();

        // "общении" opens the category by stem, "в" and "с" must not score "привет"
        let answer = responder.answer("помощь в общении с друзьями");
        assert!(FALLBACK_RESPONSES.contains(&answer.as_str()));
        assert_eq!(responder.answer("привет от общего друга"), "Привет! Чем могу помочь?");
    }
}
