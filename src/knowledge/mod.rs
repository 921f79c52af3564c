//! Knowledge table, matching strategies and the snapshot format

pub mod matcher;
pub mod snapshot;
pub mod table;

pub use matcher::{CategoryGatedMatcher, MatchStrategy, PhraseMatcher, Question, ScoredCandidate};
pub use snapshot::KnowledgeSnapshot;
pub use table::{KnowledgeEntry, KnowledgeTable};
