//! Leo - a self-learning keyword responder for school subjects
//!
//! Leo answers short free-text questions from a two-level knowledge table
//! (category → keyword → answer). A question is matched when it names a
//! category and overlaps one of that category's keywords; otherwise Leo
//! replies from a pool of generic encouragements. With auto-learn enabled,
//! unseen words of categorized questions are added as templated entries.
//!
//! ## Architecture
//!
//! ```text
//! ┌────────────────────────────────────────────────────────────┐
//! │                      leo (CLI binary)                      │
//! │    ask · chat · add · export · import · reset · stats      │
//! └───────────────┬──────────────────────────────┬─────────────┘
//!                 │                              │
//! ┌───────────────▼──────────────────┐   ┌───────▼─────────────┐
//! │            Responder             │   │    SnapshotStore    │
//! │  ┌──────────────┐ ┌───────────┐  │   │  JSON file, atomic  │
//! │  │MatchStrategy │ │   Stats   │  │   │  rename on save     │
//! │  └──────┬───────┘ └───────────┘  │   └─────────────────────┘
//! │  ┌──────▼───────┐ ┌───────────┐  │
//! │  │KnowledgeTable│ │  ConvLog  │  │
//! │  └──────────────┘ └───────────┘  │
//! └──────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`knowledge`]: table, matching strategies and the snapshot format
//! - [`responder`]: answering, counters, conversation log and auto-learn
//! - [`store`]: snapshot persistence
//! - [`config`]: configuration management

pub mod config;
pub mod error;
pub mod knowledge;
pub mod responder;
pub mod store;

pub use config::LeoConfig;
pub use error::{Error, Result};
pub use knowledge::{KnowledgeSnapshot, KnowledgeTable, MatchStrategy};
pub use responder::{Responder, SharedResponder, StatsReport};
pub use store::{SnapshotStore, StoredSnapshot};
