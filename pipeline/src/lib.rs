//! The per-keyword run: search, rank, generate, validate, publish, notify.

pub mod artifacts;
pub mod generate;
pub mod keywords;
pub mod report;
pub mod runner;

pub use artifacts::DebugArtifacts;
pub use generate::{generate_draft, repair_draft, DraftOutcome, GeneratedDraft};
pub use keywords::{select_keywords, select_keywords_with};
pub use report::{KeywordOutcome, RunReport};
pub use runner::{Pipeline, RunOptions};
