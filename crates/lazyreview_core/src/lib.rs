//! Spaced-repetition review engine for a markdown knowledge base.
//! This crate owns the scheduling invariants; front-ends only parse input
//! and print reports.

pub mod config;
pub mod db;
pub mod logging;
pub mod mode;
pub mod model;
pub mod repo;
pub mod schedule;
pub mod service;

pub use config::{default_candidates, resolve_config, Config, ConfigError};
pub use logging::{default_log_level, init_logging, logging_status, LoggingError};
pub use mode::{ApplyMode, Decision};
pub use model::note::{Difficulty, Note, NoteDocument, NoteId, NoteMeta};
pub use repo::markdown_store::{MarkdownNoteStore, WriterLock};
pub use repo::note_store::{NoteStore, StoreError, StoreResult};
pub use repo::sqlite_store::SqliteNoteStore;
pub use service::review_list::ReviewListBuilder;
pub use service::sync::{ReviewError, SyncEngine};
pub use service::validator::MetadataValidator;

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::core_version;

    #[test]
    fn version_is_not_empty() {
        assert!(!core_version().is_empty());
    }
}
