//! Note storage contract.
//!
//! # Responsibility
//! - Load and save whole note documents by `NoteId`.
//! - Enumerate the collection in a deterministic order.
//!
//! # Invariants
//! - `save` replaces one document atomically: readers observe either the old
//!   or the new document, never a mix.
//! - Stores do not lock across processes. Callers that mutate must hold a
//!   single-writer guard (see `WriterLock`); two concurrent writers can lose
//!   an update on the same note.

use crate::db::DbError;
use crate::model::note::{Note, NoteDocument, NoteId, NoteParseError};
use log::{debug, info, warn};
use std::path::PathBuf;
use thiserror::Error;

pub type StoreResult<T> = Result<T, StoreError>;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("io error at `{path}`: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error(transparent)]
    Db(#[from] DbError),
    #[error("cannot parse note `{id}`: {source}")]
    Parse { id: NoteId, source: NoteParseError },
    #[error("cannot serialize note `{id}`: {source}")]
    Serialize {
        id: NoteId,
        source: serde_yaml::Error,
    },
    #[error("note id `{0}` does not name a file inside the knowledge base")]
    InvalidId(String),
    #[error("another writer holds `{0}`; remove it if no other run is active")]
    Locked(PathBuf),
}

impl From<rusqlite::Error> for StoreError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

/// A note that could not be used, with a human-readable reason.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedNote {
    pub id: NoteId,
    pub reason: String,
}

/// Raw scan output: readable documents plus per-item failures.
#[derive(Debug, Default)]
pub struct ScanReport {
    pub documents: Vec<NoteDocument>,
    pub failures: Vec<SkippedNote>,
}

/// Typed notes from one scan.
#[derive(Debug, Default)]
pub struct NoteCollection {
    /// Notes with a metadata block, in scan order.
    pub notes: Vec<Note>,
    /// Unreadable documents and malformed metadata blocks.
    pub skipped: Vec<SkippedNote>,
    /// Documents without any metadata block.
    pub without_metadata: usize,
}

/// Storage backend for note documents.
pub trait NoteStore {
    /// Reads every document in collection order.
    fn scan(&self) -> StoreResult<ScanReport>;
    /// Reads one document; `Ok(None)` when it does not exist.
    fn load(&self, id: &NoteId) -> StoreResult<Option<NoteDocument>>;
    /// Creates or atomically replaces one document.
    fn save(&self, document: &NoteDocument) -> StoreResult<()>;

    /// Scans and converts documents to typed notes, skipping bad ones.
    fn load_notes(&self) -> StoreResult<NoteCollection> {
        let report = self.scan()?;
        let mut collection = NoteCollection {
            skipped: report.failures,
            ..NoteCollection::default()
        };
        for skipped in &collection.skipped {
            warn!(
                "event=note_skip module=store status=skip note={} reason={}",
                skipped.id, skipped.reason
            );
        }

        for document in &report.documents {
            match Note::from_document(document) {
                Ok(Some(note)) => collection.notes.push(note),
                Ok(None) => {
                    debug!(
                        "event=note_skip module=store status=skip note={} reason=no_metadata",
                        document.id
                    );
                    collection.without_metadata += 1;
                }
                Err(err) => {
                    warn!(
                        "event=note_skip module=store status=skip note={} reason={}",
                        document.id, err
                    );
                    collection.skipped.push(SkippedNote {
                        id: document.id.clone(),
                        reason: err.to_string(),
                    });
                }
            }
        }

        info!(
            "event=note_scan module=store status=ok notes={} without_metadata={} skipped={}",
            collection.notes.len(),
            collection.without_metadata,
            collection.skipped.len()
        );
        Ok(collection)
    }
}
