//! Domain model for scheduled notes.
//!
//! # Responsibility
//! - Define the note record, its metadata block and the typed field view.
//!
//! # Invariants
//! - Every note is identified by its root-relative path (`NoteId`).
//! - Notes are never deleted by core; only metadata fields are rewritten.

pub mod note;
