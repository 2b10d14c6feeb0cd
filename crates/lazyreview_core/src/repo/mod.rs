//! Note storage backends.
//!
//! # Responsibility
//! - Define the `NoteStore` contract used by every service.
//! - Provide the markdown file-tree backend and the SQLite backend.
//!
//! # Invariants
//! - Scheduling code never touches files or SQL directly.
//! - Backends return per-document failures from scans instead of aborting.

pub mod markdown_store;
pub mod note_store;
pub mod sqlite_store;
