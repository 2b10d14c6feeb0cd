//! Review use cases built on a `NoteStore`.
//!
//! # Responsibility
//! - Turn scheduling primitives into batch operations with per-item reports.
//! - Keep the CLI free of storage and scheduling details.

pub mod import;
pub mod review_list;
pub mod stats;
pub mod sync;
pub mod validator;
