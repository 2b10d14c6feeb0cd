//! Pure scheduling functions.
//!
//! # Responsibility
//! - Interval lookup, mastery estimation and due-list priority scoring.
//!
//! # Invariants
//! - Nothing in this module performs IO or reads the clock; `today` is always
//!   passed in.

pub mod interval;
pub mod mastery;
pub mod priority;
