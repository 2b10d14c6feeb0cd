//! Mastery estimation.
//!
//! Logarithmic growth in review count, scaled by a difficulty multiplier and a
//! spacing factor, capped at 1.0 and rounded to two decimals.

use crate::model::note::{round2, Difficulty};

/// Review count at which the base score saturates.
const SATURATION_REVIEWS: f64 = 20.0;
const MAX_TIME_FACTOR: f64 = 1.2;
const FRESH_NOTE_FACTOR: f64 = 0.5;

pub fn difficulty_multiplier(difficulty: Difficulty) -> f64 {
    match difficulty {
        Difficulty::Easy => 1.2,
        Difficulty::Medium => 1.0,
        Difficulty::Hard => 0.8,
    }
}

/// Estimates mastery in `[0, 1]`.
///
/// Negative `days_since_created` is treated as 0. Zero reviews is always 0.0.
pub fn estimate_mastery(review_count: u32, days_since_created: i64, difficulty: Difficulty) -> f64 {
    if review_count == 0 {
        return 0.0;
    }

    let count = f64::from(review_count);
    let base = ((count + 1.0).ln() / (SATURATION_REVIEWS + 1.0).ln()).min(1.0);

    let days = days_since_created.max(0);
    let time_factor = if days > 0 {
        (count / (days as f64 / 10.0).max(1.0)).min(MAX_TIME_FACTOR)
    } else {
        FRESH_NOTE_FACTOR
    };

    round2((base * difficulty_multiplier(difficulty) * time_factor).min(1.0))
}
