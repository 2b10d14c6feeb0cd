//! Ease-of-review ranking inside a due bucket.
//!
//! Higher scores are reviewed first: recent, often-reviewed, easy and
//! well-tagged notes float to the top.

use crate::model::note::{Difficulty, Note};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

const RECENCY_WINDOW_DAYS: f64 = 30.0;
const REVIEW_COUNT_SATURATION: f64 = 10.0;
const TAG_COUNT_SATURATION: f64 = 5.0;

/// Weights read from `daily_review.sort_weights`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SortWeights {
    pub created_new: f64,
    pub review_count: f64,
    pub difficulty_easy: f64,
    pub tags_count: f64,
}

impl Default for SortWeights {
    fn default() -> Self {
        Self {
            created_new: 1.0,
            review_count: 2.0,
            difficulty_easy: 3.0,
            tags_count: 0.5,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct PriorityRanker {
    weights: SortWeights,
}

impl PriorityRanker {
    pub fn new(weights: SortWeights) -> Self {
        Self { weights }
    }

    pub fn score(&self, note: &Note, today: NaiveDate) -> f64 {
        let meta = &note.meta;

        let recency = meta.created.map_or(0.0, |created| {
            let days = (today - created).num_days().max(0) as f64;
            ((RECENCY_WINDOW_DAYS - days) / RECENCY_WINDOW_DAYS).max(0.0)
        });
        let reviews = (f64::from(meta.review_count()) / REVIEW_COUNT_SATURATION).min(1.0);
        let ease = match meta.difficulty.unwrap_or_default() {
            Difficulty::Easy => 1.0,
            Difficulty::Medium => 0.5,
            Difficulty::Hard => 0.0,
        };
        let tags = (meta.tags.len() as f64 / TAG_COUNT_SATURATION).min(1.0);

        recency * self.weights.created_new
            + reviews * self.weights.review_count
            + ease * self.weights.difficulty_easy
            + tags * self.weights.tags_count
    }

    /// Sorts by descending score; equal scores keep their input order.
    pub fn rank(&self, notes: Vec<Note>, today: NaiveDate) -> Vec<Note> {
        let mut scored: Vec<(f64, Note)> = notes
            .into_iter()
            .map(|note| (self.score(&note, today), note))
            .collect();
        scored.sort_by(|left, right| right.0.total_cmp(&left.0));
        scored.into_iter().map(|(_, note)| note).collect()
    }
}
