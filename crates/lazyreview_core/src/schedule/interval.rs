//! Review interval table.
//!
//! # Invariants
//! - The `medium` sequence is never empty; `easy`/`hard` fall back to it.
//! - Every sequence is non-decreasing.
//! - Counts past the end of a sequence repeat its last entry.
//! - No entry exceeds `MAX_INTERVAL_DAYS`.

use crate::model::note::Difficulty;
use chrono::{Days, NaiveDate};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Longest accepted interval, about a century.
pub const MAX_INTERVAL_DAYS: u32 = 36_500;

/// Configured day sequences, as read from `review_intervals`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReviewIntervals {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub easy: Vec<u32>,
    #[serde(default)]
    pub medium: Vec<u32>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub hard: Vec<u32>,
}

impl Default for ReviewIntervals {
    fn default() -> Self {
        Self {
            easy: vec![1, 2, 4, 7, 15, 30],
            medium: vec![1, 2, 4, 7, 15, 30, 60],
            hard: vec![1, 1, 2, 4, 7, 15, 30],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IntervalTableError {
    #[error("review_intervals.medium must contain at least one entry")]
    EmptyMedium,
    #[error("review_intervals.{0} must be non-decreasing")]
    Decreasing(&'static str),
    #[error("review_intervals.{name} entry {days} exceeds {max} days", max = MAX_INTERVAL_DAYS)]
    TooLong { name: &'static str, days: u32 },
}

/// Maps `(difficulty, review_count)` to a next-review offset in days.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "ReviewIntervals", into = "ReviewIntervals")]
pub struct IntervalTable {
    intervals: ReviewIntervals,
}

impl TryFrom<ReviewIntervals> for IntervalTable {
    type Error = IntervalTableError;

    fn try_from(intervals: ReviewIntervals) -> Result<Self, Self::Error> {
        if intervals.medium.is_empty() {
            return Err(IntervalTableError::EmptyMedium);
        }
        for (name, sequence) in [
            ("easy", &intervals.easy),
            ("medium", &intervals.medium),
            ("hard", &intervals.hard),
        ] {
            if sequence.windows(2).any(|pair| pair[1] < pair[0]) {
                return Err(IntervalTableError::Decreasing(name));
            }
            if let Some(&days) = sequence.iter().find(|&&days| days > MAX_INTERVAL_DAYS) {
                return Err(IntervalTableError::TooLong { name, days });
            }
        }
        Ok(Self { intervals })
    }
}

impl From<IntervalTable> for ReviewIntervals {
    fn from(table: IntervalTable) -> Self {
        table.intervals
    }
}

impl Default for IntervalTable {
    fn default() -> Self {
        Self {
            intervals: ReviewIntervals::default(),
        }
    }
}

impl IntervalTable {
    /// Effective sequence for `difficulty`.
    pub fn sequence(&self, difficulty: Difficulty) -> &[u32] {
        let configured = match difficulty {
            Difficulty::Easy => &self.intervals.easy,
            Difficulty::Medium => &self.intervals.medium,
            Difficulty::Hard => &self.intervals.hard,
        };
        if configured.is_empty() {
            &self.intervals.medium
        } else {
            configured
        }
    }

    /// Offset in days; `review_count` is a 0-based index clamped to the last entry.
    pub fn days(&self, difficulty: Difficulty, review_count: u32) -> u32 {
        let sequence = self.sequence(difficulty);
        let last = sequence.len().saturating_sub(1);
        let index = usize::try_from(review_count).map_or(last, |count| count.min(last));
        sequence.get(index).copied().unwrap_or(0)
    }

    /// Next review date anchored to `anchor`, saturating at `NaiveDate::MAX`.
    pub fn next_review(
        &self,
        difficulty: Difficulty,
        review_count: u32,
        anchor: NaiveDate,
    ) -> NaiveDate {
        let days = Days::new(u64::from(self.days(difficulty, review_count)));
        anchor.checked_add_days(days).unwrap_or(NaiveDate::MAX)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table() -> IntervalTable {
        IntervalTable::try_from(ReviewIntervals {
            easy: vec![2, 5, 10, 20, 40],
            medium: vec![1, 3, 7, 14],
            hard: vec![],
        })
        .unwrap()
    }

    #[test]
    fn counts_past_the_sequence_repeat_the_last_entry() {
        let table = table();
        assert_eq!(table.days(Difficulty::Easy, 4), 40);
        assert_eq!(table.days(Difficulty::Easy, 100), table.days(Difficulty::Easy, 4));
        assert_eq!(table.days(Difficulty::Easy, u32::MAX), 40);
    }

    #[test]
    fn days_are_non_decreasing_for_every_difficulty() {
        let table = table();
        for difficulty in Difficulty::ALL {
            let sequence = table.sequence(difficulty);
            let mut previous = 0;
            for count in 0..(sequence.len() as u32 + 5) {
                let days = table.days(difficulty, count);
                assert!(days >= previous, "{difficulty} decreased at {count}");
                previous = days;
            }
            assert_eq!(
                table.days(difficulty, sequence.len() as u32 - 1),
                *sequence.last().unwrap()
            );
        }
    }

    #[test]
    fn missing_sequence_falls_back_to_medium() {
        let table = table();
        assert_eq!(table.sequence(Difficulty::Hard), &[1, 3, 7, 14]);
        assert_eq!(table.days(Difficulty::Hard, 1), 3);
    }

    #[test]
    fn next_review_adds_days_to_anchor() {
        let anchor = NaiveDate::from_ymd_opt(2024, 1, 30).unwrap();
        assert_eq!(
            table().next_review(Difficulty::Medium, 2, anchor),
            NaiveDate::from_ymd_opt(2024, 2, 6).unwrap()
        );
    }

    #[test]
    fn invalid_sequences_are_rejected() {
        let empty = ReviewIntervals {
            easy: vec![1],
            medium: vec![],
            hard: vec![],
        };
        assert_eq!(
            IntervalTable::try_from(empty).unwrap_err(),
            IntervalTableError::EmptyMedium
        );

        let decreasing = ReviewIntervals {
            easy: vec![],
            medium: vec![1, 2],
            hard: vec![3, 1],
        };
        assert_eq!(
            IntervalTable::try_from(decreasing).unwrap_err(),
            IntervalTableError::Decreasing("hard")
        );

        let too_long = ReviewIntervals {
            easy: vec![],
            medium: vec![1, 100_000_000],
            hard: vec![],
        };
        assert_eq!(
            IntervalTable::try_from(too_long).unwrap_err(),
            IntervalTableError::TooLong {
                name: "medium",
                days: 100_000_000
            }
        );
    }

    #[test]
    fn next_review_saturates_at_the_calendar_end() {
        let near_end = NaiveDate::MAX.checked_sub_days(Days::new(3)).unwrap();
        assert_eq!(
            table().next_review(Difficulty::Easy, 4, near_end),
            NaiveDate::MAX
        );
    }
}
