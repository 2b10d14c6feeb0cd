//! Metadata consistency checks and repair.
//!
//! # Responsibility
//! - Detect notes whose stored schedule cannot be reproduced from
//!   `review_count`, `difficulty` and `last_reviewed`.
//! - Rewrite the derived fields of flagged notes on request.
//!
//! # Invariants
//! - Only notes with findings are written.
//! - A fix pass leaves every note finding-free, so a second pass writes nothing.

use crate::config::Config;
use crate::mode::{ApplyMode, Decision};
use crate::model::note::{MetadataPatch, Note, NoteId};
use crate::repo::note_store::{NoteStore, SkippedNote, StoreError};
use crate::schedule::mastery::estimate_mastery;
use crate::service::sync::{days_since_created, ReviewError};
use chrono::NaiveDate;
use log::{info, warn};
use std::fmt::{Display, Formatter};

/// Allowed slack between stored and expected review intervals, in days.
pub const DAY_TOLERANCE: i64 = 2;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Finding {
    /// `review_count` is 0 but `last_reviewed` is set.
    StaleLastReviewed(NaiveDate),
    /// `review_count` is 0 but `mastery_level` is not.
    StaleMastery,
    MissingLastReviewed,
    MissingNextReview,
    NextReviewMismatch { expected_days: i64, actual_days: i64 },
}

impl Display for Finding {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::StaleLastReviewed(date) => {
                write!(f, "review_count is 0 but last_reviewed is {date}")
            }
            Self::StaleMastery => f.write_str("review_count is 0 but mastery_level is not 0"),
            Self::MissingLastReviewed => f.write_str("reviewed note has no last_reviewed"),
            Self::MissingNextReview => f.write_str("reviewed note has no next_review"),
            Self::NextReviewMismatch {
                expected_days,
                actual_days,
            } => write!(
                f,
                "next_review is {actual_days} days after last_reviewed, expected {expected_days}"
            ),
        }
    }
}

/// Findings for one note; empty when consistent.
pub fn validate_note(note: &Note, config: &Config) -> Vec<Finding> {
    let meta = &note.meta;
    let mut findings = Vec::new();

    if meta.review_count() == 0 {
        if let Some(last_reviewed) = meta.last_reviewed {
            findings.push(Finding::StaleLastReviewed(last_reviewed));
        }
        if meta.mastery() != 0.0 {
            findings.push(Finding::StaleMastery);
        }
        return findings;
    }

    let Some(last_reviewed) = meta.last_reviewed else {
        findings.push(Finding::MissingLastReviewed);
        return findings;
    };
    let Some(next_review) = meta.next_review else {
        findings.push(Finding::MissingNextReview);
        return findings;
    };

    let difficulty = meta.difficulty_or(config.default_difficulty);
    let expected_days = i64::from(
        config
            .review_intervals
            .days(difficulty, meta.review_count()),
    );
    let actual_days = (next_review - last_reviewed).num_days().abs();
    if (actual_days - expected_days).abs() > DAY_TOLERANCE {
        findings.push(Finding::NextReviewMismatch {
            expected_days,
            actual_days,
        });
    }
    findings
}

/// Derived-field rewrite that makes `note` consistent as of `today`.
pub fn plan_fix(note: &Note, config: &Config, today: NaiveDate) -> MetadataPatch {
    let meta = &note.meta;
    let review_count = meta.review_count();
    if review_count == 0 {
        return MetadataPatch {
            last_reviewed: Some(None),
            mastery_level: Some(0.0),
            ..MetadataPatch::default()
        };
    }

    let difficulty = meta.difficulty_or(config.default_difficulty);
    MetadataPatch {
        last_reviewed: Some(Some(today)),
        next_review: Some(
            config
                .review_intervals
                .next_review(difficulty, review_count, today),
        ),
        mastery_level: Some(estimate_mastery(
            review_count,
            days_since_created(meta, today),
            difficulty,
        )),
        ..MetadataPatch::default()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct NoteFindings {
    pub note: Note,
    pub findings: Vec<Finding>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ValidationReport {
    /// Notes with a metadata block that were checked.
    pub checked: usize,
    pub inconsistent: Vec<NoteFindings>,
    pub skipped: Vec<SkippedNote>,
}

impl ValidationReport {
    pub fn is_consistent(&self) -> bool {
        self.inconsistent.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum FixOutcome {
    Fixed(NoteId),
    WouldFix(NoteId),
    Skipped(NoteId),
    Failed { id: NoteId, reason: String },
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct FixReport {
    pub validation: ValidationReport,
    pub outcomes: Vec<FixOutcome>,
    /// The batch was stopped by a `Quit` answer.
    pub cancelled: bool,
}

impl FixReport {
    fn count(&self, predicate: impl Fn(&FixOutcome) -> bool) -> usize {
        self.outcomes.iter().filter(|outcome| predicate(outcome)).count()
    }

    pub fn fixed(&self) -> usize {
        self.count(|outcome| matches!(outcome, FixOutcome::Fixed(_) | FixOutcome::WouldFix(_)))
    }

    pub fn skipped(&self) -> usize {
        self.count(|outcome| matches!(outcome, FixOutcome::Skipped(_)))
    }

    pub fn failed(&self) -> usize {
        self.count(|outcome| matches!(outcome, FixOutcome::Failed { .. }))
    }
}

pub struct MetadataValidator<'a, S: NoteStore + ?Sized> {
    store: &'a S,
    config: &'a Config,
}

impl<'a, S: NoteStore + ?Sized> MetadataValidator<'a, S> {
    pub fn new(store: &'a S, config: &'a Config) -> Self {
        Self { store, config }
    }

    pub fn validate(&self) -> Result<ValidationReport, StoreError> {
        let collection = self.store.load_notes()?;
        let mut report = ValidationReport {
            checked: collection.notes.len(),
            skipped: collection.skipped,
            ..ValidationReport::default()
        };

        for note in collection.notes {
            let findings = validate_note(&note, self.config);
            if !findings.is_empty() {
                report.inconsistent.push(NoteFindings { note, findings });
            }
        }

        info!(
            "event=metadata_validate module=validator status=ok checked={} inconsistent={} skipped={}",
            report.checked,
            report.inconsistent.len(),
            report.skipped.len()
        );
        Ok(report)
    }

    /// Validates, then repairs flagged notes according to `mode`.
    ///
    /// Interactive prompts receive one line per note; `Quit` leaves the
    /// remaining notes untouched and marks them skipped.
    pub fn fix(&self, mode: &mut ApplyMode<'_>, today: NaiveDate) -> Result<FixReport, StoreError> {
        let validation = self.validate()?;
        let mut report = FixReport::default();
        let dry_run = mode.is_dry_run();

        for flagged in &validation.inconsistent {
            let id = &flagged.note.id;
            if report.cancelled {
                report.outcomes.push(FixOutcome::Skipped(id.clone()));
                continue;
            }

            let prompt = format!("fix {} ({})?", id, describe(&flagged.findings));
            match mode.confirm(&prompt) {
                Decision::Yes => {}
                Decision::No => {
                    report.outcomes.push(FixOutcome::Skipped(id.clone()));
                    continue;
                }
                Decision::Quit => {
                    report.cancelled = true;
                    report.outcomes.push(FixOutcome::Skipped(id.clone()));
                    continue;
                }
            }

            if dry_run {
                report.outcomes.push(FixOutcome::WouldFix(id.clone()));
                continue;
            }

            let patch = plan_fix(&flagged.note, self.config, today);
            let outcome = match self.apply(id, &patch) {
                Ok(()) => FixOutcome::Fixed(id.clone()),
                Err(err) => {
                    warn!(
                        "event=metadata_fix module=validator status=error note={} error={}",
                        id, err
                    );
                    FixOutcome::Failed {
                        id: id.clone(),
                        reason: err.to_string(),
                    }
                }
            };
            report.outcomes.push(outcome);
        }

        info!(
            "event=metadata_fix module=validator status=ok fixed={} skipped={} failed={} dry_run={} cancelled={}",
            report.fixed(),
            report.skipped(),
            report.failed(),
            dry_run,
            report.cancelled
        );
        report.validation = validation;
        Ok(report)
    }

    fn apply(&self, id: &NoteId, patch: &MetadataPatch) -> Result<(), ReviewError> {
        let Some(mut document) = self.store.load(id)? else {
            return Err(ReviewError::NotFound(id.clone()));
        };
        if let Some(frontmatter) = document.frontmatter.as_mut() {
            frontmatter.apply(patch);
        }
        self.store.save(&document)?;
        Ok(())
    }
}

fn describe(findings: &[Finding]) -> String {
    findings
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::note::{Difficulty, NoteMeta};

    fn date(month: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, month, day).unwrap()
    }

    fn note(meta: NoteMeta) -> Note {
        let id = NoteId::new("notes/n.md");
        Note {
            title: id.title(),
            id,
            meta,
        }
    }

    #[test]
    fn unreviewed_note_with_history_is_flagged() {
        let findings = validate_note(
            &note(NoteMeta {
                review_count: Some(0),
                last_reviewed: Some(date(1, 5)),
                mastery_level: Some(0.3),
                ..NoteMeta::default()
            }),
            &Config::default(),
        );
        assert_eq!(
            findings,
            vec![Finding::StaleLastReviewed(date(1, 5)), Finding::StaleMastery]
        );
    }

    #[test]
    fn mismatch_respects_tolerance() {
        let config = Config::default();
        // medium[3] = 7
        let meta = |next_review| NoteMeta {
            review_count: Some(3),
            difficulty: Some(Difficulty::Medium),
            last_reviewed: Some(date(1, 1)),
            next_review: Some(next_review),
            ..NoteMeta::default()
        };
        assert!(validate_note(&note(meta(date(1, 10))), &config).is_empty());
        assert_eq!(
            validate_note(&note(meta(date(1, 11))), &config),
            vec![Finding::NextReviewMismatch {
                expected_days: 7,
                actual_days: 10
            }]
        );
    }

    #[test]
    fn reviewed_note_requires_both_dates() {
        let config = Config::default();
        let no_last = note(NoteMeta {
            review_count: Some(2),
            next_review: Some(date(2, 1)),
            ..NoteMeta::default()
        });
        assert_eq!(validate_note(&no_last, &config), vec![Finding::MissingLastReviewed]);

        let no_next = note(NoteMeta {
            review_count: Some(2),
            last_reviewed: Some(date(2, 1)),
            ..NoteMeta::default()
        });
        assert_eq!(validate_note(&no_next, &config), vec![Finding::MissingNextReview]);
    }

    #[test]
    fn planned_fix_reschedules_from_today() {
        let config = Config::default();
        let today = date(3, 1);
        let flagged = note(NoteMeta {
            created: Some(date(2, 20)),
            review_count: Some(2),
            difficulty: Some(Difficulty::Hard),
            ..NoteMeta::default()
        });
        let patch = plan_fix(&flagged, &config, today);
        // hard[2] = 2
        assert_eq!(patch.next_review, Some(date(3, 3)));
        assert_eq!(patch.last_reviewed, Some(Some(today)));
        assert_eq!(patch.review_count, None);
        assert_eq!(
            patch.mastery_level,
            Some(estimate_mastery(2, 10, Difficulty::Hard))
        );
    }
}
