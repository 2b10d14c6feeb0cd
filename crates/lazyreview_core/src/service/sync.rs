//! Review commits and checklist reconciliation.
//!
//! # Responsibility
//! - Commit one completed review to a note (`mark_reviewed`).
//! - Update a note's difficulty (`set_difficulty`).
//! - Reconcile checked checklist items back into note metadata.
//!
//! # Invariants
//! - A review commit writes `last_reviewed`, `next_review`, `review_count`
//!   and `mastery_level` in one `save`, or nothing.
//! - A checklist without checked items changes no note.
//! - Synced items carry a marker that the checked-item parser ignores, so a
//!   second sync over the same document commits no review.
//! - Every checked line gets a reported outcome; unreadable lines are never
//!   marked as synced.

use crate::config::Config;
use crate::mode::{ApplyMode, Decision};
use crate::model::note::{
    Difficulty, MetadataPatch, NoteDocument, NoteId, NoteMeta, NoteParseError,
};
use crate::repo::markdown_store::write_atomic;
use crate::repo::note_store::{NoteStore, StoreError};
use crate::schedule::mastery::estimate_mastery;
use chrono::NaiveDate;
use log::{info, warn};
use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use std::borrow::Cow;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Elapsed days assumed when a note has no `created` date.
pub const DEFAULT_DAYS_SINCE_CREATED: i64 = 30;
pub const SYNCED_MARKER: &str = "- [✓] ";

/// Whole checklist line: link target may contain `)`, title may contain `]`,
/// and an optional ` - YYYY-MM-DD` due date may follow.
static CHECKED_ITEM_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[ \t]*- \[[xX]\] \[(.+)\]\((.+?)\)(?: - \d{4}-\d{2}-\d{2})?[ \t]*$")
        .expect("valid checked-item regex")
});
static CHECKED_LINE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^([ \t]*)- \[[xX]\] ").expect("valid checked-line regex"));

#[derive(Debug, Error)]
pub enum ReviewError {
    #[error("note `{0}` does not exist")]
    NotFound(NoteId),
    #[error("note `{0}` has no metadata block")]
    MissingMetadata(NoteId),
    #[error("cannot read metadata of `{id}`: {source}")]
    Parse { id: NoteId, source: NoteParseError },
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Metadata before and after one review commit.
#[derive(Debug, Clone, PartialEq)]
pub struct ReviewOutcome {
    pub id: NoteId,
    pub previous_count: u32,
    pub review_count: u32,
    pub last_reviewed: NaiveDate,
    pub next_review: NaiveDate,
    pub mastery_level: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DifficultyOutcome {
    pub id: NoteId,
    pub previous: Option<Difficulty>,
    pub difficulty: Difficulty,
    pub mastery_level: f64,
}

/// One `- [x] [title](path)` line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckedItem {
    pub title: String,
    pub id: NoteId,
}

/// Checked lines of a checklist in document order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CheckedLines {
    pub items: Vec<CheckedItem>,
    /// Checked lines that do not name a note link, trimmed.
    pub unreadable: Vec<String>,
}

impl CheckedLines {
    pub fn len(&self) -> usize {
        self.items.len() + self.unreadable.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum SyncItemOutcome {
    Updated(ReviewOutcome),
    /// Dry run: the review that would be committed.
    WouldUpdate(ReviewOutcome),
    Failed { id: NoteId, reason: String },
    /// A checked line without a readable note link; nothing was committed.
    Unreadable { line: String },
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct SyncReport {
    pub checked: usize,
    pub items: Vec<SyncItemOutcome>,
    /// Checked markers rewritten to the synced marker.
    pub markers_rewritten: bool,
}

impl SyncReport {
    pub fn updated(&self) -> usize {
        self.items
            .iter()
            .filter(|item| {
                matches!(
                    item,
                    SyncItemOutcome::Updated(_) | SyncItemOutcome::WouldUpdate(_)
                )
            })
            .count()
    }

    pub fn failed(&self) -> usize {
        self.items
            .iter()
            .filter(|item| {
                matches!(
                    item,
                    SyncItemOutcome::Failed { .. } | SyncItemOutcome::Unreadable { .. }
                )
            })
            .count()
    }

    pub fn is_noop(&self) -> bool {
        self.checked == 0
    }
}

/// Result of syncing a checklist file on disk.
#[derive(Debug, Clone, PartialEq)]
pub enum ChecklistSync {
    /// No checklist exists yet.
    Missing(PathBuf),
    Synced(SyncReport),
}

pub struct SyncEngine<'a, S: NoteStore + ?Sized> {
    store: &'a S,
    config: &'a Config,
    rewrite_markers: bool,
}

impl<'a, S: NoteStore + ?Sized> SyncEngine<'a, S> {
    pub fn new(store: &'a S, config: &'a Config) -> Self {
        Self {
            store,
            config,
            rewrite_markers: true,
        }
    }

    /// Keeps `[x]` markers in the checklist after a sync.
    pub fn keep_checks(mut self) -> Self {
        self.rewrite_markers = false;
        self
    }

    /// Commits one completed review dated `today`.
    pub fn mark_reviewed(&self, id: &NoteId, today: NaiveDate) -> Result<ReviewOutcome, ReviewError> {
        let (mut document, outcome) = self.plan_review(id, today)?;
        commit(&mut document, &review_patch(&outcome));
        self.store.save(&document)?;

        info!(
            "event=note_reviewed module=sync status=ok note={} review_count={} next_review={} mastery={:.2}",
            outcome.id, outcome.review_count, outcome.next_review, outcome.mastery_level
        );
        Ok(outcome)
    }

    /// Computes a review commit without writing it.
    pub fn preview_review(&self, id: &NoteId, today: NaiveDate) -> Result<ReviewOutcome, ReviewError> {
        self.plan_review(id, today).map(|(_, outcome)| outcome)
    }

    /// Sets `difficulty` and recomputes `mastery_level`; `next_review` is kept.
    pub fn set_difficulty(
        &self,
        id: &NoteId,
        difficulty: Difficulty,
        today: NaiveDate,
    ) -> Result<DifficultyOutcome, ReviewError> {
        let (mut document, meta) = self.load_with_meta(id)?;
        let mastery_level = estimate_mastery(
            meta.review_count(),
            days_since_created(&meta, today),
            difficulty,
        );
        commit(
            &mut document,
            &MetadataPatch {
                difficulty: Some(difficulty),
                mastery_level: Some(mastery_level),
                ..MetadataPatch::default()
            },
        );
        self.store.save(&document)?;

        info!(
            "event=note_difficulty module=sync status=ok note={} difficulty={}",
            id, difficulty
        );
        Ok(DifficultyOutcome {
            id: id.clone(),
            previous: meta.difficulty,
            difficulty,
            mastery_level,
        })
    }

    /// Applies every checked item in `document` and returns the rewritten
    /// document when markers should be replaced.
    pub fn sync_from_checklist(
        &self,
        document: &str,
        mode: &mut ApplyMode<'_>,
        today: NaiveDate,
    ) -> (SyncReport, Option<String>) {
        let lines = parse_checked_lines(document);
        let mut report = SyncReport {
            checked: lines.len(),
            ..SyncReport::default()
        };
        if lines.is_empty() {
            info!("event=checklist_sync module=sync status=skip reason=no_checked_items");
            return (report, None);
        }

        for line in lines.unreadable {
            warn!(
                "event=checklist_sync module=sync status=error error_code=unreadable_item line={}",
                line
            );
            report.items.push(SyncItemOutcome::Unreadable { line });
        }

        let dry_run = mode.is_dry_run();
        let mut seen = HashSet::new();
        for item in lines.items {
            if !seen.insert(item.id.clone()) {
                continue;
            }
            let result = if dry_run {
                self.preview_review(&item.id, today)
                    .map(SyncItemOutcome::WouldUpdate)
            } else {
                self.mark_reviewed(&item.id, today)
                    .map(SyncItemOutcome::Updated)
            };
            let outcome = result.unwrap_or_else(|err| {
                warn!(
                    "event=checklist_sync module=sync status=error note={} error={}",
                    item.id, err
                );
                SyncItemOutcome::Failed {
                    id: item.id,
                    reason: err.to_string(),
                }
            });
            report.items.push(outcome);
        }

        let rewritten = if self.rewrite_markers && !dry_run && report.updated() > 0 {
            match mode.confirm("Replace completed checkboxes with the synced marker?") {
                Decision::Yes => Some(mark_synced(document)),
                Decision::No | Decision::Quit => None,
            }
        } else {
            None
        };
        report.markers_rewritten = rewritten.is_some();

        info!(
            "event=checklist_sync module=sync status=ok checked={} updated={} failed={} dry_run={}",
            report.checked,
            report.updated(),
            report.failed(),
            dry_run
        );
        (report, rewritten)
    }

    /// Reads the checklist at `path`, syncs it and writes rewritten markers back.
    pub fn sync_checklist_file(
        &self,
        path: &Path,
        mode: &mut ApplyMode<'_>,
        today: NaiveDate,
    ) -> Result<ChecklistSync, StoreError> {
        if !path.is_file() {
            return Ok(ChecklistSync::Missing(path.to_path_buf()));
        }
        let document = std::fs::read_to_string(path).map_err(|source| StoreError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        let (report, rewritten) = self.sync_from_checklist(&document, mode, today);
        if let Some(rewritten) = rewritten {
            write_atomic(path, &rewritten)?;
        }
        Ok(ChecklistSync::Synced(report))
    }

    fn load_with_meta(&self, id: &NoteId) -> Result<(NoteDocument, NoteMeta), ReviewError> {
        let document = self
            .store
            .load(id)?
            .ok_or_else(|| ReviewError::NotFound(id.clone()))?;
        let frontmatter = document
            .frontmatter
            .as_ref()
            .ok_or_else(|| ReviewError::MissingMetadata(id.clone()))?;
        let meta = NoteMeta::from_frontmatter(frontmatter).map_err(|source| ReviewError::Parse {
            id: id.clone(),
            source,
        })?;
        Ok((document, meta))
    }

    fn plan_review(
        &self,
        id: &NoteId,
        today: NaiveDate,
    ) -> Result<(NoteDocument, ReviewOutcome), ReviewError> {
        let (document, meta) = self.load_with_meta(id)?;
        let difficulty = meta.difficulty_or(self.config.default_difficulty);
        let previous_count = meta.review_count();
        let review_count = previous_count.saturating_add(1);

        let outcome = ReviewOutcome {
            id: id.clone(),
            previous_count,
            review_count,
            last_reviewed: today,
            next_review: self
                .config
                .review_intervals
                .next_review(difficulty, review_count, today),
            mastery_level: estimate_mastery(
                review_count,
                days_since_created(&meta, today),
                difficulty,
            ),
        };
        Ok((document, outcome))
    }
}

/// Days from `created` to `today`, or the default when `created` is absent.
pub fn days_since_created(meta: &NoteMeta, today: NaiveDate) -> i64 {
    meta.created
        .map_or(DEFAULT_DAYS_SINCE_CREATED, |created| (today - created).num_days())
}

/// Checked lines in document order. Synced and unchecked lines are ignored.
pub fn parse_checked_lines(document: &str) -> CheckedLines {
    let mut lines = CheckedLines::default();
    for line in document.lines() {
        if !CHECKED_LINE_RE.is_match(line) {
            continue;
        }
        match parse_item(line) {
            Some(item) => lines.items.push(item),
            None => lines.unreadable.push(line.trim().to_string()),
        }
    }
    lines
}

/// Checked items in document order; unreadable checked lines are dropped.
pub fn parse_checked_items(document: &str) -> Vec<CheckedItem> {
    parse_checked_lines(document).items
}

/// Replaces the checked marker of every readable item with the synced marker.
///
/// Unreadable checked lines keep their `[x]` so they are reported again.
pub fn mark_synced(document: &str) -> String {
    document
        .split_inclusive('\n')
        .map(|line| {
            let content = line.trim_end_matches(['\n', '\r']);
            if CHECKED_ITEM_RE.is_match(content) {
                CHECKED_LINE_RE.replace(line, |captures: &Captures<'_>| {
                    format!("{}{SYNCED_MARKER}", &captures[1])
                })
            } else {
                Cow::Borrowed(line)
            }
        })
        .collect()
}

fn parse_item(line: &str) -> Option<CheckedItem> {
    let captures = CHECKED_ITEM_RE.captures(line)?;
    Some(CheckedItem {
        title: captures[1].to_string(),
        id: NoteId::new(&captures[2]),
    })
}

fn review_patch(outcome: &ReviewOutcome) -> MetadataPatch {
    MetadataPatch {
        last_reviewed: Some(Some(outcome.last_reviewed)),
        next_review: Some(outcome.next_review),
        review_count: Some(outcome.review_count),
        difficulty: None,
        mastery_level: Some(outcome.mastery_level),
    }
}

fn commit(document: &mut NoteDocument, patch: &MetadataPatch) {
    if let Some(frontmatter) = document.frontmatter.as_mut() {
        frontmatter.apply(patch);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CHECKLIST: &str = "\
# Review Checklist

## Due Today

- [x] [Warps](notes/gpu/warps.md)
  - reviews: 1 | difficulty: medium
- [ ] [Caches](notes/gpu/caches.md)
- [X] [Graphs](notes/algo/graphs.md)
- [✓] [Heaps](notes/algo/heaps.md)
";

    #[test]
    fn parses_only_checked_items() {
        let items = parse_checked_items(CHECKLIST);
        assert_eq!(
            items,
            vec![
                CheckedItem {
                    title: "Warps".to_string(),
                    id: NoteId::new("notes/gpu/warps.md"),
                },
                CheckedItem {
                    title: "Graphs".to_string(),
                    id: NoteId::new("notes/algo/graphs.md"),
                },
            ]
        );
    }

    #[test]
    fn synced_document_has_no_checked_items() {
        let synced = mark_synced(CHECKLIST);
        assert!(parse_checked_items(&synced).is_empty());
        assert!(synced.contains("- [✓] [Warps](notes/gpu/warps.md)"));
        assert!(synced.contains("- [✓] [Graphs](notes/algo/graphs.md)"));
        assert!(synced.contains("- [ ] [Caches](notes/gpu/caches.md)"));
        assert_eq!(mark_synced(&synced), synced);
    }

    #[test]
    fn bracketed_titles_and_parenthesized_paths_are_read() {
        let document = "\
- [x] [[WIP] warps](notes/[WIP] warps.md)
- [x] [Sort (merge)](notes/sort (merge).md) - 2024-03-12
  - [X] [Nested](notes/nested.md)
- [x] see the warps note
";
        let lines = parse_checked_lines(document);
        assert_eq!(
            lines.items,
            vec![
                CheckedItem {
                    title: "[WIP] warps".to_string(),
                    id: NoteId::new("notes/[WIP] warps.md"),
                },
                CheckedItem {
                    title: "Sort (merge)".to_string(),
                    id: NoteId::new("notes/sort (merge).md"),
                },
                CheckedItem {
                    title: "Nested".to_string(),
                    id: NoteId::new("notes/nested.md"),
                },
            ]
        );
        assert_eq!(lines.unreadable, vec!["- [x] see the warps note".to_string()]);
    }

    #[test]
    fn only_readable_items_get_the_synced_marker() {
        let document = "- [x] [[WIP] warps](notes/[WIP] warps.md)\r\n  - [X] [Nested](notes/nested.md)\n- [x] see the warps note\n";
        let synced = mark_synced(document);
        assert_eq!(
            synced,
            "- [✓] [[WIP] warps](notes/[WIP] warps.md)\r\n  - [✓] [Nested](notes/nested.md)\n- [x] see the warps note\n"
        );
        let remaining = parse_checked_lines(&synced);
        assert!(remaining.items.is_empty());
        assert_eq!(remaining.unreadable.len(), 1);
    }

    #[test]
    fn missing_created_uses_default_elapsed_days() {
        let today = NaiveDate::from_ymd_opt(2024, 5, 1).unwrap();
        assert_eq!(days_since_created(&NoteMeta::default(), today), 30);
        let meta = NoteMeta {
            created: NaiveDate::from_ymd_opt(2024, 4, 21),
            ..NoteMeta::default()
        };
        assert_eq!(days_since_created(&meta, today), 10);
    }
}
