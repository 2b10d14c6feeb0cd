//! Due-list building, checklist rendering and archiving.
//!
//! # Responsibility
//! - Classify scheduled notes into due buckets relative to `today`.
//! - Rank and cap the displayed buckets.
//! - Render the checklist document and archive the previous one by date.
//!
//! # Invariants
//! - Every note with `next_review` lands in exactly one bucket; notes without
//!   it appear in none.
//! - Capping keeps the pre-truncation total for display.
//! - An existing checklist is never overwritten without being archived.

use crate::config::{ChecklistPaths, Config};
use crate::model::note::{format_date, Difficulty, Note};
use crate::repo::markdown_store::write_atomic;
use crate::repo::note_store::{NoteStore, SkippedNote, StoreError};
use chrono::{Datelike, NaiveDate};
use log::{info, warn};
use once_cell::sync::Lazy;
use regex::Regex;
use std::fmt::Write as _;
use std::path::{Path, PathBuf};
use thiserror::Error;

pub const CHECKLIST_TITLE: &str = "# Review Checklist";
const GENERATED_LABEL: &str = "**Generated**";
const THIS_WEEK_DAYS: i64 = 7;

static GENERATED_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\*\*Generated\*\*:\s*(\d{4}-\d{2}-\d{2})").expect("valid generated-date regex")
});

#[derive(Debug, Error)]
pub enum ChecklistError {
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error("io error at `{path}`: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// Due classification of a note's `next_review` against today.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Bucket {
    Overdue,
    Today,
    ThisWeek,
    Upcoming,
}

impl Bucket {
    pub fn classify(next_review: NaiveDate, today: NaiveDate) -> Self {
        match (next_review - today).num_days() {
            days if days < 0 => Self::Overdue,
            0 => Self::Today,
            days if days <= THIS_WEEK_DAYS => Self::ThisWeek,
            _ => Self::Upcoming,
        }
    }

    pub fn heading(self) -> &'static str {
        match self {
            Self::Overdue => "Overdue",
            Self::Today => "Due Today",
            Self::ThisWeek => "This Week",
            Self::Upcoming => "Upcoming",
        }
    }
}

/// One bucket after ranking and capping.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BucketList {
    /// Displayed notes, best first.
    pub notes: Vec<Note>,
    /// Count before capping.
    pub total: usize,
}

impl BucketList {
    fn capped(mut notes: Vec<Note>, max: usize) -> Self {
        let total = notes.len();
        if max > 0 && notes.len() > max {
            notes.truncate(max);
        }
        Self { notes, total }
    }

    pub fn shown(&self) -> usize {
        self.notes.len()
    }

    pub fn is_truncated(&self) -> bool {
        self.total > self.notes.len()
    }
}

/// Raw classification result, before ranking.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Buckets {
    pub overdue: Vec<Note>,
    pub today: Vec<Note>,
    pub this_week: Vec<Note>,
    pub upcoming: Vec<Note>,
    /// Notes without `next_review`.
    pub unscheduled: usize,
}

impl Buckets {
    /// Partitions notes, keeping scan order within each bucket.
    pub fn classify(notes: Vec<Note>, today: NaiveDate) -> Self {
        let mut buckets = Self::default();
        for note in notes {
            let Some(next_review) = note.meta.next_review else {
                buckets.unscheduled += 1;
                continue;
            };
            match Bucket::classify(next_review, today) {
                Bucket::Overdue => buckets.overdue.push(note),
                Bucket::Today => buckets.today.push(note),
                Bucket::ThisWeek => buckets.this_week.push(note),
                Bucket::Upcoming => buckets.upcoming.push(note),
            }
        }
        buckets
    }

    pub fn scheduled(&self) -> usize {
        self.overdue.len() + self.today.len() + self.this_week.len() + self.upcoming.len()
    }
}

/// Ranked, capped due list for one day.
#[derive(Debug, Clone, PartialEq)]
pub struct ReviewList {
    pub generated_on: NaiveDate,
    pub overdue: BucketList,
    pub today: BucketList,
    pub this_week: BucketList,
    /// Not ranked and not rendered beyond its count.
    pub upcoming: BucketList,
    pub unscheduled: usize,
    pub skipped: Vec<SkippedNote>,
}

/// What happened to the previous checklist.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ArchiveOutcome {
    NoPrevious,
    Archived(PathBuf),
    /// Generation date could not be read; archived under the run date instead.
    Undated(PathBuf),
}

/// Result of one `today` run.
#[derive(Debug, Clone, PartialEq)]
pub struct DailyRun {
    pub archive: ArchiveOutcome,
    pub list: ReviewList,
    pub checklist_path: PathBuf,
}

pub struct ReviewListBuilder<'a, S: NoteStore + ?Sized> {
    store: &'a S,
    config: &'a Config,
}

impl<'a, S: NoteStore + ?Sized> ReviewListBuilder<'a, S> {
    pub fn new(store: &'a S, config: &'a Config) -> Self {
        Self { store, config }
    }

    /// Scans, classifies, ranks and caps.
    pub fn build(&self, today: NaiveDate) -> Result<ReviewList, StoreError> {
        let collection = self.store.load_notes()?;
        let buckets = Buckets::classify(collection.notes, today);
        let ranker = self.config.ranker();
        let limits = &self.config.daily_review;

        let list = ReviewList {
            generated_on: today,
            overdue: BucketList::capped(ranker.rank(buckets.overdue, today), limits.max_overdue),
            today: BucketList::capped(ranker.rank(buckets.today, today), limits.max_today),
            this_week: BucketList::capped(
                ranker.rank(buckets.this_week, today),
                limits.max_this_week,
            ),
            upcoming: BucketList::capped(buckets.upcoming, 0),
            unscheduled: buckets.unscheduled,
            skipped: collection.skipped,
        };

        info!(
            "event=checklist_build module=review_list status=ok overdue={}/{} today={}/{} this_week={}/{} upcoming={} skipped={}",
            list.overdue.shown(),
            list.overdue.total,
            list.today.shown(),
            list.today.total,
            list.this_week.shown(),
            list.this_week.total,
            list.upcoming.total,
            list.skipped.len()
        );
        Ok(list)
    }

    /// Archives the previous checklist, rebuilds the list and writes a new one.
    pub fn run(&self, paths: &ChecklistPaths, today: NaiveDate) -> Result<DailyRun, ChecklistError> {
        let archive = archive_previous(&paths.file, &paths.archive_dir, today)?;
        let list = self.build(today)?;
        write_atomic(&paths.file, &render_checklist(&list))?;
        Ok(DailyRun {
            archive,
            list,
            checklist_path: paths.file.clone(),
        })
    }
}

/// Moves an existing checklist to `<archive_dir>/<YYYY>/<MM>/<date>.md`.
///
/// A checklist without a readable generation date goes to
/// `<archive_dir>/undated-<today>.md`. A name collision gets a numeric suffix
/// instead of replacing the archive.
pub fn archive_previous(
    checklist: &Path,
    archive_dir: &Path,
    today: NaiveDate,
) -> Result<ArchiveOutcome, ChecklistError> {
    if !checklist.is_file() {
        return Ok(ArchiveOutcome::NoPrevious);
    }

    let io_err = |path: &Path| {
        let path = path.to_path_buf();
        move |source| ChecklistError::Io { path, source }
    };
    let content = std::fs::read_to_string(checklist).map_err(io_err(checklist))?;

    let generated_on = extract_generated_date(&content);
    let (dir, stem) = match generated_on {
        Some(date) => (
            archive_dir
                .join(format!("{:04}", date.year()))
                .join(format!("{:02}", date.month())),
            format_date(date),
        ),
        None => {
            warn!(
                "event=checklist_archive module=review_list status=warn path={} reason=missing_generated_date",
                checklist.display()
            );
            (archive_dir.to_path_buf(), format!("undated-{}", format_date(today)))
        }
    };
    std::fs::create_dir_all(&dir).map_err(io_err(&dir))?;

    let extension = checklist
        .extension()
        .and_then(|ext| ext.to_str())
        .unwrap_or("md");
    let mut target = dir.join(format!("{stem}.{extension}"));
    let mut suffix = 2;
    while target.exists() {
        target = dir.join(format!("{stem}-{suffix}.{extension}"));
        suffix += 1;
    }

    std::fs::rename(checklist, &target).map_err(io_err(checklist))?;
    info!(
        "event=checklist_archive module=review_list status=ok from={} to={}",
        checklist.display(),
        target.display()
    );
    Ok(match generated_on {
        Some(_) => ArchiveOutcome::Archived(target),
        None => ArchiveOutcome::Undated(target),
    })
}

pub fn extract_generated_date(content: &str) -> Option<NaiveDate> {
    let captures = GENERATED_RE.captures(content)?;
    NaiveDate::parse_from_str(captures.get(1)?.as_str(), "%Y-%m-%d").ok()
}

/// Renders the checklist markdown.
pub fn render_checklist(list: &ReviewList) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{CHECKLIST_TITLE}\n");
    let _ = writeln!(out, "{GENERATED_LABEL}: {}\n", format_date(list.generated_on));

    out.push_str("## Summary\n\n");
    for (label, bucket) in [
        ("Overdue", &list.overdue),
        ("Due today", &list.today),
        ("This week", &list.this_week),
    ] {
        let _ = write!(out, "- **{label}**: {}", bucket.shown());
        if bucket.is_truncated() {
            let _ = write!(out, " (showing {} of {})", bucket.shown(), bucket.total);
        }
        out.push('\n');
    }
    let _ = writeln!(out, "- **Upcoming**: {}\n", list.upcoming.total);
    out.push_str("Ordered easiest first: recent notes, frequently reviewed notes, easy notes and well-tagged notes lead.\n\n---\n\n");

    render_section(&mut out, Bucket::Overdue, &list.overdue, false);
    render_section(&mut out, Bucket::Today, &list.today, false);
    render_section(&mut out, Bucket::ThisWeek, &list.this_week, true);

    out.push_str(
        "---\n\n## How to use\n\n\
         1. Tick items as you review them: change `- [ ]` to `- [x]`.\n\
         2. Run `lazyreview sync` to record the reviews in each note.\n\
         3. Run `lazyreview today` to archive this list and build a fresh one.\n\n\
         Single notes: `lazyreview mark-done <path>`, `lazyreview set-difficulty <path> <easy|medium|hard>`.\n",
    );
    out
}

fn render_section(out: &mut String, bucket: Bucket, list: &BucketList, with_due_date: bool) {
    if list.notes.is_empty() {
        return;
    }

    let _ = writeln!(out, "## {}\n", bucket.heading());
    for note in &list.notes {
        let _ = write!(out, "- [ ] [{}]({})", note.title, note.id);
        if with_due_date {
            if let Some(next_review) = note.meta.next_review {
                let _ = write!(out, " - {}", format_date(next_review));
            }
        }
        out.push('\n');
        let difficulty = note.meta.difficulty.unwrap_or(Difficulty::Medium);
        let _ = writeln!(
            out,
            "  - reviews: {} | difficulty: {}",
            note.meta.review_count(),
            difficulty
        );
    }
    out.push('\n');
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::note::{NoteId, NoteMeta};

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, d).unwrap()
    }

    fn scheduled(id: &str, next_review: Option<NaiveDate>) -> Note {
        let id = NoteId::new(id);
        Note {
            title: id.title(),
            id,
            meta: NoteMeta {
                next_review,
                review_count: Some(1),
                ..NoteMeta::default()
            },
        }
    }

    #[test]
    fn bucket_boundaries() {
        let today = day(10);
        assert_eq!(Bucket::classify(day(9), today), Bucket::Overdue);
        assert_eq!(Bucket::classify(day(10), today), Bucket::Today);
        assert_eq!(Bucket::classify(day(11), today), Bucket::ThisWeek);
        assert_eq!(Bucket::classify(day(17), today), Bucket::ThisWeek);
        assert_eq!(Bucket::classify(day(18), today), Bucket::Upcoming);
    }

    #[test]
    fn classification_is_a_partition_of_scheduled_notes() {
        let today = day(10);
        let notes: Vec<Note> = (1..=31)
            .map(|d| scheduled(&format!("notes/{d}.md"), Some(day(d))))
            .chain([scheduled("notes/never.md", None)])
            .collect();
        let buckets = Buckets::classify(notes, today);
        assert_eq!(buckets.scheduled(), 31);
        assert_eq!(buckets.unscheduled, 1);
        assert_eq!(buckets.overdue.len(), 9);
        assert_eq!(buckets.today.len(), 1);
        assert_eq!(buckets.this_week.len(), 7);
        assert_eq!(buckets.upcoming.len(), 14);
    }

    #[test]
    fn capped_bucket_keeps_true_total() {
        let notes: Vec<Note> = (0..12)
            .map(|n| scheduled(&format!("notes/{n}.md"), Some(day(10))))
            .collect();
        let bucket = BucketList::capped(notes.clone(), 5);
        assert_eq!(bucket.shown(), 5);
        assert_eq!(bucket.total, 12);
        assert!(bucket.is_truncated());

        let unlimited = BucketList::capped(notes, 0);
        assert_eq!(unlimited.shown(), 12);
        assert!(!unlimited.is_truncated());
    }

    #[test]
    fn rendered_checklist_carries_date_counts_and_entries() {
        let list = ReviewList {
            generated_on: day(10),
            overdue: BucketList::default(),
            today: BucketList {
                notes: vec![scheduled("notes/gpu/Bank conflicts.md", Some(day(10)))],
                total: 3,
            },
            this_week: BucketList {
                notes: vec![scheduled("notes/warp.md", Some(day(12)))],
                total: 1,
            },
            upcoming: BucketList::default(),
            unscheduled: 0,
            skipped: Vec::new(),
        };

        let text = render_checklist(&list);
        assert_eq!(extract_generated_date(&text), Some(day(10)));
        assert!(text.contains("- **Due today**: 1 (showing 1 of 3)"));
        assert!(text.contains("- [ ] [Bank conflicts](notes/gpu/Bank conflicts.md)\n"));
        assert!(text.contains("- [ ] [warp](notes/warp.md) - 2024-03-12\n"));
        assert!(text.contains("  - reviews: 1 | difficulty: medium"));
        assert!(!text.contains("## Overdue"));
    }
}
