use chrono::NaiveDate;
use lazyreview_core::mode::{ApplyMode, Decision};
use lazyreview_core::service::validator::{FixOutcome, Finding};
use lazyreview_core::{Config, MarkdownNoteStore, MetadataValidator, NoteId};
use std::fs;
use std::path::Path;

fn date(text: &str) -> NaiveDate {
    NaiveDate::parse_from_str(text, "%Y-%m-%d").unwrap()
}

fn write(root: &Path, relative: &str, text: &str) {
    let path = root.join(relative);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, text).unwrap();
}

fn read(root: &Path, relative: &str) -> String {
    fs::read_to_string(root.join(relative)).unwrap()
}

fn seeded_kb() -> tempfile::TempDir {
    let dir = tempfile::tempdir().unwrap();
    // medium[2] = 4 days: consistent.
    write(
        dir.path(),
        "notes/ok.md",
        "---\ncreated: 2024-01-01\nreview_count: 2\ndifficulty: medium\nlast_reviewed: 2024-02-01\nnext_review: 2024-02-05\nmastery_level: 0.3\n---\nok\n",
    );
    write(
        dir.path(),
        "notes/stale.md",
        "---\ncreated: 2024-01-01\nreview_count: 0\nlast_reviewed: 2024-02-01\nmastery_level: 0.4\n---\nstale\n",
    );
    write(
        dir.path(),
        "notes/drift.md",
        "---\ncreated: 2024-01-01\nreview_count: 2\ndifficulty: medium\nlast_reviewed: 2024-02-01\nnext_review: 2024-03-01\n---\ndrift\n",
    );
    write(
        dir.path(),
        "notes/undated.md",
        "---\nreview_count: 4\ndifficulty: easy\n---\nundated\n",
    );
    dir
}

#[test]
fn validation_flags_only_inconsistent_notes() {
    let dir = seeded_kb();
    let config = Config::default();
    let store = MarkdownNoteStore::new(dir.path(), "notes");

    let report = MetadataValidator::new(&store, &config).validate().unwrap();
    assert_eq!(report.checked, 4);
    let flagged: Vec<(&str, &[Finding])> = report
        .inconsistent
        .iter()
        .map(|item| (item.note.id.as_str(), item.findings.as_slice()))
        .collect();
    assert_eq!(
        flagged,
        vec![
            (
                "notes/drift.md",
                &[Finding::NextReviewMismatch {
                    expected_days: 4,
                    actual_days: 29
                }][..]
            ),
            (
                "notes/stale.md",
                &[
                    Finding::StaleLastReviewed(date("2024-02-01")),
                    Finding::StaleMastery
                ][..]
            ),
            ("notes/undated.md", &[Finding::MissingLastReviewed][..]),
        ]
    );
}

#[test]
fn fix_is_idempotent() {
    let dir = seeded_kb();
    let config = Config::default();
    let store = MarkdownNoteStore::new(dir.path(), "notes");
    let validator = MetadataValidator::new(&store, &config);
    let today = date("2024-03-10");

    let first = validator.fix(&mut ApplyMode::Auto, today).unwrap();
    assert_eq!(first.fixed(), 3);
    assert_eq!(first.failed(), 0);
    assert_eq!(read(dir.path(), "notes/ok.md").matches("2024-03-10").count(), 0);

    let snapshot: Vec<String> = ["ok", "stale", "drift", "undated"]
        .iter()
        .map(|name| read(dir.path(), &format!("notes/{name}.md")))
        .collect();

    let second = validator.fix(&mut ApplyMode::Auto, today).unwrap();
    assert!(second.validation.is_consistent());
    assert!(second.outcomes.is_empty());
    let after: Vec<String> = ["ok", "stale", "drift", "undated"]
        .iter()
        .map(|name| read(dir.path(), &format!("notes/{name}.md")))
        .collect();
    assert_eq!(snapshot, after);

    let stale = read(dir.path(), "notes/stale.md");
    assert!(stale.contains("last_reviewed: null"));
    assert!(stale.contains("mastery_level: 0.0"));
}

#[test]
fn dry_run_writes_nothing() {
    let dir = seeded_kb();
    let before = read(dir.path(), "notes/drift.md");
    let config = Config::default();
    let store = MarkdownNoteStore::new(dir.path(), "notes");

    let report = MetadataValidator::new(&store, &config)
        .fix(&mut ApplyMode::DryRun, date("2024-03-10"))
        .unwrap();
    assert_eq!(report.fixed(), 3);
    assert!(report
        .outcomes
        .iter()
        .all(|outcome| matches!(outcome, FixOutcome::WouldFix(_))));
    assert_eq!(read(dir.path(), "notes/drift.md"), before);
}

#[test]
fn interactive_quit_skips_remaining_notes() {
    let dir = seeded_kb();
    let config = Config::default();
    let store = MarkdownNoteStore::new(dir.path(), "notes");
    let mut answers = vec![Decision::Yes, Decision::Quit].into_iter();
    let mut ask = |_: &str| answers.next().unwrap_or(Decision::Quit);

    let report = MetadataValidator::new(&store, &config)
        .fix(&mut ApplyMode::Interactive(&mut ask), date("2024-03-10"))
        .unwrap();
    assert!(report.cancelled);
    assert_eq!(
        report.outcomes,
        vec![
            FixOutcome::Fixed(NoteId::new("notes/drift.md")),
            FixOutcome::Skipped(NoteId::new("notes/stale.md")),
            FixOutcome::Skipped(NoteId::new("notes/undated.md")),
        ]
    );
    assert!(read(dir.path(), "notes/stale.md").contains("mastery_level: 0.4"));
}
