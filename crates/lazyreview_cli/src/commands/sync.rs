use crate::app::{ask, App};
use anyhow::Result;
use lazyreview_core::mode::ApplyMode;
use lazyreview_core::service::sync::{ChecklistSync, SyncItemOutcome};
use lazyreview_core::SyncEngine;

pub fn run(app: &App, dry_run: bool, keep_checks: bool, yes: bool) -> Result<()> {
    let _lock = if dry_run { None } else { Some(app.lock()?) };
    let handle = app.open_store()?;
    let store = handle.store();
    let paths = app.checklist_paths();

    let mut engine = SyncEngine::new(&*store, &app.config);
    if keep_checks {
        engine = engine.keep_checks();
    }

    let mut prompt = |question: &str| ask(question, false);
    let mut mode = if dry_run {
        ApplyMode::DryRun
    } else if yes {
        ApplyMode::Auto
    } else {
        ApplyMode::Interactive(&mut prompt)
    };

    let report = match engine.sync_checklist_file(&paths.file, &mut mode, app.today)? {
        ChecklistSync::Missing(path) => {
            println!(
                "No checklist at {}; run `lazyreview today` first",
                path.display()
            );
            return Ok(());
        }
        ChecklistSync::Synced(report) => report,
    };

    if report.is_noop() {
        println!("No checked items");
        return Ok(());
    }

    for item in &report.items {
        match item {
            SyncItemOutcome::Updated(outcome) => println!(
                "reviewed {} ({} reviews, next {})",
                outcome.id, outcome.review_count, outcome.next_review
            ),
            SyncItemOutcome::WouldUpdate(outcome) => println!(
                "would review {} ({} reviews, next {})",
                outcome.id, outcome.review_count, outcome.next_review
            ),
            SyncItemOutcome::Failed { id, reason } => eprintln!("failed {id}: {reason}"),
            SyncItemOutcome::Unreadable { line } => {
                eprintln!("failed: no note link in checked line `{line}`")
            }
        }
    }
    let verb = if dry_run { "would update" } else { "updated" };
    println!("{verb}: {}, failed: {}", report.updated(), report.failed());
    if report.markers_rewritten {
        println!("Checklist marked as synced");
    }
    Ok(())
}
