use crate::app::{ask, App};
use anyhow::Result;
use lazyreview_core::mode::ApplyMode;
use lazyreview_core::service::validator::FixOutcome;
use lazyreview_core::MetadataValidator;

pub fn run(app: &App, auto: bool, dry_run: bool) -> Result<()> {
    let _lock = if dry_run { None } else { Some(app.lock()?) };
    let handle = app.open_store()?;
    let store = handle.store();
    let validator = MetadataValidator::new(&*store, &app.config);

    let mut prompt = |question: &str| ask(question, true);
    let mut mode = if dry_run {
        ApplyMode::DryRun
    } else if auto {
        ApplyMode::Auto
    } else {
        ApplyMode::Interactive(&mut prompt)
    };

    let report = validator.fix(&mut mode, app.today)?;
    let validation = &report.validation;
    for skipped in &validation.skipped {
        eprintln!("skipped {}: {}", skipped.id, skipped.reason);
    }
    if validation.is_consistent() {
        println!("All {} notes are consistent", validation.checked);
        return Ok(());
    }

    println!(
        "{} of {} notes are inconsistent",
        validation.inconsistent.len(),
        validation.checked
    );
    for flagged in &validation.inconsistent {
        let meta = &flagged.note.meta;
        println!("{}", flagged.note.id);
        for finding in &flagged.findings {
            println!("  - {finding}");
        }
        println!(
            "  current: review_count={} last_reviewed={} next_review={}",
            meta.review_count(),
            meta.last_reviewed
                .map_or_else(|| "-".to_string(), |date| date.to_string()),
            meta.next_review
                .map_or_else(|| "-".to_string(), |date| date.to_string()),
        );
    }

    for outcome in &report.outcomes {
        if let FixOutcome::Failed { id, reason } = outcome {
            eprintln!("failed {id}: {reason}");
        }
    }
    if report.cancelled {
        println!("Cancelled");
    }
    let verb = if dry_run { "would fix" } else { "fixed" };
    println!(
        "{verb}: {}, skipped: {}, failed: {}",
        report.fixed(),
        report.skipped(),
        report.failed()
    );
    Ok(())
}
