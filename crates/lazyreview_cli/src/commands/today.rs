use crate::app::App;
use anyhow::Result;
use lazyreview_core::service::review_list::{ArchiveOutcome, BucketList};
use lazyreview_core::ReviewListBuilder;

pub fn run(app: &App) -> Result<()> {
    let _lock = app.lock()?;
    let handle = app.open_store()?;
    let store = handle.store();
    let paths = app.checklist_paths();

    let run = ReviewListBuilder::new(&*store, &app.config).run(&paths, app.today)?;
    match &run.archive {
        ArchiveOutcome::NoPrevious => {}
        ArchiveOutcome::Archived(path) => println!("Archived previous checklist to {}", path.display()),
        ArchiveOutcome::Undated(path) => eprintln!(
            "warning: previous checklist had no generation date; archived to {}",
            path.display()
        ),
    }

    let list = &run.list;
    print_bucket("Overdue", &list.overdue);
    print_bucket("Due today", &list.today);
    print_bucket("This week", &list.this_week);
    println!("Upcoming: {}", list.upcoming.total);
    for skipped in &list.skipped {
        eprintln!("skipped {}: {}", skipped.id, skipped.reason);
    }
    println!("Checklist written to {}", run.checklist_path.display());
    Ok(())
}

fn print_bucket(label: &str, bucket: &BucketList) {
    if bucket.is_truncated() {
        println!("{label}: {} (showing {})", bucket.total, bucket.shown());
    } else {
        println!("{label}: {}", bucket.total);
    }
}
