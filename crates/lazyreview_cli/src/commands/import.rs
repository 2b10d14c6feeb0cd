use crate::app::App;
use anyhow::Result;
use lazyreview_core::db::open_db;
use lazyreview_core::service::import::import_documents;
use lazyreview_core::SqliteNoteStore;

pub fn run(app: &App) -> Result<()> {
    let _lock = app.lock()?;
    let source = app.markdown_store();
    let database = app.sqlite_path();
    let conn = open_db(&database)?;
    let target = SqliteNoteStore::new(&conn);

    let summary = import_documents(&source, &target)?;
    for failure in &summary.failures {
        eprintln!("failed {}: {}", failure.id, failure.reason);
    }
    println!(
        "Imported {} notes into {} ({} failed)",
        summary.imported,
        database.display(),
        summary.failures.len()
    );
    Ok(())
}
