use crate::app::App;
use anyhow::Result;
use lazyreview_core::{Difficulty, ReviewError, SyncEngine};

pub fn mark_done(app: &App, path: &str) -> Result<()> {
    let _lock = app.lock()?;
    let handle = app.open_store()?;
    let store = handle.store();
    let id = app.note_id(path);

    match SyncEngine::new(&*store, &app.config).mark_reviewed(&id, app.today) {
        Ok(outcome) => {
            println!("Reviewed {}", outcome.id);
            println!(
                "  reviews: {} -> {}",
                outcome.previous_count, outcome.review_count
            );
            println!("  next review: {}", outcome.next_review);
            println!("  mastery: {:.0}%", outcome.mastery_level * 100.0);
            Ok(())
        }
        Err(err @ (ReviewError::NotFound(_) | ReviewError::MissingMetadata(_))) => {
            eprintln!("error: {err}");
            Ok(())
        }
        Err(err) => Err(err.into()),
    }
}

pub fn set_difficulty(app: &App, path: &str, difficulty: Difficulty) -> Result<()> {
    let _lock = app.lock()?;
    let handle = app.open_store()?;
    let store = handle.store();
    let id = app.note_id(path);

    match SyncEngine::new(&*store, &app.config).set_difficulty(&id, difficulty, app.today) {
        Ok(outcome) => {
            let previous = outcome
                .previous
                .map_or("unset", |previous| previous.as_str());
            println!(
                "Difficulty of {}: {} -> {}",
                outcome.id, previous, outcome.difficulty
            );
            println!("  mastery: {:.0}%", outcome.mastery_level * 100.0);
            Ok(())
        }
        Err(err @ (ReviewError::NotFound(_) | ReviewError::MissingMetadata(_))) => {
            eprintln!("error: {err}");
            Ok(())
        }
        Err(err) => Err(err.into()),
    }
}
