//! Copies documents between storage backends.

use crate::repo::note_store::{NoteStore, SkippedNote, StoreError};
use log::{info, warn};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImportSummary {
    pub imported: usize,
    pub failures: Vec<SkippedNote>,
}

/// Upserts every readable document of `source` into `target` by id.
///
/// Unreadable source documents and failed saves are reported, not fatal.
pub fn import_documents<A, B>(source: &A, target: &B) -> Result<ImportSummary, StoreError>
where
    A: NoteStore + ?Sized,
    B: NoteStore + ?Sized,
{
    let report = source.scan()?;
    let mut summary = ImportSummary {
        failures: report.failures,
        ..ImportSummary::default()
    };

    for document in &report.documents {
        match target.save(document) {
            Ok(()) => summary.imported += 1,
            Err(err) => {
                warn!(
                    "event=note_import module=import status=error note={} error={}",
                    document.id, err
                );
                summary.failures.push(SkippedNote {
                    id: document.id.clone(),
                    reason: err.to_string(),
                });
            }
        }
    }

    info!(
        "event=note_import module=import status=ok imported={} failed={}",
        summary.imported,
        summary.failures.len()
    );
    Ok(summary)
}
