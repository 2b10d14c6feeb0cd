//! Markdown file-tree note store.
//!
//! # Responsibility
//! - Treat every `*.md` file under `<root>/<notes_dir>` as one note.
//! - Persist documents with write-to-temp-then-rename.
//! - Provide the lock file that serializes mutating runs.
//!
//! # Invariants
//! - Ids resolve strictly inside `root`; absolute ids and `..` are rejected.
//! - Files whose name starts with `.` are not notes.
//! - Scan order is depth-first with entries sorted by file name.

use crate::model::note::{NoteDocument, NoteId};
use crate::repo::note_store::{NoteStore, ScanReport, SkippedNote, StoreError, StoreResult};
use log::{info, warn};
use std::fs::{self, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Component, Path, PathBuf};
use walkdir::WalkDir;

const NOTE_EXTENSION: &str = "md";
pub const LOCK_FILE_NAME: &str = ".lazyreview.lock";

#[derive(Debug, Clone)]
pub struct MarkdownNoteStore {
    root: PathBuf,
    notes_dir: PathBuf,
}

impl MarkdownNoteStore {
    /// `notes_dir` is relative to `root`.
    pub fn new(root: impl Into<PathBuf>, notes_dir: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            notes_dir: notes_dir.into(),
        }
    }

    /// Absolute file path for `id`.
    pub fn path_for(&self, id: &NoteId) -> StoreResult<PathBuf> {
        let relative = Path::new(id.as_str());
        let escapes = relative.as_os_str().is_empty()
            || relative
                .components()
                .any(|component| !matches!(component, Component::Normal(_) | Component::CurDir));
        if escapes {
            return Err(StoreError::InvalidId(id.to_string()));
        }
        Ok(self.root.join(relative))
    }

    fn read_document(&self, id: NoteId, path: &Path) -> StoreResult<NoteDocument> {
        let text = fs::read_to_string(path).map_err(|source| StoreError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        NoteDocument::parse(id.clone(), &text).map_err(|source| StoreError::Parse { id, source })
    }
}

impl NoteStore for MarkdownNoteStore {
    fn scan(&self) -> StoreResult<ScanReport> {
        let notes_root = self.root.join(&self.notes_dir);
        let mut report = ScanReport::default();
        if !notes_root.is_dir() {
            warn!(
                "event=note_scan module=markdown_store status=skip reason=notes_dir_missing path={}",
                notes_root.display()
            );
            return Ok(report);
        }

        for entry in WalkDir::new(&notes_root).sort_by_file_name() {
            let entry = match entry {
                Ok(entry) => entry,
                Err(err) => {
                    let path = err.path().unwrap_or(&notes_root).to_path_buf();
                    report.failures.push(SkippedNote {
                        id: relative_id(&self.root, &path),
                        reason: err.to_string(),
                    });
                    continue;
                }
            };

            let path = entry.path();
            let is_note = entry.file_type().is_file()
                && path.extension().and_then(|ext| ext.to_str()) == Some(NOTE_EXTENSION)
                && !entry.file_name().to_string_lossy().starts_with('.');
            if !is_note {
                continue;
            }

            let id = relative_id(&self.root, path);
            match self.read_document(id.clone(), path) {
                Ok(document) => report.documents.push(document),
                Err(err) => report.failures.push(SkippedNote {
                    id,
                    reason: err.to_string(),
                }),
            }
        }

        Ok(report)
    }

    fn load(&self, id: &NoteId) -> StoreResult<Option<NoteDocument>> {
        let path = self.path_for(id)?;
        if !path.is_file() {
            return Ok(None);
        }
        self.read_document(id.clone(), &path).map(Some)
    }

    fn save(&self, document: &NoteDocument) -> StoreResult<()> {
        let path = self.path_for(&document.id)?;
        let text = document.render().map_err(|source| StoreError::Serialize {
            id: document.id.clone(),
            source,
        })?;
        write_atomic(&path, &text)
    }
}

/// Writes `contents` to a sibling temp file, then renames it over `path`.
pub fn write_atomic(path: &Path, contents: &str) -> StoreResult<()> {
    let io_err = |source: std::io::Error| StoreError::Io {
        path: path.to_path_buf(),
        source,
    };

    if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(io_err)?;
    }

    let file_name = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .ok_or_else(|| StoreError::InvalidId(path.display().to_string()))?;
    let temp_path = path.with_file_name(format!(".{file_name}.tmp-{}", std::process::id()));

    let written = fs::File::create(&temp_path).and_then(|mut file| {
        file.write_all(contents.as_bytes())?;
        file.sync_all()
    });
    if let Err(err) = written.and_then(|()| fs::rename(&temp_path, path)) {
        let _ = fs::remove_file(&temp_path);
        return Err(io_err(err));
    }
    Ok(())
}

fn relative_id(root: &Path, path: &Path) -> NoteId {
    match path.strip_prefix(root) {
        Ok(relative) => NoteId::from_relative_path(relative),
        Err(_) => NoteId::new(path.to_string_lossy()),
    }
}

/// Exclusive single-writer guard for one knowledge base.
///
/// Held for the duration of a mutating run; released on drop.
#[derive(Debug)]
pub struct WriterLock {
    path: PathBuf,
}

impl WriterLock {
    /// Fails with `StoreError::Locked` when another run holds the lock.
    pub fn acquire(root: &Path) -> StoreResult<Self> {
        let path = root.join(LOCK_FILE_NAME);
        let mut file = match OpenOptions::new().write(true).create_new(true).open(&path) {
            Ok(file) => file,
            Err(err) if err.kind() == ErrorKind::AlreadyExists => {
                warn!(
                    "event=writer_lock module=markdown_store status=error error_code=locked path={}",
                    path.display()
                );
                return Err(StoreError::Locked(path));
            }
            Err(source) => return Err(StoreError::Io { path, source }),
        };

        if let Err(source) = writeln!(file, "{}", std::process::id()) {
            let _ = fs::remove_file(&path);
            return Err(StoreError::Io { path, source });
        }
        info!(
            "event=writer_lock module=markdown_store status=ok path={}",
            path.display()
        );
        Ok(Self { path })
    }
}

impl Drop for WriterLock {
    fn drop(&mut self) {
        let _ = fs::remove_file(&self.path);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn path_for_rejects_escaping_ids() {
        let store = MarkdownNoteStore::new("/kb", "notes");
        assert!(store.path_for(&NoteId::new("notes/a.md")).is_ok());
        assert!(matches!(
            store.path_for(&NoteId::new("../outside.md")),
            Err(StoreError::InvalidId(_))
        ));
        assert!(matches!(
            store.path_for(&NoteId::new("/etc/passwd")),
            Err(StoreError::InvalidId(_))
        ));
    }

    #[test]
    fn writer_lock_is_exclusive_until_dropped() {
        let dir = tempfile::tempdir().unwrap();
        let lock_file = dir.path().join(LOCK_FILE_NAME);
        let first = WriterLock::acquire(dir.path()).unwrap();
        assert!(lock_file.is_file());
        assert!(matches!(
            WriterLock::acquire(dir.path()),
            Err(StoreError::Locked(path)) if path == lock_file
        ));
        drop(first);
        assert!(!lock_file.exists());
        assert!(WriterLock::acquire(dir.path()).is_ok());
    }

    #[test]
    fn write_atomic_replaces_contents_without_leftovers() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("file.md");
        write_atomic(&path, "one").unwrap();
        write_atomic(&path, "two").unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "two");
        let entries = fs::read_dir(path.parent().unwrap()).unwrap().count();
        assert_eq!(entries, 1);
    }
}
