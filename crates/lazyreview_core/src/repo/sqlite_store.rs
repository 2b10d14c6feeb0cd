//! SQLite-backed note store.
//!
//! # Responsibility
//! - Keep note documents in one indexed table instead of a file tree.
//!
//! # Invariants
//! - The metadata block is stored as YAML text so unknown keys survive.
//! - `save` is a single upsert statement.
//! - Scan order is `id ASC`.

use crate::model::note::{Frontmatter, NoteDocument, NoteId};
use crate::repo::note_store::{NoteStore, ScanReport, SkippedNote, StoreError, StoreResult};
use rusqlite::{params, Connection, OptionalExtension, Row};

pub struct SqliteNoteStore<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteNoteStore<'conn> {
    /// Wraps a connection returned by `open_db`/`open_db_in_memory`.
    pub fn new(conn: &'conn Connection) -> Self {
        Self { conn }
    }

    pub fn count(&self) -> StoreResult<usize> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM documents;", [], |row| row.get(0))?;
        Ok(usize::try_from(count).unwrap_or(0))
    }
}

impl NoteStore for SqliteNoteStore<'_> {
    fn scan(&self) -> StoreResult<ScanReport> {
        let mut stmt = self
            .conn
            .prepare("SELECT id, frontmatter, body FROM documents ORDER BY id ASC;")?;
        let mut rows = stmt.query([])?;
        let mut report = ScanReport::default();

        while let Some(row) = rows.next()? {
            let id = NoteId::new(row.get::<_, String>("id")?);
            match parse_row(id.clone(), row) {
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
        let mut stmt = self
            .conn
            .prepare("SELECT id, frontmatter, body FROM documents WHERE id = ?1;")?;
        let mut rows = stmt.query([id.as_str()])?;
        match rows.next()? {
            Some(row) => parse_row(id.clone(), row).map(Some),
            None => Ok(None),
        }
    }

    fn save(&self, document: &NoteDocument) -> StoreResult<()> {
        let frontmatter = document
            .frontmatter
            .as_ref()
            .map(Frontmatter::to_yaml)
            .transpose()
            .map_err(|source| StoreError::Serialize {
                id: document.id.clone(),
                source,
            })?;

        self.conn.execute(
            "INSERT INTO documents (id, frontmatter, body)
             VALUES (?1, ?2, ?3)
             ON CONFLICT(id) DO UPDATE SET
                frontmatter = excluded.frontmatter,
                body = excluded.body,
                updated_at = (strftime('%s', 'now') * 1000);",
            params![document.id.as_str(), frontmatter, document.body],
        )?;
        Ok(())
    }
}

impl SqliteNoteStore<'_> {
    /// Last write time in epoch milliseconds, if the document exists.
    pub fn updated_at(&self, id: &NoteId) -> StoreResult<Option<i64>> {
        let updated_at = self
            .conn
            .query_row(
                "SELECT updated_at FROM documents WHERE id = ?1;",
                [id.as_str()],
                |row| row.get(0),
            )
            .optional()?;
        Ok(updated_at)
    }
}

fn parse_row(id: NoteId, row: &Row<'_>) -> StoreResult<NoteDocument> {
    let frontmatter_text: Option<String> = row.get("frontmatter")?;
    let frontmatter = match frontmatter_text {
        Some(text) => {
            Frontmatter::parse_yaml(&text).map_err(|source| StoreError::Parse {
                id: id.clone(),
                source,
            })?
        }
        None => None,
    };

    Ok(NoteDocument {
        id,
        frontmatter,
        body: row.get("body")?,
    })
}
