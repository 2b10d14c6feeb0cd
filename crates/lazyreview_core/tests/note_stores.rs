use lazyreview_core::db::open_db_in_memory;
use lazyreview_core::model::note::Frontmatter;
use lazyreview_core::service::import::import_documents;
use lazyreview_core::{MarkdownNoteStore, NoteDocument, NoteId, NoteStore, SqliteNoteStore};
use std::fs;
use std::path::Path;

fn write(root: &Path, relative: &str, text: &str) {
    let path = root.join(relative);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, text).unwrap();
}

fn seeded_tree() -> tempfile::TempDir {
    let dir = tempfile::tempdir().unwrap();
    write(
        dir.path(),
        "notes/gpu/warps.md",
        "---\ncreated: 2024-01-01\nreview_count: 2\n---\n# Warps\n",
    );
    write(dir.path(), "notes/algo/heaps.md", "---\nreview_count: 1\n---\nheap\n");
    write(dir.path(), "notes/plain.md", "no metadata here\n");
    write(dir.path(), "notes/broken.md", "---\nreview_count: [1\n---\nbody\n");
    write(dir.path(), "notes/.hidden.md", "---\nreview_count: 9\n---\n");
    write(dir.path(), "notes/readme.txt", "not a note");
    dir
}

#[test]
fn markdown_scan_is_sorted_and_reports_failures() {
    let dir = seeded_tree();
    let store = MarkdownNoteStore::new(dir.path(), "notes");

    let report = store.scan().unwrap();
    let ids: Vec<&str> = report.documents.iter().map(|doc| doc.id.as_str()).collect();
    assert_eq!(
        ids,
        vec!["notes/algo/heaps.md", "notes/gpu/warps.md", "notes/plain.md"]
    );
    assert_eq!(report.failures.len(), 1);
    assert_eq!(report.failures[0].id, NoteId::new("notes/broken.md"));

    let collection = store.load_notes().unwrap();
    assert_eq!(collection.notes.len(), 2);
    assert_eq!(collection.without_metadata, 1);
    assert_eq!(collection.skipped.len(), 1);
}

#[test]
fn markdown_save_preserves_unknown_keys_and_body() {
    let dir = tempfile::tempdir().unwrap();
    write(
        dir.path(),
        "notes/a.md",
        "---\ntitle: Custom\nrelated_outlines:\n- x\nreview_count: 0\n---\n# Heading\n\ntext\n",
    );
    let store = MarkdownNoteStore::new(dir.path(), "notes");
    let id = NoteId::new("notes/a.md");

    let mut document = store.load(&id).unwrap().unwrap();
    document
        .frontmatter
        .as_mut()
        .unwrap()
        .set("review_count", 3.into());
    store.save(&document).unwrap();

    let text = fs::read_to_string(dir.path().join("notes/a.md")).unwrap();
    assert!(text.starts_with("---\ntitle: Custom\nrelated_outlines:\n- x\nreview_count: 3\n---\n"));
    assert!(text.ends_with("# Heading\n\ntext\n"));
    assert!(store.load(&NoteId::new("notes/missing.md")).unwrap().is_none());
}

#[test]
fn sqlite_store_upserts_and_scans_by_id() {
    let conn = open_db_in_memory().unwrap();
    let store = SqliteNoteStore::new(&conn);

    let mut frontmatter = Frontmatter::new();
    frontmatter.set("review_count", 1.into());
    let mut document = NoteDocument {
        id: NoteId::new("notes/b.md"),
        frontmatter: Some(frontmatter),
        body: "body".to_string(),
    };
    store.save(&document).unwrap();
    store
        .save(&NoteDocument {
            id: NoteId::new("notes/a.md"),
            frontmatter: None,
            body: String::new(),
        })
        .unwrap();

    document.body = "changed".to_string();
    store.save(&document).unwrap();

    assert_eq!(store.count().unwrap(), 2);
    assert_eq!(store.load(&document.id).unwrap(), Some(document.clone()));
    assert!(store.updated_at(&document.id).unwrap().is_some());
    let ids: Vec<NoteId> = store
        .scan()
        .unwrap()
        .documents
        .into_iter()
        .map(|doc| doc.id)
        .collect();
    assert_eq!(ids, vec![NoteId::new("notes/a.md"), NoteId::new("notes/b.md")]);
}

#[test]
fn import_copies_readable_markdown_documents() {
    let dir = seeded_tree();
    let source = MarkdownNoteStore::new(dir.path(), "notes");
    let conn = open_db_in_memory().unwrap();
    let target = SqliteNoteStore::new(&conn);

    let summary = import_documents(&source, &target).unwrap();
    assert_eq!(summary.imported, 3);
    assert_eq!(summary.failures.len(), 1);

    let imported = target.load(&NoteId::new("notes/gpu/warps.md")).unwrap().unwrap();
    assert_eq!(imported.body, "# Warps\n");
    assert_eq!(target.load_notes().unwrap().notes.len(), 2);

    // Re-import upserts instead of duplicating.
    import_documents(&source, &target).unwrap();
    assert_eq!(target.count().unwrap(), 3);
}
