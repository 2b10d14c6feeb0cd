//! Per-run context shared by every subcommand.

use anyhow::{Context, Result};
use chrono::{Local, NaiveDate};
use lazyreview_core::config::{default_candidates, resolve_config, ChecklistPaths, StorageBackend};
use lazyreview_core::db::open_db;
use lazyreview_core::mode::Decision;
use lazyreview_core::{
    default_log_level, init_logging, Config, MarkdownNoteStore, NoteId, NoteStore,
    SqliteNoteStore, WriterLock,
};
use log::info;
use rusqlite::Connection;
use std::io::{BufRead, Write};
use std::path::{Path, PathBuf};

const STATE_DIR: &str = ".lazyreview";

pub struct App {
    pub root: PathBuf,
    pub config: Config,
    pub today: NaiveDate,
}

/// Opened storage backend; borrow a `NoteStore` from it with `store()`.
pub enum StoreHandle {
    Markdown(MarkdownNoteStore),
    Sqlite(Connection),
}

impl StoreHandle {
    pub fn store(&self) -> Box<dyn NoteStore + '_> {
        match self {
            Self::Markdown(store) => Box::new(store.clone()),
            Self::Sqlite(conn) => Box::new(SqliteNoteStore::new(conn)),
        }
    }
}

/// `root` made absolute against the current directory.
pub fn absolute_root(root: &Path) -> Result<PathBuf> {
    if root.is_absolute() {
        return Ok(root.to_path_buf());
    }
    Ok(std::env::current_dir()
        .context("cannot read the current directory")?
        .join(root))
}

/// Starts file logging; failures are reported and otherwise ignored.
pub fn start_logging(root: &Path, log_dir: Option<&Path>, level: Option<&str>) {
    let log_dir = match log_dir {
        Some(dir) if dir.is_absolute() => dir.to_path_buf(),
        Some(dir) => root.join(dir),
        None => root.join(STATE_DIR).join("logs"),
    };
    let level: &str = level.unwrap_or_else(|| default_log_level());
    if let Err(err) = init_logging(level, &log_dir) {
        eprintln!("warning: file logging disabled: {err}");
    }
}

impl App {
    pub fn load(root: PathBuf, config_override: Option<&Path>) -> Result<Self> {
        let candidates = match config_override {
            Some(path) => vec![path.to_path_buf()],
            None => default_candidates(&root),
        };
        let config = resolve_config(&candidates)?;
        let today = Local::now().date_naive();
        info!(
            "event=cli_start module=cli status=ok root={} today={} backend={:?}",
            root.display(),
            today,
            config.storage.backend
        );

        Ok(Self {
            root,
            config,
            today,
        })
    }

    pub fn checklist_paths(&self) -> ChecklistPaths {
        self.config.checklist.paths(&self.root)
    }

    pub fn lock(&self) -> Result<WriterLock> {
        Ok(WriterLock::acquire(&self.root)?)
    }

    pub fn markdown_store(&self) -> MarkdownNoteStore {
        MarkdownNoteStore::new(&self.root, &self.config.notes_dir)
    }

    pub fn sqlite_path(&self) -> PathBuf {
        self.root.join(&self.config.storage.database)
    }

    pub fn open_store(&self) -> Result<StoreHandle> {
        match self.config.storage.backend {
            StorageBackend::Markdown => Ok(StoreHandle::Markdown(self.markdown_store())),
            StorageBackend::Sqlite => Ok(StoreHandle::Sqlite(open_db(self.sqlite_path())?)),
        }
    }

    /// Root-relative id for a path given on the command line.
    pub fn note_id(&self, raw: &str) -> NoteId {
        let path = Path::new(raw);
        match path.strip_prefix(&self.root) {
            Ok(relative) => NoteId::from_relative_path(relative),
            Err(_) => NoteId::new(raw),
        }
    }
}

/// Asks on stdin; end of input counts as `Quit`.
pub fn ask(prompt: &str, allow_quit: bool) -> Decision {
    let choices = if allow_quit { "[y/N/q]" } else { "[y/N]" };
    print!("{prompt} {choices} ");
    let _ = std::io::stdout().flush();

    let mut answer = String::new();
    match std::io::stdin().lock().read_line(&mut answer) {
        Ok(0) | Err(_) => Decision::Quit,
        Ok(_) => match answer.trim().to_ascii_lowercase().as_str() {
            "y" | "yes" => Decision::Yes,
            "q" | "quit" if allow_quit => Decision::Quit,
            _ => Decision::No,
        },
    }
}
