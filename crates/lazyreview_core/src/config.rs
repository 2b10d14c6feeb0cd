//! Knowledge-base configuration.
//!
//! # Responsibility
//! - Parse and validate `kb_config.yaml`.
//! - Resolve the active file from an explicit, ordered list of candidates.
//!
//! # Invariants
//! - A resolved `Config` is immutable and passed explicitly to every service.
//! - Missing or malformed configuration is fatal before any note is scanned.

use crate::model::note::Difficulty;
use crate::schedule::interval::IntervalTable;
use crate::schedule::priority::{PriorityRanker, SortWeights};
use log::{error, info};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

pub const CONFIG_FILE_NAME: &str = "kb_config.yaml";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config `{path}`: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("malformed config: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("no configuration found; searched: {}", display_paths(.searched))]
    NotFound { searched: Vec<PathBuf> },
    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Per-run limits and ranking weights for the due list.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DailyReview {
    /// 0 means unlimited.
    pub max_overdue: usize,
    pub max_today: usize,
    pub max_this_week: usize,
    pub sort_weights: SortWeights,
}

/// Where the checklist lives and where old ones are archived, relative to root.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChecklistConfig {
    pub file: PathBuf,
    pub archive_dir: PathBuf,
}

impl Default for ChecklistConfig {
    fn default() -> Self {
        Self {
            file: PathBuf::from("review-checklist.md"),
            archive_dir: PathBuf::from("review-archive"),
        }
    }
}

/// Absolute checklist locations for one knowledge base.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChecklistPaths {
    pub file: PathBuf,
    pub archive_dir: PathBuf,
}

impl ChecklistConfig {
    pub fn paths(&self, root: &Path) -> ChecklistPaths {
        ChecklistPaths {
            file: root.join(&self.file),
            archive_dir: root.join(&self.archive_dir),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StorageBackend {
    #[default]
    Markdown,
    Sqlite,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    pub backend: StorageBackend,
    /// SQLite file, relative to root. Only used by the `sqlite` backend.
    pub database: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: StorageBackend::Markdown,
            database: PathBuf::from(".lazyreview/notes.sqlite3"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    pub review_intervals: IntervalTable,
    #[serde(default)]
    pub default_difficulty: Difficulty,
    #[serde(default)]
    pub daily_review: DailyReview,
    #[serde(default = "default_notes_dir")]
    pub notes_dir: PathBuf,
    #[serde(default)]
    pub checklist: ChecklistConfig,
    #[serde(default)]
    pub storage: StorageConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            review_intervals: IntervalTable::default(),
            default_difficulty: Difficulty::Medium,
            daily_review: DailyReview::default(),
            notes_dir: default_notes_dir(),
            checklist: ChecklistConfig::default(),
            storage: StorageConfig::default(),
        }
    }
}

impl Config {
    pub fn from_yaml_str(text: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_yaml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_yaml_str(&text)
    }

    pub fn ranker(&self) -> PriorityRanker {
        PriorityRanker::new(self.daily_review.sort_weights)
    }

    /// `notes_dir` as a `/`-separated prefix, matching `NoteId` form.
    pub fn notes_prefix(&self) -> String {
        self.notes_dir
            .components()
            .map(|component| component.as_os_str().to_string_lossy().into_owned())
            .collect::<Vec<_>>()
            .join("/")
    }

    fn validate(&self) -> Result<(), ConfigError> {
        let weights = self.daily_review.sort_weights;
        for (name, weight) in [
            ("created_new", weights.created_new),
            ("review_count", weights.review_count),
            ("difficulty_easy", weights.difficulty_easy),
            ("tags_count", weights.tags_count),
        ] {
            if !weight.is_finite() {
                return Err(ConfigError::Invalid(format!(
                    "daily_review.sort_weights.{name} must be a finite number"
                )));
            }
        }
        if self.notes_dir.as_os_str().is_empty() {
            return Err(ConfigError::Invalid("notes_dir cannot be empty".to_string()));
        }
        if self.checklist.file.as_os_str().is_empty() {
            return Err(ConfigError::Invalid(
                "checklist.file cannot be empty".to_string(),
            ));
        }
        Ok(())
    }
}

/// Loads the first existing candidate, in order.
///
/// # Errors
/// - `NotFound` when no candidate exists.
/// - `Io`/`Yaml`/`Invalid` for the first existing candidate that fails.
pub fn resolve_config(candidates: &[PathBuf]) -> Result<Config, ConfigError> {
    let Some(path) = candidates.iter().find(|path| path.is_file()) else {
        error!(
            "event=config_resolve module=config status=error error_code=not_found candidates={}",
            candidates.len()
        );
        return Err(ConfigError::NotFound {
            searched: candidates.to_vec(),
        });
    };

    match Config::from_file(path) {
        Ok(config) => {
            info!(
                "event=config_resolve module=config status=ok path={}",
                path.display()
            );
            Ok(config)
        }
        Err(err) => {
            error!(
                "event=config_resolve module=config status=error path={} error={}",
                path.display(),
                err
            );
            Err(err)
        }
    }
}

/// Standard candidates under a knowledge-base root: user config first, then template.
pub fn default_candidates(root: &Path) -> Vec<PathBuf> {
    vec![
        root.join("config").join(CONFIG_FILE_NAME),
        root.join("system").join("config").join(CONFIG_FILE_NAME),
    ]
}

fn default_notes_dir() -> PathBuf {
    PathBuf::from("notes")
}

fn display_paths(paths: &[PathBuf]) -> String {
    paths
        .iter()
        .map(|path| path.display().to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schedule::interval::ReviewIntervals;

    const FULL: &str = r#"
review_intervals:
  easy: [2, 5, 10]
  medium: [1, 3, 7, 14]
  hard: [1, 2, 4]
default_difficulty: hard
daily_review:
  max_today: 5
  sort_weights:
    difficulty_easy: 4.0
notes_dir: kb/notes
checklist:
  file: today.md
"#;

    #[test]
    fn parses_full_config_with_partial_sections() {
        let config = Config::from_yaml_str(FULL).unwrap();
        assert_eq!(config.default_difficulty, Difficulty::Hard);
        assert_eq!(config.daily_review.max_today, 5);
        assert_eq!(config.daily_review.max_overdue, 0);
        assert_eq!(config.daily_review.sort_weights.difficulty_easy, 4.0);
        assert_eq!(config.daily_review.sort_weights.review_count, 2.0);
        assert_eq!(config.review_intervals.days(Difficulty::Easy, 1), 5);
        assert_eq!(config.notes_prefix(), "kb/notes");
        assert_eq!(config.checklist.file, PathBuf::from("today.md"));
        assert_eq!(config.checklist.archive_dir, PathBuf::from("review-archive"));
        assert_eq!(config.storage.backend, StorageBackend::Markdown);
    }

    #[test]
    fn missing_intervals_is_an_error() {
        let err = Config::from_yaml_str("default_difficulty: easy\n").unwrap_err();
        assert!(matches!(err, ConfigError::Yaml(_)));
    }

    #[test]
    fn decreasing_sequence_is_an_error() {
        let err = Config::from_yaml_str("review_intervals:\n  medium: [5, 1]\n").unwrap_err();
        assert!(err.to_string().contains("non-decreasing"));
    }

    #[test]
    fn oversized_interval_is_an_error() {
        let err = Config::from_yaml_str("review_intervals:\n  medium: [1, 100000000]\n")
            .unwrap_err();
        assert!(matches!(err, ConfigError::Yaml(_)));
        assert!(err.to_string().contains("exceeds"));
    }

    #[test]
    fn unknown_default_difficulty_is_an_error() {
        let err = Config::from_yaml_str(
            "review_intervals:\n  medium: [1]\ndefault_difficulty: extreme\n",
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::Yaml(_)));
    }

    #[test]
    fn resolve_prefers_first_existing_candidate() {
        let dir = tempfile::tempdir().unwrap();
        let candidates = default_candidates(dir.path());
        let err = resolve_config(&candidates).unwrap_err();
        assert!(matches!(err, ConfigError::NotFound { ref searched } if searched.len() == 2));

        std::fs::create_dir_all(candidates[1].parent().unwrap()).unwrap();
        std::fs::write(&candidates[1], "review_intervals:\n  medium: [9]\n").unwrap();
        let template = resolve_config(&candidates).unwrap();
        assert_eq!(template.review_intervals.days(Difficulty::Medium, 0), 9);

        std::fs::create_dir_all(candidates[0].parent().unwrap()).unwrap();
        std::fs::write(&candidates[0], "review_intervals:\n  medium: [3]\n").unwrap();
        let user = resolve_config(&candidates).unwrap();
        assert_eq!(user.review_intervals.days(Difficulty::Medium, 0), 3);
    }

    #[test]
    fn default_config_round_trips_through_yaml() {
        let yaml = serde_yaml::to_string(&Config::default()).unwrap();
        let parsed = Config::from_yaml_str(&yaml).unwrap();
        assert_eq!(parsed, Config::default());
        assert_eq!(
            ReviewIntervals::from(parsed.review_intervals).medium,
            ReviewIntervals::default().medium
        );
    }
}
