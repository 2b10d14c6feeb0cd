//! Note domain model.
//!
//! # Responsibility
//! - Define the note identity, the metadata block and its typed view.
//! - Split/join markdown documents into frontmatter and body.
//!
//! # Invariants
//! - `NoteId` is the root-relative path with `/` separators and never changes.
//! - Writes touch only the metadata keys they name; unknown keys and key order
//!   are preserved.
//! - `review_count == 0` implies no `last_reviewed` and zero mastery (I1). The
//!   model does not enforce this on read so the validator can report it.

use chrono::NaiveDate;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_yaml::{Mapping, Value};
use std::fmt::{Display, Formatter};
use std::path::Path;
use std::str::FromStr;
use thiserror::Error;

pub const FIELD_CREATED: &str = "created";
pub const FIELD_LAST_REVIEWED: &str = "last_reviewed";
pub const FIELD_NEXT_REVIEW: &str = "next_review";
pub const FIELD_REVIEW_COUNT: &str = "review_count";
pub const FIELD_DIFFICULTY: &str = "difficulty";
pub const FIELD_MASTERY_LEVEL: &str = "mastery_level";
pub const FIELD_TAGS: &str = "tags";

const DATE_FORMAT: &str = "%Y-%m-%d";

static FRONTMATTER_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)\A---[ \t]*\r?\n(.*?)\r?\n---[ \t]*\r?\n(.*)\z").expect("valid frontmatter regex"));

/// Error raised when one note's metadata block cannot be read.
#[derive(Debug, Error)]
pub enum NoteParseError {
    #[error("malformed metadata block: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("metadata block is not a key/value mapping")]
    NotAMapping,
    #[error("invalid value `{value}` for field `{field}`")]
    InvalidField { field: &'static str, value: String },
}

/// Stable note identifier: the note path relative to the knowledge-base root.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NoteId(String);

impl NoteId {
    /// Normalizes separators and a leading `./`.
    pub fn new(raw: impl AsRef<str>) -> Self {
        let normalized = raw.as_ref().trim().replace('\\', "/");
        let trimmed = normalized.trim_start_matches("./");
        Self(trimmed.to_string())
    }

    /// Builds an id from a path already relative to the root.
    pub fn from_relative_path(path: &Path) -> Self {
        let joined = path
            .components()
            .map(|component| component.as_os_str().to_string_lossy().into_owned())
            .collect::<Vec<_>>()
            .join("/");
        Self::new(joined)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Display title: the file stem.
    pub fn title(&self) -> String {
        let file_name = self.0.rsplit('/').next().unwrap_or(self.0.as_str());
        match file_name.rsplit_once('.') {
            Some((stem, _)) if !stem.is_empty() => stem.to_string(),
            _ => file_name.to_string(),
        }
    }

    /// First directory below `notes_dir`, or `None` for top-level notes.
    pub fn topic(&self, notes_dir: &str) -> Option<&str> {
        let prefix = notes_dir.trim_matches('/');
        let rest = if prefix.is_empty() {
            self.0.as_str()
        } else {
            self.0.strip_prefix(prefix)?.strip_prefix('/')?
        };
        let (topic, _) = rest.split_once('/')?;
        Some(topic)
    }
}

impl Display for NoteId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Note difficulty; selects interval sequence, mastery multiplier and priority.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Difficulty {
    Easy,
    #[default]
    Medium,
    Hard,
}

impl Difficulty {
    pub const ALL: [Difficulty; 3] = [Self::Easy, Self::Medium, Self::Hard];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Easy => "easy",
            Self::Medium => "medium",
            Self::Hard => "hard",
        }
    }

    /// Reads a stored difficulty. Unknown values fall back to `Medium`.
    pub fn parse_lenient(value: &str) -> Self {
        value.parse().unwrap_or(Self::Medium)
    }
}

impl FromStr for Difficulty {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "easy" => Ok(Self::Easy),
            "medium" => Ok(Self::Medium),
            "hard" => Ok(Self::Hard),
            other => Err(format!(
                "unsupported difficulty `{other}`; expected easy|medium|hard"
            )),
        }
    }
}

impl Display for Difficulty {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Field changes applied to a metadata block in one commit.
///
/// `None` leaves a field untouched. `last_reviewed: Some(None)` writes an
/// explicit null, which reads back as absent.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MetadataPatch {
    pub last_reviewed: Option<Option<NaiveDate>>,
    pub next_review: Option<NaiveDate>,
    pub review_count: Option<u32>,
    pub difficulty: Option<Difficulty>,
    pub mastery_level: Option<f64>,
}

impl MetadataPatch {
    pub fn is_empty(&self) -> bool {
        self.last_reviewed.is_none()
            && self.next_review.is_none()
            && self.review_count.is_none()
            && self.difficulty.is_none()
            && self.mastery_level.is_none()
    }
}

/// Raw metadata block, kept as an ordered YAML mapping.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Frontmatter(Mapping);

impl Frontmatter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_mapping(mapping: Mapping) -> Self {
        Self(mapping)
    }

    pub fn as_mapping(&self) -> &Mapping {
        &self.0
    }

    /// Parses YAML text. Empty or null blocks yield `None`.
    pub fn parse_yaml(text: &str) -> Result<Option<Self>, NoteParseError> {
        match serde_yaml::from_str::<Value>(text)? {
            Value::Null => Ok(None),
            Value::Mapping(mapping) if mapping.is_empty() => Ok(None),
            Value::Mapping(mapping) => Ok(Some(Self(mapping))),
            _ => Err(NoteParseError::NotAMapping),
        }
    }

    pub fn to_yaml(&self) -> Result<String, serde_yaml::Error> {
        serde_yaml::to_string(&self.0)
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    /// Replaces in place when the key exists, appends otherwise.
    pub fn set(&mut self, key: &str, value: Value) {
        self.0.insert(Value::String(key.to_string()), value);
    }

    pub fn set_date(&mut self, key: &str, date: Option<NaiveDate>) {
        let value = match date {
            Some(date) => Value::String(date.format(DATE_FORMAT).to_string()),
            None => Value::Null,
        };
        self.set(key, value);
    }

    pub fn apply(&mut self, patch: &MetadataPatch) {
        if let Some(last_reviewed) = patch.last_reviewed {
            self.set_date(FIELD_LAST_REVIEWED, last_reviewed);
        }
        if let Some(next_review) = patch.next_review {
            self.set_date(FIELD_NEXT_REVIEW, Some(next_review));
        }
        if let Some(review_count) = patch.review_count {
            self.set(FIELD_REVIEW_COUNT, Value::from(u64::from(review_count)));
        }
        if let Some(difficulty) = patch.difficulty {
            self.set(FIELD_DIFFICULTY, Value::String(difficulty.as_str().to_string()));
        }
        if let Some(mastery) = patch.mastery_level {
            self.set(FIELD_MASTERY_LEVEL, Value::from(round2(mastery)));
        }
    }
}

/// One stored note: identity, optional metadata block and free-text body.
#[derive(Debug, Clone, PartialEq)]
pub struct NoteDocument {
    pub id: NoteId,
    pub frontmatter: Option<Frontmatter>,
    pub body: String,
}

impl NoteDocument {
    /// Splits markdown text into metadata block and body.
    pub fn parse(id: NoteId, text: &str) -> Result<Self, NoteParseError> {
        let Some(captures) = FRONTMATTER_RE.captures(text) else {
            return Ok(Self {
                id,
                frontmatter: None,
                body: text.to_string(),
            });
        };

        let yaml = captures.get(1).map_or("", |m| m.as_str());
        let body = captures.get(2).map_or("", |m| m.as_str());
        Ok(Self {
            id,
            frontmatter: Frontmatter::parse_yaml(yaml)?,
            body: body.to_string(),
        })
    }

    /// Joins metadata block and body back into markdown text.
    pub fn render(&self) -> Result<String, serde_yaml::Error> {
        match &self.frontmatter {
            Some(frontmatter) => Ok(format!("---\n{}---\n{}", frontmatter.to_yaml()?, self.body)),
            None => Ok(self.body.clone()),
        }
    }

    pub fn title(&self) -> String {
        self.id.title()
    }
}

/// Typed view over the recognized metadata fields.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NoteMeta {
    pub created: Option<NaiveDate>,
    pub last_reviewed: Option<NaiveDate>,
    pub next_review: Option<NaiveDate>,
    /// `None` when the field is absent from the block.
    pub review_count: Option<u32>,
    pub difficulty: Option<Difficulty>,
    pub mastery_level: Option<f64>,
    pub tags: Vec<String>,
}

impl NoteMeta {
    pub fn from_frontmatter(frontmatter: &Frontmatter) -> Result<Self, NoteParseError> {
        Ok(Self {
            created: read_date(frontmatter, FIELD_CREATED)?,
            last_reviewed: read_date(frontmatter, FIELD_LAST_REVIEWED)?,
            next_review: read_date(frontmatter, FIELD_NEXT_REVIEW)?,
            review_count: read_count(frontmatter)?,
            difficulty: read_difficulty(frontmatter)?,
            mastery_level: read_mastery(frontmatter)?,
            tags: read_tags(frontmatter),
        })
    }

    pub fn review_count(&self) -> u32 {
        self.review_count.unwrap_or(0)
    }

    pub fn mastery(&self) -> f64 {
        self.mastery_level.unwrap_or(0.0)
    }

    pub fn difficulty_or(&self, default: Difficulty) -> Difficulty {
        self.difficulty.unwrap_or(default)
    }
}

/// A note that carries a metadata block.
#[derive(Debug, Clone, PartialEq)]
pub struct Note {
    pub id: NoteId,
    pub title: String,
    pub meta: NoteMeta,
}

impl Note {
    /// Returns `None` for documents without a metadata block.
    pub fn from_document(document: &NoteDocument) -> Result<Option<Self>, NoteParseError> {
        let Some(frontmatter) = document.frontmatter.as_ref() else {
            return Ok(None);
        };

        Ok(Some(Self {
            id: document.id.clone(),
            title: document.title(),
            meta: NoteMeta::from_frontmatter(frontmatter)?,
        }))
    }
}

/// Rounds to two decimals, the stored precision of `mastery_level`.
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

pub fn format_date(date: NaiveDate) -> String {
    date.format(DATE_FORMAT).to_string()
}

fn invalid(field: &'static str, value: &Value) -> NoteParseError {
    let rendered = serde_yaml::to_string(value)
        .map(|text| text.trim().to_string())
        .unwrap_or_else(|_| format!("{value:?}"));
    NoteParseError::InvalidField {
        field,
        value: rendered,
    }
}

fn read_date(
    frontmatter: &Frontmatter,
    field: &'static str,
) -> Result<Option<NaiveDate>, NoteParseError> {
    match frontmatter.get(field) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(text)) if text.trim().is_empty() => Ok(None),
        Some(value @ Value::String(text)) => {
            // Accept `YYYY-MM-DD` with an optional trailing time part.
            let date_part = text.trim().get(..10).unwrap_or(text.trim());
            NaiveDate::parse_from_str(date_part, DATE_FORMAT)
                .map(Some)
                .map_err(|_| invalid(field, value))
        }
        Some(other) => Err(invalid(field, other)),
    }
}

fn read_count(frontmatter: &Frontmatter) -> Result<Option<u32>, NoteParseError> {
    match frontmatter.get(FIELD_REVIEW_COUNT) {
        None | Some(Value::Null) => Ok(None),
        Some(value @ Value::Number(number)) => number
            .as_u64()
            .and_then(|count| u32::try_from(count).ok())
            .map(Some)
            .ok_or_else(|| invalid(FIELD_REVIEW_COUNT, value)),
        Some(value @ Value::String(text)) => text
            .trim()
            .parse::<u32>()
            .map(Some)
            .map_err(|_| invalid(FIELD_REVIEW_COUNT, value)),
        Some(other) => Err(invalid(FIELD_REVIEW_COUNT, other)),
    }
}

fn read_difficulty(frontmatter: &Frontmatter) -> Result<Option<Difficulty>, NoteParseError> {
    match frontmatter.get(FIELD_DIFFICULTY) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(text)) => Ok(Some(Difficulty::parse_lenient(text))),
        Some(other) => Err(invalid(FIELD_DIFFICULTY, other)),
    }
}

fn read_mastery(frontmatter: &Frontmatter) -> Result<Option<f64>, NoteParseError> {
    match frontmatter.get(FIELD_MASTERY_LEVEL) {
        None | Some(Value::Null) => Ok(None),
        Some(value @ Value::Number(number)) => number
            .as_f64()
            .filter(|mastery| mastery.is_finite())
            .map(Some)
            .ok_or_else(|| invalid(FIELD_MASTERY_LEVEL, value)),
        Some(other) => Err(invalid(FIELD_MASTERY_LEVEL, other)),
    }
}

fn read_tags(frontmatter: &Frontmatter) -> Vec<String> {
    let Some(Value::Sequence(items)) = frontmatter.get(FIELD_TAGS) else {
        return Vec::new();
    };

    let mut tags: Vec<String> = Vec::with_capacity(items.len());
    for item in items {
        let tag = match item {
            Value::String(text) => text.trim().to_string(),
            Value::Number(number) => number.to_string(),
            Value::Bool(flag) => flag.to_string(),
            _ => continue,
        };
        if !tag.is_empty() && !tags.contains(&tag) {
            tags.push(tag);
        }
    }
    tags
}
