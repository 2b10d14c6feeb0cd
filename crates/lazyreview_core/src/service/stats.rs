//! Knowledge-base statistics.

use crate::config::Config;
use crate::model::note::{Difficulty, Note};
use crate::repo::note_store::{NoteStore, StoreError};
use crate::service::review_list::Bucket;
use chrono::NaiveDate;
use std::collections::BTreeMap;

/// Topic name for notes directly under `notes_dir`.
pub const TOP_LEVEL_TOPIC: &str = "other";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DueCounts {
    pub overdue: usize,
    pub today: usize,
    pub this_week: usize,
    pub upcoming: usize,
    pub unscheduled: usize,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct TopicStats {
    pub notes: usize,
    pub total_reviews: u64,
    pub average_mastery: f64,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct KnowledgeBaseStats {
    /// Notes with a metadata block.
    pub notes: usize,
    pub without_metadata: usize,
    pub skipped: usize,
    /// Notes whose block carries `review_count`.
    pub with_review_count: usize,
    pub total_reviews: u64,
    pub average_mastery: f64,
    /// `None` collects notes without a `difficulty` field.
    pub by_difficulty: BTreeMap<Option<Difficulty>, usize>,
    pub due: DueCounts,
    pub by_topic: BTreeMap<String, TopicStats>,
}

pub fn collect_stats<S: NoteStore + ?Sized>(
    store: &S,
    config: &Config,
    today: NaiveDate,
) -> Result<KnowledgeBaseStats, StoreError> {
    let collection = store.load_notes()?;
    let mut stats = summarize(&collection.notes, &config.notes_prefix(), today);
    stats.without_metadata = collection.without_metadata;
    stats.skipped = collection.skipped.len();
    Ok(stats)
}

/// Aggregates already-loaded notes.
pub fn summarize(notes: &[Note], notes_prefix: &str, today: NaiveDate) -> KnowledgeBaseStats {
    let mut stats = KnowledgeBaseStats {
        notes: notes.len(),
        ..KnowledgeBaseStats::default()
    };
    let mut mastery_sum = 0.0;
    let mut topic_mastery: BTreeMap<String, f64> = BTreeMap::new();

    for note in notes {
        let meta = &note.meta;
        let reviews = u64::from(meta.review_count());
        if meta.review_count.is_some() {
            stats.with_review_count += 1;
        }
        stats.total_reviews += reviews;
        mastery_sum += meta.mastery();
        *stats.by_difficulty.entry(meta.difficulty).or_default() += 1;

        match meta.next_review.map(|next| Bucket::classify(next, today)) {
            Some(Bucket::Overdue) => stats.due.overdue += 1,
            Some(Bucket::Today) => stats.due.today += 1,
            Some(Bucket::ThisWeek) => stats.due.this_week += 1,
            Some(Bucket::Upcoming) => stats.due.upcoming += 1,
            None => stats.due.unscheduled += 1,
        }

        let topic = note
            .id
            .topic(notes_prefix)
            .unwrap_or(TOP_LEVEL_TOPIC)
            .to_string();
        *topic_mastery.entry(topic.clone()).or_default() += meta.mastery();
        let entry = stats.by_topic.entry(topic).or_default();
        entry.notes += 1;
        entry.total_reviews += reviews;
    }

    if !notes.is_empty() {
        stats.average_mastery = mastery_sum / notes.len() as f64;
    }
    for (topic, entry) in &mut stats.by_topic {
        let sum = topic_mastery.get(topic).copied().unwrap_or(0.0);
        entry.average_mastery = sum / entry.notes.max(1) as f64;
    }
    stats
}
