//! Storage layer for learner mastery.
//!
//! This module provides the [`MasteryStore`] trait and a SQLite-backed
//! implementation keyed by `(user_id, node_id)`.

mod sqlite;


pub use sqlite::SqliteStorage;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{StorageResult, ToolError};

/// Upper bound for percentage-style fields.
pub const MAX_PERCENT: f64 = 100.0;

/// The mutable field set written by every upsert.
///
/// All fields are written together; there is no partial update.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct MasteryFields {
    /// Mastery score in percent (0-100).
    #[serde(default)]
    pub mastery_score: f64,
    /// Number of times the learner came back to the topic.
    #[serde(default)]
    pub revisit_count: u32,
    /// Total time spent on the topic, in seconds.
    #[serde(default)]
    pub total_time_spent: u32,
    /// Number of subtopics the learner opened.
    #[serde(default)]
    pub subtopics_explored: u32,
    /// Share of the topic's content consumed, in percent (0-100).
    #[serde(default)]
    pub content_read_pct: f64,
}

impl MasteryFields {
    /// Create a field set with only a mastery score.
    pub fn new(mastery_score: f64) -> Self {
        Self {
            mastery_score,
            ..Default::default()
        }
    }

    /// Set the revisit count.
    pub fn with_revisits(mut self, revisit_count: u32) -> Self {
        self.revisit_count = revisit_count;
        self
    }

    /// Set the total time spent, in seconds.
    pub fn with_time_spent(mut self, seconds: u32) -> Self {
        self.total_time_spent = seconds;
        self
    }

    /// Set the number of subtopics explored.
    pub fn with_subtopics(mut self, subtopics_explored: u32) -> Self {
        self.subtopics_explored = subtopics_explored;
        self
    }

    /// Set the content-read percentage.
    pub fn with_content_read(mut self, content_read_pct: f64) -> Self {
        self.content_read_pct = content_read_pct;
        self
    }

    /// Check that both percentage fields are finite and within 0-100.
    pub fn validate(&self) -> Result<(), ToolError> {
        check_percent("mastery_score", self.mastery_score)?;
        check_percent("content_read_pct", self.content_read_pct)
    }
}

fn check_percent(field: &str, value: f64) -> Result<(), ToolError> {
    if !value.is_finite() || !(0.0..=MAX_PERCENT).contains(&value) {
        return Err(ToolError::Validation {
            field: field.to_string(),
            reason: format!("must be between 0 and 100, got {}", value),
        });
    }
    Ok(())
}

/// Per-(user, node) progress snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MasteryRecord {
    /// Learner identifier.
    pub user_id: String,
    /// Topic identifier.
    pub node_id: String,
    /// Stored field values.
    #[serde(flatten)]
    pub fields: MasteryFields,
    /// Stamped on every upsert.
    pub last_visited: Option<DateTime<Utc>>,
    /// Stamped on every upsert.
    pub updated_at: DateTime<Utc>,
}

impl MasteryRecord {
    /// Qualitative band for the stored score.
    pub fn band(&self) -> MasteryBand {
        MasteryBand::from_score(self.fields.mastery_score)
    }
}

/// A `(node_id, mastery_score)` pair from a per-user listing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MasteryScore {
    /// Topic identifier.
    pub node_id: String,
    /// Mastery score in percent.
    pub mastery_score: f64,
}

impl MasteryScore {
    /// Create a new score entry.
    pub fn new(node_id: impl Into<String>, mastery_score: f64) -> Self {
        Self {
            node_id: node_id.into(),
            mastery_score,
        }
    }
}

/// Mastery bands used when talking to the learner and the model.
///
/// Above 50% is solid understanding, 70% and up is advanced, 100% is expert.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MasteryBand {
    /// 50% or below.
    Learning,
    /// Above 50%.
    Solid,
    /// 70% and above.
    Advanced,
    /// 100%.
    Expert,
}

impl MasteryBand {
    /// Classify a score.
    pub fn from_score(score: f64) -> Self {
        if score >= MAX_PERCENT {
            MasteryBand::Expert
        } else if score >= 70.0 {
            MasteryBand::Advanced
        } else if score > 50.0 {
            MasteryBand::Solid
        } else {
            MasteryBand::Learning
        }
    }
}

impl std::fmt::Display for MasteryBand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MasteryBand::Learning => write!(f, "learning"),
            MasteryBand::Solid => write!(f, "solid"),
            MasteryBand::Advanced => write!(f, "advanced"),
            MasteryBand::Expert => write!(f, "expert"),
        }
    }
}

/// Keyed mastery store.
///
/// Implementations must make [`MasteryStore::upsert`] atomic per key: a
/// concurrent reader sees either the old record or the new one, never a mix.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait MasteryStore: Send + Sync {
    /// Create the record for `(user_id, node_id)` or overwrite all of its
    /// mutable fields, stamping `updated_at` and `last_visited`.
    async fn upsert(
        &self,
        user_id: &str,
        node_id: &str,
        fields: MasteryFields,
    ) -> StorageResult<MasteryRecord>;

    /// Point read of a single record.
    async fn get_mastery(&self, user_id: &str, node_id: &str)
        -> StorageResult<Option<MasteryRecord>>;

    /// All scores for a user, weakest first.
    async fn list_mastery(&self, user_id: &str) -> StorageResult<Vec<MasteryScore>>;
}
