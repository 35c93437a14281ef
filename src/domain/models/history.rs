//! Records emitted to the history sink.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::action::Action;
use super::decision::Decision;
use super::iteration::Iteration;
use super::session::SessionOutcome;

/// One line of session history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryRecord {
    /// Session that produced the record.
    pub session_id: Uuid,
    /// When it was recorded.
    pub recorded_at: DateTime<Utc>,
    /// The record itself.
    #[serde(flatten)]
    pub entry: HistoryEntry,
}

/// What happened.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "record", rename_all = "snake_case")]
pub enum HistoryEntry {
    /// A gate decision for one action.
    Decision {
        /// Iteration the action belonged to.
        iteration: u32,
        /// The action as submitted.
        action: Action,
        /// What the gates decided.
        decision: Decision,
    },
    /// A completed iteration.
    Iteration {
        /// The iteration's results.
        iteration: Iteration,
    },
    /// How the session ended.
    Outcome {
        /// The terminal outcome.
        outcome: SessionOutcome,
    },
}

impl HistoryRecord {
    /// Record `entry` for `session_id`, stamped now.
    pub fn new(session_id: Uuid, entry: HistoryEntry) -> Self {
        Self {
            session_id,
            recorded_at: Utc::now(),
            entry,
        }
    }

    /// `decision`, `iteration` or `outcome`.
    pub fn kind(&self) -> &'static str {
        match self.entry {
            HistoryEntry::Decision { .. } => "decision",
            HistoryEntry::Iteration { .. } => "iteration",
            HistoryEntry::Outcome { .. } => "outcome",
        }
    }
}
