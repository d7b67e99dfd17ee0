//! Profiling events, one JSON object per line.

use chrono::{DateTime, Utc};
use serde::Serialize;

#[derive(Serialize)]
pub struct ProfileEvent {
    pub timestamp: DateTime<Utc>,
    #[serde(flatten)]
    pub event: EventType,
    /// Microseconds, for timed scopes only
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration_us: Option<u64>,
}

impl ProfileEvent {
    pub fn new(event: EventType) -> Self {
        Self {
            timestamp: Utc::now(),
            event,
            duration_us: None,
        }
    }

    pub fn timed(name: &str, duration: std::time::Duration) -> Self {
        Self {
            duration_us: Some(u64::try_from(duration.as_micros()).unwrap_or(u64::MAX)),
            ..Self::new(EventType::TimedScope {
                name: name.to_string(),
            })
        }
    }
}

/// Types of events that can be logged.
#[derive(Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EventType {
    // === Session lifecycle ===
    /// Profiling session started
    SessionStart {
        /// Session identifier
        session_id: String,
    },
    /// Profiling session ended
    SessionEnd {
        total_events: u64,
        /// Card actions and graded answers seen during the session
        practice_events: u64,
    },

    // === Database operations ===
    /// Database query started
    DbQuery {
        /// Operation type (select, insert, update, delete)
        operation: String,
        /// Table name
        table: String,
    },

    // === Engines ===
    /// Card stack action applied (dismiss, save, later, start)
    CardAction {
        action: String,
        item_id: String,
    },
    /// Exercise answer graded
    AnswerChecked {
        item_id: String,
        /// correct, close_enough or incorrect
        result: String,
    },
    /// Persisted snapshot loaded into an engine
    SnapshotRestored {
        /// Storage key
        key: String,
        /// Queue entries after migration
        entries: usize,
    },
    /// Persisted snapshot rejected and replaced by a fresh state
    SnapshotDiscarded {
        key: String,
        reason: String,
    },

    // === Decks ===
    /// Engines for a deck were built from the database
    DeckLoaded {
        deck: String,
        items: usize,
    },

    // === Settings ===
    /// Settings were updated
    SettingsUpdate {
        /// Setting name
        setting: String,
        /// New value
        value: String,
    },

    // === Timed scope ===
    /// A timed code block completed
    TimedScope {
        /// Name of the scope
        name: String,
    },
}

impl EventType {
    /// Events produced by learners practicing, as opposed to plumbing.
    pub fn is_practice(&self) -> bool {
        matches!(self, Self::CardAction { .. } | Self::AnswerChecked { .. })
    }
}
