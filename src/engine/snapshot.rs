//! Versioned exercise-queue snapshots and their forward migrations.
//!
//! Snapshots are stored as JSON objects carrying a `version` field. Loading
//! runs every registered migration from the stored version up to
//! [`CURRENT_VERSION`] before the result is decoded, so business logic only
//! ever sees the current shape.
//!
//! Version 1 (no `phase`, linear index):
//! ```json
//! { "version": 1, "currentIndex": 2, "itemIds": ["a", "b", "c"],
//!   "answers": [{ "itemId": "a", "correct": true }] }
//! ```
//! `version` and `itemIds` may be absent in version 1 data.
//!
//! Version 2 (queue entries + phase):
//! ```json
//! { "version": 2, "phase": "prompting", "currentIndex": 0,
//!   "queue": [{ "itemId": "b", "answered": false, "correct": null }] }
//! ```

use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

pub const CURRENT_VERSION: u32 = 2;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SnapshotError {
  #[error("Snapshot is not valid JSON: {0}")]
  Parse(String),
  #[error("Snapshot is not a JSON object")]
  NotAnObject,
  #[error("Snapshot version field is not a positive integer")]
  InvalidVersion,
  #[error("Snapshot version {0} is newer than supported version {CURRENT_VERSION}")]
  UnsupportedVersion(u32),
  #[error("No migration registered from version {0}")]
  MissingMigration(u32),
  #[error("Snapshot has an invalid shape: {0}")]
  Shape(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
  Prompting,
  Feedback,
  Complete,
}

impl Phase {
  pub fn as_str(&self) -> &'static str {
    match self {
      Self::Prompting => "prompting",
      Self::Feedback => "feedback",
      Self::Complete => "complete",
    }
  }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueueEntry {
  pub item_id: String,
  pub answered: bool,
  pub correct: Option<bool>,
}

impl QueueEntry {
  pub fn unanswered(item_id: impl Into<String>) -> Self {
    Self {
      item_id: item_id.into(),
      answered: false,
      correct: None,
    }
  }
}

/// Current snapshot shape.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExerciseSnapshot {
  pub version: u32,
  pub queue: Vec<QueueEntry>,
  pub phase: Phase,
  pub current_index: usize,
}

impl ExerciseSnapshot {
  pub fn new(queue: Vec<QueueEntry>, phase: Phase, current_index: usize) -> Self {
    Self {
      version: CURRENT_VERSION,
      queue,
      phase,
      current_index,
    }
  }

  pub fn answered_count(&self) -> usize {
    self.queue.iter().filter(|e| e.answered).count()
  }
}

/// Facts about the running engine that older snapshots did not record.
#[derive(Debug, Clone, Default)]
pub struct MigrationContext {
  /// Item ids the engine was initialized with, in order.
  pub item_ids: Vec<String>,
}

type Migration = fn(Value, &MigrationContext) -> Result<Value, SnapshotError>;

/// `(from_version, migration)`; each migration produces `from_version + 1`.
static MIGRATIONS: &[(u32, Migration)] = &[(1, migrate_v1_to_v2)];

// ==================== Loading ====================

/// Parse, migrate and decode a stored snapshot.
pub fn load(raw: &str, ctx: &MigrationContext) -> Result<ExerciseSnapshot, SnapshotError> {
  let value: Value = serde_json::from_str(raw).map_err(|e| SnapshotError::Parse(e.to_string()))?;
  let value = migrate(value, ctx)?;
  serde_json::from_value(value).map_err(|e| SnapshotError::Shape(e.to_string()))
}

/// Stored version of a snapshot. Data without a version field predates
/// versioning and is treated as version 1.
pub fn version_of(value: &Value) -> Result<u32, SnapshotError> {
  let object = value.as_object().ok_or(SnapshotError::NotAnObject)?;
  match object.get("version") {
    None | Some(Value::Null) => Ok(1),
    Some(v) => v
      .as_u64()
      .and_then(|n| u32::try_from(n).ok())
      .filter(|n| *n >= 1)
      .ok_or(SnapshotError::InvalidVersion),
  }
}

/// Apply registered migrations until the value reaches [`CURRENT_VERSION`].
pub fn migrate(mut value: Value, ctx: &MigrationContext) -> Result<Value, SnapshotError> {
  let mut version = version_of(&value)?;
  if version > CURRENT_VERSION {
    return Err(SnapshotError::UnsupportedVersion(version));
  }

  while version < CURRENT_VERSION {
    let (_, step) = MIGRATIONS
      .iter()
      .find(|(from, _)| *from == version)
      .ok_or(SnapshotError::MissingMigration(version))?;
    value = step(value, ctx)?;

    let next = version_of(&value)?;
    if next != version + 1 {
      return Err(SnapshotError::Shape(format!(
        "migration from version {} produced version {}",
        version, next
      )));
    }
    tracing::debug!("Migrated exercise snapshot v{} -> v{}", version, next);
    version = next;
  }

  Ok(value)
}

// ==================== Migrations ====================

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct V1Answer {
  item_id: String,
  #[serde(default)]
  correct: Option<bool>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct V1Snapshot {
  #[serde(default)]
  current_index: usize,
  #[serde(default)]
  item_ids: Option<Vec<String>>,
  #[serde(default)]
  answers: Vec<V1Answer>,
}

/// Version 1 walked a fixed item list with a linear index. The queue keeps
/// that order, every recorded answer becomes an answered entry, and the phase
/// starts at `prompting` on the first unanswered entry at or after the old
/// index.
fn migrate_v1_to_v2(value: Value, ctx: &MigrationContext) -> Result<Value, SnapshotError> {
  let v1: V1Snapshot =
    serde_json::from_value(value).map_err(|e| SnapshotError::Shape(e.to_string()))?;

  let order = v1.item_ids.unwrap_or_else(|| ctx.item_ids.clone());
  let answers: HashMap<&str, Option<bool>> = v1
    .answers
    .iter()
    .map(|a| (a.item_id.as_str(), a.correct))
    .collect();

  let mut seen = HashSet::new();
  let mut queue: Vec<QueueEntry> = Vec::with_capacity(order.len());
  for id in &order {
    if !seen.insert(id.as_str()) {
      continue;
    }
    queue.push(match answers.get(id.as_str()) {
      Some(correct) => QueueEntry {
        item_id: id.clone(),
        answered: true,
        correct: *correct,
      },
      None => QueueEntry::unanswered(id.clone()),
    });
  }
  // Answers for ids outside the recorded order are kept rather than lost
  for answer in &v1.answers {
    if seen.insert(answer.item_id.as_str()) {
      queue.push(QueueEntry {
        item_id: answer.item_id.clone(),
        answered: true,
        correct: answer.correct,
      });
    }
  }

  let start = v1.current_index.min(queue.len().saturating_sub(1));
  let current_index = (0..queue.len())
    .map(|offset| (start + offset) % queue.len())
    .find(|&i| !queue[i].answered)
    .unwrap_or(0);

  Ok(json!({
    "version": 2,
    "queue": queue,
    "phase": Phase::Prompting,
    "currentIndex": current_index,
  }))
}
