//! Exercise session state machine.
//!
//! ```text
//! prompting --submit--> feedback --continue--> prompting (next unanswered)
//!     |  ^                          \--------> complete  (nothing unanswered)
//!     \--/ skip (rotate current entry to the back)
//! ```
//!
//! Skipping never advances past an item: the entry moves to the end of the
//! queue, so the session only completes once every entry has been answered.
//! Every state change is written through to the key-value store as a
//! version 2 snapshot.

use std::collections::HashSet;
use std::sync::Arc;

use serde::Serialize;

use super::snapshot::{self, ExerciseSnapshot, MigrationContext, Phase, QueueEntry};
use super::storage::{write_json, KeyValueStore, StorageError};
use crate::domain::PracticeItem;
use crate::validation::{check_answer, AnswerResult};

/// Answer outcome for the entry currently in feedback.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Feedback {
  pub item_id: String,
  pub correct: bool,
  /// Finer grading of the latest submission; absent after a restore
  pub result: Option<AnswerResult>,
  pub expected_answer: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Progress {
  pub answered: usize,
  pub correct: usize,
  pub total: usize,
}

pub struct ExerciseQueue {
  items: Vec<PracticeItem>,
  queue: Vec<QueueEntry>,
  current: usize,
  phase: Phase,
  last_result: Option<AnswerResult>,
  is_hydrated: bool,
  persistence_key: Option<String>,
  store: Arc<dyn KeyValueStore>,
}

/// Index of the first unanswered entry at or after `start`, wrapping.
fn next_unanswered(queue: &[QueueEntry], start: usize) -> Option<usize> {
  let len = queue.len();
  (0..len)
    .map(|offset| (start + offset) % len)
    .find(|&i| !queue[i].answered)
}

fn fresh_queue(items: &[PracticeItem]) -> Vec<QueueEntry> {
  let mut seen = HashSet::new();
  items
    .iter()
    .filter(|item| seen.insert(item.id.as_str()))
    .map(|item| QueueEntry::unanswered(item.id.clone()))
    .collect()
}

/// Starting position for a queue: first unanswered entry, or complete.
fn settle(queue: &[QueueEntry], start: usize) -> (usize, Phase) {
  match next_unanswered(queue, start) {
    Some(i) => (i, Phase::Prompting),
    None => (0, Phase::Complete),
  }
}

impl ExerciseQueue {
  /// Fresh queue over `items`. No restore is attempted until [`hydrate`].
  ///
  /// [`hydrate`]: ExerciseQueue::hydrate
  pub fn new(
    items: Vec<PracticeItem>,
    persistence_key: Option<String>,
    store: Arc<dyn KeyValueStore>,
  ) -> Self {
    let queue = fresh_queue(&items);
    let (current, phase) = settle(&queue, 0);
    Self {
      items,
      queue,
      current,
      phase,
      last_result: None,
      is_hydrated: false,
      persistence_key,
      store,
    }
  }

  /// `new` followed by `hydrate`.
  pub fn initialize(
    items: Vec<PracticeItem>,
    persistence_key: Option<String>,
    store: Arc<dyn KeyValueStore>,
  ) -> Self {
    let mut queue = Self::new(items, persistence_key, store);
    queue.hydrate();
    queue
  }

  /// Restore the persisted snapshot, if any, and mark the queue hydrated.
  /// Unreadable or unsupported snapshots are discarded.
  pub fn hydrate(&mut self) {
    if self.is_hydrated {
      return;
    }
    if let Some(restored) = self.persistence_key.as_deref().and_then(|key| self.restore(key)) {
      self.apply_snapshot(restored);
    }
    self.is_hydrated = true;
  }

  fn restore(&self, key: &str) -> Option<ExerciseSnapshot> {
    let raw = match self.store.get(key) {
      Ok(Some(raw)) => raw,
      Ok(None) => return None,
      Err(e) => {
        tracing::warn!("Could not read exercise snapshot {}: {}", key, e);
        return None;
      }
    };

    let ctx = MigrationContext {
      item_ids: self.items.iter().map(|i| i.id.clone()).collect(),
    };
    match snapshot::load(&raw, &ctx) {
      Ok(snapshot) => {
        tracing::debug!(
          "Restored exercise snapshot {} ({} of {} answered)",
          key,
          snapshot.answered_count(),
          snapshot.queue.len()
        );
        crate::profile_log!(crate::profiling::EventType::SnapshotRestored {
          key: key.to_string(),
          entries: snapshot.queue.len(),
        });
        Some(snapshot)
      }
      Err(e) => {
        tracing::warn!("Discarding exercise snapshot {}: {}", key, e);
        crate::profile_log!(crate::profiling::EventType::SnapshotDiscarded {
          key: key.to_string(),
          reason: e.to_string(),
        });
        None
      }
    }
  }

  /// Reconcile a restored snapshot with the current item list: entries for
  /// unknown items are dropped, duplicates collapse to the first entry, and
  /// new items are appended unanswered.
  fn apply_snapshot(&mut self, snapshot: ExerciseSnapshot) {
    let current_id = snapshot
      .queue
      .get(snapshot.current_index)
      .map(|e| e.item_id.clone());

    let known: HashSet<&str> = self.items.iter().map(|i| i.id.as_str()).collect();
    let mut seen = HashSet::new();
    let mut queue: Vec<QueueEntry> = snapshot
      .queue
      .into_iter()
      .filter(|e| known.contains(e.item_id.as_str()) && seen.insert(e.item_id.clone()))
      .map(|mut e| {
        if !e.answered {
          e.correct = None;
        }
        e
      })
      .collect();
    for item in &self.items {
      if seen.insert(item.id.clone()) {
        queue.push(QueueEntry::unanswered(item.id.clone()));
      }
    }

    let anchor = current_id
      .as_deref()
      .and_then(|id| queue.iter().position(|e| e.item_id == id));

    let (current, phase) = match (snapshot.phase, anchor) {
      (Phase::Feedback, Some(i)) if queue[i].answered => (i, Phase::Feedback),
      (Phase::Prompting, Some(i)) if !queue[i].answered => (i, Phase::Prompting),
      (_, anchor) => settle(&queue, anchor.unwrap_or(0)),
    };

    self.queue = queue;
    self.current = current;
    self.phase = phase;
    self.last_result = None;
  }

  // ==================== Actions ====================

  /// Grade `input` against the current item. No-op (returns `None`) unless
  /// the queue is prompting.
  pub fn submit_answer(&mut self, input: &str) -> Result<Option<AnswerResult>, StorageError> {
    if self.phase != Phase::Prompting {
      tracing::debug!("Ignoring answer submitted during {}", self.phase.as_str());
      return Ok(None);
    }
    let Some(item) = self.current_item() else {
      return Ok(None);
    };

    let result = check_answer(item, input);
    let item_id = item.id.clone();

    let mut queue = self.queue.clone();
    let entry = &mut queue[self.current];
    entry.answered = true;
    entry.correct = Some(result.is_correct());

    self.persist(&queue, Phase::Feedback, self.current)?;
    self.queue = queue;
    self.phase = Phase::Feedback;
    self.last_result = Some(result);

    tracing::debug!("Answer for {}: {}", item_id, result.as_str());
    crate::profile_log!(crate::profiling::EventType::AnswerChecked {
      item_id,
      result: result.as_str().into(),
    });
    Ok(Some(result))
  }

  /// Move the current entry to the back of the queue. Returns false when not
  /// prompting.
  pub fn skip(&mut self) -> Result<bool, StorageError> {
    if self.phase != Phase::Prompting || self.queue.is_empty() {
      return Ok(false);
    }

    let mut queue = self.queue.clone();
    let entry = queue.remove(self.current);
    let skipped = entry.item_id.clone();
    queue.push(entry);
    let start = if self.current >= queue.len() { 0 } else { self.current };
    let (current, phase) = settle(&queue, start);

    self.persist(&queue, phase, current)?;
    self.queue = queue;
    self.current = current;
    self.phase = phase;

    tracing::debug!("Skipped {}", skipped);
    Ok(true)
  }

  /// Leave feedback for the next unanswered entry, or complete. Returns false
  /// when not in feedback.
  pub fn continue_to_next(&mut self) -> Result<bool, StorageError> {
    if self.phase != Phase::Feedback {
      return Ok(false);
    }

    let (current, phase) = settle(&self.queue, self.current + 1);
    self.persist(&self.queue, phase, current)?;
    self.current = current;
    self.phase = phase;
    self.last_result = None;

    if phase == Phase::Complete {
      tracing::debug!("Exercise complete: {:?}", self.progress());
    }
    Ok(true)
  }

  /// Start over with `items`, all unanswered.
  pub fn restart(&mut self, items: Vec<PracticeItem>) -> Result<(), StorageError> {
    let queue = fresh_queue(&items);
    let (current, phase) = settle(&queue, 0);
    self.persist(&queue, phase, current)?;
    self.items = items;
    self.queue = queue;
    self.current = current;
    self.phase = phase;
    self.last_result = None;
    Ok(())
  }

  // ==================== Views ====================

  pub fn phase(&self) -> Phase {
    self.phase
  }

  pub fn is_hydrated(&self) -> bool {
    self.is_hydrated
  }

  pub fn queue(&self) -> &[QueueEntry] {
    &self.queue
  }

  pub fn current_index(&self) -> Option<usize> {
    (self.phase != Phase::Complete && !self.queue.is_empty()).then_some(self.current)
  }

  /// Item being prompted or shown in feedback; `None` once complete.
  pub fn current_item(&self) -> Option<&PracticeItem> {
    let entry = self.queue.get(self.current_index()?)?;
    self.items.iter().find(|i| i.id == entry.item_id)
  }

  pub fn feedback(&self) -> Option<Feedback> {
    if self.phase != Phase::Feedback {
      return None;
    }
    let entry = self.queue.get(self.current)?;
    let item = self.current_item()?;
    Some(Feedback {
      item_id: entry.item_id.clone(),
      correct: entry.correct.unwrap_or(false),
      result: self.last_result,
      expected_answer: item.expected_answer().to_string(),
    })
  }

  pub fn progress(&self) -> Progress {
    Progress {
      answered: self.queue.iter().filter(|e| e.answered).count(),
      correct: self.queue.iter().filter(|e| e.correct == Some(true)).count(),
      total: self.queue.len(),
    }
  }

  pub fn items(&self) -> &[PracticeItem] {
    &self.items
  }

  pub fn snapshot(&self) -> ExerciseSnapshot {
    ExerciseSnapshot::new(self.queue.clone(), self.phase, self.current)
  }

  // ==================== Internals ====================

  fn persist(&self, queue: &[QueueEntry], phase: Phase, current: usize) -> Result<(), StorageError> {
    let Some(key) = &self.persistence_key else {
      return Ok(());
    };
    let snapshot = ExerciseSnapshot::new(queue.to_vec(), phase, current);
    write_json(self.store.as_ref(), key, &snapshot).inspect_err(|e| {
      tracing::warn!("Failed to persist exercise snapshot {}: {}", key, e);
    })
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::engine::storage::{FailingStore, MemoryStore};
  use crate::testing::sample_items;

  fn order(queue: &ExerciseQueue) -> Vec<&str> {
    queue.queue().iter().map(|e| e.item_id.as_str()).collect()
  }

  fn current_id(queue: &ExerciseQueue) -> Option<&str> {
    queue.current_item().map(|i| i.id.as_str())
  }

  /// Translation of sample item `id` is `meaning <id>`.
  fn right_answer(id: &str) -> String {
    format!("meaning {}", id)
  }

  fn keyed(ids: &[&str], store: &Arc<MemoryStore>) -> ExerciseQueue {
    ExerciseQueue::initialize(sample_items(ids), Some("exercise:all".into()), store.clone())
  }

  #[test]
  fn test_starts_prompting_on_first_item() {
    let store = Arc::new(MemoryStore::new());
    let queue = ExerciseQueue::new(sample_items(&["1", "2"]), None, store);
    assert!(!queue.is_hydrated());
    assert_eq!(queue.phase(), Phase::Prompting);
    assert_eq!(current_id(&queue), Some("1"));
  }

  #[test]
  fn test_empty_queue_is_complete() {
    let queue = ExerciseQueue::initialize(Vec::new(), None, Arc::new(MemoryStore::new()));
    assert_eq!(queue.phase(), Phase::Complete);
    assert!(queue.current_item().is_none());
  }

  #[test]
  fn test_skip_submit_continue_scenario() {
    let store = Arc::new(MemoryStore::new());
    let mut queue = keyed(&["A", "B", "C"], &store);

    assert!(queue.skip().unwrap());
    assert_eq!(order(&queue), vec!["B", "C", "A"]);
    assert_eq!(queue.phase(), Phase::Prompting);
    assert_eq!(queue.progress().answered, 0);
    assert_eq!(current_id(&queue), Some("B"));

    let result = queue.submit_answer(&right_answer("B")).unwrap();
    assert_eq!(result, Some(AnswerResult::Correct));
    assert_eq!(queue.phase(), Phase::Feedback);
    assert!(queue.queue()[0].answered);

    assert!(queue.continue_to_next().unwrap());
    assert_eq!(queue.phase(), Phase::Prompting);
    assert_eq!(current_id(&queue), Some("C"));
  }

  #[test]
  fn test_skip_only_never_completes() {
    for n in 1..=5 {
      let ids: Vec<String> = (0..n).map(|i| i.to_string()).collect();
      let refs: Vec<&str> = ids.iter().map(String::as_str).collect();
      let mut queue = ExerciseQueue::initialize(sample_items(&refs), None, Arc::new(MemoryStore::new()));
      for _ in 0..(3 * n) {
        queue.skip().unwrap();
        assert_eq!(queue.phase(), Phase::Prompting);
        assert_eq!(queue.queue().len(), n);
      }
    }
  }

  #[test]
  fn test_completes_only_after_every_item_answered() {
    let mut queue =
      ExerciseQueue::initialize(sample_items(&["1", "2", "3"]), None, Arc::new(MemoryStore::new()));
    queue.skip().unwrap();
    queue.submit_answer("wrong").unwrap();
    queue.continue_to_next().unwrap();
    queue.skip().unwrap();
    queue.skip().unwrap();
    queue.submit_answer("wrong").unwrap();
    queue.continue_to_next().unwrap();
    assert_eq!(queue.phase(), Phase::Prompting);
    queue.submit_answer("wrong").unwrap();
    queue.continue_to_next().unwrap();

    assert_eq!(queue.phase(), Phase::Complete);
    assert_eq!(queue.progress().answered, 3);
    assert_eq!(queue.progress().correct, 0);
  }

  #[test]
  fn test_duplicate_submit_is_noop() {
    let mut queue =
      ExerciseQueue::initialize(sample_items(&["1", "2"]), None, Arc::new(MemoryStore::new()));
    queue.submit_answer("wrong").unwrap();
    assert_eq!(queue.submit_answer(&right_answer("1")).unwrap(), None);
    assert_eq!(queue.queue()[0].correct, Some(false));
    assert!(!queue.skip().unwrap());
  }

  #[test]
  fn test_continue_requires_feedback() {
    let mut queue =
      ExerciseQueue::initialize(sample_items(&["1"]), None, Arc::new(MemoryStore::new()));
    assert!(!queue.continue_to_next().unwrap());
    assert_eq!(queue.phase(), Phase::Prompting);
  }

  #[test]
  fn test_feedback_view() {
    let mut queue =
      ExerciseQueue::initialize(sample_items(&["1"]), None, Arc::new(MemoryStore::new()));
    assert!(queue.feedback().is_none());
    queue.submit_answer("nope").unwrap();
    let feedback = queue.feedback().unwrap();
    assert!(!feedback.correct);
    assert_eq!(feedback.result, Some(AnswerResult::Incorrect));
    assert_eq!(feedback.expected_answer, "meaning 1");
  }

  #[test]
  fn test_submit_persists_immediately() {
    let store = Arc::new(MemoryStore::new());
    let mut queue = keyed(&["1", "2"], &store);
    queue.submit_answer(&right_answer("1")).unwrap();

    let restored = keyed(&["1", "2"], &store);
    assert_eq!(restored.phase(), Phase::Feedback);
    assert_eq!(current_id(&restored), Some("1"));
    assert_eq!(restored.progress().correct, 1);
    assert_eq!(restored.feedback().unwrap().result, None);
  }

  #[test]
  fn test_skip_order_survives_reload() {
    let store = Arc::new(MemoryStore::new());
    let mut queue = keyed(&["1", "2", "3"], &store);
    queue.skip().unwrap();
    let restored = keyed(&["1", "2", "3"], &store);
    assert_eq!(order(&restored), vec!["2", "3", "1"]);
    assert_eq!(current_id(&restored), Some("2"));
  }

  #[test]
  fn test_hydration_flag() {
    let store = Arc::new(MemoryStore::new());
    let mut queue = ExerciseQueue::new(sample_items(&["1"]), Some("exercise:all".into()), store);
    assert!(!queue.is_hydrated());
    queue.hydrate();
    assert!(queue.is_hydrated());
  }

  #[test]
  fn test_malformed_snapshot_falls_back() {
    let store = Arc::new(MemoryStore::new());
    store.set("exercise:all", "{{{").unwrap();
    let queue = keyed(&["1", "2"], &store);
    assert!(queue.is_hydrated());
    assert_eq!(order(&queue), vec!["1", "2"]);
    assert_eq!(queue.phase(), Phase::Prompting);

    store.set("exercise:all", r#"{"version": 3, "queue": []}"#).unwrap();
    let queue = keyed(&["1", "2"], &store);
    assert_eq!(queue.progress().total, 2);
  }

  #[test]
  fn test_v1_snapshot_migrates_on_load() {
    let store = Arc::new(MemoryStore::new());
    store
      .set(
        "exercise:all",
        r#"{"version": 1, "currentIndex": 1, "itemIds": ["1", "2", "3"],
            "answers": [{"itemId": "1", "correct": true}]}"#,
      )
      .unwrap();
    let queue = keyed(&["1", "2", "3"], &store);
    assert_eq!(queue.phase(), Phase::Prompting);
    assert_eq!(queue.progress().answered, 1);
    assert_eq!(current_id(&queue), Some("2"));
  }

  #[test]
  fn test_v1_fully_answered_settles_complete() {
    let store = Arc::new(MemoryStore::new());
    store
      .set(
        "exercise:all",
        r#"{"currentIndex": 1, "answers": [
            {"itemId": "1", "correct": true}, {"itemId": "2", "correct": false}]}"#,
      )
      .unwrap();
    let queue = keyed(&["1", "2"], &store);
    assert_eq!(queue.phase(), Phase::Complete);
  }

  #[test]
  fn test_reconcile_drops_unknown_and_appends_new() {
    let store = Arc::new(MemoryStore::new());
    let mut queue = keyed(&["1", "2", "3"], &store);
    queue.submit_answer(&right_answer("1")).unwrap();
    queue.continue_to_next().unwrap();

    let restored = keyed(&["3", "1", "4"], &store);
    assert_eq!(order(&restored), vec!["1", "3", "4"]);
    assert_eq!(restored.progress().answered, 1);
    // "2" was current and is gone; prompting resumes on the next unanswered
    assert_eq!(restored.phase(), Phase::Prompting);
    assert_eq!(current_id(&restored), Some("3"));
  }

  #[test]
  fn test_complete_reopens_when_items_added() {
    let store = Arc::new(MemoryStore::new());
    let mut queue = keyed(&["1"], &store);
    queue.submit_answer("x").unwrap();
    queue.continue_to_next().unwrap();
    assert_eq!(queue.phase(), Phase::Complete);

    let restored = keyed(&["1", "2"], &store);
    assert_eq!(restored.phase(), Phase::Prompting);
    assert_eq!(current_id(&restored), Some("2"));
  }

  #[test]
  fn test_restart_clears_answers() {
    let store = Arc::new(MemoryStore::new());
    let mut queue = keyed(&["1", "2"], &store);
    queue.submit_answer("x").unwrap();
    queue.restart(sample_items(&["1", "2", "3"])).unwrap();
    assert_eq!(queue.progress(), Progress { answered: 0, correct: 0, total: 3 });
    assert_eq!(queue.phase(), Phase::Prompting);
  }

  #[test]
  fn test_failed_write_keeps_previous_state() {
    let store = Arc::new(FailingStore::default());
    let mut queue =
      ExerciseQueue::initialize(sample_items(&["1", "2"]), Some("exercise:all".into()), store.clone());
    store.set_failing(true);

    assert!(queue.submit_answer(&right_answer("1")).is_err());
    assert_eq!(queue.phase(), Phase::Prompting);
    assert_eq!(queue.progress().answered, 0);

    assert!(queue.skip().is_err());
    assert_eq!(order(&queue), vec!["1", "2"]);

    store.set_failing(false);
    assert_eq!(
      queue.submit_answer(&right_answer("1")).unwrap(),
      Some(AnswerResult::Correct)
    );
  }
}
