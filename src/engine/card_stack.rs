//! Card stack for the browse / save-or-skip flow.
//!
//! Cards are never removed, only moved between statuses. Every status-changing
//! action captures a single-level undo snapshot that expires after the undo
//! window; expiry is driven by a task scheduled at capture time and guarded by
//! the snapshot id, so a late timer can never clear a newer snapshot.

use std::collections::HashSet;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::scheduler::{Scheduler, TaskHandle};
use super::storage::{write_json, KeyValueStore, StorageError};
use crate::config;
use crate::domain::PracticeItem;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CardStatus {
  Active,
  Later,
  Saved,
  Dismissed,
}

impl CardStatus {
  /// Active and later cards are both still in the queue.
  pub fn is_queued(&self) -> bool {
    matches!(self, Self::Active | Self::Later)
  }
}

/// Persisted as `{ "lesson": <item>, "status": "<status>" }`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CardState {
  pub lesson: PracticeItem,
  pub status: CardStatus,
}

impl CardState {
  pub fn active(lesson: PracticeItem) -> Self {
    Self {
      lesson,
      status: CardStatus::Active,
    }
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CardActionType {
  Dismiss,
  Save,
  Later,
  Start,
}

impl CardActionType {
  pub fn as_str(&self) -> &'static str {
    match self {
      Self::Dismiss => "dismiss",
      Self::Save => "save",
      Self::Later => "later",
      Self::Start => "start",
    }
  }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CardAction {
  #[serde(rename = "type")]
  pub action_type: CardActionType,
  pub item_id: String,
}

impl CardAction {
  pub fn new(action_type: CardActionType, item_id: impl Into<String>) -> Self {
    Self {
      action_type,
      item_id: item_id.into(),
    }
  }
}

/// What `handle_action` did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionOutcome {
  /// Status changed and an undo snapshot was captured
  Applied,
  /// `start` only signals the UI; nothing changed
  Started,
  /// No card with that item id (stale UI event)
  UnknownItem,
  /// The card is dismissed, or already saved for a save; nothing changed
  Ignored,
}

#[derive(Debug, Clone)]
pub struct UndoState {
  pub id: u64,
  pub action: CardAction,
  pub previous: Vec<CardState>,
  pub captured_at: DateTime<Utc>,
}

type UndoSlot = Arc<Mutex<Option<UndoState>>>;

fn lock_slot(slot: &Mutex<Option<UndoState>>) -> MutexGuard<'_, Option<UndoState>> {
  slot.lock().unwrap_or_else(PoisonError::into_inner)
}

pub struct CardStack {
  initial: Vec<PracticeItem>,
  cards: Vec<CardState>,
  undo: UndoSlot,
  undo_task: Option<TaskHandle>,
  next_undo_id: u64,
  undo_window: Duration,
  persistence_key: Option<String>,
  store: Arc<dyn KeyValueStore>,
  scheduler: Arc<dyn Scheduler>,
}

impl CardStack {
  /// Build the stack for `items`, restoring the persisted snapshot under
  /// `persistence_key` when there is a valid one.
  pub fn initialize(
    items: Vec<PracticeItem>,
    persistence_key: Option<String>,
    store: Arc<dyn KeyValueStore>,
    scheduler: Arc<dyn Scheduler>,
  ) -> Self {
    let restored = persistence_key
      .as_deref()
      .and_then(|key| restore_snapshot(store.as_ref(), key));

    let cards = match restored {
      Some(cards) => cards,
      None => items.iter().cloned().map(CardState::active).collect(),
    };

    Self {
      initial: items,
      cards,
      undo: Arc::new(Mutex::new(None)),
      undo_task: None,
      next_undo_id: 1,
      undo_window: Duration::from_millis(config::UNDO_WINDOW_MS),
      persistence_key,
      store,
      scheduler,
    }
  }

  pub fn with_undo_window(mut self, window: Duration) -> Self {
    self.undo_window = window;
    self
  }

  // ==================== Actions ====================

  pub fn handle_action(&mut self, action: &CardAction) -> Result<ActionOutcome, StorageError> {
    if action.action_type == CardActionType::Start {
      tracing::debug!("Card start: {}", action.item_id);
      crate::profile_log!(crate::profiling::EventType::CardAction {
        action: action.action_type.as_str().into(),
        item_id: action.item_id.clone(),
      });
      return Ok(ActionOutcome::Started);
    }

    let Some(index) = self.position_of(&action.item_id) else {
      tracing::debug!(
        "Ignoring {} for unknown item {}",
        action.action_type.as_str(),
        action.item_id
      );
      return Ok(ActionOutcome::UnknownItem);
    };

    let status = self.cards[index].status;
    if status == CardStatus::Dismissed
      || (status == CardStatus::Saved && action.action_type == CardActionType::Save)
    {
      tracing::debug!(
        "Ignoring {} for {} card {}",
        action.action_type.as_str(),
        if status == CardStatus::Dismissed { "dismissed" } else { "saved" },
        action.item_id
      );
      return Ok(ActionOutcome::Ignored);
    }

    let mut next = self.cards.clone();
    match action.action_type {
      CardActionType::Dismiss => next[index].status = CardStatus::Dismissed,
      CardActionType::Save => next[index].status = CardStatus::Saved,
      CardActionType::Later => {
        let mut card = next.remove(index);
        card.status = CardStatus::Later;
        next.push(card);
      }
      CardActionType::Start => unreachable!("start handled above"),
    }

    self.persist(&next)?;
    let previous = std::mem::replace(&mut self.cards, next);
    self.capture_undo(action.clone(), previous);

    tracing::debug!("Card {}: {}", action.action_type.as_str(), action.item_id);
    crate::profile_log!(crate::profiling::EventType::CardAction {
      action: action.action_type.as_str().into(),
      item_id: action.item_id.clone(),
    });
    Ok(ActionOutcome::Applied)
  }

  /// Restore the card list captured by the last action. Returns false when
  /// there is nothing to undo.
  pub fn undo_last_action(&mut self) -> Result<bool, StorageError> {
    let Some(undo) = self.live_undo() else {
      return Ok(false);
    };

    self.persist(&undo.previous)?;
    self.cards = undo.previous;
    self.clear_undo();
    tracing::debug!("Undid {} on {}", undo.action.action_type.as_str(), undo.action.item_id);
    Ok(true)
  }

  /// Every card back to active, from the original item list.
  pub fn reset_cards(&mut self) -> Result<(), StorageError> {
    let next: Vec<CardState> = self.initial.iter().cloned().map(CardState::active).collect();
    self.persist(&next)?;
    self.cards = next;
    self.clear_undo();
    Ok(())
  }

  /// Replace the item set, keeping the status of items already seen.
  pub fn reset_with_lessons(&mut self, items: Vec<PracticeItem>) -> Result<(), StorageError> {
    let next: Vec<CardState> = items
      .iter()
      .cloned()
      .map(|lesson| {
        let status = self
          .cards
          .iter()
          .find(|c| c.lesson.id == lesson.id)
          .map(|c| c.status)
          .unwrap_or(CardStatus::Active);
        CardState { lesson, status }
      })
      .collect();

    self.persist(&next)?;
    self.cards = next;
    self.initial = items;
    self.clear_undo();
    Ok(())
  }

  // ==================== Views ====================

  pub fn cards(&self) -> &[CardState] {
    &self.cards
  }

  /// Active and later cards, in stored queue order.
  pub fn active_lessons(&self) -> Vec<&PracticeItem> {
    self.with_status(CardStatus::is_queued)
  }

  pub fn saved_lessons(&self) -> Vec<&PracticeItem> {
    self.with_status(|s| *s == CardStatus::Saved)
  }

  pub fn dismissed_count(&self) -> usize {
    self.cards.iter().filter(|c| c.status == CardStatus::Dismissed).count()
  }

  pub fn remaining_cards(&self) -> usize {
    self.cards.iter().filter(|c| c.status.is_queued()).count()
  }

  pub fn total_cards(&self) -> usize {
    self.cards.len()
  }

  /// Card at the front of the queue.
  pub fn current(&self) -> Option<&PracticeItem> {
    self.cards.iter().find(|c| c.status.is_queued()).map(|c| &c.lesson)
  }

  pub fn can_undo(&self) -> bool {
    self.live_undo().is_some()
  }

  /// The pending undo snapshot, if still inside its window.
  pub fn undo_state(&self) -> Option<UndoState> {
    self.live_undo()
  }

  pub fn persistence_key(&self) -> Option<&str> {
    self.persistence_key.as_deref()
  }

  // ==================== Internals ====================

  fn position_of(&self, item_id: &str) -> Option<usize> {
    self.cards.iter().position(|c| c.lesson.id == item_id)
  }

  fn with_status(&self, keep: impl Fn(&CardStatus) -> bool) -> Vec<&PracticeItem> {
    self.cards.iter().filter(|c| keep(&c.status)).map(|c| &c.lesson).collect()
  }

  fn persist(&self, cards: &[CardState]) -> Result<(), StorageError> {
    let Some(key) = &self.persistence_key else {
      return Ok(());
    };
    write_json(self.store.as_ref(), key, cards).inspect_err(|e| {
      tracing::warn!("Failed to persist card stack {}: {}", key, e);
    })
  }

  /// Undo snapshot still inside its window. The expiry task normally clears it;
  /// the deadline check covers a scheduler that has not fired yet.
  fn live_undo(&self) -> Option<UndoState> {
    let slot = lock_slot(&self.undo);
    let undo = slot.as_ref()?;
    let age = self.scheduler.now() - undo.captured_at;
    if age.num_milliseconds() >= self.undo_window.as_millis() as i64 {
      return None;
    }
    Some(undo.clone())
  }

  fn capture_undo(&mut self, action: CardAction, previous: Vec<CardState>) {
    let id = self.next_undo_id;
    self.next_undo_id += 1;

    *lock_slot(&self.undo) = Some(UndoState {
      id,
      action,
      previous,
      captured_at: self.scheduler.now(),
    });

    if let Some(task) = self.undo_task.take() {
      task.cancel();
    }
    let slot: Weak<Mutex<Option<UndoState>>> = Arc::downgrade(&self.undo);
    self.undo_task = Some(self.scheduler.schedule(
      self.undo_window,
      Box::new(move || expire_undo(&slot, id)),
    ));
  }

  fn clear_undo(&mut self) {
    *lock_slot(&self.undo) = None;
    if let Some(task) = self.undo_task.take() {
      task.cancel();
    }
  }
}

/// Clear the undo slot only if it still holds snapshot `id`.
fn expire_undo(slot: &Weak<Mutex<Option<UndoState>>>, id: u64) {
  let Some(slot) = slot.upgrade() else {
    return;
  };
  let mut undo = lock_slot(&slot);
  if undo.as_ref().is_some_and(|u| u.id == id) {
    *undo = None;
    tracing::debug!("Undo window expired for snapshot {}", id);
  }
}

/// Parse a persisted card list; anything malformed is discarded.
fn restore_snapshot(store: &dyn KeyValueStore, key: &str) -> Option<Vec<CardState>> {
  let raw = match store.get(key) {
    Ok(Some(raw)) => raw,
    Ok(None) => return None,
    Err(e) => {
      tracing::warn!("Could not read card stack {}: {}", key, e);
      return None;
    }
  };

  let cards: Vec<CardState> = match serde_json::from_str(&raw) {
    Ok(cards) => cards,
    Err(e) => {
      tracing::warn!("Discarding malformed card stack {}: {}", key, e);
      crate::profile_log!(crate::profiling::EventType::SnapshotDiscarded {
        key: key.to_string(),
        reason: e.to_string(),
      });
      return None;
    }
  };

  let mut ids = HashSet::new();
  if !cards.iter().all(|c| ids.insert(c.lesson.id.as_str())) {
    tracing::warn!("Discarding card stack {} with duplicate item ids", key);
    return None;
  }

  tracing::debug!("Restored {} cards from {}", cards.len(), key);
  Some(cards)
}
