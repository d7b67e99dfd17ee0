//! In-memory practice sessions, one per deck.
//!
//! Each deck keeps its card stack and exercise queue alive between requests so
//! the undo timer and hydration state survive. Decks auto-expire after a
//! configurable duration of inactivity; their snapshots stay in storage and
//! are restored on next access.

use crate::config;
use crate::domain::{Deck, PracticeItem};
use crate::engine::{CardStack, ExerciseQueue, KeyValueStore, Scheduler};
use chrono::{DateTime, Duration, Utc};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// Both engines for one deck.
pub struct DeckSession {
  pub cards: CardStack,
  pub exercise: ExerciseQueue,
}

pub type SharedSession = Arc<Mutex<DeckSession>>;

/// Session entry with last access time for expiration
struct SessionEntry {
  session: SharedSession,
  last_access: DateTime<Utc>,
}

pub struct DeckRegistry {
  sessions: Mutex<HashMap<Deck, SessionEntry>>,
  store: Arc<dyn KeyValueStore>,
  scheduler: Arc<dyn Scheduler>,
  undo_window: std::time::Duration,
}

impl DeckRegistry {
  pub fn new(store: Arc<dyn KeyValueStore>, scheduler: Arc<dyn Scheduler>) -> Self {
    Self {
      sessions: Mutex::new(HashMap::new()),
      store,
      scheduler,
      undo_window: std::time::Duration::from_millis(config::UNDO_WINDOW_MS),
    }
  }

  pub fn with_undo_window(mut self, window: std::time::Duration) -> Self {
    self.undo_window = window;
    self
  }

  fn lock(&self) -> MutexGuard<'_, HashMap<Deck, SessionEntry>> {
    self.sessions.lock().unwrap_or_else(PoisonError::into_inner)
  }

  /// Get the session for `deck`, building it from `load` on first access.
  pub fn get_or_load<E>(
    &self,
    deck: &Deck,
    load: impl FnOnce() -> Result<Vec<PracticeItem>, E>,
  ) -> Result<SharedSession, E> {
    let now = self.scheduler.now();
    let mut sessions = self.lock();

    // Clean up expired sessions occasionally (~10% chance)
    if rand::random::<u8>() < config::DECK_CLEANUP_THRESHOLD {
      cleanup_expired(&mut sessions, now);
    }

    if let Some(entry) = sessions.get_mut(deck) {
      entry.last_access = now;
      return Ok(entry.session.clone());
    }

    let items = load()?;
    tracing::debug!("Loaded deck {} with {} items", deck, items.len());
    crate::profile_log!(crate::profiling::EventType::DeckLoaded {
      deck: deck.to_string(),
      items: items.len(),
    });

    let session = Arc::new(Mutex::new(self.build(deck, items)));
    sessions.insert(
      deck.clone(),
      SessionEntry {
        session: session.clone(),
        last_access: now,
      },
    );
    Ok(session)
  }

  fn build(&self, deck: &Deck, items: Vec<PracticeItem>) -> DeckSession {
    let cards = CardStack::initialize(
      items.clone(),
      Some(deck.cards_key()),
      self.store.clone(),
      self.scheduler.clone(),
    )
    .with_undo_window(self.undo_window);
    let exercise = ExerciseQueue::initialize(items, Some(deck.exercise_key()), self.store.clone());
    DeckSession { cards, exercise }
  }

  /// Drop every deck idle for longer than the expiry window.
  pub fn expire_idle(&self) {
    let now = self.scheduler.now();
    cleanup_expired(&mut self.lock(), now);
  }

  pub fn len(&self) -> usize {
    self.lock().len()
  }

  pub fn is_empty(&self) -> bool {
    self.len() == 0
  }
}

/// Clean up expired sessions
fn cleanup_expired(sessions: &mut HashMap<Deck, SessionEntry>, now: DateTime<Utc>) {
  let expiry = now - Duration::hours(config::DECK_EXPIRY_HOURS);
  sessions.retain(|_, entry| entry.last_access > expiry);
}

/// Lock a deck session, recovering the data if a previous holder panicked.
pub fn lock_session(session: &SharedSession) -> MutexGuard<'_, DeckSession> {
  session.lock().unwrap_or_else(PoisonError::into_inner)
}
