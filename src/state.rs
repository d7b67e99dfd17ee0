//! Application state shared by all handlers.

use std::sync::Arc;

use crate::db::{DbPool, SqliteStore};
use crate::engine::{KeyValueStore, Scheduler, TokioScheduler};
use crate::session::DeckRegistry;

/// Application state passed to all handlers
#[derive(Clone)]
pub struct AppState {
    /// Learning database (lessons, vocabulary, saved words, settings)
    pub db: DbPool,

    /// In-memory engines per deck
    pub decks: Arc<DeckRegistry>,

    /// Clock used for practice timestamps
    pub scheduler: Arc<dyn Scheduler>,
}

impl AppState {
    /// Production wiring: snapshots in the learning database, wall-clock timers.
    pub fn new(db: DbPool, undo_window: std::time::Duration) -> Self {
        let store: Arc<dyn KeyValueStore> = Arc::new(SqliteStore::new(db.clone()));
        let scheduler: Arc<dyn Scheduler> = Arc::new(TokioScheduler);
        let decks = DeckRegistry::new(store, scheduler.clone()).with_undo_window(undo_window);
        Self::with_parts(db, decks, scheduler)
    }

    pub fn with_parts(db: DbPool, decks: DeckRegistry, scheduler: Arc<dyn Scheduler>) -> Self {
        Self {
            db,
            decks: Arc::new(decks),
            scheduler,
        }
    }
}
