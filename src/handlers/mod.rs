//! JSON API over the practice engines.

pub mod cards;
pub mod exercises;
pub mod items;
pub mod settings;

use axum::{
  http::StatusCode,
  response::{IntoResponse, Response},
  routing::{get, post},
  Json, Router,
};
use tower_http::trace::TraceLayer;

use crate::content::cognates::CognatePrefs;
use crate::db::{self, try_lock, DbLockError};
use crate::domain::{Deck, PracticeItem};
use crate::engine::StorageError;
use crate::session::SharedSession;
use crate::state::AppState;

pub use cards::{card_action, cards_view, refresh_cards, reset_cards, undo_card_action};
pub use exercises::{
  continue_exercise, exercise_view, restart_exercise, skip_exercise, submit_answer,
};
pub use items::{list_items, list_lessons, save_word};
pub use settings::{get_settings, update_settings};

/// Errors surfaced to API clients as `{"error": "<message>"}`.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
  #[error("Unknown deck '{0}'. Use all, saved, lesson:<id> or language:<name>")]
  BadDeck(String),
  #[error("Lesson {0} does not exist")]
  UnknownLesson(i64),
  #[error("{0}")]
  Invalid(String),
  #[error("Database unavailable")]
  DbUnavailable,
  #[error("Database error")]
  Database(#[from] rusqlite::Error),
  #[error("Could not save progress: {0}")]
  Storage(#[from] StorageError),
}

impl From<DbLockError> for ApiError {
  fn from(_: DbLockError) -> Self {
    Self::DbUnavailable
  }
}

impl ApiError {
  pub fn status(&self) -> StatusCode {
    match self {
      Self::BadDeck(_) | Self::Invalid(_) => StatusCode::BAD_REQUEST,
      Self::UnknownLesson(_) => StatusCode::NOT_FOUND,
      Self::DbUnavailable | Self::Storage(_) => StatusCode::SERVICE_UNAVAILABLE,
      Self::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
  }
}

impl IntoResponse for ApiError {
  fn into_response(self) -> Response {
    let status = self.status();
    match &self {
      Self::Database(e) => tracing::error!("Database error: {}", e),
      e if status.is_server_error() => tracing::warn!("{}", e),
      _ => {}
    }
    (status, Json(serde_json::json!({ "error": self.to_string() }))).into_response()
  }
}

pub type ApiResult<T> = Result<Json<T>, ApiError>;

pub fn router(state: AppState) -> Router {
  Router::new()
    .route("/api/items", get(list_items))
    .route("/api/lessons", get(list_lessons))
    .route("/api/saved-words", post(save_word))
    .route("/api/cards/{deck}", get(cards_view))
    .route("/api/cards/{deck}/action", post(card_action))
    .route("/api/cards/{deck}/undo", post(undo_card_action))
    .route("/api/cards/{deck}/reset", post(reset_cards))
    .route("/api/cards/{deck}/refresh", post(refresh_cards))
    .route("/api/exercises/{deck}", get(exercise_view))
    .route("/api/exercises/{deck}/answer", post(submit_answer))
    .route("/api/exercises/{deck}/skip", post(skip_exercise))
    .route("/api/exercises/{deck}/continue", post(continue_exercise))
    .route("/api/exercises/{deck}/restart", post(restart_exercise))
    .route("/api/settings", get(get_settings).post(update_settings))
    .layer(TraceLayer::new_for_http())
    .with_state(state)
}

// ==================== Shared helpers ====================

pub(crate) fn parse_deck(raw: &str) -> Result<Deck, ApiError> {
  Deck::parse(raw).ok_or_else(|| ApiError::BadDeck(raw.to_string()))
}

/// Current items for `deck` straight from the database.
pub(crate) fn load_items(state: &AppState, deck: &Deck) -> Result<Vec<PracticeItem>, ApiError> {
  let conn = try_lock(&state.db)?;
  if let Deck::Lesson(id) = deck {
    if !db::lesson_exists(&conn, *id)? {
      return Err(ApiError::UnknownLesson(*id));
    }
  }
  Ok(db::load_practice_items(&conn, deck)?)
}

/// Engines for `deck`, loading its items on first use. The database lock is
/// released before the engines read their snapshots.
pub(crate) fn deck_session(state: &AppState, deck: &Deck) -> Result<SharedSession, ApiError> {
  state.decks.get_or_load(deck, || load_items(state, deck))
}

pub(crate) fn cognate_prefs(state: &AppState) -> Result<CognatePrefs, ApiError> {
  let conn = try_lock(&state.db)?;
  Ok(CognatePrefs {
    knows_hebrew: db::get_knows_hebrew(&conn)?,
  })
}
