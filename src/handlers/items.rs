//! Practice item listing and saving words for practice.

use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::Json;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::content::adapters;
use crate::db::{self, try_lock, Lesson, NewSavedWord};
use crate::domain::PracticeItem;
use crate::state::AppState;

use super::{load_items, parse_deck, ApiError, ApiResult};

#[derive(Debug, Deserialize)]
pub struct ItemsQuery {
  pub deck: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ItemsResponse {
  pub deck: String,
  pub items: Vec<PracticeItem>,
}

/// GET /api/items?deck=<deck>
pub async fn list_items(
  State(state): State<AppState>,
  Query(query): Query<ItemsQuery>,
) -> ApiResult<ItemsResponse> {
  let deck = parse_deck(query.deck.as_deref().unwrap_or("all"))?;
  let items = load_items(&state, &deck)?;
  Ok(Json(ItemsResponse {
    deck: deck.to_string(),
    items,
  }))
}

/// GET /api/lessons
pub async fn list_lessons(State(state): State<AppState>) -> ApiResult<Vec<Lesson>> {
  let conn = try_lock(&state.db)?;
  Ok(Json(db::get_lessons(&conn)?))
}

/// Body for saving a looked-up word. Enrichments are kept as JSON.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SaveWordRequest {
  pub word: String,
  pub translation: String,
  pub transliteration: Option<String>,
  pub letter_breakdown: Option<Value>,
  pub hebrew_cognate: Option<Value>,
  pub example_sentences: Option<Value>,
  pub memory_note: Option<String>,
  pub source_lookup_id: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SaveWordResponse {
  pub id: i64,
  pub item_id: String,
  pub created: bool,
}

fn json_text(value: &Option<Value>) -> Option<String> {
  value
    .as_ref()
    .filter(|v| !v.is_null())
    .map(Value::to_string)
}

fn non_blank(value: &Option<String>) -> Option<&str> {
  value.as_deref().map(str::trim).filter(|s| !s.is_empty())
}

/// POST /api/saved-words
pub async fn save_word(
  State(state): State<AppState>,
  Json(req): Json<SaveWordRequest>,
) -> Result<(StatusCode, Json<SaveWordResponse>), ApiError> {
  let word = req.word.trim();
  let translation = req.translation.trim();
  if word.is_empty() || translation.is_empty() {
    return Err(ApiError::Invalid("Word and translation are required".into()));
  }

  let letter_breakdown = json_text(&req.letter_breakdown);
  let hebrew_cognate = json_text(&req.hebrew_cognate);
  let example_sentences = json_text(&req.example_sentences);
  let new_word = NewSavedWord {
    word,
    translation,
    transliteration: non_blank(&req.transliteration),
    letter_breakdown: letter_breakdown.as_deref(),
    hebrew_cognate: hebrew_cognate.as_deref(),
    example_sentences: example_sentences.as_deref(),
    memory_note: non_blank(&req.memory_note),
    source_lookup_id: non_blank(&req.source_lookup_id),
  };

  let conn = try_lock(&state.db)?;
  let (id, created) = db::save_word(&conn, &new_word)?;
  if created {
    tracing::info!("Saved word {} ({})", word, id);
  }

  let status = if created { StatusCode::CREATED } else { StatusCode::OK };
  Ok((
    status,
    Json(SaveWordResponse {
      id,
      item_id: adapters::saved_word_item_id(id),
      created,
    }),
  ))
}
