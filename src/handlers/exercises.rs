//! Exercise session endpoints.

use axum::extract::{Path, State};
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::config;
use crate::content::cognates::{cognate_hints, display_cognate, CognateHint, CognatePrefs, StaticCognates};
use crate::content::tokenizer::{tokenize, Token};
use crate::db::{self, try_lock, LogOnError};
use crate::domain::{AnswerType, Cognate, ContentType, Deck, Language, PracticeItem, PromptType};
use crate::engine::{ExerciseQueue, Feedback, Phase, Progress, QueueEntry};
use crate::session::lock_session;
use crate::state::AppState;
use crate::validation::AnswerResult;

use super::{cognate_prefs, deck_session, load_items, parse_deck, ApiError, ApiResult};

/// What the learner sees for the current entry.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PromptView {
  pub item_id: String,
  pub prompt: String,
  pub prompt_type: PromptType,
  pub answer_type: AnswerType,
  pub language: Language,
  pub content_type: ContentType,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub transliteration: Option<String>,
  /// Present when the prompt is target-language text
  #[serde(skip_serializing_if = "Option::is_none")]
  pub tokens: Option<Vec<Token>>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub hebrew_cognate: Option<Cognate>,
  #[serde(skip_serializing_if = "Vec::is_empty")]
  pub cognate_hints: Vec<CognateHint>,
}

impl PromptView {
  fn new(item: &PracticeItem, prefs: CognatePrefs) -> Self {
    let target_prompt = item.prompt_type == PromptType::TargetText;
    Self {
      item_id: item.id.clone(),
      prompt: item.prompt_text().to_string(),
      prompt_type: item.prompt_type,
      answer_type: item.answer_type,
      language: item.language,
      content_type: item.content_type,
      transliteration: item.transliteration.clone().filter(|_| target_prompt),
      tokens: target_prompt.then(|| tokenize(&item.target_text, item.language)),
      hebrew_cognate: display_cognate(item, &StaticCognates, prefs),
      cognate_hints: if target_prompt {
        cognate_hints(item, &StaticCognates, prefs)
      } else {
        Vec::new()
      },
    }
  }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExerciseView {
  pub deck: String,
  pub phase: Phase,
  pub is_hydrated: bool,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub current: Option<PromptView>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub feedback: Option<Feedback>,
  pub progress: Progress,
  pub queue: Vec<QueueEntry>,
}

impl ExerciseView {
  pub fn build(deck: &Deck, exercise: &ExerciseQueue, prefs: CognatePrefs) -> Self {
    let current = match exercise.phase() {
      Phase::Complete => None,
      _ => exercise.current_item().map(|item| PromptView::new(item, prefs)),
    };
    Self {
      deck: deck.to_string(),
      phase: exercise.phase(),
      is_hydrated: exercise.is_hydrated(),
      current,
      feedback: exercise.feedback(),
      progress: exercise.progress(),
      queue: exercise.queue().to_vec(),
    }
  }
}

#[derive(Debug, Deserialize)]
pub struct AnswerRequest {
  pub answer: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnswerResponse {
  /// `None` when the session was not waiting for an answer
  pub result: Option<AnswerResult>,
  /// Whether the result was written back to the item's source row
  pub recorded: bool,
  pub exercise: ExerciseView,
}

/// GET /api/exercises/{deck}
pub async fn exercise_view(
  State(state): State<AppState>,
  Path(deck): Path<String>,
) -> ApiResult<ExerciseView> {
  let deck = parse_deck(&deck)?;
  let prefs = cognate_prefs(&state)?;
  let session = deck_session(&state, &deck)?;
  let session = lock_session(&session);
  Ok(Json(ExerciseView::build(&deck, &session.exercise, prefs)))
}

/// POST /api/exercises/{deck}/answer
pub async fn submit_answer(
  State(state): State<AppState>,
  Path(deck): Path<String>,
  Json(req): Json<AnswerRequest>,
) -> ApiResult<AnswerResponse> {
  let deck = parse_deck(&deck)?;
  if req.answer.chars().count() > config::MAX_ANSWER_CHARS {
    return Err(ApiError::Invalid(format!(
      "Answer must be at most {} characters",
      config::MAX_ANSWER_CHARS
    )));
  }
  let prefs = cognate_prefs(&state)?;
  let session = deck_session(&state, &deck)?;

  let (result, origin, exercise) = {
    let mut session = lock_session(&session);
    let origin = session.exercise.current_item().map(|item| item.origin.clone());
    let result = session.exercise.submit_answer(&req.answer)?;
    (result, origin, ExerciseView::build(&deck, &session.exercise, prefs))
  };

  // The answer is already saved in the session snapshot; a failed write-back
  // only loses the review schedule update.
  let recorded = match (result, origin) {
    (Some(result), Some(origin)) => try_lock(&state.db)
      .log_warn("Could not record practice result")
      .and_then(|conn| {
        db::record_practice_result(&conn, &origin, result.is_correct(), state.scheduler.now())
          .log_warn("Could not record practice result")
      })
      .unwrap_or(false),
    _ => false,
  };

  Ok(Json(AnswerResponse {
    result,
    recorded,
    exercise,
  }))
}

/// POST /api/exercises/{deck}/skip
pub async fn skip_exercise(
  State(state): State<AppState>,
  Path(deck): Path<String>,
) -> ApiResult<ExerciseView> {
  let deck = parse_deck(&deck)?;
  let prefs = cognate_prefs(&state)?;
  let session = deck_session(&state, &deck)?;
  let mut session = lock_session(&session);
  if !session.exercise.skip()? {
    tracing::debug!("Skip ignored during {}", session.exercise.phase().as_str());
  }
  Ok(Json(ExerciseView::build(&deck, &session.exercise, prefs)))
}

/// POST /api/exercises/{deck}/continue
pub async fn continue_exercise(
  State(state): State<AppState>,
  Path(deck): Path<String>,
) -> ApiResult<ExerciseView> {
  let deck = parse_deck(&deck)?;
  let prefs = cognate_prefs(&state)?;
  let session = deck_session(&state, &deck)?;
  let mut session = lock_session(&session);
  if !session.exercise.continue_to_next()? {
    tracing::debug!("Continue ignored during {}", session.exercise.phase().as_str());
  }
  Ok(Json(ExerciseView::build(&deck, &session.exercise, prefs)))
}

/// POST /api/exercises/{deck}/restart
pub async fn restart_exercise(
  State(state): State<AppState>,
  Path(deck): Path<String>,
) -> ApiResult<ExerciseView> {
  let deck = parse_deck(&deck)?;
  let prefs = cognate_prefs(&state)?;
  let session = deck_session(&state, &deck)?;
  let items = load_items(&state, &deck)?;
  let mut session = lock_session(&session);
  session.exercise.restart(items)?;
  Ok(Json(ExerciseView::build(&deck, &session.exercise, prefs)))
}
