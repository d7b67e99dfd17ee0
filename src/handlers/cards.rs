//! Card stack endpoints (browse, dismiss, save, later, undo).

use axum::extract::{Path, State};
use axum::Json;
use serde::Serialize;

use crate::content::cognates::{cognate_hints, display_cognate, CognateHint, CognatePrefs, StaticCognates};
use crate::domain::{Cognate, Deck, PracticeItem};
use crate::engine::{ActionOutcome, CardAction, CardStack, CardStatus};
use crate::session::lock_session;
use crate::state::AppState;

use super::{cognate_prefs, deck_session, load_items, parse_deck, ApiResult};

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CardView {
  pub item: PracticeItem,
  pub status: CardStatus,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub hebrew_cognate: Option<Cognate>,
  #[serde(skip_serializing_if = "Vec::is_empty")]
  pub cognate_hints: Vec<CognateHint>,
}

impl CardView {
  /// The raw cognate enrichment is moved into the gated `hebrewCognate` field.
  fn new(item: &PracticeItem, status: CardStatus, prefs: CognatePrefs) -> Self {
    let hebrew_cognate = display_cognate(item, &StaticCognates, prefs);
    let cognate_hints = cognate_hints(item, &StaticCognates, prefs);
    let mut item = item.clone();
    item.cognate = None;
    Self {
      item,
      status,
      hebrew_cognate,
      cognate_hints,
    }
  }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CardsView {
  pub deck: String,
  /// Queued cards (active and later) in presentation order
  pub cards: Vec<CardView>,
  pub saved: Vec<CardView>,
  pub dismissed_count: usize,
  pub remaining_cards: usize,
  pub total_cards: usize,
  pub can_undo: bool,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub undo_action: Option<CardAction>,
}

impl CardsView {
  pub fn build(deck: &Deck, stack: &CardStack, prefs: CognatePrefs) -> Self {
    let cards = stack
      .cards()
      .iter()
      .filter(|c| c.status.is_queued())
      .map(|c| CardView::new(&c.lesson, c.status, prefs))
      .collect();
    let saved = stack
      .saved_lessons()
      .into_iter()
      .map(|item| CardView::new(item, CardStatus::Saved, prefs))
      .collect();
    let undo_action = stack.undo_state().map(|u| u.action);

    Self {
      deck: deck.to_string(),
      cards,
      saved,
      dismissed_count: stack.dismissed_count(),
      remaining_cards: stack.remaining_cards(),
      total_cards: stack.total_cards(),
      can_undo: undo_action.is_some(),
      undo_action,
    }
  }
}

/// GET /api/cards/{deck}
pub async fn cards_view(
  State(state): State<AppState>,
  Path(deck): Path<String>,
) -> ApiResult<CardsView> {
  let deck = parse_deck(&deck)?;
  let prefs = cognate_prefs(&state)?;
  let session = deck_session(&state, &deck)?;
  let session = lock_session(&session);
  Ok(Json(CardsView::build(&deck, &session.cards, prefs)))
}

/// POST /api/cards/{deck}/action
pub async fn card_action(
  State(state): State<AppState>,
  Path(deck): Path<String>,
  Json(action): Json<CardAction>,
) -> ApiResult<CardsView> {
  let deck = parse_deck(&deck)?;
  let prefs = cognate_prefs(&state)?;
  let session = deck_session(&state, &deck)?;
  let mut session = lock_session(&session);

  match session.cards.handle_action(&action)? {
    ActionOutcome::Applied => {
      tracing::debug!("{} {} in deck {}", action.action_type.as_str(), action.item_id, deck)
    }
    ActionOutcome::Started => tracing::debug!("Started {} in deck {}", action.item_id, deck),
    ActionOutcome::Ignored => {
      tracing::debug!("{} has no effect on {}", action.action_type.as_str(), action.item_id)
    }
    ActionOutcome::UnknownItem => {
      tracing::debug!("Ignoring {} for unknown card {}", action.action_type.as_str(), action.item_id)
    }
  }
  Ok(Json(CardsView::build(&deck, &session.cards, prefs)))
}

/// POST /api/cards/{deck}/undo
pub async fn undo_card_action(
  State(state): State<AppState>,
  Path(deck): Path<String>,
) -> ApiResult<CardsView> {
  let deck = parse_deck(&deck)?;
  let prefs = cognate_prefs(&state)?;
  let session = deck_session(&state, &deck)?;
  let mut session = lock_session(&session);
  if !session.cards.undo_last_action()? {
    tracing::debug!("Nothing to undo in deck {}", deck);
  }
  Ok(Json(CardsView::build(&deck, &session.cards, prefs)))
}

/// POST /api/cards/{deck}/reset
pub async fn reset_cards(
  State(state): State<AppState>,
  Path(deck): Path<String>,
) -> ApiResult<CardsView> {
  let deck = parse_deck(&deck)?;
  let prefs = cognate_prefs(&state)?;
  let session = deck_session(&state, &deck)?;
  let mut session = lock_session(&session);
  session.cards.reset_cards()?;
  Ok(Json(CardsView::build(&deck, &session.cards, prefs)))
}

/// POST /api/cards/{deck}/refresh
///
/// Reloads the deck's items from the database, keeping the status of cards
/// that are still present.
pub async fn refresh_cards(
  State(state): State<AppState>,
  Path(deck): Path<String>,
) -> ApiResult<CardsView> {
  let deck = parse_deck(&deck)?;
  let prefs = cognate_prefs(&state)?;
  let session = deck_session(&state, &deck)?;
  let items = load_items(&state, &deck)?;
  let mut session = lock_session(&session);
  session.cards.reset_with_lessons(items)?;
  Ok(Json(CardsView::build(&deck, &session.cards, prefs)))
}
