//! Learner preferences.

use axum::extract::State;
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::db::{self, try_lock};
use crate::state::AppState;

use super::ApiResult;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Settings {
  pub knows_hebrew: bool,
}

/// GET /api/settings
pub async fn get_settings(State(state): State<AppState>) -> ApiResult<Settings> {
  let conn = try_lock(&state.db)?;
  Ok(Json(Settings {
    knows_hebrew: db::get_knows_hebrew(&conn)?,
  }))
}

/// POST /api/settings
pub async fn update_settings(
  State(state): State<AppState>,
  Json(settings): Json<Settings>,
) -> ApiResult<Settings> {
  let conn = try_lock(&state.db)?;
  db::set_knows_hebrew(&conn, settings.knows_hebrew)?;
  tracing::info!("knows_hebrew set to {}", settings.knows_hebrew);
  crate::profile_log!(crate::profiling::EventType::SettingsUpdate {
    setting: "knows_hebrew".into(),
    value: settings.knows_hebrew.to_string(),
  });
  Ok(Json(settings))
}
