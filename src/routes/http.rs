//! HTTP endpoint handlers. These are thin wrappers that forward to core logic.
//! Each handler is instrumented and logs parameters and basic result info.

use std::sync::Arc;
use axum::{
  extract::{Path, Query, State},
  http::StatusCode,
  response::{IntoResponse, Response},
  Json,
};
use tracing::{info, warn, instrument};

use crate::error::FlowError;
use crate::logic::*;
use crate::protocol::*;
use crate::state::AppState;
use crate::util::normalize_user_id;

const DEFAULT_RANKING_LIMIT: usize = 50;

/// Flow errors rendered as `ErrorOut` with a matching status code.
pub struct ApiError(pub FlowError);

impl From<FlowError> for ApiError {
  fn from(e: FlowError) -> Self { ApiError(e) }
}

impl ApiError {
  fn status(&self) -> StatusCode {
    match &self.0 {
      FlowError::UnknownMission(_) => StatusCode::NOT_FOUND,
      FlowError::InvalidUser => StatusCode::BAD_REQUEST,
      FlowError::Verify(_) | FlowError::Location(_) => StatusCode::UNPROCESSABLE_ENTITY,
      FlowError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
  }
}

impl IntoResponse for ApiError {
  fn into_response(self) -> Response {
    let status = self.status();
    if status.is_server_error() {
      warn!(target: "bonghwang_backend", error = %self.0, "Request failed");
    }
    (status, Json(ErrorOut::from(&self.0))).into_response()
  }
}

#[instrument(level = "info", skip(state))]
pub async fn http_health(State(state): State<Arc<AppState>>) -> impl IntoResponse {
  Json(HealthOut { ok: true, remote: state.store.has_remote() })
}

/// Both catalogs. With `?userId=` each mission carries its completion status.
#[instrument(level = "info", skip(state, q))]
pub async fn http_list_missions(
  State(state): State<Arc<AppState>>,
  Query(q): Query<MissionsQuery>,
) -> Result<Json<MissionsOut>, ApiError> {
  let record = match q.user_id.as_deref().and_then(normalize_user_id) {
    Some(user_id) => Some(state.store.load(&user_id).await.map_err(FlowError::from)?),
    None => None,
  };
  let main = state.catalog.main_missions().iter().map(|m| to_out(m, record.as_ref())).collect();
  let sub = state.catalog.sub_missions().iter().map(|m| to_out(m, record.as_ref())).collect();
  Ok(Json(MissionsOut { main, sub }))
}

#[instrument(level = "info", skip(state))]
pub async fn http_get_mission(
  State(state): State<Arc<AppState>>,
  Path(mission_id): Path<String>,
) -> Result<Json<MissionOut>, ApiError> {
  let m = state
    .mission(&mission_id)
    .ok_or_else(|| FlowError::UnknownMission(mission_id.clone()))?;
  info!(target: "mission", %mission_id, kind = %m.kind, "HTTP mission served");
  Ok(Json(to_out(m, None)))
}

#[instrument(level = "info", skip(state, body), fields(user_id = %body.user_id))]
pub async fn http_post_hint(
  State(state): State<Arc<AppState>>,
  Path(mission_id): Path<String>,
  Json(body): Json<HintIn>,
) -> Result<Json<HintText>, ApiError> {
  let hint = request_hint(&state, &body.user_id, &mission_id).await?;
  Ok(Json(hint))
}

#[instrument(level = "info", skip(state, body), fields(user_id = %body.user_id))]
pub async fn http_post_user(
  State(state): State<Arc<AppState>>,
  Json(body): Json<UserSetupIn>,
) -> Result<Json<SetupOutcome>, ApiError> {
  let out = setup_user(&state, &body.user_id).await?;
  Ok(Json(out))
}

#[instrument(level = "info", skip(state))]
pub async fn http_get_progress(
  State(state): State<Arc<AppState>>,
  Path(user_id): Path<String>,
) -> Result<Json<crate::progress::ProgressSummary>, ApiError> {
  let user_id = normalize_user_id(&user_id).ok_or(FlowError::InvalidUser)?;
  let summary = progress_summary(&state, &user_id).await.map_err(FlowError::from)?;
  info!(target: "progress", %user_id, score = summary.record.total_score, "HTTP progress served");
  Ok(Json(summary))
}

#[instrument(level = "info", skip(state, body), fields(user_id = %body.user_id))]
pub async fn http_post_attempt(
  State(state): State<Arc<AppState>>,
  Path(mission_id): Path<String>,
  Json(body): Json<AttemptBody>,
) -> Result<Json<AttemptOutcome>, ApiError> {
  let out = super::dispatch_attempt(&state, &body.user_id, &mission_id, body.input).await?;
  info!(target: "mission", %mission_id, success = out.attempt.success, awarded = out.awarded, "HTTP attempt evaluated");
  Ok(Json(out))
}

#[instrument(level = "info", skip(state, q))]
pub async fn http_get_ranking(
  State(state): State<Arc<AppState>>,
  Query(q): Query<RankingQuery>,
) -> Result<Json<RankingOut>, ApiError> {
  let limit = q.limit.unwrap_or(DEFAULT_RANKING_LIMIT);
  let entries = ranking(&state, limit).await.map_err(FlowError::from)?;
  Ok(Json(RankingOut { entries }))
}
