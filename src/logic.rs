//! Mission flow shared by both HTTP and WebSocket handlers.
//!
//! This includes:
//!   - Picking the verification strategy for a mission and running it
//!   - Turning a successful attempt into a progress update (idempotent)
//!   - User setup (remote registration + local-to-remote migration)
//!   - Progress summaries, hints and ranking for the presentation layer

use serde::Serialize;
use tracing::{debug, info, instrument};

use crate::config::Rules;
use crate::domain::{Attempt, Mission, ProgressRecord};
use crate::error::{FlowError, StoreError, VerifyError};
use crate::geo::{acquire_fix, LocationSource};
use crate::progress::{leaderboard, rank_of, summarize, ProgressSummary, RankEntry};
use crate::state::AppState;
use crate::store::MigrationOutcome;
use crate::util::normalize_user_id;
use crate::verify::{verify, AttemptInput};

/// Points a successful attempt is worth. Hints cost `rules.hint_penalty`;
/// with clamping on, the result never goes below zero.
pub fn awarded_points(mission: &Mission, used_hint: bool, rules: &Rules) -> i64 {
  let base = mission.points as i64;
  if !used_hint {
    return base;
  }
  let reduced = base - rules.hint_penalty as i64;
  if rules.clamp_hint_penalty { reduced.max(0) } else { reduced }
}

/// Apply a verified attempt to the user's progress.
///
/// A failed attempt changes nothing. A mission already in the completion set is
/// not credited again. Remote persistence is best effort; only a local storage
/// failure is returned as an error.
#[instrument(level = "info", skip(state, mission, attempt), fields(%user_id, mission_id = %mission.mission_id, success = attempt.success))]
pub async fn complete_mission(
  state: &AppState,
  user_id: &str,
  mission: &Mission,
  attempt: &Attempt,
) -> Result<ProgressRecord, StoreError> {
  if !attempt.success {
    debug!(target: "mission", %user_id, mission_id = %mission.mission_id, "Attempt failed; progress untouched");
    return state.store.load(user_id).await;
  }
  let current = state.store.load(user_id).await?;
  if current.is_completed(&mission.mission_id) {
    info!(target: "mission", %user_id, mission_id = %mission.mission_id, "Mission already completed; no credit");
    return Ok(current);
  }
  let awarded = awarded_points(mission, attempt.used_hint, &state.rules);
  let record = state.store.record_completion(user_id, &mission.mission_id, awarded).await?;
  info!(target: "mission", %user_id, mission_id = %mission.mission_id, awarded, total = record.total_score, "Mission completed");
  Ok(record)
}

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AttemptOutcome {
  pub attempt: Attempt,
  /// Points credited by this call (0 on failure or repeat).
  pub awarded: i64,
  pub already_completed: bool,
  pub record: ProgressRecord,
}

/// Verify `input` against the mission and, on success, record the completion.
#[instrument(level = "info", skip(state, input), fields(%user_id, %mission_id))]
pub async fn attempt_mission(
  state: &AppState,
  user_id: &str,
  mission_id: &str,
  input: &AttemptInput,
) -> Result<AttemptOutcome, FlowError> {
  let user_id = normalize_user_id(user_id).ok_or(FlowError::InvalidUser)?;
  let mission = state
    .mission(mission_id)
    .ok_or_else(|| FlowError::UnknownMission(mission_id.to_string()))?;
  let mut attempt = verify(mission, input, &state.rules)?;

  let before = state.store.load(&user_id).await?;
  let already_completed = before.is_completed(&mission.mission_id);
  // A hint served earlier costs points even if the client does not report it.
  if before.has_used_hint(&mission.mission_id) {
    attempt.used_hint = true;
  }
  let record = complete_mission(state, &user_id, mission, &attempt).await?;
  let awarded = if attempt.success && !already_completed {
    awarded_points(mission, attempt.used_hint, &state.rules)
  } else {
    0
  };
  Ok(AttemptOutcome { attempt, awarded, already_completed, record })
}

/// GPS variant: acquire a fix from `source` (bounded by the configured timeout) first.
#[instrument(level = "info", skip(state, source), fields(%user_id, %mission_id))]
pub async fn attempt_gps_mission(
  state: &AppState,
  user_id: &str,
  mission_id: &str,
  source: &dyn LocationSource,
) -> Result<AttemptOutcome, FlowError> {
  if state.mission(mission_id).is_none() {
    return Err(FlowError::UnknownMission(mission_id.to_string()));
  }
  let fix = acquire_fix(source, state.rules.location_timeout()).await?;
  attempt_mission(state, user_id, mission_id, &AttemptInput::Gps { fix }).await
}

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SetupOutcome {
  pub migration: MigrationOutcome,
  pub summary: ProgressSummary,
}

/// First-run registration under a chosen nickname.
///
/// Registers the user on both sides, pushes any local progress to the remote,
/// then returns the merged view. A missing or failing remote only means the
/// user continues local-only.
#[instrument(level = "info", skip(state), fields(%user_id))]
pub async fn setup_user(state: &AppState, user_id: &str) -> Result<SetupOutcome, FlowError> {
  let user_id = normalize_user_id(user_id).ok_or(FlowError::InvalidUser)?;
  state.store.ensure_user(&user_id).await?;
  let migration = state.store.migrate_local_to_remote(&user_id).await?;
  info!(target: "progress", %user_id, ?migration, "User setup finished");
  let summary = progress_summary(state, &user_id).await?;
  Ok(SetupOutcome { migration, summary })
}

/// Progress plus every derived view the client renders.
#[instrument(level = "info", skip(state), fields(%user_id))]
pub async fn progress_summary(state: &AppState, user_id: &str) -> Result<ProgressSummary, StoreError> {
  let record = state.store.load(user_id).await?;
  let mut everyone = state.local.list().await?;
  if !everyone.iter().any(|r| r.user_id == record.user_id) {
    everyone.push(record.clone());
  }
  let rank = rank_of(&record.user_id, &everyone);
  Ok(summarize(&state.catalog, record, &state.rules, rank))
}

#[instrument(level = "info", skip(state))]
pub async fn ranking(state: &AppState, limit: usize) -> Result<Vec<RankEntry>, StoreError> {
  let everyone = state.local.list().await?;
  Ok(leaderboard(&everyone).into_iter().take(limit).collect())
}

#[derive(Clone, Debug, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct HintText {
  pub text: String,
  /// Points the reward drops by if the hint is used.
  pub penalty: u32,
}

/// Hint for a quiz mission, recorded against the user so the next correct
/// answer is credited `points - penalty`.
#[instrument(level = "info", skip(state), fields(%user_id, %mission_id))]
pub async fn request_hint(state: &AppState, user_id: &str, mission_id: &str) -> Result<HintText, FlowError> {
  let user_id = normalize_user_id(user_id).ok_or(FlowError::InvalidUser)?;
  let mission = state
    .mission(mission_id)
    .ok_or_else(|| FlowError::UnknownMission(mission_id.to_string()))?;
  let quiz = mission
    .quiz
    .as_ref()
    .ok_or_else(|| VerifyError::MissingQuiz(mission.mission_id.clone()))?;
  state.store.record_hint(&user_id, &mission.mission_id).await?;
  info!(target: "mission", %user_id, %mission_id, "Hint served");
  let text = quiz
    .hint
    .clone()
    .unwrap_or_else(|| format!("보기 {}개 중 하나가 정답입니다. 이야기 속 단서를 다시 떠올려보세요.", quiz.options.len()));
  Ok(HintText { text, penalty: state.rules.hint_penalty })
}
