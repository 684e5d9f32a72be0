//! WebSocket upgrade + message loop. Each client message is parsed as JSON and
//! forwarded to core logic. We reply with a single JSON message per request.

use std::sync::Arc;
use axum::{
  extract::{
    ws::{Message, WebSocket},
    State, WebSocketUpgrade,
  },
  response::IntoResponse,
};
use tracing::{info, error, instrument, debug};
use uuid::Uuid;

use crate::error::FlowError;
use crate::protocol::{ClientWsMessage, ErrorOut, ServerWsMessage};
use crate::logic::*;
use crate::state::AppState;

#[instrument(level = "info", skip(state))]
pub async fn ws_upgrade(ws: WebSocketUpgrade, State(state): State<Arc<AppState>>) -> impl IntoResponse {
  info!(target: "bonghwang_backend", "WebSocket upgrade requested");
  ws.on_upgrade(move |socket| handle_ws(socket, state, Uuid::new_v4()))
}

#[instrument(level = "info", skip(socket, state))]
async fn handle_ws(mut socket: WebSocket, state: Arc<AppState>, conn_id: Uuid) {
  info!(target: "bonghwang_backend", "WebSocket connected");
  while let Some(Ok(msg)) = socket.recv().await {
    match msg {
      Message::Text(txt) => {
        let reply_msg = match serde_json::from_str::<ClientWsMessage>(&txt) {
          Ok(incoming) => {
            debug!(target: "bonghwang_backend", "WS received: {:?}", &incoming);
            handle_client_ws(incoming, &state).await
          }
          Err(e) => error_msg(ErrorOut {
            error: "bad_request",
            message: format!("Invalid JSON: {}", e),
            retryable: false,
            redirect: None,
          }),
        };

        let out = serde_json::to_string(&reply_msg).unwrap_or_else(|e| {
          serde_json::json!({ "type": "error", "error": "internal", "message": format!("Serialization error: {}", e) }).to_string()
        });

        if let Err(e) = socket.send(Message::Text(out)).await {
          error!(target: "bonghwang_backend", error = %e, "WS send error");
          break;
        }
      }
      Message::Ping(payload) => { let _ = socket.send(Message::Pong(payload)).await; }
      Message::Close(_) => break,
      _ => {}
    }
  }
  info!(target: "bonghwang_backend", "WebSocket disconnected");
}

fn error_msg(error: ErrorOut) -> ServerWsMessage {
  ServerWsMessage::Error { error }
}

fn flow_error(e: &FlowError) -> ServerWsMessage {
  error_msg(ErrorOut::from(e))
}

#[instrument(level = "info", skip(state))]
async fn handle_client_ws(msg: ClientWsMessage, state: &AppState) -> ServerWsMessage {
  match msg {
    ClientWsMessage::Ping => ServerWsMessage::Pong,

    ClientWsMessage::SetupUser { user_id } => match setup_user(state, &user_id).await {
      Ok(setup) => {
        info!(target: "progress", %user_id, migration = ?setup.migration, "WS setup_user finished");
        ServerWsMessage::Setup { setup }
      }
      Err(e) => flow_error(&e),
    },

    ClientWsMessage::LoadProgress { user_id } => {
      let Some(user_id) = crate::util::normalize_user_id(&user_id) else {
        return flow_error(&FlowError::InvalidUser);
      };
      match progress_summary(state, &user_id).await {
        Ok(summary) => ServerWsMessage::Progress { summary },
        Err(e) => flow_error(&FlowError::from(e)),
      }
    }

    ClientWsMessage::SubmitAttempt { user_id, mission_id, input } => {
      match super::dispatch_attempt(state, &user_id, &mission_id, input).await {
        Ok(outcome) => {
          info!(target: "mission", %mission_id, success = outcome.attempt.success, awarded = outcome.awarded, "WS submit_attempt evaluated");
          ServerWsMessage::AttemptResult { outcome }
        }
        Err(e) => flow_error(&e),
      }
    }

    ClientWsMessage::Hint { user_id, mission_id } => match request_hint(state, &user_id, &mission_id).await {
      Ok(hint) => ServerWsMessage::Hint { mission_id, hint },
      Err(e) => flow_error(&e),
    },
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::catalog::Catalog;
  use crate::config::Rules;
  use crate::store::LocalProgressStore;
  use tempfile::TempDir;

  fn state(dir: &TempDir) -> AppState {
    AppState::with_parts(
      Catalog::builtin().unwrap(),
      Rules::default(),
      Arc::new(LocalProgressStore::new(dir.path().to_path_buf())),
      None,
    )
  }

  async fn roundtrip(st: &AppState, json: &str) -> serde_json::Value {
    let msg: ClientWsMessage = serde_json::from_str(json).unwrap();
    serde_json::to_value(handle_client_ws(msg, st).await).unwrap()
  }

  #[tokio::test]
  async fn ping_pongs() {
    let dir = TempDir::new().unwrap();
    let v = roundtrip(&state(&dir), r#"{"type":"ping"}"#).await;
    assert_eq!(v["type"], "pong");
  }

  #[tokio::test]
  async fn gps_attempt_far_away_is_reported_not_credited() {
    let dir = TempDir::new().unwrap();
    let st = state(&dir);
    let v = roundtrip(
      &st,
      r#"{"type":"submit_attempt","userId":"u","missionId":"main-5","input":{"kind":"gps","lat":35.0,"lng":128.0}}"#,
    )
    .await;
    assert_eq!(v["type"], "attempt_result");
    assert_eq!(v["outcome"]["attempt"]["success"], false);
    assert_eq!(v["outcome"]["record"]["totalScore"], 0);
  }

  #[tokio::test]
  async fn denied_location_is_a_retryable_error() {
    let dir = TempDir::new().unwrap();
    let v = roundtrip(
      &state(&dir),
      r#"{"type":"submit_attempt","userId":"u","missionId":"main-5","input":{"kind":"gps_error","code":"PERMISSION_DENIED"}}"#,
    )
    .await;
    assert_eq!(v["type"], "error");
    assert_eq!(v["error"], "location_permission_denied");
    assert_eq!(v["retryable"], true);
  }

  #[tokio::test]
  async fn unknown_mission_redirects() {
    let dir = TempDir::new().unwrap();
    let v = roundtrip(&state(&dir), r#"{"type":"hint","userId":"u","missionId":"main-42"}"#).await;
    assert_eq!(v["type"], "error");
    assert_eq!(v["redirect"], "/exploration");
  }

  #[tokio::test]
  async fn hint_over_ws_is_charged_on_the_answer() {
    let dir = TempDir::new().unwrap();
    let st = state(&dir);
    let v = roundtrip(&st, r#"{"type":"hint","userId":"u","missionId":"main-3"}"#).await;
    assert_eq!(v["type"], "hint");
    assert_eq!(v["hint"]["penalty"], 20);
    let v = roundtrip(
      &st,
      r#"{"type":"submit_attempt","userId":"u","missionId":"main-3","input":{"kind":"quiz","selected":"조용필"}}"#,
    )
    .await;
    assert_eq!(v["outcome"]["awarded"], 80);
  }

  #[tokio::test]
  async fn progress_follows_completions() {
    let dir = TempDir::new().unwrap();
    let st = state(&dir);
    roundtrip(
      &st,
      r#"{"type":"submit_attempt","userId":"u","missionId":"main-3","input":{"kind":"quiz","selected":"조용필"}}"#,
    )
    .await;
    let v = roundtrip(&st, r#"{"type":"load_progress","userId":"u"}"#).await;
    assert_eq!(v["type"], "progress");
    assert_eq!(v["summary"]["record"]["totalScore"], 100);
  }
}
