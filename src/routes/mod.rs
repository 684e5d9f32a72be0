//! Router assembly: HTTP endpoints, WebSocket upgrade, static files, CORS, and HTTP tracing.

use std::sync::Arc;

use axum::{
    routing::{get, post},
    Router,
};
use tower_http::{
    cors::{Any, CorsLayer},
    services::{ServeDir, ServeFile},
    trace::{DefaultMakeSpan, DefaultOnRequest, DefaultOnResponse, TraceLayer},
};
use tracing::Level;

use crate::error::FlowError;
use crate::geo::ReportedLocation;
use crate::logic::{attempt_gps_mission, attempt_mission, AttemptOutcome};
use crate::protocol::AttemptIn;
use crate::state::AppState;

pub mod http;
pub mod ws;

/// Build the application router with:
/// - WebSocket at `/ws`
/// - JSON API under `/api/v1/...`
/// - Static client from `./static` with index fallback (client-side routing)
/// - CORS open to any origin
/// - HTTP trace layer (per-request spans w/ method, path, status, latency)
pub fn build_router(state: Arc<AppState>) -> Router {
    let static_service = ServeDir::new("./static")
        .append_index_html_on_directories(true)
        .not_found_service(ServeFile::new("./static/index.html"));

    Router::new()
        // WebSocket
        .route("/ws", get(ws::ws_upgrade))
        // HTTP API
        .route("/api/v1/health", get(http::http_health))
        .route("/api/v1/missions", get(http::http_list_missions))
        .route("/api/v1/missions/:mission_id", get(http::http_get_mission))
        .route("/api/v1/missions/:mission_id/hint", post(http::http_post_hint))
        .route("/api/v1/missions/:mission_id/attempt", post(http::http_post_attempt))
        .route("/api/v1/users", post(http::http_post_user))
        .route("/api/v1/progress/:user_id", get(http::http_get_progress))
        .route("/api/v1/ranking", get(http::http_get_ranking))
        // State + CORS + HTTP tracing
        .with_state(state)
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_request(DefaultOnRequest::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        .fallback_service(static_service)
}

/// Shared by HTTP and WS: GPS readings go through the location seam, the rest
/// straight to verification.
pub(crate) async fn dispatch_attempt(
    state: &AppState,
    user_id: &str,
    mission_id: &str,
    input: AttemptIn,
) -> Result<AttemptOutcome, FlowError> {
    match input.into_location() {
        Ok(reading) => attempt_gps_mission(state, user_id, mission_id, &ReportedLocation(reading)).await,
        Err(input) => attempt_mission(state, user_id, mission_id, &input).await,
    }
}
