//! Bonghwang · Memory-hunt mission backend
//!
//! - Axum HTTP + WebSocket API for missions, attempts and progress
//! - Local JSON progress files, optionally mirrored to a remote document store
//! - Static client fallback (./static/index.html)
//!
//! Important env variables:
//!   PORT                  : u16 (default 3000)
//!   GAME_CONFIG_PATH      : path to TOML config (rules + extra missions)
//!   PROGRESS_DATA_DIR     : local progress directory (default ./data/progress)
//!   PROGRESS_REMOTE_URL   : enables the remote document store if present
//!   PROGRESS_REMOTE_TOKEN : bearer token for the remote store
//!   LOG_LEVEL             : tracing filter, e.g. "debug" or full directives
//!   LOG_FORMAT            : "pretty" (default) or "json"

mod telemetry;
mod util;
mod error;
mod geo;
mod domain;
mod seeds;
mod catalog;
mod config;
mod verify;
mod store;
mod progress;
mod state;
mod logic;
mod protocol;
mod routes;

use std::{net::SocketAddr, sync::Arc};
use tokio::net::TcpListener;
use tracing::{info, instrument};

use crate::routes::build_router;
use crate::state::AppState;

#[instrument(level = "info", skip_all)]
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
  telemetry::init_tracing();

  // Catalog, rules and progress stores.
  let state = Arc::new(AppState::new()?);

  let app = build_router(state.clone());

  let addr: SocketAddr = std::env::var("PORT")
    .ok()
    .and_then(|p| p.parse::<u16>().ok())
    .map(|port| SocketAddr::from(([0, 0, 0, 0], port)))
    .unwrap_or_else(|| SocketAddr::from(([0, 0, 0, 0], 3000)));

  let listener = TcpListener::bind(addr).await?;
  info!(target: "bonghwang_backend", %addr, missions = state.catalog.len(), "HTTP server listening");
  axum::serve(listener, app).await?;
  Ok(())
}
