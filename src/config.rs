//! Loading game configuration (rule policies + optional extra missions) from TOML.
//!
//! Every field has a default, so an empty file (or no file at all) yields the
//! shipped behavior. See `GameConfig` and `Rules` for the expected schema.

use std::time::Duration;

use serde::Deserialize;
use tracing::{error, info};

use crate::domain::Mission;

#[derive(Clone, Debug, Deserialize, Default)]
pub struct GameConfig {
  #[serde(default)]
  pub rules: Rules,
  /// Added to the built-in catalog; an entry with an existing id replaces it.
  #[serde(default)]
  pub missions: Vec<Mission>,
}

/// How QR scans are judged.
#[derive(Clone, Copy, Debug, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum QrPolicy {
  /// Any non-empty scan completes the mission.
  #[default]
  Permissive,
  /// The scan must contain the mission's token (or `Rules::qr_token`).
  Token,
}

/// How completed bingo lines are counted.
#[derive(Clone, Copy, Debug, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum BingoPolicy {
  /// One line per five completed treasure cells, wherever they are.
  #[default]
  Simplified,
  /// Full rows, columns and the two diagonals of the 5x5 board.
  Geometric,
}

/// Tunable verification and unlock rules.
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct Rules {
  pub gps_radius_m: f64,
  pub hint_penalty: u32,
  /// Keep hint-reduced rewards at zero or above.
  pub clamp_hint_penalty: bool,
  pub qr_policy: QrPolicy,
  pub qr_token: String,
  pub bingo_policy: BingoPolicy,
  /// Lock the treasure tab until the whole main line is done.
  pub gate_treasure_tab: bool,
  pub location_timeout_secs: u64,
}

impl Default for Rules {
  fn default() -> Self {
    Self {
      gps_radius_m: 50.0,
      hint_penalty: 20,
      clamp_hint_penalty: true,
      qr_policy: QrPolicy::Permissive,
      qr_token: "bonghwang-memories".into(),
      bingo_policy: BingoPolicy::Simplified,
      gate_treasure_tab: false,
      location_timeout_secs: 15,
    }
  }
}

impl Rules {
  pub fn location_timeout(&self) -> Duration {
    Duration::from_secs(self.location_timeout_secs)
  }
}

pub fn parse_game_config(s: &str) -> Result<GameConfig, toml::de::Error> {
  toml::from_str::<GameConfig>(s)
}

/// Attempt to load `GameConfig` from GAME_CONFIG_PATH. On any parsing/IO error, returns None.
pub fn load_game_config_from_env() -> Option<GameConfig> {
  let path = std::env::var("GAME_CONFIG_PATH").ok()?;
  match std::fs::read_to_string(&path) {
    Ok(s) => match parse_game_config(&s) {
      Ok(cfg) => {
        info!(target: "bonghwang_backend", %path, extra_missions = cfg.missions.len(), "Loaded game config (TOML)");
        Some(cfg)
      }
      Err(e) => {
        error!(target: "bonghwang_backend", %path, error = %e, "Failed to parse TOML config");
        None
      }
    },
    Err(e) => {
      error!(target: "bonghwang_backend", %path, error = %e, "Failed to read TOML config file");
      None
    }
  }
}
