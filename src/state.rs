//! Application state: mission catalog, rule policies and the progress stores.
//!
//! This module owns:
//!   - the catalog (built-in missions + TOML extensions)
//!   - the rules struct (from TOML or defaults)
//!   - the synced progress store (local files + optional remote document store)

use std::{collections::HashMap, path::PathBuf, sync::Arc};

use tracing::{error, info, instrument};

use crate::catalog::Catalog;
use crate::config::{load_game_config_from_env, Rules};
use crate::domain::{Mission, MissionKind};
use crate::error::CatalogError;
use crate::store::{LocalProgressStore, ProgressStore, RemoteProgressStore, SyncedProgressStore};

const DEFAULT_DATA_DIR: &str = "./data/progress";

#[derive(Clone)]
pub struct AppState {
    pub catalog: Arc<Catalog>,
    pub rules: Rules,
    pub store: SyncedProgressStore,
    /// Kept separately for listing every known user (ranking).
    pub local: Arc<LocalProgressStore>,
}

impl AppState {
    /// Build state from env: load config, build the catalog, open the stores.
    /// Fails only if the built-in catalog itself is invalid.
    #[instrument(level = "info", skip_all)]
    pub fn new() -> Result<Self, CatalogError> {
        let cfg = load_game_config_from_env().unwrap_or_default();

        let catalog = match build_catalog(cfg.missions) {
            Ok(c) => c,
            Err(e) => {
                error!(target: "mission", error = %e, "Configured missions rejected; using built-in catalog");
                Catalog::builtin()?
            }
        };

        // Inventory summary by kind.
        let mut count_by_kind: HashMap<MissionKind, (usize, usize)> = HashMap::new();
        for m in catalog.main_missions().iter().chain(catalog.sub_missions()) {
            let entry = count_by_kind.entry(m.kind).or_insert((0, 0));
            if m.is_main_mission { entry.0 += 1 } else { entry.1 += 1 }
        }
        for (kind, (main, sub)) in count_by_kind {
            info!(target: "mission", %kind, main, sub, "Startup mission inventory");
        }

        let data_dir = std::env::var("PROGRESS_DATA_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from(DEFAULT_DATA_DIR));
        let local = Arc::new(LocalProgressStore::new(data_dir));
        info!(target: "progress", dir = %local.dir().display(), "Local progress store ready");

        let remote = RemoteProgressStore::from_env();
        if let Some(r) = &remote {
            info!(target: "progress", base_url = %r.base_url, "Remote progress store enabled.");
        } else {
            info!(target: "progress", "Remote progress store disabled (no PROGRESS_REMOTE_URL). Local-only persistence.");
        }
        let remote: Option<Arc<dyn ProgressStore>> = remote.map(|r| Arc::new(r) as Arc<dyn ProgressStore>);

        Ok(Self::with_parts(catalog, cfg.rules, local, remote))
    }

    pub fn with_parts(
        catalog: Catalog,
        rules: Rules,
        local: Arc<LocalProgressStore>,
        remote: Option<Arc<dyn ProgressStore>>,
    ) -> Self {
        let store = SyncedProgressStore::new(local.clone(), remote);
        Self { catalog: Arc::new(catalog), rules, store, local }
    }

    /// Read-only access to a mission by id.
    pub fn mission(&self, mission_id: &str) -> Option<&Mission> {
        self.catalog.find(mission_id)
    }
}

fn build_catalog(extra: Vec<Mission>) -> Result<Catalog, CatalogError> {
    let base = Catalog::builtin()?;
    if extra.is_empty() {
        return Ok(base);
    }
    base.with_overrides(extra)
}
