//! Authoritative-local, best-effort-remote composition.
//!
//! Local writes must succeed or the operation fails. Remote failures are logged
//! and swallowed: the service keeps working local-only until the remote returns.

use std::sync::Arc;

use serde::Serialize;
use tracing::{info, instrument, warn};

use super::ProgressStore;
use crate::domain::ProgressRecord;
use crate::error::StoreError;

#[derive(Clone)]
pub struct SyncedProgressStore {
    local: Arc<dyn ProgressStore>,
    remote: Option<Arc<dyn ProgressStore>>,
}

/// What `migrate_local_to_remote` ended up doing.
#[derive(Clone, Copy, Debug, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum MigrationOutcome {
    /// No remote backend configured.
    NoRemote,
    /// Local record empty; nothing to push.
    NothingToMigrate,
    /// Remote already holds everything local has.
    RemoteUpToDate,
    /// Remote now holds the union of both records.
    Migrated,
    /// Remote could not be reached; retry later.
    RemoteFailed,
}

impl SyncedProgressStore {
    pub fn new(local: Arc<dyn ProgressStore>, remote: Option<Arc<dyn ProgressStore>>) -> Self {
        Self { local, remote }
    }

    pub fn has_remote(&self) -> bool {
        self.remote.is_some()
    }

    async fn remote_load(&self, user_id: &str) -> Option<ProgressRecord> {
        let remote = self.remote.as_ref()?;
        match remote.load(user_id).await {
            Ok(r) => r,
            Err(e) => {
                warn!(target: "progress", %user_id, error = %e, "Remote load failed; using local copy");
                None
            }
        }
    }

    /// Merged view of local and remote. Never fails because of the remote;
    /// a user unknown to both comes back as an empty record.
    #[instrument(level = "info", skip(self))]
    pub async fn load(&self, user_id: &str) -> Result<ProgressRecord, StoreError> {
        let local = self.local.load(user_id).await?;
        let remote = self.remote_load(user_id).await;
        let record = match (local, remote) {
            (Some(l), Some(r)) if l.covers(&r) => l,
            // Merged against a fresh read under the local lock, so a completion
            // recorded since the read above is kept.
            (_, Some(r)) => {
                let merged = self.local.merge(&r).await?;
                info!(target: "progress", %user_id, "Local copy refreshed from remote");
                merged
            }
            (Some(l), None) => l,
            (None, None) => ProgressRecord::empty(user_id),
        };
        Ok(record)
    }

    /// Local first (must succeed), then remote (best effort).
    #[instrument(level = "info", skip(self))]
    pub async fn record_completion(
        &self,
        user_id: &str,
        mission_id: &str,
        points: i64,
    ) -> Result<ProgressRecord, StoreError> {
        let record = self.local.record_completion(user_id, mission_id, points).await?;
        if let Some(remote) = &self.remote {
            if let Err(e) = remote.record_completion(user_id, mission_id, points).await {
                warn!(target: "progress", %user_id, %mission_id, error = %e, "Remote completion failed; kept locally");
            }
        }
        Ok(record)
    }

    /// Hints are local first as well; the remote copy is best effort.
    #[instrument(level = "info", skip(self))]
    pub async fn record_hint(&self, user_id: &str, mission_id: &str) -> Result<ProgressRecord, StoreError> {
        let record = self.local.record_hint(user_id, mission_id).await?;
        if let Some(remote) = &self.remote {
            if let Err(e) = remote.record_hint(user_id, mission_id).await {
                warn!(target: "progress", %user_id, %mission_id, error = %e, "Remote hint record failed; kept locally");
            }
        }
        Ok(record)
    }

    /// Make sure both sides know the user. Remote problems are logged only.
    #[instrument(level = "info", skip(self))]
    pub async fn ensure_user(&self, user_id: &str) -> Result<ProgressRecord, StoreError> {
        let record = self.local.ensure_user(user_id).await?;
        if let Some(remote) = &self.remote {
            if let Err(e) = remote.ensure_user(user_id).await {
                warn!(target: "progress", %user_id, error = %e, "Remote user setup failed");
            }
        }
        Ok(record)
    }

    /// Push local progress to the remote once, without ever losing remote progress.
    ///
    /// Idempotent: a second run finds the remote up to date.
    #[instrument(level = "info", skip(self))]
    pub async fn migrate_local_to_remote(&self, user_id: &str) -> Result<MigrationOutcome, StoreError> {
        let Some(remote) = &self.remote else {
            return Ok(MigrationOutcome::NoRemote);
        };
        let local = match self.local.load(user_id).await? {
            Some(l) if !l.is_trivial() => l,
            _ => return Ok(MigrationOutcome::NothingToMigrate),
        };
        let existing = match remote.load(user_id).await {
            Ok(r) => r,
            Err(e) => {
                warn!(target: "progress", %user_id, error = %e, "Migration skipped: remote unavailable");
                return Ok(MigrationOutcome::RemoteFailed);
            }
        };
        let target = match existing {
            Some(r) if r.covers(&local) => return Ok(MigrationOutcome::RemoteUpToDate),
            Some(r) => local.merged_with(&r),
            None => local,
        };
        match remote.save(&target).await {
            Ok(()) => {
                info!(target: "progress", %user_id, missions = target.completed_mission_ids.len(), score = target.total_score, "Migration completed");
                Ok(MigrationOutcome::Migrated)
            }
            Err(e) => {
                warn!(target: "progress", %user_id, error = %e, "Migration write failed");
                Ok(MigrationOutcome::RemoteFailed)
            }
        }
    }
}
