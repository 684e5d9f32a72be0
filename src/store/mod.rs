//! Progress persistence.
//!
//! - `LocalProgressStore`: one JSON document per user on local disk. Authoritative.
//! - `RemoteProgressStore`: HTTP document store keyed by user id. Optional.
//! - `SyncedProgressStore`: writes through to local, then best-effort to remote.
//!
//! Both backends implement `ProgressStore`; the decorator composes them so call
//! sites never repeat fallback logic.

use async_trait::async_trait;

use crate::domain::ProgressRecord;
use crate::error::StoreError;

pub mod local;
pub mod remote;
pub mod synced;

pub use local::LocalProgressStore;
pub use remote::RemoteProgressStore;
pub use synced::{MigrationOutcome, SyncedProgressStore};

#[async_trait]
pub trait ProgressStore: Send + Sync {
    /// `Ok(None)` when the backend has never seen this user.
    async fn load(&self, user_id: &str) -> Result<Option<ProgressRecord>, StoreError>;

    /// Add `mission_id` to the completion set and `points` to the score.
    /// Set semantics: a mission already present changes nothing.
    async fn record_completion(
        &self,
        user_id: &str,
        mission_id: &str,
        points: i64,
    ) -> Result<ProgressRecord, StoreError>;

    /// Overwrite the stored record.
    async fn save(&self, record: &ProgressRecord) -> Result<(), StoreError>;

    /// Create an empty record if none exists yet; return what is stored.
    async fn ensure_user(&self, user_id: &str) -> Result<ProgressRecord, StoreError> {
        match self.load(user_id).await? {
            Some(r) => Ok(r),
            None => {
                let r = ProgressRecord::empty(user_id);
                self.save(&r).await?;
                Ok(r)
            }
        }
    }

    /// Remember that the hint for `mission_id` was shown to this user.
    async fn record_hint(&self, user_id: &str, mission_id: &str) -> Result<ProgressRecord, StoreError> {
        let mut r = self.load(user_id).await?.unwrap_or_else(|| ProgressRecord::empty(user_id));
        if r.apply_hint(mission_id) {
            self.save(&r).await?;
        }
        Ok(r)
    }

    /// Fold `incoming` into the stored record (see [`ProgressRecord::merged_with`])
    /// and return what is stored afterwards.
    async fn merge(&self, incoming: &ProgressRecord) -> Result<ProgressRecord, StoreError> {
        let merged = match self.load(&incoming.user_id).await? {
            Some(current) if current.covers(incoming) => return Ok(current),
            Some(current) => current.merged_with(incoming),
            None => incoming.clone(),
        };
        self.save(&merged).await?;
        Ok(merged)
    }
}
