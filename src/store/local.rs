//! Local, file-backed progress store. Plays the role browser storage plays for
//! the client: always present, always written first.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use tokio::sync::Mutex;
use tracing::{debug, instrument, warn};

use super::ProgressStore;
use crate::domain::ProgressRecord;
use crate::error::StoreError;

/// One `<encoded user id>.json` file per user under `dir`.
pub struct LocalProgressStore {
    dir: PathBuf,
    // Serializes read-modify-write cycles.
    write_lock: Mutex<()>,
}

impl LocalProgressStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into(), write_lock: Mutex::new(()) }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Nicknames may hold any character; file names are URL-safe base64 of the id.
    fn path_for(&self, user_id: &str) -> PathBuf {
        self.dir.join(format!("{}.json", URL_SAFE_NO_PAD.encode(user_id.as_bytes())))
    }

    async fn read(&self, user_id: &str) -> Result<Option<ProgressRecord>, StoreError> {
        match tokio::fs::read(self.path_for(user_id)).await {
            Ok(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn write(&self, record: &ProgressRecord) -> Result<(), StoreError> {
        tokio::fs::create_dir_all(&self.dir).await?;
        let path = self.path_for(&record.user_id);
        let tmp = path.with_extension("json.tmp");
        tokio::fs::write(&tmp, serde_json::to_vec_pretty(record)?).await?;
        tokio::fs::rename(&tmp, &path).await?;
        Ok(())
    }

    /// Read-modify-write under the lock. `change` reports whether it touched the
    /// record; a record that did not exist yet is always written.
    async fn update<F>(&self, user_id: &str, change: F) -> Result<ProgressRecord, StoreError>
    where
        F: FnOnce(&mut ProgressRecord) -> bool + Send,
    {
        let _guard = self.write_lock.lock().await;
        let existing = self.read(user_id).await?;
        let fresh = existing.is_none();
        let mut record = existing.unwrap_or_else(|| ProgressRecord::empty(user_id));
        if change(&mut record) || fresh {
            self.write(&record).await?;
        }
        Ok(record)
    }

    /// Every record on disk. Unreadable files are skipped with a warning.
    #[instrument(level = "debug", skip(self))]
    pub async fn list(&self) -> Result<Vec<ProgressRecord>, StoreError> {
        let mut out = Vec::new();
        let mut entries = match tokio::fs::read_dir(&self.dir).await {
            Ok(e) => e,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(out),
            Err(e) => return Err(e.into()),
        };
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            match tokio::fs::read(&path).await.map_err(StoreError::from).and_then(|b| {
                serde_json::from_slice::<ProgressRecord>(&b).map_err(StoreError::from)
            }) {
                Ok(r) => out.push(r),
                Err(e) => warn!(target: "progress", path = %path.display(), error = %e, "Skipping unreadable progress file"),
            }
        }
        Ok(out)
    }
}

#[async_trait]
impl ProgressStore for LocalProgressStore {
    async fn load(&self, user_id: &str) -> Result<Option<ProgressRecord>, StoreError> {
        self.read(user_id).await
    }

    #[instrument(level = "debug", skip(self))]
    async fn record_completion(
        &self,
        user_id: &str,
        mission_id: &str,
        points: i64,
    ) -> Result<ProgressRecord, StoreError> {
        let record = self.update(user_id, |r| r.apply_completion(mission_id, points)).await?;
        debug!(target: "progress", %user_id, %mission_id, points, total = record.total_score, "Local completion stored");
        Ok(record)
    }

    async fn ensure_user(&self, user_id: &str) -> Result<ProgressRecord, StoreError> {
        self.update(user_id, |_| false).await
    }

    async fn record_hint(&self, user_id: &str, mission_id: &str) -> Result<ProgressRecord, StoreError> {
        self.update(user_id, |r| r.apply_hint(mission_id)).await
    }

    async fn merge(&self, incoming: &ProgressRecord) -> Result<ProgressRecord, StoreError> {
        self.update(&incoming.user_id, |current| {
            if current.covers(incoming) {
                return false;
            }
            *current = current.merged_with(incoming);
            true
        })
        .await
    }

    async fn save(&self, record: &ProgressRecord) -> Result<(), StoreError> {
        let _guard = self.write_lock.lock().await;
        self.write(record).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn unknown_user_loads_as_none() {
        let dir = TempDir::new().unwrap();
        let store = LocalProgressStore::new(dir.path().join("progress"));
        assert!(store.load("nobody").await.unwrap().is_none());
        assert!(store.list().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn completions_persist_with_set_semantics() {
        let dir = TempDir::new().unwrap();
        let store = LocalProgressStore::new(dir.path());
        store.record_completion("민지", "main-1", 100).await.unwrap();
        let again = store.record_completion("민지", "main-1", 100).await.unwrap();
        assert_eq!(again.total_score, 100);

        let reopened = LocalProgressStore::new(dir.path());
        let r = reopened.load("민지").await.unwrap().unwrap();
        assert_eq!(r.user_id, "민지");
        assert_eq!(r.total_score, 100);
        assert!(r.is_completed("main-1"));
    }

    #[tokio::test]
    async fn concurrent_completions_for_different_missions_all_land() {
        let dir = TempDir::new().unwrap();
        let store = std::sync::Arc::new(LocalProgressStore::new(dir.path()));
        let mut handles = Vec::new();
        for i in 1..=10 {
            let s = store.clone();
            handles.push(tokio::spawn(async move {
                s.record_completion("u", &format!("treasure-{i}"), 30).await
            }));
        }
        for h in handles {
            h.await.unwrap().unwrap();
        }
        let r = store.load("u").await.unwrap().unwrap();
        assert_eq!(r.completed_mission_ids.len(), 10);
        assert_eq!(r.total_score, 300);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn setup_racing_a_completion_keeps_the_completion() {
        let dir = TempDir::new().unwrap();
        let store = std::sync::Arc::new(LocalProgressStore::new(dir.path()));
        let mut handles = Vec::new();
        for i in 0..100 {
            let user = format!("user-{i}");
            let (a, b) = (store.clone(), store.clone());
            let (ua, ub) = (user.clone(), user);
            handles.push(tokio::spawn(async move { a.ensure_user(&ua).await.map(|_| ()) }));
            handles.push(tokio::spawn(async move { b.record_completion(&ub, "main-1", 100).await.map(|_| ()) }));
        }
        for h in handles {
            h.await.unwrap().unwrap();
        }
        for i in 0..100 {
            let r = store.load(&format!("user-{i}")).await.unwrap().unwrap();
            assert!(r.is_completed("main-1"), "user-{i} lost its completion");
            assert_eq!(r.total_score, 100);
        }
    }

    #[tokio::test]
    async fn merge_and_hints_never_drop_completions() {
        let dir = TempDir::new().unwrap();
        let store = LocalProgressStore::new(dir.path());
        store.record_completion("u", "main-1", 100).await.unwrap();
        store.record_hint("u", "main-3").await.unwrap();

        let mut stale = ProgressRecord::empty("u");
        stale.apply_completion("main-2", 100);
        let merged = store.merge(&stale).await.unwrap();
        assert!(merged.is_completed("main-1") && merged.is_completed("main-2"));
        assert!(merged.has_used_hint("main-3"));
        assert_eq!(store.load("u").await.unwrap().unwrap(), merged);
    }

    #[tokio::test]
    async fn list_returns_every_user() {
        let dir = TempDir::new().unwrap();
        let store = LocalProgressStore::new(dir.path());
        store.ensure_user("a").await.unwrap();
        store.record_completion("b", "main-1", 100).await.unwrap();
        tokio::fs::write(dir.path().join("junk.json"), b"not json").await.unwrap();
        let mut ids: Vec<_> = store.list().await.unwrap().into_iter().map(|r| r.user_id).collect();
        ids.sort();
        assert_eq!(ids, ["a", "b"]);
    }
}
