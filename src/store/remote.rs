//! Minimal client for the remote document store.
//!
//! Wire contract (JSON, one document per user):
//!   GET  {base}/users/{userId}              -> 200 document | 404
//!   PUT  {base}/users/{userId}              <- document (overwrite)
//!   POST {base}/users/{userId}/completions  <- {"missionId", "points"}; server applies
//!                                             array-union on `completedMissions` and
//!                                             increments `totalScore`, returns the document.
//!
//! NOTE: The token is never logged.

use std::collections::BTreeSet;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE, USER_AGENT};
use reqwest::{StatusCode, Url};
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};

use super::ProgressStore;
use crate::domain::ProgressRecord;
use crate::error::StoreError;

#[derive(Clone)]
pub struct RemoteProgressStore {
    pub client: reqwest::Client,
    pub base_url: Url,
    token: Option<String>,
}

/// Document layout on the remote side.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UserDoc {
    user_id: String,
    #[serde(default)]
    nickname: Option<String>,
    #[serde(default)]
    completed_missions: Vec<String>,
    #[serde(default)]
    total_score: u64,
    #[serde(default)]
    hinted_missions: Vec<String>,
    #[serde(default)]
    last_updated: Option<DateTime<Utc>>,
}

impl From<UserDoc> for ProgressRecord {
    fn from(d: UserDoc) -> Self {
        ProgressRecord {
            user_id: d.user_id,
            completed_mission_ids: d.completed_missions.into_iter().collect::<BTreeSet<_>>(),
            total_score: d.total_score,
            hinted_mission_ids: d.hinted_missions.into_iter().collect(),
            updated_at: d.last_updated,
        }
    }
}

impl From<&ProgressRecord> for UserDoc {
    fn from(r: &ProgressRecord) -> Self {
        UserDoc {
            user_id: r.user_id.clone(),
            nickname: Some(r.user_id.clone()),
            completed_missions: r.completed_mission_ids.iter().cloned().collect(),
            total_score: r.total_score,
            hinted_missions: r.hinted_mission_ids.iter().cloned().collect(),
            last_updated: Some(r.updated_at.unwrap_or_else(Utc::now)),
        }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct CompletionReq<'a> {
    mission_id: &'a str,
    points: i64,
}

impl RemoteProgressStore {
    pub fn new(base_url: &str, token: Option<String>, timeout: Duration) -> Result<Self, StoreError> {
        let base_url = Url::parse(base_url).map_err(|e| StoreError::Remote(format!("bad base url: {e}")))?;
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| StoreError::Remote(e.to_string()))?;
        Ok(Self { client, base_url, token })
    }

    /// Construct the client if PROGRESS_REMOTE_URL is set; otherwise return None.
    pub fn from_env() -> Option<Self> {
        let url = std::env::var("PROGRESS_REMOTE_URL").ok()?;
        let token = std::env::var("PROGRESS_REMOTE_TOKEN").ok();
        match Self::new(&url, token, Duration::from_secs(10)) {
            Ok(s) => Some(s),
            Err(e) => {
                tracing::error!(target: "progress", error = %e, "Remote progress store misconfigured; running local-only");
                None
            }
        }
    }

    fn user_url(&self, user_id: &str, tail: Option<&str>) -> Result<Url, StoreError> {
        let mut url = self.base_url.clone();
        {
            let mut segs = url
                .path_segments_mut()
                .map_err(|_| StoreError::Remote("base url cannot hold a path".into()))?;
            segs.pop_if_empty().push("users").push(user_id);
            if let Some(t) = tail {
                segs.push(t);
            }
        }
        Ok(url)
    }

    fn request(&self, method: reqwest::Method, url: Url) -> reqwest::RequestBuilder {
        let req = self
            .client
            .request(method, url)
            .header(USER_AGENT, "bonghwang-backend/0.1")
            .header(CONTENT_TYPE, "application/json");
        match &self.token {
            Some(t) => req.header(AUTHORIZATION, format!("Bearer {t}")),
            None => req,
        }
    }

    async fn check(res: reqwest::Response) -> Result<reqwest::Response, StoreError> {
        if res.status().is_success() {
            return Ok(res);
        }
        let status = res.status();
        let body = res.text().await.unwrap_or_default();
        Err(StoreError::Remote(format!("HTTP {status}: {}", crate::util::trunc_for_log(&body, 200))))
    }
}

fn transport(e: reqwest::Error) -> StoreError {
    if e.is_connect() || e.is_timeout() {
        StoreError::Unavailable
    } else {
        StoreError::Remote(e.to_string())
    }
}

#[async_trait]
impl ProgressStore for RemoteProgressStore {
    #[instrument(level = "debug", skip(self))]
    async fn load(&self, user_id: &str) -> Result<Option<ProgressRecord>, StoreError> {
        let url = self.user_url(user_id, None)?;
        let res = self.request(reqwest::Method::GET, url).send().await.map_err(transport)?;
        if res.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        let doc: UserDoc = Self::check(res).await?.json().await.map_err(transport)?;
        Ok(Some(doc.into()))
    }

    #[instrument(level = "debug", skip(self))]
    async fn record_completion(
        &self,
        user_id: &str,
        mission_id: &str,
        points: i64,
    ) -> Result<ProgressRecord, StoreError> {
        let url = self.user_url(user_id, Some("completions"))?;
        let res = self
            .request(reqwest::Method::POST, url)
            .json(&CompletionReq { mission_id, points })
            .send()
            .await
            .map_err(transport)?;
        let doc: UserDoc = Self::check(res).await?.json().await.map_err(transport)?;
        info!(target: "progress", %user_id, %mission_id, total = doc.total_score, "Remote completion stored");
        Ok(doc.into())
    }

    #[instrument(level = "debug", skip(self, record), fields(user_id = %record.user_id))]
    async fn save(&self, record: &ProgressRecord) -> Result<(), StoreError> {
        let url = self.user_url(&record.user_id, None)?;
        let res = self
            .request(reqwest::Method::PUT, url)
            .json(&UserDoc::from(record))
            .send()
            .await
            .map_err(transport)?;
        Self::check(res).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn user_urls_escape_nicknames() {
        let s = RemoteProgressStore::new("https://store.example/v1/", None, Duration::from_secs(1)).unwrap();
        let url = s.user_url("민지 kim", Some("completions")).unwrap();
        assert_eq!(
            url.as_str(),
            "https://store.example/v1/users/%EB%AF%BC%EC%A7%80%20kim/completions"
        );
        let url = s.user_url("a/b", None).unwrap();
        assert_eq!(url.as_str(), "https://store.example/v1/users/a%2Fb");
    }

    #[test]
    fn bad_base_url_is_rejected() {
        assert!(RemoteProgressStore::new("not a url", None, Duration::from_secs(1)).is_err());
    }

    #[test]
    fn documents_map_to_records() {
        let doc: UserDoc = serde_json::from_str(
            r#"{"userId":"u","completedMissions":["main-1","main-1","main-2"],"totalScore":200}"#,
        )
        .unwrap();
        let r: ProgressRecord = doc.into();
        assert_eq!(r.completed_mission_ids.len(), 2);
        assert_eq!(r.total_score, 200);
    }

    #[tokio::test]
    async fn unreachable_backend_reports_unavailable() {
        // Port 9 (discard) on localhost is almost never listening.
        let s = RemoteProgressStore::new("http://127.0.0.1:9/", None, Duration::from_millis(500)).unwrap();
        let err = s.load("u").await.unwrap_err();
        assert!(matches!(err, StoreError::Unavailable | StoreError::Remote(_)), "got {err:?}");
    }
}
