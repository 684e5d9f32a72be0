//! Domain models: missions, per-user progress, and verification attempts.

use std::collections::BTreeSet;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::geo::{Compass, GeoPoint, ProximityBand};

/// How a mission is verified.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "UPPERCASE")]
pub enum MissionKind {
  /// Be within the arrival radius of the mission location.
  Gps,
  /// Scan a code placed on site.
  Qr,
  /// Take a picture; any successful capture counts.
  Photo,
  /// Pick the right option among several.
  Quiz,
  /// Augmented-reality cell. Not playable yet.
  Ar,
}

impl fmt::Display for MissionKind {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let s = match self {
      MissionKind::Gps => "GPS",
      MissionKind::Qr => "QR",
      MissionKind::Photo => "PHOTO",
      MissionKind::Quiz => "QUIZ",
      MissionKind::Ar => "AR",
    };
    f.write_str(s)
  }
}

#[derive(Clone, Debug, Serialize, Deserialize, Default)]
pub struct Story {
  #[serde(default)] pub intro: String,
  #[serde(default)] pub outro: String,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Quiz {
  pub question: String,
  pub answer: String,
  pub options: Vec<String>,
  /// Shown on request; asking for it lowers the reward.
  #[serde(default)] pub hint: Option<String>,
}

/// Immutable catalog entry.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Mission {
  pub mission_id: String,
  #[serde(default)] pub is_main_mission: bool,
  pub title: String,
  #[serde(rename = "type")]
  pub kind: MissionKind,
  #[serde(default)] pub story: Story,
  pub location: GeoPoint,
  #[serde(default)] pub quiz: Option<Quiz>,
  #[serde(default)] pub guide_photo_url: Option<String>,
  /// Expected QR content for this mission when the token policy is active.
  #[serde(default)] pub qr_token: Option<String>,
  pub points: u32,
  #[serde(default)] pub order: Option<u32>,
}

/// Durable per-user progress.
///
/// `completed_mission_ids` has set semantics: completing a mission twice never
/// credits twice. `total_score` only grows through [`ProgressRecord::apply_completion`].
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub struct ProgressRecord {
  pub user_id: String,
  #[serde(default)] pub completed_mission_ids: BTreeSet<String>,
  #[serde(default)] pub total_score: u64,
  /// Quiz missions whose hint this user has already been shown.
  #[serde(default)] pub hinted_mission_ids: BTreeSet<String>,
  #[serde(default)] pub updated_at: Option<DateTime<Utc>>,
}

impl ProgressRecord {
  pub fn empty(user_id: impl Into<String>) -> Self {
    Self { user_id: user_id.into(), ..Default::default() }
  }

  pub fn is_completed(&self, mission_id: &str) -> bool {
    self.completed_mission_ids.contains(mission_id)
  }

  /// Nothing worth migrating: no completions and no score.
  pub fn is_trivial(&self) -> bool {
    self.completed_mission_ids.is_empty() && self.total_score == 0
  }

  /// Insert `mission_id` and add `awarded` to the score if it was not already there.
  /// Returns whether the record changed. Negative awards never push the score below zero.
  pub fn apply_completion(&mut self, mission_id: &str, awarded: i64) -> bool {
    if !self.completed_mission_ids.insert(mission_id.to_string()) {
      return false;
    }
    self.total_score = self.total_score.saturating_add_signed(awarded);
    self.updated_at = Some(Utc::now());
    true
  }

  pub fn has_used_hint(&self, mission_id: &str) -> bool {
    self.hinted_mission_ids.contains(mission_id)
  }

  /// Remember that the hint for `mission_id` was shown. Returns whether the record changed.
  pub fn apply_hint(&mut self, mission_id: &str) -> bool {
    if !self.hinted_mission_ids.insert(mission_id.to_string()) {
      return false;
    }
    self.updated_at = Some(Utc::now());
    true
  }

  /// True if `self` already holds everything in `other`.
  pub fn covers(&self, other: &ProgressRecord) -> bool {
    self.completed_mission_ids.is_superset(&other.completed_mission_ids)
      && self.hinted_mission_ids.is_superset(&other.hinted_mission_ids)
      && self.total_score >= other.total_score
  }

  /// Union of completions and hints, larger score, latest timestamp.
  ///
  /// The score is the larger of the two, not a recomputation: when each side
  /// holds missions the other lacks, the merged score undercounts. It never
  /// drops below either side.
  pub fn merged_with(&self, other: &ProgressRecord) -> ProgressRecord {
    ProgressRecord {
      user_id: self.user_id.clone(),
      completed_mission_ids: self
        .completed_mission_ids
        .union(&other.completed_mission_ids)
        .cloned()
        .collect(),
      total_score: self.total_score.max(other.total_score),
      hinted_mission_ids: self.hinted_mission_ids.union(&other.hinted_mission_ids).cloned().collect(),
      updated_at: self.updated_at.max(other.updated_at),
    }
  }
}

/// Where a mission stands for a user. Failed attempts fall back to `NotStarted`.
#[derive(Clone, Copy, Debug, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum MissionStatus {
  NotStarted,
  Completed,
}

impl MissionStatus {
  pub fn of(record: &ProgressRecord, mission: &Mission) -> Self {
    if record.is_completed(&mission.mission_id) {
      MissionStatus::Completed
    } else {
      MissionStatus::NotStarted
    }
  }
}

/// Strategy-specific data kept with an attempt for display only.
#[derive(Clone, Debug, Serialize, PartialEq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AttemptPayload {
  Location {
    distance_m: f64,
    band: ProximityBand,
    direction: Option<Compass>,
    /// Player-facing line, e.g. "조금 더 가까이 가세요 (목표 지점: 북동쪽 방향, 210m)".
    guidance: String,
  },
  QrText { text: String },
  Photo { data_uri: String },
  QuizAnswer { selected: String },
}

/// Result of a single verification. Never persisted.
#[derive(Clone, Debug, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Attempt {
  pub mission_id: String,
  pub success: bool,
  pub used_hint: bool,
  pub payload: Option<AttemptPayload>,
}

impl Attempt {
  pub fn new(mission_id: &str, success: bool, payload: Option<AttemptPayload>) -> Self {
    Self { mission_id: mission_id.to_string(), success, used_hint: false, payload }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn completing_twice_credits_once() {
    let mut r = ProgressRecord::empty("minji");
    assert!(r.apply_completion("main-1", 100));
    assert!(!r.apply_completion("main-1", 100));
    assert_eq!(r.total_score, 100);
    assert_eq!(r.completed_mission_ids.len(), 1);
  }

  #[test]
  fn negative_award_never_underflows() {
    let mut r = ProgressRecord::empty("minji");
    r.apply_completion("treasure-1", -10);
    assert_eq!(r.total_score, 0);
    assert!(r.is_completed("treasure-1"));
  }

  #[test]
  fn merge_takes_union_and_max() {
    let mut a = ProgressRecord::empty("u");
    a.apply_completion("main-1", 100);
    let mut b = ProgressRecord::empty("u");
    b.apply_completion("main-2", 100);
    b.apply_completion("main-3", 80);
    let m = a.merged_with(&b);
    assert_eq!(m.completed_mission_ids.len(), 3);
    assert_eq!(m.total_score, 180);
    assert!(m.covers(&a) && m.covers(&b));
    assert!(!a.covers(&b));
  }

  #[test]
  fn merge_keeps_hints_from_both_sides() {
    let mut a = ProgressRecord::empty("u");
    assert!(a.apply_hint("main-3"));
    assert!(!a.apply_hint("main-3"));
    let mut b = ProgressRecord::empty("u");
    b.apply_hint("treasure-2");
    let m = b.merged_with(&a);
    assert!(m.has_used_hint("main-3") && m.has_used_hint("treasure-2"));
    assert!(!b.covers(&a));
    assert!(m.covers(&a));
    // hints alone are not progress worth migrating
    assert!(a.is_trivial());
  }

  #[test]
  fn merge_score_is_the_larger_side_never_the_sum() {
    let mut a = ProgressRecord::empty("u");
    a.apply_completion("main-1", 100);
    let mut b = ProgressRecord::empty("u");
    b.apply_completion("main-2", 100);
    b.apply_completion("main-3", 100);
    let m = a.merged_with(&b);
    assert_eq!(m.completed_mission_ids.len(), 3);
    assert_eq!(m.total_score, 200);
    assert!(m.total_score >= a.total_score && m.total_score >= b.total_score);
  }

  #[test]
  fn mission_kind_uses_uppercase_wire_names() {
    let k: MissionKind = serde_json::from_str("\"QUIZ\"").unwrap();
    assert_eq!(k, MissionKind::Quiz);
    assert_eq!(serde_json::to_string(&MissionKind::Gps).unwrap(), "\"GPS\"");
    assert_eq!(MissionKind::Photo.to_string(), "PHOTO");
  }
}
