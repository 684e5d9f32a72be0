//! Verification strategies, one per mission kind.
//!
//! `verify` is the single dispatch point. Every strategy is stateless: a failed
//! attempt leaves nothing behind and may be retried at will. A wrong answer or an
//! out-of-range position is `Ok(Attempt { success: false, .. })`; `Err` is reserved
//! for requests that cannot be judged at all.

use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde::Deserialize;
use tracing::{debug, instrument};

use crate::config::{QrPolicy, Rules};
use crate::domain::{Attempt, AttemptPayload, Mission, MissionKind};
use crate::error::VerifyError;
use crate::geo::{distance_meters, Compass, GeoFix, ProximityBand};
use crate::util::trunc_for_log;

/// Raw user input for one attempt.
#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AttemptInput {
  Gps { fix: GeoFix },
  Qr { text: String },
  /// Captured image as a data URI or bare base64.
  Photo { image: String },
  Quiz {
    selected: String,
    #[serde(default, rename = "usedHint")]
    used_hint: bool,
  },
}

impl AttemptInput {
  pub fn kind(&self) -> MissionKind {
    match self {
      AttemptInput::Gps { .. } => MissionKind::Gps,
      AttemptInput::Qr { .. } => MissionKind::Qr,
      AttemptInput::Photo { .. } => MissionKind::Photo,
      AttemptInput::Quiz { .. } => MissionKind::Quiz,
    }
  }
}

#[instrument(level = "debug", skip(mission, input, rules), fields(mission_id = %mission.mission_id, kind = %mission.kind))]
pub fn verify(mission: &Mission, input: &AttemptInput, rules: &Rules) -> Result<Attempt, VerifyError> {
  let attempt = match (mission.kind, input) {
    (MissionKind::Ar, _) => return Err(VerifyError::Unsupported(MissionKind::Ar)),
    (MissionKind::Gps, AttemptInput::Gps { fix }) => verify_gps(mission, fix, rules),
    (MissionKind::Qr, AttemptInput::Qr { text }) => verify_qr(mission, text, rules),
    (MissionKind::Photo, AttemptInput::Photo { image }) => verify_photo(mission, image)?,
    (MissionKind::Quiz, AttemptInput::Quiz { selected, used_hint }) => verify_quiz(mission, selected, *used_hint)?,
    (expected, other) => {
      return Err(VerifyError::InputMismatch { expected, got: other.kind() });
    }
  };
  debug!(target: "mission", mission_id = %mission.mission_id, success = attempt.success, "Attempt verified");
  Ok(attempt)
}

/// Inside the arrival radius or not. Distances are reported rounded to the meter.
fn verify_gps(mission: &Mission, fix: &GeoFix, rules: &Rules) -> Attempt {
  let distance = distance_meters(fix.point, mission.location);
  let success = distance <= rules.gps_radius_m;
  let band = ProximityBand::classify(distance, rules.gps_radius_m);
  let direction = (!success).then(|| Compass::toward(fix.point, mission.location));
  let distance_m = distance.round();
  let guidance = match direction {
    Some(d) => format!("{} (목표 지점: {} 방향, {}m)", band.message_ko(), d.label_ko(), distance_m),
    None => band.message_ko().to_string(),
  };
  Attempt::new(
    &mission.mission_id,
    success,
    Some(AttemptPayload::Location { distance_m, band, direction, guidance }),
  )
}

fn verify_qr(mission: &Mission, text: &str, rules: &Rules) -> Attempt {
  let scanned = text.trim();
  let success = match rules.qr_policy {
    QrPolicy::Permissive => !scanned.is_empty(),
    QrPolicy::Token => {
      let token = mission.qr_token.as_deref().unwrap_or(&rules.qr_token);
      !scanned.is_empty() && scanned.contains(token)
    }
  };
  debug!(target: "mission", mission_id = %mission.mission_id, scanned = %trunc_for_log(scanned, 64), policy = ?rules.qr_policy, success, "QR scan judged");
  Attempt::new(&mission.mission_id, success, Some(AttemptPayload::QrText { text: scanned.to_string() }))
}

/// Any decodable, non-empty capture passes. An empty capture is a failed attempt.
fn verify_photo(mission: &Mission, image: &str) -> Result<Attempt, VerifyError> {
  let (mime, b64) = split_data_uri(image.trim());
  if b64.is_empty() {
    return Ok(Attempt::new(&mission.mission_id, false, None));
  }
  let bytes = STANDARD
    .decode(b64)
    .map_err(|e| VerifyError::MalformedInput(format!("photo is not valid base64: {e}")))?;
  if bytes.is_empty() {
    return Ok(Attempt::new(&mission.mission_id, false, None));
  }
  let data_uri = format!("data:{};base64,{}", mime, STANDARD.encode(&bytes));
  Ok(Attempt::new(&mission.mission_id, true, Some(AttemptPayload::Photo { data_uri })))
}

/// Accepts `data:<mime>;base64,<payload>` or a bare payload (assumed JPEG).
fn split_data_uri(s: &str) -> (&str, &str) {
  if let Some(rest) = s.strip_prefix("data:") {
    if let Some((meta, payload)) = rest.split_once(',') {
      let mime = meta.strip_suffix(";base64").unwrap_or(meta);
      let mime = if mime.is_empty() { "image/jpeg" } else { mime };
      return (mime, payload);
    }
  }
  ("image/jpeg", s)
}

/// Exact, case-sensitive match against the stored answer. The hint flag rides along.
fn verify_quiz(mission: &Mission, selected: &str, used_hint: bool) -> Result<Attempt, VerifyError> {
  let quiz = mission.quiz.as_ref().ok_or_else(|| VerifyError::MissingQuiz(mission.mission_id.clone()))?;
  let success = selected == quiz.answer;
  let mut attempt = Attempt::new(
    &mission.mission_id,
    success,
    Some(AttemptPayload::QuizAnswer { selected: selected.to_string() }),
  );
  attempt.used_hint = used_hint;
  Ok(attempt)
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::catalog::Catalog;
  use crate::geo::GeoPoint;

  fn mission(id: &str) -> Mission {
    Catalog::builtin().unwrap().find(id).cloned().unwrap()
  }

  fn fix_offset_north(m: &Mission, meters: f64) -> GeoFix {
    // ~111_195 m per degree of latitude
    GeoFix { point: GeoPoint::new(m.location.lat + meters / 111_195.0, m.location.lng), accuracy_m: Some(5.0) }
  }

  #[test]
  fn gps_inside_radius_passes() {
    let m = mission("main-5");
    let a = verify(&m, &AttemptInput::Gps { fix: fix_offset_north(&m, 30.0) }, &Rules::default()).unwrap();
    assert!(a.success);
    match a.payload {
      Some(AttemptPayload::Location { band, direction, .. }) => {
        assert_eq!(band, ProximityBand::Arrived);
        assert_eq!(direction, None);
      }
      other => panic!("unexpected payload {other:?}"),
    }
  }

  #[test]
  fn gps_threshold_is_fifty_meters() {
    let m = mission("main-5");
    let rules = Rules::default();
    for meters in [0.0, 10.0, 49.0] {
      let a = verify(&m, &AttemptInput::Gps { fix: fix_offset_north(&m, meters) }, &rules).unwrap();
      assert!(a.success, "{meters} m should pass");
    }
    for meters in [51.0, 120.0, 2_000.0] {
      let a = verify(&m, &AttemptInput::Gps { fix: fix_offset_north(&m, meters) }, &rules).unwrap();
      assert!(!a.success, "{meters} m should fail");
    }
  }

  #[test]
  fn gps_two_hundred_meters_away_fails_with_direction() {
    let m = mission("main-5");
    let a = verify(&m, &AttemptInput::Gps { fix: fix_offset_north(&m, 200.0) }, &Rules::default()).unwrap();
    assert!(!a.success);
    match a.payload {
      Some(AttemptPayload::Location { distance_m, band, direction, guidance }) => {
        assert!((distance_m - 200.0).abs() <= 1.0);
        assert_eq!(band, ProximityBand::Near);
        assert_eq!(direction, Some(Compass::South));
        assert!(guidance.contains("남쪽"), "{guidance}");
      }
      other => panic!("unexpected payload {other:?}"),
    }
  }

  #[test]
  fn permissive_qr_accepts_any_non_empty_scan() {
    let m = mission("main-2");
    let rules = Rules::default();
    assert!(verify(&m, &AttemptInput::Qr { text: "hello".into() }, &rules).unwrap().success);
    assert!(!verify(&m, &AttemptInput::Qr { text: "   ".into() }, &rules).unwrap().success);
  }

  #[test]
  fn token_qr_requires_the_token() {
    let m = mission("main-2");
    let rules = Rules { qr_policy: QrPolicy::Token, ..Rules::default() };
    assert!(verify(&m, &AttemptInput::Qr { text: "https://x/bonghwang-memories/2".into() }, &rules).unwrap().success);
    assert!(!verify(&m, &AttemptInput::Qr { text: "https://example.com".into() }, &rules).unwrap().success);
  }

  #[test]
  fn photo_accepts_any_capture() {
    let m = mission("main-1");
    let image = format!("data:image/png;base64,{}", STANDARD.encode([0x89u8, b'P', b'N', b'G']));
    let a = verify(&m, &AttemptInput::Photo { image: image.clone() }, &Rules::default()).unwrap();
    assert!(a.success);
    assert_eq!(a.payload, Some(AttemptPayload::Photo { data_uri: image }));

    let bare = STANDARD.encode([1u8, 2, 3]);
    let a = verify(&m, &AttemptInput::Photo { image: bare }, &Rules::default()).unwrap();
    assert!(matches!(a.payload, Some(AttemptPayload::Photo { ref data_uri }) if data_uri.starts_with("data:image/jpeg;base64,")));
  }

  #[test]
  fn empty_or_garbled_photo_is_not_a_capture() {
    let m = mission("main-1");
    let a = verify(&m, &AttemptInput::Photo { image: "data:image/jpeg;base64,".into() }, &Rules::default()).unwrap();
    assert!(!a.success);
    let err = verify(&m, &AttemptInput::Photo { image: "@@not base64@@".into() }, &Rules::default()).unwrap_err();
    assert!(matches!(err, VerifyError::MalformedInput(_)));
  }

  #[test]
  fn quiz_is_exact_and_case_sensitive() {
    let m = mission("main-3");
    let rules = Rules::default();
    let ok = verify(&m, &AttemptInput::Quiz { selected: "조용필".into(), used_hint: true }, &rules).unwrap();
    assert!(ok.success);
    assert!(ok.used_hint);
    let wrong = verify(&m, &AttemptInput::Quiz { selected: "이문세".into(), used_hint: false }, &rules).unwrap();
    assert!(!wrong.success);

    let t = mission("treasure-7");
    let lower = verify(&t, &AttemptInput::Quiz { selected: "금관가야 ".into(), used_hint: false }, &rules).unwrap();
    assert!(!lower.success);
  }

  #[test]
  fn mismatched_input_and_ar_are_errors() {
    let rules = Rules::default();
    let err = verify(&mission("main-3"), &AttemptInput::Qr { text: "x".into() }, &rules).unwrap_err();
    assert_eq!(err, VerifyError::InputMismatch { expected: MissionKind::Quiz, got: MissionKind::Qr });
    let err = verify(&mission("treasure-13"), &AttemptInput::Qr { text: "x".into() }, &rules).unwrap_err();
    assert_eq!(err, VerifyError::Unsupported(MissionKind::Ar));
  }

  #[test]
  fn quiz_input_parses_from_json() {
    let input: AttemptInput = serde_json::from_str(r#"{"kind":"quiz","selected":"조용필","usedHint":true}"#).unwrap();
    assert_eq!(input, AttemptInput::Quiz { selected: "조용필".into(), used_hint: true });
  }
}
