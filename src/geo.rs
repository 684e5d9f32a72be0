//! Geospatial helpers: great-circle distance, proximity bands, compass hints,
//! and the seam through which a device position is acquired.
//!
//! Coordinates are not range-checked here. Garbage in gives garbage (or NaN) out.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument, warn};

/// Mean Earth radius used by the Haversine formula.
pub const EARTH_RADIUS_KM: f64 = 6371.0;

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq)]
pub struct GeoPoint {
  pub lat: f64,
  pub lng: f64,
}

impl GeoPoint {
  pub const fn new(lat: f64, lng: f64) -> Self {
    Self { lat, lng }
  }
}

/// Haversine distance between two points, in meters.
pub fn distance_meters(a: GeoPoint, b: GeoPoint) -> f64 {
  let d_lat = (b.lat - a.lat).to_radians();
  let d_lng = (b.lng - a.lng).to_radians();
  let h = (d_lat / 2.0).sin().powi(2)
    + a.lat.to_radians().cos() * b.lat.to_radians().cos() * (d_lng / 2.0).sin().powi(2);
  let c = 2.0 * h.sqrt().atan2((1.0 - h).sqrt());
  EARTH_RADIUS_KM * c * 1000.0
}

/// Coarse "how far am I" guidance shown while the user walks to a GPS mission.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ProximityBand {
  Arrived,
  Close,
  Near,
  Far,
}

impl ProximityBand {
  pub fn classify(distance_m: f64, arrival_radius_m: f64) -> Self {
    if distance_m <= arrival_radius_m {
      ProximityBand::Arrived
    } else if distance_m <= 100.0 {
      ProximityBand::Close
    } else if distance_m <= 500.0 {
      ProximityBand::Near
    } else {
      ProximityBand::Far
    }
  }

  pub fn message_ko(self) -> &'static str {
    match self {
      ProximityBand::Arrived => "목표 지점에 도착했습니다!",
      ProximityBand::Close => "거의 다 왔습니다!",
      ProximityBand::Near => "조금 더 가까이 가세요",
      ProximityBand::Far => "목표 지점까지 멀리 있습니다",
    }
  }
}

/// Eight-point compass direction.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Compass {
  North,
  NorthEast,
  East,
  SouthEast,
  South,
  SouthWest,
  West,
  NorthWest,
}

impl Compass {
  const ALL: [Compass; 8] = [
    Compass::North,
    Compass::NorthEast,
    Compass::East,
    Compass::SouthEast,
    Compass::South,
    Compass::SouthWest,
    Compass::West,
    Compass::NorthWest,
  ];

  /// Direction to walk from `from` to reach `to`, using a flat lat/lng angle.
  /// Good enough at neighbourhood scale; not a true initial bearing.
  pub fn toward(from: GeoPoint, to: GeoPoint) -> Self {
    let deg = (to.lng - from.lng).atan2(to.lat - from.lat).to_degrees();
    let normalized = deg.rem_euclid(360.0);
    let idx = ((normalized / 45.0).round() as usize) % 8;
    Self::ALL[idx]
  }

  pub fn label_ko(self) -> &'static str {
    match self {
      Compass::North => "북쪽",
      Compass::NorthEast => "북동쪽",
      Compass::East => "동쪽",
      Compass::SouthEast => "남동쪽",
      Compass::South => "남쪽",
      Compass::SouthWest => "남서쪽",
      Compass::West => "서쪽",
      Compass::NorthWest => "북서쪽",
    }
  }
}

/// A position reported by the device.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq)]
pub struct GeoFix {
  #[serde(flatten)]
  pub point: GeoPoint,
  #[serde(default)]
  pub accuracy_m: Option<f64>,
}

/// Failure modes of a geolocation provider. All of them are retryable.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, thiserror::Error)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LocationError {
  #[error("location permission denied")]
  PermissionDenied,
  #[error("position unavailable")]
  PositionUnavailable,
  #[error("location request timed out")]
  Timeout,
}

impl LocationError {
  pub fn message_ko(self) -> &'static str {
    match self {
      LocationError::PermissionDenied => "위치 권한이 거부되었습니다.",
      LocationError::PositionUnavailable => "위치 정보를 사용할 수 없습니다.",
      LocationError::Timeout => "위치 요청 시간이 초과되었습니다.",
    }
  }
}

/// Anything that can produce the device's current position.
#[async_trait]
pub trait LocationSource: Send + Sync {
  async fn current_position(&self) -> Result<GeoFix, LocationError>;
}

/// Position already obtained by the client and forwarded with the request.
pub struct ReportedLocation(pub Result<GeoFix, LocationError>);

#[async_trait]
impl LocationSource for ReportedLocation {
  async fn current_position(&self) -> Result<GeoFix, LocationError> {
    self.0
  }
}

/// Ask the source for a fix, giving up after `timeout`.
/// A slow provider surfaces as `Timeout`, distinct from denial or unavailability.
#[instrument(level = "debug", skip(source))]
pub async fn acquire_fix(source: &dyn LocationSource, timeout: Duration) -> Result<GeoFix, LocationError> {
  match tokio::time::timeout(timeout, source.current_position()).await {
    Ok(Ok(fix)) => {
      debug!(target: "mission", lat = fix.point.lat, lng = fix.point.lng, accuracy = ?fix.accuracy_m, "Location acquired");
      Ok(fix)
    }
    Ok(Err(e)) => {
      warn!(target: "mission", error = %e, "Location provider failed");
      Err(e)
    }
    Err(_) => {
      warn!(target: "mission", timeout_ms = timeout.as_millis() as u64, "Location provider timed out");
      Err(LocationError::Timeout)
    }
  }
}
