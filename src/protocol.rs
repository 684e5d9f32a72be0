//! Public protocol structs for WebSocket and HTTP endpoints (serde ready).
//! Keep this small and stable to evolve backend and frontend independently.

use serde::{Deserialize, Serialize};

use crate::domain::{Mission, MissionKind, MissionStatus, ProgressRecord, Story};
use crate::error::FlowError;
use crate::geo::{GeoFix, GeoPoint, LocationError};
use crate::logic::{AttemptOutcome, HintText, SetupOutcome};
use crate::progress::{ProgressSummary, RankEntry};
use crate::verify::AttemptInput;

/// Where the client should go when it asks for something that does not exist.
pub const SAFE_ROUTE: &str = "/exploration";

/// Messages the client can send over WebSocket.
#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientWsMessage {
    Ping,
    SetupUser {
        #[serde(rename = "userId")]
        user_id: String,
    },
    LoadProgress {
        #[serde(rename = "userId")]
        user_id: String,
    },
    SubmitAttempt {
        #[serde(rename = "userId")]
        user_id: String,
        #[serde(rename = "missionId")]
        mission_id: String,
        input: AttemptIn,
    },
    Hint {
        #[serde(rename = "userId")]
        user_id: String,
        #[serde(rename = "missionId")]
        mission_id: String,
    },
}

/// Messages the server sends back over WebSocket.
#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerWsMessage {
    Pong,
    Setup {
        setup: SetupOutcome,
    },
    Progress {
        summary: ProgressSummary,
    },
    AttemptResult {
        outcome: AttemptOutcome,
    },
    Hint {
        #[serde(rename = "missionId")]
        mission_id: String,
        hint: HintText,
    },
    Error {
        #[serde(flatten)]
        error: ErrorOut,
    },
}

/// Attempt input as sent by the client. GPS arrives either as a fix or as the
/// error the device's geolocation API raised.
#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AttemptIn {
    Gps {
        lat: f64,
        lng: f64,
        #[serde(default)]
        accuracy: Option<f64>,
    },
    GpsError {
        code: LocationError,
    },
    Qr {
        text: String,
    },
    Photo {
        image: String,
    },
    Quiz {
        selected: String,
        #[serde(default, rename = "usedHint")]
        used_hint: bool,
    },
}

impl AttemptIn {
    /// GPS-shaped inputs go through the location seam; everything else is verified directly.
    pub fn into_location(self) -> Result<Result<GeoFix, LocationError>, AttemptInput> {
        match self {
            AttemptIn::Gps { lat, lng, accuracy } => Ok(Ok(GeoFix { point: GeoPoint::new(lat, lng), accuracy_m: accuracy })),
            AttemptIn::GpsError { code } => Ok(Err(code)),
            AttemptIn::Qr { text } => Err(AttemptInput::Qr { text }),
            AttemptIn::Photo { image } => Err(AttemptInput::Photo { image }),
            AttemptIn::Quiz { selected, used_hint } => Err(AttemptInput::Quiz { selected, used_hint }),
        }
    }
}

/// DTO used by both WS and HTTP for mission delivery. Quiz answers stay server-side.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MissionOut {
    pub mission_id: String,
    pub is_main_mission: bool,
    pub title: String,
    #[serde(rename = "type")]
    pub kind: MissionKind,
    pub story: Story,
    pub location: GeoPoint,
    pub question: Option<String>,
    pub options: Vec<String>,
    pub has_hint: bool,
    pub guide_photo_url: Option<String>,
    pub points: u32,
    pub order: Option<u32>,
    pub status: Option<MissionStatus>,
}

/// Convert a catalog `Mission` (internal) to the public DTO.
pub fn to_out(m: &Mission, record: Option<&ProgressRecord>) -> MissionOut {
    MissionOut {
        mission_id: m.mission_id.clone(),
        is_main_mission: m.is_main_mission,
        title: m.title.clone(),
        kind: m.kind,
        story: m.story.clone(),
        location: m.location,
        question: m.quiz.as_ref().map(|q| q.question.clone()),
        options: m.quiz.as_ref().map(|q| q.options.clone()).unwrap_or_default(),
        has_hint: m.quiz.is_some(),
        guide_photo_url: m.guide_photo_url.clone(),
        points: m.points,
        order: m.order,
        status: record.map(|r| MissionStatus::of(r, m)),
    }
}

/// Uniform error body. `redirect` is set for lookups the client should route away from.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorOut {
    pub error: &'static str,
    pub message: String,
    pub retryable: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub redirect: Option<&'static str>,
}

impl ErrorOut {
    pub fn not_found(what: &str) -> Self {
        Self { error: "not_found", message: format!("Unknown mission: {what}"), retryable: false, redirect: Some(SAFE_ROUTE) }
    }
}

impl From<&FlowError> for ErrorOut {
    fn from(e: &FlowError) -> Self {
        match e {
            FlowError::UnknownMission(id) => ErrorOut::not_found(id),
            FlowError::InvalidUser => ErrorOut { error: "invalid_user", message: e.to_string(), retryable: false, redirect: None },
            FlowError::Verify(v) => ErrorOut { error: "invalid_attempt", message: v.to_string(), retryable: true, redirect: None },
            FlowError::Location(l) => ErrorOut {
                error: match l {
                    LocationError::PermissionDenied => "location_permission_denied",
                    LocationError::PositionUnavailable => "location_unavailable",
                    LocationError::Timeout => "location_timeout",
                },
                message: l.message_ko().to_string(),
                retryable: true,
                redirect: None,
            },
            FlowError::Store(s) => ErrorOut { error: "storage", message: s.to_string(), retryable: true, redirect: None },
        }
    }
}

//
// HTTP request/response DTOs
//

#[derive(Debug, Deserialize)]
pub struct UserSetupIn {
    #[serde(rename = "userId")]
    pub user_id: String,
}

/// Asking for a hint is recorded per user; the reward drops accordingly.
#[derive(Debug, Deserialize)]
pub struct HintIn {
    #[serde(rename = "userId")]
    pub user_id: String,
}

#[derive(Debug, Deserialize)]
pub struct AttemptBody {
    #[serde(rename = "userId")]
    pub user_id: String,
    pub input: AttemptIn,
}

#[derive(Debug, Deserialize)]
pub struct MissionsQuery {
    #[serde(rename = "userId")]
    pub user_id: Option<String>,
}

#[derive(Serialize)]
pub struct MissionsOut {
    pub main: Vec<MissionOut>,
    pub sub: Vec<MissionOut>,
}

#[derive(Debug, Deserialize)]
pub struct RankingQuery {
    pub limit: Option<usize>,
}

#[derive(Serialize)]
pub struct RankingOut {
    pub entries: Vec<RankEntry>,
}

#[derive(Serialize)]
pub struct HealthOut {
    pub ok: bool,
    pub remote: bool,
}
