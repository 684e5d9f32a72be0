//! Error types shared across the catalog, verification, storage and flow layers.

use crate::domain::MissionKind;
use crate::geo::LocationError;

/// Catalog invariants violated while building or extending a catalog.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CatalogError {
  #[error("duplicate mission id: {0}")]
  DuplicateId(String),
  #[error("quiz mission {0} has no quiz content")]
  MissingQuiz(String),
  #[error("quiz mission {0}: answer is not one of the options")]
  AnswerNotInOptions(String),
  #[error("mission {0} must award a positive number of points")]
  NonPositivePoints(String),
  #[error("main mission {0} has no order")]
  MissingOrder(String),
  #[error("catalog has no main missions")]
  EmptyMainLine,
}

/// A request that cannot be verified at all. Wrong answers are not errors.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum VerifyError {
  #[error("mission expects {expected} input, got {got}")]
  InputMismatch { expected: MissionKind, got: MissionKind },
  #[error("quiz mission {0} has no quiz content")]
  MissingQuiz(String),
  #[error("{0} missions are not available yet")]
  Unsupported(MissionKind),
  #[error("malformed input: {0}")]
  MalformedInput(String),
}

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
  #[error("storage io error: {0}")]
  Io(#[from] std::io::Error),
  #[error("serialization error: {0}")]
  Serialization(#[from] serde_json::Error),
  #[error("remote store error: {0}")]
  Remote(String),
  #[error("remote store unavailable")]
  Unavailable,
}

/// Everything that can stop a mission attempt from being evaluated.
#[derive(Debug, thiserror::Error)]
pub enum FlowError {
  #[error("unknown mission: {0}")]
  UnknownMission(String),
  #[error("user id must be 1 to {max} characters", max = crate::util::MAX_USER_ID_CHARS)]
  InvalidUser,
  #[error(transparent)]
  Verify(#[from] VerifyError),
  #[error(transparent)]
  Location(#[from] LocationError),
  #[error(transparent)]
  Store(#[from] StoreError),
}
