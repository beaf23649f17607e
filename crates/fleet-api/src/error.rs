//! API error type and [`axum::response::IntoResponse`] implementation.

use axum::{
  Json,
  http::StatusCode,
  response::{IntoResponse, Response},
};
use fleet_core::store::StoreError;
use serde_json::json;
use thiserror::Error;

/// An error returned by an API handler.
#[derive(Debug, Error)]
pub enum ApiError {
  #[error("not found: {0}")]
  NotFound(String),

  #[error("bad request: {0}")]
  BadRequest(String),

  /// The request was well-formed but its content cannot be processed, e.g.
  /// a telemetry sample with an out-of-range coordinate or a shipment naming
  /// an unregistered truck.
  #[error("unprocessable: {0}")]
  Unprocessable(String),

  /// `If-Match` named a version other than the stored one.
  #[error("precondition failed: {0}")]
  PreconditionFailed(String),

  #[error("conflict: {0}")]
  Conflict(String),

  #[error("store error: {0}")]
  Store(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl ApiError {
  /// Map a backend error, keeping conflicts and duplicates distinguishable.
  pub fn store<E: StoreError>(e: E) -> Self {
    if e.is_conflict() || e.is_duplicate() {
      Self::Conflict(e.to_string())
    } else {
      Self::Store(Box::new(e))
    }
  }
}

impl From<fleet_core::Error> for ApiError {
  fn from(e: fleet_core::Error) -> Self {
    use fleet_core::Error as E;
    match e {
      E::InvalidSample { .. } => Self::Unprocessable(e.to_string()),
      E::ShipmentNotFound { .. } => Self::NotFound(e.to_string()),
      E::ConflictRetriesExhausted { .. } => Self::Conflict(e.to_string()),
      E::InvalidPosition { .. }
      | E::InvalidRadius(_)
      | E::EmptyTrackingCode
      | E::MissingField(_) => Self::BadRequest(e.to_string()),
      E::UnknownVehicle(_)
      | E::WrongVehicleKind { .. }
      | E::UnknownDriver(_)
      | E::UnknownClient(_) => Self::Unprocessable(e.to_string()),
      E::Store(inner) => Self::Store(inner),
      other => Self::Store(Box::new(other)),
    }
  }
}

impl IntoResponse for ApiError {
  fn into_response(self) -> Response {
    let (status, message) = match &self {
      ApiError::NotFound(m) => (StatusCode::NOT_FOUND, m.clone()),
      ApiError::BadRequest(m) => (StatusCode::BAD_REQUEST, m.clone()),
      ApiError::Unprocessable(m) => (StatusCode::UNPROCESSABLE_ENTITY, m.clone()),
      ApiError::PreconditionFailed(m) => (StatusCode::PRECONDITION_FAILED, m.clone()),
      ApiError::Conflict(m) => (StatusCode::CONFLICT, m.clone()),
      ApiError::Store(e) => {
        tracing::error!(error = %e, "store failure");
        (StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
      }
    };
    (status, Json(json!({ "error": message }))).into_response()
  }
}
