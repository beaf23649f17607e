//! Error type for `fleet-store-sqlite`.

use fleet_core::store::StoreError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("core error: {0}")]
  Core(#[from] fleet_core::Error),

  #[error("database error: {0}")]
  Database(#[from] tokio_rusqlite::Error),

  #[error("json error: {0}")]
  Json(#[from] serde_json::Error),

  #[error("uuid parse error: {0}")]
  Uuid(#[from] uuid::Error),

  #[error("date/time parse error: {0}")]
  DateParse(String),

  /// A column held a value no domain type maps to.
  #[error("cannot decode column: {0}")]
  Decode(String),

  #[error("shipment not found: {0}")]
  ShipmentNotFound(uuid::Uuid),

  #[error("tracking code {0:?} is already in use")]
  DuplicateTrackingCode(String),

  #[error("vehicle id {0:?} is already registered")]
  DuplicateVehicle(String),

  /// A save would drop entries that are already stored.
  #[error("status history of shipment {0} is append-only")]
  HistoryRewrite(uuid::Uuid),

  /// The shipment was saved by someone else since it was read.
  #[error("shipment {shipment_id} is at version {found}, expected {expected}")]
  VersionConflict {
    shipment_id: uuid::Uuid,
    expected:    u64,
    found:       u64,
  },
}

impl StoreError for Error {
  fn is_conflict(&self) -> bool { matches!(self, Self::VersionConflict { .. }) }

  fn is_duplicate(&self) -> bool {
    matches!(self, Self::DuplicateTrackingCode(_) | Self::DuplicateVehicle(_))
  }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
