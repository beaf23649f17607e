//! Error types for `fleet-core`.

use thiserror::Error;
use uuid::Uuid;

use crate::{fleet::VehicleKind, shipment::Status};

#[derive(Debug, Error)]
pub enum Error {
  /// The telemetry sample is malformed; the caller drops it and waits for the
  /// next poll.
  #[error("invalid telemetry sample: {reason}")]
  InvalidSample { reason: String },

  /// No active shipment is assigned to the vehicle that produced a sample.
  #[error("no active shipment for vehicle {vehicle_id:?}")]
  ShipmentNotFound { vehicle_id: String },

  #[error("invalid position: lat {lat}, lng {lng}")]
  InvalidPosition { lat: f64, lng: f64 },

  #[error("geofence radius {0} m is outside 10..=5000")]
  InvalidRadius(u32),

  #[error("tracking code must not be empty")]
  EmptyTrackingCode,

  #[error("{0} must not be empty")]
  MissingField(&'static str),

  #[error("no vehicle registered as {0:?}")]
  UnknownVehicle(String),

  #[error("vehicle {vehicle_id:?} is not a {expected}")]
  WrongVehicleKind {
    vehicle_id: String,
    expected:   VehicleKind,
  },

  #[error("no driver with id {0}")]
  UnknownDriver(Uuid),

  #[error("no client with id {0}")]
  UnknownClient(Uuid),

  #[error("shipment {0} has an empty status history")]
  EmptyHistory(Uuid),

  #[error("shipment {shipment_id} history goes back in time at entry {index}")]
  NonMonotonicHistory { shipment_id: Uuid, index: usize },

  #[error(
    "shipment {shipment_id} status {status} diverges from latest history entry {latest}"
  )]
  HistoryDiverged {
    shipment_id: Uuid,
    status:      Status,
    latest:      Status,
  },

  #[error("gave up saving shipment {shipment_id} after {attempts} conflicting writes")]
  ConflictRetriesExhausted { shipment_id: Uuid, attempts: u32 },

  #[error("store error: {0}")]
  Store(#[source] Box<dyn std::error::Error + Send + Sync>),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
