//! Vehicle telemetry samples and the source that produces them.

use std::future::Future;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{Error, Result, geo::Position, shipment::Shipment};

/// One position/speed fix for a vehicle. Only the latest fix per vehicle is
/// kept (see [`crate::store::FixStore`]).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TelemetrySample {
  pub vehicle_id:  String,
  pub position:    Position,
  /// Ground speed in km/h.
  pub speed_kmh:   f64,
  #[serde(default)]
  pub ignition:    bool,
  #[serde(default)]
  pub door_open:   bool,
  pub recorded_at: DateTime<Utc>,
}

impl TelemetrySample {
  /// Reject out-of-range coordinates and negative or non-finite speeds.
  pub fn validate(&self) -> Result<()> {
    let p = &self.position;
    if !p.lat.is_finite() || !(-90.0..=90.0).contains(&p.lat) {
      return Err(Error::InvalidSample {
        reason: format!("latitude {} out of range", p.lat),
      });
    }
    if !p.lng.is_finite() || !(-180.0..=180.0).contains(&p.lng) {
      return Err(Error::InvalidSample {
        reason: format!("longitude {} out of range", p.lng),
      });
    }
    if !self.speed_kmh.is_finite() || self.speed_kmh < 0.0 {
      return Err(Error::InvalidSample {
        reason: format!("speed {} km/h is not a non-negative number", self.speed_kmh),
      });
    }
    Ok(())
  }
}

/// Something that can report the latest fix for a shipment's vehicle.
///
/// Implementations key on `shipment.vehicle`; the whole shipment is passed so a
/// source can fall back to the shipment's last known position.
pub trait TelemetrySource: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  /// Latest sample for the shipment's vehicle, or `None` if the vehicle has
  /// not reported.
  fn latest<'a>(
    &'a self,
    shipment: &'a Shipment,
  ) -> impl Future<Output = Result<Option<TelemetrySample>, Self::Error>> + Send + 'a;
}
