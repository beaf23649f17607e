//! A [`TelemetrySource`] that drives vehicles toward their destinations.
//!
//! Stands in for a real telematics provider in demos. Each poll moves the
//! vehicle 5% of the remaining way, with some jitter, at 75–90 km/h.

use std::{collections::HashMap, convert::Infallible, sync::Mutex};

use chrono::Utc;
use fleet_core::{
  geo::Position,
  shipment::Shipment,
  telemetry::{TelemetrySample, TelemetrySource},
};
use rand_core::{OsRng, RngCore};

/// Fraction of the remaining distance covered per poll.
pub const STEP_FRACTION: f64 = 0.05;
/// Maximum jitter per axis, in degrees.
pub const MAX_JITTER_DEG: f64 = 0.05;
/// Jitter shrinks linearly inside this distance so trucks can actually arrive.
const JITTER_FADE_KM: f64 = 500.0;

/// Uniform float in `[0, 1)`.
fn unit(rng: &mut impl RngCore) -> f64 {
  (rng.next_u64() >> 11) as f64 / (1u64 << 53) as f64
}

/// Next simulated fix from `from` toward `to`. `r` holds three uniform draws
/// in `[0, 1)`: latitude jitter, longitude jitter, speed.
pub fn step(from: Position, to: Position, r: [f64; 3]) -> (Position, f64) {
  let fade = (from.distance_km(&to) / JITTER_FADE_KM).min(1.0);
  let jitter = |u: f64| (u - 0.5) * 2.0 * MAX_JITTER_DEG * fade;

  let lat = from.lat + (to.lat - from.lat) * STEP_FRACTION + jitter(r[0]);
  let lng = from.lng + (to.lng - from.lng) * STEP_FRACTION + jitter(r[1]);
  let speed_kmh = (75.0 + r[2] * 15.0).floor();

  (Position::new(lat.clamp(-90.0, 90.0), lng.clamp(-180.0, 180.0)), speed_kmh)
}

/// Simulated fleet. Remembers the last position it reported per vehicle.
#[derive(Default)]
pub struct SimulatedTelemetry {
  positions: Mutex<HashMap<String, Position>>,
}

impl SimulatedTelemetry {
  pub fn new() -> Self { Self::default() }
}

impl TelemetrySource for SimulatedTelemetry {
  type Error = Infallible;

  async fn latest(&self, shipment: &Shipment) -> Result<Option<TelemetrySample>, Infallible> {
    let Some(vehicle_id) = shipment.vehicle_id() else {
      return Ok(None);
    };

    let mut rng = OsRng;
    let draws = [unit(&mut rng), unit(&mut rng), unit(&mut rng)];

    let position = {
      let mut positions = match self.positions.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
      };
      let from = positions
        .get(vehicle_id)
        .copied()
        .or(shipment.current_position)
        .unwrap_or(shipment.origin.position);
      let (next, speed_kmh) = step(from, shipment.destination.position, draws);
      positions.insert(vehicle_id.to_owned(), next);
      (next, speed_kmh)
    };

    Ok(Some(TelemetrySample {
      vehicle_id:  vehicle_id.to_owned(),
      position:    position.0,
      speed_kmh:   position.1,
      ignition:    true,
      door_open:   false,
      recorded_at: Utc::now(),
    }))
  }
}
