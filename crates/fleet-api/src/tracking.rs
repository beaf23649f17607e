//! Public tracking endpoint: `GET /track/{code}`.
//!
//! Returns what a customer holding a tracking code may see. Vehicle and
//! driver identifiers stay internal. While the shipment is under way the
//! view carries the truck's latest telemetry fix.

use std::sync::Arc;

use axum::{
  Json,
  extract::{Path, State},
};
use chrono::{DateTime, Utc};
use fleet_core::{
  geo::Position,
  shipment::{Shipment, Status, StatusChange, Stop, TimelineStep},
  store::{FixStore, ShipmentStore},
  telemetry::TelemetrySample,
};
use serde::Serialize;

use crate::error::ApiError;

/// The latest telemetry fix of the assigned truck.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LiveFix {
  pub position:    Position,
  pub speed_kmh:   f64,
  pub ignition:    bool,
  pub door_open:   bool,
  pub recorded_at: DateTime<Utc>,
}

impl From<TelemetrySample> for LiveFix {
  fn from(s: TelemetrySample) -> Self {
    Self {
      position:    s.position,
      speed_kmh:   s.speed_kmh,
      ignition:    s.ignition,
      door_open:   s.door_open,
      recorded_at: s.recorded_at,
    }
  }
}

#[derive(Debug, Serialize)]
pub struct TrackingView {
  pub tracking_code:    String,
  pub description:      String,
  pub status:           Status,
  /// The live fix position when there is one, else the stored position.
  pub current_position: Option<Position>,
  pub vehicle_fix:      Option<LiveFix>,
  pub origin:           Stop,
  pub destination:      Stop,
  pub stops:            Vec<Stop>,
  pub client:           String,
  pub driver:           Option<String>,
  pub departure_time:   DateTime<Utc>,
  pub eta:              DateTime<Utc>,
  pub timeline:         Vec<TimelineStep>,
  /// Newest first.
  pub history:          Vec<StatusChange>,
}

impl TrackingView {
  pub fn new(s: Shipment, fix: Option<TelemetrySample>) -> Self {
    let timeline = s.timeline();
    let vehicle_fix = fix.map(LiveFix::from);
    let current_position = vehicle_fix
      .as_ref()
      .map(|f| f.position)
      .or(s.current_position);
    let mut history = s.status_history;
    history.reverse();
    Self {
      tracking_code: s.tracking_code,
      description: s.description,
      status: s.status,
      current_position,
      vehicle_fix,
      origin: s.origin,
      destination: s.destination,
      stops: s.stops,
      client: s.client.name,
      driver: s.driver.map(|d| d.name),
      departure_time: s.departure_time,
      eta: s.eta,
      timeline,
      history,
    }
  }
}

/// `GET /track/{code}`
pub async fn track<S>(
  State(store): State<Arc<S>>,
  Path(code): Path<String>,
) -> Result<Json<TrackingView>, ApiError>
where
  S: ShipmentStore + FixStore,
{
  let shipment = store
    .find_by_tracking_code(&code)
    .await
    .map_err(ApiError::store)?
    .ok_or_else(|| ApiError::NotFound(format!("no shipment with tracking code {code:?}")))?;

  // A delivered shipment keeps its final position; the truck has moved on.
  let fix = match shipment.vehicle_id() {
    Some(vehicle_id) if !shipment.status.is_terminal() => {
      store.latest_fix(vehicle_id).await.map_err(ApiError::store)?
    }
    _ => None,
  };
  Ok(Json(TrackingView::new(shipment, fix)))
}
