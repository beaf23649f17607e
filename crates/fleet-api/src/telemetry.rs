//! `POST /telemetry`: push one sample through the poll cycle.
//!
//! Lets an external feed (or an operator) report a fix instead of waiting for
//! the background poller. An accepted sample also becomes the vehicle's
//! latest fix.

use axum::{Json, extract::State};
use fleet_core::{
  poll::{PollOutcome, process_sample},
  store::{FixStore, LocationRegistry, ShipmentStore},
  telemetry::TelemetrySample,
};

use crate::{ApiState, error::ApiError};

/// `POST /telemetry`
///
/// `422` for a malformed sample, `404` when the vehicle has no active
/// shipment, `409` when every save attempt lost to a concurrent writer.
pub async fn ingest<S>(
  State(state): State<ApiState<S>>,
  Json(sample): Json<TelemetrySample>,
) -> Result<Json<PollOutcome>, ApiError>
where
  S: ShipmentStore + LocationRegistry + FixStore,
{
  let outcome = process_sample(state.store.as_ref(), &state.engine, &sample).await?;
  Ok(Json(outcome))
}
