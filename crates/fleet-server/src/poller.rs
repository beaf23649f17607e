//! Background telemetry poller.
//!
//! Every tick, each vehicle with a non-delivered shipment is asked for its
//! latest fix and the fix is pushed through the poll cycle. A failing vehicle
//! is logged and skipped; it never stops the loop.

use std::{collections::HashSet, sync::Arc, time::Duration};

use fleet_core::{
  Error as CoreError,
  engine::StatusEngine,
  poll::process_sample,
  store::{FixStore, LocationRegistry, ShipmentStore},
  telemetry::TelemetrySource,
};
use tokio::time::MissedTickBehavior;

/// What one tick did.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct PollStats {
  /// Vehicles that produced a sample.
  pub polled:       usize,
  pub transitioned: usize,
  pub failed:       usize,
}

/// Poll every vehicle with an active shipment once.
///
/// Only listing the shipments can fail the whole tick.
pub async fn poll_once<S, T>(
  store: &S,
  source: &T,
  engine: &StatusEngine,
) -> Result<PollStats, S::Error>
where
  S: ShipmentStore + LocationRegistry + FixStore,
  T: TelemetrySource,
{
  let shipments = store.list_shipments().await?;
  let mut stats = PollStats::default();
  let mut seen = HashSet::new();

  // Newest first, so a vehicle is polled for the shipment the cycle will
  // resolve it to.
  for shipment in shipments.iter().rev() {
    if shipment.status.is_terminal() {
      continue;
    }
    let Some(vehicle_id) = shipment.vehicle_id() else {
      continue;
    };
    if !seen.insert(vehicle_id.to_owned()) {
      continue;
    }

    let sample = match source.latest(shipment).await {
      Ok(Some(sample)) => sample,
      Ok(None) => continue,
      Err(e) => {
        tracing::warn!(vehicle = vehicle_id, error = %e, "telemetry source failed");
        stats.failed += 1;
        continue;
      }
    };
    stats.polled += 1;

    match process_sample(store, engine, &sample).await {
      Ok(outcome) => {
        if outcome.evaluation.is_transition() {
          stats.transitioned += 1;
        }
      }
      Err(e @ CoreError::InvalidSample { .. }) => {
        tracing::warn!(vehicle = vehicle_id, error = %e, "dropping sample");
        stats.failed += 1;
      }
      Err(e @ CoreError::ShipmentNotFound { .. }) => {
        tracing::debug!(vehicle = vehicle_id, error = %e, "no active shipment");
      }
      Err(e) => {
        tracing::error!(vehicle = vehicle_id, error = %e, "poll failed");
        stats.failed += 1;
      }
    }
  }

  Ok(stats)
}

/// Run [`poll_once`] every `every` until the task is dropped.
pub async fn run<S, T>(
  store: Arc<S>,
  source: Arc<T>,
  engine: Arc<StatusEngine>,
  every: Duration,
) where
  S: ShipmentStore + LocationRegistry + FixStore,
  T: TelemetrySource,
{
  let mut ticker = tokio::time::interval(every);
  ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

  tracing::info!(interval_secs = every.as_secs(), "telemetry poller started");
  loop {
    ticker.tick().await;
    match poll_once(store.as_ref(), source.as_ref(), &engine).await {
      Ok(stats) => tracing::debug!(?stats, "poll tick done"),
      Err(e) => tracing::error!(error = %e, "could not list shipments"),
    }
  }
}
