//! One telemetry poll: read the shipment, evaluate, conditionally save.
//!
//! A valid sample for a vehicle with an active shipment is also kept as that
//! vehicle's latest fix, whether or not the status changes.
//!
//! Saves are optimistic. When the store reports a conflict the whole cycle is
//! redone against a freshly read shipment, so history written by a concurrent
//! writer is never merged with ours.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
  Error, Result,
  engine::{Evaluation, StatusEngine},
  location::LocationKind,
  shipment::Shipment,
  store::{FixStore, LocationRegistry, ShipmentStore, StoreError},
  telemetry::TelemetrySample,
};

/// Attempts at the read-evaluate-save cycle before giving up on a poll.
pub const MAX_SAVE_ATTEMPTS: u32 = 3;

/// What a poll did to the vehicle's shipment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PollOutcome {
  pub shipment_id:   Uuid,
  pub tracking_code: String,
  #[serde(flatten)]
  pub evaluation:    Evaluation,
}

impl PollOutcome {
  fn new(shipment: &Shipment, evaluation: Evaluation) -> Self {
    Self {
      shipment_id: shipment.shipment_id,
      tracking_code: shipment.tracking_code.clone(),
      evaluation,
    }
  }
}

fn store_err<E: StoreError>(e: E) -> Error { Error::Store(Box::new(e)) }

/// Run the status engine for the shipment currently assigned to the sample's
/// vehicle.
///
/// Fails with [`Error::InvalidSample`] before touching the store if the sample
/// is malformed, and with [`Error::ShipmentNotFound`] if the vehicle has no
/// active shipment.
pub async fn process_sample<S>(
  store: &S,
  engine: &StatusEngine,
  sample: &TelemetrySample,
) -> Result<PollOutcome>
where
  S: ShipmentStore + LocationRegistry + FixStore,
{
  sample.validate()?;

  let ferries = store
    .list_active(Some(LocationKind::Ferry))
    .await
    .map_err(store_err)?;

  let mut attempt = 0;
  loop {
    attempt += 1;

    let mut shipment = store
      .find_active_by_vehicle(&sample.vehicle_id)
      .await
      .map_err(store_err)?
      .ok_or_else(|| Error::ShipmentNotFound {
        vehicle_id: sample.vehicle_id.clone(),
      })?;

    if attempt == 1 && !store.record_fix(sample).await.map_err(store_err)? {
      tracing::debug!(vehicle = %sample.vehicle_id, "older than the stored fix");
    }

    let evaluation = engine.evaluate(&mut shipment, sample, &ferries, Utc::now())?;
    if !evaluation.is_transition() {
      return Ok(PollOutcome::new(&shipment, evaluation));
    }

    match store.save_shipment(&shipment).await {
      Ok(saved) => return Ok(PollOutcome::new(&saved, evaluation)),
      Err(e) if e.is_conflict() && attempt < MAX_SAVE_ATTEMPTS => {
        tracing::warn!(
          tracking_code = %shipment.tracking_code,
          attempt,
          "concurrent write, re-reading shipment"
        );
      }
      Err(e) if e.is_conflict() => {
        return Err(Error::ConflictRetriesExhausted {
          shipment_id: shipment.shipment_id,
          attempts:    attempt,
        });
      }
      Err(e) => return Err(store_err(e)),
    }
  }
}
