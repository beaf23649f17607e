//! The status inference engine.
//!
//! On every telemetry poll the engine runs a fixed chain of rules against the
//! sample. Each rule may propose a new status; a later proposal overrides an
//! earlier one, and a rule never proposes the status already chosen. If the
//! final candidate differs from the shipment's status, exactly one history
//! entry is appended.
//!
//! The rules are independent triggers, not a transition table: a shipment can
//! go straight from `Loaded` to `AtCustomerSite`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{
  Result,
  geo::within_radius_km,
  location::{Location, LocationKind},
  shipment::{Shipment, Status},
  telemetry::TelemetrySample,
};

/// Tunable thresholds of the rule chain.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
  /// Speeds strictly above this mark the shipment as in transit.
  pub transit_speed_kmh:       f64,
  /// Distance to the destination at or below which the truck is on site.
  pub customer_site_radius_km: f64,
}

impl Default for EngineConfig {
  fn default() -> Self {
    Self { transit_speed_kmh: 80.0, customer_site_radius_km: 0.5 }
  }
}

/// Result of one evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum Evaluation {
  Unchanged,
  Transitioned { from: Status, to: Status },
}

impl Evaluation {
  pub fn is_transition(&self) -> bool { matches!(self, Self::Transitioned { .. }) }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Rule {
  Speed,
  Ferry,
  CustomerSite,
}

/// Evaluation order. Later rules win.
const RULES: [Rule; 3] = [Rule::Speed, Rule::Ferry, Rule::CustomerSite];

impl Rule {
  fn target(self) -> Status {
    match self {
      Self::Speed => Status::InTransit,
      Self::Ferry => Status::Ferry,
      Self::CustomerSite => Status::AtCustomerSite,
    }
  }

  fn matches(
    self,
    config: &EngineConfig,
    shipment: &Shipment,
    sample: &TelemetrySample,
    locations: &[Location],
  ) -> bool {
    match self {
      Self::Speed => sample.speed_kmh > config.transit_speed_kmh,
      Self::Ferry => locations
        .iter()
        .filter(|l| l.active && l.kind == LocationKind::Ferry)
        .find(|l| l.contains(&sample.position))
        .inspect(|l| {
          tracing::debug!(
            vehicle = %sample.vehicle_id,
            ferry = %l.name,
            "vehicle inside ferry geofence"
          );
        })
        .is_some(),
      Self::CustomerSite => within_radius_km(
        sample.position.distance_km(&shipment.destination.position),
        config.customer_site_radius_km,
      ),
    }
  }
}

/// Applies the rule chain to shipments.
#[derive(Debug, Clone, Default)]
pub struct StatusEngine {
  config: EngineConfig,
}

impl StatusEngine {
  pub fn new(config: EngineConfig) -> Self { Self { config } }

  pub fn config(&self) -> &EngineConfig { &self.config }

  /// The status the rule chain settles on, without touching the shipment.
  ///
  /// `locations` should be the active geofences in registry order; inactive
  /// and non-ferry entries are skipped anyway.
  pub fn infer(
    &self,
    shipment: &Shipment,
    sample: &TelemetrySample,
    locations: &[Location],
  ) -> Status {
    let mut candidate = shipment.status;
    for rule in RULES {
      let target = rule.target();
      if target != candidate
        && rule.matches(&self.config, shipment, sample, locations)
      {
        tracing::debug!(
          tracking_code = %shipment.tracking_code,
          ?rule,
          from = %candidate,
          to = %target,
          "rule matched"
        );
        candidate = target;
      }
    }
    candidate
  }

  /// Run the rule chain and commit at most one transition.
  ///
  /// The sample is validated first; an invalid sample leaves the shipment
  /// untouched. Delivered shipments are never evaluated.
  pub fn evaluate(
    &self,
    shipment: &mut Shipment,
    sample: &TelemetrySample,
    locations: &[Location],
    now: DateTime<Utc>,
  ) -> Result<Evaluation> {
    sample.validate()?;

    if shipment.status.is_terminal() {
      return Ok(Evaluation::Unchanged);
    }

    let from = shipment.status;
    let to = self.infer(shipment, sample, locations);
    if !shipment.record_transition(to, now, Some(sample.position)) {
      return Ok(Evaluation::Unchanged);
    }

    tracing::info!(
      tracking_code = %shipment.tracking_code,
      vehicle = %sample.vehicle_id,
      speed_kmh = sample.speed_kmh,
      %from,
      %to,
      "shipment status changed"
    );
    Ok(Evaluation::Transitioned { from, to })
  }
}

#[cfg(test)]
mod tests {
  use uuid::Uuid;

  use super::*;
  use crate::{
    Error,
    geo::Position,
    location::NewLocation,
    shipment::tests::{shipment, t},
  };

  const LYON: Position = Position::new(45.7578, 4.8320);
  const CALAIS_FERRY: Position = Position::new(50.966667, 1.85);
  const BORDEAUX: Position = Position::new(44.8378, -0.5792);

  fn sample(position: Position, speed_kmh: f64) -> TelemetrySample {
    TelemetrySample {
      vehicle_id: "truck-001".into(),
      position,
      speed_kmh,
      ignition: true,
      door_open: false,
      recorded_at: t(0),
    }
  }

  fn ferry(position: Position, radius_m: u32) -> Location {
    NewLocation::new("Terminal Calais", LocationKind::Ferry, position)
      .with_radius(radius_m)
      .into_location(Uuid::new_v4())
      .unwrap()
  }

  fn engine() -> StatusEngine { StatusEngine::default() }

  #[test]
  fn at_destination_goes_to_customer_site() {
    let mut s = shipment(Status::Loaded, LYON);
    let out = engine().evaluate(&mut s, &sample(LYON, 0.0), &[], t(60)).unwrap();

    assert_eq!(out, Evaluation::Transitioned {
      from: Status::Loaded,
      to:   Status::AtCustomerSite,
    });
    assert_eq!(s.status, Status::AtCustomerSite);
    assert_eq!(s.status_history.len(), 2);
    let last = s.latest_change().unwrap();
    assert_eq!(last.status, Status::AtCustomerSite);
    assert_eq!(last.position, Some(LYON));
    assert_eq!(last.timestamp, t(60));
  }

  #[test]
  fn fast_and_far_goes_to_in_transit_only() {
    let mut s = shipment(Status::Loaded, LYON);
    let out = engine()
      .evaluate(&mut s, &sample(BORDEAUX, 95.0), &[], t(60))
      .unwrap();

    assert_eq!(out, Evaluation::Transitioned {
      from: Status::Loaded,
      to:   Status::InTransit,
    });
    assert_eq!(s.status_history.len(), 2);
  }

  #[test]
  fn leaving_ferry_zone_slowly_changes_nothing() {
    let mut s = shipment(Status::Ferry, LYON);
    let ferries = [ferry(CALAIS_FERRY, 1000)];
    let out = engine()
      .evaluate(&mut s, &sample(BORDEAUX, 10.0), &ferries, t(60))
      .unwrap();

    assert_eq!(out, Evaluation::Unchanged);
    assert_eq!(s.status, Status::Ferry);
    assert_eq!(s.status_history.len(), 1);
  }

  #[test]
  fn invalid_sample_leaves_shipment_untouched() {
    let mut s = shipment(Status::Loaded, LYON);
    let before = s.clone();
    let err = engine()
      .evaluate(&mut s, &sample(Position::new(200.0, 4.0), 0.0), &[], t(60))
      .unwrap_err();

    assert!(matches!(err, Error::InvalidSample { .. }));
    assert_eq!(s, before);
  }

  #[test]
  fn repeated_sample_is_idempotent() {
    let mut s = shipment(Status::Loaded, LYON);
    let e = engine();
    let sm = sample(LYON, 0.0);

    assert!(e.evaluate(&mut s, &sm, &[], t(60)).unwrap().is_transition());
    assert_eq!(e.evaluate(&mut s, &sm, &[], t(90)).unwrap(), Evaluation::Unchanged);
    assert_eq!(s.status_history.len(), 2);
  }

  #[test]
  fn delivered_is_absorbing() {
    let mut s = shipment(Status::Delivered, LYON);
    let ferries = [ferry(CALAIS_FERRY, 1000)];
    let e = engine();
    for sm in [
      sample(LYON, 0.0),
      sample(BORDEAUX, 120.0),
      sample(CALAIS_FERRY, 5.0),
    ] {
      assert_eq!(e.evaluate(&mut s, &sm, &ferries, t(60)).unwrap(), Evaluation::Unchanged);
    }
    assert_eq!(s.status, Status::Delivered);
    assert_eq!(s.status_history.len(), 1);
  }

  #[test]
  fn speed_threshold_is_strict() {
    let e = engine();

    let mut s = shipment(Status::Loaded, LYON);
    e.evaluate(&mut s, &sample(BORDEAUX, 80.0), &[], t(60)).unwrap();
    assert_eq!(s.status, Status::Loaded);

    e.evaluate(&mut s, &sample(BORDEAUX, 80.01), &[], t(60)).unwrap();
    assert_eq!(s.status, Status::InTransit);
  }

  const ORIGIN: Position = Position::new(0.0, 0.0);

  /// A point north of `ORIGIN` whose haversine distance to it is exactly `km`,
  /// plus one just past it. Bisects over the bit patterns of the (positive)
  /// latitude; if no pattern near the crossing lands on `km` exactly, a tiny
  /// longitude offset gives another row to search.
  fn on_and_past_boundary(km: f64) -> (Position, Position) {
    let at = |lat_bits: u64, lng: f64| Position::new(f64::from_bits(lat_bits), lng);
    for row in 0..64 {
      let lng = f64::from(row) * 1e-9;
      let (mut lo, mut hi) = (0.0f64.to_bits(), 1.0f64.to_bits());
      while hi - lo > 1 {
        let mid = lo + (hi - lo) / 2;
        if ORIGIN.distance_km(&at(mid, lng)) < km {
          lo = mid;
        } else {
          hi = mid;
        }
      }
      let Some(on) = (hi - 4..=hi + 4).find(|&b| ORIGIN.distance_km(&at(b, lng)) == km)
      else {
        continue;
      };
      let past = (on + 1..on + 1000)
        .find(|&b| ORIGIN.distance_km(&at(b, lng)) > km)
        .unwrap();
      return (at(on, lng), at(past, lng));
    }
    panic!("no position lands exactly {km} km from the origin");
  }

  #[test]
  fn ferry_boundary_is_inclusive() {
    let (on, past) = on_and_past_boundary(1.0);
    let ferries = [ferry(ORIGIN, 1000)];
    assert_eq!(ORIGIN.distance_km(&on), ferries[0].radius_km());
    let e = engine();

    let mut s = shipment(Status::InTransit, LYON);
    e.evaluate(&mut s, &sample(past, 20.0), &ferries, t(60)).unwrap();
    assert_eq!(s.status, Status::InTransit);

    e.evaluate(&mut s, &sample(on, 20.0), &ferries, t(60)).unwrap();
    assert_eq!(s.status, Status::Ferry);
  }

  #[test]
  fn customer_site_boundary_is_inclusive() {
    let (on, past) = on_and_past_boundary(0.5);
    let e = engine();

    let mut s = shipment(Status::Loaded, ORIGIN);
    e.evaluate(&mut s, &sample(past, 0.0), &[], t(60)).unwrap();
    assert_eq!(s.status, Status::Loaded);

    let out = e.evaluate(&mut s, &sample(on, 0.0), &[], t(60)).unwrap();
    assert_eq!(out, Evaluation::Transitioned {
      from: Status::Loaded,
      to:   Status::AtCustomerSite,
    });
  }

  #[test]
  fn configured_site_radius_equal_to_distance_matches() {
    let near = Position::new(LYON.lat + 0.004, LYON.lng);
    let d = LYON.distance_km(&near);
    let with_radius = |radius_km| {
      StatusEngine::new(EngineConfig {
        customer_site_radius_km: radius_km,
        ..EngineConfig::default()
      })
    };

    let mut s = shipment(Status::Loaded, LYON);
    with_radius(d - 1e-12)
      .evaluate(&mut s, &sample(near, 0.0), &[], t(60))
      .unwrap();
    assert_eq!(s.status, Status::Loaded);

    with_radius(d).evaluate(&mut s, &sample(near, 0.0), &[], t(60)).unwrap();
    assert_eq!(s.status, Status::AtCustomerSite);
  }

  #[test]
  fn inactive_and_non_ferry_locations_are_ignored() {
    let mut inactive = ferry(CALAIS_FERRY, 1000);
    inactive.active = false;
    let customs = NewLocation::new("Douane", LocationKind::Customs, CALAIS_FERRY)
      .into_location(Uuid::new_v4())
      .unwrap();

    let mut s = shipment(Status::InTransit, LYON);
    let out = engine()
      .evaluate(&mut s, &sample(CALAIS_FERRY, 0.0), &[inactive, customs], t(60))
      .unwrap();
    assert_eq!(out, Evaluation::Unchanged);
  }

  #[test]
  fn later_rule_overrides_earlier_with_one_entry() {
    // Speeding through the destination radius: the customer-site rule wins
    // and only one entry is written.
    let mut s = shipment(Status::Loaded, LYON);
    let out = engine().evaluate(&mut s, &sample(LYON, 95.0), &[], t(60)).unwrap();

    assert_eq!(out, Evaluation::Transitioned {
      from: Status::Loaded,
      to:   Status::AtCustomerSite,
    });
    assert_eq!(s.status_history.len(), 2);
  }

  #[test]
  fn override_back_to_current_status_writes_nothing() {
    // On the ferry and fast: speed proposes InTransit, the ferry rule puts it
    // back, so nothing changes.
    let mut s = shipment(Status::Ferry, LYON);
    let ferries = [ferry(CALAIS_FERRY, 1000)];
    let out = engine()
      .evaluate(&mut s, &sample(CALAIS_FERRY, 95.0), &ferries, t(60))
      .unwrap();
    assert_eq!(out, Evaluation::Unchanged);
    assert_eq!(s.status_history.len(), 1);
  }

  #[test]
  fn history_stays_monotonic_across_polls() {
    let mut s = shipment(Status::Loading, LYON);
    let ferries = [ferry(CALAIS_FERRY, 1000)];
    let e = engine();
    e.evaluate(&mut s, &sample(BORDEAUX, 90.0), &ferries, t(30)).unwrap();
    e.evaluate(&mut s, &sample(CALAIS_FERRY, 10.0), &ferries, t(20)).unwrap();
    e.evaluate(&mut s, &sample(LYON, 0.0), &ferries, t(90)).unwrap();

    assert_eq!(s.status_history.len(), 4);
    s.check_history().unwrap();
  }

  #[test]
  fn custom_thresholds() {
    let e = StatusEngine::new(EngineConfig {
      transit_speed_kmh:       50.0,
      customer_site_radius_km: 0.1,
    });
    let mut s = shipment(Status::Loaded, LYON);
    e.evaluate(&mut s, &sample(BORDEAUX, 60.0), &[], t(60)).unwrap();
    assert_eq!(s.status, Status::InTransit);
  }
}
