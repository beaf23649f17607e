//! Shipments, their status enum, and the append-only status history.
//!
//! A shipment's `status` field and the last entry of its `status_history`
//! always agree. Every mutation of the status goes through
//! [`Shipment::record_transition`], which appends exactly one entry and keeps
//! timestamps non-decreasing.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{EnumIter, EnumString, IntoEnumIterator as _, IntoStaticStr};
use uuid::Uuid;

use crate::{Error, Result, fleet::Assignment, geo::Position};

// ─── Status ──────────────────────────────────────────────────────────────────

/// Lifecycle status of a shipment. Declaration order is the display order of
/// the timeline.
#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  PartialOrd,
  Ord,
  Hash,
  Serialize,
  Deserialize,
  strum::Display,
  EnumIter,
  EnumString,
  IntoStaticStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Status {
  Loading,
  Loaded,
  InTransit,
  Customs,
  Ferry,
  EnRoute,
  AtCustomerSite,
  Delivered,
}

impl Status {
  /// Delivered is absorbing: no automatic transition ever leaves it.
  pub fn is_terminal(self) -> bool { matches!(self, Self::Delivered) }

  /// The stop kind that makes this status relevant, for the conditional
  /// statuses.
  fn required_stop(self) -> Option<StopKind> {
    match self {
      Self::Customs => Some(StopKind::Customs),
      Self::Ferry => Some(StopKind::Ferry),
      _ => None,
    }
  }
}

// ─── Stops ───────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StopKind {
  Pickup,
  Customs,
  Ferry,
  Delivery,
}

/// A named point on the route with its planned and actual arrival.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Stop {
  pub name:            String,
  pub position:        Position,
  pub kind:            StopKind,
  pub planned_arrival: DateTime<Utc>,
  #[serde(default)]
  pub actual_arrival:  Option<DateTime<Utc>>,
}

// ─── References ──────────────────────────────────────────────────────────────

/// A truck or trailer assigned to a shipment. For the truck, `vehicle_id` is
/// the key telemetry samples are reported under. The registration is filled
/// in from the vehicle registry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VehicleRef {
  pub vehicle_id:   String,
  #[serde(default)]
  pub registration: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DriverRef {
  pub driver_id: Uuid,
  #[serde(default)]
  pub name:      String,
}

/// The customer. `client_id` links to the client registry; without it the
/// client is free text.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientRef {
  #[serde(default)]
  pub client_id: Option<Uuid>,
  /// Refreshed from the registry when `client_id` is set.
  #[serde(default)]
  pub name:      String,
  #[serde(default)]
  pub reference: Option<String>,
}

// ─── History ─────────────────────────────────────────────────────────────────

/// One entry of the append-only status history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusChange {
  pub status:    Status,
  pub timestamp: DateTime<Utc>,
  pub position:  Option<Position>,
}

// ─── Shipment ────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Shipment {
  pub shipment_id:      Uuid,
  pub tracking_code:    String,
  pub description:      String,
  pub status:           Status,
  pub current_position: Option<Position>,
  pub origin:           Stop,
  pub destination:      Stop,
  /// Intermediate stops, in route order.
  pub stops:            Vec<Stop>,
  pub vehicle:          Option<VehicleRef>,
  pub trailer:          Option<VehicleRef>,
  pub driver:           Option<DriverRef>,
  pub client:           ClientRef,
  pub departure_time:   DateTime<Utc>,
  pub eta:              DateTime<Utc>,
  pub created_at:       DateTime<Utc>,
  pub status_history:   Vec<StatusChange>,
  /// Optimistic-concurrency counter, bumped by the store on every save.
  pub version:          u64,
}

/// Input to [`crate::store::ShipmentStore::create_shipment`].
/// The id, creation time, seed history and version are set by the store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewShipment {
  pub tracking_code:    String,
  #[serde(default)]
  pub description:      String,
  #[serde(default = "initial_status")]
  pub status:           Status,
  #[serde(default)]
  pub current_position: Option<Position>,
  pub origin:           Stop,
  pub destination:      Stop,
  #[serde(default)]
  pub stops:            Vec<Stop>,
  #[serde(default)]
  pub vehicle:          Option<VehicleRef>,
  #[serde(default)]
  pub trailer:          Option<VehicleRef>,
  #[serde(default)]
  pub driver:           Option<DriverRef>,
  #[serde(default)]
  pub client:           ClientRef,
  pub departure_time:   DateTime<Utc>,
  pub eta:              DateTime<Utc>,
}

fn initial_status() -> Status { Status::Loading }

/// An administrative edit. `None` leaves a field untouched.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ShipmentUpdate {
  pub tracking_code:    Option<String>,
  pub description:      Option<String>,
  pub status:           Option<Status>,
  pub current_position: Option<Position>,
  pub origin:           Option<Stop>,
  pub destination:      Option<Stop>,
  pub stops:            Option<Vec<Stop>>,
  pub vehicle:          Option<VehicleRef>,
  pub trailer:          Option<VehicleRef>,
  pub driver:           Option<DriverRef>,
  pub client:           Option<ClientRef>,
  pub departure_time:   Option<DateTime<Utc>>,
  pub eta:              Option<DateTime<Utc>>,
}

impl NewShipment {
  pub fn assignment_mut(&mut self) -> Assignment<'_> {
    Assignment {
      vehicle: self.vehicle.as_mut(),
      trailer: self.trailer.as_mut(),
      driver:  self.driver.as_mut(),
      client:  Some(&mut self.client),
    }
  }

  pub fn validate(&self) -> Result<()> {
    if self.tracking_code.trim().is_empty() {
      return Err(Error::EmptyTrackingCode);
    }
    validate_route(
      self.current_position.as_ref(),
      &self.origin,
      &self.destination,
      &self.stops,
    )
  }
}

impl ShipmentUpdate {
  /// Only the references this edit replaces.
  pub fn assignment_mut(&mut self) -> Assignment<'_> {
    Assignment {
      vehicle: self.vehicle.as_mut(),
      trailer: self.trailer.as_mut(),
      driver:  self.driver.as_mut(),
      client:  self.client.as_mut(),
    }
  }
}

fn validate_route(
  current: Option<&Position>,
  origin: &Stop,
  destination: &Stop,
  stops: &[Stop],
) -> Result<()> {
  if let Some(p) = current {
    p.validate()?;
  }
  origin.position.validate()?;
  destination.position.validate()?;
  stops.iter().try_for_each(|s| s.position.validate())
}

impl Shipment {
  /// Build a shipment from `input` with a single seed history entry.
  pub fn create(
    shipment_id: Uuid,
    input: NewShipment,
    now: DateTime<Utc>,
  ) -> Result<Self> {
    input.validate()?;
    let seed = StatusChange {
      status:    input.status,
      timestamp: now,
      position:  input.current_position,
    };
    Ok(Self {
      shipment_id,
      tracking_code: input.tracking_code.trim().to_owned(),
      description: input.description,
      status: input.status,
      current_position: input.current_position,
      origin: input.origin,
      destination: input.destination,
      stops: input.stops,
      vehicle: input.vehicle,
      trailer: input.trailer,
      driver: input.driver,
      client: input.client,
      departure_time: input.departure_time,
      eta: input.eta,
      created_at: now,
      status_history: vec![seed],
      version: 0,
    })
  }

  pub fn latest_change(&self) -> Option<&StatusChange> {
    self.status_history.last()
  }

  pub fn vehicle_id(&self) -> Option<&str> {
    self.vehicle.as_ref().map(|v| v.vehicle_id.as_str())
  }

  /// Move to `status`, appending one history entry.
  ///
  /// Returns `false` without touching anything if the shipment already has
  /// that status. `at` is raised to the previous entry's timestamp if the
  /// clock went backwards.
  pub fn record_transition(
    &mut self,
    status: Status,
    at: DateTime<Utc>,
    position: Option<Position>,
  ) -> bool {
    if status == self.status {
      return false;
    }
    let timestamp = match self.latest_change() {
      Some(last) if last.timestamp > at => last.timestamp,
      _ => at,
    };
    self.status_history.push(StatusChange { status, timestamp, position });
    self.status = status;
    true
  }

  /// Apply an administrative edit. A status change is logged at the shipment's
  /// current position.
  pub fn apply_update(
    &mut self,
    update: ShipmentUpdate,
    now: DateTime<Utc>,
  ) -> Result<()> {
    if let Some(code) = &update.tracking_code
      && code.trim().is_empty()
    {
      return Err(Error::EmptyTrackingCode);
    }
    validate_route(
      update.current_position.as_ref(),
      update.origin.as_ref().unwrap_or(&self.origin),
      update.destination.as_ref().unwrap_or(&self.destination),
      update.stops.as_deref().unwrap_or(&self.stops),
    )?;

    if let Some(code) = update.tracking_code {
      self.tracking_code = code.trim().to_owned();
    }
    if let Some(description) = update.description {
      self.description = description;
    }
    if let Some(position) = update.current_position {
      self.current_position = Some(position);
    }
    if let Some(origin) = update.origin {
      self.origin = origin;
    }
    if let Some(destination) = update.destination {
      self.destination = destination;
    }
    if let Some(stops) = update.stops {
      self.stops = stops;
    }
    if let Some(vehicle) = update.vehicle {
      self.vehicle = Some(vehicle);
    }
    if let Some(trailer) = update.trailer {
      self.trailer = Some(trailer);
    }
    if let Some(driver) = update.driver {
      self.driver = Some(driver);
    }
    if let Some(client) = update.client {
      self.client = client;
    }
    if let Some(departure) = update.departure_time {
      self.departure_time = departure;
    }
    if let Some(eta) = update.eta {
      self.eta = eta;
    }
    if let Some(status) = update.status {
      let position = self.current_position;
      self.record_transition(status, now, position);
    }
    Ok(())
  }

  /// Check the history invariants: non-empty, non-decreasing timestamps, and
  /// the latest entry agrees with `status`.
  pub fn check_history(&self) -> Result<()> {
    let latest = self
      .latest_change()
      .ok_or(Error::EmptyHistory(self.shipment_id))?;
    if let Some(index) = self
      .status_history
      .windows(2)
      .position(|w| w[0].timestamp > w[1].timestamp)
    {
      return Err(Error::NonMonotonicHistory {
        shipment_id: self.shipment_id,
        index:       index + 1,
      });
    }
    if latest.status != self.status {
      return Err(Error::HistoryDiverged {
        shipment_id: self.shipment_id,
        status:      self.status,
        latest:      latest.status,
      });
    }
    Ok(())
  }

  fn has_stop(&self, kind: StopKind) -> bool {
    self.stops.iter().any(|s| s.kind == kind)
  }

  /// The statuses worth showing for this shipment, in display order.
  ///
  /// Customs and Ferry only appear if the route has a stop of that kind, or
  /// the shipment has actually been in that status.
  pub fn relevant_statuses(&self) -> Vec<Status> {
    Status::iter()
      .filter(|status| match status.required_stop() {
        None => true,
        Some(kind) => {
          self.has_stop(kind)
            || self.status_history.iter().any(|c| c.status == *status)
        }
      })
      .collect()
  }

  /// Display timeline: each relevant status with its progress state and the
  /// most recent time it was entered.
  pub fn timeline(&self) -> Vec<TimelineStep> {
    self
      .relevant_statuses()
      .into_iter()
      .map(|status| TimelineStep {
        status,
        state: match status.cmp(&self.status) {
          std::cmp::Ordering::Less => StepState::Done,
          std::cmp::Ordering::Equal => StepState::Current,
          std::cmp::Ordering::Greater => StepState::Pending,
        },
        reached_at: self
          .status_history
          .iter()
          .rev()
          .find(|c| c.status == status)
          .map(|c| c.timestamp),
      })
      .collect()
  }
}

// ─── Timeline ────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StepState {
  Done,
  Current,
  Pending,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimelineStep {
  pub status:     Status,
  pub state:      StepState,
  pub reached_at: Option<DateTime<Utc>>,
}

#[cfg(test)]
pub(crate) mod tests {
  use chrono::{Duration, TimeZone};

  use super::*;

  pub(crate) fn t(secs: i64) -> DateTime<Utc> {
    Utc.timestamp_opt(1_700_000_000 + secs, 0).unwrap()
  }

  pub(crate) fn stop(name: &str, position: Position, kind: StopKind) -> Stop {
    Stop {
      name: name.into(),
      position,
      kind,
      planned_arrival: t(0),
      actual_arrival: None,
    }
  }

  pub(crate) fn new_shipment(status: Status, destination: Position) -> NewShipment {
    NewShipment {
      tracking_code:    "TRK-001".into(),
      description:      "Pallets".into(),
      status,
      current_position: Some(Position::new(48.8566, 2.3522)),
      origin:           stop("Paris", Position::new(48.8566, 2.3522), StopKind::Pickup),
      destination:      stop("Lyon", destination, StopKind::Delivery),
      stops:            vec![],
      vehicle:          Some(VehicleRef {
        vehicle_id:   "truck-001".into(),
        registration: "AB-123-CD".into(),
      }),
      trailer:          None,
      driver:           None,
      client:           ClientRef::default(),
      departure_time:   t(0),
      eta:              t(0) + Duration::hours(6),
    }
  }

  pub(crate) fn shipment(status: Status, destination: Position) -> Shipment {
    Shipment::create(Uuid::new_v4(), new_shipment(status, destination), t(0))
      .unwrap()
  }

  const LYON: Position = Position::new(45.7578, 4.8320);

  #[test]
  fn create_seeds_one_history_entry() {
    let s = shipment(Status::Loaded, LYON);
    assert_eq!(s.status_history.len(), 1);
    assert_eq!(s.status_history[0].status, Status::Loaded);
    assert_eq!(s.status_history[0].position, s.current_position);
    assert_eq!(s.version, 0);
    s.check_history().unwrap();
  }

  #[test]
  fn create_rejects_blank_tracking_code() {
    let mut input = new_shipment(Status::Loading, LYON);
    input.tracking_code = "  ".into();
    let err = Shipment::create(Uuid::new_v4(), input, t(0)).unwrap_err();
    assert!(matches!(err, Error::EmptyTrackingCode));
  }

  #[test]
  fn create_rejects_bad_destination() {
    let input = new_shipment(Status::Loading, Position::new(95.0, 0.0));
    let err = Shipment::create(Uuid::new_v4(), input, t(0)).unwrap_err();
    assert!(matches!(err, Error::InvalidPosition { .. }));
  }

  #[test]
  fn same_status_transition_is_noop() {
    let mut s = shipment(Status::Loaded, LYON);
    assert!(!s.record_transition(Status::Loaded, t(10), None));
    assert_eq!(s.status_history.len(), 1);
  }

  #[test]
  fn transition_clamps_backwards_clock() {
    let mut s = shipment(Status::Loaded, LYON);
    assert!(s.record_transition(Status::InTransit, t(-60), None));
    assert_eq!(s.status_history[1].timestamp, t(0));
    s.check_history().unwrap();
  }

  #[test]
  fn check_history_detects_divergence() {
    let mut s = shipment(Status::Loaded, LYON);
    s.status = Status::Ferry;
    assert!(matches!(s.check_history(), Err(Error::HistoryDiverged { .. })));
  }

  #[test]
  fn check_history_detects_time_travel() {
    let mut s = shipment(Status::Loaded, LYON);
    s.status_history.push(StatusChange {
      status:    Status::InTransit,
      timestamp: t(-1),
      position:  None,
    });
    s.status = Status::InTransit;
    assert!(matches!(
      s.check_history(),
      Err(Error::NonMonotonicHistory { index: 1, .. })
    ));
  }

  #[test]
  fn admin_status_edit_logs_current_position() {
    let mut s = shipment(Status::Loaded, LYON);
    let update = ShipmentUpdate {
      status: Some(Status::Delivered),
      description: Some("Pallets (signed)".into()),
      ..Default::default()
    };
    s.apply_update(update, t(100)).unwrap();
    assert_eq!(s.status, Status::Delivered);
    assert_eq!(s.description, "Pallets (signed)");
    let last = s.latest_change().unwrap();
    assert_eq!(last.timestamp, t(100));
    assert_eq!(last.position, s.current_position);
  }

  #[test]
  fn admin_edit_without_status_change_keeps_history() {
    let mut s = shipment(Status::Loaded, LYON);
    let update = ShipmentUpdate {
      status: Some(Status::Loaded),
      ..Default::default()
    };
    s.apply_update(update, t(100)).unwrap();
    assert_eq!(s.status_history.len(), 1);
  }

  #[test]
  fn timeline_hides_conditional_statuses() {
    let s = shipment(Status::InTransit, LYON);
    let statuses = s.relevant_statuses();
    assert!(!statuses.contains(&Status::Customs));
    assert!(!statuses.contains(&Status::Ferry));
    assert_eq!(statuses.len(), 6);
  }

  #[test]
  fn timeline_shows_ferry_when_route_has_ferry_stop() {
    let mut s = shipment(Status::Loaded, LYON);
    s.stops.push(stop("Calais", Position::new(50.9692, 1.8431), StopKind::Ferry));
    assert!(s.relevant_statuses().contains(&Status::Ferry));
    assert!(!s.relevant_statuses().contains(&Status::Customs));
  }

  #[test]
  fn timeline_states_and_dates() {
    let mut s = shipment(Status::Loading, LYON);
    s.record_transition(Status::Loaded, t(10), None);
    s.record_transition(Status::InTransit, t(20), None);

    let steps = s.timeline();
    assert_eq!(steps[0].status, Status::Loading);
    assert_eq!(steps[0].state, StepState::Done);
    assert_eq!(steps[0].reached_at, Some(t(0)));
    assert_eq!(steps[2].status, Status::InTransit);
    assert_eq!(steps[2].state, StepState::Current);
    assert_eq!(steps[2].reached_at, Some(t(20)));
    assert_eq!(steps[3].state, StepState::Pending);
    assert_eq!(steps[3].reached_at, None);
  }

  #[test]
  fn status_string_forms() {
    let s: &'static str = Status::AtCustomerSite.into();
    assert_eq!(s, "at_customer_site");
    assert_eq!(Status::InTransit.to_string(), "in_transit");
    assert_eq!("en_route".parse::<Status>().unwrap(), Status::EnRoute);
    assert!(Status::Loaded < Status::InTransit);
    assert!(Status::Delivered.is_terminal());
  }
}
