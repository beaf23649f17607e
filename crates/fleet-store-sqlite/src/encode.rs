//! Encoding and decoding helpers between domain types and the plain-text
//! representations stored in SQLite columns.
//!
//! Timestamps are RFC 3339 strings, UUIDs hyphenated lowercase strings, enums
//! their snake_case names. The descriptive part of a shipment (route,
//! references, schedule) is one compact JSON document.

use chrono::{DateTime, Utc};
use fleet_core::{
  fleet::{Client, Driver, DriverStatus, ServiceStatus, Vehicle, VehicleKind},
  geo::Position,
  location::{Location, LocationKind},
  shipment::{
    ClientRef, DriverRef, Shipment, Status, StatusChange, Stop, VehicleRef,
  },
  telemetry::TelemetrySample,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{Error, Result};

// ─── Uuid ─────────────────────────────────────────────────────────────────────

pub fn encode_uuid(id: Uuid) -> String { id.hyphenated().to_string() }

pub fn decode_uuid(s: &str) -> Result<Uuid> { Ok(Uuid::parse_str(s)?) }

// ─── DateTime<Utc> ───────────────────────────────────────────────────────────

pub fn encode_dt(dt: DateTime<Utc>) -> String { dt.to_rfc3339() }

pub fn decode_dt(s: &str) -> Result<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(s)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|e| Error::DateParse(e.to_string()))
}

// ─── Enums ───────────────────────────────────────────────────────────────────

pub fn encode_status(s: Status) -> &'static str { s.into() }

pub fn decode_status(s: &str) -> Result<Status> {
  s.parse()
    .map_err(|_| Error::Decode(format!("unknown status: {s:?}")))
}

pub fn encode_location_kind(k: LocationKind) -> &'static str { k.into() }

pub fn decode_location_kind(s: &str) -> Result<LocationKind> {
  s.parse()
    .map_err(|_| Error::Decode(format!("unknown location kind: {s:?}")))
}

pub fn encode_vehicle_kind(k: VehicleKind) -> &'static str { k.into() }

pub fn encode_service_status(s: ServiceStatus) -> &'static str { s.into() }

pub fn encode_driver_status(s: DriverStatus) -> &'static str { s.into() }

/// Parse a snake_case enum column.
fn decode_enum<T: std::str::FromStr>(what: &str, s: &str) -> Result<T> {
  s.parse()
    .map_err(|_| Error::Decode(format!("unknown {what}: {s:?}")))
}

// ─── Shipment details ────────────────────────────────────────────────────────

/// Everything about a shipment that is not indexed or versioned on its own.
#[derive(Serialize, Deserialize)]
struct ShipmentDetails {
  description:      String,
  current_position: Option<Position>,
  origin:           Stop,
  destination:      Stop,
  stops:            Vec<Stop>,
  vehicle:          Option<VehicleRef>,
  #[serde(default)]
  trailer:          Option<VehicleRef>,
  driver:           Option<DriverRef>,
  client:           ClientRef,
  departure_time:   DateTime<Utc>,
  eta:              DateTime<Utc>,
}

fn encode_details(s: &Shipment) -> Result<String> {
  let details = ShipmentDetails {
    description:      s.description.clone(),
    current_position: s.current_position,
    origin:           s.origin.clone(),
    destination:      s.destination.clone(),
    stops:            s.stops.clone(),
    vehicle:          s.vehicle.clone(),
    trailer:          s.trailer.clone(),
    driver:           s.driver.clone(),
    client:           s.client.clone(),
    departure_time:   s.departure_time,
    eta:              s.eta,
  };
  Ok(serde_json::to_string(&details)?)
}

// ─── Row types ───────────────────────────────────────────────────────────────

/// Raw values read from a `status_history` row.
pub struct RawStatusChange {
  pub status:      String,
  pub recorded_at: String,
  pub lat:         Option<f64>,
  pub lng:         Option<f64>,
}

impl RawStatusChange {
  pub fn into_change(self) -> Result<StatusChange> {
    Ok(StatusChange {
      status:    decode_status(&self.status)?,
      timestamp: decode_dt(&self.recorded_at)?,
      position:  match (self.lat, self.lng) {
        (Some(lat), Some(lng)) => Some(Position::new(lat, lng)),
        _ => None,
      },
    })
  }
}

/// Raw values read from a `shipments` row plus its history rows.
pub struct RawShipment {
  pub shipment_id:   String,
  pub tracking_code: String,
  pub status:        String,
  pub version:       i64,
  pub created_at:    String,
  pub details_json:  String,
  pub history:       Vec<RawStatusChange>,
}

impl RawShipment {
  pub fn into_shipment(self) -> Result<Shipment> {
    let details: ShipmentDetails = serde_json::from_str(&self.details_json)?;
    let status_history = self
      .history
      .into_iter()
      .map(RawStatusChange::into_change)
      .collect::<Result<Vec<_>>>()?;

    let shipment = Shipment {
      shipment_id: decode_uuid(&self.shipment_id)?,
      tracking_code: self.tracking_code,
      description: details.description,
      status: decode_status(&self.status)?,
      current_position: details.current_position,
      origin: details.origin,
      destination: details.destination,
      stops: details.stops,
      vehicle: details.vehicle,
      trailer: details.trailer,
      driver: details.driver,
      client: details.client,
      departure_time: details.departure_time,
      eta: details.eta,
      created_at: decode_dt(&self.created_at)?,
      status_history,
      version: u64::try_from(self.version)
        .map_err(|_| Error::Decode(format!("negative version {}", self.version)))?,
    };
    shipment.check_history()?;
    Ok(shipment)
  }
}

/// Raw values read from a `locations` row.
pub struct RawLocation {
  pub location_id: String,
  pub name:        String,
  pub kind:        String,
  pub address:     Option<String>,
  pub lat:         f64,
  pub lng:         f64,
  pub radius_m:    i64,
  pub active:      bool,
}

impl RawLocation {
  pub fn into_location(self) -> Result<Location> {
    Ok(Location {
      location_id: decode_uuid(&self.location_id)?,
      name:        self.name,
      kind:        decode_location_kind(&self.kind)?,
      address:     self.address,
      position:    Position::new(self.lat, self.lng),
      radius_m:    u32::try_from(self.radius_m)
        .map_err(|_| Error::Decode(format!("bad radius {}", self.radius_m)))?,
      active:      self.active,
    })
  }
}

/// Raw values read from a `vehicles` row.
pub struct RawVehicle {
  pub vehicle_id:   String,
  pub registration: String,
  pub model:        String,
  pub year:         Option<i64>,
  pub kind:         String,
  pub status:       String,
}

impl RawVehicle {
  pub fn into_vehicle(self) -> Result<Vehicle> {
    Ok(Vehicle {
      vehicle_id:   self.vehicle_id,
      registration: self.registration,
      model:        self.model,
      year:         self
        .year
        .map(|y| u16::try_from(y).map_err(|_| Error::Decode(format!("bad year {y}"))))
        .transpose()?,
      kind:         decode_enum("vehicle kind", &self.kind)?,
      status:       decode_enum("service status", &self.status)?,
    })
  }
}

/// Raw values read from a `drivers` row.
pub struct RawDriver {
  pub driver_id: String,
  pub name:      String,
  pub phone:     Option<String>,
  pub license:   Option<String>,
  pub status:    String,
}

impl RawDriver {
  pub fn into_driver(self) -> Result<Driver> {
    Ok(Driver {
      driver_id: decode_uuid(&self.driver_id)?,
      name:      self.name,
      phone:     self.phone,
      license:   self.license,
      status:    decode_enum("driver status", &self.status)?,
    })
  }
}

/// Raw values read from a `clients` row.
pub struct RawClient {
  pub client_id: String,
  pub name:      String,
  pub contact:   Option<String>,
  pub email:     Option<String>,
  pub phone:     Option<String>,
  pub address:   Option<String>,
  pub notes:     String,
  pub active:    bool,
}

impl RawClient {
  pub fn into_client(self) -> Result<Client> {
    Ok(Client {
      client_id: decode_uuid(&self.client_id)?,
      name:      self.name,
      contact:   self.contact,
      email:     self.email,
      phone:     self.phone,
      address:   self.address,
      notes:     self.notes,
      active:    self.active,
    })
  }
}

/// Raw values read from a `vehicle_fixes` row.
pub struct RawFix {
  pub vehicle_id:  String,
  pub lat:         f64,
  pub lng:         f64,
  pub speed_kmh:   f64,
  pub ignition:    bool,
  pub door_open:   bool,
  pub recorded_at: String,
}

impl RawFix {
  pub fn into_sample(self) -> Result<TelemetrySample> {
    Ok(TelemetrySample {
      vehicle_id:  self.vehicle_id,
      position:    Position::new(self.lat, self.lng),
      speed_kmh:   self.speed_kmh,
      ignition:    self.ignition,
      door_open:   self.door_open,
      recorded_at: decode_dt(&self.recorded_at)?,
    })
  }
}

// ─── Write-side rows ─────────────────────────────────────────────────────────

/// A history entry encoded for insertion.
pub struct HistoryRow {
  pub status:      &'static str,
  pub recorded_at: String,
  pub lat:         Option<f64>,
  pub lng:         Option<f64>,
}

/// A shipment encoded for insertion or update. Owned so it can move onto the
/// database thread.
pub struct ShipmentRow {
  pub shipment_id:   String,
  pub tracking_code: String,
  pub vehicle_id:    Option<String>,
  pub status:        &'static str,
  pub version:       i64,
  pub created_at:    String,
  pub details_json:  String,
  pub history:       Vec<HistoryRow>,
}

pub fn encode_shipment(s: &Shipment) -> Result<ShipmentRow> {
  Ok(ShipmentRow {
    shipment_id:   encode_uuid(s.shipment_id),
    tracking_code: s.tracking_code.clone(),
    vehicle_id:    s.vehicle_id().map(str::to_owned),
    status:        encode_status(s.status),
    version:       i64::try_from(s.version)
      .map_err(|_| Error::Decode(format!("version {} overflows", s.version)))?,
    created_at:    encode_dt(s.created_at),
    details_json:  encode_details(s)?,
    history:       s
      .status_history
      .iter()
      .map(|c| HistoryRow {
        status:      encode_status(c.status),
        recorded_at: encode_dt(c.timestamp),
        lat:         c.position.map(|p| p.lat),
        lng:         c.position.map(|p| p.lng),
      })
      .collect(),
  })
}
