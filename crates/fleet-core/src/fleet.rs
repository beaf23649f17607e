//! Fleet records: vehicles (trucks and trailers), drivers and clients.
//!
//! Shipments carry small references into these registries. Before a shipment
//! is created or edited, [`resolve_assignment`] checks every reference against
//! its registry and refreshes the denormalised display fields (registration,
//! driver name, client name) from the stored record.

use serde::{Deserialize, Serialize};
use strum::{EnumString, IntoStaticStr};
use uuid::Uuid;

use crate::{
  Error, Result,
  shipment::{ClientRef, DriverRef, VehicleRef},
  store::{ClientRegistry, DriverRegistry, StoreError, VehicleRegistry},
};

fn required(field: &'static str, value: &str) -> Result<()> {
  if value.trim().is_empty() {
    Err(Error::MissingField(field))
  } else {
    Ok(())
  }
}

// ─── Vehicles ────────────────────────────────────────────────────────────────

#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  Hash,
  Serialize,
  Deserialize,
  strum::Display,
  EnumString,
  IntoStaticStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum VehicleKind {
  Truck,
  Trailer,
}

#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  Hash,
  Serialize,
  Deserialize,
  strum::Display,
  EnumString,
  IntoStaticStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ServiceStatus {
  InService,
  Available,
  Maintenance,
  OutOfService,
}

/// A truck or trailer. `vehicle_id` is the key telemetry is reported under.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Vehicle {
  pub vehicle_id:   String,
  pub registration: String,
  pub model:        String,
  pub year:         Option<u16>,
  pub kind:         VehicleKind,
  pub status:       ServiceStatus,
}

fn default_service_status() -> ServiceStatus { ServiceStatus::Available }

/// Input to [`VehicleRegistry::add_vehicle`]. Without an explicit
/// `vehicle_id` the registration doubles as the telemetry key.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewVehicle {
  #[serde(default)]
  pub vehicle_id:   Option<String>,
  pub registration: String,
  #[serde(default)]
  pub model:        String,
  #[serde(default)]
  pub year:         Option<u16>,
  pub kind:         VehicleKind,
  #[serde(default = "default_service_status")]
  pub status:       ServiceStatus,
}

impl NewVehicle {
  pub fn new(registration: impl Into<String>, kind: VehicleKind) -> Self {
    Self {
      vehicle_id: None,
      registration: registration.into(),
      model: String::new(),
      year: None,
      kind,
      status: ServiceStatus::Available,
    }
  }

  pub fn with_id(mut self, vehicle_id: impl Into<String>) -> Self {
    self.vehicle_id = Some(vehicle_id.into());
    self
  }

  pub fn into_vehicle(self) -> Result<Vehicle> {
    required("registration", &self.registration)?;
    let registration = self.registration.trim().to_owned();
    let vehicle_id = match self.vehicle_id {
      Some(id) => {
        required("vehicle_id", &id)?;
        id.trim().to_owned()
      }
      None => registration.clone(),
    };
    Ok(Vehicle {
      vehicle_id,
      registration,
      model: self.model,
      year: self.year,
      kind: self.kind,
      status: self.status,
    })
  }
}

impl Vehicle {
  pub fn validate(&self) -> Result<()> {
    required("vehicle_id", &self.vehicle_id)?;
    required("registration", &self.registration)
  }
}

// ─── Drivers ─────────────────────────────────────────────────────────────────

#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  Hash,
  Serialize,
  Deserialize,
  strum::Display,
  EnumString,
  IntoStaticStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum DriverStatus {
  OnDuty,
  Resting,
  OnLeave,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Driver {
  pub driver_id: Uuid,
  pub name:      String,
  pub phone:     Option<String>,
  /// Licence category, free text.
  pub license:   Option<String>,
  pub status:    DriverStatus,
}

fn default_driver_status() -> DriverStatus { DriverStatus::OnDuty }

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewDriver {
  pub name:    String,
  #[serde(default)]
  pub phone:   Option<String>,
  #[serde(default)]
  pub license: Option<String>,
  #[serde(default = "default_driver_status")]
  pub status:  DriverStatus,
}

impl NewDriver {
  pub fn new(name: impl Into<String>) -> Self {
    Self {
      name:    name.into(),
      phone:   None,
      license: None,
      status:  DriverStatus::OnDuty,
    }
  }

  pub fn into_driver(self, driver_id: Uuid) -> Result<Driver> {
    required("name", &self.name)?;
    Ok(Driver {
      driver_id,
      name: self.name.trim().to_owned(),
      phone: self.phone,
      license: self.license,
      status: self.status,
    })
  }
}

// ─── Clients ─────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Client {
  pub client_id: Uuid,
  pub name:      String,
  pub contact:   Option<String>,
  pub email:     Option<String>,
  pub phone:     Option<String>,
  pub address:   Option<String>,
  pub notes:     String,
  pub active:    bool,
}

fn default_active() -> bool { true }

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewClient {
  pub name:    String,
  #[serde(default)]
  pub contact: Option<String>,
  #[serde(default)]
  pub email:   Option<String>,
  #[serde(default)]
  pub phone:   Option<String>,
  #[serde(default)]
  pub address: Option<String>,
  #[serde(default)]
  pub notes:   String,
  #[serde(default = "default_active")]
  pub active:  bool,
}

impl NewClient {
  pub fn new(name: impl Into<String>) -> Self {
    Self {
      name:    name.into(),
      contact: None,
      email:   None,
      phone:   None,
      address: None,
      notes:   String::new(),
      active:  true,
    }
  }

  pub fn into_client(self, client_id: Uuid) -> Result<Client> {
    required("name", &self.name)?;
    Ok(Client {
      client_id,
      name: self.name.trim().to_owned(),
      contact: self.contact,
      email: self.email,
      phone: self.phone,
      address: self.address,
      notes: self.notes,
      active: self.active,
    })
  }
}

// ─── Assignment ──────────────────────────────────────────────────────────────

/// The fleet references of a shipment (or of an edit to one), borrowed so
/// they can be checked and refreshed in place. `None` means "not given".
#[derive(Debug, Default)]
pub struct Assignment<'a> {
  pub vehicle: Option<&'a mut VehicleRef>,
  pub trailer: Option<&'a mut VehicleRef>,
  pub driver:  Option<&'a mut DriverRef>,
  pub client:  Option<&'a mut ClientRef>,
}

fn store_err<E: StoreError>(e: E) -> Error { Error::Store(Box::new(e)) }

async fn resolve_vehicle<S: VehicleRegistry>(
  store: &S,
  reference: &mut VehicleRef,
  expected: VehicleKind,
) -> Result<()> {
  let vehicle = store
    .get_vehicle(reference.vehicle_id.trim())
    .await
    .map_err(store_err)?
    .ok_or_else(|| Error::UnknownVehicle(reference.vehicle_id.clone()))?;
  if vehicle.kind != expected {
    return Err(Error::WrongVehicleKind {
      vehicle_id: vehicle.vehicle_id,
      expected,
    });
  }
  reference.vehicle_id = vehicle.vehicle_id;
  reference.registration = vehicle.registration;
  Ok(())
}

/// Check every given reference against its registry.
///
/// The vehicle must be a truck and the trailer a trailer. A client reference
/// without a `client_id` is a free-text client and is left alone.
pub async fn resolve_assignment<S>(store: &S, assignment: Assignment<'_>) -> Result<()>
where
  S: VehicleRegistry + DriverRegistry + ClientRegistry,
{
  if let Some(vehicle) = assignment.vehicle {
    resolve_vehicle(store, vehicle, VehicleKind::Truck).await?;
  }
  if let Some(trailer) = assignment.trailer {
    resolve_vehicle(store, trailer, VehicleKind::Trailer).await?;
  }
  if let Some(driver) = assignment.driver {
    let record = store
      .get_driver(driver.driver_id)
      .await
      .map_err(store_err)?
      .ok_or(Error::UnknownDriver(driver.driver_id))?;
    driver.name = record.name;
  }
  if let Some(client) = assignment.client
    && let Some(client_id) = client.client_id
  {
    let record = store
      .get_client(client_id)
      .await
      .map_err(store_err)?
      .ok_or(Error::UnknownClient(client_id))?;
    client.name = record.name;
  }
  Ok(())
}
