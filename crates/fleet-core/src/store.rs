//! Storage traits: the shipment store, the location registry, the fleet
//! registries and the latest-fix cache.
//!
//! All are implemented by storage backends (e.g. `fleet-store-sqlite`).
//! The engine, the poll cycle and the HTTP layer depend on these traits, never
//! on a concrete backend.
//!
//! All methods return `Send` futures so the traits can be used in
//! multi-threaded async runtimes (e.g. tokio with `axum`).

use std::future::Future;

use uuid::Uuid;

use crate::{
  fleet::{Client, Driver, NewClient, NewDriver, NewVehicle, Vehicle, VehicleKind},
  location::{Location, LocationKind, NewLocation},
  shipment::{NewShipment, Shipment},
  telemetry::TelemetrySample,
};

/// Errors a backend can report. Backends must tell a lost optimistic write
/// apart from every other failure so callers can retry.
pub trait StoreError: std::error::Error + Send + Sync + 'static {
  /// `true` if the write lost a race with a concurrent writer.
  fn is_conflict(&self) -> bool;

  /// `true` if the write was refused because a unique key is already taken.
  fn is_duplicate(&self) -> bool { false }
}

/// Shared by every storage trait so a backend implementing several of them
/// has one error type.
pub trait StoreBackend: Send + Sync {
  type Error: StoreError;
}

// ─── Shipments ───────────────────────────────────────────────────────────────

/// Keyed shipment records.
///
/// `save` is an optimistic write: it must fail with a conflict if the stored
/// version differs from `shipment.version`, and it only ever appends to the
/// stored history.
pub trait ShipmentStore: StoreBackend {
  /// Create and persist a new shipment with a seed history entry.
  /// Returns an error if the tracking code is already taken.
  fn create_shipment(
    &self,
    input: NewShipment,
  ) -> impl Future<Output = Result<Shipment, Self::Error>> + Send + '_;

  /// Retrieve a shipment by id. Returns `None` if not found.
  fn get_shipment(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<Option<Shipment>, Self::Error>> + Send + '_;

  fn find_by_tracking_code<'a>(
    &'a self,
    code: &'a str,
  ) -> impl Future<Output = Result<Option<Shipment>, Self::Error>> + Send + 'a;

  /// The most recently created non-delivered shipment assigned to
  /// `vehicle_id`.
  fn find_active_by_vehicle<'a>(
    &'a self,
    vehicle_id: &'a str,
  ) -> impl Future<Output = Result<Option<Shipment>, Self::Error>> + Send + 'a;

  /// All shipments, oldest first.
  fn list_shipments(
    &self,
  ) -> impl Future<Output = Result<Vec<Shipment>, Self::Error>> + Send + '_;

  /// Persist `shipment` if nobody else saved it since it was read. Returns the
  /// stored shipment with its bumped version.
  fn save_shipment<'a>(
    &'a self,
    shipment: &'a Shipment,
  ) -> impl Future<Output = Result<Shipment, Self::Error>> + Send + 'a;

  /// Delete a shipment and its history. Returns `false` if it did not exist.
  fn delete_shipment(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + '_;
}

// ─── Locations ───────────────────────────────────────────────────────────────

/// Named geofences. Natural order is insertion order.
pub trait LocationRegistry: StoreBackend {
  fn add_location(
    &self,
    input: NewLocation,
  ) -> impl Future<Output = Result<Location, Self::Error>> + Send + '_;

  fn get_location(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<Option<Location>, Self::Error>> + Send + '_;

  /// Every location, active or not.
  fn list_locations(
    &self,
  ) -> impl Future<Output = Result<Vec<Location>, Self::Error>> + Send + '_;

  /// Active locations, optionally restricted to one kind.
  fn list_active(
    &self,
    kind: Option<LocationKind>,
  ) -> impl Future<Output = Result<Vec<Location>, Self::Error>> + Send + '_;

  /// Replace a location. Returns `None` if it did not exist.
  fn update_location<'a>(
    &'a self,
    location: &'a Location,
  ) -> impl Future<Output = Result<Option<Location>, Self::Error>> + Send + 'a;

  fn delete_location(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + '_;
}

// ─── Fleet ───────────────────────────────────────────────────────────────────

/// Trucks and trailers, keyed by `vehicle_id`.
pub trait VehicleRegistry: StoreBackend {
  /// Fails with a duplicate error if the `vehicle_id` is taken.
  fn add_vehicle(
    &self,
    input: NewVehicle,
  ) -> impl Future<Output = Result<Vehicle, Self::Error>> + Send + '_;

  fn get_vehicle<'a>(
    &'a self,
    vehicle_id: &'a str,
  ) -> impl Future<Output = Result<Option<Vehicle>, Self::Error>> + Send + 'a;

  /// In insertion order, optionally restricted to one kind.
  fn list_vehicles(
    &self,
    kind: Option<VehicleKind>,
  ) -> impl Future<Output = Result<Vec<Vehicle>, Self::Error>> + Send + '_;

  fn update_vehicle<'a>(
    &'a self,
    vehicle: &'a Vehicle,
  ) -> impl Future<Output = Result<Option<Vehicle>, Self::Error>> + Send + 'a;

  fn delete_vehicle<'a>(
    &'a self,
    vehicle_id: &'a str,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + 'a;
}

pub trait DriverRegistry: StoreBackend {
  fn add_driver(
    &self,
    input: NewDriver,
  ) -> impl Future<Output = Result<Driver, Self::Error>> + Send + '_;

  fn get_driver(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<Option<Driver>, Self::Error>> + Send + '_;

  fn list_drivers(
    &self,
  ) -> impl Future<Output = Result<Vec<Driver>, Self::Error>> + Send + '_;

  fn update_driver<'a>(
    &'a self,
    driver: &'a Driver,
  ) -> impl Future<Output = Result<Option<Driver>, Self::Error>> + Send + 'a;

  fn delete_driver(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + '_;
}

pub trait ClientRegistry: StoreBackend {
  fn add_client(
    &self,
    input: NewClient,
  ) -> impl Future<Output = Result<Client, Self::Error>> + Send + '_;

  fn get_client(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<Option<Client>, Self::Error>> + Send + '_;

  fn list_clients(
    &self,
  ) -> impl Future<Output = Result<Vec<Client>, Self::Error>> + Send + '_;

  fn update_client<'a>(
    &'a self,
    client: &'a Client,
  ) -> impl Future<Output = Result<Option<Client>, Self::Error>> + Send + 'a;

  fn delete_client(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + '_;
}

// ─── Latest fixes ────────────────────────────────────────────────────────────

/// The most recent telemetry sample seen per vehicle.
pub trait FixStore: StoreBackend {
  /// Keep `sample` as the vehicle's latest fix unless a fix with a later
  /// `recorded_at` is already stored. Returns whether it was kept.
  fn record_fix<'a>(
    &'a self,
    sample: &'a TelemetrySample,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + 'a;

  fn latest_fix<'a>(
    &'a self,
    vehicle_id: &'a str,
  ) -> impl Future<Output = Result<Option<TelemetrySample>, Self::Error>> + Send + 'a;
}

/// Everything the HTTP layer and the server need from one backend.
pub trait FleetStore:
  ShipmentStore + LocationRegistry + VehicleRegistry + DriverRegistry + ClientRegistry + FixStore
{
}

impl<T> FleetStore for T where
  T: ShipmentStore
    + LocationRegistry
    + VehicleRegistry
    + DriverRegistry
    + ClientRegistry
    + FixStore
{
}
