//! Integration tests for `SqliteStore` against an in-memory database.

use chrono::{Duration, TimeZone, Utc};
use fleet_core::{
  engine::StatusEngine,
  fleet::{
    Assignment, DriverStatus, NewClient, NewDriver, NewVehicle, ServiceStatus,
    VehicleKind, resolve_assignment,
  },
  geo::Position,
  location::{LocationKind, NewLocation},
  poll::process_sample,
  shipment::{
    ClientRef, DriverRef, NewShipment, Shipment, Status, Stop, StopKind,
    VehicleRef,
  },
  store::{
    ClientRegistry, DriverRegistry, FixStore, LocationRegistry, ShipmentStore,
    StoreError, VehicleRegistry,
  },
  telemetry::TelemetrySample,
};
use uuid::Uuid;

use crate::{Error, SqliteStore};

const PARIS: Position = Position::new(48.8566, 2.3522);
const LYON: Position = Position::new(45.7578, 4.8320);
const CALAIS: Position = Position::new(50.966667, 1.85);

async fn store() -> SqliteStore {
  SqliteStore::open_in_memory()
    .await
    .expect("in-memory store")
}

fn stop(name: &str, position: Position, kind: StopKind) -> Stop {
  Stop {
    name: name.into(),
    position,
    kind,
    planned_arrival: Utc.timestamp_opt(1_700_000_000, 0).unwrap(),
    actual_arrival: None,
  }
}

fn new_shipment(code: &str, vehicle_id: &str) -> NewShipment {
  let departure = Utc.timestamp_opt(1_700_000_000, 0).unwrap();
  NewShipment {
    tracking_code:    code.into(),
    description:      "Pallets of tiles".into(),
    status:           Status::Loading,
    current_position: Some(PARIS),
    origin:           stop("Paris depot", PARIS, StopKind::Pickup),
    destination:      stop("Lyon", LYON, StopKind::Delivery),
    stops:            vec![stop("Calais", CALAIS, StopKind::Ferry)],
    vehicle:          Some(VehicleRef {
      vehicle_id:   vehicle_id.into(),
      registration: "AB-123-CD".into(),
    }),
    trailer:          None,
    driver:           None,
    client:           ClientRef {
      client_id: None,
      name:      "Acme".into(),
      reference: Some("PO-42".into()),
    },
    departure_time:   departure,
    eta:              departure + Duration::hours(6),
  }
}

fn moved(shipment: &Shipment, status: Status) -> Shipment {
  let mut next = shipment.clone();
  next.record_transition(status, Utc::now(), Some(LYON));
  next
}

// ─── Shipments ───────────────────────────────────────────────────────────────

#[tokio::test]
async fn create_and_get_shipment() {
  let s = store().await;

  let created = s.create_shipment(new_shipment("TRK-1", "truck-1")).await.unwrap();
  assert_eq!(created.status, Status::Loading);
  assert_eq!(created.version, 0);
  assert_eq!(created.status_history.len(), 1);

  let fetched = s.get_shipment(created.shipment_id).await.unwrap().unwrap();
  assert_eq!(fetched, created);
}

#[tokio::test]
async fn get_shipment_missing_returns_none() {
  let s = store().await;
  assert!(s.get_shipment(Uuid::new_v4()).await.unwrap().is_none());
}

#[tokio::test]
async fn duplicate_tracking_code_is_rejected() {
  let s = store().await;
  s.create_shipment(new_shipment("TRK-1", "truck-1")).await.unwrap();

  let err = s
    .create_shipment(new_shipment("TRK-1", "truck-2"))
    .await
    .unwrap_err();
  assert!(matches!(err, Error::DuplicateTrackingCode(code) if code == "TRK-1"));
}

#[tokio::test]
async fn invalid_shipment_is_rejected() {
  let s = store().await;
  let err = s
    .create_shipment(new_shipment("   ", "truck-1"))
    .await
    .unwrap_err();
  assert!(matches!(err, Error::Core(fleet_core::Error::EmptyTrackingCode)));
}

#[tokio::test]
async fn find_by_tracking_code_trims_input() {
  let s = store().await;
  let created = s.create_shipment(new_shipment("TRK-7", "truck-1")).await.unwrap();

  let found = s.find_by_tracking_code("  TRK-7 ").await.unwrap().unwrap();
  assert_eq!(found.shipment_id, created.shipment_id);
  assert!(s.find_by_tracking_code("TRK-8").await.unwrap().is_none());
}

#[tokio::test]
async fn find_active_by_vehicle_skips_delivered() {
  let s = store().await;
  let first = s.create_shipment(new_shipment("TRK-1", "truck-1")).await.unwrap();
  let second = s.create_shipment(new_shipment("TRK-2", "truck-1")).await.unwrap();

  let active = s.find_active_by_vehicle("truck-1").await.unwrap().unwrap();
  assert_eq!(active.shipment_id, second.shipment_id);

  s.save_shipment(&moved(&second, Status::Delivered)).await.unwrap();
  let active = s.find_active_by_vehicle("truck-1").await.unwrap().unwrap();
  assert_eq!(active.shipment_id, first.shipment_id);

  assert!(s.find_active_by_vehicle("truck-9").await.unwrap().is_none());
}

#[tokio::test]
async fn list_shipments_in_creation_order() {
  let s = store().await;
  s.create_shipment(new_shipment("TRK-1", "truck-1")).await.unwrap();
  s.create_shipment(new_shipment("TRK-2", "truck-2")).await.unwrap();

  let codes: Vec<_> = s
    .list_shipments()
    .await
    .unwrap()
    .into_iter()
    .map(|x| x.tracking_code)
    .collect();
  assert_eq!(codes, ["TRK-1", "TRK-2"]);
}

#[tokio::test]
async fn save_appends_history_and_bumps_version() {
  let s = store().await;
  let created = s.create_shipment(new_shipment("TRK-1", "truck-1")).await.unwrap();

  let saved = s.save_shipment(&moved(&created, Status::InTransit)).await.unwrap();
  assert_eq!(saved.version, 1);

  let fetched = s.get_shipment(created.shipment_id).await.unwrap().unwrap();
  assert_eq!(fetched.status, Status::InTransit);
  assert_eq!(fetched.version, 1);
  let statuses: Vec<_> = fetched.status_history.iter().map(|c| c.status).collect();
  assert_eq!(statuses, [Status::Loading, Status::InTransit]);
  assert_eq!(fetched.status_history[1].position, Some(LYON));
}

#[tokio::test]
async fn stale_save_is_a_conflict() {
  let s = store().await;
  let created = s.create_shipment(new_shipment("TRK-1", "truck-1")).await.unwrap();

  s.save_shipment(&moved(&created, Status::InTransit)).await.unwrap();
  let err = s
    .save_shipment(&moved(&created, Status::Ferry))
    .await
    .unwrap_err();

  assert!(err.is_conflict());
  assert!(matches!(
    err,
    Error::VersionConflict { expected: 0, found: 1, .. }
  ));

  let fetched = s.get_shipment(created.shipment_id).await.unwrap().unwrap();
  assert_eq!(fetched.status, Status::InTransit);
  assert_eq!(fetched.status_history.len(), 2);
}

#[tokio::test]
async fn save_cannot_drop_history() {
  let s = store().await;
  let created = s.create_shipment(new_shipment("TRK-1", "truck-1")).await.unwrap();
  let saved = s.save_shipment(&moved(&created, Status::InTransit)).await.unwrap();

  let mut truncated = saved.clone();
  truncated.status_history.truncate(1);
  truncated.status = Status::Loading;

  let err = s.save_shipment(&truncated).await.unwrap_err();
  assert!(!err.is_conflict());
}

#[tokio::test]
async fn save_missing_shipment_fails() {
  let s = store().await;
  let created = s.create_shipment(new_shipment("TRK-1", "truck-1")).await.unwrap();
  assert!(s.delete_shipment(created.shipment_id).await.unwrap());

  let err = s.save_shipment(&created).await.unwrap_err();
  assert!(matches!(err, Error::ShipmentNotFound(id) if id == created.shipment_id));
}

#[tokio::test]
async fn save_rejects_taken_tracking_code() {
  let s = store().await;
  s.create_shipment(new_shipment("TRK-1", "truck-1")).await.unwrap();
  let other = s.create_shipment(new_shipment("TRK-2", "truck-2")).await.unwrap();

  let mut renamed = other.clone();
  renamed.tracking_code = "TRK-1".into();
  let err = s.save_shipment(&renamed).await.unwrap_err();
  assert!(matches!(err, Error::DuplicateTrackingCode(_)));
}

#[tokio::test]
async fn delete_shipment_removes_it() {
  let s = store().await;
  let created = s.create_shipment(new_shipment("TRK-1", "truck-1")).await.unwrap();

  assert!(s.delete_shipment(created.shipment_id).await.unwrap());
  assert!(s.get_shipment(created.shipment_id).await.unwrap().is_none());
  assert!(!s.delete_shipment(created.shipment_id).await.unwrap());

  // The code is free again.
  s.create_shipment(new_shipment("TRK-1", "truck-1")).await.unwrap();
}

// ─── Locations ───────────────────────────────────────────────────────────────

#[tokio::test]
async fn add_and_get_location() {
  let s = store().await;
  let added = s
    .add_location(NewLocation::new("Calais ferry", LocationKind::Ferry, CALAIS).with_radius(1000))
    .await
    .unwrap();

  let fetched = s.get_location(added.location_id).await.unwrap().unwrap();
  assert_eq!(fetched, added);
  assert_eq!(fetched.radius_m, 1000);
  assert!(fetched.active);
}

#[tokio::test]
async fn location_radius_is_validated() {
  let s = store().await;
  let err = s
    .add_location(NewLocation::new("Tiny", LocationKind::Other, PARIS).with_radius(5))
    .await
    .unwrap_err();
  assert!(matches!(err, Error::Core(fleet_core::Error::InvalidRadius(5))));
  assert!(s.list_locations().await.unwrap().is_empty());
}

#[tokio::test]
async fn list_active_filters_by_kind_and_flag() {
  let s = store().await;
  let ferry = s
    .add_location(NewLocation::new("Calais ferry", LocationKind::Ferry, CALAIS))
    .await
    .unwrap();
  s.add_location(NewLocation::new("Lille customs", LocationKind::Customs, PARIS))
    .await
    .unwrap();
  let mut closed = s
    .add_location(NewLocation::new("Dunkirk ferry", LocationKind::Ferry, CALAIS))
    .await
    .unwrap();
  closed.active = false;
  s.update_location(&closed).await.unwrap().unwrap();

  let ferries = s.list_active(Some(LocationKind::Ferry)).await.unwrap();
  assert_eq!(ferries.len(), 1);
  assert_eq!(ferries[0].location_id, ferry.location_id);

  assert_eq!(s.list_active(None).await.unwrap().len(), 2);
  assert_eq!(s.list_locations().await.unwrap().len(), 3);
}

#[tokio::test]
async fn update_missing_location_returns_none() {
  let s = store().await;
  let location = NewLocation::new("Nowhere", LocationKind::Other, PARIS)
    .into_location(Uuid::new_v4())
    .unwrap();
  assert!(s.update_location(&location).await.unwrap().is_none());
}

#[tokio::test]
async fn delete_location() {
  let s = store().await;
  let added = s
    .add_location(NewLocation::new("Depot", LocationKind::Pickup, PARIS))
    .await
    .unwrap();

  assert!(s.delete_location(added.location_id).await.unwrap());
  assert!(!s.delete_location(added.location_id).await.unwrap());
  assert!(s.get_location(added.location_id).await.unwrap().is_none());
}

// ─── Poll cycle ──────────────────────────────────────────────────────────────

#[tokio::test]
async fn poll_cycle_persists_ferry_transition() {
  let s = store().await;
  s.add_location(NewLocation::new("Calais ferry", LocationKind::Ferry, CALAIS).with_radius(1000))
    .await
    .unwrap();
  let created = s.create_shipment(new_shipment("TRK-1", "truck-1")).await.unwrap();

  let sample = TelemetrySample {
    vehicle_id:  "truck-1".into(),
    position:    Position::new(50.9670, 1.8500),
    speed_kmh:   10.0,
    ignition:    true,
    door_open:   false,
    recorded_at: Utc::now(),
  };
  let outcome = process_sample(&s, &StatusEngine::default(), &sample)
    .await
    .unwrap();
  assert!(outcome.evaluation.is_transition());

  let fetched = s.get_shipment(created.shipment_id).await.unwrap().unwrap();
  assert_eq!(fetched.status, Status::Ferry);
  assert_eq!(fetched.version, 1);
  assert_eq!(fetched.status_history.len(), 2);

  // Same sample again: nothing new is written.
  process_sample(&s, &StatusEngine::default(), &sample)
    .await
    .unwrap();
  let again = s.get_shipment(created.shipment_id).await.unwrap().unwrap();
  assert_eq!(again.version, 1);
  assert_eq!(again.status_history.len(), 2);
}

#[tokio::test]
async fn poll_cycle_keeps_latest_fix() {
  let s = store().await;
  s.create_shipment(new_shipment("TRK-1", "truck-1")).await.unwrap();

  let sample = TelemetrySample {
    vehicle_id:  "truck-1".into(),
    position:    Position::new(46.5, 4.0),
    speed_kmh:   95.0,
    ignition:    true,
    door_open:   false,
    recorded_at: Utc.timestamp_opt(1_700_000_600, 0).unwrap(),
  };
  process_sample(&s, &StatusEngine::default(), &sample)
    .await
    .unwrap();

  assert_eq!(s.latest_fix("truck-1").await.unwrap(), Some(sample));
}

// ─── Latest fixes ────────────────────────────────────────────────────────────

fn fix(vehicle_id: &str, secs: i64, speed_kmh: f64) -> TelemetrySample {
  TelemetrySample {
    vehicle_id: vehicle_id.into(),
    position: PARIS,
    speed_kmh,
    ignition: true,
    door_open: true,
    recorded_at: Utc.timestamp_opt(1_700_000_000 + secs, 0).unwrap(),
  }
}

#[tokio::test]
async fn older_fix_never_replaces_newer() {
  let s = store().await;
  assert!(s.latest_fix("truck-1").await.unwrap().is_none());

  assert!(s.record_fix(&fix("truck-1", 60, 50.0)).await.unwrap());
  assert!(!s.record_fix(&fix("truck-1", 30, 70.0)).await.unwrap());
  assert!(s.record_fix(&fix("truck-1", 90, 85.0)).await.unwrap());
  s.record_fix(&fix("truck-2", 0, 10.0)).await.unwrap();

  let latest = s.latest_fix("truck-1").await.unwrap().unwrap();
  assert_eq!(latest, fix("truck-1", 90, 85.0));
  assert_eq!(s.latest_fix("truck-2").await.unwrap().unwrap().speed_kmh, 10.0);
}

// ─── Fleet registries ────────────────────────────────────────────────────────

#[tokio::test]
async fn vehicle_crud_and_kind_filter() {
  let s = store().await;
  let truck = s
    .add_vehicle(NewVehicle::new("AB-123-CD", VehicleKind::Truck).with_id("truck-001"))
    .await
    .unwrap();
  s.add_vehicle(NewVehicle::new("TR-123-AB", VehicleKind::Trailer))
    .await
    .unwrap();

  assert_eq!(s.get_vehicle("truck-001").await.unwrap(), Some(truck.clone()));
  assert_eq!(s.get_vehicle("TR-123-AB").await.unwrap().unwrap().kind, VehicleKind::Trailer);
  assert_eq!(s.list_vehicles(None).await.unwrap().len(), 2);
  let trailers = s.list_vehicles(Some(VehicleKind::Trailer)).await.unwrap();
  assert_eq!(trailers.len(), 1);
  assert_eq!(trailers[0].vehicle_id, "TR-123-AB");

  let mut serviced = truck.clone();
  serviced.status = ServiceStatus::Maintenance;
  serviced.year = Some(2022);
  assert_eq!(s.update_vehicle(&serviced).await.unwrap(), Some(serviced.clone()));
  assert_eq!(s.get_vehicle("truck-001").await.unwrap(), Some(serviced));

  assert!(s.delete_vehicle("truck-001").await.unwrap());
  assert!(!s.delete_vehicle("truck-001").await.unwrap());
  assert!(s.get_vehicle("truck-001").await.unwrap().is_none());
}

#[tokio::test]
async fn duplicate_vehicle_id_is_rejected() {
  let s = store().await;
  s.add_vehicle(NewVehicle::new("AB-123-CD", VehicleKind::Truck))
    .await
    .unwrap();
  let err = s
    .add_vehicle(NewVehicle::new("AB-123-CD", VehicleKind::Trailer))
    .await
    .unwrap_err();
  assert!(err.is_duplicate());
  assert!(matches!(err, Error::DuplicateVehicle(id) if id == "AB-123-CD"));
}

#[tokio::test]
async fn driver_and_client_crud() {
  let s = store().await;
  let mut driver = s
    .add_driver(NewDriver {
      phone: Some("06 12 34 56 78".into()),
      ..NewDriver::new("Jean Dupont")
    })
    .await
    .unwrap();
  assert_eq!(s.get_driver(driver.driver_id).await.unwrap(), Some(driver.clone()));

  driver.status = DriverStatus::OnLeave;
  s.update_driver(&driver).await.unwrap().unwrap();
  assert_eq!(s.list_drivers().await.unwrap(), vec![driver.clone()]);

  let mut client = s.add_client(NewClient::new("MegaDistrib")).await.unwrap();
  client.notes = "SMS before arrival".into();
  client.active = false;
  s.update_client(&client).await.unwrap().unwrap();
  assert_eq!(s.get_client(client.client_id).await.unwrap(), Some(client.clone()));

  assert!(s.delete_driver(driver.driver_id).await.unwrap());
  assert!(s.delete_client(client.client_id).await.unwrap());
  assert!(s.list_drivers().await.unwrap().is_empty());
  assert!(s.list_clients().await.unwrap().is_empty());

  let ghost = NewDriver::new("Nobody").into_driver(Uuid::new_v4()).unwrap();
  assert!(s.update_driver(&ghost).await.unwrap().is_none());
}

#[tokio::test]
async fn assignment_is_checked_and_refreshed() {
  let s = store().await;
  s.add_vehicle(NewVehicle::new("AB-123-CD", VehicleKind::Truck).with_id("truck-1"))
    .await
    .unwrap();
  s.add_vehicle(NewVehicle::new("TR-123-AB", VehicleKind::Trailer).with_id("trailer-1"))
    .await
    .unwrap();
  let driver = s.add_driver(NewDriver::new("Jean Dupont")).await.unwrap();
  let client = s.add_client(NewClient::new("MegaDistrib")).await.unwrap();

  let mut input = new_shipment("TRK-1", "truck-1");
  input.vehicle.as_mut().unwrap().registration = String::new();
  input.trailer = Some(VehicleRef {
    vehicle_id:   "trailer-1".into(),
    registration: String::new(),
  });
  input.driver = Some(DriverRef { driver_id: driver.driver_id, name: String::new() });
  input.client.client_id = Some(client.client_id);

  resolve_assignment(&s, input.assignment_mut()).await.unwrap();
  assert_eq!(input.vehicle.as_ref().unwrap().registration, "AB-123-CD");
  assert_eq!(input.trailer.as_ref().unwrap().registration, "TR-123-AB");
  assert_eq!(input.driver.as_ref().unwrap().name, "Jean Dupont");
  assert_eq!(input.client.name, "MegaDistrib");

  // Free-text client without an id is left alone.
  let mut free = new_shipment("TRK-2", "truck-1");
  resolve_assignment(&s, free.assignment_mut()).await.unwrap();
  assert_eq!(free.client.name, "Acme");
}

#[tokio::test]
async fn assignment_rejects_unknown_or_mismatched_references() {
  let s = store().await;
  s.add_vehicle(NewVehicle::new("TR-123-AB", VehicleKind::Trailer).with_id("trailer-1"))
    .await
    .unwrap();

  let mut unknown = new_shipment("TRK-1", "truck-404");
  let err = resolve_assignment(&s, unknown.assignment_mut()).await.unwrap_err();
  assert!(matches!(err, fleet_core::Error::UnknownVehicle(id) if id == "truck-404"));

  // A trailer cannot pull the load.
  let mut swapped = new_shipment("TRK-1", "trailer-1");
  let err = resolve_assignment(&s, swapped.assignment_mut()).await.unwrap_err();
  assert!(matches!(
    err,
    fleet_core::Error::WrongVehicleKind { expected: VehicleKind::Truck, .. }
  ));

  let mut driver = DriverRef { driver_id: Uuid::new_v4(), name: "Ghost".into() };
  let err = resolve_assignment(&s, Assignment {
    driver: Some(&mut driver),
    ..Assignment::default()
  })
  .await
  .unwrap_err();
  assert!(matches!(err, fleet_core::Error::UnknownDriver(_)));

  let mut client = ClientRef {
    client_id: Some(Uuid::new_v4()),
    ..ClientRef::default()
  };
  let err = resolve_assignment(&s, Assignment {
    client: Some(&mut client),
    ..Assignment::default()
  })
  .await
  .unwrap_err();
  assert!(matches!(err, fleet_core::Error::UnknownClient(_)));
}
