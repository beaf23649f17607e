//! Demo data: reference geofences, a small fleet and a few sample shipments.
//!
//! Only applied to an empty store, so restarting a demo server keeps whatever
//! state it reached.

use chrono::{DateTime, Duration, Utc};
use fleet_core::{
  fleet::{DriverStatus, NewClient, NewDriver, NewVehicle, ServiceStatus, VehicleKind},
  geo::Position,
  location::{LocationKind, NewLocation},
  shipment::{ClientRef, DriverRef, NewShipment, Status, Stop, StopKind, VehicleRef},
  store::FleetStore,
};

// Reference geofences.
const ENTREPOT_PARIS: Position = Position::new(48.864716, 2.349014);
const TERMINAL_CALAIS: Position = Position::new(50.966667, 1.85);
const DOUANE_BELGIQUE: Position = Position::new(50.633333, 3.066667);
const PLATEFORME_LYON: Position = Position::new(45.75, 4.85);

// Route stops of the sample shipments.
const PARIS_NORD: Position = Position::new(48.8566, 2.3522);
const CALAIS_PORT: Position = Position::new(50.9692, 1.8431);
const LILLE: Position = Position::new(50.6292, 3.0573);
const LYON: Position = Position::new(45.7578, 4.8320);
const MARSEILLE: Position = Position::new(43.2965, 5.3698);
const VENTIMIGLIA: Position = Position::new(43.7808, 7.6094);
const TURIN: Position = Position::new(45.0703, 7.6869);
const BRUXELLES: Position = Position::new(50.8503, 4.3517);

fn located(
  name: &str,
  kind: LocationKind,
  position: Position,
  address: &str,
) -> NewLocation {
  NewLocation {
    address: Some(address.into()),
    ..NewLocation::new(name, kind, position)
  }
}

fn reference_locations() -> Vec<NewLocation> {
  vec![
    located(
      "Entrepôt Paris",
      LocationKind::Pickup,
      ENTREPOT_PARIS,
      "5 rue de la Logistique, 75001 Paris",
    ),
    located(
      "Terminal Calais",
      LocationKind::Ferry,
      TERMINAL_CALAIS,
      "Port de Calais, 62100 Calais",
    )
    .with_radius(1000),
    located(
      "Douane Belgique",
      LocationKind::Customs,
      DOUANE_BELGIQUE,
      "Poste frontière, 59000 Lille",
    ),
    located(
      "Plateforme Lyon",
      LocationKind::Delivery,
      PLATEFORME_LYON,
      "10 avenue de la Distribution, 69000 Lyon",
    ),
  ]
}

fn vehicles() -> Vec<NewVehicle> {
  use ServiceStatus::*;
  use VehicleKind::*;

  [
    ("truck-001", "AB-123-CD", "Volvo FH16", 2022, Truck, InService),
    ("truck-002", "EF-456-GH", "Mercedes Actros", 2021, Truck, InService),
    ("truck-003", "IJ-789-KL", "Scania R450", 2020, Truck, Maintenance),
    ("truck-004", "MN-012-OP", "DAF XF", 2023, Truck, InService),
    ("truck-005", "QR-345-ST", "Renault T High", 2022, Truck, Available),
    ("trailer-001", "TR-123-AB", "Fruehauf", 2022, Trailer, InService),
    ("trailer-002", "TR-456-CD", "Schmitz", 2021, Trailer, InService),
  ]
  .into_iter()
  .map(|(id, registration, model, year, kind, status)| NewVehicle {
    model: model.into(),
    year: Some(year),
    status,
    ..NewVehicle::new(registration, kind).with_id(id)
  })
  .collect()
}

fn drivers() -> Vec<NewDriver> {
  use DriverStatus::*;

  [
    ("Jean Dupont", "06 12 34 56 78", "Poids lourd", OnDuty),
    ("Marie Martin", "06 23 45 67 89", "Super lourd", OnDuty),
    ("Paul Bernard", "06 34 56 78 90", "Poids lourd", Resting),
    ("Sophie Petit", "06 45 67 89 01", "Super lourd", OnLeave),
    ("Thomas Richard", "06 56 78 90 12", "Poids lourd", OnDuty),
  ]
  .into_iter()
  .map(|(name, phone, license, status)| NewDriver {
    phone: Some(phone.into()),
    license: Some(license.into()),
    status,
    ..NewDriver::new(name)
  })
  .collect()
}

fn clients() -> Vec<NewClient> {
  [
    (
      "Logistique Express",
      "Pierre Martin",
      "contact@logistique-express.fr",
      "01 23 45 67 89",
      "123 rue de la Livraison, 75008 Paris",
      "Client premium. Livraisons prioritaires.",
    ),
    (
      "Transport International",
      "Sophie Dupuis",
      "info@transport-inter.com",
      "01 98 76 54 32",
      "45 boulevard du Commerce, 69002 Lyon",
      "",
    ),
    (
      "MegaDistrib",
      "Jean Leroy",
      "contact@megadistrib.fr",
      "03 45 67 89 10",
      "78 avenue de l'Industrie, 59000 Lille",
      "Demande notification par SMS à l'approche du camion.",
    ),
  ]
  .into_iter()
  .map(|(name, contact, email, phone, address, notes)| NewClient {
    contact: Some(contact.into()),
    email: Some(email.into()),
    phone: Some(phone.into()),
    address: Some(address.into()),
    notes: notes.into(),
    ..NewClient::new(name)
  })
  .collect()
}

fn stop(name: &str, position: Position, kind: StopKind, at: DateTime<Utc>) -> Stop {
  Stop {
    name: name.into(),
    position,
    kind,
    planned_arrival: at,
    actual_arrival: None,
  }
}

/// One sample shipment. Fleet references are indices into the seeded
/// vehicles, drivers and clients.
struct Demo {
  code:     &'static str,
  truck:    usize,
  trailer:  Option<usize>,
  driver:   usize,
  client:   usize,
  status:   Status,
  origin:   (&'static str, Position),
  via:      Option<(&'static str, Position, StopKind)>,
  dest:     (&'static str, Position),
  duration: Duration,
}

fn demos() -> [Demo; 3] {
  [
    Demo {
      code:     "FR-2024-001",
      truck:    0,
      trailer:  Some(5),
      driver:   0,
      client:   0,
      status:   Status::Loaded,
      origin:   ("Entrepôt Paris Nord", PARIS_NORD),
      via:      None,
      dest:     ("Centre de distribution Lyon", LYON),
      duration: Duration::hours(5),
    },
    Demo {
      code:     "FR-2024-002",
      truck:    1,
      trailer:  None,
      driver:   1,
      client:   1,
      status:   Status::Loading,
      origin:   ("Laboratoire Marseille", MARSEILLE),
      via:      Some(("Douane Ventimiglia", VENTIMIGLIA, StopKind::Customs)),
      dest:     ("Hôpital Central Turin", TURIN),
      duration: Duration::hours(7),
    },
    Demo {
      code:     "FR-2024-003",
      truck:    3,
      trailer:  Some(6),
      driver:   4,
      client:   2,
      status:   Status::Loading,
      origin:   ("Entrepôt Nord Lille", LILLE),
      via:      Some(("Ferry Calais-Douvres", CALAIS_PORT, StopKind::Ferry)),
      dest:     ("Centre de distribution Bruxelles", BRUXELLES),
      duration: Duration::hours(6),
    },
  ]
}

/// Seed `store` if it holds no locations, vehicles or shipments. Returns
/// whether anything was written.
pub async fn seed_demo<S>(store: &S) -> Result<bool, S::Error>
where
  S: FleetStore,
{
  if !store.list_locations().await?.is_empty()
    || !store.list_vehicles(None).await?.is_empty()
    || !store.list_shipments().await?.is_empty()
  {
    tracing::debug!("store not empty, skipping demo seed");
    return Ok(false);
  }

  for location in reference_locations() {
    store.add_location(location).await?;
  }
  let mut fleet = Vec::new();
  for vehicle in vehicles() {
    fleet.push(store.add_vehicle(vehicle).await?);
  }
  let mut crew = Vec::new();
  for driver in drivers() {
    crew.push(store.add_driver(driver).await?);
  }
  let mut customers = Vec::new();
  for client in clients() {
    customers.push(store.add_client(client).await?);
  }

  let now = Utc::now();
  let vehicle_ref = |i: usize| {
    fleet.get(i).map(|v| VehicleRef {
      vehicle_id:   v.vehicle_id.clone(),
      registration: v.registration.clone(),
    })
  };
  for d in demos() {
    let eta = now + d.duration;
    let client = customers.get(d.client);
    let shipment = NewShipment {
      tracking_code:    d.code.into(),
      description:      format!("{} to {}", d.origin.0, d.dest.0),
      status:           d.status,
      current_position: Some(d.origin.1),
      origin:           stop(d.origin.0, d.origin.1, StopKind::Pickup, now),
      destination:      stop(d.dest.0, d.dest.1, StopKind::Delivery, eta),
      stops:            d
        .via
        .map(|(name, position, kind)| stop(name, position, kind, now + d.duration / 2))
        .into_iter()
        .collect(),
      vehicle:          vehicle_ref(d.truck),
      trailer:          d.trailer.and_then(&vehicle_ref),
      driver:           crew.get(d.driver).map(|driver| DriverRef {
        driver_id: driver.driver_id,
        name:      driver.name.clone(),
      }),
      client:           ClientRef {
        client_id: client.map(|c| c.client_id),
        name:      client.map(|c| c.name.clone()).unwrap_or_default(),
        reference: None,
      },
      departure_time:   now,
      eta,
    };
    store.create_shipment(shipment).await?;
  }
  tracing::info!(
    vehicles = fleet.len(),
    drivers = crew.len(),
    clients = customers.len(),
    "seeded demo geofences, fleet and shipments"
  );
  Ok(true)
}
