//! JSON REST API for the fleet tracker.
//!
//! Two routers are exposed: a public one serving the customer tracking page
//! data, and an admin one for shipments, geofences, the fleet registries
//! (vehicles, drivers, clients) and telemetry ingestion. The admin router is
//! backed by any [`fleet_core::store::FleetStore`]. Auth and TLS are the
//! caller's responsibility.
//!
//! # Mounting
//!
//! ```rust,ignore
//! Router::new()
//!   .merge(fleet_api::public_router(store.clone()))
//!   .nest("/api", fleet_api::admin_router(state))
//! ```

pub mod clients;
pub mod drivers;
pub mod error;
pub mod locations;
pub mod shipments;
pub mod telemetry;
pub mod tracking;
pub mod vehicles;

use std::sync::Arc;

use axum::{
  Router,
  routing::{get, post},
};
use fleet_core::{
  engine::StatusEngine,
  store::{FixStore, FleetStore, ShipmentStore},
};

pub use error::ApiError;

/// Shared state of the admin router.
pub struct ApiState<S> {
  pub store:  Arc<S>,
  pub engine: Arc<StatusEngine>,
}

// Manual impl: `S` itself need not be `Clone`.
impl<S> Clone for ApiState<S> {
  fn clone(&self) -> Self {
    Self {
      store:  self.store.clone(),
      engine: self.engine.clone(),
    }
  }
}

/// Build the unauthenticated tracking router.
pub fn public_router<S>(store: Arc<S>) -> Router<()>
where
  S: ShipmentStore + FixStore + 'static,
{
  Router::new()
    .route("/track/{code}", get(tracking::track::<S>))
    .with_state(store)
}

/// Build the admin router for `state`.
///
/// The returned `Router<()>` can be nested into any parent router regardless
/// of its own state type.
pub fn admin_router<S>(state: ApiState<S>) -> Router<()>
where
  S: FleetStore + 'static,
{
  Router::new()
    // Shipments
    .route(
      "/shipments",
      get(shipments::list::<S>).post(shipments::create::<S>),
    )
    .route(
      "/shipments/{id}",
      get(shipments::get_one::<S>)
        .put(shipments::update::<S>)
        .delete(shipments::delete::<S>),
    )
    // Locations
    .route(
      "/locations",
      get(locations::list::<S>).post(locations::create::<S>),
    )
    .route(
      "/locations/{id}",
      get(locations::get_one::<S>)
        .put(locations::update::<S>)
        .delete(locations::delete::<S>),
    )
    // Fleet
    .route(
      "/vehicles",
      get(vehicles::list::<S>).post(vehicles::create::<S>),
    )
    .route(
      "/vehicles/{id}",
      get(vehicles::get_one::<S>)
        .put(vehicles::update::<S>)
        .delete(vehicles::delete::<S>),
    )
    .route("/drivers", get(drivers::list::<S>).post(drivers::create::<S>))
    .route(
      "/drivers/{id}",
      get(drivers::get_one::<S>)
        .put(drivers::update::<S>)
        .delete(drivers::delete::<S>),
    )
    .route("/clients", get(clients::list::<S>).post(clients::create::<S>))
    .route(
      "/clients/{id}",
      get(clients::get_one::<S>)
        .put(clients::update::<S>)
        .delete(clients::delete::<S>),
    )
    // Telemetry
    .route("/telemetry", post(telemetry::ingest::<S>))
    .with_state(state)
}
