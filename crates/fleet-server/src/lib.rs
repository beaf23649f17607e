//! HTTP server for the fleet tracker.
//!
//! Combines the public tracking routes and the Basic-auth protected admin API
//! from `fleet-api` into one axum [`Router`], and hosts the background
//! telemetry poller.

pub mod auth;
pub mod error;
pub mod poller;
pub mod seed;
pub mod simulate;

pub use error::Error;

use std::{path::PathBuf, sync::Arc};

use axum::{Router, middleware};
use fleet_api::ApiState;
use fleet_core::{
  engine::{EngineConfig, StatusEngine},
  store::FleetStore,
};
use serde::Deserialize;
use tower_http::trace::TraceLayer;

use auth::{AuthConfig, require_auth};

// ─── Configuration ────────────────────────────────────────────────────────────

fn default_poll_interval() -> u64 { 30 }

/// Runtime server configuration, deserialised from `config.toml` and `FLEET_*`
/// environment variables.
#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
  pub host:               String,
  pub port:               u16,
  pub store_path:         PathBuf,
  pub auth_username:      String,
  pub auth_password_hash: String,
  #[serde(default = "default_poll_interval")]
  pub poll_interval_secs: u64,
  /// Feed the poller from the built-in vehicle simulator.
  #[serde(default)]
  pub simulate_telemetry: bool,
  #[serde(default)]
  pub seed_demo_data:     bool,
  #[serde(default)]
  pub engine:             EngineConfig,
}

// ─── Application state ────────────────────────────────────────────────────────

/// Shared state threaded through the router.
pub struct AppState<S> {
  pub store:  Arc<S>,
  pub engine: Arc<StatusEngine>,
  pub config: Arc<ServerConfig>,
  pub auth:   Arc<AuthConfig>,
}

impl<S> Clone for AppState<S> {
  fn clone(&self) -> Self {
    Self {
      store:  self.store.clone(),
      engine: self.engine.clone(),
      config: self.config.clone(),
      auth:   self.auth.clone(),
    }
  }
}

impl<S> AppState<S> {
  pub fn new(store: S, config: ServerConfig) -> Self {
    Self {
      store:  Arc::new(store),
      engine: Arc::new(StatusEngine::new(config.engine)),
      auth:   Arc::new(AuthConfig {
        username:      config.auth_username.clone(),
        password_hash: config.auth_password_hash.clone(),
      }),
      config: Arc::new(config),
    }
  }
}

// ─── Router ───────────────────────────────────────────────────────────────────

/// Build the full application router: `/track/{code}` in the open, the admin
/// API under `/api` behind Basic auth.
pub fn router<S>(state: AppState<S>) -> Router
where
  S: FleetStore + 'static,
{
  let admin = fleet_api::admin_router(ApiState {
    store:  state.store.clone(),
    engine: state.engine.clone(),
  })
  .layer(middleware::from_fn_with_state(state.auth.clone(), require_auth));

  Router::new()
    .merge(fleet_api::public_router(state.store.clone()))
    .nest("/api", admin)
    .layer(TraceLayer::new_for_http())
}

// ─── Integration tests ────────────────────────────────────────────────────────
