//! Handlers for `/vehicles` endpoints.
//!
//! | Method   | Path | Notes |
//! |----------|------|-------|
//! | `GET`    | `/vehicles` | Optional `?kind=truck\|trailer` |
//! | `POST`   | `/vehicles` | Body: [`NewVehicle`]; 409 if the id is taken |
//! | `GET`    | `/vehicles/{id}` | 404 if not found |
//! | `PUT`    | `/vehicles/{id}` | Body: [`NewVehicle`], replaces the vehicle |
//! | `DELETE` | `/vehicles/{id}` | 204, or 404 if not found |
//!
//! The `{id}` is the `vehicle_id` telemetry is reported under, not a UUID.

use axum::{
  Json,
  extract::{Path, Query, State},
  http::StatusCode,
  response::IntoResponse,
};
use fleet_core::{
  fleet::{NewVehicle, Vehicle, VehicleKind},
  store::VehicleRegistry,
};
use serde::Deserialize;

use crate::{ApiState, error::ApiError};

fn not_found(id: &str) -> ApiError {
  ApiError::NotFound(format!("vehicle {id:?} not found"))
}

// ─── List ────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct ListParams {
  pub kind: Option<VehicleKind>,
}

/// `GET /vehicles[?kind=<kind>]`
pub async fn list<S>(
  State(state): State<ApiState<S>>,
  Query(params): Query<ListParams>,
) -> Result<Json<Vec<Vehicle>>, ApiError>
where
  S: VehicleRegistry,
{
  let vehicles = state
    .store
    .list_vehicles(params.kind)
    .await
    .map_err(ApiError::store)?;
  Ok(Json(vehicles))
}

// ─── Create ──────────────────────────────────────────────────────────────────

/// `POST /vehicles`
pub async fn create<S>(
  State(state): State<ApiState<S>>,
  Json(body): Json<NewVehicle>,
) -> Result<impl IntoResponse, ApiError>
where
  S: VehicleRegistry,
{
  // Validate before touching the store so blank fields are a 400.
  body.clone().into_vehicle()?;
  let vehicle = state
    .store
    .add_vehicle(body)
    .await
    .map_err(ApiError::store)?;
  tracing::info!(vehicle_id = %vehicle.vehicle_id, kind = %vehicle.kind, "vehicle registered");
  Ok((StatusCode::CREATED, Json(vehicle)))
}

// ─── Get one ─────────────────────────────────────────────────────────────────

/// `GET /vehicles/{id}`
pub async fn get_one<S>(
  State(state): State<ApiState<S>>,
  Path(id): Path<String>,
) -> Result<Json<Vehicle>, ApiError>
where
  S: VehicleRegistry,
{
  let vehicle = state
    .store
    .get_vehicle(&id)
    .await
    .map_err(ApiError::store)?
    .ok_or_else(|| not_found(&id))?;
  Ok(Json(vehicle))
}

// ─── Update ──────────────────────────────────────────────────────────────────

/// `PUT /vehicles/{id}`
///
/// The id cannot be changed: a body `vehicle_id` other than the path is `400`.
pub async fn update<S>(
  State(state): State<ApiState<S>>,
  Path(id): Path<String>,
  Json(mut body): Json<NewVehicle>,
) -> Result<Json<Vehicle>, ApiError>
where
  S: VehicleRegistry,
{
  if let Some(body_id) = &body.vehicle_id
    && body_id.trim() != id
  {
    return Err(ApiError::BadRequest(format!(
      "vehicle_id {body_id:?} does not match the path {id:?}"
    )));
  }
  body.vehicle_id = Some(id.clone());
  let vehicle = body.into_vehicle()?;
  let updated = state
    .store
    .update_vehicle(&vehicle)
    .await
    .map_err(ApiError::store)?
    .ok_or_else(|| not_found(&id))?;
  Ok(Json(updated))
}

// ─── Delete ──────────────────────────────────────────────────────────────────

/// `DELETE /vehicles/{id}`
pub async fn delete<S>(
  State(state): State<ApiState<S>>,
  Path(id): Path<String>,
) -> Result<StatusCode, ApiError>
where
  S: VehicleRegistry,
{
  if state.store.delete_vehicle(&id).await.map_err(ApiError::store)? {
    Ok(StatusCode::NO_CONTENT)
  } else {
    Err(not_found(&id))
  }
}
