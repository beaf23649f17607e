//! Handlers for `/locations` endpoints.
//!
//! | Method   | Path | Notes |
//! |----------|------|-------|
//! | `GET`    | `/locations` | Optional `?kind=<kind>` and `?active=true\|false` |
//! | `POST`   | `/locations` | Body: [`NewLocation`] |
//! | `GET`    | `/locations/{id}` | 404 if not found |
//! | `PUT`    | `/locations/{id}` | Body: [`NewLocation`], replaces the location |
//! | `DELETE` | `/locations/{id}` | 204, or 404 if not found |

use axum::{
  Json,
  extract::{Path, Query, State},
  http::StatusCode,
  response::IntoResponse,
};
use fleet_core::{
  location::{Location, LocationKind, NewLocation},
  store::LocationRegistry,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::{ApiState, error::ApiError};

// ─── List ────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct ListParams {
  pub kind:   Option<LocationKind>,
  pub active: Option<bool>,
}

/// `GET /locations[?kind=<kind>][&active=<bool>]`
pub async fn list<S>(
  State(state): State<ApiState<S>>,
  Query(params): Query<ListParams>,
) -> Result<Json<Vec<Location>>, ApiError>
where
  S: LocationRegistry,
{
  let mut locations = match params.active {
    Some(true) => state.store.list_active(params.kind).await,
    _ => state.store.list_locations().await,
  }
  .map_err(ApiError::store)?;

  locations.retain(|l| {
    params.kind.is_none_or(|k| l.kind == k)
      && params.active.is_none_or(|a| l.active == a)
  });
  Ok(Json(locations))
}

// ─── Create ──────────────────────────────────────────────────────────────────

/// `POST /locations`
pub async fn create<S>(
  State(state): State<ApiState<S>>,
  Json(body): Json<NewLocation>,
) -> Result<impl IntoResponse, ApiError>
where
  S: LocationRegistry,
{
  body.validate()?;
  let location = state
    .store
    .add_location(body)
    .await
    .map_err(ApiError::store)?;
  Ok((StatusCode::CREATED, Json(location)))
}

// ─── Get one ─────────────────────────────────────────────────────────────────

/// `GET /locations/{id}`
pub async fn get_one<S>(
  State(state): State<ApiState<S>>,
  Path(id): Path<Uuid>,
) -> Result<Json<Location>, ApiError>
where
  S: LocationRegistry,
{
  let location = state
    .store
    .get_location(id)
    .await
    .map_err(ApiError::store)?
    .ok_or_else(|| ApiError::NotFound(format!("location {id} not found")))?;
  Ok(Json(location))
}

// ─── Update ──────────────────────────────────────────────────────────────────

/// `PUT /locations/{id}`
pub async fn update<S>(
  State(state): State<ApiState<S>>,
  Path(id): Path<Uuid>,
  Json(body): Json<NewLocation>,
) -> Result<Json<Location>, ApiError>
where
  S: LocationRegistry,
{
  let location = body.into_location(id)?;
  let updated = state
    .store
    .update_location(&location)
    .await
    .map_err(ApiError::store)?
    .ok_or_else(|| ApiError::NotFound(format!("location {id} not found")))?;
  Ok(Json(updated))
}

// ─── Delete ──────────────────────────────────────────────────────────────────

/// `DELETE /locations/{id}`
pub async fn delete<S>(
  State(state): State<ApiState<S>>,
  Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError>
where
  S: LocationRegistry,
{
  if state.store.delete_location(id).await.map_err(ApiError::store)? {
    Ok(StatusCode::NO_CONTENT)
  } else {
    Err(ApiError::NotFound(format!("location {id} not found")))
  }
}
