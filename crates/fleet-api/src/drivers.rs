//! Handlers for `/drivers` endpoints.
//!
//! | Method   | Path | Notes |
//! |----------|------|-------|
//! | `GET`    | `/drivers` | |
//! | `POST`   | `/drivers` | Body: [`NewDriver`] |
//! | `GET`    | `/drivers/{id}` | 404 if not found |
//! | `PUT`    | `/drivers/{id}` | Body: [`NewDriver`], replaces the driver |
//! | `DELETE` | `/drivers/{id}` | 204, or 404 if not found |

use axum::{
  Json,
  extract::{Path, State},
  http::StatusCode,
  response::IntoResponse,
};
use fleet_core::{
  fleet::{Driver, NewDriver},
  store::DriverRegistry,
};
use uuid::Uuid;

use crate::{ApiState, error::ApiError};

/// `GET /drivers`
pub async fn list<S>(
  State(state): State<ApiState<S>>,
) -> Result<Json<Vec<Driver>>, ApiError>
where
  S: DriverRegistry,
{
  Ok(Json(state.store.list_drivers().await.map_err(ApiError::store)?))
}

/// `POST /drivers`
pub async fn create<S>(
  State(state): State<ApiState<S>>,
  Json(body): Json<NewDriver>,
) -> Result<impl IntoResponse, ApiError>
where
  S: DriverRegistry,
{
  body.clone().into_driver(Uuid::nil())?;
  let driver = state
    .store
    .add_driver(body)
    .await
    .map_err(ApiError::store)?;
  Ok((StatusCode::CREATED, Json(driver)))
}

/// `GET /drivers/{id}`
pub async fn get_one<S>(
  State(state): State<ApiState<S>>,
  Path(id): Path<Uuid>,
) -> Result<Json<Driver>, ApiError>
where
  S: DriverRegistry,
{
  let driver = state
    .store
    .get_driver(id)
    .await
    .map_err(ApiError::store)?
    .ok_or_else(|| ApiError::NotFound(format!("driver {id} not found")))?;
  Ok(Json(driver))
}

/// `PUT /drivers/{id}`
///
/// Shipments keep the driver name they were last saved with.
pub async fn update<S>(
  State(state): State<ApiState<S>>,
  Path(id): Path<Uuid>,
  Json(body): Json<NewDriver>,
) -> Result<Json<Driver>, ApiError>
where
  S: DriverRegistry,
{
  let driver = body.into_driver(id)?;
  let updated = state
    .store
    .update_driver(&driver)
    .await
    .map_err(ApiError::store)?
    .ok_or_else(|| ApiError::NotFound(format!("driver {id} not found")))?;
  Ok(Json(updated))
}

/// `DELETE /drivers/{id}`
pub async fn delete<S>(
  State(state): State<ApiState<S>>,
  Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError>
where
  S: DriverRegistry,
{
  if state.store.delete_driver(id).await.map_err(ApiError::store)? {
    Ok(StatusCode::NO_CONTENT)
  } else {
    Err(ApiError::NotFound(format!("driver {id} not found")))
  }
}
