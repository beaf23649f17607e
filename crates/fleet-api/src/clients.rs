//! Handlers for `/clients` endpoints.
//!
//! | Method   | Path | Notes |
//! |----------|------|-------|
//! | `GET`    | `/clients` | |
//! | `POST`   | `/clients` | Body: [`NewClient`] |
//! | `GET`    | `/clients/{id}` | 404 if not found |
//! | `PUT`    | `/clients/{id}` | Body: [`NewClient`], replaces the client |
//! | `DELETE` | `/clients/{id}` | 204, or 404 if not found |

use axum::{
  Json,
  extract::{Path, State},
  http::StatusCode,
  response::IntoResponse,
};
use fleet_core::{
  fleet::{Client, NewClient},
  store::ClientRegistry,
};
use uuid::Uuid;

use crate::{ApiState, error::ApiError};

/// `GET /clients`
pub async fn list<S>(
  State(state): State<ApiState<S>>,
) -> Result<Json<Vec<Client>>, ApiError>
where
  S: ClientRegistry,
{
  Ok(Json(state.store.list_clients().await.map_err(ApiError::store)?))
}

/// `POST /clients`
pub async fn create<S>(
  State(state): State<ApiState<S>>,
  Json(body): Json<NewClient>,
) -> Result<impl IntoResponse, ApiError>
where
  S: ClientRegistry,
{
  body.clone().into_client(Uuid::nil())?;
  let client = state
    .store
    .add_client(body)
    .await
    .map_err(ApiError::store)?;
  Ok((StatusCode::CREATED, Json(client)))
}

/// `GET /clients/{id}`
pub async fn get_one<S>(
  State(state): State<ApiState<S>>,
  Path(id): Path<Uuid>,
) -> Result<Json<Client>, ApiError>
where
  S: ClientRegistry,
{
  let client = state
    .store
    .get_client(id)
    .await
    .map_err(ApiError::store)?
    .ok_or_else(|| ApiError::NotFound(format!("client {id} not found")))?;
  Ok(Json(client))
}

/// `PUT /clients/{id}`
///
/// Shipments keep the client name they were last saved with.
pub async fn update<S>(
  State(state): State<ApiState<S>>,
  Path(id): Path<Uuid>,
  Json(body): Json<NewClient>,
) -> Result<Json<Client>, ApiError>
where
  S: ClientRegistry,
{
  let client = body.into_client(id)?;
  let updated = state
    .store
    .update_client(&client)
    .await
    .map_err(ApiError::store)?
    .ok_or_else(|| ApiError::NotFound(format!("client {id} not found")))?;
  Ok(Json(updated))
}

/// `DELETE /clients/{id}`
pub async fn delete<S>(
  State(state): State<ApiState<S>>,
  Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError>
where
  S: ClientRegistry,
{
  if state.store.delete_client(id).await.map_err(ApiError::store)? {
    Ok(StatusCode::NO_CONTENT)
  } else {
    Err(ApiError::NotFound(format!("client {id} not found")))
  }
}
