//! Handlers for `/shipments` endpoints.
//!
//! | Method   | Path | Notes |
//! |----------|------|-------|
//! | `GET`    | `/shipments` | Optional `?status=<status>` |
//! | `POST`   | `/shipments` | Body: [`NewShipment`] |
//! | `GET`    | `/shipments/{id}` | `ETag` carries the version |
//! | `PUT`    | `/shipments/{id}` | Body: [`ShipmentUpdate`]; honours `If-Match` |
//!
//! Vehicle, trailer, driver and client references in a body must name
//! registered records (422 otherwise). Their display fields are refreshed from
//! the registries.
//! | `DELETE` | `/shipments/{id}` | 204, or 404 if not found |

use axum::{
  Json,
  extract::{Path, Query, State},
  http::{HeaderMap, HeaderValue, StatusCode, header},
  response::IntoResponse,
};
use chrono::Utc;
use fleet_core::{
  fleet::resolve_assignment,
  shipment::{NewShipment, Shipment, ShipmentUpdate, Status},
  store::{FleetStore, ShipmentStore, StoreError as _},
};
use serde::Deserialize;
use uuid::Uuid;

use crate::{ApiState, error::ApiError};

// ─── ETag ────────────────────────────────────────────────────────────────────

/// Strong ETag for a shipment version, e.g. `"3"`.
pub fn etag(version: u64) -> HeaderValue {
  // Digits and quotes are always valid header bytes.
  HeaderValue::from_str(&format!("\"{version}\"")).unwrap_or(HeaderValue::from_static("\"0\""))
}

/// Parse an `If-Match` header into a version. `*` and a missing header both
/// mean "any version".
fn if_match(headers: &HeaderMap) -> Result<Option<u64>, ApiError> {
  let Some(value) = headers.get(header::IF_MATCH) else {
    return Ok(None);
  };
  let raw = value
    .to_str()
    .map_err(|_| ApiError::BadRequest("If-Match is not valid ASCII".into()))?
    .trim();
  if raw == "*" {
    return Ok(None);
  }
  raw
    .trim_start_matches("W/")
    .trim_matches('"')
    .parse()
    .map(Some)
    .map_err(|_| ApiError::BadRequest(format!("If-Match {raw:?} is not a shipment version")))
}

fn with_etag(shipment: Shipment) -> impl IntoResponse {
  ([(header::ETAG, etag(shipment.version))], Json(shipment))
}

// ─── List ────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct ListParams {
  pub status: Option<Status>,
}

/// `GET /shipments[?status=<status>]`
pub async fn list<S>(
  State(state): State<ApiState<S>>,
  Query(params): Query<ListParams>,
) -> Result<Json<Vec<Shipment>>, ApiError>
where
  S: ShipmentStore,
{
  let mut shipments = state.store.list_shipments().await.map_err(ApiError::store)?;
  if let Some(status) = params.status {
    shipments.retain(|s| s.status == status);
  }
  Ok(Json(shipments))
}

// ─── Create ──────────────────────────────────────────────────────────────────

/// `POST /shipments`
pub async fn create<S>(
  State(state): State<ApiState<S>>,
  Json(mut body): Json<NewShipment>,
) -> Result<impl IntoResponse, ApiError>
where
  S: FleetStore,
{
  body.validate()?;
  resolve_assignment(state.store.as_ref(), body.assignment_mut()).await?;
  let shipment = state
    .store
    .create_shipment(body)
    .await
    .map_err(ApiError::store)?;
  tracing::info!(tracking_code = %shipment.tracking_code, "shipment created");
  Ok((StatusCode::CREATED, with_etag(shipment)))
}

// ─── Get one ─────────────────────────────────────────────────────────────────

async fn load<S: ShipmentStore>(store: &S, id: Uuid) -> Result<Shipment, ApiError> {
  store
    .get_shipment(id)
    .await
    .map_err(ApiError::store)?
    .ok_or_else(|| ApiError::NotFound(format!("shipment {id} not found")))
}

/// `GET /shipments/{id}`
pub async fn get_one<S>(
  State(state): State<ApiState<S>>,
  Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError>
where
  S: ShipmentStore,
{
  Ok(with_etag(load(state.store.as_ref(), id).await?))
}

// ─── Update ──────────────────────────────────────────────────────────────────

/// `PUT /shipments/{id}`
///
/// With `If-Match`, a version mismatch (checked up front, or lost to a
/// concurrent write during the save) is `412`. Without it, a lost race is
/// `409`.
pub async fn update<S>(
  State(state): State<ApiState<S>>,
  Path(id): Path<Uuid>,
  headers: HeaderMap,
  Json(mut body): Json<ShipmentUpdate>,
) -> Result<impl IntoResponse, ApiError>
where
  S: FleetStore,
{
  let expected = if_match(&headers)?;
  let mut shipment = load(state.store.as_ref(), id).await?;

  if let Some(expected) = expected
    && expected != shipment.version
  {
    return Err(ApiError::PreconditionFailed(format!(
      "shipment {id} is at version {}, not {expected}",
      shipment.version
    )));
  }

  resolve_assignment(state.store.as_ref(), body.assignment_mut()).await?;
  shipment.apply_update(body, Utc::now())?;
  let saved = match state.store.save_shipment(&shipment).await {
    Ok(saved) => saved,
    Err(e) if e.is_conflict() && expected.is_some() => {
      return Err(ApiError::PreconditionFailed(e.to_string()));
    }
    Err(e) => return Err(ApiError::store(e)),
  };
  tracing::info!(tracking_code = %saved.tracking_code, version = saved.version, "shipment updated");
  Ok(with_etag(saved))
}

// ─── Delete ──────────────────────────────────────────────────────────────────

/// `DELETE /shipments/{id}`
pub async fn delete<S>(
  State(state): State<ApiState<S>>,
  Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError>
where
  S: ShipmentStore,
{
  if state.store.delete_shipment(id).await.map_err(ApiError::store)? {
    Ok(StatusCode::NO_CONTENT)
  } else {
    Err(ApiError::NotFound(format!("shipment {id} not found")))
  }
}
