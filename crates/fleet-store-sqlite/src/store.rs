//! [`SqliteStore`], the SQLite implementation of [`ShipmentStore`] and
//! [`LocationRegistry`].

use std::path::Path;

use chrono::Utc;
use rusqlite::{OptionalExtension as _, Transaction};
use uuid::Uuid;

use fleet_core::{
  location::{Location, LocationKind, NewLocation},
  shipment::{NewShipment, Shipment, Status},
  store::{LocationRegistry, ShipmentStore, StoreBackend},
};

use crate::{
  Error, Result,
  encode::{
    HistoryRow, RawLocation, RawShipment, RawStatusChange, encode_location_kind,
    encode_shipment, encode_status, encode_uuid,
  },
  schema::SCHEMA,
};

// ─── Store ───────────────────────────────────────────────────────────────────

/// A fleet store backed by a single SQLite file.
///
/// Cloning is cheap; the inner connection is reference-counted.
#[derive(Clone)]
pub struct SqliteStore {
  pub(crate) conn: tokio_rusqlite::Connection,
}

/// What happened to an optimistic update, decided on the database thread.
enum SaveOutcome {
  Saved,
  Missing,
  Conflict(i64),
  DuplicateCode,
  HistoryRewrite,
}

const SHIPMENT_COLUMNS: &str =
  "shipment_id, tracking_code, status, version, created_at, details_json";

const LOCATION_COLUMNS: &str =
  "location_id, name, kind, address, lat, lng, radius_m, active";

/// Read shipment rows matching `tail` (a `WHERE`/`ORDER BY` suffix) together
/// with their history.
fn read_shipments<P: rusqlite::Params>(
  conn: &rusqlite::Connection,
  tail: &str,
  params: P,
) -> rusqlite::Result<Vec<RawShipment>> {
  let mut stmt =
    conn.prepare(&format!("SELECT {SHIPMENT_COLUMNS} FROM shipments {tail}"))?;
  let mut rows = stmt
    .query_map(params, |row| {
      Ok(RawShipment {
        shipment_id:   row.get(0)?,
        tracking_code: row.get(1)?,
        status:        row.get(2)?,
        version:       row.get(3)?,
        created_at:    row.get(4)?,
        details_json:  row.get(5)?,
        history:       Vec::new(),
      })
    })?
    .collect::<rusqlite::Result<Vec<_>>>()?;

  let mut history = conn.prepare(
    "SELECT status, recorded_at, lat, lng FROM status_history
     WHERE shipment_id = ?1 ORDER BY seq",
  )?;
  for raw in &mut rows {
    raw.history = history
      .query_map(rusqlite::params![raw.shipment_id], |row| {
        Ok(RawStatusChange {
          status:      row.get(0)?,
          recorded_at: row.get(1)?,
          lat:         row.get(2)?,
          lng:         row.get(3)?,
        })
      })?
      .collect::<rusqlite::Result<Vec<_>>>()?;
  }
  Ok(rows)
}

/// Append `entries[from..]` to a shipment's history.
fn append_history(
  tx: &Transaction<'_>,
  shipment_id: &str,
  from: usize,
  entries: &[HistoryRow],
) -> rusqlite::Result<()> {
  let mut stmt = tx.prepare(
    "INSERT INTO status_history (shipment_id, seq, status, recorded_at, lat, lng)
     VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
  )?;
  for (seq, entry) in entries.iter().enumerate().skip(from) {
    stmt.execute(rusqlite::params![
      shipment_id,
      seq as i64,
      entry.status,
      entry.recorded_at,
      entry.lat,
      entry.lng,
    ])?;
  }
  Ok(())
}

fn read_location_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<RawLocation> {
  Ok(RawLocation {
    location_id: row.get(0)?,
    name:        row.get(1)?,
    kind:        row.get(2)?,
    address:     row.get(3)?,
    lat:         row.get(4)?,
    lng:         row.get(5)?,
    radius_m:    row.get(6)?,
    active:      row.get(7)?,
  })
}

impl SqliteStore {
  /// Open (or create) a store at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  /// Open an in-memory store, for tests.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  async fn init_schema(&self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  /// Run a shipment query and decode at most one result.
  async fn query_one_shipment(
    &self,
    tail: &'static str,
    param: String,
  ) -> Result<Option<Shipment>> {
    let raws = self
      .conn
      .call(move |conn| Ok(read_shipments(conn, tail, rusqlite::params![param])?))
      .await?;
    raws.into_iter().next().map(RawShipment::into_shipment).transpose()
  }

  async fn query_locations(
    &self,
    tail: &'static str,
    kind: Option<&'static str>,
  ) -> Result<Vec<Location>> {
    let raws: Vec<RawLocation> = self
      .conn
      .call(move |conn| {
        let sql = format!("SELECT {LOCATION_COLUMNS} FROM locations {tail}");
        let mut stmt = conn.prepare(&sql)?;
        let rows = match kind {
          Some(k) => stmt.query_map(rusqlite::params![k], read_location_row)?,
          None => stmt.query_map([], read_location_row)?,
        }
        .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawLocation::into_location).collect()
  }
}

impl StoreBackend for SqliteStore {
  type Error = Error;
}

// ─── ShipmentStore impl ──────────────────────────────────────────────────────

impl ShipmentStore for SqliteStore {
  async fn create_shipment(&self, input: NewShipment) -> Result<Shipment> {
    let shipment = Shipment::create(Uuid::new_v4(), input, Utc::now())?;
    let row = encode_shipment(&shipment)?;

    let inserted = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        let taken = tx
          .query_row(
            "SELECT 1 FROM shipments WHERE tracking_code = ?1",
            rusqlite::params![row.tracking_code],
            |_| Ok(()),
          )
          .optional()?
          .is_some();
        if taken {
          return Ok(false);
        }

        tx.execute(
          "INSERT INTO shipments (
             shipment_id, tracking_code, vehicle_id, status, version,
             created_at, details_json
           ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
          rusqlite::params![
            row.shipment_id,
            row.tracking_code,
            row.vehicle_id,
            row.status,
            row.version,
            row.created_at,
            row.details_json,
          ],
        )?;
        append_history(&tx, &row.shipment_id, 0, &row.history)?;
        tx.commit()?;
        Ok(true)
      })
      .await?;

    if !inserted {
      return Err(Error::DuplicateTrackingCode(shipment.tracking_code));
    }
    tracing::debug!(
      tracking_code = %shipment.tracking_code,
      shipment_id = %shipment.shipment_id,
      "shipment created"
    );
    Ok(shipment)
  }

  async fn get_shipment(&self, id: Uuid) -> Result<Option<Shipment>> {
    self
      .query_one_shipment("WHERE shipment_id = ?1", encode_uuid(id))
      .await
  }

  async fn find_by_tracking_code(&self, code: &str) -> Result<Option<Shipment>> {
    self
      .query_one_shipment("WHERE tracking_code = ?1", code.trim().to_owned())
      .await
  }

  async fn find_active_by_vehicle(&self, vehicle_id: &str) -> Result<Option<Shipment>> {
    let delivered = encode_status(Status::Delivered);
    let vehicle_id = vehicle_id.to_owned();

    let raws = self
      .conn
      .call(move |conn| {
        Ok(read_shipments(
          conn,
          "WHERE vehicle_id = ?1 AND status != ?2
           ORDER BY created_at DESC, rowid DESC LIMIT 1",
          rusqlite::params![vehicle_id, delivered],
        )?)
      })
      .await?;
    raws.into_iter().next().map(RawShipment::into_shipment).transpose()
  }

  async fn list_shipments(&self) -> Result<Vec<Shipment>> {
    let raws = self
      .conn
      .call(|conn| Ok(read_shipments(conn, "ORDER BY created_at, rowid", [])?))
      .await?;
    raws.into_iter().map(RawShipment::into_shipment).collect()
  }

  async fn save_shipment(&self, shipment: &Shipment) -> Result<Shipment> {
    shipment.check_history()?;
    let row = encode_shipment(shipment)?;
    let expected = row.version;

    let outcome = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        let current: Option<(i64, i64)> = tx
          .query_row(
            "SELECT s.version,
                    (SELECT COUNT(*) FROM status_history h
                     WHERE h.shipment_id = s.shipment_id)
             FROM shipments s WHERE s.shipment_id = ?1",
            rusqlite::params![row.shipment_id],
            |r| Ok((r.get(0)?, r.get(1)?)),
          )
          .optional()?;

        let Some((found, stored_len)) = current else {
          return Ok(SaveOutcome::Missing);
        };
        if found != expected {
          return Ok(SaveOutcome::Conflict(found));
        }
        let stored_len = stored_len as usize;
        if stored_len > row.history.len() {
          return Ok(SaveOutcome::HistoryRewrite);
        }
        let code_taken = tx
          .query_row(
            "SELECT 1 FROM shipments WHERE tracking_code = ?1 AND shipment_id != ?2",
            rusqlite::params![row.tracking_code, row.shipment_id],
            |_| Ok(()),
          )
          .optional()?
          .is_some();
        if code_taken {
          return Ok(SaveOutcome::DuplicateCode);
        }

        tx.execute(
          "UPDATE shipments
           SET tracking_code = ?2, vehicle_id = ?3, status = ?4,
               details_json = ?5, version = version + 1
           WHERE shipment_id = ?1 AND version = ?6",
          rusqlite::params![
            row.shipment_id,
            row.tracking_code,
            row.vehicle_id,
            row.status,
            row.details_json,
            expected,
          ],
        )?;
        append_history(&tx, &row.shipment_id, stored_len, &row.history)?;
        tx.commit()?;
        Ok(SaveOutcome::Saved)
      })
      .await?;

    match outcome {
      SaveOutcome::Saved => {
        let mut saved = shipment.clone();
        saved.version += 1;
        Ok(saved)
      }
      SaveOutcome::Missing => Err(Error::ShipmentNotFound(shipment.shipment_id)),
      SaveOutcome::Conflict(found) => Err(Error::VersionConflict {
        shipment_id: shipment.shipment_id,
        expected:    shipment.version,
        found:       found as u64,
      }),
      SaveOutcome::DuplicateCode => {
        Err(Error::DuplicateTrackingCode(shipment.tracking_code.clone()))
      }
      SaveOutcome::HistoryRewrite => Err(Error::HistoryRewrite(shipment.shipment_id)),
    }
  }

  async fn delete_shipment(&self, id: Uuid) -> Result<bool> {
    let id_str = encode_uuid(id);
    let deleted = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        tx.execute(
          "DELETE FROM status_history WHERE shipment_id = ?1",
          rusqlite::params![id_str],
        )?;
        let n = tx.execute(
          "DELETE FROM shipments WHERE shipment_id = ?1",
          rusqlite::params![id_str],
        )?;
        tx.commit()?;
        Ok(n > 0)
      })
      .await?;
    Ok(deleted)
  }
}

// ─── LocationRegistry impl ───────────────────────────────────────────────────

impl LocationRegistry for SqliteStore {
  async fn add_location(&self, input: NewLocation) -> Result<Location> {
    let location = input.into_location(Uuid::new_v4())?;

    let id_str   = encode_uuid(location.location_id);
    let name     = location.name.clone();
    let kind_str = encode_location_kind(location.kind);
    let address  = location.address.clone();
    let lat      = location.position.lat;
    let lng      = location.position.lng;
    let radius   = i64::from(location.radius_m);
    let active   = location.active;

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO locations (
             location_id, name, kind, address, lat, lng, radius_m, active
           ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
          rusqlite::params![id_str, name, kind_str, address, lat, lng, radius, active],
        )?;
        Ok(())
      })
      .await?;

    Ok(location)
  }

  async fn get_location(&self, id: Uuid) -> Result<Option<Location>> {
    let id_str = encode_uuid(id);

    let raw: Option<RawLocation> = self
      .conn
      .call(move |conn| {
        Ok(conn
          .query_row(
            &format!("SELECT {LOCATION_COLUMNS} FROM locations WHERE location_id = ?1"),
            rusqlite::params![id_str],
            read_location_row,
          )
          .optional()?)
      })
      .await?;

    raw.map(RawLocation::into_location).transpose()
  }

  async fn list_locations(&self) -> Result<Vec<Location>> {
    self.query_locations("ORDER BY rowid", None).await
  }

  async fn list_active(&self, kind: Option<LocationKind>) -> Result<Vec<Location>> {
    match kind {
      Some(k) => {
        self
          .query_locations(
            "WHERE active = 1 AND kind = ?1 ORDER BY rowid",
            Some(encode_location_kind(k)),
          )
          .await
      }
      None => self.query_locations("WHERE active = 1 ORDER BY rowid", None).await,
    }
  }

  async fn update_location(&self, location: &Location) -> Result<Option<Location>> {
    location.validate()?;

    let id_str   = encode_uuid(location.location_id);
    let name     = location.name.clone();
    let kind_str = encode_location_kind(location.kind);
    let address  = location.address.clone();
    let lat      = location.position.lat;
    let lng      = location.position.lng;
    let radius   = i64::from(location.radius_m);
    let active   = location.active;

    let changed = self
      .conn
      .call(move |conn| {
        Ok(conn.execute(
          "UPDATE locations
           SET name = ?2, kind = ?3, address = ?4, lat = ?5, lng = ?6,
               radius_m = ?7, active = ?8
           WHERE location_id = ?1",
          rusqlite::params![id_str, name, kind_str, address, lat, lng, radius, active],
        )?)
      })
      .await?;

    Ok((changed > 0).then(|| location.clone()))
  }

  async fn delete_location(&self, id: Uuid) -> Result<bool> {
    let id_str = encode_uuid(id);
    let n = self
      .conn
      .call(move |conn| {
        Ok(conn.execute(
          "DELETE FROM locations WHERE location_id = ?1",
          rusqlite::params![id_str],
        )?)
      })
      .await?;
    Ok(n > 0)
  }
}
