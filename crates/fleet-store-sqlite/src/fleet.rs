//! [`SqliteStore`] as vehicle, driver and client registry, and as the
//! latest-fix cache.

use rusqlite::OptionalExtension as _;
use uuid::Uuid;

use fleet_core::{
  fleet::{
    Client, Driver, NewClient, NewDriver, NewVehicle, Vehicle, VehicleKind,
  },
  store::{ClientRegistry, DriverRegistry, FixStore, VehicleRegistry},
  telemetry::TelemetrySample,
};

use crate::{
  Error, Result, SqliteStore,
  encode::{
    RawClient, RawDriver, RawFix, RawVehicle, encode_driver_status, encode_dt,
    encode_service_status, encode_uuid, encode_vehicle_kind,
  },
};

const VEHICLE_COLUMNS: &str = "vehicle_id, registration, model, year, kind, status";

const DRIVER_COLUMNS: &str = "driver_id, name, phone, license, status";

const CLIENT_COLUMNS: &str =
  "client_id, name, contact, email, phone, address, notes, active";

fn read_vehicle_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<RawVehicle> {
  Ok(RawVehicle {
    vehicle_id:   row.get(0)?,
    registration: row.get(1)?,
    model:        row.get(2)?,
    year:         row.get(3)?,
    kind:         row.get(4)?,
    status:       row.get(5)?,
  })
}

fn read_driver_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<RawDriver> {
  Ok(RawDriver {
    driver_id: row.get(0)?,
    name:      row.get(1)?,
    phone:     row.get(2)?,
    license:   row.get(3)?,
    status:    row.get(4)?,
  })
}

fn read_client_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<RawClient> {
  Ok(RawClient {
    client_id: row.get(0)?,
    name:      row.get(1)?,
    contact:   row.get(2)?,
    email:     row.get(3)?,
    phone:     row.get(4)?,
    address:   row.get(5)?,
    notes:     row.get(6)?,
    active:    row.get(7)?,
  })
}

// ─── VehicleRegistry impl ────────────────────────────────────────────────────

impl VehicleRegistry for SqliteStore {
  async fn add_vehicle(&self, input: NewVehicle) -> Result<Vehicle> {
    let vehicle = input.into_vehicle()?;

    let id           = vehicle.vehicle_id.clone();
    let registration = vehicle.registration.clone();
    let model        = vehicle.model.clone();
    let year         = vehicle.year.map(i64::from);
    let kind         = encode_vehicle_kind(vehicle.kind);
    let status       = encode_service_status(vehicle.status);

    let inserted = self
      .conn
      .call(move |conn| {
        let n = conn.execute(
          "INSERT INTO vehicles (vehicle_id, registration, model, year, kind, status)
           VALUES (?1, ?2, ?3, ?4, ?5, ?6)
           ON CONFLICT(vehicle_id) DO NOTHING",
          rusqlite::params![id, registration, model, year, kind, status],
        )?;
        Ok(n > 0)
      })
      .await?;

    if !inserted {
      return Err(Error::DuplicateVehicle(vehicle.vehicle_id));
    }
    tracing::debug!(vehicle = %vehicle.vehicle_id, kind = %vehicle.kind, "vehicle registered");
    Ok(vehicle)
  }

  async fn get_vehicle(&self, vehicle_id: &str) -> Result<Option<Vehicle>> {
    let id = vehicle_id.to_owned();
    let raw = self
      .conn
      .call(move |conn| {
        Ok(conn
          .query_row(
            &format!("SELECT {VEHICLE_COLUMNS} FROM vehicles WHERE vehicle_id = ?1"),
            rusqlite::params![id],
            read_vehicle_row,
          )
          .optional()?)
      })
      .await?;
    raw.map(RawVehicle::into_vehicle).transpose()
  }

  async fn list_vehicles(&self, kind: Option<VehicleKind>) -> Result<Vec<Vehicle>> {
    let kind = kind.map(encode_vehicle_kind);
    let raws: Vec<RawVehicle> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&format!(
          "SELECT {VEHICLE_COLUMNS} FROM vehicles
           WHERE ?1 IS NULL OR kind = ?1 ORDER BY rowid"
        ))?;
        let rows = stmt
          .query_map(rusqlite::params![kind], read_vehicle_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;
    raws.into_iter().map(RawVehicle::into_vehicle).collect()
  }

  async fn update_vehicle(&self, vehicle: &Vehicle) -> Result<Option<Vehicle>> {
    vehicle.validate()?;

    let id           = vehicle.vehicle_id.clone();
    let registration = vehicle.registration.clone();
    let model        = vehicle.model.clone();
    let year         = vehicle.year.map(i64::from);
    let kind         = encode_vehicle_kind(vehicle.kind);
    let status       = encode_service_status(vehicle.status);

    let changed = self
      .conn
      .call(move |conn| {
        Ok(conn.execute(
          "UPDATE vehicles
           SET registration = ?2, model = ?3, year = ?4, kind = ?5, status = ?6
           WHERE vehicle_id = ?1",
          rusqlite::params![id, registration, model, year, kind, status],
        )?)
      })
      .await?;
    Ok((changed > 0).then(|| vehicle.clone()))
  }

  async fn delete_vehicle(&self, vehicle_id: &str) -> Result<bool> {
    let id = vehicle_id.to_owned();
    let n = self
      .conn
      .call(move |conn| {
        Ok(conn.execute("DELETE FROM vehicles WHERE vehicle_id = ?1", rusqlite::params![id])?)
      })
      .await?;
    Ok(n > 0)
  }
}

// ─── DriverRegistry impl ─────────────────────────────────────────────────────

impl DriverRegistry for SqliteStore {
  async fn add_driver(&self, input: NewDriver) -> Result<Driver> {
    let driver = input.into_driver(Uuid::new_v4())?;
    self.write_driver(&driver, true).await?;
    Ok(driver)
  }

  async fn get_driver(&self, id: Uuid) -> Result<Option<Driver>> {
    let id_str = encode_uuid(id);
    let raw = self
      .conn
      .call(move |conn| {
        Ok(conn
          .query_row(
            &format!("SELECT {DRIVER_COLUMNS} FROM drivers WHERE driver_id = ?1"),
            rusqlite::params![id_str],
            read_driver_row,
          )
          .optional()?)
      })
      .await?;
    raw.map(RawDriver::into_driver).transpose()
  }

  async fn list_drivers(&self) -> Result<Vec<Driver>> {
    let raws: Vec<RawDriver> = self
      .conn
      .call(|conn| {
        let mut stmt =
          conn.prepare(&format!("SELECT {DRIVER_COLUMNS} FROM drivers ORDER BY rowid"))?;
        let rows = stmt
          .query_map([], read_driver_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;
    raws.into_iter().map(RawDriver::into_driver).collect()
  }

  async fn update_driver(&self, driver: &Driver) -> Result<Option<Driver>> {
    if driver.name.trim().is_empty() {
      return Err(fleet_core::Error::MissingField("name").into());
    }
    let changed = self.write_driver(driver, false).await?;
    Ok(changed.then(|| driver.clone()))
  }

  async fn delete_driver(&self, id: Uuid) -> Result<bool> {
    let id_str = encode_uuid(id);
    let n = self
      .conn
      .call(move |conn| {
        Ok(conn.execute("DELETE FROM drivers WHERE driver_id = ?1", rusqlite::params![id_str])?)
      })
      .await?;
    Ok(n > 0)
  }
}

// ─── ClientRegistry impl ─────────────────────────────────────────────────────

impl ClientRegistry for SqliteStore {
  async fn add_client(&self, input: NewClient) -> Result<Client> {
    let client = input.into_client(Uuid::new_v4())?;
    self.write_client(&client, true).await?;
    Ok(client)
  }

  async fn get_client(&self, id: Uuid) -> Result<Option<Client>> {
    let id_str = encode_uuid(id);
    let raw = self
      .conn
      .call(move |conn| {
        Ok(conn
          .query_row(
            &format!("SELECT {CLIENT_COLUMNS} FROM clients WHERE client_id = ?1"),
            rusqlite::params![id_str],
            read_client_row,
          )
          .optional()?)
      })
      .await?;
    raw.map(RawClient::into_client).transpose()
  }

  async fn list_clients(&self) -> Result<Vec<Client>> {
    let raws: Vec<RawClient> = self
      .conn
      .call(|conn| {
        let mut stmt =
          conn.prepare(&format!("SELECT {CLIENT_COLUMNS} FROM clients ORDER BY rowid"))?;
        let rows = stmt
          .query_map([], read_client_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;
    raws.into_iter().map(RawClient::into_client).collect()
  }

  async fn update_client(&self, client: &Client) -> Result<Option<Client>> {
    if client.name.trim().is_empty() {
      return Err(fleet_core::Error::MissingField("name").into());
    }
    let changed = self.write_client(client, false).await?;
    Ok(changed.then(|| client.clone()))
  }

  async fn delete_client(&self, id: Uuid) -> Result<bool> {
    let id_str = encode_uuid(id);
    let n = self
      .conn
      .call(move |conn| {
        Ok(conn.execute("DELETE FROM clients WHERE client_id = ?1", rusqlite::params![id_str])?)
      })
      .await?;
    Ok(n > 0)
  }
}

impl SqliteStore {
  /// Insert (`insert = true`) or update a driver row. Returns whether a row
  /// was written.
  async fn write_driver(&self, driver: &Driver, insert: bool) -> Result<bool> {
    let id      = encode_uuid(driver.driver_id);
    let name    = driver.name.clone();
    let phone   = driver.phone.clone();
    let license = driver.license.clone();
    let status  = encode_driver_status(driver.status);

    let sql = if insert {
      "INSERT INTO drivers (driver_id, name, phone, license, status)
       VALUES (?1, ?2, ?3, ?4, ?5)"
    } else {
      "UPDATE drivers SET name = ?2, phone = ?3, license = ?4, status = ?5
       WHERE driver_id = ?1"
    };
    let n = self
      .conn
      .call(move |conn| {
        Ok(conn.execute(sql, rusqlite::params![id, name, phone, license, status])?)
      })
      .await?;
    Ok(n > 0)
  }

  async fn write_client(&self, client: &Client, insert: bool) -> Result<bool> {
    let id      = encode_uuid(client.client_id);
    let name    = client.name.clone();
    let contact = client.contact.clone();
    let email   = client.email.clone();
    let phone   = client.phone.clone();
    let address = client.address.clone();
    let notes   = client.notes.clone();
    let active  = client.active;

    let sql = if insert {
      "INSERT INTO clients (client_id, name, contact, email, phone, address, notes, active)
       VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)"
    } else {
      "UPDATE clients
       SET name = ?2, contact = ?3, email = ?4, phone = ?5, address = ?6,
           notes = ?7, active = ?8
       WHERE client_id = ?1"
    };
    let n = self
      .conn
      .call(move |conn| {
        Ok(conn.execute(
          sql,
          rusqlite::params![id, name, contact, email, phone, address, notes, active],
        )?)
      })
      .await?;
    Ok(n > 0)
  }
}

// ─── FixStore impl ───────────────────────────────────────────────────────────

impl FixStore for SqliteStore {
  async fn record_fix(&self, sample: &TelemetrySample) -> Result<bool> {
    let vehicle_id  = sample.vehicle_id.clone();
    let lat         = sample.position.lat;
    let lng         = sample.position.lng;
    let speed       = sample.speed_kmh;
    let ignition    = sample.ignition;
    let door_open   = sample.door_open;
    let recorded_at = encode_dt(sample.recorded_at);
    let recorded_ms = sample.recorded_at.timestamp_millis();

    let n = self
      .conn
      .call(move |conn| {
        Ok(conn.execute(
          "INSERT INTO vehicle_fixes (
             vehicle_id, lat, lng, speed_kmh, ignition, door_open,
             recorded_at, recorded_ms
           ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
           ON CONFLICT(vehicle_id) DO UPDATE SET
             lat = excluded.lat, lng = excluded.lng,
             speed_kmh = excluded.speed_kmh, ignition = excluded.ignition,
             door_open = excluded.door_open, recorded_at = excluded.recorded_at,
             recorded_ms = excluded.recorded_ms
           WHERE excluded.recorded_ms >= vehicle_fixes.recorded_ms",
          rusqlite::params![
            vehicle_id,
            lat,
            lng,
            speed,
            ignition,
            door_open,
            recorded_at,
            recorded_ms,
          ],
        )?)
      })
      .await?;
    Ok(n > 0)
  }

  async fn latest_fix(&self, vehicle_id: &str) -> Result<Option<TelemetrySample>> {
    let id = vehicle_id.to_owned();
    let raw = self
      .conn
      .call(move |conn| {
        Ok(conn
          .query_row(
            "SELECT vehicle_id, lat, lng, speed_kmh, ignition, door_open, recorded_at
             FROM vehicle_fixes WHERE vehicle_id = ?1",
            rusqlite::params![id],
            |row| {
              Ok(RawFix {
                vehicle_id:  row.get(0)?,
                lat:         row.get(1)?,
                lng:         row.get(2)?,
                speed_kmh:   row.get(3)?,
                ignition:    row.get(4)?,
                door_open:   row.get(5)?,
                recorded_at: row.get(6)?,
              })
            },
          )
          .optional()?)
      })
      .await?;
    raw.map(RawFix::into_sample).transpose()
  }
}
