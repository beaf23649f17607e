//! SQL schema for the fleet SQLite store.
//!
//! Executed once at connection startup. Future migrations will be gated on
//! `PRAGMA user_version`.

/// Full schema DDL; idempotent thanks to `CREATE TABLE IF NOT EXISTS`.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;
PRAGMA foreign_keys = ON;

CREATE TABLE IF NOT EXISTS shipments (
    shipment_id   TEXT PRIMARY KEY,
    tracking_code TEXT NOT NULL UNIQUE,
    vehicle_id    TEXT,               -- denormalised from details for lookups
    status        TEXT NOT NULL,      -- always the status of the last history row
    version       INTEGER NOT NULL,   -- optimistic-concurrency counter
    created_at    TEXT NOT NULL,      -- ISO 8601 UTC
    details_json  TEXT NOT NULL       -- route, references, schedule
);

-- Status history is strictly append-only.
-- Rows are only ever deleted together with their shipment.
CREATE TABLE IF NOT EXISTS status_history (
    shipment_id TEXT NOT NULL REFERENCES shipments(shipment_id) ON DELETE CASCADE,
    seq         INTEGER NOT NULL,     -- 0-based position in the history
    status      TEXT NOT NULL,
    recorded_at TEXT NOT NULL,
    lat         REAL,
    lng         REAL,
    PRIMARY KEY (shipment_id, seq)
);

CREATE TABLE IF NOT EXISTS locations (
    location_id TEXT PRIMARY KEY,
    name        TEXT NOT NULL,
    kind        TEXT NOT NULL,        -- 'pickup' | 'delivery' | 'customs' | 'ferry' | 'other'
    address     TEXT,
    lat         REAL NOT NULL,
    lng         REAL NOT NULL,
    radius_m    INTEGER NOT NULL CHECK (radius_m BETWEEN 10 AND 5000),
    active      INTEGER NOT NULL DEFAULT 1
);

CREATE TABLE IF NOT EXISTS vehicles (
    vehicle_id   TEXT PRIMARY KEY,    -- key telemetry is reported under
    registration TEXT NOT NULL,
    model        TEXT NOT NULL,
    year         INTEGER,
    kind         TEXT NOT NULL,       -- 'truck' | 'trailer'
    status       TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS drivers (
    driver_id TEXT PRIMARY KEY,
    name      TEXT NOT NULL,
    phone     TEXT,
    license   TEXT,
    status    TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS clients (
    client_id TEXT PRIMARY KEY,
    name      TEXT NOT NULL,
    contact   TEXT,
    email     TEXT,
    phone     TEXT,
    address   TEXT,
    notes     TEXT NOT NULL DEFAULT '',
    active    INTEGER NOT NULL DEFAULT 1
);

-- Latest telemetry fix per vehicle. Not tied to the vehicles table: a feed may
-- report vehicles nobody registered.
CREATE TABLE IF NOT EXISTS vehicle_fixes (
    vehicle_id  TEXT PRIMARY KEY,
    lat         REAL NOT NULL,
    lng         REAL NOT NULL,
    speed_kmh   REAL NOT NULL,
    ignition    INTEGER NOT NULL,
    door_open   INTEGER NOT NULL,
    recorded_at TEXT NOT NULL,        -- ISO 8601 UTC
    recorded_ms INTEGER NOT NULL      -- same instant, for ordering
);

CREATE INDEX IF NOT EXISTS shipments_vehicle_idx ON shipments(vehicle_id, status);
CREATE INDEX IF NOT EXISTS locations_kind_idx    ON locations(kind, active);
CREATE INDEX IF NOT EXISTS vehicles_kind_idx     ON vehicles(kind);

PRAGMA user_version = 2;
";
