//! SQLite backend for the fleet tracker.
//!
//! Implements every storage trait of [`fleet_core::store`] (shipments,
//! geofences, the fleet registries and the latest-fix cache) on one database
//! file. Wraps [`tokio_rusqlite`] so all database access runs on a dedicated
//! thread without blocking the async runtime.

mod encode;
mod fleet;
mod schema;
mod store;

pub mod error;

pub use error::{Error, Result};
pub use store::SqliteStore;

#[cfg(test)]
mod tests;
