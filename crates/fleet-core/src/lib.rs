//! Core types and trait definitions for the fleet tracker.
//!
//! This crate is deliberately free of HTTP and database dependencies. It holds
//! the shipment model, the status inference engine that runs on every
//! telemetry poll, and the storage traits the other crates implement.

// We intentionally use native `async fn` in traits (stabilised in Rust 1.75).
// Suppress the advisory lint about `Send` bounds on the returned futures.
#![allow(async_fn_in_trait)]

pub mod engine;
pub mod error;
pub mod fleet;
pub mod geo;
pub mod location;
pub mod poll;
pub mod shipment;
pub mod store;
pub mod telemetry;

pub use error::{Error, Result};
