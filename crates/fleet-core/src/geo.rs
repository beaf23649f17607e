//! Geographic primitives: positions and great-circle distance.

use std::f64::consts::PI;

use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// Mean Earth radius used by every distance computation, in kilometres.
pub const EARTH_RADIUS_KM: f64 = 6371.0;

/// A WGS84 coordinate in decimal degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Position {
  pub lat: f64,
  pub lng: f64,
}

impl Position {
  pub const fn new(lat: f64, lng: f64) -> Self { Self { lat, lng } }

  /// `true` when both components are finite and within the WGS84 ranges.
  pub fn is_valid(&self) -> bool {
    self.lat.is_finite()
      && self.lng.is_finite()
      && (-90.0..=90.0).contains(&self.lat)
      && (-180.0..=180.0).contains(&self.lng)
  }

  pub fn validate(&self) -> Result<()> {
    if self.is_valid() {
      Ok(())
    } else {
      Err(Error::InvalidPosition { lat: self.lat, lng: self.lng })
    }
  }

  /// Haversine distance to `other`, in kilometres.
  pub fn distance_km(&self, other: &Position) -> f64 {
    haversine_km(*self, *other)
  }
}

fn deg_to_rad(deg: f64) -> f64 { deg * (PI / 180.0) }

/// Great-circle distance between two positions, in kilometres.
///
/// The coordinate deltas are converted to radians after subtraction, so
/// geofence boundaries are reproducible against any other implementation of
/// the same formula.
pub fn haversine_km(from: Position, to: Position) -> f64 {
  let d_lat = deg_to_rad(to.lat - from.lat);
  let d_lng = deg_to_rad(to.lng - from.lng);
  let a = (d_lat / 2.0).sin() * (d_lat / 2.0).sin()
    + deg_to_rad(from.lat).cos()
      * deg_to_rad(to.lat).cos()
      * (d_lng / 2.0).sin()
      * (d_lng / 2.0).sin();
  let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());
  EARTH_RADIUS_KM * c
}

/// Inclusive radius check: a point exactly on the boundary is inside.
pub fn within_radius_km(distance_km: f64, radius_km: f64) -> bool {
  distance_km <= radius_km
}

#[cfg(test)]
mod tests {
  use super::*;

  const PARIS: Position = Position::new(48.8566, 2.3522);
  const LYON: Position = Position::new(45.7578, 4.8320);

  #[test]
  fn same_point_is_zero() {
    assert_eq!(haversine_km(LYON, LYON), 0.0);
  }

  #[test]
  fn paris_to_lyon_is_about_392_km() {
    let d = haversine_km(PARIS, LYON);
    assert!((d - 392.0).abs() < 0.5, "distance was {d}");
  }

  #[test]
  fn distance_is_symmetric() {
    let there = haversine_km(PARIS, LYON);
    let back = haversine_km(LYON, PARIS);
    assert!((there - back).abs() < 1e-9);
  }

  #[test]
  fn one_degree_of_latitude() {
    let d = haversine_km(Position::new(0.0, 0.0), Position::new(1.0, 0.0));
    let expected = EARTH_RADIUS_KM * PI / 180.0;
    assert!((d - expected).abs() < 1e-9);
  }

  #[test]
  fn boundary_is_inclusive() {
    assert!(within_radius_km(1.0, 1000.0 / 1000.0));
    assert!(!within_radius_km(1.0 + 1e-9, 1.0));
  }

  #[test]
  fn position_ranges() {
    assert!(Position::new(90.0, 180.0).is_valid());
    assert!(Position::new(-90.0, -180.0).is_valid());
    assert!(!Position::new(200.0, 0.0).is_valid());
    assert!(!Position::new(0.0, -180.5).is_valid());
    assert!(!Position::new(f64::NAN, 0.0).is_valid());
    assert!(matches!(
      Position::new(91.0, 0.0).validate(),
      Err(Error::InvalidPosition { .. })
    ));
  }
}
