//! Named geofences kept by the location registry.

use serde::{Deserialize, Serialize};
use strum::{EnumString, IntoStaticStr};
use uuid::Uuid;

use crate::{
  Error, Result,
  geo::{Position, within_radius_km},
};

pub const MIN_RADIUS_M: u32 = 10;
pub const MAX_RADIUS_M: u32 = 5000;
pub const DEFAULT_RADIUS_M: u32 = 500;

#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  Hash,
  Serialize,
  Deserialize,
  strum::Display,
  EnumString,
  IntoStaticStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum LocationKind {
  Pickup,
  Delivery,
  Customs,
  Ferry,
  Other,
}

/// A circular zone used to detect vehicle presence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Location {
  pub location_id: Uuid,
  pub name:        String,
  pub kind:        LocationKind,
  pub address:     Option<String>,
  pub position:    Position,
  /// Detection radius in metres, within `MIN_RADIUS_M..=MAX_RADIUS_M`.
  pub radius_m:    u32,
  /// Inactive locations never match.
  pub active:      bool,
}

impl Location {
  pub fn radius_km(&self) -> f64 { f64::from(self.radius_m) / 1000.0 }

  /// Whether `position` falls inside this geofence (boundary included).
  /// Ignores the `active` flag.
  pub fn contains(&self, position: &Position) -> bool {
    within_radius_km(self.position.distance_km(position), self.radius_km())
  }

  pub fn validate(&self) -> Result<()> {
    validate_radius(self.radius_m)?;
    self.position.validate()
  }
}

pub fn validate_radius(radius_m: u32) -> Result<()> {
  if (MIN_RADIUS_M..=MAX_RADIUS_M).contains(&radius_m) {
    Ok(())
  } else {
    Err(Error::InvalidRadius(radius_m))
  }
}

fn default_radius() -> u32 { DEFAULT_RADIUS_M }

fn default_active() -> bool { true }

/// Input to [`crate::store::LocationRegistry::add_location`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewLocation {
  pub name:     String,
  pub kind:     LocationKind,
  #[serde(default)]
  pub address:  Option<String>,
  pub position: Position,
  #[serde(default = "default_radius")]
  pub radius_m: u32,
  #[serde(default = "default_active")]
  pub active:   bool,
}

impl NewLocation {
  pub fn new(name: impl Into<String>, kind: LocationKind, position: Position) -> Self {
    Self {
      name: name.into(),
      kind,
      address: None,
      position,
      radius_m: DEFAULT_RADIUS_M,
      active: true,
    }
  }

  pub fn with_radius(mut self, radius_m: u32) -> Self {
    self.radius_m = radius_m;
    self
  }

  pub fn validate(&self) -> Result<()> {
    validate_radius(self.radius_m)?;
    self.position.validate()
  }

  pub fn into_location(self, location_id: Uuid) -> Result<Location> {
    let location = Location {
      location_id,
      name: self.name,
      kind: self.kind,
      address: self.address,
      position: self.position,
      radius_m: self.radius_m,
      active: self.active,
    };
    location.validate()?;
    Ok(location)
  }
}
