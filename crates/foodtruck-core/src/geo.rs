//! Geographic primitives shared by the validator, the planner and the store.
//!
//! Points are always held longitude-first, matching GeoJSON. User-facing
//! parameters are named `latitude`/`longitude` separately; the swap into
//! `[longitude, latitude]` happens here and nowhere else.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Mean earth radius in meters used for spherical (haversine) distances.
pub const EARTH_RADIUS_M: f64 = 6_371_008.8;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum InvalidLocation {
    #[error("{param} is not a number")]
    NotNumeric { param: &'static str },
    #[error("latitude {0} is outside [-90, 90]")]
    LatitudeOutOfRange(f64),
    #[error("longitude {0} is outside [-180, 180]")]
    LongitudeOutOfRange(f64),
    #[error("expected a GeoJSON Point, got type \"{0}\"")]
    NotAPoint(String),
}

#[must_use]
pub fn is_valid_latitude(latitude: f64) -> bool {
    (-90.0..=90.0).contains(&latitude)
}

#[must_use]
pub fn is_valid_longitude(longitude: f64) -> bool {
    (-180.0..=180.0).contains(&longitude)
}

/// A validated point on the globe.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(into = "GeoJsonPoint", try_from = "GeoJsonPoint")]
pub struct GeoPoint {
    longitude: f64,
    latitude: f64,
}

impl GeoPoint {
    /// Builds a point from explicitly named coordinates.
    ///
    /// # Errors
    ///
    /// Returns [`InvalidLocation`] when either coordinate is out of range.
    /// NaN fails both range checks.
    pub fn new(latitude: f64, longitude: f64) -> Result<Self, InvalidLocation> {
        if !is_valid_latitude(latitude) {
            return Err(InvalidLocation::LatitudeOutOfRange(latitude));
        }
        if !is_valid_longitude(longitude) {
            return Err(InvalidLocation::LongitudeOutOfRange(longitude));
        }
        Ok(Self {
            longitude,
            latitude,
        })
    }

    #[must_use]
    pub fn latitude(&self) -> f64 {
        self.latitude
    }

    #[must_use]
    pub fn longitude(&self) -> f64 {
        self.longitude
    }

    /// GeoJSON coordinate order: `[longitude, latitude]`.
    #[must_use]
    pub fn coordinates(&self) -> [f64; 2] {
        [self.longitude, self.latitude]
    }

    /// Great-circle (haversine) distance in meters. The store computes the
    /// same formula in SQL.
    #[must_use]
    pub fn distance_to(&self, other: &GeoPoint) -> f64 {
        let (lat1, lat2) = (self.latitude.to_radians(), other.latitude.to_radians());
        let d_lat = (other.latitude - self.latitude).to_radians();
        let d_lon = (other.longitude - self.longitude).to_radians();

        let a = (d_lat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (d_lon / 2.0).sin().powi(2);
        2.0 * EARTH_RADIUS_M * a.sqrt().min(1.0).asin()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct GeoJsonPoint {
    #[serde(rename = "type")]
    kind: String,
    coordinates: [f64; 2],
}

impl From<GeoPoint> for GeoJsonPoint {
    fn from(point: GeoPoint) -> Self {
        Self {
            kind: "Point".to_string(),
            coordinates: point.coordinates(),
        }
    }
}

impl TryFrom<GeoJsonPoint> for GeoPoint {
    type Error = InvalidLocation;

    fn try_from(value: GeoJsonPoint) -> Result<Self, Self::Error> {
        if value.kind != "Point" {
            return Err(InvalidLocation::NotAPoint(value.kind));
        }
        let [longitude, latitude] = value.coordinates;
        GeoPoint::new(latitude, longitude)
    }
}

/// A validated point-radius filter. Radius is in meters and carries no range
/// restriction: zero or negative values are passed through to the store.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GeoFilter {
    pub point: GeoPoint,
    pub radius_meters: f64,
}
