use serde::{Deserialize, Serialize};

use crate::error::GeometryError;

/// Mean Earth radius in meters.
pub const EARTH_RADIUS_M: f64 = 6_371_000.0;

/// Approximate length of one degree of latitude, in meters.
pub const METERS_PER_DEGREE: f64 = 111_000.0;

/// A latitude/longitude pair in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub latitude: f64,
    pub longitude: f64,
}

impl GeoPoint {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }

    /// Rejects non-finite coordinates and coordinates outside [-90, 90] x [-180, 180].
    pub fn validate(&self) -> Result<(), GeometryError> {
        if !self.latitude.is_finite() || !self.longitude.is_finite() {
            return Err(GeometryError::NonFiniteCoordinate {
                latitude: self.latitude,
                longitude: self.longitude,
            });
        }
        if !(-90.0..=90.0).contains(&self.latitude) || !(-180.0..=180.0).contains(&self.longitude)
        {
            return Err(GeometryError::CoordinateOutOfRange {
                latitude: self.latitude,
                longitude: self.longitude,
            });
        }
        Ok(())
    }

    /// Great-circle distance to `other`, in meters.
    pub fn distance_to(&self, other: &GeoPoint) -> f64 {
        haversine_meters(self.latitude, self.longitude, other.latitude, other.longitude)
    }
}

impl From<(f64, f64)> for GeoPoint {
    fn from((latitude, longitude): (f64, f64)) -> Self {
        Self::new(latitude, longitude)
    }
}

/// Great-circle distance using the haversine formula.
/// Input lat/lon in degrees. Output in meters.
pub fn haversine_meters(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    let dlat = (lat2 - lat1).to_radians();
    let dlon = (lon2 - lon1).to_radians();
    let h = (dlat / 2.0).sin().powi(2)
        + lat1.to_radians().cos() * lat2.to_radians().cos() * (dlon / 2.0).sin().powi(2);
    // h can overshoot 1 by an ulp for antipodal points. clamp (unlike min) keeps NaN.
    2.0 * EARTH_RADIUS_M * h.sqrt().clamp(0.0, 1.0).asin()
}

/// Brings a longitude into [-180, 180). Longitudes already in range are unchanged,
/// except 180 which maps to -180.
pub fn wrap_longitude(longitude: f64) -> f64 {
    if (-180.0..180.0).contains(&longitude) {
        longitude
    } else {
        (longitude + 180.0).rem_euclid(360.0) - 180.0
    }
}

/// Rounds to `decimals` places, folding negative zero into zero.
pub fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round() / factor + 0.0
}
