use serde::{Deserialize, Serialize};

use crate::error::RequestError;
use crate::geo::{round_to, GeoPoint};
use crate::scan::{
    GapCandidate, ScanRequest, ScanResult, DEFAULT_GRID_RESOLUTION_M, DEFAULT_MAX_CELLS,
    DEFAULT_RADIUS_M, DEFAULT_THRESHOLD_M,
};

const COORDINATE_DECIMALS: i32 = 6;
const DISTANCE_DECIMALS: i32 = 2;

fn default_radius() -> f64 {
    DEFAULT_RADIUS_M
}

fn default_threshold() -> f64 {
    DEFAULT_THRESHOLD_M
}

fn default_grid_resolution() -> f64 {
    DEFAULT_GRID_RESOLUTION_M
}

/// Body of a nearby-gaps request. Distances are in meters.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NearbyGapsRequest {
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    #[serde(default = "default_radius")]
    pub radius: f64,
    #[serde(default = "default_threshold")]
    pub threshold: f64,
    #[serde(default = "default_grid_resolution")]
    pub grid_resolution: f64,
}

impl NearbyGapsRequest {
    /// Parses a request body. An empty body is read as `{}`.
    pub fn from_json(body: &str) -> Result<Self, RequestError> {
        let body = if body.trim().is_empty() { "{}" } else { body };
        Ok(serde_json::from_str(body)?)
    }

    /// Validated scan parameters for this request, under the default cell limit.
    pub fn to_scan_request(&self) -> Result<ScanRequest, RequestError> {
        self.to_scan_request_with_max_cells(DEFAULT_MAX_CELLS)
    }

    /// Validated scan parameters for this request. The grid size is checked
    /// against `max_cells`.
    pub fn to_scan_request_with_max_cells(
        &self,
        max_cells: u64,
    ) -> Result<ScanRequest, RequestError> {
        let (Some(latitude), Some(longitude)) = (self.latitude, self.longitude) else {
            return Err(RequestError::MissingCoordinates);
        };
        let request = ScanRequest::new(GeoPoint::new(latitude, longitude))
            .with_radius(self.radius)
            .with_threshold(self.threshold)
            .with_grid_resolution(self.grid_resolution)
            .with_max_cells(max_cells);
        request.grid()?;
        Ok(request)
    }
}

/// A gap as presented to clients: coordinates to 6 decimals, distance to 2.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize, Serialize)]
pub struct GapEntry {
    pub latitude: f64,
    pub longitude: f64,
    pub distance: f64,
}

impl From<&GapCandidate> for GapEntry {
    fn from(gap: &GapCandidate) -> Self {
        Self {
            latitude: round_to(gap.point.latitude, COORDINATE_DECIMALS),
            longitude: round_to(gap.point.longitude, COORDINATE_DECIMALS),
            distance: round_to(gap.distance_m, DISTANCE_DECIMALS),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GapReport {
    pub success: bool,
    pub user_location: GeoPoint,
    pub radius: f64,
    pub threshold: f64,
    pub grid_resolution: f64,
    pub nearby_count: usize,
    pub nearest: Option<GapEntry>,
    pub nearby: Vec<GapEntry>,
}

impl GapReport {
    pub fn new(request: &ScanRequest, result: &ScanResult) -> Self {
        let nearby: Vec<GapEntry> = result.nearby().iter().map(GapEntry::from).collect();
        Self {
            success: true,
            user_location: request.center,
            radius: request.radius_m,
            threshold: request.threshold_m,
            grid_resolution: request.grid_resolution_m,
            nearby_count: nearby.len(),
            nearest: nearby.first().copied(),
            nearby,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct ErrorReport {
    pub success: bool,
    pub error: String,
}

impl ErrorReport {
    pub fn new(error: impl ToString) -> Self {
        Self {
            success: false,
            error: error.to_string(),
        }
    }
}
