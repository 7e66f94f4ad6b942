//! Find unclaimed grid cells ("gaps") around a coordinate.
//!
//! A scan lays a grid of candidate cells over a circle around a center point,
//! drops every cell that lies within a threshold distance of a known point, and
//! ranks what remains by haversine distance from the center.
//!
//! ```
//! use gapscan::{scan, GeoPoint, ScanRequest};
//!
//! let center = GeoPoint::new(52.3702, 4.8952);
//! let request = ScanRequest::new(center).with_radius(50.0).with_threshold(10.0);
//! let existing = [GeoPoint::new(52.3702, 4.8952)];
//!
//! let result = scan(&request, &existing).unwrap();
//! let nearest = result.nearest().unwrap();
//! assert!(nearest.distance_m > 10.0);
//! ```

pub mod error;
pub mod geo;
pub mod grid;
pub mod points;
pub mod report;
pub mod scan;

pub use error::{GeometryError, PointsError, RequestError};
pub use geo::{haversine_meters, GeoPoint};
pub use grid::{Grid, GridBounds};
pub use report::{ErrorReport, GapEntry, GapReport, NearbyGapsRequest};
pub use scan::{scan, scan_par, GapCandidate, ScanRequest, ScanResult};
