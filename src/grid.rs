use crate::geo::{wrap_longitude, GeoPoint, METERS_PER_DEGREE};

// Absorbs rounding in the step count so the far edge of an axis is not lost
// when the span is an exact multiple of the step.
const STEP_COUNT_TOLERANCE: f64 = 1e-9;

/// The rectangular neighbourhood of a scan, in degrees.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GridBounds {
    pub min_latitude: f64,
    pub max_latitude: f64,
    pub min_longitude: f64,
    pub max_longitude: f64,
}

impl GridBounds {
    /// Bounds spanning `radius_m` meters on each side of `center`. One degree of
    /// latitude is taken as 111 km and longitude is widened by 1/cos(latitude) of
    /// the center, which diverges at the poles.
    pub fn around(center: GeoPoint, radius_m: f64) -> Self {
        let lat_delta = radius_m / METERS_PER_DEGREE;
        let lon_delta = radius_m / (METERS_PER_DEGREE * center.latitude.to_radians().cos());
        Self {
            min_latitude: center.latitude - lat_delta,
            max_latitude: center.latitude + lat_delta,
            min_longitude: center.longitude - lon_delta,
            max_longitude: center.longitude + lon_delta,
        }
    }

    /// True when the latitude span stays strictly between the poles, which keeps
    /// every row's longitude step finite and positive.
    pub fn is_clear_of_poles(&self) -> bool {
        self.min_latitude > -90.0 && self.max_latitude < 90.0 && self.longitude_span().is_finite()
    }

    fn longitude_span(&self) -> f64 {
        self.max_longitude - self.min_longitude
    }

    /// Latitude inside the bounds that is nearest the equator, where rows are widest.
    fn widest_latitude(&self) -> f64 {
        if self.min_latitude > 0.0 {
            self.min_latitude
        } else if self.max_latitude < 0.0 {
            self.max_latitude
        } else {
            0.0
        }
    }
}

/// A lazily enumerated grid of candidate cells, spaced `resolution_m` meters
/// apart in both directions.
///
/// Cells are produced row-major: latitude ascending, then eastward within a
/// row. The longitude step is recomputed for every row so spacing in meters
/// stays roughly constant as meridians converge. Cell longitudes are wrapped
/// into [-180, 180) when a row crosses the antimeridian. Every call to
/// [`Grid::cells`] restarts the enumeration from the first cell.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Grid {
    bounds: GridBounds,
    resolution_m: f64,
}

impl Grid {
    pub fn new(bounds: GridBounds, resolution_m: f64) -> Self {
        Self {
            bounds,
            resolution_m,
        }
    }

    pub fn around(center: GeoPoint, radius_m: f64, resolution_m: f64) -> Self {
        Self::new(GridBounds::around(center, radius_m), resolution_m)
    }

    pub fn bounds(&self) -> GridBounds {
        self.bounds
    }

    pub fn latitude_step(&self) -> f64 {
        self.resolution_m / METERS_PER_DEGREE
    }

    pub fn longitude_step(&self, latitude: f64) -> f64 {
        self.resolution_m / (METERS_PER_DEGREE * latitude.to_radians().cos())
    }

    /// Latitudes of every row, ascending.
    pub fn latitudes(&self) -> impl Iterator<Item = f64> + Clone {
        axis(
            self.bounds.min_latitude,
            self.bounds.max_latitude,
            self.latitude_step(),
        )
    }

    /// Cells of the row at `latitude`, west to east.
    pub fn row(&self, latitude: f64) -> impl Iterator<Item = GeoPoint> + Clone {
        axis(
            self.bounds.min_longitude,
            self.bounds.max_longitude,
            self.longitude_step(latitude),
        )
        .map(move |longitude| GeoPoint::new(latitude, wrap_longitude(longitude)))
    }

    /// Every cell of the grid.
    pub fn cells(&self) -> impl Iterator<Item = GeoPoint> + Clone {
        let grid = *self;
        self.latitudes().flat_map(move |latitude| grid.row(latitude))
    }

    /// Upper estimate of the cell count, computed without enumerating.
    pub fn estimated_cells(&self) -> u64 {
        let rows = step_count(
            self.bounds.max_latitude - self.bounds.min_latitude,
            self.latitude_step(),
        );
        let columns = step_count(
            self.bounds.longitude_span(),
            self.longitude_step(self.bounds.widest_latitude()),
        );
        rows.saturating_mul(columns)
    }
}

/// Number of points `start, start + step, ...` that fit in a span.
fn step_count(span: f64, step: f64) -> u64 {
    let steps = (span / step + STEP_COUNT_TOLERANCE).floor();
    if steps.is_finite() && steps >= 0.0 {
        // `as` saturates for values beyond u64::MAX
        (steps as u64).saturating_add(1)
    } else {
        u64::MAX
    }
}

/// Points from `start` to `end` inclusive, `step` apart. Each point is derived
/// from its index so error does not accumulate along the axis.
fn axis(start: f64, end: f64, step: f64) -> impl Iterator<Item = f64> + Clone {
    let count = step_count(end - start, step);
    (0..count).map(move |i| start + i as f64 * step)
}
