use log::debug;
use ordered_float::OrderedFloat;
use rayon::prelude::*;

use crate::error::GeometryError;
use crate::geo::GeoPoint;
use crate::grid::{Grid, GridBounds};

pub const DEFAULT_RADIUS_M: f64 = 100.0;
pub const DEFAULT_THRESHOLD_M: f64 = 10.0;
pub const DEFAULT_GRID_RESOLUTION_M: f64 = 10.0;
pub const DEFAULT_MAX_CELLS: u64 = 4_000_000;

/// Parameters of one gap search.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScanRequest {
    pub center: GeoPoint,
    /// Candidates farther than this from `center` are ignored.
    pub radius_m: f64,
    /// A candidate within this distance of an existing point is covered.
    pub threshold_m: f64,
    /// Spacing between neighbouring candidates.
    pub grid_resolution_m: f64,
    /// Requests whose grid would exceed this many cells are rejected.
    pub max_cells: u64,
}

impl ScanRequest {
    pub fn new(center: GeoPoint) -> Self {
        Self {
            center,
            radius_m: DEFAULT_RADIUS_M,
            threshold_m: DEFAULT_THRESHOLD_M,
            grid_resolution_m: DEFAULT_GRID_RESOLUTION_M,
            max_cells: DEFAULT_MAX_CELLS,
        }
    }

    pub fn with_radius(mut self, radius_m: f64) -> Self {
        self.radius_m = radius_m;
        self
    }

    pub fn with_threshold(mut self, threshold_m: f64) -> Self {
        self.threshold_m = threshold_m;
        self
    }

    pub fn with_grid_resolution(mut self, grid_resolution_m: f64) -> Self {
        self.grid_resolution_m = grid_resolution_m;
        self
    }

    pub fn with_max_cells(mut self, max_cells: u64) -> Self {
        self.max_cells = max_cells;
        self
    }

    /// Checks the request and returns the grid it will scan.
    pub fn grid(&self) -> Result<Grid, GeometryError> {
        self.center.validate()?;
        if !is_positive(self.radius_m) {
            return Err(GeometryError::NonPositiveRadius(self.radius_m));
        }
        if !is_positive(self.threshold_m) {
            return Err(GeometryError::NonPositiveThreshold(self.threshold_m));
        }
        if !is_positive(self.grid_resolution_m) {
            return Err(GeometryError::NonPositiveResolution(self.grid_resolution_m));
        }

        let bounds = GridBounds::around(self.center, self.radius_m);
        if !bounds.is_clear_of_poles() {
            return Err(GeometryError::CrossesPole {
                latitude: self.center.latitude,
                radius: self.radius_m,
            });
        }

        let grid = Grid::new(bounds, self.grid_resolution_m);
        let estimated = grid.estimated_cells();
        if estimated > self.max_cells {
            return Err(GeometryError::GridTooLarge {
                estimated,
                limit: self.max_cells,
            });
        }
        Ok(grid)
    }

    /// Decides what a single grid cell is. Stops checking existing points at the
    /// first one within threshold.
    pub fn classify(&self, cell: GeoPoint, existing: &[GeoPoint]) -> Classification {
        let distance_m = self.center.distance_to(&cell);
        if distance_m > self.radius_m {
            return Classification::OutsideRadius;
        }
        if existing
            .iter()
            .any(|point| cell.distance_to(point) <= self.threshold_m)
        {
            return Classification::Covered;
        }
        Classification::Gap(GapCandidate {
            point: cell,
            distance_m,
        })
    }
}

fn is_positive(value: f64) -> bool {
    value.is_finite() && value > 0.0
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Classification {
    OutsideRadius,
    Covered,
    Gap(GapCandidate),
}

/// A grid cell that is clear of every existing point. Values are unrounded.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GapCandidate {
    pub point: GeoPoint,
    pub distance_m: f64,
}

/// Outcome of a scan. Gaps are ordered by distance from the center; gaps at an
/// equal distance keep grid enumeration order.
#[derive(Debug, Clone, PartialEq)]
pub struct ScanResult {
    cells_scanned: usize,
    cells_in_radius: usize,
    nearby: Vec<GapCandidate>,
}

impl ScanResult {
    pub fn nearest(&self) -> Option<&GapCandidate> {
        self.nearby.first()
    }

    pub fn nearby(&self) -> &[GapCandidate] {
        &self.nearby
    }

    /// Grid cells enumerated, including those outside the radius.
    pub fn cells_scanned(&self) -> usize {
        self.cells_scanned
    }

    pub fn cells_in_radius(&self) -> usize {
        self.cells_in_radius
    }
}

/// Running totals folded over classified cells.
#[derive(Debug, Default)]
struct Tally {
    cells: usize,
    in_radius: usize,
    gaps: Vec<GapCandidate>,
}

impl Tally {
    fn record(mut self, classification: Classification) -> Self {
        self.cells += 1;
        match classification {
            Classification::OutsideRadius => {}
            Classification::Covered => self.in_radius += 1,
            Classification::Gap(gap) => {
                self.in_radius += 1;
                self.gaps.push(gap);
            }
        }
        self
    }

    /// Appends `later`, which must cover cells enumerated after ours.
    fn merge(mut self, mut later: Tally) -> Self {
        self.cells += later.cells;
        self.in_radius += later.in_radius;
        self.gaps.append(&mut later.gaps);
        self
    }

    fn finish(self) -> ScanResult {
        let mut nearby = self.gaps;
        // stable, so ties stay in enumeration order
        nearby.sort_by_key(|gap| OrderedFloat(gap.distance_m));
        ScanResult {
            cells_scanned: self.cells,
            cells_in_radius: self.in_radius,
            nearby,
        }
    }
}

fn validate_existing(existing: &[GeoPoint]) -> Result<(), GeometryError> {
    existing.iter().try_for_each(GeoPoint::validate)
}

/// Finds every gap within the request's radius, on the calling thread.
pub fn scan(request: &ScanRequest, existing: &[GeoPoint]) -> Result<ScanResult, GeometryError> {
    let grid = request.grid()?;
    validate_existing(existing)?;
    debug!(
        "Scanning ~{} cells around ({}, {}) against {} existing points",
        grid.estimated_cells(),
        request.center.latitude,
        request.center.longitude,
        existing.len()
    );

    let result = grid
        .cells()
        .map(|cell| request.classify(cell, existing))
        .fold(Tally::default(), Tally::record)
        .finish();

    log_outcome(&result);
    Ok(result)
}

/// Same as [`scan`], but classifies grid rows on the rayon thread pool. The
/// result is identical to the sequential one.
pub fn scan_par(request: &ScanRequest, existing: &[GeoPoint]) -> Result<ScanResult, GeometryError> {
    let grid = request.grid()?;
    validate_existing(existing)?;
    let rows: Vec<f64> = grid.latitudes().collect();
    debug!(
        "Scanning {} rows (~{} cells) around ({}, {}) in parallel against {} existing points",
        rows.len(),
        grid.estimated_cells(),
        request.center.latitude,
        request.center.longitude,
        existing.len()
    );

    let result = rows
        .into_par_iter()
        .map(|latitude| {
            grid.row(latitude)
                .map(|cell| request.classify(cell, existing))
                .fold(Tally::default(), Tally::record)
        })
        .reduce(Tally::default, Tally::merge)
        .finish();

    log_outcome(&result);
    Ok(result)
}

fn log_outcome(result: &ScanResult) {
    match result.nearest() {
        Some(nearest) => debug!(
            "Found {} gaps among {} cells in radius; nearest is {:.2} m away",
            result.nearby().len(),
            result.cells_in_radius(),
            nearest.distance_m
        ),
        None => debug!("No gaps among {} cells in radius", result.cells_in_radius()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ORIGIN: GeoPoint = GeoPoint {
        latitude: 0.0,
        longitude: 0.0,
    };

    fn amsterdam_points() -> Vec<GeoPoint> {
        vec![
            GeoPoint::new(52.370_200, 4.895_200),
            GeoPoint::new(52.370_350, 4.895_500),
            GeoPoint::new(52.369_900, 4.894_900),
            GeoPoint::new(52.370_600, 4.896_100),
        ]
    }

    fn amsterdam_request() -> ScanRequest {
        ScanRequest::new(GeoPoint::new(52.370_216, 4.895_168))
    }

    #[test]
    fn empty_existing_set_at_origin() {
        let request = ScanRequest::new(ORIGIN)
            .with_radius(50.0)
            .with_threshold(10.0)
            .with_grid_resolution(10.0);
        let result = scan(&request, &[]).unwrap();

        assert!(!result.nearby().is_empty());
        let nearest = result.nearest().unwrap();
        assert!(nearest.distance_m < 0.005);
        assert!(nearest.point.latitude.abs() < 1e-9);
        assert!(nearest.point.longitude.abs() < 1e-9);
        assert_eq!(result.nearby().len(), result.cells_in_radius());
    }

    #[test]
    fn threshold_beyond_radius_covers_everything() {
        let request = ScanRequest::new(ORIGIN)
            .with_radius(50.0)
            .with_threshold(60.0)
            .with_grid_resolution(10.0);
        let result = scan(&request, &[ORIGIN]).unwrap();

        assert!(result.nearby().is_empty());
        assert!(result.nearest().is_none());
        assert!(result.cells_in_radius() > 0);
    }

    #[test]
    fn point_at_center_with_threshold_equal_to_radius() {
        let center = GeoPoint::new(48.8566, 2.3522);
        let request = ScanRequest::new(center).with_radius(40.0).with_threshold(40.0);
        let result = scan(&request, &[center]).unwrap();
        assert!(result.nearest().is_none());
    }

    #[test]
    fn gaps_are_within_radius_and_clear_of_points() {
        let request = amsterdam_request();
        let existing = amsterdam_points();
        let result = scan(&request, &existing).unwrap();

        assert!(!result.nearby().is_empty());
        for gap in result.nearby() {
            assert!(gap.distance_m <= request.radius_m);
            assert_eq!(gap.distance_m, request.center.distance_to(&gap.point));
            for point in &existing {
                assert!(gap.point.distance_to(point) > request.threshold_m);
            }
        }
    }

    #[test]
    fn covered_cells_never_reported() {
        let request = amsterdam_request();
        let existing = amsterdam_points();
        let grid = request.grid().unwrap();
        let result = scan(&request, &existing).unwrap();

        let expected: Vec<GeoPoint> = grid
            .cells()
            .filter(|cell| request.center.distance_to(cell) <= request.radius_m)
            .filter(|cell| existing.iter().all(|p| cell.distance_to(p) > request.threshold_m))
            .collect();
        assert_eq!(result.nearby().len(), expected.len());
        for gap in result.nearby() {
            assert!(expected.contains(&gap.point));
        }
        assert!(result.cells_in_radius() > expected.len());
    }

    #[test]
    fn nearby_is_sorted_and_nearest_is_first() {
        let result = scan(&amsterdam_request(), &amsterdam_points()).unwrap();
        let nearby = result.nearby();
        assert!(nearby.windows(2).all(|w| w[0].distance_m <= w[1].distance_m));
        assert_eq!(result.nearest(), nearby.first());
    }

    #[test]
    fn parallel_scan_matches_sequential() {
        let request = amsterdam_request().with_radius(150.0).with_grid_resolution(5.0);
        let existing = amsterdam_points();
        let sequential = scan(&request, &existing).unwrap();
        let parallel = scan_par(&request, &existing).unwrap();
        assert_eq!(sequential, parallel);
    }

    #[test]
    fn classify_distinguishes_outcomes() {
        let request = ScanRequest::new(ORIGIN);
        let existing = [GeoPoint::new(0.0, 0.0005)];
        let expected = Classification::Gap(GapCandidate {
            point: ORIGIN,
            distance_m: 0.0,
        });
        assert_eq!(request.classify(ORIGIN, &existing), expected);
        assert_eq!(
            request.classify(GeoPoint::new(0.0, 0.000_45), &existing),
            Classification::Covered
        );
        assert_eq!(
            request.classify(GeoPoint::new(1.0, 1.0), &existing),
            Classification::OutsideRadius
        );
    }

    #[test]
    fn threshold_comparison_is_strict() {
        let request = ScanRequest::new(ORIGIN).with_threshold(10.0);
        let cell = GeoPoint::new(0.0, 0.0001);
        let exact = request.with_threshold(cell.distance_to(&ORIGIN));
        assert_eq!(exact.classify(cell, &[ORIGIN]), Classification::Covered);
        assert!(matches!(request.classify(cell, &[ORIGIN]), Classification::Gap(_)));
    }

    #[test]
    fn invalid_requests_are_rejected() {
        let base = ScanRequest::new(ORIGIN);
        assert_eq!(
            base.with_radius(0.0).grid(),
            Err(GeometryError::NonPositiveRadius(0.0))
        );
        assert_eq!(
            base.with_threshold(-1.0).grid(),
            Err(GeometryError::NonPositiveThreshold(-1.0))
        );
        assert_eq!(
            base.with_grid_resolution(0.0).grid(),
            Err(GeometryError::NonPositiveResolution(0.0))
        );
        assert!(matches!(
            base.with_grid_resolution(f64::NAN).grid(),
            Err(GeometryError::NonPositiveResolution(_))
        ));
        assert!(matches!(
            ScanRequest::new(GeoPoint::new(f64::NAN, 0.0)).grid(),
            Err(GeometryError::NonFiniteCoordinate { .. })
        ));
        assert!(matches!(
            ScanRequest::new(GeoPoint::new(89.9995, 0.0)).grid(),
            Err(GeometryError::CrossesPole { .. })
        ));
        assert!(matches!(
            base.with_radius(100_000.0).with_grid_resolution(1.0).grid(),
            Err(GeometryError::GridTooLarge { .. })
        ));
    }

    #[test]
    fn gaps_across_the_antimeridian_are_valid_points() {
        let request = ScanRequest::new(GeoPoint::new(0.0, 179.9999)).with_radius(50.0);
        let existing = [GeoPoint::new(0.0, -179.9999)];
        let result = scan(&request, &existing).unwrap();

        assert!(!result.nearby().is_empty());
        for gap in result.nearby() {
            assert!(gap.point.validate().is_ok(), "{gap:?}");
            assert!(gap.distance_m <= request.radius_m);
            assert!(gap.point.distance_to(&existing[0]) > request.threshold_m);
        }
        // the point east of the antimeridian still covers cells
        let empty = scan(&request, &[]).unwrap();
        assert!(result.nearby().len() < empty.nearby().len());
    }

    #[test]
    fn invalid_existing_point_is_rejected() {
        let request = ScanRequest::new(ORIGIN);
        let existing = [GeoPoint::new(0.0, 200.0)];
        assert!(matches!(
            scan(&request, &existing),
            Err(GeometryError::CoordinateOutOfRange { .. })
        ));
    }

    #[test]
    fn scan_counts_every_enumerated_cell() {
        let request = ScanRequest::new(ORIGIN).with_radius(50.0);
        let grid = request.grid().unwrap();
        let result = scan(&request, &[]).unwrap();
        assert_eq!(result.cells_scanned(), grid.cells().count());
        assert!(result.cells_in_radius() < result.cells_scanned());
    }
}
