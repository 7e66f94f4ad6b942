use thiserror::Error;

/// Invalid geometry handed to the scanner. The scan itself cannot fail once
/// its inputs pass validation.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum GeometryError {
    #[error("coordinate ({latitude}, {longitude}) is not finite")]
    NonFiniteCoordinate { latitude: f64, longitude: f64 },

    #[error("coordinate ({latitude}, {longitude}) is out of range")]
    CoordinateOutOfRange { latitude: f64, longitude: f64 },

    #[error("radius must be a positive number of meters, got {0}")]
    NonPositiveRadius(f64),

    #[error("threshold must be a positive number of meters, got {0}")]
    NonPositiveThreshold(f64),

    #[error("grid resolution must be a positive number of meters, got {0}")]
    NonPositiveResolution(f64),

    #[error("scan area around latitude {latitude} with radius {radius} m reaches a pole")]
    CrossesPole { latitude: f64, radius: f64 },

    #[error("grid would hold about {estimated} cells, more than the limit of {limit}")]
    GridTooLarge { estimated: u64, limit: u64 },
}

#[derive(Error, Debug)]
pub enum PointsError {
    #[error("failed to read point data: {0}")]
    Csv(#[from] csv::Error),

    #[error("invalid point on row {row}: {source}")]
    InvalidPoint {
        row: usize,
        #[source]
        source: GeometryError,
    },
}

/// Problems with an incoming JSON request, before it reaches the scanner.
#[derive(Error, Debug)]
pub enum RequestError {
    #[error("latitude and longitude are required")]
    MissingCoordinates,

    #[error("malformed request body: {0}")]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Geometry(#[from] GeometryError),
}
