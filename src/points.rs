use std::io::Read;
use std::path::Path;

use csv::ReaderBuilder;
use log::info;
use ordered_float::OrderedFloat;
use serde::Deserialize;

use crate::error::PointsError;
use crate::geo::GeoPoint;

/// One row of a public point export. Only the coordinates take part in a
/// scan; `description` and `submitted_by` name the point in summaries.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct PointRecord {
    pub latitude: f64,
    pub longitude: f64,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub submitted_by: Option<String>,
}

impl PointRecord {
    pub fn location(&self) -> GeoPoint {
        GeoPoint::new(self.latitude, self.longitude)
    }

    /// Human-readable name, e.g. `Free fridge (by Anonymous)`.
    pub fn label(&self) -> String {
        let description = self.description.as_deref().unwrap_or("unnamed point");
        match self.submitted_by.as_deref() {
            Some(by) => format!("{description} (by {by})"),
            None => description.to_string(),
        }
    }
}

/// The record closest to `target`, with its distance in meters.
pub fn nearest_record<'a>(
    records: &'a [PointRecord],
    target: &GeoPoint,
) -> Option<(&'a PointRecord, f64)> {
    records
        .iter()
        .map(|record| (record, record.location().distance_to(target)))
        .min_by_key(|(_, distance)| OrderedFloat(*distance))
}

/// Reads point records from CSV with a header row. Columns are matched by
/// name, so extra columns are ignored.
pub fn read_records<R: Read>(reader: R) -> Result<Vec<PointRecord>, PointsError> {
    let mut rdr = ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let mut records = Vec::new();
    for (idx, result) in rdr.deserialize().enumerate() {
        let record: PointRecord = result?;
        record
            .location()
            .validate()
            .map_err(|source| PointsError::InvalidPoint {
                row: idx + 1,
                source,
            })?;
        records.push(record);
    }
    Ok(records)
}

/// The snapshot of existing points a scan runs against.
pub fn read_points<R: Read>(reader: R) -> Result<Vec<GeoPoint>, PointsError> {
    Ok(read_records(reader)?
        .iter()
        .map(PointRecord::location)
        .collect())
}

pub fn load_records(path: &Path) -> Result<Vec<PointRecord>, PointsError> {
    let file = std::fs::File::open(path).map_err(csv::Error::from)?;
    let records = read_records(file)?;
    info!("Loaded {} existing points from {}", records.len(), path.display());
    Ok(records)
}

pub fn load_points(path: &Path) -> Result<Vec<GeoPoint>, PointsError> {
    Ok(load_records(path)?
        .iter()
        .map(PointRecord::location)
        .collect())
}
