//! Record builders shared by unit and behaviour tests across the workspace.

use geo::{Coord, Geometry, LineString};

use crate::schema::{ASSET_COLUMNS, TRAIL_COLUMNS};
use crate::{Record, RecordTable, SpatialRecord, SpatialTable, Value};

/// Build an asset record carrying every mapped source column.
///
/// Unset attributes are null; `assetid` is derived from the coordinates so
/// that rows stay distinguishable.
#[must_use]
pub fn asset_record(category: &str, latitude: Option<f64>, longitude: Option<f64>) -> Record {
    ASSET_COLUMNS
        .iter()
        .map(|(source, _)| {
            let value = match *source {
                "asset_category" => Value::from(category),
                "gis_latitude" => Value::from(latitude),
                "gis_longitude" => Value::from(longitude),
                "park" => Value::from("Goldstream Park"),
                "name" => Value::from("None"),
                _ => Value::Null,
            };
            ((*source).to_owned(), value)
        })
        .collect()
}

/// Collect records into a table.
#[must_use]
pub fn record_table<I>(rows: I) -> RecordTable
where
    I: IntoIterator<Item = Record>,
{
    let mut table = RecordTable::default();
    for row in rows {
        table.push(row);
    }
    table
}

/// Build a single-row trail table with a two-vertex WGS84 line.
#[must_use]
pub fn trail_table(name: &str, line: [Coord<f64>; 2]) -> SpatialTable {
    let attributes: Record = TRAIL_COLUMNS
        .iter()
        .map(|(source, _)| {
            let value = match *source {
                "trail_name" => Value::from(name),
                "length_m" => Value::Float(250.0),
                _ => Value::Null,
            };
            ((*source).to_owned(), value)
        })
        .collect();
    SpatialTable {
        columns: TRAIL_COLUMNS
            .iter()
            .map(|(source, _)| (*source).to_owned())
            .collect(),
        rows: vec![SpatialRecord {
            attributes,
            geometry: Some(Geometry::LineString(LineString::new(line.to_vec()))),
        }],
    }
}
