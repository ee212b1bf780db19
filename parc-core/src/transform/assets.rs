//! Asset point dataset cleaning.

use geo::{Geometry, Intersects, Point};
use log::info;

use super::{TransformError, coerce_columns, require_columns};
use crate::schema::{
    ASSET_COLUMNS, CATEGORY_SOURCE_COLUMN, LATITUDE_SOURCE_COLUMN, LONGITUDE_SOURCE_COLUMN,
    bc_bounds, is_published_category, output_columns,
};
use crate::{FeatureRow, FeatureTable, Record, RecordTable, Value};

const DATASET: &str = "Assets";

/// Clean the concatenated asset records into a point feature table.
///
/// Rows are filtered to the published categories, projected onto the asset
/// column mapping, stripped of missing or out-of-province coordinates and
/// given a WGS84 point built from their longitude and latitude. An empty
/// input yields an empty table with the full column set.
///
/// # Errors
///
/// Returns [`TransformError::MissingColumn`] when the input has rows but lacks
/// one of the mapped source columns.
///
/// # Examples
///
/// ```
/// use parc_core::{Record, RecordTable, Value, transform::transform_assets};
///
/// let mut raw = RecordTable::default();
/// let mut row = Record::new();
/// for (key, value) in [
///     ("assetid", Value::Int(1)),
///     ("gisid", Value::from("G-1")),
///     ("park", Value::from("Goldstream")),
///     ("park_subarea", Value::Null),
///     ("asset_category", Value::from("Signs")),
///     ("asset_type", Value::from("Trailhead")),
///     ("description", Value::Null),
///     ("campsite_number", Value::Null),
///     ("name", Value::from("Main")),
///     ("accessible", Value::Bool(true)),
///     ("route_accessible", Value::Bool(false)),
///     ("gis_latitude", Value::Float(48.47)),
///     ("gis_longitude", Value::Float(-123.55)),
/// ] {
///     row.insert(key.into(), value);
/// }
/// raw.push(row);
///
/// let table = transform_assets(raw)?;
/// assert_eq!(table.len(), 1);
/// assert_eq!(table.column_count(), 14);
/// # Ok::<(), parc_core::transform::TransformError>(())
/// ```
pub fn transform_assets(raw: RecordTable) -> Result<FeatureTable, TransformError> {
    if !raw.is_empty() {
        require_columns(DATASET, &ASSET_COLUMNS, |column| raw.has_column(column))?;
    }

    info!("..filtering asset categories");
    let rows: Vec<Record> = raw
        .into_rows()
        .into_iter()
        .filter(|row| {
            row.get(CATEGORY_SOURCE_COLUMN)
                .and_then(Value::as_str)
                .is_some_and(is_published_category)
        })
        .collect();

    info!("..cleaning up asset column names");
    info!("..cleaning up missing and out-of-range coordinates");
    let bounds = bc_bounds();
    let mut table = FeatureTable::new(output_columns(&ASSET_COLUMNS));
    let mut missing = 0_usize;
    let mut outside = 0_usize;
    for mut row in rows {
        let Some(position) = coordinates(&row) else {
            missing += 1;
            continue;
        };
        if !bounds.intersects(&position) {
            outside += 1;
            continue;
        }
        let values = ASSET_COLUMNS
            .iter()
            .map(|(source, _)| row.remove(*source).unwrap_or(Value::Null))
            .collect();
        table.push(FeatureRow {
            values,
            geometry: Some(Geometry::Point(position)),
        });
    }
    info!("..dropped {missing} rows without coordinates and {outside} rows outside BC");

    info!("..converting the assets dataset to features");
    coerce_columns(&mut table);
    info!(
        "..the final assets dataset has {} rows and {} columns",
        table.len(),
        table.column_count()
    );
    Ok(table)
}

fn coordinates(row: &Record) -> Option<Point<f64>> {
    let latitude = numeric(row.get(LATITUDE_SOURCE_COLUMN)?)?;
    let longitude = numeric(row.get(LONGITUDE_SOURCE_COLUMN)?)?;
    Some(Point::new(longitude, latitude))
}

fn numeric(value: &Value) -> Option<f64> {
    value
        .as_f64()
        .or_else(|| value.as_str().and_then(|text| text.trim().parse().ok()))
        .filter(|number: &f64| number.is_finite())
}
