//! Trail line dataset cleaning.

use log::info;

use super::{TransformError, coerce_columns, require_columns};
use crate::schema::{TRAIL_COLUMNS, output_columns};
use crate::{FeatureRow, FeatureTable, SpatialTable, Value};

const DATASET: &str = "Trails";

/// Clean the raw trail records into a line feature table.
///
/// Columns are renamed and reordered per the trail mapping. Geometries are
/// expected in WGS84 already, since the trail reader reprojects them in the
/// database, and pass through unchanged.
///
/// # Errors
///
/// [`TransformError::MissingColumn`] when a non-empty input lacks a mapped
/// column.
pub fn transform_trails(raw: SpatialTable) -> Result<FeatureTable, TransformError> {
    if !raw.is_empty() {
        require_columns(DATASET, &TRAIL_COLUMNS, |column| {
            raw.columns.iter().any(|known| known == column)
        })?;
    }

    info!("..cleaning up trail column names");
    let mut table = FeatureTable::new(output_columns(&TRAIL_COLUMNS));
    for mut record in raw.rows {
        let values = TRAIL_COLUMNS
            .iter()
            .map(|(source, _)| record.attributes.remove(*source).unwrap_or(Value::Null))
            .collect();
        table.push(FeatureRow {
            values,
            geometry: record.geometry,
        });
    }

    coerce_columns(&mut table);
    info!(
        "..the final trails dataset has {} rows and {} columns",
        table.len(),
        table.column_count()
    );
    Ok(table)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Record, SpatialRecord};
    use geo::{Geometry, line_string};
    use rstest::{fixture, rstest};

    fn attributes() -> Record {
        TRAIL_COLUMNS
            .iter()
            .map(|(source, _)| {
                let value = match *source {
                    "length_m" => Value::Float(812.5),
                    "osmid" => Value::Int(4_411_223),
                    "trail_name" => Value::from("Lower Falls"),
                    _ => Value::Null,
                };
                ((*source).to_owned(), value)
            })
            .collect()
    }

    fn columns() -> Vec<String> {
        TRAIL_COLUMNS
            .iter()
            .map(|(source, _)| (*source).to_owned())
            .collect()
    }

    fn line() -> Geometry<f64> {
        Geometry::LineString(line_string![(x: -123.5, y: 48.5), (x: -123.4, y: 48.6)])
    }

    #[fixture]
    fn trail() -> SpatialTable {
        SpatialTable {
            columns: columns(),
            rows: vec![SpatialRecord {
                attributes: attributes(),
                geometry: Some(line()),
            }],
        }
    }

    #[rstest]
    fn geometries_pass_through_unchanged(trail: SpatialTable) {
        let table = transform_trails(trail).expect("transform succeeds");
        let row = table.rows().first().expect("one row");
        assert_eq!(row.geometry, Some(line()));
    }

    #[rstest]
    fn columns_are_renamed_in_mapping_order(trail: SpatialTable) {
        let table = transform_trails(trail).expect("transform succeeds");
        assert_eq!(table.columns().first().map(String::as_str), Some("Asset ID"));
        assert_eq!(table.column_count(), TRAIL_COLUMNS.len() + 1);
        assert_eq!(
            table.column_values("Trail Name").collect::<Vec<_>>(),
            [&Value::from("Lower Falls")]
        );
        assert_eq!(
            table.column_values("Length Meters").collect::<Vec<_>>(),
            [&Value::Float(812.5)]
        );
    }

    #[rstest]
    fn missing_mapped_column_is_reported(mut trail: SpatialTable) {
        trail.columns.retain(|column| column != "osmid");
        let err = transform_trails(trail).expect_err("osmid is required");
        assert_eq!(
            err,
            TransformError::MissingColumn {
                dataset: "Trails",
                column: "osmid".into(),
            }
        );
    }

    #[rstest]
    fn rows_without_geometry_are_kept(mut trail: SpatialTable) {
        if let Some(row) = trail.rows.first_mut() {
            row.geometry = None;
        }
        let table = transform_trails(trail).expect("transform succeeds");
        assert_eq!(table.len(), 1);
        assert!(table.rows().iter().all(|row| row.geometry.is_none()));
    }
}
