//! Readers assembling raw asset and trail tables from a [`SpatialSource`].

use log::{info, warn};
use parc_core::geojson::parse_geometry;
use parc_core::schema::{
    ASSET_COLUMNS, ASSET_SCHEMA, CENTROID_TABLES, EXCLUDED_ASSET_TABLES, GEOMETRY_SOURCE_COLUMN,
    LATITUDE_SOURCE_COLUMN, LONGITUDE_SOURCE_COLUMN, TRAIL_TABLE,
};
use parc_core::{ColumnKind, Record, RecordTable, SpatialRecord, SpatialTable, Value};

use crate::postgres::relation;
use crate::source::{JsonRecord, PointAnchor, SourceError, SpatialSource, TableColumn};

/// Read every asset table into one flat record table.
///
/// Each table contributes its columns (minus the geometry) and the WGS84
/// `gis_latitude`/`gis_longitude` of its point, or of its centroid for
/// linear and areal tables. Tables without a geometry column are skipped.
///
/// # Errors
///
/// Propagates the first [`SourceError`] raised by the source.
pub async fn read_assets<S>(source: &mut S) -> Result<RecordTable, SourceError>
where
    S: SpatialSource + ?Sized,
{
    read_point_tables(source, &[]).await
}

/// Read the asset tables checked for out-of-province coordinates.
///
/// Identical to [`read_assets`] but excludes the linear and areal tables,
/// whose centroids are not surveyed positions.
///
/// # Errors
///
/// Propagates the first [`SourceError`] raised by the source.
pub async fn read_point_assets<S>(source: &mut S) -> Result<RecordTable, SourceError>
where
    S: SpatialSource + ?Sized,
{
    read_point_tables(source, &CENTROID_TABLES).await
}

async fn read_point_tables<S>(source: &mut S, skip: &[&str]) -> Result<RecordTable, SourceError>
where
    S: SpatialSource + ?Sized,
{
    let tables = source.list_tables(ASSET_SCHEMA).await?;
    let mut combined = RecordTable::default();
    for table in tables
        .iter()
        .filter(|table| !EXCLUDED_ASSET_TABLES.contains(&table.as_str()))
        .filter(|table| !skip.contains(&table.as_str()))
    {
        info!("...processing table: {table}");
        let columns = source.table_columns(ASSET_SCHEMA, table).await?;
        if !columns.iter().any(|column| column.name == GEOMETRY_SOURCE_COLUMN) {
            warn!("Skipped table {table}: no {GEOMETRY_SOURCE_COLUMN} column");
            continue;
        }
        warn_missing_keys(table, &columns);

        let anchor = if CENTROID_TABLES.contains(&table.as_str()) {
            PointAnchor::Centroid
        } else {
            PointAnchor::Point
        };
        let rows = source.fetch_points(ASSET_SCHEMA, table, anchor).await?;

        let mut columns: Vec<TableColumn> = columns
            .into_iter()
            .filter(|column| column.name != GEOMETRY_SOURCE_COLUMN)
            .collect();
        for derived in [LATITUDE_SOURCE_COLUMN, LONGITUDE_SOURCE_COLUMN] {
            columns.push(TableColumn {
                name: derived.to_owned(),
                kind: ColumnKind::Float,
            });
        }
        let mut part = RecordTable::with_columns(columns.iter().map(|column| column.name.clone()));
        for row in rows {
            part.push(decode_record(row, &columns));
        }
        combined.append(part);
    }
    info!(
        "..read {} asset rows with {} columns",
        combined.len(),
        combined.columns().len()
    );
    Ok(combined)
}

fn warn_missing_keys(table: &str, columns: &[TableColumn]) {
    let missing: Vec<&str> = ASSET_COLUMNS
        .iter()
        .map(|(source, _)| *source)
        .filter(|source| ![LATITUDE_SOURCE_COLUMN, LONGITUDE_SOURCE_COLUMN].contains(source))
        .filter(|source| !columns.iter().any(|column| column.name == *source))
        .collect();
    if !missing.is_empty() {
        warn!(
            "Table {table} lacks asset columns [{}]; they will read as empty",
            missing.join(", ")
        );
    }
}

/// Decode a JSON row using the declared column kinds.
///
/// Keys without a declared column are decoded heuristically.
fn decode_record(mut row: JsonRecord, columns: &[TableColumn]) -> Record {
    let mut record: Record = columns
        .iter()
        .map(|column| {
            let value = row
                .remove(&column.name)
                .map_or(Value::Null, |json| Value::from_json(json, column.kind));
            (column.name.clone(), value)
        })
        .collect();
    for (key, json) in row {
        record.insert(key, Value::from_json(json, ColumnKind::Other));
    }
    record
}

/// Read the trail table with its line geometries.
///
/// # Errors
///
/// Propagates source failures and reports undecodable geometries as
/// [`SourceError::Geometry`].
pub async fn read_trails<S>(source: &mut S) -> Result<SpatialTable, SourceError>
where
    S: SpatialSource + ?Sized,
{
    let columns: Vec<TableColumn> = source
        .table_columns(ASSET_SCHEMA, TRAIL_TABLE)
        .await?
        .into_iter()
        .filter(|column| column.name != GEOMETRY_SOURCE_COLUMN)
        .collect();
    let rows = source.fetch_lines(ASSET_SCHEMA, TRAIL_TABLE).await?;

    let mut table = SpatialTable {
        columns: columns.iter().map(|column| column.name.clone()).collect(),
        rows: Vec::with_capacity(rows.len()),
    };
    for row in rows {
        let geometry = row
            .geometry
            .as_deref()
            .map(parse_geometry)
            .transpose()
            .map_err(|source| SourceError::Geometry {
                relation: relation(ASSET_SCHEMA, TRAIL_TABLE),
                source,
            })?;
        table.rows.push(SpatialRecord {
            attributes: decode_record(row.record, &columns),
            geometry,
        });
    }
    info!("..read {} trail rows", table.len());
    Ok(table)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{StubSpatialSource, StubTable, block_on_for_tests};
    use geo::Geometry;
    use rstest::{fixture, rstest};
    use serde_json::json;

    fn object(value: serde_json::Value) -> JsonRecord {
        match value {
            serde_json::Value::Object(map) => map,
            other => panic!("expected object, got {other}"),
        }
    }

    #[fixture]
    fn source() -> StubSpatialSource {
        StubSpatialSource::default()
            .with_table(
                "signs",
                StubTable::points(
                    &[
                        ("assetid", "integer"),
                        ("asset_category", "text"),
                        ("installed", "date"),
                        ("wkb_geometry", "USER-DEFINED"),
                    ],
                    vec![object(json!({
                        "assetid": 4,
                        "asset_category": "Signs",
                        "installed": "2021-06-01",
                        "gis_latitude": 48.4,
                        "gis_longitude": -123.4
                    }))],
                ),
            )
            .with_table(
                "roads",
                StubTable::points(
                    &[("assetid", "bigint"), ("surface", "text"), ("wkb_geometry", "USER-DEFINED")],
                    vec![object(json!({
                        "assetid": 9,
                        "surface": "gravel",
                        "gis_latitude": 50,
                        "gis_longitude": -121
                    }))],
                ),
            )
            .with_table("qgis_projects", StubTable::points(&[("name", "text")], Vec::new()))
            .with_table("lookup", StubTable::points(&[("code", "text")], Vec::new()))
    }

    #[rstest]
    fn concatenates_tables_with_union_of_columns(mut source: StubSpatialSource) {
        let table = block_on_for_tests(read_assets(&mut source)).expect("read succeeds");
        assert_eq!(table.len(), 2);
        assert!(table.has_column("surface"));
        assert!(table.has_column("installed"));
        assert!(!table.has_column(GEOMETRY_SOURCE_COLUMN));
        let roads = table.rows().get(0).expect("first row");
        assert_eq!(roads.get("gis_latitude"), Some(&Value::Float(50.0)));
        assert_eq!(roads.get("installed"), None);
    }

    #[rstest]
    fn centroids_are_requested_for_linear_tables(mut source: StubSpatialSource) {
        block_on_for_tests(read_assets(&mut source)).expect("read succeeds");
        assert_eq!(source.anchor_for("roads"), Some(PointAnchor::Centroid));
        assert_eq!(source.anchor_for("signs"), Some(PointAnchor::Point));
        assert_eq!(source.anchor_for("qgis_projects"), None);
        assert_eq!(source.anchor_for("lookup"), None);
    }

    #[rstest]
    fn point_assets_skip_centroid_tables(mut source: StubSpatialSource) {
        let table = block_on_for_tests(read_point_assets(&mut source)).expect("read succeeds");
        assert_eq!(table.len(), 1);
        assert_eq!(source.anchor_for("roads"), None);
    }

    #[rstest]
    fn values_follow_catalogue_types(mut source: StubSpatialSource) {
        let table = block_on_for_tests(read_assets(&mut source)).expect("read succeeds");
        let signs = table.rows().get(1).expect("second row");
        assert!(matches!(signs.get("installed"), Some(Value::Date(_))));
        assert_eq!(signs.get("assetid"), Some(&Value::Int(4)));
    }

    #[rstest]
    fn trails_decode_reprojected_geometry() {
        let mut source = StubSpatialSource::default().with_table(
            "trails",
            StubTable::lines(
                &[("trail_name", "text"), ("wkb_geometry", "USER-DEFINED")],
                vec![(
                    object(json!({"trail_name": "Goose"})),
                    Some(
                        r#"{"type":"LineString","coordinates":[[-123.4,48.4],[-123.3,48.5]]}"#
                            .to_owned(),
                    ),
                )],
            ),
        );
        let table = block_on_for_tests(read_trails(&mut source)).expect("read succeeds");
        assert_eq!(table.columns, ["trail_name"]);
        let row = table.rows.first().expect("trail row");
        let Some(Geometry::LineString(line)) = &row.geometry else {
            panic!("expected a line, got {:?}", row.geometry);
        };
        assert_eq!(line.0.first().map(|c| (c.x, c.y)), Some((-123.4, 48.4)));
    }

    #[rstest]
    fn invalid_trail_geometry_is_reported() {
        let mut source = StubSpatialSource::default().with_table(
            "trails",
            StubTable::lines(
                &[("wkb_geometry", "USER-DEFINED")],
                vec![(JsonRecord::new(), Some("not json".to_owned()))],
            ),
        );
        let err = block_on_for_tests(read_trails(&mut source)).expect_err("invalid geometry");
        assert!(matches!(err, SourceError::Geometry { .. }));
    }
}
