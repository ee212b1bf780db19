//! Stub CityWide tables used across the CLI tests.

use parc_core::schema::{
    ASSET_COLUMNS, GEOMETRY_SOURCE_COLUMN, LATITUDE_SOURCE_COLUMN, LONGITUDE_SOURCE_COLUMN,
    TRAIL_COLUMNS,
};
use parc_data::source::JsonRecord;
use parc_data::test_support::{StubSpatialSource, StubTable};
use serde_json::{Value as JsonValue, json};

fn catalogue(mapping: &[(&'static str, &'static str)]) -> Vec<(&'static str, &'static str)> {
    let mut columns: Vec<(&'static str, &'static str)> = mapping
        .iter()
        .map(|(source, _)| *source)
        .filter(|source| ![LATITUDE_SOURCE_COLUMN, LONGITUDE_SOURCE_COLUMN].contains(source))
        .map(|source| match source {
            "assetid" | "osmid" => (source, "integer"),
            "length_m" => (source, "double precision"),
            _ => (source, "text"),
        })
        .collect();
    columns.push((GEOMETRY_SOURCE_COLUMN, "USER-DEFINED"));
    columns
}

fn object(value: JsonValue) -> JsonRecord {
    match value {
        JsonValue::Object(map) => map,
        other => panic!("expected a JSON object, got {other}"),
    }
}

/// `count` sign assets with the given coordinates.
pub(super) fn sign_rows(count: usize, latitude: f64, longitude: f64) -> Vec<JsonRecord> {
    (0..count)
        .map(|index| {
            object(json!({
                "assetid": index,
                "asset_category": "Signs",
                "park": "Goldstream Park",
                "name": format!("Sign {index}"),
                "gis_latitude": latitude,
                "gis_longitude": longitude,
            }))
        })
        .collect()
}

/// `count` short WGS84 trails near Victoria.
pub(super) fn trail_rows(count: usize) -> Vec<(JsonRecord, Option<String>)> {
    (0..count)
        .map(|index| {
            let geometry = json!({
                "type": "LineString",
                "coordinates": [[-123.37, 48.43], [-123.36, 48.44]],
            });
            (
                object(json!({"trail_name": format!("Trail {index}"), "length_m": 250.5})),
                Some(geometry.to_string()),
            )
        })
        .collect()
}

/// A source holding the given sign rows and trail rows.
pub(super) fn citywide(
    signs: Vec<JsonRecord>,
    trails: Vec<(JsonRecord, Option<String>)>,
) -> StubSpatialSource {
    StubSpatialSource::default()
        .with_table("signs", StubTable::points(&catalogue(&ASSET_COLUMNS), signs))
        .with_table("trails", StubTable::lines(&catalogue(&TRAIL_COLUMNS), trails))
}
