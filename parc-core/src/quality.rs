//! Spatial quality check: asset points lying outside the provincial boundary.

use std::cmp::Ordering;

use geo::{
    Closest, Distance, Geometry, Haversine, HaversineClosestPoint, Intersects, MultiPolygon, Point,
};
use log::{info, warn};

use crate::schema::{GEOMETRY_SOURCE_COLUMN, LATITUDE_SOURCE_COLUMN, LONGITUDE_SOURCE_COLUMN};
use crate::{FeatureRow, FeatureTable, Record, RecordTable, Value};

/// Output column holding the distance to the boundary.
pub const DISTANCE_COLUMN: &str = "distance_meters";

/// Source columns left out of the report.
pub const REPORT_DROPPED_COLUMNS: [&str; 3] = [GEOMETRY_SOURCE_COLUMN, "ogc_fid", "campsite_number"];

/// Tuning for [`find_assets_outside`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct QualityOptions {
    /// Points closer to the boundary than this are treated as noise.
    pub min_distance_m: f64,
    /// Decimal places kept for floating point values in the report.
    pub decimals: i32,
}

impl Default for QualityOptions {
    fn default() -> Self {
        Self {
            min_distance_m: 50.0,
            decimals: 3,
        }
    }
}

/// Report asset points that fall outside `boundary` by more than the
/// configured tolerance.
///
/// The returned table keeps every source column except
/// [`REPORT_DROPPED_COLUMNS`], exposes the coordinates as `latitude` and
/// `longitude`, appends [`DISTANCE_COLUMN`] and is sorted by descending
/// distance. Points on the boundary count as inside.
///
/// Distances are great-circle metres to the nearest point of the boundary,
/// with boundary edges taken as great-circle arcs.
///
/// # Examples
///
/// ```
/// use geo::{MultiPolygon, polygon};
/// use parc_core::{Record, RecordTable, Value};
/// use parc_core::quality::{QualityOptions, find_assets_outside};
///
/// let boundary = MultiPolygon::new(vec![polygon![
///     (x: -125.0, y: 48.0), (x: -120.0, y: 48.0), (x: -120.0, y: 52.0), (x: -125.0, y: 52.0),
/// ]]);
/// let mut records = RecordTable::default();
/// for (lat, lon) in [(50.0, -122.0), (50.0, -119.0)] {
///     let mut row = Record::new();
///     row.insert("gis_latitude".into(), Value::Float(lat));
///     row.insert("gis_longitude".into(), Value::Float(lon));
///     records.push(row);
/// }
///
/// let report = find_assets_outside(records, &boundary, &QualityOptions::default());
/// assert_eq!(report.len(), 1);
/// ```
#[must_use]
pub fn find_assets_outside(
    records: RecordTable,
    boundary: &MultiPolygon<f64>,
    options: &QualityOptions,
) -> FeatureTable {
    let source_columns: Vec<String> = records
        .columns()
        .iter()
        .filter(|column| !REPORT_DROPPED_COLUMNS.contains(&column.as_str()))
        .cloned()
        .collect();
    let mut columns: Vec<String> = source_columns.iter().map(|column| report_name(column)).collect();
    columns.push(DISTANCE_COLUMN.to_owned());

    let mut outliers: Vec<(f64, FeatureRow)> = Vec::new();
    let mut unlocated = 0_usize;
    for row in records.into_rows() {
        let Some(point) = location(&row) else {
            unlocated += 1;
            continue;
        };
        if boundary.intersects(&point) {
            continue;
        }
        let distance = distance_to(boundary, point);
        if distance <= options.min_distance_m {
            continue;
        }
        outliers.push((distance, report_row(row, &source_columns, distance, options.decimals, point)));
    }
    if unlocated > 0 {
        warn!("Skipped {unlocated} assets without coordinates");
    }

    outliers.sort_by(|(left, _), (right, _)| right.partial_cmp(left).unwrap_or(Ordering::Equal));
    info!("..found {} assets outside the BC boundary", outliers.len());

    let mut table = FeatureTable::new(columns);
    for (_, row) in outliers {
        table.push(row);
    }
    table
}

fn report_name(column: &str) -> String {
    match column {
        LATITUDE_SOURCE_COLUMN => "latitude".to_owned(),
        LONGITUDE_SOURCE_COLUMN => "longitude".to_owned(),
        other => other.to_owned(),
    }
}

fn location(row: &Record) -> Option<Point<f64>> {
    let latitude = row.get(LATITUDE_SOURCE_COLUMN)?.as_f64()?;
    let longitude = row.get(LONGITUDE_SOURCE_COLUMN)?.as_f64()?;
    (latitude.is_finite() && longitude.is_finite()).then(|| Point::new(longitude, latitude))
}

fn distance_to(boundary: &MultiPolygon<f64>, point: Point<f64>) -> f64 {
    match boundary.haversine_closest_point(&point) {
        Closest::Intersection(nearest) | Closest::SinglePoint(nearest) => {
            Haversine.distance(point, nearest)
        }
        Closest::Indeterminate => f64::INFINITY,
    }
}

fn report_row(
    mut row: Record,
    columns: &[String],
    distance: f64,
    decimals: i32,
    point: Point<f64>,
) -> FeatureRow {
    let mut values: Vec<Value> = columns
        .iter()
        .map(|column| round(row.remove(column).unwrap_or(Value::Null), decimals))
        .collect();
    values.push(round(Value::Float(distance), decimals));
    FeatureRow {
        values,
        geometry: Some(Geometry::Point(point)),
    }
}

fn round(value: Value, decimals: i32) -> Value {
    match value {
        Value::Float(number) if number.is_finite() => {
            let scale = 10_f64.powi(decimals);
            Value::Float((number * scale).round() / scale)
        }
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo::{Coord, InterpolatePoint, LineString, Polygon, coord, polygon};
    use rstest::{fixture, rstest};

    /// Box with a densified southern edge, so the great-circle arcs between
    /// its vertices stay within metres of latitude 48.3.
    #[fixture]
    fn boundary() -> MultiPolygon<f64> {
        let mut ring: Vec<Coord<f64>> = (0_u32..=100)
            .map(|step| coord! { x: -139.0 + 0.25 * f64::from(step), y: 48.3 })
            .collect();
        ring.extend([coord! { x: -114.0, y: 60.0 }, coord! { x: -139.0, y: 60.0 }]);
        MultiPolygon::new(vec![Polygon::new(LineString::from(ring), Vec::new())])
    }

    fn asset(id: i64, lat: f64, lon: f64) -> Record {
        let mut row = Record::new();
        row.insert("assetid".into(), Value::Int(id));
        row.insert("ogc_fid".into(), Value::Int(id * 10));
        row.insert("campsite_number".into(), Value::from("12"));
        row.insert("gis_latitude".into(), Value::Float(lat));
        row.insert("gis_longitude".into(), Value::Float(lon));
        row
    }

    fn records(rows: Vec<Record>) -> RecordTable {
        let mut table = RecordTable::default();
        for row in rows {
            table.push(row);
        }
        table
    }

    #[rstest]
    fn reports_only_distant_outliers_sorted_descending(boundary: MultiPolygon<f64>) {
        let table = records(vec![
            asset(1, 50.0, -120.0),
            asset(2, 48.0, -123.0),
            asset(3, 45.0, -123.0),
            asset(4, 48.29999, -123.0),
        ]);

        let report = find_assets_outside(table, &boundary, &QualityOptions::default());

        let ids: Vec<&Value> = report.column_values("assetid").collect();
        assert_eq!(ids, [&Value::Int(3), &Value::Int(2)]);
        let distances: Vec<f64> = report
            .column_values(DISTANCE_COLUMN)
            .filter_map(Value::as_f64)
            .collect();
        assert_eq!(distances.len(), 2);
        assert!(distances[0] > distances[1]);
        // 0.3 degrees of latitude is roughly 33 km.
        assert!((distances[1] - 33_358.0).abs() < 200.0, "got {}", distances[1]);
    }

    #[rstest]
    fn drops_internal_columns_and_renames_coordinates(boundary: MultiPolygon<f64>) {
        let report = find_assets_outside(
            records(vec![asset(3, 45.0, -123.0)]),
            &boundary,
            &QualityOptions::default(),
        );
        assert_eq!(
            report.columns(),
            ["assetid", "latitude", "longitude", DISTANCE_COLUMN]
        );
    }

    #[rstest]
    fn rounds_floats_to_requested_precision(boundary: MultiPolygon<f64>) {
        let report = find_assets_outside(
            records(vec![asset(3, 45.123_456_7, -123.0)]),
            &boundary,
            &QualityOptions::default(),
        );
        assert_eq!(
            report.column_values("latitude").collect::<Vec<_>>(),
            [&Value::Float(45.123)]
        );
    }

    #[rstest]
    fn boundary_points_count_as_inside(boundary: MultiPolygon<f64>) {
        let report = find_assets_outside(
            records(vec![asset(5, 48.3, -120.0)]),
            &boundary,
            &QualityOptions {
                min_distance_m: 0.0,
                ..QualityOptions::default()
            },
        );
        assert!(report.is_empty());
    }

    #[rstest]
    fn distance_follows_the_great_circle_to_slanted_edges() {
        let start = Point::new(-130.0, 59.0);
        let end = Point::new(-120.0, 55.0);
        let boundary = MultiPolygon::new(vec![polygon![
            (x: -130.0, y: 59.0),
            (x: -120.0, y: 55.0),
            (x: -120.0, y: 50.0),
            (x: -130.0, y: 50.0),
        ]]);
        let asset_point = Point::new(-124.0, 58.0);
        let nearest_on_edge = (0_u32..=10_000)
            .map(|step| Haversine.point_at_ratio_between(start, end, f64::from(step) / 10_000.0))
            .map(|sample| Haversine.distance(asset_point, sample))
            .fold(f64::INFINITY, f64::min);

        let distance = distance_to(&boundary, asset_point);

        // A closest point picked in the longitude/latitude plane lands
        // about 10% farther away at this latitude.
        assert!(
            (distance - nearest_on_edge).abs() < 10.0,
            "got {distance}, expected {nearest_on_edge}"
        );
    }
}
