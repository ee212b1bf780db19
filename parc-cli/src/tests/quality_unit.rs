//! Unit coverage for the coordinate quality check.

use super::helpers::{citywide, sign_rows, trail_rows};
use crate::PipelineError;
use crate::quality::{find_outliers, load_boundary, write_report};
use camino::Utf8PathBuf;
use parc_core::quality::{DISTANCE_COLUMN, QualityOptions};
use parc_data::test_support::block_on_for_tests;
use rstest::{fixture, rstest};
use tempfile::TempDir;

const BOUNDARY: &str = r#"{
  "type": "FeatureCollection",
  "features": [{
    "type": "Feature",
    "properties": {"name": "British Columbia"},
    "geometry": {
      "type": "Polygon",
      "coordinates": [[[-139.0, 48.0], [-114.0, 48.0], [-114.0, 60.0], [-139.0, 60.0], [-139.0, 48.0]]]
    }
  }]
}"#;

#[fixture]
fn workdir() -> TempDir {
    tempfile::tempdir().expect("temporary directory")
}

fn path_in(dir: &TempDir, name: &str) -> Utf8PathBuf {
    Utf8PathBuf::from_path_buf(dir.path().join(name)).expect("UTF-8 temp path")
}

#[rstest]
fn reports_only_distant_points(workdir: TempDir) {
    let boundary_path = path_in(&workdir, "bc.geojson");
    parc_fs::write_file(&boundary_path, BOUNDARY.as_bytes()).expect("boundary written");
    let boundary = load_boundary(&boundary_path).expect("boundary loads");

    let mut rows = sign_rows(2, 50.0, -123.0);
    rows.extend(sign_rows(1, 45.0, -123.0));
    let mut source = citywide(rows, trail_rows(1));
    let report = block_on_for_tests(find_outliers(
        &mut source,
        &boundary,
        &QualityOptions::default(),
    ))
    .expect("check runs");

    assert_eq!(report.len(), 1);
    let distance = report
        .column_values(DISTANCE_COLUMN)
        .next()
        .and_then(parc_core::Value::as_f64)
        .expect("distance recorded");
    // Boundary edges are great-circle arcs; the southern one bulges north to
    // about 48.63 degrees at this longitude.
    assert!((400_000.0..406_000.0).contains(&distance), "distance {distance}");
}

#[rstest]
fn report_file_is_written_for_outliers(workdir: TempDir) {
    let boundary_path = path_in(&workdir, "bc.geojson");
    parc_fs::write_file(&boundary_path, BOUNDARY.as_bytes()).expect("boundary written");
    let boundary = load_boundary(&boundary_path).expect("boundary loads");
    let mut source = citywide(sign_rows(1, 61.5, -123.0), Vec::new());
    let report = block_on_for_tests(find_outliers(
        &mut source,
        &boundary,
        &QualityOptions::default(),
    ))
    .expect("check runs");

    let report_path = path_in(&workdir, "reports/outliers.geojson");
    write_report(&report_path, &report).expect("report written");
    let saved: serde_json::Value =
        serde_json::from_slice(&parc_fs::read_file(&report_path).expect("report exists"))
            .expect("report is JSON");
    assert_eq!(saved["features"].as_array().map(Vec::len), Some(1));
}

#[rstest]
fn empty_report_writes_nothing(workdir: TempDir) {
    let boundary = load_boundary(&{
        let path = path_in(&workdir, "bc.geojson");
        parc_fs::write_file(&path, BOUNDARY.as_bytes()).expect("boundary written");
        path
    })
    .expect("boundary loads");
    let mut source = citywide(sign_rows(3, 50.0, -123.0), Vec::new());
    let report = block_on_for_tests(find_outliers(
        &mut source,
        &boundary,
        &QualityOptions::default(),
    ))
    .expect("check runs");

    let report_path = path_in(&workdir, "outliers.geojson");
    write_report(&report_path, &report).expect("nothing to write");
    assert!(report.is_empty());
    assert!(!report_path.as_std_path().exists());
}

#[rstest]
#[case("missing.geojson", false)]
#[case("points.geojson", true)]
fn unusable_boundaries_are_rejected(workdir: TempDir, #[case] name: &str, #[case] create: bool) {
    let path = path_in(&workdir, name);
    if create {
        parc_fs::write_file(&path, br#"{"type":"Point","coordinates":[-123.0,50.0]}"#)
            .expect("file written");
    }
    match load_boundary(&path) {
        Err(PipelineError::Artefact { .. }) => assert!(!create),
        Err(PipelineError::Boundary { .. }) => assert!(create),
        other => panic!("expected a boundary failure, got {other:?}"),
    }
}
