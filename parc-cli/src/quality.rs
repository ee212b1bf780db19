//! The coordinate quality check run by `parc-quality`.

use camino::Utf8Path;
use geo::MultiPolygon;
use log::{info, warn};
use parc_core::geojson::polygons_from_slice;
use parc_core::quality::{QualityOptions, find_assets_outside};
use parc_core::{FeatureCollection, FeatureTable};
use parc_data::{Database, SpatialSource, read_point_assets};

use crate::config::QualityConfig;
use crate::error::PipelineError;

/// Load the boundary polygons from a GeoJSON file.
///
/// # Errors
///
/// Returns [`PipelineError::Artefact`] when the file cannot be read and
/// [`PipelineError::Boundary`] when it holds no polygons.
pub fn load_boundary(path: &Utf8Path) -> Result<MultiPolygon<f64>, PipelineError> {
    let bytes = parc_fs::read_file(path).map_err(|source| PipelineError::Artefact {
        path: path.to_owned(),
        source,
    })?;
    polygons_from_slice(&bytes).map_err(|source| PipelineError::Boundary {
        path: path.to_owned(),
        source,
    })
}

/// Run the check against the configured database.
///
/// Returns the outlier report, which is also written to the configured
/// report path when it is not empty.
///
/// # Errors
///
/// Returns boundary, database, read and artefact failures.
pub async fn run_quality_check(config: &QualityConfig) -> Result<FeatureTable, PipelineError> {
    let boundary = load_boundary(&config.boundary)?;

    info!("Connecting to CityWide database");
    let mut database = Database::new(config.database.clone());
    let connected = database.connect().await.is_some();
    let outcome = match database.source() {
        Some(mut source) if connected => {
            find_outliers(&mut source, &boundary, &config.options).await
        }
        _ => Err(PipelineError::DatabaseUnavailable),
    };
    database.disconnect().await;
    let report = outcome?;

    if let Some(path) = &config.report {
        write_report(path, &report)?;
    }
    Ok(report)
}

/// Read the point assets from `source` and keep those outside `boundary`.
///
/// # Errors
///
/// Returns the first read failure.
pub async fn find_outliers<S>(
    source: &mut S,
    boundary: &MultiPolygon<f64>,
    options: &QualityOptions,
) -> Result<FeatureTable, PipelineError>
where
    S: SpatialSource + ?Sized,
{
    info!("Reading Assets (points) data");
    let records = read_point_assets(source).await?;
    info!("Checking asset coordinates against the boundary");
    let report = find_assets_outside(records, boundary, options);
    if report.is_empty() {
        info!("..all assets lie within the boundary.");
    } else {
        warn!(
            "..{} assets lie more than {} m outside the boundary.",
            report.len(),
            options.min_distance_m
        );
    }
    Ok(report)
}

/// Write a non-empty report as GeoJSON.
///
/// # Errors
///
/// Returns encoding and file failures.
pub fn write_report(path: &Utf8Path, report: &FeatureTable) -> Result<(), PipelineError> {
    if report.is_empty() {
        return Ok(());
    }
    let bytes = FeatureCollection::from_table(report)
        .and_then(|collection| collection.to_bytes())
        .map_err(|source| PipelineError::Encode {
            dataset: "quality report",
            source,
        })?;
    parc_fs::write_file(path, &bytes).map_err(|source| PipelineError::Artefact {
        path: path.to_owned(),
        source,
    })?;
    info!("..report written to {path}");
    Ok(())
}
