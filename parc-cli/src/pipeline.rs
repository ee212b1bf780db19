//! The two resource-scoped phases of a sync run.
//!
//! The extract phase owns the database connection and the publish phase the
//! portal session; each releases its resource whatever the outcome.

use camino::Utf8Path;
use chrono::NaiveDate;
use log::{error, info};
use parc_core::{FeatureCollection, FeatureTable, transform_assets, transform_trails};
use parc_data::portal::{
    ArcGisPortal, ArcGisPortalConfig, ContentPortal, LayerTarget, PublishedLayer, Publisher,
};
use parc_data::{Database, PortalCredentials, SpatialSource, read_assets, read_trails};

use crate::config::PipelineConfig;
use crate::error::PipelineError;

/// Portal folder receiving both layers.
pub const LAYER_FOLDER: &str = "DSS Protected Areas Resource Catalogue (PARC) - Resource Analysis";
/// Title of the asset layer.
pub const ASSET_LAYER_TITLE: &str = "PARC_L1G_Park_Asset_Data_Feature_Layer_v2";
/// Upload name of the asset layer.
pub const ASSET_FILE_BASE_NAME: &str = "bcparks_assets_v2";
/// Title of the trail layer.
pub const TRAIL_LAYER_TITLE: &str = "PARC_L1G_Park_Trail_Data_Feature_Layer_v2";
/// Upload name of the trail layer.
pub const TRAIL_FILE_BASE_NAME: &str = "bcparks_trails_v2";

/// The cleaned datasets produced by the extract phase.
#[derive(Debug, Clone)]
pub struct Datasets {
    /// Asset points.
    pub assets: FeatureTable,
    /// Trail lines.
    pub trails: FeatureTable,
}

/// Publishing destinations of both datasets.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LayerTargets {
    /// Asset layer.
    pub assets: LayerTarget,
    /// Trail layer.
    pub trails: LayerTarget,
}

impl LayerTargets {
    /// Targets whose descriptions carry `updated` as the update date.
    ///
    /// # Examples
    /// ```
    /// use chrono::NaiveDate;
    /// use parc_cli::pipeline::LayerTargets;
    ///
    /// let date = NaiveDate::from_ymd_opt(2026, 3, 9).expect("valid date");
    /// let targets = LayerTargets::for_date(date);
    /// assert_eq!(
    ///     targets.trails.description,
    ///     "Line dataset - BCParks trails (updated on March 09, 2026)"
    /// );
    /// ```
    #[must_use]
    pub fn for_date(updated: NaiveDate) -> Self {
        let stamp = updated.format("%B %d, %Y");
        Self {
            assets: LayerTarget {
                title: ASSET_LAYER_TITLE.to_owned(),
                file_base_name: ASSET_FILE_BASE_NAME.to_owned(),
                description: format!("Point dataset - BCParks assets (updated on {stamp})"),
                folder: LAYER_FOLDER.to_owned(),
            },
            trails: LayerTarget {
                title: TRAIL_LAYER_TITLE.to_owned(),
                file_base_name: TRAIL_FILE_BASE_NAME.to_owned(),
                description: format!("Line dataset - BCParks trails (updated on {stamp})"),
                folder: LAYER_FOLDER.to_owned(),
            },
        }
    }
}

/// Outcome of the publish phase.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PublishSummary {
    /// Layers published, in order.
    pub published: Vec<PublishedLayer>,
    /// Labels of the datasets skipped for being empty.
    pub skipped: Vec<&'static str>,
}

/// Run both phases against the configured database and portal.
///
/// # Errors
///
/// Returns the first failure of either phase.
pub async fn run(config: &PipelineConfig, today: NaiveDate) -> Result<PublishSummary, PipelineError> {
    info!("Connecting to CityWide database");
    let mut database = Database::new(config.database.clone());
    let datasets = run_extract_phase(&mut database).await?;

    let portal = ArcGisPortal::with_config(
        ArcGisPortalConfig::new(config.portal.host.as_str()).with_timeout(config.http_timeout),
    )?;
    let mut publisher = Publisher::new(portal).with_poll_settings(config.poll);
    run_publish_phase(
        &mut publisher,
        &config.portal,
        &datasets,
        &LayerTargets::for_date(today),
        config.output_dir.as_deref(),
    )
    .await
}

/// Read and clean both datasets, closing the connection afterwards.
///
/// # Errors
///
/// Returns [`PipelineError::DatabaseUnavailable`] when no connection can be
/// opened, otherwise the first read or transform failure.
pub async fn run_extract_phase(database: &mut Database) -> Result<Datasets, PipelineError> {
    let connected = database.connect().await.is_some();
    let outcome = match database.source() {
        Some(mut source) if connected => extract(&mut source).await,
        _ => Err(PipelineError::DatabaseUnavailable),
    };
    database.disconnect().await;
    outcome
}

/// Read and clean both datasets from `source`.
///
/// # Errors
///
/// Returns the first read or transform failure.
pub async fn extract<S>(source: &mut S) -> Result<Datasets, PipelineError>
where
    S: SpatialSource + ?Sized,
{
    info!("Reading Assets (points) data");
    let raw_assets = read_assets(source).await?;

    info!("Reading Trails (line) data");
    let raw_trails = read_trails(source).await?;

    info!("Processing Assets data");
    let assets = transform_assets(raw_assets)?;

    info!("Processing Trails data");
    let trails = transform_trails(raw_trails)?;

    Ok(Datasets { assets, trails })
}

/// Publish both datasets, disconnecting from the portal afterwards.
///
/// Empty datasets are logged and skipped. The first failure aborts the
/// remaining publishes.
///
/// # Errors
///
/// Returns the connection, encoding, artefact or publish failure.
pub async fn run_publish_phase<P: ContentPortal>(
    publisher: &mut Publisher<P>,
    credentials: &PortalCredentials,
    datasets: &Datasets,
    targets: &LayerTargets,
    artefacts: Option<&Utf8Path>,
) -> Result<PublishSummary, PipelineError> {
    info!("Logging to AGO");
    let outcome = match publisher
        .connect(&credentials.username, &credentials.password)
        .await
    {
        Ok(()) => publish_all(publisher, datasets, targets, artefacts).await,
        Err(err) => Err(err.into()),
    };
    publisher.disconnect();
    outcome
}

async fn publish_all<P: ContentPortal>(
    publisher: &Publisher<P>,
    datasets: &Datasets,
    targets: &LayerTargets,
    artefacts: Option<&Utf8Path>,
) -> Result<PublishSummary, PipelineError> {
    let mut summary = PublishSummary::default();
    for (label, table, target) in [
        ("Assets", &datasets.assets, &targets.assets),
        ("Trails", &datasets.trails, &targets.trails),
    ] {
        info!("Publishing the {label} dataset to AGO");
        if table.is_empty() {
            error!("..{label} dataset is empty. AGO update aborted!");
            summary.skipped.push(label);
            continue;
        }
        let collection = FeatureCollection::from_table(table)
            .map_err(|source| PipelineError::Encode { dataset: label, source })?;
        if let Some(dir) = artefacts {
            save_copy(dir, target, &collection)?;
        }
        summary
            .published
            .push(publisher.publish_collection(&collection, target).await?);
    }
    Ok(summary)
}

fn save_copy(
    dir: &Utf8Path,
    target: &LayerTarget,
    collection: &FeatureCollection,
) -> Result<(), PipelineError> {
    let path = parc_fs::artefact_path(dir, &format!("{}.geojson", target.file_base_name));
    let bytes = collection.to_bytes().map_err(|source| PipelineError::Encode {
        dataset: "local copy",
        source,
    })?;
    parc_fs::write_file(&path, &bytes).map_err(|source| PipelineError::Artefact {
        path: path.clone(),
        source,
    })?;
    info!("..local copy written to {path}");
    Ok(())
}
