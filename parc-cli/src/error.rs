//! Error type of the pipeline binaries.
//!
//! Keep this enum small; most helpers return `Result<_, PipelineError>` and
//! the workspace enables `clippy::result_large_err`.

use camino::Utf8PathBuf;
use parc_core::{GeoJsonError, TransformError};
use parc_data::portal::PortalError;
use parc_data::{PublishError, SourceError};
use thiserror::Error;

use crate::config::ConfigError;

/// Errors emitted by `parc-sync` and `parc-quality`.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// Configuration could not be read.
    #[error(transparent)]
    Config(#[from] ConfigError),
    /// The database connection could not be opened.
    #[error("CityWide database is unavailable")]
    DatabaseUnavailable,
    /// Reading from the database failed.
    #[error("failed to read source data: {0}")]
    Source(#[from] SourceError),
    /// Cleaning a dataset failed.
    #[error("failed to clean source data: {0}")]
    Transform(#[from] TransformError),
    /// The portal client could not be built.
    #[error("failed to set up the portal client: {0}")]
    Portal(#[from] PortalError),
    /// Connecting or publishing to the portal failed.
    #[error(transparent)]
    Publish(#[from] PublishError),
    /// A dataset could not be encoded as GeoJSON.
    #[error("failed to encode {dataset} as GeoJSON: {source}")]
    Encode {
        /// Dataset label.
        dataset: &'static str,
        /// Encoder error.
        #[source]
        source: GeoJsonError,
    },
    /// The boundary file could not be decoded.
    #[error("invalid boundary in {path}: {source}")]
    Boundary {
        /// Boundary file.
        path: Utf8PathBuf,
        /// Decoder error.
        #[source]
        source: GeoJsonError,
    },
    /// Reading or writing a local file failed.
    #[error("failed to access {path}: {source}")]
    Artefact {
        /// File path.
        path: Utf8PathBuf,
        /// IO error.
        #[source]
        source: std::io::Error,
    },
}
