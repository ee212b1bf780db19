//! Cleaning and reshaping of raw source tables into publishable feature tables.
//!
//! Both transformers are pure: they take ownership of a raw table, log their
//! progress through the `log` facade and return a [`FeatureTable`] whose
//! geometries are in WGS84.
//!
//! [`FeatureTable`]: crate::FeatureTable

mod assets;
mod coerce;
mod trails;

use thiserror::Error;

pub use assets::transform_assets;
pub use coerce::coerce_columns;
pub use trails::transform_trails;

/// Errors raised while transforming a dataset.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TransformError {
    /// A mapped source column is absent from a non-empty input.
    #[error("{dataset} data is missing source column `{column}`")]
    MissingColumn {
        /// Dataset being transformed.
        dataset: &'static str,
        /// Source column name.
        column: String,
    },
}

/// Fail when a non-empty input lacks any mapped source column.
fn require_columns(
    dataset: &'static str,
    mapping: &[(&str, &str)],
    has_column: impl Fn(&str) -> bool,
) -> Result<(), TransformError> {
    match mapping.iter().find(|(source, _)| !has_column(source)) {
        Some((source, _)) => Err(TransformError::MissingColumn {
            dataset,
            column: (*source).to_owned(),
        }),
        None => Ok(()),
    }
}
