//! Binaries and orchestration of the BC Parks asset sync.
//!
//! `parc-sync` reads the CityWide database, cleans the asset and trail
//! datasets and republishes them to the portal. `parc-quality` reports
//! assets whose coordinates fall outside the province.
#![forbid(unsafe_code)]

pub mod config;
pub mod error;
pub mod logging;
pub mod pipeline;
pub mod quality;

use std::time::Duration;

pub use config::{ConfigError, PipelineConfig, QualityConfig};
pub use error::PipelineError;

/// Completion message for a run that took `elapsed`.
///
/// # Examples
/// ```
/// use std::time::Duration;
///
/// assert_eq!(
///     parc_cli::completion_message(Duration::from_millis(125_600)),
///     "Processing Completed in 2 minutes and 6 seconds"
/// );
/// ```
#[must_use]
#[expect(
    clippy::integer_division,
    clippy::integer_division_remainder_used,
    reason = "whole minutes and leftover seconds"
)]
pub fn completion_message(elapsed: Duration) -> String {
    let seconds = (elapsed.as_millis() + 500) / 1000;
    format!(
        "Processing Completed in {} minutes and {} seconds",
        seconds / 60,
        seconds % 60
    )
}

#[cfg(test)]
mod tests;
