//! Reports assets whose coordinates fall outside British Columbia.
#![forbid(unsafe_code)]

use std::time::Instant;

use log::info;
use parc_cli::{PipelineError, QualityConfig, completion_message, logging, quality};

#[tokio::main(flavor = "current_thread")]
async fn main() {
    logging::init_logging();
    if let Err(err) = run().await {
        eprintln!("parc-quality: {err}");
        std::process::exit(1);
    }
}

async fn run() -> Result<(), PipelineError> {
    let started = Instant::now();
    let config = QualityConfig::from_env()?;
    let report = quality::run_quality_check(&config).await?;
    if report.is_empty() {
        info!("No assets outside the boundary; nothing to report.");
    } else if config.report.is_none() {
        info!("Set PARC_QUALITY_REPORT to save the {} outliers.", report.len());
    }
    info!("{}", completion_message(started.elapsed()));
    Ok(())
}
