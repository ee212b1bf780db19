//! Entry point of the asset and trail sync.
#![forbid(unsafe_code)]

use std::time::Instant;

use chrono::Local;
use log::info;
use parc_cli::{PipelineConfig, PipelineError, completion_message, logging, pipeline};

#[tokio::main(flavor = "current_thread")]
async fn main() {
    logging::init_logging();
    if let Err(err) = run().await {
        eprintln!("parc-sync: {err}");
        std::process::exit(1);
    }
}

async fn run() -> Result<(), PipelineError> {
    let started = Instant::now();
    let config = PipelineConfig::from_env()?;
    let summary = pipeline::run(&config, Local::now().date_naive()).await?;
    for layer in &summary.published {
        info!("..{} is live as item {}", layer.title, layer.service_item_id);
    }
    info!("{}", completion_message(started.elapsed()));
    Ok(())
}
