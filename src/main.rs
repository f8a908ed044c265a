use std::time::Instant;

use log::{info, warn};
use med_split::{PipelineConfig, Result, default_custodians, pipeline};

#[global_allocator]
static ALLOC: snmalloc_rs::SnMalloc = snmalloc_rs::SnMalloc;

fn main() -> Result<()> {
    // Setup logging
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = PipelineConfig::default();
    if !config.raw_dir().exists() {
        warn!("Raw data directory not found: {}", config.raw_dir().display());
        return Ok(());
    }

    let custodians = default_custodians();
    info!(
        "Running pipeline from {} for {} custodians",
        config.data_dir.display(),
        custodians.len()
    );

    let start = Instant::now();
    let summary = pipeline::run_all(&custodians, &config);
    summary.log();
    info!("Pipeline finished in {:?}", start.elapsed());

    Ok(())
}
