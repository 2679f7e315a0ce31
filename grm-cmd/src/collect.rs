//! Batch collection subcommand.

use crate::config::GrmConfig;
use chrono::NaiveDate;
use grm_collect::{BatchCollector, CancelFlag};
use grm_core::geometry::RegionGeometry;
use grm_core::interval::Cadence;
use grm_gee::GeeClient;
use log::{info, warn};

/// Run a batch collection over the configured region and print the CSV path.
///
/// Ctrl-C requests cancellation; the batch stops at the next interval
/// boundary and the CSV written so far stays valid.
pub async fn run_collect(
    config: &GrmConfig,
    start: NaiveDate,
    end: NaiveDate,
    cadence: Cadence,
) -> anyhow::Result<()> {
    let region = RegionGeometry::polygon(config.collect.region.clone())?;
    let client = GeeClient::connect(config.gee.clone()).await?;

    let cancel = CancelFlag::new();
    let ctrl_c_flag = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupt received; finishing the current interval");
            ctrl_c_flag.cancel();
        }
    });

    let collector = BatchCollector::new(&client, &client, &config.gee);
    let outcome = collector
        .run(
            &region,
            start,
            end,
            cadence,
            &config.collect.csv_dir(),
            config.collect.pause_ms,
            &cancel,
        )
        .await?;

    let completed = outcome.summaries.iter().filter(|s| s.success).count();
    let skipped = outcome.summaries.iter().filter(|s| s.is_skipped()).count();
    let failed = outcome.summaries.iter().filter(|s| s.is_failed()).count();
    info!(
        "Batch finished: {} completed, {} skipped, {} failed",
        completed, skipped, failed
    );
    println!("{}", outcome.csv_path.display());
    Ok(())
}
