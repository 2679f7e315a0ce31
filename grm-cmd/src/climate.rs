//! One-shot climate query subcommand.

use crate::config::GrmConfig;
use chrono::NaiveDate;
use grm_core::geometry::RegionGeometry;
use grm_gee::climate::ClimateQuery;
use grm_gee::GeeClient;
use log::warn;

/// Query averaged climate variables at a point and print them as JSON.
pub async fn run_climate(
    config: &GrmConfig,
    lat: f64,
    lon: f64,
    date: NaiveDate,
) -> anyhow::Result<()> {
    let region = RegionGeometry::point(lon, lat)?;
    let client = GeeClient::connect(config.gee.clone()).await?;

    let query = ClimateQuery::new(&client, &config.gee);
    match query.query_climate(&region, date).await? {
        Some(record) => println!("{}", serde_json::to_string_pretty(&record)?),
        None => {
            warn!("No climate data available around {}", date);
            println!("null");
        }
    }
    Ok(())
}
