//! HTTP server subcommand.

use crate::config::GrmConfig;
use grm_gee::GeeClient;
use grm_server::{AppState, WeatherProxy};
use std::sync::Arc;

/// Connect to the imagery service, then serve the HTTP API until stopped.
/// Startup fails fast when the service is unreachable or the token is unset.
pub async fn run_serve(config: GrmConfig) -> anyhow::Result<()> {
    let client = Arc::new(GeeClient::connect(config.gee.clone()).await?);
    let weather = WeatherProxy::open_meteo(config.gee.timeout_secs)?;

    let state = AppState::new(
        client.clone(),
        client,
        config.gee,
        config.collect,
        weather,
    );
    grm_server::serve(&config.serve, state).await?;
    Ok(())
}
