//! HTTP surface: a thin axum router over the imagery, climate, and batch
//! collection clients. Handlers translate query parameters into client calls
//! and client errors into status codes; no monitoring logic lives here.

use log::info;

pub mod error;
pub mod routes;
pub mod state;
pub mod water_history;

pub use error::ApiError;
pub use routes::build_router;
pub use state::AppState;
pub use water_history::WeatherProxy;

use serde::{Deserialize, Serialize};

/// Listener settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServeConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServeConfig {
    fn default() -> Self {
        ServeConfig {
            host: "0.0.0.0".to_string(),
            port: 5000,
        }
    }
}

/// Bind and serve until the process is stopped.
pub async fn serve(config: &ServeConfig, state: AppState) -> std::io::Result<()> {
    let addr = format!("{}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("Server is running on http://{}", addr);
    axum::serve(listener, build_router(state)).await
}
