use serde::{Deserialize, Serialize};

/// Configuration for the Earth Engine client and query clients.
///
/// Cloud thresholds and reduction scales vary per use and were previously
/// buried at call sites; they are explicit here so a deployment can tune
/// them without code changes.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeeConfig {
    /// REST endpoint base.
    pub base_url: String,
    /// Cloud project the Earth Engine requests are billed to.
    pub project: String,
    /// Name of the env var holding the OAuth bearer token. Token acquisition
    /// is outside this layer; deployments refresh it out of band.
    pub token_env: String,
    /// Per-request deadline, seconds.
    pub timeout_secs: u64,
    /// Bounded retries for transient upstream failures.
    pub max_retries: u32,
    /// Initial backoff before the first retry; doubles per attempt.
    pub retry_backoff_ms: u64,

    /// Surface-reflectance imagery collection.
    pub imagery_dataset: String,
    /// Hourly climate reanalysis collection.
    pub climate_dataset: String,

    /// Maximum cloudy-pixel percentage for a scene to qualify.
    pub cloud_threshold_pct: f64,
    /// Spatial reduction scale for water indices, meters (imagery native).
    pub index_scale_m: f64,
    /// Spatial reduction scale for climate variables, meters.
    pub climate_scale_m: f64,
    /// Rendering scale for thumbnails, meters per pixel.
    pub render_scale_m: f64,
}

impl Default for GeeConfig {
    fn default() -> Self {
        GeeConfig {
            base_url: "https://earthengine.googleapis.com/v1".to_string(),
            project: "ganges-river-monitor".to_string(),
            token_env: "GEE_ACCESS_TOKEN".to_string(),
            timeout_secs: 60,
            max_retries: 2,
            retry_backoff_ms: 500,
            imagery_dataset: "COPERNICUS/S2_SR".to_string(),
            climate_dataset: "ECMWF/ERA5_LAND/HOURLY".to_string(),
            cloud_threshold_pct: 10.0,
            index_scale_m: 10.0,
            climate_scale_m: 1000.0,
            render_scale_m: 10.0,
        }
    }
}
