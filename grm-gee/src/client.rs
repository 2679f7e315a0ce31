//! Production adapter for the Earth Engine REST API.

use crate::catalog::{ImageSearch, ImageryCatalog, RenderedImagery, SpatialReducer};
use crate::config::GeeConfig;
use crate::error::{GeeError, Result};
use crate::expr;
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate};
use grm_core::geometry::RegionGeometry;
use grm_core::record::{FoundImage, ImageHandle, WaterIndexStats};
use log::{debug, info, warn};
use serde_json::{json, Value};
use std::collections::BTreeMap;
use std::time::Duration;

/// Sentinel-2 band names for the water indices and natural-color rendering.
const GREEN: &str = "B3";
const NIR: &str = "B8";
const SWIR: &str = "B11";
const NATURAL_BANDS: [&str; 3] = ["B4", "B3", "B2"];

const MNDWI_PALETTE: [&str; 9] = [
    "#f7fbff", "#deebf7", "#c6dbef", "#9ecae1", "#6baed6", "#4292c6", "#2171b5", "#08519c",
    "#08306b",
];

/// An authenticated Earth Engine session.
///
/// Constructed once via [`GeeClient::connect`] and shared by reference;
/// there is no ambient global session. `connect` fails loudly when the
/// bearer token is missing or the readiness probe is rejected, so a "not
/// yet ready" deployment is distinguishable from per-request failures.
pub struct GeeClient {
    http: reqwest::Client,
    config: GeeConfig,
    token: String,
}

impl GeeClient {
    /// Establish a session: read the bearer token, build the HTTP client
    /// with the configured deadline, and probe the service with a trivial
    /// computation.
    pub async fn connect(config: GeeConfig) -> Result<Self> {
        let token = std::env::var(&config.token_env)
            .map_err(|_| GeeError::NotReady(format!("{} is not set", config.token_env)))?;
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        let client = GeeClient { http, config, token };

        client
            .compute_value(expr::constant(json!(1)))
            .await
            .map_err(|e| GeeError::NotReady(e.to_string()))?;
        info!(
            "Earth Engine session established for project {}",
            client.config.project
        );
        Ok(client)
    }

    pub fn config(&self) -> &GeeConfig {
        &self.config
    }

    fn project_url(&self, suffix: &str) -> String {
        format!(
            "{}/projects/{}/{}",
            self.config.base_url, self.config.project, suffix
        )
    }

    async fn post_json(&self, url: &str, body: &Value) -> Result<Value> {
        let response = self
            .http
            .post(url)
            .bearer_auth(&self.token)
            .json(body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    GeeError::Timeout
                } else {
                    GeeError::Http(e)
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_else(|_| String::new());
            return Err(GeeError::Upstream {
                status: status.as_u16(),
                message,
            });
        }
        response
            .json::<Value>()
            .await
            .map_err(|e| GeeError::Decode(e.to_string()))
    }

    /// POST with bounded retry on transient failures (quota throttling,
    /// gateway errors, timeouts). Backoff doubles per attempt.
    async fn post_with_retry(&self, url: &str, body: &Value) -> Result<Value> {
        retry_transient(
            self.config.max_retries,
            self.config.retry_backoff_ms,
            url,
            || self.post_json(url, body),
        )
        .await
    }

    /// Evaluate an expression server-side and return its value.
    async fn compute_value(&self, expression: Value) -> Result<Value> {
        let url = self.project_url("value:compute");
        let body = json!({ "expression": expression });
        debug!("value:compute against {}", url);
        let mut response = self.post_with_retry(&url, &body).await?;
        match response.get_mut("result") {
            Some(result) => Ok(result.take()),
            None => Ok(response),
        }
    }

    async fn compute_i64(&self, expression: Value) -> Result<i64> {
        let value = self.compute_value(expression).await?;
        value
            .as_i64()
            .ok_or_else(|| GeeError::Decode(format!("expected integer, got {value}")))
    }

    /// Render an expression to a PNG hosted by the service at the given
    /// pixel size, returning the pixel-fetch URL.
    async fn thumbnail_url(&self, expression: Value, scale_m: f64) -> Result<String> {
        let url = self.project_url("thumbnails");
        let body = thumbnail_request(expression, scale_m);
        let response = self.post_with_retry(&url, &body).await?;
        let name = response["name"]
            .as_str()
            .ok_or_else(|| GeeError::Decode("thumbnail response missing name".to_string()))?;
        Ok(format!("{}/{}:getPixels", self.config.base_url, name))
    }

    /// Dataset filtered to the search's window, bounds, and cloud threshold.
    fn filtered_collection(search: &ImageSearch) -> Value {
        expr::filter_cloud_below(
            expr::filter_bounds(
                expr::filter_date(
                    expr::image_collection(&search.dataset),
                    search.interval.start,
                    search.interval.end,
                ),
                &search.region,
            ),
            search.cloud_threshold_pct,
        )
    }

    fn natural_visualized(image: Value, region: &RegionGeometry) -> Value {
        expr::visualize(
            expr::clip(image, region),
            &NATURAL_BANDS,
            0.0,
            3000.0,
            Some(1.3),
            None,
        )
    }
}

/// Run `op` up to `max_retries + 1` times, sleeping with doubled backoff
/// between attempts. Only transient errors are retried; anything else (and
/// the last attempt's error) is returned as-is.
async fn retry_transient<T, F, Fut>(
    max_retries: u32,
    backoff_ms: u64,
    what: &str,
    mut op: F,
) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = Result<T>>,
{
    let max_tries = max_retries + 1;
    let mut sleep_millis = backoff_ms;
    let mut attempt = 1;

    loop {
        match op().await {
            Ok(value) => return Ok(value),
            Err(e) if e.is_transient() && attempt < max_tries => {
                warn!("Attempt {}/{} failed for {}: {}", attempt, max_tries, what, e);
                tokio::time::sleep(Duration::from_millis(sleep_millis)).await;
                sleep_millis *= 2;
                attempt += 1;
            }
            Err(e) => return Err(e),
        }
    }
}

/// Thumbnails request body: the expression plus the pixel grid, meters per
/// pixel. Without the grid the service picks its own output resolution.
fn thumbnail_request(expression: Value, scale_m: f64) -> Value {
    json!({
        "expression": expression,
        "fileFormat": "PNG",
        "grid": { "scale": scale_m },
    })
}

fn feature_to_image(feature: &Value) -> Option<FoundImage> {
    let id = feature["id"].as_str()?;
    let millis = feature["properties"]["system:time_start"].as_i64()?;
    let acquisition_date = DateTime::from_timestamp_millis(millis)?.date_naive();
    let cloud_pct = feature["properties"]["CLOUDY_PIXEL_PERCENTAGE"]
        .as_f64()
        .unwrap_or(0.0);
    Some(FoundImage {
        handle: ImageHandle(id.to_string()),
        acquisition_date,
        cloud_pct,
    })
}

#[async_trait]
impl ImageryCatalog for GeeClient {
    async fn search_images(&self, search: &ImageSearch, limit: u32) -> Result<Vec<FoundImage>> {
        let collection =
            expr::sort_by_cloud_and_limit(Self::filtered_collection(search), limit);
        let value = self.compute_value(collection).await?;
        let features = match value["features"].as_array() {
            Some(features) => features,
            None => return Ok(Vec::new()),
        };
        Ok(features.iter().filter_map(feature_to_image).collect())
    }

    async fn natural_thumb_url(
        &self,
        image: &ImageHandle,
        region: &RegionGeometry,
        scale_m: f64,
    ) -> Result<String> {
        self.thumbnail_url(
            Self::natural_visualized(expr::load_image(image.as_str()), region),
            scale_m,
        )
        .await
    }

    async fn mosaic_render(&self, search: &ImageSearch, scale_m: f64) -> Result<RenderedImagery> {
        let mosaic = expr::collection_mosaic(Self::filtered_collection(search));

        let mndwi = expr::normalized_difference(mosaic.clone(), GREEN, SWIR, "MNDWI");
        let mndwi_visualized = expr::visualize(
            expr::clip(mndwi, &search.region),
            &["MNDWI"],
            -0.5,
            0.5,
            None,
            Some(&MNDWI_PALETTE),
        );
        let mndwi_image_url = self.thumbnail_url(mndwi_visualized, scale_m).await?;

        let natural_image_url = self
            .thumbnail_url(Self::natural_visualized(mosaic, &search.region), scale_m)
            .await?;

        Ok(RenderedImagery {
            mndwi_image_url,
            natural_image_url,
            scale_m,
        })
    }
}

#[async_trait]
impl SpatialReducer for GeeClient {
    async fn water_index_stats(
        &self,
        image: &ImageHandle,
        region: &RegionGeometry,
        scale_m: f64,
    ) -> Result<WaterIndexStats> {
        let source = expr::load_image(image.as_str());
        let ndwi = expr::normalized_difference(source.clone(), GREEN, NIR, "NDWI");
        let mndwi = expr::normalized_difference(source, GREEN, SWIR, "MNDWI");
        let indices = expr::add_bands(ndwi, mndwi);
        let reduced = expr::reduce_region(indices, expr::stats_reducer(), region, scale_m, false);

        let stats = self.compute_value(reduced).await?;
        let get = |key: &str| stats[key].as_f64();
        Ok(WaterIndexStats {
            ndwi_mean: get("NDWI_mean"),
            ndwi_stddev: get("NDWI_stdDev"),
            ndwi_min: get("NDWI_min"),
            ndwi_max: get("NDWI_max"),
            mndwi_mean: get("MNDWI_mean"),
            mndwi_stddev: get("MNDWI_stdDev"),
            mndwi_min: get("MNDWI_min"),
            mndwi_max: get("MNDWI_max"),
        })
    }

    async fn climate_window_means(
        &self,
        dataset: &str,
        region: &RegionGeometry,
        start: NaiveDate,
        end: NaiveDate,
        scale_m: f64,
    ) -> Result<Option<BTreeMap<String, f64>>> {
        let collection = expr::filter_bounds(
            expr::filter_date(expr::image_collection(dataset), start, end),
            region,
        );

        let count = self.compute_i64(expr::collection_size(collection.clone())).await?;
        if count == 0 {
            return Ok(None);
        }

        let reduced = expr::reduce_region(
            expr::collection_mean(collection),
            expr::mean_reducer(),
            region,
            scale_m,
            true,
        );
        let value = self.compute_value(reduced).await?;
        let object = value
            .as_object()
            .ok_or_else(|| GeeError::Decode(format!("expected dictionary, got {value}")))?;

        let mut means = BTreeMap::new();
        for (band, v) in object {
            if let Some(n) = v.as_f64() {
                means.insert(band.clone(), n);
            }
        }
        Ok(Some(means))
    }
}
