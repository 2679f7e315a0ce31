//! Route handlers. Each handler validates its query parameters by hand so a
//! missing or malformed parameter is a 400 with a named message rather than
//! an extractor rejection.

use crate::error::ApiError;
use crate::state::AppState;
use axum::extract::{Query, State};
use axum::routing::get;
use axum::{Json, Router};
use chrono::NaiveDate;
use grm_collect::{BatchCollector, CancelFlag};
use grm_core::geometry::RegionGeometry;
use grm_core::interval::{Cadence, DateInterval, DATE_FORMAT};
use grm_gee::climate::ClimateQuery;
use grm_gee::imagery::ImageryQuery;
use serde::Deserialize;
use serde_json::{json, Value};

const IMAGERY_DEFAULT_START: &str = "2023-01-01";
const IMAGERY_DEFAULT_END: &str = "2023-12-31";
const COLLECT_DEFAULT_START: &str = "2020-01-01";
const COLLECT_DEFAULT_END: &str = "2023-12-31";

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/api/river-imagery", get(river_imagery))
        .route("/api/water-body-imagery", get(water_body_imagery))
        .route("/api/collect-river-data", get(collect_river_data))
        .route("/api/fetch-climate-data", get(fetch_climate_data))
        .route("/water-history", get(water_history))
        .with_state(state)
}

fn parse_date(raw: &str, name: &str) -> Result<NaiveDate, ApiError> {
    NaiveDate::parse_from_str(raw, DATE_FORMAT)
        .map_err(|_| ApiError::BadRequest(format!("invalid {name}: expected YYYY-MM-DD, got {raw}")))
}

fn date_or(raw: Option<&str>, default: &str, name: &str) -> Result<NaiveDate, ApiError> {
    parse_date(raw.unwrap_or(default), name)
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageryParams {
    coordinates: Option<String>,
    start_date: Option<String>,
    end_date: Option<String>,
}

impl ImageryParams {
    fn region(&self) -> Result<RegionGeometry, ApiError> {
        let raw = self
            .coordinates
            .as_deref()
            .ok_or_else(|| ApiError::BadRequest("Missing required parameter: coordinates".to_string()))?;
        Ok(RegionGeometry::polygon_from_json(raw)?)
    }

    fn interval(&self) -> Result<DateInterval, ApiError> {
        let start = date_or(self.start_date.as_deref(), IMAGERY_DEFAULT_START, "startDate")?;
        let end = date_or(self.end_date.as_deref(), IMAGERY_DEFAULT_END, "endDate")?;
        if start >= end {
            return Err(ApiError::BadRequest(format!(
                "startDate {start} must be before endDate {end}"
            )));
        }
        Ok(DateInterval::new(start, end))
    }
}

/// GET /api/river-imagery: MNDWI and natural-color composite renderings for
/// a client-supplied polygon over a date range.
async fn river_imagery(
    State(state): State<AppState>,
    Query(params): Query<ImageryParams>,
) -> Result<Json<Value>, ApiError> {
    let region = params.region()?;
    let interval = params.interval()?;

    let query = ImageryQuery::new(state.catalog.as_ref(), &state.gee);
    let rendered = query.mosaic_render_urls(&region, &interval).await?;

    Ok(Json(json!({
        "mndwiImageUrl": rendered.mndwi_image_url,
        "naturalImageUrl": rendered.natural_image_url,
        "scale": rendered.scale_m,
    })))
}

/// GET /api/water-body-imagery: recent scenes for a polygon, falling through
/// the dataset priority list; 404 when every combination is empty.
async fn water_body_imagery(
    State(state): State<AppState>,
    Query(params): Query<ImageryParams>,
) -> Result<Json<Value>, ApiError> {
    let region = params.region()?;
    let interval = params.interval()?;

    let query = ImageryQuery::new(state.catalog.as_ref(), &state.gee);
    let datasets = query
        .water_body_datasets(&region, &interval)
        .await?
        .ok_or_else(|| {
            ApiError::NotFound("No imagery found for this water body in any dataset".to_string())
        })?;

    Ok(Json(json!({
        "totalDatasets": datasets.len(),
        "datasets": datasets,
    })))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CollectParams {
    start_date: Option<String>,
    end_date: Option<String>,
}

/// GET /api/collect-river-data: run a quarterly batch over the configured
/// region and report the CSV path plus per-interval outcomes.
async fn collect_river_data(
    State(state): State<AppState>,
    Query(params): Query<CollectParams>,
) -> Result<Json<Value>, ApiError> {
    let start = date_or(params.start_date.as_deref(), COLLECT_DEFAULT_START, "startDate")?;
    let end = date_or(params.end_date.as_deref(), COLLECT_DEFAULT_END, "endDate")?;
    if start >= end {
        return Err(ApiError::BadRequest(format!(
            "startDate {start} must be before endDate {end}"
        )));
    }

    let region = RegionGeometry::polygon(state.collect.region.clone())?;
    let collector = BatchCollector::new(state.catalog.as_ref(), state.reducer.as_ref(), &state.gee);
    let outcome = collector
        .run(
            &region,
            start,
            end,
            Cadence::THREE_MONTHS,
            &state.collect.csv_dir(),
            state.collect.pause_ms,
            &CancelFlag::new(),
        )
        .await?;

    Ok(Json(json!({
        "success": true,
        "message": format!("Processed {} intervals", outcome.summaries.len()),
        "csvFilePath": outcome.csv_path,
        "results": outcome.summaries,
    })))
}

#[derive(Debug, Deserialize)]
pub struct ClimateParams {
    lat: Option<f64>,
    lon: Option<f64>,
    date: Option<String>,
}

/// GET /api/fetch-climate-data: averaged climate variables at a point around
/// one date. `climateData` is null when the window has no source data.
async fn fetch_climate_data(
    State(state): State<AppState>,
    Query(params): Query<ClimateParams>,
) -> Result<Json<Value>, ApiError> {
    let (lat, lon, date) = match (params.lat, params.lon, params.date.as_deref()) {
        (Some(lat), Some(lon), Some(date)) => (lat, lon, date),
        _ => {
            return Err(ApiError::BadRequest(
                "Missing required parameters: lat, lon, date".to_string(),
            ))
        }
    };
    let date = parse_date(date, "date")?;
    let region = RegionGeometry::point(lon, lat)?;

    let query = ClimateQuery::new(state.reducer.as_ref(), &state.gee);
    let record = query.query_climate(&region, date).await?;

    Ok(Json(json!({
        "success": true,
        "climateData": record,
    })))
}

#[derive(Debug, Deserialize)]
pub struct WaterHistoryParams {
    latitude: Option<f64>,
    longitude: Option<f64>,
    start_date: Option<String>,
    end_date: Option<String>,
}

/// GET /water-history: per-variable means from the public weather archive
/// over a date span at a point.
async fn water_history(
    State(state): State<AppState>,
    Query(params): Query<WaterHistoryParams>,
) -> Result<Json<Value>, ApiError> {
    let (latitude, longitude, start_raw, end_raw) = match (
        params.latitude,
        params.longitude,
        params.start_date.as_deref(),
        params.end_date.as_deref(),
    ) {
        (Some(lat), Some(lon), Some(start), Some(end)) => (lat, lon, start, end),
        _ => {
            return Err(ApiError::BadRequest(
                "Missing required parameters: latitude, longitude, start_date, end_date"
                    .to_string(),
            ))
        }
    };
    let start = parse_date(start_raw, "start_date")?;
    let end = parse_date(end_raw, "end_date")?;
    if start > end {
        return Err(ApiError::BadRequest(format!(
            "start_date {start} must not be after end_date {end}"
        )));
    }
    // Range-check through the point constructor before hitting the archive.
    RegionGeometry::point(longitude, latitude)?;

    let means = state
        .weather
        .history_means(latitude, longitude, start_raw, end_raw)
        .await?;

    Ok(Json(json!({
        "latitude": latitude,
        "longitude": longitude,
        "startDate": start_raw,
        "endDate": end_raw,
        "means": means,
    })))
}
