use crate::error::Result;
use async_trait::async_trait;
use chrono::NaiveDate;
use grm_core::geometry::RegionGeometry;
use grm_core::interval::DateInterval;
use grm_core::record::{FoundImage, ImageHandle, WaterIndexStats};
use std::collections::BTreeMap;

/// A catalog search scoped to one dataset, region, and date window.
#[derive(Debug, Clone, PartialEq)]
pub struct ImageSearch {
    pub dataset: String,
    pub region: RegionGeometry,
    pub interval: DateInterval,
    /// Only scenes below this cloudy-pixel percentage qualify.
    pub cloud_threshold_pct: f64,
}

/// Rendered composite for a region: water-index visualization plus the
/// natural-color rendering, both as service-hosted URLs.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderedImagery {
    pub mndwi_image_url: String,
    pub natural_image_url: String,
    /// Meters per pixel used for the rendering.
    pub scale_m: f64,
}

/// Catalog search and thumbnail rendering against the external imagery
/// service. The production implementation is [`crate::GeeClient`]; tests use
/// canned doubles.
#[async_trait]
pub trait ImageryCatalog: Send + Sync {
    /// Qualifying images for the search, least cloudy first, at most `limit`.
    ///
    /// Ordering is deterministic for a fixed input: cloud percentage
    /// ascending, catalog order breaking ties. An empty vector is an
    /// expected outcome, not an error.
    async fn search_images(&self, search: &ImageSearch, limit: u32) -> Result<Vec<FoundImage>>;

    /// Natural-color rendering of one image, clipped to the region.
    async fn natural_thumb_url(
        &self,
        image: &ImageHandle,
        region: &RegionGeometry,
        scale_m: f64,
    ) -> Result<String>;

    /// Merge all qualifying images into one composite and render both the
    /// MNDWI visualization and the natural-color view.
    async fn mosaic_render(&self, search: &ImageSearch, scale_m: f64) -> Result<RenderedImagery>;
}

/// Spatial reduction of per-pixel rasters into summary statistics.
#[async_trait]
pub trait SpatialReducer: Send + Sync {
    /// NDWI/MNDWI mean, stddev, min, and max over the region. Statistics the
    /// service cannot compute come back as `None` for that field only.
    async fn water_index_stats(
        &self,
        image: &ImageHandle,
        region: &RegionGeometry,
        scale_m: f64,
    ) -> Result<WaterIndexStats>;

    /// Mean of each band of `dataset` over the window `[start, end)`,
    /// spatially averaged over the region at best-effort precision.
    ///
    /// `None` when the window holds no source images at all; a present map
    /// may still omit individual band names.
    async fn climate_window_means(
        &self,
        dataset: &str,
        region: &RegionGeometry,
        start: NaiveDate,
        end: NaiveDate,
        scale_m: f64,
    ) -> Result<Option<BTreeMap<String, f64>>>;
}
