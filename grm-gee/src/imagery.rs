//! Imagery query client: best-image selection, composite rendering, and the
//! fixed-priority dataset fallback for water-body queries.

use crate::catalog::{ImageSearch, ImageryCatalog, RenderedImagery};
use crate::config::GeeConfig;
use crate::error::Result;
use chrono::{Months, NaiveDate};
use grm_core::geometry::RegionGeometry;
use grm_core::interval::DateInterval;
use grm_core::record::ImageryMatch;
use log::info;
use serde::Serialize;

/// How many scenes a water-body response lists for the winning dataset.
const WATER_BODY_SCENE_LIMIT: u32 = 4;

/// One scene of the winning water-body dataset combination.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DatasetImagery {
    pub dataset: String,
    pub image_date: NaiveDate,
    pub cloud_percentage: f64,
    pub natural_image_url: String,
}

/// Queries scoped to the configured primary imagery dataset.
pub struct ImageryQuery<'a> {
    catalog: &'a dyn ImageryCatalog,
    config: &'a GeeConfig,
}

impl<'a> ImageryQuery<'a> {
    pub fn new(catalog: &'a dyn ImageryCatalog, config: &'a GeeConfig) -> Self {
        ImageryQuery { catalog, config }
    }

    fn primary_search(&self, region: &RegionGeometry, interval: &DateInterval) -> ImageSearch {
        ImageSearch {
            dataset: self.config.imagery_dataset.clone(),
            region: region.clone(),
            interval: *interval,
            cloud_threshold_pct: self.config.cloud_threshold_pct,
        }
    }

    /// The single least-cloudy qualifying scene for the interval, or
    /// `NotFound` when the window has none - an expected outcome the caller
    /// branches on, never an error.
    pub async fn find_best_image(
        &self,
        region: &RegionGeometry,
        interval: &DateInterval,
    ) -> Result<ImageryMatch> {
        let search = self.primary_search(region, interval);
        let mut images = self.catalog.search_images(&search, 1).await?;
        Ok(match images.pop() {
            Some(image) => ImageryMatch::Found(image),
            None => ImageryMatch::NotFound,
        })
    }

    /// Natural-color rendering of one matched scene at the configured scale.
    pub async fn natural_thumb_url(
        &self,
        image: &grm_core::record::ImageHandle,
        region: &RegionGeometry,
    ) -> Result<String> {
        self.catalog
            .natural_thumb_url(image, region, self.config.render_scale_m)
            .await
    }

    /// Merge all qualifying scenes in the interval into one composite and
    /// render MNDWI and natural-color views.
    pub async fn mosaic_render_urls(
        &self,
        region: &RegionGeometry,
        interval: &DateInterval,
    ) -> Result<RenderedImagery> {
        let search = self.primary_search(region, interval);
        self.catalog
            .mosaic_render(&search, self.config.render_scale_m)
            .await
    }

    /// Dataset/date-range combinations tried for water-body queries, in
    /// fixed priority order: the primary dataset over the requested range,
    /// the harmonized collection over the range widened one year back, and
    /// finally Landsat 8 over the requested range.
    fn water_body_combos(
        &self,
        region: &RegionGeometry,
        interval: &DateInterval,
    ) -> Vec<ImageSearch> {
        let widened_start = interval
            .start
            .checked_sub_months(Months::new(12))
            .unwrap_or(interval.start);
        vec![
            self.primary_search(region, interval),
            ImageSearch {
                dataset: "COPERNICUS/S2_SR_HARMONIZED".to_string(),
                region: region.clone(),
                interval: DateInterval::new(widened_start, interval.end),
                cloud_threshold_pct: 20.0,
            },
            ImageSearch {
                dataset: "LANDSAT/LC08/C02/T1_L2".to_string(),
                region: region.clone(),
                interval: *interval,
                cloud_threshold_pct: 20.0,
            },
        ]
    }

    /// Try each combination in order; the first yielding at least one scene
    /// wins. `None` when every combination is exhausted empty.
    pub async fn water_body_datasets(
        &self,
        region: &RegionGeometry,
        interval: &DateInterval,
    ) -> Result<Option<Vec<DatasetImagery>>> {
        for search in self.water_body_combos(region, interval) {
            let images = self
                .catalog
                .search_images(&search, WATER_BODY_SCENE_LIMIT)
                .await?;
            if images.is_empty() {
                info!(
                    "No scenes in {} for {}; trying next combination",
                    search.dataset,
                    search.interval.label()
                );
                continue;
            }

            let mut datasets = Vec::with_capacity(images.len());
            for image in images {
                let natural_image_url = self
                    .catalog
                    .natural_thumb_url(&image.handle, region, self.config.render_scale_m)
                    .await?;
                datasets.push(DatasetImagery {
                    dataset: search.dataset.clone(),
                    image_date: image.acquisition_date,
                    cloud_percentage: image.cloud_pct,
                    natural_image_url,
                });
            }
            return Ok(Some(datasets));
        }
        Ok(None)
    }
}


#[cfg(test)]
mod tests {
    use super::test_support::{image, test_region, FakeService};
    use super::*;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn interval() -> DateInterval {
        DateInterval::new(d(2020, 1, 1), d(2020, 4, 1))
    }

    #[tokio::test]
    async fn test_find_best_image_not_found_is_a_value() {
        let service = FakeService::default();
        let config = GeeConfig::default();
        let query = ImageryQuery::new(&service, &config);
        let matched = query
            .find_best_image(&test_region(), &interval())
            .await
            .unwrap();
        assert_eq!(matched, ImageryMatch::NotFound);
    }

    #[tokio::test]
    async fn test_find_best_image_takes_least_cloudy() {
        let mut service = FakeService::default();
        service.images_by_dataset.insert(
            "COPERNICUS/S2_SR".to_string(),
            vec![
                image("COPERNICUS/S2_SR/A", d(2020, 1, 14), 2.1),
                image("COPERNICUS/S2_SR/B", d(2020, 2, 3), 6.8),
            ],
        );
        let config = GeeConfig::default();
        let query = ImageryQuery::new(&service, &config);
        let matched = query
            .find_best_image(&test_region(), &interval())
            .await
            .unwrap();
        let found = matched.found().unwrap();
        assert_eq!(found.handle.as_str(), "COPERNICUS/S2_SR/A");
        assert_eq!(found.cloud_pct, 2.1);
    }

    #[tokio::test]
    async fn test_water_body_falls_through_combos_in_order() {
        let mut service = FakeService::default();
        // Nothing in the primary dataset; the harmonized fallback has scenes.
        service.images_by_dataset.insert(
            "COPERNICUS/S2_SR_HARMONIZED".to_string(),
            vec![image("COPERNICUS/S2_SR_HARMONIZED/C", d(2019, 11, 2), 12.0)],
        );
        let config = GeeConfig::default();
        let query = ImageryQuery::new(&service, &config);
        let datasets = query
            .water_body_datasets(&test_region(), &interval())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(datasets.len(), 1);
        assert_eq!(datasets[0].dataset, "COPERNICUS/S2_SR_HARMONIZED");
        assert_eq!(
            datasets[0].natural_image_url,
            "https://thumbs.test/COPERNICUS/S2_SR_HARMONIZED/C"
        );
    }

    #[tokio::test]
    async fn test_water_body_none_when_all_combos_empty() {
        let service = FakeService::default();
        let config = GeeConfig::default();
        let query = ImageryQuery::new(&service, &config);
        let datasets = query
            .water_body_datasets(&test_region(), &interval())
            .await
            .unwrap();
        assert!(datasets.is_none());
    }

    #[tokio::test]
    async fn test_primary_combo_wins_when_populated() {
        let mut service = FakeService::default();
        service.images_by_dataset.insert(
            "COPERNICUS/S2_SR".to_string(),
            vec![image("COPERNICUS/S2_SR/A", d(2020, 1, 14), 2.1)],
        );
        service.images_by_dataset.insert(
            "LANDSAT/LC08/C02/T1_L2".to_string(),
            vec![image("LANDSAT/LC08/C02/T1_L2/Z", d(2020, 2, 1), 5.0)],
        );
        let config = GeeConfig::default();
        let query = ImageryQuery::new(&service, &config);
        let datasets = query
            .water_body_datasets(&test_region(), &interval())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(datasets[0].dataset, "COPERNICUS/S2_SR");
    }
}
