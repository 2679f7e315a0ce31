//! Sequential batch collector with per-interval failure isolation.
//!
//! Each interval moves `Pending -> Skipped | Failed | Completed`; the batch
//! always runs to the end of the interval sequence (or to cancellation),
//! whatever individual intervals do. There is no rollback: rows already
//! written stay valid when a later interval fails.

use crate::sink::CsvSink;
use crate::CollectError;
use chrono::NaiveDate;
use grm_core::geometry::RegionGeometry;
use grm_core::interval::{generate, Cadence, DateInterval};
use grm_core::record::{ClimateRecord, IntervalResult};
use grm_gee::catalog::{ImageryCatalog, SpatialReducer};
use grm_gee::climate::ClimateQuery;
use grm_gee::imagery::ImageryQuery;
use grm_gee::indices::WaterIndexCalculator;
use grm_gee::GeeConfig;
use log::{error, info, warn};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Cooperative cancellation, checked between intervals only, so a cancel
/// never interrupts an in-flight query or a partially written row.
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Per-interval outcome reported back to the caller. Completed intervals
/// carry the acquisition date and rendering URL; skipped ones carry the
/// reason under `message`, failed ones the error under `error`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IntervalSummary {
    pub interval: DateInterval,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_date: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub natural_image_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl IntervalSummary {
    fn completed(interval: DateInterval, image_date: NaiveDate, url: String) -> Self {
        IntervalSummary {
            interval,
            success: true,
            image_date: Some(image_date),
            natural_image_url: Some(url),
            message: None,
            error: None,
        }
    }

    fn skipped(interval: DateInterval, reason: &str) -> Self {
        IntervalSummary {
            interval,
            success: false,
            image_date: None,
            natural_image_url: None,
            message: Some(reason.to_string()),
            error: None,
        }
    }

    fn failed(interval: DateInterval, error: String) -> Self {
        IntervalSummary {
            interval,
            success: false,
            image_date: None,
            natural_image_url: None,
            message: None,
            error: Some(error),
        }
    }

    pub fn is_skipped(&self) -> bool {
        !self.success && self.message.as_deref() == Some(SKIP_REASON)
    }

    pub fn is_failed(&self) -> bool {
        !self.success && self.error.is_some()
    }
}

pub const SKIP_REASON: &str = "no images found for this interval";

/// Result of a whole batch run.
#[derive(Debug)]
pub struct BatchOutcome {
    pub csv_path: PathBuf,
    pub summaries: Vec<IntervalSummary>,
}

/// Drives interval generation and the three query clients over one region.
pub struct BatchCollector<'a> {
    catalog: &'a dyn ImageryCatalog,
    reducer: &'a dyn SpatialReducer,
    gee: &'a GeeConfig,
}

impl<'a> BatchCollector<'a> {
    pub fn new(
        catalog: &'a dyn ImageryCatalog,
        reducer: &'a dyn SpatialReducer,
        gee: &'a GeeConfig,
    ) -> Self {
        BatchCollector { catalog, reducer, gee }
    }

    /// Run the batch: one CSV row per completed interval, in order, plus the
    /// full ordered summary list. The sink is closed exactly once, whatever
    /// mixture of completions, skips, failures, or cancellation occurs.
    pub async fn run(
        &self,
        region: &RegionGeometry,
        start: NaiveDate,
        end: NaiveDate,
        cadence: Cadence,
        csv_dir: &Path,
        pause_ms: u64,
        cancel: &CancelFlag,
    ) -> Result<BatchOutcome, CollectError> {
        let intervals = generate(start, end, cadence);
        info!(
            "Processing {} intervals from {} to {}",
            intervals.len(),
            start,
            end
        );

        let mut sink = CsvSink::create(csv_dir)?;
        let imagery = ImageryQuery::new(self.catalog, self.gee);
        let climate = ClimateQuery::new(self.reducer, self.gee);
        let indices = WaterIndexCalculator::new(self.reducer, self.gee);

        let mut summaries = Vec::with_capacity(intervals.len());
        for interval in intervals {
            if cancel.is_cancelled() {
                warn!("Collection cancelled before {}", interval.label());
                break;
            }

            info!("Processing interval: {}", interval.label());
            match self
                .collect_interval(&imagery, &climate, &indices, region, &interval)
                .await
            {
                Ok(Some(result)) => {
                    sink.write(&result)?;
                    info!("Successfully processed data for {}", result.image_date);
                    summaries.push(IntervalSummary::completed(
                        interval,
                        result.image_date,
                        result.natural_image_url,
                    ));
                }
                Ok(None) => {
                    info!("No images found for interval {}", interval.label());
                    summaries.push(IntervalSummary::skipped(interval, SKIP_REASON));
                }
                Err(e) => {
                    error!("Error processing interval {}: {}", interval.label(), e);
                    summaries.push(IntervalSummary::failed(interval, e.to_string()));
                }
            }

            if pause_ms > 0 {
                tokio::time::sleep(Duration::from_millis(pause_ms)).await;
            }
        }

        let csv_path = sink.finish()?;
        Ok(BatchOutcome { csv_path, summaries })
    }

    /// One interval, start to finish. `Ok(None)` is the no-image skip;
    /// any error is contained by the caller at the interval boundary.
    async fn collect_interval(
        &self,
        imagery: &ImageryQuery<'a>,
        climate: &ClimateQuery<'a>,
        indices: &WaterIndexCalculator<'a>,
        region: &RegionGeometry,
        interval: &DateInterval,
    ) -> Result<Option<IntervalResult>, grm_gee::GeeError> {
        let image = match imagery.find_best_image(region, interval).await?.found() {
            Some(image) => image.clone(),
            None => return Ok(None),
        };

        let climate_record = climate
            .query_climate(region, image.acquisition_date)
            .await?
            .unwrap_or_else(|| {
                warn!(
                    "No climate data around {}; writing zeros",
                    image.acquisition_date
                );
                ClimateRecord::default()
            });

        let index_stats = indices.compute_water_indices(&image.handle, region).await?;
        let natural_image_url = imagery.natural_thumb_url(&image.handle, region).await?;

        Ok(Some(IntervalResult {
            interval: *interval,
            image_date: image.acquisition_date,
            natural_image_url,
            climate: climate_record,
            indices: index_stats,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use grm_core::record::{FoundImage, ImageHandle, WaterIndexStats};
    use grm_gee::catalog::{ImageSearch, RenderedImagery};
    use grm_gee::error::{GeeError, Result as GeeResult};
    use std::collections::BTreeMap;
    use std::fs;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn region() -> RegionGeometry {
        RegionGeometry::polygon(vec![
            [83.00, 25.20],
            [83.00, 25.40],
            [83.30, 25.40],
            [83.30, 25.20],
        ])
        .unwrap()
    }

    /// Scripted double: per-interval behavior keyed by the interval start.
    struct ScriptedService {
        skip_starts: Vec<NaiveDate>,
        fail_starts: Vec<NaiveDate>,
    }

    #[async_trait]
    impl ImageryCatalog for ScriptedService {
        async fn search_images(
            &self,
            search: &ImageSearch,
            _limit: u32,
        ) -> GeeResult<Vec<FoundImage>> {
            if self.skip_starts.contains(&search.interval.start) {
                return Ok(Vec::new());
            }
            if self.fail_starts.contains(&search.interval.start) {
                return Err(GeeError::Upstream {
                    status: 500,
                    message: "computation failed".to_string(),
                });
            }
            Ok(vec![FoundImage {
                handle: ImageHandle(format!("COPERNICUS/S2_SR/{}", search.interval.start)),
                acquisition_date: search.interval.start,
                cloud_pct: 4.2,
            }])
        }

        async fn natural_thumb_url(
            &self,
            image: &ImageHandle,
            _region: &RegionGeometry,
            _scale_m: f64,
        ) -> GeeResult<String> {
            Ok(format!("https://thumbs.test/{}", image.as_str()))
        }

        async fn mosaic_render(
            &self,
            _search: &ImageSearch,
            scale_m: f64,
        ) -> GeeResult<RenderedImagery> {
            Ok(RenderedImagery {
                mndwi_image_url: String::new(),
                natural_image_url: String::new(),
                scale_m,
            })
        }
    }

    #[async_trait]
    impl SpatialReducer for ScriptedService {
        async fn water_index_stats(
            &self,
            _image: &ImageHandle,
            _region: &RegionGeometry,
            _scale_m: f64,
        ) -> GeeResult<WaterIndexStats> {
            Ok(WaterIndexStats {
                ndwi_mean: Some(0.1),
                ndwi_stddev: Some(0.05),
                ndwi_min: Some(-0.2),
                ndwi_max: Some(0.5),
                mndwi_mean: Some(0.2),
                mndwi_stddev: Some(0.07),
                mndwi_min: Some(-0.1),
                mndwi_max: Some(0.6),
            })
        }

        async fn climate_window_means(
            &self,
            _dataset: &str,
            _region: &RegionGeometry,
            _start: NaiveDate,
            _end: NaiveDate,
            _scale_m: f64,
        ) -> GeeResult<Option<BTreeMap<String, f64>>> {
            let mut means = BTreeMap::new();
            means.insert("temperature_2m".to_string(), 300.15);
            means.insert("surface_pressure".to_string(), 100_800.0);
            Ok(Some(means))
        }
    }

    // Five 3-month intervals: 2020-01-01 .. 2021-04-01.
    const BATCH_START: (i32, u32, u32) = (2020, 1, 1);
    const BATCH_END: (i32, u32, u32) = (2021, 4, 1);

    #[tokio::test]
    async fn test_skip_and_failure_are_contained_per_interval() {
        let service = ScriptedService {
            skip_starts: vec![d(2020, 7, 1)],  // interval 3
            fail_starts: vec![d(2020, 10, 1)], // interval 4
        };
        let gee = GeeConfig::default();
        let collector = BatchCollector::new(&service, &service, &gee);
        let dir = tempfile::tempdir().unwrap();

        let outcome = collector
            .run(
                &region(),
                d(BATCH_START.0, BATCH_START.1, BATCH_START.2),
                d(BATCH_END.0, BATCH_END.1, BATCH_END.2),
                Cadence::THREE_MONTHS,
                dir.path(),
                0,
                &CancelFlag::new(),
            )
            .await
            .unwrap();

        assert_eq!(outcome.summaries.len(), 5);
        assert!(outcome.summaries[0].success);
        assert!(outcome.summaries[1].success);
        assert!(outcome.summaries[2].is_skipped());
        assert!(outcome.summaries[3].is_failed());
        assert!(outcome.summaries[4].success);
        assert_eq!(
            outcome.summaries[2].message.as_deref(),
            Some("no images found for this interval")
        );
        assert_eq!(
            outcome.summaries[3].error.as_deref(),
            Some("upstream error (500): computation failed")
        );

        // Skips report under "message", failures under "error".
        let skipped = serde_json::to_value(&outcome.summaries[2]).unwrap();
        assert!(skipped.get("message").is_some());
        assert!(skipped.get("error").is_none());
        let failed = serde_json::to_value(&outcome.summaries[3]).unwrap();
        assert!(failed.get("error").is_some());
        assert!(failed.get("message").is_none());

        // Header plus exactly the three completed rows, in interval order.
        let content = fs::read_to_string(&outcome.csv_path).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines.len(), 4);
        assert!(lines[1].starts_with("2020-01-01,2020-04-01,"));
        assert!(lines[2].starts_with("2020-04-01,2020-07-01,"));
        assert!(lines[3].starts_with("2021-01-01,2021-04-01,"));
        // Completed rows carry populated climate and index fields.
        let fields: Vec<&str> = lines[1].split(',').collect();
        assert_eq!(fields[4], "27");
        assert_eq!(fields[8], "1008");
        assert_eq!(fields[11], "0.1");
    }

    #[tokio::test]
    async fn test_header_only_csv_when_every_interval_skips() {
        let service = ScriptedService {
            skip_starts: vec![d(2020, 1, 1), d(2020, 4, 1)],
            fail_starts: Vec::new(),
        };
        let gee = GeeConfig::default();
        let collector = BatchCollector::new(&service, &service, &gee);
        let dir = tempfile::tempdir().unwrap();

        let outcome = collector
            .run(
                &region(),
                d(2020, 1, 1),
                d(2020, 7, 1),
                Cadence::THREE_MONTHS,
                dir.path(),
                0,
                &CancelFlag::new(),
            )
            .await
            .unwrap();

        assert_eq!(outcome.summaries.len(), 2);
        assert!(outcome.summaries.iter().all(|s| s.is_skipped()));
        let content = fs::read_to_string(&outcome.csv_path).unwrap();
        assert_eq!(content.lines().count(), 1);
    }

    #[tokio::test]
    async fn test_cancellation_stops_between_intervals() {
        let service = ScriptedService {
            skip_starts: Vec::new(),
            fail_starts: Vec::new(),
        };
        let gee = GeeConfig::default();
        let collector = BatchCollector::new(&service, &service, &gee);
        let dir = tempfile::tempdir().unwrap();

        let cancel = CancelFlag::new();
        cancel.cancel();
        let outcome = collector
            .run(
                &region(),
                d(2020, 1, 1),
                d(2021, 1, 1),
                Cadence::THREE_MONTHS,
                dir.path(),
                0,
                &cancel,
            )
            .await
            .unwrap();

        // No interval ever started, but the sink was still created and
        // closed with its header.
        assert!(outcome.summaries.is_empty());
        let content = fs::read_to_string(&outcome.csv_path).unwrap();
        assert_eq!(content.lines().count(), 1);
    }

    #[tokio::test]
    async fn test_fifteen_day_cadence_batch() {
        let service = ScriptedService {
            skip_starts: Vec::new(),
            fail_starts: Vec::new(),
        };
        let gee = GeeConfig::default();
        let collector = BatchCollector::new(&service, &service, &gee);
        let dir = tempfile::tempdir().unwrap();

        let outcome = collector
            .run(
                &region(),
                d(2020, 1, 1),
                d(2020, 2, 15),
                Cadence::FIFTEEN_DAYS,
                dir.path(),
                0,
                &CancelFlag::new(),
            )
            .await
            .unwrap();
        assert_eq!(outcome.summaries.len(), 3);
        assert!(outcome.summaries.iter().all(|s| s.success));
    }
}
