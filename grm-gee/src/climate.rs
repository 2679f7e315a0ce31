//! Climate query client: averaged meteorological variables around one date.

use crate::catalog::SpatialReducer;
use crate::config::GeeConfig;
use crate::error::Result;
use chrono::{Days, NaiveDate};
use grm_core::geometry::RegionGeometry;
use grm_core::record::ClimateRecord;
use log::warn;
use std::collections::BTreeMap;

const KELVIN_OFFSET: f64 = 273.15;

pub struct ClimateQuery<'a> {
    reducer: &'a dyn SpatialReducer,
    config: &'a GeeConfig,
}

impl<'a> ClimateQuery<'a> {
    pub fn new(reducer: &'a dyn SpatialReducer, config: &'a GeeConfig) -> Self {
        ClimateQuery { reducer, config }
    }

    /// Averaged climate variables for the region around `date`.
    ///
    /// The date is widened to `[date-1, date+1]` to tolerate sparse temporal
    /// coverage. `None` when that window holds no source images at all.
    /// Variables missing from the window's reduction come back as `0`, not
    /// null - the climate feed's convention, which the CSV schema relies on.
    pub async fn query_climate(
        &self,
        region: &RegionGeometry,
        date: NaiveDate,
    ) -> Result<Option<ClimateRecord>> {
        let start = date.checked_sub_days(Days::new(1)).unwrap_or(date);
        let end = date.checked_add_days(Days::new(1)).unwrap_or(date);

        let means = match self
            .reducer
            .climate_window_means(
                &self.config.climate_dataset,
                region,
                start,
                end,
                self.config.climate_scale_m,
            )
            .await?
        {
            Some(means) => means,
            None => {
                warn!("No climate data available around {}", date);
                return Ok(None);
            }
        };

        Ok(Some(record_from_means(&means)))
    }
}

/// Convert units only for fields actually present, then zero-fill the rest.
/// Temperatures arrive in Kelvin, precipitation in meters, pressure in
/// Pascals; soil moisture and runoff keep source units.
fn record_from_means(means: &BTreeMap<String, f64>) -> ClimateRecord {
    let kelvin_to_c = |v: f64| v - KELVIN_OFFSET;
    let field = |name: &str, convert: &dyn Fn(f64) -> f64| {
        means.get(name).map(|v| convert(*v)).unwrap_or(0.0)
    };

    ClimateRecord {
        mean_temp: field("temperature_2m", &kelvin_to_c),
        max_temp: field("temperature_2m_max", &kelvin_to_c),
        min_temp: field("temperature_2m_min", &kelvin_to_c),
        precipitation_mm: field("total_precipitation", &|v| v * 1000.0),
        pressure_hpa: field("surface_pressure", &|v| v / 100.0),
        soil_moisture: field("volumetric_soil_water_layer_1", &|v| v),
        runoff: field("surface_runoff", &|v| v),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::imagery::test_support::{test_region, FakeService};

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[tokio::test]
    async fn test_empty_window_returns_none_not_error() {
        let service = FakeService::default();
        let config = GeeConfig::default();
        let query = ClimateQuery::new(&service, &config);
        let record = query
            .query_climate(&test_region(), d(2020, 1, 14))
            .await
            .unwrap();
        assert!(record.is_none());
    }

    #[tokio::test]
    async fn test_missing_field_is_zero_not_null() {
        let mut service = FakeService::default();
        let mut means = BTreeMap::new();
        means.insert("temperature_2m".to_string(), 300.15);
        // No precipitation, pressure, soil, or runoff bands in the window.
        service.climate_means = Some(means);

        let config = GeeConfig::default();
        let query = ClimateQuery::new(&service, &config);
        let record = query
            .query_climate(&test_region(), d(2020, 1, 14))
            .await
            .unwrap()
            .unwrap();
        assert!((record.mean_temp - 27.0).abs() < 1e-9);
        assert_eq!(record.precipitation_mm, 0.0);
        assert_eq!(record.pressure_hpa, 0.0);
        assert_eq!(record.soil_moisture, 0.0);
    }

    #[test]
    fn test_unit_conversions_apply_to_present_fields() {
        let mut means = BTreeMap::new();
        means.insert("temperature_2m".to_string(), 293.15);
        means.insert("total_precipitation".to_string(), 0.0042);
        means.insert("surface_pressure".to_string(), 101_325.0);
        means.insert("volumetric_soil_water_layer_1".to_string(), 0.31);

        let record = record_from_means(&means);
        assert!((record.mean_temp - 20.0).abs() < 1e-9);
        assert!((record.precipitation_mm - 4.2).abs() < 1e-9);
        assert!((record.pressure_hpa - 1013.25).abs() < 1e-9);
        // Soil moisture keeps source units.
        assert_eq!(record.soil_moisture, 0.31);
        // A missing temperature is 0, never -273.15.
        assert_eq!(record.max_temp, 0.0);
    }
}
