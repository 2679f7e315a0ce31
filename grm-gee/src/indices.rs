//! Derived-index calculator: NDWI and MNDWI summary statistics for a
//! matched scene over a region.

use crate::catalog::SpatialReducer;
use crate::config::GeeConfig;
use crate::error::Result;
use grm_core::geometry::RegionGeometry;
use grm_core::record::{ImageHandle, WaterIndexStats};

pub struct WaterIndexCalculator<'a> {
    reducer: &'a dyn SpatialReducer,
    config: &'a GeeConfig,
}

impl<'a> WaterIndexCalculator<'a> {
    pub fn new(reducer: &'a dyn SpatialReducer, config: &'a GeeConfig) -> Self {
        WaterIndexCalculator { reducer, config }
    }

    /// Reduce both indices over the region at the configured scale.
    ///
    /// Statistics the service cannot compute (region entirely outside valid
    /// data, for instance) stay `None` in the result; that marks the single
    /// metric indeterminate, not the query failed.
    pub async fn compute_water_indices(
        &self,
        image: &ImageHandle,
        region: &RegionGeometry,
    ) -> Result<WaterIndexStats> {
        self.reducer
            .water_index_stats(image, region, self.config.index_scale_m)
            .await
    }
}
