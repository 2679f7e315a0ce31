use crate::water_history::WeatherProxy;
use grm_collect::CollectConfig;
use grm_gee::catalog::{ImageryCatalog, SpatialReducer};
use grm_gee::GeeConfig;
use std::sync::Arc;

/// Shared handler state.
///
/// Handlers hold the imagery service behind its seams, not the concrete
/// client, so route logic is testable with the same doubles the collector
/// tests use. Each request that triggers a batch owns its own sink and
/// geometry; nothing here is mutated after startup.
#[derive(Clone)]
pub struct AppState {
    pub catalog: Arc<dyn ImageryCatalog>,
    pub reducer: Arc<dyn SpatialReducer>,
    pub gee: Arc<GeeConfig>,
    pub collect: Arc<CollectConfig>,
    pub weather: Arc<WeatherProxy>,
}

impl AppState {
    pub fn new(
        catalog: Arc<dyn ImageryCatalog>,
        reducer: Arc<dyn SpatialReducer>,
        gee: GeeConfig,
        collect: CollectConfig,
        weather: WeatherProxy,
    ) -> Self {
        AppState {
            catalog,
            reducer,
            gee: Arc::new(gee),
            collect: Arc::new(collect),
            weather: Arc::new(weather),
        }
    }
}
