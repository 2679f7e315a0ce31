use crate::interval::DateInterval;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Opaque reference to an image in the external catalog (its asset id).
///
/// Never dereferenced locally; only passed back to the service when
/// requesting derived products or renderings.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ImageHandle(pub String);

impl ImageHandle {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// A catalog image that passed the cloud-cover filter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FoundImage {
    pub handle: ImageHandle,
    pub acquisition_date: NaiveDate,
    /// Cloudy-pixel percentage reported by the catalog, 0-100.
    pub cloud_pct: f64,
}

/// Result of querying one interval for imagery.
///
/// `NotFound` is an expected, frequent outcome (monsoon seasons routinely
/// have no sufficiently cloud-free scene) and is not an error.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ImageryMatch {
    Found(FoundImage),
    NotFound,
}

impl ImageryMatch {
    pub fn found(&self) -> Option<&FoundImage> {
        match self {
            ImageryMatch::Found(image) => Some(image),
            ImageryMatch::NotFound => None,
        }
    }
}

/// Spatially reduced water-index statistics for one image over one region.
///
/// Each field is independently nullable: the service omits a statistic when
/// the region holds no valid pixels for it. A missing field means
/// "indeterminate for this metric only", never "query failed".
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct WaterIndexStats {
    pub ndwi_mean: Option<f64>,
    pub ndwi_stddev: Option<f64>,
    pub ndwi_min: Option<f64>,
    pub ndwi_max: Option<f64>,
    pub mndwi_mean: Option<f64>,
    pub mndwi_stddev: Option<f64>,
    pub mndwi_min: Option<f64>,
    pub mndwi_max: Option<f64>,
}

/// Averaged meteorological variables for a region around one date.
///
/// Fields the source had no data for are zero, not null - the climate feed's
/// convention, deliberately different from [`WaterIndexStats`]. Units after
/// conversion: degC, mm, hPa; soil moisture and runoff stay in source units.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ClimateRecord {
    pub mean_temp: f64,
    pub max_temp: f64,
    pub min_temp: f64,
    pub precipitation_mm: f64,
    pub pressure_hpa: f64,
    pub soil_moisture: f64,
    pub runoff: f64,
}

/// One fully collected row of the output dataset: everything the batch
/// collector learned about a single interval. Serialized to CSV immediately
/// and then dropped; only a summary is kept in memory.
#[derive(Debug, Clone, PartialEq)]
pub struct IntervalResult {
    pub interval: DateInterval,
    pub image_date: NaiveDate,
    pub natural_image_url: String,
    pub climate: ClimateRecord,
    pub indices: WaterIndexStats,
}
