//! Batch collection of river monitoring data.
//!
//! Drives the interval generator over a requested span and, for each
//! interval, queries imagery, water indices, and climate sequentially,
//! appending one CSV row per completed interval. One interval's failure
//! never aborts the batch.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

pub mod collector;
pub mod sink;

pub use collector::{BatchCollector, BatchOutcome, CancelFlag, IntervalSummary};
pub use sink::{CsvSink, CSV_HEADERS};

/// Errors that abort a whole batch run (as opposed to per-interval failures,
/// which are contained and reported in the summary list).
#[derive(thiserror::Error, Debug)]
pub enum CollectError {
    /// Output directory or file could not be created/written
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// CSV serialization failed
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}

/// Batch collection settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CollectConfig {
    /// Root output directory; CSV files land in `<data_dir>/csv`.
    pub data_dir: PathBuf,
    /// Default collection region as `[lon, lat]` pairs (the monitored
    /// Varanasi reach of the Ganges).
    pub region: Vec<[f64; 2]>,
    /// Pause between intervals, milliseconds. Zero disables pacing.
    pub pause_ms: u64,
}

impl CollectConfig {
    pub fn csv_dir(&self) -> PathBuf {
        self.data_dir.join("csv")
    }
}

impl Default for CollectConfig {
    fn default() -> Self {
        CollectConfig {
            data_dir: PathBuf::from("river_data"),
            region: vec![
                [83.00, 25.20],
                [83.00, 25.40],
                [83.30, 25.40],
                [83.30, 25.20],
            ],
            pause_ms: 0,
        }
    }
}
