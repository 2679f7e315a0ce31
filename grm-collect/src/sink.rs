//! Write-once CSV sink, one file per batch run.

use crate::CollectError;
use chrono::Utc;
use grm_core::interval::DATE_FORMAT;
use grm_core::record::IntervalResult;
use std::fs;
use std::fs::File;
use std::path::{Path, PathBuf};

/// Fixed output schema. The header is written when the sink is created, so
/// it is present even when every interval is skipped or fails.
pub const CSV_HEADERS: [&str; 19] = [
    "interval_start",
    "interval_end",
    "image_date",
    "natural_image_url",
    "mean_temperature",
    "max_temperature",
    "min_temperature",
    "precipitation",
    "pressure",
    "soil_moisture",
    "runoff",
    "ndwi_mean",
    "ndwi_stddev",
    "ndwi_min",
    "ndwi_max",
    "mndwi_mean",
    "mndwi_stddev",
    "mndwi_min",
    "mndwi_max",
];

/// Append-ordered CSV output bound to one timestamp-named file.
///
/// Rows are written in interval order by a single writer; `finish` flushes
/// and closes exactly once.
pub struct CsvSink {
    writer: csv::Writer<File>,
    path: PathBuf,
}

impl CsvSink {
    /// Create `<dir>/ganges_data_<millis>.csv` (and `dir` itself if needed)
    /// and write the header row.
    pub fn create(dir: &Path) -> Result<Self, CollectError> {
        fs::create_dir_all(dir)?;
        let timestamp = Utc::now().timestamp_millis();
        let path = dir.join(format!("ganges_data_{timestamp}.csv"));
        let mut writer = csv::Writer::from_path(&path)?;
        writer.write_record(CSV_HEADERS)?;
        writer.flush()?;
        Ok(CsvSink { writer, path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append one completed interval. Index statistics the service could
    /// not compute serialize as 0, matching the established file schema.
    pub fn write(&mut self, row: &IntervalResult) -> Result<(), CollectError> {
        let num = |v: f64| v.to_string();
        let opt = |v: Option<f64>| v.unwrap_or(0.0).to_string();
        self.writer.write_record([
            row.interval.start.format(DATE_FORMAT).to_string(),
            row.interval.end.format(DATE_FORMAT).to_string(),
            row.image_date.format(DATE_FORMAT).to_string(),
            row.natural_image_url.clone(),
            num(row.climate.mean_temp),
            num(row.climate.max_temp),
            num(row.climate.min_temp),
            num(row.climate.precipitation_mm),
            num(row.climate.pressure_hpa),
            num(row.climate.soil_moisture),
            num(row.climate.runoff),
            opt(row.indices.ndwi_mean),
            opt(row.indices.ndwi_stddev),
            opt(row.indices.ndwi_min),
            opt(row.indices.ndwi_max),
            opt(row.indices.mndwi_mean),
            opt(row.indices.mndwi_stddev),
            opt(row.indices.mndwi_min),
            opt(row.indices.mndwi_max),
        ])?;
        Ok(())
    }

    /// Flush and close, returning the output path.
    pub fn finish(mut self) -> Result<PathBuf, CollectError> {
        self.writer.flush()?;
        Ok(self.path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use grm_core::interval::DateInterval;
    use grm_core::record::{ClimateRecord, WaterIndexStats};

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[test]
    fn test_header_written_even_with_zero_rows() {
        let dir = tempfile::tempdir().unwrap();
        let sink = CsvSink::create(dir.path()).unwrap();
        let path = sink.finish().unwrap();
        let content = fs::read_to_string(path).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0], CSV_HEADERS.join(","));
    }

    #[test]
    fn test_row_serialization_zero_fills_missing_stats() {
        let dir = tempfile::tempdir().unwrap();
        let mut sink = CsvSink::create(dir.path()).unwrap();
        sink.write(&IntervalResult {
            interval: DateInterval::new(d(2020, 1, 1), d(2020, 4, 1)),
            image_date: d(2020, 1, 14),
            natural_image_url: "https://thumbs.test/a".to_string(),
            climate: ClimateRecord {
                mean_temp: 21.5,
                ..ClimateRecord::default()
            },
            indices: WaterIndexStats {
                ndwi_mean: Some(0.12),
                ..WaterIndexStats::default()
            },
        })
        .unwrap();
        let path = sink.finish().unwrap();

        let content = fs::read_to_string(path).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines.len(), 2);
        let fields: Vec<&str> = lines[1].split(',').collect();
        assert_eq!(fields.len(), CSV_HEADERS.len());
        assert_eq!(fields[0], "2020-01-01");
        assert_eq!(fields[2], "2020-01-14");
        assert_eq!(fields[4], "21.5");
        assert_eq!(fields[11], "0.12");
        // Missing stdDev zero-filled.
        assert_eq!(fields[12], "0");
    }
}
