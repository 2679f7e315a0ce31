//! Proxy over the public Open-Meteo historical weather archive, returning
//! per-field means over the requested span.

use crate::error::ApiError;
use log::warn;
use serde::Deserialize;
use serde_json::Value;
use std::collections::BTreeMap;
use std::time::Duration;

const DAILY_FIELDS: [&str; 5] = [
    "temperature_2m_max",
    "temperature_2m_min",
    "precipitation_sum",
    "surface_pressure_mean",
    "rain_sum",
];

#[derive(Debug, Deserialize)]
struct ArchiveResponse {
    daily: Option<BTreeMap<String, Value>>,
}

pub struct WeatherProxy {
    http: reqwest::Client,
    base_url: String,
}

impl WeatherProxy {
    pub fn new(base_url: String, timeout_secs: u64) -> Result<Self, reqwest::Error> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()?;
        Ok(WeatherProxy { http, base_url })
    }

    pub fn open_meteo(timeout_secs: u64) -> Result<Self, reqwest::Error> {
        Self::new(
            "https://archive-api.open-meteo.com/v1/archive".to_string(),
            timeout_secs,
        )
    }

    /// Fetch the daily archive and reduce each variable to its mean.
    /// Days the archive reports as null are excluded from that field's mean;
    /// a field with no data at all comes back as `None`.
    pub async fn history_means(
        &self,
        latitude: f64,
        longitude: f64,
        start_date: &str,
        end_date: &str,
    ) -> Result<BTreeMap<String, Option<f64>>, ApiError> {
        let url = format!(
            "{}?latitude={}&longitude={}&start_date={}&end_date={}&daily={}&timezone=UTC",
            self.base_url,
            latitude,
            longitude,
            start_date,
            end_date,
            DAILY_FIELDS.join(",")
        );

        let response = self
            .http
            .get(&url)
            .send()
            .await
            .map_err(|e| ApiError::Upstream(format!("weather archive request failed: {e}")))?;
        if !response.status().is_success() {
            return Err(ApiError::Upstream(format!(
                "weather archive returned {}",
                response.status()
            )));
        }
        let archive: ArchiveResponse = response
            .json()
            .await
            .map_err(|e| ApiError::Upstream(format!("weather archive response: {e}")))?;

        let daily = match archive.daily {
            Some(daily) => daily,
            None => {
                warn!("weather archive response had no daily block");
                BTreeMap::new()
            }
        };

        let mut means = BTreeMap::new();
        for field in DAILY_FIELDS {
            let values = daily.get(field).and_then(Value::as_array);
            means.insert(format!("{field}_mean"), mean_of(values));
        }
        Ok(means)
    }
}

fn mean_of(values: Option<&Vec<Value>>) -> Option<f64> {
    let values = values?;
    let present: Vec<f64> = values.iter().filter_map(Value::as_f64).collect();
    if present.is_empty() {
        return None;
    }
    Some(present.iter().sum::<f64>() / present.len() as f64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_mean_skips_nulls() {
        let values = vec![json!(10.0), json!(null), json!(20.0)];
        assert_eq!(mean_of(Some(&values)), Some(15.0));
    }

    #[test]
    fn test_mean_none_when_all_null() {
        let values = vec![json!(null), json!(null)];
        assert_eq!(mean_of(Some(&values)), None);
        assert_eq!(mean_of(None), None);
    }
}
