//! Response shapes of the Open-Meteo geocoding, forecast and archive APIs.
//!
//! Scope: wire types only. Every field is optional because the services
//! omit blocks they were not asked for (and sometimes ones they were).
//! Normalization into domain types lives in `services::fetch`.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Daily variables requested from the forecast endpoint.
pub const FORECAST_DAILY_VARS: &str = "temperature_2m_max,temperature_2m_min,precipitation_probability_max,uv_index_max,weather_code,wind_speed_10m_max";

/// Current-condition variables requested from the forecast endpoint.
pub const FORECAST_CURRENT_VARS: &str = "temperature_2m,weather_code,wind_speed_10m";

/// Daily variables requested from the archive endpoint.
pub const ARCHIVE_DAILY_VARS: &str =
    "temperature_2m_max,temperature_2m_min,precipitation_sum,wind_speed_10m_max,uv_index_max,weather_code";

/// Upper bound the forecast endpoint is asked for.
pub const FORECAST_DAYS: u32 = 14;

// =====================
// Geocoding
// =====================

#[derive(Debug, Clone, Default, Deserialize)]
pub struct GeocodingResponse {
    #[serde(default)]
    pub results: Option<Vec<GeocodingResult>>,
}

/// One geocoding candidate. Also the input of `CityRegistry::add`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeocodingResult {
    pub name: String,
    pub latitude: f64,
    pub longitude: f64,
    #[serde(default)]
    pub country: Option<String>,
    #[serde(default)]
    pub admin1: Option<String>,
}

impl GeocodingResult {
    /// Administrative area and country, comma-joined, skipping blanks.
    pub fn region(&self) -> String {
        join_region(self.admin1.as_deref(), self.country.as_deref())
    }
}

pub fn join_region(admin1: Option<&str>, country: Option<&str>) -> String {
    [admin1, country]
        .into_iter()
        .flatten()
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join(", ")
}

// =====================
// Forecast / archive
// =====================

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ForecastResponse {
    #[serde(default)]
    pub current: Option<CurrentBlock>,
    #[serde(default)]
    pub daily: Option<DailyBlock>,
}

/// The archive endpoint answers with the same envelope minus `current`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ArchiveResponse {
    #[serde(default)]
    pub daily: Option<DailyBlock>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CurrentBlock {
    /// Local observation time, e.g. `2024-05-01T14:15` (no offset).
    #[serde(default)]
    pub time: Option<String>,
    #[serde(default)]
    pub temperature_2m: Option<f64>,
    #[serde(default)]
    pub weather_code: Option<i64>,
    #[serde(default)]
    pub wind_speed_10m: Option<f64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct DailyBlock {
    #[serde(default)]
    pub time: Option<Vec<NaiveDate>>,
    #[serde(default)]
    pub temperature_2m_max: Option<Vec<Option<f64>>>,
    #[serde(default)]
    pub temperature_2m_min: Option<Vec<Option<f64>>>,
    #[serde(default)]
    pub precipitation_probability_max: Option<Vec<Option<f64>>>,
    #[serde(default)]
    pub precipitation_sum: Option<Vec<Option<f64>>>,
    #[serde(default)]
    pub wind_speed_10m_max: Option<Vec<Option<f64>>>,
    #[serde(default)]
    pub uv_index_max: Option<Vec<Option<f64>>>,
    #[serde(default)]
    pub weather_code: Option<Vec<Option<i64>>>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn forecast_fixture_parses() {
        let resp: ForecastResponse = serde_json::from_str(include_str!("../../tests/data/forecast.json")).expect("parse forecast");
        let daily = resp.daily.expect("daily block");
        assert_eq!(daily.time.as_ref().map(Vec::len), Some(14));
        assert_eq!(resp.current.and_then(|c| c.weather_code), Some(3));
    }

    #[test]
    fn geocoding_without_results_is_empty() {
        let resp: GeocodingResponse = serde_json::from_str(r#"{"generationtime_ms":0.5}"#).unwrap();
        assert!(resp.results.is_none());
    }

    #[test]
    fn region_skips_blank_parts() {
        assert_eq!(join_region(Some("Bavaria"), Some("Germany")), "Bavaria, Germany");
        assert_eq!(join_region(Some(""), Some("Germany")), "Germany");
        assert_eq!(join_region(None, None), "");
    }
}
