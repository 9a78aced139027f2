//! Blocking HTTP client for the Open-Meteo geocoding, forecast and archive
//! APIs.
//!
//! - Uses `ureq` (no async); one shared agent, safe to call from several
//!   threads at once.
//! - Responses are decoded through `serde_path_to_error` so a shape mismatch
//!   names the offending JSON path.
//! - No retries and no timeouts beyond the transport defaults.

use chrono::NaiveDate;
use log::debug;
use serde::de::DeserializeOwned;

use crate::config::Config;
use crate::models::open_meteo::*;

#[derive(Debug)]
pub enum ApiError {
    Transport(String),
    Http { status: u16, message: String },
    Json { path: String, message: String },
}

impl core::fmt::Display for ApiError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            ApiError::Transport(s) => write!(f, "transport error: {}", s),
            ApiError::Http { status, message } => write!(f, "http {}: {}", status, message),
            ApiError::Json { path, message } => write!(f, "json error at {}: {}", path, message),
        }
    }
}

impl std::error::Error for ApiError {}

impl From<ureq::Error> for ApiError {
    fn from(value: ureq::Error) -> Self {
        match value {
            ureq::Error::StatusCode(status) => ApiError::Http {
                status,
                message: String::from("<no body>"),
            },
            other => ApiError::Transport(other.to_string()),
        }
    }
}

/// The three Open-Meteo queries the dashboards need. Implemented by the HTTP
/// client and by the offline synthetic source.
pub trait WeatherApi: Sync {
    fn search(&self, query: &str, count: u32) -> Result<GeocodingResponse, ApiError>;

    fn forecast(&self, latitude: f64, longitude: f64) -> Result<ForecastResponse, ApiError>;

    fn archive(&self, latitude: f64, longitude: f64, start: NaiveDate, end: NaiveDate)
    -> Result<ArchiveResponse, ApiError>;
}

pub struct OpenMeteoClient {
    agent: ureq::Agent,
    geocoding_url: String,
    forecast_url: String,
    archive_url: String,
}

impl OpenMeteoClient {
    pub fn new(cfg: &Config) -> Self {
        // Non-2xx responses come back as responses so the body can be reported.
        let agent: ureq::Agent = ureq::Agent::config_builder()
            .http_status_as_error(false)
            .build()
            .into();
        OpenMeteoClient {
            agent,
            geocoding_url: cfg.geocoding_url.clone(),
            forecast_url: cfg.forecast_url.clone(),
            archive_url: cfg.archive_url.clone(),
        }
    }

    fn get_json<T: DeserializeOwned>(&self, url: &str, query: &[(&str, String)]) -> Result<T, ApiError> {
        let mut req = self.agent.get(url).header("Accept", "application/json");
        for (k, v) in query {
            req = req.query(k, v);
        }
        debug!("GET {} {:?}", url, query);

        let mut res = req.call()?;
        let status: http::StatusCode = res.status();
        let body = res.body_mut().read_to_string()?;
        if !status.is_success() {
            let message = if body.trim().is_empty() {
                String::from("<no body>")
            } else {
                body
            };
            return Err(ApiError::Http {
                status: status.as_u16(),
                message,
            });
        }
        decode_json(&body)
    }
}

pub(crate) fn decode_json<T: DeserializeOwned>(body: &str) -> Result<T, ApiError> {
    let de = &mut serde_json::Deserializer::from_str(body);
    serde_path_to_error::deserialize(de).map_err(|e| ApiError::Json {
        path: e.path().to_string(),
        message: e.inner().to_string(),
    })
}

fn coord(v: f64) -> String {
    v.to_string()
}

impl WeatherApi for OpenMeteoClient {
    fn search(&self, query: &str, count: u32) -> Result<GeocodingResponse, ApiError> {
        self.get_json(
            &self.geocoding_url,
            &[
                ("name", query.to_string()),
                ("count", count.to_string()),
                ("language", "en".to_string()),
                ("format", "json".to_string()),
            ],
        )
    }

    fn forecast(&self, latitude: f64, longitude: f64) -> Result<ForecastResponse, ApiError> {
        self.get_json(
            &self.forecast_url,
            &[
                ("latitude", coord(latitude)),
                ("longitude", coord(longitude)),
                ("current", FORECAST_CURRENT_VARS.to_string()),
                ("daily", FORECAST_DAILY_VARS.to_string()),
                ("forecast_days", FORECAST_DAYS.to_string()),
                ("timezone", "auto".to_string()),
            ],
        )
    }

    fn archive(
        &self,
        latitude: f64,
        longitude: f64,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<ArchiveResponse, ApiError> {
        self.get_json(
            &self.archive_url,
            &[
                ("latitude", coord(latitude)),
                ("longitude", coord(longitude)),
                ("start_date", start.format("%Y-%m-%d").to_string()),
                ("end_date", end.format("%Y-%m-%d").to_string()),
                ("daily", ARCHIVE_DAILY_VARS.to_string()),
                ("timezone", "auto".to_string()),
            ],
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decode_errors_name_the_json_path() {
        let err = decode_json::<ForecastResponse>(r#"{"daily":{"time":["2024-01-01","not-a-date"]}}"#).unwrap_err();
        match err {
            ApiError::Json { path, .. } => assert_eq!(path, "daily.time[1]"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn archive_fixture_decodes() {
        let resp: ArchiveResponse = decode_json(include_str!("../tests/data/archive.json")).expect("parse archive");
        let daily = resp.daily.expect("daily block");
        assert_eq!(daily.time.map(|t| t.len()), Some(5));
        assert!(daily.precipitation_sum.is_some());
    }
}
