use crate::client::{ApiError, WeatherApi};
use crate::models::open_meteo::GeocodingResult;
use core::fmt;
use log::{debug, warn};
use std::error::Error;

#[derive(Debug)]
pub enum SearchError {
    Api(ApiError),
}

impl fmt::Display for SearchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SearchError::Api(e) => write!(f, "city search failed: {}", e),
        }
    }
}

impl Error for SearchError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            SearchError::Api(e) => Some(e),
        }
    }
}

impl From<ApiError> for SearchError {
    fn from(value: ApiError) -> Self {
        SearchError::Api(value)
    }
}

/// Geocode free text into at most `max_results` candidates.
///
/// A blank query yields no candidates without calling the API. Candidates
/// without finite coordinates are dropped.
pub fn search_cities<A: WeatherApi + ?Sized>(
    api: &A,
    query: &str,
    max_results: u32,
) -> Result<Vec<GeocodingResult>, SearchError> {
    let query = query.trim();
    if query.is_empty() {
        return Ok(Vec::new());
    }

    let resp = api.search(query, max_results)?;
    let candidates: Vec<GeocodingResult> = resp
        .results
        .unwrap_or_default()
        .into_iter()
        .filter(|c| {
            let ok = c.latitude.is_finite() && c.longitude.is_finite();
            if !ok {
                warn!("Search: dropping candidate {} without usable coordinates", c.name);
            }
            ok
        })
        .take(max_results as usize)
        .collect();
    debug!("Search: {:?} matched {} candidate(s)", query, candidates.len());
    Ok(candidates)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::open_meteo::{ArchiveResponse, ForecastResponse, GeocodingResponse};
    use chrono::NaiveDate;
    use std::sync::Mutex;

    struct GeocoderStub {
        body: Result<&'static str, u16>,
        queries: Mutex<Vec<(String, u32)>>,
    }

    impl GeocoderStub {
        fn new(body: Result<&'static str, u16>) -> Self {
            GeocoderStub {
                body,
                queries: Mutex::new(Vec::new()),
            }
        }
    }

    impl WeatherApi for GeocoderStub {
        fn search(&self, query: &str, count: u32) -> Result<GeocodingResponse, ApiError> {
            self.queries.lock().unwrap().push((query.to_string(), count));
            match self.body {
                Ok(body) => crate::client::decode_json(body),
                Err(status) => Err(ApiError::Http {
                    status,
                    message: "unavailable".into(),
                }),
            }
        }

        fn forecast(&self, _lat: f64, _lon: f64) -> Result<ForecastResponse, ApiError> {
            unreachable!("search never fetches weather")
        }

        fn archive(&self, _lat: f64, _lon: f64, _s: NaiveDate, _e: NaiveDate) -> Result<ArchiveResponse, ApiError> {
            unreachable!("search never fetches weather")
        }
    }

    const TWO_PARISES: &str = r#"{"results":[
        {"id":2988507,"name":"Paris","latitude":48.85341,"longitude":2.3488,"country":"France","admin1":"Île-de-France","timezone":"Europe/Paris"},
        {"id":4717560,"name":"Paris","latitude":33.66094,"longitude":-95.55551,"country":"United States","admin1":"Texas"}
    ]}"#;

    #[test]
    fn blank_query_makes_no_request() {
        let api = GeocoderStub::new(Ok(TWO_PARISES));
        assert!(search_cities(&api, "   ", 5).unwrap().is_empty());
        assert!(api.queries.lock().unwrap().is_empty());
    }

    #[test]
    fn returns_trimmed_query_results() {
        let api = GeocoderStub::new(Ok(TWO_PARISES));
        let found = search_cities(&api, "  Paris ", 5).unwrap();
        assert_eq!(found.len(), 2);
        assert_eq!(found[1].region(), "Texas, United States");
        assert_eq!(api.queries.lock().unwrap().as_slice(), &[("Paris".to_string(), 5)]);
    }

    #[test]
    fn caps_candidates() {
        let api = GeocoderStub::new(Ok(TWO_PARISES));
        assert_eq!(search_cities(&api, "Paris", 1).unwrap().len(), 1);
    }

    #[test]
    fn missing_results_is_empty() {
        let api = GeocoderStub::new(Ok(r#"{"generationtime_ms":0.3}"#));
        assert!(search_cities(&api, "Zzyzx", 5).unwrap().is_empty());
    }

    #[test]
    fn http_failure_is_reported() {
        let api = GeocoderStub::new(Err(503));
        let err = search_cities(&api, "Paris", 5).unwrap_err();
        assert!(matches!(err, SearchError::Api(ApiError::Http { status: 503, .. })));
    }
}
