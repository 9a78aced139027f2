//! Persisted record shapes and their read-side migration.
//!
//! Decoding is a pure function from raw JSON to an optional domain value:
//! anything that cannot be reshaped into a well-formed value is dropped (or
//! replaced by a default), never reported as an error.
//!
//! City list migration rules:
//! - Non-array lists load as empty; non-object entries are dropped.
//! - `name` falls back to "Unknown"; coordinates are coerced to numbers and
//!   fall back to 0 when not finite.
//! - `region` is rebuilt from legacy `admin1`/`country` when absent.
//! - `id` is re-derived when absent.
//! - Cached daily series written before precipitation, UV, condition codes
//!   and wind maxima were stored are discarded (weather becomes `None`).

use crate::models::open_meteo::join_region;
use crate::models::weather::{
    City, CityId, CurrentConditions, DailyColumns, DailySeries, DashboardMode, DateWindow, ForecastRange,
    MAX_WINDOW_DAYS, MIN_WINDOW_DAYS, PrecipitationKind, WeatherSnapshot, weather_code,
};
use crate::store::kv::{self, KeyValueStore, keys};
use chrono::NaiveDate;
use log::{debug, info};
use serde::Serialize;
use serde_json::{Map, Value};

pub const UNKNOWN_CITY_NAME: &str = "Unknown";

const DATE_FORMAT: &str = "%Y-%m-%d";

pub fn cities_key(mode: DashboardMode) -> &'static str {
    match mode {
        DashboardMode::Forecast => keys::FORECAST_CITIES,
        DashboardMode::Historical => keys::HISTORICAL_CITIES,
    }
}

fn precipitation_field(kind: PrecipitationKind) -> &'static str {
    match kind {
        PrecipitationKind::Probability => "precipProb",
        PrecipitationKind::Amount => "precipSum",
    }
}

// =====================
// Write side
// =====================

#[derive(Serialize)]
struct StoredCity<'a> {
    id: &'a CityId,
    name: &'a str,
    region: &'a str,
    latitude: f64,
    longitude: f64,
    weather: Option<StoredWeather<'a>>,
}

#[derive(Serialize)]
#[serde(untagged)]
enum StoredWeather<'a> {
    Forecast {
        temperature: Option<f64>,
        #[serde(rename = "weatherCode")]
        weather_code: Option<u8>,
        #[serde(rename = "windSpeed")]
        wind_speed: Option<f64>,
        updated: Option<&'a str>,
        daily: Option<StoredDaily<'a>>,
    },
    Historical {
        daily: Option<StoredDaily<'a>>,
    },
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct StoredDaily<'a> {
    time: &'a [NaiveDate],
    max: &'a [Option<f64>],
    min: &'a [Option<f64>],
    #[serde(skip_serializing_if = "Option::is_none")]
    precip_prob: Option<&'a [Option<f64>]>,
    #[serde(skip_serializing_if = "Option::is_none")]
    precip_sum: Option<&'a [Option<f64>]>,
    wind_max: &'a [Option<f64>],
    uv: &'a [Option<f64>],
    codes: &'a [Option<u8>],
}

impl<'a> StoredDaily<'a> {
    fn from_series(series: &'a DailySeries) -> Self {
        use crate::models::weather::Metric;
        let precipitation = series.metric(Metric::Precipitation);
        let (precip_prob, precip_sum) = match series.precipitation_kind() {
            PrecipitationKind::Probability => (Some(precipitation), None),
            PrecipitationKind::Amount => (None, Some(precipitation)),
        };
        StoredDaily {
            time: series.dates(),
            max: series.metric(Metric::MaxTemp),
            min: series.metric(Metric::MinTemp),
            precip_prob,
            precip_sum,
            wind_max: series.metric(Metric::WindMax),
            uv: series.metric(Metric::Uv),
            codes: series.codes(),
        }
    }
}

impl<'a> StoredCity<'a> {
    fn from_city(city: &'a City) -> Self {
        let weather = city.weather.as_ref().map(|w| match w {
            WeatherSnapshot::Forecast { current, daily } => StoredWeather::Forecast {
                temperature: current.temperature,
                weather_code: current.weather_code,
                wind_speed: current.wind_speed,
                updated: current.observed_at.as_deref(),
                daily: daily.as_ref().map(StoredDaily::from_series),
            },
            WeatherSnapshot::Historical { daily } => StoredWeather::Historical {
                daily: daily.as_ref().map(StoredDaily::from_series),
            },
        });
        StoredCity {
            id: &city.id,
            name: &city.name,
            region: &city.region,
            latitude: city.latitude,
            longitude: city.longitude,
            weather,
        }
    }
}

pub fn save_cities<S: KeyValueStore + ?Sized>(store: &mut S, mode: DashboardMode, cities: &[City]) {
    let records: Vec<StoredCity<'_>> = cities.iter().map(StoredCity::from_city).collect();
    kv::save(store, cities_key(mode), &records);
}

// =====================
// Read side
// =====================

pub fn load_cities<S: KeyValueStore + ?Sized>(store: &S, mode: DashboardMode) -> Vec<City> {
    let cities = decode_cities(kv::load(store, cities_key(mode)).as_ref(), mode);
    debug!("Store: loaded {} {} city record(s)", cities.len(), mode);
    cities
}

pub fn decode_cities(raw: Option<&Value>, mode: DashboardMode) -> Vec<City> {
    match raw {
        Some(Value::Array(entries)) => entries.iter().filter_map(|e| decode_city(e, mode)).collect(),
        _ => Vec::new(),
    }
}

/// JavaScript-style numeric coercion; `NaN` for values with no numeric reading.
fn coerce_number(value: Option<&Value>) -> f64 {
    match value {
        None => f64::NAN,
        Some(Value::Null) => 0.0,
        Some(Value::Bool(b)) => f64::from(u8::from(*b)),
        Some(Value::Number(n)) => n.as_f64().unwrap_or(f64::NAN),
        Some(Value::String(s)) => {
            let t = s.trim();
            if t.is_empty() {
                0.0
            } else {
                t.parse().unwrap_or(f64::NAN)
            }
        }
        Some(_) => f64::NAN,
    }
}

fn finite_or_zero(v: f64) -> f64 {
    if v.is_finite() { v } else { 0.0 }
}

fn str_field<'a>(obj: &'a Map<String, Value>, key: &str) -> Option<&'a str> {
    obj.get(key).and_then(Value::as_str)
}

pub fn decode_city(raw: &Value, mode: DashboardMode) -> Option<City> {
    let obj = raw.as_object()?;

    let name = str_field(obj, "name").unwrap_or(UNKNOWN_CITY_NAME).to_string();
    let latitude = finite_or_zero(coerce_number(obj.get("latitude")));
    let longitude = finite_or_zero(coerce_number(obj.get("longitude")));

    let derived = CityId::derive(&name, latitude, longitude);
    let id = match obj.get("id") {
        // Older lists kept the name's casing in the id.
        Some(Value::String(s)) if !s.is_empty() && s.to_lowercase() != derived.0 => CityId(s.clone()),
        Some(Value::Number(n)) => CityId(n.to_string()),
        _ => derived,
    };

    let region = match str_field(obj, "region") {
        Some(r) => r.to_string(),
        None => join_region(str_field(obj, "admin1"), str_field(obj, "country")),
    };

    let weather = obj.get("weather").and_then(|w| decode_weather(w, mode));
    if weather.is_none() && obj.get("weather").is_some_and(|w| !w.is_null()) {
        info!("Store: discarding outdated cached weather for {}", name);
    }

    Some(City {
        id,
        name,
        region,
        latitude,
        longitude,
        weather,
    })
}

fn decode_weather(raw: &Value, mode: DashboardMode) -> Option<WeatherSnapshot> {
    let obj = raw.as_object()?;
    let daily = match obj.get("daily") {
        None | Some(Value::Null) => None,
        Some(d) => Some(decode_daily(d, mode.precipitation_kind())?),
    };
    Some(match mode {
        DashboardMode::Forecast => WeatherSnapshot::Forecast {
            current: CurrentConditions {
                temperature: obj.get("temperature").and_then(Value::as_f64),
                weather_code: obj.get("weatherCode").and_then(Value::as_i64).and_then(weather_code),
                wind_speed: obj.get("windSpeed").and_then(Value::as_f64),
                observed_at: str_field(obj, "updated").map(str::to_string),
            },
            daily,
        },
        DashboardMode::Historical => WeatherSnapshot::Historical { daily },
    })
}

/// `None` when the cached series predates the current schema.
fn decode_daily(raw: &Value, kind: PrecipitationKind) -> Option<DailySeries> {
    let obj = raw.as_object()?;
    let required = [precipitation_field(kind), "uv", "codes", "windMax"];
    if required.iter().any(|k| !obj.get(*k).is_some_and(Value::is_array)) {
        return None;
    }

    let dates = obj
        .get("time")?
        .as_array()?
        .iter()
        .map(|d| d.as_str().and_then(|s| NaiveDate::parse_from_str(s, DATE_FORMAT).ok()))
        .collect::<Option<Vec<_>>>()?;

    let numbers = |key: &str| -> Vec<Option<f64>> {
        obj.get(key)
            .and_then(Value::as_array)
            .map(|a| a.iter().map(Value::as_f64).collect())
            .unwrap_or_default()
    };
    let codes = obj
        .get("codes")
        .and_then(Value::as_array)
        .map(|a| a.iter().map(|c| c.as_i64().and_then(weather_code)).collect())
        .unwrap_or_default();

    Some(DailySeries::aligned(
        dates,
        kind,
        DailyColumns {
            max: numbers("max"),
            min: numbers("min"),
            precipitation: numbers(precipitation_field(kind)),
            wind_max: numbers("windMax"),
            uv: numbers("uv"),
            codes,
        },
    ))
}

// =====================
// Range / window selections
// =====================

pub fn load_forecast_range<S: KeyValueStore + ?Sized>(store: &S) -> ForecastRange {
    kv::load_raw(store, keys::FORECAST_RANGE)
        .and_then(|raw| decode_forecast_range(&raw))
        .unwrap_or_default()
}

pub fn decode_forecast_range(raw: &str) -> Option<ForecastRange> {
    let days: f64 = raw.trim().parse().ok()?;
    if days.fract() != 0.0 {
        return None;
    }
    ForecastRange::from_days(days as i64)
}

pub fn save_forecast_range<S: KeyValueStore + ?Sized>(store: &mut S, range: ForecastRange) {
    kv::save_raw(store, keys::FORECAST_RANGE, &range.days().to_string());
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct StoredWindow {
    start: NaiveDate,
    num_days: u32,
}

pub fn load_date_window<S: KeyValueStore + ?Sized>(store: &S, today: NaiveDate) -> DateWindow {
    kv::load(store, keys::HISTORICAL_WINDOW)
        .and_then(|v| decode_date_window(&v))
        .unwrap_or_else(|| DateWindow::default_for(today))
}

/// Accepts `{start, numDays}` and the legacy `{start, end}` shape; the
/// latter becomes the inclusive day count between the two dates.
pub fn decode_date_window(raw: &Value) -> Option<DateWindow> {
    let obj = raw.as_object()?;
    let parse_date = |key: &str| str_field(obj, key).and_then(|s| NaiveDate::parse_from_str(s.trim(), DATE_FORMAT).ok());
    let start = parse_date("start")?;

    if obj.get("end").is_some_and(|e| !e.is_null()) {
        let end = parse_date("end")?;
        let span = (end - start).num_days().unsigned_abs() + 1;
        let num_days = span.min(u64::from(MAX_WINDOW_DAYS)) as u32;
        debug!("Store: migrated legacy window {}..{} to {} day(s)", start, end, num_days);
        return Some(DateWindow { start, num_days });
    }

    let days = coerce_number(obj.get("numDays"));
    if days.fract() != 0.0 || days < f64::from(MIN_WINDOW_DAYS) || days > f64::from(MAX_WINDOW_DAYS) {
        return None;
    }
    Some(DateWindow {
        start,
        num_days: days as u32,
    })
}

pub fn save_date_window<S: KeyValueStore + ?Sized>(store: &mut S, window: DateWindow) {
    let record = StoredWindow {
        start: window.start,
        num_days: window.num_days,
    };
    kv::save(store, keys::HISTORICAL_WINDOW, &record);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::weather::Metric;
    use crate::store::kv::MemoryStore;
    use serde_json::json;

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn forecast_daily() -> Value {
        json!({
            "time": ["2024-06-01", "2024-06-02"],
            "max": [21.5, 23.0],
            "min": [12.0, 13.5],
            "precipProb": [10, 80],
            "windMax": [14.2, 20.1],
            "uv": [5.5, 6.1],
            "codes": [1, 61]
        })
    }

    #[test]
    fn non_array_lists_load_empty() {
        for raw in [json!({"a": 1}), json!("cities"), json!(3), Value::Null] {
            assert!(decode_cities(Some(&raw), DashboardMode::Forecast).is_empty());
        }
        assert!(decode_cities(None, DashboardMode::Forecast).is_empty());
    }

    #[test]
    fn non_object_entries_are_dropped() {
        let raw = json!([null, 4, "x", [1, 2], {"name": "Oslo", "latitude": 59.91, "longitude": 10.75}]);
        let cities = decode_cities(Some(&raw), DashboardMode::Forecast);
        assert_eq!(cities.len(), 1);
        assert_eq!(cities[0].name, "Oslo");
        assert_eq!(cities[0].id.0, "oslo-59.91-10.75");
    }

    #[test]
    fn missing_fields_get_defaults() {
        let raw = json!([{"latitude": "abc", "longitude": null, "admin1": "Lazio", "country": "Italy"}]);
        let cities = decode_cities(Some(&raw), DashboardMode::Historical);
        let c = &cities[0];
        assert_eq!(c.name, UNKNOWN_CITY_NAME);
        assert_eq!(c.latitude, 0.0);
        assert_eq!(c.longitude, 0.0);
        assert_eq!(c.region, "Lazio, Italy");
        assert_eq!(c.id.0, "unknown-0-0");
        assert!(c.weather.is_none());
    }

    #[test]
    fn mixed_case_ids_are_lowercased() {
        let raw = json!([
            {"id": "Paris-48.85-2.35", "name": "Paris", "latitude": 48.85, "longitude": 2.35},
            {"id": 2988507, "name": "Paris", "latitude": 48.85, "longitude": 2.35}
        ]);
        let cities = decode_cities(Some(&raw), DashboardMode::Forecast);
        assert_eq!(cities[0].id.0, "paris-48.85-2.35");
        assert_eq!(cities[1].id.0, "2988507");
    }

    #[test]
    fn numeric_strings_are_coerced() {
        let raw = json!({"name": "Rome", "latitude": " 41.9 ", "longitude": 12.5, "region": "Lazio, Italy", "id": "r"});
        let c = decode_city(&raw, DashboardMode::Forecast).unwrap();
        assert_eq!(c.latitude, 41.9);
        assert_eq!(c.id.0, "r");
        assert_eq!(c.region, "Lazio, Italy");
    }

    #[test]
    fn outdated_daily_series_is_discarded() {
        for missing in ["precipProb", "uv", "codes", "windMax"] {
            let mut daily = forecast_daily();
            daily.as_object_mut().unwrap().remove(missing);
            let raw = json!({"name": "Lima", "latitude": -12.04, "longitude": -77.04,
                "weather": {"temperature": 18.0, "daily": daily}});
            let c = decode_city(&raw, DashboardMode::Forecast).unwrap();
            assert!(c.weather.is_none(), "weather kept without {missing}");
        }
    }

    #[test]
    fn forecast_record_is_stale_for_historical_dashboard() {
        let raw = json!({"name": "Lima", "weather": {"daily": forecast_daily()}});
        assert!(decode_city(&raw, DashboardMode::Historical).unwrap().weather.is_none());
    }

    #[test]
    fn complete_daily_series_survives() {
        let raw = json!({"name": "Lima", "latitude": -12.04, "longitude": -77.04,
            "weather": {"temperature": 18.0, "weatherCode": 2, "windSpeed": 9.0, "updated": "2024-06-01T10:00",
                        "daily": forecast_daily()}});
        let c = decode_city(&raw, DashboardMode::Forecast).unwrap();
        let daily = c.daily().expect("daily kept");
        assert_eq!(daily.len(), 2);
        assert_eq!(daily.metric(Metric::Precipitation), &[Some(10.0), Some(80.0)]);
        assert_eq!(daily.codes(), &[Some(1), Some(61)]);
        assert_eq!(c.weather.unwrap().current().unwrap().weather_code, Some(2));
    }

    #[test]
    fn weather_without_daily_keeps_current_conditions() {
        let raw = json!({"name": "Lima", "weather": {"temperature": 18.0, "daily": null}});
        let c = decode_city(&raw, DashboardMode::Forecast).unwrap();
        let w = c.weather.expect("weather kept");
        assert!(w.daily().is_none());
        assert_eq!(w.current().unwrap().temperature, Some(18.0));
    }

    #[test]
    fn cities_round_trip_through_store() {
        let mut store = MemoryStore::default();
        let raw = json!([{"name": "Lima", "latitude": -12.04, "longitude": -77.04, "region": "Lima, Peru",
            "weather": {"temperature": 18.0, "weatherCode": 2, "windSpeed": 9.0, "updated": null,
                        "daily": forecast_daily()}}]);
        let cities = decode_cities(Some(&raw), DashboardMode::Forecast);
        save_cities(&mut store, DashboardMode::Forecast, &cities);
        assert_eq!(load_cities(&store, DashboardMode::Forecast), cities);
        assert!(load_cities(&store, DashboardMode::Historical).is_empty());
    }

    #[test]
    fn legacy_window_migrates_to_inclusive_count() {
        let w = decode_date_window(&json!({"start": "2024-01-01", "end": "2024-01-10"})).unwrap();
        assert_eq!(
            w,
            DateWindow {
                start: day(2024, 1, 1),
                num_days: 10
            }
        );
        let long = decode_date_window(&json!({"start": "2020-01-01", "end": "2024-01-10"})).unwrap();
        assert_eq!(long.num_days, MAX_WINDOW_DAYS);
    }

    #[test]
    fn invalid_windows_fall_back_to_default() {
        let mut store = MemoryStore::default();
        let today = day(2024, 5, 20);
        assert_eq!(load_date_window(&store, today), DateWindow::default_for(today));
        for raw in [r#"{"start":"2024-01-01","numDays":0}"#, r#"{"start":"2024-01-01","numDays":400}"#, r#"{"start":"soon","numDays":5}"#, "[]", "nope"] {
            store.write(keys::HISTORICAL_WINDOW, raw).unwrap();
            assert_eq!(load_date_window(&store, today), DateWindow::default_for(today), "{raw}");
        }
    }

    #[test]
    fn window_round_trips() {
        let mut store = MemoryStore::default();
        let w = DateWindow {
            start: day(2023, 12, 24),
            num_days: 45,
        };
        save_date_window(&mut store, w);
        assert_eq!(store.raw(keys::HISTORICAL_WINDOW), Some(r#"{"start":"2023-12-24","numDays":45}"#));
        assert_eq!(load_date_window(&store, day(2024, 5, 20)), w);
    }

    #[test]
    fn forecast_range_accepts_only_known_horizons() {
        assert_eq!(decode_forecast_range("14"), Some(ForecastRange::Fortnight));
        assert_eq!(decode_forecast_range(" 7 "), Some(ForecastRange::Week));
        assert_eq!(decode_forecast_range("10"), None);
        assert_eq!(decode_forecast_range("7.5"), None);
        let mut store = MemoryStore::default();
        assert_eq!(load_forecast_range(&store), ForecastRange::Week);
        save_forecast_range(&mut store, ForecastRange::Fortnight);
        assert_eq!(store.raw(keys::FORECAST_RANGE), Some("14"));
        assert_eq!(load_forecast_range(&store), ForecastRange::Fortnight);
    }
}
