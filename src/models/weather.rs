//! Domain types shared by the registry, fetch service, aggregation and chart
//! builder.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Which dashboard a registry, record or snapshot belongs to.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DashboardMode {
    Forecast,
    Historical,
}

impl DashboardMode {
    pub fn precipitation_kind(self) -> PrecipitationKind {
        match self {
            DashboardMode::Forecast => PrecipitationKind::Probability,
            DashboardMode::Historical => PrecipitationKind::Amount,
        }
    }
}

impl fmt::Display for DashboardMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DashboardMode::Forecast => f.write_str("forecast"),
            DashboardMode::Historical => f.write_str("historical"),
        }
    }
}

/// Stable identity of a tracked city: `<lowercased name>-<lat>-<lon>`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CityId(pub String);

impl CityId {
    pub fn derive(name: &str, latitude: f64, longitude: f64) -> Self {
        CityId(format!("{}-{}-{}", name.to_lowercase(), latitude, longitude))
    }
}

impl fmt::Display for CityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct City {
    pub id: CityId,
    pub name: String,
    /// `admin1, country`; the first segment is the short label.
    pub region: String,
    pub latitude: f64,
    pub longitude: f64,
    pub weather: Option<WeatherSnapshot>,
}

impl City {
    pub fn daily(&self) -> Option<&DailySeries> {
        self.weather.as_ref().and_then(WeatherSnapshot::daily)
    }

    /// Daily series only when it holds at least one day.
    pub fn populated_daily(&self) -> Option<&DailySeries> {
        self.daily().filter(|d| !d.is_empty())
    }
}

/// Instantaneous conditions reported alongside a forecast.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CurrentConditions {
    pub temperature: Option<f64>,
    pub weather_code: Option<u8>,
    pub wind_speed: Option<f64>,
    /// Local observation time as sent by the API.
    pub observed_at: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum WeatherSnapshot {
    Forecast {
        current: CurrentConditions,
        daily: Option<DailySeries>,
    },
    Historical {
        daily: Option<DailySeries>,
    },
}

impl WeatherSnapshot {
    pub fn daily(&self) -> Option<&DailySeries> {
        match self {
            WeatherSnapshot::Forecast { daily, .. } | WeatherSnapshot::Historical { daily } => daily.as_ref(),
        }
    }

    pub fn current(&self) -> Option<&CurrentConditions> {
        match self {
            WeatherSnapshot::Forecast { current, .. } => Some(current),
            WeatherSnapshot::Historical { .. } => None,
        }
    }
}

/// What the precipitation column of a [`DailySeries`] measures.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PrecipitationKind {
    /// Maximum precipitation probability, percent.
    Probability,
    /// Summed precipitation, millimetres.
    Amount,
}

/// Numeric columns of a [`DailySeries`].
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum Metric {
    MaxTemp,
    MinTemp,
    Precipitation,
    WindMax,
    Uv,
}

/// Per-day weather columns for one city. All columns have exactly
/// `dates().len()` entries; a missing value is `None`, never a shorter column.
#[derive(Debug, Clone, PartialEq)]
pub struct DailySeries {
    dates: Vec<NaiveDate>,
    max: Vec<Option<f64>>,
    min: Vec<Option<f64>>,
    precipitation: Vec<Option<f64>>,
    precipitation_kind: PrecipitationKind,
    wind_max: Vec<Option<f64>>,
    uv: Vec<Option<f64>>,
    codes: Vec<Option<u8>>,
}

/// Unaligned columns; [`DailySeries::aligned`] pads or truncates them.
#[derive(Debug, Clone, Default)]
pub struct DailyColumns {
    pub max: Vec<Option<f64>>,
    pub min: Vec<Option<f64>>,
    pub precipitation: Vec<Option<f64>>,
    pub wind_max: Vec<Option<f64>>,
    pub uv: Vec<Option<f64>>,
    pub codes: Vec<Option<u8>>,
}

fn fit<T: Clone>(mut column: Vec<Option<T>>, len: usize) -> Vec<Option<T>> {
    column.resize(len, None);
    column
}

impl DailySeries {
    pub fn aligned(dates: Vec<NaiveDate>, precipitation_kind: PrecipitationKind, columns: DailyColumns) -> Self {
        let len = dates.len();
        DailySeries {
            dates,
            max: fit(columns.max, len),
            min: fit(columns.min, len),
            precipitation: fit(columns.precipitation, len),
            precipitation_kind,
            wind_max: fit(columns.wind_max, len),
            uv: fit(columns.uv, len),
            codes: fit(columns.codes, len),
        }
    }

    pub fn len(&self) -> usize {
        self.dates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dates.is_empty()
    }

    pub fn dates(&self) -> &[NaiveDate] {
        &self.dates
    }

    pub fn precipitation_kind(&self) -> PrecipitationKind {
        self.precipitation_kind
    }

    pub fn metric(&self, metric: Metric) -> &[Option<f64>] {
        match metric {
            Metric::MaxTemp => &self.max,
            Metric::MinTemp => &self.min,
            Metric::Precipitation => &self.precipitation,
            Metric::WindMax => &self.wind_max,
            Metric::Uv => &self.uv,
        }
    }

    pub fn codes(&self) -> &[Option<u8>] {
        &self.codes
    }
}

/// Forecast horizon choice of the forecast dashboard.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Default)]
pub enum ForecastRange {
    #[default]
    Week,
    Fortnight,
}

impl ForecastRange {
    pub fn days(self) -> usize {
        match self {
            ForecastRange::Week => 7,
            ForecastRange::Fortnight => 14,
        }
    }

    pub fn from_days(days: i64) -> Option<Self> {
        match days {
            7 => Some(ForecastRange::Week),
            14 => Some(ForecastRange::Fortnight),
            _ => None,
        }
    }
}

pub const MIN_WINDOW_DAYS: u32 = 1;
pub const MAX_WINDOW_DAYS: u32 = 365;
pub const DEFAULT_WINDOW_DAYS: u32 = 30;

/// Inclusive date window of the historical dashboard.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct DateWindow {
    pub start: NaiveDate,
    pub num_days: u32,
}

impl DateWindow {
    /// The 30 days ending with `today`.
    pub fn default_for(today: NaiveDate) -> Self {
        DateWindow {
            start: today - chrono::Duration::days(i64::from(DEFAULT_WINDOW_DAYS) - 1),
            num_days: DEFAULT_WINDOW_DAYS,
        }
    }

    /// Last day covered by the window (inclusive).
    pub fn end(&self) -> NaiveDate {
        self.start + chrono::Duration::days(i64::from(self.num_days.max(1)) - 1)
    }
}

/// Label and icon name of an Open-Meteo (WMO) weather code.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct Condition {
    pub label: &'static str,
    pub icon: &'static str,
}

const UNKNOWN_CONDITION: Condition = Condition {
    label: "Unknown",
    icon: "cloud",
};

pub fn condition(code: u8) -> Condition {
    let (label, icon) = match code {
        0 => ("Clear sky", "clear_day"),
        1 => ("Mainly clear", "partly_cloudy_day"),
        2 => ("Partly cloudy", "partly_cloudy_day"),
        3 => ("Overcast", "cloud"),
        45 => ("Fog", "foggy"),
        48 => ("Rime fog", "foggy"),
        51 => ("Light drizzle", "rainy_light"),
        53 => ("Drizzle", "rainy_light"),
        55 => ("Dense drizzle", "rainy"),
        56 => ("Freezing drizzle", "weather_mix"),
        57 => ("Dense freezing drizzle", "weather_mix"),
        61 => ("Light rain", "rainy_light"),
        63 => ("Rain", "rainy"),
        65 => ("Heavy rain", "rainy_heavy"),
        66 => ("Freezing rain", "weather_mix"),
        67 => ("Heavy freezing rain", "weather_mix"),
        71 => ("Light snow", "weather_snowy"),
        73 => ("Snow", "weather_snowy"),
        75 => ("Heavy snow", "snowing_heavy"),
        77 => ("Snow grains", "grain"),
        80 => ("Rain showers", "rainy"),
        81 => ("Heavy showers", "rainy_heavy"),
        82 => ("Violent showers", "rainy_heavy"),
        85 => ("Snow showers", "weather_snowy"),
        86 => ("Heavy snow showers", "snowing_heavy"),
        95 => ("Thunderstorm", "thunderstorm"),
        96 => ("Thunderstorm w/ hail", "thunderstorm"),
        99 => ("Severe thunderstorm", "thunderstorm"),
        _ => return UNKNOWN_CONDITION,
    };
    Condition { label, icon }
}

/// Narrow an API/stored weather code to the WMO range.
pub fn weather_code(raw: i64) -> Option<u8> {
    u8::try_from(raw).ok().filter(|c| *c <= 99)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn id_is_case_insensitive_on_name() {
        assert_eq!(CityId::derive("Paris", 48.85, 2.35), CityId::derive("PARIS", 48.85, 2.35));
        assert_eq!(CityId::derive("Paris", 48.85, 2.35).0, "paris-48.85-2.35");
        assert_ne!(CityId::derive("Paris", 48.85, 2.35), CityId::derive("Paris", 33.66, -95.55));
    }

    #[test]
    fn aligned_series_pads_and_truncates_columns() {
        let series = DailySeries::aligned(
            vec![day(2024, 1, 1), day(2024, 1, 2), day(2024, 1, 3)],
            PrecipitationKind::Amount,
            DailyColumns {
                max: vec![Some(1.0)],
                min: vec![Some(0.0), Some(0.5), Some(1.0), Some(9.0)],
                ..Default::default()
            },
        );
        assert_eq!(series.len(), 3);
        assert_eq!(series.metric(Metric::MaxTemp), &[Some(1.0), None, None]);
        assert_eq!(series.metric(Metric::MinTemp), &[Some(0.0), Some(0.5), Some(1.0)]);
        assert_eq!(series.metric(Metric::Uv).len(), 3);
        assert_eq!(series.codes().len(), 3);
    }

    #[test]
    fn window_end_is_inclusive() {
        let w = DateWindow {
            start: day(2024, 1, 1),
            num_days: 10,
        };
        assert_eq!(w.end(), day(2024, 1, 10));
        let single = DateWindow {
            start: day(2024, 2, 29),
            num_days: 1,
        };
        assert_eq!(single.end(), day(2024, 2, 29));
    }

    #[test]
    fn default_window_ends_today() {
        let w = DateWindow::default_for(day(2024, 3, 31));
        assert_eq!(w.start, day(2024, 3, 2));
        assert_eq!(w.num_days, 30);
        assert_eq!(w.end(), day(2024, 3, 31));
    }

    #[test]
    fn unknown_codes_fall_back_to_cloud() {
        assert_eq!(condition(63).label, "Rain");
        assert_eq!(condition(42).icon, "cloud");
        assert_eq!(weather_code(300), None);
        assert_eq!(weather_code(-1), None);
        assert_eq!(weather_code(95), Some(95));
    }
}
