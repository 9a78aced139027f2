use crate::client::{ApiError, WeatherApi};
use crate::models::open_meteo::{CurrentBlock, DailyBlock, FORECAST_DAYS};
use crate::models::weather::{
    City, CurrentConditions, DailyColumns, DailySeries, DateWindow, MAX_WINDOW_DAYS, MIN_WINDOW_DAYS,
    PrecipitationKind, WeatherSnapshot, weather_code,
};
use chrono::NaiveDate;
use core::fmt;
use std::error::Error;
use std::fmt::{Display, Formatter};

/// A per-city fetch that did not produce a snapshot.
#[derive(Debug)]
pub enum FetchError {
    Api(ApiError),
}

impl Display for FetchError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            FetchError::Api(e) => write!(f, "weather fetch failed: {}", e),
        }
    }
}

impl Error for FetchError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            FetchError::Api(e) => Some(e),
        }
    }
}

impl From<ApiError> for FetchError {
    fn from(value: ApiError) -> Self {
        FetchError::Api(value)
    }
}

/// Rejections raised before any network call is made.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// Free-text date that is not a real `DD/MM/YYYY` calendar date
    InvalidDate(String),
    /// The window starts after today
    FutureStartDate { start: NaiveDate, today: NaiveDate },
    /// Day count outside 1..=365
    DayCountOutOfRange(i64),
    /// Historical fetch requested with no tracked cities
    NoCities,
}

impl Display for ValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            ValidationError::InvalidDate(s) => write!(f, "please enter a valid date (DD/MM/YYYY), got {:?}", s),
            ValidationError::FutureStartDate { start, today } => {
                write!(f, "start date {} cannot be in the future (today is {})", start, today)
            }
            ValidationError::DayCountOutOfRange(n) => write!(
                f,
                "number of days must be between {} and {}, got {}",
                MIN_WINDOW_DAYS, MAX_WINDOW_DAYS, n
            ),
            ValidationError::NoCities => write!(f, "please add at least one city"),
        }
    }
}

impl Error for ValidationError {}

/// Check a historical window against `today`.
pub fn validate_window(window: &DateWindow, today: NaiveDate) -> Result<(), ValidationError> {
    if window.start > today {
        return Err(ValidationError::FutureStartDate {
            start: window.start,
            today,
        });
    }
    if !(MIN_WINDOW_DAYS..=MAX_WINDOW_DAYS).contains(&window.num_days) {
        return Err(ValidationError::DayCountOutOfRange(i64::from(window.num_days)));
    }
    Ok(())
}

/// Current conditions plus up to 14 forecast days.
pub fn fetch_forecast<A: WeatherApi + ?Sized>(api: &A, city: &City) -> Result<WeatherSnapshot, FetchError> {
    let resp = api.forecast(city.latitude, city.longitude)?;
    Ok(WeatherSnapshot::Forecast {
        current: normalize_current(resp.current.unwrap_or_default()),
        daily: resp
            .daily
            .and_then(|d| normalize_daily(d, PrecipitationKind::Probability))
            .map(|d| truncate(d, FORECAST_DAYS as usize)),
    })
}

/// Daily series for `[window.start, window.end()]`.
///
/// The window must already have passed [`validate_window`]; it is not
/// repaired here.
pub fn fetch_historical<A: WeatherApi + ?Sized>(
    api: &A,
    city: &City,
    window: &DateWindow,
) -> Result<WeatherSnapshot, FetchError> {
    let resp = api.archive(city.latitude, city.longitude, window.start, window.end())?;
    Ok(WeatherSnapshot::Historical {
        daily: resp.daily.and_then(|d| normalize_daily(d, PrecipitationKind::Amount)),
    })
}

fn normalize_current(block: CurrentBlock) -> CurrentConditions {
    CurrentConditions {
        temperature: block.temperature_2m,
        weather_code: block.weather_code.and_then(weather_code),
        wind_speed: block.wind_speed_10m,
        observed_at: block.time,
    }
}

/// Map a response's daily block onto [`DailySeries`]. A block without
/// `time` normalizes to no series at all.
pub fn normalize_daily(block: DailyBlock, kind: PrecipitationKind) -> Option<DailySeries> {
    let dates = block.time?;
    let precipitation = match kind {
        PrecipitationKind::Probability => block.precipitation_probability_max,
        PrecipitationKind::Amount => block.precipitation_sum,
    };
    Some(DailySeries::aligned(
        dates,
        kind,
        DailyColumns {
            max: block.temperature_2m_max.unwrap_or_default(),
            min: block.temperature_2m_min.unwrap_or_default(),
            precipitation: precipitation.unwrap_or_default(),
            wind_max: block.wind_speed_10m_max.unwrap_or_default(),
            uv: block.uv_index_max.unwrap_or_default(),
            codes: block
                .weather_code
                .unwrap_or_default()
                .into_iter()
                .map(|c| c.and_then(weather_code))
                .collect(),
        },
    ))
}

fn truncate(series: DailySeries, days: usize) -> DailySeries {
    if series.len() <= days {
        return series;
    }
    use crate::models::weather::Metric::*;
    let cut = |m| series.metric(m)[..days].to_vec();
    DailySeries::aligned(
        series.dates()[..days].to_vec(),
        series.precipitation_kind(),
        DailyColumns {
            max: cut(MaxTemp),
            min: cut(MinTemp),
            precipitation: cut(Precipitation),
            wind_max: cut(WindMax),
            uv: cut(Uv),
            codes: series.codes()[..days].to_vec(),
        },
    )
}
