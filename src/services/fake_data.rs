//! Offline weather source with the same shape as Open-Meteo.
//!
//! Every day's values are derived from a generator seeded by the coordinate
//! and the date, so overlapping requests agree with each other and repeated
//! runs are reproducible.

use crate::client::{ApiError, WeatherApi};
use crate::models::open_meteo::{
    ArchiveResponse, CurrentBlock, DailyBlock, FORECAST_DAYS, ForecastResponse, GeocodingResponse, GeocodingResult,
};
use chrono::{Datelike, Duration, NaiveDate};
use log::debug;
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use std::f64::consts::PI;

/// `(name, latitude, longitude, admin1, country)`
const KNOWN_CITIES: [(&str, f64, f64, &str, &str); 12] = [
    ("London", 51.50853, -0.12574, "England", "United Kingdom"),
    ("Paris", 48.85341, 2.3488, "Île-de-France", "France"),
    ("Paris", 33.66094, -95.55551, "Texas", "United States"),
    ("Berlin", 52.52437, 13.41053, "Land Berlin", "Germany"),
    ("Lisbon", 38.71667, -9.13333, "Lisbon", "Portugal"),
    ("Ljubljana", 46.05108, 14.50513, "Ljubljana", "Slovenia"),
    ("Oslo", 59.91273, 10.74609, "Oslo", "Norway"),
    ("Rome", 41.89193, 12.51133, "Lazio", "Italy"),
    ("New York", 40.71427, -74.00597, "New York", "United States"),
    ("Sydney", -33.86785, 151.20732, "New South Wales", "Australia"),
    ("Tokyo", 35.6895, 139.69171, "Tokyo", "Japan"),
    ("Cape Town", -33.92584, 18.42322, "Western Cape", "South Africa"),
];

pub struct FakeWeather {
    today: NaiveDate,
}

/// One synthetic day.
struct FakeDay {
    max: f64,
    min: f64,
    precipitation_probability: f64,
    precipitation_sum: f64,
    wind_max: f64,
    uv: f64,
    code: i64,
}

impl FakeWeather {
    pub fn new(today: NaiveDate) -> Self {
        FakeWeather { today }
    }

    fn daily(&self, latitude: f64, longitude: f64, start: NaiveDate, days: i64) -> DailyBlock {
        let dates: Vec<NaiveDate> = (0..days).map(|i| start + Duration::days(i)).collect();
        let generated: Vec<FakeDay> = dates.iter().map(|d| generate_day(latitude, longitude, *d)).collect();
        let column = |f: fn(&FakeDay) -> f64| Some(generated.iter().map(|d| Some(round1(f(d)))).collect());
        DailyBlock {
            time: Some(dates),
            temperature_2m_max: column(|d| d.max),
            temperature_2m_min: column(|d| d.min),
            precipitation_probability_max: column(|d| d.precipitation_probability.round()),
            precipitation_sum: column(|d| d.precipitation_sum),
            wind_speed_10m_max: column(|d| d.wind_max),
            uv_index_max: column(|d| d.uv),
            weather_code: Some(generated.iter().map(|d| Some(d.code)).collect()),
        }
    }
}

impl WeatherApi for FakeWeather {
    fn search(&self, query: &str, count: u32) -> Result<GeocodingResponse, ApiError> {
        let needle = query.trim().to_lowercase();
        let results: Vec<GeocodingResult> = KNOWN_CITIES
            .iter()
            .filter(|(name, ..)| name.to_lowercase().starts_with(&needle))
            .take(count as usize)
            .map(|(name, lat, lon, admin1, country)| GeocodingResult {
                name: (*name).to_string(),
                latitude: *lat,
                longitude: *lon,
                country: Some((*country).to_string()),
                admin1: Some((*admin1).to_string()),
            })
            .collect();
        debug!("Fake data: {:?} matched {} known city(ies)", query, results.len());
        Ok(GeocodingResponse {
            results: (!results.is_empty()).then_some(results),
        })
    }

    fn forecast(&self, latitude: f64, longitude: f64) -> Result<ForecastResponse, ApiError> {
        let daily = self.daily(latitude, longitude, self.today, i64::from(FORECAST_DAYS));
        let today = generate_day(latitude, longitude, self.today);
        Ok(ForecastResponse {
            current: Some(CurrentBlock {
                time: Some(format!("{}T12:00", self.today.format("%Y-%m-%d"))),
                temperature_2m: Some(round1((today.max + today.min) / 2.0)),
                weather_code: Some(today.code),
                wind_speed_10m: Some(round1(today.wind_max * 0.6)),
            }),
            daily: Some(daily),
        })
    }

    fn archive(
        &self,
        latitude: f64,
        longitude: f64,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<ArchiveResponse, ApiError> {
        if end < start {
            return Err(ApiError::Http {
                status: 400,
                message: format!("end_date {} is before start_date {}", end, start),
            });
        }
        let days = (end - start).num_days() + 1;
        Ok(ArchiveResponse {
            daily: Some(self.daily(latitude, longitude, start, days)),
        })
    }
}

fn round1(v: f64) -> f64 {
    (v * 10.0).round() / 10.0
}

fn day_seed(latitude: f64, longitude: f64, date: NaiveDate) -> u64 {
    let mut seed = 0x5EED_CAFE_F00D_D00Du64;
    for part in [latitude.to_bits(), longitude.to_bits(), date.num_days_from_ce() as u64] {
        seed = (seed ^ part).wrapping_mul(0x0100_0000_01B3).rotate_left(17);
    }
    seed
}

fn generate_day(latitude: f64, longitude: f64, date: NaiveDate) -> FakeDay {
    let mut rng = SmallRng::seed_from_u64(day_seed(latitude, longitude, date));
    let annual_fraction = date.ordinal0() as f64 / 365.0;

    let max = compute_max_temp(latitude, annual_fraction, &mut rng);
    let min = compute_min_temp(max, &mut rng);
    let precipitation_probability = compute_precipitation_probability(annual_fraction, latitude, &mut rng);
    let precipitation_sum = compute_precipitation_sum(precipitation_probability, &mut rng);
    let wind_max = compute_wind(latitude, &mut rng);
    let cloud_cover = (precipitation_probability / 100.0).clamp(0.0, 1.0);
    let uv = compute_uv(latitude, annual_fraction, cloud_cover, &mut rng);
    let code = classify_weather(min, precipitation_sum, cloud_cover, &mut rng);

    FakeDay {
        max,
        min,
        precipitation_probability,
        precipitation_sum,
        wind_max,
        uv,
        code,
    }
}

/// Sign of the seasonal swing; southern summers peak in January.
fn hemisphere(latitude: f64) -> f64 {
    if latitude < 0.0 { -1.0 } else { 1.0 }
}

fn seasonal_wave(latitude: f64, annual_fraction: f64) -> f64 {
    ((annual_fraction - 0.29) * 2.0 * PI).sin() * hemisphere(latitude)
}

fn compute_max_temp(latitude: f64, annual_fraction: f64, rng: &mut SmallRng) -> f64 {
    let base = 30.0 - latitude.abs() * 0.4;
    let amplitude = latitude.abs() / 90.0 * 22.0;
    let random_variation = rng.random_range(-2.5..=2.5);
    let cold_front = if rng.random_bool(0.05) {
        -rng.random_range(3.0..=7.0)
    } else {
        0.0
    };
    (base + seasonal_wave(latitude, annual_fraction) * amplitude + random_variation + cold_front).clamp(-30.0, 45.0)
}

fn compute_min_temp(max: f64, rng: &mut SmallRng) -> f64 {
    max - rng.random_range(4.0..=11.0)
}

fn compute_precipitation_probability(annual_fraction: f64, latitude: f64, rng: &mut SmallRng) -> f64 {
    // Wetter in the cold half of the year.
    let seasonal = -seasonal_wave(latitude, annual_fraction) * 15.0;
    (35.0 + seasonal + rng.random_range(-35.0..=45.0)).clamp(0.0, 100.0)
}

fn compute_precipitation_sum(probability: f64, rng: &mut SmallRng) -> f64 {
    if rng.random_range(0.0..100.0) >= probability {
        return 0.0;
    }
    let heavy = if rng.random_bool(0.1) { rng.random_range(8.0..=25.0) } else { 0.0 };
    rng.random_range(0.1..=6.0) * probability / 50.0 + heavy
}

fn compute_wind(latitude: f64, rng: &mut SmallRng) -> f64 {
    let exposure = 8.0 + latitude.abs() * 0.2;
    let gusty = if rng.random_bool(0.08) { rng.random_range(10.0..=30.0) } else { 0.0 };
    (exposure + rng.random_range(0.0..=15.0) + gusty).clamp(0.0, 120.0)
}

fn compute_uv(latitude: f64, annual_fraction: f64, cloud_cover: f64, rng: &mut SmallRng) -> f64 {
    let clear_sky = 11.5 * (1.0 - latitude.abs() / 90.0).max(0.05);
    let season = (0.55 + 0.45 * seasonal_wave(latitude, annual_fraction)).max(0.1);
    let cloud_relief = 1.0 - cloud_cover * 0.6;
    (clear_sky * season * cloud_relief + rng.random_range(-0.4..=0.4)).clamp(0.0, 13.0)
}

/// WMO code for the day.
fn classify_weather(min: f64, precipitation_sum: f64, cloud_cover: f64, rng: &mut SmallRng) -> i64 {
    let roll: f64 = rng.random_range(0.0..1.0);
    if precipitation_sum >= 0.1 {
        let snow = min < -1.0;
        return match (snow, precipitation_sum) {
            (true, p) if p > 10.0 => 75,
            (true, p) if p > 2.0 => 73,
            (true, _) => 71,
            (false, p) if p > 20.0 && roll > 0.6 => 95,
            (false, p) if p > 10.0 => 65,
            (false, p) if p > 2.0 => 63,
            (false, _) if roll > 0.5 => 51,
            (false, _) => 61,
        };
    }
    if cloud_cover > 0.6 {
        if roll > 0.85 { 45 } else { 3 }
    } else if cloud_cover > 0.35 {
        2
    } else if cloud_cover > 0.15 {
        1
    } else {
        0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::weather::condition;

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn forecast_covers_fourteen_days_from_today() {
        let fake = FakeWeather::new(day(2024, 6, 1));
        let resp = fake.forecast(46.05, 14.5).unwrap();
        let daily = resp.daily.unwrap();
        let time = daily.time.unwrap();
        assert_eq!(time.len(), 14);
        assert_eq!(time[0], day(2024, 6, 1));
        assert_eq!(daily.uv_index_max.map(|v| v.len()), Some(14));
        let current = resp.current.unwrap();
        assert_eq!(current.weather_code, daily.weather_code.unwrap()[0]);
    }

    #[test]
    fn overlapping_requests_agree() {
        let fake = FakeWeather::new(day(2024, 6, 1));
        let a = fake.archive(59.9, 10.7, day(2024, 1, 1), day(2024, 1, 10)).unwrap().daily.unwrap();
        let b = fake.archive(59.9, 10.7, day(2024, 1, 5), day(2024, 1, 6)).unwrap().daily.unwrap();
        let a_max = a.temperature_2m_max.unwrap();
        assert_eq!(a_max.len(), 10);
        assert_eq!(&a_max[4..6], b.temperature_2m_max.unwrap().as_slice());
    }

    #[test]
    fn values_are_plausible() {
        let fake = FakeWeather::new(day(2024, 6, 1));
        let daily = fake.archive(-33.9, 151.2, day(2023, 1, 1), day(2023, 12, 31)).unwrap().daily.unwrap();
        let max = daily.temperature_2m_max.unwrap();
        let min = daily.temperature_2m_min.unwrap();
        assert_eq!(max.len(), 365);
        for (hi, lo) in max.iter().zip(&min) {
            assert!(hi.unwrap() >= lo.unwrap());
        }
        for code in daily.weather_code.unwrap() {
            assert_ne!(condition(code.unwrap() as u8).label, "Unknown");
        }
        assert!(daily.precipitation_sum.unwrap().iter().all(|p| p.unwrap() >= 0.0));
    }

    #[test]
    fn reversed_window_is_rejected() {
        let fake = FakeWeather::new(day(2024, 6, 1));
        assert!(matches!(
            fake.archive(0.0, 0.0, day(2024, 1, 2), day(2024, 1, 1)),
            Err(ApiError::Http { status: 400, .. })
        ));
    }

    #[test]
    fn search_matches_known_cities_by_prefix() {
        let fake = FakeWeather::new(day(2024, 6, 1));
        let found = fake.search("par", 5).unwrap().results.unwrap();
        assert_eq!(found.len(), 2);
        assert_eq!(found[1].region(), "Texas, United States");
        assert_eq!(fake.search("Paris", 1).unwrap().results.unwrap().len(), 1);
        assert!(fake.search("Zzyzx", 5).unwrap().results.is_none());
    }
}
