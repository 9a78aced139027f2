//! Cross-city statistics over the loaded daily series.
//!
//! "No data" is always `None`, never zero: a city without valid entries must
//! stay distinguishable from one whose values really are 0.

use crate::models::weather::{City, DashboardMode, Metric};
use serde::Serialize;

fn valid(values: &[Option<f64>]) -> impl Iterator<Item = f64> + '_ {
    values.iter().flatten().copied().filter(|v| !v.is_nan())
}

/// Mean of the first `window` entries (all entries when `None`), ignoring
/// missing and NaN values.
pub fn average(values: &[Option<f64>], window: Option<usize>) -> Option<f64> {
    let slice = match window {
        Some(n) => &values[..n.min(values.len())],
        None => values,
    };
    let (sum, count) = valid(slice).fold((0.0, 0usize), |(s, c), v| (s + v, c + 1));
    (count > 0).then(|| sum / count as f64)
}

pub fn total(values: &[Option<f64>]) -> Option<f64> {
    let (sum, count) = valid(values).fold((0.0, 0usize), |(s, c), v| (s + v, c + 1));
    (count > 0).then_some(sum)
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Peak<'a> {
    pub city: &'a City,
    pub value: f64,
}

/// Largest first-day value of `metric` across cities. Ties keep the
/// earlier city in registry order.
pub fn peak_with_city(cities: &[City], metric: Metric) -> Option<Peak<'_>> {
    let mut best: Option<Peak<'_>> = None;
    for city in cities {
        let Some(value) = city
            .daily()
            .and_then(|d| d.metric(metric).first().copied().flatten())
            .filter(|v| !v.is_nan())
        else {
            continue;
        };
        if best.is_none_or(|b| value > b.value) {
            best = Some(Peak { city, value });
        }
    }
    best
}

/// Bar width in percent of `max_scale`, clamped to `[0, 100]`.
pub fn scale_pct(value: f64, max_scale: f64) -> f64 {
    if !value.is_finite() || !max_scale.is_finite() || max_scale <= 0.0 {
        return if value.is_infinite() && max_scale > 0.0 { 100.0 } else { 0.0 };
    }
    (value.abs() / max_scale * 100.0).clamp(0.0, 100.0)
}

pub const UV_GAUGE_SCALE: f64 = 11.0;

#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize)]
pub enum UvRisk {
    Low,
    Moderate,
    High,
    #[serde(rename = "Very High")]
    VeryHigh,
    Extreme,
}

impl UvRisk {
    pub fn from_index(uv: f64) -> Self {
        match uv {
            v if v > 10.0 => UvRisk::Extreme,
            v if v > 7.0 => UvRisk::VeryHigh,
            v if v > 5.0 => UvRisk::High,
            v if v > 2.0 => UvRisk::Moderate,
            _ => UvRisk::Low,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            UvRisk::Low => "Low",
            UvRisk::Moderate => "Moderate",
            UvRisk::High => "High",
            UvRisk::VeryHigh => "Very High",
            UvRisk::Extreme => "Extreme",
        }
    }
}

/// Fraction of the UV gauge to fill, `0..=1`.
pub fn uv_gauge(uv: f64) -> f64 {
    if uv.is_nan() {
        return 0.0;
    }
    (uv / UV_GAUGE_SCALE).clamp(0.0, 1.0)
}

// =====================
// Summary cards
// =====================

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SummaryBar {
    pub city: String,
    pub value: Option<f64>,
    pub pct: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SummaryCard {
    pub title: &'static str,
    pub icon: &'static str,
    pub unit: &'static str,
    pub bars: Vec<SummaryBar>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UvHighlight {
    pub city: String,
    pub value: f64,
    pub risk: UvRisk,
    pub gauge: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Summary {
    pub cards: Vec<SummaryCard>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub uv_peak: Option<UvHighlight>,
}

#[derive(Clone, Copy)]
enum Reduce {
    Average,
    Total,
}

struct CardDef {
    title: &'static str,
    icon: &'static str,
    unit: &'static str,
    metric: Metric,
    reduce: Reduce,
    max_scale: f64,
}

static FORECAST_CARDS: [CardDef; 4] = [
    CardDef {
        title: "Average Max Temperature",
        icon: "thermostat",
        unit: "°C",
        metric: Metric::MaxTemp,
        reduce: Reduce::Average,
        max_scale: 50.0,
    },
    CardDef {
        title: "Average Min Temperature",
        icon: "ac_unit",
        unit: "°C",
        metric: Metric::MinTemp,
        reduce: Reduce::Average,
        max_scale: 40.0,
    },
    CardDef {
        title: "Average Rain Probability",
        icon: "water_drop",
        unit: "%",
        metric: Metric::Precipitation,
        reduce: Reduce::Average,
        max_scale: 100.0,
    },
    CardDef {
        title: "Average Wind Speed",
        icon: "air",
        unit: " km/h",
        metric: Metric::WindMax,
        reduce: Reduce::Average,
        max_scale: 50.0,
    },
];

static HISTORICAL_CARDS: [CardDef; 5] = [
    CardDef {
        title: "Average Max Temperature",
        icon: "thermostat",
        unit: "°C",
        metric: Metric::MaxTemp,
        reduce: Reduce::Average,
        max_scale: 50.0,
    },
    CardDef {
        title: "Average Min Temperature",
        icon: "ac_unit",
        unit: "°C",
        metric: Metric::MinTemp,
        reduce: Reduce::Average,
        max_scale: 40.0,
    },
    CardDef {
        title: "Total Precipitation",
        icon: "water_drop",
        unit: " mm",
        metric: Metric::Precipitation,
        reduce: Reduce::Total,
        max_scale: 500.0,
    },
    CardDef {
        title: "Average Wind Speed",
        icon: "air",
        unit: " km/h",
        metric: Metric::WindMax,
        reduce: Reduce::Average,
        max_scale: 50.0,
    },
    CardDef {
        title: "Average UV Index",
        icon: "light_mode",
        unit: "",
        metric: Metric::Uv,
        reduce: Reduce::Average,
        max_scale: UV_GAUGE_SCALE,
    },
];

/// Summary cards for the dashboard. `horizon` limits forecast averages to the
/// selected 7/14 days; historical averages always span the whole series.
pub fn build_summary(cities: &[City], dashboard: DashboardMode, horizon: Option<usize>) -> Summary {
    let (defs, window, min_pct): (&[CardDef], Option<usize>, f64) = match dashboard {
        DashboardMode::Forecast => (&FORECAST_CARDS[..], horizon, 0.0),
        // Present values always show a sliver of bar.
        DashboardMode::Historical => (&HISTORICAL_CARDS[..], None, 1.0),
    };

    let cards = defs
        .iter()
        .map(|def| SummaryCard {
            title: def.title,
            icon: def.icon,
            unit: def.unit,
            bars: cities
                .iter()
                .map(|city| {
                    let column = city.daily().map(|d| d.metric(def.metric)).unwrap_or_default();
                    let value = match def.reduce {
                        Reduce::Average => average(column, window),
                        Reduce::Total => total(column),
                    };
                    SummaryBar {
                        city: city.name.clone(),
                        value,
                        pct: value.map_or(0.0, |v| scale_pct(v, def.max_scale).max(min_pct)),
                    }
                })
                .collect(),
        })
        .collect();

    let uv_peak = match dashboard {
        DashboardMode::Forecast => peak_with_city(cities, Metric::Uv).map(|p| UvHighlight {
            city: p.city.name.clone(),
            value: p.value,
            risk: UvRisk::from_index(p.value),
            gauge: uv_gauge(p.value),
        }),
        DashboardMode::Historical => None,
    };

    Summary { cards, uv_peak }
}
