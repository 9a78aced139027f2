//! Projection of the registry's daily series into a line-chart dataset.
//!
//! Output is renderer-agnostic JSON: one label per day and one series per
//! city with data. Building is a pure function of its inputs.

use crate::models::weather::{City, DailySeries, DashboardMode, Metric, PrecipitationKind};
use crate::utils::{month_day_label, weekday_label};
use serde::Serialize;

pub const PALETTE: [&str; 8] = [
    "#3b82f6", "#ef4444", "#10b981", "#f59e0b", "#8b5cf6", "#ec4899", "#06b6d4", "#f97316",
];

/// Above this many labels, points are hidden and only the line is drawn.
const DENSE_LABELS: usize = 30;

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Default, Serialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum ChartMode {
    #[default]
    Max,
    Min,
    Rain,
    Wind,
}

impl ChartMode {
    fn metric(self) -> Metric {
        match self {
            ChartMode::Max => Metric::MaxTemp,
            ChartMode::Min => Metric::MinTemp,
            ChartMode::Rain => Metric::Precipitation,
            ChartMode::Wind => Metric::WindMax,
        }
    }

    pub fn y_title(self, dashboard: DashboardMode) -> &'static str {
        match self {
            ChartMode::Max | ChartMode::Min => "Temperature (°C)",
            ChartMode::Rain => match dashboard.precipitation_kind() {
                PrecipitationKind::Probability => "Rain Probability (%)",
                PrecipitationKind::Amount => "Precipitation (mm)",
            },
            ChartMode::Wind => "Wind (km/h)",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChartSeries {
    pub label: String,
    pub color: &'static str,
    /// One entry per label; `None` where the city has no value.
    pub values: Vec<Option<f64>>,
    pub point_radius: u8,
    pub border_width: u8,
    pub tension: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChartDataset {
    pub mode: ChartMode,
    pub labels: Vec<String>,
    pub y_title: &'static str,
    pub series: Vec<ChartSeries>,
}

/// Axis label of one day: weekday for forecasts, `Mar 4` for history.
pub fn date_label(dashboard: DashboardMode, date: chrono::NaiveDate) -> String {
    match dashboard {
        DashboardMode::Forecast => weekday_label(date),
        DashboardMode::Historical => month_day_label(date),
    }
}

/// Build the dataset for `mode`.
///
/// Labels come from the first city with a non-empty series, cut to
/// `horizon` days when given. Cities without a series are omitted. Returns
/// `None` when no city has data yet.
pub fn build(cities: &[City], mode: ChartMode, dashboard: DashboardMode, horizon: Option<usize>) -> Option<ChartDataset> {
    let reference: &DailySeries = cities.iter().find_map(City::populated_daily)?;
    let len = horizon.map_or(reference.len(), |h| h.min(reference.len()));
    let labels: Vec<String> = reference.dates()[..len]
        .iter()
        .map(|d| date_label(dashboard, *d))
        .collect();
    let point_radius = if labels.len() > DENSE_LABELS { 0 } else { 2 };

    let series = cities
        .iter()
        .enumerate()
        .filter_map(|(index, city)| {
            let daily = city.populated_daily()?;
            let mut values = daily.metric(mode.metric()).to_vec();
            values.resize(len, None);
            Some(ChartSeries {
                label: city.name.clone(),
                color: PALETTE[index % PALETTE.len()],
                values,
                point_radius,
                border_width: 3,
                tension: 0.3,
            })
        })
        .collect();

    Some(ChartDataset {
        mode,
        labels,
        y_title: mode.y_title(dashboard),
        series,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::weather::{CityId, DailyColumns, WeatherSnapshot};
    use chrono::NaiveDate;

    fn series(days: usize, max: Vec<Option<f64>>) -> DailySeries {
        let start = NaiveDate::from_ymd_opt(2024, 3, 4).unwrap();
        DailySeries::aligned(
            (0..days).map(|i| start + chrono::Duration::days(i as i64)).collect(),
            PrecipitationKind::Amount,
            DailyColumns {
                max,
                ..Default::default()
            },
        )
    }

    fn city(name: &str, daily: Option<DailySeries>) -> City {
        City {
            id: CityId::derive(name, 1.0, 2.0),
            name: name.into(),
            region: String::new(),
            latitude: 1.0,
            longitude: 2.0,
            weather: Some(WeatherSnapshot::Historical { daily }),
        }
    }

    #[test]
    fn no_populated_city_means_no_dataset() {
        let cities = vec![
            city("NoSeries", None),
            city("EmptySeries", Some(series(0, vec![]))),
            City {
                weather: None,
                ..city("Pending", None)
            },
        ];
        assert!(build(&cities, ChartMode::Max, DashboardMode::Historical, None).is_none());
        assert!(build(&[], ChartMode::Max, DashboardMode::Historical, None).is_none());
    }

    #[test]
    fn labels_follow_first_populated_city_and_series_align() {
        let cities = vec![
            city("Pending", None),
            city("Long", Some(series(3, vec![Some(1.0), Some(2.0), Some(3.0)]))),
            city("Longer", Some(series(5, vec![Some(9.0); 5]))),
        ];
        let ds = build(&cities, ChartMode::Max, DashboardMode::Historical, None).unwrap();
        assert_eq!(ds.labels, ["Mar 4", "Mar 5", "Mar 6"]);
        assert_eq!(ds.y_title, "Temperature (°C)");
        assert_eq!(ds.series.len(), 2);
        assert_eq!(ds.series[0].label, "Long");
        // Palette slot follows registry position, skipped cities included.
        assert_eq!(ds.series[0].color, PALETTE[1]);
        assert_eq!(ds.series[1].values, vec![Some(9.0); 3]);
        assert!(ds.series.iter().all(|s| s.point_radius == 2));
    }

    #[test]
    fn horizon_cuts_labels_and_values() {
        let cities = vec![city("A", Some(series(14, vec![Some(1.0); 14])))];
        let ds = build(&cities, ChartMode::Rain, DashboardMode::Forecast, Some(7)).unwrap();
        assert_eq!(ds.labels.len(), 7);
        assert_eq!(ds.labels[0], "Mon");
        assert_eq!(ds.series[0].values.len(), 7);
        assert_eq!(ds.y_title, "Rain Probability (%)");
    }

    #[test]
    fn shorter_series_are_padded() {
        let cities = vec![
            city("Long", Some(series(4, vec![Some(1.0); 4]))),
            city("Short", Some(series(2, vec![Some(5.0), Some(6.0)]))),
        ];
        let ds = build(&cities, ChartMode::Max, DashboardMode::Historical, None).unwrap();
        assert_eq!(ds.series[1].values, [Some(5.0), Some(6.0), None, None]);
    }

    #[test]
    fn dense_charts_hide_points() {
        let cities = vec![city("A", Some(series(31, vec![])))];
        let ds = build(&cities, ChartMode::Wind, DashboardMode::Historical, None).unwrap();
        assert_eq!(ds.series[0].point_radius, 0);
        assert_eq!(ds.y_title, "Wind (km/h)");
    }

    #[test]
    fn rebuilding_is_idempotent() {
        let cities = vec![
            city("A", Some(series(3, vec![Some(1.0), None, Some(3.0)]))),
            city("B", Some(series(3, vec![]))),
        ];
        let first = build(&cities, ChartMode::Min, DashboardMode::Historical, None);
        let second = build(&cities, ChartMode::Min, DashboardMode::Historical, None);
        assert_eq!(first, second);
        assert_eq!(
            serde_json::to_string(&first).unwrap(),
            serde_json::to_string(&second).unwrap()
        );
    }

    #[test]
    fn mode_names_serialize_lowercase() {
        assert_eq!(serde_json::to_string(&ChartMode::Rain).unwrap(), "\"rain\"");
    }
}
