//! Plain-text rendering of registry state for the terminal.

use crate::models::open_meteo::GeocodingResult;
use crate::models::weather::{City, DailySeries, DashboardMode, Metric, condition};
use crate::services::aggregate::{Summary, SummaryBar};
use crate::services::chart::date_label;
use crate::utils::{format_temp_short, format_value, region_label};
use std::fmt::Write;

const BAR_WIDTH: usize = 20;

pub fn search_results(candidates: &[GeocodingResult]) -> String {
    if candidates.is_empty() {
        return "No cities found.\n".to_string();
    }
    let mut out = String::new();
    for (i, c) in candidates.iter().enumerate() {
        let region = c.region();
        let _ = writeln!(
            out,
            "{:>2}. {}{}  ({:.4}, {:.4})",
            i + 1,
            c.name,
            if region.is_empty() { String::new() } else { format!(", {}", region) },
            c.latitude,
            c.longitude
        );
    }
    out
}

fn city_header(out: &mut String, position: usize, city: &City) {
    let region = region_label(&city.region);
    let _ = write!(out, "{:>2}. {}", position, city.name);
    if !region.is_empty() {
        let _ = write!(out, " ({})", region);
    }
    out.push('\n');
}

fn daily_rows(out: &mut String, daily: &DailySeries, dashboard: DashboardMode, days: usize) {
    let precip_unit = match dashboard {
        DashboardMode::Forecast => "%",
        DashboardMode::Historical => " mm",
    };
    for i in 0..days.min(daily.len()) {
        let at = |m: Metric| daily.metric(m)[i];
        let cond = daily.codes()[i].map(condition).map_or("-", |c| c.label);
        let _ = writeln!(
            out,
            "      {:<7} {:>5} / {:<5} {:>8} {:>10}  UV {:<5} {}",
            date_label(dashboard, daily.dates()[i]),
            format_temp_short(at(Metric::MaxTemp)),
            format_temp_short(at(Metric::MinTemp)),
            format_value(at(Metric::Precipitation), precip_unit),
            format_value(at(Metric::WindMax), " km/h"),
            format_value(at(Metric::Uv), ""),
            cond
        );
    }
}

/// One block per city, most recently added first. `days` limits the daily
/// rows shown (the forecast horizon, or the window length).
pub fn city_list(cities: &[City], dashboard: DashboardMode, days: usize) -> String {
    if cities.is_empty() {
        return format!("No {} cities tracked yet. Use `search` and `add` to start.\n", dashboard);
    }
    let mut out = String::new();
    for (i, city) in cities.iter().enumerate() {
        city_header(&mut out, i + 1, city);
        let Some(weather) = &city.weather else {
            out.push_str("      no weather loaded (run `refresh`)\n");
            continue;
        };
        if let Some(current) = weather.current() {
            let cond = current.weather_code.map(condition).map_or("Unknown", |c| c.label);
            let _ = writeln!(
                out,
                "      now {} {}, wind {}{}",
                format_temp_short(current.temperature),
                cond,
                format_value(current.wind_speed, " km/h"),
                current
                    .observed_at
                    .as_deref()
                    .map(|t| format!(" (at {})", t))
                    .unwrap_or_default()
            );
        }
        match weather.daily() {
            Some(daily) if !daily.is_empty() => daily_rows(&mut out, daily, dashboard, days),
            _ => out.push_str("      no daily data\n"),
        }
    }
    out
}

fn bar(pct: f64) -> String {
    let filled = ((pct / 100.0) * BAR_WIDTH as f64).round().clamp(0.0, BAR_WIDTH as f64) as usize;
    format!("{}{}", "#".repeat(filled), ".".repeat(BAR_WIDTH - filled))
}

fn summary_row(out: &mut String, row: &SummaryBar, unit: &str) {
    let _ = writeln!(out, "  {:<18} {:>12} {}", row.city, format_value(row.value, unit), bar(row.pct));
}

pub fn summary(summary: &Summary) -> String {
    let mut out = String::new();
    for card in &summary.cards {
        let _ = writeln!(out, "{}", card.title);
        if card.bars.is_empty() {
            out.push_str("  Add cities to see comparison\n");
        }
        for row in &card.bars {
            summary_row(&mut out, row, card.unit);
        }
        out.push('\n');
    }
    if let Some(uv) = &summary.uv_peak {
        let _ = writeln!(
            out,
            "Peak UV today: {} in {} ({}) {}",
            format_value(Some(uv.value), ""),
            uv.city,
            uv.risk.label(),
            bar(uv.gauge * 100.0)
        );
    }
    out
}
