use chrono::{Local, NaiveDate};

/// Local calendar date, the reference point for window validation.
pub fn today() -> NaiveDate {
    Local::now().date_naive()
}

/// Parse a free-text `DD/MM/YYYY` date (separators `/`, `-` or `.`).
/// Rejects years before 1900 and dates that do not exist.
pub fn parse_display_date(text: &str) -> Option<NaiveDate> {
    let parts: Vec<&str> = text.trim().split(['/', '-', '.']).collect();
    let [d, m, y] = parts[..] else {
        return None;
    };
    let digits = |s: &str, min: usize, max: usize| {
        (min..=max).contains(&s.len()) && s.bytes().all(|b| b.is_ascii_digit())
    };
    if !digits(d, 1, 2) || !digits(m, 1, 2) || !digits(y, 4, 4) {
        return None;
    }
    let (day, month, year): (u32, u32, i32) = (d.parse().ok()?, m.parse().ok()?, y.parse().ok()?);
    if year < 1900 {
        return None;
    }
    NaiveDate::from_ymd_opt(year, month, day)
}

/// `2024-03-09` -> `09/03/2024`.
pub fn display_date(date: NaiveDate) -> String {
    date.format("%d/%m/%Y").to_string()
}

/// `"09 Mar 2024 – 07 Apr 2024"`.
pub fn window_preview(start: NaiveDate, end: NaiveDate) -> String {
    format!("{} \u{2013} {}", start.format("%d %b %Y"), end.format("%d %b %Y"))
}

/// Short weekday, the forecast dashboard's column label.
pub fn weekday_label(date: NaiveDate) -> String {
    date.format("%a").to_string()
}

/// `"Mar 9"`, the historical dashboard's axis label.
pub fn month_day_label(date: NaiveDate) -> String {
    date.format("%b %-d").to_string()
}

/// First comma-separated segment of a region, trimmed.
pub fn region_label(region: &str) -> &str {
    region.split(',').next().unwrap_or_default().trim()
}

pub fn format_temp_short(value: Option<f64>) -> String {
    match value {
        Some(v) if v.is_finite() => format!("{}°", v.round()),
        _ => "--".to_string(),
    }
}

/// One decimal place, `--` when there is no value.
pub fn format_value(value: Option<f64>, unit: &str) -> String {
    match value {
        Some(v) if v.is_finite() => format!("{}{}", (v * 10.0).round() / 10.0, unit),
        _ => format!("--{}", unit),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn parses_display_dates() {
        assert_eq!(parse_display_date("09/03/2024"), Some(day(2024, 3, 9)));
        assert_eq!(parse_display_date("9-3-2024"), Some(day(2024, 3, 9)));
        assert_eq!(parse_display_date(" 29.02.2024 "), Some(day(2024, 2, 29)));
    }

    #[test]
    fn rejects_impossible_or_malformed_dates() {
        for text in ["31/02/2024", "29/02/2023", "01/13/2024", "00/01/2024", "01/01/1899", "2024-03-09", "1/1/24", "a/b/cccc", ""] {
            assert_eq!(parse_display_date(text), None, "{text}");
        }
    }

    #[test]
    fn formats_labels() {
        assert_eq!(display_date(day(2024, 3, 9)), "09/03/2024");
        assert_eq!(weekday_label(day(2024, 3, 9)), "Sat");
        assert_eq!(month_day_label(day(2024, 3, 9)), "Mar 9");
        assert_eq!(window_preview(day(2024, 3, 9), day(2024, 4, 7)), "09 Mar 2024 \u{2013} 07 Apr 2024");
    }

    #[test]
    fn region_label_is_first_segment() {
        assert_eq!(region_label("Île-de-France, France"), "Île-de-France");
        assert_eq!(region_label(""), "");
    }

    #[test]
    fn formats_values() {
        assert_eq!(format_temp_short(Some(21.6)), "22°");
        assert_eq!(format_temp_short(None), "--");
        assert_eq!(format_value(Some(3.14159), " mm"), "3.1 mm");
        assert_eq!(format_value(None, "%"), "--%");
    }
}
