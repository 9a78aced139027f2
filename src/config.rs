//! Minimal runtime configuration helpers.
//! Defaults point at the public Open-Meteo endpoints.

use std::path::{Path, PathBuf};

pub const DEFAULT_DATA_DIR: &str = ".weather-compare";
pub const DEFAULT_GEOCODING_URL: &str = "https://geocoding-api.open-meteo.com/v1/search";
pub const DEFAULT_FORECAST_URL: &str = "https://api.open-meteo.com/v1/forecast";
pub const DEFAULT_ARCHIVE_URL: &str = "https://archive-api.open-meteo.com/v1/archive";
pub const DEFAULT_SEARCH_MAX_RESULTS: u32 = 5;

#[derive(Debug, Clone)]
pub struct Config {
    /// Directory holding the persisted city lists and range selections.
    pub data_dir: PathBuf,
    pub geocoding_url: String,
    pub forecast_url: String,
    pub archive_url: String,
    /// Geocoding candidate cap.
    pub search_max_results: u32,
    /// Serve synthetic weather instead of calling Open-Meteo.
    pub offline: bool,
}

fn env_or(key: &str, default: &str) -> String {
    match std::env::var(key) {
        Ok(v) if !v.trim().is_empty() => v.trim().to_string(),
        _ => default.to_string(),
    }
}

impl Config {
    pub fn from_env() -> Result<Self, String> {
        let search_max_results = match std::env::var("SEARCH_MAX_RESULTS") {
            Ok(s) if !s.trim().is_empty() => s
                .trim()
                .parse::<u32>()
                .ok()
                .filter(|n| (1..=100).contains(n))
                .ok_or_else(|| "SEARCH_MAX_RESULTS must be an integer between 1 and 100".to_string())?,
            _ => DEFAULT_SEARCH_MAX_RESULTS,
        };

        let offline = std::env::var("WEATHER_OFFLINE")
            .ok()
            .map(|s| matches!(s.trim(), "1" | "true" | "TRUE"))
            .unwrap_or(false);

        Ok(Config {
            data_dir: PathBuf::from(env_or("WEATHER_DATA_DIR", DEFAULT_DATA_DIR)),
            geocoding_url: env_or("OPEN_METEO_GEOCODING_URL", DEFAULT_GEOCODING_URL),
            forecast_url: env_or("OPEN_METEO_FORECAST_URL", DEFAULT_FORECAST_URL),
            archive_url: env_or("OPEN_METEO_ARCHIVE_URL", DEFAULT_ARCHIVE_URL),
            search_max_results,
            offline,
        })
    }
}

/// Where the process environment was pre-seeded from.
#[derive(Debug)]
pub struct LoadedEnvFile {
    pub path: PathBuf,
    pub explicit: bool,
}

/// Seed the environment from `explicit` (must exist) or from `./.env` when
/// present. Variables already set in the process environment are kept.
pub fn load_env(explicit: Option<&Path>) -> Result<Option<LoadedEnvFile>, String> {
    let (path, explicit) = match explicit {
        Some(p) => {
            if !p.is_file() {
                return Err(format!("env file not found: {}", p.display()));
            }
            (p.to_path_buf(), true)
        }
        None => {
            let cwd = std::env::current_dir().map_err(|e| format!("unable to read current directory: {}", e))?;
            let default_path = cwd.join(".env");
            if !default_path.is_file() {
                return Ok(None);
            }
            (default_path, false)
        }
    };

    let contents =
        std::fs::read_to_string(&path).map_err(|e| format!("failed to read {}: {}", path.display(), e))?;
    for (index, line) in contents.lines().enumerate() {
        let parsed = parse_env_line(line).map_err(|e| format!("{}:{}: {}", path.display(), index + 1, e))?;
        if let Some((key, value)) = parsed
            && std::env::var_os(&key).is_none()
        {
            // Single-threaded at this point; nothing else reads the environment yet.
            unsafe {
                std::env::set_var(key, value);
            }
        }
    }

    Ok(Some(LoadedEnvFile { path, explicit }))
}

/// `KEY=value`, `export KEY=value`, quoted values and trailing comments.
fn parse_env_line(line: &str) -> Result<Option<(String, String)>, String> {
    let trimmed = line.trim();
    if trimmed.is_empty() || trimmed.starts_with('#') {
        return Ok(None);
    }
    let assignment = trimmed.strip_prefix("export ").map(str::trim_start).unwrap_or(trimmed);
    let (key, raw_value) = assignment
        .split_once('=')
        .ok_or_else(|| "missing '=' in assignment".to_string())?;
    let key = key.trim();
    if key.is_empty() || key.contains(char::is_whitespace) {
        return Err(format!("invalid environment variable name: {:?}", key));
    }

    let raw_value = raw_value.trim();
    let value = match raw_value.chars().next() {
        Some(q @ ('"' | '\'')) => {
            let inner = &raw_value[1..];
            let close = inner.find(q).ok_or_else(|| format!("unterminated {} quoted value", q))?;
            let rest = inner[close + 1..].trim();
            if !rest.is_empty() && !rest.starts_with('#') {
                return Err("unexpected characters after closing quote".to_string());
            }
            inner[..close].to_string()
        }
        _ => raw_value.split('#').next().unwrap_or_default().trim_end().to_string(),
    };
    Ok(Some((key.to_string(), value)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_plain_quoted_and_exported_lines() {
        assert_eq!(parse_env_line("  # comment").unwrap(), None);
        assert_eq!(parse_env_line("").unwrap(), None);
        assert_eq!(
            parse_env_line("WEATHER_DATA_DIR=/tmp/w # where").unwrap(),
            Some(("WEATHER_DATA_DIR".into(), "/tmp/w".into()))
        );
        assert_eq!(
            parse_env_line("export RUST_LOG='debug'").unwrap(),
            Some(("RUST_LOG".into(), "debug".into()))
        );
        assert_eq!(
            parse_env_line(r#"URL="http://x/#frag" # note"#).unwrap(),
            Some(("URL".into(), "http://x/#frag".into()))
        );
    }

    #[test]
    fn rejects_malformed_lines() {
        assert!(parse_env_line("NOEQUALS").is_err());
        assert!(parse_env_line("BAD KEY=1").is_err());
        assert!(parse_env_line("K=\"open").is_err());
        assert!(parse_env_line("K=\"v\" trailing").is_err());
    }
}
