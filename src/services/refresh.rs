//! Batch refresh: one independent fetch per tracked city.
//!
//! Fetches run on scoped worker threads; results come back over a channel
//! and are applied (and persisted) one at a time on the calling thread, in
//! completion order. A failure only affects its own city.

use crate::client::WeatherApi;
use crate::models::weather::{City, CityId, DashboardMode, DateWindow, WeatherSnapshot};
use crate::registry::CityRegistry;
use crate::services::fetch::{self, FetchError, ValidationError};
use crate::store::kv::KeyValueStore;
use chrono::NaiveDate;
use log::{debug, info, warn};
use std::sync::mpsc;
use std::thread;

/// What to fetch for every city of a registry.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum FetchRequest {
    Forecast,
    Historical { window: DateWindow, today: NaiveDate },
}

impl FetchRequest {
    pub fn mode(&self) -> DashboardMode {
        match self {
            FetchRequest::Forecast => DashboardMode::Forecast,
            FetchRequest::Historical { .. } => DashboardMode::Historical,
        }
    }

    /// Reject a historical window before anything touches the network.
    pub fn validate(&self) -> Result<(), ValidationError> {
        match self {
            FetchRequest::Forecast => Ok(()),
            FetchRequest::Historical { window, today } => fetch::validate_window(window, *today),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RefreshSummary {
    pub attempted: usize,
    pub failed: usize,
}

impl RefreshSummary {
    pub fn succeeded(&self) -> usize {
        self.attempted - self.failed
    }
}

fn fetch_one<A: WeatherApi + ?Sized>(
    api: &A,
    city: &City,
    request: &FetchRequest,
) -> Result<WeatherSnapshot, FetchError> {
    match request {
        FetchRequest::Forecast => fetch::fetch_forecast(api, city),
        FetchRequest::Historical { window, .. } => fetch::fetch_historical(api, city, window),
    }
}

/// Refresh every tracked city. Never aborts early and never retries.
///
/// Historical requests require at least one city and a valid window; both
/// are checked before any fetch is issued.
pub fn refresh_all<S: KeyValueStore, A: WeatherApi + ?Sized>(
    registry: &mut CityRegistry<S>,
    api: &A,
    request: &FetchRequest,
) -> Result<RefreshSummary, ValidationError> {
    debug_assert_eq!(request.mode(), registry.mode());
    if matches!(request, FetchRequest::Historical { .. }) && registry.is_empty() {
        return Err(ValidationError::NoCities);
    }
    request.validate()?;

    let targets: Vec<City> = registry.list().to_vec();
    let mut summary = RefreshSummary {
        attempted: targets.len(),
        failed: 0,
    };
    if targets.is_empty() {
        return Ok(summary);
    }
    debug!("Refresh: fetching {} {} city(ies)", targets.len(), request.mode());

    let (tx, rx) = mpsc::channel::<(CityId, Result<WeatherSnapshot, FetchError>)>();
    thread::scope(|scope| {
        for city in &targets {
            let tx = tx.clone();
            scope.spawn(move || {
                let result = fetch_one(api, city, request);
                // The receiver outlives every worker inside this scope.
                let _ = tx.send((city.id.clone(), result));
            });
        }
        drop(tx);

        for (id, result) in rx {
            if let Err(e) = &result {
                warn!("Refresh: {} failed: {}", id, e);
                summary.failed += 1;
            }
            registry.apply_fetch(&id, result);
        }
    });

    info!(
        "Refresh: {} of {} city(ies) updated, {} failed",
        summary.succeeded(),
        summary.attempted,
        summary.failed
    );
    Ok(summary)
}

/// Fetch a single city, typically right after it was added.
///
/// Returns `Ok(false)` when the fetch failed (the city's weather is cleared)
/// or the id is not tracked.
pub fn refresh_city<S: KeyValueStore, A: WeatherApi + ?Sized>(
    registry: &mut CityRegistry<S>,
    api: &A,
    request: &FetchRequest,
    id: &CityId,
) -> Result<bool, ValidationError> {
    request.validate()?;
    let Some(city) = registry.get(id).cloned() else {
        return Ok(false);
    };
    let result = fetch_one(api, &city, request);
    let ok = result.is_ok();
    if let Err(e) = &result {
        warn!("Refresh: {} failed: {}", city.name, e);
    }
    Ok(registry.apply_fetch(id, result) && ok)
}
