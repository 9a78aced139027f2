//! Ordered, persisted collection of the cities tracked by one dashboard.
//!
//! The registry is the only owner of city membership. Every mutation is
//! written through to the store before the call returns.

use crate::models::open_meteo::GeocodingResult;
use crate::models::weather::{City, CityId, DashboardMode, WeatherSnapshot};
use crate::services::fetch::FetchError;
use crate::store::kv::KeyValueStore;
use crate::store::records;
use log::{debug, info, warn};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AddOutcome {
    Added(CityId),
    /// Already tracked; carries the name of the existing entry.
    Duplicate(String),
}

pub struct CityRegistry<S: KeyValueStore> {
    store: S,
    mode: DashboardMode,
    cities: Vec<City>,
}

impl<S: KeyValueStore> CityRegistry<S> {
    /// Load the dashboard's city list, migrating older records on the way.
    pub fn load(store: S, mode: DashboardMode) -> Self {
        let cities = records::load_cities(&store, mode);
        debug!("Registry: loaded {} {} city(ies)", cities.len(), mode);
        CityRegistry { store, mode, cities }
    }

    pub fn mode(&self) -> DashboardMode {
        self.mode
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Most recently added first.
    pub fn list(&self) -> &[City] {
        &self.cities
    }

    pub fn len(&self) -> usize {
        self.cities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cities.is_empty()
    }

    pub fn get(&self, id: &CityId) -> Option<&City> {
        self.cities.iter().find(|c| &c.id == id)
    }

    /// Position-based lookup, 1-based as shown by `list`.
    pub fn get_by_position(&self, position: usize) -> Option<&City> {
        position.checked_sub(1).and_then(|i| self.cities.get(i))
    }

    pub fn add(&mut self, candidate: &GeocodingResult) -> AddOutcome {
        let id = CityId::derive(&candidate.name, candidate.latitude, candidate.longitude);
        // Entries carrying a foreign id still collide on name and coordinates.
        let existing = self
            .cities
            .iter()
            .find(|c| c.id == id || CityId::derive(&c.name, c.latitude, c.longitude) == id);
        if let Some(existing) = existing {
            info!("Registry: {} is already tracked", existing.name);
            return AddOutcome::Duplicate(existing.name.clone());
        }

        self.cities.insert(
            0,
            City {
                id: id.clone(),
                name: candidate.name.clone(),
                region: candidate.region(),
                latitude: candidate.latitude,
                longitude: candidate.longitude,
                weather: None,
            },
        );
        info!("Registry: added {} ({})", candidate.name, id);
        self.persist();
        AddOutcome::Added(id)
    }

    /// Absent ids are a no-op.
    pub fn remove(&mut self, id: &CityId) -> Option<City> {
        let index = self.cities.iter().position(|c| &c.id == id)?;
        let removed = self.cities.remove(index);
        info!("Registry: removed {}", removed.name);
        self.persist();
        Some(removed)
    }

    /// Remove by 1-based list position or by id. Unknown references are a
    /// no-op.
    pub fn remove_by_reference(&mut self, reference: &str) -> Option<City> {
        let reference = reference.trim();
        let id = match reference.parse::<usize>().ok().and_then(|p| self.get_by_position(p)) {
            Some(city) => city.id.clone(),
            None => CityId(reference.to_string()),
        };
        self.remove(&id)
    }

    /// Returns how many cities were dropped.
    pub fn clear(&mut self) -> usize {
        let count = self.cities.len();
        self.cities.clear();
        info!("Registry: cleared {} city(ies)", count);
        self.persist();
        count
    }

    /// Store the outcome of one city's fetch.
    ///
    /// A failure nulls the cached weather. Results for ids that are no longer
    /// tracked are dropped and `false` is returned.
    pub fn apply_fetch(&mut self, id: &CityId, result: Result<WeatherSnapshot, FetchError>) -> bool {
        let Some(city) = self.cities.iter_mut().find(|c| &c.id == id) else {
            debug!("Registry: dropping fetch result for untracked city {}", id);
            return false;
        };
        match result {
            Ok(snapshot) => city.weather = Some(snapshot),
            Err(e) => {
                warn!("Registry: {} weather cleared: {}", city.name, e);
                city.weather = None;
            }
        }
        self.persist();
        true
    }

    fn persist(&mut self) {
        records::save_cities(&mut self.store, self.mode, &self.cities);
    }
}
