//! Small persistent key-value store: one JSON document per key.
//!
//! Writes replace the whole record (temp file + rename), so the last writer
//! wins and a reader never observes a half-written record.

use log::{debug, warn};
use serde::Serialize;
use serde_json::Value;
#[cfg(test)]
use std::collections::BTreeMap;
use std::io;
use std::path::{Path, PathBuf};

/// Record keys. Forecast and historical dashboards keep separate lists.
pub mod keys {
    pub const FORECAST_CITIES: &str = "weather-cities-v1";
    pub const FORECAST_RANGE: &str = "weather-forecast-range";
    pub const HISTORICAL_CITIES: &str = "hist-cities-v1";
    pub const HISTORICAL_WINDOW: &str = "hist-dates-v1";
}

pub trait KeyValueStore {
    fn read(&self, key: &str) -> io::Result<Option<String>>;
    fn write(&mut self, key: &str, value: &str) -> io::Result<()>;
}

/// Directory-backed store; `<dir>/<key>.json` per record.
#[derive(Debug, Clone)]
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        FileStore { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{key}.json"))
    }
}

impl KeyValueStore for FileStore {
    fn read(&self, key: &str) -> io::Result<Option<String>> {
        match std::fs::read_to_string(self.path_for(key)) {
            Ok(s) => Ok(Some(s)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e),
        }
    }

    fn write(&mut self, key: &str, value: &str) -> io::Result<()> {
        std::fs::create_dir_all(&self.dir)?;
        let target = self.path_for(key);
        let tmp = self.dir.join(format!(".{key}.json.tmp"));
        std::fs::write(&tmp, value)?;
        std::fs::rename(&tmp, &target)
    }
}

/// In-memory store for tests.
#[cfg(test)]
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    records: BTreeMap<String, String>,
}

#[cfg(test)]
impl MemoryStore {
    pub fn raw(&self, key: &str) -> Option<&str> {
        self.records.get(key).map(String::as_str)
    }
}

#[cfg(test)]
impl KeyValueStore for MemoryStore {
    fn read(&self, key: &str) -> io::Result<Option<String>> {
        Ok(self.records.get(key).cloned())
    }

    fn write(&mut self, key: &str, value: &str) -> io::Result<()> {
        self.records.insert(key.to_string(), value.to_string());
        Ok(())
    }
}

/// Raw text of a record. Read failures are logged and treated as absent.
pub fn load_raw<S: KeyValueStore + ?Sized>(store: &S, key: &str) -> Option<String> {
    match store.read(key) {
        Ok(v) => v,
        Err(e) => {
            warn!("Store: reading {} failed, using defaults: {}", key, e);
            None
        }
    }
}

/// Parsed JSON of a record; malformed JSON counts as absent.
pub fn load<S: KeyValueStore + ?Sized>(store: &S, key: &str) -> Option<Value> {
    let raw = load_raw(store, key)?;
    match serde_json::from_str(&raw) {
        Ok(v) => Some(v),
        Err(e) => {
            warn!("Store: record {} is not valid JSON, ignoring it: {}", key, e);
            None
        }
    }
}

pub fn save_raw<S: KeyValueStore + ?Sized>(store: &mut S, key: &str, value: &str) {
    match store.write(key, value) {
        Ok(()) => debug!("Store: wrote {} ({} bytes)", key, value.len()),
        Err(e) => warn!("Store: writing {} failed: {}", key, e),
    }
}

pub fn save<S: KeyValueStore + ?Sized, T: Serialize + ?Sized>(store: &mut S, key: &str, value: &T) {
    match serde_json::to_string(value) {
        Ok(s) => save_raw(store, key, &s),
        Err(e) => warn!("Store: encoding {} failed: {}", key, e),
    }
}
