//! User preferences backing widget tuning values.
//!
//! Widgets read small tuning values (such as key-repeat timing) from a
//! [`PreferenceStore`]. [`Preferences`] is the stock implementation: an
//! in-memory tree addressed with `.` or `/` separated paths that can be loaded
//! from and saved to TOML.
//!
//! ```
//! use lattice_binding::preferences::{PreferenceStore, Preferences, RepeatTiming};
//!
//! let prefs = Preferences::from_toml_str("[input.repeat]\ndelay = 0.25\n").unwrap();
//! let timing = RepeatTiming::from_store(&prefs);
//! assert_eq!(timing.delay, 0.25);
//! assert_eq!(timing.interval, RepeatTiming::DEFAULT_INTERVAL);
//! assert!(prefs.contains("input/repeat/delay"));
//! ```

use std::path::Path;
use std::time::Duration;

use parking_lot::RwLock;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use toml::{Table, Value};

use crate::error::{BindingError, Result};
use crate::logging::targets;
use crate::signal::Signal;

/// Typed access to a hierarchical preference store.
///
/// Getters return `None` for missing keys and for values of another type.
pub trait PreferenceStore {
    /// Read a float. Integers are widened.
    fn get_float(&self, key: &str) -> Option<f64>;
    /// Write a float.
    fn set_float(&self, key: &str, value: f64);
    /// Read an integer.
    fn get_int(&self, key: &str) -> Option<i64>;
    /// Write an integer.
    fn set_int(&self, key: &str, value: i64);
    /// Read a boolean.
    fn get_bool(&self, key: &str) -> Option<bool>;
    /// Write a boolean.
    fn set_bool(&self, key: &str, value: bool);
    /// Read a string.
    fn get_string(&self, key: &str) -> Option<String>;
    /// Write a string.
    fn set_string(&self, key: &str, value: &str);
    /// Returns true if any value exists at `key`.
    fn contains(&self, key: &str) -> bool;
}

/// An in-memory preference tree with TOML persistence.
pub struct Preferences {
    data: RwLock<Table>,
    changed: Signal<String>,
}

impl Default for Preferences {
    fn default() -> Self {
        Self::new()
    }
}

impl Preferences {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::from_table(Table::new())
    }

    /// Create a store from an already parsed TOML table.
    pub fn from_table(table: Table) -> Self {
        Self {
            data: RwLock::new(table),
            changed: Signal::new(),
        }
    }

    /// Parse a TOML document.
    pub fn from_toml_str(document: &str) -> Result<Self> {
        let table: Table = document.parse()?;
        Ok(Self::from_table(table))
    }

    /// Load a TOML file.
    pub fn load_toml(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let document =
            std::fs::read_to_string(path).map_err(|e| BindingError::preferences(path, e))?;
        let prefs = Self::from_toml_str(&document)?;
        tracing::debug!(target: targets::PREFERENCES, path = %path.display(), "loaded preferences");
        Ok(prefs)
    }

    /// Save as TOML.
    ///
    /// The document is written next to `path` first and then renamed over it,
    /// so a failed write never leaves a truncated file behind. The staging file
    /// is removed when either step fails.
    pub fn save_toml(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let document = toml::to_string_pretty(&*self.data.read())?;

        let mut staging = path.as_os_str().to_owned();
        staging.push(".tmp");
        if let Err(e) = std::fs::write(&staging, document)
            .and_then(|()| std::fs::rename(&staging, path))
        {
            let _ = std::fs::remove_file(&staging);
            return Err(BindingError::preferences(path, e));
        }

        tracing::debug!(target: targets::PREFERENCES, path = %path.display(), "saved preferences");
        Ok(())
    }

    /// Emitted with the key path after every write or removal.
    pub fn changed(&self) -> &Signal<String> {
        &self.changed
    }

    /// Read a whole section (or single value) through serde.
    pub fn get_deserialized<T: DeserializeOwned>(&self, path: &str) -> Option<T> {
        self.get_raw(path)?.try_into().ok()
    }

    /// Write a value through serde, replacing whatever is at `path`.
    pub fn set_serialized<T: Serialize>(&self, path: &str, value: &T) -> Result<()> {
        self.set_raw(path, Value::try_from(value)?);
        Ok(())
    }

    /// The raw TOML value at `path`.
    pub fn get_raw(&self, path: &str) -> Option<Value> {
        lookup(&self.data.read(), &parse_path(path)).cloned()
    }

    /// Write a raw TOML value, creating intermediate tables as needed.
    pub fn set_raw(&self, path: &str, value: Value) {
        let parts = parse_path(path);
        if parts.is_empty() {
            return;
        }
        insert(&mut self.data.write(), &parts, value);
        self.changed.emit(path.to_string());
    }

    /// Remove the value at `path`.
    pub fn remove(&self, path: &str) -> Option<Value> {
        let removed = remove(&mut self.data.write(), &parse_path(path));
        if removed.is_some() {
            self.changed.emit(path.to_string());
        }
        removed
    }

    /// Top-level keys.
    pub fn keys(&self) -> Vec<String> {
        self.data.read().keys().cloned().collect()
    }

    /// Returns true if nothing is stored.
    pub fn is_empty(&self) -> bool {
        self.data.read().is_empty()
    }
}

impl PreferenceStore for Preferences {
    fn get_float(&self, key: &str) -> Option<f64> {
        match self.get_raw(key)? {
            Value::Float(v) => Some(v),
            Value::Integer(v) => Some(v as f64),
            _ => None,
        }
    }

    fn set_float(&self, key: &str, value: f64) {
        self.set_raw(key, Value::Float(value));
    }

    fn get_int(&self, key: &str) -> Option<i64> {
        self.get_raw(key)?.as_integer()
    }

    fn set_int(&self, key: &str, value: i64) {
        self.set_raw(key, Value::Integer(value));
    }

    fn get_bool(&self, key: &str) -> Option<bool> {
        self.get_raw(key)?.as_bool()
    }

    fn set_bool(&self, key: &str, value: bool) {
        self.set_raw(key, Value::Boolean(value));
    }

    fn get_string(&self, key: &str) -> Option<String> {
        match self.get_raw(key)? {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    fn set_string(&self, key: &str, value: &str) {
        self.set_raw(key, Value::String(value.to_string()));
    }

    fn contains(&self, key: &str) -> bool {
        lookup(&self.data.read(), &parse_path(key)).is_some()
    }
}

impl std::fmt::Debug for Preferences {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Preferences")
            .field("keys", &self.keys())
            .finish()
    }
}

fn parse_path(path: &str) -> Vec<&str> {
    path.split(['.', '/']).filter(|s| !s.is_empty()).collect()
}

fn lookup<'a>(table: &'a Table, parts: &[&str]) -> Option<&'a Value> {
    match parts {
        [] => None,
        [last] => table.get(*last),
        [first, rest @ ..] => match table.get(*first)? {
            Value::Table(child) => lookup(child, rest),
            _ => None,
        },
    }
}

fn insert(table: &mut Table, parts: &[&str], value: Value) {
    match parts {
        [] => {}
        [last] => {
            table.insert((*last).to_string(), value);
        }
        [first, rest @ ..] => {
            let entry = table
                .entry((*first).to_string())
                .or_insert(Value::Table(Table::new()));
            if !entry.is_table() {
                *entry = Value::Table(Table::new());
            }
            if let Value::Table(child) = entry {
                insert(child, rest, value);
            }
        }
    }
}

fn remove(table: &mut Table, parts: &[&str]) -> Option<Value> {
    match parts {
        [] => None,
        [last] => table.remove(*last),
        [first, rest @ ..] => match table.get_mut(*first)? {
            Value::Table(child) => remove(child, rest),
            _ => None,
        },
    }
}

/// Key-repeat timing for held inputs, in seconds.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RepeatTiming {
    /// Time between the initial press and the first repeat.
    pub delay: f64,
    /// Time between subsequent repeats.
    pub interval: f64,
}

impl Default for RepeatTiming {
    fn default() -> Self {
        Self {
            delay: Self::DEFAULT_DELAY,
            interval: Self::DEFAULT_INTERVAL,
        }
    }
}

impl RepeatTiming {
    /// Preference key of [`delay`](Self::delay).
    pub const DELAY_KEY: &'static str = "input.repeat.delay";
    /// Preference key of [`interval`](Self::interval).
    pub const INTERVAL_KEY: &'static str = "input.repeat.interval";
    /// Delay used when none is stored.
    pub const DEFAULT_DELAY: f64 = 0.5;
    /// Interval used when none is stored.
    pub const DEFAULT_INTERVAL: f64 = 0.1;
    /// Longest accepted delay or interval, in seconds.
    pub const MAX_SECONDS: f64 = 3600.0;

    /// Read the timing from `store`.
    ///
    /// Missing, non-positive or out-of-range values fall back to the defaults.
    pub fn from_store(store: &(impl PreferenceStore + ?Sized)) -> Self {
        Self {
            delay: in_range(store.get_float(Self::DELAY_KEY)).unwrap_or(Self::DEFAULT_DELAY),
            interval: in_range(store.get_float(Self::INTERVAL_KEY))
                .unwrap_or(Self::DEFAULT_INTERVAL),
        }
    }

    /// Write the timing back to `store`.
    pub fn store(&self, store: &(impl PreferenceStore + ?Sized)) {
        store.set_float(Self::DELAY_KEY, self.delay);
        store.set_float(Self::INTERVAL_KEY, self.interval);
    }

    /// [`delay`](Self::delay) as a duration.
    pub fn delay_duration(&self) -> Duration {
        Duration::from_secs_f64(in_range(Some(self.delay)).unwrap_or(Self::DEFAULT_DELAY))
    }

    /// [`interval`](Self::interval) as a duration.
    pub fn interval_duration(&self) -> Duration {
        Duration::from_secs_f64(in_range(Some(self.interval)).unwrap_or(Self::DEFAULT_INTERVAL))
    }
}

fn in_range(value: Option<f64>) -> Option<f64> {
    value.filter(|v| *v > 0.0 && *v <= RepeatTiming::MAX_SECONDS)
}
