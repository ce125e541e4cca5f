//! Persisted spool settings
//!
//! The active spool id, scale corrections, and sensor pin assignments live
//! in a small key-value store owned by the printer host. This module defines
//! the store contract and a typed view over it.

use crate::error::{ConfigError, Result};
use serde::Serialize;
use std::collections::BTreeMap;
use std::str::FromStr;

/// Key names used in the settings store
pub mod keys {
    /// Id of the mounted spool
    pub const ACTIVE_SPOOL_ID: &str = "active_spool_id";
    /// Tare mass on the scale besides the spool, in grams
    pub const EXTRA_WEIGHT: &str = "extra_weight";
    /// Filament path length from spool to extruder, in mm
    pub const DISTANCE_TO_EXTRUDER: &str = "distance_to_extruder";
    /// Load-cell zero correction, in grams
    pub const CALIBRATION_OFFSET: &str = "calibration_offset";
    /// Reference mass used during calibration, in grams
    pub const CALIBRATION_WEIGHT: &str = "calibration_weight";
    /// HX711 data pin
    pub const SENSOR_OUT_PIN: &str = "sensor_out_pin";
    /// HX711 clock pin
    pub const SENSOR_CLK_PIN: &str = "sensor_clk_pin";
}

/// Value meaning "no spool mounted"
pub const NO_ACTIVE_SPOOL: &str = "none";

/// Durable key-value settings
pub trait SettingsStore {
    /// Read a raw value
    fn get(&self, key: &str) -> Option<String>;

    /// Write a raw value (in memory until [`SettingsStore::persist`])
    fn set(&mut self, key: &str, value: &str);

    /// Flush all values to durable storage
    fn persist(&mut self) -> Result<()>;
}

/// Settings store that lives only in memory
#[derive(Debug, Clone, Default)]
pub struct MemorySettingsStore {
    values: BTreeMap<String, String>,
    persist_count: usize,
}

impl MemorySettingsStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store with initial values
    pub fn with_values<'a>(values: impl IntoIterator<Item = (&'a str, &'a str)>) -> Self {
        Self {
            values: values
                .into_iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
            persist_count: 0,
        }
    }

    /// How many times the store has been persisted
    pub fn persist_count(&self) -> usize {
        self.persist_count
    }
}

impl SettingsStore for MemorySettingsStore {
    fn get(&self, key: &str) -> Option<String> {
        self.values.get(key).cloned()
    }

    fn set(&mut self, key: &str, value: &str) {
        self.values.insert(key.to_string(), value.to_string());
    }

    fn persist(&mut self) -> Result<()> {
        self.persist_count += 1;
        Ok(())
    }
}

/// Typed snapshot of the spool settings
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Settings {
    /// Mounted spool, `None` when explicitly unset
    pub active_spool_id: Option<String>,
    /// Tare mass on the scale besides the spool (g)
    pub extra_weight: f64,
    /// Spool-to-extruder path length (mm)
    pub distance_to_extruder: f64,
    /// Load-cell zero correction (g)
    pub calibration_offset: f64,
    /// Reference mass for calibration (g)
    pub calibration_weight: f64,
    /// HX711 data pin
    pub sensor_out_pin: u8,
    /// HX711 clock pin
    pub sensor_clk_pin: u8,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            active_spool_id: None,
            extra_weight: 0.0,
            distance_to_extruder: 0.0,
            calibration_offset: 0.0,
            calibration_weight: 500.0,
            sensor_out_pin: 17,
            sensor_clk_pin: 22,
        }
    }
}

impl Settings {
    /// Every key with its default raw value
    pub fn default_values() -> Vec<(&'static str, String)> {
        let d = Self::default();
        vec![
            (keys::ACTIVE_SPOOL_ID, String::new()),
            (keys::EXTRA_WEIGHT, d.extra_weight.to_string()),
            (keys::DISTANCE_TO_EXTRUDER, d.distance_to_extruder.to_string()),
            (keys::CALIBRATION_OFFSET, d.calibration_offset.to_string()),
            (keys::CALIBRATION_WEIGHT, d.calibration_weight.to_string()),
            (keys::SENSOR_OUT_PIN, d.sensor_out_pin.to_string()),
            (keys::SENSOR_CLK_PIN, d.sensor_clk_pin.to_string()),
        ]
    }

    /// Read settings, filling and persisting any missing keys
    pub fn load(store: &mut dyn SettingsStore) -> Result<Self> {
        let mut filled = Vec::new();
        for (key, default) in Self::default_values() {
            if store.get(key).is_none() {
                store.set(key, &default);
                filled.push(key);
            }
        }
        if !filled.is_empty() {
            tracing::info!("Added missing settings: {}", filled.join(", "));
            store.persist()?;
        }

        let settings = Self {
            active_spool_id: parse_spool_id(&raw(store, keys::ACTIVE_SPOOL_ID)?),
            extra_weight: parse_value(store, keys::EXTRA_WEIGHT)?,
            distance_to_extruder: parse_value(store, keys::DISTANCE_TO_EXTRUDER)?,
            calibration_offset: parse_value(store, keys::CALIBRATION_OFFSET)?,
            calibration_weight: parse_value(store, keys::CALIBRATION_WEIGHT)?,
            sensor_out_pin: parse_value(store, keys::SENSOR_OUT_PIN)?,
            sensor_clk_pin: parse_value(store, keys::SENSOR_CLK_PIN)?,
        };
        tracing::debug!(
            "Active spool from settings: {}",
            settings.active_spool_id.as_deref().unwrap_or(NO_ACTIVE_SPOOL)
        );
        Ok(settings)
    }

    /// Store a new active spool (or none) and persist
    pub fn set_active_spool(
        &mut self,
        store: &mut dyn SettingsStore,
        spool_id: Option<&str>,
    ) -> Result<()> {
        let value = spool_id.and_then(parse_spool_id);
        store.set(keys::ACTIVE_SPOOL_ID, value.as_deref().unwrap_or(""));
        store.persist()?;
        self.active_spool_id = value;
        Ok(())
    }

    /// Store a new calibration offset and persist
    pub fn set_calibration_offset(
        &mut self,
        store: &mut dyn SettingsStore,
        offset: f64,
    ) -> Result<()> {
        store.set(keys::CALIBRATION_OFFSET, &offset.to_string());
        store.persist()?;
        self.calibration_offset = offset;
        Ok(())
    }
}

fn raw(store: &dyn SettingsStore, key: &str) -> Result<String> {
    store
        .get(key)
        .map(|v| unquote(&v).to_string())
        .ok_or_else(|| ConfigError::MissingKey(key.to_string()).into())
}

fn parse_value<T>(store: &dyn SettingsStore, key: &str) -> Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    let value = raw(store, key)?;
    value.parse::<T>().map_err(|e| {
        ConfigError::InvalidValue {
            key: key.to_string(),
            value: value.clone(),
            reason: e.to_string(),
        }
        .into()
    })
}

fn parse_spool_id(value: &str) -> Option<String> {
    let id = value.trim();
    if id.is_empty() || id.eq_ignore_ascii_case(NO_ACTIVE_SPOOL) {
        None
    } else {
        Some(id.to_uppercase())
    }
}

/// Strip one layer of matching single or double quotes
pub fn unquote(value: &str) -> &str {
    let value = value.trim();
    for quote in ['\'', '"'] {
        if value.len() >= 2 && value.starts_with(quote) && value.ends_with(quote) {
            return &value[1..value.len() - 1];
        }
    }
    value
}
