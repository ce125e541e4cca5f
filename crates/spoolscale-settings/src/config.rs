//! Configuration management for spoolscale
//!
//! Provides configuration file handling and validation.
//! Supports JSON and TOML file formats stored in platform-specific directories.
//!
//! Configuration is organized into logical sections:
//! - Paths (saved variables file, spool catalog)
//! - Catalog backend selection
//! - Sensor sampler command and timeouts
//! - Consumption tracking tolerances

use crate::error::{ConfigFileError, SettingsError, SettingsResult};
use serde::{Deserialize, Serialize};
use spoolscale_core::TrackerOptions;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Directory Klipper keeps its configuration in
pub fn klipper_config_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("klipper_config")
}

/// Storage used for the spool catalog
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CatalogBackend {
    /// SQLite database
    Sqlite,
    /// Comma-separated flat file
    Csv,
}

impl Default for CatalogBackend {
    fn default() -> Self {
        Self::Sqlite
    }
}

impl std::fmt::Display for CatalogBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Sqlite => write!(f, "sqlite"),
            Self::Csv => write!(f, "csv"),
        }
    }
}

/// File locations
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PathSettings {
    /// Klipper saved variables file holding the spool settings
    pub variables_file: PathBuf,
    /// Spool catalog (database or flat file, per [`CatalogSettings::backend`])
    pub catalog_path: PathBuf,
}

impl Default for PathSettings {
    fn default() -> Self {
        let dir = klipper_config_dir();
        Self {
            variables_file: dir.join("saved_vars.cfg"),
            catalog_path: dir.join("spools.db"),
        }
    }
}

/// Catalog settings
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CatalogSettings {
    /// Storage backend
    pub backend: CatalogBackend,
}

/// Load-cell sampler settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SensorSettings {
    /// Sampler program; no sensor when unset
    pub command: Option<String>,
    /// Sampler arguments, `{out_pin}` and `{clk_pin}` are substituted
    pub args: Vec<String>,
    /// Per-sample timeout in milliseconds
    pub timeout_ms: u64,
    /// Samples taken during calibration
    pub calibration_samples: usize,
}

impl Default for SensorSettings {
    fn default() -> Self {
        Self {
            command: None,
            args: Vec::new(),
            timeout_ms: 3000,
            calibration_samples: 10,
        }
    }
}

/// Consumption tracking settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrackingSettings {
    /// Weight increase in grams tolerated as scale noise
    pub noise_tolerance_g: f64,
}

impl Default for TrackingSettings {
    fn default() -> Self {
        Self {
            noise_tolerance_g: TrackerOptions::default().noise_tolerance_g,
        }
    }
}

/// Complete application configuration
///
/// Aggregates all settings sections and provides file I/O operations.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// File locations
    pub paths: PathSettings,
    /// Catalog backend
    pub catalog: CatalogSettings,
    /// Sampler settings
    pub sensor: SensorSettings,
    /// Tracking tolerances
    pub tracking: TrackingSettings,
}

impl Config {
    /// Create new config with defaults
    pub fn new() -> Self {
        Self::default()
    }

    /// Default config file location
    pub fn default_path() -> SettingsResult<PathBuf> {
        dirs::config_dir()
            .map(|dir| dir.join("spoolscale").join("config.toml"))
            .ok_or_else(|| {
                SettingsError::ConfigDirectory("no platform config directory".to_string())
            })
    }

    /// Load config from `path`, or the default location
    ///
    /// A missing file yields the defaults; a file that exists but fails to
    /// parse or validate is an error.
    pub fn load_or_default(path: Option<&Path>) -> SettingsResult<Self> {
        let path = match path {
            Some(p) => p.to_path_buf(),
            None => Self::default_path()?,
        };
        if !path.exists() {
            tracing::debug!("No config at {}, using defaults", path.display());
            let config = Self::default();
            config.validate()?;
            return Ok(config);
        }
        tracing::debug!("Loading config from {}", path.display());
        Self::load_from_file(&path)
    }

    /// Load config from file (JSON or TOML)
    pub fn load_from_file(path: &Path) -> SettingsResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            SettingsError::LoadError(format!("{}: {}", path.display(), e))
        })?;

        let config: Self = match Format::of(path)? {
            Format::Json => serde_json::from_str(&content)?,
            Format::Toml => toml::from_str(&content)?,
        };

        config.validate()?;
        Ok(config)
    }

    /// Save config to file (JSON or TOML)
    pub fn save_to_file(&self, path: &Path) -> SettingsResult<()> {
        self.validate()?;

        let content = match Format::of(path)? {
            Format::Json => serde_json::to_string_pretty(self)?,
            Format::Toml => toml::to_string_pretty(self)?,
        };

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .map_err(|e| SettingsError::ConfigDirectory(format!("{}: {}", parent.display(), e)))?;
        }
        std::fs::write(path, content)
            .map_err(|e| SettingsError::SaveError(format!("{}: {}", path.display(), e)))?;

        Ok(())
    }

    /// Validate configuration
    pub fn validate(&self) -> SettingsResult<()> {
        if self.sensor.timeout_ms == 0 {
            return Err(invalid("sensor.timeout_ms", "must be > 0"));
        }
        if self.sensor.calibration_samples == 0 {
            return Err(invalid("sensor.calibration_samples", "must be > 0"));
        }
        if self.sensor.command.as_deref().is_some_and(|c| c.trim().is_empty()) {
            return Err(invalid("sensor.command", "must not be empty when set"));
        }

        let tolerance = self.tracking.noise_tolerance_g;
        if !tolerance.is_finite() || tolerance < 0.0 {
            return Err(ConfigFileError::ValueOutOfRange {
                key: "tracking.noise_tolerance_g".to_string(),
                value: tolerance.to_string(),
            }
            .into());
        }

        if self.paths.variables_file.as_os_str().is_empty() {
            return Err(invalid("paths.variables_file", "must not be empty"));
        }
        if self.paths.catalog_path.as_os_str().is_empty() {
            return Err(invalid("paths.catalog_path", "must not be empty"));
        }

        Ok(())
    }

    /// Sampler timeout as a [`Duration`]
    pub fn sensor_timeout(&self) -> Duration {
        Duration::from_millis(self.sensor.timeout_ms)
    }

    /// Tracker tunables from this config
    pub fn tracker_options(&self) -> TrackerOptions {
        TrackerOptions {
            noise_tolerance_g: self.tracking.noise_tolerance_g,
        }
    }
}

fn invalid(key: &str, reason: &str) -> SettingsError {
    SettingsError::InvalidSetting {
        key: key.to_string(),
        reason: reason.to_string(),
    }
}

enum Format {
    Json,
    Toml,
}

impl Format {
    fn of(path: &Path) -> SettingsResult<Self> {
        match path.extension().and_then(|e| e.to_str()) {
            Some("json") => Ok(Self::Json),
            Some("toml") => Ok(Self::Toml),
            other => Err(ConfigFileError::UnsupportedFormat(
                other.unwrap_or("<none>").to_string(),
            )
            .into()),
        }
    }
}
