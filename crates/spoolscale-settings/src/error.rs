//! Settings errors
//!
//! Failures reading or writing `config.toml` and `saved_vars.cfg`.

use spoolscale_core::{ConfigError, Error};
use std::io;
use thiserror::Error;

/// Settings and config file errors
#[derive(Error, Debug)]
pub enum SettingsError {
    /// File missing or unreadable
    #[error("Cannot read {0}")]
    LoadError(String),

    /// File could not be written
    #[error("Cannot write {0}")]
    SaveError(String),

    /// Config value rejected by validation
    #[error("Setting '{key}' {reason}")]
    InvalidSetting { key: String, reason: String },

    /// No usable config directory
    #[error("Config directory unavailable: {0}")]
    ConfigDirectory(String),

    #[error("I/O error: {0}")]
    IoError(#[from] io::Error),

    /// Malformed JSON config
    #[error("Malformed JSON: {0}")]
    JsonError(#[from] serde_json::Error),

    /// Malformed TOML config or variables file
    #[error("Malformed TOML: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error("Cannot encode TOML: {0}")]
    TomlSerError(#[from] toml::ser::Error),

    #[error(transparent)]
    Config(#[from] ConfigFileError),
}

/// Structural problems in a settings file
#[derive(Error, Debug)]
pub enum ConfigFileError {
    /// Required table absent
    #[error("Missing section [{0}]")]
    MissingSection(String),

    /// Extension is neither `.toml` nor `.json`
    #[error("Unknown config file type '{0}'")]
    UnsupportedFormat(String),

    /// Numeric value outside its allowed range
    #[error("Setting '{key}' out of range: {value}")]
    ValueOutOfRange { key: String, value: String },
}

/// Settings result
pub type SettingsResult<T> = Result<T, SettingsError>;

impl From<SettingsError> for Error {
    fn from(err: SettingsError) -> Self {
        match err {
            SettingsError::IoError(e) => Error::Io(e),
            SettingsError::InvalidSetting { key, reason } => Error::Config(ConfigError::InvalidValue {
                key,
                value: String::new(),
                reason,
            }),
            other => Error::Config(ConfigError::Persistence(other.to_string())),
        }
    }
}
