//! Spoolscale Settings Crate
//!
//! Handles application configuration and persistence of the spool settings
//! kept in Klipper's `saved_vars.cfg`.

pub mod config;
pub mod error;
pub mod persistence;

pub use config::{
    CatalogBackend, CatalogSettings, Config, PathSettings, SensorSettings, TrackingSettings,
};
pub use error::{ConfigFileError, SettingsError, SettingsResult};
pub use persistence::VariablesFile;
