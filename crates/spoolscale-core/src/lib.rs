//! # Spoolscale Core
//!
//! Core types and logic for spoolscale.
//! Provides spool records and the spool catalog, filament unit conversion,
//! settings and sensor contracts, calibration, and active-spool tracking.

pub mod calibration;
pub mod data;
pub mod error;
pub mod sensor;
pub mod settings;
pub mod tracker;
pub mod units;

pub use calibration::{collect_samples, compute_offset, most_frequent, CalibrationResult};

pub use data::{
    CatalogStore, FilamentMaterial, FlatRow, FlatSchema, ImportSummary, MaterialId,
    MaterialLibrary, MemoryCatalogStore, SkippedRecord, SpoolCatalog, SpoolRecord,
    StoredRecords,
};

pub use error::{
    CatalogError, ConfigError, ConversionError, Error, ErrorKind, Result, SensorError,
    TrackerError,
};

pub use sensor::{
    sample_or_fallback, CommandSensor, FixedSensor, SensorSource, SequenceSensor,
    UnavailableSensor,
};

pub use settings::{MemorySettingsStore, Settings, SettingsStore, NO_ACTIVE_SPOOL};

pub use tracker::{
    ActiveSpool, ActiveSpoolTracker, LiveReading, SpoolMetrics, TrackerOptions,
};

pub use units::{ConversionWarning, NetWeight};
