//! Error handling for spoolscale
//!
//! Provides error types for every layer of the spool calculator:
//! - Conversion errors (geometry and material constants)
//! - Catalog errors (lookup, import, schema validation)
//! - Tracker errors (active spool state machine, consumption updates)
//! - Sensor errors (load-cell sampling)
//! - Configuration errors (persisted settings)
//!
//! All error types use `thiserror` for ergonomic error handling.

use thiserror::Error;

/// Unit conversion error type
///
/// Raised when material constants or geometry cannot produce a meaningful
/// physical quantity.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConversionError {
    /// Filament diameter or cross-section is not a positive number
    #[error("Invalid filament geometry: {reason}")]
    InvalidGeometry {
        /// Why the geometry was rejected.
        reason: String,
    },

    /// Material density is not a positive number
    #[error("Invalid density {density} g/cm^3: must be > 0")]
    InvalidDensity {
        /// The rejected density.
        density: f64,
    },

    /// Weight input is negative or not finite
    #[error("Invalid weight {weight_g} g: must be a finite value >= 0")]
    InvalidWeight {
        /// The rejected weight.
        weight_g: f64,
    },
}

/// Catalog error type
///
/// Represents errors raised while looking up, importing, or validating
/// spool records.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CatalogError {
    /// A flat row could not be parsed
    #[error("Malformed row {row}: {reason}")]
    MalformedRow {
        /// One-based row number, counting the header as row 1.
        row: usize,
        /// Why the row was rejected.
        reason: String,
    },

    /// The column set does not match any known schema version
    #[error("Schema mismatch: expected {expected}, found {found}")]
    SchemaMismatch {
        /// Description of the expected columns.
        expected: String,
        /// Description of the columns actually present.
        found: String,
    },

    /// A record violates the spool invariants
    #[error("Spool {spool_id} failed validation: {reason}")]
    DataIntegrity {
        /// Id of the offending spool.
        spool_id: String,
        /// The violated invariant.
        reason: String,
    },

    /// The queried spool does not exist
    #[error("Spool {spool_id} not found in catalog")]
    SpoolNotFound {
        /// The id that was looked up.
        spool_id: String,
    },

    /// Backend storage failure
    #[error("Catalog storage error: {0}")]
    Storage(String),
}

/// Active spool tracker error type
#[derive(Error, Debug, Clone, PartialEq)]
pub enum TrackerError {
    /// Operation requires a resolved active spool
    #[error("Operation requires a resolved active spool, tracker is {state}")]
    InvalidState {
        /// Name of the current tracker state.
        state: String,
    },

    /// The configured active spool is missing from the catalog
    #[error("Active spool {spool_id} not found in catalog")]
    ActiveSpoolNotFound {
        /// The id stored in the settings.
        spool_id: String,
    },

    /// A consumption update would increase the remaining weight
    #[error(
        "Remaining weight cannot increase from {current_g} g to {requested_g} g (tolerance {tolerance_g} g)"
    )]
    MonotonicityViolation {
        /// Stored remaining weight.
        current_g: f64,
        /// Requested remaining weight.
        requested_g: f64,
        /// Configured noise tolerance.
        tolerance_g: f64,
    },
}

/// Load-cell sensor error type
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SensorError {
    /// No sample arrived within the allotted time
    #[error("Sensor sample timed out after {timeout_ms}ms")]
    Timeout {
        /// The timeout that elapsed.
        timeout_ms: u64,
    },

    /// The sensor is not configured or could not be started
    #[error("Sensor unavailable: {reason}")]
    Unavailable {
        /// Why the sensor could not be used.
        reason: String,
    },

    /// The sampler produced output that is not a weight
    #[error("Unreadable sensor output: {output}")]
    InvalidReading {
        /// The raw output.
        output: String,
    },

    /// A statistic was requested over an empty sample set
    #[error("No sensor samples collected")]
    NoSamples,
}

/// Configuration error type
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    /// A required key is missing and has no default
    #[error("Missing configuration key: {0}")]
    MissingKey(String),

    /// A key is present but its value cannot be used
    #[error("Invalid value for '{key}': {value} ({reason})")]
    InvalidValue {
        /// The offending key.
        key: String,
        /// The raw value.
        value: String,
        /// Why it was rejected.
        reason: String,
    },

    /// Settings could not be read or written
    #[error("Settings persistence failed: {0}")]
    Persistence(String),
}

/// Broad classification used to decide how an error is surfaced
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Missing or malformed settings or configuration
    Configuration,
    /// Catalog content or schema violates invariants
    DataIntegrity,
    /// Load-cell sample could not be obtained
    Sensor,
    /// The requested or active spool does not exist
    NotFound,
    /// I/O and other unexpected failures
    Internal,
}

/// Main error type for spoolscale
///
/// A unified error type that can represent any error from all layers.
/// This is the primary error type used in public APIs.
#[derive(Error, Debug)]
pub enum Error {
    /// Conversion error
    #[error(transparent)]
    Conversion(#[from] ConversionError),

    /// Catalog error
    #[error(transparent)]
    Catalog(#[from] CatalogError),

    /// Tracker error
    #[error(transparent)]
    Tracker(#[from] TrackerError),

    /// Sensor error
    #[error(transparent)]
    Sensor(#[from] SensorError),

    /// Configuration error
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Standard I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Generic error
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Create an error from a string message
    pub fn other(msg: impl Into<String>) -> Self {
        Error::Other(msg.into())
    }

    /// Classify this error
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::Config(_) => ErrorKind::Configuration,
            Error::Conversion(_) => ErrorKind::DataIntegrity,
            Error::Catalog(CatalogError::SpoolNotFound { .. }) => ErrorKind::NotFound,
            Error::Catalog(CatalogError::Storage(_)) => ErrorKind::Internal,
            Error::Catalog(_) => ErrorKind::DataIntegrity,
            Error::Tracker(TrackerError::ActiveSpoolNotFound { .. }) => ErrorKind::NotFound,
            Error::Tracker(TrackerError::InvalidState { .. }) => ErrorKind::Configuration,
            Error::Tracker(TrackerError::MonotonicityViolation { .. }) => ErrorKind::DataIntegrity,
            Error::Sensor(_) => ErrorKind::Sensor,
            Error::Io(_) | Error::Other(_) => ErrorKind::Internal,
        }
    }

    /// Check if this is a sensor timeout
    pub fn is_timeout(&self) -> bool {
        matches!(self, Error::Sensor(SensorError::Timeout { .. }))
    }

    /// Check if this error means a spool id could not be resolved
    pub fn is_not_found(&self) -> bool {
        self.kind() == ErrorKind::NotFound
    }
}

/// Result type using Error
pub type Result<T> = std::result::Result<T, Error>;
