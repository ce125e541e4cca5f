//! Error types for the catalog storage crate.
//!
//! This module provides structured error types for the SQLite and flat-file
//! catalog backends.

use spoolscale_core::{CatalogError, Error};
use std::io;
use thiserror::Error;

/// Errors that can occur in catalog storage.
#[derive(Error, Debug)]
pub enum CatalogDbError {
    /// The stored columns do not match the expected schema.
    #[error("Schema mismatch in {table}: expected [{expected}], found [{found}]")]
    SchemaMismatch {
        table: String,
        expected: String,
        found: String,
    },

    /// A stored value could not be decoded.
    #[error("Invalid stored value for '{column}' of spool {spool_id}: {reason}")]
    InvalidValue {
        spool_id: String,
        column: String,
        reason: String,
    },

    /// Failed to load the catalog.
    #[error("Failed to load catalog: {0}")]
    LoadError(String),

    /// Failed to save the catalog.
    #[error("Failed to save catalog: {0}")]
    SaveError(String),

    /// SQLite error.
    #[error("Database error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// I/O error during file operations.
    #[error("I/O error: {0}")]
    IoError(#[from] io::Error),

    /// A flat-file parse or schema error.
    #[error(transparent)]
    Catalog(#[from] CatalogError),
}

/// Result type alias for catalog storage operations.
pub type CatalogDbResult<T> = Result<T, CatalogDbError>;

impl From<CatalogDbError> for Error {
    fn from(err: CatalogDbError) -> Self {
        match err {
            CatalogDbError::SchemaMismatch {
                table,
                expected,
                found,
            } => Error::Catalog(CatalogError::SchemaMismatch {
                expected: format!("{} columns [{}]", table, expected),
                found: format!("[{}]", found),
            }),
            CatalogDbError::InvalidValue {
                spool_id,
                column,
                reason,
            } => Error::Catalog(CatalogError::DataIntegrity {
                spool_id,
                reason: format!("{}: {}", column, reason),
            }),
            CatalogDbError::Catalog(e) => Error::Catalog(e),
            CatalogDbError::IoError(e) => Error::Io(e),
            other => Error::Catalog(CatalogError::Storage(other.to_string())),
        }
    }
}
