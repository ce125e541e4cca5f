//! Spool data models
//!
//! This module provides:
//! - Spool records with weight invariants
//! - The identifier-indexed spool catalog and its storage trait
//! - Flat-file (comma-separated) import and export with schema validation
//! - Reference densities for common filament materials

pub mod catalog;
pub mod flat;
pub mod materials;
pub mod spool;

pub use catalog::{
    CatalogStore, ImportSummary, MemoryCatalogStore, SpoolCatalog, StoredRecords,
};
pub use flat::{FlatRow, FlatSchema, SkippedRecord};
pub use materials::{FilamentMaterial, MaterialId, MaterialLibrary};
pub use spool::SpoolRecord;
