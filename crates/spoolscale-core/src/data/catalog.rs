//! Spool catalog
//!
//! Identifier-indexed spool records plus the storage trait that backs them.

use crate::data::flat::{self, FlatRow, FlatSchema, SkippedRecord};
use crate::data::materials::{init_standard_library, MaterialLibrary};
use crate::data::spool::{normalize_id, SpoolRecord};
use crate::error::{CatalogError, Result};
use std::collections::{BTreeMap, HashSet};

/// Durable storage for spool records
///
/// Implementations decide where records live (SQLite, flat file, memory).
/// Mutators take `&mut self`, so a single owner serializes catalog writes.
pub trait CatalogStore {
    /// Read every stored record that could be decoded
    fn load_all(&self) -> Result<Vec<SpoolRecord>>;

    /// Read every stored record, listing rows that could not be decoded
    ///
    /// One bad row does not fail the load. Stores that cannot hold
    /// undecodable rows keep the default.
    fn load_stored(&self) -> Result<StoredRecords> {
        Ok(StoredRecords {
            records: self.load_all()?,
            rejected: Vec::new(),
        })
    }

    /// Insert or replace one record, keyed by its id
    fn upsert(&mut self, record: &SpoolRecord) -> Result<()>;

    /// Insert or replace many records; either all are written or none
    fn upsert_all(&mut self, records: &[SpoolRecord]) -> Result<()>;

    /// Import header + data rows, returning the number of records written
    fn import_flat(&mut self, rows: &[FlatRow]) -> Result<usize> {
        let parsed = flat::records_from_rows(rows, &init_standard_library())?;
        self.upsert_all(&parsed.records)?;
        Ok(parsed.records.len())
    }

    /// Export every record as header + data rows, ordered by id
    fn export_flat(&self) -> Result<Vec<FlatRow>> {
        let mut records = self.load_all()?;
        records.sort_by(|a, b| a.spool_id.cmp(&b.spool_id));
        let mut rows = vec![FlatSchema::CURRENT.header()];
        rows.extend(records.iter().map(flat::record_to_row));
        Ok(rows)
    }
}

/// In-memory catalog storage
#[derive(Debug, Clone, Default)]
pub struct MemoryCatalogStore {
    records: BTreeMap<String, SpoolRecord>,
}

impl MemoryCatalogStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store holding the given records
    pub fn with_records(records: impl IntoIterator<Item = SpoolRecord>) -> Self {
        Self {
            records: records
                .into_iter()
                .map(|r| (r.spool_id.clone(), r))
                .collect(),
        }
    }
}

impl CatalogStore for MemoryCatalogStore {
    fn load_all(&self) -> Result<Vec<SpoolRecord>> {
        Ok(self.records.values().cloned().collect())
    }

    fn upsert(&mut self, record: &SpoolRecord) -> Result<()> {
        self.records.insert(record.spool_id.clone(), record.clone());
        Ok(())
    }

    fn upsert_all(&mut self, records: &[SpoolRecord]) -> Result<()> {
        for record in records {
            self.records.insert(record.spool_id.clone(), record.clone());
        }
        Ok(())
    }
}

/// Output of [`CatalogStore::load_stored`]
#[derive(Debug, Clone, Default)]
pub struct StoredRecords {
    /// Decoded records, not yet validated
    pub records: Vec<SpoolRecord>,
    /// Normalized id and reason for each row that could not be decoded
    pub rejected: Vec<(String, CatalogError)>,
}

/// Result of [`SpoolCatalog::import_records`]
#[derive(Debug, Clone, Default)]
pub struct ImportSummary {
    /// Records added or replaced, in row order
    pub records: Vec<SpoolRecord>,
    /// Rows dropped for failing validation
    pub skipped: Vec<SkippedRecord>,
}

impl ImportSummary {
    /// Number of records added or replaced
    pub fn imported(&self) -> usize {
        self.records.len()
    }
}

/// Spool records indexed by normalized id
#[derive(Debug, Clone)]
pub struct SpoolCatalog {
    records: BTreeMap<String, SpoolRecord>,
    rejected: BTreeMap<String, CatalogError>,
    materials: MaterialLibrary,
}

impl SpoolCatalog {
    /// Create an empty catalog
    pub fn new() -> Self {
        Self {
            records: BTreeMap::new(),
            rejected: BTreeMap::new(),
            materials: init_standard_library(),
        }
    }

    /// Build a catalog from records, skipping any that fail validation
    ///
    /// An id that appears more than once (ignoring case) is rejected in
    /// every copy; there is no telling which one is current.
    pub fn from_records(records: impl IntoIterator<Item = SpoolRecord>) -> Self {
        let mut catalog = Self::new();
        let mut seen = HashSet::new();
        for record in records {
            let id = normalize_id(&record.spool_id);
            if !seen.insert(id.clone()) {
                let err = CatalogError::DataIntegrity {
                    spool_id: id.clone(),
                    reason: "stored more than once".to_string(),
                };
                catalog.reject(id, err);
                continue;
            }
            if let Err(e) = catalog.upsert(record) {
                catalog.reject(id, e);
            }
        }
        catalog
    }

    /// Build a catalog from a store's decoded and undecodable rows
    pub fn from_stored(stored: StoredRecords) -> Self {
        let mut catalog = Self::from_records(stored.records);
        for (id, err) in stored.rejected {
            catalog.reject(normalize_id(&id), err);
        }
        catalog
    }

    /// Load every record from a store
    pub fn load(store: &dyn CatalogStore) -> Result<Self> {
        let catalog = Self::from_stored(store.load_stored()?);
        tracing::debug!(
            "Loaded {} spools ({} rejected)",
            catalog.len(),
            catalog.rejected.len()
        );
        Ok(catalog)
    }

    fn reject(&mut self, id: String, err: CatalogError) {
        tracing::warn!("Ignoring stored record: {}", err);
        self.records.remove(&id);
        self.rejected.insert(id, err);
    }

    /// Find a spool by id (case-insensitive)
    pub fn find_by_id(&self, id: &str) -> Option<&SpoolRecord> {
        self.records.get(&normalize_id(id))
    }

    /// Find a spool by id, failing if it is absent
    pub fn require(&self, id: &str) -> std::result::Result<&SpoolRecord, CatalogError> {
        self.find_by_id(id).ok_or_else(|| CatalogError::SpoolNotFound {
            spool_id: normalize_id(id),
        })
    }

    /// Why a stored record with this id was left out, if it was
    pub fn rejection(&self, id: &str) -> Option<&CatalogError> {
        self.rejected.get(&normalize_id(id))
    }

    /// Insert or replace a validated record
    pub fn upsert(&mut self, record: SpoolRecord) -> std::result::Result<(), CatalogError> {
        record.validate()?;
        self.rejected.remove(&record.spool_id);
        self.records.insert(record.spool_id.clone(), record);
        Ok(())
    }

    /// Bulk-load records from header + data rows
    ///
    /// Parsing is completed before anything is inserted, so a malformed row
    /// or an unknown schema leaves the catalog untouched. Rows that parse but
    /// violate record invariants are skipped and listed in the summary.
    pub fn import_records(
        &mut self,
        rows: &[FlatRow],
    ) -> std::result::Result<ImportSummary, CatalogError> {
        let parsed = flat::records_from_rows(rows, &self.materials)?;
        for record in &parsed.records {
            self.rejected.remove(&record.spool_id);
            self.records.insert(record.spool_id.clone(), record.clone());
        }
        tracing::info!(
            "Imported {} spools ({} skipped)",
            parsed.records.len(),
            parsed.skipped.len()
        );
        Ok(ImportSummary {
            records: parsed.records,
            skipped: parsed.skipped,
        })
    }

    /// Iterate records ordered by id
    ///
    /// Each call starts a fresh pass over the catalog.
    pub fn export_records(&self) -> impl Iterator<Item = &SpoolRecord> + '_ {
        self.records.values()
    }

    /// Header + one row per record, ordered by id
    pub fn export_rows(&self) -> Vec<FlatRow> {
        std::iter::once(FlatSchema::CURRENT.header())
            .chain(self.export_records().map(flat::record_to_row))
            .collect()
    }

    /// Number of spools
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Check if the catalog is empty
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

impl Default for SpoolCatalog {
    fn default() -> Self {
        Self::new()
    }
}
