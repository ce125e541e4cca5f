//! Flat-file catalog storage
//!
//! Keeps the whole catalog in one comma-separated file with a header row,
//! the layout the spool list has always been maintained in by hand. Every
//! write rewrites the file through a temporary sibling and a rename.

use crate::error::{CatalogDbError, CatalogDbResult};
use spoolscale_core::data::flat::{self, FlatRow, FlatSchema};
use spoolscale_core::data::materials::init_standard_library;
use spoolscale_core::data::spool::normalize_id;
use spoolscale_core::{CatalogError, CatalogStore, MaterialLibrary, SpoolRecord, StoredRecords};
use std::fs;
use std::path::{Path, PathBuf};

/// Spool catalog in a comma-separated file
#[derive(Debug, Clone)]
pub struct FlatFileCatalogStore {
    path: PathBuf,
    materials: MaterialLibrary,
}

/// Contents of the catalog file
#[derive(Debug, Default)]
struct FileContents {
    /// Every data row with its normalized id, in file order
    rows: Vec<(String, FlatRow)>,
    stored: StoredRecords,
}

impl FlatFileCatalogStore {
    /// Use the file at `path`; it is created on first write
    pub fn new(path: &Path) -> Self {
        Self {
            path: path.to_path_buf(),
            materials: init_standard_library(),
        }
    }

    /// File location
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read every row, including records that fail validation
    ///
    /// Invalid records are kept so that rewriting the file never drops
    /// them; the catalog decides what to do with them. Rows that do not
    /// parse are listed as rejected and kept verbatim for the next write.
    fn read_file(&self) -> CatalogDbResult<FileContents> {
        if !self.path.exists() {
            tracing::debug!("No catalog file at {}", self.path.display());
            return Ok(FileContents::default());
        }
        let text = fs::read_to_string(&self.path)?;
        let rows = flat::parse_text(&text)?;
        let Some((header, data)) = rows.split_first() else {
            return Ok(FileContents::default());
        };
        let schema = FlatSchema::detect(header)?;

        let mut contents = FileContents::default();
        for (i, row) in data.iter().enumerate() {
            let id = row.first().map(|f| normalize_id(f)).unwrap_or_default();
            match flat::row_to_record(schema, row, i + 2, &self.materials) {
                Ok(record) => contents.stored.records.push(record),
                Err(e) => {
                    tracing::warn!("Skipping row {} of {}: {}", i + 2, self.path.display(), e);
                    if !id.is_empty() {
                        contents.stored.rejected.push((
                            id.clone(),
                            CatalogError::DataIntegrity {
                                spool_id: id.clone(),
                                reason: e.to_string(),
                            },
                        ));
                    }
                }
            }
            contents.rows.push((id, row.clone()));
        }
        tracing::debug!(
            "Read {} spools from {}",
            contents.stored.records.len(),
            self.path.display()
        );
        Ok(contents)
    }

    fn write_rows(&self, rows: impl IntoIterator<Item = FlatRow>) -> CatalogDbResult<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }

        let rows: Vec<_> = std::iter::once(FlatSchema::CURRENT.header())
            .chain(rows)
            .collect();

        let file_name = self
            .path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .ok_or_else(|| CatalogDbError::SaveError(format!("{} is not a file", self.path.display())))?;
        let tmp = self.path.with_file_name(format!("{}.tmp", file_name));

        fs::write(&tmp, flat::render_text(&rows))?;
        fs::rename(&tmp, &self.path)?;
        Ok(())
    }

    /// Replace every row stored under each record's id, then rewrite
    fn merge(&self, records: &[SpoolRecord]) -> CatalogDbResult<()> {
        let mut rows = self.read_file()?.rows;
        for record in records {
            rows.retain(|(id, _)| id != &record.spool_id);
            rows.push((record.spool_id.clone(), flat::record_to_row(record)));
        }
        rows.sort_by(|a, b| a.0.cmp(&b.0));
        self.write_rows(rows.into_iter().map(|(_, row)| row))
    }
}

impl CatalogStore for FlatFileCatalogStore {
    fn load_all(&self) -> spoolscale_core::Result<Vec<SpoolRecord>> {
        Ok(self.read_file()?.stored.records)
    }

    fn load_stored(&self) -> spoolscale_core::Result<StoredRecords> {
        Ok(self.read_file()?.stored)
    }

    fn upsert(&mut self, record: &SpoolRecord) -> spoolscale_core::Result<()> {
        self.merge(std::slice::from_ref(record))?;
        tracing::debug!("Stored spool [{}]", record.spool_id);
        Ok(())
    }

    fn upsert_all(&mut self, records: &[SpoolRecord]) -> spoolscale_core::Result<()> {
        self.merge(records)?;
        tracing::debug!("Stored {} spools", records.len());
        Ok(())
    }
}
