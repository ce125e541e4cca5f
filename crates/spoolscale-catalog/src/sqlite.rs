//! SQLite catalog storage
//!
//! One `spools` table with the same columns as the flat-file schema. An
//! existing table is checked column by column before use; databases left
//! over from older layouts are rejected rather than guessed at.
//!
//! Ids are compared without case. Tables created before the id column was
//! `COLLATE NOCASE` may hold case variants of one id; writing a record
//! removes them.

use crate::error::{CatalogDbError, CatalogDbResult};
use chrono::{DateTime, NaiveDate, SecondsFormat, Utc};
use rusqlite::{params, Connection, Row};
use spoolscale_core::data::flat::FlatSchema;
use spoolscale_core::data::spool::normalize_id;
use spoolscale_core::{CatalogError, CatalogStore, SpoolRecord, StoredRecords};
use std::fs;
use std::path::{Path, PathBuf};

const SCHEMA_SQL: &str = include_str!("schema.sql");
const TABLE: &str = "spools";
const DATE_FORMAT: &str = "%Y-%m-%d";

/// Spool catalog in a SQLite database
#[derive(Debug)]
pub struct SqliteCatalogStore {
    conn: Connection,
    db_path: PathBuf,
}

impl SqliteCatalogStore {
    /// Open or create the database at `path`
    pub fn open(path: &Path) -> CatalogDbResult<Self> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        if !path.exists() {
            tracing::info!("Spool database does not exist, creating {}", path.display());
        } else {
            tracing::debug!("Existing database found {}", path.display());
        }
        let conn = Connection::open(path)?;
        Self::init(conn, path.to_path_buf())
    }

    /// Open a private in-memory database
    pub fn open_in_memory() -> CatalogDbResult<Self> {
        Self::init(Connection::open_in_memory()?, PathBuf::from(":memory:"))
    }

    fn init(conn: Connection, db_path: PathBuf) -> CatalogDbResult<Self> {
        let columns = table_columns(&conn, TABLE)?;
        if columns.is_empty() {
            conn.execute_batch(SCHEMA_SQL)?;
        } else {
            check_columns(&columns)?;
        }
        Ok(Self { conn, db_path })
    }

    /// Database location
    pub fn path(&self) -> &Path {
        &self.db_path
    }

    /// Number of stored spools
    pub fn count(&self) -> CatalogDbResult<usize> {
        let n: i64 = self
            .conn
            .query_row(&format!("SELECT COUNT(*) FROM {}", TABLE), [], |row| row.get(0))?;
        Ok(n as usize)
    }

    /// Read every row; rows that fail to decode are listed, not fatal
    fn read_all(&self) -> CatalogDbResult<StoredRecords> {
        let sql = format!(
            "SELECT {} FROM {} ORDER BY spool_id",
            FlatSchema::CURRENT.columns().join(", "),
            TABLE
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt.query_map([], |row| {
            let id = normalize_id(&row.get::<_, String>(0)?);
            let decoded = decode_row(row, id.clone());
            Ok((id, decoded))
        })?;

        let mut stored = StoredRecords::default();
        for row in rows {
            let (id, decoded) = row?;
            match decoded
                .map_err(CatalogDbError::from)
                .and_then(StoredRow::into_record)
            {
                Ok(record) => stored.records.push(record),
                Err(e) => {
                    tracing::warn!("Skipping stored spool [{}]: {}", id, e);
                    stored.rejected.push((id.clone(), rejection(id, e)));
                }
            }
        }
        tracing::debug!(
            "Read {} spools from {} ({} undecodable)",
            stored.records.len(),
            self.db_path.display(),
            stored.rejected.len()
        );
        Ok(stored)
    }

    fn write_all(&mut self, records: &[SpoolRecord]) -> CatalogDbResult<()> {
        let tx = self.conn.transaction()?;
        for record in records {
            write_record(&tx, record)?;
        }
        tx.commit()?;
        Ok(())
    }
}

impl CatalogStore for SqliteCatalogStore {
    fn load_all(&self) -> spoolscale_core::Result<Vec<SpoolRecord>> {
        Ok(self.read_all()?.records)
    }

    fn load_stored(&self) -> spoolscale_core::Result<StoredRecords> {
        Ok(self.read_all()?)
    }

    fn upsert(&mut self, record: &SpoolRecord) -> spoolscale_core::Result<()> {
        self.write_all(std::slice::from_ref(record))?;
        tracing::debug!("Stored spool [{}]", record.spool_id);
        Ok(())
    }

    fn upsert_all(&mut self, records: &[SpoolRecord]) -> spoolscale_core::Result<()> {
        self.write_all(records)?;
        tracing::debug!("Stored {} spools", records.len());
        Ok(())
    }
}

/// Row as stored, before text columns are decoded
struct StoredRow {
    record: SpoolRecord,
    purchase_date: Option<String>,
    first_use: Option<String>,
    last_use: Option<String>,
}

impl StoredRow {
    fn into_record(self) -> CatalogDbResult<SpoolRecord> {
        let mut record = self.record;
        let id = record.spool_id.clone();
        let invalid = |column: &str, reason: String| CatalogDbError::InvalidValue {
            spool_id: id.clone(),
            column: column.to_string(),
            reason,
        };

        record.purchase_date = match non_empty(self.purchase_date) {
            Some(raw) => Some(
                NaiveDate::parse_from_str(&raw, DATE_FORMAT)
                    .map_err(|e| invalid("purchase_date", format!("'{}': {}", raw, e)))?,
            ),
            None => None,
        };
        record.first_use = parse_time(self.first_use).map_err(|e| invalid("first_use", e))?;
        record.last_use = parse_time(self.last_use).map_err(|e| invalid("last_use", e))?;
        Ok(record)
    }
}

fn decode_row(row: &Row<'_>, spool_id: String) -> rusqlite::Result<StoredRow> {
    Ok(StoredRow {
        record: SpoolRecord {
            spool_id,
            material_type: row.get(1)?,
            color: row.get::<_, Option<String>>(2)?.unwrap_or_default(),
            manufacturer: row.get::<_, Option<String>>(3)?.unwrap_or_default(),
            density: row.get(4)?,
            diameter: row.get(5)?,
            total_weight: row.get(6)?,
            spool_weight: row.get(7)?,
            remaining_weight: row.get(8)?,
            purchase_date: None,
            first_use: None,
            last_use: None,
            purchased_from: row.get(12)?,
            spool_cost: row.get(13)?,
            cost_per_gram: row.get(14)?,
        },
        purchase_date: row.get(9)?,
        first_use: row.get(10)?,
        last_use: row.get(11)?,
    })
}

fn rejection(spool_id: String, err: CatalogDbError) -> CatalogError {
    let reason = match err {
        CatalogDbError::InvalidValue { column, reason, .. } => format!("{}: {}", column, reason),
        other => other.to_string(),
    };
    CatalogError::DataIntegrity { spool_id, reason }
}

/// Ids stored under another spelling of `spool_id`
fn case_variants(conn: &Connection, spool_id: &str) -> rusqlite::Result<Vec<String>> {
    let mut stmt = conn.prepare(&format!("SELECT spool_id FROM {}", TABLE))?;
    let ids = stmt.query_map([], |row| row.get::<_, String>(0))?;
    let mut variants = Vec::new();
    for id in ids {
        let id = id?;
        if id != spool_id && normalize_id(&id) == spool_id {
            variants.push(id);
        }
    }
    Ok(variants)
}

fn write_record(conn: &Connection, record: &SpoolRecord) -> rusqlite::Result<usize> {
    for variant in case_variants(conn, &record.spool_id)? {
        tracing::info!("Replacing spool [{}] stored as [{}]", record.spool_id, variant);
        conn.execute(
            &format!("DELETE FROM {} WHERE spool_id = ?1 COLLATE BINARY", TABLE),
            params![variant],
        )?;
    }

    let columns = FlatSchema::CURRENT.columns();
    let placeholders = (1..=columns.len())
        .map(|i| format!("?{}", i))
        .collect::<Vec<_>>()
        .join(", ");
    conn.execute(
        &format!(
            "INSERT OR REPLACE INTO {} ({}) VALUES ({})",
            TABLE,
            columns.join(", "),
            placeholders
        ),
        params![
            record.spool_id,
            record.material_type,
            record.color,
            record.manufacturer,
            record.density,
            record.diameter,
            record.total_weight,
            record.spool_weight,
            record.remaining_weight,
            record
                .purchase_date
                .map(|d| d.format(DATE_FORMAT).to_string()),
            record.first_use.map(format_time),
            record.last_use.map(format_time),
            record.purchased_from,
            record.spool_cost,
            record.cost_per_gram,
        ],
    )
}

fn table_columns(conn: &Connection, table: &str) -> rusqlite::Result<Vec<String>> {
    let mut stmt = conn.prepare(&format!("PRAGMA table_info({})", table))?;
    let rows = stmt.query_map([], |row| row.get::<_, String>(1))?;
    rows.collect()
}

fn check_columns(found: &[String]) -> CatalogDbResult<()> {
    let expected = FlatSchema::CURRENT.columns();
    let mut have: Vec<String> = found.iter().map(|c| c.to_lowercase()).collect();
    let mut want: Vec<String> = expected.iter().map(|c| c.to_string()).collect();
    have.sort();
    want.sort();
    if have != want {
        return Err(CatalogDbError::SchemaMismatch {
            table: TABLE.to_string(),
            expected: expected.join(", "),
            found: found.join(", "),
        });
    }
    Ok(())
}

fn parse_time(raw: Option<String>) -> Result<Option<DateTime<Utc>>, String> {
    match non_empty(raw) {
        Some(raw) => DateTime::parse_from_rfc3339(&raw)
            .map(|t| Some(t.with_timezone(&Utc)))
            .map_err(|e| format!("'{}': {}", raw, e)),
        None => Ok(None),
    }
}

fn format_time(value: DateTime<Utc>) -> String {
    value.to_rfc3339_opts(SecondsFormat::AutoSi, true)
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn sample(id: &str) -> SpoolRecord {
        let mut record = SpoolRecord::new(id, "PLA", 1.24, 1.75, 1000.0, 200.0);
        record.remaining_weight = 700.0;
        record.color = "Black".to_string();
        record
    }

    #[test]
    fn test_new_database_has_schema() {
        let store = SqliteCatalogStore::open_in_memory().unwrap();
        let columns = table_columns(&store.conn, TABLE).unwrap();
        assert_eq!(columns, FlatSchema::CURRENT.columns());
        assert_eq!(store.count().unwrap(), 0);
    }

    #[test]
    fn test_upsert_replaces_by_id() {
        let mut store = SqliteCatalogStore::open_in_memory().unwrap();
        let mut record = sample("PLA01");
        store.upsert(&record).unwrap();

        record.remaining_weight = 640.0;
        record.first_use = Some(Utc.with_ymd_and_hms(2024, 5, 1, 8, 30, 0).unwrap());
        record.last_use = record.first_use;
        store.upsert(&record).unwrap();

        assert_eq!(store.count().unwrap(), 1);
        assert_eq!(store.load_all().unwrap(), vec![record]);
    }

    #[test]
    fn test_bad_rows_are_listed_not_fatal() {
        let mut store = SqliteCatalogStore::open_in_memory().unwrap();
        store.upsert(&sample("PLA01")).unwrap();
        store
            .conn
            .execute_batch(
                "INSERT INTO spools (spool_id, material_type, density, diameter, total_weight, spool_weight, remaining_weight, first_use)
                 VALUES ('x1', 'PLA', 1.24, 1.75, 1000, 200, 700, 'yesterday');
                 INSERT INTO spools (spool_id, material_type, density, diameter, total_weight, spool_weight, remaining_weight)
                 VALUES ('X2', 'PLA', 'dense', 1.75, 1000, 200, 700);",
            )
            .unwrap();

        let stored = store.read_all().unwrap();
        assert_eq!(stored.records, vec![sample("PLA01")]);
        let rejected: Vec<_> = stored.rejected.iter().map(|(id, _)| id.as_str()).collect();
        assert_eq!(rejected, vec!["X1", "X2"]);
        assert!(matches!(
            &stored.rejected[0].1,
            CatalogError::DataIntegrity { reason, .. } if reason.starts_with("first_use")
        ));
    }

    #[test]
    fn test_upsert_replaces_case_variants() {
        let mut store = SqliteCatalogStore::open_in_memory().unwrap();
        store
            .conn
            .execute_batch(
                "INSERT INTO spools (spool_id, material_type, density, diameter, total_weight, spool_weight, remaining_weight)
                 VALUES ('pla01', 'PLA', 1.24, 1.75, 1000, 200, 900);",
            )
            .unwrap();
        assert_eq!(case_variants(&store.conn, "PLA01").unwrap(), vec!["pla01"]);

        store.upsert(&sample("PLA01")).unwrap();
        assert_eq!(store.count().unwrap(), 1);
        assert_eq!(store.load_all().unwrap(), vec![sample("PLA01")]);
        assert!(case_variants(&store.conn, "PLA01").unwrap().is_empty());
    }

    #[test]
    fn test_check_columns_ignores_order_and_case() {
        let mut columns: Vec<String> = FlatSchema::CURRENT
            .columns()
            .iter()
            .rev()
            .map(|c| c.to_uppercase())
            .collect();
        assert!(check_columns(&columns).is_ok());

        columns.push("total_volume".to_string());
        assert!(matches!(
            check_columns(&columns),
            Err(CatalogDbError::SchemaMismatch { .. })
        ));
    }
}
