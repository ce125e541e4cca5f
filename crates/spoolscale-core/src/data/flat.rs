//! Flat-file spool exchange
//!
//! This module provides the versioned column schema used to import and
//! export spool records as comma-separated text, plus conversion between
//! flat rows and [`SpoolRecord`]s.
//!
//! The first row is always a header. Unknown column sets are rejected
//! instead of being truncated or padded.

use crate::data::materials::MaterialLibrary;
use crate::data::spool::{normalize_id, SpoolRecord};
use crate::error::CatalogError;
use chrono::{DateTime, NaiveDate, SecondsFormat, Utc};
use serde::Serialize;
use std::collections::HashSet;

/// One flat record: a list of field values
pub type FlatRow = Vec<String>;

/// Version 1 column set, in file order
pub const V1_COLUMNS: [&str; 15] = [
    "spool_id",
    "material_type",
    "color",
    "manufacturer",
    "density",
    "diameter",
    "total_weight",
    "spool_weight",
    "remaining_weight",
    "purchase_date",
    "first_use",
    "last_use",
    "purchased_from",
    "spool_cost",
    "cost_per_gram",
];

const DATE_FORMAT: &str = "%Y-%m-%d";

/// Known flat column layouts
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlatSchema {
    /// Fifteen columns, see [`V1_COLUMNS`]
    V1,
}

impl FlatSchema {
    /// Schema written by this version
    pub const CURRENT: FlatSchema = FlatSchema::V1;

    /// Numeric schema version
    pub fn version(&self) -> u32 {
        match self {
            Self::V1 => 1,
        }
    }

    /// Column names in order
    pub fn columns(&self) -> &'static [&'static str] {
        match self {
            Self::V1 => &V1_COLUMNS,
        }
    }

    /// Header row for this schema
    pub fn header(&self) -> FlatRow {
        self.columns().iter().map(|c| c.to_string()).collect()
    }

    /// Identify the schema of a header row
    ///
    /// Column names are compared ignoring case and surrounding whitespace.
    pub fn detect<S: AsRef<str>>(header: &[S]) -> Result<Self, CatalogError> {
        let normalized: Vec<String> = header
            .iter()
            .map(|c| c.as_ref().trim().to_lowercase())
            .collect();

        if normalized.iter().map(String::as_str).eq(V1_COLUMNS.iter().copied()) {
            return Ok(Self::V1);
        }

        Err(CatalogError::SchemaMismatch {
            expected: format!("v1 columns [{}]", V1_COLUMNS.join(", ")),
            found: format!("{} columns [{}]", normalized.len(), normalized.join(", ")),
        })
    }
}

/// A row that parsed but broke a record invariant
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SkippedRecord {
    /// One-based row number
    pub row: usize,
    /// Id of the rejected spool
    pub spool_id: String,
    /// The violated invariant
    pub reason: String,
}

/// Output of [`records_from_rows`]
#[derive(Debug, Clone, Default)]
pub struct ParsedRows {
    /// Records that passed validation, in row order
    pub records: Vec<SpoolRecord>,
    /// Records dropped for failing validation
    pub skipped: Vec<SkippedRecord>,
}

/// Convert header + data rows into validated records
///
/// Fails on the first unparseable row so callers can import atomically.
/// Rows that parse but fail [`SpoolRecord::validate`] are reported in
/// [`ParsedRows::skipped`].
pub fn records_from_rows(
    rows: &[FlatRow],
    materials: &MaterialLibrary,
) -> Result<ParsedRows, CatalogError> {
    let (header, data) = rows.split_first().ok_or_else(|| CatalogError::SchemaMismatch {
        expected: "header row".to_string(),
        found: "no rows".to_string(),
    })?;
    let schema = FlatSchema::detect(header)?;

    let mut parsed = ParsedRows::default();
    let mut seen = HashSet::new();

    for (index, row) in data.iter().enumerate() {
        let row_number = index + 2;
        let record = row_to_record(schema, row, row_number, materials)?;

        if !seen.insert(record.spool_id.clone()) {
            return Err(CatalogError::MalformedRow {
                row: row_number,
                reason: format!("duplicate spool_id {}", record.spool_id),
            });
        }

        match record.validate() {
            Ok(()) => parsed.records.push(record),
            Err(e) => {
                tracing::warn!("Skipping row {}: {}", row_number, e);
                parsed.skipped.push(SkippedRecord {
                    row: row_number,
                    spool_id: record.spool_id,
                    reason: e.to_string(),
                });
            }
        }
    }

    Ok(parsed)
}

/// Parse a single data row
///
/// The id, numeric and date fields are trimmed. Text fields are kept
/// verbatim; an empty `purchased_from` reads as `None`.
pub fn row_to_record(
    schema: FlatSchema,
    row: &[String],
    row_number: usize,
    materials: &MaterialLibrary,
) -> Result<SpoolRecord, CatalogError> {
    let expected = schema.columns().len();
    if row.len() != expected {
        return Err(CatalogError::MalformedRow {
            row: row_number,
            reason: format!("expected {} columns, found {}", expected, row.len()),
        });
    }

    let malformed = |reason: String| CatalogError::MalformedRow {
        row: row_number,
        reason,
    };
    let field = |i: usize| row[i].trim();
    let text = |i: usize| row[i].clone();

    let spool_id = normalize_id(field(0));
    if spool_id.is_empty() {
        return Err(malformed("spool_id is empty".to_string()));
    }

    let material_type = text(1);
    let density = match parse_optional_f64(field(4), "density").map_err(malformed)? {
        Some(d) => d,
        None => materials.density_for(&material_type).ok_or_else(|| {
            malformed(format!(
                "density is empty and material '{}' has no reference density",
                material_type
            ))
        })?,
    };

    Ok(SpoolRecord {
        spool_id,
        material_type,
        color: text(2),
        manufacturer: text(3),
        density,
        diameter: parse_f64(field(5), "diameter").map_err(malformed)?,
        total_weight: parse_f64(field(6), "total_weight").map_err(malformed)?,
        spool_weight: parse_f64(field(7), "spool_weight").map_err(malformed)?,
        remaining_weight: parse_f64(field(8), "remaining_weight").map_err(malformed)?,
        purchase_date: parse_date(field(9)).map_err(malformed)?,
        first_use: parse_timestamp(field(10), "first_use").map_err(malformed)?,
        last_use: parse_timestamp(field(11), "last_use").map_err(malformed)?,
        purchased_from: non_empty(&row[12]),
        spool_cost: parse_optional_f64(field(13), "spool_cost").map_err(malformed)?,
        cost_per_gram: parse_optional_f64(field(14), "cost_per_gram").map_err(malformed)?,
    })
}

/// Render a record as a row of the current schema
pub fn record_to_row(record: &SpoolRecord) -> FlatRow {
    vec![
        record.spool_id.clone(),
        record.material_type.clone(),
        record.color.clone(),
        record.manufacturer.clone(),
        record.density.to_string(),
        record.diameter.to_string(),
        record.total_weight.to_string(),
        record.spool_weight.to_string(),
        record.remaining_weight.to_string(),
        record
            .purchase_date
            .map(|d| d.format(DATE_FORMAT).to_string())
            .unwrap_or_default(),
        record.first_use.map(format_timestamp).unwrap_or_default(),
        record.last_use.map(format_timestamp).unwrap_or_default(),
        record.purchased_from.clone().unwrap_or_default(),
        record.spool_cost.map(|v| v.to_string()).unwrap_or_default(),
        record.cost_per_gram.map(|v| v.to_string()).unwrap_or_default(),
    ]
}

fn parse_f64(value: &str, column: &str) -> Result<f64, String> {
    parse_optional_f64(value, column)?.ok_or_else(|| format!("{} is empty", column))
}

fn parse_optional_f64(value: &str, column: &str) -> Result<Option<f64>, String> {
    if value.is_empty() {
        return Ok(None);
    }
    let parsed: f64 = value
        .parse()
        .map_err(|e| format!("{} '{}': {}", column, value, e))?;
    if !parsed.is_finite() {
        return Err(format!("{} '{}' is not a finite number", column, value));
    }
    Ok(Some(parsed))
}

fn parse_date(value: &str) -> Result<Option<NaiveDate>, String> {
    if value.is_empty() {
        return Ok(None);
    }
    NaiveDate::parse_from_str(value, DATE_FORMAT)
        .map(Some)
        .map_err(|e| format!("purchase_date '{}': {}", value, e))
}

fn parse_timestamp(value: &str, column: &str) -> Result<Option<DateTime<Utc>>, String> {
    if value.is_empty() {
        return Ok(None);
    }
    DateTime::parse_from_rfc3339(value)
        .map(|t| Some(t.with_timezone(&Utc)))
        .map_err(|e| format!("{} '{}': {}", column, value, e))
}

fn format_timestamp(value: DateTime<Utc>) -> String {
    value.to_rfc3339_opts(SecondsFormat::AutoSi, true)
}

fn non_empty(value: &str) -> Option<String> {
    if value.is_empty() {
        None
    } else {
        Some(value.to_string())
    }
}

/// Split comma-separated text into rows
///
/// Double-quoted fields may contain commas, newlines, and `""` escapes.
/// Blank lines are ignored.
pub fn parse_text(text: &str) -> Result<Vec<FlatRow>, CatalogError> {
    let mut rows = Vec::new();
    let mut row: FlatRow = Vec::new();
    let mut field = String::new();
    let mut in_quotes = false;
    let mut quoted_field = false;
    let mut line = 1;
    let mut chars = text.chars().peekable();

    while let Some(c) = chars.next() {
        if in_quotes {
            match c {
                '"' if chars.peek() == Some(&'"') => {
                    field.push('"');
                    chars.next();
                }
                '"' => in_quotes = false,
                '\n' => {
                    line += 1;
                    field.push(c);
                }
                _ => field.push(c),
            }
            continue;
        }

        match c {
            '"' if field.is_empty() && !quoted_field => {
                in_quotes = true;
                quoted_field = true;
            }
            '"' => {
                return Err(CatalogError::MalformedRow {
                    row: rows.len() + 1,
                    reason: format!("unexpected quote on line {}", line),
                })
            }
            ',' => {
                row.push(std::mem::take(&mut field));
                quoted_field = false;
            }
            '\r' if chars.peek() == Some(&'\n') => {}
            '\n' => {
                line += 1;
                finish_row(&mut rows, &mut row, &mut field, quoted_field);
                quoted_field = false;
            }
            _ => field.push(c),
        }
    }

    if in_quotes {
        return Err(CatalogError::MalformedRow {
            row: rows.len() + 1,
            reason: "unterminated quoted field".to_string(),
        });
    }
    finish_row(&mut rows, &mut row, &mut field, quoted_field);

    Ok(rows)
}

fn finish_row(rows: &mut Vec<FlatRow>, row: &mut FlatRow, field: &mut String, quoted: bool) {
    if row.is_empty() && field.trim().is_empty() && !quoted {
        field.clear();
        return;
    }
    row.push(std::mem::take(field));
    rows.push(std::mem::take(row));
}

/// Join rows into comma-separated text, quoting where needed
pub fn render_text(rows: &[FlatRow]) -> String {
    let mut out = String::new();
    for row in rows {
        let line = row
            .iter()
            .map(|f| quote_field(f))
            .collect::<Vec<_>>()
            .join(",");
        out.push_str(&line);
        out.push('\n');
    }
    out
}

fn quote_field(field: &str) -> String {
    if field.contains([',', '"', '\n', '\r']) || field.trim() != field {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}
