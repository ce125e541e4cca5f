//! Spool record
//!
//! One physical reel of filament: its material constants, weights, and
//! usage history.

use crate::error::CatalogError;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// Normalize a spool identifier for storage and comparison
pub fn normalize_id(id: &str) -> String {
    id.trim().to_uppercase()
}

/// Catalog entry for one spool
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpoolRecord {
    /// Unique identifier, stored uppercase
    pub spool_id: String,
    /// Material family (PLA, PETG, ...)
    pub material_type: String,
    /// Color name
    pub color: String,
    /// Filament brand
    pub manufacturer: String,
    /// Density in g/cm³
    pub density: f64,
    /// Filament diameter in mm
    pub diameter: f64,
    /// Gross weight of a full spool in grams (filament + reel)
    pub total_weight: f64,
    /// Weight of the empty reel in grams
    pub spool_weight: f64,
    /// Current gross weight in grams (filament + reel)
    pub remaining_weight: f64,
    /// Day the spool was bought
    #[serde(default)]
    pub purchase_date: Option<NaiveDate>,
    /// First time the spool was printed from
    #[serde(default)]
    pub first_use: Option<DateTime<Utc>>,
    /// Most recent consumption update
    #[serde(default)]
    pub last_use: Option<DateTime<Utc>>,
    /// Vendor or shop
    #[serde(default)]
    pub purchased_from: Option<String>,
    /// Price paid for the spool
    #[serde(default)]
    pub spool_cost: Option<f64>,
    /// Price per gram of filament
    #[serde(default)]
    pub cost_per_gram: Option<f64>,
}

impl SpoolRecord {
    /// Create a full, never-used spool
    pub fn new(
        spool_id: &str,
        material_type: impl Into<String>,
        density: f64,
        diameter: f64,
        total_weight: f64,
        spool_weight: f64,
    ) -> Self {
        Self {
            spool_id: normalize_id(spool_id),
            material_type: material_type.into(),
            color: String::new(),
            manufacturer: String::new(),
            density,
            diameter,
            total_weight,
            spool_weight,
            remaining_weight: total_weight,
            purchase_date: None,
            first_use: None,
            last_use: None,
            purchased_from: None,
            spool_cost: None,
            cost_per_gram: None,
        }
    }

    /// Human-readable label, e.g. `Black PLA [PLA01]`
    pub fn display_name(&self) -> String {
        let label = [self.color.as_str(), self.material_type.as_str()]
            .iter()
            .filter(|s| !s.is_empty())
            .copied()
            .collect::<Vec<_>>()
            .join(" ");
        if label.is_empty() {
            format!("[{}]", self.spool_id)
        } else {
            format!("{} [{}]", label, self.spool_id)
        }
    }

    /// Case-insensitive id comparison
    pub fn matches_id(&self, id: &str) -> bool {
        self.spool_id == normalize_id(id)
    }

    /// Filament weight of a full spool, excluding the reel
    pub fn total_net_weight(&self) -> f64 {
        self.total_weight - self.spool_weight
    }

    /// Check the record invariants
    pub fn validate(&self) -> Result<(), CatalogError> {
        let fail = |reason: String| {
            Err(CatalogError::DataIntegrity {
                spool_id: self.spool_id.clone(),
                reason,
            })
        };

        if self.spool_id.is_empty() {
            return fail("spool_id is empty".to_string());
        }
        if self.spool_id != normalize_id(&self.spool_id) {
            return fail("spool_id is not normalized".to_string());
        }
        if !(self.density.is_finite() && self.density > 0.0) {
            return fail(format!("density {} must be > 0", self.density));
        }
        if !(self.diameter.is_finite() && self.diameter > 0.0) {
            return fail(format!("diameter {} must be > 0", self.diameter));
        }
        for (name, value) in [
            ("total_weight", self.total_weight),
            ("spool_weight", self.spool_weight),
            ("remaining_weight", self.remaining_weight),
        ] {
            if !(value.is_finite() && value >= 0.0) {
                return fail(format!("{} {} must be >= 0", name, value));
            }
        }
        if self.spool_weight > self.remaining_weight {
            return fail(format!(
                "spool_weight {} exceeds remaining_weight {}",
                self.spool_weight, self.remaining_weight
            ));
        }
        if self.remaining_weight > self.total_weight {
            return fail(format!(
                "remaining_weight {} exceeds total_weight {}",
                self.remaining_weight, self.total_weight
            ));
        }
        if let (Some(first), Some(last)) = (self.first_use, self.last_use) {
            if first > last {
                return fail(format!("first_use {} is after last_use {}", first, last));
            }
        }
        Ok(())
    }
}
