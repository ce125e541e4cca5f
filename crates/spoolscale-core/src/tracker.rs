//! Active spool tracking
//!
//! Resolves the mounted spool from settings, derives its physical metrics,
//! and applies consumption updates.
//!
//! ```text
//! Unresolved --load--> Resolved(record)
//!                  \--> NotFound(id)   (id set, absent from catalog)
//!                  \--> NoneSet        (no id set)
//! ```

use crate::data::catalog::SpoolCatalog;
use crate::data::spool::{normalize_id, SpoolRecord};
use crate::error::{CatalogError, ConversionError, Result, TrackerError};
use crate::settings::Settings;
use crate::units::{self, ConversionWarning};
use chrono::{DateTime, Utc};
use serde::Serialize;

/// Tunables for consumption tracking
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrackerOptions {
    /// Largest weight increase (g) accepted as load-cell jitter
    pub noise_tolerance_g: f64,
}

impl Default for TrackerOptions {
    fn default() -> Self {
        Self {
            noise_tolerance_g: 5.0,
        }
    }
}

/// State of the active spool slot
#[derive(Debug, Clone, PartialEq)]
pub enum ActiveSpool {
    /// Settings not loaded yet
    Unresolved,
    /// Active spool found in the catalog
    Resolved(SpoolRecord),
    /// Settings name a spool the catalog does not have
    NotFound(String),
    /// Settings explicitly have no active spool
    NoneSet,
}

impl ActiveSpool {
    /// Short state name for messages
    pub fn name(&self) -> &'static str {
        match self {
            Self::Unresolved => "unresolved",
            Self::Resolved(_) => "resolved",
            Self::NotFound(_) => "not found",
            Self::NoneSet => "none set",
        }
    }
}

/// Metrics derived from a live scale reading
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LiveReading {
    /// Sample as delivered by the sensor (g)
    pub raw_sample_g: f64,
    /// Sample after calibration offset and extra weight (g)
    pub corrected_gross_g: f64,
    /// Filament on the spool according to the scale (g)
    pub net_weight_g: f64,
    /// Stored net weight minus live net weight (g)
    pub weight_difference_g: f64,
    /// Filament volume according to the scale (cm³)
    pub volume_cm3: f64,
    /// Filament length according to the scale (m)
    pub length_m: f64,
    /// Stored length minus live length (mm)
    pub length_difference_mm: f64,
}

/// Physical state of the active spool
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SpoolMetrics {
    /// Spool id
    pub spool_id: String,
    /// Display label
    pub name: String,
    /// Filament diameter (mm)
    pub diameter_mm: f64,
    /// Material density (g/cm³)
    pub density_g_cm3: f64,
    /// Filament cross-section (mm²)
    pub cross_section_mm2: f64,
    /// Filament on a full spool (g)
    pub total_net_weight_g: f64,
    /// Filament volume on a full spool (cm³)
    pub total_volume_cm3: f64,
    /// Filament length on a full spool (m)
    pub total_length_m: f64,
    /// Filament remaining according to the catalog (g)
    pub stored_net_weight_g: f64,
    /// Volume remaining according to the catalog (cm³)
    pub stored_volume_cm3: f64,
    /// Length remaining according to the catalog (m)
    pub stored_length_m: f64,
    /// Present when a live sample was supplied
    pub live: Option<LiveReading>,
    /// Best estimate of filament remaining (g)
    pub remaining_weight_g: f64,
    /// Best estimate of length remaining (m)
    pub remaining_length_m: f64,
    /// Filament consumed since the spool was full (g)
    pub used_weight_g: f64,
    /// Length consumed since the spool was full (m)
    pub used_length_m: f64,
    /// Spool-to-extruder path length from settings (mm)
    pub distance_to_extruder_mm: f64,
    /// Problems found while deriving the metrics
    pub warnings: Vec<ConversionWarning>,
}

/// Tracks the mounted spool
#[derive(Debug, Clone)]
pub struct ActiveSpoolTracker {
    state: ActiveSpool,
    settings: Settings,
    options: TrackerOptions,
}

impl ActiveSpoolTracker {
    /// Create an unresolved tracker
    pub fn new(options: TrackerOptions) -> Self {
        Self {
            state: ActiveSpool::Unresolved,
            settings: Settings::default(),
            options,
        }
    }

    /// Resolve the active spool from settings and catalog
    ///
    /// A missing spool is a state, not an error; operations that need a
    /// record fail later with [`TrackerError::ActiveSpoolNotFound`]. A found
    /// record that violates its invariants is an error.
    ///
    /// On error the tracker is left `Unresolved`.
    pub fn load(&mut self, settings: &Settings, catalog: &SpoolCatalog) -> Result<&ActiveSpool> {
        self.state = ActiveSpool::Unresolved;
        let state = match settings.active_spool_id.as_deref() {
            None => {
                tracing::info!("No active spool set");
                ActiveSpool::NoneSet
            }
            Some(id) => match catalog.find_by_id(id) {
                Some(record) => {
                    record.validate()?;
                    tracing::debug!("Found spool data for [{}]", record.spool_id);
                    ActiveSpool::Resolved(record.clone())
                }
                None => {
                    if let Some(err) = catalog.rejection(id) {
                        tracing::error!("Active spool failed validation: {}", err);
                        return Err(err.clone().into());
                    }
                    let id = normalize_id(id);
                    tracing::error!("Spool [{}] not found in spool data", id);
                    ActiveSpool::NotFound(id)
                }
            },
        };
        self.settings = settings.clone();
        self.state = state;
        Ok(&self.state)
    }

    /// Current state
    pub fn state(&self) -> &ActiveSpool {
        &self.state
    }

    /// Settings captured by the last [`ActiveSpoolTracker::load`]
    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// The resolved record
    pub fn active(&self) -> std::result::Result<&SpoolRecord, TrackerError> {
        match &self.state {
            ActiveSpool::Resolved(record) => Ok(record),
            other => Err(state_error(other)),
        }
    }

    fn active_mut(&mut self) -> std::result::Result<&mut SpoolRecord, TrackerError> {
        match self.state {
            ActiveSpool::Resolved(ref mut record) => Ok(record),
            ref other => Err(state_error(other)),
        }
    }

    /// Gross spool weight implied by a raw sensor sample
    pub fn corrected_gross_weight(&self, raw_sample_g: f64) -> f64 {
        raw_sample_g + self.settings.calibration_offset - self.settings.extra_weight
    }

    /// Derive the physical state of the active spool
    ///
    /// Without a sample only the stored catalog weight is used. With one,
    /// the calibration offset and extra weight are applied first and the
    /// live values become the remaining estimates.
    pub fn compute_live_metrics(&self, live_weight_sample: Option<f64>) -> Result<SpoolMetrics> {
        let record = self.active()?;
        let mut warnings = Vec::new();

        let area = units::cross_section_area(record.diameter)?;
        let to_length = |weight_g: f64| -> std::result::Result<(f64, f64), ConversionError> {
            let volume = units::volume(weight_g, record.density)?;
            Ok((volume, units::length(volume, area)?))
        };

        let total_net = record.total_net_weight().max(0.0);
        let (total_volume, total_length) = to_length(total_net)?;

        let stored = units::remaining_net_weight(record);
        warnings.extend(stored.warning);
        let (stored_volume, stored_length) = to_length(stored.grams)?;

        let live = match live_weight_sample {
            Some(sample) => {
                let corrected = self.corrected_gross_weight(sample);
                let net = units::net_weight(&record.spool_id, corrected, record.spool_weight);
                warnings.extend(net.warning);
                let (volume, length) = to_length(net.grams)?;
                Some(LiveReading {
                    raw_sample_g: sample,
                    corrected_gross_g: corrected,
                    net_weight_g: net.grams,
                    weight_difference_g: stored.grams - net.grams,
                    volume_cm3: volume,
                    length_m: length,
                    length_difference_mm: (stored_length - length) * 1000.0,
                })
            }
            None => None,
        };

        let (remaining_weight, remaining_length) = match &live {
            Some(l) => (l.net_weight_g, l.length_m),
            None => (stored.grams, stored_length),
        };

        tracing::debug!("Calculated values for [{}]", record.spool_id);
        Ok(SpoolMetrics {
            spool_id: record.spool_id.clone(),
            name: record.display_name(),
            diameter_mm: record.diameter,
            density_g_cm3: record.density,
            cross_section_mm2: area,
            total_net_weight_g: total_net,
            total_volume_cm3: total_volume,
            total_length_m: total_length,
            stored_net_weight_g: stored.grams,
            stored_volume_cm3: stored_volume,
            stored_length_m: stored_length,
            live,
            remaining_weight_g: remaining_weight,
            remaining_length_m: remaining_length,
            used_weight_g: total_net - remaining_weight,
            used_length_m: total_length - remaining_length,
            distance_to_extruder_mm: self.settings.distance_to_extruder,
            warnings,
        })
    }

    /// Store a new gross remaining weight for the active spool
    pub fn record_consumption(&mut self, new_remaining_weight: f64) -> Result<&SpoolRecord> {
        self.record_consumption_at(new_remaining_weight, Utc::now())
    }

    /// [`ActiveSpoolTracker::record_consumption`] with an explicit clock
    ///
    /// Increases within the noise tolerance leave the weight unchanged.
    /// Readings just below the empty reel weight are clamped to it.
    pub fn record_consumption_at(
        &mut self,
        new_remaining_weight: f64,
        at: DateTime<Utc>,
    ) -> Result<&SpoolRecord> {
        let tolerance = self.options.noise_tolerance_g;
        let record = self.active_mut()?;
        let current = record.remaining_weight;

        if !new_remaining_weight.is_finite() {
            return Err(ConversionError::InvalidWeight {
                weight_g: new_remaining_weight,
            }
            .into());
        }
        if new_remaining_weight > current + tolerance {
            return Err(TrackerError::MonotonicityViolation {
                current_g: current,
                requested_g: new_remaining_weight,
                tolerance_g: tolerance,
            }
            .into());
        }

        let mut next = new_remaining_weight.min(current);
        if next < record.spool_weight {
            if next < record.spool_weight - tolerance {
                return Err(CatalogError::DataIntegrity {
                    spool_id: record.spool_id.clone(),
                    reason: format!(
                        "remaining weight {} g is below the empty spool weight {} g",
                        next, record.spool_weight
                    ),
                }
                .into());
            }
            next = record.spool_weight;
        }

        record.remaining_weight = next;
        stamp_use(record, at);
        tracing::info!(
            "Recorded [{}] remaining weight {:.2} g (was {:.2} g)",
            record.spool_id,
            next,
            current
        );
        Ok(record)
    }

    /// Mark the start of a print on the active spool
    pub fn start_print(&mut self) -> Result<&SpoolRecord> {
        self.start_print_at(Utc::now())
    }

    /// [`ActiveSpoolTracker::start_print`] with an explicit clock
    pub fn start_print_at(&mut self, at: DateTime<Utc>) -> Result<&SpoolRecord> {
        let record = self.active_mut()?;
        if record.first_use.is_none() {
            record.first_use = Some(at);
            tracing::info!("First use of [{}]", record.spool_id);
        }
        Ok(record)
    }
}

fn state_error(state: &ActiveSpool) -> TrackerError {
    match state {
        ActiveSpool::NotFound(id) => TrackerError::ActiveSpoolNotFound {
            spool_id: id.clone(),
        },
        other => TrackerError::InvalidState {
            state: other.name().to_string(),
        },
    }
}

fn stamp_use(record: &mut SpoolRecord, at: DateTime<Utc>) {
    let first = *record.first_use.get_or_insert(at);
    record.last_use = Some(at.max(first));
}
