//! Filament unit conversion
//!
//! Converts between filament weight, volume, and length given a material
//! density and a filament diameter. All functions are pure.
//!
//! Units used throughout:
//! - weight in grams (g)
//! - density in g/cm³
//! - diameter in millimeters, cross-section in mm²
//! - volume in cm³
//! - length in meters

use crate::data::spool::SpoolRecord;
use crate::error::ConversionError;
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;
use std::fmt;

/// mm³ per cm³
const MM3_PER_CM3: f64 = 1000.0;
/// mm per m
const MM_PER_M: f64 = 1000.0;

/// Non-fatal problems noticed while deriving a quantity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ConversionWarning {
    /// Net filament weight came out negative and was clamped to zero
    NegativeRemainingWeight {
        /// Spool the weight belongs to
        spool_id: String,
        /// The unclamped net weight
        net_weight_g: f64,
    },
}

impl fmt::Display for ConversionWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NegativeRemainingWeight {
                spool_id,
                net_weight_g,
            } => write!(
                f,
                "Spool {} has negative net weight {:.2} g, clamped to 0",
                spool_id, net_weight_g
            ),
        }
    }
}

/// Net filament weight, clamped to zero, plus the warning raised if clamping happened
#[derive(Debug, Clone, PartialEq)]
pub struct NetWeight {
    /// Filament weight in grams, never negative
    pub grams: f64,
    /// Set when the raw value was negative
    pub warning: Option<ConversionWarning>,
}

/// Cross-sectional area of filament in mm²
///
/// * `diameter_mm` - Filament diameter in millimeters
pub fn cross_section_area(diameter_mm: f64) -> Result<f64, ConversionError> {
    if !diameter_mm.is_finite() || diameter_mm <= 0.0 {
        return Err(ConversionError::InvalidGeometry {
            reason: format!("diameter {} mm must be > 0", diameter_mm),
        });
    }
    let radius = diameter_mm / 2.0;
    Ok(PI * radius * radius)
}

/// Volume of filament in cm³ for a weight and density
///
/// * `weight_g` - Weight in grams
/// * `density_g_per_cm3` - Material density in g/cm³
pub fn volume(weight_g: f64, density_g_per_cm3: f64) -> Result<f64, ConversionError> {
    if !density_g_per_cm3.is_finite() || density_g_per_cm3 <= 0.0 {
        return Err(ConversionError::InvalidDensity {
            density: density_g_per_cm3,
        });
    }
    if !weight_g.is_finite() || weight_g < 0.0 {
        return Err(ConversionError::InvalidWeight { weight_g });
    }
    Ok(weight_g / density_g_per_cm3)
}

/// Length of filament in meters for a volume and cross-section
///
/// * `volume_cm3` - Volume in cm³
/// * `cross_section_mm2` - Cross-sectional area in mm²
pub fn length(volume_cm3: f64, cross_section_mm2: f64) -> Result<f64, ConversionError> {
    if !cross_section_mm2.is_finite() || cross_section_mm2 <= 0.0 {
        return Err(ConversionError::InvalidGeometry {
            reason: format!("cross-section {} mm² must be > 0", cross_section_mm2),
        });
    }
    let volume_mm3 = volume_cm3 * MM3_PER_CM3;
    let length_mm = volume_mm3 / cross_section_mm2;
    Ok(length_mm / MM_PER_M)
}

/// Length of filament in meters for a weight of a given material
pub fn length_for_weight(
    weight_g: f64,
    density_g_per_cm3: f64,
    diameter_mm: f64,
) -> Result<f64, ConversionError> {
    let area = cross_section_area(diameter_mm)?;
    let volume_cm3 = volume(weight_g, density_g_per_cm3)?;
    length(volume_cm3, area)
}

/// Weight of filament in grams for a length of a given material
pub fn weight_for_length(
    length_m: f64,
    density_g_per_cm3: f64,
    diameter_mm: f64,
) -> Result<f64, ConversionError> {
    if !density_g_per_cm3.is_finite() || density_g_per_cm3 <= 0.0 {
        return Err(ConversionError::InvalidDensity {
            density: density_g_per_cm3,
        });
    }
    let area = cross_section_area(diameter_mm)?;
    let volume_cm3 = length_m * MM_PER_M * area / MM3_PER_CM3;
    Ok(volume_cm3 * density_g_per_cm3)
}

/// Filament weight left on a spool, excluding the reel
///
/// Negative values mean the record is inconsistent. They are clamped to
/// zero and reported through [`NetWeight::warning`].
pub fn remaining_net_weight(record: &SpoolRecord) -> NetWeight {
    net_weight(&record.spool_id, record.remaining_weight, record.spool_weight)
}

/// Net weight for an arbitrary gross reading of a spool
pub fn net_weight(spool_id: &str, gross_weight_g: f64, spool_weight_g: f64) -> NetWeight {
    let raw = gross_weight_g - spool_weight_g;
    if raw < 0.0 {
        let warning = ConversionWarning::NegativeRemainingWeight {
            spool_id: spool_id.to_string(),
            net_weight_g: raw,
        };
        tracing::warn!("{}", warning);
        NetWeight {
            grams: 0.0,
            warning: Some(warning),
        }
    } else {
        NetWeight {
            grams: raw,
            warning: None,
        }
    }
}

/// Format a length in meters for display
pub fn format_length_m(value_m: f64) -> String {
    format!("{:.3} m", value_m)
}

/// Format a weight in grams for display
pub fn format_weight_g(value_g: f64) -> String {
    format!("{:.2} g", value_g)
}
