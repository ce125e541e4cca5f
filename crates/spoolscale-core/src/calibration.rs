//! Load-cell calibration
//!
//! With a known reference mass on the scale (and no spool), the difference
//! between what the scale should read and what it does read becomes the new
//! `calibration_offset`.

use crate::error::SensorError;
use crate::sensor::SensorSource;
use serde::Serialize;
use std::time::Duration;

/// Outcome of a calibration run
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CalibrationResult {
    /// Modal raw reading
    pub reading: f64,
    /// What the scale should have read
    pub expected: f64,
    /// Offset before calibration
    pub previous_offset: f64,
    /// Offset to store
    pub new_offset: f64,
    /// Number of samples taken
    pub samples: usize,
}

/// Most frequent value; ties go to the value seen first
pub fn most_frequent(values: &[f64]) -> Result<f64, SensorError> {
    let mut best: Option<(f64, usize)> = None;
    for value in values {
        let count = values.iter().filter(|v| *v == value).count();
        if best.map_or(true, |(_, c)| count > c) {
            best = Some((*value, count));
        }
    }
    best.map(|(v, _)| v).ok_or(SensorError::NoSamples)
}

/// Compute a new offset from raw samples of the reference mass
pub fn compute_offset(
    samples: &[f64],
    calibration_weight: f64,
    extra_weight: f64,
    previous_offset: f64,
) -> Result<CalibrationResult, SensorError> {
    let reading = most_frequent(samples)?;
    let expected = calibration_weight + extra_weight;
    Ok(CalibrationResult {
        reading,
        expected,
        previous_offset,
        new_offset: expected - reading,
        samples: samples.len(),
    })
}

/// Take `count` samples, failing on the first sensor error
pub fn collect_samples(
    sensor: &mut dyn SensorSource,
    count: usize,
    timeout: Duration,
) -> Result<Vec<f64>, SensorError> {
    let mut samples = Vec::with_capacity(count);
    for i in 0..count {
        let value = sensor.sample_weight(timeout)?;
        tracing::debug!("Calibration sample {}: {}", i + 1, value);
        samples.push(value);
    }
    Ok(samples)
}
