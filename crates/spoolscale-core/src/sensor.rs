//! Load-cell weight sources
//!
//! The core never talks to the HX711 directly. A [`SensorSource`] produces a
//! gram reading within a timeout or reports why it could not.

use crate::calibration::most_frequent;
use crate::error::SensorError;
use std::collections::VecDeque;
use std::io::Read;
use std::process::{Command, Stdio};
use std::time::Duration;
use wait_timeout::ChildExt;

/// Something that can weigh the spool
pub trait SensorSource {
    /// Take one reading in grams, waiting at most `timeout`
    fn sample_weight(&mut self, timeout: Duration) -> Result<f64, SensorError>;
}

/// Sample the sensor, returning `None` when no reading is available
///
/// Sensor failures are logged and never propagated, so callers can fall
/// back to catalog-only metrics.
pub fn sample_or_fallback(sensor: &mut dyn SensorSource, timeout: Duration) -> Option<f64> {
    match sensor.sample_weight(timeout) {
        Ok(weight) => {
            tracing::debug!("Live weight sample: {:.3} g", weight);
            Some(weight)
        }
        Err(e) => {
            tracing::warn!("{}; using stored catalog weight", e);
            None
        }
    }
}

/// Sensor that always returns the same reading
#[derive(Debug, Clone, Copy)]
pub struct FixedSensor(pub f64);

impl SensorSource for FixedSensor {
    fn sample_weight(&mut self, _timeout: Duration) -> Result<f64, SensorError> {
        Ok(self.0)
    }
}

/// Sensor used when no sampler is configured
#[derive(Debug, Clone, Default)]
pub struct UnavailableSensor;

impl SensorSource for UnavailableSensor {
    fn sample_weight(&mut self, _timeout: Duration) -> Result<f64, SensorError> {
        Err(SensorError::Unavailable {
            reason: "no sampler command configured".to_string(),
        })
    }
}

/// Sensor that replays a fixed list of outcomes, then times out
#[derive(Debug, Clone, Default)]
pub struct SequenceSensor {
    outcomes: VecDeque<Result<f64, SensorError>>,
}

impl SequenceSensor {
    /// Replay the given outcomes in order
    pub fn new(outcomes: impl IntoIterator<Item = Result<f64, SensorError>>) -> Self {
        Self {
            outcomes: outcomes.into_iter().collect(),
        }
    }

    /// Replay the given readings in order
    pub fn from_readings(readings: impl IntoIterator<Item = f64>) -> Self {
        Self::new(readings.into_iter().map(Ok))
    }
}

impl SensorSource for SequenceSensor {
    fn sample_weight(&mut self, timeout: Duration) -> Result<f64, SensorError> {
        self.outcomes.pop_front().unwrap_or(Err(SensorError::Timeout {
            timeout_ms: timeout.as_millis() as u64,
        }))
    }
}

/// Sensor backed by an external sampler program
///
/// The program prints one or more whitespace-separated gram readings on
/// stdout; the most frequent one is used. `{out_pin}` and `{clk_pin}` in the
/// arguments are replaced with the configured HX711 pins. A program that
/// outlives the timeout is killed.
#[derive(Debug, Clone)]
pub struct CommandSensor {
    program: String,
    args: Vec<String>,
}

impl CommandSensor {
    /// Create a sampler invocation
    pub fn new(program: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
        }
    }

    /// Substitute pin placeholders in the arguments
    pub fn with_pins(mut self, out_pin: u8, clk_pin: u8) -> Self {
        self.args = self
            .args
            .iter()
            .map(|a| {
                a.replace("{out_pin}", &out_pin.to_string())
                    .replace("{clk_pin}", &clk_pin.to_string())
            })
            .collect();
        self
    }

    /// Arguments after placeholder substitution
    pub fn args(&self) -> &[String] {
        &self.args
    }
}

impl SensorSource for CommandSensor {
    fn sample_weight(&mut self, timeout: Duration) -> Result<f64, SensorError> {
        tracing::debug!("Running sampler {} {:?}", self.program, self.args);
        let mut child = Command::new(&self.program)
            .args(&self.args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|e| SensorError::Unavailable {
                reason: format!("failed to start {}: {}", self.program, e),
            })?;

        let status = match child.wait_timeout(timeout) {
            Ok(Some(status)) => status,
            Ok(None) => {
                let _ = child.kill();
                let _ = child.wait();
                return Err(SensorError::Timeout {
                    timeout_ms: timeout.as_millis() as u64,
                });
            }
            Err(e) => {
                let _ = child.kill();
                return Err(SensorError::Unavailable {
                    reason: e.to_string(),
                });
            }
        };

        if !status.success() {
            return Err(SensorError::Unavailable {
                reason: format!("{} exited with {}", self.program, status),
            });
        }

        let mut output = String::new();
        if let Some(mut stdout) = child.stdout.take() {
            stdout
                .read_to_string(&mut output)
                .map_err(|e| SensorError::Unavailable {
                    reason: e.to_string(),
                })?;
        }
        parse_readings(&output)
    }
}

/// Parse sampler output into a single reading
pub fn parse_readings(output: &str) -> Result<f64, SensorError> {
    let readings = output
        .split_whitespace()
        .map(|t| {
            t.parse::<f64>()
                .ok()
                .filter(|v| v.is_finite())
                .ok_or_else(|| SensorError::InvalidReading {
                    output: t.to_string(),
                })
        })
        .collect::<Result<Vec<_>, _>>()?;
    most_frequent(&readings)
}
