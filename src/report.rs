//! Command output
//!
//! Every command produces a [`Report`]. Reports are rendered as plain text
//! (the default) or JSON and written to stdout; logging goes to stderr.

use serde::Serialize;
use spoolscale_core::units::{format_length_m, format_weight_g};
use spoolscale_core::{CalibrationResult, SkippedRecord, SpoolMetrics, SpoolRecord};
use std::fmt::Write;
use std::path::PathBuf;

/// One catalog spool in a listing
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ListEntry {
    /// Spool id
    pub spool_id: String,
    /// Display label
    pub name: String,
    /// Filament left (g)
    pub remaining_weight_g: f64,
    /// Length left (m)
    pub remaining_length_m: f64,
    /// Whether this is the active spool
    pub active: bool,
}

/// Result of a command
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "report", rename_all = "snake_case")]
pub enum Report {
    /// Active spool state
    Metrics(SpoolMetrics),
    /// The active spool was cleared
    Unloaded,
    /// A print started on the active spool
    PrintStarted {
        /// The updated record
        record: SpoolRecord,
    },
    /// Consumption was recorded at the end of a print
    PrintEnded {
        /// Remaining gross weight before the print (g)
        previous_weight_g: f64,
        /// Filament consumed by the print (g)
        used_weight_g: f64,
        /// Metrics after the update
        metrics: SpoolMetrics,
    },
    /// A new calibration offset was stored
    Calibrated(CalibrationResult),
    /// Spools were imported
    Imported {
        /// Records added or replaced
        imported: usize,
        /// Rows dropped for failing validation
        skipped: Vec<SkippedRecord>,
    },
    /// The catalog was exported to a file
    Exported {
        /// Output file
        path: PathBuf,
        /// Number of spools written
        count: usize,
    },
    /// The catalog as comma-separated text
    ExportText {
        /// Rendered rows
        text: String,
    },
    /// Catalog listing
    List {
        /// One entry per spool, ordered by id
        spools: Vec<ListEntry>,
    },
}

/// Render a report for the terminal
pub fn render(report: &Report, json: bool, verbose: bool) -> serde_json::Result<String> {
    // exported text is data, not a report
    if let Report::ExportText { text } = report {
        return Ok(text.clone());
    }
    if json {
        let mut out = serde_json::to_string_pretty(report)?;
        out.push('\n');
        return Ok(out);
    }
    Ok(render_text(report, verbose))
}

/// Plain text rendering
pub fn render_text(report: &Report, verbose: bool) -> String {
    let mut out = String::new();
    match report {
        Report::Metrics(metrics) => write_metrics(&mut out, metrics, verbose),
        Report::Unloaded => out.push_str("No active spool\n"),
        Report::PrintStarted { record } => {
            let _ = writeln!(out, "Print started on {}", record.display_name());
            if let Some(first) = record.first_use {
                let _ = writeln!(out, "First Use: {}", first.format("%Y-%m-%d %H:%M:%S UTC"));
            }
        }
        Report::PrintEnded {
            previous_weight_g,
            used_weight_g,
            metrics,
        } => {
            let _ = writeln!(out, "Previous Spool Weight: {}", format_weight_g(*previous_weight_g));
            let _ = writeln!(out, "Print Used: {}", format_weight_g(*used_weight_g));
            write_metrics(&mut out, metrics, verbose);
        }
        Report::Calibrated(result) => {
            let _ = writeln!(out, "Reference Weight: {}", format_weight_g(result.expected));
            let _ = writeln!(
                out,
                "Measured Weight: {} ({} samples)",
                format_weight_g(result.reading),
                result.samples
            );
            let _ = writeln!(out, "Previous Calibration Offset: {}", format_weight_g(result.previous_offset));
            let _ = writeln!(out, "New Calibration Offset: {}", format_weight_g(result.new_offset));
        }
        Report::Imported { imported, skipped } => {
            let _ = writeln!(out, "Imported {} spools", imported);
            for s in skipped {
                let _ = writeln!(out, "Skipped row {} [{}]: {}", s.row, s.spool_id, s.reason);
            }
        }
        Report::Exported { path, count } => {
            let _ = writeln!(out, "Exported {} spools to {}", count, path.display());
        }
        Report::ExportText { text } => out.push_str(text),
        Report::List { spools } => {
            if spools.is_empty() {
                out.push_str("No spools in catalog\n");
            }
            for s in spools {
                let _ = writeln!(
                    out,
                    "{} {:<32} {:>12} {:>12}",
                    if s.active { "*" } else { " " },
                    s.name,
                    format_weight_g(s.remaining_weight_g),
                    format_length_m(s.remaining_length_m)
                );
            }
        }
    }
    out
}

fn write_metrics(out: &mut String, m: &SpoolMetrics, verbose: bool) {
    let _ = writeln!(out, "Loaded Spool: {}", m.name);
    if verbose {
        let _ = writeln!(out, "Filament Diameter: {:.2} mm", m.diameter_mm);
        let _ = writeln!(out, "Filament Density: {} g/cm^3", m.density_g_cm3);
        let _ = writeln!(out, "Filament Cross-Section Area: {:.5} mm^2", m.cross_section_mm2);
        let _ = writeln!(out, "Full Filament Weight: {}", format_weight_g(m.total_net_weight_g));
        let _ = writeln!(out, "Full Filament Volume: {:.3} cm^3", m.total_volume_cm3);
        let _ = writeln!(out, "Full Filament Length: {}", format_length_m(m.total_length_m));
    }

    let _ = writeln!(out, "Stored Remaining Weight: {}", format_weight_g(m.stored_net_weight_g));
    let _ = writeln!(out, "Stored Remaining Length: {}", format_length_m(m.stored_length_m));

    match &m.live {
        Some(live) => {
            let _ = writeln!(out, "Current Filament Weight: {}", format_weight_g(live.net_weight_g));
            let _ = writeln!(out, "Current Weight Difference: {}", format_weight_g(live.weight_difference_g));
            if verbose {
                let _ = writeln!(out, "Current Filament Volume: {:.3} cm^3", live.volume_cm3);
            }
            let _ = writeln!(out, "Current Filament Length: {}", format_length_m(live.length_m));
            let _ = writeln!(out, "Current Length Difference: {:.3} mm", live.length_difference_mm);
        }
        None => out.push_str("Current Filament Weight: unavailable, using stored weight\n"),
    }

    let _ = writeln!(out, "Total Length Used: {}", format_length_m(m.used_length_m));
    if verbose && m.distance_to_extruder_mm > 0.0 {
        let _ = writeln!(out, "Distance To Extruder: {:.1} mm", m.distance_to_extruder_mm);
    }
    for warning in &m.warnings {
        let _ = writeln!(out, "Warning: {}", warning);
    }
}
