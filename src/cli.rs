//! Command-line interface definition

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Version string with the build date
pub const LONG_VERSION: &str = concat!(env!("CARGO_PKG_VERSION"), " (built ", env!("BUILD_DATE"), ")");

#[derive(Debug, Parser)]
#[command(name = "spoolscale")]
#[command(version, long_version = LONG_VERSION)]
#[command(about = "Filament spool tracker for a load-cell scale", long_about = None)]
pub struct Cli {
    /// Config file (.toml or .json); defaults to the platform config dir
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Show detailed values and debug logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Print reports as JSON
    #[arg(long, global = true)]
    pub json: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Clone, PartialEq, Eq, Subcommand)]
pub enum Command {
    /// Report the active spool, corrected by a live scale reading when available
    Query,
    /// Make a spool active (`none` clears it)
    Load {
        /// Spool id, case-insensitive
        spool_id: String,
    },
    /// Mark the start of a print on the active spool
    #[command(name = "startprint")]
    StartPrint,
    /// Weigh the active spool and record what was used
    #[command(name = "endprint")]
    EndPrint,
    /// Derive a new calibration offset from the reference weight
    Calibrate,
    /// Import spools from a comma-separated file
    Import {
        /// File with a header row
        file: PathBuf,
    },
    /// Export the catalog as comma-separated text
    Export {
        /// Output file; stdout when omitted
        file: Option<PathBuf>,
    },
    /// List every spool in the catalog
    List,
}
