//! # Spoolscale
//!
//! Filament spool tracker for Klipper printers with a load-cell scale.
//!
//! ## Architecture
//!
//! Spoolscale is organized as a workspace with multiple crates:
//!
//! 1. **spoolscale-core** - Spool records, catalog, unit conversion, tracking
//! 2. **spoolscale-settings** - Application config and `saved_vars.cfg`
//! 3. **spoolscale-catalog** - SQLite and flat-file catalog storage
//! 4. **spoolscale** - Command-line binary that ties the crates together
//!
//! Reports go to stdout, logs to stderr.

pub mod app;
pub mod cli;
pub mod report;

use anyhow::Context;
use cli::Cli;
use spoolscale_core::{Error, ErrorKind};
use spoolscale_settings::Config;

pub use app::App;
pub use report::Report;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Build date (set at compile time)
pub const BUILD_DATE: &str = env!("BUILD_DATE");

/// Initialize logging
///
/// Honors `RUST_LOG`; the default level is `info`, or `debug` when
/// `verbose` is set. Output goes to stderr.
pub fn init_logging(verbose: bool) -> anyhow::Result<()> {
    use tracing_subscriber::fmt;
    use tracing_subscriber::prelude::*;
    use tracing_subscriber::EnvFilter;

    let level = if verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::INFO
    };
    let env_filter = EnvFilter::from_default_env().add_directive(level.into());

    let fmt_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(verbose)
        .with_level(true);

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .try_init()?;

    Ok(())
}

/// Run the command line, printing the report on success
pub fn run(cli: &Cli) -> anyhow::Result<()> {
    let config = Config::load_or_default(cli.config.as_deref())
        .map_err(Error::from)
        .context("loading configuration")?;

    let mut app = App::from_config(config)?;
    let report = app.run(&cli.command)?;
    print!("{}", report::render(&report, cli.json, cli.verbose)?);
    Ok(())
}

/// Process exit code for a failed run
///
/// | code | meaning |
/// |------|---------|
/// | 1 | configuration, data integrity, I/O |
/// | 2 | spool not found |
/// | 3 | sensor failure |
pub fn exit_code(err: &anyhow::Error) -> u8 {
    let kind = err
        .chain()
        .find_map(|e| e.downcast_ref::<Error>())
        .map(Error::kind);
    match kind {
        Some(ErrorKind::NotFound) => 2,
        Some(ErrorKind::Sensor) => 3,
        _ => 1,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use spoolscale_core::{CatalogError, SensorError, TrackerError};

    #[test]
    fn test_exit_codes() {
        let err = anyhow::Error::from(Error::from(TrackerError::ActiveSpoolNotFound {
            spool_id: "ZZZ".to_string(),
        }));
        assert_eq!(exit_code(&err), 2);

        let err = anyhow::Error::from(Error::from(SensorError::Timeout { timeout_ms: 3000 }))
            .context("calibrating scale");
        assert_eq!(exit_code(&err), 3);

        let err = anyhow::Error::from(Error::from(CatalogError::MalformedRow {
            row: 2,
            reason: "bad number".to_string(),
        }));
        assert_eq!(exit_code(&err), 1);

        assert_eq!(exit_code(&anyhow::anyhow!("something else")), 1);
    }

    #[test]
    fn test_version() {
        assert!(!VERSION.is_empty());
        assert_eq!(BUILD_DATE.len(), 10);
    }
}
