//! Command execution
//!
//! [`App`] owns the settings, the catalog store and the sensor for one
//! invocation and turns a [`Command`] into a [`Report`].

use crate::cli::Command;
use crate::report::{ListEntry, Report};
use anyhow::Context;
use spoolscale_catalog::{FlatFileCatalogStore, SqliteCatalogStore};
use spoolscale_core::data::flat;
use spoolscale_core::{
    collect_samples, compute_offset, sample_or_fallback, units, ActiveSpoolTracker, CatalogStore,
    CommandSensor, Error, Result, SensorSource, Settings, SettingsStore, SpoolCatalog,
    UnavailableSensor, NO_ACTIVE_SPOOL,
};
use spoolscale_settings::{CatalogBackend, Config, VariablesFile};
use std::fs;
use std::path::{Path, PathBuf};

/// One run of the spool tracker
pub struct App {
    config: Config,
    settings: Settings,
    settings_store: Box<dyn SettingsStore>,
    catalog_store: Box<dyn CatalogStore>,
    sensor: Box<dyn SensorSource>,
}

impl App {
    /// Assemble an app from its collaborators, loading settings
    pub fn new(
        config: Config,
        mut settings_store: Box<dyn SettingsStore>,
        catalog_store: Box<dyn CatalogStore>,
        sensor: Box<dyn SensorSource>,
    ) -> Result<Self> {
        let settings = Settings::load(settings_store.as_mut())?;
        Ok(Self {
            config,
            settings,
            settings_store,
            catalog_store,
            sensor,
        })
    }

    /// Open the stores and sampler named in `config`
    pub fn from_config(config: Config) -> anyhow::Result<Self> {
        let vars_path = config.paths.variables_file.clone();
        let variables = VariablesFile::open(&vars_path)
            .map_err(Error::from)
            .with_context(|| format!("opening saved variables {}", vars_path.display()))?;

        let catalog_path = config.paths.catalog_path.clone();
        let catalog_store: Box<dyn CatalogStore> = match config.catalog.backend {
            CatalogBackend::Sqlite => Box::new(
                SqliteCatalogStore::open(&catalog_path)
                    .map_err(Error::from)
                    .with_context(|| format!("opening spool database {}", catalog_path.display()))?,
            ),
            CatalogBackend::Csv => Box::new(FlatFileCatalogStore::new(&catalog_path)),
        };
        tracing::debug!("Catalog backend {} at {}", config.catalog.backend, catalog_path.display());

        let mut app = Self::new(
            config,
            Box::new(variables),
            catalog_store,
            Box::new(UnavailableSensor),
        )?;
        if let Some(program) = app.config.sensor.command.clone() {
            app.sensor = Box::new(
                CommandSensor::new(program, app.config.sensor.args.clone())
                    .with_pins(app.settings.sensor_out_pin, app.settings.sensor_clk_pin),
            );
        }
        Ok(app)
    }

    /// Current settings
    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Fresh catalog view of the store
    pub fn catalog(&self) -> Result<SpoolCatalog> {
        SpoolCatalog::load(self.catalog_store.as_ref())
    }

    /// Execute one command
    pub fn run(&mut self, command: &Command) -> anyhow::Result<Report> {
        let report = match command {
            Command::Query => self.query()?,
            Command::Load { spool_id } => self
                .load(spool_id)
                .with_context(|| format!("loading spool {}", spool_id))?,
            Command::StartPrint => self.start_print()?,
            Command::EndPrint => self.end_print()?,
            Command::Calibrate => self.calibrate().context("calibrating scale")?,
            Command::Import { file } => self
                .import(file)
                .with_context(|| format!("importing {}", file.display()))?,
            Command::Export { file } => self.export(file.as_deref())?,
            Command::List => self.list()?,
        };
        Ok(report)
    }

    fn tracker(&self, catalog: &SpoolCatalog) -> Result<ActiveSpoolTracker> {
        let mut tracker = ActiveSpoolTracker::new(self.config.tracker_options());
        tracker.load(&self.settings, catalog)?;
        Ok(tracker)
    }

    fn query(&mut self) -> Result<Report> {
        let tracker = self.tracker(&self.catalog()?)?;
        // no point waiting on the scale without a spool to apply it to
        tracker.active()?;
        let sample = sample_or_fallback(self.sensor.as_mut(), self.config.sensor_timeout());
        Ok(Report::Metrics(tracker.compute_live_metrics(sample)?))
    }

    fn load(&mut self, spool_id: &str) -> Result<Report> {
        if spool_id.trim().eq_ignore_ascii_case(NO_ACTIVE_SPOOL) {
            self.settings
                .set_active_spool(self.settings_store.as_mut(), None)?;
            tracing::info!("Cleared active spool");
            return Ok(Report::Unloaded);
        }

        let catalog = self.catalog()?;
        if let Some(err) = catalog.rejection(spool_id) {
            return Err(err.clone().into());
        }
        let id = catalog.require(spool_id)?.spool_id.clone();
        self.settings
            .set_active_spool(self.settings_store.as_mut(), Some(&id))?;
        tracing::info!("Loaded spool [{}]", id);

        let tracker = self.tracker(&catalog)?;
        Ok(Report::Metrics(tracker.compute_live_metrics(None)?))
    }

    fn start_print(&mut self) -> Result<Report> {
        let mut tracker = self.tracker(&self.catalog()?)?;
        let record = tracker.start_print()?.clone();
        self.catalog_store.upsert(&record)?;
        Ok(Report::PrintStarted { record })
    }

    fn end_print(&mut self) -> Result<Report> {
        let mut tracker = self.tracker(&self.catalog()?)?;
        let previous = tracker.active()?.remaining_weight;

        let sample = self.sensor.sample_weight(self.config.sensor_timeout())?;
        let gross = tracker.corrected_gross_weight(sample);
        let record = tracker.record_consumption(gross)?.clone();
        self.catalog_store.upsert(&record)?;

        Ok(Report::PrintEnded {
            previous_weight_g: previous,
            used_weight_g: previous - record.remaining_weight,
            metrics: tracker.compute_live_metrics(Some(sample))?,
        })
    }

    fn calibrate(&mut self) -> Result<Report> {
        let samples = collect_samples(
            self.sensor.as_mut(),
            self.config.sensor.calibration_samples,
            self.config.sensor_timeout(),
        )?;
        let result = compute_offset(
            &samples,
            self.settings.calibration_weight,
            self.settings.extra_weight,
            self.settings.calibration_offset,
        )?;
        self.settings
            .set_calibration_offset(self.settings_store.as_mut(), result.new_offset)?;
        tracing::info!(
            "Calibration offset {} -> {}",
            result.previous_offset,
            result.new_offset
        );
        Ok(Report::Calibrated(result))
    }

    fn import(&mut self, file: &Path) -> Result<Report> {
        let text = fs::read_to_string(file)?;
        let rows = flat::parse_text(&text)?;
        let mut catalog = self.catalog()?;
        let summary = catalog.import_records(&rows)?;
        self.catalog_store.upsert_all(&summary.records)?;
        Ok(Report::Imported {
            imported: summary.imported(),
            skipped: summary.skipped,
        })
    }

    fn export(&self, file: Option<&Path>) -> Result<Report> {
        let catalog = self.catalog()?;
        let text = flat::render_text(&catalog.export_rows());
        match file {
            Some(path) => {
                fs::write(path, text)?;
                tracing::info!("Exported {} spools to {}", catalog.len(), path.display());
                Ok(Report::Exported {
                    path: PathBuf::from(path),
                    count: catalog.len(),
                })
            }
            None => Ok(Report::ExportText { text }),
        }
    }

    fn list(&self) -> Result<Report> {
        let catalog = self.catalog()?;
        let active = self.settings.active_spool_id.as_deref();
        let spools = catalog
            .export_records()
            .map(|record| -> Result<ListEntry> {
                let net = units::remaining_net_weight(record);
                Ok(ListEntry {
                    spool_id: record.spool_id.clone(),
                    name: record.display_name(),
                    remaining_weight_g: net.grams,
                    remaining_length_m: units::length_for_weight(
                        net.grams,
                        record.density,
                        record.diameter,
                    )?,
                    active: active == Some(record.spool_id.as_str()),
                })
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Report::List { spools })
    }
}
