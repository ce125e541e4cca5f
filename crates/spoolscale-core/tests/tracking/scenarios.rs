use spoolscale_core::sensor::{sample_or_fallback, SequenceSensor};
use spoolscale_core::settings::keys;
use spoolscale_core::{
    ActiveSpool, ActiveSpoolTracker, Error, ErrorKind, MemorySettingsStore, SensorError, Settings,
    SpoolCatalog, SpoolRecord, TrackerError, TrackerOptions,
};
use std::time::Duration;

fn catalog() -> SpoolCatalog {
    let mut pla = SpoolRecord::new("PLA01", "PLA", 1.24, 1.75, 1000.0, 200.0);
    pla.remaining_weight = 700.0;
    pla.color = "Black".to_string();
    let mut petg = SpoolRecord::new("PETG1", "PETG", 1.27, 1.75, 1000.0, 200.0);
    petg.remaining_weight = 500.0;
    SpoolCatalog::from_records(vec![pla, petg])
}

fn tracker_for(active: &str) -> ActiveSpoolTracker {
    let mut store = MemorySettingsStore::with_values([(keys::ACTIVE_SPOOL_ID, active)]);
    let settings = Settings::load(&mut store).unwrap();
    let mut tracker = ActiveSpoolTracker::new(TrackerOptions::default());
    tracker.load(&settings, &catalog()).unwrap();
    tracker
}

#[test]
fn test_query_without_sensor_reports_catalog_length() {
    let metrics = tracker_for("pla01").compute_live_metrics(None).unwrap();
    assert_eq!(metrics.name, "Black PLA [PLA01]");
    assert_eq!(metrics.remaining_weight_g, 500.0);
    assert!((metrics.remaining_length_m - 167.6).abs() < 0.1);
}

#[test]
fn test_unknown_active_spool_is_not_found() {
    let tracker = tracker_for("ZZZ");
    assert_eq!(tracker.state(), &ActiveSpool::NotFound("ZZZ".to_string()));

    let err = tracker.compute_live_metrics(None).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
    assert!(matches!(
        err,
        Error::Tracker(TrackerError::ActiveSpoolNotFound { ref spool_id }) if spool_id == "ZZZ"
    ));
}

#[test]
fn test_sensor_timeout_falls_back_to_stored_weight() {
    let tracker = tracker_for("PLA01");
    let mut sensor = SequenceSensor::new(vec![Err(SensorError::Timeout { timeout_ms: 3000 })]);

    let sample = sample_or_fallback(&mut sensor, Duration::from_millis(3000));
    let metrics = tracker.compute_live_metrics(sample).unwrap();

    assert!(metrics.live.is_none());
    assert_eq!(metrics.remaining_weight_g, 500.0);
}

#[test]
fn test_consumption_rejects_weight_gain() {
    let mut tracker = tracker_for("PETG1");

    let err = tracker.record_consumption(600.0).unwrap_err();
    assert!(matches!(
        err,
        Error::Tracker(TrackerError::MonotonicityViolation { .. })
    ));
    assert_eq!(err.kind(), ErrorKind::DataIntegrity);

    assert_eq!(tracker.record_consumption(480.0).unwrap().remaining_weight, 480.0);
    // a later, lighter reading keeps going down
    assert_eq!(tracker.record_consumption(455.5).unwrap().remaining_weight, 455.5);
}

#[test]
fn test_print_cycle_updates_catalog_record() {
    let mut tracker = tracker_for("PETG1");
    tracker.start_print().unwrap();
    let first_use = tracker.active().unwrap().first_use;
    assert!(first_use.is_some());

    let updated = tracker.record_consumption(470.0).unwrap().clone();
    assert_eq!(updated.first_use, first_use);
    assert!(updated.last_use >= updated.first_use);

    let mut catalog = catalog();
    catalog.upsert(updated).unwrap();
    assert_eq!(catalog.find_by_id("petg1").unwrap().remaining_weight, 470.0);
}

#[test]
fn test_no_active_spool_is_invalid_state() {
    let tracker = tracker_for("none");
    assert_eq!(tracker.state(), &ActiveSpool::NoneSet);
    assert!(matches!(
        tracker.compute_live_metrics(Some(700.0)),
        Err(Error::Tracker(TrackerError::InvalidState { .. }))
    ));
}
