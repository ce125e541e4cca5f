use spoolscale::cli::Command;
use spoolscale::report::Report;
use spoolscale::{exit_code, App};
use spoolscale_core::settings::keys;
use spoolscale_core::{
    FixedSensor, MemoryCatalogStore, MemorySettingsStore, SensorError, SensorSource,
    SequenceSensor, SpoolRecord,
};
use spoolscale_settings::Config;

fn pla() -> SpoolRecord {
    let mut record = SpoolRecord::new("PLA01", "PLA", 1.24, 1.75, 1000.0, 200.0);
    record.remaining_weight = 700.0;
    record.color = "Black".to_string();
    record
}

fn app(active: &str, sensor: impl SensorSource + 'static) -> App {
    let mut config = Config::default();
    config.sensor.calibration_samples = 3;
    App::new(
        config,
        Box::new(MemorySettingsStore::with_values([
            (keys::ACTIVE_SPOOL_ID, active),
            (keys::EXTRA_WEIGHT, "20"),
        ])),
        Box::new(MemoryCatalogStore::with_records([pla()])),
        Box::new(sensor),
    )
    .unwrap()
}

#[test]
fn test_query_applies_live_sample() {
    // 670 read - 20 extra = 650 gross, 450 g of filament
    let mut app = app("PLA01", FixedSensor(670.0));
    let Report::Metrics(metrics) = app.run(&Command::Query).unwrap() else {
        panic!("expected metrics");
    };
    let live = metrics.live.unwrap();
    assert_eq!(live.net_weight_g, 450.0);
    assert_eq!(live.weight_difference_g, 50.0);
    assert_eq!(metrics.stored_net_weight_g, 500.0);
}

#[test]
fn test_query_falls_back_when_sensor_times_out() {
    let mut app = app("PLA01", SequenceSensor::default());
    let Report::Metrics(metrics) = app.run(&Command::Query).unwrap() else {
        panic!("expected metrics");
    };
    assert!(metrics.live.is_none());
    assert!((metrics.remaining_length_m - 167.6).abs() < 0.1);
}

#[test]
fn test_query_unknown_spool_exits_not_found() {
    let mut app = app("ZZZ", FixedSensor(670.0));
    let err = app.run(&Command::Query).unwrap_err();
    assert_eq!(exit_code(&err), 2);
}

#[test]
fn test_load_sets_active_spool() {
    let mut app = app("", FixedSensor(0.0));
    let report = app
        .run(&Command::Load {
            spool_id: "pla01".to_string(),
        })
        .unwrap();
    assert!(matches!(report, Report::Metrics(ref m) if m.spool_id == "PLA01"));
    assert_eq!(app.settings().active_spool_id.as_deref(), Some("PLA01"));

    let report = app
        .run(&Command::Load {
            spool_id: "None".to_string(),
        })
        .unwrap();
    assert_eq!(report, Report::Unloaded);
    assert_eq!(app.settings().active_spool_id, None);

    let err = app
        .run(&Command::Load {
            spool_id: "ZZZ".to_string(),
        })
        .unwrap_err();
    assert_eq!(exit_code(&err), 2);
}

#[test]
fn test_print_cycle_updates_catalog() {
    // 620 read - 20 extra = 600 g gross remaining
    let mut app = app("PLA01", FixedSensor(620.0));

    let Report::PrintStarted { record } = app.run(&Command::StartPrint).unwrap() else {
        panic!("expected print start");
    };
    assert!(record.first_use.is_some());

    let Report::PrintEnded {
        previous_weight_g,
        used_weight_g,
        ..
    } = app.run(&Command::EndPrint).unwrap()
    else {
        panic!("expected print end");
    };
    assert_eq!(previous_weight_g, 700.0);
    assert_eq!(used_weight_g, 100.0);

    let stored = app.catalog().unwrap().find_by_id("pla01").cloned().unwrap();
    assert_eq!(stored.remaining_weight, 600.0);
    assert_eq!(stored.first_use, record.first_use);
    assert!(stored.last_use >= stored.first_use);
}

#[test]
fn test_endprint_without_sample_is_sensor_failure() {
    let mut app = app("PLA01", SequenceSensor::new([Err(SensorError::Timeout { timeout_ms: 10 })]));
    let err = app.run(&Command::EndPrint).unwrap_err();
    assert_eq!(exit_code(&err), 3);
    assert_eq!(
        app.catalog().unwrap().find_by_id("PLA01").unwrap().remaining_weight,
        700.0
    );
}

#[test]
fn test_calibrate_stores_offset() {
    // expected reading is 500 reference + 20 extra
    let mut app = app("", SequenceSensor::from_readings([512.0, 515.0, 512.0]));
    let Report::Calibrated(result) = app.run(&Command::Calibrate).unwrap() else {
        panic!("expected calibration");
    };
    assert_eq!(result.reading, 512.0);
    assert_eq!(result.new_offset, 8.0);
    assert_eq!(app.settings().calibration_offset, 8.0);
}

#[test]
fn test_import_export_list() {
    let dir = tempfile::tempdir().unwrap();
    let import = dir.path().join("import.csv");
    std::fs::write(
        &import,
        "spool_id,material_type,color,manufacturer,density,diameter,total_weight,spool_weight,remaining_weight,purchase_date,first_use,last_use,purchased_from,spool_cost,cost_per_gram\n\
         petg1,PETG,Orange,\"Acme, Inc.\",1.27,1.75,1000,250,900,2024-01-15,,,,19.99,\n\
         BAD,PLA,,,1.24,1.75,1000,200,1500,,,,,,\n",
    )
    .unwrap();

    let mut app = app("PLA01", FixedSensor(0.0));
    let Report::Imported { imported, skipped } =
        app.run(&Command::Import { file: import }).unwrap()
    else {
        panic!("expected import summary");
    };
    assert_eq!(imported, 1);
    assert_eq!(skipped.len(), 1);
    assert_eq!(skipped[0].spool_id, "BAD");

    let Report::List { spools } = app.run(&Command::List).unwrap() else {
        panic!("expected list");
    };
    let ids: Vec<_> = spools.iter().map(|s| (s.spool_id.as_str(), s.active)).collect();
    assert_eq!(ids, vec![("PETG1", false), ("PLA01", true)]);

    let out = dir.path().join("out.csv");
    let report = app.run(&Command::Export { file: Some(out.clone()) }).unwrap();
    assert_eq!(report, Report::Exported { path: out.clone(), count: 2 });
    let text = std::fs::read_to_string(&out).unwrap();
    assert!(text.contains("\"Acme, Inc.\""));
    assert_eq!(text.lines().count(), 3);
}

#[test]
fn test_import_of_malformed_file_changes_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let import = dir.path().join("import.csv");
    std::fs::write(&import, "spool_id,material_type,total_volume\nX,PLA,12\n").unwrap();

    let mut app = app("PLA01", FixedSensor(0.0));
    let err = app.run(&Command::Import { file: import }).unwrap_err();
    assert_eq!(exit_code(&err), 1);
    assert_eq!(app.catalog().unwrap().len(), 1);
}
