use spoolscale_core::FlatSchema;
use spoolscale_settings::{CatalogBackend, Config};
use std::path::Path;
use std::process::{Command, Output};

fn setup(dir: &Path, active: &str) -> std::path::PathBuf {
    let vars = dir.join("saved_vars.cfg");
    std::fs::write(
        &vars,
        format!("[Variables]\nactive_spool_id = '{}'\nextra_weight = 0.0\n", active),
    )
    .unwrap();

    let catalog = dir.join("spools.csv");
    std::fs::write(
        &catalog,
        format!(
            "{}\nPLA01,PLA,Black,,1.24,1.75,1000,200,700,,,,,,\n",
            FlatSchema::CURRENT.columns().join(",")
        ),
    )
    .unwrap();

    let mut config = Config::default();
    config.paths.variables_file = vars;
    config.paths.catalog_path = catalog;
    config.catalog.backend = CatalogBackend::Csv;
    config.sensor.timeout_ms = 100;

    let path = dir.join("config.toml");
    config.save_to_file(&path).unwrap();
    path
}

fn spoolscale(config: &Path, args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_spoolscale"))
        .arg("--config")
        .arg(config)
        .args(args)
        .env_remove("RUST_LOG")
        .output()
        .unwrap()
}

#[test]
fn test_query_prints_catalog_metrics() {
    let dir = tempfile::tempdir().unwrap();
    let config = setup(dir.path(), "PLA01");

    let out = spoolscale(&config, &["query"]);
    assert_eq!(out.status.code(), Some(0));
    let stdout = String::from_utf8_lossy(&out.stdout);
    assert!(stdout.contains("Loaded Spool: Black PLA [PLA01]"));
    assert!(stdout.contains("Stored Remaining Weight: 500.00 g"));
}

#[test]
fn test_unknown_active_spool_exits_2() {
    let dir = tempfile::tempdir().unwrap();
    let config = setup(dir.path(), "ZZZ");

    let out = spoolscale(&config, &["query"]);
    assert_eq!(out.status.code(), Some(2));
    assert!(out.stdout.is_empty());
    assert!(String::from_utf8_lossy(&out.stderr).contains("ZZZ"));
}

#[test]
fn test_usage_errors_exit_1() {
    let dir = tempfile::tempdir().unwrap();
    let config = setup(dir.path(), "PLA01");

    assert_eq!(spoolscale(&config, &["unload"]).status.code(), Some(1));
    assert_eq!(spoolscale(&config, &["--help"]).status.code(), Some(0));
}

#[test]
fn test_load_persists_to_saved_variables() {
    let dir = tempfile::tempdir().unwrap();
    let config = setup(dir.path(), "");

    let out = spoolscale(&config, &["--json", "load", "pla01"]);
    assert_eq!(out.status.code(), Some(0));
    let report: serde_json::Value = serde_json::from_slice(&out.stdout).unwrap();
    assert_eq!(report["spool_id"], "PLA01");

    let vars = std::fs::read_to_string(dir.path().join("saved_vars.cfg")).unwrap();
    assert!(vars.contains("active_spool_id = 'PLA01'"));
}

#[cfg(unix)]
#[test]
fn test_sampler_timeout_falls_back() {
    let dir = tempfile::tempdir().unwrap();
    let config_path = setup(dir.path(), "PLA01");
    let mut config = Config::load_from_file(&config_path).unwrap();
    config.sensor.command = Some("sleep".to_string());
    config.sensor.args = vec!["5".to_string()];
    config.save_to_file(&config_path).unwrap();

    let out = spoolscale(&config_path, &["query"]);
    assert_eq!(out.status.code(), Some(0));
    assert!(String::from_utf8_lossy(&out.stdout).contains("unavailable"));

    // endprint has nothing to fall back to
    let out = spoolscale(&config_path, &["endprint"]);
    assert_eq!(out.status.code(), Some(3));
}
