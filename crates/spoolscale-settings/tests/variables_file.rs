use spoolscale_core::settings::{keys, Settings, SettingsStore};
use spoolscale_core::{ConfigError, Error};
use spoolscale_settings::{SettingsError, VariablesFile};
use std::fs;
use tempfile::TempDir;

fn write_vars(dir: &TempDir, content: &str) -> std::path::PathBuf {
    let path = dir.path().join("saved_vars.cfg");
    fs::write(&path, content).unwrap();
    path
}

#[test]
fn test_missing_keys_are_defaulted_and_written() {
    let dir = TempDir::new().unwrap();
    let path = write_vars(&dir, "[Variables]\nactive_spool_id = 'pla01'\nz_offset = 0.125\n");

    let mut store = VariablesFile::open(&path).unwrap();
    let settings = Settings::load(&mut store).unwrap();
    assert_eq!(settings.active_spool_id.as_deref(), Some("PLA01"));
    assert_eq!(settings.calibration_weight, 500.0);

    let reopened = VariablesFile::open(&path).unwrap();
    assert_eq!(reopened.get(keys::SENSOR_CLK_PIN).as_deref(), Some("22"));
    assert_eq!(reopened.get(keys::CALIBRATION_OFFSET).as_deref(), Some("0"));
    // unrelated Klipper variables survive the rewrite
    assert_eq!(reopened.get("z_offset").as_deref(), Some("0.125"));
}

#[test]
fn test_malformed_number_is_configuration_error() {
    let dir = TempDir::new().unwrap();
    let path = write_vars(&dir, "[Variables]\nextra_weight = 'lots'\n");

    let mut store = VariablesFile::open(&path).unwrap();
    assert!(matches!(
        Settings::load(&mut store),
        Err(Error::Config(ConfigError::InvalidValue { .. }))
    ));
}

#[test]
fn test_missing_section_is_rejected() {
    let dir = TempDir::new().unwrap();
    let path = write_vars(&dir, "[save_variables]\nfilename = 'x'\n");
    assert!(matches!(
        VariablesFile::open(&path),
        Err(SettingsError::Config(_))
    ));

    assert!(matches!(
        VariablesFile::open(&dir.path().join("absent.cfg")),
        Err(SettingsError::LoadError(_))
    ));
}

#[test]
fn test_active_spool_and_offset_round_trip() {
    let dir = TempDir::new().unwrap();
    let path = write_vars(&dir, "[Variables]\n");

    let mut store = VariablesFile::open(&path).unwrap();
    let mut settings = Settings::load(&mut store).unwrap();
    settings.set_active_spool(&mut store, Some("petg2")).unwrap();
    settings.set_calibration_offset(&mut store, -7.5).unwrap();

    let mut reopened = VariablesFile::open(&path).unwrap();
    let loaded = Settings::load(&mut reopened).unwrap();
    assert_eq!(loaded.active_spool_id.as_deref(), Some("PETG2"));
    assert_eq!(loaded.calibration_offset, -7.5);

    settings.set_active_spool(&mut store, None).unwrap();
    let loaded = Settings::load(&mut VariablesFile::open(&path).unwrap()).unwrap();
    assert_eq!(loaded.active_spool_id, None);
}

#[test]
fn test_klipper_values_survive_rewrite() {
    let dir = TempDir::new().unwrap();
    let original = "[Variables]\nbed_mesh = {'x': 1, 'y': [0.1, 0.2]}\nheater_off = True\nlast_tool = None\nactive_spool_id = 'pla01'\n";
    let path = write_vars(&dir, original);

    let mut store = VariablesFile::open(&path).unwrap();
    let mut settings = Settings::load(&mut store).unwrap();
    settings.set_active_spool(&mut store, Some("petg2")).unwrap();

    let text = fs::read_to_string(&path).unwrap();
    assert!(text.starts_with(
        "[Variables]\nbed_mesh = {'x': 1, 'y': [0.1, 0.2]}\nheater_off = True\nlast_tool = None\nactive_spool_id = 'PETG2'\n"
    ));
    assert!(text.contains("\nextra_weight = 0\n"));

    let reopened = VariablesFile::open(&path).unwrap();
    assert_eq!(reopened.get("heater_off").as_deref(), Some("true"));
    assert_eq!(reopened.get("last_tool").as_deref(), Some(""));
}
