use spoolscale_core::data::flat;
use spoolscale_core::{CatalogError, CatalogStore, MemoryCatalogStore, SpoolCatalog, SpoolRecord};

fn spool(id: &str, material: &str, density: f64, remaining: f64) -> SpoolRecord {
    let mut record = SpoolRecord::new(id, material, density, 1.75, 1000.0, 200.0);
    record.remaining_weight = remaining;
    record.color = "Galaxy Black".to_string();
    record.manufacturer = "Prusament, s.r.o.".to_string();
    record
}

#[test]
fn test_export_then_import_preserves_records() {
    let catalog = SpoolCatalog::from_records(vec![
        spool("PLA01", "PLA", 1.24, 700.0),
        spool("PETG2", "PETG", 1.27, 420.5),
    ]);
    let text = flat::render_text(&catalog.export_rows());

    let mut restored = SpoolCatalog::new();
    let summary = restored.import_records(&flat::parse_text(&text).unwrap()).unwrap();

    assert_eq!(summary.imported(), 2);
    assert!(summary.skipped.is_empty());
    let before: Vec<_> = catalog.export_records().cloned().collect();
    let after: Vec<_> = restored.export_records().cloned().collect();
    assert_eq!(before, after);
}

#[test]
fn test_export_then_import_keeps_padded_text() {
    let mut padded = spool("PLA03", "PLA", 1.24, 650.0);
    padded.color = " Black ".to_string();
    padded.manufacturer = "Acme ".to_string();
    padded.purchased_from = Some("  ".to_string());
    let catalog = SpoolCatalog::from_records(vec![padded.clone()]);
    let text = flat::render_text(&catalog.export_rows());

    let mut restored = SpoolCatalog::new();
    restored.import_records(&flat::parse_text(&text).unwrap()).unwrap();

    let after = restored.find_by_id("PLA03").unwrap();
    assert_eq!(after.color, " Black ");
    assert_eq!(after.manufacturer, "Acme ");
    assert_eq!(after.purchased_from.as_deref(), Some("  "));
    assert_eq!(after, &padded);
}

#[test]
fn test_lookup_ignores_case_after_import() {
    let text = format!(
        "{}\npla01,PLA,Red,Generic,1.24,1.75,1000,200,700,,,,,,\n",
        flat::V1_COLUMNS.join(",")
    );
    let mut catalog = SpoolCatalog::new();
    catalog.import_records(&flat::parse_text(&text).unwrap()).unwrap();

    assert_eq!(catalog.find_by_id("PLA01"), catalog.find_by_id("pla01"));
    assert_eq!(catalog.find_by_id("Pla01").unwrap().spool_id, "PLA01");
}

#[test]
fn test_import_skips_rows_that_break_invariants() {
    let text = format!(
        "{}\nOK1,PLA,,,1.24,1.75,1000,200,700,,,,,,\nBAD1,PLA,,,1.24,1.75,1000,200,1200,,,,,,\n",
        flat::V1_COLUMNS.join(",")
    );
    let mut catalog = SpoolCatalog::new();
    let summary = catalog.import_records(&flat::parse_text(&text).unwrap()).unwrap();

    assert_eq!(summary.imported(), 1);
    assert_eq!(summary.skipped.len(), 1);
    assert_eq!(summary.skipped[0].spool_id, "BAD1");
    assert_eq!(summary.skipped[0].row, 3);
    assert!(catalog.find_by_id("BAD1").is_none());
}

#[test]
fn test_unknown_header_is_rejected() {
    let rows = flat::parse_text("id,material,weight\nA,PLA,1000\n").unwrap();
    let mut catalog = SpoolCatalog::new();
    assert!(matches!(
        catalog.import_records(&rows),
        Err(CatalogError::SchemaMismatch { .. })
    ));
    assert!(catalog.is_empty());
}

#[test]
fn test_store_and_catalog_agree() {
    let mut store = MemoryCatalogStore::new();
    store
        .upsert_all(&[spool("B2", "ABS", 1.04, 900.0), spool("A1", "PLA", 1.24, 300.0)])
        .unwrap();

    let catalog = SpoolCatalog::load(&store).unwrap();
    assert_eq!(catalog.export_rows(), store.export_flat().unwrap());
}
