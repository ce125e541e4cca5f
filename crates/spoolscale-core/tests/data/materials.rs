use spoolscale_core::data::materials::*;

#[test]
fn test_standard_library_densities() {
    let library = init_standard_library();
    assert_eq!(library.density_for("PLA"), Some(1.24));
    assert_eq!(library.density_for("petg"), Some(1.27));
    assert_eq!(library.density_for("unobtainium"), None);
}

#[test]
fn test_every_listed_material_resolves_by_id() {
    let library = init_standard_library();
    for material in library.get_all_materials() {
        let found = library.get_material(&material.id.0.to_lowercase()).unwrap();
        assert_eq!(found.id, material.id);
        assert!(found.density > 0.0);
    }
}

#[test]
fn test_nylon_is_listed_as_pa() {
    let library = init_standard_library();
    let nylon = library.get_material("pa").unwrap();
    assert_eq!(nylon.name, "Nylon");
    assert_eq!(library.density_for("nylon"), None);
}
