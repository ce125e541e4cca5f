//! Filament materials reference
//!
//! Reference densities for common filament families, used to fill in a
//! blank density column on import.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Material identifier, the uppercase family name (e.g. `PLA`)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Hash)]
pub struct MaterialId(pub String);

impl MaterialId {
    /// Build an id from a free-form material name
    pub fn from_name(name: &str) -> Self {
        Self(name.trim().to_uppercase())
    }
}

impl std::fmt::Display for MaterialId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Reference properties of a filament family
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FilamentMaterial {
    /// Unique material identifier
    pub id: MaterialId,
    /// Display name
    pub name: String,
    /// Density in g/cm³
    pub density: f64,
}

impl FilamentMaterial {
    /// Material whose id is its uppercased name
    pub fn new(name: &str, density: f64) -> Self {
        Self::with_id(name, name, density)
    }

    /// Material listed under an abbreviation (e.g. Nylon as `PA`)
    pub fn with_id(id: &str, name: &str, density: f64) -> Self {
        Self {
            id: MaterialId::from_name(id),
            name: name.to_string(),
            density,
        }
    }
}

/// Materials library - manages collection of filament materials
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MaterialLibrary {
    materials: HashMap<MaterialId, FilamentMaterial>,
}

impl MaterialLibrary {
    /// Create a new empty library
    pub fn new() -> Self {
        Self {
            materials: HashMap::new(),
        }
    }

    /// Add a material to the library
    pub fn add_material(&mut self, material: FilamentMaterial) {
        self.materials.insert(material.id.clone(), material);
    }

    /// Look up a material by family name (case-insensitive)
    pub fn get_material(&self, name: &str) -> Option<&FilamentMaterial> {
        self.materials.get(&MaterialId::from_name(name))
    }

    /// Reference density for a family name, if known
    pub fn density_for(&self, name: &str) -> Option<f64> {
        self.get_material(name).map(|m| m.density)
    }

    /// Get all materials sorted by id
    pub fn get_all_materials(&self) -> Vec<&FilamentMaterial> {
        let mut all: Vec<_> = self.materials.values().collect();
        all.sort_by(|a, b| a.id.0.cmp(&b.id.0));
        all
    }

    /// Get the number of materials in the library
    pub fn len(&self) -> usize {
        self.materials.len()
    }

    /// Check if library is empty
    pub fn is_empty(&self) -> bool {
        self.materials.is_empty()
    }
}

impl Default for MaterialLibrary {
    fn default() -> Self {
        Self::new()
    }
}

/// Initialize the standard library with common FDM filament families
pub fn init_standard_library() -> MaterialLibrary {
    let mut library = MaterialLibrary::new();

    for (name, density) in [
        ("PLA", 1.24),
        ("PETG", 1.27),
        ("ABS", 1.04),
        ("ASA", 1.07),
        ("PC", 1.20),
        ("HIPS", 1.04),
        ("PVA", 1.23),
        ("TPU", 1.21),
    ] {
        library.add_material(FilamentMaterial::new(name, density));
    }
    library.add_material(FilamentMaterial::with_id("PA", "Nylon", 1.14));

    library
}
