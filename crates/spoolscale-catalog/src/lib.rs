//! Spoolscale Catalog Crate
//!
//! Durable [`CatalogStore`](spoolscale_core::CatalogStore) implementations:
//! a SQLite database and a comma-separated flat file.

pub mod error;
pub mod flat_file;
pub mod sqlite;

pub use error::{CatalogDbError, CatalogDbResult};
pub use flat_file::FlatFileCatalogStore;
pub use sqlite::SqliteCatalogStore;
