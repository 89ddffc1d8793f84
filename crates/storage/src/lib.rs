//! Persistence for the toolkit backend.
//!
//! This crate provides a trait-based storage layer for principals, the module
//! catalog and the install relation between them. Two backends are included:
//! an in-memory one (default for development and tests) and a PostgreSQL one
//! behind the `postgres` feature.

pub mod backends;
pub mod error;
pub mod traits;
pub mod types;

// Re-export the main interface and types for easy access
pub use backends::MemoryStorage;
#[cfg(feature = "postgres")]
pub use backends::PostgresStorage;
pub use error::{Result, StorageError};
pub use traits::ToolkitStorage;
pub use types::{InstallRelation, ModuleFilter, NewUser, UserRecord};

/// Seed `storage` with the built-in catalog, skipping modules whose name is
/// already taken. Returns the number of modules created.
pub async fn seed_catalog(storage: &dyn ToolkitStorage) -> Result<usize> {
    let mut created = 0;
    for builtin in toolkit_types::builtin_modules() {
        match storage.seed_module(&builtin.module, builtin.downloads).await {
            Ok(_) => created += 1,
            Err(StorageError::ModuleAlreadyExists { .. }) => {}
            Err(e) => return Err(e),
        }
    }
    tracing::info!("Seeded {} catalog modules", created);
    Ok(created)
}
