//! Client core for the developer toolkit.
//!
//! - [`Catalog`] loads the module list, falling back to built-in demo
//!   modules when the backend cannot provide one.
//! - [`InstallStore`] owns the installed set: optimistic updates,
//!   per-module sequencing of backend responses, rollback on failure and a
//!   local [`InstallCache`] for signed-out continuity.
//! - [`HttpBackend`] is the [`Backend`] that talks to `toolkit_api`.

pub mod backend;
pub mod cache;
pub mod catalog;
pub mod error;
pub mod http;
pub mod reconcile;
pub mod store;

pub use backend::Backend;
pub use cache::{CACHE_FILE_NAME, CacheError, FileCache, InstallCache, MemoryCache};
pub use catalog::{Catalog, CatalogEntry};
pub use error::{ClientError, ErrorCategory, Result};
pub use http::HttpBackend;
pub use store::{InstallStore, Outcome, Snapshot, StoreOptions};
pub use toolkit_types::{ModuleId, ModuleRef};
