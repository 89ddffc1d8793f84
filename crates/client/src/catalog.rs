//! The module catalog as seen by a client.
//!
//! Every entry carries a [`ModuleRef`] decided once, when the catalog is
//! loaded: modules that came from the backend are `Persisted`, modules from
//! the built-in fallback are `Demo`. Nothing downstream inspects id ranges.

use chrono::Utc;
use toolkit_types::{Category, Module, ModuleId, ModuleRef, builtin_modules};
use tracing::{info, warn};

use crate::backend::Backend;
use crate::store::InstallStore;

#[derive(Debug, Clone, PartialEq)]
pub struct CatalogEntry {
    pub module: Module,
    pub reference: ModuleRef,
}

#[derive(Debug, Clone)]
pub struct Catalog {
    entries: Vec<CatalogEntry>,
    fallback: bool,
}

impl Catalog {
    /// Fetch the catalog from `backend`, falling back to the built-in demo
    /// modules when the fetch fails or returns nothing.
    pub async fn load(backend: &dyn Backend) -> Self {
        match backend.list_modules().await {
            Ok(modules) if !modules.is_empty() => {
                info!("Loaded {} modules from the backend", modules.len());
                Self::from_backend(modules)
            }
            Ok(_) => {
                warn!("Backend returned an empty catalog, using built-in modules");
                Self::builtin()
            }
            Err(e) => {
                warn!("Failed to load catalog ({}), using built-in modules", e);
                Self::builtin()
            }
        }
    }

    /// A catalog of server-issued modules.
    pub fn from_backend(modules: Vec<Module>) -> Self {
        let entries = modules
            .into_iter()
            .map(|module| CatalogEntry {
                reference: ModuleRef::Persisted(module.id),
                module,
            })
            .collect();
        Self {
            entries,
            fallback: false,
        }
    }

    /// The built-in demo catalog, ids `1..=4`.
    pub fn builtin() -> Self {
        let now = Utc::now();
        let entries = builtin_modules()
            .into_iter()
            .zip(1..)
            .map(|(builtin, id)| {
                let module = builtin.module;
                let id = ModuleId(id);
                CatalogEntry {
                    reference: ModuleRef::Demo(id),
                    module: Module {
                        id,
                        name: module.name,
                        description: module.description,
                        category: module.category,
                        content: module.content,
                        tags: module.tags,
                        downloads: builtin.downloads,
                        created_at: now,
                        updated_at: now,
                    },
                }
            })
            .collect();
        Self {
            entries,
            fallback: true,
        }
    }

    /// Whether this is the built-in fallback rather than the backend's list.
    pub fn is_fallback(&self) -> bool {
        self.fallback
    }

    pub fn entries(&self) -> &[CatalogEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, id: ModuleId) -> Option<&CatalogEntry> {
        self.entries.iter().find(|e| e.module.id == id)
    }

    pub fn resolve(&self, id: ModuleId) -> Option<ModuleRef> {
        self.get(id).map(|e| e.reference)
    }

    /// Case-insensitive search over name, description and tags.
    pub fn search(&self, term: &str) -> Vec<&CatalogEntry> {
        self.entries
            .iter()
            .filter(|e| e.module.matches_text(term))
            .collect()
    }

    pub fn by_category(&self, category: Category) -> Vec<&CatalogEntry> {
        self.entries
            .iter()
            .filter(|e| e.module.category == category)
            .collect()
    }

    /// Entries `store` reports installed, in catalog order.
    pub async fn installed(&self, store: &InstallStore) -> Vec<&CatalogEntry> {
        let installed = store.installed().await;
        self.entries
            .iter()
            .filter(|e| installed.contains(&e.module.id))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{ClientError, Result};
    use async_trait::async_trait;
    use toolkit_types::{
        AuthResponse, InstallResponse, LoginRequest, RegisterRequest, UserProjection,
    };

    struct ListOnly(Result<Vec<Module>>);

    #[async_trait]
    impl Backend for ListOnly {
        async fn list_modules(&self) -> Result<Vec<Module>> {
            match &self.0 {
                Ok(modules) => Ok(modules.clone()),
                Err(_) => Err(ClientError::unreachable("down")),
            }
        }

        async fn register(&self, _: &RegisterRequest) -> Result<AuthResponse> {
            unimplemented!()
        }

        async fn login(&self, _: &LoginRequest) -> Result<AuthResponse> {
            unimplemented!()
        }

        async fn current_user(&self, _: &str) -> Result<UserProjection> {
            unimplemented!()
        }

        async fn install(&self, _: &str, _: ModuleId) -> Result<InstallResponse> {
            unimplemented!()
        }

        async fn uninstall(&self, _: &str, _: ModuleId) -> Result<InstallResponse> {
            unimplemented!()
        }
    }

    fn server_module(id: i64, name: &str) -> Module {
        let now = Utc::now();
        Module {
            id: ModuleId(id),
            name: name.to_string(),
            description: "from the server".to_string(),
            category: Category::Rust,
            content: "fn main() {}".to_string(),
            tags: vec!["server".to_string()],
            downloads: 0,
            created_at: now,
            updated_at: now,
        }
    }

    #[tokio::test]
    async fn test_backend_modules_are_persisted() {
        let backend = ListOnly(Ok(vec![server_module(101, "Server Module")]));
        let catalog = Catalog::load(&backend).await;

        assert!(!catalog.is_fallback());
        assert_eq!(
            catalog.resolve(ModuleId(101)),
            Some(ModuleRef::Persisted(ModuleId(101)))
        );
        assert_eq!(catalog.resolve(ModuleId(1)), None);
    }

    #[tokio::test]
    async fn test_failure_falls_back_to_demo_modules() {
        let catalog = Catalog::load(&ListOnly(Err(ClientError::unreachable("down")))).await;

        assert!(catalog.is_fallback());
        assert_eq!(catalog.len(), 4);
        assert!(catalog.entries().iter().all(|e| e.reference.is_demo()));
        assert_eq!(
            catalog.get(ModuleId(1)).map(|e| e.module.name.as_str()),
            Some("CSS Flexbox Snippets")
        );
    }

    #[tokio::test]
    async fn test_empty_catalog_falls_back() {
        let catalog = Catalog::load(&ListOnly(Ok(Vec::new()))).await;
        assert!(catalog.is_fallback());
        assert_eq!(
            catalog.resolve(ModuleId(4)),
            Some(ModuleRef::Demo(ModuleId(4)))
        );
    }

    #[test]
    fn test_search_and_category() {
        let catalog = Catalog::builtin();

        let hits = catalog.search("css");
        assert_eq!(hits.len(), 2);

        let hits = catalog.search("HOOKS");
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].module.name, "React Hooks Collection");

        assert_eq!(catalog.by_category(Category::JavaScript).len(), 1);
        assert!(catalog.by_category(Category::Python).is_empty());
    }
}
