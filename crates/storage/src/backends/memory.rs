//! In-memory storage backend.

use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;
use toolkit_types::{
    DEMO_ID_MAX, Module, ModuleId, ModuleUpdate, NewModule, ProfileUpdate, UserId,
};
use tracing::debug;

use crate::error::{Result, StorageError};
use crate::traits::{ToolkitStorage, validate_new_module, validate_new_user};
use crate::types::{InstallRelation, ModuleFilter, NewUser, UserRecord};

/// Storage backend that keeps every table in process memory.
///
/// All tables sit behind a single lock so install and uninstall observe and
/// mutate the relation and the download counter atomically.
#[derive(Debug)]
pub struct MemoryStorage {
    tables: RwLock<Tables>,
}

#[derive(Debug)]
struct Tables {
    users: BTreeMap<UserId, UserRecord>,
    modules: BTreeMap<ModuleId, Module>,
    relations: BTreeMap<(UserId, ModuleId), InstallRelation>,
    next_user_id: i64,
    next_module_id: i64,
}

impl Default for Tables {
    fn default() -> Self {
        Self {
            users: BTreeMap::new(),
            modules: BTreeMap::new(),
            relations: BTreeMap::new(),
            next_user_id: 1,
            next_module_id: DEMO_ID_MAX + 1,
        }
    }
}

impl Tables {
    fn installed(&self, user: UserId) -> Vec<InstallRelation> {
        let mut relations: Vec<InstallRelation> = self
            .relations
            .range((user, ModuleId(i64::MIN))..=(user, ModuleId(i64::MAX)))
            .map(|(_, r)| *r)
            .collect();
        relations.sort_by_key(|r| (r.installed_at, r.module_id));
        relations
    }

    fn name_taken(&self, name: &str, except: Option<ModuleId>) -> bool {
        self.modules
            .values()
            .any(|m| m.name == name && Some(m.id) != except)
    }

    fn user_field_taken(
        &self,
        username: Option<&str>,
        email: Option<&str>,
        except: Option<UserId>,
    ) -> Option<&'static str> {
        for user in self.users.values() {
            if Some(user.id) == except {
                continue;
            }
            if email.is_some_and(|e| e == user.email) {
                return Some("email");
            }
            if username.is_some_and(|u| u == user.username) {
                return Some("username");
            }
        }
        None
    }
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self {
            tables: RwLock::new(Tables::default()),
        }
    }
}

impl Default for MemoryStorage {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ToolkitStorage for MemoryStorage {
    async fn list_modules(&self, filter: &ModuleFilter) -> Result<Vec<Module>> {
        let tables = self.tables.read().await;
        let mut modules: Vec<Module> = tables
            .modules
            .values()
            .filter(|m| filter.matches(m))
            .cloned()
            .collect();
        modules.sort_by(|a, b| b.downloads.cmp(&a.downloads).then(a.id.cmp(&b.id)));
        Ok(modules)
    }

    async fn get_module(&self, id: ModuleId) -> Result<Option<Module>> {
        Ok(self.tables.read().await.modules.get(&id).cloned())
    }

    async fn create_module(&self, module: &NewModule) -> Result<Module> {
        self.seed_module(module, 0).await
    }

    async fn seed_module(&self, module: &NewModule, downloads: i64) -> Result<Module> {
        validate_new_module(module)?;

        let mut tables = self.tables.write().await;
        if tables.name_taken(&module.name, None) {
            return Err(StorageError::ModuleAlreadyExists {
                name: module.name.clone(),
            });
        }

        let id = ModuleId(tables.next_module_id);
        tables.next_module_id += 1;
        let now = Utc::now();
        let created = Module {
            id,
            name: module.name.clone(),
            description: module.description.clone(),
            category: module.category,
            content: module.content.clone(),
            tags: module.tags.clone(),
            downloads,
            created_at: now,
            updated_at: now,
        };
        tables.modules.insert(id, created.clone());
        debug!("Created module {} ({})", created.name, id);
        Ok(created)
    }

    async fn update_module(&self, id: ModuleId, update: &ModuleUpdate) -> Result<Module> {
        let mut tables = self.tables.write().await;
        if let Some(name) = &update.name {
            if tables.name_taken(name, Some(id)) {
                return Err(StorageError::ModuleAlreadyExists { name: name.clone() });
            }
        }

        let module = tables
            .modules
            .get_mut(&id)
            .ok_or(StorageError::ModuleNotFound { id })?;
        if let Some(name) = &update.name {
            module.name = name.clone();
        }
        if let Some(description) = &update.description {
            module.description = description.clone();
        }
        if let Some(category) = update.category {
            module.category = category;
        }
        if let Some(content) = &update.content {
            module.content = content.clone();
        }
        if let Some(tags) = &update.tags {
            module.tags = tags.clone();
        }
        module.updated_at = Utc::now();
        Ok(module.clone())
    }

    async fn delete_module(&self, id: ModuleId) -> Result<bool> {
        let mut tables = self.tables.write().await;
        if tables.modules.remove(&id).is_none() {
            return Ok(false);
        }
        tables.relations.retain(|(_, module), _| *module != id);
        Ok(true)
    }

    async fn create_user(&self, user: &NewUser) -> Result<UserRecord> {
        validate_new_user(user)?;

        let mut tables = self.tables.write().await;
        if let Some(field) =
            tables.user_field_taken(Some(&user.username), Some(&user.email), None)
        {
            return Err(StorageError::UserAlreadyExists { field });
        }

        let id = UserId(tables.next_user_id);
        tables.next_user_id += 1;
        let now = Utc::now();
        let record = UserRecord {
            id,
            username: user.username.clone(),
            email: user.email.clone(),
            password_hash: user.password_hash.clone(),
            created_at: now,
            updated_at: now,
        };
        tables.users.insert(id, record.clone());
        Ok(record)
    }

    async fn get_user(&self, id: UserId) -> Result<Option<UserRecord>> {
        Ok(self.tables.read().await.users.get(&id).cloned())
    }

    async fn find_user_by_username(&self, username: &str) -> Result<Option<UserRecord>> {
        Ok(self
            .tables
            .read()
            .await
            .users
            .values()
            .find(|u| u.username == username)
            .cloned())
    }

    async fn update_profile(&self, id: UserId, update: &ProfileUpdate) -> Result<UserRecord> {
        let mut tables = self.tables.write().await;
        if let Some(field) =
            tables.user_field_taken(update.username.as_deref(), update.email.as_deref(), Some(id))
        {
            return Err(StorageError::UserAlreadyExists { field });
        }

        let user = tables
            .users
            .get_mut(&id)
            .ok_or(StorageError::UserNotFound { id })?;
        if let Some(username) = &update.username {
            user.username = username.clone();
        }
        if let Some(email) = &update.email {
            user.email = email.clone();
        }
        user.updated_at = Utc::now();
        Ok(user.clone())
    }

    async fn set_password_hash(&self, id: UserId, password_hash: &str) -> Result<()> {
        let mut tables = self.tables.write().await;
        let user = tables
            .users
            .get_mut(&id)
            .ok_or(StorageError::UserNotFound { id })?;
        user.password_hash = password_hash.to_string();
        user.updated_at = Utc::now();
        Ok(())
    }

    async fn install_module(&self, user: UserId, module: ModuleId) -> Result<InstallRelation> {
        let mut tables = self.tables.write().await;
        if !tables.modules.contains_key(&module) {
            return Err(StorageError::ModuleNotFound { id: module });
        }
        if tables.relations.contains_key(&(user, module)) {
            return Err(StorageError::AlreadyInstalled {
                user_id: user,
                module_id: module,
            });
        }

        let relation = InstallRelation {
            user_id: user,
            module_id: module,
            installed_at: Utc::now(),
        };
        tables.relations.insert((user, module), relation);
        if let Some(m) = tables.modules.get_mut(&module) {
            m.downloads += 1;
        }
        Ok(relation)
    }

    async fn uninstall_module(&self, user: UserId, module: ModuleId) -> Result<()> {
        let mut tables = self.tables.write().await;
        match tables.relations.remove(&(user, module)) {
            Some(_) => Ok(()),
            None => Err(StorageError::NotInstalled {
                user_id: user,
                module_id: module,
            }),
        }
    }

    async fn installed_module_ids(&self, user: UserId) -> Result<Vec<ModuleId>> {
        let tables = self.tables.read().await;
        Ok(tables.installed(user).into_iter().map(|r| r.module_id).collect())
    }

    async fn installed_modules(&self, user: UserId) -> Result<Vec<Module>> {
        let tables = self.tables.read().await;
        Ok(tables
            .installed(user)
            .into_iter()
            .filter_map(|r| tables.modules.get(&r.module_id).cloned())
            .collect())
    }
}
