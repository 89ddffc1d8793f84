//! Trait definitions for the storage layer.

use async_trait::async_trait;
use toolkit_types::{Module, ModuleId, ModuleUpdate, NewModule, ProfileUpdate, UserId};

use crate::error::Result;
use crate::types::{InstallRelation, ModuleFilter, NewUser, UserRecord};

/// Main trait for backend persistence.
///
/// Implementations must keep at most one install relation per
/// (user, module) pair and must bump a module's download counter in the same
/// unit of work that creates the relation.
#[async_trait]
pub trait ToolkitStorage: Send + Sync {
    // === Module Operations ===

    /// List modules matching `filter`, most downloaded first.
    async fn list_modules(&self, filter: &ModuleFilter) -> Result<Vec<Module>>;

    /// Get a module by its ID.
    ///
    /// # Returns
    /// `Some(module)` if found, `None` if not found
    async fn get_module(&self, id: ModuleId) -> Result<Option<Module>>;

    /// Create a module. Names are unique and the download counter starts at 0.
    async fn create_module(&self, module: &NewModule) -> Result<Module>;

    /// Create a module with a preset download counter. Only used to seed the
    /// built-in catalog.
    async fn seed_module(&self, module: &NewModule, downloads: i64) -> Result<Module>;

    /// Apply a partial update to a module.
    async fn update_module(&self, id: ModuleId, update: &ModuleUpdate) -> Result<Module>;

    /// Delete a module together with every install relation pointing at it.
    ///
    /// # Returns
    /// `true` if the module was deleted, `false` if it didn't exist
    async fn delete_module(&self, id: ModuleId) -> Result<bool>;

    // === User Operations ===

    /// Create a principal. Usernames and emails are unique.
    async fn create_user(&self, user: &NewUser) -> Result<UserRecord>;

    async fn get_user(&self, id: UserId) -> Result<Option<UserRecord>>;

    async fn find_user_by_username(&self, username: &str) -> Result<Option<UserRecord>>;

    /// Change username and/or email, checking uniqueness against other users.
    async fn update_profile(&self, id: UserId, update: &ProfileUpdate) -> Result<UserRecord>;

    async fn set_password_hash(&self, id: UserId, password_hash: &str) -> Result<()>;

    // === Install Operations ===

    /// Record that `user` installed `module` and bump its download counter.
    ///
    /// Fails with `ModuleNotFound` if the module does not exist and with
    /// `AlreadyInstalled` if the relation is already present.
    async fn install_module(&self, user: UserId, module: ModuleId) -> Result<InstallRelation>;

    /// Remove the relation. The download counter is left as is.
    ///
    /// Fails with `NotInstalled` if there is no relation.
    async fn uninstall_module(&self, user: UserId, module: ModuleId) -> Result<()>;

    /// Ids of the modules `user` has installed, in install order.
    async fn installed_module_ids(&self, user: UserId) -> Result<Vec<ModuleId>>;

    /// The modules `user` has installed, in install order.
    async fn installed_modules(&self, user: UserId) -> Result<Vec<Module>>;

    async fn is_installed(&self, user: UserId, module: ModuleId) -> Result<bool> {
        Ok(self.installed_module_ids(user).await?.contains(&module))
    }
}

pub(crate) fn validate_new_module(module: &NewModule) -> Result<()> {
    use crate::error::StorageError;

    if module.name.trim().is_empty() {
        return Err(StorageError::InvalidModuleData {
            message: "name must not be empty".to_string(),
        });
    }
    if module.description.trim().is_empty() {
        return Err(StorageError::InvalidModuleData {
            message: "description must not be empty".to_string(),
        });
    }
    if module.content.is_empty() {
        return Err(StorageError::InvalidModuleData {
            message: "content must not be empty".to_string(),
        });
    }
    Ok(())
}

pub(crate) fn validate_new_user(user: &NewUser) -> Result<()> {
    use crate::error::StorageError;

    if user.username.trim().is_empty() {
        return Err(StorageError::InvalidUserData {
            message: "username must not be empty".to_string(),
        });
    }
    if !user.email.contains('@') {
        return Err(StorageError::InvalidUserData {
            message: format!("invalid email: {}", user.email),
        });
    }
    Ok(())
}
