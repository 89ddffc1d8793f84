//! Supporting types for the storage layer.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use toolkit_types::{Category, Module, ModuleId, UserId, UserProjection};

/// A stored principal, including its password hash.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserRecord {
    pub id: UserId,
    pub username: String,
    pub email: String,
    pub password_hash: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl UserRecord {
    /// Client-facing projection of this principal.
    pub fn projection(&self, installed_modules: Vec<ModuleId>) -> UserProjection {
        UserProjection {
            id: self.id,
            username: self.username.clone(),
            email: self.email.clone(),
            created_at: Some(self.created_at),
            updated_at: Some(self.updated_at),
            installed_modules,
        }
    }
}

/// Data needed to create a principal. The password must already be hashed.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub username: String,
    pub email: String,
    pub password_hash: String,
}

/// The durable fact that a principal has installed a module.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstallRelation {
    pub user_id: UserId,
    pub module_id: ModuleId,
    pub installed_at: DateTime<Utc>,
}

/// Filter criteria for listing modules.
#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub struct ModuleFilter {
    pub category: Option<Category>,
    /// Case-insensitive substring of name or description, or an exact tag.
    pub text: Option<String>,
}

impl ModuleFilter {
    pub fn category(category: Category) -> Self {
        Self {
            category: Some(category),
            text: None,
        }
    }

    pub fn text(text: impl Into<String>) -> Self {
        Self {
            category: None,
            text: Some(text.into()),
        }
    }

    pub fn matches(&self, module: &Module) -> bool {
        if let Some(category) = self.category {
            if module.category != category {
                return false;
            }
        }
        if let Some(text) = &self.text {
            let needle = text.to_lowercase();
            let hit = module.name.to_lowercase().contains(&needle)
                || module.description.to_lowercase().contains(&needle)
                || module.tags.iter().any(|t| t == text);
            if !hit {
                return false;
            }
        }
        true
    }
}
