//! Error types for the storage layer.

use thiserror::Error;
use toolkit_types::{ModuleId, UserId};

/// Errors that can occur during storage operations.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Module not found: {id}")]
    ModuleNotFound { id: ModuleId },

    #[error("Module already exists: {name}")]
    ModuleAlreadyExists { name: String },

    #[error("Invalid module data: {message}")]
    InvalidModuleData { message: String },

    #[error("User not found: {id}")]
    UserNotFound { id: UserId },

    #[error("User with this {field} already exists")]
    UserAlreadyExists { field: &'static str },

    #[error("Invalid user data: {message}")]
    InvalidUserData { message: String },

    #[error("Module {module_id} is already installed for user {user_id}")]
    AlreadyInstalled { user_id: UserId, module_id: ModuleId },

    #[error("Module {module_id} is not installed for user {user_id}")]
    NotInstalled { user_id: UserId, module_id: ModuleId },

    #[error("Data conversion failed: {message}")]
    DataConversionError {
        message: String,
        #[source]
        source: Option<eyre::Report>,
    },

    #[error("Storage backend error")]
    BackendError {
        #[source]
        source: Option<eyre::Report>,
    },
}

impl StorageError {
    pub(crate) fn backend(err: impl Into<eyre::Report>) -> Self {
        StorageError::BackendError {
            source: Some(err.into()),
        }
    }
}

/// Result type alias for storage operations.
pub type Result<T> = std::result::Result<T, StorageError>;
