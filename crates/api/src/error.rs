use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;
use toolkit_storage::StorageError;
use toolkit_types::{ErrorBody, ModuleId};
use tracing::error;

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("No token, authorization denied")]
    MissingToken,

    #[error("Token is not valid")]
    InvalidToken,

    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("Current password is incorrect")]
    WrongPassword,

    #[error("Module not found: {0}")]
    ModuleNotFound(ModuleId),

    #[error("User not found")]
    UserNotFound,

    #[error("Module is already installed")]
    AlreadyInstalled,

    #[error("Module is not installed")]
    NotInstalled,

    #[error("{0}")]
    AlreadyExists(String),

    #[error("{0}")]
    BadRequest(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::MissingToken | ApiError::InvalidToken => StatusCode::UNAUTHORIZED,
            ApiError::ModuleNotFound(_) | ApiError::UserNotFound => StatusCode::NOT_FOUND,
            ApiError::InvalidCredentials
            | ApiError::WrongPassword
            | ApiError::AlreadyInstalled
            | ApiError::NotInstalled
            | ApiError::AlreadyExists(_)
            | ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Stable machine-readable code sent alongside the message.
    pub fn code(&self) -> &'static str {
        match self {
            ApiError::MissingToken | ApiError::InvalidToken => "unauthenticated",
            ApiError::InvalidCredentials => "invalid_credentials",
            ApiError::WrongPassword => "wrong_password",
            ApiError::ModuleNotFound(_) => "module_not_found",
            ApiError::UserNotFound => "user_not_found",
            ApiError::AlreadyInstalled => "already_installed",
            ApiError::NotInstalled => "not_installed",
            ApiError::AlreadyExists(_) => "already_exists",
            ApiError::BadRequest(_) => "bad_request",
            ApiError::Internal(_) => "internal",
        }
    }
}

impl From<StorageError> for ApiError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::ModuleNotFound { id } => ApiError::ModuleNotFound(id),
            StorageError::UserNotFound { .. } => ApiError::UserNotFound,
            StorageError::AlreadyInstalled { .. } => ApiError::AlreadyInstalled,
            StorageError::NotInstalled { .. } => ApiError::NotInstalled,
            StorageError::ModuleAlreadyExists { name } => {
                ApiError::AlreadyExists(format!("A module named '{}' already exists", name))
            }
            StorageError::UserAlreadyExists { field } => {
                ApiError::AlreadyExists(format!("A user with this {} already exists", field))
            }
            StorageError::InvalidModuleData { message }
            | StorageError::InvalidUserData { message } => ApiError::BadRequest(message),
            other => {
                error!("Storage failure: {:?}", other);
                ApiError::Internal(other.to_string())
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = ErrorBody {
            message: self.to_string(),
            code: self.code().to_string(),
        };

        (status, Json(body)).into_response()
    }
}
