//! Error types for the client core.

use std::fmt;

use thiserror::Error;
use toolkit_types::{ErrorBody, ModuleId};

/// Coarse classification of a [`ClientError`], for display and for deciding
/// how a caller should react.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    Unauthenticated,
    NotFound,
    Conflict,
    NetworkUnreachable,
    ServerError,
    Rejected,
    /// Local misconfiguration, such as an unparsable API url.
    Configuration,
}

impl ErrorCategory {
    pub fn label(self) -> &'static str {
        match self {
            ErrorCategory::Unauthenticated => "Not signed in",
            ErrorCategory::NotFound => "Not found",
            ErrorCategory::Conflict => "Conflict",
            ErrorCategory::NetworkUnreachable => "Backend unreachable",
            ErrorCategory::ServerError => "Server error",
            ErrorCategory::Rejected => "Request rejected",
            ErrorCategory::Configuration => "Invalid configuration",
        }
    }
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Errors surfaced by the client core.
#[derive(Debug, Error)]
pub enum ClientError {
    /// No principal is signed in, or the backend refused the token.
    #[error("Not signed in")]
    Unauthenticated,

    /// The module, or the install relation, does not exist server-side.
    #[error("Not found: {message}")]
    NotFound { message: String },

    /// The install relation already exists server-side.
    #[error("Conflict: {message}")]
    Conflict { message: String },

    /// No response was received: connection failure or timeout.
    #[error("Backend unreachable: {message}")]
    NetworkUnreachable {
        message: String,
        #[source]
        source: Option<reqwest::Error>,
    },

    /// 5xx, or a success status with a body of the wrong shape.
    #[error("Server error ({status}): {message}")]
    ServerError { status: u16, message: String },

    /// Any other 4xx: bad credentials, validation failures.
    #[error("{message}")]
    Rejected {
        status: u16,
        code: String,
        message: String,
    },

    /// The module id is not part of the loaded catalog.
    #[error("Unknown module: {0}")]
    UnknownModule(ModuleId),

    #[error("Invalid client configuration: {message}")]
    InvalidConfig { message: String },
}

impl ClientError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            ClientError::Unauthenticated => ErrorCategory::Unauthenticated,
            ClientError::NotFound { .. } | ClientError::UnknownModule(_) => ErrorCategory::NotFound,
            ClientError::Conflict { .. } => ErrorCategory::Conflict,
            ClientError::NetworkUnreachable { .. } => ErrorCategory::NetworkUnreachable,
            ClientError::ServerError { .. } => ErrorCategory::ServerError,
            ClientError::Rejected { .. } => ErrorCategory::Rejected,
            ClientError::InvalidConfig { .. } => ErrorCategory::Configuration,
        }
    }

    pub(crate) fn unreachable(message: impl Into<String>) -> Self {
        ClientError::NetworkUnreachable {
            message: message.into(),
            source: None,
        }
    }

    /// Classify a non-2xx response.
    pub fn from_response(status: u16, body: ErrorBody) -> Self {
        let ErrorBody { message, code } = body;
        match (status, code.as_str()) {
            (401, _) => ClientError::Unauthenticated,
            (_, "already_installed") | (409, _) => ClientError::Conflict { message },
            (_, "not_installed") | (404, _) => ClientError::NotFound { message },
            (500..=599, _) => ClientError::ServerError { status, message },
            _ => ClientError::Rejected {
                status,
                code,
                message,
            },
        }
    }
}

impl From<reqwest::Error> for ClientError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            return ClientError::ServerError {
                status: err.status().map(|s| s.as_u16()).unwrap_or(200),
                message: format!("unexpected response body: {}", err),
            };
        }
        let message = if err.is_timeout() {
            "request timed out".to_string()
        } else {
            err.to_string()
        };
        ClientError::NetworkUnreachable {
            message,
            source: Some(err),
        }
    }
}

/// Result type alias for client operations.
pub type Result<T> = std::result::Result<T, ClientError>;

#[cfg(test)]
mod tests {
    use super::*;

    fn body(code: &str) -> ErrorBody {
        ErrorBody {
            message: "msg".to_string(),
            code: code.to_string(),
        }
    }

    #[test]
    fn test_classifies_backend_responses() {
        assert!(matches!(
            ClientError::from_response(401, body("unauthenticated")),
            ClientError::Unauthenticated
        ));
        assert_eq!(
            ClientError::from_response(400, body("already_installed")).category(),
            ErrorCategory::Conflict
        );
        assert_eq!(
            ClientError::from_response(400, body("not_installed")).category(),
            ErrorCategory::NotFound
        );
        assert_eq!(
            ClientError::from_response(404, body("module_not_found")).category(),
            ErrorCategory::NotFound
        );
        assert_eq!(
            ClientError::from_response(503, body("")).category(),
            ErrorCategory::ServerError
        );
        assert_eq!(
            ClientError::from_response(400, body("invalid_credentials")).category(),
            ErrorCategory::Rejected
        );
    }

    #[test]
    fn test_category_labels() {
        assert_eq!(
            ClientError::unreachable("down").category().to_string(),
            "Backend unreachable"
        );
        let config = ClientError::InvalidConfig {
            message: "bad url".to_string(),
        };
        assert_eq!(config.category(), ErrorCategory::Configuration);
        assert_eq!(config.category().label(), "Invalid configuration");
    }
}
