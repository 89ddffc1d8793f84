//! Shared data and wire types for the toolkit backend and its clients.
//!
//! Everything that crosses the HTTP boundary lives here so the server
//! (`toolkit_api`) and the client core (`toolkit_client`) agree on field
//! names and shapes. JSON field names are camelCase.

pub mod builtin;
pub mod module;
pub mod user;
pub mod wire;

pub use builtin::{BuiltinModule, builtin_modules};
pub use module::{
    Category, DEMO_ID_MAX, Module, ModuleId, ModuleRef, ModuleUpdate, NewModule,
    ParseCategoryError,
};
pub use user::{UserId, UserProjection};
pub use wire::{
    AuthResponse, ErrorBody, InstallResponse, LoginRequest, MessageResponse, PasswordChange,
    ProfileUpdate, RegisterRequest,
};

/// Header carrying the bearer token on authenticated requests.
pub const AUTH_HEADER: &str = "x-auth-token";
