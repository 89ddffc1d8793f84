pub mod account;
pub mod config;
pub mod install;
pub mod modules;

pub use account::{handle_login, handle_logout, handle_register, handle_whoami};
pub use config::handle_config_command;
pub use install::{handle_install, handle_installed, handle_uninstall};
pub use modules::handle_module_command;
