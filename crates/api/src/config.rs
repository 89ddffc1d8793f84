use std::path::Path;

use serde::Deserialize;

/// Server configuration.
///
/// Layered from built-in defaults, an optional `toolkit.toml` (or the file
/// passed with `--config`) and `TOOLKIT_*` environment variables, with nested
/// keys separated by `__` (e.g. `TOOLKIT_DATABASE__URL`).
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub cors_max_age_secs: u64,
    pub database: DatabaseConfig,
    pub auth: AuthConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    /// PostgreSQL connection string. Without one the server keeps its data
    /// in memory.
    #[serde(default)]
    pub url: Option<String>,
    pub max_connections: u32,
    /// Insert the built-in catalog on startup when its modules are missing.
    pub seed: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AuthConfig {
    /// HS256 signing secret. A random one is generated when unset, which
    /// invalidates issued tokens on restart.
    #[serde(default)]
    pub jwt_secret: Option<String>,
    pub token_ttl_days: i64,
}

impl ServerConfig {
    pub fn load(path: Option<&Path>) -> Result<Self, config::ConfigError> {
        let mut builder = config::Config::builder()
            .set_default("host", "0.0.0.0")?
            .set_default("port", 5000_i64)?
            .set_default("cors_max_age_secs", 3600_i64)?
            .set_default("database.max_connections", 10_i64)?
            .set_default("database.seed", true)?
            .set_default("auth.token_ttl_days", 7_i64)?;

        builder = match path {
            Some(path) => builder.add_source(config::File::from(path).required(true)),
            None => builder.add_source(config::File::with_name("toolkit").required(false)),
        };

        builder
            .add_source(
                config::Environment::with_prefix("TOOLKIT")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
