use directories::ProjectDirs;
use eyre::Result;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;
use tokio::fs;

#[derive(Debug, Serialize, Deserialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub api: ApiConfig,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ApiConfig {
    /// Root of the HTTP API, including the `/api` prefix.
    pub url: String,
    /// Upper bound on each backend request.
    pub timeout_secs: u64,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            url: "http://localhost:5000/api".to_string(),
            timeout_secs: 10,
        }
    }
}

impl ApiConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl Config {
    pub fn get_config_path() -> PathBuf {
        get_default_config_dir().join("config.json")
    }

    pub fn get_data_dir() -> PathBuf {
        get_default_data_dir()
    }

    pub async fn load() -> Result<Self> {
        let config_path = Self::get_config_path();

        if !config_path.exists() {
            let default_config = Self::default();
            default_config.save().await?;
            return Ok(default_config);
        }

        let content = fs::read_to_string(&config_path).await?;
        let config: Config = serde_json::from_str(&content)?;
        Ok(config)
    }

    pub async fn save(&self) -> Result<()> {
        let config_path = Self::get_config_path();

        if let Some(parent) = config_path.parent() {
            fs::create_dir_all(parent).await?;
        }

        let content = serde_json::to_string_pretty(self)?;
        fs::write(&config_path, content).await?;
        Ok(())
    }

    pub fn set_value(&mut self, key: &str, value: &str) -> Result<()> {
        let parts: Vec<&str> = key.split('.').collect();

        match parts.as_slice() {
            ["api", "url"] => {
                url::Url::parse(value)
                    .map_err(|e| eyre::eyre!("Invalid URL '{}': {}", value, e))?;
                self.api.url = value.trim_end_matches('/').to_string();
            }
            ["api", "timeout_secs"] => {
                let secs = value
                    .parse::<u64>()
                    .map_err(|_| eyre::eyre!("Invalid number of seconds: {}", value))?;
                if secs == 0 {
                    return Err(eyre::eyre!("Timeout must be at least one second"));
                }
                self.api.timeout_secs = secs;
            }
            _ => {
                return Err(eyre::eyre!("Unknown configuration key: {}", key));
            }
        }

        Ok(())
    }

    pub fn get_value(&self, key: &str) -> Result<String> {
        let parts: Vec<&str> = key.split('.').collect();

        let value = match parts.as_slice() {
            ["api", "url"] => self.api.url.clone(),
            ["api", "timeout_secs"] => self.api.timeout_secs.to_string(),
            _ => {
                return Err(eyre::eyre!("Unknown configuration key: {}", key));
            }
        };

        Ok(value)
    }

    pub fn show_all(&self) -> String {
        format!(
            "Configuration:\n\
             API:\n\
             ├─ url: {}\n\
             └─ timeout_secs: {}\n\
             Data directory: {}",
            self.api.url,
            self.api.timeout_secs,
            Self::get_data_dir().display()
        )
    }

    pub async fn reset() -> Result<Self> {
        let config = Self::default();
        config.save().await?;
        Ok(config)
    }
}

fn get_default_config_dir() -> PathBuf {
    if let Some(proj_dirs) = ProjectDirs::from("org", "toolkit", "toolkit") {
        proj_dirs.config_dir().to_path_buf()
    } else {
        // Fallback to current directory if we can't determine project dirs
        PathBuf::from(".toolkit").join("config")
    }
}

fn get_default_data_dir() -> PathBuf {
    if let Some(proj_dirs) = ProjectDirs::from("org", "toolkit", "toolkit") {
        proj_dirs.data_dir().to_path_buf()
    } else {
        PathBuf::from(".toolkit").join("data")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_and_get_values() {
        let mut config = Config::default();

        config.set_value("api.url", "http://example.com:8080/api/").unwrap();
        config.set_value("api.timeout_secs", "3").unwrap();

        assert_eq!(
            config.get_value("api.url").unwrap(),
            "http://example.com:8080/api"
        );
        assert_eq!(config.api.timeout(), Duration::from_secs(3));
    }

    #[test]
    fn test_rejects_bad_values() {
        let mut config = Config::default();

        assert!(config.set_value("api.url", "not a url").is_err());
        assert!(config.set_value("api.timeout_secs", "soon").is_err());
        assert!(config.set_value("api.timeout_secs", "0").is_err());
        assert!(config.set_value("storage.path", "/tmp").is_err());
        assert!(config.get_value("api.nope").is_err());
    }

    #[test]
    fn test_missing_sections_use_defaults() {
        let config: Config = serde_json::from_str("{}").unwrap();
        assert_eq!(config.api.timeout_secs, 10);
    }
}
