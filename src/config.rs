use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use crate::error::{AppError, Result};

const CONFIG_ENV: &str = "GUEST_BOOK_CONFIG";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default = "default_db_path")]
    pub db_path: String,

    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,

    /// Scheme and host used to build absolute pagination links.
    #[serde(default = "default_public_url")]
    pub public_url: String,

    #[serde(default = "default_page_size")]
    pub page_size: u32,

    #[serde(default = "default_ttl_secs")]
    pub entry_count_ttl_secs: u64,

    #[serde(default = "default_ttl_secs")]
    pub user_list_ttl_secs: u64,
}

fn default_db_path() -> String {
    let data_dir = dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("guest-book");
    std::fs::create_dir_all(&data_dir).ok();
    data_dir.join("guest_book.db").to_string_lossy().to_string()
}

fn default_bind_addr() -> String {
    "127.0.0.1:8000".to_string()
}

fn default_public_url() -> String {
    "http://127.0.0.1:8000".to_string()
}

fn default_page_size() -> u32 {
    3
}

fn default_ttl_secs() -> u64 {
    30
}

impl Default for Config {
    fn default() -> Self {
        Self {
            db_path: default_db_path(),
            bind_addr: default_bind_addr(),
            public_url: default_public_url(),
            page_size: default_page_size(),
            entry_count_ttl_secs: default_ttl_secs(),
            user_list_ttl_secs: default_ttl_secs(),
        }
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        let config_path = Self::config_path();

        let config = if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)?;
            toml::from_str::<Config>(&content)?
        } else {
            let config = Config::default();
            config.save()?;
            config
        };

        config.validate()?;
        Ok(config)
    }

    pub fn save(&self) -> Result<()> {
        let config_path = Self::config_path();
        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)
            .map_err(|e| AppError::Config(e.to_string()))?;
        std::fs::write(config_path, content)?;
        Ok(())
    }

    pub fn config_path() -> PathBuf {
        if let Some(path) = std::env::var_os(CONFIG_ENV) {
            return PathBuf::from(path);
        }
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("guest-book")
            .join("config.toml")
    }

    fn validate(&self) -> Result<()> {
        if self.page_size == 0 {
            return Err(AppError::Config("page_size must be at least 1".to_string()));
        }
        url::Url::parse(&self.public_url)
            .map_err(|e| AppError::Config(format!("invalid public_url: {}", e)))?;
        Ok(())
    }

    pub fn entry_count_ttl(&self) -> Duration {
        Duration::from_secs(self.entry_count_ttl_secs)
    }

    pub fn user_list_ttl(&self) -> Duration {
        Duration::from_secs(self.user_list_ttl_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_keys_fall_back_to_defaults() {
        let config: Config = toml::from_str("page_size = 5\n").unwrap();
        assert_eq!(config.page_size, 5);
        assert_eq!(config.bind_addr, "127.0.0.1:8000");
        assert_eq!(config.entry_count_ttl(), Duration::from_secs(30));
        assert_eq!(config.user_list_ttl(), Duration::from_secs(30));
    }

    #[test]
    fn zero_page_size_is_rejected() {
        let config = Config {
            page_size: 0,
            ..Config::default()
        };
        assert!(matches!(config.validate(), Err(AppError::Config(_))));
    }

    #[test]
    fn unparsable_public_url_is_rejected() {
        let config = Config {
            public_url: "not a url".to_string(),
            ..Config::default()
        };
        assert!(matches!(config.validate(), Err(AppError::Config(_))));
    }
}
