use anyhow::Result;
use chrono::Duration;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub database: DatabaseConfig,
    pub web: WebConfig,
    pub profiles: ProfilesConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: Option<u32>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebConfig {
    pub host: String,
    pub port: u16,
}

/// Settings for the remote profile source and the image cache.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProfilesConfig {
    /// Base URL of the public profile pages, keyed by avatar id
    pub resident_base_url: String,
    /// Base URL of the picture service serving the resolved images
    pub picture_base_url: String,
    pub user_agent: String,
    /// Hours after which a cached image record is treated as stale
    pub freshness_hours: i64,
}

impl ProfilesConfig {
    pub fn freshness_window(&self) -> Duration {
        Duration::hours(self.freshness_hours)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database: DatabaseConfig {
                url: "sqlite://./avatar-relay.db".to_string(),
                max_connections: Some(10),
            },
            web: WebConfig {
                host: "0.0.0.0".to_string(),
                port: 8080,
            },
            profiles: ProfilesConfig {
                resident_base_url: "https://world.secondlife.com/resident".to_string(),
                picture_base_url: "https://picture-service.secondlife.com".to_string(),
                user_agent: "avatar-relay/1.0".to_string(),
                freshness_hours: 24,
            },
        }
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        let config_file =
            std::env::var("CONFIG_FILE").unwrap_or_else(|_| "config.toml".to_string());

        if std::path::Path::new(&config_file).exists() {
            let contents = std::fs::read_to_string(&config_file)?;
            Ok(toml::from_str(&contents)?)
        } else {
            let default_config = Self::default();
            let contents = toml::to_string_pretty(&default_config)?;
            std::fs::write(&config_file, contents)?;
            Ok(default_config)
        }
    }
}
