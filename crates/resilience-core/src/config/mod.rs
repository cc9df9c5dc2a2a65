//! Configuration management with file persistence

use crate::error::{Error, Result};
use crate::storage::{DATABASE_FILE_NAME, DatabaseConfig, default_data_dir};
use anyhow::{Context, anyhow};
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::PathBuf;

/// Resilience configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub storage: StorageConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    pub file_name: String,
    /// Overrides the platform's private data directory
    pub data_dir: Option<PathBuf>,
    pub max_connections: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    pub filter: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            storage: StorageConfig {
                file_name: DATABASE_FILE_NAME.to_string(),
                data_dir: None,
                max_connections: 5,
            },
            logging: LoggingConfig {
                filter: "resilience=info".to_string(),
            },
        }
    }
}

impl StorageConfig {
    /// Full path of the database file
    pub fn database_path(&self) -> PathBuf {
        let dir = self.data_dir.clone().unwrap_or_else(default_data_dir);
        dir.join(&self.file_name)
    }
}

impl Config {
    /// Get the config directory path
    pub fn config_dir() -> anyhow::Result<PathBuf> {
        let dir = if let Ok(custom_dir) = env::var("RESILIENCE_CONFIG_DIR") {
            PathBuf::from(custom_dir)
        } else {
            dirs::config_dir()
                .ok_or_else(|| anyhow!("Could not determine config directory"))?
                .join("resilience")
        };
        Ok(dir)
    }

    /// Get the config file path
    pub fn config_path() -> anyhow::Result<PathBuf> {
        Ok(Self::config_dir()?.join("config.toml"))
    }

    /// Load configuration from file, or fall back to defaults if it doesn't exist
    pub fn load() -> anyhow::Result<Self> {
        let path = Self::config_path()?;

        if path.exists() {
            let contents = fs::read_to_string(&path)
                .with_context(|| format!("Failed to read config file: {}", path.display()))?;
            let config: Config = toml::from_str(&contents)
                .with_context(|| format!("Failed to parse config file: {}", path.display()))?;
            config.validate()?;
            Ok(config)
        } else {
            Ok(Config::default())
        }
    }

    /// Save configuration to file
    pub fn save(&self) -> anyhow::Result<()> {
        self.validate()?;

        let dir = Self::config_dir()?;
        fs::create_dir_all(&dir)
            .with_context(|| format!("Failed to create config directory: {}", dir.display()))?;

        let path = Self::config_path()?;
        let contents = toml::to_string_pretty(self).context("Failed to serialize config")?;

        fs::write(&path, contents)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;

        Ok(())
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.storage.file_name.trim().is_empty() {
            return Err(Error::Config("storage.file_name cannot be empty".to_string()));
        }
        if self.storage.max_connections == 0 {
            return Err(Error::Config(
                "storage.max_connections must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    /// Database settings derived from this configuration
    pub fn database_config(&self) -> DatabaseConfig {
        DatabaseConfig::with_path(self.storage.database_path())
            .max_connections(self.storage.max_connections)
    }

    /// Get a configuration value by key
    pub fn get(&self, key: &str) -> anyhow::Result<String> {
        match key {
            "storage.file_name" => Ok(self.storage.file_name.clone()),
            "storage.data_dir" => Ok(self
                .storage
                .data_dir
                .as_ref()
                .map(|d| d.display().to_string())
                .unwrap_or_else(|| format!("(default: {})", default_data_dir().display()))),
            "storage.max_connections" => Ok(self.storage.max_connections.to_string()),
            "logging.filter" => Ok(self.logging.filter.clone()),
            _ => Err(anyhow!(
                "Unknown configuration key: {}. Use `resilience config list` to see available keys.",
                key
            )),
        }
    }

    /// Set a configuration value by key
    pub fn set(&mut self, key: &str, value: &str) -> anyhow::Result<()> {
        match key {
            "storage.file_name" => {
                if value.trim().is_empty() {
                    return Err(Error::Config("storage.file_name cannot be empty".to_string()).into());
                }
                self.storage.file_name = value.to_string();
            }
            "storage.data_dir" => {
                self.storage.data_dir = if value.is_empty() {
                    None
                } else {
                    Some(PathBuf::from(value))
                };
            }
            "storage.max_connections" => {
                let max: u32 = value
                    .parse()
                    .with_context(|| format!("Invalid max_connections value: {}", value))?;
                if max == 0 {
                    return Err(Error::Config(
                        "storage.max_connections must be at least 1".to_string(),
                    )
                    .into());
                }
                self.storage.max_connections = max;
            }
            "logging.filter" => {
                self.logging.filter = value.to_string();
            }
            _ => {
                return Err(anyhow!(
                    "Unknown configuration key: {}. Use `resilience config list` to see available keys.",
                    key
                ));
            }
        }
        Ok(())
    }

    /// List all configuration keys and their values
    pub fn list(&self) -> anyhow::Result<Vec<(String, String)>> {
        let keys = [
            "storage.file_name",
            "storage.data_dir",
            "storage.max_connections",
            "logging.filter",
        ];

        keys.into_iter()
            .map(|key| {
                let value = self.get(key)?;
                Ok((key.to_string(), value))
            })
            .collect()
    }
}
