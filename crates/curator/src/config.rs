//! Configuration loading and persistence.

use crate::repository::{CuratorConfig, ManagedRepository};
use anyhow::{Context, Result};
use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use std::path::{Path, PathBuf};

/// Service for configuration management.
pub struct ConfigService {
    config_path: PathBuf,
}

impl ConfigService {
    pub fn new(root: &Path) -> Self {
        let config_path = root.join(".curator").join("config.toml");
        Self { config_path }
    }

    /// Initialize configuration with defaults.
    pub fn init(&self) -> Result<CuratorConfig> {
        let config = CuratorConfig::default();
        self.save(&config)?;
        Ok(config)
    }

    /// Load configuration from file, with env var overrides (CURATOR_
    /// prefix, __ separator).
    pub fn load(&self) -> Result<CuratorConfig> {
        let mut figment = Figment::from(Serialized::defaults(CuratorConfig::default()));

        if self.config_path.exists() {
            figment = figment.merge(Toml::file(&self.config_path));
        }

        figment = figment.merge(Env::prefixed("CURATOR_").split("__"));

        let config: CuratorConfig = figment.extract().context("Failed to load configuration")?;
        Ok(config)
    }

    /// Save configuration to file.
    pub fn save(&self, config: &CuratorConfig) -> Result<()> {
        let content = toml::to_string_pretty(config).context("Failed to serialize config")?;

        if let Some(parent) = self.config_path.parent() {
            std::fs::create_dir_all(parent).context("Failed to create config directory")?;
        }

        std::fs::write(&self.config_path, content).context("Failed to write config file")?;
        Ok(())
    }

    /// Register a managed repository. Returns false when the id is taken.
    pub fn add_repository(&self, repository: ManagedRepository) -> Result<bool> {
        let mut config = self.load()?;
        if config.repository(&repository.id).is_some() {
            return Ok(false);
        }
        config.repositories.push(repository);
        self.save(&config)?;
        Ok(true)
    }

    /// Drop a managed repository from the configuration.
    pub fn remove_repository(&self, id: &str) -> Result<bool> {
        let mut config = self.load()?;
        let before = config.repositories.len();
        config.repositories.retain(|r| r.id != id);
        let removed = config.repositories.len() != before;
        if removed {
            self.save(&config)?;
        }
        Ok(removed)
    }

    /// Get a retention setting by `repository.<id>.<field>` key.
    pub fn get(&self, key: &str) -> Result<String> {
        let config = self.load()?;
        let (id, field) = split_repository_key(key)?;
        let repository = config
            .repository(id)
            .ok_or_else(|| anyhow::anyhow!("Unknown repository: {}", id))?;
        match field {
            "retention_count" => Ok(repository.retention_count.to_string()),
            "retention_period_days" => Ok(repository.retention_period_days.to_string()),
            "delete_released_snapshots" => Ok(repository.delete_released_snapshots.to_string()),
            "cross_repository_search" => Ok(repository.cross_repository_search.to_string()),
            _ => Err(anyhow::anyhow!("Unknown config key: {}", key)),
        }
    }

    /// Set a retention setting by `repository.<id>.<field>` key.
    pub fn set(&self, key: &str, value: &str) -> Result<()> {
        let mut config = self.load()?;
        let (id, field) = split_repository_key(key)?;
        let repository = config
            .repositories
            .iter_mut()
            .find(|r| r.id == id)
            .ok_or_else(|| anyhow::anyhow!("Unknown repository: {}", id))?;
        match field {
            "retention_count" => {
                repository.retention_count =
                    value.parse().context("retention_count must be an integer")?
            }
            "retention_period_days" => {
                repository.retention_period_days = value
                    .parse()
                    .context("retention_period_days must be an integer")?
            }
            "delete_released_snapshots" => {
                repository.delete_released_snapshots =
                    value.parse().context("delete_released_snapshots must be a bool")?
            }
            "cross_repository_search" => {
                repository.cross_repository_search =
                    value.parse().context("cross_repository_search must be a bool")?
            }
            _ => return Err(anyhow::anyhow!("Unknown config key: {}", key)),
        }
        self.save(&config)?;
        Ok(())
    }

    /// Check if configuration exists.
    pub fn exists(&self) -> bool {
        self.config_path.exists()
    }
}

fn split_repository_key(key: &str) -> Result<(&str, &str)> {
    let mut parts = key.splitn(3, '.');
    match (parts.next(), parts.next(), parts.next()) {
        (Some("repository"), Some(id), Some(field)) => Ok((id, field)),
        _ => Err(anyhow::anyhow!(
            "Expected repository.<id>.<field>, got: {}",
            key
        )),
    }
}
