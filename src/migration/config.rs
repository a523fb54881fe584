//! Migration configuration
//!
//! Built from defaults, optionally loaded from YAML, then overridden field by
//! field from CLI flags.

use super::batch::DEFAULT_BATCH_SIZE;
use super::schema::Stage;
use crate::linker::LinkStrategy;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("I/O error reading config: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid config file: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("Invalid config: {0}")]
    Invalid(String),
}

pub type ConfigResult<T> = Result<T, ConfigError>;

/// Everything a migration run needs
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MigrationConfig {
    /// SQLite catalog to read from
    pub source: PathBuf,
    /// Graph snapshot to load before and save after the run; in-memory only when unset
    pub target: Option<PathBuf>,
    pub batch_size: usize,
    /// Stages to run; always executed in canonical order
    pub stages: Vec<Stage>,
    pub link_strategy: LinkStrategy,
}

impl Default for MigrationConfig {
    fn default() -> Self {
        Self {
            source: PathBuf::from("catalog.db"),
            target: None,
            batch_size: DEFAULT_BATCH_SIZE,
            stages: Stage::ALL.to_vec(),
            link_strategy: LinkStrategy::default(),
        }
    }
}

impl MigrationConfig {
    pub fn new(source: impl Into<PathBuf>) -> Self {
        Self {
            source: source.into(),
            ..Default::default()
        }
    }

    pub fn with_target(mut self, target: impl Into<PathBuf>) -> Self {
        self.target = Some(target.into());
        self
    }

    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size;
        self
    }

    pub fn with_stages(mut self, stages: impl IntoIterator<Item = Stage>) -> Self {
        self.stages = stages.into_iter().collect();
        self
    }

    pub fn with_link_strategy(mut self, strategy: LinkStrategy) -> Self {
        self.link_strategy = strategy;
        self
    }

    /// Parse a YAML document; missing fields take their defaults
    pub fn from_yaml(text: &str) -> ConfigResult<Self> {
        let config: Self = serde_yaml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: impl AsRef<Path>) -> ConfigResult<Self> {
        Self::from_yaml(&std::fs::read_to_string(path)?)
    }

    pub fn to_yaml(&self) -> ConfigResult<String> {
        Ok(serde_yaml::to_string(self)?)
    }

    pub fn validate(&self) -> ConfigResult<()> {
        if self.batch_size == 0 {
            return Err(ConfigError::Invalid("batch_size must be at least 1".to_string()));
        }
        if self.source.as_os_str().is_empty() {
            return Err(ConfigError::Invalid("source must name a catalog database".to_string()));
        }
        if self.stages.is_empty() {
            return Err(ConfigError::Invalid("at least one stage must be selected".to_string()));
        }
        Ok(())
    }

    /// Selected stages, deduplicated, in canonical order
    pub fn ordered_stages(&self) -> Vec<Stage> {
        Stage::canonical(&self.stages)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_defaults() {
        let config = MigrationConfig::default();
        assert_eq!(config.batch_size, 1000);
        assert_eq!(config.ordered_stages(), Stage::ALL.to_vec());
        assert_eq!(config.link_strategy, LinkStrategy::Indexed);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_yaml_uses_defaults() {
        let config = MigrationConfig::from_yaml(
            "source: data/catalog.db\nbatch_size: 250\nstages: [linked_to, books]\nlink_strategy: naive\n",
        )
        .unwrap();

        assert_eq!(config.source, PathBuf::from("data/catalog.db"));
        assert_eq!(config.batch_size, 250);
        assert_eq!(config.ordered_stages(), vec![Stage::Books, Stage::LinkedTo]);
        assert_eq!(config.link_strategy, LinkStrategy::Naive);
        assert!(config.target.is_none());
    }

    #[test]
    fn test_validation() {
        assert!(MigrationConfig::default().with_batch_size(0).validate().is_err());
        assert!(MigrationConfig::new("").validate().is_err());
        assert!(MigrationConfig::default().with_stages(Vec::new()).validate().is_err());
        assert!(matches!(
            MigrationConfig::from_yaml("batch_size: 0"),
            Err(ConfigError::Invalid(_))
        ));
        assert!(matches!(
            MigrationConfig::from_yaml("stages: [publishers]"),
            Err(ConfigError::Yaml(_))
        ));
    }

    #[test]
    fn test_load_from_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("migrate.yaml");
        let config = MigrationConfig::new("catalog.db").with_target("graph.json.gz");
        std::fs::write(&path, config.to_yaml().unwrap()).unwrap();

        assert_eq!(MigrationConfig::load(&path).unwrap(), config);
    }
}
