//! registry.toml configuration parser.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Default depth of the registry's write queue.
pub const DEFAULT_WRITER_QUEUE_DEPTH: usize = 64;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("failed to render config: {0}")]
    Render(#[from] toml::ser::Error),
    #[error("site {0:?} is configured more than once")]
    DuplicateSite(String),
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RegistryConfig {
    pub registry: RegistrySettings,
    #[serde(default)]
    pub sites: Vec<SiteConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RegistrySettings {
    pub db_file: PathBuf,
    #[serde(default = "default_writer_queue_depth")]
    pub writer_queue_depth: usize,
}

/// A site and the machine types it offers.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SiteConfig {
    pub name: String,
    #[serde(default)]
    pub machine_types: Vec<String>,
}

fn default_writer_queue_depth() -> usize {
    DEFAULT_WRITER_QUEUE_DEPTH
}

impl RegistryConfig {
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        content.parse()
    }

    pub fn to_toml_string(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// A starter config with one example site.
    pub fn scaffold(db_file: impl Into<PathBuf>) -> Self {
        RegistryConfig {
            registry: RegistrySettings {
                db_file: db_file.into(),
                writer_queue_depth: DEFAULT_WRITER_QUEUE_DEPTH,
            },
            sites: vec![SiteConfig {
                name: "MySite".to_string(),
                machine_types: vec!["m1.small".to_string(), "m1.large".to_string()],
            }],
        }
    }

    fn validate(&self) -> Result<(), ConfigError> {
        let mut seen = std::collections::HashSet::new();
        for site in &self.sites {
            if !seen.insert(site.name.as_str()) {
                return Err(ConfigError::DuplicateSite(site.name.clone()));
            }
        }
        Ok(())
    }
}

impl std::str::FromStr for RegistryConfig {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let config: RegistryConfig = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }
}
