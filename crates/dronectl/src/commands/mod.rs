pub mod catalog;
pub mod resources;

use std::path::Path;

use anyhow::Context;
use clap::ValueEnum;
use drone_core::RegistryConfig;
use drone_core::config::DEFAULT_WRITER_QUEUE_DEPTH;
use drone_registry::RedbRegistry;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

/// Open the registry described by `config_path`, or just `db` when there is
/// no config file.
pub async fn open_registry(config_path: &Path, db: Option<&Path>) -> anyhow::Result<RedbRegistry> {
    if config_path.exists() {
        let mut config = RegistryConfig::from_file(config_path)
            .with_context(|| format!("loading {}", config_path.display()))?;
        if let Some(db) = db {
            config.registry.db_file = db.to_path_buf();
        }
        debug!(config = %config_path.display(), "bootstrapping registry from config");
        return Ok(RedbRegistry::bootstrap(&config).await?);
    }

    let db = db.with_context(|| {
        format!(
            "{} not found; pass --db or create one with `dronectl init --scaffold`",
            config_path.display()
        )
    })?;
    debug!(db = %db.display(), "opening registry without config");
    Ok(RedbRegistry::open(db, DEFAULT_WRITER_QUEUE_DEPTH)?)
}
