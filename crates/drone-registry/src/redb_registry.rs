//! RedbRegistry — the redb-backed [`Registry`] implementation.
//!
//! Writes are funnelled through the single writer thread; reads run on
//! tokio's blocking pool against their own MVCC snapshot and proceed
//! concurrently with each other and with the writer.

use std::collections::BTreeSet;
use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use drone_core::config::DEFAULT_WRITER_QUEUE_DEPTH;
use drone_core::{
    DroneState, RegistryConfig, ResourceAttributes, ResourceFilter, ResourceRecord,
    ResourceStateRecord,
};
use tracing::info;

use crate::error::{RegistryResult, StorageError};
use crate::registry::Registry;
use crate::store::{RegistryStore, Transition};
use crate::writer::Writer;

/// Cheaply cloneable handle; the writer thread stops when the last clone is dropped.
#[derive(Clone)]
pub struct RedbRegistry {
    inner: Arc<Inner>,
}

struct Inner {
    // Dropped first so queued writes finish before the database closes.
    writer: Writer,
    store: RegistryStore,
}

impl RedbRegistry {
    /// Open (or create) a registry file, deploy the schema and start the writer.
    pub fn open(path: &Path, writer_queue_depth: usize) -> RegistryResult<Self> {
        Self::with_store(RegistryStore::open(path)?, writer_queue_depth)
    }

    /// Ephemeral registry for tests and dry runs.
    pub fn open_in_memory() -> RegistryResult<Self> {
        Self::with_store(RegistryStore::open_in_memory()?, DEFAULT_WRITER_QUEUE_DEPTH)
    }

    fn with_store(store: RegistryStore, writer_queue_depth: usize) -> RegistryResult<Self> {
        let writer = Writer::spawn(store.clone(), writer_queue_depth)?;
        Ok(Self {
            inner: Arc::new(Inner { writer, store }),
        })
    }

    /// Open the configured registry file and register every configured site
    /// and machine type.
    pub async fn bootstrap(config: &RegistryConfig) -> RegistryResult<Self> {
        let path = config.registry.db_file.clone();
        let depth = config.registry.writer_queue_depth;
        let registry = tokio::task::spawn_blocking(move || Self::open(&path, depth))
            .await
            .map_err(|e| StorageError::Worker(e.to_string()))??;

        for site in &config.sites {
            registry.add_site(&site.name).await?;
            for machine_type in &site.machine_types {
                registry.add_machine_types(&site.name, machine_type).await?;
            }
        }
        info!(
            db_file = ?config.registry.db_file,
            sites = config.sites.len(),
            "registry bootstrapped"
        );
        Ok(registry)
    }

    /// Re-run schema deployment. Returns the number of newly seeded states.
    pub async fn initialize(&self) -> RegistryResult<usize> {
        self.write(|store| store.initialize()).await
    }

    /// Like [`Registry::notify`], but reports what happened to the row.
    pub async fn notify_transition(
        &self,
        state: DroneState,
        attributes: ResourceAttributes,
    ) -> RegistryResult<Transition> {
        self.write(move |store| store.notify(state, &attributes))
            .await
    }

    pub async fn table_names(&self) -> RegistryResult<BTreeSet<String>> {
        self.read(|store| store.table_names()).await
    }

    pub async fn state_catalogue(&self) -> RegistryResult<Vec<String>> {
        self.read(|store| store.state_catalogue()).await
    }

    pub async fn get_sites(&self) -> RegistryResult<Vec<String>> {
        self.read(|store| store.get_sites()).await
    }

    pub async fn get_machine_types(&self) -> RegistryResult<Vec<(String, String)>> {
        self.read(|store| store.get_machine_types()).await
    }

    async fn write<T, F>(&self, f: F) -> RegistryResult<T>
    where
        F: FnOnce(&RegistryStore) -> RegistryResult<T> + Send + 'static,
        T: Send + 'static,
    {
        self.inner.writer.submit(f).await
    }

    async fn read<T, F>(&self, f: F) -> RegistryResult<T>
    where
        F: FnOnce(&RegistryStore) -> RegistryResult<T> + Send + 'static,
        T: Send + 'static,
    {
        let store = self.inner.store.clone();
        tokio::task::spawn_blocking(move || f(&store))
            .await
            .map_err(|e| StorageError::Worker(e.to_string()))?
    }
}

#[async_trait]
impl Registry for RedbRegistry {
    async fn add_site(&self, site_name: &str) -> RegistryResult<()> {
        let site_name = site_name.to_string();
        self.write(move |store| store.add_site(&site_name)).await?;
        Ok(())
    }

    async fn add_machine_types(&self, site_name: &str, machine_type: &str) -> RegistryResult<()> {
        let site_name = site_name.to_string();
        let machine_type = machine_type.to_string();
        self.write(move |store| store.add_machine_types(&site_name, &machine_type))
            .await?;
        Ok(())
    }

    async fn notify(&self, state: DroneState, attributes: ResourceAttributes) -> RegistryResult<()> {
        self.notify_transition(state, attributes).await?;
        Ok(())
    }

    async fn insert_resource(
        &self,
        state: DroneState,
        attributes: ResourceAttributes,
    ) -> RegistryResult<()> {
        self.write(move |store| store.insert_resource(state, &attributes))
            .await
    }

    async fn get_resources(&self, filter: ResourceFilter) -> RegistryResult<Vec<ResourceRecord>> {
        self.read(move |store| store.get_resources(&filter)).await
    }

    async fn get_resource_state(
        &self,
        drone_uuid: &str,
    ) -> RegistryResult<Option<ResourceStateRecord>> {
        let drone_uuid = drone_uuid.to_string();
        self.read(move |store| store.get_resource_state(&drone_uuid))
            .await
    }
}
