//! RegistryStore — synchronous redb access for the drone registry.
//!
//! Each public method runs in exactly one redb transaction. Write methods
//! either commit everything they touched or, on any error, drop the
//! transaction so redb rolls it back before the error is returned.
//!
//! The store is `Clone` (backed by `Arc<Database>`). It blocks the calling
//! thread; async callers go through [`RedbRegistry`](crate::RedbRegistry).

use std::collections::BTreeSet;
use std::path::Path;
use std::sync::Arc;

use drone_core::{
    DroneState, ResourceAttributes, ResourceFilter, ResourceRecord, ResourceStateRecord,
};
use redb::{Database, ReadableDatabase, ReadableTable, TableHandle, WriteTransaction};
use tracing::debug;

use crate::error::{RegistryError, RegistryResult, StorageError, map_err};
use crate::query;
use crate::schema;
use crate::tables::*;
use crate::types::*;

/// What a successful `notify` did to the stored row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    /// A tracked drone moved to a different state.
    Updated,
    /// A previously untracked drone was registered.
    Inserted,
    /// Terminal state: the row was deleted (`existed` is false if there was none).
    Removed { existed: bool },
}

#[derive(Clone)]
pub struct RegistryStore {
    db: Arc<Database>,
}

impl RegistryStore {
    /// Open (or create) a registry file and deploy the schema.
    pub fn open(path: &Path) -> RegistryResult<Self> {
        let db = Database::create(path).map_err(map_err!(Open))?;
        let store = Self::with_database(db)?;
        debug!(?path, "registry store opened");
        Ok(store)
    }

    /// Create an ephemeral in-memory registry (for testing).
    pub fn open_in_memory() -> RegistryResult<Self> {
        let backend = redb::backends::InMemoryBackend::new();
        let db = Database::builder()
            .create_with_backend(backend)
            .map_err(map_err!(Open))?;
        let store = Self::with_database(db)?;
        debug!("in-memory registry store opened");
        Ok(store)
    }

    fn with_database(db: Database) -> RegistryResult<Self> {
        let store = Self { db: Arc::new(db) };
        store.initialize()?;
        Ok(store)
    }

    /// Deploy the schema and seed the state catalogue. Safe to repeat.
    pub fn initialize(&self) -> RegistryResult<usize> {
        schema::initialize(&self.db)
    }

    pub fn table_names(&self) -> RegistryResult<BTreeSet<String>> {
        schema::table_names(&self.db)
    }

    pub fn state_catalogue(&self) -> RegistryResult<Vec<String>> {
        schema::state_catalogue(&self.db)
    }

    fn begin_write(&self) -> RegistryResult<WriteTransaction> {
        self.db.begin_write().map_err(map_err!(Transaction))
    }

    // ── Catalog ────────────────────────────────────────────────────

    /// Register a site. Returns false if it was already registered.
    pub fn add_site(&self, site_name: &str) -> RegistryResult<bool> {
        let txn = self.begin_write()?;
        if lookup_site(&txn, site_name)?.is_some() {
            debug!(%site_name, "site already registered, skipping");
            return Ok(false);
        }

        let site_id = schema::next_id(&txn, SITES.name())?;
        {
            let mut names = txn.open_table(SITE_NAMES).map_err(map_err!(Table))?;
            names.insert(site_name, site_id).map_err(map_err!(Write))?;
            let mut sites = txn.open_table(SITES).map_err(map_err!(Table))?;
            sites.insert(site_id, site_name).map_err(map_err!(Write))?;
        }
        txn.commit().map_err(map_err!(Transaction))?;
        debug!(%site_name, site_id, "site added");
        Ok(true)
    }

    /// Register a machine type offered by `site_name`. Returns false if the
    /// pair was already registered.
    pub fn add_machine_types(&self, site_name: &str, machine_type: &str) -> RegistryResult<bool> {
        let txn = self.begin_write()?;
        let site_id = lookup_site(&txn, site_name)?.ok_or_else(|| unknown_site(site_name))?;
        if lookup_machine_type(&txn, site_id, machine_type)?.is_some() {
            debug!(%site_name, %machine_type, "machine type already registered, skipping");
            return Ok(false);
        }

        let machine_type_id = schema::next_id(&txn, MACHINE_TYPES.name())?;
        let row = MachineTypeRow {
            site_id,
            machine_type: machine_type.to_string(),
        };
        let value = serde_json::to_vec(&row).map_err(map_err!(Serialize))?;
        {
            let mut keys = txn.open_table(MACHINE_TYPE_KEYS).map_err(map_err!(Table))?;
            keys.insert((site_id, machine_type), machine_type_id)
                .map_err(map_err!(Write))?;
            let mut machine_types = txn.open_table(MACHINE_TYPES).map_err(map_err!(Table))?;
            machine_types
                .insert(machine_type_id, value.as_slice())
                .map_err(map_err!(Write))?;
        }
        txn.commit().map_err(map_err!(Transaction))?;
        debug!(%site_name, %machine_type, machine_type_id, "machine type added");
        Ok(true)
    }

    // ── Resources ──────────────────────────────────────────────────

    /// Insert a new resource row in `state`.
    ///
    /// Fails with [`RegistryError::TerminalState`] for a terminal `state`,
    /// with [`RegistryError::Reference`] if the site, machine type or state is
    /// unknown, and with [`RegistryError::DuplicateResource`] if the drone
    /// uuid is already tracked.
    pub fn insert_resource(
        &self,
        state: DroneState,
        attributes: &ResourceAttributes,
    ) -> RegistryResult<()> {
        if state.is_terminal() {
            return Err(RegistryError::TerminalState {
                drone_uuid: attributes.drone_uuid.to_string(),
                state,
            });
        }
        let txn = self.begin_write()?;
        let id = insert_row(&txn, state, attributes)?;
        txn.commit().map_err(map_err!(Transaction))?;
        debug!(drone_uuid = %attributes.drone_uuid, %state, id, "resource inserted");
        Ok(())
    }

    /// Record that a drone entered `state`.
    ///
    /// Terminal states delete the row (absent rows are fine). Other states
    /// update the row if its stored state differs; otherwise a new row is
    /// inserted. A drone that is already in `state` therefore hits the insert
    /// path and fails with [`RegistryError::DuplicateResource`]: re-notifying
    /// an unchanged state is reported, not ignored.
    pub fn notify(
        &self,
        state: DroneState,
        attributes: &ResourceAttributes,
    ) -> RegistryResult<Transition> {
        let drone_uuid = attributes.drone_uuid.as_str();
        let txn = self.begin_write()?;

        if state.is_terminal() {
            let existed = remove_row(&txn, drone_uuid)?;
            txn.commit().map_err(map_err!(Transaction))?;
            debug!(%drone_uuid, %state, existed, "resource removed");
            return Ok(Transition::Removed { existed });
        }

        let state_id = lookup_state(&txn, state)?;
        if update_row_if_changed(&txn, state_id, attributes)? {
            txn.commit().map_err(map_err!(Transaction))?;
            debug!(%drone_uuid, %state, "resource updated");
            return Ok(Transition::Updated);
        }

        insert_row(&txn, state, attributes)?;
        txn.commit().map_err(map_err!(Transaction))?;
        debug!(%drone_uuid, %state, "resource registered");
        Ok(Transition::Inserted)
    }

    // ── Queries ────────────────────────────────────────────────────

    pub fn get_resources(&self, filter: &ResourceFilter) -> RegistryResult<Vec<ResourceRecord>> {
        let txn = self.db.begin_read().map_err(map_err!(Transaction))?;
        query::resources(&txn, filter)
    }

    pub fn get_resource_state(
        &self,
        drone_uuid: &str,
    ) -> RegistryResult<Option<ResourceStateRecord>> {
        let txn = self.db.begin_read().map_err(map_err!(Transaction))?;
        query::resource_state(&txn, drone_uuid)
    }

    pub fn get_sites(&self) -> RegistryResult<Vec<String>> {
        let txn = self.db.begin_read().map_err(map_err!(Transaction))?;
        query::sites(&txn)
    }

    /// Registered `(site_name, machine_type)` pairs.
    pub fn get_machine_types(&self) -> RegistryResult<Vec<(String, String)>> {
        let txn = self.db.begin_read().map_err(map_err!(Transaction))?;
        query::machine_types(&txn)
    }
}

// ── Write-transaction helpers ──────────────────────────────────────

fn unknown_site(site_name: &str) -> RegistryError {
    RegistryError::Reference(format!("site {site_name:?} is not registered"))
}

fn lookup_site(txn: &WriteTransaction, site_name: &str) -> RegistryResult<Option<u64>> {
    let names = txn.open_table(SITE_NAMES).map_err(map_err!(Table))?;
    let site_id = names
        .get(site_name)
        .map_err(map_err!(Read))?
        .map(|guard| guard.value());
    Ok(site_id)
}

fn lookup_machine_type(
    txn: &WriteTransaction,
    site_id: u64,
    machine_type: &str,
) -> RegistryResult<Option<u64>> {
    let keys = txn.open_table(MACHINE_TYPE_KEYS).map_err(map_err!(Table))?;
    let machine_type_id = keys
        .get((site_id, machine_type))
        .map_err(map_err!(Read))?
        .map(|guard| guard.value());
    Ok(machine_type_id)
}

fn lookup_state(txn: &WriteTransaction, state: DroneState) -> RegistryResult<u64> {
    let names = txn.open_table(RESOURCE_STATE_NAMES).map_err(map_err!(Table))?;
    let state_id = names
        .get(state.name())
        .map_err(map_err!(Read))?
        .map(|guard| guard.value());
    state_id.ok_or_else(|| RegistryError::Reference(format!("state {state} is not in the catalogue")))
}

fn lookup_resource(txn: &WriteTransaction, drone_uuid: &str) -> RegistryResult<Option<u64>> {
    let drone_uuids = txn.open_table(DRONE_UUIDS).map_err(map_err!(Table))?;
    let id = drone_uuids
        .get(drone_uuid)
        .map_err(map_err!(Read))?
        .map(|guard| guard.value());
    Ok(id)
}

fn insert_row(
    txn: &WriteTransaction,
    state: DroneState,
    attributes: &ResourceAttributes,
) -> RegistryResult<u64> {
    let site_name = attributes.site_name.as_str();
    let machine_type = attributes.machine_type.as_str();
    let drone_uuid = attributes.drone_uuid.as_str();

    let site_id = lookup_site(txn, site_name)?.ok_or_else(|| unknown_site(site_name))?;
    let machine_type_id = lookup_machine_type(txn, site_id, machine_type)?.ok_or_else(|| {
        RegistryError::Reference(format!(
            "machine type {machine_type:?} is not registered for site {site_name:?}"
        ))
    })?;
    let state_id = lookup_state(txn, state)?;

    let mut drone_uuids = txn.open_table(DRONE_UUIDS).map_err(map_err!(Table))?;
    if drone_uuids.get(drone_uuid).map_err(map_err!(Read))?.is_some() {
        return Err(RegistryError::DuplicateResource(drone_uuid.to_string()));
    }

    let id = schema::next_id(txn, RESOURCES.name())?;
    let row = ResourceRow {
        remote_resource_uuid: attributes.remote_resource_uuid.clone(),
        drone_uuid: drone_uuid.to_string(),
        site_id,
        machine_type_id,
        state_id,
        created: attributes.created,
        updated: attributes.updated,
    };
    let value = serde_json::to_vec(&row).map_err(map_err!(Serialize))?;
    drone_uuids.insert(drone_uuid, id).map_err(map_err!(Write))?;
    let mut resources = txn.open_table(RESOURCES).map_err(map_err!(Table))?;
    resources
        .insert(id, value.as_slice())
        .map_err(map_err!(Write))?;
    Ok(id)
}

/// Move a tracked drone to `state_id`. Returns false when no row was changed:
/// either the drone is untracked or it is already in that state.
fn update_row_if_changed(
    txn: &WriteTransaction,
    state_id: u64,
    attributes: &ResourceAttributes,
) -> RegistryResult<bool> {
    let Some(id) = lookup_resource(txn, attributes.drone_uuid.as_str())? else {
        return Ok(false);
    };

    let mut resources = txn.open_table(RESOURCES).map_err(map_err!(Table))?;
    let mut row: ResourceRow = {
        let guard = resources
            .get(id)
            .map_err(map_err!(Read))?
            .ok_or_else(|| {
                RegistryError::Storage(StorageError::Read(format!(
                    "index entry {} points at missing resource {id}",
                    attributes.drone_uuid
                )))
            })?;
        serde_json::from_slice(guard.value()).map_err(map_err!(Deserialize))?
    };
    if row.state_id == state_id {
        return Ok(false);
    }

    row.remote_resource_uuid = attributes.remote_resource_uuid.clone();
    row.state_id = state_id;
    row.updated = attributes.updated;
    let value = serde_json::to_vec(&row).map_err(map_err!(Serialize))?;
    resources
        .insert(id, value.as_slice())
        .map_err(map_err!(Write))?;
    Ok(true)
}

fn remove_row(txn: &WriteTransaction, drone_uuid: &str) -> RegistryResult<bool> {
    let mut drone_uuids = txn.open_table(DRONE_UUIDS).map_err(map_err!(Table))?;
    let removed = drone_uuids
        .remove(drone_uuid)
        .map_err(map_err!(Write))?
        .map(|guard| guard.value());
    let Some(id) = removed else {
        return Ok(false);
    };
    let mut resources = txn.open_table(RESOURCES).map_err(map_err!(Table))?;
    resources.remove(id).map_err(map_err!(Write))?;
    Ok(true)
}
