//! Schema management: table creation, state catalogue seeding, id sequences.

use std::collections::BTreeSet;

use drone_core::DroneState;
use redb::{Database, ReadableDatabase, ReadableTable, TableHandle, WriteTransaction};
use tracing::debug;

use crate::error::{RegistryResult, map_err};
use crate::tables::*;

/// Create every table if absent and seed `ResourceStates` from the state catalogue.
///
/// Idempotent: states already present are left alone. Everything happens in
/// one write transaction, so a failure leaves the store untouched. Returns the
/// number of states newly seeded.
pub fn initialize(db: &Database) -> RegistryResult<usize> {
    let txn = db.begin_write().map_err(map_err!(Transaction))?;
    // Opening a table in a write transaction creates it if absent.
    txn.open_table(SITES).map_err(map_err!(Table))?;
    txn.open_table(MACHINE_TYPES).map_err(map_err!(Table))?;
    txn.open_table(RESOURCE_STATES).map_err(map_err!(Table))?;
    txn.open_table(RESOURCES).map_err(map_err!(Table))?;
    txn.open_table(SITE_NAMES).map_err(map_err!(Table))?;
    txn.open_table(MACHINE_TYPE_KEYS).map_err(map_err!(Table))?;
    txn.open_table(RESOURCE_STATE_NAMES).map_err(map_err!(Table))?;
    txn.open_table(DRONE_UUIDS).map_err(map_err!(Table))?;
    txn.open_table(SEQUENCES).map_err(map_err!(Table))?;

    let seeded = seed_states(&txn)?;
    txn.commit().map_err(map_err!(Transaction))?;
    debug!(seeded, "registry schema initialized");
    Ok(seeded)
}

fn seed_states(txn: &WriteTransaction) -> RegistryResult<usize> {
    let mut names = txn.open_table(RESOURCE_STATE_NAMES).map_err(map_err!(Table))?;
    let mut states = txn.open_table(RESOURCE_STATES).map_err(map_err!(Table))?;
    let mut seeded = 0;
    for state in DroneState::ALL {
        if names.get(state.name()).map_err(map_err!(Read))?.is_some() {
            continue;
        }
        let state_id = next_id(txn, RESOURCE_STATES.name())?;
        names
            .insert(state.name(), state_id)
            .map_err(map_err!(Write))?;
        states
            .insert(state_id, state.name())
            .map_err(map_err!(Write))?;
        seeded += 1;
    }
    Ok(seeded)
}

/// Issue the next id for `table`. Ids start at 1 and are never reused.
pub(crate) fn next_id(txn: &WriteTransaction, table: &str) -> RegistryResult<u64> {
    let mut sequences = txn.open_table(SEQUENCES).map_err(map_err!(Table))?;
    let last = sequences
        .get(table)
        .map_err(map_err!(Read))?
        .map(|guard| guard.value())
        .unwrap_or(0);
    let id = last + 1;
    sequences.insert(table, id).map_err(map_err!(Write))?;
    Ok(id)
}

/// Entity tables present in the store.
pub fn table_names(db: &Database) -> RegistryResult<BTreeSet<String>> {
    let txn = db.begin_read().map_err(map_err!(Transaction))?;
    let names = txn
        .list_tables()
        .map_err(map_err!(Read))?
        .map(|handle| handle.name().to_string())
        .filter(|name| ENTITY_TABLES.contains(&name.as_str()))
        .collect();
    Ok(names)
}

/// Seeded state names, in id order.
pub fn state_catalogue(db: &Database) -> RegistryResult<Vec<String>> {
    let txn = db.begin_read().map_err(map_err!(Transaction))?;
    let table = txn.open_table(RESOURCE_STATES).map_err(map_err!(Table))?;
    let mut names = Vec::new();
    for entry in table.iter().map_err(map_err!(Read))? {
        let (_, name) = entry.map_err(map_err!(Read))?;
        names.push(name.value().to_string());
    }
    Ok(names)
}
