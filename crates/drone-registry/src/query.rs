//! Read-only joined projections over a single redb read snapshot.
//!
//! Resources reference their site, machine type and state by id; these
//! functions resolve the ids back to names so callers never see them.

use std::collections::HashMap;

use drone_core::{DroneState, DroneUuid, ResourceFilter, ResourceRecord, ResourceStateRecord};
use redb::{ReadTransaction, ReadableTable};
use tracing::warn;

use crate::error::{RegistryError, RegistryResult, StorageError, map_err};
use crate::tables::*;
use crate::types::*;

/// All resources matching `filter`, in insertion order.
///
/// A row whose stored drone uuid no longer parses is logged and skipped so
/// it cannot hide the rest of the fleet.
pub fn resources(txn: &ReadTransaction, filter: &ResourceFilter) -> RegistryResult<Vec<ResourceRecord>> {
    let sites = site_map(txn)?;
    let machine_types = machine_type_map(txn)?;
    let states = state_map(txn)?;

    let table = txn.open_table(RESOURCES).map_err(map_err!(Table))?;
    let mut results = Vec::new();
    for entry in table.iter().map_err(map_err!(Read))? {
        let (id, value) = entry.map_err(map_err!(Read))?;
        let row: ResourceRow =
            serde_json::from_slice(value.value()).map_err(map_err!(Deserialize))?;

        let drone_uuid = match DroneUuid::parse(&row.drone_uuid) {
            Ok(drone_uuid) => drone_uuid,
            Err(e) => {
                warn!(id = id.value(), error = %e, "skipping resource with malformed drone uuid");
                continue;
            }
        };
        let site_name = resolve(&sites, row.site_id, "Sites")?;
        let machine_type = resolve(&machine_types, row.machine_type_id, "MachineTypes")?;
        if !filter.matches(site_name, &machine_type.machine_type) {
            continue;
        }

        results.push(ResourceRecord {
            remote_resource_uuid: row.remote_resource_uuid,
            state: *resolve(&states, row.state_id, "ResourceStates")?,
            drone_uuid,
            site_name: site_name.clone(),
            machine_type: machine_type.machine_type.clone(),
            created: row.created,
            updated: row.updated,
        });
    }
    Ok(results)
}

/// Current state of one drone, or `None` if it is not tracked.
pub fn resource_state(
    txn: &ReadTransaction,
    drone_uuid: &str,
) -> RegistryResult<Option<ResourceStateRecord>> {
    let drone_uuids = txn.open_table(DRONE_UUIDS).map_err(map_err!(Table))?;
    let Some(id) = drone_uuids
        .get(drone_uuid)
        .map_err(map_err!(Read))?
        .map(|guard| guard.value())
    else {
        return Ok(None);
    };

    let resources = txn.open_table(RESOURCES).map_err(map_err!(Table))?;
    let Some(guard) = resources.get(id).map_err(map_err!(Read))? else {
        return Err(dangling("Resources", id));
    };
    let row: ResourceRow = serde_json::from_slice(guard.value()).map_err(map_err!(Deserialize))?;

    let states = txn.open_table(RESOURCE_STATES).map_err(map_err!(Table))?;
    let Some(name) = states.get(row.state_id).map_err(map_err!(Read))? else {
        return Err(dangling("ResourceStates", row.state_id));
    };
    let state = parse_state(name.value())?;

    Ok(Some(ResourceStateRecord {
        drone_uuid: parse_drone_uuid(&row.drone_uuid)?,
        state,
    }))
}

/// Registered site names, in registration order.
pub fn sites(txn: &ReadTransaction) -> RegistryResult<Vec<String>> {
    let table = txn.open_table(SITES).map_err(map_err!(Table))?;
    let mut names = Vec::new();
    for entry in table.iter().map_err(map_err!(Read))? {
        let (_, name) = entry.map_err(map_err!(Read))?;
        names.push(name.value().to_string());
    }
    Ok(names)
}

/// Registered `(site_name, machine_type)` pairs, in registration order.
pub fn machine_types(txn: &ReadTransaction) -> RegistryResult<Vec<(String, String)>> {
    let sites = site_map(txn)?;
    let table = txn.open_table(MACHINE_TYPES).map_err(map_err!(Table))?;
    let mut pairs = Vec::new();
    for entry in table.iter().map_err(map_err!(Read))? {
        let (_, value) = entry.map_err(map_err!(Read))?;
        let row: MachineTypeRow =
            serde_json::from_slice(value.value()).map_err(map_err!(Deserialize))?;
        let site_name = resolve(&sites, row.site_id, "Sites")?;
        pairs.push((site_name.clone(), row.machine_type));
    }
    Ok(pairs)
}

fn site_map(txn: &ReadTransaction) -> RegistryResult<HashMap<u64, String>> {
    let table = txn.open_table(SITES).map_err(map_err!(Table))?;
    let mut map = HashMap::new();
    for entry in table.iter().map_err(map_err!(Read))? {
        let (id, name) = entry.map_err(map_err!(Read))?;
        map.insert(id.value(), name.value().to_string());
    }
    Ok(map)
}

fn machine_type_map(txn: &ReadTransaction) -> RegistryResult<HashMap<u64, MachineTypeRow>> {
    let table = txn.open_table(MACHINE_TYPES).map_err(map_err!(Table))?;
    let mut map = HashMap::new();
    for entry in table.iter().map_err(map_err!(Read))? {
        let (id, value) = entry.map_err(map_err!(Read))?;
        let row: MachineTypeRow =
            serde_json::from_slice(value.value()).map_err(map_err!(Deserialize))?;
        map.insert(id.value(), row);
    }
    Ok(map)
}

fn state_map(txn: &ReadTransaction) -> RegistryResult<HashMap<u64, DroneState>> {
    let table = txn.open_table(RESOURCE_STATES).map_err(map_err!(Table))?;
    let mut map = HashMap::new();
    for entry in table.iter().map_err(map_err!(Read))? {
        let (id, name) = entry.map_err(map_err!(Read))?;
        map.insert(id.value(), parse_state(name.value())?);
    }
    Ok(map)
}

fn resolve<'a, T>(map: &'a HashMap<u64, T>, id: u64, table: &str) -> RegistryResult<&'a T> {
    map.get(&id).ok_or_else(|| dangling(table, id))
}

fn dangling(table: &str, id: u64) -> RegistryError {
    StorageError::Read(format!("dangling reference to {table} row {id}")).into()
}

fn parse_state(name: &str) -> RegistryResult<DroneState> {
    name.parse::<DroneState>().map_err(map_err!(Deserialize))
}

fn parse_drone_uuid(drone_uuid: &str) -> RegistryResult<DroneUuid> {
    DroneUuid::parse(drone_uuid).map_err(map_err!(Deserialize))
}
