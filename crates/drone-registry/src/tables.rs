//! redb table definitions for the drone registry.
//!
//! Entity tables map an auto-increment id to the row. Unique constraints are
//! index tables written in the same transaction as the entity row. Ids come
//! from [`SEQUENCES`], keyed by entity table name.

use redb::TableDefinition;

/// `site_id` → `site_name`.
pub const SITES: TableDefinition<u64, &str> = TableDefinition::new("Sites");

/// `machine_type_id` → JSON [`MachineTypeRow`](crate::types::MachineTypeRow).
pub const MACHINE_TYPES: TableDefinition<u64, &[u8]> = TableDefinition::new("MachineTypes");

/// `state_id` → state catalog name.
pub const RESOURCE_STATES: TableDefinition<u64, &str> = TableDefinition::new("ResourceStates");

/// `id` → JSON [`ResourceRow`](crate::types::ResourceRow).
pub const RESOURCES: TableDefinition<u64, &[u8]> = TableDefinition::new("Resources");

/// Unique index: `site_name` → `site_id`.
pub const SITE_NAMES: TableDefinition<&str, u64> = TableDefinition::new("Sites.site_name");

/// Unique index: `(site_id, machine_type)` → `machine_type_id`.
pub const MACHINE_TYPE_KEYS: TableDefinition<(u64, &str), u64> =
    TableDefinition::new("MachineTypes.site_id.machine_type");

/// Unique index: state name → `state_id`.
pub const RESOURCE_STATE_NAMES: TableDefinition<&str, u64> =
    TableDefinition::new("ResourceStates.state");

/// Unique index: `drone_uuid` → resource `id`.
pub const DRONE_UUIDS: TableDefinition<&str, u64> = TableDefinition::new("Resources.drone_uuid");

/// Last issued id per entity table.
pub const SEQUENCES: TableDefinition<&str, u64> = TableDefinition::new("sequences");

/// Names of the four entity tables.
pub const ENTITY_TABLES: [&str; 4] = ["MachineTypes", "ResourceStates", "Resources", "Sites"];
