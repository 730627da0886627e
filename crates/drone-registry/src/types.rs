//! Row types persisted in the registry tables.
//!
//! Rows hold foreign keys as integer ids; the query facade joins them back to
//! names. Rows are JSON-serialized into redb's `&[u8]` value columns.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct MachineTypeRow {
    pub site_id: u64,
    pub machine_type: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ResourceRow {
    pub remote_resource_uuid: Option<String>,
    pub drone_uuid: String,
    pub site_id: u64,
    pub machine_type_id: u64,
    pub state_id: u64,
    pub created: NaiveDateTime,
    pub updated: NaiveDateTime,
}
