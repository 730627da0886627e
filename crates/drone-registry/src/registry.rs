//! The registry capability set every storage backend provides.

use async_trait::async_trait;
use drone_core::{DroneState, ResourceAttributes, ResourceFilter, ResourceRecord, ResourceStateRecord};

use crate::error::RegistryResult;

/// Persistence contract used by the orchestration loop and the REST layer.
///
/// Backends must preserve the notification semantics of
/// [`RedbRegistry`](crate::RedbRegistry), including rejecting a `notify` whose
/// target state equals the stored state with
/// [`RegistryError::DuplicateResource`](crate::RegistryError::DuplicateResource).
#[async_trait]
pub trait Registry: Send + Sync {
    /// Register a site. Re-adding a known site is a no-op.
    async fn add_site(&self, site_name: &str) -> RegistryResult<()>;

    /// Register a machine type for an already registered site. Re-adding a
    /// known pair is a no-op.
    async fn add_machine_types(&self, site_name: &str, machine_type: &str) -> RegistryResult<()>;

    /// Record a drone's transition to `state`.
    ///
    /// Terminal states remove the drone. Other states update the stored row
    /// when the state changes and register untracked drones. Notifying the
    /// state a drone is already in fails with `DuplicateResource`.
    async fn notify(&self, state: DroneState, attributes: ResourceAttributes) -> RegistryResult<()>;

    /// Register a newly discovered drone in `state`.
    ///
    /// Terminal states are rejected with `TerminalState`; a drone that is
    /// already gone is never stored.
    async fn insert_resource(
        &self,
        state: DroneState,
        attributes: ResourceAttributes,
    ) -> RegistryResult<()>;

    async fn get_resources(&self, filter: ResourceFilter) -> RegistryResult<Vec<ResourceRecord>>;

    /// `None` when the drone is not tracked.
    async fn get_resource_state(&self, drone_uuid: &str)
    -> RegistryResult<Option<ResourceStateRecord>>;
}
