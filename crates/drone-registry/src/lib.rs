//! drone-registry — persistent registry of drone life-cycle state.
//!
//! Backed by [redb](https://docs.rs/redb). Records which drones are tracked,
//! on which site and machine type, and in which life-cycle state, and
//! reconciles state-transition notifications from the orchestration loop with
//! durable storage.
//!
//! # Architecture
//!
//! ```text
//! Registry (async trait)
//!   └── RedbRegistry
//!       ├── Writer thread ── RegistryStore ── write transactions (serialized)
//!       └── spawn_blocking ─ RegistryStore ── read snapshots (concurrent)
//! ```
//!
//! The schema is normalized: `Sites`, `MachineTypes`, `ResourceStates` and
//! `Resources` tables keyed by integer ids, plus unique index tables. Rows are
//! JSON-serialized into redb's `&[u8]` value columns.

pub mod error;
pub mod query;
pub mod redb_registry;
pub mod registry;
pub mod schema;
pub mod store;
pub mod tables;
pub mod types;
mod writer;

pub use error::{RegistryError, RegistryResult, StorageError};
pub use redb_registry::RedbRegistry;
pub use registry::Registry;
pub use store::{RegistryStore, Transition};
