//! Error types for the drone registry.

use drone_core::DroneState;
use thiserror::Error;

/// Result type alias for registry operations.
pub type RegistryResult<T> = Result<T, RegistryError>;

/// Unexpected backend failures. Surfaced to the caller, never retried.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("failed to open database: {0}")]
    Open(String),

    #[error("transaction error: {0}")]
    Transaction(String),

    #[error("table error: {0}")]
    Table(String),

    #[error("read error: {0}")]
    Read(String),

    #[error("write error: {0}")]
    Write(String),

    #[error("serialization error: {0}")]
    Serialize(String),

    #[error("deserialization error: {0}")]
    Deserialize(String),

    #[error("registry worker error: {0}")]
    Worker(String),
}

/// Errors returned by [`Registry`](crate::Registry) operations.
#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),

    /// A row with this drone uuid already exists.
    #[error("unique constraint failed: Resources.drone_uuid ({0})")]
    DuplicateResource(String),

    /// The operation referenced a site, machine type or state that is not registered.
    #[error("unknown reference: {0}")]
    Reference(String),

    /// A new row was requested in a state that means "no longer tracked".
    #[error("cannot insert {drone_uuid} in terminal state {state}")]
    TerminalState {
        drone_uuid: String,
        state: DroneState,
    },
}

impl RegistryError {
    pub fn is_duplicate(&self) -> bool {
        matches!(self, RegistryError::DuplicateResource(_))
    }

    pub fn is_reference(&self) -> bool {
        matches!(self, RegistryError::Reference(_))
    }

    pub fn is_terminal_state(&self) -> bool {
        matches!(self, RegistryError::TerminalState { .. })
    }
}

/// Convert any `Display` error into a [`RegistryError::Storage`] variant via a closure factory.
macro_rules! map_err {
    ($variant:ident) => {
        |e| {
            $crate::error::RegistryError::Storage($crate::error::StorageError::$variant(
                e.to_string(),
            ))
        }
    };
}

pub(crate) use map_err;
