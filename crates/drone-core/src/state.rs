//! Drone life-cycle state catalogue.
//!
//! The set of states is closed: the registry seeds its `ResourceStates` table
//! from [`DroneState::ALL`] and rejects any name outside it. The registry only
//! needs a state's catalog name and whether it is terminal, so states carry no
//! behaviour here.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A drone life-cycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DroneState {
    RequestState,
    BootingState,
    IntegrateState,
    IntegratingState,
    AvailableState,
    DrainState,
    DrainingState,
    DisintegrateState,
    ShutDownState,
    ShuttingDownState,
    CleanupState,
    DownState,
}

/// Returned when parsing a name that is not in the state catalogue.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown drone state: {0}")]
pub struct UnknownState(pub String);

impl DroneState {
    /// Every state in the catalogue, in life-cycle order.
    pub const ALL: [DroneState; 12] = [
        DroneState::RequestState,
        DroneState::BootingState,
        DroneState::IntegrateState,
        DroneState::IntegratingState,
        DroneState::AvailableState,
        DroneState::DrainState,
        DroneState::DrainingState,
        DroneState::DisintegrateState,
        DroneState::ShutDownState,
        DroneState::ShuttingDownState,
        DroneState::CleanupState,
        DroneState::DownState,
    ];

    /// Catalog name, as stored in the `ResourceStates` table.
    pub fn name(&self) -> &'static str {
        match self {
            DroneState::RequestState => "RequestState",
            DroneState::BootingState => "BootingState",
            DroneState::IntegrateState => "IntegrateState",
            DroneState::IntegratingState => "IntegratingState",
            DroneState::AvailableState => "AvailableState",
            DroneState::DrainState => "DrainState",
            DroneState::DrainingState => "DrainingState",
            DroneState::DisintegrateState => "DisintegrateState",
            DroneState::ShutDownState => "ShutDownState",
            DroneState::ShuttingDownState => "ShuttingDownState",
            DroneState::CleanupState => "CleanupState",
            DroneState::DownState => "DownState",
        }
    }

    /// Removal state: notifying it deletes the drone's registry row.
    pub fn is_terminal(&self) -> bool {
        matches!(self, DroneState::DownState)
    }

    /// The state a newly requested drone starts in.
    pub fn is_creation(&self) -> bool {
        matches!(self, DroneState::RequestState)
    }
}

impl fmt::Display for DroneState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.name())
    }
}

impl FromStr for DroneState {
    type Err = UnknownState;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        DroneState::ALL
            .iter()
            .copied()
            .find(|state| state.name() == s)
            .ok_or_else(|| UnknownState(s.to_string()))
    }
}
