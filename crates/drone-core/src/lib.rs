//! drone-core — shared types for the drone registry.
//!
//! - [`DroneState`]: the closed life-cycle state catalogue
//! - [`DroneUuid`]: site-scoped drone identifiers
//! - [`ResourceAttributes`] and the read projections returned by registry queries
//! - [`RegistryConfig`]: `registry.toml` parsing

pub mod config;
pub mod state;
pub mod types;

pub use config::{ConfigError, RegistryConfig, RegistrySettings, SiteConfig};
pub use state::{DroneState, UnknownState};
pub use types::*;
