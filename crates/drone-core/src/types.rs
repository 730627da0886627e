//! Shared types used across drone registry crates.

use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

use chrono::{NaiveDateTime, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::state::DroneState;

/// Number of hex characters in the random suffix of a drone identifier.
pub const DRONE_SUFFIX_LEN: usize = 10;

static DRONE_UUID_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\S+-[A-Fa-f0-9]{10}$").expect("drone uuid pattern is valid")
});

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DroneUuidError {
    #[error("drone uuid {0:?} does not match <site>-<10 hex characters>")]
    Malformed(String),
}

/// Globally unique drone identifier: `<site-name>-<10 hex characters>`.
///
/// The site prefix keeps identifiers unique across sites even when two
/// providers hand out the same remote resource id.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct DroneUuid(String);

impl DroneUuid {
    /// Parse and validate an identifier.
    pub fn parse(s: &str) -> Result<Self, DroneUuidError> {
        if DRONE_UUID_RE.is_match(s) {
            Ok(Self(s.to_string()))
        } else {
            Err(DroneUuidError::Malformed(s.to_string()))
        }
    }

    /// Generate a fresh identifier for a drone on `site_name`.
    ///
    /// The prefix is the lowercased site name with whitespace replaced by
    /// `_`; an empty site name yields the prefix `drone`. The result always
    /// passes [`DroneUuid::parse`].
    pub fn generate(site_name: &str) -> Self {
        let suffix = uuid::Uuid::new_v4().simple().to_string();
        Self(format!(
            "{}-{}",
            Self::site_prefix_for(site_name),
            &suffix[..DRONE_SUFFIX_LEN]
        ))
    }

    fn site_prefix_for(site_name: &str) -> String {
        let prefix: String = site_name
            .to_lowercase()
            .chars()
            .map(|c| if c.is_whitespace() { '_' } else { c })
            .collect();
        if prefix.is_empty() {
            "drone".to_string()
        } else {
            prefix
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The site prefix (everything before the final `-`).
    pub fn site_prefix(&self) -> &str {
        self.0
            .rsplit_once('-')
            .map(|(site, _)| site)
            .unwrap_or(&self.0)
    }
}

impl fmt::Display for DroneUuid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(&self.0)
    }
}

impl FromStr for DroneUuid {
    type Err = DroneUuidError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for DroneUuid {
    type Error = DroneUuidError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<DroneUuid> for String {
    fn from(value: DroneUuid) -> Self {
        value.0
    }
}

impl AsRef<str> for DroneUuid {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

// ── Attributes ─────────────────────────────────────────────────────

/// Full attribute set the orchestration loop supplies for a drone.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ResourceAttributes {
    /// Identifier assigned by the site's provider. Not unique across sites.
    pub remote_resource_uuid: Option<String>,
    pub drone_uuid: DroneUuid,
    pub site_name: String,
    pub machine_type: String,
    pub created: NaiveDateTime,
    pub updated: NaiveDateTime,
}

impl ResourceAttributes {
    /// Attributes for a drone first seen now, without a remote id yet.
    pub fn new(
        drone_uuid: DroneUuid,
        site_name: impl Into<String>,
        machine_type: impl Into<String>,
    ) -> Self {
        let now = Utc::now().naive_utc();
        Self {
            remote_resource_uuid: None,
            drone_uuid,
            site_name: site_name.into(),
            machine_type: machine_type.into(),
            created: now,
            updated: now,
        }
    }

    pub fn with_remote_resource_uuid(mut self, remote_resource_uuid: impl Into<String>) -> Self {
        self.remote_resource_uuid = Some(remote_resource_uuid.into());
        self
    }

    /// Bump `updated` to the current time.
    pub fn touch(&mut self) {
        self.updated = Utc::now().naive_utc();
    }
}

// ── Query projections ──────────────────────────────────────────────

/// A tracked resource joined with its site, machine type and state names.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ResourceRecord {
    pub remote_resource_uuid: Option<String>,
    pub state: DroneState,
    pub drone_uuid: DroneUuid,
    pub site_name: String,
    pub machine_type: String,
    pub created: NaiveDateTime,
    pub updated: NaiveDateTime,
}

/// Current state of a single drone.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ResourceStateRecord {
    pub drone_uuid: DroneUuid,
    pub state: DroneState,
}

/// Optional site / machine type restriction for resource listings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceFilter {
    pub site_name: Option<String>,
    pub machine_type: Option<String>,
}

impl ResourceFilter {
    /// Match every resource.
    pub fn all() -> Self {
        Self::default()
    }

    pub fn site(mut self, site_name: impl Into<String>) -> Self {
        self.site_name = Some(site_name.into());
        self
    }

    pub fn machine_type(mut self, machine_type: impl Into<String>) -> Self {
        self.machine_type = Some(machine_type.into());
        self
    }

    pub fn matches(&self, site_name: &str, machine_type: &str) -> bool {
        self.site_name.as_deref().is_none_or(|s| s == site_name)
            && self.machine_type.as_deref().is_none_or(|m| m == machine_type)
    }
}
