use anyhow::Context;
use chrono::{NaiveDateTime, Utc};
use drone_core::{DroneState, DroneUuid, ResourceAttributes, ResourceFilter, ResourceRecord};
use drone_registry::{RedbRegistry, Registry};

use super::OutputFormat;

pub async fn insert(
    registry: &RedbRegistry,
    state: &str,
    site: String,
    machine_type: String,
    drone_uuid: Option<&str>,
    remote_uuid: Option<String>,
) -> anyhow::Result<()> {
    let state: DroneState = state.parse()?;
    let drone_uuid = match drone_uuid {
        Some(id) => DroneUuid::parse(id)?,
        None => DroneUuid::generate(&site),
    };
    let mut attributes = ResourceAttributes::new(drone_uuid.clone(), site, machine_type);
    attributes.remote_resource_uuid = remote_uuid;

    registry
        .insert_resource(state, attributes)
        .await
        .map_err(|e| {
            if e.is_duplicate() {
                anyhow::anyhow!("{drone_uuid} is already registered")
            } else {
                e.into()
            }
        })?;
    println!("✓ {drone_uuid} registered in {state}");
    Ok(())
}

pub async fn notify(
    registry: &RedbRegistry,
    state: &str,
    drone_uuid: &str,
    site: Option<String>,
    machine_type: Option<String>,
    remote_uuid: Option<String>,
) -> anyhow::Result<()> {
    let state: DroneState = state.parse()?;
    let drone_uuid = DroneUuid::parse(drone_uuid)?;

    let existing =
        stored_record(registry, &drone_uuid, site.as_deref(), machine_type.as_deref()).await?;
    let attributes = notify_attributes(
        existing.as_ref(),
        drone_uuid.clone(),
        site,
        machine_type,
        remote_uuid,
        Utc::now().naive_utc(),
    )?;

    let transition = registry
        .notify_transition(state, attributes)
        .await
        .map_err(|e| {
            if e.is_duplicate() {
                anyhow::anyhow!("{drone_uuid} is already in {state}")
            } else {
                e.into()
            }
        })?;
    println!("✓ {drone_uuid} → {state} ({transition:?})");
    Ok(())
}

/// The stored record for `drone_uuid`, scanning only the given site and
/// machine type when they are known.
async fn stored_record(
    registry: &RedbRegistry,
    drone_uuid: &DroneUuid,
    site: Option<&str>,
    machine_type: Option<&str>,
) -> anyhow::Result<Option<ResourceRecord>> {
    let filter = ResourceFilter {
        site_name: site.map(str::to_string),
        machine_type: machine_type.map(str::to_string),
    };
    let record = registry
        .get_resources(filter)
        .await?
        .into_iter()
        .find(|record| &record.drone_uuid == drone_uuid);
    Ok(record)
}

/// Attributes for a notification, defaulting to the drone's stored values.
fn notify_attributes(
    existing: Option<&ResourceRecord>,
    drone_uuid: DroneUuid,
    site: Option<String>,
    machine_type: Option<String>,
    remote_uuid: Option<String>,
    now: NaiveDateTime,
) -> anyhow::Result<ResourceAttributes> {
    let site_name = site
        .or_else(|| existing.map(|r| r.site_name.clone()))
        .context("--site is required for an untracked drone")?;
    let machine_type = machine_type
        .or_else(|| existing.map(|r| r.machine_type.clone()))
        .context("--machine-type is required for an untracked drone")?;
    Ok(ResourceAttributes {
        remote_resource_uuid: remote_uuid
            .or_else(|| existing.and_then(|r| r.remote_resource_uuid.clone())),
        drone_uuid,
        site_name,
        machine_type,
        created: existing.map_or(now, |r| r.created),
        updated: now,
    })
}

pub async fn list(
    registry: &RedbRegistry,
    site: Option<String>,
    machine_type: Option<String>,
    format: OutputFormat,
) -> anyhow::Result<()> {
    let filter = ResourceFilter {
        site_name: site,
        machine_type,
    };
    let records = registry.get_resources(filter).await?;
    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&records)?),
        OutputFormat::Text => {
            for record in &records {
                println!("{}", render_text(record));
            }
            println!("{} drone(s)", records.len());
        }
    }
    Ok(())
}

pub async fn state(
    registry: &RedbRegistry,
    drone_uuid: &str,
    format: OutputFormat,
) -> anyhow::Result<()> {
    let drone_uuid = DroneUuid::parse(drone_uuid)?;
    let record = registry
        .get_resource_state(drone_uuid.as_str())
        .await?
        .with_context(|| format!("Drone not found: {drone_uuid}"))?;
    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&record)?),
        OutputFormat::Text => println!("{} {}", record.drone_uuid, record.state),
    }
    Ok(())
}

fn render_text(record: &ResourceRecord) -> String {
    format!(
        "{:<28} {:<18} {}/{}  remote={}  updated={}",
        record.drone_uuid.as_str(),
        record.state.name(),
        record.site_name,
        record.machine_type,
        record.remote_resource_uuid.as_deref().unwrap_or("-"),
        record.updated.format("%Y-%m-%dT%H:%M:%S"),
    )
}
