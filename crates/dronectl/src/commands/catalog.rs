use std::path::Path;

use drone_core::RegistryConfig;
use drone_registry::{RedbRegistry, Registry};

pub fn scaffold(path: &Path) -> anyhow::Result<()> {
    if path.exists() {
        anyhow::bail!("{} already exists", path.display());
    }
    let config = RegistryConfig::scaffold("drone_registry.redb");
    std::fs::write(path, config.to_toml_string()?)?;
    println!("✓ Wrote {}", path.display());
    Ok(())
}

pub async fn init(registry: &RedbRegistry) -> anyhow::Result<()> {
    let seeded = registry.initialize().await?;
    let tables = registry.table_names().await?;
    let states = registry.state_catalogue().await?;
    println!("✓ Registry ready");
    println!("  Tables: {}", tables.into_iter().collect::<Vec<_>>().join(", "));
    println!("  States: {} ({} newly seeded)", states.len(), seeded);
    Ok(())
}

pub async fn add_site(registry: &RedbRegistry, site_name: &str) -> anyhow::Result<()> {
    registry.add_site(site_name).await?;
    println!("✓ Site {site_name}");
    Ok(())
}

pub async fn add_machine_type(
    registry: &RedbRegistry,
    site_name: &str,
    machine_type: &str,
) -> anyhow::Result<()> {
    registry.add_machine_types(site_name, machine_type).await?;
    println!("✓ Machine type {machine_type} on {site_name}");
    Ok(())
}

pub async fn sites(registry: &RedbRegistry) -> anyhow::Result<()> {
    let machine_types = registry.get_machine_types().await?;
    for site in registry.get_sites().await? {
        let offered: Vec<&str> = machine_types
            .iter()
            .filter(|(s, _)| *s == site)
            .map(|(_, m)| m.as_str())
            .collect();
        println!("{site}: {}", offered.join(", "));
    }
    Ok(())
}
