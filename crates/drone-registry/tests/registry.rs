//! Registry contract tests against the redb backend, driven through the
//! async `Registry` trait the orchestration loop and REST layer use.

use std::sync::Arc;

use chrono::NaiveDate;
use drone_core::{
    DroneState, DroneUuid, RegistryConfig, ResourceAttributes, ResourceFilter, SiteConfig,
};
use drone_registry::{RedbRegistry, Registry, RegistryError, Transition};

const SITE: &str = "MyGreatTestSite";
const OTHER_SITE: &str = "MyOtherTestSite";
const MACHINE_TYPE: &str = "MyGreatTestMachineType";

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter("drone_registry=debug")
        .with_test_writer()
        .try_init();
}

fn attributes(drone_uuid: &str, site_name: &str) -> ResourceAttributes {
    let at = NaiveDate::from_ymd_opt(2018, 11, 16)
        .unwrap()
        .and_hms_opt(15, 49, 58)
        .unwrap();
    ResourceAttributes {
        remote_resource_uuid: None,
        drone_uuid: DroneUuid::parse(drone_uuid).unwrap(),
        site_name: site_name.to_string(),
        machine_type: MACHINE_TYPE.to_string(),
        created: at,
        updated: at,
    }
}

async fn registry_with_catalog(sites: &[&str]) -> RedbRegistry {
    init_tracing();
    let registry = RedbRegistry::open_in_memory().unwrap();
    for site in sites {
        registry.add_site(site).await.unwrap();
        registry.add_machine_types(site, MACHINE_TYPE).await.unwrap();
    }
    registry
}

#[tokio::test]
async fn catalog_adds_are_idempotent() {
    let registry = registry_with_catalog(&[SITE, OTHER_SITE]).await;

    registry.add_site(SITE).await.unwrap();
    registry.add_machine_types(SITE, MACHINE_TYPE).await.unwrap();

    assert_eq!(registry.get_sites().await.unwrap(), vec![SITE, OTHER_SITE]);
    assert_eq!(registry.get_machine_types().await.unwrap().len(), 2);
}

#[tokio::test]
async fn machine_type_for_unknown_site_is_reference_error() {
    let registry = registry_with_catalog(&[]).await;
    let err = registry
        .add_machine_types(SITE, MACHINE_TYPE)
        .await
        .unwrap_err();
    assert!(matches!(err, RegistryError::Reference(_)));
}

#[tokio::test]
async fn insert_resource_duplicate_is_distinguishable() {
    let registry = registry_with_catalog(&[SITE]).await;
    let attrs = attributes("MyGreatTestSite-07af52405e", SITE);

    registry
        .insert_resource(DroneState::RequestState, attrs.clone())
        .await
        .unwrap();
    let err = registry
        .insert_resource(DroneState::RequestState, attrs)
        .await
        .unwrap_err();

    assert!(err.is_duplicate());
    assert_eq!(registry.get_resources(ResourceFilter::all()).await.unwrap().len(), 1);
}

#[tokio::test]
async fn notify_reports_transitions() {
    let registry = registry_with_catalog(&[SITE]).await;
    let attrs = attributes("MyGreatTestSite-07af52405e", SITE);

    assert_eq!(
        registry
            .notify_transition(DroneState::RequestState, attrs.clone())
            .await
            .unwrap(),
        Transition::Inserted
    );

    // Re-notifying the stored state is an error, not a no-op.
    let err = registry
        .notify(DroneState::RequestState, attrs.clone())
        .await
        .unwrap_err();
    assert!(err.is_duplicate());

    let booting = attrs
        .clone()
        .with_remote_resource_uuid("bf85022b-fdd6-42b1-932d-086c288d4755");
    assert_eq!(
        registry
            .notify_transition(DroneState::BootingState, booting)
            .await
            .unwrap(),
        Transition::Updated
    );

    let records = registry.get_resources(ResourceFilter::all()).await.unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].state, DroneState::BootingState);
    assert_eq!(
        records[0].remote_resource_uuid.as_deref(),
        Some("bf85022b-fdd6-42b1-932d-086c288d4755")
    );

    registry.notify(DroneState::DownState, attrs.clone()).await.unwrap();
    registry.notify(DroneState::DownState, attrs).await.unwrap();
    assert!(registry.get_resources(ResourceFilter::all()).await.unwrap().is_empty());
}

#[tokio::test]
async fn generated_ids_stay_readable_for_any_site_name() {
    let registry = registry_with_catalog(&["My Site"]).await;

    let drone_uuid = DroneUuid::generate("My Site");
    let attrs = ResourceAttributes::new(drone_uuid.clone(), "My Site", MACHINE_TYPE);
    registry.notify(DroneState::RequestState, attrs).await.unwrap();

    let records = registry.get_resources(ResourceFilter::all()).await.unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].drone_uuid, drone_uuid);

    let state = registry
        .get_resource_state(drone_uuid.as_str())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(state.state, DroneState::RequestState);
}

#[tokio::test]
async fn insert_in_terminal_state_is_rejected() {
    let registry = registry_with_catalog(&[SITE]).await;
    let err = registry
        .insert_resource(
            DroneState::DownState,
            attributes("MyGreatTestSite-07af52405e", SITE),
        )
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        RegistryError::TerminalState {
            state: DroneState::DownState,
            ..
        }
    ));
    assert!(registry.get_resources(ResourceFilter::all()).await.unwrap().is_empty());
}

#[tokio::test]
async fn get_resource_state_lookup() {
    let registry = registry_with_catalog(&[SITE]).await;
    let attrs = attributes("MyGreatTestSite-07af52405e", SITE);

    assert!(
        registry
            .get_resource_state("MyGreatTestSite-07af52405e")
            .await
            .unwrap()
            .is_none()
    );

    registry.notify(DroneState::RequestState, attrs).await.unwrap();
    let state = registry
        .get_resource_state("MyGreatTestSite-07af52405e")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(state.state, DroneState::RequestState);
}

#[tokio::test]
async fn usable_as_trait_object() {
    let registry: Arc<dyn Registry> = Arc::new(registry_with_catalog(&[SITE, OTHER_SITE]).await);

    let first = attributes("MyGreatTestSite-07af52405e", SITE).with_remote_resource_uuid("vm-1");
    let second =
        attributes("MyOtherTestSite-045285abef", OTHER_SITE).with_remote_resource_uuid("vm-1");
    registry
        .insert_resource(DroneState::RequestState, first)
        .await
        .unwrap();
    registry
        .insert_resource(DroneState::BootingState, second)
        .await
        .unwrap();

    let filter = ResourceFilter::all().site(OTHER_SITE).machine_type(MACHINE_TYPE);
    let records = registry.get_resources(filter).await.unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].site_name, OTHER_SITE);
    assert_eq!(records[0].state, DroneState::BootingState);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_notifications_are_serialized() {
    let registry = registry_with_catalog(&[SITE]).await;

    let mut handles = Vec::new();
    for i in 0..32u32 {
        let registry = registry.clone();
        handles.push(tokio::spawn(async move {
            let attrs = attributes(&format!("{SITE}-{i:010x}"), SITE);
            registry.notify(DroneState::RequestState, attrs.clone()).await?;
            registry.notify(DroneState::BootingState, attrs).await
        }));
    }
    for handle in handles {
        handle.await.unwrap().unwrap();
    }

    let records = registry.get_resources(ResourceFilter::all()).await.unwrap();
    assert_eq!(records.len(), 32);
    assert!(records.iter().all(|r| r.state == DroneState::BootingState));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_duplicate_notifications_leave_one_row() {
    let registry = registry_with_catalog(&[SITE]).await;
    let attrs = attributes("MyGreatTestSite-07af52405e", SITE);

    let mut handles = Vec::new();
    for _ in 0..8 {
        let registry = registry.clone();
        let attrs = attrs.clone();
        handles.push(tokio::spawn(async move {
            registry.notify(DroneState::RequestState, attrs).await
        }));
    }

    let mut inserted = 0;
    let mut duplicates = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(()) => inserted += 1,
            Err(e) if e.is_duplicate() => duplicates += 1,
            Err(e) => panic!("unexpected error: {e}"),
        }
    }
    assert_eq!(inserted, 1);
    assert_eq!(duplicates, 7);
    assert_eq!(registry.get_resources(ResourceFilter::all()).await.unwrap().len(), 1);
}

#[tokio::test]
async fn initialize_twice_keeps_catalogue() {
    let registry = registry_with_catalog(&[]).await;
    assert_eq!(registry.initialize().await.unwrap(), 0);
    assert_eq!(
        registry.state_catalogue().await.unwrap().len(),
        DroneState::ALL.len()
    );

    let tables = registry.table_names().await.unwrap();
    let expected = ["MachineTypes", "ResourceStates", "Resources", "Sites"];
    assert_eq!(tables.iter().map(String::as_str).collect::<Vec<_>>(), expected);
}

#[tokio::test]
async fn bootstrap_registers_configured_catalog_and_persists() {
    init_tracing();
    let dir = tempfile::tempdir().unwrap();
    let mut config = RegistryConfig::scaffold(dir.path().join("registry.redb"));
    config.sites = vec![
        SiteConfig {
            name: SITE.to_string(),
            machine_types: vec![MACHINE_TYPE.to_string()],
        },
        SiteConfig {
            name: OTHER_SITE.to_string(),
            machine_types: vec![MACHINE_TYPE.to_string(), "m1.large".to_string()],
        },
    ];

    {
        let registry = RedbRegistry::bootstrap(&config).await.unwrap();
        assert_eq!(registry.get_machine_types().await.unwrap().len(), 3);
        registry
            .notify(
                DroneState::RequestState,
                attributes("MyGreatTestSite-07af52405e", SITE),
            )
            .await
            .unwrap();
    }

    // Bootstrapping again against the same file is idempotent and keeps resources.
    let registry = RedbRegistry::bootstrap(&config).await.unwrap();
    assert_eq!(registry.get_sites().await.unwrap(), vec![SITE, OTHER_SITE]);
    assert_eq!(registry.get_machine_types().await.unwrap().len(), 3);
    let records = registry.get_resources(ResourceFilter::all()).await.unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].drone_uuid.as_str(), "MyGreatTestSite-07af52405e");
}
