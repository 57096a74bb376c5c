// Copyright (c) 2025 - Cowboy AI, Inc.
//! Property-Based Tests for the Reconciler
//!
//! Verifies, for arbitrary desired and stored connection sets:
//! - executing a plan and re-planning yields no operations
//! - the catalog builder never admits a name twice

use std::collections::BTreeSet;

use guacamole_dirsync::catalog::build_catalog;
use guacamole_dirsync::config::ResourceRules;
use guacamole_dirsync::domain::{
    DirectoryComputer, Hostname, ResourceDefinition, ResourceSource, ResourceTemplate, SettingMap,
};
use guacamole_dirsync::reconcile::{plan_resources, OperationExecutor, StoreExecutor};
use guacamole_dirsync::store::{DestinationStore, InMemoryStore, StoreTransaction};
use guacamole_dirsync::StaticResolver;
use proptest::prelude::*;

// ============================================================================
// Generators
// ============================================================================

fn settings_strategy(keys: &'static [&'static str]) -> impl Strategy<Value = SettingMap> {
    prop::collection::btree_map(
        prop::sample::select(keys).prop_map(String::from),
        "[a-z0-9]{1,4}",
        0..keys.len(),
    )
}

fn definition_strategy() -> impl Strategy<Value = ResourceDefinition> {
    (
        prop::sample::select(&["alpha", "beta", "gamma", "delta", "omega"][..]),
        prop::sample::select(&["rdp", "ssh", "vnc"][..]),
        settings_strategy(&["hostname", "port", "security", "color-depth"]),
    )
        .prop_map(|(name, protocol, parameters)| ResourceDefinition {
            name: name.to_string(),
            source: ResourceSource::Manual,
            attributes: [("protocol".to_string(), protocol.to_string())].into(),
            parameters,
        })
}

/// Desired definitions with unique names, as the catalog builder produces
fn desired_strategy() -> impl Strategy<Value = Vec<ResourceDefinition>> {
    prop::collection::vec(definition_strategy(), 0..6).prop_map(|definitions| {
        let mut seen = BTreeSet::new();
        definitions
            .into_iter()
            .filter(|d| seen.insert(d.name.clone()))
            .collect()
    })
}

async fn seed(store: &InMemoryStore, definitions: &[ResourceDefinition]) {
    let mut tx = store.begin().await.unwrap();
    for definition in definitions {
        let id = tx
            .upsert_resource(&definition.name, &definition.attributes)
            .await
            .unwrap();
        for (name, value) in &definition.parameters {
            tx.upsert_parameter(id, name, value).await.unwrap();
        }
    }
    tx.commit().await.unwrap();
}

async fn converge(store: &InMemoryStore, desired: &[ResourceDefinition]) -> usize {
    let mut tx = store.begin().await.unwrap();
    let stored = tx.resources().await.unwrap();
    let operations = plan_resources(desired, &stored);
    let planned = operations.len();

    let mut executor = StoreExecutor::new(tx).with_resources(&stored);
    executor.execute(operations).await.unwrap();
    executor.commit().await.unwrap();
    planned
}

// ============================================================================
// Properties
// ============================================================================

proptest! {
    #[test]
    fn applied_plan_converges(
        stored in desired_strategy(),
        desired in desired_strategy(),
    ) {
        tokio_test::block_on(async {
            let store = InMemoryStore::new();
            seed(&store, &stored).await;

            converge(&store, &desired).await;
            let second = converge(&store, &desired).await;
            assert_eq!(second, 0);

            let names: BTreeSet<String> =
                store.resources().await.into_iter().map(|r| r.name).collect();
            let wanted: BTreeSet<String> = desired.iter().map(|d| d.name.clone()).collect();
            assert_eq!(names, wanted);
        });
    }

    #[test]
    fn catalog_names_are_unique(
        hosts in prop::collection::vec(
            prop::sample::select(&["a.example.com", "b.example.com", "c.example.com"][..]),
            0..10,
        ),
    ) {
        let computers: Vec<DirectoryComputer> = hosts
            .iter()
            .enumerate()
            .map(|(i, host)| {
                DirectoryComputer::new(
                    format!("CN=PC{i},OU=Servers,DC=corp"),
                    format!("PC{i}"),
                    Some(Hostname::new(*host).unwrap()),
                )
            })
            .collect();
        let rules = ResourceRules {
            auto_template: ResourceTemplate {
                attributes: [("protocol".to_string(), "rdp".to_string())].into(),
                parameters: SettingMap::new(),
            },
            ..ResourceRules::default()
        };

        let build = tokio_test::block_on(build_catalog(&computers, &rules, &StaticResolver::new()))
            .unwrap();

        let unique: BTreeSet<&str> = build.names().collect();
        prop_assert_eq!(unique.len(), build.definitions.len());

        let distinct_hosts: BTreeSet<&str> = hosts.iter().copied().collect();
        prop_assert_eq!(build.definitions.len(), distinct_hosts.len());
        prop_assert_eq!(build.anomalies.len(), hosts.len() - distinct_hosts.len());
    }
}
