// Copyright (c) 2025 - Cowboy AI, Inc.
//! Property-Based Tests for the Group Closure
//!
//! Verifies, for arbitrary catalogs and membership graphs:
//! - admin groups reach exactly the whole catalog
//! - groups with no seed and no inherited seed reach nothing
//! - nested membership propagates down chains and through cycles

use std::collections::{BTreeMap, BTreeSet};

use guacamole_dirsync::catalog::ResourceCatalog;
use guacamole_dirsync::closure::resolve_closure;
use guacamole_dirsync::config::PermissionRules;
use guacamole_dirsync::domain::{DirectoryGroup, ResourceId};
use proptest::prelude::*;

// ============================================================================
// Generators
// ============================================================================

fn dn(cn: &str) -> String {
    format!("CN={cn},OU=Groups,DC=corp")
}

fn catalog_strategy() -> impl Strategy<Value = ResourceCatalog> {
    prop::collection::btree_set("[a-z]{3,8}", 0..12).prop_map(|names| {
        names
            .into_iter()
            .enumerate()
            .map(|(i, name)| (name, ResourceId(i as i64 + 1)))
            .collect()
    })
}

/// Groups g0..gN with random `memberOf` edges between them
fn graph_strategy() -> impl Strategy<Value = Vec<DirectoryGroup>> {
    (1usize..10).prop_flat_map(|n| {
        prop::collection::vec(prop::collection::vec(0..n, 0..3), n).prop_map(
            move |parents| {
                parents
                    .into_iter()
                    .enumerate()
                    .map(|(i, parents)| {
                        let cn = format!("g{i}");
                        parents
                            .into_iter()
                            .fold(DirectoryGroup::new(dn(&cn), cn), |group, p| {
                                group.member_of(dn(&format!("g{p}")))
                            })
                    })
                    .collect()
            },
        )
    })
}

/// Reference closure: group i reaches j's seed when j is reachable by
/// following `memberOf` edges from i
fn ancestors(groups: &[DirectoryGroup], start: usize) -> BTreeSet<usize> {
    let index: BTreeMap<String, usize> = groups
        .iter()
        .enumerate()
        .map(|(i, g)| (g.dn.folded().to_string(), i))
        .collect();

    let mut seen = BTreeSet::from([start]);
    let mut stack = vec![start];
    while let Some(i) = stack.pop() {
        for parent in &groups[i].member_of {
            if let Some(&p) = index.get(parent.folded()) {
                if seen.insert(p) {
                    stack.push(p);
                }
            }
        }
    }
    seen
}

// ============================================================================
// Properties
// ============================================================================

proptest! {
    #[test]
    fn admin_reach_is_the_whole_catalog(
        catalog in catalog_strategy(),
        groups in graph_strategy(),
    ) {
        let rules = PermissionRules {
            admin_groups: vec!["g0".into(), "absent-admins".into()],
            ..PermissionRules::default()
        };
        let outcome = resolve_closure(&groups, &catalog, &rules);
        let everything: BTreeSet<ResourceId> = catalog.values().copied().collect();

        prop_assert_eq!(&outcome.reach["g0"], &everything);
        prop_assert_eq!(&outcome.reach["absent-admins"], &everything);
    }

    #[test]
    fn groups_without_seeds_reach_nothing(
        catalog in catalog_strategy(),
        groups in graph_strategy(),
    ) {
        let outcome = resolve_closure(&groups, &catalog, &PermissionRules::default());

        prop_assert!(!outcome.truncated);
        prop_assert_eq!(outcome.reach.len(), groups.len());
        prop_assert!(outcome.reach.values().all(BTreeSet::is_empty));
    }

    #[test]
    fn seeds_flow_to_every_nested_member(
        groups in graph_strategy(),
        seeded in 0usize..10,
    ) {
        let seeded = seeded % groups.len();
        let catalog: ResourceCatalog = [("jump".to_string(), ResourceId(7))].into();
        let rules = PermissionRules {
            manual: [(format!("g{seeded}"), vec!["jump".to_string()])].into(),
            ..PermissionRules::default()
        };

        let outcome = resolve_closure(&groups, &catalog, &rules);
        prop_assert!(!outcome.truncated);

        for (i, group) in groups.iter().enumerate() {
            let expected = ancestors(&groups, i).contains(&seeded);
            prop_assert_eq!(
                outcome.reach[&group.cn].contains(&ResourceId(7)),
                expected,
                "group {}", group.cn
            );
        }
    }

    #[test]
    fn chains_converge_within_their_length(length in 2usize..30) {
        let groups: Vec<DirectoryGroup> = (0..length)
            .map(|i| {
                let cn = format!("g{i}");
                let group = DirectoryGroup::new(dn(&cn), cn);
                if i == 0 { group } else { group.member_of(dn(&format!("g{}", i - 1))) }
            })
            .collect();
        let catalog: ResourceCatalog = [("jump".to_string(), ResourceId(1))].into();
        let rules = PermissionRules {
            manual: [("g0".to_string(), vec!["jump".to_string()])].into(),
            ..PermissionRules::default()
        };

        let outcome = resolve_closure(&groups, &catalog, &rules);

        prop_assert!(!outcome.truncated);
        prop_assert!(outcome.passes <= length);
        prop_assert!(outcome.reach.values().all(|r| r.contains(&ResourceId(1))));
    }
}
