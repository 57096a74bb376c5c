// Copyright (c) 2025 - Cowboy AI, Inc.

//! Group Closure Resolver
//!
//! Computes, for every group, the set of resources it may reach:
//!
//! ```text
//! 1. seed     every directory group cn ──► {}
//! 2. manual   permissions.manual[group] ──► catalog ids
//! 3. pattern  resource name ──regex──► template ──► existing group
//! 4. nest     A.dn ∈ B.member_of  ⇒  reach[B] ⊇ reach[A]   (to fixpoint)
//! 5. admin    reach[admin] = every id
//! ```
//!
//! Step 4 runs full passes over the membership edges until a pass changes
//! nothing. Cycles converge because reach sets only grow and are bounded by
//! the catalog. `max_propagation_passes` caps the loop anyway; hitting the
//! cap is reported, never silent.

use std::collections::{BTreeMap, BTreeSet};
use tracing::{debug, instrument, warn};

use crate::catalog::ResourceCatalog;
use crate::config::{GroupDerivation, PermissionRules};
use crate::domain::{DirectoryGroup, DistinguishedName, ResourceId};
use crate::errors::Anomaly;

/// Group display name → reachable resource ids
pub type Reach = BTreeMap<String, BTreeSet<ResourceId>>;

/// Reach per group plus what went wrong computing it
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClosureOutcome {
    pub reach: Reach,
    /// Propagation hit the pass cap and the reach sets are still short of
    /// a fixpoint
    pub truncated: bool,
    pub passes: usize,
    pub anomalies: Vec<Anomaly>,
}

/// Resolve group reach from the directory snapshot and the stored catalog
#[instrument(skip_all, fields(groups = groups.len(), resources = catalog.len()))]
pub fn resolve_closure(
    groups: &[DirectoryGroup],
    catalog: &ResourceCatalog,
    rules: &PermissionRules,
) -> ClosureOutcome {
    let mut outcome = ClosureOutcome::default();

    for group in groups {
        outcome.reach.entry(group.cn.clone()).or_default();
    }

    seed_manual(&mut outcome, catalog, rules);
    seed_from_names(&mut outcome, catalog, rules);
    propagate(&mut outcome, groups, rules.max_propagation_passes);

    let everything: BTreeSet<ResourceId> = catalog.values().copied().collect();
    for admin in &rules.admin_groups {
        outcome.reach.insert(admin.clone(), everything.clone());
    }

    debug!(
        passes = outcome.passes,
        truncated = outcome.truncated,
        anomalies = outcome.anomalies.len(),
        "Group closure resolved"
    );
    outcome
}

fn seed_manual(outcome: &mut ClosureOutcome, catalog: &ResourceCatalog, rules: &PermissionRules) {
    for (group, resources) in &rules.manual {
        let reach = outcome.reach.entry(group.clone()).or_default();
        for resource in resources {
            match catalog.get(resource) {
                Some(id) => {
                    reach.insert(*id);
                }
                None => outcome.anomalies.push(Anomaly::UnknownResource {
                    group: group.clone(),
                    resource: resource.clone(),
                }),
            }
        }
    }
}

fn seed_from_names(
    outcome: &mut ClosureOutcome,
    catalog: &ResourceCatalog,
    rules: &PermissionRules,
) {
    let Some(rule) = &rules.group_name_rule else {
        return;
    };

    for (resource, id) in catalog {
        match rule.derive(resource) {
            GroupDerivation::NoMatch => {
                debug!(resource = %resource, "Resource name does not match group pattern");
            }
            GroupDerivation::NoCapture => outcome.anomalies.push(Anomaly::NoCapture {
                resource: resource.clone(),
            }),
            GroupDerivation::Group(group) => match outcome.reach.get_mut(&group) {
                Some(reach) => {
                    reach.insert(*id);
                }
                None => outcome.anomalies.push(Anomaly::GroupNotFound {
                    group,
                    resource: resource.clone(),
                }),
            },
        }
    }
}

fn propagate(outcome: &mut ClosureOutcome, groups: &[DirectoryGroup], max_passes: usize) {
    let names: BTreeMap<&DistinguishedName, &str> =
        groups.iter().map(|g| (&g.dn, g.cn.as_str())).collect();

    // (parent cn, member cn); parents outside the snapshot carry no reach
    let edges: Vec<(&str, &str)> = groups
        .iter()
        .flat_map(|member| {
            member
                .member_of
                .iter()
                .filter_map(|parent| names.get(parent).copied())
                .filter(move |parent| *parent != member.cn)
                .map(move |parent| (parent, member.cn.as_str()))
        })
        .collect();

    let mut converged = false;
    while outcome.passes < max_passes && !converged {
        outcome.passes += 1;
        converged = !spread(&mut outcome.reach, &edges);
    }

    // the last allowed pass may have been the one that reached the fixpoint
    if !converged && settled(&outcome.reach, &edges) {
        converged = true;
    }

    if !converged {
        warn!(
            passes = outcome.passes,
            "Group propagation stopped at the pass cap without reaching a fixpoint"
        );
        outcome.truncated = true;
        outcome.anomalies.push(Anomaly::PropagationTruncated {
            passes: outcome.passes,
        });
    }
}

/// One pass over every edge; true when any member gained reach
fn spread(reach: &mut Reach, edges: &[(&str, &str)]) -> bool {
    let mut changed = false;
    for (parent, member) in edges {
        let inherited = reach.get(*parent).cloned().unwrap_or_default();
        if inherited.is_empty() {
            continue;
        }
        let member_reach = reach.entry(member.to_string()).or_default();
        let before = member_reach.len();
        member_reach.extend(inherited);
        changed |= member_reach.len() != before;
    }
    changed
}

/// Every member already holds its parents' reach
fn settled(reach: &Reach, edges: &[(&str, &str)]) -> bool {
    edges.iter().all(|(parent, member)| match reach.get(*parent) {
        Some(inherited) if !inherited.is_empty() => reach
            .get(*member)
            .is_some_and(|member_reach| member_reach.is_superset(inherited)),
        _ => true,
    })
}
