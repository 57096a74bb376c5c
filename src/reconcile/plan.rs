// Copyright (c) 2025 - Cowboy AI, Inc.

//! Reconciliation Planning
//!
//! Pure diff between desired state and a store snapshot. Operations are
//! returned as data; nothing here touches the store.
//!
//! ```text
//! (desired, snapshot) ──► plan_*() ──► Vec<Operation> ──► OperationExecutor
//!      pure                 pure           data               async I/O
//! ```
//!
//! Planning against a snapshot that already matches the desired state yields
//! no operations, which is what makes repeated cycles cheap and convergent.

use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};

use crate::assignment::GroupGrant;
use crate::domain::{ObjectPermission, ResourceDefinition, ResourceId, SettingMap, SystemPermission};
use crate::store::{StoredGroup, StoredResource};

/// Connection-level change
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum ResourceOperation {
    /// Create the connection, or overwrite its attributes
    UpsertResource { name: String, attributes: SettingMap },
    SetParameter {
        resource: String,
        name: String,
        value: String,
    },
    RemoveParameter { resource: String, name: String },
    DeleteResource { id: ResourceId, name: String },
}

/// Group permission change
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum PermissionOperation {
    EnsureGroup {
        group: String,
    },
    GrantResource {
        group: String,
        resource: ResourceId,
        permission: ObjectPermission,
    },
    /// Drop every permission row the group holds on the resource
    RevokeResource {
        group: String,
        resource: ResourceId,
    },
    GrantSystem {
        group: String,
        permission: SystemPermission,
    },
    RevokeSystem {
        group: String,
        permission: SystemPermission,
    },
}

/// Diff desired connections against stored ones
///
/// Stored connections whose name is not desired are deleted. When the store
/// holds several connections with one name, the lowest id is kept and the
/// rest are deleted.
pub fn plan_resources(
    desired: &[ResourceDefinition],
    actual: &[StoredResource],
) -> Vec<ResourceOperation> {
    let mut kept: BTreeMap<&str, &StoredResource> = BTreeMap::new();
    let mut sorted: Vec<&StoredResource> = actual.iter().collect();
    sorted.sort_by_key(|stored| stored.id);
    for stored in sorted.iter().copied() {
        kept.entry(stored.name.as_str()).or_insert(stored);
    }

    let wanted: BTreeSet<&str> = desired.iter().map(|d| d.name.as_str()).collect();
    let mut operations: Vec<ResourceOperation> = sorted
        .iter()
        .filter(|stored| {
            !wanted.contains(stored.name.as_str())
                || kept.get(stored.name.as_str()).map(|k| k.id) != Some(stored.id)
        })
        .map(|stored| ResourceOperation::DeleteResource {
            id: stored.id,
            name: stored.name.clone(),
        })
        .collect();

    let empty = SettingMap::new();
    for definition in desired {
        let stored = kept.get(definition.name.as_str());

        if stored.map(|s| &s.attributes) != Some(&definition.attributes) {
            operations.push(ResourceOperation::UpsertResource {
                name: definition.name.clone(),
                attributes: definition.attributes.clone(),
            });
        }

        let stored_parameters = stored.map(|s| &s.parameters).unwrap_or(&empty);
        for (name, value) in &definition.parameters {
            if stored_parameters.get(name) != Some(value) {
                operations.push(ResourceOperation::SetParameter {
                    resource: definition.name.clone(),
                    name: name.clone(),
                    value: value.clone(),
                });
            }
        }
        for name in stored_parameters.keys() {
            if !definition.parameters.contains_key(name) {
                operations.push(ResourceOperation::RemoveParameter {
                    resource: definition.name.clone(),
                    name: name.clone(),
                });
            }
        }
    }

    operations
}

/// Diff desired grants against stored groups
///
/// Stored groups without a desired grant are left alone.
pub fn plan_permissions(desired: &[GroupGrant], actual: &[StoredGroup]) -> Vec<PermissionOperation> {
    let stored_by_name: BTreeMap<&str, &StoredGroup> =
        actual.iter().map(|g| (g.name.as_str(), g)).collect();
    let no_objects = BTreeMap::new();
    let no_system = BTreeSet::new();

    let mut operations = Vec::new();
    for grant in desired {
        let group = &grant.name;
        let stored = stored_by_name.get(group.as_str());
        if stored.is_none() {
            operations.push(PermissionOperation::EnsureGroup {
                group: group.clone(),
            });
        }
        let stored_object = stored.map(|s| &s.object).unwrap_or(&no_objects);
        let stored_system = stored.map(|s| &s.system).unwrap_or(&no_system);

        for (resource, permissions) in &grant.object {
            let current = stored_object.get(resource);
            if current == Some(permissions) {
                continue;
            }
            if current.is_some() {
                operations.push(PermissionOperation::RevokeResource {
                    group: group.clone(),
                    resource: *resource,
                });
            }
            operations.extend(permissions.iter().map(|permission| {
                PermissionOperation::GrantResource {
                    group: group.clone(),
                    resource: *resource,
                    permission: *permission,
                }
            }));
        }

        operations.extend(
            stored_object
                .keys()
                .filter(|resource| !grant.object.contains_key(*resource))
                .map(|resource| PermissionOperation::RevokeResource {
                    group: group.clone(),
                    resource: *resource,
                }),
        );

        operations.extend(grant.system.difference(stored_system).map(|permission| {
            PermissionOperation::GrantSystem {
                group: group.clone(),
                permission: *permission,
            }
        }));
        operations.extend(stored_system.difference(&grant.system).map(|permission| {
            PermissionOperation::RevokeSystem {
                group: group.clone(),
                permission: *permission,
            }
        }));
    }

    operations
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ResourceSource;
    use crate::store::EntityId;
    use pretty_assertions::assert_eq;

    fn settings(pairs: &[(&str, &str)]) -> SettingMap {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    fn definition(name: &str, parameters: &[(&str, &str)]) -> ResourceDefinition {
        ResourceDefinition {
            name: name.into(),
            source: ResourceSource::Manual,
            attributes: settings(&[("protocol", "rdp")]),
            parameters: settings(parameters),
        }
    }

    fn stored(id: i64, name: &str, parameters: &[(&str, &str)]) -> StoredResource {
        StoredResource {
            id: ResourceId(id),
            name: name.into(),
            attributes: settings(&[("protocol", "rdp")]),
            parameters: settings(parameters),
        }
    }

    fn stored_group(id: i64, name: &str, object: &[(i64, &[ObjectPermission])]) -> StoredGroup {
        StoredGroup {
            id: EntityId(id),
            name: name.into(),
            object: object
                .iter()
                .map(|(r, p)| (ResourceId(*r), p.iter().copied().collect()))
                .collect(),
            system: BTreeSet::new(),
        }
    }

    fn reach(ids: &[i64]) -> BTreeSet<ResourceId> {
        ids.iter().copied().map(ResourceId).collect()
    }

    #[test]
    fn new_resource_is_created_with_every_parameter() {
        let ops = plan_resources(
            &[definition("host1", &[("hostname", "host1"), ("port", "3389")])],
            &[],
        );

        assert_eq!(
            ops,
            vec![
                ResourceOperation::UpsertResource {
                    name: "host1".into(),
                    attributes: settings(&[("protocol", "rdp")]),
                },
                ResourceOperation::SetParameter {
                    resource: "host1".into(),
                    name: "hostname".into(),
                    value: "host1".into(),
                },
                ResourceOperation::SetParameter {
                    resource: "host1".into(),
                    name: "port".into(),
                    value: "3389".into(),
                },
            ]
        );
    }

    #[test]
    fn matching_snapshot_plans_nothing() {
        let desired = [definition("host1", &[("port", "3389")])];
        let actual = [stored(1, "host1", &[("port", "3389")])];
        assert!(plan_resources(&desired, &actual).is_empty());
    }

    #[test]
    fn changed_and_stale_parameters_are_reconciled() {
        let desired = [definition("host1", &[("port", "3390")])];
        let actual = [stored(1, "host1", &[("port", "3389"), ("security", "rdp")])];

        assert_eq!(
            plan_resources(&desired, &actual),
            vec![
                ResourceOperation::SetParameter {
                    resource: "host1".into(),
                    name: "port".into(),
                    value: "3390".into(),
                },
                ResourceOperation::RemoveParameter {
                    resource: "host1".into(),
                    name: "security".into(),
                },
            ]
        );
    }

    #[test]
    fn changed_attributes_trigger_upsert() {
        let mut desired = definition("host1", &[]);
        desired
            .attributes
            .insert("max_connections".into(), "2".into());

        let ops = plan_resources(&[desired], &[stored(1, "host1", &[])]);
        assert!(matches!(ops[0], ResourceOperation::UpsertResource { .. }));
        assert_eq!(ops.len(), 1);
    }

    #[test]
    fn orphans_and_duplicate_names_are_deleted() {
        let desired = [definition("host1", &[])];
        let actual = [
            stored(4, "host1", &[]),
            stored(2, "host1", &[]),
            stored(3, "retired", &[]),
        ];

        assert_eq!(
            plan_resources(&desired, &actual),
            vec![
                ResourceOperation::DeleteResource {
                    id: ResourceId(3),
                    name: "retired".into(),
                },
                ResourceOperation::DeleteResource {
                    id: ResourceId(4),
                    name: "host1".into(),
                },
            ]
        );
    }

    #[test]
    fn new_group_is_ensured_then_granted() {
        let grants = [GroupGrant::new("ops", false, &reach(&[7]))];

        assert_eq!(
            plan_permissions(&grants, &[]),
            vec![
                PermissionOperation::EnsureGroup {
                    group: "ops".into()
                },
                PermissionOperation::GrantResource {
                    group: "ops".into(),
                    resource: ResourceId(7),
                    permission: ObjectPermission::Read,
                },
            ]
        );
    }

    #[test]
    fn matching_groups_plan_nothing() {
        let grants = [GroupGrant::new("ops", false, &reach(&[7]))];
        let actual = [stored_group(1, "ops", &[(7, &[ObjectPermission::Read])])];
        assert!(plan_permissions(&grants, &actual).is_empty());
    }

    #[test]
    fn unreachable_resources_are_revoked_and_unmanaged_groups_untouched() {
        let grants = [GroupGrant::new("ops", false, &reach(&[7]))];
        let actual = [
            stored_group(1, "ops", &[(7, &[ObjectPermission::Read]), (8, &[ObjectPermission::Read])]),
            stored_group(2, "contractors", &[(9, &[ObjectPermission::Read])]),
        ];

        assert_eq!(
            plan_permissions(&grants, &actual),
            vec![PermissionOperation::RevokeResource {
                group: "ops".into(),
                resource: ResourceId(8),
            }]
        );
    }

    #[test]
    fn demoted_admin_loses_elevated_permissions() {
        let grants = [GroupGrant::new("ops", false, &reach(&[7]))];
        let admin = GroupGrant::new("ops", true, &reach(&[7]));
        let actual = [StoredGroup {
            id: EntityId(1),
            name: "ops".into(),
            object: admin.object.clone(),
            system: admin.system.clone(),
        }];

        let ops = plan_permissions(&grants, &actual);

        assert_eq!(
            &ops[..2],
            &[
                PermissionOperation::RevokeResource {
                    group: "ops".into(),
                    resource: ResourceId(7),
                },
                PermissionOperation::GrantResource {
                    group: "ops".into(),
                    resource: ResourceId(7),
                    permission: ObjectPermission::Read,
                },
            ]
        );
        let revoked_system = ops
            .iter()
            .filter(|op| matches!(op, PermissionOperation::RevokeSystem { .. }))
            .count();
        assert_eq!(revoked_system, 6);
        assert_eq!(ops.len(), 8);
    }

    #[test]
    fn operations_serialize_with_tag() {
        let op = PermissionOperation::EnsureGroup {
            group: "ops".into(),
        };
        let json = serde_json::to_value(&op).unwrap();
        assert_eq!(json["op"], "ensure_group");
        assert_eq!(json["group"], "ops");
    }
}
