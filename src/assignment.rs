// Copyright (c) 2025 - Cowboy AI, Inc.

//! Permission Assignment Calculator
//!
//! Maps a group closure to the permission rows each group should hold.
//!
//! | Group     | Per reachable resource               | System permissions |
//! |-----------|--------------------------------------|--------------------|
//! | ordinary  | `READ`                               | none               |
//! | admin     | `READ, UPDATE, DELETE, ADMINISTER`   | all six            |

use std::collections::{BTreeMap, BTreeSet};

use crate::closure::Reach;
use crate::config::PermissionRules;
use crate::domain::{
    EntityKind, ObjectPermission, PermissionAssignment, ResourceId, SystemPermission,
};

/// Desired permission state of one group
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupGrant {
    pub name: String,
    pub admin: bool,
    pub object: BTreeMap<ResourceId, BTreeSet<ObjectPermission>>,
    pub system: BTreeSet<SystemPermission>,
}

impl GroupGrant {
    /// Grant every resource at the member level, or at the admin level with
    /// all system permissions
    pub fn new(name: impl Into<String>, admin: bool, resources: &BTreeSet<ResourceId>) -> Self {
        let level = if admin {
            ObjectPermission::ADMIN
        } else {
            ObjectPermission::MEMBER
        };
        let permissions: BTreeSet<ObjectPermission> = level.iter().copied().collect();

        Self {
            name: name.into(),
            admin,
            object: resources
                .iter()
                .map(|id| (*id, permissions.clone()))
                .collect(),
            system: if admin {
                SystemPermission::ALL.iter().copied().collect()
            } else {
                BTreeSet::new()
            },
        }
    }

    /// One row per (resource, permission)
    pub fn assignments(&self) -> impl Iterator<Item = PermissionAssignment> + '_ {
        self.object.iter().flat_map(move |(resource, permissions)| {
            permissions.iter().map(move |permission| PermissionAssignment {
                entity: self.name.clone(),
                kind: EntityKind::UserGroup,
                resource: *resource,
                permission: *permission,
            })
        })
    }
}

/// Grants for every group in the closure, in name order
pub fn assign(reach: &Reach, rules: &PermissionRules) -> Vec<GroupGrant> {
    reach
        .iter()
        .map(|(group, resources)| GroupGrant::new(group.clone(), rules.is_admin(group), resources))
        .collect()
}

/// Flatten grants into `(entity, kind, resource, permission)` rows
pub fn flatten(grants: &[GroupGrant]) -> Vec<PermissionAssignment> {
    grants.iter().flat_map(GroupGrant::assignments).collect()
}
