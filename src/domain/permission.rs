// Copyright (c) 2025 - Cowboy AI, Inc.
//! Permission Levels
//!
//! Names match the broker's enum columns exactly, so `as_str()` is what gets
//! written to (and parsed back from) the destination store.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::ResourceId;

/// Permission a group holds on a single resource
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ObjectPermission {
    Read,
    Update,
    Delete,
    Administer,
}

impl ObjectPermission {
    /// Level granted to ordinary groups
    pub const MEMBER: &'static [ObjectPermission] = &[ObjectPermission::Read];

    /// Level granted to administrative groups
    pub const ADMIN: &'static [ObjectPermission] = &[
        ObjectPermission::Read,
        ObjectPermission::Update,
        ObjectPermission::Delete,
        ObjectPermission::Administer,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ObjectPermission::Read => "READ",
            ObjectPermission::Update => "UPDATE",
            ObjectPermission::Delete => "DELETE",
            ObjectPermission::Administer => "ADMINISTER",
        }
    }
}

impl fmt::Display for ObjectPermission {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ObjectPermission {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "READ" => Ok(ObjectPermission::Read),
            "UPDATE" => Ok(ObjectPermission::Update),
            "DELETE" => Ok(ObjectPermission::Delete),
            "ADMINISTER" => Ok(ObjectPermission::Administer),
            other => Err(format!("Unknown object permission: {other}")),
        }
    }
}

/// Entity-wide permission, only ever granted to administrative groups
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SystemPermission {
    CreateConnection,
    CreateConnectionGroup,
    CreateSharingProfile,
    CreateUser,
    CreateUserGroup,
    Administer,
}

impl SystemPermission {
    pub const ALL: &'static [SystemPermission] = &[
        SystemPermission::CreateConnection,
        SystemPermission::CreateConnectionGroup,
        SystemPermission::CreateSharingProfile,
        SystemPermission::CreateUser,
        SystemPermission::CreateUserGroup,
        SystemPermission::Administer,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            SystemPermission::CreateConnection => "CREATE_CONNECTION",
            SystemPermission::CreateConnectionGroup => "CREATE_CONNECTION_GROUP",
            SystemPermission::CreateSharingProfile => "CREATE_SHARING_PROFILE",
            SystemPermission::CreateUser => "CREATE_USER",
            SystemPermission::CreateUserGroup => "CREATE_USER_GROUP",
            SystemPermission::Administer => "ADMINISTER",
        }
    }
}

impl fmt::Display for SystemPermission {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SystemPermission {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        SystemPermission::ALL
            .iter()
            .copied()
            .find(|permission| permission.as_str() == s)
            .ok_or_else(|| format!("Unknown system permission: {s}"))
    }
}

/// Kind of principal in the broker's access model; only user groups are
/// managed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EntityKind {
    UserGroup,
}

/// One `(entity, resource, permission)` row of desired state
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PermissionAssignment {
    pub entity: String,
    pub kind: EntityKind,
    pub resource: ResourceId,
    pub permission: ObjectPermission,
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test_case(ObjectPermission::Read, "READ")]
    #[test_case(ObjectPermission::Update, "UPDATE")]
    #[test_case(ObjectPermission::Delete, "DELETE")]
    #[test_case(ObjectPermission::Administer, "ADMINISTER")]
    fn object_permission_names_round_trip(permission: ObjectPermission, name: &str) {
        assert_eq!(permission.as_str(), name);
        assert_eq!(name.parse::<ObjectPermission>().unwrap(), permission);
    }

    #[test]
    fn system_permissions_cover_the_six_broker_rights() {
        let names: Vec<_> = SystemPermission::ALL.iter().map(|p| p.as_str()).collect();
        assert_eq!(
            names,
            vec![
                "CREATE_CONNECTION",
                "CREATE_CONNECTION_GROUP",
                "CREATE_SHARING_PROFILE",
                "CREATE_USER",
                "CREATE_USER_GROUP",
                "ADMINISTER",
            ]
        );
        assert!("CREATE_PIZZA".parse::<SystemPermission>().is_err());
    }

    #[test]
    fn admin_level_is_superset_of_member_level() {
        assert!(ObjectPermission::MEMBER
            .iter()
            .all(|p| ObjectPermission::ADMIN.contains(p)));
    }
}
