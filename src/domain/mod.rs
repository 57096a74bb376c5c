// Copyright (c) 2025 - Cowboy AI, Inc.
//! Domain Model
//!
//! Value objects and records shared by every stage of the sync pipeline:
//!
//! ```text
//! DirectoryComputer ──► ResourceDefinition ──► ResourceId (store-assigned)
//! DirectoryGroup    ──► reach: group → {ResourceId}
//!                   ──► PermissionAssignment (entity, resource, permission)
//! ```
//!
//! - [`Hostname`] - validated `dNSHostName`
//! - [`DistinguishedName`] - case-insensitive LDAP DN
//! - [`DirectoryGroup`] / [`DirectoryComputer`] - snapshot records
//! - [`ResourceDefinition`] - desired connection (attributes + parameters)
//! - [`ObjectPermission`] / [`SystemPermission`] - broker permission names

pub mod directory;
pub mod hostname;
pub mod permission;
pub mod resource;

pub use directory::{DirectoryComputer, DirectoryGroup, DistinguishedName};
pub use hostname::{Hostname, HostnameError};
pub use permission::{EntityKind, ObjectPermission, PermissionAssignment, SystemPermission};
pub use resource::{
    canonical_attribute, canonical_attributes, ManualResource, ResourceDefinition, ResourceId,
    ResourceSource, ResourceTemplate, SettingMap, CONNECTION_ATTRIBUTES, ENCRYPTION_ATTRIBUTE,
    FAILOVER_ATTRIBUTE, HOSTNAME_PARAMETER, PROTOCOL_ATTRIBUTE,
};
