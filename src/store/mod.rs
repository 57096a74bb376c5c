// Copyright (c) 2025 - Cowboy AI, Inc.

//! Destination Store - the broker database seam
//!
//! Every phase reads the current state and applies its operations inside one
//! [`StoreTransaction`]. Dropping a transaction without calling
//! [`StoreTransaction::commit`] discards all of its writes.
//!
//! # Architecture
//!
//! ```text
//! DestinationStore::begin() ──► Box<dyn StoreTransaction>
//!                                   │ resources() / groups()      (read)
//!                                   │ upsert_* / delete_* / grant (write)
//!                                   ▼
//!                                commit()
//!
//! Implementations:
//!   InMemoryStore  (store::memory)
//!   MySqlStore     (adapters::mysql, feature "mysql")
//! ```
//!
//! All write primitives are idempotent: upserting an existing row or
//! deleting a missing one succeeds.

pub mod memory;

pub use memory::InMemoryStore;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::sync::Arc;
use thiserror::Error;

use crate::domain::{ObjectPermission, ResourceId, SettingMap, SystemPermission};

/// Destination store errors
#[derive(Debug, Error)]
pub enum StoreError {
    /// Connection refused, pool exhausted, server gone
    #[error("Store unavailable: {0}")]
    Unavailable(String),

    /// Statement rejected by the store
    #[error("Query failed: {0}")]
    Query(String),

    /// Stored value cannot be mapped back (unknown permission name, ...)
    #[error("Corrupt row in {table}: {reason}")]
    Corrupt { table: &'static str, reason: String },

    /// Referenced row does not exist
    #[error("{kind} {id} not found")]
    NotFound { kind: &'static str, id: i64 },
}

impl StoreError {
    pub fn is_transient(&self) -> bool {
        matches!(self, StoreError::Unavailable(_))
    }
}

/// Result type for store operations
pub type StoreResult<T> = Result<T, StoreError>;

/// Destination-assigned principal id (`entity_id`)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntityId(pub i64);

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A connection row with its parameter rows
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredResource {
    pub id: ResourceId,
    pub name: String,
    pub attributes: SettingMap,
    pub parameters: SettingMap,
}

/// Connection ids keyed by name; the lowest id wins when names repeat
pub fn ids_by_name(resources: &[StoredResource]) -> BTreeMap<String, ResourceId> {
    let mut ids = BTreeMap::new();
    for resource in resources {
        ids.entry(resource.name.clone())
            .and_modify(|id: &mut ResourceId| *id = (*id).min(resource.id))
            .or_insert(resource.id);
    }
    ids
}

/// A user-group entity with its permission rows
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredGroup {
    pub id: EntityId,
    pub name: String,
    pub object: BTreeMap<ResourceId, BTreeSet<ObjectPermission>>,
    pub system: BTreeSet<SystemPermission>,
}

/// One open unit of work against the destination
#[async_trait]
pub trait StoreTransaction: Send {
    /// Every top-level connection, ordered by id
    async fn resources(&mut self) -> StoreResult<Vec<StoredResource>>;

    /// Insert the connection, or update its attributes when the name exists
    async fn upsert_resource(
        &mut self,
        name: &str,
        attributes: &SettingMap,
    ) -> StoreResult<ResourceId>;

    /// Set one parameter row, replacing any previous value
    async fn upsert_parameter(
        &mut self,
        resource: ResourceId,
        name: &str,
        value: &str,
    ) -> StoreResult<()>;

    /// Remove one parameter row; a missing row is not an error
    async fn delete_parameter(&mut self, resource: ResourceId, name: &str) -> StoreResult<()>;

    /// Delete the connection together with its parameters and permissions
    async fn delete_resource(&mut self, resource: ResourceId) -> StoreResult<()>;

    /// Every user-group entity, ordered by name
    async fn groups(&mut self) -> StoreResult<Vec<StoredGroup>>;

    /// Create the entity and user-group rows when missing
    async fn upsert_group(&mut self, name: &str) -> StoreResult<EntityId>;

    /// Add one permission row for the entity on the resource
    async fn grant_resource_permission(
        &mut self,
        entity: EntityId,
        resource: ResourceId,
        permission: ObjectPermission,
    ) -> StoreResult<()>;

    /// Remove every permission row of the entity on the resource
    async fn revoke_resource_permissions(
        &mut self,
        entity: EntityId,
        resource: ResourceId,
    ) -> StoreResult<()>;

    /// Add one system permission row for the entity
    async fn grant_system_permission(
        &mut self,
        entity: EntityId,
        permission: SystemPermission,
    ) -> StoreResult<()>;

    /// Remove one system permission row for the entity
    async fn revoke_system_permission(
        &mut self,
        entity: EntityId,
        permission: SystemPermission,
    ) -> StoreResult<()>;

    /// Make every write of this transaction visible to later transactions
    async fn commit(self: Box<Self>) -> StoreResult<()>;
}

/// Transactional destination store
#[async_trait]
pub trait DestinationStore: Send + Sync {
    /// Open a transaction over the current committed state
    async fn begin(&self) -> StoreResult<Box<dyn StoreTransaction>>;

    /// Verify the store is reachable
    async fn health_check(&self) -> StoreResult<()>;

    fn name(&self) -> &str;
}

#[async_trait]
impl<T: DestinationStore + ?Sized> DestinationStore for Arc<T> {
    async fn begin(&self) -> StoreResult<Box<dyn StoreTransaction>> {
        (**self).begin().await
    }

    async fn health_check(&self) -> StoreResult<()> {
        (**self).health_check().await
    }

    fn name(&self) -> &str {
        (**self).name()
    }
}
