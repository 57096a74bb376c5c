// Copyright (c) 2025 - Cowboy AI, Inc.
//! Operation Executors
//!
//! Interpret the operations produced by [`super::plan`] and perform (or just
//! record) the actual writes.
//!
//! # Architecture
//!
//! ```text
//! Pure Planning                Executor
//! ─────────────               ──────────
//!
//! (desired, snapshot)          Operations
//!      │                          │
//!      ▼                          ▼
//! ┌─────────────┐           ┌──────────────┐
//! │   plan_*()  │    Ops    │  execute()   │
//! │ (pure func) │ ───────>  │  (async I/O) │
//! └─────────────┘           └──────────────┘
//!                                 │
//!                                 ▼
//!                      StoreTransaction / recording
//! ```
//!
//! Operations address resources and groups by name. [`StoreExecutor`]
//! resolves names to ids from the snapshot it was seeded with, then from the
//! results of its own upserts.

use async_trait::async_trait;
use serde::Serialize;
use std::collections::BTreeMap;
use tracing::{debug, info};

use super::plan::{PermissionOperation, ResourceOperation};
use crate::domain::ResourceId;
use crate::store::{
    ids_by_name, EntityId, StoreError, StoreResult, StoreTransaction, StoredGroup, StoredResource,
};

/// Executes a batch of planned operations
///
/// Operations are applied in order; the first failure stops the batch and
/// leaves the caller to drop the transaction.
#[async_trait]
pub trait OperationExecutor<Op: Send + 'static>: Send {
    /// Returns the number of operations applied
    async fn execute(&mut self, operations: Vec<Op>) -> Result<usize, ExecutorError>;

    async fn execute_one(&mut self, operation: Op) -> Result<usize, ExecutorError> {
        self.execute(vec![operation]).await
    }
}

/// Errors that can occur while applying operations
#[derive(Debug, thiserror::Error)]
pub enum ExecutorError {
    /// Store write failed
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    /// Operation names a connection that neither the snapshot nor an earlier
    /// upsert produced
    #[error("Unknown connection: {0}")]
    UnknownResource(String),

    /// Operation names a group that was never ensured
    #[error("Unknown group: {0}")]
    UnknownGroup(String),
}

/// Applies operations to an open store transaction
pub struct StoreExecutor {
    transaction: Box<dyn StoreTransaction>,
    resources: BTreeMap<String, ResourceId>,
    groups: BTreeMap<String, EntityId>,
    applied: usize,
}

impl StoreExecutor {
    pub fn new(transaction: Box<dyn StoreTransaction>) -> Self {
        Self {
            transaction,
            resources: BTreeMap::new(),
            groups: BTreeMap::new(),
            applied: 0,
        }
    }

    /// Seed name → id from a resource snapshot; the lowest id wins per name
    pub fn with_resources(mut self, snapshot: &[StoredResource]) -> Self {
        self.resources = ids_by_name(snapshot);
        self
    }

    /// Seed name → id from a group snapshot
    pub fn with_groups(mut self, snapshot: &[StoredGroup]) -> Self {
        self.groups
            .extend(snapshot.iter().map(|g| (g.name.clone(), g.id)));
        self
    }

    /// Operations applied so far
    pub fn applied(&self) -> usize {
        self.applied
    }

    /// Commit the underlying transaction
    pub async fn commit(self) -> StoreResult<()> {
        self.transaction.commit().await
    }

    fn resource(&self, name: &str) -> Result<ResourceId, ExecutorError> {
        self.resources
            .get(name)
            .copied()
            .ok_or_else(|| ExecutorError::UnknownResource(name.to_string()))
    }

    fn group(&self, name: &str) -> Result<EntityId, ExecutorError> {
        self.groups
            .get(name)
            .copied()
            .ok_or_else(|| ExecutorError::UnknownGroup(name.to_string()))
    }

    async fn apply_resource(&mut self, operation: ResourceOperation) -> Result<(), ExecutorError> {
        match operation {
            ResourceOperation::UpsertResource { name, attributes } => {
                let id = self.transaction.upsert_resource(&name, &attributes).await?;
                self.resources.insert(name, id);
            }
            ResourceOperation::SetParameter {
                resource,
                name,
                value,
            } => {
                let id = self.resource(&resource)?;
                self.transaction.upsert_parameter(id, &name, &value).await?;
            }
            ResourceOperation::RemoveParameter { resource, name } => {
                let id = self.resource(&resource)?;
                self.transaction.delete_parameter(id, &name).await?;
            }
            ResourceOperation::DeleteResource { id, name } => {
                self.transaction.delete_resource(id).await?;
                if self.resources.get(&name) == Some(&id) {
                    self.resources.remove(&name);
                }
            }
        }
        Ok(())
    }

    async fn apply_permission(
        &mut self,
        operation: PermissionOperation,
    ) -> Result<(), ExecutorError> {
        match operation {
            PermissionOperation::EnsureGroup { group } => {
                let id = self.transaction.upsert_group(&group).await?;
                self.groups.insert(group, id);
            }
            PermissionOperation::GrantResource {
                group,
                resource,
                permission,
            } => {
                let entity = self.group(&group)?;
                self.transaction
                    .grant_resource_permission(entity, resource, permission)
                    .await?;
            }
            PermissionOperation::RevokeResource { group, resource } => {
                let entity = self.group(&group)?;
                self.transaction
                    .revoke_resource_permissions(entity, resource)
                    .await?;
            }
            PermissionOperation::GrantSystem { group, permission } => {
                let entity = self.group(&group)?;
                self.transaction
                    .grant_system_permission(entity, permission)
                    .await?;
            }
            PermissionOperation::RevokeSystem { group, permission } => {
                let entity = self.group(&group)?;
                self.transaction
                    .revoke_system_permission(entity, permission)
                    .await?;
            }
        }
        Ok(())
    }
}

#[async_trait]
impl OperationExecutor<ResourceOperation> for StoreExecutor {
    async fn execute(&mut self, operations: Vec<ResourceOperation>) -> Result<usize, ExecutorError> {
        let count = operations.len();
        for operation in operations {
            debug!(operation = ?operation, "Applying resource operation");
            self.apply_resource(operation).await?;
            self.applied += 1;
        }
        Ok(count)
    }
}

#[async_trait]
impl OperationExecutor<PermissionOperation> for StoreExecutor {
    async fn execute(
        &mut self,
        operations: Vec<PermissionOperation>,
    ) -> Result<usize, ExecutorError> {
        let count = operations.len();
        for operation in operations {
            debug!(operation = ?operation, "Applying permission operation");
            self.apply_permission(operation).await?;
            self.applied += 1;
        }
        Ok(count)
    }
}

/// Records operations instead of applying them
///
/// Backs dry runs and tests. Each operation is logged once, as JSON, at info.
#[derive(Debug, Clone)]
pub struct RecordingExecutor<Op> {
    pub recorded: Vec<Op>,
}

impl<Op> RecordingExecutor<Op> {
    pub fn new() -> Self {
        Self {
            recorded: Vec::new(),
        }
    }

    pub fn operations(&self) -> &[Op] {
        &self.recorded
    }

    /// Take all recorded operations, leaving the recorder empty
    pub fn take(&mut self) -> Vec<Op> {
        std::mem::take(&mut self.recorded)
    }
}

impl<Op> Default for RecordingExecutor<Op> {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl<Op> OperationExecutor<Op> for RecordingExecutor<Op>
where
    Op: Serialize + Send + 'static,
{
    async fn execute(&mut self, operations: Vec<Op>) -> Result<usize, ExecutorError> {
        let count = operations.len();
        for operation in operations {
            if let Ok(json) = serde_json::to_string(&operation) {
                info!(operation = %json, "Operation recorded, not applied");
            }
            self.recorded.push(operation);
        }
        Ok(count)
    }
}
