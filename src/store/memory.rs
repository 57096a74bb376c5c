// Copyright (c) 2025 - Cowboy AI, Inc.

//! In-memory destination store
//!
//! A transaction reads and writes a private copy of the committed state and
//! journals every write. Commit replays the journal onto the state committed
//! at that moment, so transactions that overlap keep each other's writes and
//! an abandoned transaction leaves no trace. Ids come from store-wide
//! counters, like auto-increment columns. Used by the test suite and by dry
//! runs against a seeded snapshot.

use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, AtomicI64, AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::Mutex;

use super::{
    DestinationStore, EntityId, StoreError, StoreResult, StoreTransaction, StoredGroup,
    StoredResource,
};
use crate::domain::{ObjectPermission, ResourceId, SettingMap, SystemPermission};

/// One journaled write
#[derive(Debug, Clone)]
enum Write {
    Resource {
        id: ResourceId,
        name: String,
        attributes: SettingMap,
    },
    Parameter {
        resource: ResourceId,
        name: String,
        value: String,
    },
    RemoveParameter {
        resource: ResourceId,
        name: String,
    },
    DeleteResource(ResourceId),
    Group {
        id: EntityId,
        name: String,
    },
    Grant {
        entity: EntityId,
        resource: ResourceId,
        permission: ObjectPermission,
    },
    RevokeResource {
        entity: EntityId,
        resource: ResourceId,
    },
    GrantSystem {
        entity: EntityId,
        permission: SystemPermission,
    },
    RevokeSystem {
        entity: EntityId,
        permission: SystemPermission,
    },
}

/// Ids handed out by a transaction that, on replay, name a row another
/// transaction committed first
#[derive(Debug, Default)]
struct Aliases {
    resources: BTreeMap<ResourceId, ResourceId>,
    entities: BTreeMap<EntityId, EntityId>,
}

impl Aliases {
    fn resource(&self, id: ResourceId) -> ResourceId {
        self.resources.get(&id).copied().unwrap_or(id)
    }

    fn entity(&self, id: EntityId) -> EntityId {
        self.entities.get(&id).copied().unwrap_or(id)
    }
}

#[derive(Debug, Clone, Default)]
struct State {
    resources: BTreeMap<ResourceId, StoredResource>,
    groups: BTreeMap<String, StoredGroup>,
}

impl State {
    fn resource_named(&self, name: &str) -> Option<ResourceId> {
        self.resources
            .values()
            .find(|resource| resource.name == name)
            .map(|resource| resource.id)
    }

    fn group_mut(&mut self, entity: EntityId) -> StoreResult<&mut StoredGroup> {
        self.groups
            .values_mut()
            .find(|group| group.id == entity)
            .ok_or(StoreError::NotFound {
                kind: "entity",
                id: entity.0,
            })
    }

    fn resource_mut(&mut self, resource: ResourceId) -> StoreResult<&mut StoredResource> {
        self.resources
            .get_mut(&resource)
            .ok_or(StoreError::NotFound {
                kind: "connection",
                id: resource.0,
            })
    }

    fn apply(&mut self, write: &Write, aliases: &mut Aliases) -> StoreResult<()> {
        match write {
            Write::Resource {
                id,
                name,
                attributes,
            } => match self.resource_named(name) {
                Some(existing) => {
                    if existing != *id {
                        aliases.resources.insert(*id, existing);
                    }
                    self.resource_mut(existing)?.attributes = attributes.clone();
                }
                None => {
                    self.resources.insert(
                        *id,
                        StoredResource {
                            id: *id,
                            name: name.clone(),
                            attributes: attributes.clone(),
                            parameters: SettingMap::new(),
                        },
                    );
                }
            },
            Write::Parameter {
                resource,
                name,
                value,
            } => {
                self.resource_mut(aliases.resource(*resource))?
                    .parameters
                    .insert(name.clone(), value.clone());
            }
            Write::RemoveParameter { resource, name } => {
                if let Some(stored) = self.resources.get_mut(&aliases.resource(*resource)) {
                    stored.parameters.remove(name);
                }
            }
            Write::DeleteResource(resource) => {
                let resource = aliases.resource(*resource);
                self.resources.remove(&resource);
                for group in self.groups.values_mut() {
                    group.object.remove(&resource);
                }
            }
            Write::Group { id, name } => match self.groups.get(name) {
                Some(existing) => {
                    if existing.id != *id {
                        aliases.entities.insert(*id, existing.id);
                    }
                }
                None => {
                    self.groups.insert(
                        name.clone(),
                        StoredGroup {
                            id: *id,
                            name: name.clone(),
                            object: BTreeMap::new(),
                            system: Default::default(),
                        },
                    );
                }
            },
            Write::Grant {
                entity,
                resource,
                permission,
            } => {
                let resource = aliases.resource(*resource);
                self.resource_mut(resource)?;
                self.group_mut(aliases.entity(*entity))?
                    .object
                    .entry(resource)
                    .or_default()
                    .insert(*permission);
            }
            Write::RevokeResource { entity, resource } => {
                let resource = aliases.resource(*resource);
                self.group_mut(aliases.entity(*entity))?
                    .object
                    .remove(&resource);
            }
            Write::GrantSystem { entity, permission } => {
                self.group_mut(aliases.entity(*entity))?
                    .system
                    .insert(*permission);
            }
            Write::RevokeSystem { entity, permission } => {
                self.group_mut(aliases.entity(*entity))?
                    .system
                    .remove(permission);
            }
        }
        Ok(())
    }
}

/// Shared in-memory store; clones share state
#[derive(Debug, Clone, Default)]
pub struct InMemoryStore {
    state: Arc<Mutex<State>>,
    last_resource_id: Arc<AtomicI64>,
    last_entity_id: Arc<AtomicI64>,
    offline: Arc<AtomicBool>,
    commits: Arc<AtomicUsize>,
}

impl InMemoryStore {
    /// Empty, available store
    pub fn new() -> Self {
        Self::default()
    }

    /// Simulate the database going away (or coming back)
    pub fn set_available(&self, available: bool) {
        self.offline.store(!available, Ordering::SeqCst);
    }

    /// Committed connections, ordered by id
    pub async fn resources(&self) -> Vec<StoredResource> {
        self.state.lock().await.resources.values().cloned().collect()
    }

    /// Committed groups, ordered by name
    pub async fn groups(&self) -> Vec<StoredGroup> {
        self.state.lock().await.groups.values().cloned().collect()
    }

    /// Committed group by name
    pub async fn group(&self, name: &str) -> Option<StoredGroup> {
        self.state.lock().await.groups.get(name).cloned()
    }

    /// Number of committed transactions
    pub fn commits(&self) -> usize {
        self.commits.load(Ordering::SeqCst)
    }

    fn check(&self) -> StoreResult<()> {
        if self.offline.load(Ordering::SeqCst) {
            Err(StoreError::Unavailable("in-memory store is offline".into()))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl DestinationStore for InMemoryStore {
    async fn begin(&self) -> StoreResult<Box<dyn StoreTransaction>> {
        self.check()?;
        let working = self.state.lock().await.clone();
        Ok(Box::new(InMemoryTransaction {
            store: self.clone(),
            working,
            journal: Vec::new(),
        }))
    }

    async fn health_check(&self) -> StoreResult<()> {
        self.check()
    }

    fn name(&self) -> &str {
        "memory"
    }
}

struct InMemoryTransaction {
    store: InMemoryStore,
    working: State,
    journal: Vec<Write>,
}

impl InMemoryTransaction {
    fn write(&mut self, write: Write) -> StoreResult<()> {
        self.working.apply(&write, &mut Aliases::default())?;
        self.journal.push(write);
        Ok(())
    }
}

#[async_trait]
impl StoreTransaction for InMemoryTransaction {
    async fn resources(&mut self) -> StoreResult<Vec<StoredResource>> {
        Ok(self.working.resources.values().cloned().collect())
    }

    async fn upsert_resource(
        &mut self,
        name: &str,
        attributes: &SettingMap,
    ) -> StoreResult<ResourceId> {
        let id = match self.working.resource_named(name) {
            Some(existing) => existing,
            None => ResourceId(self.store.last_resource_id.fetch_add(1, Ordering::SeqCst) + 1),
        };
        self.write(Write::Resource {
            id,
            name: name.to_string(),
            attributes: attributes.clone(),
        })?;
        Ok(id)
    }

    async fn upsert_parameter(
        &mut self,
        resource: ResourceId,
        name: &str,
        value: &str,
    ) -> StoreResult<()> {
        self.write(Write::Parameter {
            resource,
            name: name.to_string(),
            value: value.to_string(),
        })
    }

    async fn delete_parameter(&mut self, resource: ResourceId, name: &str) -> StoreResult<()> {
        self.write(Write::RemoveParameter {
            resource,
            name: name.to_string(),
        })
    }

    async fn delete_resource(&mut self, resource: ResourceId) -> StoreResult<()> {
        self.write(Write::DeleteResource(resource))
    }

    async fn groups(&mut self) -> StoreResult<Vec<StoredGroup>> {
        Ok(self.working.groups.values().cloned().collect())
    }

    async fn upsert_group(&mut self, name: &str) -> StoreResult<EntityId> {
        let id = match self.working.groups.get(name) {
            Some(existing) => existing.id,
            None => EntityId(self.store.last_entity_id.fetch_add(1, Ordering::SeqCst) + 1),
        };
        self.write(Write::Group {
            id,
            name: name.to_string(),
        })?;
        Ok(id)
    }

    async fn grant_resource_permission(
        &mut self,
        entity: EntityId,
        resource: ResourceId,
        permission: ObjectPermission,
    ) -> StoreResult<()> {
        self.write(Write::Grant {
            entity,
            resource,
            permission,
        })
    }

    async fn revoke_resource_permissions(
        &mut self,
        entity: EntityId,
        resource: ResourceId,
    ) -> StoreResult<()> {
        self.write(Write::RevokeResource { entity, resource })
    }

    async fn grant_system_permission(
        &mut self,
        entity: EntityId,
        permission: SystemPermission,
    ) -> StoreResult<()> {
        self.write(Write::GrantSystem { entity, permission })
    }

    async fn revoke_system_permission(
        &mut self,
        entity: EntityId,
        permission: SystemPermission,
    ) -> StoreResult<()> {
        self.write(Write::RevokeSystem { entity, permission })
    }

    async fn commit(self: Box<Self>) -> StoreResult<()> {
        let InMemoryTransaction { store, journal, .. } = *self;
        store.check()?;

        let mut committed = store.state.lock().await;
        let mut next = committed.clone();
        let mut aliases = Aliases::default();
        for write in &journal {
            next.apply(write, &mut aliases)?;
        }
        *committed = next;
        drop(committed);

        store.commits.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}
