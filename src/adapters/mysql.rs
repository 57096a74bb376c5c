// Copyright (c) 2025 - Cowboy AI, Inc.

//! MySQL destination store (Guacamole schema)
//!
//! Implements [`DestinationStore`] over `sqlx` against the relational schema
//! the broker ships with:
//!
//! ```text
//! guacamole_connection            (connection_id, connection_name, parent_id, protocol, ...)
//! guacamole_connection_parameter  (connection_id, parameter_name, parameter_value)
//! guacamole_entity                (entity_id, name, type)
//! guacamole_user_group            (user_group_id, entity_id)
//! guacamole_connection_permission (entity_id, connection_id, permission)
//! guacamole_system_permission     (entity_id, permission)
//! ```
//!
//! Only top-level connections (`parent_id IS NULL`) are managed; connections
//! placed in connection groups by hand are never read, changed or deleted.
//! Every statement is a constant with bound parameters.

use async_trait::async_trait;
use sqlx::mysql::{MySqlPool, MySqlPoolOptions, MySqlRow};
use sqlx::{MySql, Row, Transaction};
use std::collections::BTreeMap;
use std::time::Duration;
use tracing::info;

use crate::config::StoreConfig;
use crate::domain::{ObjectPermission, ResourceId, SettingMap, SystemPermission};
use crate::store::{
    DestinationStore, EntityId, StoreError, StoreResult, StoreTransaction, StoredGroup,
    StoredResource,
};

const SELECT_CONNECTIONS: &str = "\
    SELECT CAST(connection_id AS SIGNED) AS connection_id, connection_name, protocol, \
           CAST(max_connections AS CHAR) AS max_connections, \
           CAST(max_connections_per_user AS CHAR) AS max_connections_per_user, \
           CAST(connection_weight AS CHAR) AS connection_weight, \
           IF(failover_only, 'true', NULL) AS failover_only, \
           proxy_hostname, \
           CAST(proxy_port AS CHAR) AS proxy_port, \
           CAST(proxy_encryption_method AS CHAR) AS proxy_encryption_method \
    FROM guacamole_connection \
    WHERE parent_id IS NULL \
    ORDER BY connection_id";

const SELECT_PARAMETERS: &str = "\
    SELECT CAST(p.connection_id AS SIGNED) AS connection_id, p.parameter_name, p.parameter_value \
    FROM guacamole_connection_parameter p \
    JOIN guacamole_connection c ON c.connection_id = p.connection_id \
    WHERE c.parent_id IS NULL";

const FIND_CONNECTION: &str = "\
    SELECT CAST(connection_id AS SIGNED) AS connection_id \
    FROM guacamole_connection \
    WHERE connection_name = ? AND parent_id IS NULL \
    ORDER BY connection_id LIMIT 1";

const INSERT_CONNECTION: &str = "\
    INSERT INTO guacamole_connection \
        (connection_name, parent_id, protocol, max_connections, max_connections_per_user, \
         connection_weight, failover_only, proxy_hostname, proxy_port, proxy_encryption_method) \
    VALUES (?, NULL, ?, ?, ?, ?, ?, ?, ?, ?)";

const UPDATE_CONNECTION: &str = "\
    UPDATE guacamole_connection \
    SET protocol = ?, max_connections = ?, max_connections_per_user = ?, \
        connection_weight = ?, failover_only = ?, proxy_hostname = ?, proxy_port = ?, \
        proxy_encryption_method = ? \
    WHERE connection_id = ?";

const UPSERT_PARAMETER: &str = "\
    INSERT INTO guacamole_connection_parameter (connection_id, parameter_name, parameter_value) \
    VALUES (?, ?, ?) \
    ON DUPLICATE KEY UPDATE parameter_value = VALUES(parameter_value)";

const DELETE_PARAMETER: &str = "\
    DELETE FROM guacamole_connection_parameter WHERE connection_id = ? AND parameter_name = ?";

const DELETE_CONNECTION_PARAMETERS: &str =
    "DELETE FROM guacamole_connection_parameter WHERE connection_id = ?";

const DELETE_CONNECTION_PERMISSIONS: &str =
    "DELETE FROM guacamole_connection_permission WHERE connection_id = ?";

const DELETE_CONNECTION: &str = "DELETE FROM guacamole_connection WHERE connection_id = ?";

const SELECT_GROUPS: &str = "\
    SELECT CAST(e.entity_id AS SIGNED) AS entity_id, e.name \
    FROM guacamole_entity e \
    JOIN guacamole_user_group g ON g.entity_id = e.entity_id \
    WHERE e.type = 'USER_GROUP' \
    ORDER BY e.name";

const SELECT_GROUP_CONNECTION_PERMISSIONS: &str = "\
    SELECT CAST(p.entity_id AS SIGNED) AS entity_id, \
           CAST(p.connection_id AS SIGNED) AS connection_id, \
           CAST(p.permission AS CHAR) AS permission \
    FROM guacamole_connection_permission p \
    JOIN guacamole_entity e ON e.entity_id = p.entity_id \
    JOIN guacamole_connection c ON c.connection_id = p.connection_id \
    WHERE e.type = 'USER_GROUP' AND c.parent_id IS NULL";

const SELECT_GROUP_SYSTEM_PERMISSIONS: &str = "\
    SELECT CAST(s.entity_id AS SIGNED) AS entity_id, CAST(s.permission AS CHAR) AS permission \
    FROM guacamole_system_permission s \
    JOIN guacamole_entity e ON e.entity_id = s.entity_id \
    WHERE e.type = 'USER_GROUP'";

// LAST_INSERT_ID(expr) makes the existing id visible to last_insert_id()
const UPSERT_ENTITY: &str = "\
    INSERT INTO guacamole_entity (name, type) VALUES (?, 'USER_GROUP') \
    ON DUPLICATE KEY UPDATE entity_id = LAST_INSERT_ID(entity_id)";

const ENSURE_USER_GROUP: &str = "INSERT IGNORE INTO guacamole_user_group (entity_id) VALUES (?)";

const GRANT_CONNECTION: &str = "\
    INSERT IGNORE INTO guacamole_connection_permission (entity_id, connection_id, permission) \
    VALUES (?, ?, ?)";

const REVOKE_CONNECTION: &str = "\
    DELETE FROM guacamole_connection_permission WHERE entity_id = ? AND connection_id = ?";

const GRANT_SYSTEM: &str =
    "INSERT IGNORE INTO guacamole_system_permission (entity_id, permission) VALUES (?, ?)";

const REVOKE_SYSTEM: &str =
    "DELETE FROM guacamole_system_permission WHERE entity_id = ? AND permission = ?";

/// Connectivity failures are retried; everything else is a query error
fn store_error(e: sqlx::Error) -> StoreError {
    match e {
        sqlx::Error::Io(_)
        | sqlx::Error::Tls(_)
        | sqlx::Error::PoolTimedOut
        | sqlx::Error::PoolClosed
        | sqlx::Error::WorkerCrashed => StoreError::Unavailable(e.to_string()),
        other => StoreError::Query(other.to_string()),
    }
}

/// `failover_only` is a NOT NULL boolean column; absent means false
fn failover_flag(attributes: &SettingMap) -> bool {
    attributes
        .get("failover_only")
        .is_some_and(|v| matches!(v.to_ascii_lowercase().as_str(), "true" | "1" | "yes"))
}

fn attribute(attributes: &SettingMap, name: &str) -> Option<String> {
    attributes.get(name).cloned()
}

/// MySQL-backed destination store
pub struct MySqlStore {
    pool: MySqlPool,
}

impl MySqlStore {
    /// Build a lazily connecting pool; nothing is dialled until first use
    pub fn new(config: &StoreConfig) -> StoreResult<Self> {
        let pool = MySqlPoolOptions::new()
            .max_connections(config.max_connections)
            .acquire_timeout(Duration::from_secs(10))
            .connect_lazy(&config.url)
            .map_err(|e| StoreError::Unavailable(format!("invalid store url: {e}")))?;
        Ok(Self { pool })
    }
}

#[async_trait]
impl DestinationStore for MySqlStore {
    async fn begin(&self) -> StoreResult<Box<dyn StoreTransaction>> {
        let tx = self.pool.begin().await.map_err(store_error)?;
        Ok(Box::new(MySqlTransaction { tx }))
    }

    async fn health_check(&self) -> StoreResult<()> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map_err(store_error)?;
        Ok(())
    }

    fn name(&self) -> &str {
        "mysql"
    }
}

struct MySqlTransaction {
    tx: Transaction<'static, MySql>,
}

fn object_permission(row: &MySqlRow) -> StoreResult<ObjectPermission> {
    let raw: String = row.try_get("permission").map_err(store_error)?;
    raw.parse().map_err(|reason| StoreError::Corrupt {
        table: "guacamole_connection_permission",
        reason,
    })
}

fn system_permission(row: &MySqlRow) -> StoreResult<SystemPermission> {
    let raw: String = row.try_get("permission").map_err(store_error)?;
    raw.parse().map_err(|reason| StoreError::Corrupt {
        table: "guacamole_system_permission",
        reason,
    })
}

#[async_trait]
impl StoreTransaction for MySqlTransaction {
    async fn resources(&mut self) -> StoreResult<Vec<StoredResource>> {
        let rows = sqlx::query(SELECT_CONNECTIONS)
            .fetch_all(&mut *self.tx)
            .await
            .map_err(store_error)?;

        let mut resources: BTreeMap<ResourceId, StoredResource> = BTreeMap::new();
        for row in &rows {
            let id = ResourceId(row.try_get("connection_id").map_err(store_error)?);
            let mut attributes = SettingMap::new();
            for name in crate::domain::CONNECTION_ATTRIBUTES {
                let value: Option<String> = row.try_get(*name).map_err(store_error)?;
                if let Some(value) = value {
                    attributes.insert(name.to_string(), value);
                }
            }
            resources.insert(
                id,
                StoredResource {
                    id,
                    name: row.try_get("connection_name").map_err(store_error)?,
                    attributes,
                    parameters: SettingMap::new(),
                },
            );
        }

        let rows = sqlx::query(SELECT_PARAMETERS)
            .fetch_all(&mut *self.tx)
            .await
            .map_err(store_error)?;
        for row in &rows {
            let id = ResourceId(row.try_get("connection_id").map_err(store_error)?);
            if let Some(resource) = resources.get_mut(&id) {
                resource.parameters.insert(
                    row.try_get("parameter_name").map_err(store_error)?,
                    row.try_get("parameter_value").map_err(store_error)?,
                );
            }
        }

        Ok(resources.into_values().collect())
    }

    async fn upsert_resource(
        &mut self,
        name: &str,
        attributes: &SettingMap,
    ) -> StoreResult<ResourceId> {
        let existing: Option<i64> = sqlx::query_scalar(FIND_CONNECTION)
            .bind(name)
            .fetch_optional(&mut *self.tx)
            .await
            .map_err(store_error)?;

        let get = |column: &str| attribute(attributes, column);
        match existing {
            Some(id) => {
                sqlx::query(UPDATE_CONNECTION)
                    .bind(get("protocol"))
                    .bind(get("max_connections"))
                    .bind(get("max_connections_per_user"))
                    .bind(get("connection_weight"))
                    .bind(failover_flag(attributes))
                    .bind(get("proxy_hostname"))
                    .bind(get("proxy_port"))
                    .bind(get("proxy_encryption_method"))
                    .bind(id)
                    .execute(&mut *self.tx)
                    .await
                    .map_err(store_error)?;
                Ok(ResourceId(id))
            }
            None => {
                let result = sqlx::query(INSERT_CONNECTION)
                    .bind(name)
                    .bind(get("protocol"))
                    .bind(get("max_connections"))
                    .bind(get("max_connections_per_user"))
                    .bind(get("connection_weight"))
                    .bind(failover_flag(attributes))
                    .bind(get("proxy_hostname"))
                    .bind(get("proxy_port"))
                    .bind(get("proxy_encryption_method"))
                    .execute(&mut *self.tx)
                    .await
                    .map_err(store_error)?;
                let id = result.last_insert_id() as i64;
                info!(connection = %name, id, "Created connection");
                Ok(ResourceId(id))
            }
        }
    }

    async fn upsert_parameter(
        &mut self,
        resource: ResourceId,
        name: &str,
        value: &str,
    ) -> StoreResult<()> {
        sqlx::query(UPSERT_PARAMETER)
            .bind(resource.0)
            .bind(name)
            .bind(value)
            .execute(&mut *self.tx)
            .await
            .map_err(store_error)?;
        Ok(())
    }

    async fn delete_parameter(&mut self, resource: ResourceId, name: &str) -> StoreResult<()> {
        sqlx::query(DELETE_PARAMETER)
            .bind(resource.0)
            .bind(name)
            .execute(&mut *self.tx)
            .await
            .map_err(store_error)?;
        Ok(())
    }

    async fn delete_resource(&mut self, resource: ResourceId) -> StoreResult<()> {
        for statement in [
            DELETE_CONNECTION_PARAMETERS,
            DELETE_CONNECTION_PERMISSIONS,
            DELETE_CONNECTION,
        ] {
            sqlx::query(statement)
                .bind(resource.0)
                .execute(&mut *self.tx)
                .await
                .map_err(store_error)?;
        }
        info!(id = resource.0, "Deleted connection");
        Ok(())
    }

    async fn groups(&mut self) -> StoreResult<Vec<StoredGroup>> {
        let rows = sqlx::query(SELECT_GROUPS)
            .fetch_all(&mut *self.tx)
            .await
            .map_err(store_error)?;

        let mut by_id: BTreeMap<EntityId, StoredGroup> = BTreeMap::new();
        for row in &rows {
            let id = EntityId(row.try_get("entity_id").map_err(store_error)?);
            by_id.insert(
                id,
                StoredGroup {
                    id,
                    name: row.try_get("name").map_err(store_error)?,
                    object: BTreeMap::new(),
                    system: Default::default(),
                },
            );
        }

        let rows = sqlx::query(SELECT_GROUP_CONNECTION_PERMISSIONS)
            .fetch_all(&mut *self.tx)
            .await
            .map_err(store_error)?;
        for row in &rows {
            let id = EntityId(row.try_get("entity_id").map_err(store_error)?);
            let resource = ResourceId(row.try_get("connection_id").map_err(store_error)?);
            let permission = object_permission(row)?;
            if let Some(group) = by_id.get_mut(&id) {
                group.object.entry(resource).or_default().insert(permission);
            }
        }

        let rows = sqlx::query(SELECT_GROUP_SYSTEM_PERMISSIONS)
            .fetch_all(&mut *self.tx)
            .await
            .map_err(store_error)?;
        for row in &rows {
            let id = EntityId(row.try_get("entity_id").map_err(store_error)?);
            let permission = system_permission(row)?;
            if let Some(group) = by_id.get_mut(&id) {
                group.system.insert(permission);
            }
        }

        let mut groups: Vec<StoredGroup> = by_id.into_values().collect();
        groups.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(groups)
    }

    async fn upsert_group(&mut self, name: &str) -> StoreResult<EntityId> {
        let result = sqlx::query(UPSERT_ENTITY)
            .bind(name)
            .execute(&mut *self.tx)
            .await
            .map_err(store_error)?;
        let id = result.last_insert_id() as i64;

        sqlx::query(ENSURE_USER_GROUP)
            .bind(id)
            .execute(&mut *self.tx)
            .await
            .map_err(store_error)?;
        Ok(EntityId(id))
    }

    async fn grant_resource_permission(
        &mut self,
        entity: EntityId,
        resource: ResourceId,
        permission: ObjectPermission,
    ) -> StoreResult<()> {
        sqlx::query(GRANT_CONNECTION)
            .bind(entity.0)
            .bind(resource.0)
            .bind(permission.as_str())
            .execute(&mut *self.tx)
            .await
            .map_err(store_error)?;
        Ok(())
    }

    async fn revoke_resource_permissions(
        &mut self,
        entity: EntityId,
        resource: ResourceId,
    ) -> StoreResult<()> {
        sqlx::query(REVOKE_CONNECTION)
            .bind(entity.0)
            .bind(resource.0)
            .execute(&mut *self.tx)
            .await
            .map_err(store_error)?;
        Ok(())
    }

    async fn grant_system_permission(
        &mut self,
        entity: EntityId,
        permission: SystemPermission,
    ) -> StoreResult<()> {
        sqlx::query(GRANT_SYSTEM)
            .bind(entity.0)
            .bind(permission.as_str())
            .execute(&mut *self.tx)
            .await
            .map_err(store_error)?;
        Ok(())
    }

    async fn revoke_system_permission(
        &mut self,
        entity: EntityId,
        permission: SystemPermission,
    ) -> StoreResult<()> {
        sqlx::query(REVOKE_SYSTEM)
            .bind(entity.0)
            .bind(permission.as_str())
            .execute(&mut *self.tx)
            .await
            .map_err(store_error)?;
        Ok(())
    }

    async fn commit(self: Box<Self>) -> StoreResult<()> {
        self.tx.commit().await.map_err(store_error)
    }
}
