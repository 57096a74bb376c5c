// Copyright (c) 2025 - Cowboy AI, Inc.
//! Sync Service
//!
//! Runs one cycle of either phase end to end. Each cycle reads fresh
//! snapshots, computes desired state with pure functions, and applies the
//! difference inside a single store transaction.
//!
//! ```text
//! sync_resources:
//!   directory computers ─► build_catalog ─┐
//!   store.begin() ─► tx.resources() ──────┴─► plan_resources ─► execute ─► commit
//!
//! sync_permissions:
//!   directory groups ──────────────────────────┐
//!   store.begin() ─► tx.resources() ─► catalog ─┴─► resolve_closure ─► assign
//!                 ─► tx.groups() ─────────────────► plan_permissions ─► execute ─► commit
//! ```

use chrono::Utc;
use serde::Serialize;
use std::sync::Arc;
use tracing::{info, instrument, Span};
use uuid::Uuid;

use super::report::{CycleReport, Phase};
use super::retry::with_retry;
use crate::assignment::assign;
use crate::catalog::build_catalog;
use crate::closure::resolve_closure;
use crate::config::SyncConfig;
use crate::directory::DirectorySource;
use crate::errors::{SyncError, SyncResult};
use crate::inventory::Inventory;
use crate::reconcile::{
    plan_permissions, plan_resources, OperationExecutor, RecordingExecutor, StoreExecutor,
};
use crate::resolver::HostResolver;
use crate::store::{ids_by_name, DestinationStore, StoreTransaction};

/// Orchestrates the two sync phases against injected collaborators
pub struct SyncService {
    config: Arc<SyncConfig>,
    inventory: Inventory,
    store: Arc<dyn DestinationStore>,
    resolver: Arc<dyn HostResolver>,
    dry_run: bool,
}

impl SyncService {
    /// Wire a service from its collaborators; dry run is off
    pub fn new(
        config: SyncConfig,
        directory: Arc<dyn DirectorySource>,
        store: Arc<dyn DestinationStore>,
        resolver: Arc<dyn HostResolver>,
    ) -> Self {
        let inventory = Inventory::new(directory, config.directory.clone());
        Self {
            config: Arc::new(config),
            inventory,
            store,
            resolver,
            dry_run: false,
        }
    }

    /// Plan and log operations without committing them
    pub fn dry_run(mut self, enabled: bool) -> Self {
        self.dry_run = enabled;
        self
    }

    /// Validated configuration this service was built with
    pub fn config(&self) -> &SyncConfig {
        &self.config
    }

    /// Block until both the directory and the store answer a health check
    pub async fn wait_until_ready(&self) -> SyncResult<()> {
        let directory = self.inventory.source();
        with_retry(&self.config.retry, "directory", || async move {
            directory.health_check().await.map_err(SyncError::from)
        })
        .await?;
        info!(directory = directory.name(), "Directory ready");

        let store = &self.store;
        with_retry(&self.config.retry, "store", || async move {
            store.health_check().await.map_err(SyncError::from)
        })
        .await?;
        info!(store = store.name(), "Store ready");
        Ok(())
    }

    /// Converge connections and their parameters to the catalog
    #[instrument(skip_all, fields(phase = "resources", cycle_id = tracing::field::Empty))]
    pub async fn sync_resources(&self) -> SyncResult<CycleReport> {
        let cycle_id = Uuid::now_v7();
        Span::current().record("cycle_id", tracing::field::display(cycle_id));
        let started_at = Utc::now();

        let inventory = &self.inventory;
        let computers = with_retry(&self.config.retry, "directory", || async move {
            inventory.computers().await.map_err(SyncError::from)
        })
        .await?;

        let (records, rules, resolver) = (
            &computers.records,
            &self.config.resources,
            self.resolver.as_ref(),
        );
        let build = with_retry(&self.config.retry, "resolver", || async move {
            build_catalog(records, rules, resolver)
                .await
                .map_err(SyncError::from)
        })
        .await?;

        let mut transaction = self.begin().await?;
        let stored = transaction.resources().await?;
        let operations = plan_resources(&build.definitions, &stored);
        let planned = operations.len();

        let applied = if self.dry_run {
            record(operations).await?
        } else {
            let mut executor = StoreExecutor::new(transaction).with_resources(&stored);
            let applied = executor.execute(operations).await?;
            executor.commit().await?;
            applied
        };

        let mut anomalies = computers.anomalies;
        anomalies.extend(build.anomalies);

        let report = CycleReport {
            cycle_id,
            phase: Phase::Resources,
            started_at,
            finished_at: Utc::now(),
            desired: build.definitions.len(),
            planned,
            applied,
            dry_run: self.dry_run,
            anomalies,
        };
        report.log();
        Ok(report)
    }

    /// Converge group entities and their permissions to the group closure
    #[instrument(skip_all, fields(phase = "permissions", cycle_id = tracing::field::Empty))]
    pub async fn sync_permissions(&self) -> SyncResult<CycleReport> {
        let cycle_id = Uuid::now_v7();
        Span::current().record("cycle_id", tracing::field::display(cycle_id));
        let started_at = Utc::now();

        let inventory = &self.inventory;
        let groups = with_retry(&self.config.retry, "directory", || async move {
            inventory.groups().await.map_err(SyncError::from)
        })
        .await?;

        let mut transaction = self.begin().await?;
        let catalog = ids_by_name(&transaction.resources().await?);
        let closure = resolve_closure(&groups.records, &catalog, &self.config.permissions);
        let grants = assign(&closure.reach, &self.config.permissions);

        let stored = transaction.groups().await?;
        let operations = plan_permissions(&grants, &stored);
        let planned = operations.len();

        let applied = if self.dry_run {
            record(operations).await?
        } else {
            let mut executor = StoreExecutor::new(transaction).with_groups(&stored);
            let applied = executor.execute(operations).await?;
            executor.commit().await?;
            applied
        };

        let mut anomalies = groups.anomalies;
        anomalies.extend(closure.anomalies);

        let report = CycleReport {
            cycle_id,
            phase: Phase::Permissions,
            started_at,
            finished_at: Utc::now(),
            desired: grants.len(),
            planned,
            applied,
            dry_run: self.dry_run,
            anomalies,
        };
        report.log();
        Ok(report)
    }

    async fn begin(&self) -> SyncResult<Box<dyn StoreTransaction>> {
        let store = &self.store;
        with_retry(&self.config.retry, "store", || async move {
            store.begin().await.map_err(SyncError::from)
        })
        .await
    }
}

/// Dry runs report what would have been applied; the open transaction is
/// dropped by the caller without commit
async fn record<Op>(operations: Vec<Op>) -> SyncResult<usize>
where
    Op: Serialize + Send + 'static,
{
    RecordingExecutor::<Op>::new().execute(operations).await?;
    Ok(0)
}
