// Copyright (c) 2025 - Cowboy AI, Inc.

//! Scheduler
//!
//! Drives the two sync phases on their own periods:
//!
//! ```text
//! run_once: resources ─► permissions          (startup, and DIRSYNC_ONCE)
//!
//! t=0        P_res        2·P_res ...
//! │──────────│────────────│──────   resource loop
//! │────────────────│────────────────  permission loop (P_perm ≥ P_res)
//! ```
//!
//! Each loop is a single worker: a cycle runs to completion before the next
//! tick is considered, and ticks missed while a cycle was running are skipped.
//! A failed cycle is logged and the loop carries on.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::{error, info, warn};

use crate::config::Schedule;
use crate::errors::{SyncError, SyncResult};
use crate::service::{CycleReport, Phase, SyncService};

/// Runs both phases on their own periods until shutdown
pub struct Scheduler {
    service: Arc<SyncService>,
    schedule: Schedule,
}

impl Scheduler {
    /// Nothing runs until `run_once` or `run_until` is awaited
    pub fn new(service: Arc<SyncService>, schedule: Schedule) -> Self {
        Self { service, schedule }
    }

    /// Run each phase once, resources first
    pub async fn run_once(&self) -> SyncResult<(CycleReport, CycleReport)> {
        let resources = self.service.sync_resources().await?;
        let permissions = self.service.sync_permissions().await?;
        Ok((resources, permissions))
    }

    /// Run an initial pass, then both loops until `shutdown` resolves
    pub async fn run_until<F>(&self, shutdown: F)
    where
        F: Future<Output = ()>,
    {
        info!(
            resource_period_secs = self.schedule.resource_period_secs,
            permission_period_secs = self.schedule.permission_period_secs,
            "Scheduler starting"
        );

        if let Err(e) = self.run_once().await {
            report_failure("initial", &e);
        }

        let loops = futures::future::join(
            self.run_loop(Phase::Resources, self.schedule.resource_period()),
            self.run_loop(Phase::Permissions, self.schedule.permission_period()),
        );

        tokio::select! {
            _ = loops => {}
            _ = shutdown => info!("Shutdown requested, scheduler stopping"),
        }
    }

    async fn run_loop(&self, phase: Phase, period: Duration) {
        let mut ticker = interval_at(Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            ticker.tick().await;
            let result = match phase {
                Phase::Resources => self.service.sync_resources().await,
                Phase::Permissions => self.service.sync_permissions().await,
            };
            if let Err(e) = result {
                report_failure(phase.as_str(), &e);
            }
        }
    }
}

fn report_failure(phase: &str, e: &SyncError) {
    if e.is_transient() {
        warn!(phase, error = %e, "Sync cycle skipped, will retry next period");
    } else {
        error!(phase, error = %e, "Sync cycle failed");
    }
}
