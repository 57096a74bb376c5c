// Copyright (c) 2025 - Cowboy AI, Inc.
//! Cycle reports

use chrono::{DateTime, Utc};
use std::fmt;
use tracing::{info, warn};
use uuid::Uuid;

use crate::errors::Anomaly;

/// Which half of the sync a cycle ran
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Resources,
    Permissions,
}

impl Phase {
    pub fn as_str(&self) -> &'static str {
        match self {
            Phase::Resources => "resources",
            Phase::Permissions => "permissions",
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of one completed cycle
#[derive(Debug, Clone)]
pub struct CycleReport {
    pub cycle_id: Uuid,
    pub phase: Phase,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    /// Connections (or groups) in the desired state
    pub desired: usize,
    pub planned: usize,
    pub applied: usize,
    pub dry_run: bool,
    pub anomalies: Vec<Anomaly>,
}

impl CycleReport {
    /// Nothing had to change
    pub fn is_converged(&self) -> bool {
        self.planned == 0
    }

    pub fn elapsed_ms(&self) -> i64 {
        (self.finished_at - self.started_at).num_milliseconds()
    }

    /// One warn per anomaly, then an info summary of the cycle
    pub fn log(&self) {
        for anomaly in &self.anomalies {
            warn!(
                cycle_id = %self.cycle_id,
                phase = %self.phase,
                kind = anomaly.kind(),
                "{anomaly}"
            );
        }
        info!(
            cycle_id = %self.cycle_id,
            phase = %self.phase,
            desired = self.desired,
            planned = self.planned,
            applied = self.applied,
            anomalies = self.anomalies.len(),
            dry_run = self.dry_run,
            elapsed_ms = self.elapsed_ms(),
            "Sync cycle complete"
        );
    }
}
