// Copyright (c) 2025 - Cowboy AI, Inc.

//! Reconciler
//!
//! Converges the destination store to the desired state in two steps: a pure
//! [`plan`] that diffs desired state against a store snapshot, and an
//! [`executor`] that applies the resulting operations.

pub mod executor;
pub mod plan;

pub use executor::{ExecutorError, OperationExecutor, RecordingExecutor, StoreExecutor};
pub use plan::{plan_permissions, plan_resources, PermissionOperation, ResourceOperation};
