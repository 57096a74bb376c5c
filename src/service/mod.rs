// Copyright (c) 2025 - Cowboy AI, Inc.
//! Service Layer for Directory Sync
//!
//! This module provides the application service that orchestrates the pure
//! sync pipeline and the collaborators it reads from and writes to.
//!
//! # Architecture
//!
//! ```text
//! Scheduler tick
//!     ↓
//! SyncService (this module)
//!     ↓
//! DirectorySource ──► inventory snapshot
//!     ↓
//! Catalog / Closure / Assignment (pure)
//!     ↓
//! plan_* (pure diff) ──► StoreExecutor
//!     ↓
//! DestinationStore transaction ──► commit
//! ```
//!
//! # Design Principles
//!
//! 1. **Transaction Boundaries**: one store transaction per phase cycle
//! 2. **Fresh Snapshots**: nothing is cached between cycles
//! 3. **Pure Core**: only the executor performs writes
//! 4. **Bounded Retry**: connectivity errors are retried, then the cycle is skipped
//!
//! # Example
//!
//! ```rust,ignore
//! use guacamole_dirsync::service::SyncService;
//!
//! let service = SyncService::new(config, directory, store, resolver);
//! service.wait_until_ready().await?;
//!
//! let report = service.sync_resources().await?;
//! let report = service.sync_permissions().await?;
//! ```

pub mod report;
pub mod retry;
pub mod sync;

pub use report::{CycleReport, Phase};
pub use retry::with_retry;
pub use sync::SyncService;
