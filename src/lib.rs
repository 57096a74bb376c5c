// Copyright (c) 2025 - Cowboy AI, Inc.
//! Directory to Guacamole synchronisation
//!
//! Reads computers and groups from a directory, derives the connections and
//! group permissions a Guacamole deployment should have, and converges its
//! database to that state on a fixed schedule.
//!
//! ```text
//! directory ─► inventory ─► catalog ─► closure ─► assignment
//!                                                    │
//!                             store ◄── executor ◄── plan
//! ```

pub mod adapters;
pub mod assignment;
pub mod catalog;
pub mod closure;
pub mod config;
pub mod directory;
pub mod domain;
pub mod errors;
pub mod inventory;
pub mod reconcile;
pub mod resolver;
pub mod scheduler;
pub mod service;
pub mod store;

// Re-export commonly used types
pub use config::SyncConfig;
pub use directory::{DirectoryEntry, DirectorySource, StaticDirectory};
pub use errors::{Anomaly, SyncError, SyncResult};
pub use resolver::{HostResolver, StaticResolver};
pub use scheduler::Scheduler;
pub use service::{CycleReport, Phase, SyncService};
pub use store::{DestinationStore, InMemoryStore};
