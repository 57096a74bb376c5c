// Copyright (c) 2025 - Cowboy AI, Inc.
//! Error types for sync operations
//!
//! Two kinds of failure are kept apart:
//!
//! - [`SyncError`] aborts a phase. Connectivity errors among them are
//!   transient and retried; the next scheduled cycle starts from scratch.
//! - [`Anomaly`] is a data problem with a single entity (a computer without a
//!   hostname, a manual permission naming an unknown connection, ...). The
//!   entity is skipped, the anomaly is logged and reported, the cycle goes on.

use thiserror::Error;

use crate::config::ConfigError;
use crate::directory::DirectoryError;
use crate::domain::HostnameError;
use crate::reconcile::ExecutorError;
use crate::resolver::ResolveError;
use crate::store::StoreError;

/// Errors that abort a sync phase
#[derive(Debug, Error)]
pub enum SyncError {
    /// Invalid configuration
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Directory search failed
    #[error("Directory error: {0}")]
    Directory(#[from] DirectoryError),

    /// Destination store failed
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    /// Nameserver could not be queried
    #[error("Resolver error: {0}")]
    Resolve(#[from] ResolveError),

    /// Applying planned operations failed
    #[error("Executor error: {0}")]
    Executor(#[from] ExecutorError),

    /// A collaborator stayed unreachable for the whole retry budget
    #[error("{collaborator} unavailable after {attempts} attempts")]
    RetriesExhausted {
        collaborator: &'static str,
        attempts: u32,
    },
}

/// Result type for sync operations
pub type SyncResult<T> = Result<T, SyncError>;

impl SyncError {
    /// Whether retrying the same operation later can succeed
    pub fn is_transient(&self) -> bool {
        match self {
            SyncError::Config(_) => false,
            SyncError::Directory(e) => e.is_transient(),
            SyncError::Store(e) => e.is_transient(),
            SyncError::Resolve(e) => e.is_transient(),
            SyncError::Executor(ExecutorError::Store(e)) => e.is_transient(),
            SyncError::Executor(_) => false,
            SyncError::RetriesExhausted { .. } => true,
        }
    }
}

/// Data problem confined to one entity
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum Anomaly {
    #[error("{entity}: missing attribute {attribute}")]
    MissingAttribute { entity: String, attribute: String },

    #[error("{entity}: invalid hostname: {reason}")]
    InvalidHostname {
        entity: String,
        reason: HostnameError,
    },

    #[error("{host}: name resolution failed: {reason}")]
    Unresolvable { host: String, reason: String },

    #[error("connection {name} is defined more than once; keeping the first definition")]
    DuplicateResource { name: String },

    #[error("connection {resource} matched the group name pattern without a capture")]
    NoCapture { resource: String },

    #[error("group {group} derived from connection {resource} does not exist in the directory")]
    GroupNotFound { group: String, resource: String },

    #[error("manual permission for group {group} references unknown connection {resource}")]
    UnknownResource { group: String, resource: String },

    #[error("group propagation stopped after {passes} passes without reaching a fixpoint")]
    PropagationTruncated { passes: usize },
}

impl Anomaly {
    /// Short machine-friendly label, used as a tracing field
    pub fn kind(&self) -> &'static str {
        match self {
            Anomaly::MissingAttribute { .. } => "missing_attribute",
            Anomaly::InvalidHostname { .. } => "invalid_hostname",
            Anomaly::Unresolvable { .. } => "unresolvable",
            Anomaly::DuplicateResource { .. } => "duplicate_resource",
            Anomaly::NoCapture { .. } => "no_capture",
            Anomaly::GroupNotFound { .. } => "group_not_found",
            Anomaly::UnknownResource { .. } => "unknown_resource",
            Anomaly::PropagationTruncated { .. } => "propagation_truncated",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn connectivity_errors_are_transient() {
        let err = SyncError::from(StoreError::Unavailable("connection refused".into()));
        assert!(err.is_transient());

        let err = SyncError::from(DirectoryError::Unavailable("bind timed out".into()));
        assert!(err.is_transient());
    }

    #[test]
    fn data_and_config_errors_are_not_transient() {
        let err = SyncError::from(ConfigError::Invalid("empty group template".into()));
        assert!(!err.is_transient());

        let err = SyncError::from(ExecutorError::UnknownResource("ghost".into()));
        assert!(!err.is_transient());
    }

    #[test]
    fn anomaly_display_names_the_entity() {
        let anomaly = Anomaly::UnknownResource {
            group: "ops".into(),
            resource: "host9.example.com".into(),
        };
        assert_eq!(anomaly.kind(), "unknown_resource");
        assert!(anomaly.to_string().contains("host9.example.com"));
    }
}
