// Copyright (c) 2025 - Cowboy AI, Inc.
//! Bounded retry for collaborator calls
//!
//! Only transient errors are retried. Anything else is returned at once.

use std::future::Future;
use tracing::warn;

use crate::config::RetryPolicy;
use crate::errors::{SyncError, SyncResult};

/// Run `operation` until it succeeds, fails permanently, or the policy's
/// attempts are used up
pub async fn with_retry<T, F, Fut>(
    policy: &RetryPolicy,
    collaborator: &'static str,
    mut operation: F,
) -> SyncResult<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = SyncResult<T>>,
{
    for attempt in 1..=policy.attempts {
        match operation().await {
            Ok(value) => return Ok(value),
            Err(e) if e.is_transient() => {
                warn!(
                    collaborator,
                    attempt,
                    max_attempts = policy.attempts,
                    error = %e,
                    "Collaborator unavailable"
                );
                if attempt < policy.attempts {
                    tokio::time::sleep(policy.delay()).await;
                }
            }
            Err(e) => return Err(e),
        }
    }

    Err(SyncError::RetriesExhausted {
        collaborator,
        attempts: policy.attempts,
    })
}
