// Copyright (c) 2025 - Cowboy AI, Inc.

//! Host name resolution seam
//!
//! Used by the catalog builder when the DNS policy is `resolve`. The
//! production implementation is `adapters::dns::DnsResolver`.

use async_trait::async_trait;
use std::collections::BTreeMap;
use std::net::Ipv4Addr;
use thiserror::Error;

/// Host lookup failures
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ResolveError {
    /// Name exists nowhere, or has no A record
    #[error("no IPv4 address for {0}")]
    NotFound(String),

    /// Nameserver could not be queried
    #[error("nameserver unreachable: {0}")]
    Transport(String),
}

impl ResolveError {
    pub fn is_transient(&self) -> bool {
        matches!(self, ResolveError::Transport(_))
    }
}

/// Name to IPv4 lookup used by the `resolve` DNS policy
#[async_trait]
pub trait HostResolver: Send + Sync {
    /// First IPv4 address of `host`
    async fn resolve_ipv4(&self, host: &str) -> Result<Ipv4Addr, ResolveError>;
}

/// Fixed host table, case-insensitive
#[derive(Debug, Clone, Default)]
pub struct StaticResolver {
    hosts: BTreeMap<String, Ipv4Addr>,
}

impl StaticResolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder: answer `address` for `host`
    pub fn with(mut self, host: &str, address: Ipv4Addr) -> Self {
        self.hosts.insert(host.to_ascii_lowercase(), address);
        self
    }
}

#[async_trait]
impl HostResolver for StaticResolver {
    async fn resolve_ipv4(&self, host: &str) -> Result<Ipv4Addr, ResolveError> {
        self.hosts
            .get(&host.trim_end_matches('.').to_ascii_lowercase())
            .copied()
            .ok_or_else(|| ResolveError::NotFound(host.to_string()))
    }
}
