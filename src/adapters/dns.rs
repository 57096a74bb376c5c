// Copyright (c) 2025 - Cowboy AI, Inc.

//! DNS host resolver
//!
//! Implements [`HostResolver`] with `hickory-resolver`, querying only the
//! nameserver named by the `resolve` DNS policy. The system resolver
//! configuration is never consulted.

use async_trait::async_trait;
use hickory_resolver::config::{NameServerConfigGroup, ResolverConfig, ResolverOpts};
use hickory_resolver::error::{ResolveError as LookupError, ResolveErrorKind};
use hickory_resolver::TokioAsyncResolver;
use std::net::{IpAddr, Ipv4Addr};
use tracing::debug;

use crate::resolver::{HostResolver, ResolveError};

const DNS_PORT: u16 = 53;

/// Resolver bound to a single nameserver
pub struct DnsResolver {
    nameserver: IpAddr,
    resolver: TokioAsyncResolver,
}

impl DnsResolver {
    /// Query `nameserver` on port 53 over UDP, falling back to TCP
    pub fn new(nameserver: IpAddr) -> Self {
        let servers = NameServerConfigGroup::from_ips_clear(&[nameserver], DNS_PORT, true);
        let config = ResolverConfig::from_parts(None, vec![], servers);
        Self {
            nameserver,
            resolver: TokioAsyncResolver::tokio(config, ResolverOpts::default()),
        }
    }
}

fn classify(host: &str, e: LookupError) -> ResolveError {
    match e.kind() {
        ResolveErrorKind::NoRecordsFound { .. } => ResolveError::NotFound(host.to_string()),
        _ => ResolveError::Transport(e.to_string()),
    }
}

#[async_trait]
impl HostResolver for DnsResolver {
    async fn resolve_ipv4(&self, host: &str) -> Result<Ipv4Addr, ResolveError> {
        let lookup = self
            .resolver
            .ipv4_lookup(host)
            .await
            .map_err(|e| classify(host, e))?;

        let address = lookup
            .iter()
            .next()
            .map(|record| record.0)
            .ok_or_else(|| ResolveError::NotFound(host.to_string()))?;

        debug!(host, %address, nameserver = %self.nameserver, "Resolved host");
        Ok(address)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transport_failures_are_transient() {
        let e = classify("host1", LookupError::from("connection refused"));
        assert!(e.is_transient());
    }
}
