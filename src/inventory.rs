// Copyright (c) 2025 - Cowboy AI, Inc.

//! Inventory Snapshot
//!
//! Turns raw [`DirectoryEntry`] records into typed [`DirectoryComputer`] and
//! [`DirectoryGroup`] snapshots. Entries that cannot be mapped become
//! [`Anomaly`] values; the rest of the snapshot is still usable.
//!
//! ```text
//! computer_base_dn + computer_filter ──► [cn, dNSHostName] ──► DirectoryComputer
//! group_base_dn    + group_filter    ──► [cn, memberOf]    ──► DirectoryGroup
//! ```

use std::sync::Arc;
use tracing::debug;

use crate::config::DirectoryConfig;
use crate::directory::{DirectoryEntry, DirectoryQuery, DirectoryResult, DirectorySource};
use crate::domain::{DirectoryComputer, DirectoryGroup, Hostname};
use crate::errors::Anomaly;

pub const CN_ATTRIBUTE: &str = "cn";
pub const DNS_HOSTNAME_ATTRIBUTE: &str = "dNSHostName";
pub const MEMBER_OF_ATTRIBUTE: &str = "memberOf";

/// Typed records plus the entries that were skipped
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Snapshot<T> {
    pub records: Vec<T>,
    pub anomalies: Vec<Anomaly>,
}

/// Fetches computer and group snapshots from a directory
#[derive(Clone)]
pub struct Inventory {
    source: Arc<dyn DirectorySource>,
    config: DirectoryConfig,
}

impl Inventory {
    pub fn new(source: Arc<dyn DirectorySource>, config: DirectoryConfig) -> Self {
        Self { source, config }
    }

    /// Underlying directory, for health checks
    pub fn source(&self) -> &Arc<dyn DirectorySource> {
        &self.source
    }

    /// Computers under `computer_base_dn`; unusable entries become anomalies
    pub async fn computers(&self) -> DirectoryResult<Snapshot<DirectoryComputer>> {
        let query = DirectoryQuery::subtree(
            &self.config.computer_base_dn,
            &self.config.computer_filter,
            &[CN_ATTRIBUTE, DNS_HOSTNAME_ATTRIBUTE],
        );
        let entries = self.source.search(&query).await?;
        debug!(base = %query.base, entries = entries.len(), "Fetched computers");
        Ok(collect(entries, computer_from_entry))
    }

    /// Groups under `group_base_dn` with their `memberOf` parents
    pub async fn groups(&self) -> DirectoryResult<Snapshot<DirectoryGroup>> {
        let query = DirectoryQuery::subtree(
            &self.config.group_base_dn,
            &self.config.group_filter,
            &[CN_ATTRIBUTE, MEMBER_OF_ATTRIBUTE],
        );
        let entries = self.source.search(&query).await?;
        debug!(base = %query.base, entries = entries.len(), "Fetched groups");
        Ok(collect(entries, group_from_entry))
    }
}

fn collect<T>(
    entries: Vec<DirectoryEntry>,
    map: impl Fn(&DirectoryEntry) -> Result<T, Anomaly>,
) -> Snapshot<T> {
    let mut records = Vec::with_capacity(entries.len());
    let mut anomalies = Vec::new();
    for entry in &entries {
        match map(entry) {
            Ok(record) => records.push(record),
            Err(anomaly) => anomalies.push(anomaly),
        }
    }
    Snapshot { records, anomalies }
}

fn common_name(entry: &DirectoryEntry) -> Result<String, Anomaly> {
    entry
        .first(CN_ATTRIBUTE)
        .map(str::trim)
        .filter(|cn| !cn.is_empty())
        .map(String::from)
        .ok_or_else(|| Anomaly::MissingAttribute {
            entity: entry.dn.to_string(),
            attribute: CN_ATTRIBUTE.to_string(),
        })
}

/// Map a computer entry; a missing `dNSHostName` is allowed, a malformed one is not
pub fn computer_from_entry(entry: &DirectoryEntry) -> Result<DirectoryComputer, Anomaly> {
    let cn = common_name(entry)?;
    let dns_hostname = match entry.first(DNS_HOSTNAME_ATTRIBUTE).map(str::trim) {
        None | Some("") => None,
        Some(raw) => Some(Hostname::new(raw).map_err(|reason| Anomaly::InvalidHostname {
            entity: entry.dn.to_string(),
            reason,
        })?),
    };
    Ok(DirectoryComputer::new(entry.dn.clone(), cn, dns_hostname))
}

/// Map one directory entry to a group; a missing cn is an anomaly
pub fn group_from_entry(entry: &DirectoryEntry) -> Result<DirectoryGroup, Anomaly> {
    let cn = common_name(entry)?;
    let group = entry
        .values(MEMBER_OF_ATTRIBUTE)
        .iter()
        .fold(DirectoryGroup::new(entry.dn.clone(), cn), |group, parent| {
            group.member_of(parent.as_str())
        });
    Ok(group)
}
