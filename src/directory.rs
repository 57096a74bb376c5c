// Copyright (c) 2025 - Cowboy AI, Inc.

//! Directory Source - the inventory collaborator seam
//!
//! The sync engine only ever asks a directory one question: "give me the
//! entries under this base that match this filter, with these attributes".
//! [`DirectorySource`] captures exactly that, so the engine can run against
//! LDAP in production and a [`StaticDirectory`] in tests.
//!
//! # Architecture
//!
//! ```text
//! DirectoryQuery ──► DirectorySource::search() ──► Vec<DirectoryEntry>
//!                         │
//!                         ├── LdapDirectory   (adapters::ldap, feature "ldap")
//!                         └── StaticDirectory (in-memory)
//! ```

use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::Arc;
use thiserror::Error;

use crate::domain::DistinguishedName;

/// Directory collaborator errors
#[derive(Debug, Error)]
pub enum DirectoryError {
    /// Directory cannot be reached or refused the bind
    #[error("Directory unavailable: {0}")]
    Unavailable(String),

    /// Bind credentials were rejected
    #[error("Authentication failed: {0}")]
    Authentication(String),

    /// Search was rejected (bad base DN, bad filter, ...)
    #[error("Search failed: {0}")]
    Search(String),
}

impl DirectoryError {
    pub fn is_transient(&self) -> bool {
        matches!(self, DirectoryError::Unavailable(_))
    }
}

/// Result type for directory operations
pub type DirectoryResult<T> = Result<T, DirectoryError>;

/// LDAP search scope
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SearchScope {
    Base,
    OneLevel,
    #[default]
    Subtree,
}

/// One search request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirectoryQuery {
    pub base: String,
    pub scope: SearchScope,
    pub filter: String,
    pub attributes: Vec<String>,
}

impl DirectoryQuery {
    /// Subtree search, the only scope the sync engine uses
    pub fn subtree(
        base: impl Into<String>,
        filter: impl Into<String>,
        attributes: &[&str],
    ) -> Self {
        Self {
            base: base.into(),
            scope: SearchScope::Subtree,
            filter: filter.into(),
            attributes: attributes.iter().map(|a| a.to_string()).collect(),
        }
    }
}

/// Raw directory record
///
/// Attribute names are stored lower-cased; LDAP attribute names are
/// case-insensitive and servers do not agree on spelling.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirectoryEntry {
    pub dn: DistinguishedName,
    attributes: BTreeMap<String, Vec<String>>,
}

impl DirectoryEntry {
    pub fn new(dn: impl Into<DistinguishedName>) -> Self {
        Self {
            dn: dn.into(),
            attributes: BTreeMap::new(),
        }
    }

    /// Builder: append one value to an attribute
    pub fn with(mut self, name: &str, value: impl Into<String>) -> Self {
        self.push(name, value);
        self
    }

    /// Append one value; attribute names are case-insensitive
    pub fn push(&mut self, name: &str, value: impl Into<String>) {
        self.attributes
            .entry(name.to_ascii_lowercase())
            .or_default()
            .push(value.into());
    }

    /// First value of an attribute, if any
    pub fn first(&self, name: &str) -> Option<&str> {
        self.values(name).first().map(String::as_str)
    }

    /// All values of an attribute; empty when absent
    pub fn values(&self, name: &str) -> &[String] {
        self.attributes
            .get(&name.to_ascii_lowercase())
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }
}

/// Read-only directory collaborator
#[async_trait]
pub trait DirectorySource: Send + Sync {
    /// Run one search and return every matching entry
    async fn search(&self, query: &DirectoryQuery) -> DirectoryResult<Vec<DirectoryEntry>>;

    /// Verify the directory is reachable and the bind succeeds
    async fn health_check(&self) -> DirectoryResult<()>;

    fn name(&self) -> &str;
}

#[async_trait]
impl<T: DirectorySource + ?Sized> DirectorySource for Arc<T> {
    async fn search(&self, query: &DirectoryQuery) -> DirectoryResult<Vec<DirectoryEntry>> {
        (**self).search(query).await
    }

    async fn health_check(&self) -> DirectoryResult<()> {
        (**self).health_check().await
    }

    fn name(&self) -> &str {
        (**self).name()
    }
}

/// In-memory directory
///
/// Answers a query with every entry whose DN sits under the query base.
/// Filters are not interpreted; tests place computers and groups under
/// different bases instead.
#[derive(Debug, Clone, Default)]
pub struct StaticDirectory {
    entries: Vec<DirectoryEntry>,
    unavailable: bool,
}

impl StaticDirectory {
    pub fn new(entries: Vec<DirectoryEntry>) -> Self {
        Self {
            entries,
            unavailable: false,
        }
    }

    /// A directory that fails every call with [`DirectoryError::Unavailable`]
    pub fn unavailable() -> Self {
        Self {
            entries: Vec::new(),
            unavailable: true,
        }
    }

    /// Add an entry after construction
    pub fn insert(&mut self, entry: DirectoryEntry) {
        self.entries.push(entry);
    }

    /// Drop the entry with this DN, compared case-insensitively
    pub fn remove(&mut self, dn: &str) {
        let dn = DistinguishedName::new(dn);
        self.entries.retain(|entry| entry.dn != dn);
    }

    fn check(&self) -> DirectoryResult<()> {
        if self.unavailable {
            Err(DirectoryError::Unavailable("static directory is offline".into()))
        } else {
            Ok(())
        }
    }
}

fn within(dn: &DistinguishedName, base: &str, scope: SearchScope) -> bool {
    let dn = dn.folded();
    let base = base.trim().to_lowercase();
    match scope {
        SearchScope::Base => dn == base,
        SearchScope::Subtree => dn == base || dn.ends_with(&format!(",{base}")),
        SearchScope::OneLevel => dn
            .split_once(',')
            .is_some_and(|(_, parent)| parent == base),
    }
}

#[async_trait]
impl DirectorySource for StaticDirectory {
    async fn search(&self, query: &DirectoryQuery) -> DirectoryResult<Vec<DirectoryEntry>> {
        self.check()?;
        Ok(self
            .entries
            .iter()
            .filter(|entry| within(&entry.dn, &query.base, query.scope))
            .cloned()
            .collect())
    }

    async fn health_check(&self) -> DirectoryResult<()> {
        self.check()
    }

    fn name(&self) -> &str {
        "static"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SERVERS: &str = "OU=Servers,DC=corp,DC=example,DC=com";

    fn directory() -> StaticDirectory {
        StaticDirectory::new(vec![
            DirectoryEntry::new("CN=HOST1,OU=Servers,DC=corp,DC=example,DC=com")
                .with("cn", "HOST1")
                .with("dNSHostName", "host1.example.com"),
            DirectoryEntry::new("CN=DB1,OU=Linux,OU=Servers,DC=corp,DC=example,DC=com")
                .with("cn", "DB1"),
            DirectoryEntry::new("CN=ops,OU=Groups,DC=corp,DC=example,DC=com").with("cn", "ops"),
        ])
    }

    #[test]
    fn attribute_names_are_case_insensitive() {
        let entry = DirectoryEntry::new("CN=x,DC=example,DC=com")
            .with("memberOf", "CN=a,DC=example,DC=com")
            .with("MEMBEROF", "CN=b,DC=example,DC=com");

        assert_eq!(entry.values("memberof").len(), 2);
        assert_eq!(entry.first("MemberOf"), Some("CN=a,DC=example,DC=com"));
        assert!(entry.values("description").is_empty());
        assert_eq!(entry.first("description"), None);
    }

    #[tokio::test]
    async fn subtree_search_includes_nested_entries() {
        let query = DirectoryQuery::subtree(SERVERS, "(objectClass=computer)", &["cn"]);
        let entries = directory().search(&query).await.unwrap();
        assert_eq!(entries.len(), 2);
    }

    #[tokio::test]
    async fn one_level_search_excludes_nested_entries() {
        let mut query = DirectoryQuery::subtree(SERVERS.to_lowercase(), "(cn=*)", &["cn"]);
        query.scope = SearchScope::OneLevel;
        let entries = directory().search(&query).await.unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].first("cn"), Some("HOST1"));
    }

    #[tokio::test]
    async fn offline_directory_reports_unavailable() {
        let directory = StaticDirectory::unavailable();
        let err = directory.health_check().await.unwrap_err();
        assert!(err.is_transient());
    }
}
