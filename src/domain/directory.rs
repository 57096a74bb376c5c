// Copyright (c) 2025 - Cowboy AI, Inc.
//! Directory Snapshot Records
//!
//! Groups and computers as they look after a directory search has been
//! mapped into typed records. Both are immutable per snapshot and are
//! re-fetched every cycle.

use std::cmp::Ordering;
use std::collections::BTreeSet;
use std::fmt;
use std::hash::{Hash, Hasher};

use super::Hostname;

/// LDAP distinguished name
///
/// DNs compare case-insensitively (`CN=Ops,DC=corp` and `cn=ops,dc=corp`
/// name the same object), but the original spelling is kept for display.
#[derive(Debug, Clone)]
pub struct DistinguishedName {
    raw: String,
    folded: String,
}

impl DistinguishedName {
    pub fn new(raw: impl Into<String>) -> Self {
        let raw = raw.into();
        let folded = raw.trim().to_lowercase();
        Self { raw, folded }
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// Lower-cased form used for comparison
    pub fn folded(&self) -> &str {
        &self.folded
    }
}

impl PartialEq for DistinguishedName {
    fn eq(&self, other: &Self) -> bool {
        self.folded == other.folded
    }
}

impl Eq for DistinguishedName {}

impl Hash for DistinguishedName {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.folded.hash(state);
    }
}

impl PartialOrd for DistinguishedName {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for DistinguishedName {
    fn cmp(&self, other: &Self) -> Ordering {
        self.folded.cmp(&other.folded)
    }
}

impl fmt::Display for DistinguishedName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

impl From<&str> for DistinguishedName {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for DistinguishedName {
    fn from(value: String) -> Self {
        Self::new(value)
    }
}

/// Directory group with its parent-group edges (`memberOf`)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirectoryGroup {
    pub dn: DistinguishedName,
    /// Display name (`cn`); this is the entity name in the broker
    pub cn: String,
    /// Groups this group is a direct member of
    pub member_of: BTreeSet<DistinguishedName>,
}

impl DirectoryGroup {
    pub fn new(dn: impl Into<DistinguishedName>, cn: impl Into<String>) -> Self {
        Self {
            dn: dn.into(),
            cn: cn.into(),
            member_of: BTreeSet::new(),
        }
    }

    /// Builder-style helper, mostly for fixtures
    pub fn member_of(mut self, parent: impl Into<DistinguishedName>) -> Self {
        self.member_of.insert(parent.into());
        self
    }

    pub fn is_member_of(&self, parent: &DistinguishedName) -> bool {
        self.member_of.contains(parent)
    }
}

/// Directory computer record, one auto connection per computer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirectoryComputer {
    pub dn: DistinguishedName,
    pub cn: String,
    /// `dNSHostName`; absent for computers that never registered in DNS
    pub dns_hostname: Option<Hostname>,
}

impl DirectoryComputer {
    pub fn new(
        dn: impl Into<DistinguishedName>,
        cn: impl Into<String>,
        dns_hostname: Option<Hostname>,
    ) -> Self {
        Self {
            dn: dn.into(),
            cn: cn.into(),
            dns_hostname,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn dn_equality_ignores_case_and_keeps_spelling() {
        let a = DistinguishedName::new("CN=Ops,OU=Groups,DC=corp,DC=example");
        let b = DistinguishedName::new("cn=ops,ou=groups,dc=corp,dc=example");

        assert_eq!(a, b);
        assert_eq!(a.to_string(), "CN=Ops,OU=Groups,DC=corp,DC=example");

        let set: HashSet<_> = [a, b].into_iter().collect();
        assert_eq!(set.len(), 1);
    }

    #[test]
    fn group_membership_lookup_uses_folded_dn() {
        let group = DirectoryGroup::new("CN=ops-db,DC=corp", "ops-db").member_of("CN=OPS,DC=CORP");

        assert!(group.is_member_of(&DistinguishedName::new("cn=ops,dc=corp")));
        assert!(!group.is_member_of(&DistinguishedName::new("cn=dev,dc=corp")));
    }
}
