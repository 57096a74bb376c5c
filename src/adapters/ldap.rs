// Copyright (c) 2025 - Cowboy AI, Inc.

//! LDAP directory adapter
//!
//! Implements [`DirectorySource`] over `ldap3`. Every search opens a fresh
//! connection, binds, searches and unbinds, so a directory restart between
//! cycles needs no reconnect logic.
//!
//! # Example
//!
//! ```rust,no_run
//! use guacamole_dirsync::adapters::LdapDirectory;
//! use guacamole_dirsync::config::SyncConfig;
//! use guacamole_dirsync::directory::DirectorySource;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = SyncConfig::from_env()?;
//! let directory = LdapDirectory::new(config.directory.clone());
//! directory.health_check().await?;
//! # Ok(())
//! # }
//! ```

use async_trait::async_trait;
use ldap3::{Ldap, LdapConnAsync, LdapConnSettings, Scope, SearchEntry};
use tracing::{debug, warn};

use crate::config::DirectoryConfig;
use crate::directory::{
    DirectoryEntry, DirectoryError, DirectoryQuery, DirectoryResult, DirectorySource, SearchScope,
};

/// LDAP result code for invalid credentials
const INVALID_CREDENTIALS: u32 = 49;

/// Directory source backed by an LDAP server; binds anew for every call
pub struct LdapDirectory {
    config: DirectoryConfig,
}

impl LdapDirectory {
    /// No connection is made until the first call
    pub fn new(config: DirectoryConfig) -> Self {
        Self { config }
    }

    async fn connect(&self) -> DirectoryResult<Ldap> {
        let settings = LdapConnSettings::new().set_conn_timeout(self.config.timeout());

        debug!(url = %self.config.url, "Connecting to LDAP server");
        let (conn, mut ldap) = LdapConnAsync::with_settings(settings, &self.config.url)
            .await
            .map_err(|e| {
                DirectoryError::Unavailable(format!("connect to {}: {e}", self.config.url))
            })?;

        tokio::spawn(async move {
            if let Err(e) = conn.drive().await {
                warn!(error = %e, "LDAP connection driver error");
            }
        });

        let result = ldap
            .simple_bind(&self.config.bind_dn, &self.config.bind_password)
            .await
            .map_err(|e| DirectoryError::Unavailable(format!("bind: {e}")))?;

        match result.rc {
            0 => Ok(ldap),
            INVALID_CREDENTIALS => Err(DirectoryError::Authentication(format!(
                "invalid credentials for {}",
                self.config.bind_dn
            ))),
            rc => Err(DirectoryError::Unavailable(format!(
                "bind failed with code {rc}: {}",
                result.text
            ))),
        }
    }
}

fn scope(scope: SearchScope) -> Scope {
    match scope {
        SearchScope::Base => Scope::Base,
        SearchScope::OneLevel => Scope::OneLevel,
        SearchScope::Subtree => Scope::Subtree,
    }
}

fn to_entry(entry: SearchEntry) -> DirectoryEntry {
    let mut mapped = DirectoryEntry::new(entry.dn);
    for (name, values) in entry.attrs {
        for value in values {
            mapped.push(&name, value);
        }
    }
    mapped
}

#[async_trait]
impl DirectorySource for LdapDirectory {
    async fn search(&self, query: &DirectoryQuery) -> DirectoryResult<Vec<DirectoryEntry>> {
        let mut ldap = self.connect().await?;

        let attributes: Vec<&str> = query.attributes.iter().map(String::as_str).collect();
        let result = ldap
            .search(&query.base, scope(query.scope), &query.filter, attributes)
            .await
            .map_err(|e| DirectoryError::Unavailable(format!("search {}: {e}", query.base)))?;

        let (entries, _) = result
            .success()
            .map_err(|e| DirectoryError::Search(format!("{} {}: {e}", query.base, query.filter)))?;

        if let Err(e) = ldap.unbind().await {
            debug!(error = %e, "LDAP unbind failed");
        }

        Ok(entries
            .into_iter()
            .map(SearchEntry::construct)
            .map(to_entry)
            .collect())
    }

    async fn health_check(&self) -> DirectoryResult<()> {
        let mut ldap = self.connect().await?;
        if let Err(e) = ldap.unbind().await {
            debug!(error = %e, "LDAP unbind failed");
        }
        Ok(())
    }

    fn name(&self) -> &str {
        "ldap"
    }
}
