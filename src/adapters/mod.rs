// Copyright (c) 2025 - Cowboy AI, Inc.

//! Collaborator adapter implementations
//!
//! Concrete implementations of the directory, store and resolver seams for
//! the systems the sync service talks to in production. Each is behind its
//! own cargo feature.

#[cfg(feature = "ldap")]
pub mod ldap;

#[cfg(feature = "ldap")]
pub use ldap::LdapDirectory;

#[cfg(feature = "mysql")]
pub mod mysql;

#[cfg(feature = "mysql")]
pub use mysql::MySqlStore;

#[cfg(feature = "dns")]
pub mod dns;

#[cfg(feature = "dns")]
pub use dns::DnsResolver;
