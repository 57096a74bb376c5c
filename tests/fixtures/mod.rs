// Copyright (c) 2025 - Cowboy AI, Inc.
//! Test Fixtures for guacamole-dirsync
//!
//! Provides a deterministic directory and configuration for end-to-end sync
//! scenarios. Nothing here touches the network or the clock.
//!
//! ```text
//! OU=Servers   HOST1 (host1.example.com)   HOST2 (no dNSHostName)
//! OU=Groups    ops-admins
//!              ops ◄── helpdesk (memberOf ops)
//!              contractors
//! ```

#![allow(dead_code)]

use std::sync::Arc;

use guacamole_dirsync::{
    DirectoryEntry, InMemoryStore, StaticDirectory, StaticResolver, SyncConfig, SyncService,
};

pub const HOST1: &str = "host1.example.com";
pub const JUMP: &str = "jump";

pub const CONFIG: &str = r#"
directory:
  url: ldap://dc01.corp.example.com
  bind_dn: CN=svc-guacamole,OU=Service,DC=corp
  computer_base_dn: OU=Servers,DC=corp
  group_base_dn: OU=Groups,DC=corp
store:
  url: memory://
resources:
  auto_template:
    attributes:
      protocol: rdp
      max_connections: 2
    parameters:
      port: 3389
      security: nla
      ignore-cert: true
  manual:
    connections:
      - name: jump
        use_defaults: false
        attributes: { protocol: ssh }
        parameters: { hostname: jump.example.com, port: 22 }
permissions:
  admin_groups: [ops-admins]
  manual:
    ops: [host1.example.com, jump]
retry:
  attempts: 2
  delay_ms: 1
"#;

pub fn config() -> SyncConfig {
    let config = SyncConfig::from_yaml(CONFIG).expect("fixture config parses");
    config.validate().expect("fixture config is valid");
    config
}

pub fn directory() -> StaticDirectory {
    StaticDirectory::new(vec![
        DirectoryEntry::new("CN=HOST1,OU=Servers,DC=corp")
            .with("cn", "HOST1")
            .with("dNSHostName", HOST1),
        DirectoryEntry::new("CN=HOST2,OU=Servers,DC=corp").with("cn", "HOST2"),
        DirectoryEntry::new("CN=ops-admins,OU=Groups,DC=corp").with("cn", "ops-admins"),
        DirectoryEntry::new("CN=ops,OU=Groups,DC=corp").with("cn", "ops"),
        DirectoryEntry::new("CN=helpdesk,OU=Groups,DC=corp")
            .with("cn", "helpdesk")
            .with("memberOf", "CN=ops,OU=Groups,DC=corp"),
        DirectoryEntry::new("CN=contractors,OU=Groups,DC=corp").with("cn", "contractors"),
    ])
}

pub fn service(store: &InMemoryStore) -> SyncService {
    service_with(directory(), store)
}

pub fn service_with(directory: StaticDirectory, store: &InMemoryStore) -> SyncService {
    SyncService::new(
        config(),
        Arc::new(directory),
        Arc::new(store.clone()),
        Arc::new(StaticResolver::new()),
    )
}
