// Copyright (c) 2025 - Cowboy AI, Inc.
//! Directory Sync Service
//!
//! Reads computers and groups from LDAP and converges the Guacamole MySQL
//! database to them on a schedule.
//!
//! Run with: cargo run --bin guacamole-dirsync --features ldap,mysql,dns
//!
//! Environment:
//! 1. `DIRSYNC_CONFIG` - configuration file (default: /configs/dirsync.yaml)
//! 2. `LDAP_BIND_PASSWORD`, `MYSQL_URL`, `GUAC_ADMIN_GROUPS` - override the file
//! 3. `DIRSYNC_DRY_RUN=true` - plan and log operations without committing
//! 4. `DIRSYNC_ONCE=true` - run both phases once and exit

use anyhow::{Context, Result};
use guacamole_dirsync::{
    adapters::{DnsResolver, LdapDirectory, MySqlStore},
    config::{DnsPolicy, SyncConfig},
    resolver::{HostResolver, StaticResolver},
    Scheduler, SyncService,
};
use std::sync::Arc;
use tracing::{info, warn};

fn flag(name: &str) -> bool {
    std::env::var(name)
        .map(|value| matches!(value.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes"))
        .unwrap_or(false)
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "Could not listen for shutdown signal");
        std::future::pending::<()>().await;
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    info!("🚀 Starting directory sync service");

    let config = SyncConfig::from_env().context("Failed to load configuration")?;
    let dry_run = flag("DIRSYNC_DRY_RUN");
    info!("📋 Configuration loaded:");
    info!("  - Directory: {}", config.directory.url);
    info!("  - Computers: {}", config.directory.computer_base_dn);
    info!("  - Groups: {}", config.directory.group_base_dn);
    info!("  - Admin groups: {}", config.permissions.admin_groups.join(", "));
    info!("  - Dry run: {}", dry_run);

    let directory = Arc::new(LdapDirectory::new(config.directory.clone()));
    let store = Arc::new(MySqlStore::new(&config.store).context("Failed to create store pool")?);
    let resolver: Arc<dyn HostResolver> = match &config.resources.dns_policy {
        DnsPolicy::Resolve { nameserver } => {
            info!("  - Nameserver: {}", nameserver);
            Arc::new(DnsResolver::new(*nameserver))
        }
        DnsPolicy::Passthrough => Arc::new(StaticResolver::new()),
    };

    let schedule = config.schedule.clone();
    let service = SyncService::new(config, directory, store, resolver).dry_run(dry_run);

    info!("🔌 Waiting for directory and store");
    service
        .wait_until_ready()
        .await
        .context("Collaborators never became ready")?;
    info!("✅ Directory and store ready");

    let scheduler = Scheduler::new(Arc::new(service), schedule);

    if flag("DIRSYNC_ONCE") {
        let (resources, permissions) = scheduler
            .run_once()
            .await
            .context("Sync pass failed")?;
        info!(
            resources_applied = resources.applied,
            permissions_applied = permissions.applied,
            "✅ Single pass complete"
        );
        return Ok(());
    }

    scheduler.run_until(shutdown_signal()).await;
    info!("👋 Directory sync service stopped");
    Ok(())
}
